//! Revision names accepted wherever a base revision can be chosen
//!
//! - `branch_name`: validated ref names and symbolic ref paths
//! - `revision`: `HEAD`, `@`, branches, tags, object ids, `^` and `~n`

pub mod branch_name;
pub mod revision;

pub const INVALID_BRANCH_NAME_REGEX: &str =
    r"^\.|\/\.|\.\.|^\/|\/$|\.lock$|@\{|[\x00-\x20\*:\?\[\\~\^\x7f]";
pub const PARENT_REGEX: &str = r"^(.+)\^$";
pub const ANCESTOR_REGEX: &str = r"^(.+)\~(\d+)$";

/// Expand the shorthand names git accepts for `HEAD`
pub fn resolve_alias(name: &str) -> &str {
    match name {
        "@" => "HEAD",
        other => other,
    }
}
