//! Repository configuration as far as status cares about it
//!
//! Only `[core]` is consulted: `filemode`, `autocrlf` and `excludesfile`.
//! The file is re-read for every invocation, never written.

use anyhow::Context;
use regex::Regex;
use std::path::{Path, PathBuf};

const SECTION_REGEX: &str = r#"^\s*\[\s*([A-Za-z0-9.-]+)(?:\s+"([^"]*)")?\s*\]\s*$"#;
const ENTRY_REGEX: &str = r"^\s*([A-Za-z][A-Za-z0-9-]*)\s*(?:=\s*(.*))?$";

/// How CRLF line endings in the working tree relate to staged content
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineEndingPolicy {
    /// Content is hashed as-is
    #[default]
    Never,
    /// `core.autocrlf=input`: CRLF is converted to LF when staging
    Always,
    /// `core.autocrlf=true`: LF in the repository, CRLF on disk
    Native,
}

impl LineEndingPolicy {
    pub fn is_active(&self) -> bool {
        !matches!(self, LineEndingPolicy::Never)
    }
}

/// Settings that change how working tree entries are compared
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryConfig {
    /// `core.filemode`; when false an executable-bit flip is not a change
    pub trust_executable_bit: bool,
    /// `core.autocrlf`
    pub line_endings: LineEndingPolicy,
    /// `core.excludesfile`, with `~/` expanded
    pub excludes_file: Option<PathBuf>,
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        RepositoryConfig {
            trust_executable_bit: true,
            line_endings: LineEndingPolicy::Never,
            excludes_file: None,
        }
    }
}

impl RepositoryConfig {
    /// Read `config` from the git directory; a missing file means defaults
    pub fn load(git_dir: &Path) -> anyhow::Result<Self> {
        let config_path = git_dir.join("config");
        if !config_path.is_file() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&config_path)
            .with_context(|| format!("Unable to read {config_path:?}"))?;

        Self::parse(&content)
    }

    pub fn parse(content: &str) -> anyhow::Result<Self> {
        let section_regex = Regex::new(SECTION_REGEX)?;
        let entry_regex = Regex::new(ENTRY_REGEX)?;

        let mut config = Self::default();
        let mut in_core = false;

        for line in content.lines() {
            let line = strip_comment(line);
            if line.trim().is_empty() {
                continue;
            }

            if let Some(caps) = section_regex.captures(line) {
                in_core = caps[1].eq_ignore_ascii_case("core") && caps.get(2).is_none();
                continue;
            }

            let Some(caps) = entry_regex.captures(line) else {
                tracing::warn!(line, "skipping malformed config line");
                continue;
            };
            if !in_core {
                continue;
            }

            let key = caps[1].to_ascii_lowercase();
            let value = caps.get(2).map(|value| unquote(value.as_str().trim()));

            match key.as_str() {
                "filemode" => config.trust_executable_bit = parse_bool(value.as_deref()),
                "autocrlf" => {
                    config.line_endings = match value.as_deref() {
                        Some(value) if value.eq_ignore_ascii_case("input") => {
                            LineEndingPolicy::Always
                        }
                        value if parse_bool(value) => LineEndingPolicy::Native,
                        _ => LineEndingPolicy::Never,
                    }
                }
                "excludesfile" => {
                    config.excludes_file = value
                        .filter(|value| !value.is_empty())
                        .map(|value| expand_home(&value))
                }
                _ => {}
            }
        }

        Ok(config)
    }
}

/// A bare key counts as true, as git does
fn parse_bool(value: Option<&str>) -> bool {
    match value {
        None => true,
        Some(value) => matches!(
            value.to_ascii_lowercase().as_str(),
            "true" | "yes" | "on" | "1"
        ),
    }
}

fn strip_comment(line: &str) -> &str {
    let mut in_quotes = false;
    for (position, c) in line.char_indices() {
        match c {
            '"' => in_quotes = !in_quotes,
            '#' | ';' if !in_quotes => return &line[..position],
            _ => {}
        }
    }
    line
}

fn unquote(value: &str) -> String {
    value
        .strip_prefix('"')
        .and_then(|value| value.strip_suffix('"'))
        .unwrap_or(value)
        .to_string()
}

fn expand_home(value: &str) -> PathBuf {
    match (value.strip_prefix("~/"), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(value),
    }
}
