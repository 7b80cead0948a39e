//! Single ignore rule compiled from one line of an ignore file
//!
//! Lines follow gitignore syntax. The glob engine underneath does not honour
//! backslash escapes, so escapes are rewritten to one-character bracket
//! classes before compilation: `\*` becomes `[*]`.

use glob::{MatchOptions, Pattern};
use std::path::{Path, PathBuf};

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// One compiled ignore rule
#[derive(Debug, Clone)]
pub struct IgnoreRule {
    /// File the rule was read from
    pub source_file: PathBuf,
    /// 1-based line number in `source_file`
    pub line: usize,
    /// Directory the rule is relative to, repository-relative
    pub source_dir: PathBuf,
    /// The line as written, minus trailing whitespace
    pub text: String,
    pub negated: bool,
    pub directory_only: bool,
    pub anchored: bool,
    /// True when the rule names exactly one path, without wildcards
    pub literal: bool,
    glob: Pattern,
}

impl IgnoreRule {
    /// Compile one ignore-file line; blank lines, comments and lines that do
    /// not form a valid pattern yield None.
    pub fn compile(line: &str, source_dir: &Path, source_file: &Path) -> Option<IgnoreRule> {
        Self::compile_at(line, 0, source_dir, source_file)
    }

    pub(crate) fn compile_at(
        line: &str,
        line_number: usize,
        source_dir: &Path,
        source_file: &Path,
    ) -> Option<IgnoreRule> {
        let text = trim_trailing_spaces(line.trim_end_matches(['\r', '\n']));
        if text.is_empty() || text.starts_with('#') {
            return None;
        }

        let (negated, mut body) = match text.strip_prefix('!') {
            Some(rest) => (true, rest),
            None => (false, text),
        };

        let directory_only = body.ends_with('/') && !body.ends_with("\\/");
        if directory_only {
            body = body.trim_end_matches('/');
        }

        let anchored = body.starts_with('/') || body.contains('/');
        body = body.strip_prefix('/').unwrap_or(body);
        if body.is_empty() {
            return None;
        }

        let (glob_text, literal) = translate(body);
        let glob = match Pattern::new(&glob_text) {
            Ok(glob) => glob,
            Err(err) => {
                tracing::warn!(line = text, file = ?source_file, %err, "skipping invalid ignore pattern");
                return None;
            }
        };

        Some(IgnoreRule {
            source_file: source_file.to_path_buf(),
            line: line_number,
            source_dir: source_dir.to_path_buf(),
            text: text.to_string(),
            negated,
            directory_only,
            anchored,
            literal,
            glob,
        })
    }

    /// Whether the rule applies to the repository-relative `path`
    pub fn matches(&self, path: &Path, is_dir: bool) -> bool {
        if self.directory_only && !is_dir {
            return false;
        }

        let Ok(relative) = path.strip_prefix(&self.source_dir) else {
            return false;
        };
        if relative.as_os_str().is_empty() {
            return false;
        }

        if self.anchored {
            self.glob
                .matches_with(&relative.to_string_lossy(), MATCH_OPTIONS)
        } else {
            relative.file_name().is_some_and(|name| {
                self.glob
                    .matches_with(&name.to_string_lossy(), MATCH_OPTIONS)
            })
        }
    }
}

/// Turn a literal file name into a pattern fragment matching only that name.
///
/// Wildcards become one-character classes (`fi*le` -> `fi[*]le`); a leading
/// `#` or `!` and trailing spaces are escaped so the line is not misread.
pub fn escape_literal(name: &str) -> String {
    let mut escaped = Pattern::escape(name);

    if escaped.starts_with('#') || escaped.starts_with('!') {
        escaped.insert(0, '\\');
    }

    let trimmed = escaped.trim_end_matches(' ');
    let trailing = escaped.len() - trimmed.len();
    if trailing > 0 {
        escaped = format!("{trimmed}{}", "[ ]".repeat(trailing));
    }

    escaped
}

/// Drop trailing spaces unless escaped with a backslash
fn trim_trailing_spaces(line: &str) -> &str {
    let mut end = line.len();
    while end > 0 && line.as_bytes()[end - 1] == b' ' {
        let backslashes = line.as_bytes()[..end - 1]
            .iter()
            .rev()
            .take_while(|&&b| b == b'\\')
            .count();
        if backslashes % 2 == 1 {
            break;
        }
        end -= 1;
    }
    &line[..end]
}

/// Rewrite gitignore glob syntax into the `glob` crate's dialect.
///
/// Returns the pattern and whether it is free of wildcards.
fn translate(pattern: &str) -> (String, bool) {
    let chars = pattern.chars().collect::<Vec<_>>();
    let mut out = String::with_capacity(pattern.len() + 8);
    let mut literal = true;
    let mut i = 0;

    while i < chars.len() {
        match chars[i] {
            '\\' => {
                // a trailing lone backslash matches nothing in git; drop it
                if let Some(next) = chars.get(i + 1) {
                    out.push_str(&Pattern::escape(&next.to_string()));
                }
                i += 2;
            }
            '*' => {
                let start = i;
                while i < chars.len() && chars[i] == '*' {
                    i += 1;
                }
                let whole_segment = (start == 0 || chars[start - 1] == '/')
                    && (i == chars.len() || chars[i] == '/');
                if i - start >= 2 && whole_segment {
                    out.push_str("**");
                } else {
                    out.push('*');
                }
                literal = false;
            }
            '?' => {
                out.push('?');
                literal = false;
                i += 1;
            }
            '[' => match bracket_class(&chars, i) {
                Some((class, end, single)) => {
                    out.push_str(&class);
                    literal &= single;
                    i = end + 1;
                }
                None => {
                    out.push_str("[[]");
                    i += 1;
                }
            },
            c => {
                out.push(c);
                i += 1;
            }
        }
    }

    (out, literal)
}

/// Parse the bracket expression opening at `start`.
///
/// Returns the translated class, the index of its closing `]`, and whether
/// it matches exactly one character.
fn bracket_class(chars: &[char], start: usize) -> Option<(String, usize, bool)> {
    let mut j = start + 1;
    let negated = matches!(chars.get(j), Some('!') | Some('^'));
    if negated {
        j += 1;
    }
    let content_start = j;
    if chars.get(j) == Some(&']') {
        j += 1;
    }
    while j < chars.len() && chars[j] != ']' {
        if chars[j] == '\\' {
            j += 1;
        }
        j += 1;
    }
    if j >= chars.len() {
        return None;
    }

    let mut members = Vec::new();
    let mut k = content_start;
    while k < j {
        if chars[k] == '\\' && k + 1 < j {
            k += 1;
        }
        members.push(chars[k]);
        k += 1;
    }

    let is_range = members.len() == 3 && members[1] == '-';
    let single = !negated && members.len() == 1;
    let mut class = String::from("[");
    if negated {
        class.push('!');
    }
    class.extend(members.iter());
    class.push(']');

    Some((class, j, single && !is_range))
}
