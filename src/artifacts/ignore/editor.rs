//! Editing ignore files so a path becomes ignored or stops being ignored
//!
//! Files keep their line endings; new files use `\n`. Only lines that
//! contradict the requested state are removed.

use crate::artifacts::ignore::IGNORE_FILE_NAME;
use crate::artifacts::ignore::pattern::{IgnoreRule, escape_literal};
use crate::artifacts::ignore::resolver::{IgnoreResolver, parent_dirs};
use anyhow::Context;
use std::path::{Path, PathBuf};

/// An ignore file loaded for editing
#[derive(Debug)]
struct IgnoreFile {
    path: PathBuf,
    source_dir: PathBuf,
    lines: Vec<String>,
    line_ending: &'static str,
    trailing_newline: bool,
    changed: bool,
}

impl IgnoreFile {
    fn load(path: &Path, source_dir: &Path) -> anyhow::Result<Self> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => String::new(),
            Err(err) => {
                return Err(err).with_context(|| format!("Unable to read {path:?}"));
            }
        };

        let line_ending = if content.contains("\r\n") { "\r\n" } else { "\n" };
        let trailing_newline = content.is_empty() || content.ends_with('\n');
        let lines = content
            .lines()
            .map(|line| line.trim_end_matches('\r').to_string())
            .collect();

        Ok(IgnoreFile {
            path: path.to_path_buf(),
            source_dir: source_dir.to_path_buf(),
            lines,
            line_ending,
            trailing_newline,
            changed: false,
        })
    }

    fn append(&mut self, line: String) {
        self.lines.push(line);
        self.trailing_newline = true;
        self.changed = true;
    }

    /// Remove every line whose compiled rule satisfies `predicate`
    fn remove_rules(&mut self, predicate: impl Fn(&IgnoreRule) -> bool) {
        let before = self.lines.len();
        let (source_dir, path) = (self.source_dir.clone(), self.path.clone());

        self.lines.retain(|line| {
            IgnoreRule::compile(line, &source_dir, &path)
                .map(|rule| !predicate(&rule))
                .unwrap_or(true)
        });

        self.changed |= self.lines.len() != before;
    }

    /// Write the file back if it changed; returns whether it was written
    fn save(&self) -> anyhow::Result<bool> {
        if !self.changed {
            return Ok(false);
        }

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Unable to create {parent:?}"))?;
        }

        let mut content = self.lines.join(self.line_ending);
        if self.trailing_newline && !self.lines.is_empty() {
            content.push_str(self.line_ending);
        }

        std::fs::write(&self.path, content)
            .with_context(|| format!("Unable to write {:?}", self.path))?;

        Ok(true)
    }
}

/// Adds and removes ignore rules on behalf of a resolver
pub struct IgnoreEditor<'r> {
    resolver: &'r mut IgnoreResolver,
}

impl<'r> IgnoreEditor<'r> {
    pub fn new(resolver: &'r mut IgnoreResolver) -> Self {
        IgnoreEditor { resolver }
    }

    /// Make `path` ignored. Returns the files changed; nothing changes when
    /// the path is already ignored.
    #[tracing::instrument(level = "debug", skip(self))]
    pub fn add(&mut self, path: &Path, is_dir: bool) -> anyhow::Result<Vec<PathBuf>> {
        if self.resolver.is_ignored(path, is_dir).ignored {
            tracing::debug!("already ignored");
            return Ok(Vec::new());
        }

        let target_dir = self.nearest_ignore_dir(path);
        let mut target = IgnoreFile::load(&self.resolver.ignore_file_path(&target_dir), &target_dir)?;
        let mut exclude = IgnoreFile::load(&self.resolver.exclude_file_path(), Path::new(""))?;

        let contradicts = |rule: &IgnoreRule| rule.negated && rule.matches(path, is_dir);
        target.remove_rules(contradicts);
        exclude.remove_rules(contradicts);
        target.append(Self::rule_for(path, &target_dir, is_dir, false)?);

        let changed = Self::save_all([&target, &exclude])?;
        self.resolver.reload();

        Ok(changed)
    }

    /// Make `path` not ignored. Returns the files changed; nothing changes
    /// when the path is not ignored, or when it is only ignored because an
    /// ancestor directory is.
    #[tracing::instrument(level = "debug", skip(self))]
    pub fn remove(&mut self, path: &Path, is_dir: bool) -> anyhow::Result<Vec<PathBuf>> {
        if !self.resolver.is_ignored(path, is_dir).ignored {
            tracing::debug!("not ignored");
            return Ok(Vec::new());
        }

        if let Some(ancestor) = self.resolver.ignored_ancestor(path) {
            tracing::warn!(
                rule = ancestor.pattern.as_deref().unwrap_or_default(),
                "path is inside an ignored directory; leaving ignore files untouched"
            );
            return Ok(Vec::new());
        }

        let mut files = parent_dirs(path)
            .into_iter()
            .filter(|dir| self.resolver.ignore_file_path(dir).is_file())
            .map(|dir| IgnoreFile::load(&self.resolver.ignore_file_path(&dir), &dir))
            .collect::<anyhow::Result<Vec<_>>>()?;
        files.push(IgnoreFile::load(&self.resolver.exclude_file_path(), Path::new(""))?);

        for file in files.iter_mut() {
            file.remove_rules(|rule| !rule.negated && rule.literal && rule.matches(path, is_dir));
        }
        let mut changed = Self::save_all(files.iter())?;
        self.resolver.reload();

        let remaining = self.resolver.is_ignored(path, is_dir);
        if remaining.ignored {
            let exclude_path = self.resolver.exclude_file_path();
            let (file_path, source_dir) = if remaining.defining_file.as_deref() == Some(exclude_path.as_path()) {
                (exclude_path, PathBuf::new())
            } else {
                let dir = self.nearest_ignore_dir(path);
                (self.resolver.ignore_file_path(&dir), dir)
            };

            let mut file = IgnoreFile::load(&file_path, &source_dir)?;
            file.append(Self::rule_for(path, &source_dir, is_dir, true)?);
            if file.save()? && !changed.contains(&file.path) {
                changed.push(file.path.clone());
            }
            self.resolver.reload();
        }

        Ok(changed)
    }

    /// Deepest directory between the root and `path` that already has an
    /// ignore file; the root when none does
    fn nearest_ignore_dir(&self, path: &Path) -> PathBuf {
        parent_dirs(path)
            .into_iter()
            .rev()
            .find(|dir| self.resolver.ignore_file_path(dir).is_file())
            .unwrap_or_default()
    }

    /// `/<relative path>` with each component escaped, `!` for negations and
    /// a trailing `/` for directories
    fn rule_for(path: &Path, dir: &Path, is_dir: bool, negated: bool) -> anyhow::Result<String> {
        let relative = path
            .strip_prefix(dir)
            .with_context(|| format!("{path:?} is not below {dir:?}"))?;

        let escaped = relative
            .components()
            .map(|component| escape_literal(&component.as_os_str().to_string_lossy()))
            .collect::<Vec<_>>()
            .join("/");

        let mut rule = format!("{}/{}", if negated { "!" } else { "" }, escaped);
        if is_dir {
            rule.push('/');
        }
        Ok(rule)
    }

    fn save_all<'f>(files: impl IntoIterator<Item = &'f IgnoreFile>) -> anyhow::Result<Vec<PathBuf>> {
        let mut changed = Vec::new();
        for file in files {
            if file.save()? {
                changed.push(file.path.clone());
            }
        }
        Ok(changed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_fs::TempDir;
    use assert_fs::prelude::*;
    use pretty_assertions::assert_eq;
    use rstest::{fixture, rstest};

    #[fixture]
    fn worktree() -> TempDir {
        let dir = TempDir::new().unwrap();
        dir.child(".git/info").create_dir_all().unwrap();
        dir
    }

    fn resolver(dir: &TempDir) -> IgnoreResolver {
        IgnoreResolver::new(dir.path(), &dir.path().join(".git"), None)
    }

    fn read(dir: &TempDir, file: &str) -> String {
        std::fs::read_to_string(dir.path().join(file)).unwrap()
    }

    #[rstest]
    fn add_creates_root_ignore_file(worktree: TempDir) {
        let mut resolver = resolver(&worktree);

        let changed = IgnoreEditor::new(&mut resolver)
            .add(Path::new("dir/fi*le"), false)
            .unwrap();

        assert_eq!(changed, vec![worktree.path().join(IGNORE_FILE_NAME)]);
        assert_eq!(read(&worktree, ".gitignore"), "/dir/fi[*]le\n");
        assert!(resolver.is_ignored(Path::new("dir/fi*le"), false).ignored);
        assert!(!resolver.is_ignored(Path::new("dir/fiXle"), false).ignored);
    }

    #[rstest]
    fn add_uses_nearest_ignore_file_and_keeps_crlf(worktree: TempDir) {
        worktree.child(".gitignore").write_str("*.o\n").unwrap();
        worktree.child("sub/.gitignore").write_str("# local\r\n!*.o").unwrap();
        let mut resolver = resolver(&worktree);

        let changed = IgnoreEditor::new(&mut resolver)
            .add(Path::new("sub/deep/out"), true)
            .unwrap();

        assert_eq!(changed, vec![worktree.path().join("sub/.gitignore")]);
        assert_eq!(read(&worktree, "sub/.gitignore"), "# local\r\n!*.o\r\n/deep/out/\r\n");
        assert_eq!(read(&worktree, ".gitignore"), "*.o\n");
    }

    #[rstest]
    fn add_strips_only_contradicting_negations(worktree: TempDir) {
        worktree
            .child(".gitignore")
            .write_str("*.log\n!a.log\n!b.log\n")
            .unwrap();
        worktree.child(".git/info/exclude").write_str("!a.log\n").unwrap();
        let mut resolver = resolver(&worktree);

        let changed = IgnoreEditor::new(&mut resolver)
            .add(Path::new("a.log"), false)
            .unwrap();

        assert_eq!(changed.len(), 2);
        assert_eq!(read(&worktree, ".gitignore"), "*.log\n!b.log\n/a.log\n");
        assert_eq!(read(&worktree, ".git/info/exclude"), "");
        assert!(!resolver.is_ignored(Path::new("b.log"), false).ignored);
    }

    #[rstest]
    fn add_is_a_no_op_for_ignored_paths(worktree: TempDir) {
        worktree.child(".gitignore").write_str("*.log\n").unwrap();
        let mut resolver = resolver(&worktree);

        let changed = IgnoreEditor::new(&mut resolver)
            .add(Path::new("x.log"), false)
            .unwrap();

        assert!(changed.is_empty());
        assert_eq!(read(&worktree, ".gitignore"), "*.log\n");
    }

    #[rstest]
    fn remove_drops_literal_rules(worktree: TempDir) {
        worktree
            .child(".gitignore")
            .write_str("/a.txt\nb.txt\n/dir/\n")
            .unwrap();
        let mut resolver = resolver(&worktree);

        let changed = IgnoreEditor::new(&mut resolver)
            .remove(Path::new("a.txt"), false)
            .unwrap();

        assert_eq!(changed, vec![worktree.path().join(".gitignore")]);
        assert_eq!(read(&worktree, ".gitignore"), "b.txt\n/dir/\n");
        assert!(!resolver.is_ignored(Path::new("a.txt"), false).ignored);
    }

    #[rstest]
    fn remove_negates_wildcard_rules(worktree: TempDir) {
        worktree.child(".gitignore").write_str("*.log\n").unwrap();
        let mut resolver = resolver(&worktree);

        let changed = IgnoreEditor::new(&mut resolver)
            .remove(Path::new("keep.log"), false)
            .unwrap();

        assert_eq!(changed, vec![worktree.path().join(".gitignore")]);
        assert_eq!(read(&worktree, ".gitignore"), "*.log\n!/keep.log\n");
        assert!(!resolver.is_ignored(Path::new("keep.log"), false).ignored);
        assert!(resolver.is_ignored(Path::new("other.log"), false).ignored);
    }

    #[rstest]
    fn remove_negates_in_info_exclude_when_it_decides(worktree: TempDir) {
        worktree.child(".gitignore").write_str("# nothing\n").unwrap();
        worktree.child(".git/info/exclude").write_str("*.swp\n").unwrap();
        let mut resolver = resolver(&worktree);

        let changed = IgnoreEditor::new(&mut resolver)
            .remove(Path::new("a.swp"), false)
            .unwrap();

        assert_eq!(changed, vec![worktree.path().join(".git/info/exclude")]);
        assert_eq!(read(&worktree, ".git/info/exclude"), "*.swp\n!/a.swp\n");
        assert!(!resolver.is_ignored(Path::new("a.swp"), false).ignored);
    }

    #[rstest]
    fn remove_inside_ignored_directory_changes_nothing(worktree: TempDir) {
        worktree.child(".gitignore").write_str("build/\n").unwrap();
        let mut resolver = resolver(&worktree);

        let changed = IgnoreEditor::new(&mut resolver)
            .remove(Path::new("build/out.o"), false)
            .unwrap();

        assert!(changed.is_empty());
        assert!(resolver.is_ignored(Path::new("build/out.o"), false).ignored);
    }

    #[rstest]
    fn add_then_remove_round_trips(worktree: TempDir) {
        worktree.child(".gitignore").write_str("# keep me\n*.tmp\n").unwrap();
        let mut resolver = resolver(&worktree);

        IgnoreEditor::new(&mut resolver)
            .add(Path::new("notes.md"), false)
            .unwrap();
        assert!(resolver.is_ignored(Path::new("notes.md"), false).ignored);

        IgnoreEditor::new(&mut resolver)
            .remove(Path::new("notes.md"), false)
            .unwrap();

        assert!(!resolver.is_ignored(Path::new("notes.md"), false).ignored);
        assert_eq!(read(&worktree, ".gitignore"), "# keep me\n*.tmp\n");
    }
}
