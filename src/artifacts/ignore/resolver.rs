//! Ignore decisions for repository paths
//!
//! Rules come from, least specific first: the global excludes file, every
//! `.gitignore` from the repository root down to the path's parent, then
//! `.git/info/exclude`. The last matching rule in that order wins. A path
//! inside an ignored directory is ignored whatever rules below it say.

use crate::artifacts::ignore::pattern::IgnoreRule;
use crate::artifacts::ignore::{EXCLUDE_FILE, IGNORE_FILE_NAME};
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Outcome of resolving one path against every ignore source
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IgnoreDecision {
    pub ignored: bool,
    /// The deciding rule was a negation
    pub negated: bool,
    /// File holding the deciding rule
    pub defining_file: Option<PathBuf>,
    pub pattern: Option<String>,
    pub line: Option<usize>,
}

impl IgnoreDecision {
    fn from_rule(rule: &IgnoreRule) -> Self {
        IgnoreDecision {
            ignored: !rule.negated,
            negated: rule.negated,
            defining_file: Some(rule.source_file.clone()),
            pattern: Some(rule.text.clone()),
            line: Some(rule.line),
        }
    }
}

/// Resolves ignore decisions for one engine invocation.
///
/// Per-directory `.gitignore` files are read the first time a path below
/// them is asked about and cached until [`IgnoreResolver::reload`].
#[derive(Debug)]
pub struct IgnoreResolver {
    worktree: PathBuf,
    git_dir: PathBuf,
    excludes_file: Option<PathBuf>,
    global_rules: Vec<IgnoreRule>,
    exclude_rules: Vec<IgnoreRule>,
    directory_rules: HashMap<PathBuf, Vec<IgnoreRule>>,
    directory_decisions: HashMap<PathBuf, IgnoreDecision>,
}

impl IgnoreResolver {
    pub fn new(worktree: &Path, git_dir: &Path, excludes_file: Option<&Path>) -> Self {
        let mut resolver = IgnoreResolver {
            worktree: worktree.to_path_buf(),
            git_dir: git_dir.to_path_buf(),
            excludes_file: excludes_file.map(Path::to_path_buf),
            global_rules: Vec::new(),
            exclude_rules: Vec::new(),
            directory_rules: HashMap::new(),
            directory_decisions: HashMap::new(),
        };
        resolver.reload();
        resolver
    }

    /// Drop every cached rule and decision, re-reading the fixed sources
    pub fn reload(&mut self) {
        self.global_rules = match &self.excludes_file {
            Some(file) => load_rules(file, Path::new("")),
            None => Vec::new(),
        };
        self.exclude_rules = load_rules(&self.exclude_file_path(), Path::new(""));
        self.directory_rules.clear();
        self.directory_decisions.clear();
    }

    pub fn ignore_file_path(&self, dir: &Path) -> PathBuf {
        self.worktree.join(dir).join(IGNORE_FILE_NAME)
    }

    pub fn exclude_file_path(&self) -> PathBuf {
        self.git_dir.join(EXCLUDE_FILE)
    }

    /// Decide whether the repository-relative `path` is ignored
    #[tracing::instrument(level = "trace", skip(self))]
    pub fn is_ignored(&mut self, path: &Path, is_dir: bool) -> IgnoreDecision {
        if let Some(decision) = self.ignored_ancestor(path) {
            return decision;
        }

        self.direct_decision(path, is_dir)
    }

    /// The decision of the shallowest ignored directory containing `path`
    pub fn ignored_ancestor(&mut self, path: &Path) -> Option<IgnoreDecision> {
        let ancestors = parent_dirs(path);

        ancestors
            .into_iter()
            .filter(|dir| !dir.as_os_str().is_empty())
            .map(|dir| self.direct_decision(&dir, true))
            .find(|decision| decision.ignored)
    }

    /// Every rule from the path's own chain that matches it, in precedence
    /// order; ignored ancestors are not considered
    pub fn matching_rules(&mut self, path: &Path, is_dir: bool) -> Vec<IgnoreRule> {
        self.load_chain(path);

        self.chain(path)
            .into_iter()
            .filter(|rule| rule.matches(path, is_dir))
            .cloned()
            .collect()
    }

    fn direct_decision(&mut self, path: &Path, is_dir: bool) -> IgnoreDecision {
        if is_dir {
            if let Some(decision) = self.directory_decisions.get(path) {
                return decision.clone();
            }
        }

        self.load_chain(path);
        let decision = self
            .chain(path)
            .into_iter()
            .filter(|rule| rule.matches(path, is_dir))
            .last()
            .map(IgnoreDecision::from_rule)
            .unwrap_or_default();

        if is_dir {
            self.directory_decisions
                .insert(path.to_path_buf(), decision.clone());
        }

        decision
    }

    fn load_chain(&mut self, path: &Path) {
        for dir in parent_dirs(path) {
            if !self.directory_rules.contains_key(&dir) {
                let rules = load_rules(&self.ignore_file_path(&dir), &dir);
                self.directory_rules.insert(dir, rules);
            }
        }
    }

    /// Rules that can apply to `path`, least specific first
    fn chain(&self, path: &Path) -> Vec<&IgnoreRule> {
        let directory_rules = parent_dirs(path)
            .into_iter()
            .filter_map(|dir| self.directory_rules.get(&dir))
            .flatten();

        self.global_rules
            .iter()
            .chain(directory_rules)
            .chain(self.exclude_rules.iter())
            .collect()
    }
}

/// `""`, `a`, `a/b` for the path `a/b/c`
pub(crate) fn parent_dirs(path: &Path) -> Vec<PathBuf> {
    let mut dirs = path
        .ancestors()
        .skip(1)
        .map(Path::to_path_buf)
        .collect::<Vec<_>>();
    dirs.reverse();
    dirs
}

/// Read the rules of one ignore file. Missing files have no rules;
/// unreadable or non-UTF-8 files are logged and contribute none.
pub(crate) fn load_rules(file: &Path, source_dir: &Path) -> Vec<IgnoreRule> {
    let bytes = match std::fs::read(file) {
        Ok(bytes) => bytes,
        Err(err) if matches!(err.kind(), ErrorKind::NotFound | ErrorKind::NotADirectory) => {
            return Vec::new();
        }
        Err(err) => {
            tracing::warn!(?file, %err, "unable to read ignore file");
            return Vec::new();
        }
    };

    let Ok(content) = String::from_utf8(bytes) else {
        tracing::warn!(?file, "ignore file is not valid UTF-8");
        return Vec::new();
    };

    content
        .lines()
        .enumerate()
        .filter_map(|(index, line)| IgnoreRule::compile_at(line, index + 1, source_dir, file))
        .collect()
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
        dir.child(".git/info/exclude").write_str("# local\n").unwrap();
        dir
    }

    fn resolver(dir: &TempDir) -> IgnoreResolver {
        IgnoreResolver::new(dir.path(), &dir.path().join(".git"), None)
    }

    #[rstest]
    fn later_rules_override_earlier_ones(worktree: TempDir) {
        worktree
            .child(".gitignore")
            .write_str("*.log\n!keep.log\n")
            .unwrap();
        let mut resolver = resolver(&worktree);

        let dropped = resolver.is_ignored(Path::new("a.log"), false);
        let kept = resolver.is_ignored(Path::new("keep.log"), false);

        assert!(dropped.ignored);
        assert_eq!(dropped.line, Some(1));
        assert!(!kept.ignored);
        assert!(kept.negated);
        assert_eq!(
            kept.defining_file,
            Some(worktree.path().join(".gitignore"))
        );
    }

    #[rstest]
    fn deeper_files_override_shallower_ones(worktree: TempDir) {
        worktree.child(".gitignore").write_str("*.tmp\n").unwrap();
        worktree.child("sub/.gitignore").write_str("!*.tmp\n").unwrap();
        let mut resolver = resolver(&worktree);

        assert!(resolver.is_ignored(Path::new("a.tmp"), false).ignored);
        assert!(!resolver.is_ignored(Path::new("sub/a.tmp"), false).ignored);
        assert!(resolver.is_ignored(Path::new("other/a.tmp"), false).ignored);
    }

    #[rstest]
    fn info_exclude_is_most_specific(worktree: TempDir) {
        worktree.child("sub/.gitignore").write_str("!secret\n").unwrap();
        worktree.child(".git/info/exclude").write_str("secret\n").unwrap();
        let mut resolver = resolver(&worktree);

        let decision = resolver.is_ignored(Path::new("sub/secret"), false);

        assert!(decision.ignored);
        assert_eq!(
            decision.defining_file,
            Some(worktree.path().join(".git/info/exclude"))
        );
    }

    #[rstest]
    fn global_excludes_are_least_specific(worktree: TempDir) {
        worktree.child("global").write_str("*.bak\nnotes\n").unwrap();
        worktree.child(".gitignore").write_str("!notes\n").unwrap();
        let mut resolver = IgnoreResolver::new(
            worktree.path(),
            &worktree.path().join(".git"),
            Some(&worktree.path().join("global")),
        );

        assert!(resolver.is_ignored(Path::new("x.bak"), false).ignored);
        assert!(!resolver.is_ignored(Path::new("notes"), false).ignored);
    }

    #[rstest]
    fn ignored_directories_are_transitive(worktree: TempDir) {
        worktree.child(".gitignore").write_str("build/\n").unwrap();
        worktree.child("build/.gitignore").write_str("!keep\n").unwrap();
        let mut resolver = resolver(&worktree);

        let decision = resolver.is_ignored(Path::new("build/keep"), false);

        assert!(decision.ignored);
        assert_eq!(decision.pattern.as_deref(), Some("build/"));
        assert!(resolver.ignored_ancestor(Path::new("build/x/y")).is_some());
        assert!(resolver.ignored_ancestor(Path::new("src/x")).is_none());
    }

    #[rstest]
    fn non_utf8_file_contributes_nothing(worktree: TempDir) {
        worktree
            .child(".gitignore")
            .write_binary(b"*.o\n\xff\xfe\n")
            .unwrap();
        let mut resolver = resolver(&worktree);

        assert!(!resolver.is_ignored(Path::new("a.o"), false).ignored);
    }

    #[rstest]
    fn matching_rules_lists_the_whole_chain(worktree: TempDir) {
        worktree.child(".gitignore").write_str("*.log\n/a.log\n").unwrap();
        let mut resolver = resolver(&worktree);

        let rules = resolver
            .matching_rules(Path::new("a.log"), false)
            .into_iter()
            .map(|rule| rule.text)
            .collect::<Vec<_>>();

        assert_eq!(rules, vec!["*.log".to_string(), "/a.log".to_string()]);
    }

    #[rstest]
    fn reload_picks_up_edits(worktree: TempDir) {
        let mut resolver = resolver(&worktree);
        assert!(!resolver.is_ignored(Path::new("x"), false).ignored);

        worktree.child(".gitignore").write_str("x\n").unwrap();
        resolver.reload();

        assert!(resolver.is_ignored(Path::new("x"), false).ignored);
    }
}
