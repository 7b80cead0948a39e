use crate::common::file::{FileSpec, write_file};
use assert_cmd::Command;
use assert_fs::TempDir;
use rstest::fixture;
use std::path::Path;

const GIT_ENV: [(&str, &str); 8] = [
    ("GIT_AUTHOR_NAME", "fake_user"),
    ("GIT_AUTHOR_EMAIL", "fake_email@email.com"),
    ("GIT_AUTHOR_DATE", "2023-01-01 12:00:00 +0000"),
    ("GIT_COMMITTER_NAME", "fake_user"),
    ("GIT_COMMITTER_EMAIL", "fake_email@email.com"),
    ("GIT_COMMITTER_DATE", "2023-01-01 12:00:00 +0000"),
    ("GIT_CONFIG_NOSYSTEM", "1"),
    ("GIT_CONFIG_GLOBAL", "/dev/null"),
];

#[fixture]
pub fn repository_dir() -> TempDir {
    TempDir::new().expect("Failed to create temp dir")
}

/// Repository on `main` with `1.txt`, `a/2.txt` and `a/b/3.txt` committed
#[fixture]
pub fn init_repository_dir(repository_dir: TempDir) -> TempDir {
    git_init(repository_dir.path());

    let file1 = FileSpec::new(repository_dir.path().join("1.txt"), "one".to_string());
    write_file(file1);

    let file2 = FileSpec::new(
        repository_dir.path().join("a").join("2.txt"),
        "two".to_string(),
    );
    write_file(file2);

    let file3 = FileSpec::new(
        repository_dir.path().join("a").join("b").join("3.txt"),
        "three".to_string(),
    );
    write_file(file3);

    git(repository_dir.path(), &["add", "."]);
    git_commit(repository_dir.path(), "Initial commit");

    repository_dir
}

/// Repository in the middle of a merge where `f.txt` changed on both sides
#[fixture]
pub fn conflicted_repository_dir(repository_dir: TempDir) -> TempDir {
    let dir = repository_dir.path();
    git_init(dir);

    write_file(FileSpec::new(dir.join("f.txt"), "base\n".to_string()));
    write_file(FileSpec::new(dir.join("clean.txt"), "clean\n".to_string()));
    git(dir, &["add", "."]);
    git_commit(dir, "base");

    git(dir, &["checkout", "-q", "-b", "other"]);
    write_file(FileSpec::new(dir.join("f.txt"), "theirs\n".to_string()));
    git_commit_all(dir, "theirs");

    git(dir, &["checkout", "-q", "main"]);
    write_file(FileSpec::new(dir.join("f.txt"), "ours\n".to_string()));
    git_commit_all(dir, "ours");

    run_git_command(dir, &["merge", "-q", "other"])
        .assert()
        .failure();

    repository_dir
}

pub fn run_bit_command(dir: &Path, args: &[&str]) -> Command {
    let mut cmd = Command::cargo_bin("bit-status").expect("Failed to find bit-status binary");
    cmd.envs(vec![("BIT_STATUS_NO_COLOR", "1"), ("RUST_LOG", "error")]);
    cmd.current_dir(dir);
    for arg in args {
        cmd.arg(arg);
    }
    cmd
}

pub fn run_git_command(dir: &Path, args: &[&str]) -> Command {
    let mut cmd = Command::new("git");
    cmd.envs(GIT_ENV);
    cmd.current_dir(dir);
    for arg in args {
        cmd.arg(arg);
    }
    cmd
}

pub fn git(dir: &Path, args: &[&str]) {
    run_git_command(dir, args).assert().success();
}

pub fn git_output(dir: &Path, args: &[&str]) -> String {
    let output = run_git_command(dir, args).assert().success();
    String::from_utf8(output.get_output().stdout.clone())
        .expect("git output is not UTF-8")
        .trim()
        .to_string()
}

pub fn git_init(dir: &Path) {
    git(dir, &["init", "-q"]);
    git(dir, &["symbolic-ref", "HEAD", "refs/heads/main"]);
}

pub fn git_commit(dir: &Path, message: &str) {
    git(dir, &["commit", "-q", "-m", message]);
}

pub fn git_commit_all(dir: &Path, message: &str) {
    git(dir, &["commit", "-q", "-a", "-m", message]);
}
