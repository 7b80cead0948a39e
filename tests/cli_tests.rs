use assert_fs::TempDir;
use predicates::prelude::*;
use pretty_assertions::assert_eq;
use rstest::rstest;

mod common;
use common::command::{
    conflicted_repository_dir, git_commit_all, git_output, init_repository_dir,
    run_bit_command,
};
use common::file::{FileSpec, read_file, write_file};

#[rstest]
fn status_prints_changed_paths(init_repository_dir: TempDir) {
    let dir = init_repository_dir.path();
    write_file(FileSpec::new(dir.join("1.txt"), "changed".to_string()));
    write_file(FileSpec::new(dir.join("new.txt"), "new".to_string()));

    run_bit_command(dir, &["status"])
        .assert()
        .success()
        .stdout(" MM 1.txt\n AA new.txt\n");
}

#[rstest]
fn status_of_a_clean_tree_prints_nothing(init_repository_dir: TempDir) {
    run_bit_command(init_repository_dir.path(), &["status"])
        .assert()
        .success()
        .stdout("");
}

#[rstest]
fn status_all_includes_unchanged_paths(init_repository_dir: TempDir) {
    run_bit_command(init_repository_dir.path(), &["status", "--all", "a"])
        .assert()
        .success()
        .stdout("    a/2.txt\n    a/b/3.txt\n");
}

#[rstest]
fn status_paths_are_relative_to_the_current_directory(init_repository_dir: TempDir) {
    let dir = init_repository_dir.path();
    write_file(FileSpec::new(dir.join("a/b/3.txt"), "changed".to_string()));
    write_file(FileSpec::new(dir.join("1.txt"), "changed".to_string()));

    run_bit_command(&dir.join("a"), &["status", "b"])
        .assert()
        .success()
        .stdout(" MM a/b/3.txt\n");
}

#[rstest]
fn status_against_another_revision(init_repository_dir: TempDir) {
    let dir = init_repository_dir.path();
    write_file(FileSpec::new(dir.join("1.txt"), "uno".to_string()));
    git_commit_all(dir, "Second commit");

    run_bit_command(dir, &["status", "--revision", "HEAD~1"])
        .assert()
        .success()
        .stdout("M M 1.txt\n");
}

#[rstest]
fn status_outside_the_working_tree_fails(init_repository_dir: TempDir) {
    run_bit_command(init_repository_dir.path(), &["status", "../elsewhere"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("outside the working tree"));
}

#[test]
fn status_outside_a_repository_fails() {
    let dir = TempDir::new().expect("Failed to create temp dir");

    run_bit_command(dir.path(), &["status"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not a git repository"));
}

#[rstest]
fn conflicts_prints_git_codes(conflicted_repository_dir: TempDir) {
    run_bit_command(conflicted_repository_dir.path(), &["conflicts"])
        .assert()
        .success()
        .stdout("UU f.txt\n");
}

#[rstest]
fn status_marks_conflicts_in_every_column(conflicted_repository_dir: TempDir) {
    run_bit_command(conflicted_repository_dir.path(), &["status"])
        .assert()
        .success()
        .stdout(predicate::str::contains("UUU f.txt\n"));
}

#[rstest]
fn check_ignore_exit_code_follows_the_decision(init_repository_dir: TempDir) {
    let dir = init_repository_dir.path();
    write_file(FileSpec::new(dir.join(".gitignore"), "*.log\n".to_string()));

    run_bit_command(dir, &["check-ignore", "debug.log", "1.txt"])
        .assert()
        .success()
        .stdout("debug.log\n");

    run_bit_command(dir, &["check-ignore", "1.txt"])
        .assert()
        .code(1)
        .stdout("");
}

#[rstest]
fn check_ignore_verbose_names_the_rule(init_repository_dir: TempDir) {
    let dir = init_repository_dir.path();
    write_file(FileSpec::new(
        dir.join(".gitignore"),
        "# logs\n*.log\n".to_string(),
    ));

    run_bit_command(dir, &["check-ignore", "-v", "debug.log"])
        .assert()
        .success()
        .stdout(".gitignore:2:*.log\tdebug.log\n");
}

#[rstest]
fn ignore_and_unignore_edit_the_ignore_file(init_repository_dir: TempDir) {
    let dir = init_repository_dir.path();
    write_file(FileSpec::new(dir.join("notes.md"), "notes".to_string()));

    run_bit_command(dir, &["ignore", "notes.md"])
        .assert()
        .success()
        .stdout("updated .gitignore\n");
    assert_eq!(read_file(&dir.join(".gitignore")), "/notes.md\n");

    run_bit_command(dir, &["status", "--all", "notes.md"])
        .assert()
        .success()
        .stdout(" !! notes.md\n");

    run_bit_command(dir, &["unignore", "notes.md"])
        .assert()
        .success()
        .stdout("updated .gitignore\n");
    assert_eq!(read_file(&dir.join(".gitignore")), "");
}

#[rstest]
fn hash_object_agrees_with_git(init_repository_dir: TempDir) {
    let dir = init_repository_dir.path();
    write_file(FileSpec::new(dir.join("new.txt"), "some content\n".to_string()));
    let expected = git_output(dir, &["hash-object", "new.txt"]);

    run_bit_command(dir, &["hash-object", "new.txt"])
        .assert()
        .success()
        .stdout(format!("{expected}\n"));
}

#[rstest]
fn hash_object_rejects_directories(init_repository_dir: TempDir) {
    run_bit_command(init_repository_dir.path(), &["hash-object", "a"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("is not a file"));
}

#[rstest]
fn compare_prints_name_status(init_repository_dir: TempDir) {
    let dir = init_repository_dir.path();
    write_file(FileSpec::new(dir.join("1.txt"), "uno".to_string()));
    std::fs::remove_file(dir.join("a/2.txt")).expect("remove");
    git_commit_all(dir, "Second commit");

    run_bit_command(dir, &["compare", "HEAD~1", "HEAD"])
        .assert()
        .success()
        .stdout("M\t1.txt\nD\ta/2.txt\n");

    run_bit_command(dir, &["compare", "HEAD~1", "HEAD", "a"])
        .assert()
        .success()
        .stdout("D\ta/2.txt\n");
}

#[rstest]
fn compare_unknown_revision_fails(init_repository_dir: TempDir) {
    run_bit_command(init_repository_dir.path(), &["compare", "HEAD", "nope"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("nope"));
}
