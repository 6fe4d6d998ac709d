use assert_cmd::Command;

fn bookstore(config_dir: &std::path::Path) -> Command {
    let mut cmd = Command::cargo_bin("bookstore").unwrap();
    cmd.env("BOOKSTORE_CONFIG_DIR", config_dir)
        .env_remove("BOOKSTORE_ENV")
        .env_remove("RUST_LOG");
    cmd
}

fn stdout(output: &std::process::Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

#[test]
fn help_lists_commands() {
    let dir = tempfile::tempdir().unwrap();
    let output = bookstore(dir.path()).arg("--help").output().unwrap();

    assert!(output.status.success());
    let text = stdout(&output);
    for command in ["serve", "migrate", "favorites"] {
        assert!(text.contains(command), "missing {command} in help");
    }
}

#[test]
fn migrate_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("data").join("bookstore.db");

    let first = bookstore(dir.path())
        .args(["migrate", "--database"])
        .arg(&db)
        .output()
        .unwrap();
    assert!(first.status.success());
    assert!(stdout(&first).contains("applied 1 migration(s)"));
    assert!(db.exists());

    let second = bookstore(dir.path())
        .args(["migrate", "--database"])
        .arg(&db)
        .output()
        .unwrap();
    assert!(second.status.success());
    assert!(stdout(&second).contains("applied 0 migration(s)"));
}

#[test]
fn favorites_list_on_fresh_database_is_empty() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("bookstore.db");

    let output = bookstore(dir.path())
        .args(["favorites", "list", "--database"])
        .arg(&db)
        .output()
        .unwrap();
    assert!(output.status.success());
    assert_eq!(stdout(&output).trim(), "[]");

    let output = bookstore(dir.path())
        .env("BOOKSTORE_DATABASE__PATH", &db)
        .args(["favorites", "clear"])
        .output()
        .unwrap();
    assert!(output.status.success());
    assert!(stdout(&output).contains("favorites cleared"));
}

#[test]
fn unknown_environment_fails() {
    let dir = tempfile::tempdir().unwrap();
    let output = bookstore(dir.path())
        .env("BOOKSTORE_ENV", "qa")
        .arg("migrate")
        .output()
        .unwrap();
    assert!(!output.status.success());
}
