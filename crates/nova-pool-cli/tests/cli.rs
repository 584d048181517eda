use assert_cmd::Command;
use assert_fs::prelude::*;
use assert_fs::TempDir;
use predicates::prelude::*;

fn nova_pool(workdir: &TempDir) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("nova-pool"));
    cmd.current_dir(workdir.path()).env_remove("NOVA_POOL_DIR");
    cmd
}

#[test]
fn help_mentions_core_commands() {
    let workdir = TempDir::new().unwrap();
    nova_pool(&workdir)
        .arg("--help")
        .assert()
        .success()
        .stdout(
            predicate::str::contains("get")
                .and(predicate::str::contains("set"))
                .and(predicate::str::contains("delete"))
                .and(predicate::str::contains("clear"))
                .and(predicate::str::contains("status")),
        );
}

#[test]
fn set_then_get_roundtrips_across_invocations() {
    let workdir = TempDir::new().unwrap();
    let pool_dir = workdir.child("pool");

    nova_pool(&workdir)
        .args(["set", "greeting", "hello"])
        .arg("--dir")
        .arg(pool_dir.path())
        .assert()
        .success()
        .stdout("ok\n");

    nova_pool(&workdir)
        .args(["get", "greeting", "--dir"])
        .arg(pool_dir.path())
        .assert()
        .success()
        .stdout("hello\n");

    pool_dir.child("CACHE.DIC").assert(predicate::path::is_file());
    pool_dir.child("greeting.item").assert(predicate::path::is_file());
}

#[test]
fn miss_exits_with_one_and_json_reports_hit_flag() {
    let workdir = TempDir::new().unwrap();
    let pool_dir = workdir.child("pool");

    let output = nova_pool(&workdir)
        .args(["get", "absent", "--json", "--dir"])
        .arg(pool_dir.path())
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));

    let v: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(v["key"], "absent");
    assert_eq!(v["hit"], false);
    assert!(v["value"].is_null());
}

#[test]
fn invalid_key_exits_with_two() {
    let workdir = TempDir::new().unwrap();
    nova_pool(&workdir)
        .args(["get", "../escape", "--dir"])
        .arg(workdir.child("pool").path())
        .assert()
        .code(2)
        .stderr(predicate::str::contains("invalid cache key"));
}

#[test]
fn deferred_set_delete_and_clear() {
    let workdir = TempDir::new().unwrap();
    let pool_dir = workdir.child("pool");
    let run = |args: &[&str]| {
        let mut cmd = nova_pool(&workdir);
        cmd.args(args).arg("--dir").arg(pool_dir.path());
        cmd
    };

    run(&["set", "a", "1", "--deferred"]).assert().success();
    run(&["set", "b", "2"]).assert().success();
    run(&["has", "a"]).assert().success().stdout("true\n");

    let output = run(&["keys", "--json"]).output().unwrap();
    let keys: Vec<String> = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(keys, ["a", "b"]);

    run(&["delete", "a"]).assert().success();
    run(&["has", "a"]).assert().code(1).stdout("false\n");

    // One unknown key in a batch delete reports failure.
    run(&["delete", "b", "zzz"]).assert().code(1).stdout("failed\n");
    run(&["has", "b"]).assert().code(1);

    run(&["set", "c", "3"]).assert().success();
    run(&["clear"]).assert().success();
    pool_dir.child("CACHE.DIC").assert(predicate::path::missing());
    pool_dir.child("c.item").assert(predicate::path::missing());
}

#[test]
fn directory_can_come_from_env_or_config() {
    let workdir = TempDir::new().unwrap();
    let env_dir = workdir.child("from-env");
    let config_dir = workdir.child("from-config");
    workdir
        .child("nova-pool.toml")
        .write_str(&format!(
            "[pool]\ndirectory = {:?}\n",
            config_dir.path().display().to_string()
        ))
        .unwrap();

    nova_pool(&workdir)
        .args(["set", "k", "v"])
        .assert()
        .success();
    config_dir.child("k.item").assert(predicate::path::is_file());

    nova_pool(&workdir)
        .args(["set", "k", "v"])
        .env("NOVA_POOL_DIR", env_dir.path())
        .assert()
        .success();
    env_dir.child("k.item").assert(predicate::path::is_file());
}

#[test]
fn status_json_reports_entries() {
    let workdir = TempDir::new().unwrap();
    let pool_dir = workdir.child("pool");
    nova_pool(&workdir)
        .args(["set", "a", "1", "--dir"])
        .arg(pool_dir.path())
        .assert()
        .success();

    let output = nova_pool(&workdir)
        .args(["status", "--json", "--dir"])
        .arg(pool_dir.path())
        .output()
        .unwrap();
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let v: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(v["entries"], 1);
    assert_eq!(v["index_exists"], true);
}
