use std::fs;
use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

struct Fixture {
    _root: TempDir,
    managed: std::path::PathBuf,
    store: std::path::PathBuf,
    config: std::path::PathBuf,
}

impl Fixture {
    /// Store with `web01 -> testapp -> [xavier, donalias]` and a validator
    /// that accepts everything.
    fn new() -> Self {
        Self::with_validator("program: \"true\"\n  args: []")
    }

    fn with_validator(validator_yaml: &str) -> Self {
        let root = TempDir::new().unwrap();
        let managed = root.path().join("sudoers.d");
        let store = root.path().join("store");
        fs::create_dir_all(&managed).unwrap();
        write(
            &store.join("nodes").join("web01.yaml"),
            "apps:\n  - name: testapp\n",
        );
        write(
            &store.join("apps").join("testapp.yaml"),
            "users:\n  - xavier\n  - donalias\n",
        );

        let config = root.path().join("config.yaml");
        write(
            &config,
            &format!(
                "path: {}\nstore: {}\nvalidator:\n  {validator_yaml}\n",
                managed.display(),
                store.display()
            ),
        );

        Self {
            _root: root,
            managed,
            store,
            config,
        }
    }

    fn cmd(&self) -> Command {
        let mut cmd = Command::cargo_bin("pp-sudoers").unwrap();
        cmd.arg("--config").arg(&self.config).arg("--host").arg("web01");
        cmd
    }
}

fn write(path: &Path, contents: &str) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, contents).unwrap();
}

#[test]
fn render_prints_the_grant_line() {
    Command::cargo_bin("pp-sudoers")
        .unwrap()
        .args(["render", "testapp", "xavier", "donalias"])
        .assert()
        .success()
        .stdout("xavier, donalias ALL = (testapp) ALL\n");
}

#[test]
fn sync_installs_desired_and_removes_stale() {
    let fx = Fixture::new();
    fs::write(fx.managed.join("pp-nope"), "bob ALL = (nope) ALL").unwrap();
    fs::write(fx.managed.join("ignore"), "root ALL = (ALL) ALL").unwrap();

    fx.cmd()
        .arg("sync")
        .assert()
        .success()
        .stdout(predicate::str::contains("testapp: wrote new sudoers"))
        .stdout(predicate::str::contains("removed stale sudoers"));

    assert_eq!(
        fs::read_to_string(fx.managed.join("pp-testapp")).unwrap(),
        "xavier, donalias ALL = (testapp) ALL"
    );
    assert!(!fx.managed.join("pp-nope").exists());
    assert!(fx.managed.join("ignore").exists());

    fx.cmd()
        .arg("sync")
        .assert()
        .success()
        .stdout(predicate::str::contains("testapp: no change to sudoers"));
}

#[cfg(unix)]
#[test]
fn rejected_grant_is_reported_and_not_written() {
    let fx = Fixture::with_validator(
        "program: sh\n  args: [\"-c\", \"if grep -q '[$]' \\\"$1\\\"; then exit 1; fi\", check]",
    );
    write(
        &fx.store.join("apps").join("testapp.yaml"),
        "users:\n  - \"$%$%$((%$\"\n",
    );

    fx.cmd()
        .arg("sync")
        .assert()
        .success()
        .stderr(predicate::str::contains("testapp: could not validate sudoers"));

    assert!(!fx.managed.join("pp-testapp").exists());
}

#[test]
fn sync_json_reports_the_pass() {
    let fx = Fixture::new();

    let output = fx.cmd().args(["sync", "--json"]).output().unwrap();
    assert!(output.status.success());
    let payload: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();

    assert_eq!(payload["host"], "web01");
    assert_eq!(payload["report"]["installed"][0], "testapp");
    assert!(payload["events"][0]
        .as_str()
        .unwrap()
        .starts_with("testapp: wrote new sudoers"));
}

#[test]
fn missing_intent_fails_without_touching_files() {
    let fx = Fixture::new();
    fs::write(fx.managed.join("pp-existing"), "alice ALL = (existing) ALL").unwrap();

    Command::cargo_bin("pp-sudoers")
        .unwrap()
        .arg("--config")
        .arg(&fx.config)
        .args(["--host", "db01", "sync"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("db01"));

    assert!(fx.managed.join("pp-existing").exists());
}

#[test]
fn status_json_lists_pending_work_without_writing() {
    let fx = Fixture::new();
    fs::write(fx.managed.join("pp-nope"), "bob ALL = (nope) ALL").unwrap();

    let output = fx.cmd().args(["status", "--json"]).output().unwrap();
    assert!(output.status.success());
    let payload: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();

    assert_eq!(payload["converged"], false);
    assert_eq!(payload["grants"][0]["app"], "testapp");
    assert_eq!(payload["grants"][0]["status"], "missing");
    assert_eq!(payload["stale"][0], "pp-nope");
    assert!(!fx.managed.join("pp-testapp").exists());
    assert!(fx.managed.join("pp-nope").exists());
}

#[test]
fn diff_shows_rendered_change() {
    let fx = Fixture::new();
    fs::write(fx.managed.join("pp-testapp"), "don ALL = (testapp) ALL").unwrap();

    fx.cmd()
        .arg("diff")
        .assert()
        .success()
        .stdout(predicate::str::contains("-don ALL = (testapp) ALL"))
        .stdout(predicate::str::contains(
            "+xavier, donalias ALL = (testapp) ALL",
        ));
}

#[test]
fn path_flag_overrides_config() {
    let fx = Fixture::new();
    let other = TempDir::new().unwrap();

    fx.cmd()
        .arg("--path")
        .arg(other.path())
        .arg("sync")
        .assert()
        .success();

    assert!(other.path().join("pp-testapp").exists());
    assert!(!fx.managed.join("pp-testapp").exists());
}
