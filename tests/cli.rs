//! End-to-end checks of the `jsync` binary against a temporary database and tree.

use std::path::Path;

use tempfile::TempDir;

fn jsync(temp: &Path) -> assert_cmd::Command {
    let mut cmd = assert_cmd::cargo_bin_cmd!("jsync");
    cmd.env_remove("JSYNC_TEST_DB")
        .env("RUST_LOG", "warn")
        .arg("--db")
        .arg(temp.join("journal-sync.db"))
        .arg("--data-dir")
        .arg(temp.join("data"))
        .arg("--source")
        .arg("worlds");
    cmd
}

fn stdout_json(output: &std::process::Output) -> serde_json::Value {
    let stdout = String::from_utf8_lossy(&output.stdout);
    serde_json::from_str(stdout.trim()).unwrap_or_else(|e| panic!("bad json {stdout:?}: {e}"))
}

#[test]
fn version_reports_package_version() {
    let temp = TempDir::new().unwrap();
    let assert = jsync(temp.path()).arg("version").arg("--json").assert().success();
    let value = stdout_json(assert.get_output());
    assert_eq!(value["version"], env!("CARGO_PKG_VERSION"));
}

#[test]
fn commands_require_init() {
    let temp = TempDir::new().unwrap();
    let assert = jsync(temp.path()).arg("plan").arg("--json").assert().code(2);
    let stderr = String::from_utf8_lossy(&assert.get_output().stderr);
    assert!(stderr.contains("NOT_INITIALIZED"), "stderr: {stderr:?}");
}

#[test]
fn record_round_trips_through_the_tree() {
    let temp = TempDir::new().unwrap();
    jsync(temp.path()).arg("init").assert().success();
    assert!(temp.path().join("data/worlds").is_dir());

    let assert = jsync(temp.path())
        .args(["folder", "create", "People"])
        .assert()
        .success();
    let folder = stdout_json(assert.get_output());
    let folder_id = folder["id"].as_str().unwrap().to_string();

    let assert = jsync(temp.path())
        .args(["record", "create", "Ann", "--content", "A sailor", "--folder", &folder_id])
        .assert()
        .success();
    let record = stdout_json(assert.get_output());
    let record_id = record["id"].as_str().unwrap().to_string();
    assert_eq!(record["export_dirty"], true);

    let assert = jsync(temp.path()).arg("sync").assert().success();
    let sync = stdout_json(assert.get_output());
    assert_eq!(sync["summary"]["directories"], 2);
    assert_eq!(sync["summary"]["exported"], 1);
    assert_eq!(sync["summary"]["failed"], 0);

    let file = temp
        .path()
        .join("data/worlds/world/People")
        .join(format!("Ann ({record_id}).md"));
    assert_eq!(std::fs::read_to_string(&file).unwrap(), "A sailor");

    let assert = jsync(temp.path()).arg("plan").assert().success();
    let plan = stdout_json(assert.get_output());
    assert_eq!(plan["actions"].as_array().unwrap().len(), 0);

    std::fs::write(temp.path().join("data/worlds/world/Notes.md"), "Fresh notes").unwrap();
    let assert = jsync(temp.path())
        .args(["sync", "--direction", "import"])
        .assert()
        .success();
    let sync = stdout_json(assert.get_output());
    assert_eq!(sync["summary"]["imported"], 1);

    let assert = jsync(temp.path())
        .args(["record", "show", "Notes"])
        .assert()
        .success();
    let notes = stdout_json(assert.get_output());
    assert_eq!(notes["content"], "Fresh notes");
}
