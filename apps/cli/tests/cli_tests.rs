//! CLI 集成测试
//!
//! 通过 `assert_cmd` 运行二进制；配置和数据目录指向临时目录。

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn cli(home: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("servolink-cli").unwrap();
    cmd.env("XDG_CONFIG_HOME", home.path().join("config"))
        .env("XDG_DATA_HOME", home.path().join("data"))
        .env("HOME", home.path())
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_set_writes_command_to_stdout() {
    let home = TempDir::new().unwrap();
    cli(&home)
        .args(["set", "--servo", "0", "--angle", "45", "--stdout"])
        .assert()
        .success()
        .stdout("{\"angle\":45.0,\"servo\":0}\n");
}

#[test]
fn test_set_rejects_invalid_angle() {
    let home = TempDir::new().unwrap();
    cli(&home)
        .args(["set", "--servo", "0", "--angle", "NaN", "--stdout"])
        .assert()
        .failure();
}

#[test]
fn test_set_without_port_fails() {
    let home = TempDir::new().unwrap();
    cli(&home)
        .args(["set", "--servo", "0", "--angle", "45"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--port"));
}

#[test]
fn test_pose_save_list_show_apply() {
    let home = TempDir::new().unwrap();
    let store = home.path().join("poses.json");
    let store = store.to_str().unwrap();

    cli(&home)
        .args(["pose", "--store", store, "save", "stand", "--angles", "0=90,1=45.5"])
        .assert()
        .success();
    cli(&home)
        .args(["pose", "--store", store, "save", "crouch", "--angles", "0=30"])
        .assert()
        .success();

    cli(&home)
        .args(["pose", "--store", store, "list"])
        .assert()
        .success()
        .stdout("crouch\nstand\n");

    cli(&home)
        .args(["pose", "--store", store, "show", "stand"])
        .assert()
        .success()
        .stdout(predicate::str::contains("1: 45.5°"));

    cli(&home)
        .args(["pose", "--store", store, "apply", "stand", "--stdout"])
        .assert()
        .success()
        .stdout("{\"name\":\"stand\",\"pose\":{\"0\":90.0,\"1\":45.5}}\n");
}

#[test]
fn test_pose_apply_missing() {
    let home = TempDir::new().unwrap();
    let store = home.path().join("poses.json");

    cli(&home)
        .args(["pose", "apply", "wave", "--stdout", "--store"])
        .arg(&store)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Pose not found: wave"));
}

#[test]
fn test_pose_save_rejects_bad_angles() {
    let home = TempDir::new().unwrap();
    cli(&home)
        .args(["pose", "save", "stand", "--angles", "0=90,0=45"])
        .assert()
        .failure();
}

#[test]
fn test_config_set_and_get() {
    let home = TempDir::new().unwrap();
    cli(&home)
        .args(["config", "set", "--port", "/dev/ttyUSB9", "--baud", "115200"])
        .assert()
        .success();

    cli(&home)
        .args(["config", "get", "port"])
        .assert()
        .success()
        .stdout("/dev/ttyUSB9\n");
    cli(&home)
        .args(["config", "get", "baud"])
        .assert()
        .success()
        .stdout("115200\n");
}

#[test]
fn test_controller_print_config() {
    let home = TempDir::new().unwrap();
    cli(&home)
        .args(["controller", "--print-config", "--baud", "57600"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Bottom Right Leg"))
        .stdout(predicate::str::contains("baud = 57600"));
}

#[test]
fn test_controller_stdin_answers_queries_and_errors() {
    let home = TempDir::new().unwrap();
    cli(&home)
        .args(["controller", "--stdin", "--tick-ms", "1"])
        .write_stdin("not json\n{\"servo\":0,\"angle\":100}\n{\"query\":0}\n{\"query\":42}\n")
        .timeout(std::time::Duration::from_secs(10))
        .assert()
        .success()
        .stdout(predicate::str::contains("\"error\":\"malformed\""))
        .stdout(predicate::str::contains("\"servo\":0"))
        .stdout(predicate::str::contains("\"target\":100.0"))
        .stdout(predicate::str::contains("\"error\":\"unknown_channel\""));
}

#[test]
fn test_controller_loads_config_file() {
    let home = TempDir::new().unwrap();
    let path = home.path().join("controller.toml");
    std::fs::write(
        &path,
        r#"
tick_period_ms = 1

[[channels]]
id = 3
pin = 9
"#,
    )
    .unwrap();

    cli(&home)
        .args(["controller", "--stdin", "--config"])
        .arg(&path)
        .write_stdin("{\"query\":3}\n{\"query\":0}\n")
        .timeout(std::time::Duration::from_secs(10))
        .assert()
        .success()
        .stdout(predicate::str::contains("\"servo\":3"))
        .stdout(predicate::str::contains("\"error\":\"unknown_channel\""));
}
