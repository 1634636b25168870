//! E2E CLI tests covering reporting and the failure contract:
//! - `chm ledger list|summary` and `chm stats` for administrators/managers
//! - employees refused from finance views
//! - actor resolution (flags, env, user config, role checks, deactivation)
//! - exit codes and JSON error payloads per failure kind

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use std::path::Path;
use tempfile::TempDir;

// ---------------------------------------------------------------------------
// Test Harness
// ---------------------------------------------------------------------------

fn chm(dir: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("chm"));
    cmd.current_dir(dir);
    cmd.env("CHAMADOS_LOG", "error");
    cmd.env("XDG_CONFIG_HOME", dir.join("xdg"));
    for var in ["CHAMADOS_ACTOR_ID", "CHAMADOS_ROLE", "CHAMADOS_DB", "CHAMADOS_FORMAT"] {
        cmd.env_remove(var);
    }
    cmd
}

fn json_ok(cmd: &mut Command) -> Value {
    let output = cmd.arg("--json").output().expect("chm should not crash");
    assert!(
        output.status.success(),
        "chm failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).expect("stdout should be valid JSON")
}

fn json_err(cmd: &mut Command) -> (i32, Value) {
    let output = cmd.arg("--json").output().expect("chm should not crash");
    assert!(!output.status.success(), "chm unexpectedly succeeded");
    let err: Value =
        serde_json::from_slice(&output.stderr).expect("stderr should be a JSON error");
    (output.status.code().expect("exit code"), err)
}

fn as_actor(dir: &Path, actor: i64) -> Command {
    let mut cmd = chm(dir);
    cmd.args(["--actor-id", &actor.to_string()]);
    cmd
}

/// Ids created by [`seeded`]: administrator 1, manager 2, employee 3,
/// client 1.
const ADMIN: i64 = 1;
const MANAGER: i64 = 2;
const EMPLOYEE: i64 = 3;

/// Store with staff, one client and two completed tickets in July 2024
/// plus one ticket left in progress.
fn seeded() -> TempDir {
    let dir = TempDir::new().expect("tempdir");
    let root = dir.path();
    chm(root).arg("init").assert().success();

    chm(root)
        .args(["tech", "add", "--username", "owner", "--name", "Shop Owner"])
        .args(["--password", "pw", "--role", "admin"])
        .assert()
        .success();
    as_actor(root, ADMIN)
        .args(["tech", "add", "--username", "gil", "--name", "Gilberto Alves"])
        .args(["--password", "pw", "--role", "gerente"])
        .assert()
        .success();
    as_actor(root, MANAGER)
        .args(["tech", "add", "--username", "rafa", "--name", "Rafael Lima", "--password", "pw"])
        .assert()
        .success();
    chm(root)
        .args(["client", "add", "--phone", "11987654321", "--name", "Marina Costa"])
        .assert()
        .success();

    for (price, status) in [("120", "Completed"), ("80.50", "Completed"), ("45", "In Progress")] {
        let ticket = json_ok(chm(root).args([
            "create",
            "--client",
            "1",
            "--assignee",
            &EMPLOYEE.to_string(),
            "--description",
            "Fridge not cooling",
            "--device",
            "Consul fridge",
        ]));
        let id = ticket["id"].as_i64().expect("id").to_string();
        as_actor(root, EMPLOYEE)
            .args(["item", "add", &id, "--description", "Compressor relay", "--price", price])
            .assert()
            .success();
        let mut update = as_actor(root, EMPLOYEE);
        update.args(["update", &id, "--status", status]);
        if status == "Completed" {
            update.args(["--completed-at", "2024-07-10T12:00:00Z"]);
        }
        update.assert().success();
    }
    dir
}

// ---------------------------------------------------------------------------
// Reporting
// ---------------------------------------------------------------------------

#[test]
fn ledger_summary_totals_the_period() {
    let dir = seeded();
    let root = dir.path();

    let summary = json_ok(
        as_actor(root, ADMIN).args(["ledger", "summary", "--month", "7", "--year", "2024"]),
    );
    assert_eq!(summary["total_inflow"], "200.50");
    assert_eq!(summary["total_outflow"], "0.00");
    assert_eq!(summary["balance"], "200.50");

    let other_month = json_ok(
        as_actor(root, ADMIN).args(["ledger", "summary", "--month", "8", "--year", "2024"]),
    );
    assert_eq!(other_month["total_inflow"], "0.00");
}

#[test]
fn ledger_list_filters_by_kind() {
    let dir = seeded();
    let root = dir.path();

    let inflows = json_ok(as_actor(root, MANAGER).args(["ledger", "list", "--kind", "inflow"]));
    let amounts: Vec<&str> = inflows
        .as_array()
        .expect("array")
        .iter()
        .map(|e| e["amount"].as_str().expect("amount"))
        .collect();
    assert_eq!(amounts, vec!["80.50", "120.00"]);

    let outflows = json_ok(as_actor(root, MANAGER).args(["ledger", "list", "--kind", "outflow"]));
    assert_eq!(outflows, serde_json::json!([]));
}

#[test]
fn stats_count_by_status() {
    let dir = seeded();
    let root = dir.path();

    let stats = json_ok(as_actor(root, MANAGER).args(["stats", "--today", "2024-07-31"]));
    assert_eq!(stats["total_completed"], 2);
    assert_eq!(stats["total_in_progress"], 1);
    assert_eq!(stats["total_open"], 0);
    assert_eq!(stats["open_value"], "45.00");
    assert_eq!(stats["received_this_month"], "200.50");
    assert_eq!(stats["tickets_by_client"]["Marina Costa"], 3);
}

#[test]
fn employees_cannot_view_finances() {
    let dir = seeded();
    let root = dir.path();

    let (code, err) = json_err(as_actor(root, EMPLOYEE).args(["ledger", "list"]));
    assert_eq!(code, 4);
    assert_eq!(err["error"]["kind"], "forbidden");

    let (code, _) = json_err(as_actor(root, EMPLOYEE).args(["stats"]));
    assert_eq!(code, 4);
}

#[test]
fn pretty_summary_is_readable() {
    let dir = seeded();
    chm(dir.path())
        .args(["--format", "pretty", "--actor-id", "1", "ledger", "summary", "--year", "2024"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Ledger summary (2024)"))
        .stdout(predicate::str::contains("200.50"));
}

// ---------------------------------------------------------------------------
// Actor resolution
// ---------------------------------------------------------------------------

#[test]
fn missing_actor_is_a_usage_error() {
    let dir = seeded();
    let (code, err) = json_err(chm(dir.path()).args(["show", "1"]));
    assert_eq!(code, 2);
    assert_eq!(err["error"]["error_code"], "missing_actor");
}

#[test]
fn actor_from_env_and_user_config() {
    let dir = seeded();
    let root = dir.path();

    json_ok(chm(root).env("CHAMADOS_ACTOR_ID", "1").args(["ledger", "list"]));

    let config_dir = root.join("xdg/chamados");
    std::fs::create_dir_all(&config_dir).expect("config dir");
    std::fs::write(config_dir.join("config.toml"), "actor_id = 2\n").expect("user config");
    json_ok(chm(root).args(["stats"]));
}

#[test]
fn unknown_actor_id_is_a_usage_error() {
    let dir = seeded();
    let (code, err) = json_err(chm(dir.path()).args(["--actor-id", "99", "stats"]));
    assert_eq!(code, 2);
    assert_eq!(err["error"]["error_code"], "invalid_actor_id");
}

#[test]
fn claimed_role_must_match_store() {
    let dir = seeded();
    let (code, err) = json_err(
        chm(dir.path()).args(["--actor-id", "3", "--actor-role", "admin", "ledger", "list"]),
    );
    assert_eq!(code, 2);
    assert_eq!(err["error"]["error_code"], "role_mismatch");
}

#[test]
fn deactivated_technician_is_locked_out_until_reactivated() {
    let dir = seeded();
    let root = dir.path();

    let tech = json_ok(as_actor(root, MANAGER).args(["tech", "deactivate", "3"]));
    assert_eq!(tech["active"], false);
    let (code, err) = json_err(as_actor(root, EMPLOYEE).args(["show", "1"]));
    assert_eq!(code, 2);
    assert_eq!(err["error"]["error_code"], "inactive_actor");

    // A manager may not touch an administrator.
    let (code, _) = json_err(as_actor(root, MANAGER).args(["tech", "deactivate", "1"]));
    assert_eq!(code, 4);

    json_ok(as_actor(root, ADMIN).args(["tech", "activate", "3"]));
    json_ok(as_actor(root, EMPLOYEE).args(["show", "1"]));
}

// ---------------------------------------------------------------------------
// Failure contract
// ---------------------------------------------------------------------------

#[test]
fn uninitialized_store_points_at_init() {
    let dir = TempDir::new().expect("tempdir");
    chm(dir.path())
        .args(["client", "tickets", "1"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("chm init"));
    assert!(!dir.path().join(".chamados").exists());
}

#[test]
fn invalid_input_exits_2() {
    let dir = seeded();
    let (code, err) = json_err(chm(dir.path()).args([
        "create",
        "--client",
        "1",
        "--description",
        "Bad",
        "--device",
        "Consul fridge",
    ]));
    assert_eq!(code, 2);
    assert_eq!(err["error"]["error_code"], "E1001");
    assert!(
        err["error"]["message"]
            .as_str()
            .is_some_and(|m| m.contains("description"))
    );
}

#[test]
fn unknown_client_exits_3() {
    let dir = seeded();
    let (code, err) = json_err(chm(dir.path()).args([
        "create",
        "--client",
        "99",
        "--description",
        "Fridge not cooling",
        "--device",
        "Consul fridge",
    ]));
    assert_eq!(code, 3);
    assert_eq!(err["error"]["error_code"], "E2001");
}

#[test]
fn duplicate_phone_exits_6() {
    let dir = seeded();
    let (code, err) = json_err(
        chm(dir.path()).args(["client", "add", "--phone", "11987654321", "--name", "Someone Else"]),
    );
    assert_eq!(code, 6);
    assert_eq!(err["error"]["kind"], "conflict");
}

#[test]
fn text_errors_go_to_stderr() {
    let dir = seeded();
    chm(dir.path())
        .args(["--actor-id", "1", "show", "42"])
        .assert()
        .code(3)
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::starts_with("error: ticket 42 not found"));
}
