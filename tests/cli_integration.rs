//! CLI integration tests for flowgen
//!
//! These tests drive the binary end to end: project setup, diagram
//! lifecycle, raw YAML access, hierarchy links and search.

use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// Get a command for the flowgen binary, isolated from the host environment
fn flowgen_cmd(dir: &Path) -> assert_cmd::Command {
    let mut cmd = assert_cmd::Command::new(assert_cmd::cargo::cargo_bin!("flowgen"));
    cmd.current_dir(dir)
        .env_remove("FLOWGEN_DIAGRAMS_PATH")
        .env_remove("RUST_LOG")
        .env("HOME", dir)
        .env("XDG_CONFIG_HOME", dir.join(".config"));
    cmd
}

/// Create a temporary directory and initialize a flowgen project
fn setup_project() -> TempDir {
    let dir = TempDir::new().unwrap();
    flowgen_cmd(dir.path()).arg("init").assert().success();
    dir
}

const ORDER_FLOW: &str = r#"id: order
name: Order Flow
description: Takes an order from cart to payment
version: 1.0.0
tags: [orders]
nodes:
  - id: start
    name: Start
    type: start
    position: {x: 0, y: 0}
  - id: check
    name: Check Status
    type: decision
    position: {x: 0, y: 100}
edges:
  - id: e1
    name: next
    type: sequence
    from: start
    to: check
"#;

fn write_file(dir: &Path, name: &str, content: &str) -> std::path::PathBuf {
    let path = dir.join(name);
    fs::write(&path, content).unwrap();
    path
}

fn import(dir: &Path, content: &str) {
    let file = write_file(dir, "import.yaml", content);
    flowgen_cmd(dir).arg("import").arg(&file).assert().success();
}

fn new_diagram(dir: &Path, id: &str, name: &str) {
    flowgen_cmd(dir)
        .args(["new", name, "--id", id])
        .assert()
        .success();
}

fn stdout_json(dir: &Path, args: &[&str]) -> serde_json::Value {
    let output = flowgen_cmd(dir)
        .args(["--format", "json"])
        .args(args)
        .output()
        .unwrap();
    assert!(output.status.success(), "{:?} failed", args);
    serde_json::from_slice(&output.stdout).unwrap()
}

// =============================================================================
// Initialization Tests
// =============================================================================

#[test]
fn test_init_creates_structure() {
    let dir = TempDir::new().unwrap();

    flowgen_cmd(dir.path())
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("Initialized flowgen project"));

    assert!(dir.path().join("flowgen.toml").is_file());
    assert!(dir.path().join("diagrams").is_dir());
}

#[test]
fn test_init_is_idempotent() {
    let dir = TempDir::new().unwrap();

    flowgen_cmd(dir.path()).arg("init").assert().success();
    flowgen_cmd(dir.path()).arg("init").assert().success();
}

// =============================================================================
// Diagram Tests
// =============================================================================

#[test]
fn test_new_creates_canonical_file() {
    let dir = setup_project();

    flowgen_cmd(dir.path())
        .args(["new", "Checkout", "--id", "checkout", "--tag", "billing"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Created diagram: checkout"));

    let text = fs::read_to_string(dir.path().join("diagrams/checkout.yaml")).unwrap();
    assert!(text.starts_with("id: checkout\nname: Checkout\nversion: 1.0.0\ntags:\n  - billing\n"));
}

#[test]
fn test_new_generates_id() {
    let dir = setup_project();

    let created = stdout_json(dir.path(), &["new", "Onboarding"]);
    let id = created["id"].as_str().unwrap();
    assert!(id.starts_with("d-"));
    assert_eq!(id.len(), 9);
    assert!(dir.path().join("diagrams").join(format!("{}.yaml", id)).is_file());
}

#[test]
fn test_new_uses_configured_version() {
    let dir = setup_project();
    fs::write(dir.path().join("flowgen.toml"), "default_version = \"0.3.0\"\n").unwrap();

    new_diagram(dir.path(), "draft", "Draft");

    let shown = stdout_json(dir.path(), &["show", "draft"]);
    assert_eq!(shown["version"], "0.3.0");
}

#[test]
fn test_new_duplicate_fails() {
    let dir = setup_project();
    new_diagram(dir.path(), "checkout", "Checkout");

    flowgen_cmd(dir.path())
        .args(["new", "Checkout again", "--id", "checkout"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));
}

#[test]
fn test_new_rejects_bad_id() {
    let dir = setup_project();

    flowgen_cmd(dir.path())
        .args(["new", "Bad", "--id", "9lives"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid id"));
}

#[test]
fn test_list_and_show() {
    let dir = setup_project();
    import(dir.path(), ORDER_FLOW);
    new_diagram(dir.path(), "billing", "Billing");

    flowgen_cmd(dir.path())
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("order"))
        .stdout(predicate::str::contains("Billing"));

    let list = stdout_json(dir.path(), &["list"]);
    assert_eq!(list.as_array().unwrap().len(), 2);
    assert_eq!(list[1]["id"], "order");
    assert_eq!(list[1]["nodes"], 2);

    flowgen_cmd(dir.path())
        .args(["show", "order"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Name: Order Flow"))
        .stdout(predicate::str::contains("Check Status"))
        .stdout(predicate::str::contains("start -> check"));
}

#[test]
fn test_list_empty() {
    let dir = setup_project();

    flowgen_cmd(dir.path())
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("No diagrams found"));
}

#[test]
fn test_show_missing_fails() {
    let dir = setup_project();

    flowgen_cmd(dir.path())
        .args(["show", "ghost"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Diagram not found: ghost"));
}

#[test]
fn test_import_rejects_invalid() {
    let dir = setup_project();
    let broken = ORDER_FLOW.replace("to: check", "to: nowhere");
    let file = write_file(dir.path(), "broken.yaml", &broken);

    flowgen_cmd(dir.path())
        .arg("import")
        .arg(&file)
        .assert()
        .failure()
        .stdout(predicate::str::contains("INVALID_TO_NODE"))
        .stderr(predicate::str::contains("Invalid diagram"));

    assert!(!dir.path().join("diagrams/order.yaml").exists());
}

#[test]
fn test_validate_stored_and_file() {
    let dir = setup_project();
    import(dir.path(), ORDER_FLOW);

    flowgen_cmd(dir.path())
        .args(["validate", "order"])
        .assert()
        .success()
        .stdout(predicate::str::contains("order: valid"));

    let duplicate = ORDER_FLOW.replace("id: check", "id: start");
    let file = write_file(dir.path(), "dup.yaml", &duplicate);
    flowgen_cmd(dir.path())
        .arg("validate")
        .arg("--file")
        .arg(&file)
        .assert()
        .failure()
        .stdout(predicate::str::contains("DUPLICATE_NODE_ID"));
}

#[test]
fn test_validate_json() {
    let dir = setup_project();
    import(dir.path(), ORDER_FLOW);

    let result = stdout_json(dir.path(), &["validate", "order"]);
    assert_eq!(result["valid"], true);
    assert!(result["errors"].as_array().unwrap().is_empty());
}

#[test]
fn test_delete() {
    let dir = setup_project();
    new_diagram(dir.path(), "scratch", "Scratch");

    flowgen_cmd(dir.path())
        .args(["delete", "scratch"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Deleted diagram: scratch"));

    assert!(!dir.path().join("diagrams/scratch.yaml").exists());

    flowgen_cmd(dir.path())
        .args(["delete", "scratch"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found"));
}

// =============================================================================
// Raw Text Tests
// =============================================================================

#[test]
fn test_raw_get_returns_file() {
    let dir = setup_project();
    import(dir.path(), ORDER_FLOW);

    let stored = fs::read_to_string(dir.path().join("diagrams/order.yaml")).unwrap();
    flowgen_cmd(dir.path())
        .args(["raw", "get", "order"])
        .assert()
        .success()
        .stdout(predicate::str::diff(stored));
}

#[test]
fn test_raw_put_from_stdin_is_canonical() {
    let dir = setup_project();
    import(dir.path(), ORDER_FLOW);

    let edited = ORDER_FLOW.replace("name: Order Flow", "name: Order Intake");
    flowgen_cmd(dir.path())
        .args(["raw", "put", "order"])
        .write_stdin(edited)
        .assert()
        .success()
        .stdout(predicate::str::contains("Saved diagram: order (Order Intake)"));

    let stored = fs::read_to_string(dir.path().join("diagrams/order.yaml")).unwrap();
    assert!(stored.contains("name: Order Intake\n"));
    assert!(stored.contains("    position:\n      x: 0.0\n      y: 100.0\n"));
}

#[test]
fn test_raw_put_rejects_mismatched_id() {
    let dir = setup_project();
    let file = write_file(dir.path(), "order.yaml", ORDER_FLOW);

    flowgen_cmd(dir.path())
        .args(["raw", "put", "other", "--file"])
        .arg(&file)
        .assert()
        .failure()
        .stderr(predicate::str::contains("mismatch"));
}

// =============================================================================
// Hierarchy Tests
// =============================================================================

#[test]
fn test_link_children_parent_unlink() {
    let dir = setup_project();
    import(dir.path(), ORDER_FLOW);
    new_diagram(dir.path(), "status", "Status Details");

    flowgen_cmd(dir.path())
        .args(["link", "order", "status", "--node", "check"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Linked status under order"));

    let stored = fs::read_to_string(dir.path().join("diagrams/order.yaml")).unwrap();
    assert!(stored.contains("    drillDown: status\n"));
    assert!(stored.contains("children:\n  - status\n"));

    flowgen_cmd(dir.path())
        .args(["children", "order"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Status Details"));

    flowgen_cmd(dir.path())
        .args(["parent", "status"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Order Flow"));

    flowgen_cmd(dir.path())
        .args(["unlink", "order", "status"])
        .assert()
        .success();

    let stored = fs::read_to_string(dir.path().join("diagrams/order.yaml")).unwrap();
    assert!(!stored.contains("drillDown"));

    flowgen_cmd(dir.path())
        .args(["parent", "status"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no parent"));
}

#[test]
fn test_link_unknown_node_fails() {
    let dir = setup_project();
    import(dir.path(), ORDER_FLOW);
    new_diagram(dir.path(), "status", "Status");

    flowgen_cmd(dir.path())
        .args(["link", "order", "status", "--node", "missing"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Node missing not found"));
}

#[test]
fn test_tree_text() {
    let dir = setup_project();
    new_diagram(dir.path(), "root", "Root");
    new_diagram(dir.path(), "mid", "Middle");
    new_diagram(dir.path(), "leaf", "Leaf");
    flowgen_cmd(dir.path()).args(["link", "root", "mid"]).assert().success();
    flowgen_cmd(dir.path()).args(["link", "mid", "leaf"]).assert().success();

    flowgen_cmd(dir.path())
        .args(["tree", "root"])
        .assert()
        .success()
        .stdout("root (Root)\n  mid (Middle)\n    leaf (Leaf)\n");
}

#[test]
fn test_tree_cycle_fails() {
    let dir = setup_project();
    new_diagram(dir.path(), "a", "A");
    new_diagram(dir.path(), "b", "B");
    flowgen_cmd(dir.path()).args(["link", "a", "b"]).assert().success();
    flowgen_cmd(dir.path()).args(["link", "b", "a"]).assert().success();

    flowgen_cmd(dir.path())
        .args(["tree", "a"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Circular reference in hierarchy: a -> b -> a"));

    flowgen_cmd(dir.path())
        .arg("check")
        .assert()
        .failure()
        .stdout(predicate::str::contains("cycle: a -> b"));
}

#[test]
fn test_delete_cascades_references() {
    let dir = setup_project();
    import(dir.path(), ORDER_FLOW);
    new_diagram(dir.path(), "status", "Status");
    flowgen_cmd(dir.path())
        .args(["link", "order", "status", "--node", "check"])
        .assert()
        .success();

    flowgen_cmd(dir.path())
        .args(["delete", "status"])
        .assert()
        .success()
        .stdout(predicate::str::contains("removed references from order"));

    let order = stdout_json(dir.path(), &["show", "order"]);
    assert!(order.get("children").is_none());
    assert!(order["nodes"][1].get("drillDown").is_none());

    flowgen_cmd(dir.path())
        .arg("check")
        .assert()
        .success()
        .stdout(predicate::str::contains("No problems found"));
}

// =============================================================================
// Search Tests
// =============================================================================

#[test]
fn test_search_diagrams() {
    let dir = setup_project();
    import(dir.path(), ORDER_FLOW);
    new_diagram(dir.path(), "status", "Check Status");

    let found = stdout_json(dir.path(), &["search", "status"]);
    assert_eq!(found["count"], 1);
    assert_eq!(found["results"][0]["id"], "status");
    assert_eq!(found["results"][0]["matchType"], "name");

    let tagged = stdout_json(dir.path(), &["search", "", "--tag", "ORDERS"]);
    assert_eq!(tagged["count"], 1);
    assert_eq!(tagged["results"][0]["id"], "order");

    flowgen_cmd(dir.path())
        .args(["search", "zzz"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No results found"));
}

#[test]
fn test_search_nodes_by_type() {
    let dir = setup_project();
    import(dir.path(), ORDER_FLOW);

    let found = stdout_json(dir.path(), &["search-nodes", "--type", "decision"]);
    assert_eq!(found["count"], 1);
    assert_eq!(found["results"][0]["node"]["id"], "check");
    assert_eq!(found["results"][0]["diagramId"], "order");

    flowgen_cmd(dir.path())
        .args(["search-nodes", "--type", "hexagon"])
        .assert()
        .failure();
}

// =============================================================================
// Configuration Tests
// =============================================================================

#[test]
fn test_diagrams_flag_overrides_config() {
    let dir = setup_project();
    let elsewhere = dir.path().join("elsewhere");

    flowgen_cmd(dir.path())
        .arg("--diagrams")
        .arg(&elsewhere)
        .args(["new", "Moved", "--id", "moved"])
        .assert()
        .success();

    assert!(elsewhere.join("moved.yaml").is_file());
    assert!(!dir.path().join("diagrams/moved.yaml").exists());
}

#[test]
fn test_diagrams_env_overrides_config() {
    let dir = setup_project();

    flowgen_cmd(dir.path())
        .env("FLOWGEN_DIAGRAMS_PATH", "flows")
        .args(["new", "Env", "--id", "env"])
        .assert()
        .success();

    assert!(dir.path().join("flows/env.yaml").is_file());
}

#[test]
fn test_project_found_from_subdirectory() {
    let dir = setup_project();
    let nested = dir.path().join("src/deep");
    fs::create_dir_all(&nested).unwrap();

    flowgen_cmd(&nested)
        .args(["new", "Nested", "--id", "nested"])
        .assert()
        .success();

    assert!(dir.path().join("diagrams/nested.yaml").is_file());
}

#[test]
fn test_global_default_format() {
    let dir = setup_project();
    let config_dir = dir.path().join(".config/flowgen");
    fs::create_dir_all(&config_dir).unwrap();
    fs::write(config_dir.join("config.toml"), "default_format = \"json\"\n").unwrap();

    let output = flowgen_cmd(dir.path()).arg("list").output().unwrap();
    assert!(output.status.success());
    let list: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert!(list.as_array().unwrap().is_empty());
}
