// End-to-end tests for the revcohort binary: exit codes and the --json stdout contract.
// Run with: cargo test -p revcohort-cli --test cli_tests -- --nocapture

use std::path::Path;
use std::process::{Command, Output};

fn revcohort() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_revcohort"));
    cmd.current_dir(env!("CARGO_MANIFEST_DIR"));
    cmd.env_remove("RUST_LOG");
    cmd
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

const RR_CSV: &str = "\
company,customer,sub_id,arr,renewal_qtr,will_renew,projected_arr
Cloudsense,Acme Co,CS-001,1000,Q1'26,Yes,1100
Cloudsense,Acme Co,CS-002,500,Q3'26,No,0
Cloudsense,Vodafone UK,CS-003,300,Q2'26,Yes,300
Kandy,Telstra,KD-001,40,Q2'26,SF,40
";

const NRR_CSV: &str = "\
customer,class,q1,q2,q3,q4
<Acme Co>,Cloudsense : PS,100,0,0,50
New Sales <Globex Corp> FY26,Cloudsense,60,,,N/A
Starhub,Kandy,10,,,
";

const CONFIG: &str = r#"
name = "CLI Test"
coverage_fraction = 0.8

[ledgers.recurring]
file = "rr.csv"
[ledgers.recurring.columns]
unit = "company"
identity = "customer"
subscription_id = "sub_id"
arr_amount = "arr"
renewal_quarter = "renewal_qtr"
renewal_intent = "will_renew"
projected_arr = "projected_arr"

[ledgers.nonrecurring]
file = "nrr.csv"
[ledgers.nonrecurring.columns]
identity = "customer"
classification_tag = "class"
q1_amount = "q1"
q2_amount = "q2"
q3_amount = "q3"
q4_amount = "q4"

[[units]]
name = "CloudSense"
company = "Cloudsense"
class_filter = "Cloudsense"

[[units]]
name = "Kandy"
"#;

/// Scratch directory holding a config and both ledgers.
fn workspace(config: &str) -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "budget.toml", config);
    write(dir.path(), "rr.csv", RR_CSV);
    write(dir.path(), "nrr.csv", NRR_CSV);
    dir
}

fn write(dir: &Path, name: &str, contents: &str) {
    std::fs::write(dir.join(name), contents).unwrap();
}

// ===========================================================================
// revcohort run
// ===========================================================================

#[test]
fn run_json_emits_single_report() {
    let dir = workspace(CONFIG);
    let output = revcohort()
        .args(["run", dir.path().join("budget.toml").to_str().unwrap(), "--json"])
        .output()
        .expect("revcohort run --json");

    assert!(output.status.success(), "exit code: {:?}\nstderr: {}", output.status, stderr(&output));

    let stdout = String::from_utf8_lossy(&output.stdout);
    let report: serde_json::Value = serde_json::from_str(stdout.trim()).unwrap();

    assert_eq!(report["meta"]["config_name"], "CLI Test");
    let units = report["units"].as_array().unwrap();
    assert_eq!(units.len(), 2);

    let cs = &units[0];
    assert_eq!(cs["unit"], "CloudSense");
    assert_eq!(cs["customers"][0]["identity"], "Acme Co");
    assert_eq!(cs["customers"][0]["total"], 1650.0);
    assert_eq!(cs["cohort"]["cohort_size"], 1);
    assert_eq!(cs["cohort_identities"], serde_json::json!(["Acme Co"]));
    assert!(report.get("portfolio").is_none());

    let err = stderr(&output);
    assert!(err.contains("CloudSense: 3 customers"), "stderr: {err}");
    assert!(err.contains("Kandy: 2 customers"), "stderr: {err}");
}

#[test]
fn run_without_json_keeps_stdout_empty() {
    let dir = workspace(CONFIG);
    let output = revcohort()
        .args(["run", dir.path().join("budget.toml").to_str().unwrap()])
        .output()
        .unwrap();

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert!(output.stdout.is_empty());
}

#[test]
fn run_help_describes_json_as_stdout_only() {
    // The stderr summary is printed with or without --json.
    let output = revcohort().args(["run", "--help"]).output().unwrap();
    assert!(output.status.success());

    let help = String::from_utf8_lossy(&output.stdout);
    assert!(help.contains("Output JSON to stdout"), "help: {help}");
    assert!(!help.contains("instead of human summary"), "help: {help}");
}

#[test]
fn run_output_writes_file() {
    let dir = workspace(CONFIG);
    let out = dir.path().join("cohorts.json");
    let output = revcohort()
        .args([
            "run",
            dir.path().join("budget.toml").to_str().unwrap(),
            "--output",
            out.to_str().unwrap(),
        ])
        .output()
        .unwrap();

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let written: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&out).unwrap()).unwrap();
    assert_eq!(written["units"].as_array().unwrap().len(), 2);
}

#[test]
fn run_is_byte_identical_across_invocations() {
    let dir = workspace(CONFIG);
    let config = dir.path().join("budget.toml");
    let a = revcohort().args(["run", config.to_str().unwrap(), "--json"]).output().unwrap();
    let b = revcohort().args(["run", config.to_str().unwrap(), "--json"]).output().unwrap();
    assert!(a.status.success());
    assert_eq!(a.stdout, b.stdout);
}

#[test]
fn run_single_unit() {
    let dir = workspace(CONFIG);
    let output = revcohort()
        .args(["run", dir.path().join("budget.toml").to_str().unwrap(), "--json", "--unit", "Kandy"])
        .output()
        .unwrap();

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let units = report["units"].as_array().unwrap();
    assert_eq!(units.len(), 1);
    assert_eq!(units[0]["unit"], "Kandy");
    assert_eq!(units[0]["summary"]["at_risk_subscriptions"], 1);
}

#[test]
fn run_portfolio_scope() {
    let config = CONFIG.replace("coverage_fraction = 0.8", "coverage_fraction = 0.8\nscope = \"portfolio\"");
    let dir = workspace(&config);
    let output = revcohort()
        .args(["run", dir.path().join("budget.toml").to_str().unwrap(), "--json"])
        .output()
        .unwrap();

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["portfolio"]["unit"], "portfolio");
    // 1650 + 300 + 60 + 40 + 10
    assert_eq!(report["portfolio"]["cohort"]["grand_total"], 2060.0);
    assert!(stderr(&output).contains("portfolio: 5 customers"));
}

// ===========================================================================
// Exit codes
// ===========================================================================

#[test]
fn unknown_unit_is_usage_error() {
    let dir = workspace(CONFIG);
    let output = revcohort()
        .args(["run", dir.path().join("budget.toml").to_str().unwrap(), "--unit", "STL"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert!(stderr(&output).contains("unknown unit 'STL'"));
}

#[test]
fn invalid_coverage_fraction_exits_60() {
    let config = CONFIG.replace("coverage_fraction = 0.8", "coverage_fraction = 1.5");
    let dir = workspace(&config);
    let output = revcohort()
        .args(["run", dir.path().join("budget.toml").to_str().unwrap()])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(60), "stderr: {}", stderr(&output));
}

#[test]
fn missing_ledger_exits_61() {
    let dir = workspace(CONFIG);
    std::fs::remove_file(dir.path().join("nrr.csv")).unwrap();
    let output = revcohort()
        .args(["run", dir.path().join("budget.toml").to_str().unwrap(), "--json"])
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(61));
    assert!(output.stdout.is_empty());
    let err = stderr(&output);
    assert!(err.contains("non-recurring ledger is missing"), "stderr: {err}");
    assert!(err.contains("hint:"), "stderr: {err}");
}

#[test]
fn missing_column_exits_62() {
    let dir = workspace(CONFIG);
    write(dir.path(), "rr.csv", "company,customer\nCloudsense,Acme Co\n");
    let output = revcohort()
        .args(["run", dir.path().join("budget.toml").to_str().unwrap()])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(62), "stderr: {}", stderr(&output));
}

#[test]
fn missing_subcommand_is_usage_error() {
    let output = revcohort().output().unwrap();
    assert_eq!(output.status.code(), Some(2));
}

// ===========================================================================
// revcohort validate
// ===========================================================================

#[test]
fn validate_reports_config_shape() {
    let dir = workspace(CONFIG);
    let output = revcohort()
        .args(["validate", dir.path().join("budget.toml").to_str().unwrap()])
        .output()
        .unwrap();

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let err = stderr(&output);
    assert!(err.contains("valid: 'CLI Test' with 2 unit(s)"), "stderr: {err}");
    assert!(err.contains("regions-"), "stderr: {err}");
}

#[test]
fn validate_rejects_duplicate_units() {
    let config = format!("{CONFIG}\n[[units]]\nname = \"Kandy\"\n");
    let dir = workspace(&config);
    let output = revcohort()
        .args(["validate", dir.path().join("budget.toml").to_str().unwrap()])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(60));
    assert!(stderr(&output).contains("duplicate unit"));
}

#[test]
fn validate_rejects_broken_rule_file() {
    let config = format!("{CONFIG}\n[classifier]\nrules = \"rules.toml\"\n");
    let dir = workspace(&config);
    write(dir.path(), "rules.toml", "version = \"x\"\n");
    let output = revcohort()
        .args(["validate", dir.path().join("budget.toml").to_str().unwrap()])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(60), "stderr: {}", stderr(&output));
}

// ===========================================================================
// revcohort classify
// ===========================================================================

#[test]
fn classify_builtin_regions() {
    let output = revcohort()
        .args(["classify", "Vodafone UK", "Telstra Corporation Ltd", "Initech LLC"])
        .output()
        .unwrap();

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let stdout = String::from_utf8_lossy(&output.stdout);
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines.len(), 3);
    assert!(lines[0].starts_with("Vodafone UK\tEMEA\t"));
    assert!(lines[1].starts_with("Telstra Corporation Ltd\tAPAC\t"));
    assert!(lines[2].starts_with("Initech LLC\tAmericas\t"));
}

#[test]
fn classify_json_with_rule_file_and_unit() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "industries.toml",
        r#"
version = "industries-cli"
default_tag = "Other"

[[tiers]]
name = "generic"

[[tiers.rules]]
id = "media.cable"
tag = "Media"
keywords = ["cable"]
units = ["Kandy"]
"#,
    );
    let rules = dir.path().join("industries.toml");

    let scoped = revcohort()
        .args(["classify", "Comcast Cable", "--rules", rules.to_str().unwrap(), "--unit", "kandy", "--json"])
        .output()
        .unwrap();
    assert!(scoped.status.success(), "stderr: {}", stderr(&scoped));
    let results: serde_json::Value = serde_json::from_slice(&scoped.stdout).unwrap();
    assert_eq!(results[0]["tag"], "Media");
    assert_eq!(results[0]["rule_id"], "media.cable");

    let unscoped = revcohort()
        .args(["classify", "Comcast Cable", "--rules", rules.to_str().unwrap(), "--json"])
        .output()
        .unwrap();
    let results: serde_json::Value = serde_json::from_slice(&unscoped.stdout).unwrap();
    assert_eq!(results[0]["tag"], "Other");
    assert_eq!(results[0]["rule_id"], "default");
}

#[test]
fn classify_requires_a_name() {
    let output = revcohort().args(["classify"]).output().unwrap();
    assert_eq!(output.status.code(), Some(2));
}
