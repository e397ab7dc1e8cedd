use serde_json::Value;
use std::fs;
use std::path::PathBuf;
use std::process::Command;
use std::time::{SystemTime, UNIX_EPOCH};

fn unique_temp_dir(prefix: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("time went backwards")
        .as_nanos();
    let dir = std::env::temp_dir().join(format!(
        "aqm-sim-{prefix}-{}-{nanos}",
        std::process::id()
    ));
    fs::create_dir_all(&dir).expect("create temp dir");
    dir
}

fn write_file(dir: &PathBuf, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, contents).expect("write temp file");
    path
}

const RED_ECN_SCENARIO: &str = r#"
{
    "queue_type": "RED-ECN",
    "capacity_bytes": 60000,
    "bandwidth_bps": 1000000,
    "seed": 3,
    "until_ms": 300,
    "params": [
        { "key": "ECN", "value": "YES" },
        { "key": "RED-QUEUE-WEIGHT", "value": 0.5 },
        { "key": "PER-HOP-BEHAVIOR-FILE", "value": "phb.txt" }
    ],
    "flows": [
        { "origin": 1, "dscp": 46, "ect": true, "rate_bps": 1500000 },
        { "origin": 2, "dscp": 0, "rate_bps": 1000000, "ethernet": true, "mpls": true }
    ]
}
"#;

#[test]
fn aqm_sim_writes_report_json() {
    let dir = unique_temp_dir("red-ecn");
    write_file(
        &dir,
        "phb.txt",
        "# expedited forwarding\nRED 46 RED-MIN-THRESHOLD 2\nRED 46 RED-MAX-THRESHOLD 30\n",
    );
    let scenario = write_file(&dir, "scenario.json", RED_ECN_SCENARIO);
    let out_json = dir.join("report.json");

    let output = Command::new(env!("CARGO_BIN_EXE_aqm_sim"))
        .args([
            "--scenario",
            scenario.to_str().unwrap(),
            "--report-json",
            out_json.to_str().unwrap(),
        ])
        .output()
        .expect("run aqm_sim");
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.lines().any(|l| l.starts_with("RED (DSCP 46) Packets Queued = ")));
    assert!(stdout.lines().any(|l| l.starts_with("done @ ")));

    let report: Value =
        serde_json::from_str(&fs::read_to_string(&out_json).expect("read report")).expect("json");
    assert_eq!(report["queue_type"], "RED-ECN");
    assert_eq!(report["finished_at_ns"], 300_000_000u64);
    let reports = report["reports"].as_array().expect("reports array");
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0]["label"], "RED");
    assert_eq!(reports[0]["classes"].as_array().expect("classes").len(), 2);
    assert!(report["stats"]["injected_pkts"].as_u64().expect("count") > 0);
}

#[test]
fn aqm_sim_queue_type_override_and_bad_type() {
    let dir = unique_temp_dir("override");
    write_file(&dir, "phb.txt", "");
    let scenario = write_file(&dir, "scenario.json", RED_ECN_SCENARIO);

    let output = Command::new(env!("CARGO_BIN_EXE_aqm_sim"))
        .args([
            "--scenario",
            scenario.to_str().unwrap(),
            "--queue-type",
            "FIFO",
            "--until-ms",
            "50",
        ])
        .output()
        .expect("run aqm_sim");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.lines().any(|l| l == "FIFO Packets Marked ECN = 0"));

    let output = Command::new(env!("CARGO_BIN_EXE_aqm_sim"))
        .args([
            "--scenario",
            scenario.to_str().unwrap(),
            "--queue-type",
            "BLUE",
        ])
        .output()
        .expect("run aqm_sim");
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Unknown Queue Type Specified: BLUE"));
}

#[test]
fn aqm_sim_reports_missing_rio_modes() {
    let dir = unique_temp_dir("rio");
    let scenario = write_file(
        &dir,
        "scenario.json",
        r#"{ "queue_type": "RIO", "flows": [ { "origin": 1, "rate_bps": 1000 } ] }"#,
    );
    let output = Command::new(env!("CARGO_BIN_EXE_aqm_sim"))
        .args(["--scenario", scenario.to_str().unwrap()])
        .output()
        .expect("run aqm_sim");
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Specify RIO-COLOR-MODE"));
}
