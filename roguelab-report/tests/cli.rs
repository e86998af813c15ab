use std::process::Command;

const RUN_LINES: &str = concat!(
    r#"{"eventType":"RUN_STARTED","eventVersion":"1.0.0","timestamp":"2025-01-15T14:30:00.123456789Z","runId":"cli-1","tick":0,"payload":{"playerName":"Rook","playerClass":"WARRIOR","seed":5}}"#,
    "\n",
    r#"{"event_type":"FLOOR_ENTERED","event_version":"1.0.0","timestamp":"2025-01-15T14:30:01Z","run_id":"cli-1","tick":1,"payload":{"floor_number":1,"room_count":3}}"#,
    "\n",
    r#"{"event_type":"COMBAT_STARTED","event_version":"1.0.0","timestamp":"2025-01-15T14:30:02Z","run_id":"cli-1","tick":2,"payload":{"enemies":[{"id":"g1","type":"GOBLIN","health":10}]}}"#,
    "\n",
    r#"{"event_type":"DAMAGE_DEALT","event_version":"1.0.0","timestamp":"2025-01-15T14:30:03Z","run_id":"cli-1","tick":3,"payload":{"source_type":"PLAYER","target_type":"GOBLIN","final_damage":10,"killed":true}}"#,
    "\n",
    r#"{"event_type":"COMBAT_ENDED","event_version":"1.0.0","timestamp":"2025-01-15T14:30:04Z","run_id":"cli-1","tick":4,"payload":{"outcome":"VICTORY","turns_elapsed":1,"enemies_killed":1}}"#,
    "\n",
    r#"{"event_type":"RUN_ENDED","event_version":"1.0.0","timestamp":"2025-01-15T14:30:05Z","run_id":"cli-1","tick":5,"payload":{"end_reason":"VICTORY","final_floor":1,"enemies_killed":1,"damage_dealt":10}}"#,
    "\n",
);

fn temp_path(label: &str) -> std::path::PathBuf {
    std::env::temp_dir().join(format!(
        "roguelab-cli-{label}-{}",
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos()
    ))
}

#[test]
fn cli_run_writes_report_file() {
    let exe = env!("CARGO_BIN_EXE_roguelab-report");
    let dir = temp_path("run");
    std::fs::create_dir_all(&dir).expect("create dir");
    let file = dir.join("cli-1.jsonl");
    std::fs::write(&file, RUN_LINES).expect("write fixture");
    let out = dir.join("out");

    let output = Command::new(exe)
        .arg("run")
        .arg(&file)
        .arg("--output")
        .arg(&out)
        .output()
        .expect("run cli");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("RogueLab Telemetry Report"));
    assert!(stdout.contains("Rook (WARRIOR)"));
    let report = std::fs::read_to_string(out.join("cli-1_report.md")).expect("read report");
    assert!(report.contains("| Outcome | **VICTORY** |"));
    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn cli_batch_json_is_machine_readable() {
    let exe = env!("CARGO_BIN_EXE_roguelab-report");
    let dir = temp_path("batch");
    std::fs::create_dir_all(&dir).expect("create dir");
    std::fs::write(dir.join("a.jsonl"), RUN_LINES).expect("write fixture");
    std::fs::write(dir.join("broken.jsonl"), "{oops").expect("write fixture");
    let out = dir.join("out");

    let output = Command::new(exe)
        .arg("batch")
        .arg(&dir)
        .args(["--report", "json", "--workers", "2", "--output"])
        .arg(&out)
        .output()
        .expect("run cli");
    assert!(output.status.success());
    let value: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("stdout is json");
    assert_eq!(value["overview"]["total_runs"], 1);
    assert_eq!(value["skipped_sources"].as_array().map(Vec::len), Some(1));
    assert!(out.join("runs_summary.csv").is_file());
    assert!(out.join("batch_report.md").is_file());
    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn cli_batch_fails_on_missing_directory() {
    let exe = env!("CARGO_BIN_EXE_roguelab-report");
    let status = Command::new(exe)
        .arg("batch")
        .arg(temp_path("missing"))
        .status()
        .expect("run cli");
    assert!(!status.success());
}

#[test]
fn cli_batch_fails_when_nothing_loads() {
    let exe = env!("CARGO_BIN_EXE_roguelab-report");
    let dir = temp_path("none");
    std::fs::create_dir_all(&dir).expect("create dir");
    std::fs::write(dir.join("empty.jsonl"), "\n\n").expect("write fixture");
    let output = Command::new(exe)
        .arg("batch")
        .arg(&dir)
        .arg("--output")
        .arg(dir.join("out"))
        .output()
        .expect("run cli");
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("no runs found"));
    std::fs::remove_dir_all(&dir).ok();
}
