#![cfg(unix)]

use pretty_assertions::assert_eq;
use procpool::{codec, ProcessSupervisor, SupervisorConfig, SupervisorError, WorkerStatus};
use serde_json::{json, Value};
use serial_test::serial;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tempfile::TempDir;

fn make_worker(root: &TempDir, name: &str, body: &str) -> PathBuf {
    let path = root.path().join(name);
    fs::write(&path, format!("#!/bin/sh\n{body}\n")).expect("write worker stub");
    let mut perms = fs::metadata(&path).expect("metadata").permissions();
    perms.set_mode(0o755);
    fs::set_permissions(&path, perms).expect("set permissions");
    path
}

fn supervisor(root: &Path, capacity: usize) -> ProcessSupervisor {
    let config = SupervisorConfig {
        capacity,
        root: Some(root.to_path_buf()),
        ..SupervisorConfig::default()
    };
    ProcessSupervisor::new(config).expect("valid root")
}

fn poll_until<F>(sup: &mut ProcessSupervisor, timeout: Duration, done: F) -> bool
where
    F: Fn(&ProcessSupervisor) -> bool,
{
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        sup.poll_completions();
        if done(sup) {
            return true;
        }
        std::thread::sleep(Duration::from_millis(10));
    }
    false
}

#[test]
#[serial]
fn worker_receives_encoded_payload() {
    let root = TempDir::new().expect("root");
    make_worker(&root, "echo_job", r#"printf '%s' "$1" > "$0.out""#);
    let mut sup = supervisor(root.path(), 1);

    let payload = json!({"n": 1, "tags": ["a b", "c"], "nested": {"ok": true}});
    let pid = sup.launch("echo_job", payload.clone()).expect("launch");
    assert!(pid.is_some());

    sup.wait_all();
    let written = fs::read_to_string(root.path().join("echo_job.out")).expect("worker output");
    let received: Value = codec::decode(&written).expect("decodable argument");
    assert_eq!(received, payload);
}

#[test]
#[serial]
fn single_slot_waits_for_previous_worker() {
    let root = TempDir::new().expect("root");
    make_worker(&root, "jobA", "sleep 0.3");
    make_worker(&root, "jobB", "sleep 0.1");
    let mut sup = supervisor(root.path(), 1);

    let started = Instant::now();
    let p1 = sup.launch("jobA", json!({"n": 1})).unwrap().expect("pid");
    let p2 = sup.launch("jobB", json!({"n": 2})).unwrap().expect("pid");

    assert!(started.elapsed() >= Duration::from_millis(250));
    assert_eq!(sup.record(p1).unwrap().status, WorkerStatus::Finished);
    assert_eq!(sup.pending_count(), 1);

    sup.wait_all();
    let records = sup.info(None);
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].identity, Some(p1));
    assert_eq!(records[1].identity, Some(p2));
    assert!(records.iter().all(|r| r.status == WorkerStatus::Finished));
}

#[test]
#[serial]
fn unbounded_capacity_launches_without_waiting() {
    let root = TempDir::new().expect("root");
    for name in ["jobA", "jobB", "jobC"] {
        make_worker(&root, name, "exec sleep 30");
    }
    let mut sup = supervisor(root.path(), 0);

    let started = Instant::now();
    for name in ["jobA", "jobB", "jobC"] {
        assert!(sup.launch(name, json!([])).unwrap().is_some());
    }
    assert!(started.elapsed() < Duration::from_secs(5));
    assert_eq!(sup.pending_count(), 3);

    sup.terminate_all();
    assert!(poll_until(&mut sup, Duration::from_secs(5), |s| s.pending_count() == 0));
    assert_eq!(sup.completed_count(), 3);
}

#[test]
#[serial]
fn terminate_all_stops_running_workers() {
    let root = TempDir::new().expect("root");
    make_worker(&root, "forever", "sleep 30 & wait");
    let mut sup = supervisor(root.path(), 0);

    let p1 = sup.launch("forever", json!({})).unwrap().expect("pid");
    let p2 = sup.launch("forever", json!({})).unwrap().expect("pid");
    // give the shells time to fork their sleeps
    std::thread::sleep(Duration::from_millis(100));
    sup.poll_completions();
    assert_eq!(sup.pending_count(), 2);

    sup.terminate_all();
    assert_eq!(sup.pending_count(), 2, "terminate_all does not reclassify");

    assert!(poll_until(&mut sup, Duration::from_secs(5), |s| s.pending_count() == 0));
    assert_eq!(sup.record(p1).unwrap().status, WorkerStatus::Finished);
    assert_eq!(sup.record(p2).unwrap().status, WorkerStatus::Finished);
}

#[test]
fn missing_target_is_rejected_before_spawn() {
    let root = TempDir::new().expect("root");
    fs::create_dir(root.path().join("subdir")).unwrap();
    let mut sup = supervisor(root.path(), 1);

    assert!(matches!(
        sup.launch("absent", json!({})),
        Err(SupervisorError::NotFound { .. })
    ));
    assert!(matches!(
        sup.launch("subdir", json!({})),
        Err(SupervisorError::NotFound { .. })
    ));
    assert!(sup.info(None).is_empty());
}

#[test]
fn missing_interpreter_is_recorded_without_pid() {
    let root = TempDir::new().expect("root");
    fs::write(root.path().join("job.php"), "<?php\n").unwrap();
    let config = SupervisorConfig {
        capacity: 0,
        root: Some(root.path().to_path_buf()),
        interpreter: Some(PathBuf::from("/nonexistent/procpool-interp")),
        extension: Some("php".to_string()),
        ..SupervisorConfig::default()
    };
    let mut sup = ProcessSupervisor::new(config).expect("valid root");

    assert_eq!(sup.launch("job", json!({"n": 1})).unwrap(), None);
    sup.poll_completions();
    sup.terminate_all();
    sup.poll_completions();

    let records = sup.info(None);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].identity, None);
    assert_eq!(records[0].status, WorkerStatus::Pending);
    assert_eq!(records[0].target, "job");
    assert!(sup.wait_all().is_empty());
}

#[test]
fn invalid_root_is_a_configuration_error() {
    let root = TempDir::new().expect("root");
    let config = SupervisorConfig {
        root: Some(root.path().join("missing")),
        ..SupervisorConfig::default()
    };
    assert!(matches!(
        ProcessSupervisor::new(config),
        Err(SupervisorError::Configuration { .. })
    ));

    let mut sup = supervisor(root.path(), 1);
    assert!(sup.set_root(root.path().join("missing")).is_err());
    assert_eq!(sup.root(), root.path());
}
