// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::operation::FakeOperation;
use freshen_core::{RecordId, ResourceError};
use std::sync::{Arc, Mutex};
use tracing_subscriber::fmt::MakeWriter;

/// A writer that captures log output for testing
#[derive(Clone, Default)]
struct CapturedLogs {
    logs: Arc<Mutex<Vec<u8>>>,
}

impl CapturedLogs {
    fn new() -> Self {
        Self::default()
    }

    fn contents(&self) -> String {
        let logs = self.logs.lock().unwrap();
        String::from_utf8_lossy(&logs).to_string()
    }
}

impl std::io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.logs.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for CapturedLogs {
    type Writer = CapturedLogs;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

/// Run a test with captured tracing output
fn with_tracing<F, Fut>(f: F) -> (String, Fut::Output)
where
    F: FnOnce() -> Fut,
    Fut: std::future::Future,
{
    let logs = CapturedLogs::new();
    let logs_clone = logs.clone();

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::TRACE)
        .with_writer(logs_clone)
        .with_ansi(false)
        .without_time()
        .finish();

    let result = tracing::subscriber::with_default(subscriber, || {
        tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap()
            .block_on(f())
    });

    (logs.contents(), result)
}

#[test]
fn traced_operation_logs_call_and_answer() {
    let (logs, result) = with_tracing(|| async {
        let traced = TracedOperation::new("read", FakeOperation::new());
        traced
            .call(vec![ResourceKey::new("thing:1")], None)
            .await
    });

    assert!(result.is_ok(), "call should succeed: {:?}", result);
    assert!(logs.contains("operation.call"), "Should log span name. Logs:\n{}", logs);
    assert!(logs.contains("operation=read"), "Should log operation. Logs:\n{}", logs);
    assert!(logs.contains("calling"), "Should log entry. Logs:\n{}", logs);
    assert!(logs.contains("answered"), "Should log answer. Logs:\n{}", logs);
    assert!(logs.contains("ok=1"), "Should count outcomes. Logs:\n{}", logs);
}

#[test]
fn traced_operation_logs_failure() {
    let (logs, result) = with_tracing(|| async {
        let fake = FakeOperation::new();
        fake.fail_with(OperationError::Transport("refused".into()));
        TracedOperation::new("read", fake)
            .call(vec![ResourceKey::new("thing:1")], None)
            .await
    });

    assert!(result.is_err());
    assert!(logs.contains("call failed"), "Should log failure. Logs:\n{}", logs);
    assert!(logs.contains("refused"), "Should include error. Logs:\n{}", logs);
}

#[tokio::test]
async fn traced_operation_forwards_arguments() {
    let fake = FakeOperation::new();
    let traced = TracedOperation::new("write", fake.clone());
    let mut payload = Payload::new();
    payload.insert("a".into(), serde_json::json!({"name": "x"}));

    let _ = traced
        .call(vec![ResourceKey::new("a")], Some(payload.clone()))
        .await;

    assert_eq!(fake.calls()[0].payload, Some(payload));
}

#[test]
fn tracing_inspector_warns_on_failures() {
    let (logs, ()) = with_tracing(|| async {
        TracingInspector.observe(&InspectorEvent::RecordFailed {
            record: RecordId(4),
            key: ResourceKey::new("thing:1"),
            error: ResourceError::MissingResult,
        });
        TracingInspector.observe(&InspectorEvent::RecordsCleaned { count: 2 });
    });

    assert!(logs.contains("WARN"), "Failures log at warn. Logs:\n{}", logs);
    assert!(logs.contains("record_failed"), "Logs:\n{}", logs);
    assert!(logs.contains("rec-4"), "Logs:\n{}", logs);
    assert!(logs.contains("records_cleaned"), "Logs:\n{}", logs);
}
