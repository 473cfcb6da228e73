use std::fs;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use log_sink::{LogClock, LogTarget};
use style_provider::CancelSignal;
use style_provider_mock::{MockProvider, MockReply};
use workload_logger::error::UpdateError;
use workload_logger::oneshot::log_once;
use workload_logger::session::Session;
use workload_logger::transformer::{PromptTemplate, StyleTransformer};

fn not_cancelled() -> CancelSignal {
    Arc::new(AtomicBool::new(false))
}

fn transformer(provider: &Arc<MockProvider>) -> StyleTransformer {
    StyleTransformer::new(provider.clone(), PromptTemplate::default())
}

#[test]
fn log_once_appends_cleaned_reply() {
    let dir = tempfile::tempdir().expect("tempdir");
    let log = dir.path().join("work.txt");
    fs::write(&log, "[2024-01-01 00:00:00] earlier\n").expect("seed log");
    let session = Session::with_target(LogTarget::open(&log).expect("open target"));
    let provider = Arc::new(MockProvider::new(vec![
        "```\n".to_string(),
        "[+] Merged   branch".to_string(),
        "\n```".to_string(),
    ]));

    let line = log_once(
        &transformer(&provider),
        &session,
        &LogClock::default(),
        "merged the branch",
        not_cancelled(),
    )
    .expect("update should succeed");

    assert!(line.ends_with("] [+] Merged branch"));
    assert_eq!(
        fs::read_to_string(&log).expect("read log"),
        format!("[2024-01-01 00:00:00] earlier\n{line}\n")
    );
}

#[test]
fn log_once_checks_target_before_transforming() {
    let provider = Arc::new(MockProvider::with_fallback(MockReply::Echo));

    let error = log_once(
        &transformer(&provider),
        &Session::new(),
        &LogClock::default(),
        "note",
        not_cancelled(),
    )
    .expect_err("missing target should fail");

    assert!(matches!(error, UpdateError::NoFileSelected));
    assert!(provider.prompts().is_empty());
}

#[test]
fn log_once_rejects_blank_note() {
    let dir = tempfile::tempdir().expect("tempdir");
    let log = dir.path().join("work.txt");
    fs::write(&log, "").expect("seed log");
    let session = Session::with_target(LogTarget::open(&log).expect("open target"));
    let provider = Arc::new(MockProvider::with_fallback(MockReply::Echo));

    let error = log_once(
        &transformer(&provider),
        &session,
        &LogClock::default(),
        " \t ",
        not_cancelled(),
    )
    .expect_err("blank note should fail");

    assert!(matches!(error, UpdateError::EmptyInput));
    assert!(provider.prompts().is_empty());
    assert_eq!(fs::read_to_string(&log).expect("read log"), "");
}

#[test]
fn log_once_reports_provider_failure_without_writing() {
    let dir = tempfile::tempdir().expect("tempdir");
    let log = dir.path().join("work.txt");
    fs::write(&log, "").expect("seed log");
    let session = Session::with_target(LogTarget::open(&log).expect("open target"));
    let provider = Arc::new(MockProvider::failing("HTTP 401 API key not valid"));

    let error = log_once(
        &transformer(&provider),
        &session,
        &LogClock::default(),
        "note",
        not_cancelled(),
    )
    .expect_err("provider failure should surface");

    assert_eq!(
        error.to_string(),
        "Transformation failed: HTTP 401 API key not valid"
    );
    assert_eq!(fs::read_to_string(&log).expect("read log"), "");
}
