use async_trait::async_trait;
use parking_lot::Mutex;
use print_server::core::Backends;
use print_server::printing::{DispatchWorker, dispatch_next};
use print_server::{AdmissionController, Config, ErrorCode, PrintService, PrintState};
use receipt_printer::{HardwarePrinter, PrintError, PrintResult, PrinterTransport, SessionConfig};
use shared::models::{JobStatus, PrinterCommand};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

const TOKEN: &str = "test-token";

fn config() -> Config {
    Config {
        queue_capacity: 10,
        max_concurrent_jobs: 1,
        dispatcher_workers: 1,
        admin_token: TOKEN.into(),
        ..Config::default()
    }
}

fn mock_service(config: Config) -> PrintService {
    PrintService::new(PrintState::new(config, Backends::mock(32)))
}

fn enabled_team(service: &PrintService, name: &str, script: &str) -> String {
    let id = match service.submit(name, script) {
        Ok(id) => id,
        Err(e) => e.detail("team_id").unwrap().as_str().unwrap().to_string(),
    };
    service
        .admin(TOKEN)
        .unwrap()
        .set_printer_enabled(&id, true)
        .unwrap();
    id
}

/// Transport whose connect results are scripted and whose calls are shared
#[derive(Default)]
struct ScriptedTransport {
    calls: Arc<Mutex<Vec<&'static str>>>,
    connects: VecDeque<PrintResult<()>>,
    /// Admission slots held while data is sent
    observed_active: Option<(Arc<AdmissionController>, Arc<Mutex<Vec<usize>>>)>,
    send_delay: Duration,
    /// Every byte that reached the device
    sent: Arc<Mutex<Vec<u8>>>,
}

#[async_trait]
impl PrinterTransport for ScriptedTransport {
    fn describe(&self) -> String {
        "TCP:scripted".into()
    }

    async fn connect(&mut self) -> PrintResult<()> {
        self.calls.lock().push("connect");
        self.connects.pop_front().unwrap_or(Ok(()))
    }

    async fn begin_transaction(&mut self) -> PrintResult<()> {
        self.calls.lock().push("begin");
        Ok(())
    }

    async fn send_data(&mut self, data: &[u8]) -> PrintResult<()> {
        self.calls.lock().push("send");
        self.sent.lock().extend_from_slice(data);
        if let Some((admission, seen)) = &self.observed_active {
            seen.lock().push(admission.active());
        }
        if !self.send_delay.is_zero() {
            tokio::time::sleep(self.send_delay).await;
        }
        Ok(())
    }

    async fn end_transaction(&mut self) -> PrintResult<()> {
        self.calls.lock().push("end");
        Ok(())
    }

    async fn disconnect(&mut self) -> PrintResult<()> {
        self.calls.lock().push("disconnect");
        Ok(())
    }

    async fn is_online(&self) -> bool {
        true
    }
}

fn session() -> SessionConfig {
    SessionConfig {
        settle_delay: Duration::ZERO,
        retry_pause: Duration::from_millis(10),
        ..SessionConfig::default()
    }
}

fn hardware_service(transport: ScriptedTransport) -> PrintService {
    let printer = receipt_printer::shared(HardwarePrinter::new(transport, session()));
    PrintService::new(PrintState::new(config(), Backends::with_hardware(32, printer)))
}

#[test]
fn test_empty_elements_yield_one_test_receipt() {
    let service = mock_service(config());
    let team = enabled_team(&service, "Team Rocket", "");

    let job_id = service
        .ingest_print_request(&team, br#"{"elements":[]}"#)
        .unwrap();

    let job = service.get_job(&job_id).unwrap();
    assert_eq!(job.commands.len(), 1);
    match &job.commands[0] {
        PrinterCommand::Text { content, .. } => {
            assert!(content.contains("TEST RECEIPT"));
            assert!(content.contains("team-rocket"));
        }
        other => panic!("expected text, got {other:?}"),
    }
}

#[tokio::test]
async fn test_invalid_script_never_reaches_backend() {
    let service = mock_service(config());
    let err = service
        .submit("Broken", "printer.addText(\"no entry point\")")
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::ScriptInvalid);

    // The team exists, but the stored script is refused at execution too
    let team = enabled_team(&service, "Broken", "printer.addText(\"no entry point\")");
    let job_id = service.ingest_print_request(&team, b"hello").unwrap();
    let job = dispatch_next(service.state()).await.unwrap().unwrap();

    assert_eq!(job.id, job_id);
    assert_eq!(job.status, JobStatus::Failed);
    assert!(service.receipts().is_empty());
}

#[tokio::test]
async fn test_script_mode_prints_through_mock() {
    let service = mock_service(config());
    let script = r#"
        fun interpret(jsonString: String, printer: EpsonPrinter) {
            printer.addTextAlign(Alignment.CENTER)
            printer.addTextStyle(TextStyle(bold = true))
            printer.addText("WINNERS")
            printer.addFeedLine(1)
            printer.cutPaper()
        }
    "#;
    let team = enabled_team(&service, "Gamma", script);
    service.ingest_print_request(&team, b"ignored").unwrap();

    let job = dispatch_next(service.state()).await.unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Completed);
    let receipt = service.receipts().last().unwrap();
    assert!(receipt.contains("**WINNERS**"));
}

#[tokio::test(start_paused = true)]
async fn test_already_connected_is_recovered_once() {
    let calls = Arc::new(Mutex::new(Vec::new()));
    let service = hardware_service(ScriptedTransport {
        calls: calls.clone(),
        connects: VecDeque::from([Err(PrintError::AlreadyConnected), Ok(())]),
        ..Default::default()
    });
    let team = enabled_team(&service, "Delta", "");
    service.ingest_print_request(&team, b"on paper").unwrap();

    let job = dispatch_next(service.state()).await.unwrap().unwrap();

    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(
        *calls.lock(),
        ["connect", "disconnect", "connect", "begin", "send", "end", "disconnect"]
    );
    // Hardware jobs leave the mock untouched
    assert!(service.receipts().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_other_connect_error_fails_without_retry() {
    let calls = Arc::new(Mutex::new(Vec::new()));
    let service = hardware_service(ScriptedTransport {
        calls: calls.clone(),
        connects: VecDeque::from([Err(PrintError::Connection("refused".into()))]),
        ..Default::default()
    });
    let team = enabled_team(&service, "Delta", "");
    service.ingest_print_request(&team, b"on paper").unwrap();

    let job = dispatch_next(service.state()).await.unwrap().unwrap();

    assert_eq!(job.status, JobStatus::Failed);
    assert!(job.error.as_deref().unwrap().contains("refused"));
    let calls = calls.lock();
    // One failed attempt, then the diagnostic receipt's own session
    assert_eq!(&calls[..3], ["connect", "disconnect", "connect"]);
    assert_eq!(calls.iter().filter(|c| **c == "connect").count(), 2);
    assert_eq!(service.statistics().jobs_failed, 1);
    assert_eq!(job.error_code, Some(ErrorCode::PrinterNotAvailable));
}

#[tokio::test(start_paused = true)]
async fn test_failed_job_prints_only_the_diagnostic() {
    let calls = Arc::new(Mutex::new(Vec::new()));
    let sent = Arc::new(Mutex::new(Vec::new()));
    let service = hardware_service(ScriptedTransport {
        calls: calls.clone(),
        sent: sent.clone(),
        ..Default::default()
    });
    let team = enabled_team(&service, "Theta", "");
    service
        .ingest_print_request(
            &team,
            br#"{"commands":[{"type":"TEXT","content":"SECRET-PARTIAL"},{"type":"BARCODE","data":""}]}"#,
        )
        .unwrap();

    let job = dispatch_next(service.state()).await.unwrap().unwrap();

    assert_eq!(job.status, JobStatus::Failed);
    assert_eq!(job.error_code, Some(ErrorCode::PrintFailed));
    // The diagnostic receipt is the only session
    assert_eq!(*calls.lock(), ["connect", "begin", "send", "end", "disconnect"]);
    let sent = sent.lock();
    let contains = |needle: &[u8]| sent.windows(needle.len()).any(|w| w == needle);
    assert!(contains(b"INTERPRETER ERROR"));
    assert!(!contains(b"SECRET-PARTIAL"));
}

#[tokio::test]
async fn test_unparsable_json_prints_as_text() {
    let service = mock_service(config());
    let team = enabled_team(&service, "Iota", "");
    let job_id = service
        .ingest_print_request(&team, br#"{"commands": [ {"type":"TEXT","content":"hi"}"#)
        .unwrap();

    let job = dispatch_next(service.state()).await.unwrap().unwrap();
    assert_eq!(job.id, job_id);
    assert_eq!(job.status, JobStatus::Completed);
    assert!(service.receipts().last().unwrap().starts_with(r#"{"commands": ["#));
}

#[test]
fn test_delete_team_removes_exactly_its_jobs() {
    let service = mock_service(config());
    let doomed = enabled_team(&service, "Doomed", "");
    let other = enabled_team(&service, "Survivor", "");
    service.ingest_print_request(&doomed, b"1").unwrap();
    service.ingest_print_request(&other, b"2").unwrap();
    service.ingest_print_request(&doomed, b"3").unwrap();
    assert_eq!(service.queue_status().current_size, 3);

    assert!(service.admin(TOKEN).unwrap().delete_team(&doomed));

    let status = service.queue_status();
    assert_eq!(status.current_size, 1);
    let queued = service.admin(TOKEN).unwrap().queued_jobs();
    assert_eq!(queued[0].team_id, other);
    assert_eq!(queued[0].queue_position, Some(1));
    assert_eq!(service.statistics().jobs_cancelled, 2);
}

#[test]
fn test_full_queue_rejects_and_keeps_contents() {
    let service = mock_service(Config {
        queue_capacity: 2,
        ..config()
    });
    let team = enabled_team(&service, "Epsilon", "");
    service.ingest_print_request(&team, b"a").unwrap();
    service.ingest_print_request(&team, b"b").unwrap();

    let err = service.ingest_print_request(&team, b"c").unwrap_err();
    assert_eq!(err.code, ErrorCode::QueueFull);
    let status = service.queue_status();
    assert_eq!(status.current_size, 2);
    assert!(status.is_full);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_workers_never_exceed_admission_limit() {
    const K: usize = 2;
    let config = Config {
        max_concurrent_jobs: K,
        dispatcher_workers: 4,
        ..config()
    };

    // The transport samples the same gate the workers acquire from
    let mock_state = PrintState::new(config.clone(), Backends::mock(32));
    let seen = Arc::new(Mutex::new(Vec::new()));
    let transport = ScriptedTransport {
        observed_active: Some((mock_state.admission.clone(), seen.clone())),
        send_delay: Duration::from_millis(5),
        ..Default::default()
    };
    let printer = receipt_printer::shared(HardwarePrinter::new(transport, session()));
    let state = PrintState {
        backends: Backends::with_hardware(32, printer),
        ..mock_state
    };
    let service = PrintService::new(state.clone());

    let team = enabled_team(&service, "Zeta", "");
    for i in 0..6 {
        service
            .ingest_print_request(&team, format!("job {i}").as_bytes())
            .unwrap();
    }

    let shutdown = CancellationToken::new();
    let handles: Vec<_> = (0..config.dispatcher_workers)
        .map(|id| tokio::spawn(DispatchWorker::new(id, state.clone()).run(shutdown.clone())))
        .collect();

    tokio::time::timeout(Duration::from_secs(10), async {
        while service.statistics().total_processed < 6 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .unwrap();
    shutdown.cancel();
    for handle in handles {
        handle.await.unwrap();
    }

    let seen = seen.lock();
    assert_eq!(seen.len(), 6);
    assert!(seen.iter().all(|&active| (1..=K).contains(&active)));
    assert_eq!(service.statistics().jobs_succeeded, 6);
    assert_eq!(state.admission.active(), 0);
}

#[test]
fn test_admin_requires_token() {
    let service = mock_service(config());
    let team = service.submit("Eta", "").unwrap();

    assert_eq!(
        service.admin("wrong").err().map(|e| e.code),
        Some(ErrorCode::TokenInvalid)
    );
    assert_eq!(
        service.admin("").err().map(|e| e.code),
        Some(ErrorCode::NotAuthenticated)
    );
    // Nothing changed without the token
    assert_eq!(
        service.ingest_print_request(&team, b"x").unwrap_err().code,
        ErrorCode::PrinterNotEnabled
    );
}
