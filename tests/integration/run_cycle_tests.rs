use super::*;
use chrono::Duration;
use std::sync::Arc;
use stock_watcher::config::HttpConfig;
use stock_watcher::models::StockState;
use stock_watcher::scraper::HttpFetcher;
use stock_watcher::state_store::StateStore;
use stock_watcher::RunMode;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_forced_runs_against_http_page() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/products/switch"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<p>Sold Out</p>"))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir()?;
    let state_path = dir.path().join("monitor_state.json");
    let transport = RecordingTransport::default();
    let fetcher = Arc::new(HttpFetcher::new(&HttpConfig {
        timeout_seconds: 5,
        user_agent: "StockWatcher-Test/1.0".to_string(),
        accept_language: "en".to_string(),
    })?);
    let make_monitor = || {
        Monitor::new(
            fetcher.clone(),
            Box::new(JsonFileStore::new(&state_path)),
            Notifier::new(Box::new(transport.clone()), SENDER, Tz::UTC),
            Tz::UTC,
        )
    };

    let url = format!("{}/products/switch", server.uri());
    let targets = vec![target(&url)];
    let first_run = at(10, 0, 0);

    // First run: unknown -> out_of_stock, one email to the out-of-stock list.
    let summary = make_monitor().run(&targets, RunMode::Forced, first_run).await?;
    assert_eq!(summary.checked, 1);
    assert_eq!(summary.transitions, 1);
    assert_eq!(summary.emails_sent, 1);

    let sent = transport.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, vec!["restock-watch@example.com"]);
    assert_eq!(sent[0].from, SENDER);
    assert!(sent[0].subject.contains("OUT OF STOCK"));
    assert!(sent[0].subject.contains(&url));
    assert!(sent[0].body.contains("Previous state: unknown"));
    assert!(sent[0].body.contains("New state: out_of_stock"));

    let state = JsonFileStore::new(&state_path).load().await?;
    assert_eq!(state.get(&url).unwrap().last_state, StockState::OutOfStock);

    // Second run ten seconds later with the same page: no email, same state.
    let second_run = first_run + Duration::seconds(10);
    let summary = make_monitor().run(&targets, RunMode::Forced, second_run).await?;
    assert_eq!(summary.checked, 1);
    assert_eq!(summary.transitions, 0);
    assert_eq!(summary.emails_sent, 0);
    assert_eq!(transport.sent().len(), 1);

    let state = JsonFileStore::new(&state_path).load().await?;
    let entry = state.get(&url).unwrap();
    assert_eq!(entry.last_state, StockState::OutOfStock);
    assert_eq!(entry.last_checked_at, Some(second_run));

    Ok(())
}

#[tokio::test]
async fn test_same_state_suppressed_by_default() -> anyhow::Result<()> {
    let harness = TestHarness::new();
    let url = "https://shop.example.com/camera";
    harness.fetcher.set_page(url, "<button>Add to cart</button>");
    let targets = vec![target(url)];

    harness.monitor().run(&targets, RunMode::Forced, at(9, 0, 0)).await?;
    harness.monitor().run(&targets, RunMode::Forced, at(10, 0, 0)).await?;

    let sent = harness.transport.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, vec!["buyers@example.com"]);
    assert!(sent[0].subject.contains("IN STOCK"));

    Ok(())
}

#[tokio::test]
async fn test_same_state_notified_when_requested() -> anyhow::Result<()> {
    let harness = TestHarness::new();
    let url = "https://shop.example.com/camera";
    harness.fetcher.set_page(url, "<button>Add to cart</button>");
    let mut watched = target(url);
    watched.notify_on_same_state = true;
    let targets = vec![watched];

    harness.monitor().run(&targets, RunMode::Forced, at(9, 0, 0)).await?;
    harness.monitor().run(&targets, RunMode::Forced, at(10, 0, 0)).await?;

    assert_eq!(harness.transport.sent().len(), 2);

    Ok(())
}

#[tokio::test]
async fn test_back_in_stock_goes_to_in_stock_list() -> anyhow::Result<()> {
    let harness = TestHarness::new();
    let url = "https://shop.example.com/console";
    let targets = vec![target(url)];

    harness.fetcher.set_page(url, "SOLD OUT");
    harness.monitor().run(&targets, RunMode::Forced, at(9, 0, 0)).await?;

    harness.fetcher.set_page(url, "Add to cart");
    let summary = harness.monitor().run(&targets, RunMode::Forced, at(10, 0, 0)).await?;
    assert_eq!(summary.transitions, 1);

    let sent = harness.transport.sent();
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[0].to, vec!["restock-watch@example.com"]);
    assert_eq!(sent[1].to, vec!["buyers@example.com"]);
    assert!(sent[1].body.contains("Previous state: out_of_stock"));

    Ok(())
}

#[tokio::test]
async fn test_scheduled_run_skips_targets_not_due() -> anyhow::Result<()> {
    let harness = TestHarness::new();
    let url = "https://shop.example.com/console";
    harness.fetcher.set_page(url, "in stock");
    let targets = vec![target(url)];

    let summary = harness.monitor().run(&targets, RunMode::Scheduled, at(9, 0, 0)).await?;
    assert_eq!(summary.checked, 1);

    let summary = harness.monitor().run(&targets, RunMode::Scheduled, at(9, 30, 0)).await?;
    assert_eq!(summary.checked, 0);
    assert_eq!(summary.skipped, 1);
    assert_eq!(harness.fetcher.calls(), 1);

    let summary = harness.monitor().run(&targets, RunMode::Scheduled, at(10, 0, 0)).await?;
    assert_eq!(summary.checked, 1);
    assert_eq!(harness.fetcher.calls(), 2);

    // Forced runs ignore the schedule.
    let summary = harness.monitor().run(&targets, RunMode::Forced, at(10, 0, 1)).await?;
    assert_eq!(summary.checked, 1);
    assert_eq!(harness.fetcher.calls(), 3);

    Ok(())
}

#[tokio::test]
async fn test_failing_target_does_not_stop_the_run() -> anyhow::Result<()> {
    let harness = TestHarness::new();
    let broken = "https://down.example.com/item";
    let empty = "https://empty.example.com/item";
    let healthy = "https://shop.example.com/item";
    harness.fetcher.set_page(empty, "   ");
    harness.fetcher.set_page(healthy, "sold out");
    let targets = vec![target(broken), target(empty), target(healthy)];

    let summary = harness.monitor().run(&targets, RunMode::Forced, at(12, 0, 0)).await?;
    assert_eq!(summary.checked, 3);
    assert_eq!(summary.failed, 2);
    assert_eq!(summary.emails_sent, 1);

    let state = harness.store().load().await?;
    assert!(state.get(broken).is_none());
    assert!(state.get(empty).is_none());
    assert_eq!(state.get(healthy).unwrap().last_state, StockState::OutOfStock);

    // A failed target stays due on the next scheduled run.
    let summary = harness.monitor().run(&targets, RunMode::Scheduled, at(12, 1, 0)).await?;
    assert_eq!(summary.checked, 2);
    assert_eq!(summary.skipped, 1);

    Ok(())
}

#[tokio::test]
async fn test_delivery_failure_keeps_recorded_state() -> anyhow::Result<()> {
    let harness = TestHarness::with_transport(RecordingTransport::failing());
    let url = "https://shop.example.com/item";
    harness.fetcher.set_page(url, "Sold out");
    let targets = vec![target(url)];

    let summary = harness.monitor().run(&targets, RunMode::Forced, at(8, 0, 0)).await?;
    assert_eq!(summary.delivery_failures, 1);
    assert_eq!(summary.failed, 0);

    let state = harness.store().load().await?;
    let entry = state.get(url).unwrap();
    assert_eq!(entry.last_state, StockState::OutOfStock);
    assert_eq!(entry.last_checked_at, Some(at(8, 0, 0)));
    assert_eq!(entry.last_matched_term.as_deref(), Some("sold out"));

    // The transition was consumed; the same state is not re-attempted.
    let summary = harness.monitor().run(&targets, RunMode::Forced, at(9, 0, 0)).await?;
    assert_eq!(summary.transitions, 0);
    assert_eq!(summary.delivery_failures, 0);

    Ok(())
}

#[tokio::test]
async fn test_corrupted_state_aborts_before_any_check() -> anyhow::Result<()> {
    let harness = TestHarness::new();
    std::fs::write(harness.state_path(), "not json at all")?;
    let url = "https://shop.example.com/item";
    harness.fetcher.set_page(url, "Sold out");

    let result = harness.monitor().run(&[target(url)], RunMode::Forced, at(8, 0, 0)).await;

    assert!(matches!(result, Err(AppError::StateCorrupt { .. })));
    assert_eq!(harness.fetcher.calls(), 0);
    assert!(harness.transport.sent().is_empty());
    assert_eq!(std::fs::read_to_string(harness.state_path())?, "not json at all");

    Ok(())
}

#[tokio::test]
async fn test_targets_checked_in_configuration_order() -> anyhow::Result<()> {
    let harness = TestHarness::new();
    let urls = ["https://c.example.com/p", "https://a.example.com/p", "https://b.example.com/p"];
    for url in urls {
        harness.fetcher.set_page(url, "sold out");
    }
    let targets: Vec<_> = urls.iter().map(|url| target(url)).collect();

    harness.monitor().run(&targets, RunMode::Forced, at(7, 0, 0)).await?;

    let subjects: Vec<String> = harness.transport.sent().into_iter().map(|e| e.subject).collect();
    assert_eq!(subjects.len(), 3);
    for (subject, url) in subjects.iter().zip(urls) {
        assert!(subject.ends_with(url), "{} should name {}", subject, url);
    }

    Ok(())
}

#[derive(Clone, Default)]
struct CapturedLogs(Arc<std::sync::Mutex<Vec<u8>>>);

impl std::io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[tokio::test]
async fn test_cycle_summary_reports_transitions() -> anyhow::Result<()> {
    let logs = CapturedLogs::default();
    let writer = logs.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_ansi(false)
        .with_writer(move || writer.clone())
        .finish();
    let _default = tracing::subscriber::set_default(subscriber);

    let harness = TestHarness::new();
    let url = "https://shop.example.com/item";
    harness.fetcher.set_page(url, "Sold out");

    harness.monitor().run(&[target(url)], RunMode::Forced, at(8, 0, 0)).await?;

    let output = String::from_utf8(logs.0.lock().unwrap().clone())?;
    let summary = output
        .lines()
        .find(|line| line.contains("Cycle finished"))
        .expect("summary line logged");
    assert!(summary.contains("checked=1"));
    assert!(summary.contains("transitions=1"));
    assert!(summary.contains("emails_sent=1"));

    Ok(())
}
