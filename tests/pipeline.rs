// End-to-end runs of the pipeline over small documentation trees on disk

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use doc_link_guardian::{run, Config, Error, Finding, Outcome, Report, Severity};

fn write(root: &Path, relative: &str, content: &str) {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

fn config(root: &Path) -> Config {
    Config {
        root: root.to_path_buf(),
        concurrency: 4,
        ..Config::default()
    }
}

async fn check(config: &Config) -> Report {
    run(config, CancellationToken::new()).await.unwrap()
}

fn findings_in<'a>(report: &'a Report, file: &str) -> Vec<&'a Finding> {
    report
        .findings
        .iter()
        .filter(|f| f.file == PathBuf::from(file))
        .collect()
}

// A small tree with one problem of each local kind
fn docs_tree() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "index.md",
        "# Home\n\
         \n\
         See [setup](guide/setup.md) and [install](guide/setup.md#install).\n\
         Broken: [gone](./missing.md)\n\
         Bad anchor: [x](guide/setup.md#section)\n",
    );
    write(
        dir.path(),
        "guide/setup.md",
        "# Setup\n\
         \n\
         ## Install\n\
         \n\
         ![shot](.attachments/img1.png)\n\
         Back to [home](../index.md#home).\n",
    );
    write(dir.path(), "guide/.attachments/img1.png", "png");
    write(dir.path(), "guide/.attachments/img2.png", "png");
    dir
}

#[tokio::test]
async fn test_local_links_and_anchors() {
    let dir = docs_tree();
    let report = check(&config(dir.path())).await;

    let index = findings_in(&report, "index.md");
    assert_eq!(index.len(), 2, "{:?}", report.findings);
    assert_eq!(index[0].line, 4);
    assert_eq!(index[0].severity, Severity::Error);
    assert_eq!(index[0].message, "file not found: ./missing.md");
    assert_eq!(index[1].line, 5);
    assert_eq!(index[1].severity, Severity::Warning);

    assert!(findings_in(&report, "guide/setup.md").is_empty());
    assert_eq!(report.outcome, Outcome::Errors);
    assert_eq!(report.summary.files_processed, 2);
    assert_eq!(report.summary.links_checked, 6);
    assert_eq!(report.summary.links_failed, 2);
    assert!(!report.cancelled);
}

#[tokio::test]
async fn test_empty_link_is_one_warning() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "a.md", "Nothing here: []()\n");

    let report = check(&config(dir.path())).await;
    assert_eq!(report.findings.len(), 1, "{:?}", report.findings);
    assert_eq!(report.findings[0].severity, Severity::Warning);
    assert_eq!(report.findings[0].message, "empty link");
    assert_eq!(report.outcome, Outcome::WarningsOnly);
}

#[tokio::test]
async fn test_table_errors_can_be_disabled() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "tables.md",
        "| a | b | c |\n\
         |---|---|---|\n\
         | 1 | 2 |\n\
         | 4 | 5 | 6 |\n",
    );

    let report = check(&config(dir.path())).await;
    assert_eq!(report.findings.len(), 1);
    assert_eq!(report.findings[0].line, 3);
    assert_eq!(report.findings[0].severity, Severity::Error);

    let mut without_tables = config(dir.path());
    without_tables.check_tables = false;
    assert_eq!(check(&without_tables).await.outcome, Outcome::Clean);
}

#[tokio::test]
async fn test_orphans_reported_then_cleaned_up() {
    let dir = docs_tree();
    let mut config = config(dir.path());
    config.check_orphans = true;

    let report = check(&config).await;
    let orphans = findings_in(&report, "guide/.attachments/img2.png");
    assert_eq!(orphans.len(), 1);
    assert_eq!(orphans[0].message, "orphaned resource");
    assert_eq!(report.summary.orphans, 1);
    assert!(findings_in(&report, "guide/.attachments/img1.png").is_empty());

    config.cleanup_orphans = true;
    let report = check(&config).await;
    assert_eq!(
        findings_in(&report, "guide/.attachments/img2.png")[0].message,
        "orphaned resource deleted"
    );
    assert!(!dir.path().join("guide/.attachments/img2.png").exists());
    assert!(dir.path().join("guide/.attachments/img1.png").exists());
}

#[tokio::test]
async fn test_runs_are_repeatable_and_sorted() {
    let dir = docs_tree();
    write(dir.path(), "a.md", "[one](nope1.md)\n[two](nope2.md) [three](nope3.md)\n");
    let mut config = config(dir.path());
    config.check_orphans = true;

    let first = check(&config).await;
    let second = check(&config).await;
    assert_eq!(first.findings, second.findings);
    assert_eq!(first.summary, second.summary);

    let positions: Vec<_> = first
        .findings
        .iter()
        .map(|f| (f.file.clone(), f.line, f.column))
        .collect();
    let mut sorted = positions.clone();
    sorted.sort();
    assert_eq!(positions, sorted);
}

#[tokio::test]
async fn test_missing_root_is_a_single_error() {
    let dir = tempfile::tempdir().unwrap();
    let report = check(&config(&dir.path().join("does-not-exist"))).await;
    assert_eq!(report.findings.len(), 1);
    assert_eq!(report.findings[0].severity, Severity::Error);
    assert_eq!(report.outcome, Outcome::Errors);
}

#[tokio::test]
async fn test_invalid_config_aborts() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = config(dir.path());
    config.concurrency = 0;
    let result = run(&config, CancellationToken::new()).await;
    assert!(matches!(result, Err(Error::InvalidConfig(_))));
}

#[tokio::test]
async fn test_config_file_is_read_from_root() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), ".doclinkguardian.toml", "check_tables = false\nconcurrency = 2\n");
    let config = Config::load(dir.path(), None).unwrap();
    assert!(!config.check_tables);
    assert_eq!(config.concurrency, 2);
    assert_eq!(config.root, dir.path());

    write(dir.path(), ".doclinkguardian.toml", "no_such_key = 1\n");
    assert!(matches!(
        Config::load(dir.path(), None),
        Err(Error::ConfigParse { .. })
    ));
}

#[tokio::test]
async fn test_cancelled_run_is_marked_and_skips_orphans() {
    let dir = docs_tree();
    let mut config = config(dir.path());
    config.check_orphans = true;

    let cancel = CancellationToken::new();
    cancel.cancel();
    let report = run(&config, cancel).await.unwrap();
    assert!(report.cancelled);
    assert_eq!(report.summary.orphans, 0);
}

// Answers each request with the next status of `statuses` (the last one
// repeats)
async fn stub_server(statuses: Vec<u16>) -> (String, Arc<AtomicUsize>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap();
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = hits.clone();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let n = counter.fetch_add(1, Ordering::SeqCst);
            let status = statuses[n.min(statuses.len() - 1)];
            let mut buffer = [0u8; 2048];
            let _ = socket.read(&mut buffer).await;
            let response = format!(
                "HTTP/1.1 {} Stub\r\ncontent-length: 0\r\nconnection: close\r\n\r\n",
                status
            );
            let _ = socket.write_all(response.as_bytes()).await;
            let _ = socket.shutdown().await;
        }
    });

    (format!("http://{}", address), hits)
}

#[tokio::test]
async fn test_external_links_with_retries() {
    let (flaky, flaky_hits) = stub_server(vec![503, 503, 200]).await;
    let (down, down_hits) = stub_server(vec![500]).await;

    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "links.md",
        &format!(
            "[flaky]({flaky}/a)\n\
             [down]({down}/b)\n\
             [again]({down}/b#same-url)\n"
        ),
    );

    let mut config = config(dir.path());
    config.check_external = true;
    config.retry.backoff_ms = 10;
    config.timeout_secs = 5;

    let report = check(&config).await;
    assert_eq!(flaky_hits.load(Ordering::SeqCst), 3);
    // The second link to the same URL comes from the cache, unless both
    // workers raced on it
    assert!(down_hits.load(Ordering::SeqCst) >= 3);

    let errors: Vec<_> = report
        .findings
        .iter()
        .filter(|f| f.severity == Severity::Error)
        .collect();
    assert_eq!(errors.len(), 2, "{:?}", report.findings);
    assert!(errors.iter().all(|f| f.line >= 2));
}

// Accepts connections and never answers them
async fn silent_server() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            held.push(socket);
        }
    });
    format!("http://{}", address)
}

#[tokio::test]
async fn test_cancel_interrupts_checks_in_flight() {
    let silent = silent_server().await;
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "a.md",
        &format!("[gone](./missing.md)\n[slow]({silent}/slow)\n"),
    );

    let mut config = config(dir.path());
    config.check_external = true;
    assert_eq!(config.timeout_secs, 30);

    let cancel = CancellationToken::new();
    let canceller = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(300)).await;
        canceller.cancel();
    });

    let started = Instant::now();
    let report = run(&config, cancel).await.unwrap();
    assert!(started.elapsed() < Duration::from_secs(5), "{:?}", started.elapsed());
    assert!(report.cancelled);

    let local = findings_in(&report, "a.md");
    assert_eq!(local.len(), 1, "{:?}", report.findings);
    assert_eq!(local[0].line, 1);
    assert_eq!(local[0].severity, Severity::Error);
    assert_eq!(local[0].message, "file not found: ./missing.md");
}
