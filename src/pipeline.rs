// src/pipeline.rs
// =============================================================================
// One complete run: crawl, index, validate, reconcile, report.
//
// How it works:
// 1. Validate the config and resolve the root folder
// 2. Crawl and parse every document (blocking work, off the async runtime)
// 3. Build the heading index and the uid registry from the crawl
// 4. Feed every link to the validator engine and wait for it
// 5. Look for orphaned resources, unless the run was cancelled
// 6. Sort everything into a `Report`
//
// The pipeline never decides the exit code; it hands back the report and the
// binary maps its outcome.
// =============================================================================

use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::checker::{
    ClassifiedLink, ClassifyOptions, Engine, EngineOptions, HeadingIndex, HttpChecker,
    HttpOptions, ValidationContext, XrefRegistry,
};
use crate::config::Config;
use crate::crawl::{crawl, CrawlOptions, CrawlResult};
use crate::error::Error;
use crate::orphans::reconcile;
use crate::report::{Finding, Report, Severity, Summary};

pub async fn run(config: &Config, cancel: CancellationToken) -> Result<Report, Error> {
    config.validate()?;

    // Canonical root, so every later path comparison sees the same prefix
    let root = match config.root.canonicalize() {
        Ok(root) if root.is_dir() => root,
        Ok(_) => {
            return Ok(Report::aborted(Finding::at_file_start(
                &config.root,
                Severity::Error,
                "root is not a directory",
            )))
        }
        Err(e) => {
            return Ok(Report::aborted(Finding::at_file_start(
                &config.root,
                Severity::Error,
                format!("cannot open root folder: {}", e),
            )))
        }
    };
    info!("Checking {}", root.display());

    let mut crawl_options = CrawlOptions::from(config);
    crawl_options.root = root.clone();
    let CrawlResult {
        documents,
        mut findings,
        files_processed,
    } = tokio::task::spawn_blocking(move || crawl(&crawl_options)).await?;
    debug!("Crawled {} documents", files_processed);

    let headings = HeadingIndex::build(&documents);
    let uids = config
        .xref
        .uids
        .iter()
        .cloned()
        .chain(documents.iter().filter_map(|document| document.uid.clone()));
    let xrefs = XrefRegistry::new(config.xref.policy, uids);

    let http = if config.check_external {
        Some(HttpChecker::new(&HttpOptions::from(config))?)
    } else {
        None
    };

    let context = Arc::new(ValidationContext {
        root: root.clone(),
        document_extensions: config.extensions.clone(),
        headings,
        xrefs,
        skip_urls: config.skip_urls.clone(),
        http,
    });

    let mut engine = Engine::start(
        Arc::clone(&context),
        &EngineOptions::from(config),
        cancel.clone(),
    );
    let classify_options = ClassifyOptions::from(config);
    'documents: for document in documents {
        for link in document.links {
            if cancel.is_cancelled() {
                break 'documents;
            }
            engine
                .enqueue(ClassifiedLink::new(link, &classify_options))
                .await?;
        }
    }
    engine.signal_no_more_input();
    let output = engine.finish().await?;

    if let Some(http) = &context.http {
        debug!("{} distinct URLs checked", http.checked_urls());
    }

    let cancelled = cancel.is_cancelled();
    let mut orphans = 0;
    if config.orphans_enabled() {
        if cancelled {
            // An incomplete reference set would report false orphans
            info!("Run cancelled, skipping the orphaned resource check");
        } else {
            let resource_dir = config.resource_dir.clone();
            let cleanup = config.cleanup_orphans;
            let referenced = output.resolved_resources;
            let report = tokio::task::spawn_blocking(move || {
                reconcile(&root, &resource_dir, &referenced, cleanup)
            })
            .await?;
            orphans = report.orphans;
            findings.extend(report.findings);
        }
    }

    findings.extend(output.findings);
    let summary = Summary {
        files_processed,
        links_checked: output.checked,
        links_resolved: output.resolved,
        links_failed: output.failed,
        orphans,
        ..Summary::default()
    };
    Ok(Report::new(findings, summary, cancelled))
}
