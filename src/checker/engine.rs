// src/checker/engine.rs
// =============================================================================
// The validator engine: a fixed pool of workers draining a bounded queue of
// classified links.
//
// Lifecycle:
// 1. `Engine::start` spawns `concurrency` workers sharing one receiver
// 2. The producer calls `enqueue` for every link; it waits when the queue is
//    full, which keeps memory flat on huge trees
// 3. `signal_no_more_input` closes the queue; workers drain what's left and
//    exit
// 4. `finish` joins the workers and merges their results
//
// Cancellation: every wait (enqueue, dequeue, network retry) races the
// token. After it fires, workers stop taking new links and in-flight network
// checks are abandoned without a finding.
//
// Dispatch is a plain `match` on the link kind; every handler returns a
// `LinkOutcome`.
// =============================================================================

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;

use futures::future::join_all;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::classify::{ClassifiedLink, LinkKind};
use super::context::ValidationContext;
use super::local;
use crate::config::Config;
use crate::error::Error;
use crate::report::Finding;

// What one link check produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkOutcome {
    /// The link is fine. `resource` is set when it points into a resource
    /// folder (relative to the root) so the orphan check can account for it.
    Resolved { resource: Option<PathBuf> },
    Failed(Finding),
}

#[derive(Debug, Clone, Copy)]
pub struct EngineOptions {
    /// Number of workers
    pub concurrency: usize,
    /// Links buffered between the producer and the workers
    pub queue_capacity: usize,
}

impl From<&Config> for EngineOptions {
    fn from(config: &Config) -> Self {
        EngineOptions {
            concurrency: config.concurrency,
            queue_capacity: config.queue_capacity,
        }
    }
}

// Results of all workers, merged
#[derive(Debug, Default)]
pub struct EngineOutput {
    pub findings: Vec<Finding>,
    pub checked: usize,
    pub resolved: usize,
    pub failed: usize,
    /// Resource files referenced by at least one resolved link
    pub resolved_resources: HashSet<PathBuf>,
}

impl EngineOutput {
    fn record(&mut self, outcome: LinkOutcome) {
        self.checked += 1;
        match outcome {
            LinkOutcome::Resolved { resource } => {
                self.resolved += 1;
                if let Some(resource) = resource {
                    self.resolved_resources.insert(resource);
                }
            }
            LinkOutcome::Failed(finding) => {
                self.failed += 1;
                self.findings.push(finding);
            }
        }
    }

    fn merge(&mut self, other: EngineOutput) {
        self.findings.extend(other.findings);
        self.checked += other.checked;
        self.resolved += other.resolved;
        self.failed += other.failed;
        self.resolved_resources.extend(other.resolved_resources);
    }
}

pub struct Engine {
    /// `None` once the producer signalled the end of input
    sender: Option<mpsc::Sender<ClassifiedLink>>,
    workers: Vec<JoinHandle<EngineOutput>>,
    cancel: CancellationToken,
}

impl Engine {
    // Spawns the worker pool; must be called inside a tokio runtime
    pub fn start(
        context: Arc<ValidationContext>,
        options: &EngineOptions,
        cancel: CancellationToken,
    ) -> Self {
        let (sender, receiver) = mpsc::channel(options.queue_capacity.max(1));
        // tokio's mpsc has a single consumer; the workers take turns on it
        let receiver = Arc::new(Mutex::new(receiver));

        let workers = (0..options.concurrency.max(1))
            .map(|id| {
                tokio::spawn(worker(
                    id,
                    Arc::clone(&context),
                    Arc::clone(&receiver),
                    cancel.clone(),
                ))
            })
            .collect();

        Engine {
            sender: Some(sender),
            workers,
            cancel,
        }
    }

    // Hands a link to the workers, waiting while the queue is full
    //
    // Returns Ok without queueing anything once the run is cancelled.
    pub async fn enqueue(&self, link: ClassifiedLink) -> Result<(), Error> {
        let Some(sender) = &self.sender else {
            return Err(Error::QueueClosed);
        };

        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Ok(()),
            sent = sender.send(link) => sent.map_err(|_| Error::QueueClosed),
        }
    }

    // Closes the queue; workers exit once it is drained
    pub fn signal_no_more_input(&mut self) {
        self.sender = None;
    }

    // Waits for every worker and merges their results
    pub async fn finish(mut self) -> Result<EngineOutput, Error> {
        self.signal_no_more_input();

        let mut output = EngineOutput::default();
        for joined in join_all(self.workers).await {
            output.merge(joined?);
        }
        Ok(output)
    }
}

async fn worker(
    id: usize,
    context: Arc<ValidationContext>,
    receiver: Arc<Mutex<mpsc::Receiver<ClassifiedLink>>>,
    cancel: CancellationToken,
) -> EngineOutput {
    let mut output = EngineOutput::default();

    loop {
        // The lock is released as soon as a link is taken, before the check
        let next = {
            let mut receiver = receiver.lock().await;
            tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                link = receiver.recv() => link,
            }
        };
        let Some(link) = next else { break };

        match validate(&context, &link, &cancel).await {
            Some(outcome) => output.record(outcome),
            None => break,
        }
    }

    debug!("Worker {} done after {} links", id, output.checked);
    output
}

// Checks one link; `None` means the check was abandoned because of cancellation
pub async fn validate(
    context: &ValidationContext,
    link: &ClassifiedLink,
    cancel: &CancellationToken,
) -> Option<LinkOutcome> {
    let outcome = match link.kind {
        LinkKind::Empty => local::check_empty(link),
        LinkKind::Local => local::check_local(context, link),
        LinkKind::Resource => local::check_resource(context, link),
        LinkKind::Webpage | LinkKind::Ftp => return check_remote(context, link, cancel).await,
        LinkKind::Mail => local::check_mail(link),
        LinkKind::CrossReference => local::check_xref(context, link),
        LinkKind::Tab => local::check_tab(link),
        LinkKind::Unrecognized => local::check_unrecognized(link),
    };
    Some(outcome)
}

async fn check_remote(
    context: &ValidationContext,
    link: &ClassifiedLink,
    cancel: &CancellationToken,
) -> Option<LinkOutcome> {
    // External checks disabled
    let Some(http) = &context.http else {
        return Some(LinkOutcome::Resolved { resource: None });
    };

    if context
        .skip_urls
        .iter()
        .any(|prefix| link.target.starts_with(prefix.as_str()))
    {
        debug!("Skipping {}", link.target);
        return Some(LinkOutcome::Resolved { resource: None });
    }

    let result = http.check(&link.target, cancel).await?;
    let outcome = match result.problem() {
        None => LinkOutcome::Resolved { resource: None },
        Some((severity, message)) => LinkOutcome::Failed(Finding::new(
            &link.link.file,
            link.link.line,
            link.link.column,
            severity,
            message,
        )),
    };
    Some(outcome)
}
