use crate::{
    classify::{check_host, panic_message},
    http::create_http_pool,
    progress::{Progress, ProgressTracker},
    prober::{HttpProber, Probe},
    resolver::{DnsResolver, Resolve},
    types::{ScanConfig, StatusRecord},
};
use futures::{
    channel::mpsc,
    stream::{Stream, StreamExt},
    SinkExt,
};
use std::{
    collections::VecDeque,
    pin::Pin,
    sync::{Arc, Mutex, PoisonError},
    task::{Context, Poll},
    time::{Duration, Instant},
};
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("Failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
}

type HostQueue = Arc<Mutex<VecDeque<String>>>;
type ProgressFn = Box<dyn FnMut(&Progress) + Send>;

pub struct Scanner {
    resolver: Arc<dyn Resolve>,
    prober: Arc<dyn Probe>,
    config: ScanConfig,
}

impl Scanner {
    pub fn new() -> Result<Self, ScanError> {
        Self::with_config(ScanConfig::default())
    }

    pub fn with_config(config: ScanConfig) -> Result<Self, ScanError> {
        let client = create_http_pool(&config.user_agent)?;
        Ok(Self::with_components(
            Arc::new(DnsResolver::new(config.dns_timeout)),
            Arc::new(HttpProber::new(client)),
            config,
        ))
    }

    pub fn with_components(
        resolver: Arc<dyn Resolve>,
        prober: Arc<dyn Probe>,
        config: ScanConfig,
    ) -> Self {
        Self {
            resolver,
            prober,
            config,
        }
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    pub async fn check_one(&self, host: &str) -> StatusRecord {
        check_host(
            self.resolver.as_ref(),
            self.prober.as_ref(),
            host,
            self.config.timeout,
            self.config.get_fallback,
        )
        .await
    }

    /// Starts the scan. Must be called inside a tokio runtime.
    pub fn run<I>(&self, hosts: I) -> ScanRun
    where
        I: IntoIterator<Item = String>,
    {
        self.run_with_progress(hosts, |progress: &Progress| {
            debug!(
                completed = progress.completed,
                total = progress.total,
                "Scan progress"
            );
        })
    }

    pub fn run_with_progress<I, F>(&self, hosts: I, on_progress: F) -> ScanRun
    where
        I: IntoIterator<Item = String>,
        F: FnMut(&Progress) + Send + 'static,
    {
        let queue: VecDeque<String> = hosts.into_iter().collect();
        let total = queue.len();
        let workers = self.config.workers.max(1).min(total.max(1));
        let queue: HostQueue = Arc::new(Mutex::new(queue));
        let (tx, rx) = mpsc::channel(workers);

        info!(
            hosts = total,
            workers,
            timeout_secs = self.config.timeout.as_secs(),
            "Starting scan"
        );

        let started_at = Instant::now();
        for id in 0..workers {
            tokio::spawn(worker(
                id,
                Arc::clone(&queue),
                Arc::clone(&self.resolver),
                Arc::clone(&self.prober),
                self.config.timeout,
                self.config.get_fallback,
                tx.clone(),
            ));
        }
        drop(tx);

        ScanRun {
            total,
            worker_count: workers,
            timeout: self.config.timeout,
            started_at,
            results: rx,
            tracker: ProgressTracker::starting_at(total, started_at),
            on_progress: Box::new(on_progress),
        }
    }
}

fn next_host(queue: &HostQueue) -> Option<String> {
    queue
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .pop_front()
}

async fn worker(
    id: usize,
    queue: HostQueue,
    resolver: Arc<dyn Resolve>,
    prober: Arc<dyn Probe>,
    timeout: Duration,
    allow_get_fallback: bool,
    mut results: mpsc::Sender<StatusRecord>,
) {
    while let Some(host) = next_host(&queue) {
        let task = {
            let resolver = Arc::clone(&resolver);
            let prober = Arc::clone(&prober);
            let host = host.clone();
            tokio::spawn(async move {
                check_host(
                    resolver.as_ref(),
                    prober.as_ref(),
                    &host,
                    timeout,
                    allow_get_fallback,
                )
                .await
            })
        };

        let record = match task.await {
            Ok(record) => record,
            Err(e) => {
                let description = if e.is_panic() {
                    let payload = e.into_panic();
                    panic_message(&*payload)
                } else {
                    e.to_string()
                };
                warn!(worker = id, host = %host, error = %description, "Host task failed");
                StatusRecord::error(&host, description)
            }
        };

        if results.send(record).await.is_err() {
            debug!(worker = id, "Result consumer gone, stopping");
            break;
        }
    }
}

/// One scan invocation. Yields records in completion order and is consumed
/// exactly once.
pub struct ScanRun {
    total: usize,
    worker_count: usize,
    timeout: Duration,
    started_at: Instant,
    results: mpsc::Receiver<StatusRecord>,
    tracker: ProgressTracker,
    on_progress: ProgressFn,
}

impl ScanRun {
    pub fn total(&self) -> usize {
        self.total
    }

    pub fn worker_count(&self) -> usize {
        self.worker_count
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn started_at(&self) -> Instant {
        self.started_at
    }

    pub fn completed(&self) -> usize {
        self.tracker.completed()
    }
}

impl Stream for ScanRun {
    type Item = StatusRecord;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<StatusRecord>> {
        let this = &mut *self;
        match this.results.poll_next_unpin(cx) {
            Poll::Ready(Some(record)) => {
                if let Some(progress) = this.tracker.record_completion() {
                    (this.on_progress)(&progress);
                }
                Poll::Ready(Some(record))
            }
            Poll::Ready(None) => {
                if this.tracker.completed() != this.total {
                    warn!(
                        completed = this.tracker.completed(),
                        total = this.total,
                        "Scan ended with missing records"
                    );
                } else {
                    info!(
                        hosts = this.total,
                        elapsed_secs = this.started_at.elapsed().as_secs_f64(),
                        "Scan finished"
                    );
                }
                Poll::Ready(None)
            }
            Poll::Pending => Poll::Pending,
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = self.total.saturating_sub(self.tracker.completed());
        (0, Some(left))
    }
}
