mod classify;
mod http;
pub mod hosts;
mod prober;
mod progress;
mod resolver;
mod scanner;
pub mod sink;
mod types;

pub use classify::{check_host, classify};
pub use http::create_http_pool;
pub use prober::{HttpProber, Probe};
pub use progress::{estimate_remaining, Progress, ProgressTracker};
pub use resolver::{DnsResolver, Resolve};
pub use scanner::{ScanError, ScanRun, Scanner};
pub use types::{
    ProbeOutcome, ResolutionResult, ScanConfig, Scheme, StatusRecord, Verdict, DEFAULT_USER_AGENT,
};

use futures::StreamExt;

pub async fn check(host: &str) -> Result<StatusRecord, ScanError> {
    Ok(Scanner::new()?.check_one(host).await)
}

pub async fn check_many<I>(hosts: I) -> Result<Vec<StatusRecord>, ScanError>
where
    I: IntoIterator<Item = String>,
{
    Ok(Scanner::new()?.run(hosts).collect().await)
}
