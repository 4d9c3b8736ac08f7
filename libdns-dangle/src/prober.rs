use crate::types::{ProbeOutcome, Scheme};
use async_trait::async_trait;
use reqwest::{header::SERVER, Client, Method};
use std::time::{Duration, Instant};
use tracing::debug;

#[async_trait]
pub trait Probe: Send + Sync {
    async fn probe(&self, host: &str, timeout: Duration, allow_get_fallback: bool) -> ProbeOutcome;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Failure {
    Refused,
    TimedOut,
    Other,
}

impl Failure {
    fn from_reqwest(err: &reqwest::Error) -> Self {
        if err.is_timeout() {
            Failure::TimedOut
        } else if err.is_connect() {
            Failure::Refused
        } else {
            Failure::Other
        }
    }

    fn into_outcome(self, scheme: Scheme) -> ProbeOutcome {
        match self {
            Failure::Refused => ProbeOutcome::ConnectionRefused(scheme),
            Failure::TimedOut => ProbeOutcome::Timeout(scheme),
            Failure::Other => ProbeOutcome::NoResponse,
        }
    }
}

/// HTTP then HTTPS, each HEAD first with an optional GET retry.
#[derive(Clone)]
pub struct HttpProber {
    client: Client,
}

impl HttpProber {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    async fn attempt(
        &self,
        method: Method,
        url: &str,
        timeout: Duration,
    ) -> Result<ProbeOutcome, Failure> {
        let start = Instant::now();
        let request = self.client.request(method, url).timeout(timeout).send();

        // The body of a GET is never read; dropping the response closes it.
        let response = match tokio::time::timeout(timeout, request).await {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => {
                debug!(url, error = %e, "Request failed");
                return Err(Failure::from_reqwest(&e));
            }
            Err(_) => return Err(Failure::TimedOut),
        };

        let server = response
            .headers()
            .get(SERVER)
            .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned());

        Ok(ProbeOutcome::HttpStatus {
            code: response.status().as_u16(),
            elapsed: start.elapsed(),
            server,
        })
    }

    async fn probe_scheme(
        &self,
        scheme: Scheme,
        host: &str,
        timeout: Duration,
        allow_get_fallback: bool,
    ) -> ProbeOutcome {
        let url = scheme.url_for(host);

        let head_failure = match self.attempt(Method::HEAD, &url, timeout).await {
            Ok(outcome) => return outcome,
            Err(failure) => failure,
        };

        if !allow_get_fallback {
            debug!(host, %scheme, ?head_failure, "HEAD failed, GET fallback disabled");
            return ProbeOutcome::NoResponse;
        }

        match self.attempt(Method::GET, &url, timeout).await {
            Ok(outcome) => outcome,
            Err(failure) => failure.into_outcome(scheme),
        }
    }
}

#[async_trait]
impl Probe for HttpProber {
    async fn probe(&self, host: &str, timeout: Duration, allow_get_fallback: bool) -> ProbeOutcome {
        let http = self
            .probe_scheme(Scheme::Http, host, timeout, allow_get_fallback)
            .await;
        if http.is_response() {
            return http;
        }

        debug!(host, http = %http.label(), "HTTP unreachable, trying HTTPS");
        self.probe_scheme(Scheme::Https, host, timeout, allow_get_fallback)
            .await
    }
}
