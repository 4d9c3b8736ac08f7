use reqwest::{redirect::Policy, Client};
use std::time::Duration;

const MAX_REDIRECTS: usize = 10;

/// Client shared by every worker. Certificates are not verified: a probe
/// only cares whether something answers.
pub fn create_http_pool(user_agent: &str) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(user_agent)
        .redirect(Policy::limited(MAX_REDIRECTS))
        .danger_accept_invalid_certs(true)
        .pool_max_idle_per_host(0)
        .tcp_keepalive(Duration::from_secs(60))
        .tcp_nodelay(true)
        .use_rustls_tls()
        .build()
}
