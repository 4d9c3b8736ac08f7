use crate::{
    prober::Probe,
    resolver::Resolve,
    types::{ProbeOutcome, ResolutionResult, StatusRecord, Verdict},
};
use futures::FutureExt;
use std::{any::Any, panic::AssertUnwindSafe, time::Duration};
use tracing::warn;

/// Turns the resolver and prober outputs for one host into its record.
///
/// A resolved host with no outcome is treated as `NoResponse`.
pub fn classify(
    host: &str,
    resolution: &ResolutionResult,
    outcome: Option<&ProbeOutcome>,
) -> StatusRecord {
    if !resolution.is_resolved() {
        return StatusRecord {
            host: host.to_string(),
            outcome_label: ProbeOutcome::NoResponse.label(),
            dns_label: resolution.label(),
            response_time_label: "N/A".to_string(),
            server_info_label: "DNS Error".to_string(),
            verdict: Verdict::DnsError,
        };
    }

    let no_response = ProbeOutcome::NoResponse;
    let outcome = outcome.unwrap_or(&no_response);
    let verdict = if outcome.is_unreachable() {
        Verdict::PossibleDanglingDns
    } else {
        Verdict::Active
    };

    StatusRecord {
        host: host.to_string(),
        outcome_label: outcome.label(),
        dns_label: resolution.label(),
        response_time_label: outcome.response_time_label(),
        server_info_label: outcome.server_label(),
        verdict,
    }
}

/// Full resolve, probe, classify pipeline for one host. Never fails: a panic
/// anywhere inside becomes an `Error` record.
pub async fn check_host(
    resolver: &dyn Resolve,
    prober: &dyn Probe,
    host: &str,
    timeout: Duration,
    allow_get_fallback: bool,
) -> StatusRecord {
    let pipeline = async {
        let resolution = resolver.resolve(host).await;
        if !resolution.is_resolved() {
            return classify(host, &resolution, None);
        }
        let outcome = prober.probe(host, timeout, allow_get_fallback).await;
        classify(host, &resolution, Some(&outcome))
    };

    match AssertUnwindSafe(pipeline).catch_unwind().await {
        Ok(record) => record,
        Err(payload) => {
            let description = panic_message(&*payload);
            warn!(host, error = %description, "Host pipeline panicked");
            StatusRecord::error(host, description)
        }
    }
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        msg.to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}
