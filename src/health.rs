//! RPC endpoint probes used by the doctor and status surfaces.

use std::error::Error as _;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::network::Network;

pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Typed endpoint health state for operator surfaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndpointHealthState {
    Healthy,
    /// Reachable, but the node reports it is behind or unhealthy.
    Degraded,
    InvalidUrl,
    DnsFailure,
    ConnectFailure,
    Timeout,
    HttpFailure,
}

impl EndpointHealthState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Healthy => "healthy",
            Self::Degraded => "degraded",
            Self::InvalidUrl => "invalid_url",
            Self::DnsFailure => "dns_failure",
            Self::ConnectFailure => "connect_failure",
            Self::Timeout => "timeout",
            Self::HttpFailure => "http_failure",
        }
    }

    pub fn is_healthy(self) -> bool {
        matches!(self, Self::Healthy)
    }
}

/// Probe result for one network endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointHealth {
    pub network: Network,
    pub url: String,
    pub state: EndpointHealthState,
    pub detail: String,
    pub http_status: Option<u16>,
}

impl EndpointHealth {
    pub fn is_healthy(&self) -> bool {
        self.state.is_healthy()
    }
}

/// Send a JSON-RPC `getHealth` request and classify the outcome.
pub async fn probe_endpoint(network: Network, url: &str, timeout: Duration) -> EndpointHealth {
    let report = |state: EndpointHealthState, detail: String, http_status: Option<u16>| {
        EndpointHealth {
            network,
            url: url.to_string(),
            state,
            detail,
            http_status,
        }
    };

    if reqwest::Url::parse(url).is_err() {
        return report(
            EndpointHealthState::InvalidUrl,
            "URL parse failed".to_string(),
            None,
        );
    }

    let client = match reqwest::Client::builder().timeout(timeout).build() {
        Ok(client) => client,
        Err(error) => {
            return report(
                EndpointHealthState::ConnectFailure,
                format!("HTTP client init failed: {error}"),
                None,
            );
        }
    };

    let request = json!({ "jsonrpc": "2.0", "id": 1, "method": "getHealth" });
    let response = match client.post(url).json(&request).send().await {
        Ok(response) => response,
        Err(error) => {
            return report(classify_transport_error(&error), error.to_string(), None);
        }
    };

    let status = response.status();
    if !status.is_success() {
        return report(
            EndpointHealthState::HttpFailure,
            format!("HTTP {}", status.as_u16()),
            Some(status.as_u16()),
        );
    }

    match response.json::<Value>().await {
        Ok(body) => {
            let (state, detail) = classify_rpc_body(&body);
            report(state, detail, Some(status.as_u16()))
        }
        Err(error) => report(
            EndpointHealthState::HttpFailure,
            format!("invalid JSON-RPC response: {error}"),
            Some(status.as_u16()),
        ),
    }
}

fn classify_rpc_body(body: &Value) -> (EndpointHealthState, String) {
    if let Some(result) = body.get("result").and_then(Value::as_str) {
        let state = if result == "ok" {
            EndpointHealthState::Healthy
        } else {
            EndpointHealthState::Degraded
        };
        return (state, result.to_string());
    }
    let message = body
        .pointer("/error/message")
        .and_then(Value::as_str)
        .unwrap_or("missing result");
    (EndpointHealthState::Degraded, message.to_string())
}

fn classify_transport_error(error: &reqwest::Error) -> EndpointHealthState {
    if error.is_timeout() {
        return EndpointHealthState::Timeout;
    }

    let mut source = error.source();
    while let Some(err) = source {
        if let Some(io_error) = err.downcast_ref::<std::io::Error>() {
            return match io_error.kind() {
                std::io::ErrorKind::NotFound => EndpointHealthState::DnsFailure,
                std::io::ErrorKind::TimedOut => EndpointHealthState::Timeout,
                _ => EndpointHealthState::ConnectFailure,
            };
        }
        source = err.source();
    }

    let lowered = error.to_string().to_ascii_lowercase();
    if lowered.contains("dns")
        || lowered.contains("lookup")
        || lowered.contains("name or service not known")
        || lowered.contains("no such host")
    {
        EndpointHealthState::DnsFailure
    } else {
        EndpointHealthState::ConnectFailure
    }
}
