//! HTTP probe routed through the endpoint under test.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::{Client, Proxy};
use url::Url;

use crate::config::ProbeConfig;
use crate::probe::{FailureKind, ProbeError, ProbeOutcome, ProbeResult, Prober};
use crate::registry::RegisteredEndpoint;

/// Time budgets for a single probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeTimeouts {
    /// Whole exchange, including draining the body.
    pub request: Duration,
    pub connect: Duration,
    pub keepalive: Duration,
}

impl Default for ProbeTimeouts {
    fn default() -> Self {
        Self {
            request: Duration::from_secs(5),
            connect: Duration::from_secs(30),
            keepalive: Duration::from_secs(30),
        }
    }
}

fn proxy_url(scheme: &str, endpoint: &RegisteredEndpoint) -> ProbeResult<Url> {
    let invalid = |reason: &str| ProbeError::InvalidAddress {
        address: endpoint.address.clone(),
        reason: reason.to_string(),
    };
    if endpoint.address.trim().is_empty() {
        return Err(invalid("empty host"));
    }
    if endpoint.port == 0 {
        return Err(invalid("port 0"));
    }

    // Bare IPv6 literals need brackets inside a URL.
    let host = if endpoint.address.contains(':') && !endpoint.address.starts_with('[') {
        format!("[{}]", endpoint.address)
    } else {
        endpoint.address.clone()
    };

    Url::parse(&format!("{}://{}:{}", scheme, host, endpoint.port))
        .map_err(|e| invalid(&e.to_string()))
}

fn classify(error: &reqwest::Error) -> ProbeOutcome {
    if error.is_timeout() {
        ProbeOutcome::Failed(FailureKind::Timeout)
    } else {
        ProbeOutcome::Failed(FailureKind::Transport)
    }
}

/// Fetch `target` through `endpoint` and classify what happened.
///
/// The client is built per call with pooling disabled, so the connection is
/// cold and is closed once the body has been drained.
pub async fn probe(
    endpoint: &RegisteredEndpoint,
    target: &Url,
    scheme: &str,
    timeouts: &ProbeTimeouts,
) -> ProbeResult<ProbeOutcome> {
    let proxy = Proxy::all(proxy_url(scheme, endpoint)?.as_str())?;
    let client = Client::builder()
        .proxy(proxy)
        .timeout(timeouts.request)
        .connect_timeout(timeouts.connect)
        .tcp_keepalive(timeouts.keepalive)
        .pool_max_idle_per_host(0)
        .user_agent("pool-warden-health-check")
        .build()?;

    let started = Instant::now();
    let mut response = match client.get(target.clone()).send().await {
        Ok(response) => response,
        Err(e) => {
            tracing::debug!(name = %endpoint.name, error = %e, "Probe request failed");
            return Ok(classify(&e));
        }
    };

    let status = response.status().as_u16();
    loop {
        match response.chunk().await {
            Ok(Some(_)) => continue,
            Ok(None) => break,
            Err(e) => {
                tracing::debug!(name = %endpoint.name, error = %e, "Probe body drain failed");
                return Ok(classify(&e));
            }
        }
    }

    Ok(ProbeOutcome::completed(status, started.elapsed()))
}

/// Prober with a fixed target and timeouts.
#[derive(Debug, Clone)]
pub struct HttpProber {
    target: Url,
    scheme: String,
    timeouts: ProbeTimeouts,
}

impl HttpProber {
    pub fn new(target: Url, scheme: impl Into<String>, timeouts: ProbeTimeouts) -> Self {
        Self {
            target,
            scheme: scheme.into(),
            timeouts,
        }
    }

    pub fn from_config(config: &ProbeConfig) -> ProbeResult<Self> {
        let target = Url::parse(&config.target_url)?;
        Ok(Self::new(
            target,
            config.proxy_scheme.clone(),
            ProbeTimeouts {
                request: Duration::from_secs(config.request_timeout_secs),
                connect: Duration::from_secs(config.connect_timeout_secs),
                keepalive: Duration::from_secs(config.keepalive_secs),
            },
        ))
    }
}

#[async_trait]
impl Prober for HttpProber {
    async fn probe(&self, endpoint: &RegisteredEndpoint) -> ProbeResult<ProbeOutcome> {
        probe(endpoint, &self.target, &self.scheme, &self.timeouts).await
    }
}
