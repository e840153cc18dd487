pub mod wire;

pub use wire::{PolicyRequest, PolicyResponse};

use crate::config::SettingsStore;
use crate::error::{ConfigError, RelayError};
use crate::format;
use crate::verdict::PolicyDecision;
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Upper bound on one policy call. Nested inside the channel timeout so the
/// requester never gives up before the relay has.
pub const RELAY_TIMEOUT_SECS: u64 = 10;

fn build_relay_client(timeout: Duration) -> Client {
    Client::builder()
        .timeout(timeout)
        .connect_timeout(Duration::from_secs(10))
        .build()
        .unwrap_or_else(|_| Client::new())
}

/// Privileged process owning the only network egress to the policy server.
///
/// Every failure mode short of an explicit server block resolves to a
/// fail-open verdict; nothing here ever panics into the host page.
pub struct Relay {
    store: Arc<dyn SettingsStore>,
    client: Client,
    timeout_secs: u64,
}

impl Relay {
    pub fn new(store: Arc<dyn SettingsStore>) -> Self {
        Self::with_timeout(store, Duration::from_secs(RELAY_TIMEOUT_SECS))
    }

    pub fn with_timeout(store: Arc<dyn SettingsStore>, timeout: Duration) -> Self {
        Self {
            store,
            client: build_relay_client(timeout),
            timeout_secs: timeout.as_secs(),
        }
    }

    /// Run one decision request through both gates and the policy server.
    pub async fn decide(&self, request: &PolicyRequest) -> PolicyDecision {
        // Gate 1: local enable/disable. Not a failure, so not fail-open.
        let settings = self.store.settings();
        if !settings.enabled {
            tracing::debug!("relay disabled by settings, allowing without analysis");
            return PolicyDecision::allow_unmodified();
        }

        // Gate 2: redundant format allowlist on the attachment path.
        if let Some(tag) = request.attachment.format.as_deref() {
            if !format::is_supported(&format::normalize_tag(tag)) {
                tracing::debug!(format = tag, "format outside allowlist at relay, allowing");
                return PolicyDecision::allow_unmodified();
            }
        }

        if Url::parse(&settings.endpoint_url).is_err() {
            let err = ConfigError::InvalidEndpoint(settings.endpoint_url.clone());
            tracing::warn!(error = %err, "failing open");
            return PolicyDecision::fail_open("invalid_endpoint");
        }

        tracing::debug!(endpoint = %settings.endpoint_url, host = %request.host, "policy call");

        let sent = self
            .client
            .post(&settings.endpoint_url)
            .json(request)
            .send()
            .await;

        let response = match sent {
            Ok(response) => response,
            Err(source) => {
                let err = if source.is_timeout() {
                    RelayError::Timeout {
                        timeout_secs: self.timeout_secs,
                    }
                } else {
                    RelayError::Transport(source.to_string())
                };
                let reason = match err {
                    RelayError::Timeout { .. } => "relay_timeout",
                    _ => "relay_transport",
                };
                tracing::warn!(error = %err, "policy call failed, failing open");
                return PolicyDecision::fail_open(reason);
            }
        };

        let status = response.status();
        if !status.is_success() {
            let err = RelayError::Status(status.as_u16());
            tracing::warn!(error = %err, "policy call failed, failing open");
            return PolicyDecision::fail_open("relay_status");
        }

        match response.json::<PolicyResponse>().await {
            Ok(verdict) => verdict.into_decision(),
            Err(source) => {
                let err = RelayError::MalformedResponse(source.to_string());
                tracing::warn!(error = %err, "failing open");
                PolicyDecision::fail_open("malformed_response")
            }
        }
    }
}
