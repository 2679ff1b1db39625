// ABOUTME: Email delivery over an HTTP mail relay
// ABOUTME: Posts JSON to a configured relay endpoint; log-only when unconfigured
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Gatewarden Contributors

use async_trait::async_trait;
use serde::Serialize;

use super::{DeliveryChannel, DeliveryOutcome, Message};
use crate::config::EmailConfig;

/// Email transport speaking to an HTTP mail relay
pub struct EmailChannel {
    client: reqwest::Client,
    config: EmailConfig,
}

#[derive(Serialize)]
struct RelayRequest<'a> {
    from: &'a str,
    to: &'a str,
    subject: &'a str,
    text: &'a str,
}

impl EmailChannel {
    #[must_use]
    pub fn new(config: EmailConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    fn is_configured(&self) -> bool {
        self.config.api_url.is_some() && self.config.api_token.is_some()
    }
}

#[async_trait]
impl DeliveryChannel for EmailChannel {
    async fn send(&self, destination: &str, message: &Message) -> DeliveryOutcome {
        if !self.is_configured() {
            tracing::warn!(
                subject = %message.subject,
                "email relay not configured; message not sent"
            );
            return DeliveryOutcome::failed("Email service not configured");
        }
        // is_configured checked both above
        let (Some(api_url), Some(api_token)) =
            (self.config.api_url.as_ref(), self.config.api_token.as_ref())
        else {
            return DeliveryOutcome::failed("Email service not configured");
        };

        let request = RelayRequest {
            from: &self.config.from,
            to: destination,
            subject: &message.subject,
            text: &message.body,
        };

        let response = self
            .client
            .post(api_url)
            .bearer_auth(api_token)
            .json(&request)
            .send()
            .await;

        match response {
            Ok(resp) if resp.status().is_success() => {
                let reference = resp
                    .headers()
                    .get("x-message-id")
                    .and_then(|v| v.to_str().ok())
                    .map(ToOwned::to_owned);
                tracing::info!(subject = %message.subject, "email accepted by relay");
                DeliveryOutcome::sent(reference)
            }
            Ok(resp) => {
                let status = resp.status();
                tracing::error!(%status, "email relay rejected message");
                DeliveryOutcome::failed(format!("relay returned {status}"))
            }
            Err(e) => {
                tracing::error!(error = %e, "email relay unreachable");
                DeliveryOutcome::failed(e.to_string())
            }
        }
    }
}
