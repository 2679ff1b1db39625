// ABOUTME: SMS delivery over a Twilio-style REST gateway
// ABOUTME: Form-posts to the configured messages endpoint; log-only when disabled or unconfigured
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Gatewarden Contributors

use async_trait::async_trait;
use serde::Deserialize;

use super::{DeliveryChannel, DeliveryOutcome, Message};
use crate::config::SmsConfig;

/// SMS transport speaking a Twilio-style messages API
pub struct SmsChannel {
    client: reqwest::Client,
    config: SmsConfig,
}

#[derive(Deserialize)]
struct GatewayResponse {
    sid: Option<String>,
}

impl SmsChannel {
    #[must_use]
    pub fn new(config: SmsConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    fn credentials(&self) -> Option<(&str, &str, &str, &str)> {
        Some((
            self.config.api_url.as_deref()?,
            self.config.account_sid.as_deref()?,
            self.config.auth_token.as_deref()?,
            self.config.from_number.as_deref()?,
        ))
    }
}

#[async_trait]
impl DeliveryChannel for SmsChannel {
    async fn send(&self, destination: &str, message: &Message) -> DeliveryOutcome {
        let Some((api_url, account_sid, auth_token, from_number)) =
            self.config.enabled.then(|| self.credentials()).flatten()
        else {
            tracing::warn!("sms gateway disabled or not configured; message not sent");
            return DeliveryOutcome::failed("SMS service not configured");
        };

        let params = [
            ("From", from_number),
            ("To", destination),
            ("Body", message.body.as_str()),
        ];

        let response = self
            .client
            .post(api_url)
            .basic_auth(account_sid, Some(auth_token))
            .form(&params)
            .send()
            .await;

        match response {
            Ok(resp) if resp.status().is_success() => {
                let reference = resp
                    .json::<GatewayResponse>()
                    .await
                    .ok()
                    .and_then(|body| body.sid);
                tracing::info!("sms accepted by gateway");
                DeliveryOutcome::sent(reference)
            }
            Ok(resp) => {
                let status = resp.status();
                tracing::error!(%status, "sms gateway rejected message");
                DeliveryOutcome::failed(format!("gateway returned {status}"))
            }
            Err(e) => {
                tracing::error!(error = %e, "sms gateway unreachable");
                DeliveryOutcome::failed(e.to_string())
            }
        }
    }
}
