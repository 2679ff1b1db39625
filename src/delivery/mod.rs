// ABOUTME: Outbound delivery channel capability for verification codes and reset instructions
// ABOUTME: Email and SMS transports behind one trait; the core never assumes guaranteed delivery
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Gatewarden Contributors

//! # Delivery Channels
//!
//! The core treats email and SMS uniformly through [`DeliveryChannel`].
//! Delivery is observable but outside this core's control: an authentication
//! outcome never depends on whether the message actually arrived, and a
//! failed send is logged, never silently dropped.
//!
//! Both built-in transports degrade to a log-only "not configured" mode when
//! their endpoints are unset, which keeps development environments working
//! without external accounts.

mod email;
mod sms;

pub use email::EmailChannel;
pub use sms::SmsChannel;

use async_trait::async_trait;

/// A message handed to a channel; subject is ignored by SMS transports
#[derive(Debug, Clone)]
pub struct Message {
    pub subject: String,
    pub body: String,
}

/// Observable outcome of a delivery attempt
#[derive(Debug, Clone)]
pub struct DeliveryOutcome {
    pub success: bool,
    /// Provider-assigned reference for a successful send
    pub reference: Option<String>,
    pub error: Option<String>,
}

impl DeliveryOutcome {
    #[must_use]
    pub fn sent(reference: Option<String>) -> Self {
        Self {
            success: true,
            reference,
            error: None,
        }
    }

    #[must_use]
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            reference: None,
            error: Some(error.into()),
        }
    }
}

/// External delivery capability implemented by email and SMS transports
#[async_trait]
pub trait DeliveryChannel: Send + Sync {
    /// Attempt to transmit `message` to `destination`.
    ///
    /// Implementations report failure through the outcome and log it; they
    /// do not error the calling operation.
    async fn send(&self, destination: &str, message: &Message) -> DeliveryOutcome;
}
