// ABOUTME: Shared test utilities and setup functions for integration tests
// ABOUTME: Provides database, resource, and delivery-capture helpers
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Gatewarden Contributors

#![allow(dead_code)]

//! Shared test setup for the credential core integration tests.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, Once};

use async_trait::async_trait;
use base64::{engine::general_purpose, Engine};

use gatewarden::config::{
    AuthConfig, DatabaseUrl, DeliveryConfig, EmailConfig, Environment, PhoneConfig, ResetConfig,
    ServerConfig, SmsConfig,
};
use gatewarden::database::Database;
use gatewarden::delivery::{DeliveryChannel, DeliveryOutcome, Message};
use gatewarden::resources::ServerResources;
use gatewarden::routes::auth::{AuthService, RegisterRequest};

static INIT_LOGGER: Once = Once::new();
static COUNTER: AtomicU32 = AtomicU32::new(0);

/// Initialize quiet logging for tests (call once per test process)
pub fn init_test_logging() {
    INIT_LOGGER.call_once(|| {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::WARN)
            .with_test_writer()
            .init();
    });
}

/// Delivery channel that records every message instead of sending it
pub struct RecordingChannel {
    sent: Mutex<Vec<(String, Message)>>,
}

impl RecordingChannel {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            sent: Mutex::new(Vec::new()),
        })
    }

    pub fn messages(&self) -> Vec<(String, Message)> {
        self.sent.lock().unwrap().clone()
    }

    pub fn is_empty(&self) -> bool {
        self.sent.lock().unwrap().is_empty()
    }

    /// Wait until at least `count` messages were recorded
    pub async fn wait_for_messages(&self, count: usize) -> Vec<(String, Message)> {
        for _ in 0..100 {
            {
                let sent = self.sent.lock().unwrap();
                if sent.len() >= count {
                    return sent.clone();
                }
            }
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        }
        panic!("delivery channel never received {count} message(s)");
    }

    /// Extract the most recent 6-digit verification code
    pub async fn wait_for_code(&self) -> String {
        let messages = self.wait_for_messages(1).await;
        for (_, message) in messages.iter().rev() {
            if let Some(code) = digit_run(&message.body, 6) {
                return code;
            }
        }
        panic!("no verification code found in recorded messages");
    }

    /// Wait for the `count`-th message and extract its 6-digit code
    pub async fn wait_for_code_in_message(&self, count: usize) -> String {
        let messages = self.wait_for_messages(count).await;
        digit_run(&messages[count - 1].1.body, 6)
            .expect("expected a verification code in the message body")
    }

    /// Extract the most recent 64-character hex reset token
    pub async fn wait_for_reset_token(&self) -> String {
        let messages = self.wait_for_messages(1).await;
        for (_, message) in messages.iter().rev() {
            if let Some(token) = hex_run(&message.body, 64) {
                return token;
            }
        }
        panic!("no reset token found in recorded messages");
    }
}

#[async_trait]
impl DeliveryChannel for RecordingChannel {
    async fn send(&self, destination: &str, message: &Message) -> DeliveryOutcome {
        self.sent
            .lock()
            .unwrap()
            .push((destination.to_owned(), message.clone()));
        DeliveryOutcome::sent(Some("recorded".into()))
    }
}

/// Find a run of exactly `len` consecutive ASCII digits
fn digit_run(text: &str, len: usize) -> Option<String> {
    let mut run = String::new();
    for c in text.chars().chain(std::iter::once(' ')) {
        if c.is_ascii_digit() {
            run.push(c);
        } else {
            if run.len() == len {
                return Some(run);
            }
            run.clear();
        }
    }
    None
}

/// Find a run of exactly `len` consecutive hex digits
fn hex_run(text: &str, len: usize) -> Option<String> {
    let mut run = String::new();
    for c in text.chars().chain(std::iter::once(' ')) {
        if c.is_ascii_hexdigit() {
            run.push(c);
        } else {
            if run.len() == len {
                return Some(run);
            }
            run.clear();
        }
    }
    None
}

/// Everything a test needs: wired resources plus the capture channels
pub struct TestHarness {
    pub resources: Arc<ServerResources>,
    pub service: AuthService,
    pub database: Arc<Database>,
    pub email: Arc<RecordingChannel>,
    pub sms: Arc<RecordingChannel>,
}

/// Test configuration: fast bcrypt, fixed secrets, short-lived nothing
pub fn test_config() -> ServerConfig {
    ServerConfig {
        http_port: 0,
        environment: Environment::Testing,
        database_url: DatabaseUrl::Memory,
        auth: AuthConfig {
            jwt_secret: Some("integration-test-secret-integration-test-secret".into()),
            session_expiry_hours: 24,
            long_session_expiry_days: 30,
            cookie_name: "gw_session".into(),
            cookie_secure: false,
            bcrypt_cost: 4,
        },
        phone: PhoneConfig {
            encryption_key: Some(general_purpose::STANDARD.encode([7u8; 32])),
            otp_expiry_minutes: 10,
        },
        reset: ResetConfig {
            token_expiry_minutes: 30,
        },
        delivery: DeliveryConfig {
            email: EmailConfig {
                api_url: None,
                api_token: None,
                from: "Gatewarden Tests <test@localhost>".into(),
            },
            sms: SmsConfig {
                enabled: false,
                api_url: None,
                account_sid: None,
                auth_token: None,
                from_number: None,
            },
        },
    }
}

/// Standard harness over an in-memory database
pub async fn create_test_harness() -> TestHarness {
    init_test_logging();

    let database = Arc::new(
        Database::new("sqlite::memory:")
            .await
            .expect("test database"),
    );
    let email = RecordingChannel::new();
    let sms = RecordingChannel::new();

    let resources = Arc::new(
        ServerResources::new(
            test_config(),
            Arc::clone(&database),
            Arc::clone(&email) as Arc<dyn DeliveryChannel>,
            Arc::clone(&sms) as Arc<dyn DeliveryChannel>,
        )
        .expect("test resources"),
    );

    TestHarness {
        service: AuthService::new(Arc::clone(&resources)),
        resources,
        database,
        email,
        sms,
    }
}

/// A registration request with unique email and phone per call
pub fn unique_register_request() -> RegisterRequest {
    let n = COUNTER.fetch_add(1, Ordering::Relaxed);
    RegisterRequest {
        full_name: format!("Admin {n}"),
        email: format!("admin{n}@example.com"),
        phone: format!("98765{n:05}"),
        password: "correct-horse-battery".into(),
        role: None,
    }
}
