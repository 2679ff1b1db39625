// ABOUTME: Cryptography module for phone PII protection
// ABOUTME: Centralizes encryption, lookup hashing, and normalization of phone numbers
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Gatewarden Contributors

//! Cryptographic utilities for phone PII protection

pub mod phone;
pub mod phone_format;

pub use phone::{CryptoError, PhoneArtifacts, PhoneCodec};
