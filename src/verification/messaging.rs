// ABOUTME: Phone verification messaging capability and its HTTP implementation
// ABOUTME: Sends one-time codes and checks them against a Verify-style REST service
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 WasteLink

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};
use wastelink_core::errors::{AppError, AppResult};

use crate::config::MessagingConfig;

const SERVICE_NAME: &str = "verify";
const APPROVED: &str = "approved";

/// Outcome of checking a code with the messaging service
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodeCheck {
    /// The code matched
    Approved,
    /// The service answered but did not accept the code
    Rejected,
}

/// External capability that delivers and checks one-time codes
#[async_trait]
pub trait MessagingProvider: Send + Sync {
    /// Send a verification code to `phone`
    async fn send(&self, phone: &str) -> AppResult<()>;

    /// Check `code` for `phone`
    async fn verify_code(&self, phone: &str, code: &str) -> AppResult<CodeCheck>;
}

#[derive(Debug, Deserialize)]
struct VerificationResponse {
    #[serde(default)]
    status: Option<String>,
}

/// Verify-style HTTP messaging service
#[derive(Clone)]
pub struct HttpMessagingProvider {
    config: MessagingConfig,
    client: Client,
}

impl HttpMessagingProvider {
    /// Create a provider with its own HTTP client
    #[must_use]
    pub fn new(config: MessagingConfig) -> Self {
        Self {
            config,
            client: Client::new(),
        }
    }

    fn endpoint(&self, path: &str) -> AppResult<(String, &str)> {
        let base = self
            .config
            .base_url
            .as_deref()
            .filter(|b| !b.is_empty())
            .ok_or_else(|| AppError::config("Phone verification service is not configured"))?;
        let api_key = self
            .config
            .api_key
            .as_deref()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| AppError::config("Phone verification API key is not configured"))?;
        Ok((format!("{}/{path}", base.trim_end_matches('/')), api_key))
    }

    async fn post(&self, path: &str, params: &[(&str, &str)]) -> AppResult<VerificationResponse> {
        let (url, api_key) = self.endpoint(path)?;
        let response = self
            .client
            .post(&url)
            .bearer_auth(api_key)
            .form(params)
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(AppError::config(format!(
                "Phone verification service rejected credentials ({status})"
            )));
        }
        if status.is_client_error() {
            warn!(%status, path, "Verification service refused request");
            return Err(AppError::invalid_input(format!(
                "Phone verification request was refused ({status})"
            )));
        }
        if !status.is_success() {
            return Err(AppError::external_service(
                SERVICE_NAME,
                format!("unexpected status {status}"),
            ));
        }

        Ok(response.json().await?)
    }
}

#[async_trait]
impl MessagingProvider for HttpMessagingProvider {
    async fn send(&self, phone: &str) -> AppResult<()> {
        let body = self
            .post(
                "Verifications",
                &[("To", phone), ("Channel", self.config.channel.as_str())],
            )
            .await?;
        debug!(status = ?body.status, "Verification code sent");
        Ok(())
    }

    async fn verify_code(&self, phone: &str, code: &str) -> AppResult<CodeCheck> {
        let body = self
            .post("VerificationCheck", &[("To", phone), ("Code", code)])
            .await?;
        if body.status.as_deref() == Some(APPROVED) {
            Ok(CodeCheck::Approved)
        } else {
            Ok(CodeCheck::Rejected)
        }
    }
}
