// ABOUTME: OAuth2 authorization-code identity provider backed by reqwest
// ABOUTME: Builds the authorization URL, exchanges codes for tokens, and reads the userinfo endpoint
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 WasteLink

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};
use url::Url;
use wastelink_core::errors::{AppError, AppResult};
use wastelink_core::models::UserType;

use super::{ExternalIdentity, IdentityProvider, SessionMetadata};
use crate::config::IdentityProviderConfig;

const PROVIDER_NAME: &str = "oauth2";

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// Subset of an `OpenID Connect` userinfo document
#[derive(Debug, Deserialize)]
struct UserInfo {
    sub: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    email_verified: Option<bool>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    given_name: Option<String>,
    #[serde(default)]
    family_name: Option<String>,
    #[serde(default)]
    full_name: Option<String>,
    /// Role recorded with the provider's own user record, if any
    #[serde(default)]
    user_type: Option<String>,
}

impl UserInfo {
    fn into_identity(self) -> AppResult<ExternalIdentity> {
        let email = self
            .email
            .filter(|e| !e.trim().is_empty())
            .ok_or_else(|| AppError::external_service(PROVIDER_NAME, "userinfo has no email"))?;

        let user_type = self.user_type.as_deref().and_then(|raw| {
            raw.parse::<UserType>()
                .map_err(|e| debug!(error = %e, "Ignoring unrecognized provider user_type"))
                .ok()
        });

        Ok(ExternalIdentity {
            id: self.sub,
            email,
            email_verified: self.email_verified.unwrap_or(false),
            metadata: SessionMetadata {
                full_name: self.full_name,
                name: self.name,
                given_name: self.given_name,
                family_name: self.family_name,
                user_type,
            },
        })
    }
}

/// Authorization-code flow against a generic `OAuth2`/`OIDC` provider
#[derive(Clone)]
pub struct OAuth2IdentityProvider {
    config: IdentityProviderConfig,
    client: Client,
}

impl OAuth2IdentityProvider {
    /// Create a provider with its own HTTP client
    #[must_use]
    pub fn new(config: IdentityProviderConfig) -> Self {
        Self {
            config,
            client: Client::new(),
        }
    }

    fn ensure_configured(&self) -> AppResult<()> {
        if self.config.is_configured() {
            Ok(())
        } else {
            Err(AppError::config("Identity provider is not configured"))
        }
    }

    async fn exchange_code(&self, code: &str) -> AppResult<String> {
        let params = [
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
            ("code", code),
            ("grant_type", "authorization_code"),
            ("redirect_uri", self.config.redirect_uri.as_str()),
        ];

        let response = self
            .client
            .post(&self.config.token_url)
            .form(&params)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            warn!(%status, "Token exchange rejected");
            return Err(AppError::auth_invalid(format!(
                "Authorization code rejected by provider ({status})"
            )));
        }

        let token: TokenResponse = response.json().await?;
        Ok(token.access_token)
    }

    async fn fetch_userinfo(&self, access_token: &str) -> AppResult<UserInfo> {
        let response = self
            .client
            .get(&self.config.userinfo_url)
            .bearer_auth(access_token)
            .send()
            .await?
            .error_for_status()?;

        Ok(response.json().await?)
    }
}

#[async_trait]
impl IdentityProvider for OAuth2IdentityProvider {
    fn name(&self) -> &'static str {
        PROVIDER_NAME
    }

    fn authorization_url(&self, state: &str) -> AppResult<String> {
        self.ensure_configured()?;
        let mut url = Url::parse(&self.config.auth_url)
            .map_err(|e| AppError::config(format!("Invalid auth URL: {e}")))?;

        url.query_pairs_mut()
            .append_pair("client_id", &self.config.client_id)
            .append_pair("redirect_uri", &self.config.redirect_uri)
            .append_pair("response_type", "code")
            .append_pair("scope", &self.config.scopes.join(" "))
            .append_pair("state", state);

        Ok(url.to_string())
    }

    async fn complete_sign_in(&self, code: &str) -> AppResult<ExternalIdentity> {
        self.ensure_configured()?;
        if code.trim().is_empty() {
            return Err(AppError::invalid_input("Missing authorization code"));
        }

        let access_token = self.exchange_code(code).await?;
        let identity = self.fetch_userinfo(&access_token).await?.into_identity()?;
        debug!(subject = %identity.id, "Provider sign-in completed");
        Ok(identity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> IdentityProviderConfig {
        IdentityProviderConfig {
            client_id: "client".to_owned(),
            client_secret: "secret".to_owned(),
            auth_url: "https://id.example.com/authorize".to_owned(),
            token_url: "https://id.example.com/token".to_owned(),
            userinfo_url: "https://id.example.com/userinfo".to_owned(),
            redirect_uri: "http://localhost:8081/auth/callback".to_owned(),
            scopes: vec!["openid".to_owned(), "email".to_owned()],
        }
    }

    #[test]
    fn test_authorization_url_carries_state() {
        let provider = OAuth2IdentityProvider::new(config());
        let url = Url::parse(&provider.authorization_url("abc123").unwrap()).unwrap();
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert!(pairs.contains(&("state".to_owned(), "abc123".to_owned())));
        assert!(pairs.contains(&("response_type".to_owned(), "code".to_owned())));
        assert!(pairs.contains(&("scope".to_owned(), "openid email".to_owned())));
    }

    #[test]
    fn test_unconfigured_provider_is_config_error() {
        let provider = OAuth2IdentityProvider::new(IdentityProviderConfig::default());
        let err = provider.authorization_url("s").unwrap_err();
        assert_eq!(err.code, wastelink_core::errors::ErrorCode::ConfigError);
    }

    #[test]
    fn test_userinfo_maps_provider_role() {
        let info: UserInfo = serde_json::from_str(
            r#"{"sub":"u1","email":"a@b.c","given_name":"Ann","user_type":"collector"}"#,
        )
        .unwrap();
        let identity = info.into_identity().unwrap();
        assert_eq!(identity.metadata.user_type, Some(UserType::Collector));
        assert_eq!(identity.metadata.given_name.as_deref(), Some("Ann"));
        assert!(!identity.email_verified);
    }
}
