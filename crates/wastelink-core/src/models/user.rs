// ABOUTME: User profile models for dumpers and collectors
// ABOUTME: UserType, UserProfile, ProfileUpdate, and PendingIntent definitions
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 WasteLink

use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::AppError;

/// Role a user signs up with
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum UserType {
    /// Requests waste pickups
    #[default]
    Dumper,
    /// Fulfils pickup requests
    Collector,
}

impl UserType {
    /// Convert to string for database storage
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Dumper => "dumper",
            Self::Collector => "collector",
        }
    }
}

impl Display for UserType {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

impl FromStr for UserType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dumper" => Ok(Self::Dumper),
            "collector" => Ok(Self::Collector),
            other => Err(AppError::invalid_input(format!("Invalid user type: {other}"))),
        }
    }
}

/// Local projection of a user's profile row
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserProfile {
    /// Identity provider subject, also the row key
    pub id: String,
    /// Email address reported by the identity provider
    pub email: String,
    /// Display name
    pub full_name: String,
    /// Dumper or collector
    pub user_type: UserType,
    /// Phone number on file, if any
    pub phone: Option<String>,
    /// Free-form address
    pub address: Option<String>,
    /// Whether the identity provider verified the email
    pub email_verified: bool,
    /// Whether the phone number completed verification
    pub phone_verified: bool,
    /// Row creation time
    pub created_at: DateTime<Utc>,
    /// Last modification time
    pub updated_at: DateTime<Utc>,
}

impl UserProfile {
    /// Whether a non-blank phone number is on file
    #[must_use]
    pub fn has_phone(&self) -> bool {
        self.phone.as_deref().is_some_and(|p| !p.trim().is_empty())
    }

    /// Whether the profile belongs to a collector
    #[must_use]
    pub const fn is_collector(&self) -> bool {
        matches!(self.user_type, UserType::Collector)
    }
}

/// Partial profile mutation; `None` fields are left untouched
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProfileUpdate {
    /// New display name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    /// New phone number
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    /// New address
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    /// New role
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_type: Option<UserType>,
    /// Phone verification flag
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone_verified: Option<bool>,
}

impl ProfileUpdate {
    /// Whether the update changes nothing
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.full_name.is_none()
            && self.phone.is_none()
            && self.address.is_none()
            && self.user_type.is_none()
            && self.phone_verified.is_none()
    }

    /// Merge the update into a profile and stamp `updated_at`
    pub fn apply_to(&self, profile: &mut UserProfile, now: DateTime<Utc>) {
        if let Some(full_name) = &self.full_name {
            profile.full_name.clone_from(full_name);
        }
        if let Some(phone) = &self.phone {
            // Changing the number invalidates a previous verification
            if profile.phone.as_ref() != Some(phone) && self.phone_verified.is_none() {
                profile.phone_verified = false;
            }
            profile.phone = Some(phone.clone());
        }
        if let Some(address) = &self.address {
            profile.address = Some(address.clone());
        }
        if let Some(user_type) = self.user_type {
            profile.user_type = user_type;
        }
        if let Some(phone_verified) = self.phone_verified {
            profile.phone_verified = phone_verified;
        }
        profile.updated_at = now;
    }
}

/// Role chosen before an external sign-in, kept across the redirect
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct PendingIntent {
    /// Role the caller chose on the sign-in screen
    pub user_type: UserType,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile() -> UserProfile {
        let now = Utc::now();
        UserProfile {
            id: "sub-1".to_owned(),
            email: "ada@example.com".to_owned(),
            full_name: "Ada".to_owned(),
            user_type: UserType::Dumper,
            phone: Some("+15550001".to_owned()),
            address: None,
            email_verified: true,
            phone_verified: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_user_type_parsing() {
        assert_eq!("collector".parse::<UserType>().unwrap(), UserType::Collector);
        assert_eq!(" Dumper ".parse::<UserType>().unwrap(), UserType::Dumper);
        assert!("admin".parse::<UserType>().is_err());
    }

    #[test]
    fn test_changing_phone_clears_verification() {
        let mut p = profile();
        let update = ProfileUpdate {
            phone: Some("+15550002".to_owned()),
            ..ProfileUpdate::default()
        };
        update.apply_to(&mut p, Utc::now());
        assert_eq!(p.phone.as_deref(), Some("+15550002"));
        assert!(!p.phone_verified);
    }

    #[test]
    fn test_same_phone_keeps_verification() {
        let mut p = profile();
        let update = ProfileUpdate {
            phone: Some("+15550001".to_owned()),
            address: Some("1 Main St".to_owned()),
            ..ProfileUpdate::default()
        };
        update.apply_to(&mut p, Utc::now());
        assert!(p.phone_verified);
        assert_eq!(p.address.as_deref(), Some("1 Main St"));
    }

    #[test]
    fn test_blank_phone_is_not_on_file() {
        let mut p = profile();
        p.phone = Some("   ".to_owned());
        assert!(!p.has_phone());
        p.phone = None;
        assert!(!p.has_phone());
    }
}
