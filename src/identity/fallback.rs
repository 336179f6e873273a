// ABOUTME: Fallback profile synthesis from locally available identity metadata
// ABOUTME: Derives a display name from name fields or the email local-part
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 WasteLink

use chrono::{DateTime, Utc};
use wastelink_core::constants::identity::FALLBACK_DISPLAY_NAME;
use wastelink_core::models::UserProfile;

use super::ExternalIdentity;

fn non_blank(value: Option<&String>) -> Option<&str> {
    value.map(|s| s.trim()).filter(|s| !s.is_empty())
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars).collect()
    })
}

/// Best display name available without asking the store
///
/// `full_name`, then `name`, then given + family name, then the email
/// local-part with its first letter capitalized.
#[must_use]
pub fn display_name(identity: &ExternalIdentity) -> String {
    let meta = &identity.metadata;

    if let Some(name) = non_blank(meta.full_name.as_ref()).or_else(|| non_blank(meta.name.as_ref()))
    {
        return name.to_owned();
    }

    let parts: Vec<&str> = [meta.given_name.as_ref(), meta.family_name.as_ref()]
        .into_iter()
        .filter_map(non_blank)
        .collect();
    if !parts.is_empty() {
        return parts.join(" ");
    }

    identity
        .email
        .split('@')
        .next()
        .map(str::trim)
        .filter(|local| !local.is_empty())
        .map_or_else(|| FALLBACK_DISPLAY_NAME.to_owned(), capitalize)
}

/// Profile built from identity metadata alone
#[must_use]
pub fn fallback_profile(identity: &ExternalIdentity, now: DateTime<Utc>) -> UserProfile {
    UserProfile {
        id: identity.id.clone(),
        email: identity.email.clone(),
        full_name: display_name(identity),
        user_type: identity.metadata.user_type.unwrap_or_default(),
        phone: None,
        address: None,
        email_verified: identity.email_verified,
        phone_verified: false,
        created_at: now,
        updated_at: now,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::SessionMetadata;
    use wastelink_core::models::UserType;

    fn identity(email: &str, metadata: SessionMetadata) -> ExternalIdentity {
        ExternalIdentity {
            id: "sub-1".to_owned(),
            email: email.to_owned(),
            email_verified: true,
            metadata,
        }
    }

    #[test]
    fn test_prefers_full_name() {
        let id = identity(
            "ada@example.com",
            SessionMetadata {
                full_name: Some("Ada Lovelace".to_owned()),
                name: Some("ada".to_owned()),
                ..SessionMetadata::default()
            },
        );
        assert_eq!(display_name(&id), "Ada Lovelace");
    }

    #[test]
    fn test_joins_given_and_family_names() {
        let id = identity(
            "x@example.com",
            SessionMetadata {
                given_name: Some("Grace".to_owned()),
                family_name: Some("Hopper".to_owned()),
                ..SessionMetadata::default()
            },
        );
        assert_eq!(display_name(&id), "Grace Hopper");
    }

    #[test]
    fn test_capitalizes_email_local_part() {
        let id = identity("linus@example.com", SessionMetadata::default());
        assert_eq!(display_name(&id), "Linus");
    }

    #[test]
    fn test_blank_everything_uses_placeholder() {
        let id = identity("@example.com", SessionMetadata::default());
        assert_eq!(display_name(&id), FALLBACK_DISPLAY_NAME);
    }

    #[test]
    fn test_fallback_profile_carries_metadata_role() {
        let id = identity(
            "c@example.com",
            SessionMetadata {
                user_type: Some(UserType::Collector),
                ..SessionMetadata::default()
            },
        );
        let profile = fallback_profile(&id, Utc::now());
        assert_eq!(profile.user_type, UserType::Collector);
        assert!(!profile.phone_verified);
        assert!(profile.phone.is_none());
    }
}
