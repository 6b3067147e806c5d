// Copyright 2025 - Nym Technologies SA <contact@nymtech.net>
// SPDX-License-Identifier: GPL-3.0-only

use std::sync::Arc;
use std::time::Duration;
use time::OffsetDateTime;
use tracing::debug;

use ganar_storage::GanarStorage;

use crate::config::Access;
use crate::error::GanarError;
use crate::helpers::{normalize_phone, random_access_code};

/// Issues and checks the short-lived one-time codes gating wallet and
/// ticket visibility. A phone number has at most one live code; issuing a
/// new one invalidates the previous one immediately.
pub struct AccessCodes<S> {
    storage: Arc<S>,
    code_ttl: Duration,
}

impl<S> Clone for AccessCodes<S> {
    fn clone(&self) -> Self {
        AccessCodes {
            storage: Arc::clone(&self.storage),
            code_ttl: self.code_ttl,
        }
    }
}

impl<S: GanarStorage> AccessCodes<S> {
    pub fn new(storage: Arc<S>, config: &Access) -> Self {
        AccessCodes {
            storage,
            code_ttl: config.code_ttl,
        }
    }

    /// Generates a fresh 6-digit code for the phone, replacing any earlier
    /// one. The code itself is returned so the caller can deliver it.
    pub async fn issue_code(&self, phone: &str) -> Result<String, GanarError> {
        let phone = normalize_phone(phone);
        let code = random_access_code();
        self.storage
            .upsert_access_code(&phone, &code, OffsetDateTime::now_utc())
            .await?;
        debug!("issued a fresh access code for {phone}");
        Ok(code)
    }

    /// Exact match against the latest issued code, within its TTL.
    pub async fn validate(&self, phone: &str, code: &str) -> Result<bool, GanarError> {
        let phone = normalize_phone(phone);
        let Some(stored) = self.storage.get_access_code(&phone).await? else {
            return Ok(false);
        };
        if stored.code != code {
            return Ok(false);
        }
        let age = OffsetDateTime::now_utc() - stored.issued_at;
        Ok(age <= self.code_ttl)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use ganar_storage::ephemeral_storage::EphemeralStorage;

    const PHONE: &str = "573001111111";

    fn setup_with_ttl(code_ttl: Duration) -> (Arc<EphemeralStorage>, AccessCodes<EphemeralStorage>) {
        let storage = Arc::new(EphemeralStorage::new());
        let access = AccessCodes::new(Arc::clone(&storage), &Access { code_ttl });
        (storage, access)
    }

    #[tokio::test]
    async fn issued_codes_validate_exactly_once_issued() {
        let (_, access) = setup_with_ttl(Duration::from_secs(600));
        let code = access.issue_code(PHONE).await.unwrap();

        assert!(access.validate(PHONE, &code).await.unwrap());
        assert!(!access.validate(PHONE, "000000").await.unwrap());
        assert!(!access.validate("573009999999", &code).await.unwrap());
    }

    #[tokio::test]
    async fn newer_codes_invalidate_older_ones() {
        let (_, access) = setup_with_ttl(Duration::from_secs(600));
        let first = access.issue_code(PHONE).await.unwrap();
        let second = access.issue_code(PHONE).await.unwrap();

        assert!(access.validate(PHONE, &second).await.unwrap());
        if first != second {
            assert!(!access.validate(PHONE, &first).await.unwrap());
        }
    }

    #[tokio::test]
    async fn codes_expire_after_their_ttl() {
        let (storage, access) = setup_with_ttl(Duration::from_secs(600));
        // plant a code issued eleven minutes ago
        storage
            .upsert_access_code(
                PHONE,
                "123456",
                OffsetDateTime::now_utc() - Duration::from_secs(11 * 60),
            )
            .await
            .unwrap();

        assert!(!access.validate(PHONE, "123456").await.unwrap());
    }

    #[tokio::test]
    async fn phone_formatting_does_not_matter() {
        let (_, access) = setup_with_ttl(Duration::from_secs(600));
        let code = access.issue_code("+57 300-111-1111").await.unwrap();
        assert!(access.validate(PHONE, &code).await.unwrap());
    }
}
