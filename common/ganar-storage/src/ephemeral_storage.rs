// Copyright 2025 - Nym Technologies SA <contact@nymtech.net>
// SPDX-License-Identifier: Apache-2.0

use async_trait::async_trait;
use time::OffsetDateTime;

use crate::backends::memory::GanarDataManager;
use crate::error::StorageError;
use crate::models::{AccessCredential, ActivationOutcome, DrawResult, NewTicket, Ticket, TopBuyer};
use crate::traits::GanarStorage;

/// In-memory variant of the storage, used in tests and in deployments that
/// have no database configured. State is lost when the process exits.
// note that clone here is fine as upon cloning the same underlying state will be used
#[derive(Clone, Default)]
pub struct EphemeralStorage {
    data_manager: GanarDataManager,
}

impl EphemeralStorage {
    pub fn new() -> Self {
        EphemeralStorage {
            data_manager: GanarDataManager::new(),
        }
    }
}

#[async_trait]
impl GanarStorage for EphemeralStorage {
    async fn insert_pending_ticket(&self, ticket: NewTicket) -> Result<Ticket, StorageError> {
        self.data_manager.insert_pending_ticket(ticket).await
    }

    async fn get_ticket(&self, reference: &str) -> Result<Option<Ticket>, StorageError> {
        Ok(self.data_manager.get_ticket(reference).await)
    }

    async fn get_active_ticket_by_number(
        &self,
        number: &str,
    ) -> Result<Option<Ticket>, StorageError> {
        Ok(self.data_manager.get_active_ticket_by_number(number).await)
    }

    async fn is_number_taken(&self, number: &str) -> Result<bool, StorageError> {
        Ok(self.data_manager.is_number_taken(number).await)
    }

    async fn activate_ticket(
        &self,
        reference: &str,
        activated_at: OffsetDateTime,
    ) -> Result<ActivationOutcome, StorageError> {
        Ok(self.data_manager.activate_ticket(reference, activated_at).await)
    }

    async fn expire_ticket(&self, reference: &str) -> Result<bool, StorageError> {
        Ok(self.data_manager.expire_ticket(reference).await)
    }

    async fn pending_tickets_older_than(
        &self,
        cutoff: OffsetDateTime,
    ) -> Result<Vec<Ticket>, StorageError> {
        Ok(self.data_manager.pending_tickets_older_than(cutoff).await)
    }

    async fn tickets_of_owner(&self, owner_phone: &str) -> Result<Vec<Ticket>, StorageError> {
        Ok(self.data_manager.tickets_of_owner(owner_phone).await)
    }

    async fn update_owner_profile(
        &self,
        reference: &str,
        owner_name: &str,
        owner_document_id: Option<&str>,
    ) -> Result<bool, StorageError> {
        Ok(self
            .data_manager
            .update_owner_profile(reference, owner_name, owner_document_id)
            .await)
    }

    async fn top_buyers(&self, limit: u32) -> Result<Vec<TopBuyer>, StorageError> {
        Ok(self.data_manager.top_buyers(limit).await)
    }

    async fn wallet_balance(&self, owner_phone: &str) -> Result<i64, StorageError> {
        Ok(self.data_manager.wallet_balance(owner_phone).await)
    }

    async fn credit_wallet(&self, owner_phone: &str, amount: i64) -> Result<i64, StorageError> {
        Ok(self.data_manager.credit_wallet(owner_phone, amount).await)
    }

    async fn try_debit_wallet(
        &self,
        owner_phone: &str,
        amount: i64,
    ) -> Result<Option<i64>, StorageError> {
        Ok(self.data_manager.try_debit_wallet(owner_phone, amount).await)
    }

    async fn credit_prize_pool(&self, amount: i64) -> Result<i64, StorageError> {
        Ok(self.data_manager.credit_prize_pool(amount).await)
    }

    async fn prize_pool(&self) -> Result<i64, StorageError> {
        Ok(self.data_manager.prize_pool().await)
    }

    async fn insert_draw_result(&self, result: DrawResult) -> Result<(), StorageError> {
        self.data_manager.insert_draw_result(result).await;
        Ok(())
    }

    async fn draw_history(&self) -> Result<Vec<DrawResult>, StorageError> {
        Ok(self.data_manager.draw_history().await)
    }

    async fn upsert_access_code(
        &self,
        phone: &str,
        code: &str,
        issued_at: OffsetDateTime,
    ) -> Result<(), StorageError> {
        self.data_manager.upsert_access_code(phone, code, issued_at).await;
        Ok(())
    }

    async fn get_access_code(&self, phone: &str) -> Result<Option<AccessCredential>, StorageError> {
        Ok(self.data_manager.get_access_code(phone).await)
    }
}
