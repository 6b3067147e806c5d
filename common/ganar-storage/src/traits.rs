// Copyright 2025 - Nym Technologies SA <contact@nymtech.net>
// SPDX-License-Identifier: Apache-2.0

use async_trait::async_trait;
use time::OffsetDateTime;

use crate::error::StorageError;
use crate::models::{AccessCredential, ActivationOutcome, DrawResult, NewTicket, Ticket, TopBuyer};

/// Persistence contract of the allocation and reconciliation core.
///
/// Every method is a single atomic read-modify-write; compound flows
/// (debit-then-activate and their compensations) are sequenced by the
/// callers on top of these primitives.
#[async_trait]
pub trait GanarStorage: Send + Sync {
    /// Inserts a fresh `pending` reservation.
    ///
    /// Fails with [`StorageError::DuplicateNumber`] if another ticket in a
    /// non-terminal state already holds the number, and with
    /// [`StorageError::DuplicateCode`] on an (unlikely) external code clash.
    async fn insert_pending_ticket(&self, ticket: NewTicket) -> Result<Ticket, StorageError>;

    /// Tries to retrieve a ticket by its external code or internal id.
    async fn get_ticket(&self, reference: &str) -> Result<Option<Ticket>, StorageError>;

    async fn get_active_ticket_by_number(&self, number: &str)
        -> Result<Option<Ticket>, StorageError>;

    /// True iff a non-terminal ticket currently holds `number`.
    async fn is_number_taken(&self, number: &str) -> Result<bool, StorageError>;

    /// Conditionally flips a `pending` ticket to `active`, stamping the
    /// activation time. The returned outcome states whether this call
    /// performed the transition, making the operation safe to repeat.
    async fn activate_ticket(
        &self,
        reference: &str,
        activated_at: OffsetDateTime,
    ) -> Result<ActivationOutcome, StorageError>;

    /// Conditionally flips a `pending` ticket to `expired`. Returns whether
    /// the transition was applied; anything not pending is left untouched.
    async fn expire_ticket(&self, reference: &str) -> Result<bool, StorageError>;

    /// All `pending` tickets reserved strictly before the cutoff.
    async fn pending_tickets_older_than(
        &self,
        cutoff: OffsetDateTime,
    ) -> Result<Vec<Ticket>, StorageError>;

    /// Tickets belonging to the given owner, newest first.
    async fn tickets_of_owner(&self, owner_phone: &str) -> Result<Vec<Ticket>, StorageError>;

    /// Rewrites the owner profile fields of a ticket. Returns whether the
    /// ticket existed. Does not touch status, price or timestamps.
    async fn update_owner_profile(
        &self,
        reference: &str,
        owner_name: &str,
        owner_document_id: Option<&str>,
    ) -> Result<bool, StorageError>;

    /// Buyers with the most active tickets, grouped by document id.
    async fn top_buyers(&self, limit: u32) -> Result<Vec<TopBuyer>, StorageError>;

    /// Current balance for the identity; an absent wallet reads as 0.
    async fn wallet_balance(&self, owner_phone: &str) -> Result<i64, StorageError>;

    /// Unconditional atomic increment, creating the wallet if needed.
    /// Returns the new balance.
    async fn credit_wallet(&self, owner_phone: &str, amount: i64) -> Result<i64, StorageError>;

    /// Atomically debits the wallet only if the balance is sufficient.
    /// Returns the new balance on success, `None` when funds are lacking
    /// (including the absent-wallet case). The balance can never go
    /// negative through this method.
    async fn try_debit_wallet(
        &self,
        owner_phone: &str,
        amount: i64,
    ) -> Result<Option<i64>, StorageError>;

    /// Adds to the accumulated prize pool, returning the new total.
    async fn credit_prize_pool(&self, amount: i64) -> Result<i64, StorageError>;

    async fn prize_pool(&self) -> Result<i64, StorageError>;

    /// Appends an immutable draw record. Records are never updated.
    async fn insert_draw_result(&self, result: DrawResult) -> Result<(), StorageError>;

    /// Past draw records, newest first.
    async fn draw_history(&self) -> Result<Vec<DrawResult>, StorageError>;

    /// Stores the latest access code for a phone, replacing any prior one.
    async fn upsert_access_code(
        &self,
        phone: &str,
        code: &str,
        issued_at: OffsetDateTime,
    ) -> Result<(), StorageError>;

    async fn get_access_code(&self, phone: &str) -> Result<Option<AccessCredential>, StorageError>;
}
