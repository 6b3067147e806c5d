// Copyright 2025 - Nym Technologies SA <contact@nymtech.net>
// SPDX-License-Identifier: Apache-2.0

use async_trait::async_trait;
use sqlx::ConnectOptions;
use std::path::Path;
use time::OffsetDateTime;
use tracing::{debug, error, info};

use crate::backends::sqlite::{AccessCodeManager, DrawManager, TicketManager, WalletManager};
use crate::error::StorageError;
use crate::models::{AccessCredential, ActivationOutcome, DrawResult, NewTicket, Ticket, TopBuyer};
use crate::traits::GanarStorage;

// note that clone here is fine as upon cloning the same underlying pool will be used
#[derive(Clone)]
pub struct PersistentStorage {
    ticket_manager: TicketManager,
    wallet_manager: WalletManager,
    draw_manager: DrawManager,
    access_code_manager: AccessCodeManager,
}

impl PersistentStorage {
    /// Initialises `PersistentStorage` using the provided path.
    ///
    /// # Arguments
    ///
    /// * `database_path`: path to the database.
    pub async fn init<P: AsRef<Path> + Send>(database_path: P) -> Result<Self, StorageError> {
        debug!(
            "attempting to open database file {:?}",
            database_path.as_ref().as_os_str()
        );
        let opts = sqlx::sqlite::SqliteConnectOptions::new()
            .filename(database_path)
            .create_if_missing(true)
            .disable_statement_logging();

        let connection_pool = sqlx::SqlitePool::connect_with(opts).await?;

        if let Err(err) = sqlx::migrate!("./migrations").run(&connection_pool).await {
            error!("Failed to perform migration on the database: {err}");
            return Err(err.into());
        }
        info!("Database migration finished!");

        Ok(PersistentStorage {
            ticket_manager: TicketManager::new(connection_pool.clone()),
            wallet_manager: WalletManager::new(connection_pool.clone()),
            draw_manager: DrawManager::new(connection_pool.clone()),
            access_code_manager: AccessCodeManager::new(connection_pool),
        })
    }
}

#[async_trait]
impl GanarStorage for PersistentStorage {
    async fn insert_pending_ticket(&self, ticket: NewTicket) -> Result<Ticket, StorageError> {
        self.ticket_manager.insert_pending(ticket).await
    }

    async fn get_ticket(&self, reference: &str) -> Result<Option<Ticket>, StorageError> {
        self.ticket_manager.get(reference).await
    }

    async fn get_active_ticket_by_number(
        &self,
        number: &str,
    ) -> Result<Option<Ticket>, StorageError> {
        self.ticket_manager.get_active_by_number(number).await
    }

    async fn is_number_taken(&self, number: &str) -> Result<bool, StorageError> {
        self.ticket_manager.is_number_taken(number).await
    }

    async fn activate_ticket(
        &self,
        reference: &str,
        activated_at: OffsetDateTime,
    ) -> Result<ActivationOutcome, StorageError> {
        self.ticket_manager.activate(reference, activated_at).await
    }

    async fn expire_ticket(&self, reference: &str) -> Result<bool, StorageError> {
        self.ticket_manager.expire(reference).await
    }

    async fn pending_tickets_older_than(
        &self,
        cutoff: OffsetDateTime,
    ) -> Result<Vec<Ticket>, StorageError> {
        self.ticket_manager.pending_older_than(cutoff).await
    }

    async fn tickets_of_owner(&self, owner_phone: &str) -> Result<Vec<Ticket>, StorageError> {
        self.ticket_manager.of_owner(owner_phone).await
    }

    async fn update_owner_profile(
        &self,
        reference: &str,
        owner_name: &str,
        owner_document_id: Option<&str>,
    ) -> Result<bool, StorageError> {
        self.ticket_manager
            .update_owner_profile(reference, owner_name, owner_document_id)
            .await
    }

    async fn top_buyers(&self, limit: u32) -> Result<Vec<TopBuyer>, StorageError> {
        self.ticket_manager.top_buyers(limit).await
    }

    async fn wallet_balance(&self, owner_phone: &str) -> Result<i64, StorageError> {
        self.wallet_manager.balance(owner_phone).await
    }

    async fn credit_wallet(&self, owner_phone: &str, amount: i64) -> Result<i64, StorageError> {
        self.wallet_manager.credit(owner_phone, amount).await
    }

    async fn try_debit_wallet(
        &self,
        owner_phone: &str,
        amount: i64,
    ) -> Result<Option<i64>, StorageError> {
        self.wallet_manager.try_debit(owner_phone, amount).await
    }

    async fn credit_prize_pool(&self, amount: i64) -> Result<i64, StorageError> {
        self.wallet_manager.credit_prize_pool(amount).await
    }

    async fn prize_pool(&self) -> Result<i64, StorageError> {
        self.wallet_manager.prize_pool().await
    }

    async fn insert_draw_result(&self, result: DrawResult) -> Result<(), StorageError> {
        self.draw_manager.insert(result).await
    }

    async fn draw_history(&self) -> Result<Vec<DrawResult>, StorageError> {
        self.draw_manager.history().await
    }

    async fn upsert_access_code(
        &self,
        phone: &str,
        code: &str,
        issued_at: OffsetDateTime,
    ) -> Result<(), StorageError> {
        self.access_code_manager.upsert(phone, code, issued_at).await
    }

    async fn get_access_code(&self, phone: &str) -> Result<Option<AccessCredential>, StorageError> {
        self.access_code_manager.get(phone).await
    }
}
