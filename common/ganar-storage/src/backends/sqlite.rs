// Copyright 2025 - Nym Technologies SA <contact@nymtech.net>
// SPDX-License-Identifier: Apache-2.0

use time::OffsetDateTime;

use crate::error::StorageError;
use crate::models::{
    AccessCredential, ActivationOutcome, DrawResult, NewTicket, StoredDrawResult, StoredTicket,
    Ticket, TicketStatus, TopBuyer,
};

fn map_ticket_insert_error(err: sqlx::Error, ticket: &NewTicket) -> StorageError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() {
            // the code column has a table-level UNIQUE constraint, the number
            // is guarded by the partial `tickets_number_non_terminal` index
            if db_err.message().contains("tickets.code") {
                return StorageError::DuplicateCode {
                    code: ticket.code.clone(),
                };
            }
            return StorageError::DuplicateNumber {
                number: ticket.number.clone(),
            };
        }
    }
    err.into()
}

#[derive(Clone)]
pub(crate) struct TicketManager {
    connection_pool: sqlx::SqlitePool,
}

impl TicketManager {
    pub(crate) fn new(connection_pool: sqlx::SqlitePool) -> Self {
        TicketManager { connection_pool }
    }

    pub(crate) async fn insert_pending(&self, ticket: NewTicket) -> Result<Ticket, StorageError> {
        sqlx::query(
            r#"
                INSERT INTO tickets(id, code, number, owner_phone, owner_name, owner_document_id, price, is_boosted, status, created_at, activated_at)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, 'pending', ?, NULL)
            "#,
        )
        .bind(ticket.id.to_string())
        .bind(&ticket.code)
        .bind(&ticket.number)
        .bind(&ticket.owner_phone)
        .bind(&ticket.owner_name)
        .bind(&ticket.owner_document_id)
        .bind(ticket.price)
        .bind(ticket.is_boosted)
        .bind(ticket.created_at)
        .execute(&self.connection_pool)
        .await
        .map_err(|err| map_ticket_insert_error(err, &ticket))?;

        Ok(ticket.into_pending())
    }

    /// Tries to retrieve a ticket by its external code or internal id.
    pub(crate) async fn get(&self, reference: &str) -> Result<Option<Ticket>, StorageError> {
        let row: Option<StoredTicket> =
            sqlx::query_as("SELECT * FROM tickets WHERE code = ? OR id = ?")
                .bind(reference)
                .bind(reference)
                .fetch_optional(&self.connection_pool)
                .await?;
        row.map(Ticket::try_from).transpose()
    }

    pub(crate) async fn get_active_by_number(
        &self,
        number: &str,
    ) -> Result<Option<Ticket>, StorageError> {
        let row: Option<StoredTicket> =
            sqlx::query_as("SELECT * FROM tickets WHERE number = ? AND status = 'active'")
                .bind(number)
                .fetch_optional(&self.connection_pool)
                .await?;
        row.map(Ticket::try_from).transpose()
    }

    pub(crate) async fn is_number_taken(&self, number: &str) -> Result<bool, StorageError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM tickets WHERE number = ? AND status IN ('pending', 'active')",
        )
        .bind(number)
        .fetch_one(&self.connection_pool)
        .await?;
        Ok(count > 0)
    }

    /// Conditional pending -> active CAS. The update and the follow-up read
    /// share one transaction so a racing `expire` cannot interleave.
    pub(crate) async fn activate(
        &self,
        reference: &str,
        activated_at: OffsetDateTime,
    ) -> Result<ActivationOutcome, StorageError> {
        let mut tx = self.connection_pool.begin().await?;

        let applied = sqlx::query(
            r#"
                UPDATE tickets
                SET status = 'active', activated_at = ?
                WHERE (code = ? OR id = ?) AND status = 'pending'
            "#,
        )
        .bind(activated_at)
        .bind(reference)
        .bind(reference)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        let row: Option<StoredTicket> =
            sqlx::query_as("SELECT * FROM tickets WHERE code = ? OR id = ?")
                .bind(reference)
                .bind(reference)
                .fetch_optional(&mut *tx)
                .await?;

        tx.commit().await?;

        let Some(ticket) = row.map(Ticket::try_from).transpose()? else {
            return Ok(ActivationOutcome::NotFound);
        };

        if applied == 1 {
            Ok(ActivationOutcome::Activated(ticket))
        } else if ticket.status == TicketStatus::Active {
            Ok(ActivationOutcome::AlreadyActive(ticket))
        } else {
            Ok(ActivationOutcome::Unactivatable(ticket))
        }
    }

    pub(crate) async fn expire(&self, reference: &str) -> Result<bool, StorageError> {
        let applied = sqlx::query(
            "UPDATE tickets SET status = 'expired' WHERE (code = ? OR id = ?) AND status = 'pending'",
        )
        .bind(reference)
        .bind(reference)
        .execute(&self.connection_pool)
        .await?
        .rows_affected();
        Ok(applied == 1)
    }

    pub(crate) async fn pending_older_than(
        &self,
        cutoff: OffsetDateTime,
    ) -> Result<Vec<Ticket>, StorageError> {
        let rows: Vec<StoredTicket> = sqlx::query_as(
            "SELECT * FROM tickets WHERE status = 'pending' AND created_at < ? ORDER BY created_at ASC",
        )
        .bind(cutoff)
        .fetch_all(&self.connection_pool)
        .await?;
        rows.into_iter().map(Ticket::try_from).collect()
    }

    pub(crate) async fn of_owner(&self, owner_phone: &str) -> Result<Vec<Ticket>, StorageError> {
        let rows: Vec<StoredTicket> =
            sqlx::query_as("SELECT * FROM tickets WHERE owner_phone = ? ORDER BY created_at DESC")
                .bind(owner_phone)
                .fetch_all(&self.connection_pool)
                .await?;
        rows.into_iter().map(Ticket::try_from).collect()
    }

    pub(crate) async fn update_owner_profile(
        &self,
        reference: &str,
        owner_name: &str,
        owner_document_id: Option<&str>,
    ) -> Result<bool, StorageError> {
        let applied = sqlx::query(
            "UPDATE tickets SET owner_name = ?, owner_document_id = ? WHERE code = ? OR id = ?",
        )
        .bind(owner_name)
        .bind(owner_document_id)
        .bind(reference)
        .bind(reference)
        .execute(&self.connection_pool)
        .await?
        .rows_affected();
        Ok(applied > 0)
    }

    pub(crate) async fn top_buyers(&self, limit: u32) -> Result<Vec<TopBuyer>, StorageError> {
        let rows: Vec<TopBuyer> = sqlx::query_as(
            r#"
                SELECT owner_document_id AS document_id, MAX(owner_name) AS name, COUNT(*) AS ticket_count
                FROM tickets
                WHERE status = 'active' AND owner_document_id IS NOT NULL
                GROUP BY owner_document_id
                ORDER BY ticket_count DESC
                LIMIT ?
            "#,
        )
        .bind(limit as i64)
        .fetch_all(&self.connection_pool)
        .await?;
        Ok(rows)
    }
}

#[derive(Clone)]
pub(crate) struct WalletManager {
    connection_pool: sqlx::SqlitePool,
}

impl WalletManager {
    pub(crate) fn new(connection_pool: sqlx::SqlitePool) -> Self {
        WalletManager { connection_pool }
    }

    pub(crate) async fn balance(&self, owner_phone: &str) -> Result<i64, StorageError> {
        let balance: Option<i64> =
            sqlx::query_scalar("SELECT balance FROM wallets WHERE owner_phone = ?")
                .bind(owner_phone)
                .fetch_optional(&self.connection_pool)
                .await?;
        Ok(balance.unwrap_or_default())
    }

    pub(crate) async fn credit(&self, owner_phone: &str, amount: i64) -> Result<i64, StorageError> {
        let mut tx = self.connection_pool.begin().await?;
        sqlx::query(
            r#"
                INSERT INTO wallets(owner_phone, balance) VALUES (?, ?)
                ON CONFLICT(owner_phone) DO UPDATE SET balance = balance + excluded.balance
            "#,
        )
        .bind(owner_phone)
        .bind(amount)
        .execute(&mut *tx)
        .await?;

        let remaining: i64 = sqlx::query_scalar("SELECT balance FROM wallets WHERE owner_phone = ?")
            .bind(owner_phone)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(remaining)
    }

    pub(crate) async fn try_debit(
        &self,
        owner_phone: &str,
        amount: i64,
    ) -> Result<Option<i64>, StorageError> {
        let mut tx = self.connection_pool.begin().await?;
        let applied = sqlx::query(
            "UPDATE wallets SET balance = balance - ? WHERE owner_phone = ? AND balance >= ?",
        )
        .bind(amount)
        .bind(owner_phone)
        .bind(amount)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if applied == 0 {
            // nothing was changed, the transaction is dropped and rolled back
            return Ok(None);
        }

        let remaining: i64 = sqlx::query_scalar("SELECT balance FROM wallets WHERE owner_phone = ?")
            .bind(owner_phone)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(Some(remaining))
    }

    pub(crate) async fn credit_prize_pool(&self, amount: i64) -> Result<i64, StorageError> {
        let mut tx = self.connection_pool.begin().await?;
        sqlx::query("UPDATE prize_pool SET accumulated = accumulated + ? WHERE id = 1")
            .bind(amount)
            .execute(&mut *tx)
            .await?;

        let total: i64 = sqlx::query_scalar("SELECT accumulated FROM prize_pool WHERE id = 1")
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(total)
    }

    pub(crate) async fn prize_pool(&self) -> Result<i64, StorageError> {
        let total: i64 = sqlx::query_scalar("SELECT accumulated FROM prize_pool WHERE id = 1")
            .fetch_one(&self.connection_pool)
            .await?;
        Ok(total)
    }
}

#[derive(Clone)]
pub(crate) struct DrawManager {
    connection_pool: sqlx::SqlitePool,
}

impl DrawManager {
    pub(crate) fn new(connection_pool: sqlx::SqlitePool) -> Self {
        DrawManager { connection_pool }
    }

    pub(crate) async fn insert(&self, result: DrawResult) -> Result<(), StorageError> {
        let (winner_name, winner_phone, winner_ticket_number) = match result.winner {
            Some(winner) => (
                Some(winner.name),
                Some(winner.phone),
                Some(winner.ticket_number),
            ),
            None => (None, None, None),
        };

        sqlx::query(
            r#"
                INSERT INTO draw_results(id, drawn_at, winning_number, prize_tier, prize_amount, lottery_name, winner_name, winner_phone, winner_ticket_number)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(result.id.to_string())
        .bind(result.drawn_at)
        .bind(&result.winning_number)
        .bind(&result.prize_tier)
        .bind(result.prize_amount)
        .bind(&result.lottery_name)
        .bind(winner_name)
        .bind(winner_phone)
        .bind(winner_ticket_number)
        .execute(&self.connection_pool)
        .await?;
        Ok(())
    }

    pub(crate) async fn history(&self) -> Result<Vec<DrawResult>, StorageError> {
        let rows: Vec<StoredDrawResult> =
            sqlx::query_as("SELECT * FROM draw_results ORDER BY drawn_at DESC")
                .fetch_all(&self.connection_pool)
                .await?;
        rows.into_iter().map(DrawResult::try_from).collect()
    }
}

#[derive(Clone)]
pub(crate) struct AccessCodeManager {
    connection_pool: sqlx::SqlitePool,
}

impl AccessCodeManager {
    pub(crate) fn new(connection_pool: sqlx::SqlitePool) -> Self {
        AccessCodeManager { connection_pool }
    }

    pub(crate) async fn upsert(
        &self,
        phone: &str,
        code: &str,
        issued_at: OffsetDateTime,
    ) -> Result<(), StorageError> {
        sqlx::query(
            r#"
                INSERT INTO access_codes(phone, code, issued_at) VALUES (?, ?, ?)
                ON CONFLICT(phone) DO UPDATE SET code = excluded.code, issued_at = excluded.issued_at
            "#,
        )
        .bind(phone)
        .bind(code)
        .bind(issued_at)
        .execute(&self.connection_pool)
        .await?;
        Ok(())
    }

    pub(crate) async fn get(&self, phone: &str) -> Result<Option<AccessCredential>, StorageError> {
        let credential: Option<AccessCredential> =
            sqlx::query_as("SELECT phone, code, issued_at FROM access_codes WHERE phone = ?")
                .bind(phone)
                .fetch_optional(&self.connection_pool)
                .await?;
        Ok(credential)
    }
}
