// Copyright 2025 - Nym Technologies SA <contact@nymtech.net>
// SPDX-License-Identifier: Apache-2.0

use crate::error::StorageError;
use time::OffsetDateTime;
use uuid::Uuid;

/// Lifecycle of a ticket. Transitions only ever move forward:
/// `Pending -> Active -> Redeemed` or `Pending -> Expired`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TicketStatus {
    Pending,
    Active,
    Redeemed,
    Expired,
}

impl TicketStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TicketStatus::Pending => "pending",
            TicketStatus::Active => "active",
            TicketStatus::Redeemed => "redeemed",
            TicketStatus::Expired => "expired",
        }
    }

    pub fn parse(raw: &str) -> Result<Self, StorageError> {
        match raw {
            "pending" => Ok(TicketStatus::Pending),
            "active" => Ok(TicketStatus::Active),
            "redeemed" => Ok(TicketStatus::Redeemed),
            "expired" => Ok(TicketStatus::Expired),
            other => Err(StorageError::data_corruption(format!(
                "unknown ticket status '{other}'"
            ))),
        }
    }

    /// True for statuses that still hold their number.
    pub fn is_non_terminal(&self) -> bool {
        matches!(self, TicketStatus::Pending | TicketStatus::Active)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ticket {
    pub id: Uuid,
    /// Human/QR-shareable external reference, e.g. `GA-20250612-A1B2`.
    pub code: String,
    /// The contended 4-digit number.
    pub number: String,
    pub owner_phone: String,
    pub owner_name: String,
    pub owner_document_id: Option<String>,
    /// Amount due, fixed at reservation time. Never recomputed afterwards.
    pub price: i64,
    pub is_boosted: bool,
    pub status: TicketStatus,
    pub created_at: OffsetDateTime,
    pub activated_at: Option<OffsetDateTime>,
}

/// Insert payload for a fresh reservation.
#[derive(Debug, Clone)]
pub struct NewTicket {
    pub id: Uuid,
    pub code: String,
    pub number: String,
    pub owner_phone: String,
    pub owner_name: String,
    pub owner_document_id: Option<String>,
    pub price: i64,
    pub is_boosted: bool,
    pub created_at: OffsetDateTime,
}

impl NewTicket {
    pub(crate) fn into_pending(self) -> Ticket {
        Ticket {
            id: self.id,
            code: self.code,
            number: self.number,
            owner_phone: self.owner_phone,
            owner_name: self.owner_name,
            owner_document_id: self.owner_document_id,
            price: self.price,
            is_boosted: self.is_boosted,
            status: TicketStatus::Pending,
            created_at: self.created_at,
            activated_at: None,
        }
    }
}

/// Raw `tickets` row as stored in sqlite.
#[derive(sqlx::FromRow)]
pub(crate) struct StoredTicket {
    pub id: String,
    pub code: String,
    pub number: String,
    pub owner_phone: String,
    pub owner_name: String,
    pub owner_document_id: Option<String>,
    pub price: i64,
    pub is_boosted: bool,
    pub status: String,
    pub created_at: OffsetDateTime,
    pub activated_at: Option<OffsetDateTime>,
}

impl TryFrom<StoredTicket> for Ticket {
    type Error = StorageError;

    fn try_from(row: StoredTicket) -> Result<Self, Self::Error> {
        let id = Uuid::parse_str(&row.id)
            .map_err(|_| StorageError::data_corruption(format!("malformed ticket id '{}'", row.id)))?;
        Ok(Ticket {
            id,
            code: row.code,
            number: row.number,
            owner_phone: row.owner_phone,
            owner_name: row.owner_name,
            owner_document_id: row.owner_document_id,
            price: row.price,
            is_boosted: row.is_boosted,
            status: TicketStatus::parse(&row.status)?,
            created_at: row.created_at,
            activated_at: row.activated_at,
        })
    }
}

/// Outcome of the conditional pending -> active transition.
///
/// The distinction between `Activated` and `AlreadyActive` matters to callers:
/// settlement side effects must be applied only when the transition was ours.
#[derive(Debug, Clone)]
pub enum ActivationOutcome {
    /// This call flipped the ticket from pending to active.
    Activated(Ticket),
    /// The ticket had already been activated before; no state was changed.
    AlreadyActive(Ticket),
    /// The ticket is in a terminal state and can no longer be activated.
    Unactivatable(Ticket),
    NotFound,
}

/// Identity fields of a winning ticket, copied at draw time so later ticket
/// mutation cannot alter a paid-out history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WinnerSnapshot {
    pub name: String,
    pub phone: String,
    pub ticket_number: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DrawResult {
    pub id: Uuid,
    pub drawn_at: OffsetDateTime,
    pub winning_number: String,
    pub prize_tier: String,
    pub prize_amount: i64,
    pub lottery_name: String,
    pub winner: Option<WinnerSnapshot>,
}

#[derive(sqlx::FromRow)]
pub(crate) struct StoredDrawResult {
    pub id: String,
    pub drawn_at: OffsetDateTime,
    pub winning_number: String,
    pub prize_tier: String,
    pub prize_amount: i64,
    pub lottery_name: String,
    pub winner_name: Option<String>,
    pub winner_phone: Option<String>,
    pub winner_ticket_number: Option<String>,
}

impl TryFrom<StoredDrawResult> for DrawResult {
    type Error = StorageError;

    fn try_from(row: StoredDrawResult) -> Result<Self, Self::Error> {
        let id = Uuid::parse_str(&row.id)
            .map_err(|_| StorageError::data_corruption(format!("malformed draw id '{}'", row.id)))?;
        let winner = match (row.winner_name, row.winner_phone, row.winner_ticket_number) {
            (Some(name), Some(phone), Some(ticket_number)) => Some(WinnerSnapshot {
                name,
                phone,
                ticket_number,
            }),
            (None, None, None) => None,
            _ => {
                return Err(StorageError::data_corruption(format!(
                    "partial winner snapshot on draw '{}'",
                    row.id
                )))
            }
        };
        Ok(DrawResult {
            id,
            drawn_at: row.drawn_at,
            winning_number: row.winning_number,
            prize_tier: row.prize_tier,
            prize_amount: row.prize_amount,
            lottery_name: row.lottery_name,
            winner,
        })
    }
}

/// Latest one-time access code issued for a phone number.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AccessCredential {
    pub phone: String,
    pub code: String,
    pub issued_at: OffsetDateTime,
}

/// Leaderboard entry: active tickets grouped by buyer document id.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct TopBuyer {
    pub document_id: String,
    pub name: String,
    pub ticket_count: i64,
}
