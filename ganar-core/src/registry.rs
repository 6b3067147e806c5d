// Copyright 2025 - Nym Technologies SA <contact@nymtech.net>
// SPDX-License-Identifier: GPL-3.0-only

use std::sync::Arc;
use time::OffsetDateTime;
use tracing::{debug, info, warn};
use uuid::Uuid;

use ganar_storage::{ActivationOutcome, GanarStorage, NewTicket, StorageError, Ticket, TopBuyer};

use crate::config::Pricing;
use crate::error::GanarError;
use crate::helpers::{is_valid_ticket_number, normalize_phone, random_ticket_number, ticket_code};

// regenerating the random code suffix on a clash practically never takes
// more than one extra round trip
const MAX_CODE_ATTEMPTS: usize = 3;

/// Buyer identity captured at purchase time.
#[derive(Debug, Clone)]
pub struct OwnerProfile {
    pub full_name: String,
    pub phone: String,
    /// Optional document id, required later for leaderboard/prize eligibility.
    pub document_id: Option<String>,
}

/// Result of an idempotent activation request.
#[derive(Debug, Clone)]
pub enum Activation {
    /// The ticket transitioned pending -> active in this call.
    Fresh(Ticket),
    /// The ticket was already active; nothing was changed.
    Repeated(Ticket),
}

impl Activation {
    pub fn ticket(&self) -> &Ticket {
        match self {
            Activation::Fresh(ticket) | Activation::Repeated(ticket) => ticket,
        }
    }

    pub fn into_ticket(self) -> Ticket {
        match self {
            Activation::Fresh(ticket) | Activation::Repeated(ticket) => ticket,
        }
    }

    pub fn is_fresh(&self) -> bool {
        matches!(self, Activation::Fresh(_))
    }
}

/// Authoritative owner of ticket records and of the uniqueness invariant
/// over the 4-digit number space.
pub struct TicketRegistry<S> {
    storage: Arc<S>,
    pricing: Pricing,
    max_random_attempts: u32,
}

impl<S> Clone for TicketRegistry<S> {
    fn clone(&self) -> Self {
        TicketRegistry {
            storage: Arc::clone(&self.storage),
            pricing: self.pricing.clone(),
            max_random_attempts: self.max_random_attempts,
        }
    }
}

impl<S: GanarStorage> TicketRegistry<S> {
    pub fn new(storage: Arc<S>, pricing: Pricing, max_random_attempts: u32) -> Self {
        TicketRegistry {
            storage,
            pricing,
            max_random_attempts,
        }
    }

    /// Reserves `number` for the given buyer, creating a `pending` ticket
    /// with the price fixed now. Fails with [`GanarError::Conflict`] when a
    /// non-terminal ticket already holds the number.
    pub async fn reserve(
        &self,
        number: &str,
        owner: OwnerProfile,
        price: i64,
        is_boosted: bool,
    ) -> Result<Ticket, GanarError> {
        if !is_valid_ticket_number(number) {
            return Err(GanarError::InvalidNumber {
                input: number.to_string(),
            });
        }

        let owner_phone = normalize_phone(&owner.phone);
        let created_at = OffsetDateTime::now_utc();

        let mut attempt = 0;
        loop {
            attempt += 1;
            let ticket = NewTicket {
                id: Uuid::new_v4(),
                code: ticket_code(created_at),
                number: number.to_string(),
                owner_phone: owner_phone.clone(),
                owner_name: owner.full_name.clone(),
                owner_document_id: owner.document_id.clone(),
                price,
                is_boosted,
                created_at,
            };

            match self.storage.insert_pending_ticket(ticket).await {
                Ok(reserved) => {
                    info!(
                        "reserved number {} for {} under code {}",
                        reserved.number, reserved.owner_phone, reserved.code
                    );
                    return Ok(reserved);
                }
                Err(StorageError::DuplicateNumber { number }) => {
                    return Err(GanarError::Conflict { number });
                }
                Err(StorageError::DuplicateCode { code }) if attempt < MAX_CODE_ATTEMPTS => {
                    // fresh random suffix on the next round
                    debug!("ticket code {code} already exists, regenerating");
                }
                Err(err) => return Err(err.into()),
            }
        }
    }

    /// Reserves a random free number, retrying on conflicts a bounded number
    /// of times before reporting the space as exhausted.
    pub async fn reserve_random(
        &self,
        owner: OwnerProfile,
        price: i64,
        is_boosted: bool,
    ) -> Result<Ticket, GanarError> {
        let attempts = self.max_random_attempts;
        for _ in 0..attempts {
            let candidate = random_ticket_number();
            match self
                .reserve(&candidate, owner.clone(), price, is_boosted)
                .await
            {
                Err(GanarError::Conflict { number }) => {
                    debug!("random candidate {number} is taken, retrying");
                }
                other => return other,
            }
        }
        warn!("failed to find a free number in {attempts} attempts");
        Err(GanarError::NumberSpaceExhausted { attempts })
    }

    /// Idempotently flips a pending ticket to active. On the fresh
    /// transition the configured share of the ticket price is settled into
    /// the accumulated prize pool, exactly once.
    pub async fn activate(&self, reference: &str) -> Result<Activation, GanarError> {
        let now = OffsetDateTime::now_utc();
        match self.storage.activate_ticket(reference, now).await? {
            ActivationOutcome::Activated(ticket) => {
                let contribution = self.pricing.pool_contribution(ticket.price);
                let pool = self.storage.credit_prize_pool(contribution).await?;
                info!(
                    "activated ticket {} (number {}); pool contribution {contribution}, accumulated pool now {pool}",
                    ticket.code, ticket.number
                );
                Ok(Activation::Fresh(ticket))
            }
            ActivationOutcome::AlreadyActive(ticket) => {
                debug!("ticket {} was already active", ticket.code);
                Ok(Activation::Repeated(ticket))
            }
            ActivationOutcome::Unactivatable(ticket) => Err(GanarError::AlreadyExpired {
                reference: ticket.code,
            }),
            ActivationOutcome::NotFound => Err(GanarError::TicketNotFound {
                reference: reference.to_string(),
            }),
        }
    }

    /// Flips `pending -> expired`; a no-op for anything not pending, so an
    /// activation racing with the sweeper always wins if it lands first.
    pub async fn expire(&self, reference: &str) -> Result<bool, GanarError> {
        Ok(self.storage.expire_ticket(reference).await?)
    }

    pub async fn is_taken(&self, number: &str) -> Result<bool, GanarError> {
        Ok(self.storage.is_number_taken(number).await?)
    }

    pub async fn get(&self, reference: &str) -> Result<Ticket, GanarError> {
        self.storage
            .get_ticket(reference)
            .await?
            .ok_or_else(|| GanarError::TicketNotFound {
                reference: reference.to_string(),
            })
    }

    pub async fn tickets_of_owner(&self, phone: &str) -> Result<Vec<Ticket>, GanarError> {
        Ok(self
            .storage
            .tickets_of_owner(&normalize_phone(phone))
            .await?)
    }

    pub async fn update_owner_profile(
        &self,
        reference: &str,
        full_name: &str,
        document_id: Option<&str>,
    ) -> Result<(), GanarError> {
        if self
            .storage
            .update_owner_profile(reference, full_name, document_id)
            .await?
        {
            Ok(())
        } else {
            Err(GanarError::TicketNotFound {
                reference: reference.to_string(),
            })
        }
    }

    pub async fn top_buyers(&self, limit: u32) -> Result<Vec<TopBuyer>, GanarError> {
        Ok(self.storage.top_buyers(limit).await?)
    }
}
