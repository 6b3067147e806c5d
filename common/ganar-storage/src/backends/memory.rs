// Copyright 2025 - Nym Technologies SA <contact@nymtech.net>
// SPDX-License-Identifier: Apache-2.0

use std::collections::HashMap;
use std::sync::Arc;
use time::OffsetDateTime;
use tokio::sync::RwLock;

use crate::error::StorageError;
use crate::models::{
    AccessCredential, ActivationOutcome, DrawResult, NewTicket, Ticket, TicketStatus, TopBuyer,
};

// note that clone here is fine as upon cloning the same underlying state will be used
#[derive(Clone, Default)]
pub(crate) struct GanarDataManager {
    inner: Arc<RwLock<GanarDataInner>>,
}

#[derive(Default)]
struct GanarDataInner {
    tickets: Vec<Ticket>,
    wallets: HashMap<String, i64>,
    draws: Vec<DrawResult>,
    access_codes: HashMap<String, AccessCredential>,
    prize_pool: i64,
}

impl GanarDataInner {
    fn find_ticket(&self, reference: &str) -> Option<usize> {
        self.tickets
            .iter()
            .position(|t| t.code == reference || t.id.to_string() == reference)
    }
}

impl GanarDataManager {
    pub(crate) fn new() -> Self {
        GanarDataManager {
            inner: Default::default(),
        }
    }

    pub(crate) async fn insert_pending_ticket(
        &self,
        ticket: NewTicket,
    ) -> Result<Ticket, StorageError> {
        let mut inner = self.inner.write().await;
        if inner
            .tickets
            .iter()
            .any(|t| t.number == ticket.number && t.status.is_non_terminal())
        {
            return Err(StorageError::DuplicateNumber {
                number: ticket.number,
            });
        }
        if inner.tickets.iter().any(|t| t.code == ticket.code) {
            return Err(StorageError::DuplicateCode { code: ticket.code });
        }
        let pending = ticket.into_pending();
        inner.tickets.push(pending.clone());
        Ok(pending)
    }

    pub(crate) async fn get_ticket(&self, reference: &str) -> Option<Ticket> {
        let inner = self.inner.read().await;
        inner.find_ticket(reference).map(|idx| inner.tickets[idx].clone())
    }

    pub(crate) async fn get_active_ticket_by_number(&self, number: &str) -> Option<Ticket> {
        self.inner
            .read()
            .await
            .tickets
            .iter()
            .find(|t| t.number == number && t.status == TicketStatus::Active)
            .cloned()
    }

    pub(crate) async fn is_number_taken(&self, number: &str) -> bool {
        self.inner
            .read()
            .await
            .tickets
            .iter()
            .any(|t| t.number == number && t.status.is_non_terminal())
    }

    pub(crate) async fn activate_ticket(
        &self,
        reference: &str,
        activated_at: OffsetDateTime,
    ) -> ActivationOutcome {
        let mut inner = self.inner.write().await;
        let Some(idx) = inner.find_ticket(reference) else {
            return ActivationOutcome::NotFound;
        };
        let ticket = &mut inner.tickets[idx];
        match ticket.status {
            TicketStatus::Pending => {
                ticket.status = TicketStatus::Active;
                ticket.activated_at = Some(activated_at);
                ActivationOutcome::Activated(ticket.clone())
            }
            TicketStatus::Active => ActivationOutcome::AlreadyActive(ticket.clone()),
            _ => ActivationOutcome::Unactivatable(ticket.clone()),
        }
    }

    pub(crate) async fn expire_ticket(&self, reference: &str) -> bool {
        let mut inner = self.inner.write().await;
        let Some(idx) = inner.find_ticket(reference) else {
            return false;
        };
        let ticket = &mut inner.tickets[idx];
        if ticket.status == TicketStatus::Pending {
            ticket.status = TicketStatus::Expired;
            true
        } else {
            false
        }
    }

    pub(crate) async fn pending_tickets_older_than(&self, cutoff: OffsetDateTime) -> Vec<Ticket> {
        let mut stale: Vec<Ticket> = self
            .inner
            .read()
            .await
            .tickets
            .iter()
            .filter(|t| t.status == TicketStatus::Pending && t.created_at < cutoff)
            .cloned()
            .collect();
        stale.sort_by_key(|t| t.created_at);
        stale
    }

    pub(crate) async fn tickets_of_owner(&self, owner_phone: &str) -> Vec<Ticket> {
        let mut owned: Vec<Ticket> = self
            .inner
            .read()
            .await
            .tickets
            .iter()
            .filter(|t| t.owner_phone == owner_phone)
            .cloned()
            .collect();
        owned.sort_by_key(|t| std::cmp::Reverse(t.created_at));
        owned
    }

    pub(crate) async fn update_owner_profile(
        &self,
        reference: &str,
        owner_name: &str,
        owner_document_id: Option<&str>,
    ) -> bool {
        let mut inner = self.inner.write().await;
        let Some(idx) = inner.find_ticket(reference) else {
            return false;
        };
        let ticket = &mut inner.tickets[idx];
        ticket.owner_name = owner_name.to_string();
        ticket.owner_document_id = owner_document_id.map(str::to_string);
        true
    }

    pub(crate) async fn top_buyers(&self, limit: u32) -> Vec<TopBuyer> {
        let inner = self.inner.read().await;
        let mut counts: HashMap<&str, (String, i64)> = HashMap::new();
        for ticket in &inner.tickets {
            if ticket.status != TicketStatus::Active {
                continue;
            }
            let Some(document_id) = ticket.owner_document_id.as_deref() else {
                continue;
            };
            counts
                .entry(document_id)
                .or_insert_with(|| (ticket.owner_name.clone(), 0))
                .1 += 1;
        }
        let mut buyers: Vec<TopBuyer> = counts
            .into_iter()
            .map(|(document_id, (name, ticket_count))| TopBuyer {
                document_id: document_id.to_string(),
                name,
                ticket_count,
            })
            .collect();
        buyers.sort_by_key(|b| std::cmp::Reverse(b.ticket_count));
        buyers.truncate(limit as usize);
        buyers
    }

    pub(crate) async fn wallet_balance(&self, owner_phone: &str) -> i64 {
        self.inner
            .read()
            .await
            .wallets
            .get(owner_phone)
            .copied()
            .unwrap_or_default()
    }

    pub(crate) async fn credit_wallet(&self, owner_phone: &str, amount: i64) -> i64 {
        let mut inner = self.inner.write().await;
        let balance = inner.wallets.entry(owner_phone.to_string()).or_default();
        *balance += amount;
        *balance
    }

    pub(crate) async fn try_debit_wallet(&self, owner_phone: &str, amount: i64) -> Option<i64> {
        let mut inner = self.inner.write().await;
        let balance = inner.wallets.entry(owner_phone.to_string()).or_default();
        if *balance < amount {
            return None;
        }
        *balance -= amount;
        Some(*balance)
    }

    pub(crate) async fn credit_prize_pool(&self, amount: i64) -> i64 {
        let mut inner = self.inner.write().await;
        inner.prize_pool += amount;
        inner.prize_pool
    }

    pub(crate) async fn prize_pool(&self) -> i64 {
        self.inner.read().await.prize_pool
    }

    pub(crate) async fn insert_draw_result(&self, result: DrawResult) {
        self.inner.write().await.draws.push(result);
    }

    pub(crate) async fn draw_history(&self) -> Vec<DrawResult> {
        let mut draws = self.inner.read().await.draws.clone();
        draws.sort_by_key(|d| std::cmp::Reverse(d.drawn_at));
        draws
    }

    pub(crate) async fn upsert_access_code(
        &self,
        phone: &str,
        code: &str,
        issued_at: OffsetDateTime,
    ) {
        self.inner.write().await.access_codes.insert(
            phone.to_string(),
            AccessCredential {
                phone: phone.to_string(),
                code: code.to_string(),
                issued_at,
            },
        );
    }

    pub(crate) async fn get_access_code(&self, phone: &str) -> Option<AccessCredential> {
        self.inner.read().await.access_codes.get(phone).cloned()
    }
}
