// Copyright 2025 - Nym Technologies SA <contact@nymtech.net>
// SPDX-License-Identifier: GPL-3.0-only

use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn};

use ganar_storage::{GanarStorage, Ticket, TicketStatus};

use crate::error::GanarError;
use crate::helpers::normalize_phone;
use crate::registry::{Activation, TicketRegistry};

/// Outcome of a wallet payment attempt.
#[derive(Debug, Clone)]
pub enum PaymentOutcome {
    /// The wallet was debited and the ticket activated.
    Paid { ticket: Ticket, new_balance: i64 },
    /// The ticket had already been paid for; the wallet was left untouched.
    AlreadyPaid(Ticket),
}

/// Per-phone-number wallet balance store with atomic adjust operations.
///
/// Balances can never go negative: every debit is conditional on
/// sufficiency at the storage layer, and the compound pay-and-activate flow
/// additionally serializes per identity so two simultaneous purchases by
/// the same user cannot both pass a balance check that was true for only
/// one of them.
pub struct WalletLedger<S> {
    storage: Arc<S>,
    registry: TicketRegistry<S>,
    account_locks: Arc<DashMap<String, Arc<Mutex<()>>>>,
}

impl<S> Clone for WalletLedger<S> {
    fn clone(&self) -> Self {
        WalletLedger {
            storage: Arc::clone(&self.storage),
            registry: self.registry.clone(),
            account_locks: Arc::clone(&self.account_locks),
        }
    }
}

impl<S: GanarStorage> WalletLedger<S> {
    pub fn new(storage: Arc<S>, registry: TicketRegistry<S>) -> Self {
        WalletLedger {
            storage,
            registry,
            account_locks: Arc::new(DashMap::new()),
        }
    }

    fn account_lock(&self, owner_phone: &str) -> Arc<Mutex<()>> {
        self.account_locks
            .entry(owner_phone.to_string())
            .or_default()
            .clone()
    }

    /// Current balance; an identity without a wallet record reads as 0.
    pub async fn balance(&self, owner_phone: &str) -> Result<i64, GanarError> {
        Ok(self
            .storage
            .wallet_balance(&normalize_phone(owner_phone))
            .await?)
    }

    /// Unconditional credit (admin top-ups, pool-funded bonuses). Returns
    /// the new balance.
    pub async fn credit(&self, owner_phone: &str, amount: i64) -> Result<i64, GanarError> {
        let owner_phone = normalize_phone(owner_phone);
        let new_balance = self.storage.credit_wallet(&owner_phone, amount).await?;
        info!("credited {amount} to {owner_phone}, new balance {new_balance}");
        Ok(new_balance)
    }

    /// Pays for a pending ticket out of the wallet: checks sufficiency,
    /// debits, activates, and re-credits the exact amount if the activation
    /// cannot be completed. A ticket that is already active is reported as
    /// [`PaymentOutcome::AlreadyPaid`] without touching the balance.
    pub async fn pay_from_balance(
        &self,
        owner_phone: &str,
        ticket_ref: &str,
        amount: i64,
    ) -> Result<PaymentOutcome, GanarError> {
        let owner_phone = normalize_phone(owner_phone);
        let lock = self.account_lock(&owner_phone);
        let _guard = lock.lock().await;

        // never charge for a ticket that no longer needs paying
        let ticket = self.registry.get(ticket_ref).await?;
        match ticket.status {
            TicketStatus::Pending => {}
            TicketStatus::Active | TicketStatus::Redeemed => {
                return Ok(PaymentOutcome::AlreadyPaid(ticket))
            }
            TicketStatus::Expired => {
                return Err(GanarError::AlreadyExpired {
                    reference: ticket_ref.to_string(),
                })
            }
        }

        let Some(new_balance) = self.storage.try_debit_wallet(&owner_phone, amount).await? else {
            let available = self.storage.wallet_balance(&owner_phone).await?;
            return Err(GanarError::InsufficientFunds {
                available,
                required: amount,
            });
        };

        match self.registry.activate(ticket_ref).await {
            Ok(Activation::Fresh(ticket)) => {
                info!(
                    "wallet payment settled for ticket {} ({owner_phone}), remaining balance {new_balance}",
                    ticket.code
                );
                Ok(PaymentOutcome::Paid {
                    ticket,
                    new_balance,
                })
            }
            Ok(Activation::Repeated(ticket)) => {
                // a gateway confirmation landed between our status check and
                // the activation attempt; give the money back
                self.storage.credit_wallet(&owner_phone, amount).await?;
                Ok(PaymentOutcome::AlreadyPaid(ticket))
            }
            Err(err) => {
                // compensate the debit before surfacing anything
                self.storage.credit_wallet(&owner_phone, amount).await?;
                warn!("activation of {ticket_ref} failed after debit, rolled back {amount}: {err}");
                match err {
                    GanarError::TicketNotFound { .. } | GanarError::AlreadyExpired { .. } => {
                        Err(err)
                    }
                    _ => Err(GanarError::ActivationFailed),
                }
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::config::{Pricing, Reservation};
    use crate::registry::OwnerProfile;
    use futures::future::join_all;
    use ganar_storage::ephemeral_storage::EphemeralStorage;

    const PHONE: &str = "573001111111";

    fn setup() -> (Arc<EphemeralStorage>, TicketRegistry<EphemeralStorage>, WalletLedger<EphemeralStorage>) {
        let storage = Arc::new(EphemeralStorage::new());
        let registry = TicketRegistry::new(
            Arc::clone(&storage),
            Pricing::default(),
            Reservation::default().max_random_attempts,
        );
        let ledger = WalletLedger::new(Arc::clone(&storage), registry.clone());
        (storage, registry, ledger)
    }

    fn owner() -> OwnerProfile {
        OwnerProfile {
            full_name: "Maria Lopez".to_string(),
            phone: PHONE.to_string(),
            document_id: None,
        }
    }

    #[tokio::test]
    async fn unknown_wallet_reads_as_zero() {
        let (_, _, ledger) = setup();
        assert_eq!(ledger.balance(PHONE).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn balances_are_keyed_by_normalized_phone() {
        let (_, _, ledger) = setup();
        ledger.credit("+57 300-111-1111", 3000).await.unwrap();
        assert_eq!(ledger.balance(PHONE).await.unwrap(), 3000);
    }

    #[tokio::test]
    async fn insufficient_funds_leave_everything_untouched() {
        let (_, registry, ledger) = setup();
        let ticket = registry.reserve("4821", owner(), 5000, false).await.unwrap();
        ledger.credit(PHONE, 3000).await.unwrap();

        let res = ledger.pay_from_balance(PHONE, &ticket.code, 5000).await;
        assert!(matches!(
            res,
            Err(GanarError::InsufficientFunds {
                available: 3000,
                required: 5000
            })
        ));
        assert_eq!(ledger.balance(PHONE).await.unwrap(), 3000);
        assert_eq!(
            registry.get(&ticket.code).await.unwrap().status,
            TicketStatus::Pending
        );
    }

    #[tokio::test]
    async fn topped_up_wallet_pays_and_activates() {
        let (_, registry, ledger) = setup();
        let ticket = registry.reserve("4821", owner(), 5000, false).await.unwrap();
        ledger.credit(PHONE, 3000).await.unwrap();
        ledger.credit(PHONE, 2000).await.unwrap();

        let outcome = ledger
            .pay_from_balance(PHONE, &ticket.code, 5000)
            .await
            .unwrap();
        let PaymentOutcome::Paid { ticket, new_balance } = outcome else {
            panic!("expected a fresh payment");
        };
        assert_eq!(new_balance, 0);
        assert_eq!(ticket.status, TicketStatus::Active);
        assert_eq!(ledger.balance(PHONE).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn paying_twice_charges_once() {
        let (_, registry, ledger) = setup();
        let ticket = registry.reserve("4821", owner(), 5000, false).await.unwrap();
        ledger.credit(PHONE, 10_000).await.unwrap();

        let first = ledger
            .pay_from_balance(PHONE, &ticket.code, 5000)
            .await
            .unwrap();
        assert!(matches!(first, PaymentOutcome::Paid { .. }));

        let second = ledger
            .pay_from_balance(PHONE, &ticket.code, 5000)
            .await
            .unwrap();
        assert!(matches!(second, PaymentOutcome::AlreadyPaid(_)));
        assert_eq!(ledger.balance(PHONE).await.unwrap(), 5000);
    }

    #[tokio::test]
    async fn paying_for_an_expired_reservation_fails_without_debit() {
        let (_, registry, ledger) = setup();
        let ticket = registry.reserve("4821", owner(), 5000, false).await.unwrap();
        registry.expire(&ticket.code).await.unwrap();
        ledger.credit(PHONE, 5000).await.unwrap();

        let res = ledger.pay_from_balance(PHONE, &ticket.code, 5000).await;
        assert!(matches!(res, Err(GanarError::AlreadyExpired { .. })));
        assert_eq!(ledger.balance(PHONE).await.unwrap(), 5000);
    }

    #[tokio::test]
    async fn paying_for_a_missing_ticket_fails_without_debit() {
        let (_, _, ledger) = setup();
        ledger.credit(PHONE, 5000).await.unwrap();

        let res = ledger.pay_from_balance(PHONE, "GA-20250101-XXXX", 5000).await;
        assert!(matches!(res, Err(GanarError::TicketNotFound { .. })));
        assert_eq!(ledger.balance(PHONE).await.unwrap(), 5000);
    }

    #[tokio::test]
    async fn concurrent_purchases_cannot_overdraw_a_wallet() {
        let (_, registry, ledger) = setup();
        // funds for exactly one of the two tickets
        ledger.credit(PHONE, 5000).await.unwrap();
        let first = registry.reserve("1111", owner(), 5000, false).await.unwrap();
        let second = registry.reserve("2222", owner(), 5000, false).await.unwrap();

        let results = join_all([&first, &second].map(|ticket| {
            let ledger = ledger.clone();
            let code = ticket.code.clone();
            async move { ledger.pay_from_balance(PHONE, &code, 5000).await }
        }))
        .await;

        let paid = results.iter().filter(|r| r.is_ok()).count();
        let refused = results
            .iter()
            .filter(|r| matches!(r, Err(GanarError::InsufficientFunds { .. })))
            .count();
        assert_eq!((paid, refused), (1, 1));
        assert_eq!(ledger.balance(PHONE).await.unwrap(), 0);
    }
}
