// Copyright 2025 - Nym Technologies SA <contact@nymtech.net>
// SPDX-License-Identifier: GPL-3.0-only

use std::sync::Arc;
use std::time::Duration;
use time::OffsetDateTime;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use ganar_storage::GanarStorage;

use crate::config::Reservation;
use crate::error::GanarError;
use crate::registry::TicketRegistry;

/// Reclaims numbers whose pending reservation has outlived its TTL.
///
/// Advisory cleanup only: the uniqueness invariant already prevents double
/// sale, the sweeper merely frees abandoned numbers for new buyers. It may
/// freely race with activations because expiry is a conditional no-op on
/// anything that is no longer pending.
pub struct ReservationSweeper<S> {
    storage: Arc<S>,
    registry: TicketRegistry<S>,
    ttl: Duration,
    run_interval: Duration,
}

impl<S: GanarStorage> ReservationSweeper<S> {
    pub fn new(storage: Arc<S>, registry: TicketRegistry<S>, config: &Reservation) -> Self {
        ReservationSweeper {
            storage,
            registry,
            ttl: config.ttl,
            run_interval: config.sweep_interval,
        }
    }

    /// Expires every pending reservation older than the TTL. Returns the
    /// number of tickets this pass actually transitioned.
    pub async fn sweep(&self) -> Result<usize, GanarError> {
        let cutoff = OffsetDateTime::now_utc() - self.ttl;
        let stale = self.storage.pending_tickets_older_than(cutoff).await?;

        let mut reclaimed = 0;
        for ticket in stale {
            // an activation may still win the race for any individual ticket
            if self.registry.expire(&ticket.code).await? {
                debug!(
                    "reservation {} (number {}) outlived its TTL and was expired",
                    ticket.code, ticket.number
                );
                reclaimed += 1;
            }
        }
        Ok(reclaimed)
    }

    pub async fn run(&mut self, cancel_token: CancellationToken) {
        let mut interval = tokio::time::interval(self.run_interval);
        loop {
            tokio::select! {
                biased;
                _ = cancel_token.cancelled() => {
                    trace!("ReservationSweeper: received shutdown");
                    break;
                }
                _ = interval.tick() => {
                    match self.sweep().await {
                        Ok(0) => trace!("nothing to reclaim"),
                        Ok(reclaimed) => debug!("reclaimed {reclaimed} numbers from stale reservations"),
                        Err(err) => warn!("failed to sweep stale reservations: {err}"),
                    }
                }
            }
        }
        debug!("ReservationSweeper: Exiting");
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::config::{Pricing, Reservation};
    use crate::registry::OwnerProfile;
    use ganar_storage::{ephemeral_storage::EphemeralStorage, NewTicket, TicketStatus};
    use uuid::Uuid;

    fn setup(
        config: &Reservation,
    ) -> (
        Arc<EphemeralStorage>,
        TicketRegistry<EphemeralStorage>,
        ReservationSweeper<EphemeralStorage>,
    ) {
        let storage = Arc::new(EphemeralStorage::new());
        let registry = TicketRegistry::new(
            Arc::clone(&storage),
            Pricing::default(),
            config.max_random_attempts,
        );
        let sweeper = ReservationSweeper::new(Arc::clone(&storage), registry.clone(), config);
        (storage, registry, sweeper)
    }

    fn owner() -> OwnerProfile {
        OwnerProfile {
            full_name: "Maria Lopez".to_string(),
            phone: "573001111111".to_string(),
            document_id: None,
        }
    }

    /// Plants a pending ticket whose reservation happened `age` ago.
    async fn plant_aged_ticket(storage: &EphemeralStorage, number: &str, age: Duration) {
        storage
            .insert_pending_ticket(NewTicket {
                id: Uuid::new_v4(),
                code: format!("GA-20250612-{number}"),
                number: number.to_string(),
                owner_phone: "573001111111".to_string(),
                owner_name: "Maria Lopez".to_string(),
                owner_document_id: None,
                price: 5000,
                is_boosted: false,
                created_at: OffsetDateTime::now_utc() - age,
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn only_overaged_pending_reservations_are_reclaimed() {
        let config = Reservation::default();
        let (storage, registry, sweeper) = setup(&config);

        // 61 minutes old: one sweep past the default one-hour TTL
        plant_aged_ticket(&storage, "4821", Duration::from_secs(61 * 60)).await;
        plant_aged_ticket(&storage, "1111", Duration::from_secs(10 * 60)).await;

        assert_eq!(sweeper.sweep().await.unwrap(), 1);
        assert_eq!(
            registry.get("GA-20250612-4821").await.unwrap().status,
            TicketStatus::Expired
        );
        assert_eq!(
            registry.get("GA-20250612-1111").await.unwrap().status,
            TicketStatus::Pending
        );

        // the reclaimed number is available to a new buyer immediately
        registry.reserve("4821", owner(), 5000, false).await.unwrap();
    }

    #[tokio::test]
    async fn activation_beats_the_sweeper() {
        let config = Reservation::default();
        let (storage, registry, sweeper) = setup(&config);
        plant_aged_ticket(&storage, "4821", Duration::from_secs(61 * 60)).await;

        // payment confirmation lands first
        registry.activate("GA-20250612-4821").await.unwrap();

        assert_eq!(sweeper.sweep().await.unwrap(), 0);
        assert_eq!(
            registry.get("GA-20250612-4821").await.unwrap().status,
            TicketStatus::Active
        );
    }

    #[tokio::test]
    async fn sweeps_are_idempotent() {
        let config = Reservation::default();
        let (storage, _registry, sweeper) = setup(&config);
        plant_aged_ticket(&storage, "4821", Duration::from_secs(61 * 60)).await;

        assert_eq!(sweeper.sweep().await.unwrap(), 1);
        assert_eq!(sweeper.sweep().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn run_loop_sweeps_until_cancelled() {
        let config = Reservation {
            sweep_interval: Duration::from_millis(10),
            ..Default::default()
        };
        let (storage, registry, mut sweeper) = setup(&config);
        plant_aged_ticket(&storage, "4821", Duration::from_secs(61 * 60)).await;

        let cancel_token = CancellationToken::new();
        let handle = tokio::spawn({
            let cancel_token = cancel_token.clone();
            async move { sweeper.run(cancel_token).await }
        });

        // the first tick fires immediately
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(
            registry.get("GA-20250612-4821").await.unwrap().status,
            TicketStatus::Expired
        );

        cancel_token.cancel();
        handle.await.unwrap();
    }
}
