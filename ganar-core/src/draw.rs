// Copyright 2025 - Nym Technologies SA <contact@nymtech.net>
// SPDX-License-Identifier: GPL-3.0-only

use std::sync::Arc;
use time::OffsetDateTime;
use tracing::info;
use uuid::Uuid;

use ganar_storage::{DrawResult, GanarStorage, WinnerSnapshot};

use crate::config::{Draw, Prizes};
use crate::error::GanarError;
use crate::helpers::is_valid_ticket_number;
use crate::schedule::official_lottery;

/// Prize pool a winning ticket settles against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrizeTier {
    /// Standard fixed daily prize.
    Daily,
    /// Weekly grand prize; tickets reserved on the jackpot weekday.
    Jackpot,
    /// Secondary accumulated pool; boosted tickets reserved on the jackpot
    /// weekday.
    Boosted,
}

impl PrizeTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            PrizeTier::Daily => "daily",
            PrizeTier::Jackpot => "jackpot",
            PrizeTier::Boosted => "boosted",
        }
    }
}

/// Resolves draws against the registry's active tickets and keeps the
/// immutable payout history.
pub struct DrawEngine<S> {
    storage: Arc<S>,
    prizes: Prizes,
    draw: Draw,
}

impl<S> Clone for DrawEngine<S> {
    fn clone(&self) -> Self {
        DrawEngine {
            storage: Arc::clone(&self.storage),
            prizes: self.prizes.clone(),
            draw: self.draw.clone(),
        }
    }
}

impl<S: GanarStorage> DrawEngine<S> {
    pub fn new(storage: Arc<S>, prizes: Prizes, draw: Draw) -> Self {
        DrawEngine {
            storage,
            prizes,
            draw,
        }
    }

    fn classify(&self, created_at: OffsetDateTime, is_boosted: bool) -> PrizeTier {
        if created_at.weekday() != self.draw.jackpot_weekday {
            return PrizeTier::Daily;
        }
        if is_boosted {
            PrizeTier::Boosted
        } else {
            PrizeTier::Jackpot
        }
    }

    async fn prize_amount(&self, tier: PrizeTier) -> Result<i64, GanarError> {
        Ok(match tier {
            PrizeTier::Daily => self.prizes.daily_prize_amount,
            PrizeTier::Jackpot => self.prizes.jackpot_amount,
            // seed plus every contribution settled so far
            PrizeTier::Boosted => {
                self.prizes.accumulated_pool_seed + self.storage.prize_pool().await?
            }
        })
    }

    /// Resolves a draw for `winning_number` over a snapshot of the currently
    /// active tickets and persists the immutable result.
    ///
    /// Callers must invoke this at most once per intended draw: results are
    /// not deduplicated by date, a repeat call appends a second record.
    pub async fn record_draw(&self, winning_number: &str) -> Result<DrawResult, GanarError> {
        if !is_valid_ticket_number(winning_number) {
            return Err(GanarError::InvalidNumber {
                input: winning_number.to_string(),
            });
        }

        let drawn_at = OffsetDateTime::now_utc();
        let winner = self
            .storage
            .get_active_ticket_by_number(winning_number)
            .await?;

        let (tier, snapshot) = match &winner {
            Some(ticket) => (
                self.classify(ticket.created_at, ticket.is_boosted),
                // a copy, never a live reference: later ticket edits must not
                // rewrite a paid-out history
                Some(WinnerSnapshot {
                    name: ticket.owner_name.clone(),
                    phone: ticket.owner_phone.clone(),
                    ticket_number: ticket.number.clone(),
                }),
            ),
            None => (PrizeTier::Daily, None),
        };
        let prize_amount = self.prize_amount(tier).await?;

        let result = DrawResult {
            id: Uuid::new_v4(),
            drawn_at,
            winning_number: winning_number.to_string(),
            prize_tier: tier.as_str().to_string(),
            prize_amount,
            lottery_name: official_lottery(drawn_at.weekday()).to_string(),
            winner: snapshot,
        };
        self.storage.insert_draw_result(result.clone()).await?;

        match &result.winner {
            Some(winner) => info!(
                "draw {}: {} wins {} ({} tier)",
                winning_number,
                winner.phone,
                prize_amount,
                tier.as_str()
            ),
            None => info!("draw {winning_number}: no active ticket matched"),
        }
        Ok(result)
    }

    /// Past draws, newest first.
    pub async fn history(&self) -> Result<Vec<DrawResult>, GanarError> {
        Ok(self.storage.draw_history().await?)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::config::{Pricing, Reservation};
    use crate::registry::{OwnerProfile, TicketRegistry};
    use ganar_storage::{ephemeral_storage::EphemeralStorage, NewTicket};
    use time::Weekday;

    fn setup() -> (
        Arc<EphemeralStorage>,
        TicketRegistry<EphemeralStorage>,
        DrawEngine<EphemeralStorage>,
    ) {
        let storage = Arc::new(EphemeralStorage::new());
        let registry = TicketRegistry::new(
            Arc::clone(&storage),
            Pricing::default(),
            Reservation::default().max_random_attempts,
        );
        let engine = DrawEngine::new(Arc::clone(&storage), Prizes::default(), Draw::default());
        (storage, registry, engine)
    }

    fn owner() -> OwnerProfile {
        OwnerProfile {
            full_name: "Maria Lopez".to_string(),
            phone: "573001111111".to_string(),
            document_id: Some("10203040".to_string()),
        }
    }

    /// Plants an already-active ticket reserved on the given weekday.
    async fn plant_active_ticket(
        storage: &EphemeralStorage,
        number: &str,
        weekday: Weekday,
        is_boosted: bool,
    ) {
        let mut created_at = OffsetDateTime::now_utc();
        while created_at.weekday() != weekday {
            created_at -= time::Duration::days(1);
        }
        storage
            .insert_pending_ticket(NewTicket {
                id: Uuid::new_v4(),
                code: format!("GA-20250612-{number}"),
                number: number.to_string(),
                owner_phone: "573001111111".to_string(),
                owner_name: "Maria Lopez".to_string(),
                owner_document_id: None,
                price: 5000,
                is_boosted,
                created_at,
            })
            .await
            .unwrap();
        storage
            .activate_ticket(&format!("GA-20250612-{number}"), OffsetDateTime::now_utc())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn jackpot_day_purchases_win_the_jackpot_pool() {
        let (storage, _, engine) = setup();
        plant_active_ticket(&storage, "4821", Weekday::Saturday, false).await;

        let result = engine.record_draw("4821").await.unwrap();
        assert_eq!(result.prize_tier, "jackpot");
        assert_eq!(result.prize_amount, 50_000_000);
        assert_eq!(result.winner.unwrap().ticket_number, "4821");
    }

    #[tokio::test]
    async fn other_weekdays_win_the_daily_pool() {
        let (storage, _, engine) = setup();
        plant_active_ticket(&storage, "4821", Weekday::Tuesday, false).await;

        let result = engine.record_draw("4821").await.unwrap();
        assert_eq!(result.prize_tier, "daily");
        assert_eq!(result.prize_amount, 200_000);
    }

    #[tokio::test]
    async fn boosted_tickets_claim_the_accumulated_pool_on_the_gated_day() {
        let (storage, _, engine) = setup();
        plant_active_ticket(&storage, "4821", Weekday::Saturday, true).await;
        storage.credit_prize_pool(40_000).await.unwrap();

        let result = engine.record_draw("4821").await.unwrap();
        assert_eq!(result.prize_tier, "boosted");
        // seed plus settled contributions
        assert_eq!(result.prize_amount, 1_250_000 + 40_000);
    }

    #[tokio::test]
    async fn boost_is_gated_to_the_jackpot_weekday() {
        let (storage, _, engine) = setup();
        plant_active_ticket(&storage, "4821", Weekday::Monday, true).await;

        let result = engine.record_draw("4821").await.unwrap();
        assert_eq!(result.prize_tier, "daily");
        assert_eq!(result.prize_amount, 200_000);
    }

    #[tokio::test]
    async fn pending_tickets_never_win() {
        let (_, registry, engine) = setup();
        registry.reserve("4821", owner(), 5000, false).await.unwrap();

        let result = engine.record_draw("4821").await.unwrap();
        assert!(result.winner.is_none());
        assert_eq!(result.prize_tier, "daily");

        let history = engine.history().await.unwrap();
        assert_eq!(history.len(), 1);
    }

    #[tokio::test]
    async fn winner_snapshot_survives_later_profile_edits() {
        let (_, registry, engine) = setup();
        let ticket = registry.reserve("4821", owner(), 5000, false).await.unwrap();
        registry.activate(&ticket.code).await.unwrap();

        let result = engine.record_draw("4821").await.unwrap();
        assert_eq!(result.winner.as_ref().unwrap().name, "Maria Lopez");

        registry
            .update_owner_profile(&ticket.code, "Somebody Else", None)
            .await
            .unwrap();

        let history = engine.history().await.unwrap();
        assert_eq!(history[0].winner.as_ref().unwrap().name, "Maria Lopez");
    }

    #[tokio::test]
    async fn malformed_winning_numbers_are_rejected() {
        let (_, _, engine) = setup();
        assert!(matches!(
            engine.record_draw("482").await,
            Err(GanarError::InvalidNumber { .. })
        ));
    }

    #[tokio::test]
    async fn draw_labels_carry_the_weekdays_official_lottery() {
        let (_, _, engine) = setup();
        let result = engine.record_draw("0000").await.unwrap();
        let expected = official_lottery(result.drawn_at.weekday());
        assert_eq!(result.lottery_name, expected);
    }
}
