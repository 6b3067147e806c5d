// Copyright 2025 - Nym Technologies SA <contact@nymtech.net>
// SPDX-License-Identifier: GPL-3.0-only

use serde::{Deserialize, Serialize};
use std::time::Duration;
use time::Weekday;

// defaults carried over from the production settings of the original deployment
const DEFAULT_TICKET_PRICE: i64 = 5_000;
const DEFAULT_BOOST_MULTIPLIER: f64 = 2.0;
const DEFAULT_POOL_CONTRIBUTION_RATE: f64 = 0.10;

const DEFAULT_JACKPOT_AMOUNT: i64 = 50_000_000;
const DEFAULT_ACCUMULATED_POOL_SEED: i64 = 1_250_000;
const DEFAULT_DAILY_PRIZE_AMOUNT: i64 = 200_000;
const DEFAULT_TOP_BUYER_PRIZE: i64 = 50_000;

const DEFAULT_RESERVATION_TTL: Duration = Duration::from_secs(60 * 60);
const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(5 * 60);
const DEFAULT_MAX_RANDOM_ATTEMPTS: u32 = 50;

const DEFAULT_ACCESS_CODE_TTL: Duration = Duration::from_secs(10 * 60);

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub pricing: Pricing,
    pub prizes: Prizes,
    pub reservation: Reservation,
    pub draw: Draw,
    pub gateways: Gateways,
    pub access: Access,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct Pricing {
    /// Base price of a single ticket.
    pub ticket_price: i64,

    /// Price multiplier applied to boosted tickets at reservation time.
    pub boost_multiplier: f64,

    /// Share of every settled ticket price fed into the accumulated pool.
    pub pool_contribution_rate: f64,
}

impl Default for Pricing {
    fn default() -> Self {
        Pricing {
            ticket_price: DEFAULT_TICKET_PRICE,
            boost_multiplier: DEFAULT_BOOST_MULTIPLIER,
            pool_contribution_rate: DEFAULT_POOL_CONTRIBUTION_RATE,
        }
    }
}

impl Pricing {
    /// Price due for a new reservation. This is evaluated exactly once, when
    /// the ticket is created; the stored price is authoritative afterwards.
    pub fn price_for(&self, is_boosted: bool) -> i64 {
        if is_boosted {
            (self.ticket_price as f64 * self.boost_multiplier).round() as i64
        } else {
            self.ticket_price
        }
    }

    pub fn pool_contribution(&self, price: i64) -> i64 {
        (price as f64 * self.pool_contribution_rate).round() as i64
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct Prizes {
    /// Weekly grand prize paid on the jackpot weekday.
    pub jackpot_amount: i64,

    /// Starting value of the boosted secondary pool, on top of accumulated
    /// contributions.
    pub accumulated_pool_seed: i64,

    /// Fixed prize for a standard daily win.
    pub daily_prize_amount: i64,

    /// Leaderboard prize for the buyer with the most active tickets.
    pub top_buyer_prize: i64,
}

impl Default for Prizes {
    fn default() -> Self {
        Prizes {
            jackpot_amount: DEFAULT_JACKPOT_AMOUNT,
            accumulated_pool_seed: DEFAULT_ACCUMULATED_POOL_SEED,
            daily_prize_amount: DEFAULT_DAILY_PRIZE_AMOUNT,
            top_buyer_prize: DEFAULT_TOP_BUYER_PRIZE,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct Reservation {
    /// How long a pending reservation holds its number before the sweeper
    /// may reclaim it.
    #[serde(with = "humantime_serde")]
    pub ttl: Duration,

    #[serde(with = "humantime_serde")]
    pub sweep_interval: Duration,

    /// Upper bound on random-number allocation retries before reporting the
    /// number space as exhausted.
    pub max_random_attempts: u32,
}

impl Default for Reservation {
    fn default() -> Self {
        Reservation {
            ttl: DEFAULT_RESERVATION_TTL,
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
            max_random_attempts: DEFAULT_MAX_RANDOM_ATTEMPTS,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct Draw {
    /// Weekday whose purchases are eligible for the jackpot pool.
    #[serde(with = "weekday_serde")]
    pub jackpot_weekday: Weekday,
}

impl Default for Draw {
    fn default() -> Self {
        Draw {
            jackpot_weekday: Weekday::Saturday,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct Gateways {
    /// External payment gateways whose confirmations are accepted.
    pub enabled: Vec<String>,
}

impl Default for Gateways {
    fn default() -> Self {
        Gateways {
            enabled: vec!["mercadopago".to_string(), "wompi".to_string()],
        }
    }
}

impl Gateways {
    pub fn is_enabled(&self, gateway: &str) -> bool {
        self.enabled.iter().any(|g| g == gateway)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct Access {
    /// Validity window of a one-time access code.
    #[serde(with = "humantime_serde")]
    pub code_ttl: Duration,
}

impl Default for Access {
    fn default() -> Self {
        Access {
            code_ttl: DEFAULT_ACCESS_CODE_TTL,
        }
    }
}

mod weekday_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use time::Weekday;

    pub(super) fn serialize<S: Serializer>(
        weekday: &Weekday,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&weekday.to_string())
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Weekday, D::Error> {
        let raw = String::deserialize(deserializer)?;
        match raw.to_ascii_lowercase().as_str() {
            "monday" => Ok(Weekday::Monday),
            "tuesday" => Ok(Weekday::Tuesday),
            "wednesday" => Ok(Weekday::Wednesday),
            "thursday" => Ok(Weekday::Thursday),
            "friday" => Ok(Weekday::Friday),
            "saturday" => Ok(Weekday::Saturday),
            "sunday" => Ok(Weekday::Sunday),
            other => Err(serde::de::Error::custom(format!(
                "'{other}' is not a valid weekday"
            ))),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn boosted_price_applies_the_multiplier_once() {
        let pricing = Pricing::default();
        assert_eq!(pricing.price_for(false), 5_000);
        assert_eq!(pricing.price_for(true), 10_000);
    }

    #[test]
    fn pool_contribution_is_a_tenth_by_default() {
        let pricing = Pricing::default();
        assert_eq!(pricing.pool_contribution(5_000), 500);
        assert_eq!(pricing.pool_contribution(10_000), 1_000);
    }

    #[test]
    fn config_round_trips_through_serde() {
        let config = Config::default();
        let raw = serde_json::to_string(&config).unwrap();
        let parsed: Config = serde_json::from_str(&raw).unwrap();
        assert_eq!(parsed.pricing.ticket_price, config.pricing.ticket_price);
        assert_eq!(parsed.draw.jackpot_weekday, Weekday::Saturday);
        assert_eq!(parsed.reservation.ttl, config.reservation.ttl);
    }

    #[test]
    fn manual_source_is_not_part_of_the_gateway_set() {
        let gateways = Gateways::default();
        assert!(gateways.is_enabled("mercadopago"));
        assert!(gateways.is_enabled("wompi"));
        assert!(!gateways.is_enabled("manual"));
        assert!(!gateways.is_enabled("paypal"));
    }
}
