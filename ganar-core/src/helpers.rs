// Copyright 2025 - Nym Technologies SA <contact@nymtech.net>
// SPDX-License-Identifier: GPL-3.0-only

use rand::{thread_rng, Rng};
use time::OffsetDateTime;

const TICKET_CODE_CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Strips everything that is not an ASCII digit. Wallets, tickets and access
/// codes are all keyed by the normalized form so that `+57 300-111-1111` and
/// `573001111111` resolve to the same identity.
pub fn normalize_phone(raw: &str) -> String {
    raw.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// True iff the input is exactly four ASCII digits.
pub fn is_valid_ticket_number(number: &str) -> bool {
    number.len() == 4 && number.chars().all(|c| c.is_ascii_digit())
}

/// Shareable external reference, e.g. `GA-20250612-A1B2`: reservation date
/// plus a short random suffix. Not guaranteed unique by construction; the
/// storage layer enforces uniqueness and the caller retries on a clash.
pub(crate) fn ticket_code(now: OffsetDateTime) -> String {
    let mut rng = thread_rng();
    let suffix: String = (0..4)
        .map(|_| TICKET_CODE_CHARSET[rng.gen_range(0..TICKET_CODE_CHARSET.len())] as char)
        .collect();
    format!(
        "GA-{:04}{:02}{:02}-{suffix}",
        now.year(),
        u8::from(now.month()),
        now.day()
    )
}

pub(crate) fn random_ticket_number() -> String {
    format!("{:04}", thread_rng().gen_range(0..10_000))
}

/// Six-digit one-time access code.
pub(crate) fn random_access_code() -> String {
    thread_rng().gen_range(100_000..1_000_000).to_string()
}
