// Copyright 2025 - Nym Technologies SA <contact@nymtech.net>
// SPDX-License-Identifier: GPL-3.0-only

use time::Weekday;

/// Official lottery drawn on each weekday, used to label draw records.
/// Where several lotteries play the same evening the headline one is kept.
pub fn official_lottery(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Monday => "Lotería de Cundinamarca",
        Weekday::Tuesday => "Lotería de la Cruz Roja",
        Weekday::Wednesday => "Lotería de Manizales",
        Weekday::Thursday => "Lotería de Bogotá",
        Weekday::Friday => "Lotería de Medellín",
        Weekday::Saturday => "Lotería de Boyacá",
        Weekday::Sunday => "Sorteo Extraordinario",
    }
}
