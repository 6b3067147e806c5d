// Copyright 2025 - Nym Technologies SA <contact@nymtech.net>
// SPDX-License-Identifier: GPL-3.0-only

use ganar_storage::StorageError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GanarError {
    #[error("number {number} is already in the process of being purchased or sold")]
    Conflict { number: String },

    #[error("could not find a free number after {attempts} attempts")]
    NumberSpaceExhausted { attempts: u32 },

    #[error("insufficient wallet balance: available {available}, required {required}")]
    InsufficientFunds { available: i64, required: i64 },

    #[error("no ticket matches reference '{reference}'")]
    TicketNotFound { reference: String },

    #[error("ticket '{reference}' has already expired; its number may have been re-issued to another buyer")]
    AlreadyExpired { reference: String },

    #[error("ticket activation failed after the wallet was debited; the debit has been rolled back")]
    ActivationFailed,

    #[error("'{input}' is not a valid 4-digit ticket number")]
    InvalidNumber { input: String },

    #[error("payment gateway '{gateway}' is not enabled")]
    GatewayDisabled { gateway: String },

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl GanarError {
    /// Conflicts are the only locally-retryable failure: the caller may try
    /// again with a different number.
    pub fn is_retryable(&self) -> bool {
        matches!(self, GanarError::Conflict { .. })
    }
}
