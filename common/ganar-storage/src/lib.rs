/*
 * Copyright 2025 - Nym Technologies SA <contact@nymtech.net>
 * SPDX-License-Identifier: Apache-2.0
 */

use std::path::Path;

use crate::ephemeral_storage::EphemeralStorage;
use crate::persistent_storage::PersistentStorage;

mod backends;
pub mod ephemeral_storage;
pub mod error;
pub mod models;
pub mod persistent_storage;
pub mod traits;

pub use error::StorageError;
pub use models::{
    AccessCredential, ActivationOutcome, DrawResult, NewTicket, Ticket, TicketStatus, TopBuyer,
    WinnerSnapshot,
};
pub use traits::GanarStorage;

pub async fn initialise_persistent_storage<P: AsRef<Path> + Send>(
    path: P,
) -> Result<PersistentStorage, StorageError> {
    PersistentStorage::init(path).await
}

pub fn initialise_ephemeral_storage() -> EphemeralStorage {
    EphemeralStorage::new()
}
