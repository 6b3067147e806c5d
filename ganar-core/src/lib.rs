// Copyright 2025 - Nym Technologies SA <contact@nymtech.net>
// SPDX-License-Identifier: GPL-3.0-only

//! Ticket allocation and payment reconciliation core: allocates unique
//! 4-digit numbers with a reservation TTL, keeps per-phone wallet balances
//! with atomic debit/credit and rollback, reconciles asynchronous (and
//! possibly duplicated) gateway confirmations into exactly one activation
//! each, and resolves draws against the active tickets.
//!
//! Everything user-facing (rendering, QR codes, message delivery, gateway
//! request signing) lives outside this crate; the operations here are plain
//! function contracts over a [`GanarStorage`] backend.

use std::sync::Arc;

use ganar_storage::GanarStorage;

pub mod access;
pub mod config;
pub mod draw;
pub mod error;
pub mod helpers;
pub mod ledger;
pub mod reconciler;
pub mod registry;
pub mod schedule;
pub mod sweeper;

pub use access::AccessCodes;
pub use config::Config;
pub use draw::{DrawEngine, PrizeTier};
pub use error::GanarError;
pub use ledger::{PaymentOutcome, WalletLedger};
pub use reconciler::{ConfirmOutcome, PaymentReconciler, MANUAL_SOURCE};
pub use registry::{Activation, OwnerProfile, TicketRegistry};
pub use sweeper::ReservationSweeper;

// dependents interact with these in every signature, so re-export them
pub use ganar_storage::{
    AccessCredential, DrawResult, StorageError, Ticket, TicketStatus, TopBuyer, WinnerSnapshot,
};

/// All core components wired over a shared storage backend.
pub struct GanarCore<S> {
    config: Config,
    storage: Arc<S>,
    pub registry: TicketRegistry<S>,
    pub ledger: WalletLedger<S>,
    pub reconciler: PaymentReconciler<S>,
    pub draw_engine: DrawEngine<S>,
    pub access_codes: AccessCodes<S>,
}

impl<S: GanarStorage> GanarCore<S> {
    pub fn new(storage: S, config: Config) -> Self {
        let storage = Arc::new(storage);
        let registry = TicketRegistry::new(
            Arc::clone(&storage),
            config.pricing.clone(),
            config.reservation.max_random_attempts,
        );
        let ledger = WalletLedger::new(Arc::clone(&storage), registry.clone());
        let reconciler = PaymentReconciler::new(registry.clone(), config.gateways.clone());
        let draw_engine = DrawEngine::new(
            Arc::clone(&storage),
            config.prizes.clone(),
            config.draw.clone(),
        );
        let access_codes = AccessCodes::new(Arc::clone(&storage), &config.access);

        GanarCore {
            config,
            storage,
            registry,
            ledger,
            reconciler,
            draw_engine,
            access_codes,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Fresh sweeper instance for the background reclamation loop; spawn its
    /// `run` on the runtime and cancel it on shutdown.
    pub fn reservation_sweeper(&self) -> ReservationSweeper<S> {
        ReservationSweeper::new(
            Arc::clone(&self.storage),
            self.registry.clone(),
            &self.config.reservation,
        )
    }
}
