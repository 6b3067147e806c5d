// Copyright 2025 - Nym Technologies SA <contact@nymtech.net>
// SPDX-License-Identifier: GPL-3.0-only

use tracing::{debug, info, warn};

use ganar_storage::{GanarStorage, Ticket};

use crate::config::Gateways;
use crate::error::GanarError;
use crate::registry::{Activation, TicketRegistry};

/// Source tag for confirmations entered by an operator rather than received
/// from a payment gateway. Always accepted.
pub const MANUAL_SOURCE: &str = "manual";

/// Result of reconciling one inbound confirmation signal.
#[derive(Debug, Clone)]
pub enum ConfirmOutcome {
    /// This confirmation activated the ticket.
    Activated(Ticket),
    /// The ticket had been activated before (duplicate redirect, webhook
    /// retry, or a second gateway confirming the same purchase). Not an
    /// error; no side effects were repeated.
    AlreadyActivated(Ticket),
    /// Nothing matches the reference.
    NotFound,
    /// The reservation expired before the confirmation arrived. The ticket
    /// cannot be resurrected (its number may have been re-issued); the
    /// payment needs manual reconciliation.
    Expired,
}

/// Translates gateway-agnostic confirmation signals into exactly one
/// activation per ticket.
///
/// Confirmations may arrive zero, one or many times, from any of several
/// gateways, in any order, via any entry point (return-URL parameters,
/// server-to-server callback, operator override). Idempotent activation is
/// the only dedup mechanism needed: repeats simply observe the already
/// active ticket.
pub struct PaymentReconciler<S> {
    registry: TicketRegistry<S>,
    gateways: Gateways,
}

impl<S> Clone for PaymentReconciler<S> {
    fn clone(&self) -> Self {
        PaymentReconciler {
            registry: self.registry.clone(),
            gateways: self.gateways.clone(),
        }
    }
}

impl<S: GanarStorage> PaymentReconciler<S> {
    pub fn new(registry: TicketRegistry<S>, gateways: Gateways) -> Self {
        PaymentReconciler { registry, gateways }
    }

    /// Applies a payment confirmation for `external_ref` (the ticket code,
    /// or the internal id for gateways that echo it back instead).
    pub async fn confirm(
        &self,
        external_ref: &str,
        source: &str,
    ) -> Result<ConfirmOutcome, GanarError> {
        if source != MANUAL_SOURCE && !self.gateways.is_enabled(source) {
            warn!("dropping confirmation for {external_ref} from disabled gateway {source}");
            return Err(GanarError::GatewayDisabled {
                gateway: source.to_string(),
            });
        }

        match self.registry.activate(external_ref).await {
            Ok(Activation::Fresh(ticket)) => {
                info!(
                    "confirmation from {source} activated ticket {} (number {})",
                    ticket.code, ticket.number
                );
                Ok(ConfirmOutcome::Activated(ticket))
            }
            Ok(Activation::Repeated(ticket)) => {
                debug!(
                    "duplicate confirmation from {source} for already active ticket {}",
                    ticket.code
                );
                Ok(ConfirmOutcome::AlreadyActivated(ticket))
            }
            Err(GanarError::TicketNotFound { reference }) => {
                warn!("confirmation from {source} references unknown ticket '{reference}'");
                Ok(ConfirmOutcome::NotFound)
            }
            Err(GanarError::AlreadyExpired { reference }) => {
                warn!(
                    "confirmation from {source} arrived after ticket '{reference}' expired; needs manual reconciliation"
                );
                Ok(ConfirmOutcome::Expired)
            }
            Err(err) => Err(err),
        }
    }

    /// Operator override for payments that could not be matched
    /// automatically.
    pub async fn approve_manually(&self, ticket_ref: &str) -> Result<ConfirmOutcome, GanarError> {
        self.confirm(ticket_ref, MANUAL_SOURCE).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::config::{Pricing, Reservation};
    use crate::registry::OwnerProfile;
    use ganar_storage::{ephemeral_storage::EphemeralStorage, TicketStatus};
    use std::sync::Arc;

    fn setup() -> (
        Arc<EphemeralStorage>,
        TicketRegistry<EphemeralStorage>,
        PaymentReconciler<EphemeralStorage>,
    ) {
        let storage = Arc::new(EphemeralStorage::new());
        let registry = TicketRegistry::new(
            Arc::clone(&storage),
            Pricing::default(),
            Reservation::default().max_random_attempts,
        );
        let reconciler = PaymentReconciler::new(registry.clone(), Gateways::default());
        (storage, registry, reconciler)
    }

    fn owner() -> OwnerProfile {
        OwnerProfile {
            full_name: "Maria Lopez".to_string(),
            phone: "573001111111".to_string(),
            document_id: None,
        }
    }

    #[tokio::test]
    async fn double_redirect_confirms_exactly_once() {
        let (storage, registry, reconciler) = setup();
        let ticket = registry.reserve("4821", owner(), 5000, false).await.unwrap();

        let first = reconciler.confirm(&ticket.code, "mercadopago").await.unwrap();
        assert!(matches!(first, ConfirmOutcome::Activated(_)));
        assert_eq!(storage.prize_pool().await.unwrap(), 500);

        // the user hit back/refresh and the success URL was replayed
        let second = reconciler.confirm(&ticket.code, "mercadopago").await.unwrap();
        assert!(matches!(second, ConfirmOutcome::AlreadyActivated(_)));
        assert_eq!(storage.prize_pool().await.unwrap(), 500);
    }

    #[tokio::test]
    async fn second_gateway_confirming_the_same_purchase_is_harmless() {
        let (_, registry, reconciler) = setup();
        let ticket = registry.reserve("4821", owner(), 5000, false).await.unwrap();

        // wompi is given the internal id as its reference
        let first = reconciler
            .confirm(&ticket.id.to_string(), "wompi")
            .await
            .unwrap();
        assert!(matches!(first, ConfirmOutcome::Activated(_)));

        let second = reconciler.confirm(&ticket.code, "mercadopago").await.unwrap();
        assert!(matches!(second, ConfirmOutcome::AlreadyActivated(_)));
    }

    #[tokio::test]
    async fn unknown_references_are_reported_not_activated() {
        let (_, _, reconciler) = setup();
        let outcome = reconciler
            .confirm("GA-20250101-ZZZZ", "mercadopago")
            .await
            .unwrap();
        assert!(matches!(outcome, ConfirmOutcome::NotFound));
    }

    #[tokio::test]
    async fn late_confirmation_of_an_expired_reservation_is_flagged() {
        let (_, registry, reconciler) = setup();
        let ticket = registry.reserve("4821", owner(), 5000, false).await.unwrap();
        registry.expire(&ticket.code).await.unwrap();

        let outcome = reconciler.confirm(&ticket.code, "mercadopago").await.unwrap();
        assert!(matches!(outcome, ConfirmOutcome::Expired));
        assert_eq!(
            registry.get(&ticket.code).await.unwrap().status,
            TicketStatus::Expired
        );
    }

    #[tokio::test]
    async fn disabled_gateways_are_rejected() {
        let (_, registry, _) = setup();
        let reconciler = PaymentReconciler::new(
            registry.clone(),
            Gateways {
                enabled: vec!["mercadopago".to_string()],
            },
        );
        let ticket = registry.reserve("4821", owner(), 5000, false).await.unwrap();

        let res = reconciler.confirm(&ticket.code, "wompi").await;
        assert!(matches!(res, Err(GanarError::GatewayDisabled { .. })));
        assert_eq!(
            registry.get(&ticket.code).await.unwrap().status,
            TicketStatus::Pending
        );

        // the operator path bypasses the gateway allow-list
        let manual = reconciler.approve_manually(&ticket.code).await.unwrap();
        assert!(matches!(manual, ConfirmOutcome::Activated(_)));
    }
}
