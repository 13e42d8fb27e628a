//! HandleWebhookHandler - Command handler for provider payment notifications.
//!
//! Nothing in the payload is trusted until the gateway has authenticated it.
//! The handler returns only after the guarded transition has been written,
//! so an acknowledged delivery is never half applied.

use std::sync::Arc;

use crate::application::ConfirmationProcessor;
use crate::domain::foundation::TransactionId;
use crate::domain::payment::{BillingError, PaymentProvider, WebhookError};
use crate::ports::{GatewayEventKind, GatewayRegistry};

/// Command to process one webhook delivery.
#[derive(Debug, Clone)]
pub struct HandleWebhookCommand {
    pub provider: PaymentProvider,
    /// Raw body, exactly as received.
    pub payload: Vec<u8>,
    /// Signature header, if the request carried one.
    pub signature: Option<String>,
}

/// Result of webhook processing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandleWebhookResult {
    /// Payment succeeded; `applied` is false for redeliveries.
    Confirmed {
        transaction_id: TransactionId,
        applied: bool,
    },
    /// Payment failed; `applied` is false for redeliveries.
    Failed {
        transaction_id: TransactionId,
        applied: bool,
    },
}

pub struct HandleWebhookHandler {
    gateways: GatewayRegistry,
    processor: Arc<ConfirmationProcessor>,
}

impl HandleWebhookHandler {
    pub fn new(gateways: GatewayRegistry, processor: Arc<ConfirmationProcessor>) -> Self {
        Self {
            gateways,
            processor,
        }
    }

    pub async fn handle(&self, cmd: HandleWebhookCommand) -> Result<HandleWebhookResult, WebhookError> {
        let gateway = self
            .gateways
            .get(cmd.provider)
            .map_err(|_| WebhookError::ProviderNotConfigured(cmd.provider.as_str()))?;

        // 1. Authenticate before reading anything
        let event = gateway
            .verify_webhook(&cmd.payload, cmd.signature.as_deref())
            .await
            .map_err(|e| {
                if e.is_security_event() {
                    tracing::warn!(
                        provider = %cmd.provider,
                        error = %e,
                        "Webhook rejected"
                    );
                }
                e
            })?;

        // 2. Only payment outcomes carry work
        let succeeded = match event.kind {
            GatewayEventKind::PaymentSucceeded => true,
            GatewayEventKind::PaymentFailed => false,
            GatewayEventKind::Other => {
                tracing::debug!(provider = %cmd.provider, event_type = %event.event_type, "Webhook ignored");
                return Err(WebhookError::Ignored(event.event_type));
            }
        };

        let Some(lookup) = event.lookup else {
            tracing::warn!(
                provider = %cmd.provider,
                event_type = %event.event_type,
                "Payment webhook without an engine reference"
            );
            return Err(WebhookError::Ignored(event.event_type));
        };

        // 3. Settle through the shared confirmation path
        let evidence = Some(event.raw);
        let result = if succeeded {
            self.processor.confirm(&lookup, evidence).await
        } else {
            self.processor.fail(&lookup, evidence).await
        };

        let confirmation = result.map_err(|e| match e {
            BillingError::NotFound { .. } => {
                tracing::warn!(
                    provider = %cmd.provider,
                    lookup = %lookup,
                    "Webhook for unknown transaction"
                );
                WebhookError::UnknownReference(lookup.to_string())
            }
            other => WebhookError::Processing(other.to_string()),
        })?;

        let transaction_id = confirmation.transaction.id;
        tracing::info!(
            provider = %cmd.provider,
            transaction_id = %transaction_id,
            event_type = %event.event_type,
            applied = confirmation.applied,
            "Webhook processed"
        );

        Ok(if succeeded {
            HandleWebhookResult::Confirmed {
                transaction_id,
                applied: confirmation.applied,
            }
        } else {
            HandleWebhookResult::Failed {
                transaction_id,
                applied: confirmation.applied,
            }
        })
    }
}
