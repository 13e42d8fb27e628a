//! CheckoutService - the two funding rails shared by purchase, subscribe and top-up.
//!
//! Wallet rail: conditional debit, a transaction born `completed`, then the
//! side effect applied synchronously.
//!
//! External rail: a `pending` transaction keyed by a generated reference,
//! then `PaymentGateway::initialize`. Completion arrives later through the
//! webhook or verify path.

use std::sync::Arc;

use rust_decimal::Decimal;
use serde_json::json;

use crate::domain::foundation::{Amount, AuthenticatedUser, Currency, Timestamp};
use crate::domain::payment::{BillingError, PaymentMethod, PaymentProvider};
use crate::domain::transaction::{generate_reference, Transaction, TransactionIntent, TransactionLookup};
use crate::ports::{
    Customer, DebitOutcome, GatewayRegistry, InitializeRequest, PaymentInstrument,
    TransactionLog, WalletLedger,
};

use super::confirmation::{ConfirmationProcessor, SettlementEffect};

/// One payment to collect.
#[derive(Debug, Clone)]
pub struct CheckoutRequest {
    pub user: AuthenticatedUser,
    pub intent: TransactionIntent,
    pub amount: Decimal,
    pub currency: Currency,
    pub description: String,
    pub method: PaymentMethod,
    /// Ignored on the wallet rail.
    pub provider: Option<PaymentProvider>,
    /// Where the provider sends the payer back to.
    pub redirect_url: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CheckoutOutcome {
    /// Paid from the wallet; the entitlement already exists.
    Settled {
        transaction: Transaction,
        effect: SettlementEffect,
    },
    /// Provider payment started; the transaction is pending.
    AwaitingPayment {
        transaction: Transaction,
        instrument: PaymentInstrument,
    },
}

impl CheckoutOutcome {
    pub fn transaction(&self) -> &Transaction {
        match self {
            CheckoutOutcome::Settled { transaction, .. }
            | CheckoutOutcome::AwaitingPayment { transaction, .. } => transaction,
        }
    }
}

pub struct CheckoutService {
    ledger: Arc<dyn WalletLedger>,
    transactions: Arc<dyn TransactionLog>,
    gateways: GatewayRegistry,
    processor: Arc<ConfirmationProcessor>,
}

impl CheckoutService {
    pub fn new(
        ledger: Arc<dyn WalletLedger>,
        transactions: Arc<dyn TransactionLog>,
        gateways: GatewayRegistry,
        processor: Arc<ConfirmationProcessor>,
    ) -> Self {
        Self {
            ledger,
            transactions,
            gateways,
            processor,
        }
    }

    pub async fn checkout(&self, request: CheckoutRequest) -> Result<CheckoutOutcome, BillingError> {
        match request.method {
            PaymentMethod::Wallet => self.pay_from_wallet(request).await,
            PaymentMethod::Card | PaymentMethod::MobileMoney => self.pay_externally(request).await,
        }
    }

    async fn pay_from_wallet(&self, request: CheckoutRequest) -> Result<CheckoutOutcome, BillingError> {
        if request.intent == TransactionIntent::WalletTopup {
            return Err(BillingError::validation(
                "payment_method",
                "A wallet cannot be topped up from itself",
            ));
        }

        let user_id = &request.user.id;
        let amount = Amount::new(request.amount)?;

        match self.ledger.debit(user_id, amount).await? {
            DebitOutcome::Debited(wallet) => {
                tracing::info!(
                    user_id = %user_id,
                    amount = %request.amount,
                    balance = %wallet.balance(),
                    "Wallet debited"
                );
            }
            DebitOutcome::InsufficientFunds { available } => {
                tracing::debug!(
                    user_id = %user_id,
                    available = %available,
                    required = %request.amount,
                    "Wallet debit refused"
                );
                return Err(BillingError::insufficient_funds(available, request.amount));
            }
        }

        let transaction = Transaction::settled_from_wallet(
            user_id.clone(),
            request.intent,
            request.amount,
            request.currency,
            request.description,
            Timestamp::now(),
        );

        if let Err(e) = self.transactions.create(&transaction).await {
            self.refund(&request.user, amount, &e.to_string()).await;
            return Err(e.into());
        }

        let effect = self.processor.apply_settled(&transaction).await?;

        Ok(CheckoutOutcome::Settled {
            transaction,
            effect,
        })
    }

    /// Credits back a debit whose transaction could not be recorded.
    async fn refund(&self, user: &AuthenticatedUser, amount: Amount, cause: &str) {
        match self.ledger.credit(&user.id, amount).await {
            Ok(_) => tracing::warn!(
                user_id = %user.id,
                amount = %amount.value(),
                cause = %cause,
                "Wallet debit reversed after transaction write failed"
            ),
            Err(e) => tracing::error!(
                user_id = %user.id,
                amount = %amount.value(),
                cause = %cause,
                error = %e,
                "Wallet debit could not be reversed; reconciliation required"
            ),
        }
    }

    async fn pay_externally(&self, request: CheckoutRequest) -> Result<CheckoutOutcome, BillingError> {
        Amount::new(request.amount)?;
        let gateway = self.gateways.resolve(request.provider)?;
        let now = Timestamp::now();
        let reference = generate_reference(request.intent.kind(), now);

        let transaction = Transaction::pending_external(
            request.user.id.clone(),
            request.intent,
            request.amount,
            request.currency,
            request.method,
            gateway.provider(),
            reference.clone(),
            request.description.clone(),
            now,
        );
        self.transactions.create(&transaction).await?;

        let init = InitializeRequest {
            reference: reference.clone(),
            amount: request.amount,
            currency: request.currency,
            method: request.method,
            customer: Customer {
                user_id: request.user.id.clone(),
                email: request.user.email.clone(),
                name: request.user.display_name_or_email().to_string(),
            },
            redirect_url: request.redirect_url,
            description: request.description,
            metadata: request.intent.to_metadata(),
        };

        match gateway.initialize(&init).await {
            Ok(instrument) => {
                tracing::info!(
                    user_id = %transaction.user_id,
                    transaction_id = %transaction.id,
                    provider = %transaction.payment_provider,
                    reference = %reference,
                    "External payment initialized"
                );
                Ok(CheckoutOutcome::AwaitingPayment {
                    transaction,
                    instrument,
                })
            }
            Err(e) => {
                tracing::warn!(
                    transaction_id = %transaction.id,
                    provider = %transaction.payment_provider,
                    error = %e,
                    "Payment initialization failed"
                );
                self.processor
                    .fail(
                        &TransactionLookup::Id(transaction.id),
                        Some(json!({ "error": e.message })),
                    )
                    .await?;
                Err(e.into())
            }
        }
    }
}
