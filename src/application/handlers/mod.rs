//! Application handlers.
//!
//! Command and query handlers grouped by bounded context. Each handler owns
//! its ports as `Arc<dyn ..>` and exposes a single `handle` method.

pub mod payments;
pub mod subscriptions;
pub mod wallet;
pub mod webhooks;

pub use payments::{
    ListPurchasesHandler, ListPurchasesQuery, OwnedPurchase, PurchaseMovieCommand,
    PurchaseMovieHandler, PurchaseMovieResult, VerifyPaymentCommand, VerifyPaymentHandler,
    VerifyPaymentResult,
};
pub use subscriptions::{
    CancelSubscriptionCommand, CancelSubscriptionHandler, GetMySubscriptionHandler,
    GetMySubscriptionQuery, MySubscription, SetAutoRenewCommand, SetAutoRenewHandler,
    SubscribeCommand, SubscribeHandler,
};
pub use wallet::{
    GetWalletHandler, GetWalletQuery, SetCurrencyCommand, SetCurrencyHandler, TopUpWalletCommand,
    TopUpWalletHandler, TransactionHistoryHandler, TransactionHistoryQuery,
};
pub use webhooks::{HandleWebhookCommand, HandleWebhookHandler, HandleWebhookResult};
