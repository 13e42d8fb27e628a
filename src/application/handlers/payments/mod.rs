//! Payment handlers.
//!
//! ## Commands
//! - Purchasing a movie at a quality (free grant, wallet or provider)
//! - Verifying a provider payment by id or reference
//!
//! ## Queries
//! - Listing the caller's purchases

mod list_purchases;
mod purchase_movie;
mod verify_payment;

// Commands
pub use purchase_movie::{PurchaseMovieCommand, PurchaseMovieHandler, PurchaseMovieResult};
pub use verify_payment::{VerifyPaymentCommand, VerifyPaymentHandler, VerifyPaymentResult};

// Queries
pub use list_purchases::{ListPurchasesHandler, ListPurchasesQuery, OwnedPurchase};
