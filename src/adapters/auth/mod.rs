//! Authentication adapters implementing the `Authenticator` port.
//!
//! - `jwt` - HS256 bearer tokens from the platform identity service
//! - `mock` - Fixed token map for tests

mod jwt;
mod mock;

pub use jwt::{Claims, JwtAuthenticator, JwtConfig};
pub use mock::MockAuthenticator;
