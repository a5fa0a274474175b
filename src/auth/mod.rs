//! Authentication and authorization module

pub mod authenticator;
pub mod token;
pub mod user;

// Re-export main components
pub use authenticator::{Authenticator, JwtAuthenticator, SharedAuthenticator};
pub use token::{Claims, TokenManager, TokenPair, TokenType};
pub use user::{AuthenticatedUser, Role};
