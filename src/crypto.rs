mod session;
mod signing_key;
mod token;

pub use session::SessionClaims;
pub use signing_key::SigningKey;
pub use token::{Token, TokenBuilder, TokenError, TokenResult};
