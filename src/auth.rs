mod admin_guard;
mod credentials;
mod session;

pub use admin_guard::AdminGuard;
pub use credentials::{compute_password_hash, validate_credentials, LoginForm};
pub use session::{session_from_request, Administrator, SESSION_COOKIE};
