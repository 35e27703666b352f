mod permit;
mod token;

pub use permit::{CurrentUser, Permit};
pub use token::{AuthToken, AUTH_TOKEN_COOKIE};
