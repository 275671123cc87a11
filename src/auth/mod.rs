//! Users, passwords and JWT bearer authentication.

mod log_in;
mod me;
mod middleware;
mod password;
mod register;
mod token;
mod user;

pub use log_in::log_in;
pub use me::{delete_profile, get_profile, update_currency_endpoint};
pub use middleware::{AuthUser, auth_guard};
pub use password::{PasswordHash, ValidatedPassword};
pub use register::register;
pub use token::{DEFAULT_TOKEN_DURATION, JwtKeys, create_token, decode_token};
pub use user::{
    User, UserID, create_user_table, create_user_with_account, delete_user,
    get_user_by_email, get_user_by_id, update_currency, update_password,
};

#[cfg(test)]
pub use user::create_user;
