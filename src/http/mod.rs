pub mod auth;
pub mod intake;
