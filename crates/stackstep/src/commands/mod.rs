pub mod check_auth;
pub mod create;
pub mod describe;
pub mod validate;
