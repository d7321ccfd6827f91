pub mod check;
pub mod check_json;
pub mod config;
