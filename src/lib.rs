pub mod constants;
pub mod engine;
pub mod error;
pub mod persistence;
pub mod rules;
pub mod server_protocol;
pub mod server_utils;
pub mod store;
pub mod types;
