pub mod api;
pub mod commands;
pub mod config;
pub mod error;
pub mod http;
pub mod plan;
pub mod provider;
pub mod runtime;
pub mod secrets;
pub mod server;
