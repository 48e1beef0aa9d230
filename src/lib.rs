// Fabric CLI - Library root for testing

pub mod api;
pub mod auth;
pub mod commands;
pub mod config;
pub mod error;
pub mod http_client;
pub mod models;

#[cfg(test)]
mod test_support;
