//! Diet Coach: personal-details wizard and recipe gateway.

pub mod api;
pub mod cli;
pub mod config;
pub mod error;
pub mod preferences;
pub mod profile;
pub mod recipes;
pub mod server;
pub mod store;
pub mod wizard;
