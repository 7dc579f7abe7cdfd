//! Command handlers

pub mod auth;
pub mod config;
pub mod status;
pub mod todo;
pub mod watch;
