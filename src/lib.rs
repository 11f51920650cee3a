//! Transaction polling and reconciliation for Embedded Wallet devices
//!
//! A [`session::WalletSession`] owns the in-memory transaction set for the
//! signed-in device, polls the backend for updates, and fans changes out to
//! registered listeners.

pub mod api;
pub mod commands;
pub mod config;
pub mod models;
pub mod services;
pub mod session;
pub mod utils;

#[cfg(test)]
mod testing;
