//! Viewesta Payments - Wallet, Payment & Entitlement Engine
//!
//! This crate keeps wallet balances, payment transactions, movie purchases
//! and subscriptions consistent across card/mobile-money gateways, webhooks
//! and concurrent requests.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
