//! Collaborators consumed by the thermoguard monitor.
//!
//! `port` defines the thermostat and notifier interfaces plus scripted mocks;
//! `nest` and `sms` are the HTTP implementations used in production.

pub mod nest;
pub mod port;
mod retry;
pub mod sms;
