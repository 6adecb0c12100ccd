//! Thermostat monitoring service.
//!
//! A polling loop reads the thermostat, lowers the setpoint when the
//! differential drops below the threshold, rate-limits SMS notifications and
//! alerts once the error threshold is crossed. State is published through a
//! `watch` channel for the HTTP surface.

pub mod config;
pub mod decision;
pub mod history;
pub mod messages;
pub mod runtime;
pub mod server;
pub mod state;
pub mod store;
pub mod telemetry;
pub mod types;
