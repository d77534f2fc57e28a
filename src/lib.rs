//! Core library for the Ola workshop scheduler.
//!
//! The interesting logic lives in [`scheduling`]: turning weekly recurring
//! slots plus calendar exceptions into concrete dates, accounting seats per
//! date, and running the enrollment/makeup lifecycles that move credits
//! between them. Everything else is service plumbing shared with the binary.

pub mod config;
pub mod error;
pub mod scheduling;
pub mod telemetry;
