//! Formo Sync: wallet- and network-aware analytics client lifecycle.
//!
//! An [`lifecycle::AnalyticsController`] keeps one analytics client
//! instance consistent with the current write key, network selection and
//! wallet snapshot, and records what happened in a bounded
//! [`event_log::EventLog`].

pub mod analytics;
pub mod bootstrap;
pub mod channels;
pub mod cli;
pub mod config;
pub mod error;
pub mod event_log;
pub mod health;
pub mod lifecycle;
pub mod network;
pub mod settings;
pub mod wallet;
