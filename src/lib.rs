//! Tracklinker - tracking codes, campaign short links and referral attribution
//!
//! Every referrer owns one primary tracking code plus any number of campaign
//! short links, all drawn from a single case-insensitive code namespace.
//! Visits through those codes leave a signed attribution cookie; lead
//! submissions are attributed from that cookie or from prior knowledge of the
//! lead's contact details.
//!
//! # Architecture
//! - `storage`: SeaORM persistence of codes, links, slugs, profiles and leads
//! - `services`: tracking codes, short links, vanity slugs and lead intake
//! - `attribution`: cookie payload, signing and source resolution
//! - `analytics`: buffered visit counting
//! - `api`: HTTP handlers, identity verification and middleware
//! - `config`: TOML + environment configuration
//! - `runtime`: startup, shutdown and execution modes
//! - `system`: logging

pub mod analytics;
pub mod api;
pub mod attribution;
#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod errors;
pub mod runtime;
pub mod services;
pub mod storage;
pub mod system;
pub mod utils;
