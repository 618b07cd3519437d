//! Stellar - theme hub core
//!
//! This crate holds the logic behind a shell-prompt theme sharing hub that is
//! worth keeping out of request handlers: a fixed-window rate limiter that
//! guards download counters, and the rules for validating, resolving and
//! bumping theme versions. Persistence, auth and blob storage are reached
//! through narrow seams in [`theme`].

pub mod config;
pub mod error;
pub mod ratelimit;
pub mod theme;
pub mod version;
