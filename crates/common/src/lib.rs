//! Common types shared across the media stats reporter crates.

#![warn(clippy::pedantic)]

/// Module for identifier newtypes (application ids, conference ids)
pub mod types;

/// Module for secret types that prevent accidental logging
pub mod secret;
