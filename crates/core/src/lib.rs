//! Saltbox Core - Shared types library.
//!
//! This crate provides common types used across all Saltbox components:
//! - `storefront` - Catalog gateway and cart synchronization core
//! - `integration-tests` - Cross-component test harness
//!
//! # Architecture
//!
//! The core crate contains only types and helpers - no I/O, no database
//! access, no HTTP clients. This keeps it lightweight and allows it to be
//! used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs and money formatting

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
