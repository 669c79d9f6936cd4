//! Saltbox Storefront library.
//!
//! This crate provides the storefront's cart-consistency core as a library,
//! allowing it to be tested and embedded by any delivery surface.
//!
//! # Architecture
//!
//! - [`catalog`] - Gateway to the remote product catalog (source of truth)
//! - [`cart`] - Session cart store, reconciler, and checkout orchestrator
//! - [`config`] - Environment-driven configuration
//! - [`state`] - Shared application state wiring

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod catalog;
pub mod config;
pub mod error;
pub mod state;
