//! SimLedger - a simplified, hash-linked ledger
//!
//! # Architecture
//!
//! The crate is organized into logical modules:
//!
//! ## Core Ledger
//! - [`blockchain`] - Blocks, the chain, mining and integrity verification
//! - [`transaction`] - Opaque transaction payloads and validation
//! - [`mempool`] - Pending transaction pool
//!
//! ## Cryptography & Access
//! - [`crypto`] - SHA-256 block hashing and caller addresses
//! - [`access`] - Access guards deciding which callers may mutate the ledger
//!
//! ## State Management
//! - [`persistence`] - Append-only block storage (SQLite or in-memory)
//! - [`sync`] - Change events and snapshot re-fetch for observers
//!
//! ## Integration
//! - [`node`] - Node orchestrator
//! - `api` - REST API (feature `api`)
//!
//! ## Configuration & Utilities
//! - [`config`] - Configuration management
//! - [`error`] - Error types
//! - [`cli`] - CLI utilities

#![forbid(unsafe_code)]

// ============================================================================
// Core Ledger
// ============================================================================
pub mod blockchain;
pub mod mempool;
pub mod transaction;

// ============================================================================
// Cryptography & Access
// ============================================================================
pub mod access;
pub mod crypto;

// ============================================================================
// State Management
// ============================================================================
pub mod persistence;
pub mod sync;

// ============================================================================
// Integration
// ============================================================================
#[cfg(feature = "api")]
pub mod api;
pub mod node;

// ============================================================================
// Configuration & Utilities
// ============================================================================
pub mod cli;
pub mod config;
pub mod error;
