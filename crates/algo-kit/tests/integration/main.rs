//! Integration tests for algo-kit.
//!
//! Everything here runs offline: wire vectors are checked byte for byte and
//! the composer talks to an in-memory node.
//!
//! Run with: `cargo test --test integration`

mod abi_integration;
mod common;
mod composer_integration;
mod wire_vectors;
