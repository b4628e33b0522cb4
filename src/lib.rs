//! nightshift - nightly build-and-release pipeline
//!
//! Provisions a Rust toolchain, builds and tests the game, strips the
//! binary, force-moves the `nightly` tag and publishes the result to the
//! nightly release. One process is one pipeline instance for one platform.

pub mod audit;
pub mod cache;
pub mod cli;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod platform;
pub mod process;
pub mod release;
pub mod steps;
pub mod trigger;
pub mod ui;

pub use error::{NightshiftError, NightshiftResult};
