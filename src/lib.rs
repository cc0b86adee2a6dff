// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
#![no_std]

//! tcg-measure: a no_std trusted-measurement service for early boot code.
//!
//! Hashes buffers, extends platform configuration registers on a hardware
//! trust root, keeps the append-only measurement log whose replay reproduces
//! those registers, and forwards raw commands to the device.

extern crate alloc;

#[cfg(test)]
#[macro_use]
extern crate std;

pub mod config;
pub mod error;
pub mod types;
pub mod digest;
pub mod command;
pub mod channel;
pub mod log;
pub mod extend;
pub mod capability;
pub mod service;
pub mod sim;

pub use error::{TcgError, TcgResult};
pub use service::TcgService;

#[cfg(test)]
pub mod tests;
