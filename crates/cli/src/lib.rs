// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Host-side tooling for the measurement service: drives it against the
//! simulated trust root, stores event logs as image files and replays them.

pub mod commands;
pub mod image;
pub mod session;
pub mod telemetry;
