// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Measurement event log: records, the append-only arena, and replay.

pub mod record;
pub mod event_log;
pub mod replay;

pub use event_log::{EventLog, LogPosition, LogRegion};
pub use record::MeasurementRecord;
