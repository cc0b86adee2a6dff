// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! A measurement service bound to a simulated trust root.
//!
//! Restoring from an image replays every measured entry into a fresh device,
//! the way firmware re-measures on each boot, so registers and log agree
//! before new events are added.

use anyhow::Context;
use clap::Args;
use std::path::Path;
use tcg_measure::command::{self, parse_response};
use tcg_measure::config::{ServiceConfig, DEFAULT_LOG_BASE, DEFAULT_LOG_CAPACITY, PCR_COUNT};
use tcg_measure::log::EventLog;
use tcg_measure::sim::SimulatedTpm;
use tcg_measure::types::algorithm::{AlgorithmBitmap, AlgorithmId};
use tcg_measure::TcgService;

use crate::image::LogImage;

/// Service profile overrides shared by every subcommand.
#[derive(Args, Debug, Clone)]
pub struct ProfileArgs {
    /// Number of platform configuration registers
    #[arg(long, global = true, default_value_t = PCR_COUNT)]
    pub pcr_count: u32,

    /// Size of the event log region in bytes
    #[arg(long, global = true, default_value_t = DEFAULT_LOG_CAPACITY)]
    pub log_capacity: usize,

    /// Advertised hash algorithms (sha1, sha256, sha384)
    #[arg(long = "alg", global = true, value_delimiter = ',', default_value = "sha1")]
    pub algorithms: Vec<String>,
}

impl Default for ProfileArgs {
    fn default() -> Self {
        Self {
            pcr_count: PCR_COUNT,
            log_capacity: DEFAULT_LOG_CAPACITY,
            algorithms: vec!["sha1".to_string()],
        }
    }
}

impl ProfileArgs {
    pub fn to_config(&self) -> anyhow::Result<ServiceConfig> {
        let mut bitmap = AlgorithmBitmap::empty();
        for name in &self.algorithms {
            bitmap |= AlgorithmBitmap::from(parse_algorithm(name)?);
        }
        // Image headers store the body length as u32.
        anyhow::ensure!(
            u32::try_from(self.log_capacity).is_ok(),
            "Log capacity {} exceeds the {} byte image limit",
            self.log_capacity,
            u32::MAX
        );
        let config = ServiceConfig::default()
            .with_pcr_count(self.pcr_count)
            .with_algorithms(bitmap)
            .with_log_region(DEFAULT_LOG_BASE, self.log_capacity);
        config.validate().context("Invalid service profile")?;
        Ok(config)
    }
}

pub fn parse_algorithm(name: &str) -> anyhow::Result<AlgorithmId> {
    AlgorithmId::from_name(&name.to_ascii_lowercase())
        .ok_or_else(|| anyhow::anyhow!("Unknown hash algorithm '{}'", name))
}

pub struct Session {
    pub service: TcgService<SimulatedTpm>,
    pub device: SimulatedTpm,
}

impl Session {
    pub fn new(config: ServiceConfig) -> anyhow::Result<Self> {
        let device = SimulatedTpm::new();
        let service = TcgService::new(config, device.clone())?;
        Ok(Self { service, device })
    }

    /// Opens the image at `path`, or starts an empty log if it does not exist.
    pub fn open(config: ServiceConfig, path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            tracing::info!(path = %path.display(), "Starting a new event log");
            return Self::new(config);
        }
        let image = LogImage::read_from(path)
            .with_context(|| format!("Failed to read log image {}", path.display()))?;
        Self::restore(config, &image)
    }

    pub fn restore(config: ServiceConfig, image: &LogImage) -> anyhow::Result<Self> {
        let capacity = config.log_capacity;
        let config = config.with_log_region(image.base, capacity);
        config.validate()?;
        let log = image.to_log(capacity)?;

        let mut device = SimulatedTpm::new();
        let replayed = remeasure(&mut device, &log)?;
        tracing::info!(entries = log.len(), replayed, "Restored event log");

        let service = TcgService::with_log(config, device.clone(), log);
        Ok(Self { service, device })
    }

    pub fn image(&self) -> LogImage {
        self.service.with_event_log(LogImage::from_log)
    }

    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        self.image()
            .write_to(path)
            .with_context(|| format!("Failed to write log image {}", path.display()))
    }
}

/// Extends `device` with every measured entry of `log`. Returns the number
/// of extends issued.
fn remeasure(device: &mut SimulatedTpm, log: &EventLog) -> anyhow::Result<usize> {
    use tcg_measure::channel::TpmTransport;

    let mut replayed = 0;
    for (position, record) in log.entries() {
        if record.is_informational() {
            continue;
        }
        let frame = command::extend_command(record.pcr_index, &record.digest);
        let response = device.submit(&frame)?;
        parse_response(&response, record.digest.len()).map_err(|fault| {
            anyhow::anyhow!(
                "Entry {} could not be re-measured into {}: {}",
                position.event_number.0,
                record.pcr_index,
                fault
            )
        })?;
        replayed += 1;
    }
    Ok(replayed)
}
