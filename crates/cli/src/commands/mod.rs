// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
pub mod hash;
pub mod inspect;
pub mod measure;
pub mod replay;
pub mod status;

use anyhow::Context;
use std::path::{Path, PathBuf};
use tcg_measure::log::EventLog;

use crate::image::LogImage;

/// Caller-supplied bytes: a file, or text given on the command line.
#[derive(Debug, Clone)]
pub enum Input {
    File(PathBuf),
    Text(String),
}

impl Input {
    pub fn from_args(file: Option<PathBuf>, text: Option<String>) -> anyhow::Result<Self> {
        match (file, text) {
            (Some(file), None) => Ok(Input::File(file)),
            (None, Some(text)) => Ok(Input::Text(text)),
            (None, None) => anyhow::bail!("Nothing to measure: pass a file or --text"),
            (Some(_), Some(_)) => anyhow::bail!("Pass either a file or --text, not both"),
        }
    }

    pub fn read(&self) -> anyhow::Result<Vec<u8>> {
        match self {
            Input::File(path) => {
                std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))
            }
            Input::Text(text) => Ok(text.as_bytes().to_vec()),
        }
    }
}

/// Loads an image and rebuilds its log, sized to fit exactly.
pub fn read_log(path: &Path) -> anyhow::Result<(LogImage, EventLog)> {
    let image = LogImage::read_from(path)
        .with_context(|| format!("Failed to read log image {}", path.display()))?;
    let log = image.to_log(image.body.len().max(1))?;
    Ok((image, log))
}

pub(crate) fn short_hex(bytes: &[u8]) -> String {
    let full = hex::encode(bytes);
    if full.len() > 16 {
        format!("{}…", &full[..16])
    } else {
        full
    }
}
