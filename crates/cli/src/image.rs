// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Event-log image files.
//!
//! # File Format
//! ```text
//! [magic "TCGL": 4][version: u32][base: u64][count: u32][body_len: u32][crc64: u64][body...]
//! ```
//! All integers little-endian. `body` is the committed prefix of the log
//! region, byte for byte. The checksum covers base, count, body_len and body.

use crc64fast::Digest;
use memmap2::Mmap;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;
use tcg_measure::log::EventLog;
use tcg_measure::types::id::PhysicalAddress;
use thiserror::Error;

pub const MAGIC: [u8; 4] = *b"TCGL";
pub const VERSION: u32 = 1;

#[derive(Error, Debug)]
pub enum ImageError {
    #[error("Invalid magic bytes in header")]
    InvalidMagic,
    #[error("Unsupported image version {0}")]
    UnsupportedVersion(u32),
    #[error("Checksum mismatch: expected {expected:016x}, found {found:016x}")]
    ChecksumMismatch { expected: u64, found: u64 },
    #[error("Image truncated: header declares {declared} body bytes, file holds {actual}")]
    Truncated { declared: u64, actual: u64 },
    #[error("Log body of {0} bytes does not fit the u32 length field")]
    TooLarge(usize),
    #[error("IO error: {0}")]
    IoError(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, ImageError>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageHeader {
    pub magic: [u8; 4],
    pub version: u32,
    pub base: u64,
    pub count: u32,
    pub body_len: u32,
    pub checksum: u64,
}

impl ImageHeader {
    pub const SIZE: usize = 4 + 4 + 8 + 4 + 4 + 8; // 32 bytes

    pub fn parse(buf: &[u8]) -> Result<Self> {
        if buf.len() < Self::SIZE {
            return Err(ImageError::Truncated {
                declared: Self::SIZE as u64,
                actual: buf.len() as u64,
            });
        }
        let u32_at = |at: usize| u32::from_le_bytes([buf[at], buf[at + 1], buf[at + 2], buf[at + 3]]);
        let u64_at = |at: usize| {
            let mut bytes = [0u8; 8];
            bytes.copy_from_slice(&buf[at..at + 8]);
            u64::from_le_bytes(bytes)
        };

        let mut magic = [0u8; 4];
        magic.copy_from_slice(&buf[0..4]);
        if magic != MAGIC {
            return Err(ImageError::InvalidMagic);
        }
        let version = u32_at(4);
        if version != VERSION {
            return Err(ImageError::UnsupportedVersion(version));
        }

        Ok(Self {
            magic,
            version,
            base: u64_at(8),
            count: u32_at(16),
            body_len: u32_at(20),
            checksum: u64_at(24),
        })
    }

    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut buf = [0u8; Self::SIZE];
        buf[0..4].copy_from_slice(&self.magic);
        buf[4..8].copy_from_slice(&self.version.to_le_bytes());
        buf[8..16].copy_from_slice(&self.base.to_le_bytes());
        buf[16..20].copy_from_slice(&self.count.to_le_bytes());
        buf[20..24].copy_from_slice(&self.body_len.to_le_bytes());
        buf[24..32].copy_from_slice(&self.checksum.to_le_bytes());
        buf
    }
}

fn checksum(base: u64, count: u32, body_len: u32, body: &[u8]) -> u64 {
    let mut digest = Digest::new();
    digest.write(&base.to_le_bytes());
    digest.write(&count.to_le_bytes());
    digest.write(&body_len.to_le_bytes());
    digest.write(body);
    digest.sum64()
}

/// A detached copy of a log's committed bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogImage {
    pub base: PhysicalAddress,
    pub count: u32,
    pub body: Vec<u8>,
}

impl LogImage {
    pub fn from_log(log: &EventLog) -> Self {
        let (base, count) = log.location();
        Self {
            base,
            count,
            body: log.as_bytes().to_vec(),
        }
    }

    pub fn header(&self) -> Result<ImageHeader> {
        let body_len = u32::try_from(self.body.len()).map_err(|_| ImageError::TooLarge(self.body.len()))?;
        Ok(ImageHeader {
            magic: MAGIC,
            version: VERSION,
            base: self.base.0,
            count: self.count,
            body_len,
            checksum: checksum(self.base.0, self.count, body_len, &self.body),
        })
    }

    pub fn write_to(&self, path: impl AsRef<Path>) -> Result<()> {
        let header = self.header()?;
        let mut file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)?;
        file.write_all(&header.to_bytes())?;
        file.write_all(&self.body)?;
        file.sync_data()?;
        Ok(())
    }

    pub fn read_from(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        let file_len = file.metadata()?.len();
        if file_len < ImageHeader::SIZE as u64 {
            return Err(ImageError::Truncated {
                declared: ImageHeader::SIZE as u64,
                actual: file_len,
            });
        }

        let mmap = unsafe { Mmap::map(&file)? };
        let header = ImageHeader::parse(&mmap)?;

        let body = &mmap[ImageHeader::SIZE..];
        if body.len() != header.body_len as usize {
            return Err(ImageError::Truncated {
                declared: u64::from(header.body_len),
                actual: body.len() as u64,
            });
        }

        let found = checksum(header.base, header.count, header.body_len, body);
        if found != header.checksum {
            return Err(ImageError::ChecksumMismatch {
                expected: header.checksum,
                found,
            });
        }

        Ok(Self {
            base: PhysicalAddress(header.base),
            count: header.count,
            body: body.to_vec(),
        })
    }

    /// Rebuilds the log into a region of `capacity` bytes.
    pub fn to_log(&self, capacity: usize) -> anyhow::Result<EventLog> {
        let log = EventLog::from_image(self.base, capacity, &self.body)?;
        if log.len() != self.count {
            anyhow::bail!(
                "Image header declares {} entries but body decodes to {}",
                self.count,
                log.len()
            );
        }
        Ok(log)
    }

    /// blake3 of the body, hex-encoded.
    pub fn body_hash(&self) -> String {
        blake3::hash(&self.body).to_hex().to_string()
    }
}
