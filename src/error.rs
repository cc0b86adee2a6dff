// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Error types.
//!
//! Every failure is returned as a value so boot firmware can apply its own
//! halt-or-continue policy per kind. Variants are ordered from most to least
//! recoverable.

use crate::types::algorithm::AlgorithmId;
use crate::types::id::PcrIndex;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TcgError {
    /// Destination too small; retry with `required` bytes. Nothing was written.
    #[error("buffer too small: {required} bytes required")]
    BufferTooSmall { required: usize },

    #[error("invalid parameter: {0}")]
    InvalidParameter(&'static str),

    #[error("unsupported algorithm {0:?}")]
    UnsupportedAlgorithm(AlgorithmId),

    #[error("register index {0} out of range")]
    InvalidRegisterIndex(PcrIndex),

    #[error("trust root not present")]
    DeviceNotPresent,

    #[error("trust root command failed: {0}")]
    DeviceError(DeviceFault),

    /// The log region cannot hold the record.
    ///
    /// `extended` is true when the register had already been extended before
    /// the append failed. That state is not unwound.
    #[error("event log full: {required} bytes required, {remaining} remaining (register extended: {extended})")]
    LogFull {
        required: usize,
        remaining: usize,
        extended: bool,
    },
}

/// Why the trust root rejected or failed a command.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceFault {
    #[error("transport: {0}")]
    Transport(TransportError),
    #[error("device return code {0:#x}")]
    ReturnCode(u32),
    #[error("malformed response")]
    MalformedResponse,
    #[error("device deactivated")]
    Deactivated,
}

/// Failures reported by the physical transport collaborator.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportError {
    #[error("no device attached")]
    NotPresent,
    #[error("command timed out")]
    Timeout,
    #[error("bus I/O failure")]
    Io,
}

impl From<DeviceFault> for TcgError {
    fn from(fault: DeviceFault) -> Self {
        TcgError::DeviceError(fault)
    }
}

impl From<TransportError> for TcgError {
    fn from(e: TransportError) -> Self {
        match e {
            TransportError::NotPresent => TcgError::DeviceNotPresent,
            other => TcgError::DeviceError(DeviceFault::Transport(other)),
        }
    }
}

pub type TcgResult<T> = core::result::Result<T, TcgError>;

/// EFI-style status word returned at the firmware call boundary.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct Status(pub u64);

impl Status {
    const ERROR_BIT: u64 = 1 << 63;

    pub const SUCCESS: Status = Status(0);
    pub const INVALID_PARAMETER: Status = Status(Self::ERROR_BIT | 2);
    pub const UNSUPPORTED: Status = Status(Self::ERROR_BIT | 3);
    pub const BUFFER_TOO_SMALL: Status = Status(Self::ERROR_BIT | 5);
    pub const DEVICE_ERROR: Status = Status(Self::ERROR_BIT | 7);
    pub const OUT_OF_RESOURCES: Status = Status(Self::ERROR_BIT | 9);
    pub const NOT_FOUND: Status = Status(Self::ERROR_BIT | 14);

    pub fn is_error(self) -> bool {
        self.0 & Self::ERROR_BIT != 0
    }
}

impl TcgError {
    pub fn status(&self) -> Status {
        match self {
            TcgError::BufferTooSmall { .. } => Status::BUFFER_TOO_SMALL,
            TcgError::InvalidParameter(_) => Status::INVALID_PARAMETER,
            TcgError::InvalidRegisterIndex(_) => Status::INVALID_PARAMETER,
            TcgError::UnsupportedAlgorithm(_) => Status::UNSUPPORTED,
            TcgError::DeviceNotPresent => Status::NOT_FOUND,
            TcgError::DeviceError(_) => Status::DEVICE_ERROR,
            TcgError::LogFull { .. } => Status::OUT_OF_RESOURCES,
        }
    }
}

impl<T> From<&TcgResult<T>> for Status {
    fn from(result: &TcgResult<T>) -> Self {
        match result {
            Ok(_) => Status::SUCCESS,
            Err(e) => e.status(),
        }
    }
}
