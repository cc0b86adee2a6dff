// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Identity types.

use core::fmt;
use serde::{Deserialize, Serialize};

/// Index of a platform configuration register.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[repr(transparent)]
pub struct PcrIndex(pub u32);

impl fmt::Display for PcrIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PCR[{}]", self.0)
    }
}

/// TCG event type tag carried by every measurement record.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[repr(transparent)]
pub struct EventType(pub u32);

impl EventType {
    pub const EV_PREBOOT_CERT: EventType = EventType(0x0000_0000);
    pub const EV_POST_CODE: EventType = EventType(0x0000_0001);
    /// Informational; never extended into a register.
    pub const EV_NO_ACTION: EventType = EventType(0x0000_0003);
    pub const EV_SEPARATOR: EventType = EventType(0x0000_0004);
    pub const EV_ACTION: EventType = EventType(0x0000_0005);
    pub const EV_EVENT_TAG: EventType = EventType(0x0000_0006);
    pub const EV_S_CRTM_CONTENTS: EventType = EventType(0x0000_0007);
    pub const EV_S_CRTM_VERSION: EventType = EventType(0x0000_0008);
    pub const EV_CPU_MICROCODE: EventType = EventType(0x0000_0009);
    pub const EV_PLATFORM_CONFIG_FLAGS: EventType = EventType(0x0000_000A);
    pub const EV_IPL: EventType = EventType(0x0000_000D);
    pub const EV_EFI_VARIABLE_DRIVER_CONFIG: EventType = EventType(0x8000_0001);
    pub const EV_EFI_BOOT_SERVICES_APPLICATION: EventType = EventType(0x8000_0003);
    pub const EV_EFI_BOOT_SERVICES_DRIVER: EventType = EventType(0x8000_0004);
    pub const EV_EFI_ACTION: EventType = EventType(0x8000_0007);

    /// Every event type with a registered name.
    pub const KNOWN: [EventType; 15] = [
        Self::EV_PREBOOT_CERT,
        Self::EV_POST_CODE,
        Self::EV_NO_ACTION,
        Self::EV_SEPARATOR,
        Self::EV_ACTION,
        Self::EV_EVENT_TAG,
        Self::EV_S_CRTM_CONTENTS,
        Self::EV_S_CRTM_VERSION,
        Self::EV_CPU_MICROCODE,
        Self::EV_PLATFORM_CONFIG_FLAGS,
        Self::EV_IPL,
        Self::EV_EFI_VARIABLE_DRIVER_CONFIG,
        Self::EV_EFI_BOOT_SERVICES_APPLICATION,
        Self::EV_EFI_BOOT_SERVICES_DRIVER,
        Self::EV_EFI_ACTION,
    ];

    pub fn from_name(name: &str) -> Option<Self> {
        Self::KNOWN.into_iter().find(|t| t.name() == Some(name))
    }

    pub fn name(&self) -> Option<&'static str> {
        let name = match *self {
            Self::EV_PREBOOT_CERT => "EV_PREBOOT_CERT",
            Self::EV_POST_CODE => "EV_POST_CODE",
            Self::EV_NO_ACTION => "EV_NO_ACTION",
            Self::EV_SEPARATOR => "EV_SEPARATOR",
            Self::EV_ACTION => "EV_ACTION",
            Self::EV_EVENT_TAG => "EV_EVENT_TAG",
            Self::EV_S_CRTM_CONTENTS => "EV_S_CRTM_CONTENTS",
            Self::EV_S_CRTM_VERSION => "EV_S_CRTM_VERSION",
            Self::EV_CPU_MICROCODE => "EV_CPU_MICROCODE",
            Self::EV_PLATFORM_CONFIG_FLAGS => "EV_PLATFORM_CONFIG_FLAGS",
            Self::EV_IPL => "EV_IPL",
            Self::EV_EFI_VARIABLE_DRIVER_CONFIG => "EV_EFI_VARIABLE_DRIVER_CONFIG",
            Self::EV_EFI_BOOT_SERVICES_APPLICATION => "EV_EFI_BOOT_SERVICES_APPLICATION",
            Self::EV_EFI_BOOT_SERVICES_DRIVER => "EV_EFI_BOOT_SERVICES_DRIVER",
            Self::EV_EFI_ACTION => "EV_EFI_ACTION",
            _ => return None,
        };
        Some(name)
    }
}

/// Physical address inside the platform's memory map.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[repr(transparent)]
pub struct PhysicalAddress(pub u64);

impl PhysicalAddress {
    pub fn checked_offset(&self, offset: usize) -> Option<Self> {
        let offset = u64::try_from(offset).ok()?;
        self.0.checked_add(offset).map(PhysicalAddress)
    }
}

impl fmt::LowerHex for PhysicalAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::LowerHex::fmt(&self.0, f)
    }
}

/// Logical sequence number of a log entry: the count of appends before it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[repr(transparent)]
pub struct EventNumber(pub u32);
