//! Common traits and constants.

use enum_dispatch::enum_dispatch;
use serde::{Deserialize, Serialize};
use std::fmt::Write;
use thiserror::Error;

#[derive(Error, Debug)]
#[must_use]
#[error("failed to parse `NesRegion`")]
pub struct ParseNesRegionError;

#[derive(Default, Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[must_use]
pub enum NesRegion {
    Auto,
    #[default]
    Ntsc,
    Pal,
    Dendy,
}

impl NesRegion {
    pub const fn as_slice() -> &'static [Self] {
        &[
            NesRegion::Auto,
            NesRegion::Ntsc,
            NesRegion::Pal,
            NesRegion::Dendy,
        ]
    }

    #[must_use]
    pub fn is_auto(&self) -> bool {
        self == &Self::Auto
    }

    #[must_use]
    pub const fn is_ntsc(&self) -> bool {
        matches!(self, Self::Auto | Self::Ntsc)
    }

    #[must_use]
    pub fn is_pal(&self) -> bool {
        self == &Self::Pal
    }

    #[must_use]
    pub fn is_dendy(&self) -> bool {
        self == &Self::Dendy
    }

    #[must_use]
    pub fn aspect_ratio(&self) -> f32 {
        // https://www.nesdev.org/wiki/Overscan
        match self {
            Self::Auto | Self::Ntsc => 8.0 / 7.0,
            Self::Pal | Self::Dendy => 18.0 / 13.0,
        }
    }

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Ntsc => "ntsc",
            Self::Pal => "pal",
            Self::Dendy => "dendy",
        }
    }
}

impl std::fmt::Display for NesRegion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Auto => "Auto",
            Self::Ntsc => "NTSC",
            Self::Pal => "PAL",
            Self::Dendy => "Dendy",
        };
        write!(f, "{s}")
    }
}

impl AsRef<str> for NesRegion {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl TryFrom<&str> for NesRegion {
    type Error = ParseNesRegionError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "auto" => Ok(Self::Auto),
            "ntsc" => Ok(Self::Ntsc),
            "pal" => Ok(Self::Pal),
            "dendy" => Ok(Self::Dendy),
            _ => Err(ParseNesRegionError),
        }
    }
}

impl TryFrom<usize> for NesRegion {
    type Error = ParseNesRegionError;

    fn try_from(value: usize) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Auto),
            1 => Ok(Self::Ntsc),
            2 => Ok(Self::Pal),
            3 => Ok(Self::Dendy),
            _ => Err(ParseNesRegionError),
        }
    }
}

/// Trait for types that have different behavior depending on NES region.
#[enum_dispatch(Mapper)]
pub trait Regional {
    fn region(&self) -> crate::common::NesRegion {
        crate::common::NesRegion::Ntsc
    }
    fn set_region(&mut self, _region: crate::common::NesRegion) {}
}

/// Type of reset for types that have different behavior for reset vs power cycling.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[must_use]
pub enum ResetKind {
    Soft,
    Hard,
}

/// Trait for types that can can be reset.
#[enum_dispatch(Mapper)]
pub trait Reset {
    fn reset(&mut self, _kind: crate::common::ResetKind) {}
}

/// Trait for types that can clock a single cycle.
#[enum_dispatch(Mapper)]
pub trait Clock {
    fn clock(&mut self) -> usize {
        0
    }
}

/// Trait for types that can clock to a target cycle.
pub trait ClockTo {
    fn clock_to(&mut self, _cycle: usize) -> usize {
        0
    }
}

/// Trait for types that can output `f32` audio samples.
pub trait Sample {
    fn output(&self) -> f32;
}

/// Marks mappers that carry battery-backed PRG-RAM. Disk persistence itself is out of scope
/// (cartridge persistence to disk is left to the embedder); this trait only
/// records which mappers have a battery, for a host that wants to implement that persistence
/// itself against `Cart::prg_ram`.
#[enum_dispatch(Mapper)]
pub trait Sram {
    fn battery_backed(&self) -> bool {
        false
    }
}

/// Prints a hex dump of a given byte array starting at `addr_offset`.
#[must_use]
pub fn hexdump(data: &[u8], addr_offset: usize) -> Vec<String> {
    use std::cmp;

    let mut addr = 0;
    let len = data.len();
    let mut last_line_same = false;
    let mut output = Vec::new();

    let mut last_line = String::with_capacity(80);
    while addr <= len {
        let end = cmp::min(addr + 16, len);
        let line_data = &data[addr..end];
        let line_len = line_data.len();

        let mut line = String::with_capacity(80);
        for byte in line_data.iter() {
            let _ = write!(line, " {byte:02X}");
        }

        if line_len % 16 > 0 {
            let words_left = (16 - line_len) / 2;
            for _ in 0..3 * words_left {
                line.push(' ');
            }
        }

        if line_len > 0 {
            line.push_str("  |");
            for c in line_data {
                if (*c as char).is_ascii() && !(*c as char).is_control() {
                    let _ = write!(line, "{}", (*c as char));
                } else {
                    line.push('.');
                }
            }
            line.push('|');
        }
        if last_line == line {
            if !last_line_same {
                last_line_same = true;
                output.push("*".to_string());
            }
        } else {
            last_line_same = false;
            output.push(format!("{:08x} {}", addr + addr_offset, line));
        }
        last_line = line;

        addr += 16;
    }
    output
}

