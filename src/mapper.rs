//! Memory Mappers for cartridges.
//!
//! <http://wiki.nesdev.com/w/index.php/Mapper>

use crate::{
    common::{Clock, NesRegion, Regional, Reset, ResetKind},
    ppu::Mirroring,
};
use enum_dispatch::enum_dispatch;
use serde::{Deserialize, Serialize};

pub use m000_nrom::Nrom;
pub use m001_sxrom::{Revision as Mmc1Revision, Sxrom};
pub use m002_uxrom::Uxrom;
pub use m003_cnrom::Cnrom;
pub use m004_txrom::{Revision as Mmc3Revision, Txrom};
pub use m005_exrom::Exrom;
pub use m007_axrom::Axrom;
pub use m009_pxrom::Pxrom;
pub use m011_color_dreams::ColorDreams;
pub use m071_bf909x::{Bf909x, Revision as Bf909Revision};
pub use m232_codemasters::Codemasters;

pub mod m000_nrom;
pub mod m001_sxrom;
pub mod m002_uxrom;
pub mod m003_cnrom;
pub mod m004_txrom;
pub mod m005_exrom;
pub mod m007_axrom;
pub mod m009_pxrom;
pub mod m011_color_dreams;
pub mod m071_bf909x;
pub mod m232_codemasters;

/// Errors that can occur constructing a mapper. These are configuration errors per the
/// cartridge's header data and are reported synchronously to the ROM loader.
#[derive(thiserror::Error, Debug)]
#[must_use]
pub enum Error {
    #[error(transparent)]
    Bank(#[from] crate::mem::Error),
}

/// Allow user-controlled mapper revision for mappers that are difficult to auto-detect correctly
/// from header bytes alone.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[must_use]
pub enum MapperRevision {
    Mmc1(Mmc1Revision),
    Mmc3(Mmc3Revision), // No known detection except a per-game database lookup
    Bf909(Bf909Revision), // Can compare to submapper 1, if header is correct
}

impl std::fmt::Display for MapperRevision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            MapperRevision::Mmc1(rev) => match rev {
                Mmc1Revision::A => "MMC1A",
                Mmc1Revision::BC => "MMC1B/C",
            },
            MapperRevision::Mmc3(rev) => match rev {
                Mmc3Revision::A => "MMC3A",
                Mmc3Revision::BC => "MMC3B/C",
                Mmc3Revision::Acc => "MMC3Acc",
            },
            MapperRevision::Bf909(rev) => match rev {
                Bf909Revision::Bf909x => "BF909x",
                Bf909Revision::Bf9097 => "BF9097",
            },
        };
        write!(f, "{s}")
    }
}

/// The cartridge mapper dispatch table, realized as a tagged union over the one struct per
/// supported mapper number. `#[enum_dispatch]` generates the match-driven dispatcher so that
/// the CPU/PPU call sites go through a single static call rather than a function-pointer table.
#[enum_dispatch]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[allow(clippy::large_enum_variant)]
#[must_use]
pub enum Mapper {
    Empty,
    Nrom,
    Sxrom,
    Uxrom,
    Cnrom,
    Txrom,
    Exrom,
    Axrom,
    Pxrom,
    ColorDreams,
    Bf909x,
    Codemasters,
}

impl Mapper {
    pub fn none() -> Self {
        Empty.into()
    }
}

impl Default for Mapper {
    fn default() -> Self {
        Self::none()
    }
}

/// Describes where a CPU or PPU read should be satisfied from. `Bus` means the mapper declines
/// to supply a value and the caller should fall back to whatever value was already on the bus
/// (e.g. open-bus behavior for unmapped cartridge addresses).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[must_use]
pub enum MappedRead {
    Bus,
    Chr(usize),
    CIRam(usize),
    ExRam(usize),
    PrgRom(usize),
    PrgRam(usize),
    Data(u8),
}

/// Describes where a CPU or PPU write should land, if anywhere.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[must_use]
pub enum MappedWrite {
    None,
    Bus,
    ChrRam(usize, u8),
    CIRam(usize, u8),
    ExRam(usize, u8),
    PrgRam(usize, u8),
    PrgRamProtect(bool),
}

/// The bus-facing half of the mapper dispatch table: `map_read`/`map_write` for the CPU bus plus
/// the CHR read/write slot, all addressed from the cartridge's own view (CPU addresses
/// 0x0000-0xFFFF, PPU/CHR addresses 0x0000-0x1FFF).
#[enum_dispatch(Mapper)]
pub trait MemMap {
    fn map_read(&mut self, addr: u16) -> MappedRead {
        self.map_peek(addr)
    }

    fn map_peek(&self, _addr: u16) -> MappedRead {
        MappedRead::Bus
    }

    fn map_write(&mut self, _addr: u16, _val: u8) -> MappedWrite {
        MappedWrite::Bus
    }
}

/// The remaining dispatch-table slots: mirroring, the PPU-tick hook that drives IRQ/latch state
/// machines, and the name-table intercept pair that only a handful of mappers implement.
#[enum_dispatch(Mapper)]
pub trait Mapped {
    fn mirroring(&self) -> Mirroring {
        Mirroring::default()
    }

    fn set_mirroring(&mut self, _mirroring: Mirroring) {}

    /// Called exactly once per PPU cycle with the current 14-bit PPU address bus value and a
    /// monotonically increasing cycle counter, so mappers that watch A12 (MMC3) or CHR latch
    /// addresses (MMC2) can detect edges without the PPU knowing about mapper internals.
    fn ppu_tick(&mut self, _addr: u16, _cycle: u64) {}

    /// True while the mapper's IRQ line is asserted. The CPU polls this once per instruction and
    /// is expected to call back into the mapper's normal register writes to acknowledge/clear it
    /// (e.g. MMC3 clears on any write to $E000).
    fn irq_pending(&self) -> bool {
        false
    }

    /// Intercepts a PPU name-table read. `ciram` is the PPU's own 2 KiB of physical name-table
    /// RAM, passed through so a mapper that remaps name-table space (MMC5) can still resolve
    /// accesses that land on the PPU's normal screens. Only such mappers override this; calling
    /// it on any other mapper is a logic error, matching the "fatal, terminate the process"
    /// disposition for calling an operation a mapper doesn't support.
    fn nt_read(&mut self, addr: u16, _ciram: &[u8]) -> u8 {
        unreachable!("mapper has no nametable mapping for ${addr:04X}")
    }

    /// Intercepts a PPU name-table write. See [`Mapped::nt_read`].
    fn nt_write(&mut self, addr: u16, _val: u8, _ciram: &mut [u8]) {
        unreachable!("mapper has no nametable mapping for ${addr:04X}")
    }
}

/// The no-op mapper used before a ROM is loaded.
#[derive(Debug, Copy, Clone, Serialize, Deserialize)]
#[must_use]
pub struct Empty;

impl MemMap for Empty {}
impl Mapped for Empty {}
impl Clock for Empty {}
impl Regional for Empty {}
impl Reset for Empty {}
