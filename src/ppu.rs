//! PPU placeholder state.
//!
//! The real picture processing unit is an external collaborator: this crate consumes only
//! `ppu_addr_bus`, `ppu_cycle`, `scanline` and `dot` from it and drives its mapper-tick callback
//! once per PPU cycle. `PpuState` carries just enough of that surface, plus the 2 KiB of physical
//! name-table RAM a handful of mappers (`Exrom`) intercept directly, to make the state-transfer
//! walk and the mapper test suite self-contained.

use crate::mapper::Mapper;
use serde::{Deserialize, Serialize};

/// Nametable mirroring mode, consumed by the PPU to decide how its 2 KiB of name-table RAM is
/// aliased across the 4 KiB name-table address region.
///
/// <https://wiki.nesdev.org/w/index.php/Mirroring#Nametable_Mirroring>
#[derive(Default, Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[must_use]
pub enum Mirroring {
    Vertical = 0,
    #[default]
    Horizontal = 1,
    SingleScreenA = 2,
    SingleScreenB = 3,
    FourScreen = 4,
}

/// Placeholder PPU state: just the fields this crate's mapper subsystem actually reads from or
/// writes to the picture unit, enough to drive the state-transfer walk and the mapper test suite.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[must_use]
pub struct PpuState {
    /// 13-bit current PPU address bus value, as observed by mappers watching A12 (MMC3) or the
    /// CHR-latch magic addresses (MMC2).
    pub ppu_addr_bus: u16,
    /// Monotonically increasing PPU cycle counter; A12 debounce compares deltas against this.
    pub ppu_cycle: u64,
    /// Diagnostic-only; not consumed by any mapper.
    pub scanline: u16,
    /// Diagnostic-only; not consumed by any mapper.
    pub dot: u16,
    /// The PPU's own 2 KiB of physical name-table RAM. Normally opaque to the cartridge; MMC5
    /// (`Exrom::nt_read`/`nt_write`) is the one mapper in scope that addresses it directly.
    pub ciram: [u8; Self::CIRAM_SIZE],
}

impl PpuState {
    pub const NT_SIZE: u16 = 0x0400;
    pub const CIRAM_SIZE: usize = 0x0800;

    pub const fn new() -> Self {
        Self {
            ppu_addr_bus: 0,
            ppu_cycle: 0,
            scanline: 0,
            dot: 0,
            ciram: [0x00; Self::CIRAM_SIZE],
        }
    }

    /// Sets the address bus to `addr` and calls the mapper's `ppu_tick` exactly once, matching the
    /// contract that the PPU calls it every PPU cycle.
    pub fn tick(&mut self, addr: u16, mapper: &mut Mapper) {
        use crate::mapper::Mapped;

        self.ppu_addr_bus = addr & 0x3FFF;
        self.ppu_cycle = self.ppu_cycle.wrapping_add(1);
        self.dot = (self.dot + 1) % 341;
        if self.dot == 0 {
            self.scanline = (self.scanline + 1) % 262;
        }
        mapper.ppu_tick(self.ppu_addr_bus, self.ppu_cycle);
    }
}

impl Default for PpuState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapper::{Empty, Mapper};

    #[test]
    fn tick_advances_cycle_and_dot() {
        let mut ppu = PpuState::new();
        let mut mapper: Mapper = Empty.into();
        ppu.tick(0x1234, &mut mapper);
        assert_eq!(ppu.ppu_cycle, 1);
        assert_eq!(ppu.ppu_addr_bus, 0x1234 & 0x3FFF);
        assert_eq!(ppu.dot, 1);
    }
}
