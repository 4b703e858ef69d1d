//! Codemasters/Camerica Quattro (Mapper 232).
//!
//! <https://wiki.nesdev.org/w/index.php?title=INES_Mapper_232>

use crate::{
    cart::Cart,
    common::{Clock, Regional, Reset, Sram},
    mapper::{self, Mapped, MappedRead, MappedWrite, Mapper, MemMap},
    mem::Banks,
    ppu::Mirroring,
};
use serde::{Deserialize, Serialize};

/// Codemasters/Camerica Quattro (Mapper 232). Four 64 KiB "games" of four 16 KiB banks each are
/// selected by an outer (from $8000) and inner (from $C000) bank field.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[must_use]
pub struct Codemasters {
    pub mirroring: Mirroring,
    pub prg_rom_banks: Banks,
    outer: u8,
    inner: u8,
}

impl Codemasters {
    const PRG_ROM_WINDOW: usize = 16 * 1024;
    const CHR_RAM_SIZE: usize = 8 * 1024;

    const OUTER_MASK: u8 = 0x18; // bits 4-3
    const OUTER_SHIFT: u8 = 3;
    const INNER_MASK: u8 = 0x03; // bits 1-0

    pub fn load(cart: &mut Cart) -> Result<Mapper, mapper::Error> {
        if !cart.has_chr_rom() && cart.chr_ram.is_empty() {
            cart.add_chr_ram(Self::CHR_RAM_SIZE);
        }
        let mut codemasters = Self {
            mirroring: cart.mirroring(),
            prg_rom_banks: Banks::new(0x8000, 0xFFFF, cart.prg_rom.len(), Self::PRG_ROM_WINDOW)?,
            outer: 0,
            inner: 0,
        };
        codemasters.update_banks();
        Ok(codemasters.into())
    }

    fn update_banks(&mut self) {
        let group_base = self.outer << 2;
        self.prg_rom_banks.set(0, (group_base | self.inner).into());
        // $C000 is fixed to the last (4th) bank of the currently-selected outer group.
        self.prg_rom_banks.set(1, (group_base | 0x03).into());
    }
}

impl MemMap for Codemasters {
    // PPU $0000..=$1FFF 8K Fixed CHR-ROM/CHR-RAM Bank
    // CPU $8000..=$BFFF 16K PRG-ROM Bank Switchable (inner selects within outer group)
    // CPU $C000..=$FFFF 16K PRG-ROM Fixed to Last Bank of the Outer Group

    fn map_peek(&self, addr: u16) -> MappedRead {
        match addr {
            0x0000..=0x1FFF => MappedRead::Chr(addr.into()),
            0x8000..=0xFFFF => MappedRead::PrgRom(self.prg_rom_banks.translate(addr)),
            _ => MappedRead::Bus,
        }
    }

    fn map_write(&mut self, addr: u16, val: u8) -> MappedWrite {
        match addr {
            0x0000..=0x1FFF => MappedWrite::ChrRam(addr.into(), val),
            0x8000..=0xBFFF => {
                self.outer = (val & Self::OUTER_MASK) >> Self::OUTER_SHIFT;
                self.update_banks();
                MappedWrite::Bus
            }
            0xC000..=0xFFFF => {
                self.inner = val & Self::INNER_MASK;
                self.update_banks();
                MappedWrite::Bus
            }
            _ => MappedWrite::Bus,
        }
    }
}

impl Mapped for Codemasters {
    fn mirroring(&self) -> Mirroring {
        self.mirroring
    }

    fn set_mirroring(&mut self, mirroring: Mirroring) {
        self.mirroring = mirroring;
    }
}

impl Clock for Codemasters {}
impl Regional for Codemasters {}
impl Reset for Codemasters {}
impl Sram for Codemasters {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outer_and_inner_compose_into_prg_bank() {
        let mut cart = Cart::empty();
        cart.prg_rom = vec![0x00; 0x4000 * 16];
        let mapper = Codemasters::load(&mut cart).expect("load");
        let Mapper::Codemasters(mut cm) = mapper else {
            panic!("expected Codemasters")
        };
        cm.map_write(0x8000, 0b0001_1000); // outer = 3
        cm.map_write(0xC000, 0b0000_0010); // inner = 2
        assert_eq!(cm.prg_rom_banks.page(0), 14); // (3<<2)|2
        assert_eq!(cm.prg_rom_banks.page(1), 15); // (3<<2)|3, fixed last of group
    }
}
