//! `Color Dreams` (Mapper 011)
//!
//! <http://wiki.nesdev.com/w/index.php/Color_Dreams>

use crate::{
    cart::Cart,
    common::{Clock, Regional, Reset, Sram},
    mapper::{self, Mapped, MappedRead, MappedWrite, Mapper, MemMap},
    mem::Banks,
    ppu::Mirroring,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[must_use]
pub struct ColorDreams {
    pub mirroring: Mirroring,
    pub chr_banks: Banks,
    pub prg_rom_banks: Banks,
}

impl ColorDreams {
    const PRG_WINDOW: usize = 32 * 1024;
    const CHR_ROM_WINDOW: usize = 8 * 1024;

    const CHR_BANK_MASK: u8 = 0xF0; // 0b1111_0000
    const PRG_BANK_MASK: u8 = 0x03; // 0b0000_0011

    pub fn load(cart: &mut Cart) -> Result<Mapper, mapper::Error> {
        let color_dreams = Self {
            mirroring: cart.mirroring(),
            chr_banks: Banks::new(0x0000, 0x1FFF, cart.chr_rom.len(), Self::CHR_ROM_WINDOW)?,
            prg_rom_banks: Banks::new(0x8000, 0xFFFF, cart.prg_rom.len(), Self::PRG_WINDOW)?,
        };
        Ok(color_dreams.into())
    }
}

impl Mapped for ColorDreams {
    fn mirroring(&self) -> Mirroring {
        self.mirroring
    }

    fn set_mirroring(&mut self, mirroring: Mirroring) {
        self.mirroring = mirroring;
    }
}

impl MemMap for ColorDreams {
    // PPU $0000..=$1FFF 8K switchable CHR-ROM bank
    // CPU $8000..=$FFFF 32K switchable PRG-ROM bank

    fn map_peek(&self, addr: u16) -> MappedRead {
        match addr {
            0x0000..=0x1FFF => MappedRead::Chr(self.chr_banks.translate(addr)),
            0x8000..=0xFFFF => MappedRead::PrgRom(self.prg_rom_banks.translate(addr)),
            _ => MappedRead::Bus,
        }
    }

    fn map_write(&mut self, addr: u16, val: u8) -> MappedWrite {
        if matches!(addr, 0x8000..=0xFFFF) {
            self.chr_banks
                .set(0, ((val & Self::CHR_BANK_MASK) >> 4).into());
            self.prg_rom_banks
                .set(0, (val & Self::PRG_BANK_MASK).into());
        }
        MappedWrite::Bus
    }
}

impl Clock for ColorDreams {}
impl Regional for ColorDreams {}
impl Reset for ColorDreams {}
impl Sram for ColorDreams {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_splits_nibble_into_chr_and_prg_selects() {
        let mut cart = Cart::empty();
        cart.prg_rom = vec![0x00; 0x8000 * 4];
        cart.chr_rom = vec![0x00; 0x2000 * 16];
        let mapper = ColorDreams::load(&mut cart).expect("load");
        let Mapper::ColorDreams(mut cd) = mapper else {
            panic!("expected ColorDreams")
        };
        cd.map_write(0x8000, 0b1010_0001);
        assert_eq!(cd.chr_banks.page(0), 0b1010);
        assert_eq!(cd.prg_rom_banks.page(0), 0b01);
    }
}
