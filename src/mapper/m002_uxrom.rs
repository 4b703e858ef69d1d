//! `UxROM` (Mapper 002)
//!
//! <https://wiki.nesdev.com/w/index.php/UxROM>

use crate::{
    cart::Cart,
    common::{Clock, Regional, Reset, Sram},
    mapper::{self, Mapped, MappedRead, MappedWrite, Mapper, MemMap},
    mem::{resolve_bank_index, Banks},
    ppu::Mirroring,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[must_use]
pub struct Uxrom {
    pub mirroring: Mirroring,
    pub prg_rom_banks: Banks,
}

impl Uxrom {
    const PRG_ROM_WINDOW: usize = 16 * 1024;
    const CHR_RAM_SIZE: usize = 8 * 1024;

    pub fn load(cart: &mut Cart) -> Result<Mapper, mapper::Error> {
        if !cart.has_chr_rom() && cart.chr_ram.is_empty() {
            cart.add_chr_ram(Self::CHR_RAM_SIZE);
        };
        let mut uxrom = Self {
            mirroring: cart.mirroring(),
            prg_rom_banks: Banks::new(0x8000, 0xFFFF, cart.prg_rom.len(), Self::PRG_ROM_WINDOW)?,
        };
        // $C000 is fixed to the last bank: set_prg_16k_bank(1, -1, true).
        let last = resolve_bank_index(uxrom.prg_rom_banks.page_count(), -1);
        uxrom.prg_rom_banks.set(1, last);
        Ok(uxrom.into())
    }
}

impl MemMap for Uxrom {
    // PPU $0000..=$1FFF 8K Fixed CHR-ROM/CHR-RAM Bank
    // CPU $8000..=$BFFF 16K PRG-ROM Bank Switchable
    // CPU $C000..=$FFFF 16K PRG-ROM Fixed to Last Bank

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
            0x8000..=0xFFFF => {
                self.prg_rom_banks.set(0, val.into());
                MappedWrite::Bus
            }
            _ => MappedWrite::Bus,
        }
    }
}

impl Mapped for Uxrom {
    fn mirroring(&self) -> Mirroring {
        self.mirroring
    }

    fn set_mirroring(&mut self, mirroring: Mirroring) {
        self.mirroring = mirroring;
    }
}

impl Clock for Uxrom {}
impl Regional for Uxrom {}
impl Reset for Uxrom {}
impl Sram for Uxrom {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sub_0x8000_write_has_no_effect() {
        let mut uxrom = Uxrom {
            mirroring: Mirroring::Horizontal,
            prg_rom_banks: Banks::new(0x8000, 0xFFFF, 0x10000, Uxrom::PRG_ROM_WINDOW).unwrap(),
        };
        let before = uxrom.prg_rom_banks.translate(0x8000);
        assert_eq!(uxrom.map_write(0x4020, 3), MappedWrite::Bus);
        assert_eq!(uxrom.prg_rom_banks.translate(0x8000), before);
    }

    #[test]
    fn last_bank_fixed_at_c000() {
        let mut cart = Cart::empty();
        cart.prg_rom = vec![0x00; 0x4000 * 4];
        let mapper = Uxrom::load(&mut cart).expect("load");
        let Mapper::Uxrom(uxrom) = &mapper else {
            panic!("expected Uxrom")
        };
        assert_eq!(uxrom.prg_rom_banks.page(1), 3);
    }
}
