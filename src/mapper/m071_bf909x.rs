//! `Bf909x` (Mapper 071).
//!
//! <https://wiki.nesdev.org/w/index.php?title=INES_Mapper_071>

use crate::{
    cart::Cart,
    common::{Clock, Regional, Reset, Sram},
    mapper::{self, Mapped, MappedRead, MappedWrite, Mapper, MemMap},
    mem::{resolve_bank_index, Banks},
    ppu::Mirroring,
};
use serde::{Deserialize, Serialize};

/// `Bf909x` revision.
#[derive(Default, Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[must_use]
pub enum Revision {
    #[default]
    Bf909x,
    Bf9097,
}

/// `Bf909x` (Mapper 071).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[must_use]
pub struct Bf909x {
    pub revision: Revision,
    pub mirroring: Mirroring,
    pub prg_rom_banks: Banks,
}

impl Bf909x {
    const PRG_ROM_WINDOW: usize = 16 * 1024;
    const CHR_RAM_SIZE: usize = 8 * 1024;

    const SINGLE_SCREEN_A: u8 = 0x10; // 0b10000

    pub fn load(cart: &mut Cart) -> Result<Mapper, mapper::Error> {
        if !cart.has_chr_rom() && cart.chr_ram.is_empty() {
            cart.add_chr_ram(Self::CHR_RAM_SIZE);
        };
        let mut bf909x = Self {
            revision: if cart.submapper_num() == 1 {
                Revision::Bf9097
            } else {
                Revision::Bf909x
            },
            mirroring: cart.mirroring(),
            prg_rom_banks: Banks::new(0x8000, 0xFFFF, cart.prg_rom.len(), Self::PRG_ROM_WINDOW)?,
        };
        // $C000 is fixed to the last bank: set_prg_16k_bank(1, -1, true).
        let last = resolve_bank_index(bf909x.prg_rom_banks.page_count(), -1);
        bf909x.prg_rom_banks.set(1, last);
        Ok(bf909x.into())
    }

    pub const fn set_revision(&mut self, rev: Revision) {
        self.revision = rev;
    }
}

impl Mapped for Bf909x {
    fn mirroring(&self) -> Mirroring {
        self.mirroring
    }

    fn set_mirroring(&mut self, mirroring: Mirroring) {
        self.mirroring = mirroring;
    }
}

impl MemMap for Bf909x {
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
        // Firehawk (BF9097) repurposes $9000 to select one-screen mirroring.
        if addr == 0x9000 {
            self.revision = Revision::Bf9097;
        }
        match addr {
            0x0000..=0x1FFF => MappedWrite::ChrRam(addr.into(), val),
            0x8000..=0xFFFF => {
                if addr >= 0xC000 || self.revision != Revision::Bf9097 {
                    self.prg_rom_banks.set(0, val.into());
                } else {
                    self.mirroring = if val & Self::SINGLE_SCREEN_A == Self::SINGLE_SCREEN_A {
                        Mirroring::SingleScreenA
                    } else {
                        Mirroring::SingleScreenB
                    };
                }
                MappedWrite::Bus
            }
            _ => MappedWrite::Bus,
        }
    }
}

impl Reset for Bf909x {}
impl Clock for Bf909x {}
impl Regional for Bf909x {}
impl Sram for Bf909x {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn switchable_bank_at_8000_fixed_last_at_c000() {
        let mut cart = Cart::empty();
        cart.prg_rom = vec![0x00; 0x4000 * 8];
        let mapper = Bf909x::load(&mut cart).expect("load");
        let Mapper::Bf909x(mut bf) = mapper else {
            panic!("expected Bf909x")
        };
        assert_eq!(bf.prg_rom_banks.page(1), 7);
        bf.map_write(0x8000, 2);
        assert_eq!(bf.prg_rom_banks.page(0), 2);
    }
}
