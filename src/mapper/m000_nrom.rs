//! `NROM` (Mapper 000).
//!
//! <https://wiki.nesdev.org/w/index.php/NROM>

use crate::{
    cart::Cart,
    common::{Clock, Regional, Reset, Sram},
    mapper::{self, Mapped, MappedRead, MappedWrite, Mapper, MemMap},
    mem::Banks,
    ppu::Mirroring,
};
use serde::{Deserialize, Serialize};

/// `NROM` (Mapper 000). No runtime state: the bank windows are fixed by `load` and never
/// written again.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[must_use]
pub struct Nrom {
    pub mirroring: Mirroring,
    pub prg_rom_banks: Banks,
    pub chr_banks: Banks,
}

impl Nrom {
    const PRG_ROM_WINDOW: usize = 16 * 1024;
    const CHR_ROM_WINDOW: usize = 8 * 1024;
    const CHR_RAM_SIZE: usize = 8 * 1024;

    pub fn load(cart: &mut Cart) -> Result<Mapper, mapper::Error> {
        if !cart.has_chr_rom() && cart.chr_ram.is_empty() {
            cart.add_chr_ram(Self::CHR_RAM_SIZE);
        }
        let chr_len = if cart.has_chr_rom() {
            cart.chr_rom.len()
        } else {
            cart.chr_ram.len()
        };
        let mut nrom = Self {
            mirroring: cart.mirroring(),
            prg_rom_banks: Banks::new(0x8000, 0xFFFF, cart.prg_rom.len(), Self::PRG_ROM_WINDOW)?,
            chr_banks: Banks::new(0x0000, 0x1FFF, chr_len, Self::CHR_ROM_WINDOW)?,
        };
        // 16 KiB carts mirror the single bank into both the $8000 and $C000 windows.
        if cart.prg_rom.len() <= Self::PRG_ROM_WINDOW {
            nrom.prg_rom_banks.set(1, 0);
        } else {
            nrom.prg_rom_banks.set(0, 0);
            nrom.prg_rom_banks.set(1, 1);
        }
        Ok(nrom.into())
    }
}

impl MemMap for Nrom {
    // PPU $0000..=$1FFF 8K Fixed CHR-ROM/CHR-RAM Bank
    // CPU $8000..=$FFFF 16K or 32K Fixed PRG-ROM Bank(s)

    fn map_peek(&self, addr: u16) -> MappedRead {
        match addr {
            0x0000..=0x1FFF => MappedRead::Chr(self.chr_banks.translate(addr)),
            0x8000..=0xFFFF => MappedRead::PrgRom(self.prg_rom_banks.translate(addr)),
            _ => MappedRead::Bus,
        }
    }

    fn map_write(&mut self, addr: u16, val: u8) -> MappedWrite {
        match addr {
            0x0000..=0x1FFF => MappedWrite::ChrRam(self.chr_banks.translate(addr), val),
            _ => MappedWrite::Bus,
        }
    }
}

impl Mapped for Nrom {
    fn mirroring(&self) -> Mirroring {
        self.mirroring
    }

    fn set_mirroring(&mut self, mirroring: Mirroring) {
        self.mirroring = mirroring;
    }
}

impl Clock for Nrom {}
impl Regional for Nrom {}
impl Reset for Nrom {}
impl Sram for Nrom {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mem::RamState;

    fn cart_with(prg_len: usize, chr_len: usize) -> Cart {
        Cart::from_rom(
            "test",
            &mut std::io::Cursor::new(test_rom(prg_len, chr_len)),
            RamState::AllZeros,
        )
        .expect("valid rom")
    }

    fn test_rom(prg_len: usize, chr_len: usize) -> Vec<u8> {
        let mut rom = vec![0x4E, 0x45, 0x53, 0x1A];
        rom.push((prg_len / 0x4000) as u8);
        rom.push((chr_len / 0x2000) as u8);
        rom.extend_from_slice(&[0x00; 10]);
        rom.extend(std::iter::repeat(0x00).take(prg_len));
        rom.extend(std::iter::repeat(0x00).take(chr_len));
        rom
    }

    #[test]
    fn fixed_mapping_32k_prg_8k_chr() {
        // S1 — NROM fixed mapping.
        let cart = cart_with(0x8000, 0x2000);
        let Mapper::Nrom(nrom) = &cart.mapper else {
            panic!("expected Nrom")
        };
        assert_eq!(nrom.prg_rom_banks.translate(0x8000), 0x0000);
        assert_eq!(nrom.prg_rom_banks.translate(0xA000), 0x2000);
        assert_eq!(nrom.prg_rom_banks.translate(0xC000), 0x4000);
        assert_eq!(nrom.prg_rom_banks.translate(0xE000), 0x6000);
        for i in 0..8 {
            assert_eq!(
                nrom.chr_banks.translate((0x0400 * i) as u16),
                0x0400 * i,
                "chr window {i}"
            );
        }
    }

    #[test]
    fn sixteen_k_prg_mirrors_into_both_windows() {
        let cart = cart_with(0x4000, 0x2000);
        let Mapper::Nrom(nrom) = &cart.mapper else {
            panic!("expected Nrom")
        };
        assert_eq!(nrom.prg_rom_banks.translate(0x8000), 0x0000);
        assert_eq!(nrom.prg_rom_banks.translate(0xC000), 0x0000);
    }
}
