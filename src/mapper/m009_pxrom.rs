//! `PxROM`/`MMC2` (Mapper 009).
//!
//! <https://wiki.nesdev.com/w/index.php/PxROM>
//! <https://wiki.nesdev.com/w/index.php/MMC2>
//!
//! Famous for exactly one game (Punch-Out!!), MMC2's distinguishing feature is a pair of CHR
//! latches that flip between two candidate 4K banks as the PPU's background fetches sweep past
//! one of four magic tile addresses, giving each half of the pattern table its own "FD"/"FE"
//! state independent of any CPU-visible register.

use crate::{
    cart::Cart,
    common::{Clock, Regional, Reset, ResetKind, Sram},
    mapper::{self, Mapped, MappedRead, MappedWrite, Mapper, MemMap},
    mem::Banks,
    ppu::Mirroring,
};
use serde::{Deserialize, Serialize};

/// Which of the two candidate banks a CHR half is currently latched to.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[must_use]
pub enum Latch {
    Fd,
    Fe,
}

/// `PxROM`/`MMC2` (Mapper 009).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[must_use]
pub struct Pxrom {
    pub mirroring: Mirroring,
    pub prg_rom_banks: Banks,
    pub chr_banks: Banks,
    // Indexed by CHR half: 0 is PPU $0000-$0FFF, 1 is PPU $1000-$1FFF.
    pub chr_fd: [usize; 2],
    pub chr_fe: [usize; 2],
    pub latch: [Latch; 2],
    // The magic region the PPU address bus is currently inside, if any, so `ppu_tick` can detect
    // the address *leaving* it rather than entering it.
    pub in_magic_region: Option<(usize, Latch)>,
}

impl Pxrom {
    const PRG_ROM_WINDOW: usize = 8 * 1024;
    const CHR_WINDOW: usize = 4 * 1024;
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
        let prg_rom_banks = Banks::new(0x8000, 0xFFFF, cart.prg_rom.len(), Self::PRG_ROM_WINDOW)?;
        let mut pxrom = Self {
            mirroring: cart.mirroring(),
            prg_rom_banks,
            chr_banks: Banks::new(0x0000, 0x1FFF, chr_len, Self::CHR_WINDOW)?,
            chr_fd: [0; 2],
            chr_fe: [0; 2],
            latch: [Latch::Fe, Latch::Fe],
            in_magic_region: None,
        };
        // $A000-$9FFF is the only switchable PRG window; the remaining three 8K banks are
        // fixed to the cartridge's last three banks for the life of the mapper.
        let last = pxrom.prg_rom_banks.last();
        pxrom.prg_rom_banks.set(1, last - 2);
        pxrom.prg_rom_banks.set(2, last - 1);
        pxrom.prg_rom_banks.set(3, last);
        Ok(pxrom.into())
    }

    /// Returns the CHR half (0 or 1) and which latch value a PPU address falls into, if it's one
    /// of the four magic tile addresses MMC2 watches for.
    const fn magic_region(addr: u16) -> Option<(usize, Latch)> {
        match addr & 0xFFF0 {
            0x0FD0 => Some((0, Latch::Fd)),
            0x0FE0 => Some((0, Latch::Fe)),
            0x1FD0 => Some((1, Latch::Fd)),
            0x1FE0 => Some((1, Latch::Fe)),
            _ => None,
        }
    }

    fn update_chr_bank(&mut self, half: usize) {
        let page = match self.latch[half] {
            Latch::Fd => self.chr_fd[half],
            Latch::Fe => self.chr_fe[half],
        };
        self.chr_banks.set(half, page);
    }
}

impl Mapped for Pxrom {
    fn mirroring(&self) -> Mirroring {
        self.mirroring
    }

    fn set_mirroring(&mut self, mirroring: Mirroring) {
        self.mirroring = mirroring;
    }

    /// The latch flips when the PPU address bus *leaves* a magic address, not when it enters
    /// one, matching the real chip's behavior of latching on the fetch that follows the tile
    /// read rather than the tile read itself.
    fn ppu_tick(&mut self, addr: u16, _cycle: u64) {
        let current = Self::magic_region(addr);
        if current.is_none() {
            if let Some((half, latch)) = self.in_magic_region.take() {
                self.latch[half] = latch;
                self.update_chr_bank(half);
            }
        } else {
            self.in_magic_region = current;
        }
    }
}

impl MemMap for Pxrom {
    // PPU $0000..=$0FFF 4K CHR-ROM bank latched to FD or FE via $B000/$C000
    // PPU $1000..=$1FFF 4K CHR-ROM bank latched to FD or FE via $D000/$E000

    // CPU $8000..=$9FFF 8K switchable PRG-ROM bank
    // CPU $A000..=$BFFF 8K PRG-ROM bank fixed to third-from-last
    // CPU $C000..=$DFFF 8K PRG-ROM bank fixed to second-from-last
    // CPU $E000..=$FFFF 8K PRG-ROM bank fixed to last

    fn map_peek(&self, addr: u16) -> MappedRead {
        match addr {
            0x0000..=0x1FFF => MappedRead::Chr(self.chr_banks.translate(addr)),
            0x8000..=0xFFFF => MappedRead::PrgRom(self.prg_rom_banks.translate(addr)),
            _ => MappedRead::Bus,
        }
    }

    fn map_write(&mut self, addr: u16, val: u8) -> MappedWrite {
        match addr {
            0xA000..=0xAFFF => {
                self.prg_rom_banks.set(0, (val & 0x0F) as usize);
            }
            0xB000..=0xBFFF => {
                self.chr_fd[0] = (val & 0x1F) as usize;
                if self.latch[0] == Latch::Fd {
                    self.update_chr_bank(0);
                }
            }
            0xC000..=0xCFFF => {
                self.chr_fe[0] = (val & 0x1F) as usize;
                if self.latch[0] == Latch::Fe {
                    self.update_chr_bank(0);
                }
            }
            0xD000..=0xDFFF => {
                self.chr_fd[1] = (val & 0x1F) as usize;
                if self.latch[1] == Latch::Fd {
                    self.update_chr_bank(1);
                }
            }
            0xE000..=0xEFFF => {
                self.chr_fe[1] = (val & 0x1F) as usize;
                if self.latch[1] == Latch::Fe {
                    self.update_chr_bank(1);
                }
            }
            0xF000..=0xFFFF => {
                self.mirroring = if val & 0x01 == 0x01 {
                    Mirroring::Horizontal
                } else {
                    Mirroring::Vertical
                };
            }
            _ => {}
        }
        MappedWrite::Bus
    }
}

impl Reset for Pxrom {
    fn reset(&mut self, _kind: ResetKind) {
        self.latch = [Latch::Fe, Latch::Fe];
        self.in_magic_region = None;
        self.update_chr_bank(0);
        self.update_chr_bank(1);
    }
}

impl Clock for Pxrom {}
impl Regional for Pxrom {}
impl Sram for Pxrom {}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_pxrom() -> Pxrom {
        let mut cart = Cart::empty();
        cart.prg_rom = vec![0x00; Pxrom::PRG_ROM_WINDOW * 8];
        cart.chr_rom = vec![0x00; Pxrom::CHR_WINDOW * 4];
        let Mapper::Pxrom(pxrom) = Pxrom::load(&mut cart).expect("load") else {
            panic!("expected Pxrom")
        };
        pxrom
    }

    #[test]
    fn latch_flips_on_leaving_magic_address_not_entering() {
        let mut pxrom = new_pxrom();
        pxrom.map_write(0xC000, 3); // FE bank for half 0
        pxrom.map_write(0xB000, 1); // FD bank for half 0
        assert_eq!(pxrom.latch[0], Latch::Fe);
        assert_eq!(pxrom.chr_banks.page(0), 3);

        pxrom.ppu_tick(0x0FD4, 0); // inside the FD magic range: no flip yet
        assert_eq!(pxrom.chr_banks.page(0), 3);

        pxrom.ppu_tick(0x0000, 1); // leaving the FD range flips the latch
        assert_eq!(pxrom.latch[0], Latch::Fd);
        assert_eq!(pxrom.chr_banks.page(0), 1);
    }

    #[test]
    fn prg_bank_select_targets_switchable_window_only() {
        let mut pxrom = new_pxrom();
        let last = pxrom.prg_rom_banks.last();
        pxrom.map_write(0xA000, 0x02);
        assert_eq!(pxrom.prg_rom_banks.page(0), 2);
        assert_eq!(pxrom.prg_rom_banks.page(3), last);
    }

    #[test]
    fn f000_write_selects_mirroring() {
        let mut pxrom = new_pxrom();
        pxrom.map_write(0xF000, 1);
        assert_eq!(pxrom.mirroring(), Mirroring::Horizontal);
        pxrom.map_write(0xF000, 0);
        assert_eq!(pxrom.mirroring(), Mirroring::Vertical);
    }
}
