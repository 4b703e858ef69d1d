//! `ExROM`/`MMC5` (Mapper 5)
//!
//! <https://wiki.nesdev.com/w/index.php/ExROM>
//! <https://wiki.nesdev.com/w/index.php/MMC5>
//!
//! Audio (the Pulse/DMC channels MMC5 carries on real hardware) is out of scope here; this
//! mapper only implements banking, extended RAM, nametable remapping, and the scanline IRQ.
//! CPU-bus snooping of `$2000`/`$2001` (the real chip watches PPUCTRL/PPUMASK directly) has no
//! counterpart in this crate's model, where a mapper only ever sees cartridge-range addresses;
//! `sprite8x16` and the render-gated ExRAM write quirk are therefore simplified away.

use crate::{
    cart::Cart,
    common::{Clock, NesRegion, Regional, Reset, ResetKind, Sram},
    mapper::{self, Mapped, MappedRead, MappedWrite, Mapper, MemMap},
    mem::Banks,
    ppu::{Mirroring, PpuState},
};
use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use tracing::warn;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[must_use]
pub enum PrgMode {
    Bank32k,
    Bank16k,
    Bank16_8k,
    Bank8k,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[must_use]
pub enum ChrMode {
    Bank8k,
    Bank4k,
    Bank2k,
    Bank1k,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[must_use]
pub enum ChrBank {
    Spr,
    Bg,
}

bitflags! {
    #[derive(Default, Serialize, Deserialize, Debug, Copy, Clone, PartialEq, Eq)]
    #[must_use]
    pub struct ExRamRW: u8 {
        const W = 0x01;
        const R = 0x02;
        const RW = Self::R.bits() | Self::W.bits();
    }
}

#[derive(Debug, Copy, Clone, Serialize, Deserialize)]
#[must_use]
pub struct ExRamMode {
    bits: u8,
    nametable: bool,
    attr: bool,
    rw: ExRamRW,
}

impl Default for ExRamMode {
    fn default() -> Self {
        Self::new()
    }
}

impl ExRamMode {
    pub const fn new() -> Self {
        Self {
            bits: 0x00,
            nametable: false,
            attr: false,
            rw: ExRamRW::W,
        }
    }

    pub fn set(&mut self, val: u8) {
        let val = val & 0x03;
        self.bits = val;
        self.nametable = val <= 0b01;
        self.attr = val == 0b01;
        self.rw = match val {
            0b00 | 0b01 => ExRamRW::W,
            0b10 => ExRamRW::RW,
            0b11 => ExRamRW::R,
            _ => unreachable!("invalid exram_mode"),
        };
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[must_use]
pub enum Nametable {
    ScreenA,
    ScreenB,
    ExRam,
    Fill,
}

#[derive(Debug, Copy, Clone, Serialize, Deserialize)]
#[must_use]
pub struct NametableMapping {
    pub mode: u8,
    pub select: [Nametable; 4],
}

impl Default for NametableMapping {
    fn default() -> Self {
        Self::new()
    }
}

impl NametableMapping {
    pub const fn new() -> Self {
        Self {
            mode: 0x00,
            select: [Nametable::ScreenA; 4],
        }
    }

    pub fn set(&mut self, val: u8) {
        let nametable = |val: u8| match val & 0x03 {
            0 => Nametable::ScreenA,
            1 => Nametable::ScreenB,
            2 => Nametable::ExRam,
            3 => Nametable::Fill,
            _ => unreachable!("invalid Nametable value"),
        };
        self.mode = val;
        self.select = [
            nametable(val),
            nametable(val >> 2),
            nametable(val >> 4),
            nametable(val >> 6),
        ];
    }
}

#[derive(Debug, Copy, Clone, Serialize, Deserialize)]
#[must_use]
pub struct Fill {
    pub tile: u8,    // $5106
    pub attr: usize, // $5107
}

impl Default for Fill {
    fn default() -> Self {
        Self::new()
    }
}

impl Fill {
    pub const fn new() -> Self {
        Self {
            attr: 0x03,
            tile: 0xFF,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[must_use]
pub enum Side {
    Left,
    Right,
}

#[derive(Debug, Copy, Clone, Serialize, Deserialize)]
#[must_use]
pub struct VSplit {
    pub mode: u8,      // $5200 [ES.T TTTT]
    pub enabled: bool, // $5200 [E... ....]
    pub side: Side,    // $5200 [.S.. ....]
    pub tile: u8,      // $5200 [...T TTTT]
    pub scroll: u8,    // $5201
    pub bank: u8,      // $5202
    pub in_region: bool,
}

impl Default for VSplit {
    fn default() -> Self {
        Self::new()
    }
}

impl VSplit {
    pub const fn new() -> Self {
        Self {
            mode: 0x00,
            enabled: false,
            side: Side::Left,
            tile: 0x00,
            scroll: 0x00,
            bank: 0x00,
            in_region: false,
        }
    }
}

#[derive(Debug, Copy, Clone, Serialize, Deserialize)]
#[must_use]
pub struct Regs {
    pub prg_mode: PrgMode,                   // $5100
    pub chr_mode: ChrMode,                   // $5101
    pub prg_ram_protect: [u8; 2],            // $5102 - $5103
    pub exram_mode: ExRamMode,               // $5104
    pub nametable_mapping: NametableMapping, // $5105
    pub fill: Fill,                          // $5106 - $5107
    pub prg_banks: [usize; 5],               // $5113 - $5117
    pub chr_banks: [usize; 16],              // $5120 - $512B
    pub chr_hi: usize,                       // $5130
    pub vsplit: VSplit,                      // $5200 - $5202
    pub irq_scanline: u16,                   // $5203: Write $00 to disable IRQs
    pub irq_enabled: bool,                   // $5204
    pub multiplicand: u8,                    // $5205: write
    pub multiplier: u8,                      // $5206: write
    pub mult_result: u16,                    // $5205: read lo, $5206: read hi
}

impl Default for Regs {
    fn default() -> Self {
        Self::new()
    }
}

impl Regs {
    pub const fn new() -> Self {
        Self {
            prg_mode: PrgMode::Bank8k,
            chr_mode: ChrMode::Bank1k,
            prg_ram_protect: [0x00; 2],
            exram_mode: ExRamMode::new(),
            nametable_mapping: NametableMapping::new(),
            fill: Fill::new(),
            prg_banks: [0x00; 5],
            chr_banks: [0x00; 16],
            chr_hi: 0x00,
            vsplit: VSplit::new(),
            irq_scanline: 0x00,
            irq_enabled: false,
            multiplicand: 0xFF,
            multiplier: 0xFF,
            mult_result: 0xFE01, // e.g. 0xFF * 0xFF
        }
    }
}

#[derive(Debug, Copy, Clone, Serialize, Deserialize)]
#[must_use]
pub struct IrqState {
    pub in_frame: bool,
    pub prev_addr: Option<u16>,
    pub match_count: u8,
    pub pending: bool,
}

#[derive(Debug, Copy, Clone, Serialize, Deserialize)]
#[must_use]
pub struct PpuStatus {
    pub fetch_count: u32,
    pub sprite8x16: bool, // always false: nothing in this model can snoop PPUCTRL ($2000)
    pub scanline: u16,
}

#[derive(Clone, Serialize, Deserialize)]
#[must_use]
pub struct Exrom {
    pub regs: Regs,
    pub mirroring: Mirroring,
    pub ppu_status: PpuStatus,
    pub irq_state: IrqState,
    pub ex_ram: Vec<u8>,
    pub prg_ram_banks: Banks,
    pub prg_rom_banks: Banks,
    pub chr_banks: Banks,
    pub tile_cache: u16,
    pub last_chr_write: ChrBank,
    pub region: NesRegion,
}

impl Exrom {
    const PRG_WINDOW: usize = 0x2000;
    const PRG_RAM_SIZE: usize = 0x10000; // Provide 64K since mappers don't always specify
    const EXRAM_SIZE: usize = 0x0400;
    const CHR_WINDOW: usize = 0x0400;

    const ROM_SELECT_MASK: usize = 0x80; // High bit targets ROM bank switching
    const BANK_MASK: usize = 0x7F; // Ignore high bit for ROM select

    const SPR_FETCH_START: u32 = 64;
    const SPR_FETCH_END: u32 = 81;

    // This conveniently mirrors a 2-bit palette attribute to all four indexes
    // https://www.nesdev.org/wiki/MMC5#Fill-mode_color_($5107)
    const ATTR_MIRROR: [u8; 4] = [0x00, 0x55, 0xAA, 0xFF];

    pub fn load(cart: &mut Cart) -> Result<Mapper, mapper::Error> {
        cart.add_prg_ram(Self::PRG_RAM_SIZE);

        let mut exrom = Self {
            regs: Regs::new(),
            mirroring: cart.mirroring(),
            irq_state: IrqState {
                in_frame: false,
                prev_addr: None,
                match_count: 0,
                pending: false,
            },
            ppu_status: PpuStatus {
                fetch_count: 0x00,
                sprite8x16: false,
                scanline: 0x0000,
            },
            // Cart provides an `add_ex_ram` method used by the PpuBus, but during reads from the
            // PpuBus we need access to it for bank selection so we need to store it here instead.
            ex_ram: vec![0x00; Self::EXRAM_SIZE],
            prg_ram_banks: Banks::new(0x6000, 0xFFFF, cart.prg_ram.len(), Self::PRG_WINDOW)?,
            prg_rom_banks: Banks::new(0x8000, 0xFFFF, cart.prg_rom.len(), Self::PRG_WINDOW)?,
            chr_banks: Banks::new(0x0000, 0x1FFF, cart.chr_rom.len(), Self::CHR_WINDOW)?,
            tile_cache: 0,
            last_chr_write: ChrBank::Spr,
            region: cart.region(),
        };
        exrom.regs.prg_banks[4] = exrom.prg_rom_banks.last() | Self::ROM_SELECT_MASK;
        exrom.update_prg_banks();
        Ok(exrom.into())
    }

    const fn is_attr(addr: u16) -> bool {
        addr & 0x03FF >= 0x03C0
    }

    //              $6000   $8000   $A000   $C000   $E000
    //            +-------+-------------------------------+
    // P=%00:     | $5113 |           <<$5117>>           |
    //            +-------+-------------------------------+
    // P=%01:     | $5113 |    <$5115>    |    <$5117>    |
    //            +-------+---------------+-------+-------+
    // P=%10:     | $5113 |    <$5115>    | $5116 | $5117 |
    //            +-------+---------------+-------+-------+
    // P=%11:     | $5113 | $5114 | $5115 | $5116 | $5117 |
    //            +-------+-------+-------+-------+-------+
    pub fn update_prg_banks(&mut self) {
        let mode = self.regs.prg_mode;
        let banks = self.regs.prg_banks;

        self.prg_ram_banks.set(0, banks[0]); // $5113 always selects RAM
        match mode {
            // $5117 always selects ROM
            PrgMode::Bank32k => self.prg_rom_banks.set_range(0, 3, banks[4]),
            PrgMode::Bank16k => {
                self.set_prg_bank_range(0, 1, banks[2]);
                self.prg_rom_banks
                    .set_range(2, 3, banks[4] & Self::BANK_MASK);
            }
            PrgMode::Bank16_8k => {
                self.set_prg_bank_range(0, 1, banks[2]);
                self.set_prg_bank_range(2, 2, banks[3]);
                self.prg_rom_banks.set(3, banks[4] & Self::BANK_MASK);
            }
            PrgMode::Bank8k => {
                self.set_prg_bank_range(0, 0, banks[1]);
                self.set_prg_bank_range(1, 1, banks[2]);
                self.set_prg_bank_range(2, 2, banks[3]);
                self.prg_rom_banks.set(3, banks[4] & Self::BANK_MASK);
            }
        };
    }

    pub fn set_prg_bank_range(&mut self, start: usize, end: usize, bank: usize) {
        let rom = bank & Self::ROM_SELECT_MASK == Self::ROM_SELECT_MASK;
        let bank = bank & Self::BANK_MASK;
        if rom {
            self.prg_rom_banks.set_range(start, end, bank);
        } else {
            self.prg_ram_banks.set_range(start + 1, end + 1, bank);
        }
    }

    pub fn rom_select(&self, addr: u16) -> bool {
        let mode = self.regs.prg_mode;
        if matches!(addr, 0x6000..=0x7FFF) {
            false
        } else if matches!(addr, 0xE000..=0xFFFF) || mode == PrgMode::Bank32k {
            true
        } else {
            use PrgMode::{Bank16_8k, Bank16k, Bank8k};
            let banks = self.regs.prg_banks;
            let bank = match (addr, mode) {
                (0x8000..=0x9FFF, Bank8k) => banks[1],
                (0x8000..=0xBFFF, Bank16k | Bank16_8k) | (0xA000..=0xBFFF, Bank8k) => banks[2],
                (0xC000..=0xDFFF, Bank8k | Bank16_8k) => banks[3],
                (0xC000..=0xDFFF, Bank16k) => banks[4],
                _ => 0x00,
            };
            bank & Self::ROM_SELECT_MASK == Self::ROM_SELECT_MASK
        }
    }

    // 'A' Set (Sprites):
    //               $0000   $0400   $0800   $0C00   $1000   $1400   $1800   $1C00
    //             +---------------------------------------------------------------+
    //   C=%00:    |                             $5127                             |
    //             +---------------------------------------------------------------+
    //   C=%01:    |             $5123             |             $5127             |
    //             +-------------------------------+-------------------------------+
    //   C=%10:    |     $5121     |     $5123     |     $5125     |     $5127     |
    //             +---------------+---------------+---------------+---------------+
    //   C=%11:    | $5120 | $5121 | $5122 | $5123 | $5124 | $5125 | $5126 | $5127 |
    //             +-------+-------+-------+-------+-------+-------+-------+-------+
    //
    // 'B' Set (BG):
    //               $0000   $0400   $0800   $0C00   $1000   $1400   $1800   $1C00
    //             +-------------------------------+-------------------------------+
    //   C=%00:    |                             $512B                             |
    //             +-------------------------------+-------------------------------+
    //   C=%01:    |             $512B             |             $512B             |
    //             +-------------------------------+-------------------------------+
    //   C=%10:    |     $5129     |     $512B     |     $5129     |     $512B     |
    //             +---------------+---------------+---------------+---------------+
    //   C=%11:    | $5128 | $5129 | $512A | $512B | $5128 | $5129 | $512A | $512B |
    //             +-------+-------+-------+-------+-------+-------+-------+-------+
    pub fn update_chr_banks(&mut self, chr_bank: ChrBank) {
        let hi = self.regs.chr_hi;
        let banks = match chr_bank {
            ChrBank::Spr => &self.regs.chr_banks[0..8],
            ChrBank::Bg => &self.regs.chr_banks[8..16],
        };
        // CHR banks are in actual page sizes which means they need to be shifted appropriately
        match self.regs.chr_mode {
            ChrMode::Bank8k => self.chr_banks.set_range(0, 7, hi | banks[7] << 3),
            ChrMode::Bank4k => {
                self.chr_banks.set_range(0, 3, hi | banks[3] << 2);
                self.chr_banks.set_range(4, 7, hi | banks[7] << 2);
            }
            ChrMode::Bank2k => {
                self.chr_banks.set_range(0, 1, hi | banks[1] << 1);
                self.chr_banks.set_range(2, 3, hi | banks[3] << 1);
                self.chr_banks.set_range(4, 5, hi | banks[5] << 1);
                self.chr_banks.set_range(6, 7, hi | banks[7] << 1);
            }
            ChrMode::Bank1k => {
                self.chr_banks.set(0, hi | banks[0]);
                self.chr_banks.set(1, hi | banks[1]);
                self.chr_banks.set(2, hi | banks[2]);
                self.chr_banks.set(3, hi | banks[3]);
                self.chr_banks.set(4, hi | banks[4]);
                self.chr_banks.set(5, hi | banks[5]);
                self.chr_banks.set(6, hi | banks[6]);
                self.chr_banks.set(7, hi | banks[7]);
            }
        };
    }

    pub fn read_ex_ram(&self, addr: u16) -> u8 {
        self.ex_ram[(addr & 0x03FF) as usize]
    }

    pub fn write_ex_ram(&mut self, addr: u16, val: u8) {
        self.ex_ram[(addr & 0x03FF) as usize] = val;
    }

    pub fn inc_fetch_count(&mut self) {
        self.ppu_status.fetch_count += 1;
    }

    pub const fn fetch_count(&self) -> u32 {
        self.ppu_status.fetch_count
    }

    pub const fn sprite8x16(&self) -> bool {
        self.ppu_status.sprite8x16
    }

    pub fn spr_fetch(&self) -> bool {
        (Self::SPR_FETCH_START..Self::SPR_FETCH_END).contains(&self.fetch_count())
    }

    pub const fn nametable_select(&self, addr: u16) -> Nametable {
        self.regs.nametable_mapping.select[((addr >> 10) & 0x03) as usize]
    }
}

impl Mapped for Exrom {
    fn mirroring(&self) -> Mirroring {
        self.mirroring
    }

    fn set_mirroring(&mut self, mirroring: Mirroring) {
        self.mirroring = mirroring;
    }

    /// Drives CHR-latch fetch counting and the scanline-IRQ detector from the PPU address bus,
    /// the same signal the real chip watches (not A12, unlike MMC3): three consecutive identical
    /// addresses in the nametable range mark the dummy fetches at the end of a scanline.
    /// <https://wiki.nesdev.org/w/index.php?title=MMC5#Scanline_Detection_and_Scanline_IRQ>
    fn ppu_tick(&mut self, addr: u16, _cycle: u64) {
        match addr {
            0x0000..=0x1FFF => {
                self.inc_fetch_count();
                if self.sprite8x16() {
                    match self.fetch_count() {
                        Self::SPR_FETCH_START => self.update_chr_banks(ChrBank::Spr),
                        Self::SPR_FETCH_END => self.update_chr_banks(ChrBank::Bg),
                        _ => (),
                    }
                }
            }
            0x2000..=0x3EFF => {
                if addr <= 0x2FFF && Some(addr) == self.irq_state.prev_addr {
                    self.irq_state.match_count += 1;
                    self.ppu_status.fetch_count = 0;
                    if self.irq_state.match_count == 2 {
                        if self.irq_state.in_frame {
                            self.ppu_status.scanline += 1;
                            if self.ppu_status.scanline == self.regs.irq_scanline {
                                self.irq_state.pending = true;
                            }
                        } else {
                            self.irq_state.in_frame = true;
                            self.ppu_status.scanline = 0;
                        }
                    }
                } else {
                    self.irq_state.match_count = 0;
                }
                self.irq_state.prev_addr = Some(addr);
            }
            0xFFFA | 0xFFFB => {
                // NMI vector fetch: a new frame is starting, so any in-progress scanline count
                // from the prior frame no longer applies.
                self.irq_state.in_frame = false;
                self.irq_state.prev_addr = None;
                self.irq_state.pending = false;
            }
            _ => {}
        }
    }

    fn irq_pending(&self) -> bool {
        self.irq_state.pending && self.regs.irq_enabled
    }

    fn nt_read(&mut self, addr: u16, ciram: &[u8]) -> u8 {
        let is_attr = Self::is_attr(addr);
        if self.regs.exram_mode.attr && !is_attr && !self.spr_fetch() {
            self.tile_cache = addr & 0x03FF;
        }
        if self.regs.exram_mode.attr && is_attr && !self.spr_fetch() {
            // ExAttr mode returns attr bits for all nametables, regardless of mapping
            let attr = (self.read_ex_ram(self.tile_cache) >> 6) & 0x03;
            return Self::ATTR_MIRROR[attr as usize];
        }
        let nametable_mode = self.regs.exram_mode.nametable;
        match self.nametable_select(addr) {
            Nametable::ScreenA => ciram[(addr & 0x03FF) as usize],
            Nametable::ScreenB => ciram[(PpuState::NT_SIZE + (addr & 0x03FF)) as usize],
            Nametable::ExRam if nametable_mode => self.read_ex_ram(addr),
            Nametable::Fill if nametable_mode => {
                if is_attr {
                    Self::ATTR_MIRROR[self.regs.fill.attr & 0x03]
                } else {
                    self.regs.fill.tile
                }
            }
            // If nametable mode is not set, zero is read back
            _ => 0x00,
        }
    }

    fn nt_write(&mut self, addr: u16, val: u8, ciram: &mut [u8]) {
        match self.nametable_select(addr) {
            Nametable::ScreenA => ciram[(addr & 0x03FF) as usize] = val,
            Nametable::ScreenB => {
                ciram[(PpuState::NT_SIZE + (addr & 0x03FF)) as usize] = val;
            }
            Nametable::ExRam if self.regs.exram_mode.nametable => self.write_ex_ram(addr, val),
            _ => {}
        }
    }
}

impl MemMap for Exrom {
    // CHR mode 0
    // PPU $0000..=$1FFF 8K switchable CHR bank
    //
    // CHR mode 1
    // PPU $0000..=$0FFF 4K switchable CHR bank
    // PPU $1000..=$1FFF 4K switchable CHR bank
    //
    // CHR mode 2
    // PPU $0000..=$07FF 2K switchable CHR bank
    // PPU $0800..=$0FFF 2K switchable CHR bank
    // PPU $1000..=$17FF 2K switchable CHR bank
    // PPU $1800..=$1FFF 2K switchable CHR bank
    //
    // CHR mode 3
    // PPU $0000..=$03FF 1K switchable CHR bank
    // PPU $0400..=$07FF 1K switchable CHR bank
    // PPU $0800..=$0BFF 1K switchable CHR bank
    // PPU $0C00..=$0FFF 1K switchable CHR bank
    // PPU $1000..=$13FF 1K switchable CHR bank
    // PPU $1400..=$17FF 1K switchable CHR bank
    // PPU $1800..=$1BFF 1K switchable CHR bank
    // PPU $1C00..=$1FFF 1K switchable CHR bank
    //
    // PPU $2000..=$3EFF Up to 3 Nametables + Fill mode (handled via `Mapped::nt_read`/`nt_write`)
    //
    // PRG mode 0
    // CPU $6000..=$7FFF 8K switchable PRG RAM bank
    // CPU $8000..=$FFFF 32K switchable PRG ROM bank
    //
    // PRG mode 1
    // CPU $6000..=$7FFF 8K switchable PRG RAM bank
    // CPU $8000..=$BFFF 16K switchable PRG ROM/RAM bank
    // CPU $C000..=$FFFF 16K switchable PRG ROM bank
    //
    // PRG mode 2
    // CPU $6000..=$7FFF 8K switchable PRG RAM bank
    // CPU $8000..=$BFFF 16K switchable PRG ROM/RAM bank
    // CPU $C000..=$DFFF 8K switchable PRG ROM/RAM bank
    // CPU $E000..=$FFFF 8K switchable PRG ROM bank
    //
    // PRG mode 3
    // CPU $6000..=$7FFF 8K switchable PRG RAM bank
    // CPU $8000..=$9FFF 8K switchable PRG ROM/RAM bank
    // CPU $A000..=$BFFF 8K switchable PRG ROM/RAM bank
    // CPU $C000..=$DFFF 8K switchable PRG ROM/RAM bank
    // CPU $E000..=$FFFF 8K switchable PRG ROM bank

    fn map_read(&mut self, addr: u16) -> MappedRead {
        let val = self.map_peek(addr);
        match addr {
            0x5204 => self.irq_state.pending = false,
            _ => (),
        }
        val
    }

    fn map_peek(&self, addr: u16) -> MappedRead {
        match addr {
            0x0000..=0x1FFF => {
                if self.regs.exram_mode.attr && !self.spr_fetch() {
                    // Bits 6-7 of 4K CHR bank. Already shifted left by 8
                    let bank_hi = self.regs.chr_hi << 10;
                    // Bits 0-5 of 4k CHR bank
                    let bank_lo = ((self.read_ex_ram(self.tile_cache) & 0x3F) as usize) << 12;
                    let addr = bank_hi | bank_lo | (addr as usize) & 0x0FFF;
                    MappedRead::Chr(addr)
                } else {
                    MappedRead::Chr(self.chr_banks.translate(addr))
                }
            }
            0x5100 => MappedRead::Data(self.regs.prg_mode as u8),
            0x5101 => MappedRead::Data(self.regs.chr_mode as u8),
            0x5104 => MappedRead::Data(self.regs.exram_mode.bits),
            0x5105 => MappedRead::Data(self.regs.nametable_mapping.mode),
            0x5106 => MappedRead::Data(self.regs.fill.tile),
            0x5107 => MappedRead::Data(self.regs.fill.attr as u8),
            0x5113..=0x5117 => {
                MappedRead::Data(self.regs.prg_banks[(addr - 0x5113) as usize] as u8)
            }
            0x5120..=0x512B => {
                MappedRead::Data(self.regs.chr_banks[(addr - 0x5120) as usize] as u8)
            }
            0x5130 => MappedRead::Data(self.regs.chr_hi as u8),
            0x5200 => MappedRead::Data(self.regs.vsplit.mode),
            0x5201 => MappedRead::Data(self.regs.vsplit.scroll),
            0x5202 => MappedRead::Data(self.regs.vsplit.bank),
            0x5203 => MappedRead::Data(self.regs.irq_scanline as u8),
            0x5204 => {
                // $5204:  [PI.. ....]
                //   P = IRQ currently pending
                //   I = "In Frame" signal
                // Reading $5204 clears the pending flag (acknowledging the IRQ).
                MappedRead::Data(
                    u8::from(self.irq_state.pending) << 7 | u8::from(self.irq_state.in_frame) << 6,
                )
            }
            0x5205 => MappedRead::Data((self.regs.mult_result & 0xFF) as u8),
            0x5206 => MappedRead::Data(((self.regs.mult_result >> 8) & 0xFF) as u8),
            0x5C00..=0x5FFF if self.regs.exram_mode.rw != ExRamRW::W => {
                // Nametable/Attr modes are not used for RAM, thus are not readable
                MappedRead::Data(self.read_ex_ram(addr))
            }
            0x6000..=0xDFFF => {
                if self.rom_select(addr) {
                    MappedRead::PrgRom(self.prg_rom_banks.translate(addr))
                } else {
                    MappedRead::PrgRam(self.prg_ram_banks.translate(addr))
                }
            }
            0xE000..=0xFFFF => MappedRead::PrgRom(self.prg_rom_banks.translate(addr)),
            0x5207..=0x5209 => MappedRead::Data(0),
            _ => MappedRead::Bus,
        }
    }

    fn map_write(&mut self, addr: u16, val: u8) -> MappedWrite {
        match addr {
            0x5100 => {
                // [.... ..PP] PRG Mode
                self.regs.prg_mode = match val & 0x03 {
                    0 => PrgMode::Bank32k,
                    1 => PrgMode::Bank16k,
                    2 => PrgMode::Bank16_8k,
                    3 => PrgMode::Bank8k,
                    _ => {
                        warn!("invalid PrgMode value: ${:02X}", val);
                        self.regs.prg_mode
                    }
                };
                self.update_prg_banks();
            }
            0x5101 => {
                // [.... ..CC] CHR Mode
                if self.regs.exram_mode.attr {
                    // Bank switching is ignored in extended attribute mode, banks are always 4K
                    self.regs.chr_mode = ChrMode::Bank4k;
                } else {
                    self.regs.chr_mode = match val & 0x03 {
                        0 => ChrMode::Bank8k,
                        1 => ChrMode::Bank4k,
                        2 => ChrMode::Bank2k,
                        3 => ChrMode::Bank1k,
                        _ => {
                            warn!("invalid ChrMode value: ${:02X}", val);
                            self.regs.chr_mode
                        }
                    };
                }
                self.update_chr_banks(self.last_chr_write);
            }
            0x5102 | 0x5103 => {
                // [.... ..AA]    PRG-RAM Protect A
                // [.... ..BB]    PRG-RAM Protect B
                self.regs.prg_ram_protect[(addr - 0x5102) as usize] = val & 0x03;
                // To allow writing to PRG-RAM you must set:
                //    A=%10
                //    B=%01
                // Any other value will prevent PRG-RAM writing.
                let writable =
                    self.regs.prg_ram_protect[0] == 0b10 && self.regs.prg_ram_protect[1] == 0b01;
                return MappedWrite::PrgRamProtect(!writable);
            }
            0x5104 => {
                // [.... ..XX] ExRam mode
                //   Value  RAM $5C00-$5FFF  RAM Nametable  Extended Attr
                //   %00    Write Only       Yes            No
                //   %01    Write Only       Yes            Yes
                //   %10    Read/Write       No             No
                //   %11    Read Only        No             No
                self.regs.exram_mode.set(val);
            }
            0x5105 => {
                // [.... ..HH]
                // [DDCC BBAA]
                //
                // Allows each Nametable slot to be configured:
                //   [   A   ][   B   ]
                //   [   C   ][   D   ]
                //
                // Values can be the following:
                //   %00 = NES internal NTA
                //   %01 = NES internal NTB
                //   %10 = use ExRAM as NT
                //   %11 = Fill Mode
                self.regs.nametable_mapping.set(val);

                // Typical mirroring setups would be:
                //                          D  C  B  A
                //   Horizontal:     $50    01 01 00 00
                //   Vertical:       $44    01 00 01 00
                //   SingleScreenA:  $00    00 00 00 00
                //   SingleScreenB:  $55    01 01 01 01
                //   SingleScreen ExRAM:   $AA    10 10 10 10
                //   SingleScreen Fill:    $FF    11 11 11 11
                self.mirroring = match val {
                    0x50 => Mirroring::Horizontal,
                    0x44 => Mirroring::Vertical,
                    0x00 => Mirroring::SingleScreenA,
                    0x55 => Mirroring::SingleScreenB,
                    // Any other combination means Mapper provides nametables
                    _ => Mirroring::FourScreen,
                };
            }
            0x5106 => self.regs.fill.tile = val, // [TTTT TTTT] Fill Tile
            0x5107 => self.regs.fill.attr = (val & 0x03).into(), // [.... ..AA] Fill Attribute bits
            0x5113..=0x5117 => {
                // PRG Bank Switching
                // $5113: [.... .PPP]
                //      8k PRG-RAM @ $6000
                // $5114-5117: [RPPP PPPP]
                //      R = ROM select (0=select RAM, 1=select ROM)  **unused in $5117**
                //      P = PRG page
                let bank = (addr - 0x5113) as usize;
                self.regs.prg_banks[bank] = val as usize;
                self.update_prg_banks();
            }
            0x5120..=0x512B => {
                let bank = (addr - 0x5120) as usize;
                self.regs.chr_banks[bank] = val as usize;
                if addr < 0x5128 {
                    self.update_chr_banks(ChrBank::Spr);
                } else {
                    // Mirroring BG
                    self.regs.chr_banks[bank + 4] = self.regs.chr_banks[bank];
                    self.update_chr_banks(ChrBank::Bg);
                }
            }
            0x5130 => self.regs.chr_hi = (val as usize & 0x03) << 8, // [.... ..HH]  CHR Bank Hi bits
            0x5200 => {
                // [ES.T TTTT]    Split control
                //   E = Enable  (0=split mode disabled, 1=split mode enabled)
                //   S = Vsplit side  (0=split will be on left side, 1=split will be on right)
                //   T = tile number to split at
                self.regs.vsplit.enabled = val & 0x80 == 0x80;
                self.regs.vsplit.side = if val & 0x40 == 0x40 {
                    Side::Right
                } else {
                    Side::Left
                };
                self.regs.vsplit.tile = val & 0x1F;
            }
            0x5201 => self.regs.vsplit.scroll = val, // [YYYY YYYY]  Split Y scroll
            0x5202 => self.regs.vsplit.bank = val,   // [CCCC CCCC]  4k CHR Page for split
            0x5203 => self.regs.irq_scanline = u16::from(val), // [IIII IIII]  IRQ Target
            0x5204 => {
                self.regs.irq_enabled = val & 0x80 > 0; // [E... ....] IRQ Enable (0=disabled, 1=enabled)
            }
            0x5205 => {
                self.regs.multiplicand = val;
                self.regs.mult_result =
                    u16::from(self.regs.multiplicand) * u16::from(self.regs.multiplier);
            }
            0x5206 => {
                self.regs.multiplier = val;
                self.regs.mult_result =
                    u16::from(self.regs.multiplicand) * u16::from(self.regs.multiplier);
            }
            0x5207..=0x5209 => {}
            0x5C00..=0x5FFF => match self.regs.exram_mode.rw {
                ExRamRW::W | ExRamRW::RW => self.write_ex_ram(addr, val),
                _ => (),
            },
            0x6000..=0xDFFF if !self.rom_select(addr) => {
                return MappedWrite::PrgRam(self.prg_ram_banks.translate(addr), val);
            }
            _ => (),
        }
        MappedWrite::Bus
    }
}

impl Reset for Exrom {
    fn reset(&mut self, _kind: ResetKind) {
        self.regs.prg_mode = PrgMode::Bank8k;
        self.regs.chr_mode = ChrMode::Bank1k;
    }
}

impl Clock for Exrom {}

impl Regional for Exrom {
    fn region(&self) -> NesRegion {
        self.region
    }

    fn set_region(&mut self, region: NesRegion) {
        self.region = region;
    }
}

impl Sram for Exrom {}

impl std::fmt::Debug for Exrom {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Exrom")
            .field("regs", &self.regs)
            .field("mirroring", &self.mirroring)
            .field("ppu_status", &self.ppu_status)
            .field("irq_state", &self.irq_state)
            .field("exram_len", &self.ex_ram.len())
            .field("prg_ram_banks", &self.prg_ram_banks)
            .field("prg_rom_banks", &self.prg_rom_banks)
            .field("chr_banks", &self.chr_banks)
            .field("tile_cache", &self.tile_cache)
            .field("last_chr_write", &self.last_chr_write)
            .field("region", &self.region)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cart::Cart;

    fn new_exrom() -> Exrom {
        let mut cart = Cart::empty();
        cart.prg_rom = vec![0; 8 * Exrom::PRG_WINDOW];
        cart.chr_rom = vec![0; 32 * Exrom::CHR_WINDOW];
        match Exrom::load(&mut cart).expect("valid mapper") {
            Mapper::Exrom(exrom) => exrom,
            _ => unreachable!("Exrom::load always returns Mapper::Exrom"),
        }
    }

    #[test]
    fn scanline_irq_fires_after_two_dummy_fetches_at_target() {
        let mut exrom = new_exrom();
        exrom.map_write(0x5203, 1); // irq target scanline 1
        exrom.map_write(0x5204, 0x80); // irq enabled
        exrom.ppu_tick(0xFFFA, 0); // frame start
        // One visible scanline's worth of distinct nametable fetches, then two repeats
        // of the same address mark the end-of-scanline dummy fetch.
        exrom.ppu_tick(0x2000, 1);
        exrom.ppu_tick(0x21C0, 2);
        exrom.ppu_tick(0x21C0, 3);
        assert!(exrom.irq_state.in_frame);
        exrom.ppu_tick(0x2000, 4);
        exrom.ppu_tick(0x2300, 5);
        exrom.ppu_tick(0x2300, 6);
        assert!(exrom.irq_pending());
    }

    #[test]
    fn reading_5204_acknowledges_pending_irq() {
        let mut exrom = new_exrom();
        exrom.map_write(0x5204, 0x80);
        exrom.irq_state.pending = true;
        assert!(exrom.irq_pending());
        exrom.map_read(0x5204);
        assert!(!exrom.irq_pending());
    }

    #[test]
    fn multiplier_computes_product() {
        let mut exrom = new_exrom();
        exrom.map_write(0x5205, 6);
        exrom.map_write(0x5206, 7);
        assert_eq!(exrom.regs.mult_result, 42);
    }

    #[test]
    fn nametable_remaps_to_ciram_screen_b() {
        let mut exrom = new_exrom();
        exrom.map_write(0x5105, 0x55); // all four slots -> ScreenB
        let mut ciram = [0u8; PpuState::CIRAM_SIZE];
        exrom.nt_write(0x2000, 0x42, &mut ciram);
        assert_eq!(ciram[PpuState::NT_SIZE as usize], 0x42);
        assert_eq!(exrom.nt_read(0x2000, &ciram), 0x42);
    }
}
