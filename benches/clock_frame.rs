#![allow(clippy::expect_used, reason = "fine in a benchmark")]

use criterion::{criterion_group, criterion_main, Criterion};
use nes_mapper_core::prelude::*;
use std::{hint::black_box, time::Duration};

fn synthetic_rom(mapper_num: u16, prg_banks: u8, chr_banks: u8) -> Vec<u8> {
    let mapper_lo = (mapper_num & 0x0F) as u8;
    let mapper_hi = ((mapper_num >> 4) & 0x0F) as u8;
    let mut rom = vec![0x4E, 0x45, 0x53, 0x1A, prg_banks, chr_banks, mapper_lo << 4, mapper_hi << 4];
    rom.resize(16, 0x00);
    rom.resize(16 + usize::from(prg_banks) * 0x4000, 0x00);
    rom.resize(16 + usize::from(prg_banks) * 0x4000 + usize::from(chr_banks) * 0x2000, 0x00);
    rom
}

fn clock_one_frame(system: &mut System) {
    for dot in 0..89_342u32 {
        let addr = (dot % 0x3FFF) as u16;
        system.ppu.tick(addr, system.cart.mapper_mut());
    }
}

/// MMC3 is the supported mapper with the most per-cycle work (A12 edge detection, IRQ counter),
/// so it stands in for a worst-case PPU-tick cost across a whole frame's worth of dots.
fn mmc3_frame(c: &mut Criterion) {
    let rom = synthetic_rom(4, 16, 0);
    let cart = Cart::from_rom("bench", &mut rom.as_slice(), RamState::AllZeros).expect("valid rom");
    let mut system = System::new(cart);

    let mut group = c.benchmark_group("clock_frame");
    group.measurement_time(Duration::from_secs(10));
    group.bench_function("mmc3", |b| {
        b.iter(|| clock_one_frame(black_box(&mut system)));
    });
    group.finish();
}

/// NROM does no per-cycle bookkeeping at all, giving a lower bound for `ppu_tick` dispatch cost
/// through the `enum_dispatch` table.
fn nrom_frame(c: &mut Criterion) {
    let rom = synthetic_rom(0, 2, 1);
    let cart = Cart::from_rom("bench", &mut rom.as_slice(), RamState::AllZeros).expect("valid rom");
    let mut system = System::new(cart);

    let mut group = c.benchmark_group("clock_frame");
    group.measurement_time(Duration::from_secs(10));
    group.bench_function("nrom", |b| {
        b.iter(|| clock_one_frame(black_box(&mut system)));
    });
    group.finish();
}

criterion_group!(benches, nrom_frame, mmc3_frame);
criterion_main!(benches);
