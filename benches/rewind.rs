#![allow(clippy::expect_used, reason = "fine in a benchmark")]

use criterion::{criterion_group, criterion_main, Criterion};
use nes_mapper_core::{prelude::*, state::N_REWIND_FRAMES};
use std::{hint::black_box, time::Duration};

fn synthetic_rom(prg_banks: u8, chr_banks: u8) -> Vec<u8> {
    let mut rom = vec![0x4E, 0x45, 0x53, 0x1A, prg_banks, chr_banks, 0x40, 0x00];
    rom.resize(16, 0x00);
    rom.resize(16 + usize::from(prg_banks) * 0x4000, 0x00);
    rom.resize(16 + usize::from(prg_banks) * 0x4000 + usize::from(chr_banks) * 0x2000, 0x00);
    rom
}

fn system_with_mmc3() -> System {
    let rom = synthetic_rom(16, 0);
    let cart = Cart::from_rom("bench", &mut rom.as_slice(), RamState::AllZeros).expect("valid rom");
    System::new(cart)
}

/// The cost of pushing one full snapshot per frame, the steady-state cost paid every emulated
/// video frame while rewind recording is active.
fn push_one_frame(c: &mut Criterion) {
    let mut system = system_with_mmc3();
    let mut states = SaveStates::new();
    states.init_save_states_for_rom(&mut system);

    let mut group = c.benchmark_group("rewind");
    group.measurement_time(Duration::from_secs(10));
    group.bench_function("push_state", |b| {
        b.iter(|| states.handle_rewind(black_box(&mut system), false));
    });
    group.finish();
}

/// The cost of stepping backwards once the ring already holds a full 30 seconds of history,
/// exercising `pop_state` plus the deserialize-on-load path together.
fn pop_and_load_with_full_ring(c: &mut Criterion) {
    let mut system = system_with_mmc3();
    let mut states = SaveStates::new();
    states.init_save_states_for_rom(&mut system);
    for _ in 0..N_REWIND_FRAMES {
        states.handle_rewind(&mut system, false);
    }

    let mut group = c.benchmark_group("rewind");
    group.measurement_time(Duration::from_secs(10));
    group.bench_function("pop_and_load", |b| {
        b.iter(|| {
            states.handle_rewind(black_box(&mut system), true);
            states.handle_rewind(black_box(&mut system), false);
        });
    });
    group.finish();
}

criterion_group!(benches, push_one_frame, pop_and_load_with_full_ring);
criterion_main!(benches);
