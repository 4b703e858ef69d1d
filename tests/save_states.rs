//! End-to-end exercises of the save-state/rewind engine against a real loaded cartridge, covering
//! the save/load round-trip and the rewind direction-flip seam.

use nes_mapper_core::prelude::*;

fn synthetic_rom(mapper_num: u16, prg_banks: u8, chr_banks: u8) -> Vec<u8> {
    let mapper_lo = (mapper_num & 0x0F) as u8;
    let mapper_hi = ((mapper_num >> 4) & 0x0F) as u8;
    let mut rom = vec![0x4E, 0x45, 0x53, 0x1A, prg_banks, chr_banks, mapper_lo << 4, mapper_hi << 4];
    rom.resize(16, 0x00);
    rom.resize(16 + usize::from(prg_banks) * 0x4000, 0x00);
    rom.resize(16 + usize::from(prg_banks) * 0x4000 + usize::from(chr_banks) * 0x2000, 0x00);
    rom
}

fn run_one_frame(system: &mut System) {
    system.apu.cycle += 1;
    system.cpu.cpu_data_bus = system.cpu.cpu_data_bus.wrapping_add(1);
    for dot in 0..341u16 {
        system.ppu.tick(dot, system.cart.mapper_mut());
    }
}

/// S5: running N frames, saving, running M more, then loading must make the next outputs
/// identical to those right after the save.
#[test]
fn save_then_load_restores_exact_prior_output() {
    let rom = synthetic_rom(4, 16, 0);
    let cart = Cart::from_rom("s5", &mut rom.as_slice(), RamState::AllZeros).expect("valid rom");
    let mut system = System::new(cart);

    let mut states = SaveStates::new();
    states.init_save_states_for_rom(&mut system);

    for _ in 0..60 {
        run_one_frame(&mut system);
    }
    states.save_state(&mut system);
    let saved_apu_cycle = system.apu.cycle;
    let saved_cpu_bus = system.cpu.cpu_data_bus;
    let saved_ppu_cycle = system.ppu.ppu_cycle;

    for _ in 0..30 {
        run_one_frame(&mut system);
    }
    assert_ne!(system.apu.cycle, saved_apu_cycle);

    states.load_state(&mut system);
    assert_eq!(system.apu.cycle, saved_apu_cycle);
    assert_eq!(system.cpu.cpu_data_bus, saved_cpu_bus);
    assert_eq!(system.ppu.ppu_cycle, saved_ppu_cycle);

    // The very next frame after a load must behave exactly as it did right after the save.
    run_one_frame(&mut system);
    let next_apu_cycle = system.apu.cycle;
    states.load_state(&mut system);
    run_one_frame(&mut system);
    assert_eq!(system.apu.cycle, next_apu_cycle);
}

/// S6: 120 forward frames, five `handle_rewind(true)` calls, then one `handle_rewind(false)`. The
/// flip back to forward must replay the current top frame once rather than skip ahead.
#[test]
fn rewind_seam_replays_current_frame_once_on_direction_flip() {
    let rom = synthetic_rom(0, 2, 1);
    let cart = Cart::from_rom("s6", &mut rom.as_slice(), RamState::AllZeros).expect("valid rom");
    let mut system = System::new(cart);

    let mut states = SaveStates::new();
    states.init_save_states_for_rom(&mut system);

    for frame in 0..120u32 {
        system.apu.cycle = u64::from(frame);
        states.handle_rewind(&mut system, false);
        states.save_audio_frame_length(1000);
    }
    assert_eq!(system.apu.cycle, 119);

    for _ in 0..5 {
        states.handle_rewind(&mut system, true);
    }
    let cycle_at_end_of_rewind = system.apu.cycle;
    assert!(cycle_at_end_of_rewind < 119);

    states.handle_rewind(&mut system, false);
    assert_eq!(
        system.apu.cycle, cycle_at_end_of_rewind,
        "first forward frame after a rewind flip must replay the top frame, not advance past it"
    );
}

/// A loaded ROM's rewind ring survives an explicit `deinit`/`init` cycle (e.g. loading a new ROM)
/// without carrying over stale frames from the previous cartridge.
#[test]
fn reinitializing_save_states_clears_prior_rewind_history() {
    let rom = synthetic_rom(2, 4, 0);
    let cart = Cart::from_rom("reload", &mut rom.as_slice(), RamState::AllZeros).expect("valid rom");
    let mut system = System::new(cart);

    let mut states = SaveStates::new();
    states.init_save_states_for_rom(&mut system);
    for _ in 0..10 {
        states.handle_rewind(&mut system, false);
    }
    assert_eq!(states.rewind().unwrap().n_recorded_frames(), 10);

    states.deinit_save_states_for_rom();
    states.init_save_states_for_rom(&mut system);
    assert_eq!(states.rewind().unwrap().n_recorded_frames(), 0);
}
