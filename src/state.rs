//! State-transfer protocol and the save-state/rewind engine.
//!
//! A single [`System`] aggregate is walked in the fixed order APU → CPU → PPU → controller →
//! input → mapper (the mapper lives inside [`Cart`]), backed by a named save slot and a
//! fixed-capacity rewind ring of full snapshots plus a parallel ring of per-frame audio lengths.
//!
//! The measure/save/load state walker is realized here as [`transfer_system_state`] over
//! `bincode`'s `serialized_size`/`serialize_into`/`deserialize_from`, rather than a hand-rolled
//! visitor: because `System`'s field declaration order *is* the required subsystem order, the
//! serialized byte layout already gives a fixed-order, primitive-valued-fields transfer for free.

use crate::{apu::ApuState, cart::Cart, controller::ControllerState, cpu::CpuState, input::InputState, ppu::PpuState};
use serde::{Deserialize, Serialize};

/// How many seconds of rewind history are kept.
pub const N_REWIND_SECONDS: usize = 30;
/// Emulated frame rate used to size the rewind ring.
pub const FRAMES_PER_SECOND: usize = 60;
/// Total rewind ring capacity, in frames.
pub const N_REWIND_FRAMES: usize = N_REWIND_SECONDS * FRAMES_PER_SECOND;

/// The full emulator-visible state, walked in a fixed order by [`transfer_system_state`]. Field
/// declaration order is load-bearing: it *is* the persisted byte layout (APU, CPU, PPU,
/// controller, input, then the cartridge, whose mapper is the final and only variable-shaped
/// piece of state).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[must_use]
pub struct System {
    pub apu: ApuState,
    pub cpu: CpuState,
    pub ppu: PpuState,
    pub controller: ControllerState,
    pub input: InputState,
    pub cart: Cart,
}

impl System {
    pub fn new(cart: Cart) -> Self {
        Self {
            apu: ApuState::new(),
            cpu: CpuState::new(),
            ppu: PpuState::new(),
            controller: ControllerState::new(),
            input: InputState::new(),
            cart,
        }
    }
}

/// The three modes `transfer_system_state` can run in.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[must_use]
pub enum TransferMode {
    /// Compute the number of bytes a transfer would consume without touching `buf`.
    Measure,
    /// Serialize `system` into `buf`.
    Save,
    /// Overwrite `system` from `buf`.
    Load,
}

/// Walks `system`'s subsystems in the fixed APU → CPU → PPU → controller → input → mapper order
/// and, depending on `mode`, measures, writes, or reads its byte representation. Returns the
/// number of bytes consumed (or that would be consumed, for [`TransferMode::Measure`]).
///
/// A `Measure` call never touches `buf` and may be called with an empty slice. `Save`/`Load`
/// require `buf` to be at least as large as the prior `Measure` result; this is an allocation
/// invariant the caller (here, [`SaveStates`]) upholds, so a mismatch is a logic error, not a
/// recoverable one.
pub fn transfer_system_state(system: &mut System, buf: &mut [u8], mode: TransferMode) -> usize {
    match mode {
        TransferMode::Measure => bincode::serialized_size(system)
            .expect("system state is always serializable") as usize,
        TransferMode::Save => {
            let len = bincode::serialized_size(system)
                .expect("system state is always serializable") as usize;
            assert!(buf.len() >= len, "save buffer smaller than measured state size");
            bincode::serialize_into(&mut buf[..len], system)
                .expect("save buffer sized by a prior MEASURE");
            len
        }
        TransferMode::Load => {
            let restored: System =
                bincode::deserialize(buf).expect("load buffer holds a valid System snapshot");
            *system = restored;
            buf.len()
        }
    }
}

/// A fixed-capacity ring of full [`System`] snapshots plus a parallel ring of per-frame audio
/// lengths, driven once per emulated video frame by [`RewindRing::handle_rewind`].
///
/// Snapshots are stored as raw `state_size`-byte slices inside one flat arena (`N_REWIND_FRAMES *
/// state_size` bytes), allocated once at [`SaveStates::init_save_states_for_rom`] and never
/// resized during steady-state emulation, so recording never touches the heap once a ROM is
/// loaded.
#[derive(Debug, Clone)]
#[must_use]
pub struct RewindRing {
    state_size: usize,
    ring: Vec<u8>,
    frame_len: [u32; N_REWIND_FRAMES],
    /// Index of the most recently written ("top") snapshot. Only meaningful while
    /// `n_recorded_frames > 0`.
    index: usize,
    n_recorded_frames: usize,
    is_backwards: bool,
}

impl RewindRing {
    pub fn new(state_size: usize) -> Self {
        Self {
            state_size,
            ring: vec![0u8; state_size * N_REWIND_FRAMES],
            frame_len: [0; N_REWIND_FRAMES],
            index: 0,
            n_recorded_frames: 0,
            is_backwards: false,
        }
    }

    #[must_use]
    pub const fn n_recorded_frames(&self) -> usize {
        self.n_recorded_frames
    }

    #[must_use]
    pub const fn is_backwards(&self) -> bool {
        self.is_backwards
    }

    fn slot(&self, index: usize) -> &[u8] {
        let start = index * self.state_size;
        &self.ring[start..start + self.state_size]
    }

    /// Advances the write index, stores a snapshot of `system`, and increments
    /// `n_recorded_frames` up to `N_REWIND_FRAMES`, overwriting the oldest frame once full.
    fn push_state(&mut self, system: &mut System) {
        self.index = (self.index + 1) % N_REWIND_FRAMES;
        let mut buf = std::mem::take(&mut self.ring);
        transfer_system_state(system, &mut buf[self.index * self.state_size..], TransferMode::Save);
        self.ring = buf;
        self.n_recorded_frames = (self.n_recorded_frames + 1).min(N_REWIND_FRAMES);
    }

    /// Rewinds the write index and decrements `n_recorded_frames`. Only called while more than
    /// one frame is recorded.
    fn pop_state(&mut self) {
        debug_assert!(self.n_recorded_frames > 1);
        self.index = (self.index + N_REWIND_FRAMES - 1) % N_REWIND_FRAMES;
        self.n_recorded_frames -= 1;
    }

    /// Restores `system` from the current top-of-ring snapshot without moving the index.
    fn load_top_state(&self, system: &mut System) {
        let restored: System = bincode::deserialize(self.slot(self.index))
            .expect("rewind ring slot holds a valid System snapshot");
        *system = restored;
    }

    /// Stores the audio length (in CPU ticks) of the frame most recently pushed, i.e. the frame
    /// at the current top-of-ring index. Intended to be called once per emulated video frame,
    /// alongside `handle_rewind(false)` while recording forward.
    pub fn save_audio_frame_length(&mut self, ticks: u32) {
        self.frame_len[self.index] = ticks;
    }

    #[must_use]
    pub const fn audio_frame_length(&self) -> u32 {
        self.frame_len[self.index]
    }

    /// Per-frame driver implementing the two-state rewind machine:
    ///
    /// | `is_backwards` | `do_rewind` | action |
    /// |---|---|---|
    /// | false | false | `push_state` |
    /// | false | true  | load top snapshot, enter backwards mode (first backwards frame does not pop) |
    /// | true  | true  | pop then load top (if more than one frame recorded), else just load top |
    /// | true  | false | load top, leave backwards mode (replays the top frame forward once to smooth the audio seam) |
    pub fn handle_rewind(&mut self, system: &mut System, do_rewind: bool) {
        match (self.is_backwards, do_rewind) {
            (false, false) => self.push_state(system),
            (false, true) => {
                if self.n_recorded_frames > 0 {
                    self.load_top_state(system);
                    self.is_backwards = true;
                }
            }
            (true, true) => {
                if self.n_recorded_frames > 1 {
                    self.pop_state();
                }
                self.load_top_state(system);
            }
            (true, false) => {
                self.load_top_state(system);
                self.is_backwards = false;
            }
        }
    }
}

/// Owns the explicit save slot and the rewind ring for one loaded ROM. Allocated once at
/// [`SaveStates::init_save_states_for_rom`] and torn down at
/// [`SaveStates::deinit_save_states_for_rom`]; both the slot and the ring are sized by a single
/// `MEASURE` pass over the just-constructed [`System`].
#[derive(Debug, Clone, Default)]
#[must_use]
pub struct SaveStates {
    state_size: usize,
    save_slot: Vec<u8>,
    rewind: Option<RewindRing>,
}

impl SaveStates {
    pub const fn new() -> Self {
        Self {
            state_size: 0,
            save_slot: Vec::new(),
            rewind: None,
        }
    }

    /// `MEASURE`s `system` and allocates the save slot (`state_size` bytes) and the rewind ring
    /// (`state_size * N_REWIND_FRAMES` bytes). An allocation failure here is fatal and surfaces as
    /// an allocator abort, not a `Result`.
    pub fn init_save_states_for_rom(&mut self, system: &mut System) {
        let state_size = transfer_system_state(system, &mut [], TransferMode::Measure);
        self.state_size = state_size;
        self.save_slot = vec![0u8; state_size];
        self.rewind = Some(RewindRing::new(state_size));
    }

    /// Frees the save slot and rewind ring. Safe to call even if a ROM was never loaded.
    pub fn deinit_save_states_for_rom(&mut self) {
        self.state_size = 0;
        self.save_slot = Vec::new();
        self.rewind = None;
    }

    #[must_use]
    pub const fn state_size(&self) -> usize {
        self.state_size
    }

    #[must_use]
    pub fn rewind(&self) -> Option<&RewindRing> {
        self.rewind.as_ref()
    }

    /// Copies the current system state into the save slot.
    ///
    /// # Panics
    ///
    /// Panics if called before [`SaveStates::init_save_states_for_rom`].
    pub fn save_state(&mut self, system: &mut System) {
        assert!(!self.save_slot.is_empty(), "save_state called with no ROM loaded");
        transfer_system_state(system, &mut self.save_slot, TransferMode::Save);
    }

    /// Restores `system` from the save slot and clears the rewind ring.
    ///
    /// # Panics
    ///
    /// Panics if called before [`SaveStates::init_save_states_for_rom`] or before any
    /// [`SaveStates::save_state`] call populated the slot.
    pub fn load_state(&mut self, system: &mut System) {
        assert!(!self.save_slot.is_empty(), "load_state called with no ROM loaded");
        transfer_system_state(system, &mut self.save_slot, TransferMode::Load);
        self.rewind = Some(RewindRing::new(self.state_size));
    }

    /// Delegates to the rewind ring's per-frame driver. A no-op if no ROM is loaded.
    pub fn handle_rewind(&mut self, system: &mut System, do_rewind: bool) {
        if let Some(rewind) = self.rewind.as_mut() {
            rewind.handle_rewind(system, do_rewind);
        }
    }

    /// Records the audio length (in CPU ticks) of the most recently pushed frame. A no-op if no
    /// ROM is loaded.
    pub fn save_audio_frame_length(&mut self, ticks: u32) {
        if let Some(rewind) = self.rewind.as_mut() {
            rewind.save_audio_frame_length(ticks);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    fn test_system() -> System {
        System::new(Cart::empty())
    }

    #[test]
    fn measure_then_save_fills_exactly_state_size_bytes() {
        let mut system = test_system();
        let size = transfer_system_state(&mut system, &mut [], TransferMode::Measure);
        let mut buf = vec![0u8; size];
        let written = transfer_system_state(&mut system, &mut buf, TransferMode::Save);
        assert_eq!(written, size);
    }

    #[test]
    fn save_state_then_load_state_is_observationally_a_no_op() {
        let mut system = test_system();
        system.apu.cycle = 1234;
        system.cpu.cpu_data_bus = 0xAB;
        system.ppu.ppu_cycle = 99;

        let mut states = SaveStates::new();
        states.init_save_states_for_rom(&mut system);
        states.save_state(&mut system);

        system.apu.cycle = 0;
        system.cpu.cpu_data_bus = 0x00;
        system.ppu.ppu_cycle = 0;

        states.load_state(&mut system);
        assert_eq!(system.apu.cycle, 1234);
        assert_eq!(system.cpu.cpu_data_bus, 0xAB);
        assert_eq!(system.ppu.ppu_cycle, 99);
    }

    #[test]
    fn push_then_pop_then_push_is_byte_identical() {
        let mut system = test_system();
        let mut states = SaveStates::new();
        states.init_save_states_for_rom(&mut system);

        system.cpu.cpu_data_bus = 1;
        states.handle_rewind(&mut system, false); // push frame A

        let rewind = states.rewind.as_ref().unwrap();
        let frame_a = rewind.slot(rewind.index).to_vec();

        system.cpu.cpu_data_bus = 2;
        states.handle_rewind(&mut system, false); // push frame B

        // Rewind: pop B, load A.
        states.handle_rewind(&mut system, true);
        assert_eq!(system.cpu.cpu_data_bus, 1);

        // Forward again: leaves backwards mode, replays top (A) once.
        states.handle_rewind(&mut system, false);
        assert_eq!(system.cpu.cpu_data_bus, 1);

        // One more forward frame pushes a fresh snapshot; its predecessor slot equals frame A.
        system.cpu.cpu_data_bus = 1;
        states.handle_rewind(&mut system, false);
        let rewind = states.rewind.as_ref().unwrap();
        let prev_index = (rewind.index + N_REWIND_FRAMES - 1) % N_REWIND_FRAMES;
        assert_eq!(rewind.slot(prev_index), frame_a.as_slice());
    }

    #[test]
    fn rewind_caps_n_recorded_frames_and_overwrites_oldest() {
        let mut system = test_system();
        let mut states = SaveStates::new();
        states.init_save_states_for_rom(&mut system);

        for _ in 0..(N_REWIND_FRAMES + 10) {
            states.handle_rewind(&mut system, false);
        }
        assert_eq!(states.rewind().unwrap().n_recorded_frames(), N_REWIND_FRAMES);
    }

    #[test]
    fn rewind_seam_replays_top_frame_once_on_direction_flip() {
        let mut system = test_system();
        let mut states = SaveStates::new();
        states.init_save_states_for_rom(&mut system);

        for frame in 0..120u32 {
            system.apu.cycle = u64::from(frame);
            states.handle_rewind(&mut system, false);
            states.save_audio_frame_length(frame);
        }
        assert_eq!(system.apu.cycle, 119);

        for _ in 0..5 {
            states.handle_rewind(&mut system, true);
        }
        assert!(states.rewind().unwrap().is_backwards());
        let cycle_after_backwards = system.apu.cycle;

        // Flipping back to forward replays the current top frame once before advancing, so the
        // first forward frame after the flip observes the same state the backward run produced.
        states.handle_rewind(&mut system, false);
        assert_eq!(system.apu.cycle, cycle_after_backwards);
        assert!(!states.rewind().unwrap().is_backwards());
    }
}
