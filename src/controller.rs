//! Controller-port placeholder state.
//!
//! The NES controller ports (the shift registers `$4016`/`$4017` latch into) sit between the raw
//! `input::InputState` and the CPU, and `transfer_system_state` walks them as their own step in
//! the fixed APU → CPU → PPU → controller → input → mapper order. Reduced here to the per-port
//! strobe/shift bookkeeping, since the button-reading protocol itself is the input layer's
//! contract, not the mapper subsystem's.

use serde::{Deserialize, Serialize};

#[derive(Debug, Default, Clone, Copy, Serialize, Deserialize)]
#[must_use]
pub struct ControllerState {
    pub strobe: bool,
    pub shift_one: u8,
    pub shift_two: u8,
}

impl ControllerState {
    pub const fn new() -> Self {
        Self {
            strobe: false,
            shift_one: 0,
            shift_two: 0,
        }
    }
}
