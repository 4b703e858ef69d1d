//! Input placeholder state.
//!
//! The controller/input layer is an external collaborator. It is not consumed by the mapper
//! subsystem, but `transfer_system_state` walks it after the controller subsystem, so
//! `InputState` is carried as a reduced, serializable stand-in that occupies its place in the
//! save-state byte layout.

use serde::{Deserialize, Serialize};

/// Raw per-player button state, abstracted away from any host keyboard/gamepad mapping.
#[derive(Debug, Default, Clone, Copy, Serialize, Deserialize)]
#[must_use]
pub struct InputState {
    pub player_one: u8,
    pub player_two: u8,
}

impl InputState {
    pub const fn new() -> Self {
        Self {
            player_one: 0,
            player_two: 0,
        }
    }
}
