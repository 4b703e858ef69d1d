//! APU placeholder state.
//!
//! The audio processing unit is an external collaborator: it is not consumed by the mapper
//! subsystem at all, but it is the first subsystem walked by `transfer_system_state`, so
//! `ApuState` is carried as a reduced, serializable stand-in whose only job is to occupy its place
//! in the save-state byte layout.

use serde::{Deserialize, Serialize};

#[derive(Debug, Default, Clone, Copy, Serialize, Deserialize)]
#[must_use]
pub struct ApuState {
    pub cycle: u64,
    pub frame_counter: u8,
    pub irq_disabled: bool,
}

impl ApuState {
    pub const fn new() -> Self {
        Self {
            cycle: 0,
            frame_counter: 0,
            irq_disabled: false,
        }
    }
}
