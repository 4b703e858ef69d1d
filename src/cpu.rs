//! CPU placeholder state.
//!
//! The 6502 core is an external collaborator. This crate consumes only `cpu_data_bus` (open-bus
//! reads) and exposes `set_cart_irq(bool)` back to it; `CpuState` is reduced to that surface plus
//! enough bookkeeping to make the state-transfer walk self-contained.

use serde::{Deserialize, Serialize};

#[derive(Debug, Default, Clone, Copy, Serialize, Deserialize)]
#[must_use]
pub struct CpuState {
    /// Last value driven onto the CPU's data bus; mappers read this back for open-bus behavior.
    pub cpu_data_bus: u8,
    /// The cartridge IRQ line, asserted/cleared by mappers via `set_cart_irq`.
    cart_irq: bool,
}

impl CpuState {
    pub const fn new() -> Self {
        Self {
            cpu_data_bus: 0,
            cart_irq: false,
        }
    }

    #[must_use]
    pub const fn cart_irq(&self) -> bool {
        self.cart_irq
    }

    /// Raises or clears the cartridge IRQ line. Mappers call this from their own register writes
    /// (e.g. MMC3 clears it on any write to `$E000`); the CPU polls `cart_irq()` once per
    /// instruction.
    pub fn set_cart_irq(&mut self, asserted: bool) {
        self.cart_irq = asserted;
    }
}
