#![doc = include_str!("../README.md")]

pub mod apu;
pub mod cart;
pub mod fs;
#[macro_use]
pub mod common;
pub mod controller;
pub mod cpu;
pub mod error;
pub mod input;
pub mod mapper;
pub mod mem;
pub mod ppu;
pub mod state;

pub mod prelude {
    //! The prelude re-exports all the common structs/enums used for basic NES emulation.

    pub use crate::{
        apu::ApuState,
        cart::Cart,
        common::{Clock, NesRegion, Regional, Reset, ResetKind},
        controller::ControllerState,
        cpu::CpuState,
        input::InputState,
        mapper::{Mapped, MappedRead, MappedWrite, Mapper, MapperRevision},
        mem::RamState,
        ppu::{Mirroring, PpuState},
        state::{transfer_system_state, RewindRing, SaveStates, System, TransferMode},
    };
}
