#![no_std]

//! Mode-sequencing, OAM-scan, dot-clock and palette/VRAM core for a DMG/CGB
//! PPU, timed as a batch of elapsed CPU cycles rather than ticked one dot at
//! a time. The CPU, memory bus, host renderer backends, frame pacing and
//! save-state container format all live outside this crate; see
//! [`renderer::Peripherals`] for the collaborator interfaces this core
//! consumes instead of owning them.

pub mod countdown;
pub mod model;
pub mod oam;
pub mod palette;
pub mod registers;
pub mod renderer;
pub mod serialize;
pub mod vram;
pub mod video;

pub use model::{Config, Model};
pub use oam::ObjectAttribute;
pub use palette::Rgb555;
pub use renderer::{
    CpuView, HdmaRequester, HostSink, InterruptLine, NoHdma, NullHostSink, NullRenderer,
    Peripherals, Renderer, TileCache, TiltSensor,
};
pub use serialize::{SnapshotError, SNAPSHOT_LEN};
pub use video::{Mode, VideoState};

pub const WIDTH: u8 = 160;
pub const HEIGHT: u8 = 144;
