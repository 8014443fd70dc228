//! Snapshot/restore (spec §6).
//!
//! A flat little-endian byte layout, hand-packed rather than derived through
//! a serialization crate — the teacher carries no `serde` dependency
//! anywhere in its workspace, and neither does any other repo in the pack,
//! so this follows the corpus's convention of writing save-state packing by
//! hand (see e.g. `gebeh_core`'s cartridge header parsing, which reads
//! fixed-offset bytes directly rather than through a derive).

use crate::palette::{Rgb555, PALETTE_LEN};
use crate::vram::{Vram, VRAM_LEN};

use crate::video::VideoState;

const HEADER_LEN: usize = 2 + 2 + 4 + 4 + 4 + 4 + 4 + 1 + 1 + 2 + 2 + PALETTE_LEN * 2;
const OAM_LEN: usize = crate::oam::OAM_LEN;
pub const SNAPSHOT_LEN: usize = HEADER_LEN + VRAM_LEN + OAM_LEN;

bitflags::bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    struct SnapshotFlags: u8 {
        const MODE_MASK         = 0b0000_0011;
        const LINE_153_SETTLED  = 1 << 2;
        const BCP_INCREMENT     = 1 << 3;
        const OCP_INCREMENT     = 1 << 4;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotError {
    /// The buffer passed to [`restore`] was not exactly [`SNAPSHOT_LEN`]
    /// bytes.
    WrongLength { expected: usize, actual: usize },
}

impl core::fmt::Display for SnapshotError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            SnapshotError::WrongLength { expected, actual } => {
                write!(f, "snapshot buffer is {actual} bytes, expected {expected}")
            }
        }
    }
}

/// Writes `state`'s full snapshot into `out`, returning the number of bytes
/// written ([`SNAPSHOT_LEN`]). `out` must be at least that long.
pub fn write(state: &VideoState, out: &mut [u8]) -> usize {
    let raw = state.raw_fields();
    let mut cursor = 0;
    let mut put = |bytes: &[u8]| {
        out[cursor..cursor + bytes.len()].copy_from_slice(bytes);
        cursor += bytes.len();
    };

    put(&u16::from(raw.x).to_le_bytes());
    put(&u16::from(raw.ly).to_le_bytes());
    put(&raw.next_event.to_le_bytes());
    put(&raw.event_diff.to_le_bytes());
    put(&raw.next_mode.to_le_bytes());
    put(&raw.dot_counter.to_le_bytes());
    put(&(raw.frame_counter as i32).to_le_bytes());
    put(&[raw.vram_current_bank]);

    let mut flags = SnapshotFlags::from_bits_truncate(raw.mode & SnapshotFlags::MODE_MASK.bits());
    flags.set(SnapshotFlags::LINE_153_SETTLED, raw.line153_settled);
    flags.set(SnapshotFlags::BCP_INCREMENT, raw.bcp_increment);
    flags.set(SnapshotFlags::OCP_INCREMENT, raw.ocp_increment);
    put(&[flags.bits()]);

    put(&u16::from(raw.bcp_index).to_le_bytes());
    put(&u16::from(raw.ocp_index).to_le_bytes());

    for color in state.palette().entries() {
        put(&color.0.to_le_bytes());
    }

    put(state.vram().as_bytes());
    put(state.oam());

    debug_assert_eq!(SNAPSHOT_LEN, cursor);
    cursor
}

/// Restores `state` from a buffer produced by [`write`]. Rejects any buffer
/// whose length isn't exactly [`SNAPSHOT_LEN`] rather than guessing at a
/// truncated or padded one. Per spec §6, replays a `write_palette`
/// notification to `renderer` for all 64 entries so an attached tile/color
/// cache observes the restored palette exactly as if each entry had just
/// been written.
pub fn restore(
    state: &mut VideoState,
    buffer: &[u8],
    renderer: &mut dyn crate::renderer::Renderer,
) -> Result<(), SnapshotError> {
    if buffer.len() != SNAPSHOT_LEN {
        return Err(SnapshotError::WrongLength {
            expected: SNAPSHOT_LEN,
            actual: buffer.len(),
        });
    }

    let mut cursor = 0;
    let mut take = |len: usize| {
        let slice = &buffer[cursor..cursor + len];
        cursor += len;
        slice
    };

    let x = u16::from_le_bytes(take(2).try_into().unwrap()) as u8;
    let ly = u16::from_le_bytes(take(2).try_into().unwrap()) as u8;
    let next_event = i32::from_le_bytes(take(4).try_into().unwrap());
    let event_diff = i32::from_le_bytes(take(4).try_into().unwrap());
    let next_mode = i32::from_le_bytes(take(4).try_into().unwrap());
    let dot_counter = i32::from_le_bytes(take(4).try_into().unwrap());
    let frame_counter = i32::from_le_bytes(take(4).try_into().unwrap()) as u32;
    let vram_current_bank = take(1)[0];
    let flags = SnapshotFlags::from_bits_truncate(take(1)[0]);
    let bcp_index = u16::from_le_bytes(take(2).try_into().unwrap()) as u8;
    let ocp_index = u16::from_le_bytes(take(2).try_into().unwrap()) as u8;

    let mut entries = [Rgb555::default(); PALETTE_LEN];
    for entry in entries.iter_mut() {
        let bytes = take(2);
        *entry = Rgb555::from_le_bytes(bytes[0], bytes[1]);
    }

    let mut vram_bytes = [0u8; VRAM_LEN];
    vram_bytes.copy_from_slice(take(VRAM_LEN));
    let mut oam = [0u8; OAM_LEN];
    oam.copy_from_slice(take(OAM_LEN));

    state.restore_raw_fields(crate::video::RawFields {
        x,
        ly,
        line153_settled: flags.contains(SnapshotFlags::LINE_153_SETTLED),
        next_event,
        event_diff,
        next_mode,
        dot_counter,
        frame_counter,
        vram_current_bank,
        bcp_increment: flags.contains(SnapshotFlags::BCP_INCREMENT),
        ocp_increment: flags.contains(SnapshotFlags::OCP_INCREMENT),
        mode: flags.bits() & SnapshotFlags::MODE_MASK.bits(),
        bcp_index,
        ocp_index,
    });

    let mut vram = Vram::default();
    vram.restore(vram_bytes, vram_current_bank);
    *state.vram_mut() = vram;
    *state.oam_mut() = oam;
    state
        .palette_mut()
        .restore(entries, bcp_index, ocp_index, flags.contains(SnapshotFlags::BCP_INCREMENT), flags.contains(SnapshotFlags::OCP_INCREMENT));
    state.rescan_oam();

    for (index, color) in state.palette().entries().iter().enumerate() {
        renderer.write_palette(index as u8, *color);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Config, Model};
    use crate::renderer::{HdmaRequester, NoHdma, NullHostSink, NullRenderer, Peripherals};

    struct FakeCpu;

    impl crate::renderer::CpuView for FakeCpu {
        fn cycles(&self) -> i32 {
            0
        }
        fn double_speed(&self) -> bool {
            false
        }
        fn execution_state(&self) -> u8 {
            0
        }
    }

    #[derive(Default)]
    struct NullIrq;

    impl crate::renderer::InterruptLine for NullIrq {
        fn request(&mut self, _bits: crate::registers::IfBits) {}
    }

    fn peripherals<'a>(
        cpu: &'a FakeCpu,
        renderer: &'a mut dyn crate::renderer::Renderer,
        irq: &'a mut dyn crate::renderer::InterruptLine,
        hdma: &'a mut dyn HdmaRequester,
        host: &'a mut dyn crate::renderer::HostSink,
    ) -> Peripherals<'a> {
        Peripherals { cpu, renderer, irq, hdma, host, tilt: None }
    }

    #[test]
    fn round_trip_preserves_scheduler_state() {
        let mut state = VideoState::new(Model::Cgb, Config { frameskip: 0 });
        let cpu = FakeCpu;
        let mut renderer = NullRenderer::detached();
        let mut irq = NullIrq;
        let mut hdma = NoHdma;
        let mut host = NullHostSink;
        let mut p = peripherals(&cpu, &mut renderer, &mut irq, &mut hdma, &mut host);
        state.write_scx(3, &mut p);
        state.write_bcps(0x81, &mut p);
        state.write_bcpd(0x34, &mut p);
        state.write_bcpd(0x12, &mut p);

        let mut buffer = [0u8; SNAPSHOT_LEN];
        let written = write(&state, &mut buffer);
        assert_eq!(SNAPSHOT_LEN, written);

        let mut restored = VideoState::new(Model::Cgb, Config { frameskip: 0 });
        let mut renderer = NullRenderer::detached();
        restore(&mut restored, &buffer, &mut renderer).unwrap();
        assert_eq!(state.ly(), restored.ly());
        assert_eq!(state.x(), restored.x());
        assert_eq!(state.bcpd(), restored.bcpd());
        assert_eq!(state.bcps(), restored.bcps());
    }

    #[test]
    fn replays_palette_notifications_for_all_64_entries() {
        let mut state = VideoState::new(Model::Dmg, Config::default());
        let mut buffer = [0u8; SNAPSHOT_LEN];
        write(&state, &mut buffer);

        #[derive(Default)]
        struct CountingRenderer(u32);
        impl crate::renderer::Renderer for CountingRenderer {
            fn write_palette(&mut self, _index: u8, _value: crate::palette::Rgb555) {
                self.0 += 1;
            }
        }

        let mut renderer = CountingRenderer::default();
        restore(&mut state, &buffer, &mut renderer).unwrap();
        assert_eq!(64, renderer.0);
    }

    #[test]
    fn corrupted_length_is_rejected() {
        let mut state = VideoState::new(Model::Dmg, Config::default());
        let short = [0u8; SNAPSHOT_LEN - 1];
        let mut renderer = NullRenderer::detached();
        assert_eq!(
            Err(SnapshotError::WrongLength { expected: SNAPSHOT_LEN, actual: SNAPSHOT_LEN - 1 }),
            restore(&mut state, &short, &mut renderer)
        );
    }
}
