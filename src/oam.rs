//! Sprite attribute memory and the per-scanline OAM scan (spec §4.4).

use arrayvec::ArrayVec;

pub const OAM_LEN: usize = 160;
pub const OAM_ENTRY_COUNT: usize = 40;
pub const MAX_OBJECTS_PER_LINE: usize = 10;

bitflags::bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct ObjectFlags: u8 {
        const PRIORITY   = 1 << 7;
        const Y_FLIP     = 1 << 6;
        const X_FLIP     = 1 << 5;
        const DMG_PALETTE = 1 << 4;
        const CGB_BANK   = 1 << 3;
        const CGB_PALETTE_MASK = 0b111;
    }
}

/// A single 4-byte OAM entry, as selected for the current scanline. Field
/// names match the hardware attribute table layout; priority ordering
/// between objects is left to the renderer per spec §4.4.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObjectAttribute {
    pub y: u8,
    pub x: u8,
    pub tile_index: u8,
    pub flags: ObjectFlags,
}

impl From<[u8; 4]> for ObjectAttribute {
    fn from([y, x, tile_index, flags]: [u8; 4]) -> Self {
        Self {
            y,
            x,
            tile_index,
            flags: ObjectFlags::from_bits_retain(flags),
        }
    }
}

/// Scans `oam` for up to [`MAX_OBJECTS_PER_LINE`] sprites visible on scanline
/// `ly`, in OAM order. `tall` selects 8x16 vs 8x8 sprite height (LCDC bit 2).
pub fn scan_line(oam: &[u8; OAM_LEN], ly: u8, tall: bool) -> ArrayVec<ObjectAttribute, MAX_OBJECTS_PER_LINE> {
    let height: i16 = if tall { 16 } else { 8 };
    let ly = i16::from(ly);
    let mut found = ArrayVec::new();
    for chunk in oam.chunks_exact(4) {
        if found.is_full() {
            break;
        }
        let top = i16::from(chunk[0]) - 16;
        if ly >= top && ly < top + height {
            found.push(ObjectAttribute::from(<[u8; 4]>::try_from(chunk).unwrap()));
        }
    }
    found
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sprite(y: u8, x: u8) -> [u8; 4] {
        [y, x, 0, 0]
    }

    #[test]
    fn caps_at_ten_and_keeps_oam_order() {
        let mut oam = [0u8; OAM_LEN];
        for i in 0..20u8 {
            let base = usize::from(i) * 4;
            oam[base..base + 4].copy_from_slice(&sprite(16, i)); // y=16 -> visible on line 0
        }
        let found = scan_line(&oam, 0, false);
        assert_eq!(10, found.len());
        assert_eq!(0, found[0].x);
        assert_eq!(9, found[9].x);
    }

    #[test]
    fn respects_tall_sprite_height() {
        let mut oam = [0u8; OAM_LEN];
        oam[0..4].copy_from_slice(&sprite(8, 0)); // top = -8, visible lines -8..8 (8x8) or -8..16 (tall)
        assert!(scan_line(&oam, 7, false).is_empty());
        assert_eq!(1, scan_line(&oam, 7, true).len());
    }
}
