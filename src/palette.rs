//! The 64-entry, 15-bit-per-color palette store (spec §3, §4.5).
//!
//! Indices 0..31 are background palettes (8 palettes of 4 colors), 32..63
//! are object palettes. On DMG only 0..3 (BGP), 32..35 (OBP0) and 36..39
//! (OBP1) are ever written; the remaining 56 entries stay zeroed.

use crate::registers::PaletteSpec;

/// A 15-bit RGB555 color, as stored in CGB `BCPD`/`OCPD` and synthesized on
/// DMG from the 2-bit BGP/OBP registers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rgb555(pub u16);

impl Rgb555 {
    pub fn from_le_bytes(low: u8, high: u8) -> Self {
        Rgb555(u16::from_le_bytes([low, high]) & 0x7fff)
    }

    pub fn low_byte(self) -> u8 {
        self.0.to_le_bytes()[0]
    }

    pub fn high_byte(self) -> u8 {
        self.0.to_le_bytes()[1]
    }
}

/// The four colors a DMG 2-bit palette register can select, in the
/// reference's literal values (white, light gray, dark gray, black as
/// RGB555).
pub const DMG_COLOR_TABLE: [Rgb555; 4] =
    [Rgb555(0x7fff), Rgb555(0x56b5), Rgb555(0x294a), Rgb555(0x0000)];

pub const BG_PALETTES_BASE: u8 = 0;
pub const OBJ_PALETTES_BASE: u8 = 32;
pub const PALETTE_LEN: usize = 64;

#[derive(Clone)]
pub struct PaletteStore {
    entries: [Rgb555; PALETTE_LEN],
    bcp_index: u8,
    ocp_index: u8,
    bcp_increment: bool,
    ocp_increment: bool,
}

impl Default for PaletteStore {
    fn default() -> Self {
        Self {
            entries: [Rgb555::default(); PALETTE_LEN],
            bcp_index: 0,
            ocp_index: 0,
            bcp_increment: false,
            ocp_increment: false,
        }
    }
}

impl PaletteStore {
    pub fn entries(&self) -> &[Rgb555; PALETTE_LEN] {
        &self.entries
    }

    pub fn bcp_index(&self) -> u8 {
        self.bcp_index
    }

    pub fn ocp_index(&self) -> u8 {
        self.ocp_index
    }

    pub fn bcp_increment(&self) -> bool {
        self.bcp_increment
    }

    pub fn ocp_increment(&self) -> bool {
        self.ocp_increment
    }

    /// Decodes a DMG BGP/OBP0/OBP1 write into its four constituent colors
    /// and writes them at `base` (0 for BGP, 32 for OBP0, 36 for OBP1).
    /// Returns the four `(index, color)` pairs for the caller to forward to
    /// a renderer.
    pub fn write_dmg_register(&mut self, base: u8, value: u8) -> [(u8, Rgb555); 4] {
        let mut written = [(0u8, Rgb555::default()); 4];
        for i in 0..4 {
            let color_index = (value >> (i * 2)) & 0b11;
            let index = base + i;
            let color = DMG_COLOR_TABLE[color_index as usize];
            self.entries[index as usize] = color;
            written[i as usize] = (index, color);
        }
        written
    }

    pub fn write_bcps(&mut self, value: u8) {
        let spec = PaletteSpec::from_bits_truncate(value);
        self.bcp_index = value & PaletteSpec::INDEX_MASK.bits();
        self.bcp_increment = spec.contains(PaletteSpec::AUTO_INCREMENT);
    }

    pub fn write_ocps(&mut self, value: u8) {
        let spec = PaletteSpec::from_bits_truncate(value);
        self.ocp_index = value & PaletteSpec::INDEX_MASK.bits();
        self.ocp_increment = spec.contains(PaletteSpec::AUTO_INCREMENT);
    }

    pub fn bcps(&self) -> u8 {
        self.bcp_index | if self.bcp_increment { 0x80 } else { 0 }
    }

    pub fn ocps(&self) -> u8 {
        self.ocp_index | if self.ocp_increment { 0x80 } else { 0 }
    }

    /// Writes a CGB BCPD byte (the byte currently addressed by `bcpIndex`),
    /// auto-incrementing the cursor if armed. Returns the full entry index
    /// and resulting color for the caller to forward to a renderer.
    pub fn write_bcpd(&mut self, value: u8) -> (u8, Rgb555) {
        Self::write_cp_data(&mut self.entries, BG_PALETTES_BASE, &mut self.bcp_index, self.bcp_increment, value)
    }

    pub fn write_ocpd(&mut self, value: u8) -> (u8, Rgb555) {
        Self::write_cp_data(&mut self.entries, OBJ_PALETTES_BASE, &mut self.ocp_index, self.ocp_increment, value)
    }

    fn write_cp_data(
        entries: &mut [Rgb555; PALETTE_LEN],
        half_base: u8,
        index: &mut u8,
        increment: bool,
        value: u8,
    ) -> (u8, Rgb555) {
        let entry_index = half_base + (*index >> 1);
        let mut color = entries[entry_index as usize];
        if *index % 2 == 0 {
            color = Rgb555::from_le_bytes(value, color.high_byte());
        } else {
            color = Rgb555::from_le_bytes(color.low_byte(), value);
        }
        entries[entry_index as usize] = color;
        if increment {
            *index = (*index + 1) & 0x3f;
        }
        (entry_index, color)
    }

    /// The byte currently under the BCPD/OCPD read cursor, matching
    /// whichever half `index`/`half_base` addresses.
    fn read_cp_data(entries: &[Rgb555; PALETTE_LEN], half_base: u8, index: u8) -> u8 {
        let entry = entries[(half_base + (index >> 1)) as usize];
        if index % 2 == 0 {
            entry.low_byte()
        } else {
            entry.high_byte()
        }
    }

    pub fn read_bcpd(&self) -> u8 {
        Self::read_cp_data(&self.entries, BG_PALETTES_BASE, self.bcp_index)
    }

    pub fn read_ocpd(&self) -> u8 {
        Self::read_cp_data(&self.entries, OBJ_PALETTES_BASE, self.ocp_index)
    }

    /// Used only by snapshot restore: replaces the whole table and cursors
    /// in one shot instead of re-running every write handler.
    pub fn restore(
        &mut self,
        entries: [Rgb555; PALETTE_LEN],
        bcp_index: u8,
        ocp_index: u8,
        bcp_increment: bool,
        ocp_increment: bool,
    ) {
        self.entries = entries;
        self.bcp_index = bcp_index;
        self.ocp_index = ocp_index;
        self.bcp_increment = bcp_increment;
        self.ocp_increment = ocp_increment;
    }
}
