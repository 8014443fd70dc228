//! PPU-owned I/O register addresses and bit layouts.
//!
//! Address list and bit layouts adapted from the teacher's
//! `gebeh_core::state` module, restricted to the registers this core owns
//! directly (the rest of the GB I/O map — timer, serial, joypad, audio — is
//! owned by the out-of-scope memory subsystem).

pub const LCDC: u16 = 0xff40;
pub const STAT: u16 = 0xff41;
pub const SCY: u16 = 0xff42;
pub const SCX: u16 = 0xff43;
pub const LY: u16 = 0xff44;
pub const LYC: u16 = 0xff45;
pub const BGP: u16 = 0xff47;
pub const OBP0: u16 = 0xff48;
pub const OBP1: u16 = 0xff49;
pub const WY: u16 = 0xff4a;
pub const WX: u16 = 0xff4b;
pub const VBK: u16 = 0xff4f;
pub const HDMA1: u16 = 0xff51;
pub const HDMA2: u16 = 0xff52;
pub const HDMA3: u16 = 0xff53;
pub const HDMA4: u16 = 0xff54;
pub const HDMA5: u16 = 0xff55;
pub const BCPS: u16 = 0xff68;
pub const BCPD: u16 = 0xff69;
pub const OCPS: u16 = 0xff6a;
pub const OCPD: u16 = 0xff6b;

bitflags::bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Lcdc: u8 {
        const LCD_ENABLE         = 1 << 7;
        const WINDOW_TILE_MAP    = 1 << 6;
        const WINDOW_ENABLE      = 1 << 5;
        const BG_WINDOW_TILES    = 1 << 4;
        const BG_TILE_MAP        = 1 << 3;
        const OBJ_SIZE           = 1 << 2;
        const OBJ_ENABLE         = 1 << 1;
        const BG_WINDOW_ENABLE   = 1;
    }
}

bitflags::bitflags! {
    /// The interrupt-enable nibble of STAT (bits 3..6). The low 3 bits
    /// (mode + coincidence) are not modeled as flags since they are derived
    /// state, not independent toggles; see [`crate::video::VideoState`].
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct StatInt: u8 {
        const LYC    = 1 << 6;
        const OAM    = 1 << 5;
        const VBLANK = 1 << 4;
        const HBLANK = 1 << 3;
        const WRITABLE_MASK = Self::LYC.bits() | Self::OAM.bits() | Self::VBLANK.bits() | Self::HBLANK.bits();
    }
}

bitflags::bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct IfBits: u8 {
        const VBLANK  = 1;
        const LCDSTAT = 1 << 1;
    }
}

bitflags::bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct PaletteSpec: u8 {
        const AUTO_INCREMENT = 1 << 7;
        const INDEX_MASK     = 0x3f;
    }
}
