/// Which hardware generation the core is emulating.
///
/// Selected at construction time and held for the PPU's lifetime: it gates
/// DMG palette synthesis vs. direct CGB 15-bit palette storage, single vs.
/// dual VRAM banks, and whether HDMA/tilt-sensor hooks are ever consulted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Model {
    #[default]
    Dmg,
    Cgb,
}

impl Model {
    pub fn is_cgb(self) -> bool {
        matches!(self, Model::Cgb)
    }
}

/// Frameskip and capacity knobs supplied at construction.
///
/// Mirrors the spirit of the teacher's `CartridgeType`/`Mbc` selection at
/// construction time rather than branching on an `if` ladder at every call
/// site.
#[derive(Debug, Clone, Copy, Default)]
pub struct Config {
    /// Render 1 frame out of every `frameskip + 1`; 0 disables frameskip.
    pub frameskip: u8,
}
