/// Render layer: coarse draw order for sprite draws.
///
/// Layers are drawn back-to-front. Within a layer, draws are ordered by z and
/// then grouped by blend mode and atlas for batching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[repr(u8)]
pub enum RenderLayer {
    /// Tiles and board decals.
    Board = 0,
    /// Ground shadows under units.
    Shadows = 1,
    #[default]
    Units = 2,
    /// Effect sprites.
    Fx = 3,
    /// Cursors and selection markers.
    Overlay = 4,
}

impl RenderLayer {
    pub const COUNT: usize = 5;

    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Board),
            1 => Some(Self::Shadows),
            2 => Some(Self::Units),
            3 => Some(Self::Fx),
            4 => Some(Self::Overlay),
            _ => None,
        }
    }

    pub fn as_u8(self) -> u8 {
        self as u8
    }
}
