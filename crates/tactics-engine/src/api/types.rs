use glam::Vec2;

/// Board width in cells.
pub const BOARD_COLS: i32 = 9;
/// Board height in cells.
pub const BOARD_ROWS: i32 = 5;

/// An integer cell on the tactical board.
///
/// Positions are plain values; off-board cells are never clamped; checked
/// constructors return `None` instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct BoardPos {
    pub x: i32,
    pub y: i32,
}

impl BoardPos {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Build a position only if it lies on the board.
    pub fn on_board(x: i32, y: i32) -> Option<Self> {
        let pos = Self::new(x, y);
        pos.is_valid().then_some(pos)
    }

    /// Whether the cell is inside `[0, COLS) x [0, ROWS)`.
    pub fn is_valid(self) -> bool {
        self.x >= 0 && self.x < BOARD_COLS && self.y >= 0 && self.y < BOARD_ROWS
    }

    /// Tile distance used for movement timing.
    pub fn manhattan(self, other: BoardPos) -> u32 {
        self.x.abs_diff(other.x) + self.y.abs_diff(other.y)
    }
}

/// Source rectangle of one sprite frame, in spritesheet pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FrameRect {
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
}

impl FrameRect {
    pub const fn new(x: u32, y: u32, w: u32, h: u32) -> Self {
        Self { x, y, w, h }
    }

    pub fn size(&self) -> Vec2 {
        Vec2::new(self.w as f32, self.h as f32)
    }
}

/// Faction of a unit. `0` is neutral; playable factions are `1..=6`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct FactionId(pub u8);

impl FactionId {
    pub const NEUTRAL: FactionId = FactionId(0);
    pub const MAX_PLAYABLE: u8 = 6;

    pub fn is_neutral(self) -> bool {
        self.0 == 0
    }

    pub fn is_playable(self) -> bool {
        (1..=Self::MAX_PLAYABLE).contains(&self.0)
    }
}

/// Outcome of one frame of combat, reported to game logic.
///
/// Roster indices refer to the roster as it was during the frame; dead units
/// are drained only after events for that frame have been produced.
#[derive(Debug, Clone, PartialEq)]
pub enum CombatEvent {
    /// An attack reached its impact time and damage was applied.
    Damaged {
        attacker: usize,
        target: usize,
        amount: i32,
        position: Vec2,
    },
    /// The damage above brought the target to zero hp.
    Killed { target: usize, position: Vec2 },
}
