//! Board grid to screen mapping.

use glam::Vec2;

use crate::api::config::{RenderConfig, TILE_OFFSET_X, TILE_OFFSET_Y};
use crate::api::types::{BoardPos, BOARD_COLS, BOARD_ROWS};
use crate::core::perspective::PerspectiveConfig;

/// Cached board geometry for one viewport size.
///
/// Rebuild with [`BoardLayout::new`] whenever the viewport changes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoardLayout {
    pub config: RenderConfig,
    /// Projection for the flat board plane.
    pub board: PerspectiveConfig,
    /// Projection for upright sprites.
    pub entity: PerspectiveConfig,
    tile: f32,
    origin: Vec2,
}

impl BoardLayout {
    pub fn new(config: RenderConfig) -> Self {
        let tile = config.tile_size();
        let board_w = BOARD_COLS as f32 * tile;
        let board_h = BOARD_ROWS as f32 * tile;
        let origin = Vec2::new(
            (config.width() - board_w) * 0.5 + tile * 0.5 + TILE_OFFSET_X,
            (config.height() - board_h) * 0.5 + tile * 0.5 + TILE_OFFSET_Y,
        );
        Self {
            config,
            board: PerspectiveConfig::board(&config),
            entity: PerspectiveConfig::entity(&config),
            tile,
            origin,
        }
    }

    pub fn tile_size(&self) -> f32 {
        self.tile
    }

    /// Flat (unprojected) pixel centre of a cell.
    pub fn board_to_screen(&self, pos: BoardPos) -> Vec2 {
        Vec2::new(pos.x as f32, pos.y as f32) * self.tile + self.origin
    }

    /// Cell containing a flat pixel, or `None` off the board.
    pub fn screen_to_board(&self, screen: Vec2) -> Option<BoardPos> {
        let cell = ((screen - self.origin + self.tile * 0.5) / self.tile).floor();
        BoardPos::on_board(cell.x as i32, cell.y as i32)
    }

    /// Projected pixel centre of a cell, where sprites stand.
    pub fn board_to_screen_perspective(&self, pos: BoardPos) -> Vec2 {
        self.board.project(self.board_to_screen(pos), 0.0)
    }

    /// Cell under a projected pixel (mouse hit-testing).
    pub fn screen_to_board_perspective(&self, screen: Vec2) -> Option<BoardPos> {
        self.screen_to_board(self.board.unproject(screen))
    }

    /// Projected corners of a cell's tile quad.
    pub fn tile_quad(&self, pos: BoardPos) -> [Vec2; 4] {
        let top_left = self.board_to_screen(pos) - Vec2::splat(self.tile * 0.5);
        self.board.project_rect(top_left, Vec2::splat(self.tile))
    }
}

impl Default for BoardLayout {
    fn default() -> Self {
        Self::new(RenderConfig::default())
    }
}
