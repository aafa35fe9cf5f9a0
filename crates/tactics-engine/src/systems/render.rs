use std::cmp::Ordering;

use crate::components::sprite::SpriteDraw;
use crate::renderer::instance::SpriteBuffer;

/// Build the sprite buffer for a frame.
///
/// Draws are ordered back to front by layer, then by z. Draws that tie on
/// both are grouped by blend mode and atlas so they land in one batch. The
/// sort is stable, so equal keys keep submission order.
pub fn build_sprite_buffer(draws: impl IntoIterator<Item = SpriteDraw>, buffer: &mut SpriteBuffer) {
    buffer.clear();
    let mut draws: Vec<SpriteDraw> = draws.into_iter().collect();
    draws.sort_by(draw_order);
    for draw in &draws {
        buffer.push(draw);
    }
}

fn draw_order(a: &SpriteDraw, b: &SpriteDraw) -> Ordering {
    a.layer
        .cmp(&b.layer)
        .then(a.z.total_cmp(&b.z))
        .then(a.blend.cmp(&b.blend))
        .then(a.atlas.cmp(&b.atlas))
}
