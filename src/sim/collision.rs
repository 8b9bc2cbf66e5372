//! Overlap tests between circular bodies and the arena

use glam::Vec2;

/// Whether two circles overlap (touching counts)
pub fn circles_overlap(a_pos: Vec2, a_radius: f32, b_pos: Vec2, b_radius: f32) -> bool {
    let reach = a_radius + b_radius;
    a_pos.distance_squared(b_pos) <= reach * reach
}

/// Keep a body of `radius` fully inside an arena of `size`
pub fn clamp_to_arena(pos: Vec2, radius: f32, size: Vec2) -> Vec2 {
    let min = Vec2::splat(radius);
    let max = (size - min).max(min);
    pos.clamp(min, max)
}

/// Whether `pos` lies inside the arena rectangle
pub fn in_arena(pos: Vec2, size: Vec2) -> bool {
    pos.x >= 0.0 && pos.y >= 0.0 && pos.x <= size.x && pos.y <= size.y
}

/// Index of the point closest to `from`, if any
pub fn nearest<I>(from: Vec2, points: I) -> Option<(usize, Vec2)>
where
    I: IntoIterator<Item = Vec2>,
{
    points
        .into_iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| from.distance_squared(*a).total_cmp(&from.distance_squared(*b)))
}
