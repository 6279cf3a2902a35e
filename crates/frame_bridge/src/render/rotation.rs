//! Root pass rewrite for rotated panels
//!
//! When the platform reports a rotated display, the root pass is drawn into a
//! viewport with swapped axes (90/270) and every shared quad state of the root
//! pass gets its 2D block and translation remapped so content appears upright.
//! Only the six entries `(0,0) (1,1) (0,1) (1,0) (0,3) (1,3)` are rewritten.

use crate::foundation::math::Mat4;
use crate::frame::{Rect, RenderPass, SharedQuadState, Size};

/// Supported display rotations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Rotation {
    /// Upright
    #[default]
    Deg0,
    /// Quarter turn
    Deg90,
    /// Half turn
    Deg180,
    /// Three quarter turn
    Deg270,
}

impl Rotation {
    /// Map platform degrees (normalised modulo 360) to a rotation
    pub const fn from_degrees(degrees: i32) -> Option<Self> {
        match degrees.rem_euclid(360) {
            0 => Some(Self::Deg0),
            90 => Some(Self::Deg90),
            180 => Some(Self::Deg180),
            270 => Some(Self::Deg270),
            _ => None,
        }
    }

    /// Angle in degrees
    pub const fn degrees(self) -> i32 {
        match self {
            Self::Deg0 => 0,
            Self::Deg90 => 90,
            Self::Deg180 => 180,
            Self::Deg270 => 270,
        }
    }

    /// True for quarter turns, where the viewport axes swap
    pub const fn swaps_axes(self) -> bool {
        matches!(self, Self::Deg90 | Self::Deg270)
    }
}

/// Rewrite one quad transform for a rotated panel
///
/// `bounds` is the viewport before rotation. The matrix is first normalised so
/// `(3,3)` is 1 unless that entry is 0 or already 1.
pub fn rotate_transform(matrix: &Mat4, rotation: Rotation, bounds: Size) -> Mat4 {
    let mut result = *matrix;
    if rotation == Rotation::Deg0 {
        return result;
    }

    let m33 = result[(3, 3)];
    if m33 != 0.0 && m33 != 1.0 {
        result /= m33;
    }

    let scale_x = result[(0, 0)];
    let scale_y = result[(1, 1)];
    let m01 = result[(0, 1)];
    let m10 = result[(1, 0)];
    let translate_x = result[(0, 3)];
    let translate_y = result[(1, 3)];
    #[allow(clippy::cast_precision_loss)]
    let (width, height) = (bounds.width as f32, bounds.height as f32);

    let (new_scale_x, new_scale_y, new_m01, new_m10, new_translate_x, new_translate_y) = match rotation {
        Rotation::Deg90 => (m10, -m01, scale_y, -scale_x, translate_y, width - translate_x),
        Rotation::Deg180 => (-scale_x, -scale_y, -m01, -m10, width - translate_x, height - translate_y),
        Rotation::Deg270 => (-m10, m01, -scale_y, scale_x, height - translate_y, translate_x),
        Rotation::Deg0 => return result,
    };

    result[(0, 0)] = new_scale_x;
    result[(1, 1)] = new_scale_y;
    result[(0, 1)] = new_m01;
    result[(1, 0)] = new_m10;
    result[(0, 3)] = new_translate_x;
    result[(1, 3)] = new_translate_y;
    result
}

/// Rewrite a shared quad state in place
pub fn transform_shared_quad_state(state: &mut SharedQuadState, rotation: Rotation, bounds: Size) {
    state.quad_to_target_transform = rotate_transform(&state.quad_to_target_transform, rotation, bounds);
}

/// Fit the root pass to the viewport and apply the rotation rewrite
///
/// The output rect takes the viewport size, with axes swapped for quarter
/// turns. Every shared quad state of the pass is rewritten against the
/// unrotated `bounds`.
pub fn transform_root_render_pass(root: &mut RenderPass, bounds: Rect, rotation: Rotation) {
    let size = if rotation.swaps_axes() { bounds.size().transposed() } else { bounds.size() };
    root.output_rect.set_width(size.width);
    root.output_rect.set_height(size.height);

    if rotation == Rotation::Deg0 {
        return;
    }

    log::trace!(
        "Rotating root pass {:?} by {} degrees ({} states)",
        root.id,
        rotation.degrees(),
        root.shared_quad_states.len()
    );
    for state in &mut root.shared_quad_states {
        transform_shared_quad_state(state, rotation, bounds.size());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::{map_point, scale, translation, Point2};
    use crate::frame::RenderPassId;
    use approx::assert_relative_eq;

    fn sample_transform() -> Mat4 {
        let mut matrix = translation(12.5, 40.0) * scale(2.0, 0.5);
        matrix[(0, 1)] = 0.25;
        matrix[(1, 0)] = -0.75;
        matrix
    }

    #[test]
    fn test_from_degrees() {
        assert_eq!(Rotation::from_degrees(0), Some(Rotation::Deg0));
        assert_eq!(Rotation::from_degrees(450), Some(Rotation::Deg90));
        assert_eq!(Rotation::from_degrees(-90), Some(Rotation::Deg270));
        assert_eq!(Rotation::from_degrees(45), None);
        assert!(Rotation::Deg270.swaps_axes());
        assert!(!Rotation::Deg180.swaps_axes());
    }

    #[test]
    fn test_90_degree_entries() {
        let original = sample_transform();
        let rotated = rotate_transform(&original, Rotation::Deg90, Size::new(800, 480));

        assert_relative_eq!(rotated[(0, 0)], -0.75);
        assert_relative_eq!(rotated[(1, 1)], -0.25);
        assert_relative_eq!(rotated[(0, 1)], 0.5);
        assert_relative_eq!(rotated[(1, 0)], -2.0);
        assert_relative_eq!(rotated[(0, 3)], 40.0);
        assert_relative_eq!(rotated[(1, 3)], 787.5);
        assert_relative_eq!(rotated[(2, 2)], original[(2, 2)]);
    }

    #[test]
    fn test_translation_lands_in_rotated_viewport() {
        let rotated = rotate_transform(&translation(100.0, 20.0), Rotation::Deg90, Size::new(800, 480));
        let origin = map_point(&rotated, Point2::origin());
        assert_relative_eq!(origin.x, 20.0);
        assert_relative_eq!(origin.y, 700.0);
    }

    #[test]
    fn test_quarter_turns_round_trip() {
        let original = sample_transform();
        let bounds = Size::new(800, 480);

        let there = rotate_transform(&original, Rotation::Deg90, bounds);
        let back = rotate_transform(&there, Rotation::Deg270, bounds.transposed());
        assert_relative_eq!(back, original, epsilon = 1e-4);

        let there = rotate_transform(&original, Rotation::Deg270, bounds);
        let back = rotate_transform(&there, Rotation::Deg90, bounds.transposed());
        assert_relative_eq!(back, original, epsilon = 1e-4);
    }

    #[test]
    fn test_half_turn_twice_is_exact() {
        let original = sample_transform();
        let bounds = Size::new(800, 480);

        let once = rotate_transform(&original, Rotation::Deg180, bounds);
        let twice = rotate_transform(&once, Rotation::Deg180, bounds);

        assert_eq!(twice, original);
    }

    #[test]
    fn test_normalises_homogeneous_scale() {
        let mut matrix = translation(10.0, 20.0);
        matrix *= 2.0;

        let rotated = rotate_transform(&matrix, Rotation::Deg180, Size::new(100, 100));

        assert_relative_eq!(rotated[(3, 3)], 1.0);
        assert_relative_eq!(rotated[(0, 3)], 90.0);
        assert_relative_eq!(rotated[(1, 3)], 80.0);
    }

    #[test]
    fn test_zero_rotation_is_untouched() {
        let mut matrix = sample_transform();
        matrix[(3, 3)] = 4.0;
        assert_eq!(rotate_transform(&matrix, Rotation::Deg0, Size::new(10, 10)), matrix);
    }

    #[test]
    fn test_root_pass_rect_and_states() {
        let mut root = RenderPass::new(RenderPassId(1), Rect::new(0, 0, 10, 10));
        root.add_shared_quad_state(SharedQuadState::new(translation(5.0, 0.0), Rect::new(0, 0, 10, 10)));
        root.add_shared_quad_state(SharedQuadState::new(translation(0.0, 7.0), Rect::new(0, 0, 10, 10)));

        transform_root_render_pass(&mut root, Rect::new(0, 0, 800, 480), Rotation::Deg90);

        assert_eq!(root.output_rect.size(), Size::new(480, 800));
        assert_relative_eq!(root.shared_quad_states[0].quad_to_target_transform[(1, 3)], 795.0);
        assert_relative_eq!(root.shared_quad_states[1].quad_to_target_transform[(0, 3)], 7.0);
    }

    #[test]
    fn test_root_pass_half_turn_keeps_axes() {
        let mut root = RenderPass::new(RenderPassId(1), Rect::new(0, 0, 10, 10));

        transform_root_render_pass(&mut root, Rect::new(0, 0, 800, 480), Rotation::Deg180);

        assert_eq!(root.output_rect.size(), Size::new(800, 480));
    }
}
