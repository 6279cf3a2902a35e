//! Math utilities and types
//!
//! Quad transforms are 4x4 matrices mapping quad space into the space of the
//! pass they are drawn into. Entries are addressed as `(row, col)`, so the 2D
//! translation lives at `(0, 3)` and `(1, 3)`.

pub use nalgebra::{Matrix4, Vector4};

/// 4x4 matrix type
pub type Mat4 = Matrix4<f32>;

/// 2D point type
pub type Point2 = nalgebra::Point2<f32>;

/// Build a 2D translation matrix
pub fn translation(x: f32, y: f32) -> Mat4 {
    let mut matrix = Mat4::identity();
    matrix[(0, 3)] = x;
    matrix[(1, 3)] = y;
    matrix
}

/// Build a 2D scale matrix
pub fn scale(x: f32, y: f32) -> Mat4 {
    Mat4::new_nonuniform_scaling(&nalgebra::Vector3::new(x, y, 1.0))
}

/// Map a 2D point through a 4x4 transform, including the perspective divide
pub fn map_point(matrix: &Mat4, point: Point2) -> Point2 {
    let mapped = matrix * Vector4::new(point.x, point.y, 0.0, 1.0);
    let w = if mapped.w == 0.0 { 1.0 } else { mapped.w };
    Point2::new(mapped.x / w, mapped.y / w)
}
