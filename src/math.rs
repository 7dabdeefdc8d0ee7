//! Small matrix helpers shared by the frame driver and the web glue.
//!
//! All matrices are column-major, which is both what WebXR hands out and what
//! cgmath stores.

use cgmath::{InnerSpace, Matrix4, Vector3, Vector4};

/// The 4x4 identity as the flat array uniforms are written from.
pub const IDENTITY: [f32; 16] = [
    1.0, 0.0, 0.0, 0.0, //
    0.0, 1.0, 0.0, 0.0, //
    0.0, 0.0, 1.0, 0.0, //
    0.0, 0.0, 0.0, 1.0,
];

/// Applies `m` to the homogeneous vector `v`.
pub fn mul_vec_by_mat(m: &Matrix4<f32>, v: Vector4<f32>) -> Vector4<f32> {
    m * v
}

/// Builds a matrix from 16 column-major floats. Short slices are padded from the identity.
pub fn matrix_from_slice(values: &[f32]) -> Matrix4<f32> {
    let mut flat = IDENTITY;
    flat.iter_mut()
        .zip(values.iter())
        .for_each(|(dst, src)| *dst = *src);
    let m: &Matrix4<f32> = (&flat).into();
    *m
}

pub fn to_array(m: &Matrix4<f32>) -> [f32; 16] {
    let m: &[f32; 16] = m.as_ref();
    *m
}

pub fn translation(offset: Vector3<f32>) -> Matrix4<f32> {
    Matrix4::from_translation(offset)
}

/// The point a pose transform sends the origin to.
pub fn position_of(m: &Matrix4<f32>) -> Vector3<f32> {
    mul_vec_by_mat(m, Vector4::new(0.0, 0.0, 0.0, 1.0)).truncate()
}

/// Where `m` points along -Z, flattened onto the ground plane.
///
/// Returns `None` when the transform looks straight up or down and there is no
/// usable horizontal direction.
pub fn horizontal_forward(m: &Matrix4<f32>) -> Option<Vector3<f32>> {
    let front = mul_vec_by_mat(m, Vector4::new(0.0, 0.0, -1.0, 1.0));
    let center = mul_vec_by_mat(m, Vector4::new(0.0, 0.0, 0.0, 1.0));
    let flat = Vector3::new(front.x - center.x, 0.0, front.z - center.z);
    if flat.magnitude2() <= f32::EPSILON {
        return None;
    }
    Some(flat.normalize())
}
