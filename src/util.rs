use enum_map::Enum;

pub type Vec3 = cgmath::Vector3<f32>;
pub type Mat3 = cgmath::Matrix3<f32>;
pub type Mat4 = cgmath::Matrix4<f32>;

pub fn enum_iter<E>() -> impl Iterator<Item = E>
where
    E: Enum,
{
    (0..E::LENGTH).map(|i| E::from_usize(i))
}

/// Equality on coordinates that drift under repeated rotation
/// (2.1 may come back as 2.0999999).
pub fn approx_eq(a: f32, b: f32, epsilon: f32) -> bool {
    (a - b).abs() <= epsilon
}

/// Upper-left 3x3 block of an affine transform.
pub fn rotation_part(mat: &Mat4) -> Mat3 {
    Mat3::from_cols(mat.x.truncate(), mat.y.truncate(), mat.z.truncate())
}

pub fn translation_part(mat: &Mat4) -> Vec3 {
    mat.w.truncate()
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgmath::{Deg, SquareMatrix};

    #[test]
    fn transform_parts() {
        let mat = Mat4::from_translation(Vec3::new(2.1, 0.0, -2.1))
            * Mat4::from_axis_angle(Vec3::new(0.0, 1.0, 0.0), Deg(90.0));
        assert_eq!(translation_part(&mat), Vec3::new(2.1, 0.0, -2.1));
        let rot = rotation_part(&mat);
        assert!(approx_eq(rot.determinant(), 1.0, 1e-5));
        assert!(approx_eq(rot.x.z, -1.0, 1e-5));
    }

    #[test]
    fn tolerance() {
        assert!(approx_eq(2.1, 2.0999999, 0.1));
        assert!(approx_eq(-2.1, -2.05, 0.1));
        assert!(!approx_eq(2.1, 0.0, 0.1));
    }
}
