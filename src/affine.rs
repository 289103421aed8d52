use ndarray::Array2;
use std::f32::consts::PI;

/// Represents an affine transformation matrix and its parameters
#[derive(Clone, Debug)]
pub struct AffineTransform {
    /// 2x3 affine transformation matrix
    pub matrix: Array2<f32>,
    /// Rotation in degrees
    pub rotation: f32,
    pub shear: f32,
    /// Vertical and horizontal scale factors
    pub hs: f32,
    pub ws: f32,
}

impl AffineTransform {
    /// Rotation by `rotation` degrees with uniform `scale` and a translation
    #[must_use]
    pub fn new(rotation: f32, scale: f32, tx: f32, ty: f32) -> Self {
        let mut matrix = rotate_shear_scale(rotation, 0.0, scale, scale);
        matrix[[0, 2]] = tx;
        matrix[[1, 2]] = ty;
        AffineTransform {
            matrix,
            rotation,
            shear: 0.0,
            hs: scale,
            ws: scale,
        }
    }

    /// Create identity transformation
    #[must_use]
    pub fn identity() -> Self {
        AffineTransform {
            matrix: Array2::from_shape_fn((2, 3), |(i, j)| if i == j { 1.0 } else { 0.0 }),
            rotation: 0.0,
            shear: 0.0,
            hs: 1.0,
            ws: 1.0,
        }
    }

    /// Rotate + shear + anisotropic scale, translated so the transformed
    /// source lands centred in an `out_size` canvas.
    ///
    /// `src_size` and `out_size` are `(width, height)`.
    #[must_use]
    pub fn augment(
        rotation: f32,
        shear: f32,
        hs: f32,
        ws: f32,
        src_size: (usize, usize),
        out_size: (f32, f32),
    ) -> Self {
        let mut matrix = rotate_shear_scale(rotation, shear, hs, ws);
        let (src_w, src_h) = (src_size.0 as f32, src_size.1 as f32);
        let extent_x = matrix[[0, 0]] * src_w + matrix[[0, 1]] * src_h;
        let extent_y = matrix[[1, 0]] * src_w + matrix[[1, 1]] * src_h;
        matrix[[0, 2]] = (out_size.0 - extent_x) / 2.0;
        matrix[[1, 2]] = (out_size.1 - extent_y) / 2.0;
        AffineTransform {
            matrix,
            rotation,
            shear,
            hs,
            ws,
        }
    }
}

/// Linear part of the augmentation matrix, zero translation
fn rotate_shear_scale(rotation: f32, shear: f32, hs: f32, ws: f32) -> Array2<f32> {
    let rad = f64::from(rotation) / 180.0 * f64::from(PI);
    #[allow(clippy::cast_possible_truncation)]
    let (cos_a, sin_a) = (rad.cos() as f32, rad.sin() as f32);

    let mut matrix = Array2::zeros((2, 3));
    matrix[[0, 0]] = hs * cos_a - shear * sin_a * ws;
    matrix[[0, 1]] = hs * sin_a + shear * cos_a * ws;
    matrix[[1, 0]] = -sin_a * ws;
    matrix[[1, 1]] = cos_a * ws;
    matrix
}

/// Apply affine transformation to a point
#[must_use]
pub fn apply_affine_transform(point: (f32, f32), transform: &AffineTransform) -> (f32, f32) {
    let x = point.0;
    let y = point.1;
    let m = &transform.matrix;

    let new_x = m[[0, 0]] * x + m[[0, 1]] * y + m[[0, 2]];
    let new_y = m[[1, 0]] * x + m[[1, 1]] * y + m[[1, 2]];

    (new_x, new_y)
}

/// Get the inverse affine transformation
///
/// A singular matrix inverts to the zero map, which sends every output pixel
/// to the source origin.
#[must_use]
pub fn invert_affine(transform: &AffineTransform) -> AffineTransform {
    let m = &transform.matrix;

    // Calculate determinant of 2x2 rotation/scale matrix
    let det = m[[0, 0]] * m[[1, 1]] - m[[0, 1]] * m[[1, 0]];
    let inv_det = if det.abs() < 1e-10 { 0.0 } else { 1.0 / det };

    let mut inv_m = Array2::zeros((2, 3));

    inv_m[[0, 0]] = m[[1, 1]] * inv_det;
    inv_m[[0, 1]] = -m[[0, 1]] * inv_det;
    inv_m[[1, 0]] = -m[[1, 0]] * inv_det;
    inv_m[[1, 1]] = m[[0, 0]] * inv_det;

    inv_m[[0, 2]] = -(inv_m[[0, 0]] * m[[0, 2]] + inv_m[[0, 1]] * m[[1, 2]]);
    inv_m[[1, 2]] = -(inv_m[[1, 0]] * m[[0, 2]] + inv_m[[1, 1]] * m[[1, 2]]);

    AffineTransform {
        matrix: inv_m,
        rotation: -transform.rotation,
        shear: -transform.shear,
        hs: 1.0 / transform.hs,
        ws: 1.0 / transform.ws,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_point(actual: (f32, f32), expected: (f32, f32), tol: f32) {
        assert!(
            (actual.0 - expected.0).abs() < tol && (actual.1 - expected.1).abs() < tol,
            "{actual:?} != {expected:?}"
        );
    }

    #[test]
    fn test_identity_transform() {
        let t = AffineTransform::identity();
        assert_point(apply_affine_transform((10.0, 20.0), &t), (10.0, 20.0), 1e-5);
    }

    #[test]
    fn test_translation() {
        let t = AffineTransform::new(0.0, 1.0, 5.0, 10.0);
        assert_point(apply_affine_transform((0.0, 0.0), &t), (5.0, 10.0), 1e-5);
    }

    #[test]
    fn test_rotation_90_degrees() {
        // image coordinates: y grows downward, positive angles turn x toward -y
        let t = AffineTransform::new(90.0, 1.0, 0.0, 0.0);
        assert_point(apply_affine_transform((1.0, 0.0), &t), (0.0, -1.0), 1e-5);
        assert_point(apply_affine_transform((0.0, 1.0), &t), (1.0, 0.0), 1e-5);
    }

    #[test]
    fn test_uniform_scaling() {
        let t = AffineTransform::new(0.0, 2.0, 0.0, 0.0);
        assert_point(apply_affine_transform((5.0, 10.0), &t), (10.0, 20.0), 1e-5);
    }

    #[test]
    fn test_shear_moves_x_by_y() {
        let t = AffineTransform::augment(0.0, 0.5, 1.0, 1.0, (0, 0), (0.0, 0.0));
        assert_point(apply_affine_transform((0.0, 4.0), &t), (2.0, 4.0), 1e-5);
    }

    #[test]
    fn test_anisotropic_scale() {
        let t = AffineTransform::augment(0.0, 0.0, 2.0, 3.0, (0, 0), (0.0, 0.0));
        assert_point(apply_affine_transform((1.0, 1.0), &t), (2.0, 3.0), 1e-5);
    }

    #[test]
    fn test_augment_identity_keeps_canvas_aligned() {
        let t = AffineTransform::augment(0.0, 0.0, 1.0, 1.0, (8, 6), (8.0, 6.0));
        assert_point(apply_affine_transform((3.0, 2.0), &t), (3.0, 2.0), 1e-5);
    }

    #[test]
    fn test_augment_centres_scaled_content() {
        // 2x scale of a 4x4 source into an 8x8 canvas: source corner maps to canvas corner
        let t = AffineTransform::augment(0.0, 0.0, 2.0, 2.0, (4, 4), (8.0, 8.0));
        assert_point(apply_affine_transform((4.0, 4.0), &t), (8.0, 8.0), 1e-5);
        // half scale into a 2x2 canvas
        let t = AffineTransform::augment(0.0, 0.0, 0.5, 0.5, (4, 4), (2.0, 2.0));
        assert_point(apply_affine_transform((0.0, 0.0), &t), (0.0, 0.0), 1e-5);
    }

    #[test]
    fn test_matrix_inversion_round_trip() {
        let t = AffineTransform::augment(30.0, 0.2, 1.5, 0.8, (100, 50), (120.0, 70.0));
        let inv = invert_affine(&t);
        let point = (100.0, 50.0);
        let forward = apply_affine_transform(point, &t);
        assert_point(apply_affine_transform(forward, &inv), point, 1e-2);
    }

    #[test]
    fn test_singular_matrix_inversion() {
        let t = AffineTransform::augment(0.0, 0.0, 0.0, 0.0, (4, 4), (4.0, 4.0));
        let inv = invert_affine(&t);
        let (x, y) = apply_affine_transform((5.0, 5.0), &inv);
        assert!(x.is_finite() && y.is_finite());
    }
}
