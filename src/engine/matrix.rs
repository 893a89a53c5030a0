//! ### English
//! Column-major 4x4 texture-transform math used to place a frame on the surface.
//!
//! ### 中文
//! 列主序 4x4 纹理变换矩阵运算，用于把帧放置到 surface 上。

/// ### English
/// Column-major 4x4 matrix (OpenGL layout).
///
/// ### 中文
/// 列主序 4x4 矩阵（OpenGL 布局）。
pub type Mat4 = [f32; 16];

pub(crate) const IDENTITY: Mat4 = [
    1.0, 0.0, 0.0, 0.0, //
    0.0, 1.0, 0.0, 0.0, //
    0.0, 0.0, 1.0, 0.0, //
    0.0, 0.0, 0.0, 1.0,
];

/// ### English
/// Sampling matrix for CPU-side planar frames: flips V so row 0 of the planes lands on top.
///
/// ### 中文
/// CPU 侧平面帧的采样矩阵：翻转 V 轴，使平面数据第 0 行显示在顶部。
pub(crate) const VERTICAL_FLIP: Mat4 = [
    1.0, 0.0, 0.0, 0.0, //
    0.0, -1.0, 0.0, 0.0, //
    0.0, 0.0, 1.0, 0.0, //
    0.0, 1.0, 0.0, 1.0,
];

/// ### English
/// Returns `a * b`.
///
/// ### 中文
/// 返回 `a * b`。
pub fn multiply_matrices(a: &Mat4, b: &Mat4) -> Mat4 {
    let mut out = [0.0f32; 16];
    for col in 0..4 {
        for row in 0..4 {
            out[col * 4 + row] = (0..4).map(|k| a[k * 4 + row] * b[col * 4 + k]).sum();
        }
    }
    out
}

/// Moves the transform origin from the texture corner to its centre.
fn adjust_origin(matrix: &mut Mat4) {
    matrix[12] -= 0.5 * (matrix[0] + matrix[4]);
    matrix[13] -= 0.5 * (matrix[1] + matrix[5]);
    matrix[12] += 0.5;
    matrix[13] += 0.5;
}

/// ### English
/// Rotates `texture_matrix` by `degrees` around the texture centre (Z axis).
///
/// ### 中文
/// 以纹理中心为原点，将 `texture_matrix` 绕 Z 轴旋转 `degrees` 度。
pub fn rotate_texture_matrix(texture_matrix: &Mat4, degrees: f32) -> Mat4 {
    let radians = degrees.to_radians();
    let (sin, cos) = radians.sin_cos();
    let mut rotation = IDENTITY;
    rotation[0] = cos;
    rotation[1] = sin;
    rotation[4] = -sin;
    rotation[5] = cos;
    adjust_origin(&mut rotation);
    multiply_matrices(texture_matrix, &rotation)
}

/// ### English
/// Builds the layout matrix that maps a video of `video_aspect` onto a display of
/// `display_aspect`, cropping the longer dimension and optionally flipping horizontally.
///
/// #### Parameters
/// - `mirror`: Flip horizontally.
/// - `video_aspect`: Frame width / height after rotation.
/// - `display_aspect`: Layout width / height.
///
/// ### 中文
/// 构建布局矩阵：把宽高比为 `video_aspect` 的视频映射到宽高比为 `display_aspect` 的显示区域，
/// 对较长的维度做裁剪，并可选水平翻转。
///
/// #### 参数
/// - `mirror`：是否水平翻转。
/// - `video_aspect`：旋转后的帧宽/高。
/// - `display_aspect`：布局宽/高。
pub fn layout_matrix(mirror: bool, video_aspect: f32, display_aspect: f32) -> Mat4 {
    let mut scale_x = 1.0f32;
    let mut scale_y = 1.0f32;
    if display_aspect > video_aspect {
        scale_y = video_aspect / display_aspect;
    } else {
        scale_x = display_aspect / video_aspect;
    }
    if mirror {
        scale_x = -scale_x;
    }

    let mut matrix = IDENTITY;
    matrix[0] = scale_x;
    matrix[5] = scale_y;
    adjust_origin(&mut matrix);
    matrix
}

#[cfg(test)]
mod tests {
    use super::*;

    fn apply(m: &Mat4, x: f32, y: f32) -> (f32, f32) {
        (m[0] * x + m[4] * y + m[12], m[1] * x + m[5] * y + m[13])
    }

    fn close(a: (f32, f32), b: (f32, f32)) -> bool {
        (a.0 - b.0).abs() < 1e-5 && (a.1 - b.1).abs() < 1e-5
    }

    #[test]
    fn identity_is_neutral() {
        let m = layout_matrix(false, 1.5, 2.0);
        assert_eq!(multiply_matrices(&IDENTITY, &m), m);
        assert_eq!(multiply_matrices(&m, &IDENTITY), m);
    }

    #[test]
    fn matching_aspect_is_identity() {
        let m = layout_matrix(false, 16.0 / 9.0, 16.0 / 9.0);
        assert!(close(apply(&m, 0.0, 0.0), (0.0, 0.0)));
        assert!(close(apply(&m, 1.0, 1.0), (1.0, 1.0)));
    }

    #[test]
    fn wider_display_crops_vertically_around_centre() {
        let m = layout_matrix(false, 1.0, 2.0);
        assert!(close(apply(&m, 0.5, 0.5), (0.5, 0.5)));
        assert!(close(apply(&m, 0.0, 0.0), (0.0, 0.25)));
        assert!(close(apply(&m, 1.0, 1.0), (1.0, 0.75)));
    }

    #[test]
    fn mirror_flips_horizontally() {
        let m = layout_matrix(true, 1.0, 1.0);
        assert!(close(apply(&m, 0.0, 0.3), (1.0, 0.3)));
        assert!(close(apply(&m, 1.0, 0.3), (0.0, 0.3)));
    }

    #[test]
    fn quarter_turn_rotates_about_centre() {
        let m = rotate_texture_matrix(&IDENTITY, 90.0);
        assert!(close(apply(&m, 0.5, 0.5), (0.5, 0.5)));
        assert!(close(apply(&m, 1.0, 0.5), (0.5, 1.0)));
        assert!(close(apply(&m, 0.0, 0.0), (1.0, 0.0)));
    }

    #[test]
    fn vertical_flip_maps_top_to_bottom() {
        assert!(close(apply(&VERTICAL_FLIP, 0.2, 0.0), (0.2, 1.0)));
        assert!(close(apply(&VERTICAL_FLIP, 0.2, 1.0), (0.2, 0.0)));
    }
}
