//! ### English
//! View sizing: scaling policies, measure constraints and aspect-ratio driven display sizes.
//!
//! ### 中文
//! View 尺寸计算：缩放策略、测量约束，以及由宽高比驱动的显示尺寸。

use dpi::PhysicalSize;

use super::frame::Rotation;

/// ### English
/// Minimum visible fraction of the frame under [`ScalingType::AspectBalanced`].
///
/// ### 中文
/// [`ScalingType::AspectBalanced`] 下帧的最小可见比例。
const BALANCED_VISIBLE_FRACTION: f32 = 0.5625;

/// ### English
/// Cap used for a dimension the parent leaves unconstrained.
///
/// ### 中文
/// 父布局未约束某一维度时使用的上限。
const UNBOUNDED: u32 = i32::MAX as u32;

/// ### English
/// How a frame's aspect ratio maps onto the view bounds.
///
/// ### 中文
/// 帧宽高比如何映射到 view 边界。
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ScalingType {
    /// ### English
    /// Whole frame visible, letterboxed.
    ///
    /// ### 中文
    /// 完整显示帧（加黑边）。
    AspectFit,
    /// ### English
    /// View filled, frame cropped.
    ///
    /// ### 中文
    /// 填满 view（裁剪帧）。
    AspectFill,
    /// ### English
    /// Compromise: crops at most until 56.25% of the frame stays visible.
    ///
    /// ### 中文
    /// 折中：最多裁剪到帧的 56.25% 仍可见。
    #[default]
    AspectBalanced,
}

impl ScalingType {
    fn visible_fraction(self) -> f32 {
        match self {
            ScalingType::AspectFit => 1.0,
            ScalingType::AspectFill => 0.0,
            ScalingType::AspectBalanced => BALANCED_VISIBLE_FRACTION,
        }
    }
}

/// ### English
/// Size constraint imposed by the parent for one dimension during measurement.
///
/// ### 中文
/// 测量时父布局对某一维度施加的尺寸约束。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MeasureSpec {
    Exactly(u32),
    AtMost(u32),
    Unspecified,
}

impl MeasureSpec {
    fn cap(self) -> u32 {
        match self {
            MeasureSpec::Exactly(size) | MeasureSpec::AtMost(size) => size,
            MeasureSpec::Unspecified => UNBOUNDED,
        }
    }
}

/// ### English
/// Largest size inside `max_width` x `max_height` that shows a frame of `video_aspect` under
/// `scaling`. An aspect of 0 (no frame yet) or the fill policy returns the whole box.
///
/// ### 中文
/// 在 `max_width` x `max_height` 内、按 `scaling` 显示宽高比为 `video_aspect` 的帧时的最大尺寸。
/// 宽高比为 0（尚无帧）或 fill 策略时返回整个区域。
pub fn display_size(
    scaling: ScalingType,
    video_aspect: f32,
    max_width: u32,
    max_height: u32,
) -> PhysicalSize<u32> {
    let fraction = scaling.visible_fraction();
    if fraction == 0.0 || video_aspect == 0.0 {
        return PhysicalSize::new(max_width, max_height);
    }

    let width = (max_height as f32 / fraction * video_aspect).round();
    let height = (max_width as f32 / fraction / video_aspect).round();
    PhysicalSize::new(
        max_width.min(width as u32),
        max_height.min(height as u32),
    )
}

/// ### English
/// On-screen aspect ratio of a frame (0 when there is no geometry yet).
///
/// ### 中文
/// 帧在屏幕上的宽高比（尚无几何信息时为 0）。
pub(crate) fn frame_aspect_ratio(width: u32, height: u32, rotation: Rotation) -> f32 {
    if width == 0 || height == 0 {
        return 0.0;
    }
    if rotation.is_transposed() {
        height as f32 / width as f32
    } else {
        width as f32 / height as f32
    }
}

/// ### English
/// Desired view size for the given constraints. An `AtMost` constraint claims its whole cap.
///
/// ### 中文
/// 给定约束下期望的 view 尺寸。`AtMost` 约束会占满其上限。
pub(crate) fn desired_layout_size(
    width_spec: MeasureSpec,
    height_spec: MeasureSpec,
    scaling: ScalingType,
    video_aspect: f32,
) -> PhysicalSize<u32> {
    let max_width = width_spec.cap();
    let max_height = height_spec.cap();
    let mut size = display_size(scaling, video_aspect, max_width, max_height);
    if matches!(width_spec, MeasureSpec::AtMost(_)) {
        size.width = max_width;
    }
    if matches!(height_spec, MeasureSpec::AtMost(_)) {
        size.height = max_height;
    }
    size
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fit_letterboxes_inside_the_box() {
        let size = display_size(ScalingType::AspectFit, 2.0, 1000, 1000);
        assert_eq!(size, PhysicalSize::new(1000, 500));
    }

    #[test]
    fn fill_and_unknown_aspect_take_the_whole_box() {
        assert_eq!(
            display_size(ScalingType::AspectFill, 16.0 / 9.0, 300, 200),
            PhysicalSize::new(300, 200)
        );
        assert_eq!(
            display_size(ScalingType::AspectFit, 0.0, 300, 200),
            PhysicalSize::new(300, 200)
        );
    }

    #[test]
    fn balanced_allows_partial_crop() {
        // 500 / 0.5625 rounds to 889; the height stays capped at 500.
        let size = display_size(ScalingType::AspectBalanced, 1.0, 1000, 500);
        assert_eq!(size, PhysicalSize::new(889, 500));
    }

    #[test]
    fn aspect_ratio_honours_rotation() {
        assert_eq!(frame_aspect_ratio(640, 480, Rotation::Deg0), 640.0 / 480.0);
        assert_eq!(frame_aspect_ratio(640, 480, Rotation::Deg270), 480.0 / 640.0);
        assert_eq!(frame_aspect_ratio(0, 480, Rotation::Deg0), 0.0);
    }

    #[test]
    fn at_most_claims_the_cap() {
        let size = desired_layout_size(
            MeasureSpec::AtMost(800),
            MeasureSpec::Exactly(600),
            ScalingType::AspectFit,
            1.0,
        );
        assert_eq!(size, PhysicalSize::new(800, 600));

        let size = desired_layout_size(
            MeasureSpec::Exactly(800),
            MeasureSpec::Exactly(600),
            ScalingType::AspectFit,
            1.0,
        );
        assert_eq!(size, PhysicalSize::new(600, 600));
    }

    #[test]
    fn unspecified_is_bounded_by_the_other_dimension() {
        let size = desired_layout_size(
            MeasureSpec::Exactly(400),
            MeasureSpec::Unspecified,
            ScalingType::AspectFit,
            2.0,
        );
        assert_eq!(size, PhysicalSize::new(400, 200));
    }
}
