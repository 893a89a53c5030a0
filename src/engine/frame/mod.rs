//! ### English
//! Decoded video frames handed to the renderer, plus the single-slot pending frame buffer.
//!
//! A frame owns a release callback that runs exactly once when the frame is dropped, so every
//! path that discards a frame (rendered, displaced, no surface, shutdown) returns it to the
//! producer.
//!
//! ### 中文
//! 交给渲染器的已解码视频帧，以及单槽待渲染帧缓冲。
//!
//! 帧持有一个释放回调，在帧被 drop 时恰好执行一次；因此任何丢弃帧的路径
//! （已渲染、被替换、无 surface、关闭）都会把帧归还给生产者。
mod slot;

use std::fmt;

use super::matrix::{Mat4, VERTICAL_FLIP};

pub(crate) use slot::PendingFrameSlot;

/// ### English
/// Clockwise frame rotation.
///
/// ### 中文
/// 帧的顺时针旋转角度。
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Rotation {
    #[default]
    Deg0,
    Deg90,
    Deg180,
    Deg270,
}

impl Rotation {
    pub fn degrees(self) -> u32 {
        match self {
            Rotation::Deg0 => 0,
            Rotation::Deg90 => 90,
            Rotation::Deg180 => 180,
            Rotation::Deg270 => 270,
        }
    }

    /// ### English
    /// Returns `true` for 90/270, where width and height swap on screen.
    ///
    /// ### 中文
    /// 90/270 度时返回 `true`，此时屏幕上的宽高互换。
    pub fn is_transposed(self) -> bool {
        matches!(self, Rotation::Deg90 | Rotation::Deg270)
    }
}

impl TryFrom<u32> for Rotation {
    type Error = u32;

    fn try_from(degrees: u32) -> Result<Self, Self::Error> {
        match degrees {
            0 => Ok(Rotation::Deg0),
            90 => Ok(Rotation::Deg90),
            180 => Ok(Rotation::Deg180),
            270 => Ok(Rotation::Deg270),
            other => Err(other),
        }
    }
}

/// ### English
/// Three-plane I420 pixel data (Y, U, V) with per-plane row strides in bytes.
///
/// ### 中文
/// 三平面 I420 像素数据（Y、U、V），以及每个平面的行跨度（字节）。
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct I420Buffer {
    pub planes: [Vec<u8>; 3],
    pub strides: [u32; 3],
}

/// ### English
/// Pixel payload of a frame: CPU planes or an existing GPU texture.
///
/// ### 中文
/// 帧的像素载荷：CPU 平面数据，或已存在的 GPU 纹理。
#[derive(Clone, Debug, PartialEq)]
pub enum FrameBuffer {
    I420(I420Buffer),
    /// ### English
    /// External (OES) texture produced by a hardware decoder.
    ///
    /// ### 中文
    /// 由硬件解码器产生的外部（OES）纹理。
    Texture {
        texture_id: u32,
        sampling_matrix: Mat4,
    },
}

type ReleaseCallback = Box<dyn FnOnce() + Send + 'static>;

/// ### English
/// One decoded video frame. Ownership moves into the renderer on submission; the release
/// callback hands it back to the producer exactly once, when the frame is dropped.
///
/// ### 中文
/// 一帧已解码视频。提交后所有权转移给渲染器；释放回调在帧被 drop 时恰好执行一次，
/// 将其交还给生产者。
pub struct VideoFrame {
    width: u32,
    height: u32,
    rotation: Rotation,
    buffer: FrameBuffer,
    on_release: Option<ReleaseCallback>,
}

impl VideoFrame {
    /// ### English
    /// Creates a frame backed by CPU-side I420 planes.
    ///
    /// ### 中文
    /// 创建由 CPU 侧 I420 平面数据支撑的帧。
    pub fn i420(width: u32, height: u32, rotation: Rotation, buffer: I420Buffer) -> Self {
        Self {
            width,
            height,
            rotation,
            buffer: FrameBuffer::I420(buffer),
            on_release: None,
        }
    }

    /// ### English
    /// Creates a frame backed by an existing OES texture.
    ///
    /// ### 中文
    /// 创建由已存在 OES 纹理支撑的帧。
    pub fn texture(
        width: u32,
        height: u32,
        rotation: Rotation,
        texture_id: u32,
        sampling_matrix: Mat4,
    ) -> Self {
        Self {
            width,
            height,
            rotation,
            buffer: FrameBuffer::Texture {
                texture_id,
                sampling_matrix,
            },
            on_release: None,
        }
    }

    /// ### English
    /// Attaches the callback run once when the renderer is done with this frame.
    ///
    /// ### 中文
    /// 绑定释放回调：渲染器用完该帧时执行一次。
    pub fn with_release(mut self, on_release: impl FnOnce() + Send + 'static) -> Self {
        self.on_release = Some(Box::new(on_release));
        self
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn rotation(&self) -> Rotation {
        self.rotation
    }

    pub fn buffer(&self) -> &FrameBuffer {
        &self.buffer
    }

    pub fn rotated_width(&self) -> u32 {
        if self.rotation.is_transposed() {
            self.height
        } else {
            self.width
        }
    }

    pub fn rotated_height(&self) -> u32 {
        if self.rotation.is_transposed() {
            self.width
        } else {
            self.height
        }
    }

    /// ### English
    /// Texture sampling matrix before rotation and layout are applied.
    ///
    /// ### 中文
    /// 应用旋转与布局之前的纹理采样矩阵。
    pub fn sampling_matrix(&self) -> Mat4 {
        match &self.buffer {
            FrameBuffer::I420(_) => VERTICAL_FLIP,
            FrameBuffer::Texture {
                sampling_matrix, ..
            } => *sampling_matrix,
        }
    }

    /// ### English
    /// Hands the frame back to its producer now.
    ///
    /// ### 中文
    /// 立即把帧交还给生产者。
    pub fn release(self) {
        drop(self);
    }
}

impl Drop for VideoFrame {
    fn drop(&mut self) {
        if let Some(on_release) = self.on_release.take() {
            on_release();
        }
    }
}

impl fmt::Debug for VideoFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VideoFrame")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("rotation", &self.rotation)
            .field("yuv", &matches!(self.buffer, FrameBuffer::I420(_)))
            .finish()
    }
}


#[cfg(test)]
mod tests {
    use super::test_frames::yuv_frame;
    use super::*;
    use crate::engine::matrix::IDENTITY;

    #[test]
    fn release_runs_once_on_drop() {
        let (frame, counter) = yuv_frame(4, 4, 1);
        assert_eq!(counter.get(), 0);
        frame.release();
        assert_eq!(counter.get(), 1);
    }

    #[test]
    fn rotated_dimensions_swap_for_quarter_turns() {
        let frame = VideoFrame::texture(640, 480, Rotation::Deg90, 7, IDENTITY);
        assert_eq!((frame.rotated_width(), frame.rotated_height()), (480, 640));
        let frame = VideoFrame::texture(640, 480, Rotation::Deg180, 7, IDENTITY);
        assert_eq!((frame.rotated_width(), frame.rotated_height()), (640, 480));
    }

    #[test]
    fn sampling_matrix_depends_on_buffer_kind() {
        let (frame, _) = yuv_frame(2, 2, 0);
        assert_eq!(frame.sampling_matrix(), VERTICAL_FLIP);
        let frame = VideoFrame::texture(2, 2, Rotation::Deg0, 1, IDENTITY);
        assert_eq!(frame.sampling_matrix(), IDENTITY);
    }

    #[test]
    fn rotation_accepts_only_right_angles() {
        assert_eq!(Rotation::try_from(270), Ok(Rotation::Deg270));
        assert_eq!(Rotation::try_from(45), Err(45));
    }
}
