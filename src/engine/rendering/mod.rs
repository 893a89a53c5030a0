//! ### English
//! GPU seam of the renderer.
//!
//! `SharedGlContext` is the process-wide handle a renderer borrows at initialize; on the render
//! thread it creates one `GlContext` (context + window-surface binding), which in turn creates a
//! `GlDrawer` (texture upload + full-rectangle draw). Only the render thread touches these.
//!
//! ### 中文
//! 渲染器的 GPU 抽象层。
//!
//! `SharedGlContext` 是渲染器在 initialize 时借用的进程级句柄；它在渲染线程上创建一个
//! `GlContext`（上下文 + 窗口 surface 绑定），后者再创建 `GlDrawer`（纹理上传 + 全矩形绘制）。
//! 这些对象只允许渲染线程访问。

mod drawer;
mod provider;
#[cfg(feature = "surfman")]
mod surfman_context;
#[cfg(test)]
pub(crate) mod testing;

use std::ffi::c_void;

use dpi::PhysicalSize;

use super::error::RenderError;
use super::frame::I420Buffer;
use super::matrix::Mat4;

pub use drawer::GlRectDrawer;
pub use provider::{SharedContextLease, SharedContextProvider};
#[cfg(feature = "surfman")]
pub use surfman_context::{SurfmanGlContext, SurfmanSharedContext};

/// ### English
/// Opaque platform window handle (e.g. `ANativeWindow*`), carried as an integer so it can cross
/// to the render thread. The host keeps it valid between surface-created and surface-destroyed.
///
/// ### 中文
/// 不透明的平台窗口句柄（如 `ANativeWindow*`），以整数形式携带以便传递到渲染线程。
/// 宿主保证其在 surface-created 与 surface-destroyed 之间有效。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NativeSurface(usize);

impl NativeSurface {
    pub fn from_ptr(ptr: *mut c_void) -> Self {
        Self(ptr as usize)
    }

    pub fn as_ptr(self) -> *mut c_void {
        self.0 as *mut c_void
    }
}

/// ### English
/// Framebuffer pixel-format configuration requested when the context is created.
///
/// ### 中文
/// 创建上下文时请求的 framebuffer 像素格式配置。
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ConfigAttributes {
    /// ### English
    /// RGB888, no alpha.
    ///
    /// ### 中文
    /// RGB888，无 alpha。
    #[default]
    Plain,
    /// ### English
    /// RGBA8888.
    ///
    /// ### 中文
    /// RGBA8888。
    Rgba,
}

impl ConfigAttributes {
    pub fn has_alpha(self) -> bool {
        matches!(self, ConfigAttributes::Rgba)
    }
}

/// ### English
/// Draw rectangle in surface pixels.
///
/// ### 中文
/// 以 surface 像素为单位的绘制矩形。
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Viewport {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    pub fn full(size: PhysicalSize<u32>) -> Self {
        Self {
            x: 0,
            y: 0,
            width: size.width,
            height: size.height,
        }
    }
}

/// ### English
/// Process-wide shared GPU context. Renderers create their own `GlContext` from it on their
/// render thread so GPU objects can be shared between views.
///
/// ### 中文
/// 进程级共享 GPU 上下文。各渲染器在自己的渲染线程上由它创建 `GlContext`，
/// 从而在多个 view 之间共享 GPU 对象。
pub trait SharedGlContext: Send + Sync {
    /// ### English
    /// Creates a context sharing objects with this one. Called on the render thread.
    ///
    /// ### 中文
    /// 创建一个与本上下文共享对象的新上下文。在渲染线程调用。
    fn create_context(&self, config: ConfigAttributes) -> Result<Box<dyn GlContext>, RenderError>;
}

/// ### English
/// Per-renderer GPU context plus its optional window-surface binding.
///
/// ### 中文
/// 每个渲染器独占的 GPU 上下文，以及可选的窗口 surface 绑定。
pub trait GlContext {
    /// ### English
    /// Whether a window surface is bound.
    ///
    /// ### 中文
    /// 是否已绑定窗口 surface。
    fn has_surface(&self) -> bool;

    /// ### English
    /// Binds a window surface for `surface`.
    ///
    /// #### Parameters
    /// - `surface`: Platform window handle.
    /// - `size`: Last known platform surface size (may be zero before the first change event).
    ///
    /// ### 中文
    /// 为 `surface` 绑定窗口 surface。
    ///
    /// #### 参数
    /// - `surface`：平台窗口句柄。
    /// - `size`：最近一次已知的平台 surface 尺寸（首次 change 事件前可能为 0）。
    fn create_surface(
        &mut self,
        surface: NativeSurface,
        size: PhysicalSize<u32>,
    ) -> Result<(), RenderError>;

    /// ### English
    /// Resizes the bound window surface to the platform surface's new size. No-op when none is
    /// bound.
    ///
    /// ### 中文
    /// 将已绑定的窗口 surface 调整为平台 surface 的新尺寸。未绑定时为空操作。
    fn resize_surface(&mut self, size: PhysicalSize<u32>) -> Result<(), RenderError>;

    fn make_current(&mut self) -> Result<(), RenderError>;

    fn detach_current(&mut self);

    /// ### English
    /// Drops the window-surface binding (no-op when none is bound).
    ///
    /// ### 中文
    /// 解除窗口 surface 绑定（未绑定时为空操作）。
    fn release_surface(&mut self);

    /// ### English
    /// Size the GPU reports for the bound surface (zero when none is bound).
    ///
    /// ### 中文
    /// GPU 报告的已绑定 surface 尺寸（未绑定时为 0）。
    fn surface_size(&self) -> PhysicalSize<u32>;

    /// ### English
    /// Clears the color buffer to `rgba`.
    ///
    /// ### 中文
    /// 将颜色缓冲清为 `rgba`。
    fn clear(&mut self, rgba: [f32; 4]);

    fn swap_buffers(&mut self) -> Result<(), RenderError>;

    /// ### English
    /// Creates a drawer bound to this context's GL API.
    ///
    /// ### 中文
    /// 创建绑定到本上下文 GL API 的绘制器。
    fn create_drawer(&mut self) -> Result<Box<dyn GlDrawer>, RenderError>;

    /// ### English
    /// Destroys the surface binding and the context itself.
    ///
    /// ### 中文
    /// 销毁 surface 绑定以及上下文本身。
    fn release(&mut self);
}

/// ### English
/// Uploads frame pixels and draws them over a viewport with a texture transform.
///
/// ### 中文
/// 上传帧像素，并使用纹理变换矩阵将其绘制到指定视口。
pub trait GlDrawer {
    /// ### English
    /// Uploads the three I420 planes and draws them.
    ///
    /// #### Parameters
    /// - `buffer`: Planar pixel data.
    /// - `width`, `height`: Unrotated frame size (plane geometry).
    /// - `tex_matrix`: Combined sampling x rotation x layout transform.
    /// - `viewport`: Target rectangle on the surface.
    ///
    /// ### 中文
    /// 上传三个 I420 平面并绘制。
    ///
    /// #### 参数
    /// - `buffer`：平面像素数据。
    /// - `width`、`height`：未旋转的帧尺寸（平面几何）。
    /// - `tex_matrix`：采样 x 旋转 x 布局 的组合变换。
    /// - `viewport`：surface 上的目标矩形。
    fn draw_yuv(
        &mut self,
        buffer: &I420Buffer,
        width: u32,
        height: u32,
        tex_matrix: &Mat4,
        viewport: Viewport,
    ) -> Result<(), RenderError>;

    /// ### English
    /// Draws an existing external (OES) texture.
    ///
    /// ### 中文
    /// 绘制一个已存在的外部（OES）纹理。
    fn draw_oes(
        &mut self,
        texture_id: u32,
        tex_matrix: &Mat4,
        viewport: Viewport,
    ) -> Result<(), RenderError>;

    /// ### English
    /// Deletes programs, buffers and plane textures.
    ///
    /// ### 中文
    /// 删除着色器程序、缓冲与平面纹理。
    fn release(&mut self);
}
