//! ### English
//! Host-facing callback traits: renderer events and the UI-thread view host.
//!
//! ### 中文
//! 面向宿主的回调 trait：渲染器事件与 UI 线程 view 宿主。

use super::frame::Rotation;

/// ### English
/// A unit of work posted to the host's UI thread.
///
/// ### 中文
/// 投递到宿主 UI 线程执行的任务。
pub type UiTask = Box<dyn FnOnce() + Send + 'static>;

/// ### English
/// Listener for renderer events. Always invoked on the host's UI thread.
///
/// ### 中文
/// 渲染器事件监听器。始终在宿主 UI 线程被调用。
pub trait RendererEvents: Send + Sync {
    /// ### English
    /// The first frame of this initialize/release cycle reached the screen.
    ///
    /// ### 中文
    /// 本次 initialize/release 周期内的第一帧已上屏。
    fn on_first_frame_rendered(&self);

    /// ### English
    /// The incoming frame geometry changed.
    ///
    /// #### Parameters
    /// - `width`: Unrotated frame width in pixels.
    /// - `height`: Unrotated frame height in pixels.
    /// - `rotation`: Frame rotation.
    ///
    /// ### 中文
    /// 输入帧的几何信息发生变化。
    ///
    /// #### 参数
    /// - `width`：未旋转的帧宽度（像素）。
    /// - `height`：未旋转的帧高度（像素）。
    /// - `rotation`：帧旋转角度。
    fn on_frame_resolution_changed(&self, width: u32, height: u32, rotation: Rotation);
}

/// ### English
/// The platform view that hosts a renderer: its UI thread and its layout pass.
///
/// ### 中文
/// 承载渲染器的平台 view：提供 UI 线程与布局流程。
pub trait ViewHost: Send + Sync {
    /// ### English
    /// Runs `task` later on the UI thread. Must not block.
    ///
    /// ### 中文
    /// 稍后在 UI 线程执行 `task`。不得阻塞。
    fn post(&self, task: UiTask);

    /// ### English
    /// Schedules a new measure/layout pass for the view. Called on the UI thread.
    ///
    /// ### 中文
    /// 为该 view 调度新的测量/布局流程。在 UI 线程调用。
    fn request_layout(&self);

    /// ### English
    /// Places the surface above (`true`) or below other media surfaces.
    ///
    /// ### 中文
    /// 将 surface 置于其他媒体 surface 之上（`true`）或之下。
    fn set_z_order_media_overlay(&self, _overlay: bool) {}
}
