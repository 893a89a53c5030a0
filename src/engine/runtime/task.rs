//! ### English
//! Internal task protocol between renderer callers and the render thread.
//!
//! ### 中文
//! 渲染器调用方与渲染线程之间的内部任务协议。

use std::sync::Arc;

use crossbeam_channel as channel;

use crate::engine::error::RenderError;
use crate::engine::rendering::{ConfigAttributes, SharedGlContext};

/// ### English
/// Work posted to the render thread. Payload-free tasks read the current state (pending frame,
/// surface handle, layout) when they run, not when they are posted.
///
/// ### 中文
/// 投递到渲染线程的任务。无载荷任务在执行时（而不是投递时）读取当前状态
/// （待渲染帧、surface 句柄、布局）。
pub(crate) enum RenderTask {
    /// ### English
    /// Creates the per-renderer GL context. The caller blocks on `response`.
    ///
    /// ### 中文
    /// 创建渲染器独占的 GL 上下文。调用方阻塞等待 `response`。
    CreateContext {
        /// ### English
        /// Shared context to create from.
        ///
        /// ### 中文
        /// 用于创建新上下文的共享上下文。
        shared: Arc<dyn SharedGlContext>,
        config: ConfigAttributes,
        /// ### English
        /// One-shot channel answered after the attempt.
        ///
        /// ### 中文
        /// 创建尝试结束后回包的一次性通道。
        response: channel::Sender<Result<(), RenderError>>,
    },
    AttachSurface,
    /// ### English
    /// Brings the bound GPU surface to the platform surface's current size.
    ///
    /// ### 中文
    /// 将已绑定的 GPU surface 调整为平台 surface 的当前尺寸。
    ResizeSurface,
    RenderFrame,
    MakeBlack,
    DetachSurface,
    /// ### English
    /// Tears down GPU state, then answers `barrier`. Nothing queued behind it runs.
    ///
    /// ### 中文
    /// 销毁 GPU 状态后通过 `barrier` 回包。排在其后的任务不会执行。
    Release { barrier: channel::Sender<()> },
    /// Blocks the render thread until the sender side is signalled or dropped.
    #[cfg(test)]
    Pause(channel::Receiver<()>),
    /// Answers once every task ahead of it has run.
    #[cfg(test)]
    Fence(channel::Sender<()>),
}

impl RenderTask {
    pub(crate) fn name(&self) -> &'static str {
        match self {
            RenderTask::CreateContext { .. } => "create_context",
            RenderTask::AttachSurface => "attach_surface",
            RenderTask::ResizeSurface => "resize_surface",
            RenderTask::RenderFrame => "render_frame",
            RenderTask::MakeBlack => "make_black",
            RenderTask::DetachSurface => "detach_surface",
            RenderTask::Release { .. } => "release",
            #[cfg(test)]
            RenderTask::Pause(_) => "pause",
            #[cfg(test)]
            RenderTask::Fence(_) => "fence",
        }
    }
}
