//! ### English
//! `SurfaceViewRenderer`: the thread-safe facade over one render thread.
//!
//! Frames, configuration and platform surface/layout callbacks may arrive from any thread in any
//! order. Callers never block except in [`SurfaceViewRenderer::initialize`] (context creation)
//! and [`SurfaceViewRenderer::release`] (teardown barrier + join).
//!
//! ### 中文
//! `SurfaceViewRenderer`：单个渲染线程之上的线程安全门面。
//!
//! 帧、配置以及平台 surface/布局回调可以以任意顺序从任意线程到达。除
//! [`SurfaceViewRenderer::initialize`]（创建上下文）与 [`SurfaceViewRenderer::release`]
//! （等待销毁屏障 + join）外，调用方永不阻塞。

pub(crate) mod state;

use std::sync::Arc;
use std::thread::JoinHandle;

use crossbeam_channel as channel;
use dpi::PhysicalSize;
use parking_lot::Mutex;

use super::error::RenderError;
use super::events::{RendererEvents, ViewHost};
use super::frame::VideoFrame;
use super::layout::{MeasureSpec, ScalingType, desired_layout_size};
use super::rendering::{ConfigAttributes, NativeSurface, SharedGlContext};
use super::runtime::{self, RenderTask, TaskSender};
use super::stats::StatisticsSnapshot;

use state::RendererShared;

/// ### English
/// Render thread handle; present exactly while the renderer is initialized.
///
/// ### 中文
/// 渲染线程句柄；仅在渲染器处于已初始化状态时存在。
struct RenderHandler {
    tasks: TaskSender,
    thread: JoinHandle<()>,
}

/// ### English
/// Renders decoded video frames onto a platform surface from a dedicated render thread.
///
/// Lifecycle: uninitialized → [`initialize`](Self::initialize) → initialized →
/// [`release`](Self::release) → uninitialized. Surface callbacks and configuration are accepted
/// in every state.
///
/// ### 中文
/// 在独立渲染线程上把已解码视频帧渲染到平台 surface。
///
/// 生命周期：未初始化 → [`initialize`](Self::initialize) → 已初始化 →
/// [`release`](Self::release) → 未初始化。surface 回调与配置在任何状态下都可调用。
pub struct SurfaceViewRenderer {
    /// ### English
    /// Handler lock: guards the render thread handle and gates task posting.
    ///
    /// ### 中文
    /// handler 锁：保护渲染线程句柄并控制任务投递。
    handler: Mutex<Option<RenderHandler>>,
    shared: Arc<RendererShared>,
}

impl SurfaceViewRenderer {
    /// ### English
    /// Creates an uninitialized renderer.
    ///
    /// #### Parameters
    /// - `name`: Resource name used as the log prefix.
    /// - `host`: The hosting view (UI thread + layout requests).
    ///
    /// ### 中文
    /// 创建一个未初始化的渲染器。
    ///
    /// #### 参数
    /// - `name`：用作日志前缀的资源名。
    /// - `host`：宿主 view（UI 线程 + 布局请求）。
    pub fn new(name: &str, host: Arc<dyn ViewHost>) -> Self {
        Self {
            handler: Mutex::new(None),
            shared: RendererShared::new(name, host),
        }
    }

    /// ### English
    /// Starts the render thread and creates the GL context with the default configuration.
    /// See [`initialize_with_config`](Self::initialize_with_config).
    ///
    /// ### 中文
    /// 使用默认配置启动渲染线程并创建 GL 上下文。
    /// 参见 [`initialize_with_config`](Self::initialize_with_config)。
    pub fn initialize(
        &self,
        shared_context: Arc<dyn SharedGlContext>,
        events: Option<Arc<dyn RendererEvents>>,
    ) -> Result<(), RenderError> {
        self.initialize_with_config(shared_context, events, ConfigAttributes::default())
    }

    /// ### English
    /// Starts the render thread, blocks until the GL context exists, then binds the platform
    /// surface if one was already created.
    ///
    /// #### Parameters
    /// - `shared_context`: Context to share GPU objects with (borrowed, not owned).
    /// - `events`: Listener receiving first-frame and resolution events on the UI thread.
    /// - `config`: Framebuffer pixel format.
    ///
    /// Fails with [`RenderError::AlreadyInitialized`] if called twice without a release.
    ///
    /// ### 中文
    /// 启动渲染线程，阻塞直到 GL 上下文创建完成；若平台 surface 已存在则随后绑定。
    ///
    /// #### 参数
    /// - `shared_context`：用于共享 GPU 对象的上下文（借用，不持有所有权）。
    /// - `events`：在 UI 线程接收第一帧与分辨率事件的监听器。
    /// - `config`：framebuffer 像素格式。
    ///
    /// 未经 release 重复调用时返回 [`RenderError::AlreadyInitialized`]。
    pub fn initialize_with_config(
        &self,
        shared_context: Arc<dyn SharedGlContext>,
        events: Option<Arc<dyn RendererEvents>>,
        config: ConfigAttributes,
    ) -> Result<(), RenderError> {
        let mut handler = self.handler.lock();
        if handler.is_some() {
            return Err(RenderError::AlreadyInitialized);
        }
        log::debug!("{}Initializing.", self.shared.prefix());

        self.shared.stats.lock().reset();
        self.shared.layout.lock().events = events;

        let (tasks, thread) = match runtime::spawn(Arc::clone(&self.shared)) {
            Ok(spawned) => spawned,
            Err(err) => {
                self.shared.layout.lock().reset_frame();
                return Err(err);
            }
        };

        let (response_tx, response_rx) = channel::bounded(1);
        tasks.post_at_front(RenderTask::CreateContext {
            shared: shared_context,
            config,
            response: response_tx,
        });
        let created = response_rx
            .recv()
            .map_err(|_| RenderError::RenderThreadGone)
            .and_then(|result| result);
        if let Err(err) = created {
            drop(tasks);
            if thread.join().is_err() {
                log::error!("{}Render thread panicked.", self.shared.prefix());
            }
            self.shared.layout.lock().reset_frame();
            return Err(err);
        }

        tasks.post(RenderTask::AttachSurface);
        *handler = Some(RenderHandler { tasks, thread });
        Ok(())
    }

    /// ### English
    /// Tears down GPU state on the render thread, waits for it, joins the thread and releases any
    /// pending frame. No listener callback fires after this returns. Safe to call repeatedly.
    ///
    /// ### 中文
    /// 在渲染线程上销毁 GPU 状态并等待完成，随后 join 线程并释放待渲染帧。
    /// 返回后不会再触发任何监听器回调。可重复调用。
    pub fn release(&self) {
        let (handler, barrier) = {
            let mut guard = self.handler.lock();
            let Some(handler) = guard.take() else {
                log::debug!("{}Already released", self.shared.prefix());
                return;
            };
            let (barrier_tx, barrier_rx) = channel::bounded(1);
            handler.tasks.post_at_front(RenderTask::Release {
                barrier: barrier_tx,
            });
            (handler, barrier_rx)
        };

        // Disconnect means the thread already exited; either way it is done with the GPU.
        let _ = barrier.recv();
        drop(handler.tasks);
        if handler.thread.join().is_err() {
            log::error!("{}Render thread panicked.", self.shared.prefix());
        }

        if let Some(frame) = self.shared.frame_slot.take() {
            frame.release();
        }
        self.shared.layout.lock().reset_frame();
        self.shared.stats.lock().reset();
        log::debug!("{}Releasing done.", self.shared.prefix());
    }

    pub fn is_initialized(&self) -> bool {
        self.handler.lock().is_some()
    }

    /// ### English
    /// Submits a frame. Never blocks: a frame still pending is released and counted as dropped.
    /// Without a render thread the frame is released immediately.
    ///
    /// ### 中文
    /// 提交一帧。永不阻塞：仍在等待的旧帧会被释放并计为丢帧。
    /// 没有渲染线程时该帧会被立即释放。
    pub fn render_frame(&self, frame: VideoFrame) {
        self.shared.stats.lock().frame_received();

        let handler = self.handler.lock();
        let Some(handler) = handler.as_ref() else {
            log::debug!(
                "{}Dropping frame - Not initialized or already released.",
                self.shared.prefix()
            );
            frame.release();
            return;
        };

        if let Some(displaced) = self.shared.frame_slot.replace(frame) {
            self.shared.stats.lock().frame_dropped();
            displaced.release();
        }
        handler.tasks.post(RenderTask::RenderFrame);
    }

    pub fn set_mirror(&self, mirror: bool) {
        self.shared.layout.lock().mirror = mirror;
    }

    pub fn set_scaling_type(&self, scaling: ScalingType) {
        self.shared.layout.lock().scaling = scaling;
    }

    /// ### English
    /// Platform surface created: remembers the handle and binds it on the render thread.
    ///
    /// ### 中文
    /// 平台 surface 已创建：记录句柄并在渲染线程上绑定。
    pub fn surface_created(&self, surface: NativeSurface) {
        log::debug!("{}Surface created.", self.shared.prefix());
        self.shared.layout.lock().surface = Some(surface);
        self.post(RenderTask::AttachSurface);
    }

    /// ### English
    /// Platform surface resized (also sent after returning from background). The GPU surface is
    /// resized to match before the next render pass.
    ///
    /// ### 中文
    /// 平台 surface 尺寸变化（从后台返回时也会调用）。下一次渲染前会将 GPU surface 调整为相同尺寸。
    pub fn surface_changed(&self, width: u32, height: u32) {
        log::debug!("{}Surface changed: {width}x{height}", self.shared.prefix());
        self.shared.layout.lock().surface_size = PhysicalSize::new(width, height);
        self.post(RenderTask::ResizeSurface);
        self.post(RenderTask::RenderFrame);
    }

    /// ### English
    /// Platform surface destroyed: forgets the handle and unbinds it on the render thread.
    ///
    /// ### 中文
    /// 平台 surface 已销毁：清除句柄并在渲染线程上解除绑定。
    pub fn surface_destroyed(&self) {
        log::debug!("{}Surface destroyed.", self.shared.prefix());
        {
            let mut layout = self.shared.layout.lock();
            layout.surface = None;
            layout.surface_size = PhysicalSize::new(0, 0);
        }
        self.post(RenderTask::DetachSurface);
    }

    /// ### English
    /// Measure pass. Returns `None` before the first frame (use the platform default), else the
    /// desired size. A size different from the last measured one blanks the surface ahead of
    /// any queued render and requests a new layout.
    ///
    /// ### 中文
    /// 测量流程。第一帧之前返回 `None`（使用平台默认尺寸），否则返回期望尺寸。
    /// 若与上次测量尺寸不同，会抢在已排队的渲染之前清黑 surface 并请求重新布局。
    pub fn measure(
        &self,
        width_spec: MeasureSpec,
        height_spec: MeasureSpec,
    ) -> Option<PhysicalSize<u32>> {
        let (desired, is_new) = {
            let mut layout = self.shared.layout.lock();
            if !layout.has_frame_geometry() {
                return None;
            }
            let desired = desired_layout_size(
                width_spec,
                height_spec,
                layout.scaling,
                layout.frame_aspect_ratio(),
            );
            let is_new = desired != layout.measured_size;
            layout.measured_size = desired;
            (desired, is_new)
        };

        if is_new {
            log::debug!(
                "{}Measured new size {}x{}",
                self.shared.prefix(),
                desired.width,
                desired.height
            );
            self.post_at_front(RenderTask::MakeBlack);
            self.shared.host.request_layout();
        }
        Some(desired)
    }

    /// ### English
    /// Layout pass: records the on-screen bounds and re-renders.
    ///
    /// ### 中文
    /// 布局流程：记录屏幕边界并重新渲染。
    pub fn layout(&self, left: i32, top: i32, right: i32, bottom: i32) {
        let size = PhysicalSize::new(
            right.saturating_sub(left).max(0) as u32,
            bottom.saturating_sub(top).max(0) as u32,
        );
        self.shared.layout.lock().layout_size = size;
        self.post(RenderTask::RenderFrame);
    }

    pub fn statistics(&self) -> StatisticsSnapshot {
        self.shared.stats.lock().snapshot()
    }

    /// Blocks until every task queued so far has run.
    #[cfg(test)]
    pub(crate) fn wait_idle(&self) {
        let (done_tx, done_rx) = channel::bounded(1);
        self.post(RenderTask::Fence(done_tx));
        let _ = done_rx.recv();
    }

    fn post(&self, task: RenderTask) {
        if let Some(handler) = self.handler.lock().as_ref() {
            handler.tasks.post(task);
        }
    }

    fn post_at_front(&self, task: RenderTask) {
        if let Some(handler) = self.handler.lock().as_ref() {
            handler.tasks.post_at_front(task);
        }
    }
}

impl Drop for SurfaceViewRenderer {
    fn drop(&mut self) {
        self.release();
    }
}
