//! ### English
//! `VideoView`: a renderer plus view-level configuration, attached to a shared GL context for
//! as long as the view is attached to a window.
//!
//! ### 中文
//! `VideoView`：渲染器加上 view 级配置；在 view 挂载到窗口期间持有共享 GL 上下文租约。

use std::sync::Arc;

use parking_lot::Mutex;

use super::error::RenderError;
use super::events::{RendererEvents, ViewHost};
use super::frame::Rotation;
use super::layout::ScalingType;
use super::renderer::SurfaceViewRenderer;
use super::rendering::{SharedContextLease, SharedContextProvider};

/// ### English
/// Scale type exposed to view users.
///
/// ### 中文
/// 暴露给 view 使用方的缩放类型。
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum VideoScaleType {
    #[default]
    AspectFit,
    AspectFill,
    AspectBalanced,
}

impl From<VideoScaleType> for ScalingType {
    fn from(scale_type: VideoScaleType) -> Self {
        match scale_type {
            VideoScaleType::AspectFit => ScalingType::AspectFit,
            VideoScaleType::AspectFill => ScalingType::AspectFill,
            VideoScaleType::AspectBalanced => ScalingType::AspectBalanced,
        }
    }
}

/// ### English
/// View-level listener. Called on the UI thread.
///
/// ### 中文
/// view 级监听器。在 UI 线程调用。
pub trait VideoViewListener: Send + Sync {
    fn on_first_frame(&self);

    fn on_frame_dimensions_changed(&self, width: u32, height: u32, rotation: Rotation);
}

type ListenerSlot = Arc<Mutex<Option<Arc<dyn VideoViewListener>>>>;

/// ### English
/// Renderer events seen by the view: each one refreshes the layout, then reaches the listener.
///
/// ### 中文
/// view 接收的渲染器事件：每个事件先刷新布局，再通知监听器。
struct ViewEvents {
    host: Arc<dyn ViewHost>,
    listener: ListenerSlot,
}

impl ViewEvents {
    fn listener(&self) -> Option<Arc<dyn VideoViewListener>> {
        self.listener.lock().clone()
    }
}

impl RendererEvents for ViewEvents {
    fn on_first_frame_rendered(&self) {
        self.host.request_layout();
        if let Some(listener) = self.listener() {
            listener.on_first_frame();
        }
    }

    fn on_frame_resolution_changed(&self, width: u32, height: u32, rotation: Rotation) {
        self.host.request_layout();
        if let Some(listener) = self.listener() {
            listener.on_frame_dimensions_changed(width, height, rotation);
        }
    }
}

#[derive(Clone, Copy, Debug, Default)]
struct ViewConfig {
    mirror: bool,
    scale_type: VideoScaleType,
    overlay: bool,
}

/// ### English
/// A video view: owns its [`SurfaceViewRenderer`] and keeps mirror, scale type and z-order
/// across attach/detach cycles.
///
/// ### 中文
/// 视频 view：持有自己的 [`SurfaceViewRenderer`]，并在多次 attach/detach 之间保留
/// 镜像、缩放类型与 z-order 配置。
pub struct VideoView {
    renderer: SurfaceViewRenderer,
    host: Arc<dyn ViewHost>,
    provider: Arc<SharedContextProvider>,
    config: Mutex<ViewConfig>,
    listener: ListenerSlot,
    /// ### English
    /// Shared-context lease held while attached.
    ///
    /// ### 中文
    /// 挂载期间持有的共享上下文租约。
    lease: Mutex<Option<SharedContextLease>>,
}

impl VideoView {
    pub fn new(name: &str, host: Arc<dyn ViewHost>, provider: Arc<SharedContextProvider>) -> Self {
        Self {
            renderer: SurfaceViewRenderer::new(name, Arc::clone(&host)),
            host,
            provider,
            config: Mutex::new(ViewConfig::default()),
            listener: Arc::new(Mutex::new(None)),
            lease: Mutex::new(None),
        }
    }

    /// ### English
    /// The renderer, for frame submission and platform surface/measure/layout callbacks.
    ///
    /// ### 中文
    /// 渲染器本身：用于提交帧以及平台 surface/测量/布局回调。
    pub fn renderer(&self) -> &SurfaceViewRenderer {
        &self.renderer
    }

    pub fn set_listener(&self, listener: Option<Arc<dyn VideoViewListener>>) {
        *self.listener.lock() = listener;
    }

    /// ### English
    /// Leases the shared context, initializes the renderer and re-applies the stored
    /// configuration. A no-op while already attached.
    ///
    /// ### 中文
    /// 租用共享上下文、初始化渲染器并重新应用已保存的配置。已挂载时为空操作。
    pub fn attach_to_window(&self) -> Result<(), RenderError> {
        let mut lease = self.lease.lock();
        if lease.is_some() {
            return Ok(());
        }

        let new_lease = self.provider.acquire()?;
        let events: Arc<dyn RendererEvents> = Arc::new(ViewEvents {
            host: Arc::clone(&self.host),
            listener: Arc::clone(&self.listener),
        });
        self.renderer.initialize(new_lease.context(), Some(events))?;

        let config = *self.config.lock();
        self.renderer.set_mirror(config.mirror);
        self.renderer.set_scaling_type(config.scale_type.into());
        self.host.set_z_order_media_overlay(config.overlay);
        *lease = Some(new_lease);
        Ok(())
    }

    /// ### English
    /// Releases the renderer, then returns the shared-context lease.
    ///
    /// ### 中文
    /// 先释放渲染器，再归还共享上下文租约。
    pub fn detach_from_window(&self) {
        let mut lease = self.lease.lock();
        self.renderer.release();
        lease.take();
    }

    pub fn mirror(&self) -> bool {
        self.config.lock().mirror
    }

    pub fn set_mirror(&self, mirror: bool) {
        self.config.lock().mirror = mirror;
        self.renderer.set_mirror(mirror);
        self.refresh();
    }

    pub fn scale_type(&self) -> VideoScaleType {
        self.config.lock().scale_type
    }

    pub fn set_scale_type(&self, scale_type: VideoScaleType) {
        self.config.lock().scale_type = scale_type;
        self.renderer.set_scaling_type(scale_type.into());
        self.refresh();
    }

    /// ### English
    /// Places this view's surface above (`true`) or below other media surfaces.
    ///
    /// ### 中文
    /// 将本 view 的 surface 置于其他媒体 surface 之上（`true`）或之下。
    pub fn apply_z_order(&self, overlay: bool) {
        self.config.lock().overlay = overlay;
        self.host.set_z_order_media_overlay(overlay);
    }

    /// ### English
    /// Lays the view out at the given bounds (used on orientation changes).
    ///
    /// ### 中文
    /// 以给定边界对 view 进行布局（方向变化时使用）。
    pub fn update_layout(&self, left: i32, top: i32, right: i32, bottom: i32) {
        self.renderer.layout(left, top, right, bottom);
    }

    fn refresh(&self) {
        let host = Arc::clone(&self.host);
        self.host.post(Box::new(move || host.request_layout()));
    }
}

impl Drop for VideoView {
    fn drop(&mut self) {
        self.detach_from_window();
    }
}
