//! ### English
//! State shared between the renderer facade, the render thread and posted UI tasks.
//!
//! Lock order: handler lock (facade only) → frame lock → statistics lock → layout lock. No lock
//! is held while calling into the view host.
//!
//! ### 中文
//! 渲染器门面、渲染线程与投递到 UI 线程的任务之间共享的状态。
//!
//! 加锁顺序：handler 锁（仅门面使用）→ 帧锁 → 统计锁 → 布局锁。调用 view 宿主时不持有任何锁。

use std::sync::{Arc, Weak};

use dpi::PhysicalSize;
use parking_lot::Mutex;

use crate::engine::events::{RendererEvents, ViewHost};
use crate::engine::frame::{PendingFrameSlot, Rotation, VideoFrame};
use crate::engine::layout::{ScalingType, frame_aspect_ratio};
use crate::engine::rendering::NativeSurface;
use crate::engine::stats::RenderStatistics;

/// ### English
/// Geometry and configuration guarded by the layout lock.
///
/// ### 中文
/// 受布局锁保护的几何信息与配置。
#[derive(Default)]
pub(crate) struct LayoutState {
    /// ### English
    /// Size reported back to the host as the view's measured size.
    ///
    /// ### 中文
    /// 作为 view 测量结果回报给宿主的尺寸。
    pub(crate) measured_size: PhysicalSize<u32>,
    /// ### English
    /// On-screen size from the last layout pass.
    ///
    /// ### 中文
    /// 最近一次布局流程给出的屏幕尺寸。
    pub(crate) layout_size: PhysicalSize<u32>,
    /// ### English
    /// Platform surface size (zero while no surface exists).
    ///
    /// ### 中文
    /// 平台 surface 尺寸（无 surface 时为 0）。
    pub(crate) surface_size: PhysicalSize<u32>,
    /// ### English
    /// Platform surface handle, present between surface-created and surface-destroyed.
    ///
    /// ### 中文
    /// 平台 surface 句柄，在 surface-created 与 surface-destroyed 之间存在。
    pub(crate) surface: Option<NativeSurface>,
    pub(crate) frame_width: u32,
    pub(crate) frame_height: u32,
    pub(crate) frame_rotation: Rotation,
    pub(crate) mirror: bool,
    pub(crate) scaling: ScalingType,
    pub(crate) events: Option<Arc<dyn RendererEvents>>,
    /// ### English
    /// Bumped by release; UI tasks posted under an older value are discarded.
    ///
    /// ### 中文
    /// 每次 release 递增；以旧值投递的 UI 任务会被丢弃。
    pub(crate) generation: u64,
}

impl LayoutState {
    pub(crate) fn has_frame_geometry(&self) -> bool {
        self.frame_width != 0 && self.frame_height != 0
    }

    pub(crate) fn frame_aspect_ratio(&self) -> f32 {
        frame_aspect_ratio(self.frame_width, self.frame_height, self.frame_rotation)
    }

    /// ### English
    /// Forgets frame geometry and the listener, invalidating queued UI tasks.
    ///
    /// ### 中文
    /// 清除帧几何信息与监听器，并使已排队的 UI 任务失效。
    pub(crate) fn reset_frame(&mut self) {
        self.frame_width = 0;
        self.frame_height = 0;
        self.frame_rotation = Rotation::Deg0;
        self.events = None;
        self.generation = self.generation.wrapping_add(1);
    }
}

pub(crate) struct RendererShared {
    /// ### English
    /// Log prefix, `"<name>: "`.
    ///
    /// ### 中文
    /// 日志前缀，形如 `"<name>: "`。
    prefix: String,
    pub(crate) frame_slot: PendingFrameSlot,
    pub(crate) stats: Mutex<RenderStatistics>,
    pub(crate) layout: Mutex<LayoutState>,
    pub(crate) host: Arc<dyn ViewHost>,
}

impl RendererShared {
    pub(crate) fn new(name: &str, host: Arc<dyn ViewHost>) -> Arc<Self> {
        Arc::new(Self {
            prefix: format!("{name}: "),
            frame_slot: PendingFrameSlot::default(),
            stats: Mutex::new(RenderStatistics::default()),
            layout: Mutex::new(LayoutState::default()),
            host,
        })
    }

    pub(crate) fn prefix(&self) -> &str {
        &self.prefix
    }

    /// ### English
    /// Tracks the geometry of `frame`. On a change, reports it to the listener and schedules a
    /// re-layout on the UI thread.
    ///
    /// ### 中文
    /// 记录 `frame` 的几何信息。若发生变化，则通知监听器并在 UI 线程调度重新布局。
    pub(crate) fn update_frame_dimensions(self: &Arc<Self>, frame: &VideoFrame) {
        let (width, height, rotation) = (frame.width(), frame.height(), frame.rotation());
        let generation = {
            let mut layout = self.layout.lock();
            if layout.frame_width == width
                && layout.frame_height == height
                && layout.frame_rotation == rotation
            {
                return;
            }
            log::debug!(
                "{}Reporting frame resolution changed to {width}x{height} with rotation {}",
                self.prefix,
                rotation.degrees()
            );
            layout.frame_width = width;
            layout.frame_height = height;
            layout.frame_rotation = rotation;
            layout.generation
        };

        self.post_event(generation, move |events| {
            events.on_frame_resolution_changed(width, height, rotation)
        });
        let shared = Arc::downgrade(self);
        self.host.post(Box::new(move || {
            if let Some(shared) = shared.upgrade() {
                shared.host.request_layout();
            }
        }));
    }

    /// ### English
    /// Reports the first rendered frame. Must be called without the statistics lock held.
    ///
    /// ### 中文
    /// 上报第一帧已渲染。调用时不得持有统计锁。
    pub(crate) fn notify_first_frame(self: &Arc<Self>) {
        let generation = {
            let layout = self.layout.lock();
            if layout.events.is_none() {
                return;
            }
            layout.generation
        };
        log::debug!("{}Reporting first rendered frame.", self.prefix);
        self.post_event(generation, |events| events.on_first_frame_rendered());
    }

    /// ### English
    /// Posts `deliver` to the UI thread. It runs only if no release happened in between and a
    /// listener is still installed.
    ///
    /// ### 中文
    /// 将 `deliver` 投递到 UI 线程。仅当期间未发生 release 且监听器仍存在时才执行。
    fn post_event(
        self: &Arc<Self>,
        generation: u64,
        deliver: impl FnOnce(&dyn RendererEvents) + Send + 'static,
    ) {
        let shared: Weak<Self> = Arc::downgrade(self);
        self.host.post(Box::new(move || {
            let Some(shared) = shared.upgrade() else {
                return;
            };
            let events = {
                let layout = shared.layout.lock();
                if layout.generation != generation {
                    return;
                }
                layout.events.clone()
            };
            if let Some(events) = events {
                deliver(events.as_ref());
            }
        }));
    }
}
