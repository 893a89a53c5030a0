//! Test doubles: a recording GL backend and a view host with a manually pumped UI queue.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use dpi::PhysicalSize;
use parking_lot::Mutex;

use crate::engine::error::RenderError;
use crate::engine::events::{UiTask, ViewHost};
use crate::engine::frame::I420Buffer;
use crate::engine::matrix::Mat4;
use crate::engine::runtime::RENDER_THREAD_NAME;

use super::{ConfigAttributes, GlContext, GlDrawer, NativeSurface, SharedGlContext, Viewport};

/// One GL-side effect observed by the fake backend.
#[derive(Clone, Debug, PartialEq)]
pub(crate) enum GlCall {
    CreateContext(ConfigAttributes),
    CreateSurface(NativeSurface),
    ResizeSurface(PhysicalSize<u32>),
    MakeCurrent,
    DetachCurrent,
    ReleaseSurface,
    Clear,
    /// First byte of the Y plane identifies the frame.
    DrawYuv {
        tag: u8,
        viewport: Viewport,
        tex_matrix: Mat4,
    },
    DrawOes {
        texture_id: u32,
        viewport: Viewport,
        tex_matrix: Mat4,
    },
    Swap,
    ReleaseDrawer,
    ReleaseContext,
}

#[derive(Default)]
struct ProbeState {
    calls: Vec<GlCall>,
    reported_size: Option<PhysicalSize<u32>>,
    off_thread_calls: usize,
}

/// Shared view of everything the fake backend did, plus the size the "window" reports.
#[derive(Clone, Default)]
pub(crate) struct GlProbe {
    state: Arc<Mutex<ProbeState>>,
}

impl GlProbe {
    pub(crate) fn calls(&self) -> Vec<GlCall> {
        self.state.lock().calls.clone()
    }

    pub(crate) fn count(&self, pred: impl Fn(&GlCall) -> bool) -> usize {
        self.state.lock().calls.iter().filter(|call| pred(call)).count()
    }

    pub(crate) fn drawn_tags(&self) -> Vec<u8> {
        self.state
            .lock()
            .calls
            .iter()
            .filter_map(|call| match call {
                GlCall::DrawYuv { tag, .. } => Some(*tag),
                _ => None,
            })
            .collect()
    }

    /// Texture matrix of the most recent draw.
    pub(crate) fn last_tex_matrix(&self) -> Option<Mat4> {
        self.state.lock().calls.iter().rev().find_map(|call| match call {
            GlCall::DrawYuv { tex_matrix, .. } | GlCall::DrawOes { tex_matrix, .. } => {
                Some(*tex_matrix)
            }
            _ => None,
        })
    }

    /// Forces the size a bound surface reports, whatever it was created or resized to.
    pub(crate) fn force_surface_size(&self, width: u32, height: u32) {
        self.state.lock().reported_size = Some(PhysicalSize::new(width, height));
    }

    /// Calls that did not come from a render thread.
    pub(crate) fn off_thread_calls(&self) -> usize {
        self.state.lock().off_thread_calls
    }

    fn record(&self, call: GlCall) {
        let mut state = self.state.lock();
        if std::thread::current().name() != Some(RENDER_THREAD_NAME) {
            state.off_thread_calls += 1;
        }
        state.calls.push(call);
    }

    fn reported_size(&self) -> Option<PhysicalSize<u32>> {
        self.state.lock().reported_size
    }
}

pub(crate) struct FakeSharedContext {
    probe: GlProbe,
}

impl FakeSharedContext {
    pub(crate) fn new() -> (Self, GlProbe) {
        let probe = GlProbe::default();
        (
            Self {
                probe: probe.clone(),
            },
            probe,
        )
    }
}

impl SharedGlContext for FakeSharedContext {
    fn create_context(&self, config: ConfigAttributes) -> Result<Box<dyn GlContext>, RenderError> {
        self.probe.record(GlCall::CreateContext(config));
        Ok(Box::new(FakeGlContext {
            probe: self.probe.clone(),
            surface: None,
            extent: PhysicalSize::new(0, 0),
        }))
    }
}

/// Shared context whose contexts can never be created.
pub(crate) struct BrokenSharedContext;

impl SharedGlContext for BrokenSharedContext {
    fn create_context(&self, _config: ConfigAttributes) -> Result<Box<dyn GlContext>, RenderError> {
        Err(RenderError::Context("no EGL display".to_string()))
    }
}

struct FakeGlContext {
    probe: GlProbe,
    surface: Option<NativeSurface>,
    /// Size the surface was created or last resized with.
    extent: PhysicalSize<u32>,
}

impl GlContext for FakeGlContext {
    fn has_surface(&self) -> bool {
        self.surface.is_some()
    }

    fn create_surface(
        &mut self,
        surface: NativeSurface,
        size: PhysicalSize<u32>,
    ) -> Result<(), RenderError> {
        self.probe.record(GlCall::CreateSurface(surface));
        self.surface = Some(surface);
        self.extent = size;
        Ok(())
    }

    fn resize_surface(&mut self, size: PhysicalSize<u32>) -> Result<(), RenderError> {
        if self.surface.is_none() {
            return Ok(());
        }
        self.probe.record(GlCall::ResizeSurface(size));
        self.extent = size;
        Ok(())
    }

    fn make_current(&mut self) -> Result<(), RenderError> {
        self.probe.record(GlCall::MakeCurrent);
        Ok(())
    }

    fn detach_current(&mut self) {
        self.probe.record(GlCall::DetachCurrent);
    }

    fn release_surface(&mut self) {
        if self.surface.take().is_some() {
            self.probe.record(GlCall::ReleaseSurface);
        }
    }

    fn surface_size(&self) -> PhysicalSize<u32> {
        if self.surface.is_some() {
            self.probe.reported_size().unwrap_or(self.extent)
        } else {
            PhysicalSize::new(0, 0)
        }
    }

    fn clear(&mut self, _rgba: [f32; 4]) {
        self.probe.record(GlCall::Clear);
    }

    fn swap_buffers(&mut self) -> Result<(), RenderError> {
        if self.surface.is_none() {
            return Err(RenderError::Surface("no surface bound".to_string()));
        }
        self.probe.record(GlCall::Swap);
        Ok(())
    }

    fn create_drawer(&mut self) -> Result<Box<dyn GlDrawer>, RenderError> {
        Ok(Box::new(FakeDrawer {
            probe: self.probe.clone(),
        }))
    }

    fn release(&mut self) {
        self.release_surface();
        self.probe.record(GlCall::ReleaseContext);
    }
}

struct FakeDrawer {
    probe: GlProbe,
}

impl GlDrawer for FakeDrawer {
    fn draw_yuv(
        &mut self,
        buffer: &I420Buffer,
        _width: u32,
        _height: u32,
        tex_matrix: &Mat4,
        viewport: Viewport,
    ) -> Result<(), RenderError> {
        let tag = buffer.planes[0].first().copied().unwrap_or_default();
        self.probe.record(GlCall::DrawYuv {
            tag,
            viewport,
            tex_matrix: *tex_matrix,
        });
        Ok(())
    }

    fn draw_oes(
        &mut self,
        texture_id: u32,
        tex_matrix: &Mat4,
        viewport: Viewport,
    ) -> Result<(), RenderError> {
        self.probe.record(GlCall::DrawOes {
            texture_id,
            viewport,
            tex_matrix: *tex_matrix,
        });
        Ok(())
    }

    fn release(&mut self) {
        self.probe.record(GlCall::ReleaseDrawer);
    }
}

/// View host whose UI thread is the test itself: posted tasks wait until `run_pending`.
#[derive(Default)]
pub(crate) struct TestHost {
    queue: Mutex<VecDeque<UiTask>>,
    layout_requests: AtomicUsize,
    overlay: Mutex<Option<bool>>,
}

impl TestHost {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Runs queued UI tasks, including ones they post, until the queue is empty.
    pub(crate) fn run_pending(&self) -> usize {
        let mut ran = 0;
        loop {
            let next = self.queue.lock().pop_front();
            let Some(task) = next else {
                return ran;
            };
            task();
            ran += 1;
        }
    }

    pub(crate) fn layout_requests(&self) -> usize {
        self.layout_requests.load(Ordering::SeqCst)
    }

    pub(crate) fn overlay(&self) -> Option<bool> {
        *self.overlay.lock()
    }
}

impl ViewHost for TestHost {
    fn post(&self, task: UiTask) {
        self.queue.lock().push_back(task);
    }

    fn request_layout(&self) {
        self.layout_requests.fetch_add(1, Ordering::SeqCst);
    }

    fn set_z_order_media_overlay(&self, overlay: bool) {
        *self.overlay.lock() = Some(overlay);
    }
}
