//! ### English
//! Dedicated render thread: owns the GL context, the drawer and every GPU call.
//!
//! ### 中文
//! 独立渲染线程：持有 GL 上下文、绘制器以及所有 GPU 调用。

use std::sync::Arc;
use std::thread::{self, JoinHandle, ThreadId};
use std::time::Instant;

use crate::engine::error::RenderError;
use crate::engine::frame::FrameBuffer;
use crate::engine::matrix::{layout_matrix, multiply_matrices, rotate_texture_matrix};
use crate::engine::renderer::state::RendererShared;
use crate::engine::rendering::{ConfigAttributes, GlContext, GlDrawer, SharedGlContext, Viewport};

use super::queue::{TaskReceiver, TaskSender, task_queue};
use super::task::RenderTask;

/// ### English
/// Name given to every render thread.
///
/// ### 中文
/// 所有渲染线程使用的线程名。
pub(crate) const RENDER_THREAD_NAME: &str = "SurfaceViewRenderer";

const BLACK: [f32; 4] = [0.0, 0.0, 0.0, 0.0];

/// ### English
/// Spawns a render thread serving `shared` and returns its task sender and join handle.
///
/// ### 中文
/// 启动一个服务于 `shared` 的渲染线程，返回其任务发送端与 join handle。
pub(crate) fn spawn(
    shared: Arc<RendererShared>,
) -> Result<(TaskSender, JoinHandle<()>), RenderError> {
    let (sender, receiver) = task_queue();
    let thread = thread::Builder::new()
        .name(RENDER_THREAD_NAME.to_string())
        .spawn(move || {
            RenderThread::new(shared, thread::current().id()).run(receiver);
        })?;
    Ok((sender, thread))
}

/// ### English
/// Render-thread-local state. Not `Send`: GL objects stay on the thread that created them.
///
/// ### 中文
/// 渲染线程本地状态。非 `Send`：GL 对象只留在创建它们的线程上。
pub(crate) struct RenderThread {
    shared: Arc<RendererShared>,
    /// ### English
    /// The only thread allowed to run GPU operations.
    ///
    /// ### 中文
    /// 唯一允许执行 GPU 操作的线程。
    owner: ThreadId,
    context: Option<Box<dyn GlContext>>,
    /// ### English
    /// Created on the first draw, after the context is current.
    ///
    /// ### 中文
    /// 在上下文 current 之后、首次绘制时创建。
    drawer: Option<Box<dyn GlDrawer>>,
}

impl RenderThread {
    pub(crate) fn new(shared: Arc<RendererShared>, owner: ThreadId) -> Self {
        Self {
            shared,
            owner,
            context: None,
            drawer: None,
        }
    }

    /// ### English
    /// Runs tasks until a release task completes or every sender is gone. Tasks still queued
    /// behind a release are discarded.
    ///
    /// ### 中文
    /// 持续执行任务，直到 release 任务完成或所有发送端都已 drop。排在 release 之后的任务会被丢弃。
    fn run(mut self, tasks: TaskReceiver) {
        while let Some(task) = tasks.recv() {
            let name = task.name();
            let result = match task {
                RenderTask::CreateContext {
                    shared,
                    config,
                    response,
                } => {
                    let result = self.create_context(shared.as_ref(), config);
                    if let Err(err) = &result {
                        log::error!("{}Failed to create GL context: {err}", self.shared.prefix());
                    }
                    let _ = response.send(result);
                    Ok(())
                }
                RenderTask::AttachSurface => self.attach_surface(),
                RenderTask::ResizeSurface => self.resize_surface(),
                RenderTask::RenderFrame => self.render_pending_frame(),
                RenderTask::MakeBlack => self.make_black(),
                RenderTask::DetachSurface => self.detach_surface(),
                RenderTask::Release { barrier } => {
                    self.teardown();
                    let _ = barrier.send(());
                    break;
                }
                #[cfg(test)]
                RenderTask::Pause(resume) => {
                    let _ = resume.recv();
                    Ok(())
                }
                #[cfg(test)]
                RenderTask::Fence(done) => {
                    let _ = done.send(());
                    Ok(())
                }
            };
            if let Err(err) = result {
                log::error!("{}Render task {name} failed: {err}", self.shared.prefix());
            }
        }

        if self.context.is_some() {
            self.teardown();
        }
    }

    fn check_render_thread(&self, operation: &'static str) -> Result<(), RenderError> {
        if thread::current().id() == self.owner {
            Ok(())
        } else {
            Err(RenderError::WrongThread { operation })
        }
    }

    fn create_context(
        &mut self,
        shared: &dyn SharedGlContext,
        config: ConfigAttributes,
    ) -> Result<(), RenderError> {
        self.check_render_thread("create_context")?;
        log::debug!("{}Creating GL context.", self.shared.prefix());
        self.context = Some(shared.create_context(config)?);
        Ok(())
    }

    /// ### English
    /// Binds the platform surface if one exists and none is bound yet.
    ///
    /// ### 中文
    /// 若平台 surface 存在且尚未绑定，则进行绑定。
    fn attach_surface(&mut self) -> Result<(), RenderError> {
        self.check_render_thread("attach_surface")?;
        let Some(context) = self.context.as_mut() else {
            return Ok(());
        };
        if context.has_surface() {
            return Ok(());
        }
        let (surface, size) = {
            let layout = self.shared.layout.lock();
            (layout.surface, layout.surface_size)
        };
        let Some(surface) = surface else {
            return Ok(());
        };

        log::debug!("{}Attaching GL surface.", self.shared.prefix());
        context.create_surface(surface, size)?;
        context.make_current()
    }

    /// ### English
    /// Resizes the bound GPU surface when it no longer matches the platform surface size.
    ///
    /// ### 中文
    /// 当已绑定的 GPU surface 与平台 surface 尺寸不一致时调整其尺寸。
    fn resize_surface(&mut self) -> Result<(), RenderError> {
        self.check_render_thread("resize_surface")?;
        let Some(context) = self.context.as_mut().filter(|context| context.has_surface()) else {
            return Ok(());
        };
        let size = self.shared.layout.lock().surface_size;
        if size.width == 0 || size.height == 0 || context.surface_size() == size {
            return Ok(());
        }
        log::debug!(
            "{}Resizing GL surface to {}x{}",
            self.shared.prefix(),
            size.width,
            size.height
        );
        context.resize_surface(size)
    }

    fn detach_surface(&mut self) -> Result<(), RenderError> {
        self.check_render_thread("detach_surface")?;
        let Some(context) = self.context.as_mut().filter(|context| context.has_surface()) else {
            return Ok(());
        };
        log::debug!("{}Detaching GL surface.", self.shared.prefix());
        context.detach_current();
        context.release_surface();
        Ok(())
    }

    /// ### English
    /// Clears the bound surface to transparent black and presents it.
    ///
    /// ### 中文
    /// 将已绑定的 surface 清为透明黑色并上屏。
    fn make_black(&mut self) -> Result<(), RenderError> {
        self.check_render_thread("make_black")?;
        let Some(context) = self.context.as_mut() else {
            return Ok(());
        };
        if !context.has_surface() {
            return Ok(());
        }
        context.clear(BLACK);
        context.swap_buffers()
    }

    /// ### English
    /// One render pass over the pending frame. The frame is released on every path by drop.
    ///
    /// ### 中文
    /// 对待渲染帧执行一次渲染流程。任何路径上帧都会通过 drop 被释放。
    fn render_pending_frame(&mut self) -> Result<(), RenderError> {
        self.check_render_thread("render_frame")?;
        let Some(frame) = self.shared.frame_slot.take() else {
            return Ok(());
        };
        self.shared.update_frame_dimensions(&frame);
        if frame.width() == 0 || frame.height() == 0 {
            log::debug!("{}Dropping frame without geometry", self.shared.prefix());
            return Ok(());
        }

        let Some(context) = self.context.as_mut().filter(|context| context.has_surface()) else {
            log::debug!("{}No surface to draw on", self.shared.prefix());
            return Ok(());
        };

        let started = Instant::now();
        let gpu_size = context.surface_size();
        let (surface_size, mirror, display_aspect, video_aspect) = {
            let layout = self.shared.layout.lock();
            let video_aspect = layout.frame_aspect_ratio();
            let display_aspect = if layout.layout_size.width == 0 || layout.layout_size.height == 0
            {
                video_aspect
            } else {
                layout.layout_size.width as f32 / layout.layout_size.height as f32
            };
            (layout.surface_size, layout.mirror, display_aspect, video_aspect)
        };

        if gpu_size != surface_size {
            log::debug!(
                "{}Egl surface does not match actual surface ({}x{} vs {}x{})",
                self.shared.prefix(),
                gpu_size.width,
                gpu_size.height,
                surface_size.width,
                surface_size.height
            );
            drop(frame);
            return self.make_black();
        }

        let tex_matrix = multiply_matrices(
            &rotate_texture_matrix(&frame.sampling_matrix(), frame.rotation().degrees() as f32),
            &layout_matrix(mirror, video_aspect, display_aspect),
        );
        let viewport = Viewport::full(surface_size);

        context.clear(BLACK);
        if self.drawer.is_none() {
            self.drawer = Some(context.create_drawer()?);
        }
        let Some(drawer) = self.drawer.as_mut() else {
            return Ok(());
        };
        match frame.buffer() {
            FrameBuffer::I420(buffer) => drawer.draw_yuv(
                buffer,
                frame.width(),
                frame.height(),
                &tex_matrix,
                viewport,
            )?,
            FrameBuffer::Texture { texture_id, .. } => {
                drawer.draw_oes(*texture_id, &tex_matrix, viewport)?
            }
        }
        context.swap_buffers()?;
        drop(frame);

        let first_frame = {
            let mut stats = self.shared.stats.lock();
            let outcome = stats.frame_rendered(started, started.elapsed());
            if outcome.report_due {
                stats.log(self.shared.prefix());
            }
            outcome.first_frame
        };
        if first_frame {
            self.shared.notify_first_frame();
        }
        Ok(())
    }

    /// ### English
    /// Releases the drawer, blanks the surface and destroys the context.
    ///
    /// ### 中文
    /// 释放绘制器、将 surface 清黑并销毁上下文。
    fn teardown(&mut self) {
        if let Err(err) = self.check_render_thread("release") {
            log::error!("{}{err}", self.shared.prefix());
            return;
        }
        if let Some(mut drawer) = self.drawer.take() {
            drawer.release();
        }
        if let Err(err) = self.make_black() {
            log::debug!("{}Final make black failed: {err}", self.shared.prefix());
        }
        if let Some(mut context) = self.context.take() {
            context.detach_current();
            context.release();
        }
        log::debug!("{}GL resources released.", self.shared.prefix());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::rendering::testing::{FakeSharedContext, GlCall, TestHost};

    fn foreign_thread_id() -> ThreadId {
        thread::spawn(|| thread::current().id())
            .join()
            .expect("id thread")
    }

    #[test_log::test]
    fn gpu_operations_refuse_foreign_threads() {
        let shared = RendererShared::new("test", TestHost::new());
        let (context, probe) = FakeSharedContext::new();
        let mut render_thread = RenderThread::new(shared, foreign_thread_id());

        assert!(matches!(
            render_thread.create_context(&context, ConfigAttributes::Plain),
            Err(RenderError::WrongThread {
                operation: "create_context"
            })
        ));
        assert!(matches!(
            render_thread.make_black(),
            Err(RenderError::WrongThread {
                operation: "make_black"
            })
        ));
        assert!(matches!(
            render_thread.render_pending_frame(),
            Err(RenderError::WrongThread { .. })
        ));
        assert!(probe.calls().is_empty());
    }

    #[test_log::test]
    fn owner_thread_passes_the_check() {
        let shared = RendererShared::new("test", TestHost::new());
        let (context, probe) = FakeSharedContext::new();
        let mut render_thread = RenderThread::new(shared, thread::current().id());

        render_thread
            .create_context(&context, ConfigAttributes::Rgba)
            .expect("context");
        render_thread.make_black().expect("no surface is not an error");
        assert_eq!(probe.calls(), vec![GlCall::CreateContext(ConfigAttributes::Rgba)]);

        render_thread.teardown();
        assert_eq!(probe.count(|call| *call == GlCall::ReleaseContext), 1);
    }
}
