//! ### English
//! surfman backend: one surfman device + context per renderer, sharing objects with a process-wide
//! root context and bound to a native widget surface.
//!
//! ### 中文
//! surfman 后端：每个渲染器一个 surfman device + context，与进程级根上下文共享对象，
//! 并绑定到原生 widget surface。

use std::sync::Arc;

use dpi::PhysicalSize;
use euclid::default::Size2D;
use glow::HasContext as _;
use parking_lot::Mutex;
use surfman::{
    Adapter, Connection, Context, ContextAttributeFlags, ContextAttributes, Device, GLVersion,
    SurfaceAccess, SurfaceType,
};

use crate::engine::error::RenderError;

use super::{ConfigAttributes, GlContext, GlDrawer, GlRectDrawer, NativeSurface, SharedGlContext};

/// ### English
/// Connection, adapter and the root context every renderer context shares objects with.
///
/// ### 中文
/// connection、adapter，以及所有渲染器上下文与之共享对象的根上下文。
struct ShareGroup {
    connection: Connection,
    adapter: Adapter,
    /// ### English
    /// Created by the first render thread that asks for a context; never made current.
    ///
    /// ### 中文
    /// 由第一个请求上下文的渲染线程创建；永远不会被 make current。
    root: Option<(Device, Context)>,
}

// SAFETY: the root context is never made current on any thread. It is only read as the
// share-group anchor while the mutex is held, and destroyed once, when the last handle drops.
unsafe impl Send for ShareGroup {}

/// ### English
/// Process-wide surfman share group. Each render thread opens its own device on the shared
/// connection and creates its context sharing objects with one root context, so texture ids
/// are valid across renderers.
///
/// ### 中文
/// 进程级 surfman 共享组。每个渲染线程在共享 connection 上打开自己的 device，
/// 并创建与同一个根上下文共享对象的上下文，因此纹理 id 在各渲染器之间通用。
pub struct SurfmanSharedContext {
    /// ### English
    /// Requested GL / GLES version.
    ///
    /// ### 中文
    /// 请求的 GL / GLES 版本。
    version: GLVersion,
    group: Mutex<ShareGroup>,
}

impl SurfmanSharedContext {
    pub fn new() -> Result<Arc<Self>, RenderError> {
        let connection = Connection::new().map_err(|err| {
            RenderError::Context(format!("Failed to create surfman Connection: {err:?}"))
        })?;
        let adapter = connection.create_adapter().map_err(|err| {
            RenderError::Context(format!("Failed to create surfman adapter: {err:?}"))
        })?;
        Ok(Arc::new(Self {
            version: GLVersion::new(3, 0),
            group: Mutex::new(ShareGroup {
                connection,
                adapter,
                root: None,
            }),
        }))
    }

    fn attributes(&self, config: ConfigAttributes) -> ContextAttributes {
        let flags = if config.has_alpha() {
            ContextAttributeFlags::ALPHA
        } else {
            ContextAttributeFlags::empty()
        };
        ContextAttributes {
            version: self.version,
            flags,
        }
    }
}

fn open_context(
    connection: &Connection,
    adapter: &Adapter,
    attributes: &ContextAttributes,
    share_with: Option<&Context>,
) -> Result<(Device, Context), RenderError> {
    let mut device = connection
        .create_device(adapter)
        .map_err(|err| RenderError::Context(format!("Failed to create surfman device: {err:?}")))?;
    let descriptor = device.create_context_descriptor(attributes).map_err(|err| {
        RenderError::Context(format!("Failed to create context descriptor: {err:?}"))
    })?;
    let context = device
        .create_context(&descriptor, share_with)
        .map_err(|err| RenderError::Context(format!("Failed to create surfman context: {err:?}")))?;
    Ok((device, context))
}

impl SharedGlContext for SurfmanSharedContext {
    fn create_context(&self, config: ConfigAttributes) -> Result<Box<dyn GlContext>, RenderError> {
        let attributes = self.attributes(config);
        let mut group = self.group.lock();
        if group.root.is_none() {
            let root = open_context(&group.connection, &group.adapter, &attributes, None)?;
            log::debug!("SurfmanSharedContext: created root context");
            group.root = Some(root);
        }

        let share_with = group.root.as_ref().map(|(_, root)| root);
        let (device, context) =
            open_context(&group.connection, &group.adapter, &attributes, share_with)?;
        Ok(Box::new(SurfmanGlContext {
            connection: group.connection.clone(),
            device,
            context: Some(context),
            glow: None,
            has_surface: false,
        }))
    }
}

impl Drop for SurfmanSharedContext {
    fn drop(&mut self) {
        if let Some((mut device, mut root)) = self.group.get_mut().root.take() {
            if let Err(err) = device.destroy_context(&mut root) {
                log::warn!("SurfmanSharedContext: destroy_context failed: {err:?}");
            }
        }
    }
}

/// ### English
/// surfman context owned by one render thread.
///
/// ### 中文
/// 由单个渲染线程持有的 surfman 上下文。
pub struct SurfmanGlContext {
    connection: Connection,
    device: Device,
    /// ### English
    /// `None` once released; surfman requires contexts to be destroyed explicitly.
    ///
    /// ### 中文
    /// 释放后为 `None`；surfman 要求显式销毁上下文。
    context: Option<Context>,
    /// ### English
    /// glow API loaded from the context the first time it is made current.
    ///
    /// ### 中文
    /// 首次 make current 时从上下文加载的 glow API。
    glow: Option<Arc<glow::Context>>,
    has_surface: bool,
}

impl SurfmanGlContext {
    fn context(&self) -> Result<&Context, RenderError> {
        self.context
            .as_ref()
            .ok_or_else(|| RenderError::Context("context already released".to_string()))
    }

    fn glow(&mut self) -> Result<Arc<glow::Context>, RenderError> {
        if let Some(glow) = &self.glow {
            return Ok(Arc::clone(glow));
        }
        let context = self.context()?;
        let device = &self.device;
        let glow = unsafe {
            glow::Context::from_loader_function(|name| device.get_proc_address(context, name))
        };
        let glow = Arc::new(glow);
        self.glow = Some(Arc::clone(&glow));
        Ok(glow)
    }
}

impl GlContext for SurfmanGlContext {
    fn has_surface(&self) -> bool {
        self.has_surface
    }

    fn create_surface(
        &mut self,
        surface: NativeSurface,
        size: PhysicalSize<u32>,
    ) -> Result<(), RenderError> {
        let Some(context) = self.context.as_mut() else {
            return Err(RenderError::Surface("context already released".to_string()));
        };
        let native_widget = unsafe {
            self.connection.create_native_widget_from_ptr(
                surface.as_ptr(),
                Size2D::new(size.width as i32, size.height as i32),
            )
        };
        let surface = self
            .device
            .create_surface(context, SurfaceAccess::GPUOnly, SurfaceType::Widget { native_widget })
            .map_err(|err| RenderError::Surface(format!("Failed to create widget surface: {err:?}")))?;
        if let Err((err, mut surface)) = self.device.bind_surface_to_context(context, surface) {
            let _ = self.device.destroy_surface(context, &mut surface);
            return Err(RenderError::Surface(format!("Failed to bind surface: {err:?}")));
        }
        self.has_surface = true;
        Ok(())
    }

    fn resize_surface(&mut self, size: PhysicalSize<u32>) -> Result<(), RenderError> {
        if !self.has_surface {
            return Ok(());
        }
        let Some(context) = self.context.as_mut() else {
            return Err(RenderError::Surface("context already released".to_string()));
        };
        let mut surface = self
            .device
            .unbind_surface_from_context(context)
            .map_err(|err| RenderError::Surface(format!("Failed to unbind surface: {err:?}")))?
            .ok_or_else(|| RenderError::Surface("no surface bound".to_string()))?;
        let resized = self
            .device
            .resize_surface(
                context,
                &mut surface,
                Size2D::new(size.width as i32, size.height as i32),
            )
            .map_err(|err| RenderError::Surface(format!("Failed to resize surface: {err:?}")));
        if let Err((err, mut surface)) = self.device.bind_surface_to_context(context, surface) {
            self.has_surface = false;
            let _ = self.device.destroy_surface(context, &mut surface);
            return Err(RenderError::Surface(format!("Failed to rebind surface: {err:?}")));
        }
        resized
    }

    fn make_current(&mut self) -> Result<(), RenderError> {
        let context = self.context()?;
        self.device
            .make_context_current(context)
            .map_err(|err| RenderError::Context(format!("Failed to make context current: {err:?}")))
    }

    fn detach_current(&mut self) {
        if let Err(err) = self.device.make_no_context_current() {
            log::warn!("SurfmanGlContext: make_no_context_current failed: {err:?}");
        }
    }

    fn release_surface(&mut self) {
        if !self.has_surface {
            return;
        }
        self.has_surface = false;
        let Some(context) = self.context.as_mut() else {
            return;
        };
        match self.device.unbind_surface_from_context(context) {
            Ok(Some(mut surface)) => {
                if let Err(err) = self.device.destroy_surface(context, &mut surface) {
                    log::warn!("SurfmanGlContext: destroy_surface failed: {err:?}");
                }
            }
            Ok(None) => {}
            Err(err) => log::warn!("SurfmanGlContext: unbind_surface failed: {err:?}"),
        }
    }

    fn surface_size(&self) -> PhysicalSize<u32> {
        let Some(context) = self.context.as_ref() else {
            return PhysicalSize::new(0, 0);
        };
        match self.device.context_surface_info(context) {
            Ok(Some(info)) => PhysicalSize::new(
                info.size.width.max(0) as u32,
                info.size.height.max(0) as u32,
            ),
            _ => PhysicalSize::new(0, 0),
        }
    }

    fn clear(&mut self, rgba: [f32; 4]) {
        let gl = match self.glow() {
            Ok(gl) => gl,
            Err(err) => {
                log::error!("SurfmanGlContext: cannot clear surface: {err}");
                return;
            }
        };
        unsafe {
            gl.clear_color(rgba[0], rgba[1], rgba[2], rgba[3]);
            gl.clear(glow::COLOR_BUFFER_BIT);
        }
    }

    fn swap_buffers(&mut self) -> Result<(), RenderError> {
        let Some(context) = self.context.as_mut() else {
            return Err(RenderError::Surface("context already released".to_string()));
        };
        let mut surface = self
            .device
            .unbind_surface_from_context(context)
            .map_err(|err| RenderError::Surface(format!("Failed to unbind surface: {err:?}")))?
            .ok_or_else(|| RenderError::Surface("no surface bound".to_string()))?;
        let presented = self
            .device
            .present_surface(context, &mut surface)
            .map_err(|err| RenderError::Surface(format!("Failed to present surface: {err:?}")));
        if let Err((err, mut surface)) = self.device.bind_surface_to_context(context, surface) {
            self.has_surface = false;
            let _ = self.device.destroy_surface(context, &mut surface);
            return Err(RenderError::Surface(format!("Failed to rebind surface: {err:?}")));
        }
        presented
    }

    fn create_drawer(&mut self) -> Result<Box<dyn GlDrawer>, RenderError> {
        Ok(Box::new(GlRectDrawer::new(self.glow()?)))
    }

    fn release(&mut self) {
        self.release_surface();
        self.glow = None;
        if let Some(mut context) = self.context.take() {
            let _ = self.device.make_no_context_current();
            if let Err(err) = self.device.destroy_context(&mut context) {
                log::warn!("SurfmanGlContext: destroy_context failed: {err:?}");
            }
        }
    }
}

impl Drop for SurfmanGlContext {
    fn drop(&mut self) {
        self.release();
    }
}
