/// ### English
/// `video_surface_renderer` crate root.
/// The public surface is re-exported here; the implementation lives under `engine`.
///
/// ### 中文
/// `video_surface_renderer` 的 crate 根。
/// 对外 API 在此处重新导出；具体实现位于 `engine` 模块。
mod engine;

pub use engine::error::RenderError;
pub use engine::events::{RendererEvents, UiTask, ViewHost};
pub use engine::frame::{FrameBuffer, I420Buffer, Rotation, VideoFrame};
pub use engine::layout::{MeasureSpec, ScalingType, display_size};
pub use engine::matrix::{Mat4, layout_matrix, multiply_matrices, rotate_texture_matrix};
pub use engine::renderer::SurfaceViewRenderer;
pub use engine::rendering::{
    ConfigAttributes, GlContext, GlDrawer, GlRectDrawer, NativeSurface, SharedContextLease,
    SharedContextProvider, SharedGlContext, Viewport,
};
#[cfg(feature = "surfman")]
pub use engine::rendering::{SurfmanGlContext, SurfmanSharedContext};
pub use engine::stats::StatisticsSnapshot;
pub use engine::video_group::{ChildBounds, VideoViewGroup};
pub use engine::video_view::{VideoScaleType, VideoView, VideoViewListener};
