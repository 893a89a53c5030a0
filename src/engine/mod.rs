/// ### English
/// Engine internal modules (render thread, GL backends, frame slot, layout math, view facades).
///
/// ### 中文
/// 引擎内部模块（渲染线程、GL 后端、帧槽、布局数学、view 外观层等）。
pub mod error;
pub mod events;
pub mod frame;
pub mod layout;
pub mod matrix;
pub mod renderer;
pub mod rendering;
pub(crate) mod runtime;
pub mod stats;
pub mod video_group;
pub mod video_view;
