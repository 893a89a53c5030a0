//! ### English
//! `VideoViewGroup`: a container that keeps one [`VideoView`] centred and aspect-fitted inside
//! its own bounds.
//!
//! ### 中文
//! `VideoViewGroup`：一个容器，让其中的 [`VideoView`] 以保持宽高比的方式居中显示在自身边界内。

use std::sync::Arc;

use parking_lot::Mutex;

use super::events::ViewHost;
use super::frame::Rotation;
use super::layout::{ScalingType, display_size, frame_aspect_ratio};
use super::rendering::SharedContextProvider;
use super::video_view::{VideoView, VideoViewListener};

/// ### English
/// Child bounds in the group's coordinate space.
///
/// ### 中文
/// 子 view 在容器坐标系中的边界。
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ChildBounds {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

#[derive(Clone, Copy, Debug, Default)]
struct VideoDimensions {
    width: u32,
    height: u32,
    rotation: Rotation,
}

/// ### English
/// Records reported dimensions and forwards every event to the user's listener.
///
/// ### 中文
/// 记录上报的尺寸，并将所有事件转发给使用方的监听器。
struct GroupListener {
    dimensions: Arc<Mutex<VideoDimensions>>,
    forward: Arc<Mutex<Option<Arc<dyn VideoViewListener>>>>,
}

impl VideoViewListener for GroupListener {
    fn on_first_frame(&self) {
        let forward = self.forward.lock().clone();
        if let Some(listener) = forward {
            listener.on_first_frame();
        }
    }

    fn on_frame_dimensions_changed(&self, width: u32, height: u32, rotation: Rotation) {
        *self.dimensions.lock() = VideoDimensions {
            width,
            height,
            rotation,
        };
        let forward = self.forward.lock().clone();
        if let Some(listener) = forward {
            listener.on_frame_dimensions_changed(width, height, rotation);
        }
    }
}

pub struct VideoViewGroup {
    view: VideoView,
    dimensions: Arc<Mutex<VideoDimensions>>,
    forward: Arc<Mutex<Option<Arc<dyn VideoViewListener>>>>,
}

impl VideoViewGroup {
    pub fn new(name: &str, host: Arc<dyn ViewHost>, provider: Arc<SharedContextProvider>) -> Self {
        let view = VideoView::new(name, host, provider);
        let dimensions = Arc::new(Mutex::new(VideoDimensions::default()));
        let forward = Arc::new(Mutex::new(None));
        view.set_listener(Some(Arc::new(GroupListener {
            dimensions: Arc::clone(&dimensions),
            forward: Arc::clone(&forward),
        })));
        Self {
            view,
            dimensions,
            forward,
        }
    }

    pub fn view(&self) -> &VideoView {
        &self.view
    }

    /// ### English
    /// Listener receiving the child's events after the group has recorded them.
    ///
    /// ### 中文
    /// 在容器记录完成后接收子 view 事件的监听器。
    pub fn set_listener(&self, listener: Option<Arc<dyn VideoViewListener>>) {
        *self.forward.lock() = listener;
    }

    /// ### English
    /// Lays the child out centred inside `(left, top, right, bottom)` with aspect-fit sizing and
    /// returns its bounds. Before any video dimensions are known the child fills the group; a
    /// group with a zero dimension collapses the child to an empty rectangle.
    ///
    /// ### 中文
    /// 在 `(left, top, right, bottom)` 内以 aspect-fit 方式居中布局子 view 并返回其边界。
    /// 尚无视频尺寸时子 view 填满容器；容器任一维度为 0 时子 view 收缩为空矩形。
    pub fn layout(&self, left: i32, top: i32, right: i32, bottom: i32) -> ChildBounds {
        let width = right.saturating_sub(left).max(0) as u32;
        let height = bottom.saturating_sub(top).max(0) as u32;
        let bounds = if width == 0 || height == 0 {
            ChildBounds::default()
        } else {
            let dimensions = *self.dimensions.lock();
            let aspect =
                frame_aspect_ratio(dimensions.width, dimensions.height, dimensions.rotation);
            let size = display_size(ScalingType::AspectFit, aspect, width, height);
            let left = ((width - size.width) / 2) as i32;
            let top = ((height - size.height) / 2) as i32;
            ChildBounds {
                left,
                top,
                right: left + size.width as i32,
                bottom: top + size.height as i32,
            }
        };

        self.view
            .update_layout(bounds.left, bounds.top, bounds.right, bounds.bottom);
        bounds
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::rendering::testing::{FakeSharedContext, TestHost};
    use crate::engine::rendering::SharedGlContext;

    fn group() -> VideoViewGroup {
        let (shared, _probe) = FakeSharedContext::new();
        let shared: Arc<dyn SharedGlContext> = Arc::new(shared);
        let provider = Arc::new(SharedContextProvider::new(move || Ok(Arc::clone(&shared))));
        VideoViewGroup::new("group", TestHost::new(), provider)
    }

    fn report(group: &VideoViewGroup, width: u32, height: u32, rotation: Rotation) {
        let listener = GroupListener {
            dimensions: Arc::clone(&group.dimensions),
            forward: Arc::clone(&group.forward),
        };
        listener.on_frame_dimensions_changed(width, height, rotation);
    }

    #[test]
    fn child_fills_the_group_before_video_dimensions_are_known() {
        let group = group();
        assert_eq!(
            group.layout(0, 0, 300, 200),
            ChildBounds {
                left: 0,
                top: 0,
                right: 300,
                bottom: 200,
            }
        );
    }

    #[test]
    fn child_is_centred_with_aspect_fit() {
        let group = group();
        report(&group, 200, 100, Rotation::Deg0);
        assert_eq!(
            group.layout(0, 0, 400, 400),
            ChildBounds {
                left: 0,
                top: 100,
                right: 400,
                bottom: 300,
            }
        );
    }

    #[test]
    fn rotation_swaps_the_fitted_aspect() {
        let group = group();
        report(&group, 200, 100, Rotation::Deg90);
        assert_eq!(
            group.layout(0, 0, 400, 400),
            ChildBounds {
                left: 100,
                top: 0,
                right: 300,
                bottom: 400,
            }
        );
    }

    #[test]
    fn zero_sized_group_collapses_the_child() {
        let group = group();
        report(&group, 200, 100, Rotation::Deg0);
        assert_eq!(group.layout(10, 10, 10, 50), ChildBounds::default());
    }

    #[test]
    fn events_are_forwarded_after_recording() {
        #[derive(Default)]
        struct Seen(Mutex<Vec<(u32, u32)>>);

        impl VideoViewListener for Seen {
            fn on_first_frame(&self) {}

            fn on_frame_dimensions_changed(&self, width: u32, height: u32, _rotation: Rotation) {
                self.0.lock().push((width, height));
            }
        }

        let group = group();
        let seen = Arc::new(Seen::default());
        group.set_listener(Some(seen.clone()));
        report(&group, 64, 48, Rotation::Deg0);
        assert_eq!(*seen.0.lock(), vec![(64, 48)]);
    }
}
