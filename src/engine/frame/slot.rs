use parking_lot::Mutex;

use super::VideoFrame;

/// ### English
/// Single-slot, overwrite-on-full buffer holding the newest frame that has not been rendered.
///
/// Producers never block: inserting while a frame is pending displaces the old one, which the
/// caller releases and counts as dropped.
///
/// ### 中文
/// 单槽、满则覆盖的缓冲，保存最新的尚未渲染的帧。
///
/// 生产者永不阻塞：已有待渲染帧时插入会替换旧帧，由调用方释放并计为丢帧。
#[derive(Default)]
pub(crate) struct PendingFrameSlot {
    /// ### English
    /// The pending frame (frame lock).
    ///
    /// ### 中文
    /// 待渲染帧（帧锁保护）。
    pending: Mutex<Option<VideoFrame>>,
}

impl PendingFrameSlot {
    /// ### English
    /// Stores `frame` and returns the frame it displaced, if any.
    ///
    /// ### 中文
    /// 存入 `frame`，并返回被替换的旧帧（若有）。
    pub(crate) fn replace(&self, frame: VideoFrame) -> Option<VideoFrame> {
        self.pending.lock().replace(frame)
    }

    /// ### English
    /// Removes and returns the pending frame without blocking on producers.
    ///
    /// ### 中文
    /// 取出待渲染帧（不会等待生产者）。
    pub(crate) fn take(&self) -> Option<VideoFrame> {
        self.pending.lock().take()
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_frames::yuv_frame;
    use super::*;

    #[test]
    fn newest_frame_survives_and_displaced_frames_release_once() {
        let slot = PendingFrameSlot::default();
        let mut counters = Vec::new();
        let mut displaced = 0;
        for tag in 0..5u8 {
            let (frame, counter) = yuv_frame(2, 2, tag);
            counters.push(counter);
            if let Some(old) = slot.replace(frame) {
                displaced += 1;
                old.release();
            }
        }

        assert_eq!(displaced, 4);
        for counter in &counters[..4] {
            assert_eq!(counter.get(), 1);
        }
        assert_eq!(counters[4].get(), 0);

        let survivor = slot.take().expect("latest frame pending");
        drop(survivor);
        assert_eq!(counters[4].get(), 1);
        assert!(slot.take().is_none());
    }
}
