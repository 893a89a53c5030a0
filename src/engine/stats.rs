//! ### English
//! Frame statistics: received / dropped / rendered counters and render timing.
//! A diagnostic report is logged every [`LOG_INTERVAL_FRAMES`] rendered frames.
//!
//! ### 中文
//! 帧统计：接收 / 丢弃 / 渲染计数以及渲染耗时。
//! 每渲染 [`LOG_INTERVAL_FRAMES`] 帧输出一次诊断日志。

use std::time::{Duration, Instant};

/// ### English
/// Rendered-frame cadence of the diagnostic report.
///
/// ### 中文
/// 诊断日志的渲染帧间隔。
pub const LOG_INTERVAL_FRAMES: u64 = 300;

/// ### English
/// Point-in-time copy of the frame counters.
///
/// ### 中文
/// 帧计数器的某一时刻快照。
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StatisticsSnapshot {
    pub frames_received: u64,
    pub frames_dropped: u64,
    pub frames_rendered: u64,
}

/// ### English
/// What the caller has to do after a frame was counted as rendered.
///
/// ### 中文
/// 某帧计为已渲染后，调用方需要执行的后续动作。
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct RenderedOutcome {
    /// ### English
    /// This was the first rendered frame since the last reset.
    ///
    /// ### 中文
    /// 这是自上次重置以来渲染的第一帧。
    pub first_frame: bool,
    /// ### English
    /// The periodic report is due.
    ///
    /// ### 中文
    /// 到了输出周期性统计日志的时机。
    pub report_due: bool,
}

#[derive(Debug, Default)]
pub(crate) struct RenderStatistics {
    frames_received: u64,
    frames_dropped: u64,
    frames_rendered: u64,
    first_frame_time: Option<Instant>,
    render_time: Duration,
    reports_logged: u64,
}

impl RenderStatistics {
    pub(crate) fn reset(&mut self) {
        *self = Self::default();
    }

    pub(crate) fn frame_received(&mut self) {
        self.frames_received += 1;
    }

    pub(crate) fn frame_dropped(&mut self) {
        self.frames_dropped += 1;
    }

    /// ### English
    /// Counts one presented frame.
    ///
    /// #### Parameters
    /// - `started`: When the render pass began drawing (the first frame's start becomes the
    ///   reference point for FPS).
    /// - `render_time`: Time spent drawing and presenting this frame.
    ///
    /// ### 中文
    /// 记录一帧已上屏。
    ///
    /// #### 参数
    /// - `started`：本次渲染开始绘制的时刻（第一帧的开始时刻作为 FPS 的参考点）。
    /// - `render_time`：绘制并提交该帧所花费的时间。
    pub(crate) fn frame_rendered(
        &mut self,
        started: Instant,
        render_time: Duration,
    ) -> RenderedOutcome {
        let first_frame = self.frames_rendered == 0;
        if first_frame {
            self.first_frame_time = Some(started);
        }
        self.frames_rendered += 1;
        self.render_time += render_time;
        RenderedOutcome {
            first_frame,
            report_due: self.frames_rendered % LOG_INTERVAL_FRAMES == 0,
        }
    }

    pub(crate) fn snapshot(&self) -> StatisticsSnapshot {
        StatisticsSnapshot {
            frames_received: self.frames_received,
            frames_dropped: self.frames_dropped,
            frames_rendered: self.frames_rendered,
        }
    }

    /// Diagnostic reports emitted since the last reset.
    #[cfg(test)]
    pub(crate) fn reports_logged(&self) -> u64 {
        self.reports_logged
    }

    /// ### English
    /// Logs counters, elapsed time since the first frame, effective FPS and average render time.
    ///
    /// ### 中文
    /// 输出计数、自第一帧起的耗时、实际 FPS 与平均渲染耗时。
    pub(crate) fn log(&mut self, name: &str) {
        self.reports_logged += 1;
        log::info!(
            "{name}Frames received: {}. Dropped: {}. Rendered: {}",
            self.frames_received,
            self.frames_dropped,
            self.frames_rendered
        );
        let Some(first_frame_time) = self.first_frame_time else {
            return;
        };
        if self.frames_received == 0 || self.frames_rendered == 0 {
            return;
        }

        let elapsed_ns = first_frame_time.elapsed().as_nanos().max(1);
        let fps = self.frames_rendered as f64 * 1e9 / elapsed_ns as f64;
        let average_us = self.render_time.as_nanos() / (1000 * u128::from(self.frames_rendered));
        log::info!(
            "{name}Duration: {} ms. FPS: {fps:.2}",
            elapsed_ns / 1_000_000
        );
        log::info!("{name}Average render time: {average_us} us.");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_is_due_once_per_interval() {
        let mut stats = RenderStatistics::default();
        let started = Instant::now();
        let mut reports = 0;
        let mut firsts = 0;
        for _ in 0..LOG_INTERVAL_FRAMES {
            stats.frame_received();
            let outcome = stats.frame_rendered(started, Duration::from_micros(250));
            reports += usize::from(outcome.report_due);
            firsts += usize::from(outcome.first_frame);
        }
        assert_eq!(reports, 1);
        assert_eq!(firsts, 1);
        stats.log("test: ");
        assert_eq!(stats.reports_logged(), 1);

        let outcome = stats.frame_rendered(started, Duration::ZERO);
        assert!(!outcome.report_due);
        assert!(!outcome.first_frame);
    }

    #[test]
    fn reset_zeroes_everything() {
        let mut stats = RenderStatistics::default();
        stats.frame_received();
        stats.frame_dropped();
        stats.frame_rendered(Instant::now(), Duration::from_millis(1));
        stats.reset();
        assert_eq!(stats.snapshot(), StatisticsSnapshot::default());
        assert!(stats.frame_rendered(Instant::now(), Duration::ZERO).first_frame);
    }
}
