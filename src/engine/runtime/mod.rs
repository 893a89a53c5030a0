//! ### English
//! Render-thread runtime: task protocol, two-lane task queue and the thread loop.
//!
//! ### 中文
//! 渲染线程运行时：任务协议、双通道任务队列与线程主循环。

mod queue;
mod render_thread;
mod task;

pub(crate) use queue::TaskSender;
#[cfg(test)]
pub(crate) use render_thread::RENDER_THREAD_NAME;
pub(crate) use render_thread::spawn;
pub(crate) use task::RenderTask;
