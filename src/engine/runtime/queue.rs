//! ### English
//! Render-thread task queue: a FIFO lane, a front lane that pre-empts it, and a doorbell.
//!
//! ### 中文
//! 渲染线程任务队列：一条 FIFO 通道、一条可抢占它的队首通道，以及一个门铃。

use crossbeam_channel as channel;

use super::task::RenderTask;

/// ### English
/// Creates a connected sender/receiver pair.
///
/// ### 中文
/// 创建一对相连的发送端/接收端。
pub(crate) fn task_queue() -> (TaskSender, TaskReceiver) {
    let (front_tx, front_rx) = channel::unbounded();
    let (back_tx, back_rx) = channel::unbounded();
    let (doorbell_tx, doorbell_rx) = channel::bounded(1);
    (
        TaskSender {
            front: front_tx,
            back: back_tx,
            doorbell: doorbell_tx,
        },
        TaskReceiver {
            front: front_rx,
            back: back_rx,
            doorbell: doorbell_rx,
        },
    )
}

/// ### English
/// Posting side, held by the renderer under its handler lock.
///
/// ### 中文
/// 投递端，由渲染器在 handler 锁下持有。
#[derive(Clone)]
pub(crate) struct TaskSender {
    front: channel::Sender<RenderTask>,
    back: channel::Sender<RenderTask>,
    /// ### English
    /// One-slot wake signal; a full slot already guarantees a wake-up.
    ///
    /// ### 中文
    /// 单槽唤醒信号；槽已满时已能保证接收端会被唤醒。
    doorbell: channel::Sender<()>,
}

impl TaskSender {
    /// ### English
    /// Appends `task` to the FIFO lane. Returns `false` once the render thread has stopped.
    ///
    /// ### 中文
    /// 将 `task` 追加到 FIFO 通道。渲染线程已停止时返回 `false`。
    pub(crate) fn post(&self, task: RenderTask) -> bool {
        if self.back.send(task).is_err() {
            return false;
        }
        self.ring();
        true
    }

    /// ### English
    /// Queues `task` ahead of every FIFO task not yet started. Front tasks run in the order they
    /// were posted.
    ///
    /// ### 中文
    /// 将 `task` 排在所有尚未开始的 FIFO 任务之前。队首任务之间按投递顺序执行。
    pub(crate) fn post_at_front(&self, task: RenderTask) -> bool {
        if self.front.send(task).is_err() {
            return false;
        }
        self.ring();
        true
    }

    fn ring(&self) {
        let _ = self.doorbell.try_send(());
    }
}

/// ### English
/// Consuming side, owned by the render thread.
///
/// ### 中文
/// 消费端，由渲染线程持有。
pub(crate) struct TaskReceiver {
    front: channel::Receiver<RenderTask>,
    back: channel::Receiver<RenderTask>,
    doorbell: channel::Receiver<()>,
}

impl TaskReceiver {
    /// ### English
    /// Blocks until a task is available. Returns `None` once every sender is gone and both lanes
    /// are drained.
    ///
    /// ### 中文
    /// 阻塞直到有任务可取。所有发送端都已 drop 且两条通道均已取空时返回 `None`。
    pub(crate) fn recv(&self) -> Option<RenderTask> {
        loop {
            if let Some(task) = self.try_recv() {
                return Some(task);
            }
            if self.doorbell.recv().is_err() {
                return self.try_recv();
            }
        }
    }

    fn try_recv(&self) -> Option<RenderTask> {
        self.front
            .try_recv()
            .or_else(|_| self.back.try_recv())
            .ok()
    }
}
