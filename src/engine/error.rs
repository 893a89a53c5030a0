//! ### English
//! Error type shared by the renderer, the render thread and the GL backends.
//!
//! ### 中文
//! 渲染器、渲染线程与 GL 后端共用的错误类型。

use std::io;

/// ### English
/// Errors reported by renderer operations.
///
/// `AlreadyInitialized` and `WrongThread` are caller contract violations; the GL variants carry
/// the backend's own message.
///
/// ### 中文
/// 渲染器操作返回的错误。
///
/// `AlreadyInitialized` 与 `WrongThread` 表示调用方违反约定；GL 相关变体携带后端自身的错误信息。
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("renderer is already initialized")]
    AlreadyInitialized,
    #[error("{operation} must run on the render thread")]
    WrongThread { operation: &'static str },
    #[error("render thread exited before answering")]
    RenderThreadGone,
    #[error("failed to spawn render thread: {0}")]
    Spawn(#[from] io::Error),
    #[error("GL context error: {0}")]
    Context(String),
    #[error("GL surface error: {0}")]
    Surface(String),
    #[error("GL draw error: {0}")]
    Draw(String),
}
