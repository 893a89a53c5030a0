//! ### English
//! Process-wide, reference-counted owner of the root shared GL context.
//!
//! ### 中文
//! 进程级、带引用计数的根共享 GL 上下文持有者。

use std::sync::Arc;

use parking_lot::Mutex;

use crate::engine::error::RenderError;

use super::SharedGlContext;

type ContextFactory = dyn Fn() -> Result<Arc<dyn SharedGlContext>, RenderError> + Send + Sync;

#[derive(Default)]
struct ProviderState {
    root: Option<Arc<dyn SharedGlContext>>,
    leases: usize,
}

/// ### English
/// Hands out leases on one root shared context. The root is created by the factory on the first
/// acquire and dropped when the last lease goes away; a later acquire creates a fresh root.
///
/// ### 中文
/// 为同一个根共享上下文发放租约。首次 acquire 时由工厂创建根上下文，最后一个租约释放时将其丢弃；
/// 之后再 acquire 会创建新的根上下文。
pub struct SharedContextProvider {
    factory: Box<ContextFactory>,
    state: Arc<Mutex<ProviderState>>,
}

impl SharedContextProvider {
    pub fn new(
        factory: impl Fn() -> Result<Arc<dyn SharedGlContext>, RenderError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            factory: Box::new(factory),
            state: Arc::new(Mutex::new(ProviderState::default())),
        }
    }

    /// ### English
    /// Takes a lease, creating the root context if no lease is outstanding.
    ///
    /// ### 中文
    /// 获取一个租约；若当前没有未归还的租约则先创建根上下文。
    pub fn acquire(&self) -> Result<SharedContextLease, RenderError> {
        let mut state = self.state.lock();
        let context = match &state.root {
            Some(root) => Arc::clone(root),
            None => {
                let root = (self.factory)()?;
                log::debug!("SharedContextProvider: created root context");
                state.root = Some(Arc::clone(&root));
                root
            }
        };
        state.leases += 1;
        Ok(SharedContextLease {
            context,
            state: Arc::clone(&self.state),
        })
    }

    /// Number of outstanding leases.
    pub fn lease_count(&self) -> usize {
        self.state.lock().leases
    }
}

/// ### English
/// One reference on the provider's root context. Dropping it gives the reference back.
///
/// ### 中文
/// 对提供者根上下文的一次引用。drop 时归还该引用。
pub struct SharedContextLease {
    context: Arc<dyn SharedGlContext>,
    state: Arc<Mutex<ProviderState>>,
}

impl SharedContextLease {
    pub fn context(&self) -> Arc<dyn SharedGlContext> {
        Arc::clone(&self.context)
    }
}

impl Drop for SharedContextLease {
    fn drop(&mut self) {
        let mut state = self.state.lock();
        state.leases = state.leases.saturating_sub(1);
        if state.leases == 0 && state.root.take().is_some() {
            log::debug!("SharedContextProvider: released root context");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::engine::rendering::testing::FakeSharedContext;

    fn counting_provider() -> (SharedContextProvider, Arc<AtomicUsize>) {
        let created = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&created);
        let provider = SharedContextProvider::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            let (shared, _probe) = FakeSharedContext::new();
            Ok(Arc::new(shared) as Arc<dyn SharedGlContext>)
        });
        (provider, created)
    }

    #[test]
    fn leases_share_one_root() {
        let (provider, created) = counting_provider();
        let a = provider.acquire().expect("first lease");
        let b = provider.acquire().expect("second lease");
        assert_eq!(created.load(Ordering::SeqCst), 1);
        assert!(Arc::ptr_eq(&a.context(), &b.context()));
        assert_eq!(provider.lease_count(), 2);

        drop(a);
        assert_eq!(provider.lease_count(), 1);
        drop(b);
        assert_eq!(provider.lease_count(), 0);
    }

    #[test]
    fn last_release_drops_the_root() {
        let (provider, created) = counting_provider();
        drop(provider.acquire().expect("lease"));
        let _again = provider.acquire().expect("lease");
        assert_eq!(created.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn factory_errors_leave_no_lease() {
        let provider =
            SharedContextProvider::new(|| Err(RenderError::Context("no display".to_string())));
        assert!(matches!(provider.acquire(), Err(RenderError::Context(_))));
        assert_eq!(provider.lease_count(), 0);
    }
}
