use crate::engine::{Collection, CollectionInner};
use fcrypt_cryptor::LifecycleHooks;
use parking_lot::RwLock;
use private::Sealed;
use std::sync::Arc;
use std::sync::atomic::AtomicU64;
use tracing::debug;

#[derive(Debug, Default)]
pub struct NoHooks;
#[derive(Debug)]
pub struct WithHooks(Arc<dyn LifecycleHooks>);

mod private {
    pub(super) trait Sealed {}
}
impl Sealed for NoHooks {}
impl Sealed for WithHooks {}

/// A builder for a [`Collection`].
///
/// Hooks are mandatory and enforced by the type state: a collection that stores sensitive
/// documents without consulting them cannot be constructed. Bypassed stages install
/// [`fcrypt_cryptor::PassthroughHooks`] explicitly.
#[allow(private_bounds)]
#[derive(Debug)]
pub struct CollectionBuilder<S: Sealed = NoHooks> {
    state: S,
    name: String,
    generate_ids: bool,
}

#[allow(private_bounds)]
impl<S: Sealed> CollectionBuilder<S> {
    /// Assign a sequential `_id` to documents inserted without one (on by default).
    #[must_use = "Sets whether missing `_id` fields are generated"]
    pub const fn generate_ids(mut self, enable: bool) -> Self {
        self.generate_ids = enable;
        self
    }

    fn transition<N: Sealed>(self, state: N) -> CollectionBuilder<N> {
        CollectionBuilder { state, name: self.name, generate_ids: self.generate_ids }
    }
}

impl CollectionBuilder<NoHooks> {
    #[must_use = "Creates a new collection builder"]
    pub fn new(name: impl Into<String>) -> Self {
        Self { state: NoHooks, name: name.into(), generate_ids: true }
    }

    #[must_use = "Sets the lifecycle hooks run around every operation"]
    pub fn hooks(self, hooks: Arc<dyn LifecycleHooks>) -> CollectionBuilder<WithHooks> {
        self.transition(WithHooks(hooks))
    }
}

impl CollectionBuilder<WithHooks> {
    #[must_use]
    pub fn build(self) -> Collection {
        debug!(collection = %self.name, hooks = ?self.state.0, "Collection created");
        Collection {
            inner: Arc::new(CollectionInner {
                name: self.name,
                hooks: self.state.0,
                documents: RwLock::new(Vec::new()),
                generate_ids: self.generate_ids,
                id_counter: AtomicU64::new(1),
            }),
        }
    }
}
