//! The provider abstraction: compute-or-suspend values.

use std::sync::{Arc, OnceLock};

use parking_lot::Mutex;

use crate::Value;

/// Result of forcing a provider.
#[derive(Clone, PartialEq, Debug)]
pub enum Step {
    /// The value is available now.
    Ready(Value),
    /// The value is not available yet; the renderer must suspend and retry
    /// at the same point later.
    Pending,
}

/// A possibly-not-yet-computed value.
///
/// Forcing is idempotent from the caller's perspective: once a provider has
/// reported [`Step::Ready`] it keeps reporting the same value, and any
/// one-time side effects attached to first resolution (logging markers,
/// instrumentation) happen at most once. Implementations memoize to
/// guarantee this.
pub trait Provider {
    /// Compute-or-suspend accessor.
    fn force(&self) -> Step;
}

/// Shared handle to a provider.
pub type ProviderRef = Arc<dyn Provider + Send + Sync>;

/// The provider wrapping the null value.
///
/// Process-wide singleton: [`null_provider`] always returns the same
/// allocation, so generated code can compare provider identity instead of
/// re-deriving a null wrapper per use.
struct NullProvider;

impl Provider for NullProvider {
    fn force(&self) -> Step {
        Step::Ready(Value::Null)
    }
}

static NULL_PROVIDER: OnceLock<ProviderRef> = OnceLock::new();

/// Shared null-provider constant. Reading it is free; it never suspends.
pub fn null_provider() -> ProviderRef {
    NULL_PROVIDER.get_or_init(|| Arc::new(NullProvider)).clone()
}

/// A provider wrapping an already-computed plain value.
///
/// This is the target of the boxing conversion: eager code produced a
/// [`Value`], and a provider-shaped consumer needs it.
pub struct BoxedValue(Value);

impl BoxedValue {
    pub fn new(value: Value) -> Self {
        BoxedValue(value)
    }

    /// Convenience constructor returning a shared handle.
    pub fn boxed(value: Value) -> ProviderRef {
        Arc::new(BoxedValue(value))
    }
}

impl Provider for BoxedValue {
    fn force(&self) -> Step {
        Step::Ready(self.0.clone())
    }
}

/// A provider that computes its value once and caches it.
///
/// The compute closure runs on first force only; subsequent forces return
/// the cached value without re-running it. A closure may also report
/// [`Step::Pending`], in which case it will be retried on the next force.
pub struct CachingProvider {
    cached: Mutex<Option<Value>>,
    compute: Box<dyn Fn() -> Step + Send + Sync>,
}

impl CachingProvider {
    pub fn new(compute: impl Fn() -> Step + Send + Sync + 'static) -> Self {
        CachingProvider {
            cached: Mutex::new(None),
            compute: Box::new(compute),
        }
    }
}

impl Provider for CachingProvider {
    fn force(&self) -> Step {
        let mut cached = self.cached.lock();
        if let Some(value) = cached.as_ref() {
            return Step::Ready(value.clone());
        }
        match (self.compute)() {
            Step::Ready(value) => {
                *cached = Some(value.clone());
                Step::Ready(value)
            }
            Step::Pending => Step::Pending,
        }
    }
}
