//! Runtime value and provider model for rendered Weft templates.
//!
//! A rendered template never handles raw values directly; everything that
//! can appear in output is a [`Provider`]: a possibly-not-yet-computed value
//! with a compute-or-suspend accessor. Asking a provider for its value
//! ([`Provider::force`]) either yields the value immediately
//! ([`Step::Ready`]) or signals that the renderer must pause and retry later
//! ([`Step::Pending`]) without redoing completed work.
//!
//! This crate is the vocabulary shared between generated rendering code and
//! the incremental renderer; it knows nothing about compilation.

mod provider;
mod value;

pub use provider::{null_provider, BoxedValue, CachingProvider, Provider, ProviderRef, Step};
pub use value::Value;
