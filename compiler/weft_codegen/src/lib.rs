//! Provider-form code generation for the Weft template backend.
//!
//! Templates render values that may be expensive or still streaming in, so
//! the runtime represents every renderable value as a
//! [`Provider`](weft_data::Provider). This crate decides, node by node,
//! whether an expression can be compiled straight to a provider, keeping
//! it lazy and keeping whatever deferred side-channel data it carries,
//! instead of eagerly materializing a value and boxing it.
//!
//! The public surface is [`ProviderCompiler`] with its two entry points
//! (suspension permitted vs. forbidden); everything else here is the
//! vocabulary those entry points speak:
//!
//! - [`emit`]: the fragment tree the compiler produces.
//! - [`vars`], [`plain`], [`detach`]: the collaborator traits it consumes
//!   for variable resolution, the eager fallback compiler, and the
//!   suspension protocol.

pub mod detach;
pub mod emit;
pub mod plain;
pub mod vars;

mod to_provider;

pub use to_provider::{CompiledUnit, ProviderCompiler, Repr};

#[cfg(test)]
mod test_helpers;
