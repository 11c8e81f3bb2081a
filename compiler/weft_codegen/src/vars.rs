//! Variable resolution collaborator.

use weft_ir::Name;

use crate::emit::CodeExpr;

/// Maps parameter and local-variable references to their already-compiled
/// runtime locations.
///
/// Owned by the surrounding code generator, not by the provider compiler.
/// Resolution always succeeds for references that survived the earlier
/// binding pass; failure here is a bug in that pass, so the trait has no
/// error channel.
pub trait VarResolver {
    /// Read a template parameter. Parameters are always stored in provider
    /// form, so the returned fragment is provider-typed.
    fn param(&self, name: Name) -> CodeExpr;

    /// Read a `let`-bound local. Like parameters, `let` slots are always
    /// already providers.
    fn local(&self, name: Name) -> CodeExpr;

    /// Read a loop variable. The declared type of the returned fragment
    /// tells the caller what the slot actually holds: a raw integer when
    /// iterating an integer range, a provider otherwise.
    fn loop_var(&self, name: Name) -> CodeExpr;
}
