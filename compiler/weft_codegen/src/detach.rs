//! Suspension protocol collaborator.
//!
//! The save/resume encoding of a suspend point belongs to the renderer's
//! detach machinery, not to this crate. The provider compiler only requests
//! forcing through these traits and treats the emitted [`Force`] fragment as
//! opaque.
//!
//! [`Force`]: crate::emit::CodeExpr::Force

use crate::emit::{CodeExpr, Label};

/// Forces providers to values on behalf of generated code, bound to one
/// resumption point.
pub trait Detacher {
    /// Emit code that forces `provider` to its underlying value.
    ///
    /// The emitted fragment may suspend; if it does, rendering resumes at
    /// this detacher's label with completed work preserved. From the
    /// generated code's perspective the force simply blocked.
    fn force_to_value(&self, provider: CodeExpr) -> CodeExpr;
}

/// Creates [`Detacher`]s bound to resumption points.
pub trait DetacherFactory {
    /// Create a detacher whose suspend points all reattach at `reattach`.
    fn detacher(&self, reattach: Label) -> Box<dyn Detacher + '_>;
}
