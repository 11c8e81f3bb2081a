//! Plain-value (eager) compilation collaborator.

use weft_ir::{ExprArena, ExprId};

use crate::detach::Detacher;
use crate::emit::{CodeExpr, StaticType};

/// Result of compiling an expression to a plain (non-provider) value.
#[derive(Clone, PartialEq, Debug)]
pub struct PlainValueUnit {
    pub expr: CodeExpr,
    pub ty: StaticType,
}

impl PlainValueUnit {
    pub fn new(expr: CodeExpr, ty: StaticType) -> Self {
        PlainValueUnit { expr, ty }
    }

    /// Box this plain value into provider form.
    pub fn box_as_provider(self) -> CodeExpr {
        CodeExpr::BoxValue {
            value: Box::new(self.expr),
        }
    }

    /// Coerce this plain value to a boolean condition.
    pub fn coerce_to_bool(self) -> CodeExpr {
        if self.ty == StaticType::Bool {
            self.expr
        } else {
            CodeExpr::CoerceToBool(Box::new(self.expr))
        }
    }
}

/// The eager expression compiler, consumed as a fallback.
///
/// This is the always-succeeding non-provider compilation path the provider
/// compiler leans on when an expression has no natural provider form.
pub trait PlainCompiler {
    /// Compile to a plain value, refusing to emit any suspend points.
    ///
    /// `None` means the expression cannot be computed without potentially
    /// suspending (it reads something that may still be streaming in); it is
    /// a mode outcome, not an error.
    fn compile_no_suspend(&self, arena: &ExprArena, node: ExprId) -> Option<PlainValueUnit>;

    /// Compile to a plain value, emitting suspend points through `detacher`
    /// wherever a provider must be forced. Always succeeds.
    fn compile_allowing_suspend(
        &self,
        arena: &ExprArena,
        node: ExprId,
        detacher: &dyn Detacher,
    ) -> PlainValueUnit;
}
