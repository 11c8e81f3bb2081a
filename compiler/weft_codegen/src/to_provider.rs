//! Compiles expression nodes to provider-producing fragments.
//!
//! Given a node from the expression tree, [`ProviderCompiler`] decides
//! whether code can be emitted that yields a native [`Provider`] for that
//! expression, preserving laziness and any deferred side-channel data
//! (logging markers) the provider carries. There are two entry points,
//! one per compilation mode:
//!
//! - [`compile_preferring_laziness`] permits suspend points but avoids
//!   introducing boxing conversions: meant for print operations, which can
//!   render a provider incrementally but gain nothing from boxing a value
//!   that was never a provider to begin with.
//! - [`compile_preferring_no_suspension`] permits boxing but statically
//!   guarantees the result contains zero suspend points: meant for binding
//!   parameters and `let` values, which hand the provider to components
//!   that do not implement resumption.
//!
//! Both return `None` when no provider-form compilation is possible under
//! the selected constraints; callers fall back to a separate eager path.
//!
//! [`Provider`]: weft_data::Provider
//! [`compile_preferring_laziness`]: ProviderCompiler::compile_preferring_laziness
//! [`compile_preferring_no_suspension`]: ProviderCompiler::compile_preferring_no_suspension

use tracing::trace;
use weft_ir::{ExprArena, ExprId, ExprKind, Name, VarKind};

use crate::detach::{Detacher, DetacherFactory};
use crate::emit::{self, CodeExpr, Label, StaticType, TempId};
use crate::plain::{PlainCompiler, PlainValueUnit};
use crate::vars::VarResolver;

/// How a compiled fragment came to be provider-shaped.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum Repr {
    /// The expression's natural representation already was a provider; no
    /// conversion was emitted.
    NativeProvider,
    /// A plain value was boxed into provider form.
    ConvertedProvider,
}

/// A successfully compiled provider-producing fragment.
///
/// Produced fresh per call; immutable once built. The fragment is always
/// provider-typed.
#[derive(Clone, PartialEq, Debug)]
pub struct CompiledUnit {
    pub repr: Repr,
    pub expr: CodeExpr,
}

impl CompiledUnit {
    fn native(expr: CodeExpr) -> Self {
        CompiledUnit {
            repr: Repr::NativeProvider,
            expr,
        }
    }

    fn converted(expr: CodeExpr) -> Self {
        CompiledUnit {
            repr: Repr::ConvertedProvider,
            expr,
        }
    }

    /// Static result type of the compiled fragment.
    pub fn ty(&self) -> StaticType {
        self.expr.ty()
    }
}

/// The plain compiler bound to a detacher: eager compilation that may emit
/// suspend points reattaching at the detacher's label.
struct DetachingCompiler<'c> {
    plain: &'c dyn PlainCompiler,
    detacher: Box<dyn Detacher + 'c>,
}

impl DetachingCompiler<'_> {
    fn compile(&self, arena: &ExprArena, node: ExprId) -> PlainValueUnit {
        self.plain.compile_allowing_suspend(arena, node, &*self.detacher)
    }

    /// Compile eagerly (suspension permitted), then box into provider form.
    fn compile_boxed(&self, arena: &ExprArena, node: ExprId) -> CodeExpr {
        self.compile(arena, node).box_as_provider()
    }

    fn force_provider(&self, provider: CodeExpr) -> CodeExpr {
        self.detacher.force_to_value(provider)
    }
}

/// Active compilation mode.
///
/// Exactly one variant is ever in play for a visitor, and each variant
/// carries precisely the collaborators it needs, so an invalid combination
/// (both, or neither) is unrepresentable rather than asserted against.
enum Mode<'c> {
    /// Suspension permitted; boxing avoided.
    AvoidBoxing { detaching: DetachingCompiler<'c> },
    /// Boxing permitted; suspension forbidden.
    AvoidDetaches { plain: &'c dyn PlainCompiler },
}

/// Exhaustive structural dispatch over expression kinds, bound to one mode.
struct CompilerVisitor<'c> {
    vars: &'c dyn VarResolver,
    mode: Mode<'c>,
    next_temp: u32,
}

impl<'c> CompilerVisitor<'c> {
    fn detaching(&self) -> Option<&DetachingCompiler<'c>> {
        match &self.mode {
            Mode::AvoidBoxing { detaching } => Some(detaching),
            Mode::AvoidDetaches { .. } => None,
        }
    }

    fn allows_detaches(&self) -> bool {
        matches!(self.mode, Mode::AvoidBoxing { .. })
    }

    fn allows_boxing(&self) -> bool {
        matches!(self.mode, Mode::AvoidDetaches { .. })
    }

    fn fresh_temp(&mut self) -> TempId {
        let id = TempId::new(self.next_temp);
        self.next_temp += 1;
        id
    }

    fn compile(&mut self, arena: &ExprArena, id: ExprId) -> Option<CompiledUnit> {
        if !id.is_valid() {
            return None;
        }
        match *arena.kind(id) {
            // Unlike other literals this doesn't count as boxing, just a
            // read of a shared constant, so it is emitted in every mode.
            ExprKind::Null => Some(CompiledUnit::native(CodeExpr::NullProvider)),

            ExprKind::Var { name, kind } => match kind {
                VarKind::Param => Some(CompiledUnit::native(self.vars.param(name))),
                VarKind::Local => Some(CompiledUnit::native(self.vars.local(name))),
                VarKind::LoopVar => self.loop_var(name),
            },

            ExprKind::Conditional {
                cond,
                then_branch,
                else_branch,
            } => {
                if self.allows_detaches() {
                    self.conditional(arena, cond, then_branch, else_branch)
                } else {
                    self.fallback(arena, id)
                }
            }

            ExprKind::NullCoalescing { left, right } => self.null_coalescing(arena, id, left, right),

            // No specialized provider path for data access yet; sharing the
            // null-safety logic with the eager compiler is the blocker.
            ExprKind::DataAccess { .. } => self.fallback(arena, id),

            // Plain literals and operators have no natural provider form.
            ExprKind::Bool(_)
            | ExprKind::Int(_)
            | ExprKind::Float(_)
            | ExprKind::Str(_)
            | ExprKind::Binary { .. } => self.fallback(arena, id),
        }
    }

    /// Loop variables bound by integer-range iteration are raw primitives:
    /// producing a provider would be a boxing conversion, so only the
    /// boxing-permitted mode does it. Any other loop variable already is a
    /// provider and is returned as-is.
    fn loop_var(&self, name: Name) -> Option<CompiledUnit> {
        let slot = self.vars.loop_var(name);
        if slot.ty() == StaticType::Int {
            if self.allows_boxing() {
                let boxed = PlainValueUnit::new(slot, StaticType::Int).box_as_provider();
                return Some(CompiledUnit::converted(boxed));
            }
            return None;
        }
        Some(CompiledUnit::native(slot))
    }

    /// Conditional operator, suspension-capable mode only.
    ///
    /// A branch that compiles to a provider may carry deferred side-channel
    /// data, which coercion to a plain value would drop. So if either branch
    /// independently compiles to a provider, the whole operator must produce
    /// one: the other branch is boxed on demand and a render-time branch
    /// selects between the two handles. Selection does not force the chosen
    /// provider.
    fn conditional(
        &mut self,
        arena: &ExprArena,
        cond: ExprId,
        then_branch: ExprId,
        else_branch: ExprId,
    ) -> Option<CompiledUnit> {
        let then_unit = self.compile(arena, then_branch);
        let else_unit = self.compile(arena, else_branch);
        if then_unit.is_none() && else_unit.is_none() {
            // Neither side is naturally a provider; the eager path upstream
            // handles the whole expression better.
            return None;
        }
        let detaching = self.detaching()?;
        let condition = detaching.compile(arena, cond).coerce_to_bool();
        let then_expr =
            then_unit.map_or_else(|| detaching.compile_boxed(arena, then_branch), |u| u.expr);
        let else_expr =
            else_unit.map_or_else(|| detaching.compile_boxed(arena, else_branch), |u| u.expr);
        Some(CompiledUnit::native(emit::ternary(
            condition, then_expr, else_expr,
        )))
    }

    /// Null-coalescing operator.
    ///
    /// Any non-trivial `?:` needs a suspend point for the left-hand nullity
    /// check, so the provider form is only attempted in the
    /// suspension-capable mode; otherwise this falls through to the generic
    /// fallback.
    fn null_coalescing(
        &mut self,
        arena: &ExprArena,
        id: ExprId,
        left: ExprId,
        right: ExprId,
    ) -> Option<CompiledUnit> {
        if self.allows_detaches() {
            let left_unit = self.compile(arena, left);
            let right_unit = self.compile(arena, right);
            // If either side compiles to a provider it may carry deferred
            // side-channel data, so the whole expression must stay in
            // provider form.
            if left_unit.is_some() || right_unit.is_some() {
                let twin = left_unit.as_ref().map(|_| self.fresh_temp());
                let detaching = self.detaching()?;
                let right_expr =
                    right_unit.map_or_else(|| detaching.compile_boxed(arena, right), |u| u.expr);
                let left_expr = match (left_unit, twin) {
                    (Some(unit), Some(temp)) => {
                        // Fork/force-twin: bind the provider once, force one
                        // read of the binding for the nullity check, discard
                        // the forced value, and yield the never-forced twin
                        // read as the expression's contribution. The forced
                        // value would not carry the provider's side-channel
                        // data; the twin does.
                        let forced = detaching.force_provider(CodeExpr::ReadTemp(temp));
                        CodeExpr::BindProvider {
                            temp,
                            init: Box::new(unit.expr),
                            body: Box::new(CodeExpr::DiscardThen {
                                discard: Box::new(forced),
                                then: Box::new(CodeExpr::ReadTemp(temp)),
                            }),
                        }
                    }
                    // No pre-existing provider identity to preserve: compile
                    // eagerly and box directly.
                    _ => detaching.compile_boxed(arena, left),
                };
                let left_expr = emit::provider_or_null(left_expr);
                return Some(CompiledUnit::native(emit::select_first_non_null(
                    left_expr, right_expr,
                )));
            }
        }
        self.fallback(arena, id)
    }

    /// Generic fallback: compile to a plain value with no suspend points at
    /// all, then box. Only available in the boxing-permitted mode.
    fn fallback(&self, arena: &ExprArena, id: ExprId) -> Option<CompiledUnit> {
        if let Mode::AvoidDetaches { plain } = &self.mode {
            if let Some(unit) = plain.compile_no_suspend(arena, id) {
                return Some(CompiledUnit::converted(unit.box_as_provider()));
            }
        }
        None
    }
}

/// The expression-to-provider compiler.
///
/// Holds the collaborators shared by both entry points; each call builds a
/// fresh single-mode visitor, so independent compilations can run
/// concurrently over the same read-only tree.
pub struct ProviderCompiler<'c> {
    vars: &'c dyn VarResolver,
    plain: &'c dyn PlainCompiler,
    detachers: &'c dyn DetacherFactory,
}

impl<'c> ProviderCompiler<'c> {
    pub fn new(
        vars: &'c dyn VarResolver,
        plain: &'c dyn PlainCompiler,
        detachers: &'c dyn DetacherFactory,
    ) -> Self {
        ProviderCompiler {
            vars,
            plain,
            detachers,
        }
    }

    /// Compile `node` to a provider without introducing unnecessary boxing;
    /// suspend points reattaching at `reattach` are permitted anywhere in
    /// the result.
    ///
    /// Intended for print operations, which can render the provider
    /// incrementally.
    pub fn compile_preferring_laziness(
        &self,
        arena: &ExprArena,
        node: ExprId,
        reattach: Label,
    ) -> Option<CompiledUnit> {
        trace!(?node, ?reattach, "provider compile, suspension permitted");
        let detaching = DetachingCompiler {
            plain: self.plain,
            detacher: self.detachers.detacher(reattach),
        };
        CompilerVisitor {
            vars: self.vars,
            mode: Mode::AvoidBoxing { detaching },
            next_temp: 0,
        }
        .compile(arena, node)
    }

    /// Compile `node` to a provider with no suspend points; boxing
    /// conversions are permitted.
    ///
    /// Intended for binding parameters and `let` values, where the provider
    /// is handed to a component that does not implement resumption. The
    /// restricted rule set guarantees the absence of suspend points by
    /// construction, not by a runtime check.
    pub fn compile_preferring_no_suspension(
        &self,
        arena: &ExprArena,
        node: ExprId,
    ) -> Option<CompiledUnit> {
        trace!(?node, "provider compile, suspension forbidden");
        CompilerVisitor {
            vars: self.vars,
            mode: Mode::AvoidDetaches { plain: self.plain },
            next_temp: 0,
        }
        .compile(arena, node)
    }
}
