//! Shared test fixtures.
//!
//! The real renderer that consumes emitted fragments lives in the render
//! runtime, outside this crate. Render-time properties (twin identity,
//! selection laziness, force ordering) still need checking here, so this
//! module carries a small fragment evaluator plus stub collaborators. Only
//! compiled in test builds.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use rustc_hash::FxHashMap;
use thiserror::Error;
use weft_data::{null_provider, BoxedValue, CachingProvider, ProviderRef, Step, Value};
use weft_ir::{BinaryOp, Expr, ExprArena, ExprId, ExprKind, Name, Span, VarKind};

use crate::detach::{Detacher, DetacherFactory};
use crate::emit::{CodeExpr, Label, SlotKind, StaticType, TempId};
use crate::plain::{PlainCompiler, PlainValueUnit};
use crate::vars::VarResolver;

// Fragment evaluation

/// Runtime result of evaluating a fragment.
#[derive(Clone)]
pub(crate) enum Rt {
    Provider(ProviderRef),
    /// Result of `ProviderOrNull` normalization.
    Nullable(Option<ProviderRef>),
    Value(Value),
}

#[derive(Debug, Error, PartialEq)]
pub(crate) enum RenderError {
    #[error("rendering suspended at reattach point {label:?}")]
    Suspended { label: Label },
    #[error("unbound {kind:?} slot {name:?}")]
    Unbound { kind: SlotKind, name: Name },
    #[error("unbound temp {0:?}")]
    UnboundTemp(TempId),
    #[error("type mismatch: expected {expected}")]
    Type { expected: &'static str },
    #[error("unsupported by the test evaluator: {0}")]
    Unsupported(&'static str),
}

/// Render-time variable bindings.
#[derive(Default)]
pub(crate) struct Frame {
    pub params: FxHashMap<Name, ProviderRef>,
    pub locals: FxHashMap<Name, ProviderRef>,
    pub loop_vars: FxHashMap<Name, Rt>,
    temps: FxHashMap<TempId, ProviderRef>,
}

pub(crate) fn as_provider(rt: Rt) -> Result<ProviderRef, RenderError> {
    match rt {
        Rt::Provider(p) | Rt::Nullable(Some(p)) => Ok(p),
        Rt::Nullable(None) | Rt::Value(_) => Err(RenderError::Type {
            expected: "provider",
        }),
    }
}

pub(crate) fn as_value(rt: Rt) -> Result<Value, RenderError> {
    match rt {
        Rt::Value(v) => Ok(v),
        Rt::Provider(_) | Rt::Nullable(_) => Err(RenderError::Type { expected: "value" }),
    }
}

fn int_op(
    l: Value,
    r: Value,
    f: impl Fn(i64, i64) -> i64,
) -> Result<Value, RenderError> {
    match (l, r) {
        (Value::Int(a), Value::Int(b)) => Ok(Value::Int(f(a, b))),
        _ => Err(RenderError::Type { expected: "int" }),
    }
}

/// Evaluate a fragment against a frame.
pub(crate) fn eval(expr: &CodeExpr, frame: &mut Frame) -> Result<Rt, RenderError> {
    match expr {
        CodeExpr::NullProvider => Ok(Rt::Provider(null_provider())),
        CodeExpr::ConstNull => Ok(Rt::Value(Value::Null)),
        CodeExpr::ConstBool(b) => Ok(Rt::Value(Value::Bool(*b))),
        CodeExpr::ConstInt(i) => Ok(Rt::Value(Value::Int(*i))),
        CodeExpr::ConstFloat(bits) => Ok(Rt::Value(Value::Float(f64::from_bits(*bits)))),
        CodeExpr::ConstStr(_) => Err(RenderError::Unsupported("string constants")),

        CodeExpr::ReadSlot { kind, name, .. } => {
            let missing = || RenderError::Unbound {
                kind: *kind,
                name: *name,
            };
            match kind {
                SlotKind::Param => frame.params.get(name).cloned().map(Rt::Provider).ok_or_else(missing),
                SlotKind::Local => frame.locals.get(name).cloned().map(Rt::Provider).ok_or_else(missing),
                SlotKind::LoopVar => frame.loop_vars.get(name).cloned().ok_or_else(missing),
            }
        }

        CodeExpr::ReadTemp(temp) => frame
            .temps
            .get(temp)
            .cloned()
            .map(Rt::Provider)
            .ok_or(RenderError::UnboundTemp(*temp)),

        CodeExpr::BindProvider { temp, init, body } => {
            let p = as_provider(eval(init, frame)?)?;
            frame.temps.insert(*temp, p);
            eval(body, frame)
        }

        CodeExpr::DiscardThen { discard, then } => {
            // The discarded side runs to completion first; its one-time side
            // effects must land before `then` is read.
            eval(discard, frame)?;
            eval(then, frame)
        }

        CodeExpr::Force { provider, reattach } => {
            let p = as_provider(eval(provider, frame)?)?;
            match p.force() {
                Step::Ready(v) => Ok(Rt::Value(v)),
                Step::Pending => Err(RenderError::Suspended { label: *reattach }),
            }
        }

        CodeExpr::BoxValue { value } => {
            let v = as_value(eval(value, frame)?)?;
            Ok(Rt::Provider(BoxedValue::boxed(v)))
        }

        CodeExpr::ProviderOrNull(inner) => {
            let p = as_provider(eval(inner, frame)?)?;
            match p.force() {
                Step::Ready(v) if v.is_null() => Ok(Rt::Nullable(None)),
                Step::Ready(_) => Ok(Rt::Nullable(Some(p))),
                Step::Pending => Err(RenderError::Unsupported(
                    "provider_or_null on an unresolved provider",
                )),
            }
        }

        CodeExpr::Ternary {
            cond,
            then_branch,
            else_branch,
        } => {
            let c = as_value(eval(cond, frame)?)?;
            if c.is_truthy() {
                eval(then_branch, frame)
            } else {
                eval(else_branch, frame)
            }
        }

        CodeExpr::FirstNonNull { left, right } => match eval(left, frame)? {
            Rt::Provider(p) | Rt::Nullable(Some(p)) => Ok(Rt::Provider(p)),
            Rt::Nullable(None) => Ok(Rt::Provider(as_provider(eval(right, frame)?)?)),
            Rt::Value(_) => Err(RenderError::Type {
                expected: "provider",
            }),
        },

        CodeExpr::CoerceToBool(inner) => {
            let v = as_value(eval(inner, frame)?)?;
            Ok(Rt::Value(Value::Bool(v.is_truthy())))
        }

        CodeExpr::Binary { op, lhs, rhs } => {
            let l = as_value(eval(lhs, frame)?)?;
            let r = as_value(eval(rhs, frame)?)?;
            let v = match op {
                BinaryOp::Add => int_op(l, r, i64::wrapping_add)?,
                BinaryOp::Sub => int_op(l, r, i64::wrapping_sub)?,
                BinaryOp::Mul => int_op(l, r, i64::wrapping_mul)?,
                BinaryOp::Eq => Value::Bool(l == r),
                BinaryOp::NotEq => Value::Bool(l != r),
            };
            Ok(Rt::Value(v))
        }
    }
}

/// Evaluate, panicking on render failure.
pub(crate) fn eval_ok(expr: &CodeExpr, frame: &mut Frame) -> Rt {
    match eval(expr, frame) {
        Ok(rt) => rt,
        Err(e) => panic!("render failed: {e}"),
    }
}

/// Evaluate to a provider handle, panicking on anything else.
pub(crate) fn eval_provider(expr: &CodeExpr, frame: &mut Frame) -> ProviderRef {
    match as_provider(eval_ok(expr, frame)) {
        Ok(p) => p,
        Err(e) => panic!("render failed: {e}"),
    }
}

// Stub collaborators

/// Map-free resolver: emits slot reads keyed by name, with loop-variable
/// types declared up front.
#[derive(Default)]
pub(crate) struct TestResolver {
    pub loop_var_tys: FxHashMap<Name, StaticType>,
}

impl VarResolver for TestResolver {
    fn param(&self, name: Name) -> CodeExpr {
        CodeExpr::ReadSlot {
            kind: SlotKind::Param,
            name,
            ty: StaticType::Provider,
        }
    }

    fn local(&self, name: Name) -> CodeExpr {
        CodeExpr::ReadSlot {
            kind: SlotKind::Local,
            name,
            ty: StaticType::Provider,
        }
    }

    fn loop_var(&self, name: Name) -> CodeExpr {
        let ty = self
            .loop_var_tys
            .get(&name)
            .copied()
            .unwrap_or(StaticType::Provider);
        CodeExpr::ReadSlot {
            kind: SlotKind::LoopVar,
            name,
            ty,
        }
    }
}

/// Literal-only eager compiler: literals and operators over literals
/// compile without suspension; variable reads need the detacher.
#[derive(Default)]
pub(crate) struct EagerCompiler;

impl PlainCompiler for EagerCompiler {
    fn compile_no_suspend(&self, arena: &ExprArena, node: ExprId) -> Option<PlainValueUnit> {
        match *arena.kind(node) {
            ExprKind::Null => Some(PlainValueUnit::new(CodeExpr::ConstNull, StaticType::Null)),
            ExprKind::Bool(b) => Some(PlainValueUnit::new(CodeExpr::ConstBool(b), StaticType::Bool)),
            ExprKind::Int(i) => Some(PlainValueUnit::new(CodeExpr::ConstInt(i), StaticType::Int)),
            ExprKind::Float(bits) => Some(PlainValueUnit::new(
                CodeExpr::ConstFloat(bits),
                StaticType::Float,
            )),
            ExprKind::Str(s) => Some(PlainValueUnit::new(CodeExpr::ConstStr(s), StaticType::Str)),
            ExprKind::Binary { op, lhs, rhs } => {
                let l = self.compile_no_suspend(arena, lhs)?;
                let r = self.compile_no_suspend(arena, rhs)?;
                let ty = match op {
                    BinaryOp::Eq | BinaryOp::NotEq => StaticType::Bool,
                    BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul => l.ty,
                };
                Some(PlainValueUnit::new(
                    CodeExpr::Binary {
                        op,
                        lhs: Box::new(l.expr),
                        rhs: Box::new(r.expr),
                    },
                    ty,
                ))
            }
            ExprKind::Conditional {
                cond,
                then_branch,
                else_branch,
            } => {
                let c = self.compile_no_suspend(arena, cond)?;
                let t = self.compile_no_suspend(arena, then_branch)?;
                let e = self.compile_no_suspend(arena, else_branch)?;
                let ty = t.ty;
                Some(PlainValueUnit::new(
                    CodeExpr::Ternary {
                        cond: Box::new(c.coerce_to_bool()),
                        then_branch: Box::new(t.expr),
                        else_branch: Box::new(e.expr),
                    },
                    ty,
                ))
            }
            ExprKind::Var { .. }
            | ExprKind::DataAccess { .. }
            | ExprKind::NullCoalescing { .. } => None,
        }
    }

    fn compile_allowing_suspend(
        &self,
        arena: &ExprArena,
        node: ExprId,
        detacher: &dyn Detacher,
    ) -> PlainValueUnit {
        if let Some(unit) = self.compile_no_suspend(arena, node) {
            return unit;
        }
        match *arena.kind(node) {
            ExprKind::Var { name, kind } => {
                let slot_kind = match kind {
                    VarKind::Param => SlotKind::Param,
                    VarKind::Local => SlotKind::Local,
                    VarKind::LoopVar => SlotKind::LoopVar,
                };
                let slot = CodeExpr::ReadSlot {
                    kind: slot_kind,
                    name,
                    ty: StaticType::Provider,
                };
                PlainValueUnit::new(detacher.force_to_value(slot), StaticType::Value)
            }
            ref kind => panic!("eager stub cannot compile {kind:?}"),
        }
    }
}

/// Detacher factory that emits real `Force` fragments and counts usage.
#[derive(Default)]
pub(crate) struct TestDetacherFactory {
    /// Number of detachers handed out.
    pub requests: AtomicU32,
    /// Number of force requests served across all detachers.
    pub forces: Arc<AtomicU32>,
}

struct LabelDetacher {
    reattach: Label,
    forces: Arc<AtomicU32>,
}

impl Detacher for LabelDetacher {
    fn force_to_value(&self, provider: CodeExpr) -> CodeExpr {
        self.forces.fetch_add(1, Ordering::SeqCst);
        CodeExpr::Force {
            provider: Box::new(provider),
            reattach: self.reattach,
        }
    }
}

impl DetacherFactory for TestDetacherFactory {
    fn detacher(&self, reattach: Label) -> Box<dyn Detacher + '_> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        Box::new(LabelDetacher {
            reattach,
            forces: Arc::clone(&self.forces),
        })
    }
}

/// Detacher factory that fails the test if consulted at all.
pub(crate) struct PanickingDetacherFactory;

impl DetacherFactory for PanickingDetacherFactory {
    fn detacher(&self, _reattach: Label) -> Box<dyn Detacher + '_> {
        panic!("no-suspension compilation must not request a detacher");
    }
}

// Fixtures

/// Memoizing provider that counts how many times its value was actually
/// computed (not how many times it was forced; the cache absorbs repeats).
pub(crate) fn counting_provider(value: Value) -> (ProviderRef, Arc<AtomicU32>) {
    let count = Arc::new(AtomicU32::new(0));
    let c = Arc::clone(&count);
    let provider: ProviderRef = Arc::new(CachingProvider::new(move || {
        c.fetch_add(1, Ordering::SeqCst);
        Step::Ready(value.clone())
    }));
    (provider, count)
}

/// Arena builder with dummy spans.
#[derive(Default)]
pub(crate) struct AstBuilder {
    pub arena: ExprArena,
}

impl AstBuilder {
    pub(crate) fn expr(&mut self, kind: ExprKind) -> ExprId {
        self.arena.alloc_expr(Expr::new(kind, Span::DUMMY))
    }

    pub(crate) fn null(&mut self) -> ExprId {
        self.expr(ExprKind::Null)
    }

    pub(crate) fn int(&mut self, v: i64) -> ExprId {
        self.expr(ExprKind::Int(v))
    }

    pub(crate) fn var(&mut self, name: Name, kind: VarKind) -> ExprId {
        self.expr(ExprKind::Var { name, kind })
    }

    pub(crate) fn conditional(
        &mut self,
        cond: ExprId,
        then_branch: ExprId,
        else_branch: ExprId,
    ) -> ExprId {
        self.expr(ExprKind::Conditional {
            cond,
            then_branch,
            else_branch,
        })
    }

    pub(crate) fn coalesce(&mut self, left: ExprId, right: ExprId) -> ExprId {
        self.expr(ExprKind::NullCoalescing { left, right })
    }
}
