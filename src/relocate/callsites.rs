//! Call-Site Updater: keeps every caller of a moved method compiling.
//!
//! Two strategies. `DelegatingStub` leaves a same-signature stub at the old
//! location that forwards to the new one, so no caller changes at all.
//! `PropagateCallSites` removes the member outright and rewrites every call
//! site in the workspace to the relocated shape; sites the shape cannot
//! express (conditional-access segments, method groups, nameof operands) are
//! reported as `UnsupportedReferenceShape` and abort the batch.
//!
//! The propagate pass finds call sites by resolved node id against the
//! pre-move model. Relocated bodies keep their original ids for every node
//! the rewriter preserved, so explicit-receiver calls between batch members
//! are patched here like any other caller.

use std::collections::HashMap;

use tracing::debug;

use crate::core::errors::{FlyttaError, Result};
use crate::relocate::request::AnchorSpec;
use crate::relocate::rewriter::MovedTarget;
use crate::semantic::model::SemanticModel;
use crate::semantic::symbols::{SymbolId, SymbolResolver};
use crate::syntax::expr::{Arg, Expr, InitEntry, Stmt};
use crate::syntax::tree::{Member, MethodDecl};
use crate::workspace::snapshot::Workspace;

/// Enclosing scope and member of the site being patched, for diagnostics.
struct SiteCx<'a> {
    scope: &'a str,
    member: &'a str,
}

/// Rewrites callers of the batch's moved members.
pub struct CallSiteUpdater<'a> {
    model: &'a SemanticModel,
    moved: &'a HashMap<SymbolId, MovedTarget>,
}

impl<'a> CallSiteUpdater<'a> {
    /// Create an updater over the pre-move model and the batch's final
    /// member placements.
    pub fn new(model: &'a SemanticModel, moved: &'a HashMap<SymbolId, MovedTarget>) -> Self {
        Self { model, moved }
    }

    /// Build the delegating stub that replaces `original` in the source
    /// scope. The stub keeps the original signature and forwards:
    ///
    /// - static move: `return T.M(args);`
    /// - parameter anchor: `return T.M(this, args);`
    /// - field anchor `f`: `return new T { f = this }.M(args);`
    pub fn make_stub(&self, original: &MethodDecl, target: &MovedTarget) -> MethodDecl {
        let forwarded: Vec<Arg> = original
            .params
            .iter()
            .map(|p| Arg::positional(Expr::ident(p.name.clone())))
            .collect();

        let call = relocated_call(target, Expr::this(), forwarded);

        let body = if original.returns_void() {
            vec![Stmt::Expr(call)]
        } else {
            vec![Stmt::Return(Some(call))]
        };

        let mut stub = original.clone();
        stub.body = body;
        stub
    }

    /// Rewrite every call site of every moved member across the workspace.
    /// Returns the number of sites rewritten. Units without a site are left
    /// untouched (and unmarked).
    pub fn propagate(&self, workspace: &mut Workspace) -> Result<usize> {
        let paths: Vec<_> = workspace.units().map(|u| u.path.clone()).collect();
        let mut total = 0;

        for path in paths {
            let Some(unit) = workspace.unit(&path) else {
                continue;
            };
            let mut patched = unit.clone();
            let mut changed = 0;
            for ty in &mut patched.types {
                let scope = ty.name.clone();
                for member in &mut ty.members {
                    if let Member::Method(method) = member {
                        let cx = SiteCx {
                            scope: &scope,
                            member: &method.name,
                        };
                        changed += self.patch_stmts(&mut method.body, &cx)?;
                    }
                }
            }
            if changed > 0 {
                debug!(path = %path.display(), sites = changed, "call sites propagated");
                if let Some(unit) = workspace.unit_mut(&path) {
                    *unit = patched;
                }
                total += changed;
            }
        }
        Ok(total)
    }

    fn patch_stmts(&self, stmts: &mut [Stmt], cx: &SiteCx<'_>) -> Result<usize> {
        let mut changed = 0;
        for stmt in stmts {
            changed += match stmt {
                Stmt::Expr(expr) => self.patch_expr(expr, cx)?,
                Stmt::Return(None) => 0,
                Stmt::Return(Some(expr)) => self.patch_expr(expr, cx)?,
                Stmt::Local { value, .. } => self.patch_expr(value, cx)?,
                Stmt::If {
                    cond,
                    then_branch,
                    else_branch,
                } => {
                    self.patch_expr(cond, cx)?
                        + self.patch_stmts(then_branch, cx)?
                        + self.patch_stmts(else_branch, cx)?
                }
                Stmt::Switch { scrutinee, arms } => {
                    let mut n = self.patch_expr(scrutinee, cx)?;
                    for arm in arms {
                        n += self.patch_stmts(&mut arm.body, cx)?;
                    }
                    n
                }
            };
        }
        Ok(changed)
    }

    fn patch_expr(&self, expr: &mut Expr, cx: &SiteCx<'_>) -> Result<usize> {
        match expr {
            Expr::Literal { .. } | Expr::This { .. } | Expr::Base { .. } => Ok(0),

            // A bare identifier denoting a moved member here is a method
            // group (calls are intercepted at the Invoke node above it).
            Expr::Ident { id, .. } => {
                if self.moved_symbol(*id).is_some() {
                    return Err(self.unsupported(
                        cx,
                        *id,
                        "method-group reference to a moved member cannot be propagated",
                    ));
                }
                Ok(0)
            }

            Expr::Member { id, target, .. } => {
                if self.moved_symbol(*id).is_some() {
                    return Err(self.unsupported(
                        cx,
                        *id,
                        "method-group reference to a moved member cannot be propagated",
                    ));
                }
                self.patch_expr(target, cx)
            }

            // `x?.M(...)` has no propagated shape: the rewrite would change
            // null-flow. Reported, never guessed.
            Expr::ConditionalChain { root, segments, .. } => {
                let mut n = self.patch_expr(root, cx)?;
                for segment in segments {
                    if self.moved_symbol(segment.id).is_some() {
                        return Err(self.unsupported(
                            cx,
                            segment.id,
                            "conditional-access call to a moved member cannot be propagated",
                        ));
                    }
                    if let Some(args) = &mut segment.args {
                        for arg in args {
                            n += self.patch_expr(&mut arg.value, cx)?;
                        }
                    }
                }
                Ok(n)
            }

            Expr::Invoke { callee, args, .. } => {
                let mut n = 0;
                for arg in args.iter_mut() {
                    n += self.patch_expr(&mut arg.value, cx)?;
                }

                let moved = match callee.as_ref() {
                    Expr::Ident { id, .. } | Expr::Member { id, .. } => self.moved_symbol(*id),
                    _ => None,
                };
                if let Some(target) = moved {
                    let target = target.clone();
                    let receiver = match callee.as_mut() {
                        // Implicit receiver inside the declaring scope.
                        Expr::Ident { .. } => Expr::this(),
                        Expr::Member { target: recv, .. } => match recv.as_ref() {
                            Expr::This { .. } | Expr::Base { .. } => Expr::this(),
                            _ => {
                                n += self.patch_expr(recv, cx)?;
                                recv.as_ref().clone()
                            }
                        },
                        _ => Expr::this(),
                    };
                    let args = std::mem::take(args);
                    *expr = relocated_call(&target, receiver, args);
                    return Ok(n + 1);
                }

                Ok(n + self.patch_expr(callee, cx)?)
            }

            Expr::New { args, init, .. } => {
                let mut n = 0;
                for arg in args {
                    n += self.patch_expr(&mut arg.value, cx)?;
                }
                for entry in init {
                    n += self.patch_expr(&mut entry.value, cx)?;
                }
                Ok(n)
            }

            Expr::Lambda { body, .. } => self.patch_expr(body, cx),

            Expr::Binary { lhs, rhs, .. } => {
                Ok(self.patch_expr(lhs, cx)? + self.patch_expr(rhs, cx)?)
            }

            Expr::Assign { target, value, .. } => {
                Ok(self.patch_expr(target, cx)? + self.patch_expr(value, cx)?)
            }

            // With the member gone, the name it denotes is gone too.
            Expr::NameOf { operand, .. } => {
                let id = match operand.as_ref() {
                    Expr::Ident { id, .. } | Expr::Member { id, .. } => Some(*id),
                    _ => None,
                };
                if let Some(id) = id {
                    if self.moved_symbol(id).is_some() {
                        return Err(self.unsupported(
                            cx,
                            id,
                            "nameof operand denotes a moved member",
                        ));
                    }
                }
                Ok(0)
            }
        }
    }

    fn moved_symbol(&self, node: crate::syntax::tree::NodeId) -> Option<&MovedTarget> {
        let resolution = self.model.resolve(node)?;
        if !resolution.is_expression() {
            return None;
        }
        self.moved.get(&resolution.symbol)
    }

    fn unsupported(
        &self,
        cx: &SiteCx<'_>,
        node: crate::syntax::tree::NodeId,
        message: &str,
    ) -> FlyttaError {
        FlyttaError::unsupported_shape(cx.scope, cx.member, node, message)
    }
}

/// The relocated shape of a call whose receiver expression is `receiver`:
///
/// - static move: `T.M(args)` (receiver discarded, it carried no state)
/// - parameter anchor: `T.M(receiver, args)`
/// - field anchor `f`: `new T { f = receiver }.M(args)`
pub fn relocated_call(target: &MovedTarget, receiver: Expr, args: Vec<Arg>) -> Expr {
    let target_ty = Expr::ident(target.target_scope.clone());
    match &target.anchor {
        AnchorSpec::None => Expr::invoke(Expr::member(target_ty, target.member.clone()), args),
        AnchorSpec::Parameter { .. } => {
            let mut full = vec![Arg::positional(receiver)];
            full.extend(args);
            Expr::invoke(Expr::member(target_ty, target.member.clone()), full)
        }
        AnchorSpec::Field { name } => {
            let instance = Expr::new_object(
                target.target_scope.clone(),
                vec![],
                vec![InitEntry::new(name.clone(), receiver)],
            );
            Expr::invoke(Expr::member(instance, target.member.clone()), args)
        }
    }
}
