//! Reference Rewriter: transforms a moved method's body so every reference to
//! state that belonged to the source scope resolves in the new scope.
//!
//! Dispatch is by resolved node kind over the closed expression set, never by
//! token text. Labels (argument names, initializer entries, pattern entries)
//! are not expression nodes and cannot be rewritten by construction; the
//! resolver's role tag is still consulted before any identifier substitution.
//! A resolved reference standing in a position with no rewrite rule is a
//! reported `UnsupportedReferenceShape`, never a guess.
//!
//! Node ids are preserved wherever the node survives structurally, so the
//! call-site pass that runs after materialization can still find pre-move
//! resolutions by id. Nodes the rewriter synthesizes carry unassigned ids and
//! are numbered at batch commit.

use std::cell::Cell;
use std::collections::HashMap;

use tracing::debug;

use crate::core::errors::{FlyttaError, Result};
use crate::relocate::request::AnchorSpec;
use crate::semantic::model::SemanticModel;
use crate::semantic::symbols::{Symbol, SymbolId, SymbolKind, SymbolResolver};
use crate::syntax::expr::{Arg, Expr, Stmt, SwitchArm};
use crate::syntax::tree::{MethodDecl, NodeId, Param};

/// Where a batch member ends up: its final scope and the anchor that gets it
/// there. Computed for the whole batch before any member moves, so cyclic
/// co-moves qualify by final name instead of move order.
#[derive(Debug, Clone)]
pub struct MovedTarget {
    /// Final declaring scope
    pub target_scope: String,
    /// Member name (unchanged by relocation)
    pub member: String,
    /// Anchor of the moved member
    pub anchor: AnchorSpec,
}

impl MovedTarget {
    /// True when the member is static after the move (static source member,
    /// or instance member converted by a parameter anchor).
    pub fn is_static_after(&self) -> bool {
        !matches!(self.anchor, AnchorSpec::Field { .. })
    }
}

/// Everything a single method rewrite needs from its batch.
#[derive(Debug)]
pub struct RewriteContext<'a> {
    /// Resolution service over the pre-move snapshot
    pub model: &'a SemanticModel,
    /// Scope the method is moving out of
    pub source_scope: &'a str,
    /// Anchor of the method being rewritten
    pub anchor: &'a AnchorSpec,
    /// Final targets of every batch member, keyed by symbol
    pub moved: &'a HashMap<SymbolId, MovedTarget>,
    /// False under the propagate strategy: no stubs will exist, so rewrites
    /// that would lean on one must take the propagated shape instead
    pub leave_stubs: bool,
}

/// What a rewrite introduced, threaded to the call-site updater.
#[derive(Debug, Clone, PartialEq)]
pub struct RewriteManifest {
    /// Leading parameter added by a parameter anchor
    pub introduced_param: Option<Param>,
    /// Field anchor the rewritten body routes through
    pub anchor_field: Option<String>,
    /// Number of references substituted
    pub rewritten: usize,
}

/// Outcome of rewriting one method for relocation.
#[derive(Debug)]
pub struct RewriteOutcome {
    /// The transformed declaration, ready for the target scope
    pub method: MethodDecl,
    /// Introduced parameters/anchors
    pub manifest: RewriteManifest,
}

/// Rewrites one moved method body.
pub struct Rewriter<'a> {
    ctx: RewriteContext<'a>,
    member: &'a str,
    rewritten: Cell<usize>,
}

impl<'a> Rewriter<'a> {
    /// Create a rewriter for the method named `member`.
    pub fn new(ctx: RewriteContext<'a>, member: &'a str) -> Self {
        Self {
            ctx,
            member,
            rewritten: Cell::new(0),
        }
    }

    /// Rewrite `method` for its new scope, transforming the signature per the
    /// anchor and re-qualifying every source-scope reference in the body.
    pub fn rewrite_method(&self, method: &MethodDecl) -> Result<RewriteOutcome> {
        let mut out = method.clone();

        let mut introduced_param = None;
        match self.ctx.anchor {
            AnchorSpec::None => {}
            AnchorSpec::Parameter { name } => {
                let param = Param::new(name.clone(), self.ctx.source_scope);
                out.params.insert(0, param.clone());
                out.is_static = true;
                introduced_param = Some(param);
            }
            AnchorSpec::Field { .. } => {}
        }

        out.body = method
            .body
            .iter()
            .map(|stmt| self.rewrite_stmt(stmt))
            .collect::<Result<Vec<_>>>()?;

        let manifest = RewriteManifest {
            introduced_param,
            anchor_field: match self.ctx.anchor {
                AnchorSpec::Field { name } => Some(name.clone()),
                _ => None,
            },
            rewritten: self.rewritten.get(),
        };
        debug!(
            member = self.member,
            rewritten = manifest.rewritten,
            "method body rewritten"
        );
        Ok(RewriteOutcome {
            method: out,
            manifest,
        })
    }

    fn rewrite_stmt(&self, stmt: &Stmt) -> Result<Stmt> {
        Ok(match stmt {
            Stmt::Expr(expr) => Stmt::Expr(self.rewrite_expr(expr)?),
            Stmt::Return(None) => Stmt::Return(None),
            Stmt::Return(Some(expr)) => Stmt::Return(Some(self.rewrite_expr(expr)?)),
            Stmt::Local { name, ty, value } => Stmt::Local {
                name: name.clone(),
                ty: ty.clone(),
                value: self.rewrite_expr(value)?,
            },
            Stmt::If {
                cond,
                then_branch,
                else_branch,
            } => Stmt::If {
                cond: self.rewrite_expr(cond)?,
                then_branch: self.rewrite_stmts(then_branch)?,
                else_branch: self.rewrite_stmts(else_branch)?,
            },
            // Patterns are grammatical structure: their labels name members of
            // the matched type, not references into the source scope. Only
            // the scrutinee and arm bodies are rewritten.
            Stmt::Switch { scrutinee, arms } => Stmt::Switch {
                scrutinee: self.rewrite_expr(scrutinee)?,
                arms: arms
                    .iter()
                    .map(|arm| {
                        Ok(SwitchArm::new(
                            arm.pattern.clone(),
                            self.rewrite_stmts(&arm.body)?,
                        ))
                    })
                    .collect::<Result<Vec<_>>>()?,
            },
        })
    }

    fn rewrite_stmts(&self, stmts: &[Stmt]) -> Result<Vec<Stmt>> {
        stmts.iter().map(|s| self.rewrite_stmt(s)).collect()
    }

    /// Exhaustive dispatch over the closed expression set.
    fn rewrite_expr(&self, expr: &Expr) -> Result<Expr> {
        match expr {
            Expr::Literal { .. } => Ok(expr.clone()),

            Expr::Ident { id, name } => self.rewrite_ident(*id, name),

            Expr::This { id } | Expr::Base { id } => self.anchor_expr(*id),

            Expr::Member { id, target, name } => self.rewrite_member(*id, target, name),

            // Only the chain root is a free expression. Segment names are
            // continuations of the null check and stay verbatim; their
            // argument values are ordinary expressions and are rewritten.
            Expr::ConditionalChain { id, root, segments } => {
                let root = self.rewrite_expr(root)?;
                let segments = segments
                    .iter()
                    .map(|segment| {
                        let mut segment = segment.clone();
                        if let Some(args) = segment.args.take() {
                            segment.args = Some(self.rewrite_args(&args)?);
                        }
                        Ok(segment)
                    })
                    .collect::<Result<Vec<_>>>()?;
                Ok(Expr::ConditionalChain {
                    id: *id,
                    root: Box::new(root),
                    segments,
                })
            }

            Expr::Invoke { id, callee, args } => self.rewrite_invoke(*id, callee, args),

            // Initializer labels are member names of the constructed type;
            // only entry values are rewritten.
            Expr::New { id, ty, args, init } => {
                let args = self.rewrite_args(args)?;
                let init = init
                    .iter()
                    .map(|entry| {
                        let mut entry = entry.clone();
                        entry.value = self.rewrite_expr(&entry.value)?;
                        Ok(entry)
                    })
                    .collect::<Result<Vec<_>>>()?;
                Ok(Expr::New {
                    id: *id,
                    ty: ty.clone(),
                    args,
                    init,
                })
            }

            // Captured source-scope state follows the same resolution rules;
            // shadowed names were never resolved to members by the model.
            Expr::Lambda { id, params, body } => Ok(Expr::Lambda {
                id: *id,
                params: params.clone(),
                body: Box::new(self.rewrite_expr(body)?),
            }),

            Expr::Binary { id, op, lhs, rhs } => Ok(Expr::Binary {
                id: *id,
                op: *op,
                lhs: Box::new(self.rewrite_expr(lhs)?),
                rhs: Box::new(self.rewrite_expr(rhs)?),
            }),

            Expr::Assign { id, target, value } => Ok(Expr::Assign {
                id: *id,
                target: Box::new(self.rewrite_expr(target)?),
                value: Box::new(self.rewrite_expr(value)?),
            }),

            // The operand resolves like a reference, but substituting it
            // would change the program's observable string values. Refuse
            // loudly when it points into the moving scope.
            Expr::NameOf { id, operand } => {
                if self.nameof_touches_source(operand) {
                    return Err(self.unsupported(
                        *id,
                        "nameof operand references the moving scope; rewriting would change observable strings",
                    ));
                }
                Ok(expr.clone())
            }
        }
    }

    fn rewrite_ident(&self, id: NodeId, name: &str) -> Result<Expr> {
        let Some(resolution) = self.ctx.model.resolve(id) else {
            // Locals, parameters, lambda parameters, unresolved names.
            return Ok(Expr::Ident {
                id,
                name: name.to_string(),
            });
        };
        if !resolution.is_expression() {
            return Ok(Expr::Ident {
                id,
                name: name.to_string(),
            });
        }

        let symbol = self.ctx.model.symbol(resolution.symbol).clone();

        if let Some(target) = self.ctx.moved.get(&symbol.id) {
            return self.moved_value_ref(id, target);
        }

        match symbol.kind {
            SymbolKind::Type => Ok(Expr::Ident {
                id,
                name: name.to_string(),
            }),
            SymbolKind::Method | SymbolKind::Field | SymbolKind::Property => {
                self.qualify_source_member(id, &symbol)
            }
        }
    }

    fn rewrite_member(&self, id: NodeId, target: &Expr, name: &str) -> Result<Expr> {
        // Self-qualified access: `this.x` / `base.x` substitutes the
        // self-token for the anchor, or the declaring type for statics.
        if matches!(target, Expr::This { .. } | Expr::Base { .. }) {
            if let Some(resolution) = self.ctx.model.resolve(id) {
                if resolution.is_expression() {
                    let symbol = self.ctx.model.symbol(resolution.symbol).clone();
                    if let Some(moved) = self.ctx.moved.get(&symbol.id) {
                        return self.moved_value_ref(id, moved);
                    }
                    return self.qualify_source_member(id, &symbol);
                }
            }
            let anchor = self.anchor_expr(target.id())?;
            self.rewritten.set(self.rewritten.get() + 1);
            return Ok(Expr::Member {
                id,
                target: Box::new(anchor),
                name: name.to_string(),
            });
        }

        // Explicit receivers are ordinary call sites: the stub (or the
        // propagate pass, which finds this node by its preserved id) keeps
        // them resolving. Only the receiver expression is rewritten here.
        Ok(Expr::Member {
            id,
            target: Box::new(self.rewrite_expr(target)?),
            name: name.to_string(),
        })
    }

    fn rewrite_invoke(&self, id: NodeId, callee: &Expr, args: &[Arg]) -> Result<Expr> {
        let args = self.rewrite_args(args)?;

        // A call whose callee resolves to a batch member takes the callee's
        // final shape, known before any member physically moves.
        if let Some((moved, receiver)) = self.moved_callee(callee)? {
            return self.moved_call(id, &moved, receiver, args);
        }

        Ok(Expr::Invoke {
            id,
            callee: Box::new(self.rewrite_expr(callee)?),
            args,
        })
    }

    /// When `callee` resolves to a batch member: its target, plus the
    /// explicit receiver if the call had one (self-receivers become `None`).
    fn moved_callee(&self, callee: &Expr) -> Result<Option<(MovedTarget, Option<Expr>)>> {
        let resolution = match callee {
            Expr::Ident { id, .. } | Expr::Member { id, .. } => self.ctx.model.resolve(*id),
            _ => None,
        };
        let Some(resolution) = resolution.filter(|r| r.is_expression()) else {
            return Ok(None);
        };
        let Some(moved) = self.ctx.moved.get(&resolution.symbol) else {
            return Ok(None);
        };

        let receiver = match callee {
            Expr::Ident { .. } => None,
            Expr::Member { target, .. } => match target.as_ref() {
                Expr::This { .. } | Expr::Base { .. } => None,
                other => Some(self.rewrite_expr(other)?),
            },
            _ => None,
        };
        Ok(Some((moved.clone(), receiver)))
    }

    /// Call to a batch member, with the receiver already rewritten (`None`
    /// for implicit/self receivers, which the anchor supplies).
    fn moved_call(
        &self,
        id: NodeId,
        moved: &MovedTarget,
        receiver: Option<Expr>,
        args: Vec<Arg>,
    ) -> Result<Expr> {
        self.rewritten.set(self.rewritten.get() + 1);
        let target_name = Expr::ident(moved.target_scope.clone());

        match &moved.anchor {
            AnchorSpec::None => Ok(Expr::Invoke {
                id,
                callee: Box::new(Expr::member(target_name, moved.member.clone())),
                args,
            }),
            AnchorSpec::Parameter { .. } => {
                let instance = match receiver {
                    Some(expr) => expr,
                    None => self.anchor_expr(id)?,
                };
                let mut full_args = vec![Arg::positional(instance)];
                full_args.extend(args);
                Ok(Expr::Invoke {
                    id,
                    callee: Box::new(Expr::member(target_name, moved.member.clone())),
                    args: full_args,
                })
            }
            AnchorSpec::Field { name } => {
                let instance = match receiver {
                    Some(expr) => expr,
                    None => self.anchor_expr(id)?,
                };
                if self.ctx.leave_stubs {
                    // Delegates through the stub still declared on the source
                    // scope: `f.M(args)`.
                    Ok(Expr::Invoke {
                        id,
                        callee: Box::new(Expr::member(instance, moved.member.clone())),
                        args,
                    })
                } else {
                    // No stub will exist: take the propagated shape,
                    // `new T { f = instance }.M(args)`.
                    let receiver = Expr::new_object(
                        moved.target_scope.clone(),
                        vec![],
                        vec![crate::syntax::expr::InitEntry::new(name.clone(), instance)],
                    );
                    Ok(Expr::Invoke {
                        id,
                        callee: Box::new(Expr::member(receiver, moved.member.clone())),
                        args,
                    })
                }
            }
        }
    }

    /// A batch member referenced in value position (method group).
    fn moved_value_ref(&self, id: NodeId, moved: &MovedTarget) -> Result<Expr> {
        self.rewritten.set(self.rewritten.get() + 1);
        match &moved.anchor {
            AnchorSpec::None => Ok(Expr::member(
                Expr::ident(moved.target_scope.clone()),
                moved.member.clone(),
            )),
            AnchorSpec::Parameter { .. } => Err(self.unsupported(
                id,
                "moved member gains a leading parameter; a bare method-group reference cannot supply it",
            )),
            AnchorSpec::Field { .. } => {
                if self.ctx.leave_stubs {
                    Ok(Expr::member(self.anchor_expr(id)?, moved.member.clone()))
                } else {
                    Err(self.unsupported(
                        id,
                        "method-group reference to a moved member has no stub to resolve through",
                    ))
                }
            }
        }
    }

    /// Unmoved source-scope member reached implicitly or through `this`.
    fn qualify_source_member(&self, id: NodeId, symbol: &Symbol) -> Result<Expr> {
        self.rewritten.set(self.rewritten.get() + 1);
        if symbol.is_static {
            // Statics staying behind are qualified with their declaring type.
            let declaring = symbol
                .declaring_scope
                .clone()
                .ok_or_else(|| FlyttaError::internal("member symbol without declaring scope"))?;
            Ok(Expr::member(Expr::ident(declaring), symbol.name.clone()))
        } else {
            Ok(Expr::member(self.anchor_expr(id)?, symbol.name.clone()))
        }
    }

    /// The anchor as an expression; instance state is unreachable without one.
    fn anchor_expr(&self, at: NodeId) -> Result<Expr> {
        match self.ctx.anchor {
            AnchorSpec::Parameter { name } | AnchorSpec::Field { name } => {
                Ok(Expr::ident(name.clone()))
            }
            AnchorSpec::None => Err(self.unsupported(
                at,
                "instance state referenced from a static move; no anchor exists",
            )),
        }
    }

    fn rewrite_args(&self, args: &[Arg]) -> Result<Vec<Arg>> {
        // Argument-name labels are never touched; only values are rewritten.
        args.iter()
            .map(|arg| {
                Ok(Arg {
                    label: arg.label.clone(),
                    value: self.rewrite_expr(&arg.value)?,
                })
            })
            .collect()
    }

    fn nameof_touches_source(&self, operand: &Expr) -> bool {
        let resolution = match operand {
            Expr::Ident { id, .. } | Expr::Member { id, .. } => self.ctx.model.resolve(*id),
            _ => None,
        };
        let Some(resolution) = resolution.filter(|r| r.is_expression()) else {
            return false;
        };
        if self.ctx.moved.contains_key(&resolution.symbol) {
            return true;
        }
        let symbol = self.ctx.model.symbol(resolution.symbol);
        symbol.declaring_scope.as_deref() == Some(self.ctx.source_scope)
    }

    fn unsupported(&self, node: NodeId, message: &str) -> FlyttaError {
        FlyttaError::unsupported_shape(self.ctx.source_scope, self.member, node, message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::expr::{BinaryOp, ChainSegment, InitEntry};
    use crate::syntax::render::Renderer;
    use crate::syntax::tree::{FieldDecl, Member, SourceUnit, TypeDecl};
    use crate::workspace::snapshot::Workspace;

    /// Inventory with a field, statics, and helper methods; Reporting as the
    /// move target.
    fn workspace(body: Vec<Stmt>) -> Workspace {
        let mut ws = Workspace::new();
        ws.add_unit(
            SourceUnit::new("Inventory.cs").with_type(
                TypeDecl::new("Inventory")
                    .with_member(Member::Field(FieldDecl::new("count", "int")))
                    .with_member(Member::Field(FieldDecl::new("ledger", "Ledger")))
                    .with_member(Member::Field(
                        FieldDecl::new("limit", "int").static_(),
                    ))
                    .with_member(Member::Method(MethodDecl::new("Audit", "void")))
                    .with_member(Member::Method(
                        MethodDecl::new("Tally", "int").with_body(body),
                    )),
            ),
        );
        ws.add_unit(SourceUnit::new("Ledger.cs").with_type(
            TypeDecl::new("Ledger").with_member(Member::Field(FieldDecl::new("Title", "string"))),
        ));
        ws.add_unit(SourceUnit::new("Reporting.cs").with_type(TypeDecl::new("Reporting")));
        ws
    }

    fn rewrite_tally(ws: &Workspace, anchor: AnchorSpec) -> Result<RewriteOutcome> {
        let model = SemanticModel::analyze(ws).unwrap();
        let tally = model.member_symbol("Inventory", "Tally").unwrap().id;
        let mut moved = HashMap::new();
        moved.insert(
            tally,
            MovedTarget {
                target_scope: "Reporting".into(),
                member: "Tally".into(),
                anchor: anchor.clone(),
            },
        );
        let ctx = RewriteContext {
            model: &model,
            source_scope: "Inventory",
            anchor: &anchor,
            moved: &moved,
            leave_stubs: true,
        };
        let method = ws
            .unit(std::path::Path::new("Inventory.cs"))
            .unwrap()
            .type_decl("Inventory")
            .unwrap()
            .method("Tally")
            .unwrap()
            .clone();
        Rewriter::new(ctx, "Tally").rewrite_method(&method)
    }

    fn rendered_body(outcome: &RewriteOutcome) -> String {
        let renderer = Renderer::new();
        let mut out = String::new();
        for stmt in &outcome.method.body {
            match stmt {
                Stmt::Return(Some(e)) => out.push_str(&renderer.render_expr(e)),
                Stmt::Expr(e) => out.push_str(&renderer.render_expr(e)),
                other => out.push_str(&format!("{other:?}")),
            }
            out.push('\n');
        }
        out
    }

    #[test]
    fn test_unqualified_field_ref_goes_through_anchor() {
        let ws = workspace(vec![Stmt::Return(Some(Expr::ident("count")))]);
        let outcome = rewrite_tally(&ws, AnchorSpec::Field { name: "inv".into() }).unwrap();
        assert_eq!(rendered_body(&outcome).trim(), "inv.count");
        assert_eq!(outcome.manifest.rewritten, 1);
    }

    #[test]
    fn test_this_qualified_ref_replaces_self_token() {
        let ws = workspace(vec![Stmt::Return(Some(Expr::member(
            Expr::this(),
            "count",
        )))]);
        let outcome = rewrite_tally(&ws, AnchorSpec::Field { name: "inv".into() }).unwrap();
        assert_eq!(rendered_body(&outcome).trim(), "inv.count");
    }

    #[test]
    fn test_static_member_qualified_with_declaring_type() {
        let ws = workspace(vec![Stmt::Return(Some(Expr::binary(
            BinaryOp::Add,
            Expr::ident("count"),
            Expr::ident("limit"),
        )))]);
        let outcome = rewrite_tally(&ws, AnchorSpec::Field { name: "inv".into() }).unwrap();
        assert_eq!(
            rendered_body(&outcome).trim(),
            "(inv.count + Inventory.limit)"
        );
    }

    #[test]
    fn test_parameter_anchor_adds_leading_param_and_makes_static() {
        let ws = workspace(vec![Stmt::Return(Some(Expr::ident("count")))]);
        let outcome = rewrite_tally(
            &ws,
            AnchorSpec::Parameter {
                name: "origin".into(),
            },
        )
        .unwrap();
        assert!(outcome.method.is_static);
        assert_eq!(outcome.method.params[0], Param::new("origin", "Inventory"));
        assert_eq!(
            outcome.manifest.introduced_param,
            Some(Param::new("origin", "Inventory"))
        );
        assert_eq!(rendered_body(&outcome).trim(), "origin.count");
    }

    #[test]
    fn test_chain_root_substituted_segments_untouched() {
        // ledger?.Title with ledger a moved-from field: anchor lands on the
        // chain root only.
        let ws = workspace(vec![Stmt::Return(Some(Expr::chain(
            Expr::ident("ledger"),
            vec![ChainSegment::access("Title")],
        )))]);
        let outcome = rewrite_tally(&ws, AnchorSpec::Field { name: "inv".into() }).unwrap();
        assert_eq!(rendered_body(&outcome).trim(), "inv.ledger?.Title");
    }

    #[test]
    fn test_plain_member_access_same_shape_no_panic() {
        // The same reference spelled without the null check: both shapes are
        // legal at this position and each has its own rule.
        let ws = workspace(vec![Stmt::Return(Some(Expr::member(
            Expr::ident("ledger"),
            "Title",
        )))]);
        let outcome = rewrite_tally(&ws, AnchorSpec::Field { name: "inv".into() }).unwrap();
        assert_eq!(rendered_body(&outcome).trim(), "inv.ledger.Title");
    }

    #[test]
    fn test_initializer_label_untouched_value_rewritten() {
        let ws = workspace(vec![Stmt::Return(Some(Expr::new_object(
            "Inventory",
            vec![],
            vec![InitEntry::new("count", Expr::ident("count"))],
        )))]);
        let outcome = rewrite_tally(&ws, AnchorSpec::Field { name: "inv".into() }).unwrap();
        assert_eq!(
            rendered_body(&outcome).trim(),
            "new Inventory() { count = inv.count }"
        );
    }

    #[test]
    fn test_named_argument_label_untouched_value_rewritten() {
        let ws = workspace(vec![Stmt::Expr(Expr::invoke(
            Expr::member(Expr::ident("ledger"), "Record"),
            vec![Arg::named("amount", Expr::ident("count"))],
        ))]);
        let outcome = rewrite_tally(&ws, AnchorSpec::Field { name: "inv".into() }).unwrap();
        assert_eq!(
            rendered_body(&outcome).trim(),
            "inv.ledger.Record(amount: inv.count)"
        );
    }

    #[test]
    fn test_lambda_capture_follows_same_rules() {
        let ws = workspace(vec![Stmt::Expr(Expr::invoke(
            Expr::ident("Audit"),
            vec![Arg::positional(Expr::lambda(
                vec!["x"],
                Expr::binary(BinaryOp::Add, Expr::ident("x"), Expr::ident("count")),
            ))],
        ))]);
        let outcome = rewrite_tally(&ws, AnchorSpec::Field { name: "inv".into() }).unwrap();
        // Audit stays behind as an instance member: anchor-qualified; the
        // lambda's own parameter is untouched.
        assert_eq!(
            rendered_body(&outcome).trim(),
            "inv.Audit(x => (x + inv.count))"
        );
    }

    #[test]
    fn test_nameof_refuses_loudly() {
        let ws = workspace(vec![Stmt::Return(Some(Expr::name_of(Expr::ident(
            "count",
        ))))]);
        let err = rewrite_tally(&ws, AnchorSpec::Field { name: "inv".into() }).unwrap_err();
        assert!(matches!(
            err,
            FlyttaError::UnsupportedReferenceShape { .. }
        ));
    }

    #[test]
    fn test_nameof_of_unrelated_name_is_kept() {
        let ws = workspace(vec![Stmt::Return(Some(Expr::name_of(Expr::ident(
            "Ledger",
        ))))]);
        let outcome = rewrite_tally(&ws, AnchorSpec::Field { name: "inv".into() });
        // nameof(Ledger) mentions a type, not moving state; kept verbatim.
        assert_eq!(rendered_body(&outcome.unwrap()).trim(), "nameof(Ledger)");
    }
}
