//! The in-memory semantic model: declaration tables, per-node resolution, and
//! the symbol-to-references index.
//!
//! Computed once from a workspace snapshot; all relocation planning and
//! rewriting read this one snapshot, never a partially mutated tree. The
//! model resolves what a declared-type discipline can resolve (locals and
//! parameters carry declared types, members carry declared/return types) and
//! leaves the rest unresolved; full type inference is out of scope.

use std::collections::HashMap;
use std::path::PathBuf;

use indexmap::IndexMap;
use tracing::debug;

use crate::core::errors::{FlyttaError, Result};
use crate::semantic::symbols::{
    RefLocation, Resolution, ReferenceRole, Symbol, SymbolId, SymbolKind, SymbolResolver,
};
use crate::syntax::expr::{Expr, Pattern, Stmt};
use crate::syntax::tree::{Member, NodeId, TypeDecl};
use crate::workspace::snapshot::Workspace;

/// Declaration-ordered facts about one type.
#[derive(Debug, Clone)]
pub struct TypeInfo {
    /// The type's own symbol
    pub symbol: SymbolId,
    /// Unit declaring the type
    pub unit: PathBuf,
    /// Base type, if any
    pub base: Option<String>,
    /// Member name to symbol, in declaration order
    pub members: IndexMap<String, SymbolId>,
}

/// Semantic model over one workspace snapshot.
#[derive(Debug, Default)]
pub struct SemanticModel {
    symbols: Vec<Symbol>,
    types: IndexMap<String, TypeInfo>,
    resolutions: HashMap<NodeId, Resolution>,
    references: HashMap<SymbolId, Vec<RefLocation>>,
}

/// Lexical environment during binding: parameter/local/lambda scopes, each
/// mapping a name to its declared type (when one is known).
#[derive(Debug, Default)]
struct Env {
    scopes: Vec<HashMap<String, Option<String>>>,
}

impl Env {
    fn push(&mut self) {
        self.scopes.push(HashMap::new());
    }

    fn pop(&mut self) {
        self.scopes.pop();
    }

    fn bind(&mut self, name: &str, ty: Option<String>) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.to_string(), ty);
        }
    }

    /// Innermost binding for `name`: `Some(declared_type)` when bound.
    fn lookup(&self, name: &str) -> Option<&Option<String>> {
        self.scopes.iter().rev().find_map(|s| s.get(name))
    }
}

/// Where in the program the binder currently is.
#[derive(Debug, Clone)]
struct BindContext {
    unit: PathBuf,
    scope: String,
    member: String,
}

impl SemanticModel {
    /// Build a model from one workspace snapshot.
    pub fn analyze(workspace: &Workspace) -> Result<Self> {
        let mut model = Self::default();
        model.declare(workspace)?;
        model.bind(workspace);
        debug!(
            symbols = model.symbols.len(),
            types = model.types.len(),
            resolutions = model.resolutions.len(),
            "semantic model built"
        );
        Ok(model)
    }

    /// All types in declaration order.
    pub fn types(&self) -> &IndexMap<String, TypeInfo> {
        &self.types
    }

    /// Facts about one type.
    pub fn type_info(&self, name: &str) -> Option<&TypeInfo> {
        self.types.get(name)
    }

    /// Symbol of a member declared directly or inherited by `scope`.
    pub fn member_symbol(&self, scope: &str, member: &str) -> Option<&Symbol> {
        self.lookup_member(scope, member).map(|id| self.symbol(id))
    }

    /// Every recorded reference to a symbol, in binding order.
    pub fn references(&self, symbol: SymbolId) -> &[RefLocation] {
        self.references.get(&symbol).map_or(&[], Vec::as_slice)
    }

    // ------------------------------------------------------------------
    // pass 1: declarations
    // ------------------------------------------------------------------

    fn declare(&mut self, workspace: &Workspace) -> Result<()> {
        for unit in workspace.units() {
            for ty in &unit.types {
                if self.types.contains_key(&ty.name) {
                    return Err(FlyttaError::validation(format!(
                        "type '{}' declared more than once",
                        ty.name
                    )));
                }
                self.declare_type(ty, unit.path.clone())?;
            }
        }
        Ok(())
    }

    fn declare_type(&mut self, ty: &TypeDecl, unit: PathBuf) -> Result<()> {
        let type_symbol = self.push_symbol(Symbol {
            id: SymbolId(0),
            name: ty.name.clone(),
            qualified_name: ty.name.clone(),
            kind: SymbolKind::Type,
            declaring_scope: None,
            is_static: false,
            visibility: crate::syntax::tree::Visibility::Public,
            ty: None,
        });

        let mut members = IndexMap::new();
        for member in &ty.members {
            if members.contains_key(member.name()) {
                return Err(FlyttaError::validation(format!(
                    "member '{}' declared more than once in '{}'",
                    member.name(),
                    ty.name
                )));
            }
            let (kind, member_ty, visibility) = match member {
                Member::Field(f) => (SymbolKind::Field, Some(f.ty.clone()), f.visibility),
                Member::Property(p) => (SymbolKind::Property, Some(p.ty.clone()), p.visibility),
                Member::Method(m) => (SymbolKind::Method, Some(m.return_ty.clone()), m.visibility),
            };
            let id = self.push_symbol(Symbol {
                id: SymbolId(0),
                name: member.name().to_string(),
                qualified_name: format!("{}.{}", ty.name, member.name()),
                kind,
                declaring_scope: Some(ty.name.clone()),
                is_static: member.is_static(),
                visibility,
                ty: member_ty,
            });
            members.insert(member.name().to_string(), id);
        }

        self.types.insert(
            ty.name.clone(),
            TypeInfo {
                symbol: type_symbol,
                unit,
                base: ty.base.clone(),
                members,
            },
        );
        Ok(())
    }

    fn push_symbol(&mut self, mut symbol: Symbol) -> SymbolId {
        let id = SymbolId(self.symbols.len() as u32);
        symbol.id = id;
        self.symbols.push(symbol);
        id
    }

    // ------------------------------------------------------------------
    // pass 2: binding
    // ------------------------------------------------------------------

    fn bind(&mut self, workspace: &Workspace) {
        for unit in workspace.units() {
            for ty in &unit.types {
                for member in &ty.members {
                    let ctx = BindContext {
                        unit: unit.path.clone(),
                        scope: ty.name.clone(),
                        member: member.name().to_string(),
                    };
                    match member {
                        Member::Field(field) => {
                            if let Some(init) = &field.initializer {
                                let mut env = Env::default();
                                env.push();
                                self.bind_expr(init, &mut env, &ctx);
                            }
                        }
                        Member::Property(_) => {}
                        Member::Method(method) => {
                            let mut env = Env::default();
                            env.push();
                            for param in &method.params {
                                env.bind(&param.name, Some(param.ty.clone()));
                            }
                            for stmt in &method.body {
                                self.bind_stmt(stmt, &mut env, &ctx);
                            }
                        }
                    }
                }
            }
        }
    }

    fn bind_stmt(&mut self, stmt: &Stmt, env: &mut Env, ctx: &BindContext) {
        match stmt {
            Stmt::Expr(expr) => self.bind_expr(expr, env, ctx),
            Stmt::Return(Some(expr)) => self.bind_expr(expr, env, ctx),
            Stmt::Return(None) => {}
            Stmt::Local { name, ty, value } => {
                self.bind_expr(value, env, ctx);
                let bound_ty = ty.clone().or_else(|| self.expr_type(value, env, ctx));
                env.bind(name, bound_ty);
            }
            Stmt::If {
                cond,
                then_branch,
                else_branch,
            } => {
                self.bind_expr(cond, env, ctx);
                for branch in [then_branch, else_branch] {
                    env.push();
                    for stmt in branch {
                        self.bind_stmt(stmt, env, ctx);
                    }
                    env.pop();
                }
            }
            Stmt::Switch { scrutinee, arms } => {
                self.bind_expr(scrutinee, env, ctx);
                let scrutinee_ty = self.expr_type(scrutinee, env, ctx);
                for arm in arms {
                    env.push();
                    self.bind_pattern(&arm.pattern, scrutinee_ty.as_deref(), env, ctx);
                    for stmt in &arm.body {
                        self.bind_stmt(stmt, env, ctx);
                    }
                    env.pop();
                }
            }
        }
    }

    fn bind_pattern(
        &mut self,
        pattern: &Pattern,
        matched_ty: Option<&str>,
        env: &mut Env,
        ctx: &BindContext,
    ) {
        match pattern {
            Pattern::Discard | Pattern::Literal(_) => {}
            Pattern::Binding(name) => env.bind(name, matched_ty.map(str::to_string)),
            Pattern::Property { ty, entries } => {
                let subject = ty.as_deref().or(matched_ty);
                for entry in entries {
                    let mut entry_ty = None;
                    if let Some(subject) = subject {
                        if let Some(sym) = self.lookup_member(subject, &entry.label) {
                            self.record(
                                entry.id,
                                sym,
                                ReferenceRole::PatternLabel,
                                ctx,
                            );
                            entry_ty = self.symbols[sym.0 as usize].ty.clone();
                        }
                    }
                    self.bind_pattern(&entry.pattern, entry_ty.as_deref(), env, ctx);
                }
            }
        }
    }

    fn bind_expr(&mut self, expr: &Expr, env: &mut Env, ctx: &BindContext) {
        match expr {
            Expr::Literal { .. } | Expr::This { .. } | Expr::Base { .. } => {}
            Expr::Ident { id, name } => {
                // Locals, parameters, and lambda parameters shadow members.
                if env.lookup(name).is_some() {
                    return;
                }
                if let Some(sym) = self.lookup_member(&ctx.scope, name) {
                    self.record(*id, sym, ReferenceRole::Expression, ctx);
                } else if let Some(info) = self.types.get(name) {
                    let sym = info.symbol;
                    self.record(*id, sym, ReferenceRole::Expression, ctx);
                }
            }
            Expr::Member { id, target, name } => {
                self.bind_expr(target, env, ctx);
                if let Some(receiver) = self.expr_type(target, env, ctx) {
                    if let Some(sym) = self.lookup_member(&receiver, name) {
                        self.record(*id, sym, ReferenceRole::Expression, ctx);
                    }
                }
            }
            Expr::ConditionalChain { root, segments, .. } => {
                self.bind_expr(root, env, ctx);
                let mut receiver = self.expr_type(root, env, ctx);
                for segment in segments {
                    let mut next = None;
                    if let Some(receiver) = receiver.as_deref() {
                        if let Some(sym) = self.lookup_member(receiver, &segment.name) {
                            self.record(segment.id, sym, ReferenceRole::Expression, ctx);
                            next = self.symbols[sym.0 as usize].ty.clone();
                        }
                    }
                    receiver = next;
                    if let Some(args) = &segment.args {
                        for arg in args {
                            self.bind_expr(&arg.value, env, ctx);
                        }
                    }
                }
            }
            Expr::Invoke { callee, args, .. } => {
                self.bind_expr(callee, env, ctx);
                for arg in args {
                    self.bind_expr(&arg.value, env, ctx);
                }
            }
            Expr::New { ty, args, init, .. } => {
                for arg in args {
                    self.bind_expr(&arg.value, env, ctx);
                }
                for entry in init {
                    if let Some(sym) = self.lookup_member(ty, &entry.label) {
                        self.record(entry.id, sym, ReferenceRole::InitializerLabel, ctx);
                    }
                    self.bind_expr(&entry.value, env, ctx);
                }
            }
            Expr::Lambda { params, body, .. } => {
                env.push();
                for param in params {
                    env.bind(param, None);
                }
                self.bind_expr(body, env, ctx);
                env.pop();
            }
            Expr::Binary { lhs, rhs, .. } => {
                self.bind_expr(lhs, env, ctx);
                self.bind_expr(rhs, env, ctx);
            }
            Expr::Assign { target, value, .. } => {
                self.bind_expr(target, env, ctx);
                self.bind_expr(value, env, ctx);
            }
            Expr::NameOf { operand, .. } => {
                self.bind_expr(operand, env, ctx);
            }
        }
    }

    /// Declared type of an expression, where the declared-type discipline can
    /// see one.
    fn expr_type(&self, expr: &Expr, env: &Env, ctx: &BindContext) -> Option<String> {
        match expr {
            Expr::This { .. } => Some(ctx.scope.clone()),
            Expr::Base { .. } => self.types.get(&ctx.scope).and_then(|t| t.base.clone()),
            Expr::Ident { id, name } => match env.lookup(name) {
                Some(ty) => ty.clone(),
                None => self.resolved_value_type(*id),
            },
            Expr::Member { id, .. } => self.resolved_value_type(*id),
            Expr::Invoke { callee, .. } => self.resolved_value_type(callee.id()),
            Expr::New { ty, .. } => Some(ty.clone()),
            Expr::ConditionalChain { root, segments, .. } => match segments.last() {
                Some(last) => self.resolved_value_type(last.id),
                None => self.expr_type(root, env, ctx),
            },
            Expr::Literal { .. }
            | Expr::Lambda { .. }
            | Expr::Binary { .. }
            | Expr::Assign { .. }
            | Expr::NameOf { .. } => None,
        }
    }

    fn resolved_value_type(&self, node: NodeId) -> Option<String> {
        let resolution = self.resolutions.get(&node)?;
        self.symbols[resolution.symbol.0 as usize]
            .value_type()
            .map(str::to_string)
    }

    fn record(&mut self, node: NodeId, symbol: SymbolId, role: ReferenceRole, ctx: &BindContext) {
        self.resolutions.insert(node, Resolution { symbol, role });
        self.references.entry(symbol).or_default().push(RefLocation {
            unit: ctx.unit.clone(),
            scope: ctx.scope.clone(),
            member: ctx.member.clone(),
            node,
        });
    }
}

impl SymbolResolver for SemanticModel {
    fn resolve(&self, node: NodeId) -> Option<Resolution> {
        self.resolutions.get(&node).copied()
    }

    fn symbol(&self, id: SymbolId) -> &Symbol {
        &self.symbols[id.0 as usize]
    }

    fn lookup_member(&self, scope: &str, name: &str) -> Option<SymbolId> {
        let mut current = Some(scope);
        // Bounded walk guards against base-chain cycles in malformed input.
        for _ in 0..32 {
            let info = self.types.get(current?)?;
            if let Some(id) = info.members.get(name) {
                return Some(*id);
            }
            current = info.base.as_deref();
        }
        None
    }
}
