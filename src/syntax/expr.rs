//! Expression, statement, and pattern model.
//!
//! The expression set is deliberately closed: every position the rewriter can
//! encounter is one of these variants, and rewriting dispatches with
//! exhaustive `match`. Labels (argument names, initializer entries, pattern
//! entries) are stored as plain strings alongside their value expressions, so
//! a label can never be mistaken for a rewritable expression node.

use serde::{Deserialize, Serialize};

use crate::syntax::tree::NodeId;

/// Literal values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Literal {
    /// Integer literal
    Int(i64),
    /// String literal
    Str(String),
    /// Boolean literal
    Bool(bool),
    /// Null literal
    Null,
}

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BinaryOp {
    /// `+`
    Add,
    /// `-`
    Sub,
    /// `*`
    Mul,
    /// `/`
    Div,
    /// `==`
    Eq,
    /// `!=`
    Ne,
    /// `<`
    Lt,
    /// `>`
    Gt,
    /// `&&`
    And,
    /// `||`
    Or,
}

impl BinaryOp {
    /// Source token for rendering.
    pub fn token(self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::Lt => "<",
            Self::Gt => ">",
            Self::And => "&&",
            Self::Or => "||",
        }
    }
}

/// One argument in an invocation or constructor call. The optional label is
/// an argument *name*, never an expression; rewriting touches only `value`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Arg {
    /// Argument-name label, if the call site names it
    pub label: Option<String>,
    /// Argument value expression
    pub value: Expr,
}

impl Arg {
    /// Positional argument.
    pub fn positional(value: Expr) -> Self {
        Self { label: None, value }
    }

    /// Named argument.
    pub fn named(label: impl Into<String>, value: Expr) -> Self {
        Self {
            label: Some(label.into()),
            value,
        }
    }
}

/// One entry of an object initializer: `label = value`. The label names a
/// member of the constructed type; it is a grammatical label, not a
/// reference, and is never rewritten.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InitEntry {
    /// Node id assigned on commit; resolution attaches an initializer-label
    /// role here
    pub id: NodeId,
    /// Member name of the constructed type
    pub label: String,
    /// Assigned value expression
    pub value: Expr,
}

impl InitEntry {
    /// Create an initializer entry.
    pub fn new(label: impl Into<String>, value: Expr) -> Self {
        Self {
            id: NodeId::UNASSIGNED,
            label: label.into(),
            value,
        }
    }
}

/// One `?.` continuation of a conditional-access chain: a member access or an
/// invocation hanging off the preceding null check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainSegment {
    /// Node id assigned on commit
    pub id: NodeId,
    /// Accessed member name
    pub name: String,
    /// Invocation arguments, when the segment is a call
    pub args: Option<Vec<Arg>>,
}

impl ChainSegment {
    /// Plain `?.name` access.
    pub fn access(name: impl Into<String>) -> Self {
        Self {
            id: NodeId::UNASSIGNED,
            name: name.into(),
            args: None,
        }
    }

    /// `?.name(args)` invocation.
    pub fn invoke(name: impl Into<String>, args: Vec<Arg>) -> Self {
        Self {
            id: NodeId::UNASSIGNED,
            name: name.into(),
            args: Some(args),
        }
    }
}

/// The closed expression set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "expr", rename_all = "snake_case")]
pub enum Expr {
    /// Literal value
    Literal {
        /// Node id
        id: NodeId,
        /// The literal
        value: Literal,
    },
    /// Unqualified identifier. May resolve to a local, a parameter, a member
    /// of the enclosing scope, or a type name.
    Ident {
        /// Node id; resolution is keyed here
        id: NodeId,
        /// Identifier text
        name: String,
    },
    /// Explicit self reference
    This {
        /// Node id
        id: NodeId,
    },
    /// Base-type self reference
    Base {
        /// Node id
        id: NodeId,
    },
    /// Plain member access `target.name`
    Member {
        /// Node id; resolution of `name` against the target's type is keyed
        /// here
        id: NodeId,
        /// Receiver expression
        target: Box<Expr>,
        /// Accessed member name
        name: String,
    },
    /// Conditional-access chain `root?.a?.b(...)`. Only the root is a free
    /// expression; segments are continuations and are preserved verbatim by
    /// rewriting.
    ConditionalChain {
        /// Node id
        id: NodeId,
        /// Chain root expression
        root: Box<Expr>,
        /// `?.` continuations in order
        segments: Vec<ChainSegment>,
    },
    /// Invocation `callee(args)`
    Invoke {
        /// Node id
        id: NodeId,
        /// Callee expression (identifier or member access)
        callee: Box<Expr>,
        /// Arguments, optionally labeled
        args: Vec<Arg>,
    },
    /// Constructor call `new Ty(args) { entries }`
    New {
        /// Node id
        id: NodeId,
        /// Constructed type name
        ty: String,
        /// Constructor arguments
        args: Vec<Arg>,
        /// Object-initializer entries
        init: Vec<InitEntry>,
    },
    /// Lambda `(params) => body`
    Lambda {
        /// Node id
        id: NodeId,
        /// Parameter names (untyped)
        params: Vec<String>,
        /// Body expression
        body: Box<Expr>,
    },
    /// Binary operation
    Binary {
        /// Node id
        id: NodeId,
        /// Operator
        op: BinaryOp,
        /// Left operand
        lhs: Box<Expr>,
        /// Right operand
        rhs: Box<Expr>,
    },
    /// Assignment `target = value`
    Assign {
        /// Node id
        id: NodeId,
        /// Assignment target
        target: Box<Expr>,
        /// Assigned value
        value: Box<Expr>,
    },
    /// `nameof(operand)`: the operand resolves like a reference but its
    /// rewriting would change observable string values, so the rewriter must
    /// refuse it rather than substitute.
    NameOf {
        /// Node id
        id: NodeId,
        /// Referenced entity
        operand: Box<Expr>,
    },
}

impl Expr {
    /// Integer literal.
    pub fn int(value: i64) -> Self {
        Self::Literal {
            id: NodeId::UNASSIGNED,
            value: Literal::Int(value),
        }
    }

    /// String literal.
    pub fn str_(value: impl Into<String>) -> Self {
        Self::Literal {
            id: NodeId::UNASSIGNED,
            value: Literal::Str(value.into()),
        }
    }

    /// Null literal.
    pub fn null() -> Self {
        Self::Literal {
            id: NodeId::UNASSIGNED,
            value: Literal::Null,
        }
    }

    /// Unqualified identifier.
    pub fn ident(name: impl Into<String>) -> Self {
        Self::Ident {
            id: NodeId::UNASSIGNED,
            name: name.into(),
        }
    }

    /// `this`
    pub fn this() -> Self {
        Self::This {
            id: NodeId::UNASSIGNED,
        }
    }

    /// `base`
    pub fn base() -> Self {
        Self::Base {
            id: NodeId::UNASSIGNED,
        }
    }

    /// Member access `target.name`.
    pub fn member(target: Expr, name: impl Into<String>) -> Self {
        Self::Member {
            id: NodeId::UNASSIGNED,
            target: Box::new(target),
            name: name.into(),
        }
    }

    /// Conditional-access chain `root?.segments…`.
    pub fn chain(root: Expr, segments: Vec<ChainSegment>) -> Self {
        Self::ConditionalChain {
            id: NodeId::UNASSIGNED,
            root: Box::new(root),
            segments,
        }
    }

    /// Invocation `callee(args)`.
    pub fn invoke(callee: Expr, args: Vec<Arg>) -> Self {
        Self::Invoke {
            id: NodeId::UNASSIGNED,
            callee: Box::new(callee),
            args,
        }
    }

    /// Constructor call.
    pub fn new_object(ty: impl Into<String>, args: Vec<Arg>, init: Vec<InitEntry>) -> Self {
        Self::New {
            id: NodeId::UNASSIGNED,
            ty: ty.into(),
            args,
            init,
        }
    }

    /// Lambda.
    pub fn lambda(params: Vec<&str>, body: Expr) -> Self {
        Self::Lambda {
            id: NodeId::UNASSIGNED,
            params: params.into_iter().map(str::to_string).collect(),
            body: Box::new(body),
        }
    }

    /// Binary operation.
    pub fn binary(op: BinaryOp, lhs: Expr, rhs: Expr) -> Self {
        Self::Binary {
            id: NodeId::UNASSIGNED,
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }

    /// Assignment.
    pub fn assign(target: Expr, value: Expr) -> Self {
        Self::Assign {
            id: NodeId::UNASSIGNED,
            target: Box::new(target),
            value: Box::new(value),
        }
    }

    /// `nameof(operand)`.
    pub fn name_of(operand: Expr) -> Self {
        Self::NameOf {
            id: NodeId::UNASSIGNED,
            operand: Box::new(operand),
        }
    }

    /// This node's id.
    pub fn id(&self) -> NodeId {
        match self {
            Self::Literal { id, .. }
            | Self::Ident { id, .. }
            | Self::This { id }
            | Self::Base { id }
            | Self::Member { id, .. }
            | Self::ConditionalChain { id, .. }
            | Self::Invoke { id, .. }
            | Self::New { id, .. }
            | Self::Lambda { id, .. }
            | Self::Binary { id, .. }
            | Self::Assign { id, .. }
            | Self::NameOf { id, .. } => *id,
        }
    }

    pub(crate) fn visit_ids_mut(&mut self, f: &mut dyn FnMut(&mut NodeId)) {
        match self {
            Self::Literal { id, .. } | Self::Ident { id, .. } | Self::This { id } | Self::Base { id } => {
                f(id);
            }
            Self::Member { id, target, .. } => {
                f(id);
                target.visit_ids_mut(f);
            }
            Self::ConditionalChain { id, root, segments } => {
                f(id);
                root.visit_ids_mut(f);
                for segment in segments {
                    f(&mut segment.id);
                    if let Some(args) = &mut segment.args {
                        for arg in args {
                            arg.value.visit_ids_mut(f);
                        }
                    }
                }
            }
            Self::Invoke { id, callee, args } => {
                f(id);
                callee.visit_ids_mut(f);
                for arg in args {
                    arg.value.visit_ids_mut(f);
                }
            }
            Self::New { id, args, init, .. } => {
                f(id);
                for arg in args {
                    arg.value.visit_ids_mut(f);
                }
                for entry in init {
                    f(&mut entry.id);
                    entry.value.visit_ids_mut(f);
                }
            }
            Self::Lambda { id, body, .. } => {
                f(id);
                body.visit_ids_mut(f);
            }
            Self::Binary { id, lhs, rhs, .. } => {
                f(id);
                lhs.visit_ids_mut(f);
                rhs.visit_ids_mut(f);
            }
            Self::Assign { id, target, value } => {
                f(id);
                target.visit_ids_mut(f);
                value.visit_ids_mut(f);
            }
            Self::NameOf { id, operand } => {
                f(id);
                operand.visit_ids_mut(f);
            }
        }
    }
}

/// The closed statement set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "stmt", rename_all = "snake_case")]
pub enum Stmt {
    /// Expression statement
    Expr(Expr),
    /// `return` with optional value
    Return(Option<Expr>),
    /// Local declaration `ty name = value`
    Local {
        /// Local name
        name: String,
        /// Declared type, `var` when omitted
        ty: Option<String>,
        /// Initializer
        value: Expr,
    },
    /// Conditional
    If {
        /// Condition
        cond: Expr,
        /// Then branch
        then_branch: Vec<Stmt>,
        /// Else branch (possibly empty)
        else_branch: Vec<Stmt>,
    },
    /// Pattern switch over a scrutinee
    Switch {
        /// Matched expression
        scrutinee: Expr,
        /// Arms in order
        arms: Vec<SwitchArm>,
    },
}

impl Stmt {
    /// Local declaration with inferred (`var`) type.
    pub fn local(name: impl Into<String>, value: Expr) -> Self {
        Self::Local {
            name: name.into(),
            ty: None,
            value,
        }
    }

    /// Local declaration with an explicit type.
    pub fn local_typed(name: impl Into<String>, ty: impl Into<String>, value: Expr) -> Self {
        Self::Local {
            name: name.into(),
            ty: Some(ty.into()),
            value,
        }
    }

    pub(crate) fn visit_ids_mut(&mut self, f: &mut dyn FnMut(&mut NodeId)) {
        match self {
            Self::Expr(expr) => expr.visit_ids_mut(f),
            Self::Return(expr) => {
                if let Some(expr) = expr {
                    expr.visit_ids_mut(f);
                }
            }
            Self::Local { value, .. } => value.visit_ids_mut(f),
            Self::If {
                cond,
                then_branch,
                else_branch,
            } => {
                cond.visit_ids_mut(f);
                for stmt in then_branch.iter_mut().chain(else_branch.iter_mut()) {
                    stmt.visit_ids_mut(f);
                }
            }
            Self::Switch { scrutinee, arms } => {
                scrutinee.visit_ids_mut(f);
                for arm in arms {
                    arm.pattern.visit_ids_mut(f);
                    for stmt in &mut arm.body {
                        stmt.visit_ids_mut(f);
                    }
                }
            }
        }
    }
}

/// One arm of a pattern switch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwitchArm {
    /// Matched pattern
    pub pattern: Pattern,
    /// Arm body
    pub body: Vec<Stmt>,
}

impl SwitchArm {
    /// Create an arm.
    pub fn new(pattern: Pattern, body: Vec<Stmt>) -> Self {
        Self { pattern, body }
    }
}

/// The closed pattern set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "pattern", rename_all = "snake_case")]
pub enum Pattern {
    /// `_`
    Discard,
    /// Literal pattern
    Literal(Literal),
    /// `var name` binding
    Binding(String),
    /// Property pattern `Ty { Label: pattern, … }`. Labels name members of
    /// the matched type; they are grammatical labels, never references.
    Property {
        /// Matched type, when the pattern names one
        ty: Option<String>,
        /// Labeled sub-patterns
        entries: Vec<PropertyPatternEntry>,
    },
}

impl Pattern {
    pub(crate) fn visit_ids_mut(&mut self, f: &mut dyn FnMut(&mut NodeId)) {
        if let Self::Property { entries, .. } = self {
            for entry in entries {
                f(&mut entry.id);
                entry.pattern.visit_ids_mut(f);
            }
        }
    }
}

/// One labeled entry of a property pattern.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyPatternEntry {
    /// Node id assigned on commit; resolution attaches a pattern-label role
    /// here
    pub id: NodeId,
    /// Member name of the matched type
    pub label: String,
    /// Sub-pattern
    pub pattern: Pattern,
}

impl PropertyPatternEntry {
    /// Create a property-pattern entry.
    pub fn new(label: impl Into<String>, pattern: Pattern) -> Self {
        Self {
            id: NodeId::UNASSIGNED,
            label: label.into(),
            pattern,
        }
    }
}
