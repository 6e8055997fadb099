//! Declaration-level tree model: source units, type declarations, and members.
//!
//! Trees are built programmatically (by tests or by any front end) with
//! unassigned node ids; the owning [`Workspace`](crate::workspace::snapshot::Workspace)
//! numbers every node on commit so resolution maps stay keyed by stable ids.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::syntax::expr::{Expr, Stmt};

/// Identity of one tree node within a workspace.
///
/// Synthesized nodes start out [`NodeId::UNASSIGNED`] and are renumbered when
/// the owning unit is committed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(u32);

impl NodeId {
    /// Sentinel for nodes not yet numbered by a workspace.
    pub const UNASSIGNED: NodeId = NodeId(u32::MAX);

    /// Construct a node id from a raw index.
    pub fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// Raw index value.
    pub fn raw(self) -> u32 {
        self.0
    }

    /// True when this node has been numbered by a workspace.
    pub fn is_assigned(self) -> bool {
        self != Self::UNASSIGNED
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_assigned() {
            write!(f, "#{}", self.0)
        } else {
            write!(f, "#?")
        }
    }
}

/// Member accessibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    /// Visible everywhere
    Public,
    /// Visible within the declaring scope only
    Private,
    /// Visible to the declaring scope and derived scopes
    Protected,
    /// Visible within the declaring assembly/module
    Internal,
}

impl Visibility {
    /// Source keyword for rendering.
    pub fn keyword(self) -> &'static str {
        match self {
            Self::Public => "public",
            Self::Private => "private",
            Self::Protected => "protected",
            Self::Internal => "internal",
        }
    }
}

/// One source file: namespace, imports, and the types it declares.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceUnit {
    /// Node id assigned on commit
    pub id: NodeId,
    /// Path of the unit, relative to the workspace root
    pub path: PathBuf,
    /// Enclosing namespace, if any
    pub namespace: Option<String>,
    /// Import directives in declaration order
    pub imports: Vec<String>,
    /// Type declarations in declaration order
    pub types: Vec<TypeDecl>,
}

impl SourceUnit {
    /// Create an empty unit at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            id: NodeId::UNASSIGNED,
            path: path.into(),
            namespace: None,
            imports: Vec::new(),
            types: Vec::new(),
        }
    }

    /// Set the namespace.
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    /// Append an import directive.
    pub fn with_import(mut self, import: impl Into<String>) -> Self {
        self.imports.push(import.into());
        self
    }

    /// Append a type declaration.
    pub fn with_type(mut self, ty: TypeDecl) -> Self {
        self.types.push(ty);
        self
    }

    /// Find a type declared in this unit.
    pub fn type_decl(&self, name: &str) -> Option<&TypeDecl> {
        self.types.iter().find(|t| t.name == name)
    }

    /// Find a type declared in this unit, mutably.
    pub fn type_decl_mut(&mut self, name: &str) -> Option<&mut TypeDecl> {
        self.types.iter_mut().find(|t| t.name == name)
    }

    /// Add an import if not already present, preserving existing order.
    pub fn merge_import(&mut self, import: &str) {
        if !self.imports.iter().any(|i| i == import) {
            self.imports.push(import.to_string());
        }
    }

    pub(crate) fn visit_ids_mut(&mut self, f: &mut dyn FnMut(&mut NodeId)) {
        f(&mut self.id);
        for ty in &mut self.types {
            ty.visit_ids_mut(f);
        }
    }
}

/// A named container of declarations (a class); a move source or destination.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeDecl {
    /// Node id assigned on commit
    pub id: NodeId,
    /// Type name, unique within the workspace
    pub name: String,
    /// Single-inheritance base type, if any
    pub base: Option<String>,
    /// Members in declaration order
    pub members: Vec<Member>,
}

impl TypeDecl {
    /// Create an empty type declaration.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: NodeId::UNASSIGNED,
            name: name.into(),
            base: None,
            members: Vec::new(),
        }
    }

    /// Set the base type.
    pub fn with_base(mut self, base: impl Into<String>) -> Self {
        self.base = Some(base.into());
        self
    }

    /// Append a member.
    pub fn with_member(mut self, member: Member) -> Self {
        self.members.push(member);
        self
    }

    /// Find a member by name.
    pub fn member(&self, name: &str) -> Option<&Member> {
        self.members.iter().find(|m| m.name() == name)
    }

    /// Find a method by name.
    pub fn method(&self, name: &str) -> Option<&MethodDecl> {
        self.members.iter().find_map(|m| match m {
            Member::Method(method) if method.name == name => Some(method),
            _ => None,
        })
    }

    /// Find a method by name, mutably.
    pub fn method_mut(&mut self, name: &str) -> Option<&mut MethodDecl> {
        self.members.iter_mut().find_map(|m| match m {
            Member::Method(method) if method.name == name => Some(method),
            _ => None,
        })
    }

    /// Find a field by name.
    pub fn field(&self, name: &str) -> Option<&FieldDecl> {
        self.members.iter().find_map(|m| match m {
            Member::Field(field) if field.name == name => Some(field),
            _ => None,
        })
    }

    pub(crate) fn visit_ids_mut(&mut self, f: &mut dyn FnMut(&mut NodeId)) {
        f(&mut self.id);
        for member in &mut self.members {
            member.visit_ids_mut(f);
        }
    }
}

/// One member of a type declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Member {
    /// A field
    Field(FieldDecl),
    /// A property (resolves like a field; no accessor bodies modeled)
    Property(PropertyDecl),
    /// A method
    Method(MethodDecl),
}

impl Member {
    /// Member name.
    pub fn name(&self) -> &str {
        match self {
            Self::Field(f) => &f.name,
            Self::Property(p) => &p.name,
            Self::Method(m) => &m.name,
        }
    }

    /// Human-readable member kind, used in collision diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Field(_) => "field",
            Self::Property(_) => "property",
            Self::Method(_) => "method",
        }
    }

    /// True for static members.
    pub fn is_static(&self) -> bool {
        match self {
            Self::Field(f) => f.is_static,
            Self::Property(p) => p.is_static,
            Self::Method(m) => m.is_static,
        }
    }

    pub(crate) fn visit_ids_mut(&mut self, f: &mut dyn FnMut(&mut NodeId)) {
        match self {
            Self::Field(field) => {
                f(&mut field.id);
                if let Some(init) = &mut field.initializer {
                    init.visit_ids_mut(f);
                }
            }
            Self::Property(prop) => f(&mut prop.id),
            Self::Method(method) => method.visit_ids_mut(f),
        }
    }
}

/// A field declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDecl {
    /// Node id assigned on commit
    pub id: NodeId,
    /// Field name
    pub name: String,
    /// Declared type name
    pub ty: String,
    /// Static flag
    pub is_static: bool,
    /// Accessibility
    pub visibility: Visibility,
    /// Optional initializer expression
    pub initializer: Option<Expr>,
}

impl FieldDecl {
    /// Create a private instance field.
    pub fn new(name: impl Into<String>, ty: impl Into<String>) -> Self {
        Self {
            id: NodeId::UNASSIGNED,
            name: name.into(),
            ty: ty.into(),
            is_static: false,
            visibility: Visibility::Private,
            initializer: None,
        }
    }

    /// Mark the field static.
    pub fn static_(mut self) -> Self {
        self.is_static = true;
        self
    }

    /// Set accessibility.
    pub fn with_visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = visibility;
        self
    }

    /// Set the initializer.
    pub fn with_initializer(mut self, init: Expr) -> Self {
        self.initializer = Some(init);
        self
    }
}

/// A property declaration. Modeled without accessor bodies; resolution and
/// rewriting treat it exactly like a field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyDecl {
    /// Node id assigned on commit
    pub id: NodeId,
    /// Property name
    pub name: String,
    /// Declared type name
    pub ty: String,
    /// Static flag
    pub is_static: bool,
    /// Accessibility
    pub visibility: Visibility,
}

impl PropertyDecl {
    /// Create a public instance property.
    pub fn new(name: impl Into<String>, ty: impl Into<String>) -> Self {
        Self {
            id: NodeId::UNASSIGNED,
            name: name.into(),
            ty: ty.into(),
            is_static: false,
            visibility: Visibility::Public,
        }
    }

    /// Mark the property static.
    pub fn static_(mut self) -> Self {
        self.is_static = true;
        self
    }
}

/// One parameter of a method.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Param {
    /// Parameter name
    pub name: String,
    /// Declared type name
    pub ty: String,
}

impl Param {
    /// Create a parameter.
    pub fn new(name: impl Into<String>, ty: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ty: ty.into(),
        }
    }
}

/// A method declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodDecl {
    /// Node id assigned on commit
    pub id: NodeId,
    /// Method name
    pub name: String,
    /// Parameters in order
    pub params: Vec<Param>,
    /// Return type name; `void` for none
    pub return_ty: String,
    /// Static flag
    pub is_static: bool,
    /// Accessibility
    pub visibility: Visibility,
    /// Body statements
    pub body: Vec<Stmt>,
}

impl MethodDecl {
    /// Create a public instance method.
    pub fn new(name: impl Into<String>, return_ty: impl Into<String>) -> Self {
        Self {
            id: NodeId::UNASSIGNED,
            name: name.into(),
            params: Vec::new(),
            return_ty: return_ty.into(),
            is_static: false,
            visibility: Visibility::Public,
            body: Vec::new(),
        }
    }

    /// Append a parameter.
    pub fn with_param(mut self, param: Param) -> Self {
        self.params.push(param);
        self
    }

    /// Set the body.
    pub fn with_body(mut self, body: Vec<Stmt>) -> Self {
        self.body = body;
        self
    }

    /// Mark the method static.
    pub fn static_(mut self) -> Self {
        self.is_static = true;
        self
    }

    /// Set accessibility.
    pub fn with_visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = visibility;
        self
    }

    /// True when the method returns no value.
    pub fn returns_void(&self) -> bool {
        self.return_ty == "void"
    }

    pub(crate) fn visit_ids_mut(&mut self, f: &mut dyn FnMut(&mut NodeId)) {
        f(&mut self.id);
        for stmt in &mut self.body {
            stmt.visit_ids_mut(f);
        }
    }
}
