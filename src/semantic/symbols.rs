//! Symbol identities and reference roles.
//!
//! A [`Symbol`] is the resolved identity of a declared entity; it is always
//! produced by the resolution service, never guessed from token text. Each
//! resolution carries a [`ReferenceRole`] so a rewriter can tell a real
//! expression reference from a grammatical label that merely shares its
//! spelling (initializer entries, pattern entries). Argument-name labels need
//! no role at all: the tree stores them as strings beside their value
//! expressions, so they are not resolvable nodes in the first place.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::syntax::tree::{NodeId, Visibility};

/// Identity of one declared symbol within a semantic model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SymbolId(pub u32);

/// Kind of a declared entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SymbolKind {
    /// A type declaration
    Type,
    /// A method
    Method,
    /// A field
    Field,
    /// A property
    Property,
}

impl SymbolKind {
    /// Human-readable kind name for diagnostics.
    pub fn name(self) -> &'static str {
        match self {
            Self::Type => "type",
            Self::Method => "method",
            Self::Field => "field",
            Self::Property => "property",
        }
    }
}

/// The resolved identity and metadata of a declared entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Symbol {
    /// Symbol id within the owning model
    pub id: SymbolId,
    /// Simple name
    pub name: String,
    /// Qualified name: `Scope.Member` for members, the type name for types
    pub qualified_name: String,
    /// Entity kind
    pub kind: SymbolKind,
    /// Declaring scope; `None` for types
    pub declaring_scope: Option<String>,
    /// Static flag
    pub is_static: bool,
    /// Accessibility
    pub visibility: Visibility,
    /// Declared type for fields/properties, return type for methods, `None`
    /// for types
    pub ty: Option<String>,
}

impl Symbol {
    /// The type this symbol evaluates to when used as an expression: its own
    /// name for types, the declared/return type otherwise.
    pub fn value_type(&self) -> Option<&str> {
        match self.kind {
            SymbolKind::Type => Some(&self.qualified_name),
            _ => self.ty.as_deref(),
        }
    }
}

/// Grammatical role of a resolved node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceRole {
    /// A real expression reference; rewritable
    Expression,
    /// A member name used as an object-initializer label; never rewritten
    InitializerLabel,
    /// A member name used as a property-pattern label; never rewritten
    PatternLabel,
}

/// One resolution: which symbol a node denotes, and in what grammatical role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    /// Resolved symbol
    pub symbol: SymbolId,
    /// Grammatical role of the node
    pub role: ReferenceRole,
}

impl Resolution {
    /// True when the node is a rewritable expression reference.
    pub fn is_expression(&self) -> bool {
        self.role == ReferenceRole::Expression
    }
}

/// Location of one reference, for diagnostics and the reference index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefLocation {
    /// Unit containing the reference
    pub unit: PathBuf,
    /// Scope containing the reference
    pub scope: String,
    /// Member containing the reference
    pub member: String,
    /// The referencing node
    pub node: NodeId,
}

impl std::fmt::Display for RefLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}:{}.{} {}",
            self.unit.display(),
            self.scope,
            self.member,
            self.node
        )
    }
}

/// The resolution service: node to declared symbol, with role.
///
/// The in-crate [`SemanticModel`](crate::semantic::model::SemanticModel) is
/// the reference implementation; any front end supplying richer semantics can
/// stand in behind this trait.
pub trait SymbolResolver {
    /// Resolve a node to its declared symbol and role, if it denotes one.
    fn resolve(&self, node: NodeId) -> Option<Resolution>;

    /// Look up a symbol by id.
    fn symbol(&self, id: SymbolId) -> &Symbol;

    /// Look up a member of a scope by name, walking the base chain.
    fn lookup_member(&self, scope: &str, name: &str) -> Option<SymbolId>;
}
