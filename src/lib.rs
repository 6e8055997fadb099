//! # Flytta: Cross-Scope Method Relocation Engine
//!
//! A source-to-source refactoring engine whose core operation moves one or a
//! batch of methods from a source scope (class) to a target scope while the
//! program keeps compiling:
//!
//! - **Dependency Ordering**: batched moves are ordered so dependencies land
//!   before their dependents; mutual recursion is detected and co-moved as one
//!   atomic unit
//! - **Anchor Rewriting**: relocated instance methods regain access to source
//!   state through a caller-chosen anchor (leading parameter or target field)
//! - **Reference Rewriting**: every resolved reference in a moved body is
//!   re-qualified by its grammatical role, never by token text
//! - **Delegating Stubs**: call sites elsewhere keep resolving through a
//!   same-signature stub left behind (or are rewritten in place)
//! - **Companion Operations**: stub inlining, safe delete, convert-to-static
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        API Layer                            │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Relocation   │  Semantic   │  Syntax     │  I/O & Sessions │
//! │               │             │             │                 │
//! │ • Graph       │ • Symbols   │ • Tree      │ • Persistence   │
//! │ • Planner     │ • Resolver  │ • Exprs     │ • Session store │
//! │ • Rewriter    │ • Ref index │ • Render    │ • Batch reports │
//! │ • Call sites  │             │             │                 │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use flytta::{FlyttaConfig, RefactorEngine};
//! use flytta::relocate::request::{AnchorSpec, MoveBatchRequest, MoveRequest};
//! use flytta::workspace::snapshot::Workspace;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let engine = RefactorEngine::with_config(FlyttaConfig::default())?;
//!     let session = engine.load_workspace(Workspace::new());
//!
//!     let batch = MoveBatchRequest::new(vec![MoveRequest::new(
//!         "Inventory",
//!         "Tally",
//!         "Reporting",
//!         AnchorSpec::Field {
//!             name: "inventory".into(),
//!         },
//!     )]);
//!     let report = engine.move_members(session, &batch)?;
//!     println!("moved {} member(s)", report.moves.len());
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(unsafe_code)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]
#![cfg_attr(docsrs, feature(doc_cfg))]

// Ambient infrastructure
pub mod core {
    //! Errors and configuration shared by every subsystem.

    pub mod config;
    pub mod errors;
}

// Structured tree model and rendering (external-interface collaborators)
pub mod syntax {
    //! The structured source tree: units, declarations, expressions, and the
    //! deterministic renderer that serializes a tree back to source text.

    pub mod expr;
    pub mod render;
    pub mod tree;
}

// Symbol resolution
pub mod semantic {
    //! Symbols, reference roles, and the resolution model computed from one
    //! workspace snapshot.

    pub mod model;
    pub mod symbols;
}

// Loaded-program state
pub mod workspace {
    //! In-memory loaded programs and the process-wide session store.

    pub mod session;
    pub mod snapshot;
}

// The relocation core
pub mod relocate {
    //! Cross-scope method relocation: dependency ordering, planning,
    //! reference rewriting, call-site updating, and batch orchestration.

    pub mod batch;
    pub mod callsites;
    pub mod graph;
    pub mod guard;
    pub mod materializer;
    pub mod planner;
    pub mod request;
    pub mod rewriter;
}

// Companion operations built on the relocation machinery
pub mod ops {
    //! Companion refactorings: stub inlining, safe delete, convert-to-static.

    pub mod inline_stub;
    pub mod make_static;
    pub mod safe_delete;
}

// I/O and persistence
pub mod io {
    //! Atomic persistence of rewritten source units.

    pub mod persistence;
}

// Public API and engine interface
pub mod api {
    //! High-level engine interface and serializable reports.

    pub mod engine;
    pub mod results;
}

// Re-export primary types for convenience
pub use crate::api::engine::RefactorEngine;
pub use crate::api::results::BatchReport;
pub use crate::core::config::FlyttaConfig;
pub use crate::core::errors::{FlyttaError, Result, ResultExt};

/// Library version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
