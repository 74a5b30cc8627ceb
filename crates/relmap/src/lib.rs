//! ## Crate layout
//! - `core`: the translation engine: classification, resolution, keys,
//!   constraints, assembly, and the memoizing compiler.
//! - `model`: the input side: type definitions, members, directives, and
//!   the type-graph oracle.
//! - `primitives`: storage kinds and literal values.
//!
//! The `prelude` module mirrors the surface a host application uses to
//! describe its model and compile it.

pub use relmap_core as core;
pub use relmap_model as model;
pub use relmap_primitives as primitives;

/// Workspace version re-export for downstream tooling/tests.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub use relmap_core::{Compiler, CompilerOptions, Location, Problem, TranslateError};

///
/// Prelude
///

pub mod prelude {
    pub use relmap_core::prelude::*;
    pub use relmap_model::{
        CollectionKind, CompareOp, ConverterDef, DeclaredType, Directive, DirectiveKind, EnumDef,
        EnumRepr, InstanceDef, MemberDef, MemberOrigin, ModelGraph, PreDefined, TypeDef,
        TypeGraph, TypeShape,
    };
    pub use relmap_primitives::{Literal, Primitive};
}
