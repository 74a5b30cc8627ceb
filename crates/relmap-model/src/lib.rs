//! The input side of the translation engine: annotated type definitions,
//! members, structured directives, and the type-graph oracle.
//!
//! Nothing here performs validation beyond basic construction; the engine in
//! `relmap-core` owns every semantic rule.

mod directive;
mod graph;
mod member;
mod ty;

pub use directive::{CompareOp, ConverterDef, Directive, DirectiveKind, EnumRepr};
pub use graph::{ModelGraph, ModelGraphBuilder, TypeGraph};
pub use member::{
    CollectionKind, DeclaredType, MemberAccess, MemberDef, MemberOrigin, MemberScope,
    MemberVisibility, ScalarType,
};
pub use ty::{EnumDef, EnumVariant, InstanceDef, PreDefined, TypeDef, TypeKind, TypeShape};
