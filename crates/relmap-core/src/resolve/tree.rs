//! The intermediate structure built by the resolver: one tree per model
//! member, later flattened into leaf fields.

use crate::error::{Location, TranslateError};
use relmap_model::{
    CollectionKind, ConverterDef, Directive, DirectiveKind, EnumRepr, ScalarType,
};
use relmap_primitives::{Literal, Primitive};

///
/// Node
///
/// One node of a member's structural tree. Relations never appear here;
/// they are collected separately and produce their own tables.
///

#[derive(Clone, Debug, PartialEq)]
pub enum Node {
    Leaf(LeafNode),
    Aggregate(AggregateNode),
    Reference(ReferenceNode),
}

impl Node {
    #[must_use]
    pub fn ident(&self) -> &str {
        match self {
            Self::Leaf(leaf) => &leaf.ident,
            Self::Aggregate(agg) => &agg.ident,
            Self::Reference(reference) => &reference.ident,
        }
    }
}

///
/// LeafNode
///

#[derive(Clone, Debug, PartialEq)]
pub struct LeafNode {
    pub ident: String,
    pub rename: Option<Rename>,
    pub scalar: ScalarType,
    /// NonNull applied; leaves are natively nullable otherwise.
    pub non_null: bool,
    /// Fixed storage for reference-contributed leaves; scalar leaves derive
    /// storage from their scalar type at flatten time.
    pub fixed_storage: Option<Primitive>,
    pub default: Option<Literal>,
    pub constraints: Vec<LeafConstraint>,
    pub repr: Option<EnumRepr>,
    pub converter: Option<ConverterDef>,
}

impl LeafNode {
    #[must_use]
    pub fn scalar(ident: impl Into<String>, scalar: ScalarType) -> Self {
        Self {
            ident: ident.into(),
            rename: None,
            scalar,
            non_null: false,
            fixed_storage: None,
            default: None,
            constraints: Vec::new(),
            repr: None,
            converter: None,
        }
    }

    /// A leaf contributed by a reference: storage is the target primary-key
    /// field's storage, and the leaf is natively non-nullable.
    #[must_use]
    pub fn contributed(ident: impl Into<String>, storage: Primitive) -> Self {
        Self {
            ident: ident.into(),
            rename: None,
            scalar: ScalarType::Primitive(storage),
            non_null: true,
            fixed_storage: Some(storage),
            default: None,
            constraints: Vec::new(),
            repr: None,
            converter: None,
        }
    }
}

///
/// AggregateNode
///

#[derive(Clone, Debug, PartialEq)]
pub struct AggregateNode {
    pub ident: String,
    pub rename: Option<Rename>,
    /// Container marked nullable via directive.
    pub nullable: bool,
    pub children: Vec<Node>,
}

///
/// ReferenceNode
///

#[derive(Clone, Debug, PartialEq)]
pub struct ReferenceNode {
    pub ident: String,
    pub rename: Option<Rename>,
    pub nullable: bool,
    pub target: RefTarget,
    /// One `Node::Leaf` per target primary-key field, in key order.
    pub children: Vec<Node>,
}

///
/// RefTarget
///
/// What reference resolution needs from a target entity: its table, its
/// primary-key fields, and its member idents (for precise path errors).
///

#[derive(Clone, Debug, PartialEq)]
pub struct RefTarget {
    pub type_ident: String,
    pub table_name: String,
    pub pk_fields: Vec<(String, Primitive)>,
    pub member_idents: Vec<String>,
}

///
/// TargetResolver
///
/// Callback seam into the compiler: full translation for acyclic targets,
/// identity-only forward handles for in-flight ones.
///

pub trait TargetResolver {
    fn resolve_target(
        &mut self,
        ident: &str,
        trail: &Location,
    ) -> Result<RefTarget, TranslateError>;
}

///
/// Rename
///
/// A naming override with the path depth it was applied at; the directive
/// closest to the leaf (lowest rank) wins.
///

#[derive(Clone, Debug, PartialEq)]
pub struct Rename {
    pub name: String,
    pub rank: usize,
}

///
/// LeafConstraint
///
/// One constraint directive gathered onto a leaf, composed later.
///

#[derive(Clone, Debug, PartialEq)]
pub struct LeafConstraint {
    pub kind: DirectiveKind,
    pub values: Vec<Literal>,
    pub directive: &'static str,
}

///
/// KeyApp
///
/// One key or primary-key directive resolved to leaf source paths.
///

#[derive(Clone, Debug)]
pub struct KeyApp {
    pub name: Option<String>,
    pub primary: bool,
    pub paths: Vec<String>,
    pub directive: &'static str,
}

///
/// ResolvedEntity
///

#[derive(Clone, Debug)]
pub struct ResolvedEntity {
    pub ident: String,
    pub table_rename: Option<String>,
    pub members: Vec<ResolvedMember>,
    pub relations: Vec<ResolvedRelation>,
    pub key_apps: Vec<KeyApp>,
}

///
/// ResolvedMember
///

#[derive(Clone, Debug)]
pub struct ResolvedMember {
    pub ident: String,
    pub node: Node,
}

///
/// ResolvedRelation
///

#[derive(Clone, Debug)]
pub struct ResolvedRelation {
    /// Segments from the entity root to the collection member.
    pub member_path: Vec<String>,
    /// True when bubbled out of a nested aggregate or reference.
    pub synthetic: bool,
    pub kind: CollectionKind,
    pub element: Node,
    /// The relation member's directives, applied during assembly (table
    /// naming and anchor-rooted paths).
    pub directives: Vec<Directive>,
}

impl ResolvedRelation {
    #[must_use]
    pub fn member_path_dotted(&self) -> String {
        self.member_path.join(".")
    }
}

///
/// FlatLeaf
///
/// One leaf field flattened out of a member tree: the unit key deduction,
/// constraint composition, and assembly all operate on.
///

#[derive(Clone, Debug)]
pub struct FlatLeaf {
    /// Dotted original idents, stable across renames.
    pub source_path: String,
    /// Per-segment (ident, rename) pairs for name derivation.
    pub segments: Vec<(String, Option<String>)>,
    pub storage: Primitive,
    /// Effective nullability, container nullability included.
    pub nullable: bool,
    /// Natively non-nullable (NonNull applied, or reference-contributed).
    pub non_null_native: bool,
    pub from_reference: bool,
    /// Direct scalar member of the entity (key-deduction heuristics only
    /// consider these).
    pub top_level_scalar: bool,
    pub default: Option<Literal>,
    pub constraints: Vec<LeafConstraint>,
}

///
/// FkSeed
///
/// A foreign key discovered during flattening, in target key order.
///

#[derive(Clone, Debug)]
pub struct FkSeed {
    pub local_paths: Vec<String>,
    pub target_type: String,
    pub target_table: String,
    pub target_fields: Vec<String>,
}
