//! The compiled output model: what one successful translation hands to
//! downstream consumers (marshalling, diffing, DDL emission).
//!
//! Everything here is constructed once by the assembler and immutable
//! afterwards; accessors expose ordered read-only views.

use relmap_primitives::{Literal, Primitive};
use serde::Serialize;
use std::fmt::{self, Display};

///
/// Translation
///
/// The compiled schema for one source type: the Principal plus one
/// RelationUnit per relation member, in declaration order.
///

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct Translation {
    pub source: String,
    pub principal: Principal,
    pub relations: Vec<RelationUnit>,
}

impl Translation {
    /// All tables of this translation: the principal first, then relation
    /// tables in order.
    pub fn tables(&self) -> impl Iterator<Item = &Table> {
        std::iter::once(&self.principal.table).chain(self.relations.iter().map(|r| &r.table))
    }
}

///
/// Principal
///

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct Principal {
    pub table: Table,

    /// Frozen instance idents of a pre-defined entity; empty otherwise.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub instances: Vec<String>,
}

///
/// RelationUnit
///

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct RelationUnit {
    /// Dotted member path on the owner, e.g. `Items` or `Address.Phones`.
    pub member: String,
    pub table: Table,
}

///
/// Table
///

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct Table {
    pub name: String,
    pub fields: Vec<Field>,
    pub primary_key: PrimaryKey,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub candidate_keys: Vec<CandidateKey>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub foreign_keys: Vec<ForeignKey>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub constraints: Vec<Constraint>,
}

impl Table {
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }
}

///
/// Field
///

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct Field {
    /// Final name, unique within the table.
    pub name: String,
    /// Dotted source path the name derives from.
    pub path: String,
    pub storage: Primitive,
    pub nullable: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Literal>,
}

///
/// CandidateKey
///

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct CandidateKey {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Ordered, deduplicated field names.
    pub fields: Vec<String>,
}

impl Display for CandidateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fields = self.fields.join(", ");

        match &self.name {
            Some(name) => write!(f, "{name} ({fields})"),
            None => write!(f, "({fields})"),
        }
    }
}

///
/// PrimaryKey
///
/// Exactly one candidate key promoted to primary status; its fields are
/// always non-nullable.
///

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct PrimaryKey {
    pub key: CandidateKey,
    pub source: PrimaryKeySource,
}

impl PrimaryKey {
    #[must_use]
    pub fn fields(&self) -> &[String] {
        &self.key.fields
    }
}

///
/// PrimaryKeySource
///
/// Declares how the primary key was chosen.
///

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize)]
pub enum PrimaryKeySource {
    /// An explicit primary-key directive.
    Declared,
    /// The single all-non-nullable candidate key.
    Promoted,
    /// The identity naming convention.
    #[default]
    Deduced,
    /// Synthesized for a relation table (anchor plus discriminating fields).
    Synthetic,
}

///
/// ForeignKey
///

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct ForeignKey {
    /// Local field names, in target primary-key order.
    pub fields: Vec<String>,
    pub target_type: String,
    pub target_table: String,
    pub target_fields: Vec<String>,
    pub on_delete: CascadeAction,
    pub on_update: CascadeAction,
}

///
/// CascadeAction
///
/// Fixed to cascade in this system; kept as an enum so the contract is
/// explicit to consumers.
///

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize)]
pub enum CascadeAction {
    #[default]
    Cascade,
}

///
/// Constraint
///

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct Constraint {
    pub field: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function: Option<ScalarFunction>,

    pub kind: ConstraintKind,
}

///
/// ScalarFunction
///

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
pub enum ScalarFunction {
    Length,
}

///
/// ConstraintKind
///

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub enum ConstraintKind {
    Range {
        min: Option<Bound>,
        max: Option<Bound>,
    },
    OneOf {
        values: Vec<Literal>,
    },
    NoneOf {
        values: Vec<Literal>,
    },
}

///
/// Bound
///

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct Bound {
    pub value: Literal,
    pub inclusive: bool,
}
