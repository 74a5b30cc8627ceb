use crate::{Directive, EnumDef};
use relmap_primitives::Primitive;
use serde::Serialize;

///
/// MemberDef
///
/// One raw candidate member of a type, before eligibility rules run.
///

#[derive(Clone, Debug, Serialize)]
pub struct MemberDef {
    pub ident: String,
    pub declared: DeclaredType,
    pub origin: MemberOrigin,
    pub scope: MemberScope,
    pub visibility: MemberVisibility,
    pub access: MemberAccess,
    pub directives: Vec<Directive>,
}

impl MemberDef {
    #[must_use]
    pub fn new(ident: impl Into<String>, declared: DeclaredType) -> Self {
        Self {
            ident: ident.into(),
            declared,
            origin: MemberOrigin::Declared,
            scope: MemberScope::Instance,
            visibility: MemberVisibility::Public,
            access: MemberAccess {
                readable: true,
                writable: true,
                indexer: false,
            },
            directives: Vec::new(),
        }
    }

    #[must_use]
    pub const fn origin(mut self, origin: MemberOrigin) -> Self {
        self.origin = origin;
        self
    }

    #[must_use]
    pub const fn shared(mut self) -> Self {
        self.scope = MemberScope::Shared;
        self
    }

    #[must_use]
    pub const fn private(mut self) -> Self {
        self.visibility = MemberVisibility::Private;
        self
    }

    #[must_use]
    pub const fn write_only(mut self) -> Self {
        self.access.readable = false;
        self
    }

    #[must_use]
    pub const fn read_only(mut self) -> Self {
        self.access.writable = false;
        self
    }

    #[must_use]
    pub const fn indexer(mut self) -> Self {
        self.access.indexer = true;
        self
    }

    #[must_use]
    pub fn directive(mut self, directive: Directive) -> Self {
        self.directives.push(directive);
        self
    }
}

///
/// MemberOrigin
///
/// Member identity independent of simple name matching. A dispatch-override
/// chain collapses to its origin declaration; shadowing and contract-scoped
/// members stay distinct.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
pub enum MemberOrigin {
    /// First declaration on this type.
    Declared,
    /// Redeclared only to override dispatch; the base declaration covers it.
    DispatchOverride,
    /// Declares a new, unrelated member under a base member's name.
    Shadowing,
    /// Declared on a base type only, no local redeclaration.
    Inherited,
    /// Declared on a shared contract only, not re-exposed locally.
    ContractOnly,
    /// Explicit contract-scoped implementation; carries the contract's
    /// declared type.
    ContractImpl,
}

///
/// MemberScope
///

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
pub enum MemberScope {
    Instance,
    Shared,
}

///
/// MemberVisibility
///

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
pub enum MemberVisibility {
    Public,
    Private,
}

///
/// MemberAccess
///

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
pub struct MemberAccess {
    pub readable: bool,
    pub writable: bool,
    pub indexer: bool,
}

///
/// DeclaredType
///
/// The declared shape of a member. Named types resolve through the graph
/// into aggregates or references; collections become relations.
///

#[derive(Clone, Debug, Serialize)]
pub enum DeclaredType {
    Scalar(ScalarType),
    Named(String),
    Collection {
        kind: CollectionKind,
        element: Box<DeclaredType>,
    },
}

impl DeclaredType {
    #[must_use]
    pub const fn primitive(primitive: Primitive) -> Self {
        Self::Scalar(ScalarType::Primitive(primitive))
    }

    #[must_use]
    pub const fn enumerated(def: EnumDef) -> Self {
        Self::Scalar(ScalarType::Enum(def))
    }

    #[must_use]
    pub fn named(ident: impl Into<String>) -> Self {
        Self::Named(ident.into())
    }

    #[must_use]
    pub fn set(element: Self) -> Self {
        Self::Collection {
            kind: CollectionKind::Set,
            element: Box::new(element),
        }
    }

    #[must_use]
    pub fn list(element: Self) -> Self {
        Self::Collection {
            kind: CollectionKind::List,
            element: Box::new(element),
        }
    }

    #[must_use]
    pub fn map(key: Primitive, element: Self) -> Self {
        Self::Collection {
            kind: CollectionKind::Map { key },
            element: Box::new(element),
        }
    }
}

///
/// ScalarType
///

#[derive(Clone, Debug, PartialEq, Serialize)]
pub enum ScalarType {
    Primitive(Primitive),
    Enum(EnumDef),
}

impl ScalarType {
    /// The scalar's kind name, as matched by converter declarations.
    #[must_use]
    pub fn kind_ident(&self) -> String {
        match self {
            Self::Primitive(primitive) => primitive.to_string(),
            Self::Enum(def) => def.ident.clone(),
        }
    }
}

///
/// CollectionKind
///

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
pub enum CollectionKind {
    Set,
    List,
    Map { key: Primitive },
}
