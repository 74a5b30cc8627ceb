use crate::{Directive, MemberDef};
use serde::Serialize;

///
/// TypeDef
///
/// One annotated type as supplied by the graph source: an entity or an
/// embedded aggregate, its declared members, and its type-level directives.
///

#[derive(Clone, Debug, Serialize)]
pub struct TypeDef {
    pub ident: String,
    pub shape: TypeShape,
    pub kind: TypeKind,
    pub members: Vec<MemberDef>,
    pub directives: Vec<Directive>,
}

impl TypeDef {
    #[must_use]
    pub fn entity(ident: impl Into<String>) -> Self {
        Self {
            ident: ident.into(),
            shape: TypeShape::Concrete,
            kind: TypeKind::Entity { predefined: None },
            members: Vec::new(),
            directives: Vec::new(),
        }
    }

    #[must_use]
    pub fn aggregate(ident: impl Into<String>) -> Self {
        Self {
            ident: ident.into(),
            shape: TypeShape::Concrete,
            kind: TypeKind::Aggregate,
            members: Vec::new(),
            directives: Vec::new(),
        }
    }

    /// An entity whose population is the fixed instance set given here.
    #[must_use]
    pub fn pre_defined(ident: impl Into<String>, predefined: PreDefined) -> Self {
        Self {
            ident: ident.into(),
            shape: TypeShape::Concrete,
            kind: TypeKind::Entity {
                predefined: Some(predefined),
            },
            members: Vec::new(),
            directives: Vec::new(),
        }
    }

    #[must_use]
    pub const fn shape(mut self, shape: TypeShape) -> Self {
        self.shape = shape;
        self
    }

    #[must_use]
    pub fn member(mut self, member: MemberDef) -> Self {
        self.members.push(member);
        self
    }

    #[must_use]
    pub fn directive(mut self, directive: Directive) -> Self {
        self.directives.push(directive);
        self
    }

    #[must_use]
    pub const fn is_entity(&self) -> bool {
        matches!(self.kind, TypeKind::Entity { .. })
    }

    #[must_use]
    pub const fn predefined(&self) -> Option<&PreDefined> {
        match &self.kind {
            TypeKind::Entity { predefined } => predefined.as_ref(),
            TypeKind::Aggregate => None,
        }
    }
}

///
/// TypeShape
///

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
pub enum TypeShape {
    Concrete,
    Abstract,
    OpenGeneric,
}

///
/// TypeKind
///

#[derive(Clone, Debug, Serialize)]
pub enum TypeKind {
    Entity { predefined: Option<PreDefined> },
    Aggregate,
}

///
/// PreDefined
///
/// The frozen instance population of a pre-defined entity, plus the
/// construction facts the closure checker validates.
///

#[derive(Clone, Debug, Serialize)]
pub struct PreDefined {
    pub instances: Vec<InstanceDef>,
    pub public_constructor: bool,
}

impl PreDefined {
    #[must_use]
    pub fn new<I, S>(instances: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            instances: instances
                .into_iter()
                .map(|ident| InstanceDef {
                    ident: ident.into(),
                    writable: false,
                })
                .collect(),
            public_constructor: false,
        }
    }

    #[must_use]
    pub const fn with_public_constructor(mut self) -> Self {
        self.public_constructor = true;
        self
    }

    #[must_use]
    pub fn instance(mut self, instance: InstanceDef) -> Self {
        self.instances.push(instance);
        self
    }
}

///
/// InstanceDef
///

#[derive(Clone, Debug, Serialize)]
pub struct InstanceDef {
    pub ident: String,
    pub writable: bool,
}

impl InstanceDef {
    #[must_use]
    pub fn new(ident: impl Into<String>) -> Self {
        Self {
            ident: ident.into(),
            writable: false,
        }
    }

    #[must_use]
    pub const fn writable(mut self) -> Self {
        self.writable = true;
        self
    }
}

///
/// EnumDef
///
/// An enumerated scalar: symbolic variants with stable numeric values.
///

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct EnumDef {
    pub ident: String,
    pub variants: Vec<EnumVariant>,
}

impl EnumDef {
    #[must_use]
    pub fn new<I, S>(ident: impl Into<String>, variants: I) -> Self
    where
        I: IntoIterator<Item = (S, i64)>,
        S: Into<String>,
    {
        Self {
            ident: ident.into(),
            variants: variants
                .into_iter()
                .map(|(ident, value)| EnumVariant {
                    ident: ident.into(),
                    value,
                })
                .collect(),
        }
    }
}

///
/// EnumVariant
///

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct EnumVariant {
    pub ident: String,
    pub value: i64,
}
