use derive_more::Display;
use relmap_primitives::{Literal, Primitive};
use serde::Serialize;

///
/// Directive
///
/// One structured annotation record, already parsed from whatever surface
/// syntax carried it: a kind, an optional dotted path selecting a nested
/// target, an optional name, and literal arguments.
///

#[derive(Clone, Debug, Serialize)]
pub struct Directive {
    pub kind: DirectiveKind,
    pub path: Option<String>,
    pub name: Option<String>,
    pub values: Vec<Literal>,
}

impl Directive {
    #[must_use]
    pub const fn new(kind: DirectiveKind) -> Self {
        Self {
            kind,
            path: None,
            name: None,
            values: Vec::new(),
        }
    }

    #[must_use]
    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn value(mut self, value: Literal) -> Self {
        self.values.push(value);
        self
    }

    #[must_use]
    pub fn values<I: IntoIterator<Item = Literal>>(mut self, values: I) -> Self {
        self.values.extend(values);
        self
    }

    //
    // convenience constructors for the common directives
    //

    #[must_use]
    pub const fn include() -> Self {
        Self::new(DirectiveKind::Include)
    }

    #[must_use]
    pub const fn exclude() -> Self {
        Self::new(DirectiveKind::Exclude)
    }

    #[must_use]
    pub const fn key() -> Self {
        Self::new(DirectiveKind::Key)
    }

    #[must_use]
    pub const fn primary_key() -> Self {
        Self::new(DirectiveKind::PrimaryKey)
    }

    #[must_use]
    pub const fn non_null() -> Self {
        Self::new(DirectiveKind::NonNull)
    }

    #[must_use]
    pub const fn nullable() -> Self {
        Self::new(DirectiveKind::Nullable)
    }

    #[must_use]
    pub fn rename(name: impl Into<String>) -> Self {
        Self::new(DirectiveKind::Rename).named(name)
    }

    #[must_use]
    pub fn default_value(value: Literal) -> Self {
        Self::new(DirectiveKind::Default).value(value)
    }

    #[must_use]
    pub fn greater_than(value: Literal) -> Self {
        Self::new(DirectiveKind::Compare(CompareOp::Gt)).value(value)
    }

    #[must_use]
    pub fn greater_or_equal(value: Literal) -> Self {
        Self::new(DirectiveKind::Compare(CompareOp::Ge)).value(value)
    }

    #[must_use]
    pub fn less_than(value: Literal) -> Self {
        Self::new(DirectiveKind::Compare(CompareOp::Lt)).value(value)
    }

    #[must_use]
    pub fn less_or_equal(value: Literal) -> Self {
        Self::new(DirectiveKind::Compare(CompareOp::Le)).value(value)
    }

    #[must_use]
    pub fn one_of<I: IntoIterator<Item = Literal>>(values: I) -> Self {
        Self::new(DirectiveKind::OneOf).values(values)
    }

    #[must_use]
    pub fn none_of<I: IntoIterator<Item = Literal>>(values: I) -> Self {
        Self::new(DirectiveKind::NoneOf).values(values)
    }

    #[must_use]
    pub fn max_length(value: Literal) -> Self {
        Self::new(DirectiveKind::Length(CompareOp::Le)).value(value)
    }

    #[must_use]
    pub fn min_length(value: Literal) -> Self {
        Self::new(DirectiveKind::Length(CompareOp::Ge)).value(value)
    }
}

///
/// DirectiveKind
///

#[derive(Clone, Debug, PartialEq, Serialize)]
pub enum DirectiveKind {
    /// Force a member into the model.
    Include,
    /// Force a member out of the model.
    Exclude,
    /// Candidate-key membership; a shared `name` accumulates a group.
    Key,
    /// Explicit primary-key membership.
    PrimaryKey,
    /// Override native nullability on a leaf scalar.
    NonNull,
    /// Mark an aggregate or reference container nullable.
    Nullable,
    /// Default value for the targeted field.
    Default,
    /// Override the derived name for the targeted subtree.
    Rename,
    /// Comparison bound against the directive's single value.
    Compare(CompareOp),
    /// Inclusion value set.
    OneOf,
    /// Exclusion value set.
    NoneOf,
    /// String/blob length bound.
    Length(CompareOp),
    /// Signedness constraint on numeric storage.
    NonNegative,
    /// Storage form for an enumerated scalar.
    EnumStorage(EnumRepr),
    /// Declared data converter for a scalar member.
    Convert(ConverterDef),
}

impl DirectiveKind {
    /// Stable directive name used in error reports.
    #[must_use]
    pub const fn ident(&self) -> &'static str {
        match self {
            Self::Include => "Include",
            Self::Exclude => "Exclude",
            Self::Key => "Key",
            Self::PrimaryKey => "PrimaryKey",
            Self::NonNull => "NonNull",
            Self::Nullable => "Nullable",
            Self::Default => "Default",
            Self::Rename => "Rename",
            Self::Compare(_) => "Compare",
            Self::OneOf => "OneOf",
            Self::NoneOf => "NoneOf",
            Self::Length(_) => "Length",
            Self::NonNegative => "NonNegative",
            Self::EnumStorage(_) => "EnumStorage",
            Self::Convert(_) => "Convert",
        }
    }
}

///
/// CompareOp
///

#[derive(Clone, Copy, Debug, Display, Eq, PartialEq, Serialize)]
pub enum CompareOp {
    #[display(">")]
    Gt,
    #[display(">=")]
    Ge,
    #[display("<")]
    Lt,
    #[display("<=")]
    Le,
}

///
/// EnumRepr
///
/// The two native storage forms of an enumerated scalar.
///

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize)]
pub enum EnumRepr {
    /// Store the numeric variant value (Int32).
    #[default]
    Numeric,
    /// Store the symbolic variant name (Text).
    Symbolic,
}

///
/// ConverterDef
///
/// A declared to-storage/from-storage function pair. `source` names the
/// scalar kind the converter accepts; `storage` is what it produces.
///

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct ConverterDef {
    pub ident: String,
    pub source: String,
    pub storage: Primitive,
}

impl ConverterDef {
    #[must_use]
    pub fn new(
        ident: impl Into<String>,
        source: impl Into<String>,
        storage: Primitive,
    ) -> Self {
        Self {
            ident: ident.into(),
            source: source.into(),
            storage,
        }
    }
}
