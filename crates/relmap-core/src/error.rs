use serde::Serialize;
use std::fmt;
use thiserror::Error as ThisError;

///
/// Location
///
/// Arrow-joined trail of type and member names leading to the offending
/// node. Bubbled relation members that have no direct source member on the
/// entity are rendered as bracketed synthetic segments.
///

#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize)]
pub struct Location {
    segments: Vec<String>,
}

impl Location {
    #[must_use]
    pub fn root(ident: impl Into<String>) -> Self {
        Self {
            segments: vec![ident.into()],
        }
    }

    #[must_use]
    pub fn child(&self, segment: impl Into<String>) -> Self {
        let mut segments = self.segments.clone();
        segments.push(segment.into());
        Self { segments }
    }

    /// Synthetic marker segment for a relation bubbled out of a nested
    /// structure.
    #[must_use]
    pub fn synthetic(&self, path: &str) -> Self {
        self.child(format!("[{path}]"))
    }

    #[must_use]
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Prepend another trail, used when a nested type's failure propagates
    /// through the referencing chain.
    #[must_use]
    pub fn prefixed(&self, prefix: &Self) -> Self {
        let mut segments = prefix.segments.clone();
        segments.extend(self.segments.iter().cloned());
        Self { segments }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.segments.join(" -> "))
    }
}

///
/// Problem
///
/// The fixed error vocabulary. Consumers match on these variants; the
/// rendered messages are part of the compatibility surface.
///

#[derive(Clone, Debug, Eq, PartialEq, Serialize, ThisError)]
pub enum Problem {
    #[error("the type `{ident}` is not defined in the type graph")]
    UnknownType { ident: String },

    #[error("{category} cannot be translated")]
    InvalidEntityShape { category: String },

    #[error("expected at least {expected} model members, but found {found}")]
    NotEnoughMembers { expected: usize, found: usize },

    #[error("expected at least {expected} fields, but found {found}")]
    NotEnoughFields { expected: usize, found: usize },

    #[error("{reason} cannot participate in the model")]
    InvalidMemberInModel { reason: String },

    #[error("directives `{a}` and `{b}` are mutually exclusive on one target")]
    ConflictingAnnotations { a: String, b: String },

    #[error("directive `{directive}` is repeated with a different effect")]
    DuplicateAnnotation { directive: String },

    #[error("a path is required but none was supplied")]
    NullPath,

    #[error("the path \"{path}\" does not exist")]
    PathDoesNotExist { path: String },

    #[error("the path \"{path}\" must begin with the anchor segment `{anchor}`")]
    PathOutsideAnchor { path: String, anchor: String },

    #[error("the path \"{path}\" addresses a non-primary-key member of the referenced type")]
    PathBeyondReferenceKey { path: String },

    #[error("invalid name `{name}`: {reason}")]
    InvalidName { name: String, reason: String },

    #[error("duplicate name `{name}` produced by `{first}` and `{second}`")]
    DuplicateName {
        name: String,
        first: String,
        second: String,
    },

    #[error("directive `{directive}` does not apply to {kind}")]
    InapplicableAnnotation {
        directive: String,
        kind: String,
    },

    #[error("a relation cannot appear within another relation's element type")]
    RelationInRelation,

    #[error("the container cannot be marked nullable: every leaf is already nullable")]
    AmbiguousNullable,

    #[error("invalid constraint value: {detail}")]
    InvalidConstraintValue { detail: String },

    #[error("unsatisfiable constraint: {detail}")]
    UnsatisfiableConstraint { detail: String },

    #[error("invalid default value: {detail}")]
    InvalidDefault { detail: String },

    #[error("the default value {value} is invalidated by the field's constraint")]
    InvalidatedDefault { value: String },

    #[error("invalid data converter `{ident}`: {detail}")]
    InvalidDataConverter { ident: String, detail: String },

    #[error("primary key field `{field}` must not be nullable")]
    PrimaryKeyNullable { field: String },

    #[error("could not deduce a primary key: {detail}")]
    CouldNotDeduceKey { detail: String },

    #[error("the pre-defined entity reaches the non-pre-defined entity `{target}`")]
    PreDefinedReference { target: String },

    #[error("expected at least 2 pre-defined instances, but found {found}")]
    NotEnoughInstances { found: usize },

    #[error("invalid pre-defined instance: {detail}")]
    InvalidPreDefinedInstance { detail: String },
}

///
/// TranslateError
///
/// The single structured failure carried out of a translation: where it
/// happened, which path string was at fault (when relevant), what went
/// wrong, and which directives were implicated. Tests match on the four
/// fields independently.
///

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct TranslateError {
    pub location: Location,
    pub path: Option<String>,
    pub problem: Problem,
    pub directives: Vec<String>,
}

impl TranslateError {
    #[must_use]
    pub fn new(location: Location, problem: Problem) -> Self {
        Self {
            location,
            path: None,
            problem,
            directives: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    #[must_use]
    pub fn with_directive(mut self, directive: &str) -> Self {
        if !self.directives.iter().any(|d| d == directive) {
            self.directives.push(directive.to_string());
        }
        self
    }

    /// Prefix the location trail with the referencing chain; used when a
    /// nested type's failure propagates upward.
    #[must_use]
    pub fn prefixed(mut self, prefix: &Location) -> Self {
        self.location = self.location.prefixed(prefix);
        self
    }
}

impl fmt::Display for TranslateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.location, self.problem)?;
        if let Some(path) = &self.path {
            write!(f, " (path \"{path}\")")?;
        }
        if !self.directives.is_empty() {
            write!(f, " [{}]", self.directives.join(", "))?;
        }
        Ok(())
    }
}

impl std::error::Error for TranslateError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.problem)
    }
}
