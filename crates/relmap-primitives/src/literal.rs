use crate::Primitive;
use derive_more::Display;
use serde::{Deserialize, Serialize};
use std::{cmp::Ordering, fmt};
use thiserror::Error as ThisError;

///
/// Literal
///
/// A parsed annotation value: directive bounds, set members, defaults, and
/// pre-defined instance data all arrive as literals.
///
/// `Null` and `List` exist so that malformed directives can be reported with
/// the value that was actually supplied; they are rejected wherever a scalar
/// is required.
///

#[derive(Clone, Debug, Deserialize, Serialize)]
pub enum Literal {
    Bool(bool),
    Bytes(#[serde(with = "serde_bytes")] Vec<u8>),
    Float(f64),
    Int(i128),
    List(Vec<Literal>),
    Null,
    Text(String),
}

///
/// LiteralKind
///
/// Diagnostic tag for a literal, used in error messages.
///

#[derive(Clone, Copy, Debug, Display, Eq, PartialEq)]
pub enum LiteralKind {
    Bool,
    Bytes,
    Float,
    Int,
    List,
    Null,
    Text,
}

///
/// LiteralError
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum LiteralError {
    #[error("expected a {expected} value, found {found} `{value}`")]
    KindMismatch {
        expected: Primitive,
        found: LiteralKind,
        value: String,
    },

    #[error("value `{value}` is out of range for {expected}")]
    OutOfRange { expected: Primitive, value: String },

    #[error("`{value}` is not a valid {expected}")]
    Unparseable { expected: Primitive, value: String },

    #[error("a null value is not allowed where a scalar is required")]
    NullValue,

    #[error("a list value is not allowed where a scalar is required")]
    ListValue,
}

impl Literal {
    #[must_use]
    pub const fn kind(&self) -> LiteralKind {
        match self {
            Self::Bool(_) => LiteralKind::Bool,
            Self::Bytes(_) => LiteralKind::Bytes,
            Self::Float(_) => LiteralKind::Float,
            Self::Int(_) => LiteralKind::Int,
            Self::List(_) => LiteralKind::List,
            Self::Null => LiteralKind::Null,
            Self::Text(_) => LiteralKind::Text,
        }
    }

    #[must_use]
    pub const fn is_scalar(&self) -> bool {
        !matches!(self, Self::Null | Self::List(_))
    }

    /// Check this literal against a storage kind and return the canonical
    /// form used by interval math (integers widen to floats for float
    /// storage; everything else passes through unchanged).
    pub fn conform(&self, expected: Primitive) -> Result<Self, LiteralError> {
        match self {
            Self::Null => Err(LiteralError::NullValue),
            Self::List(_) => Err(LiteralError::ListValue),

            Self::Bool(_) if expected == Primitive::Bool => Ok(self.clone()),
            Self::Bytes(_) if expected == Primitive::Blob => Ok(self.clone()),

            Self::Int(v) => match expected.int_bounds() {
                Some((lo, hi)) if (lo..=hi).contains(v) => Ok(self.clone()),
                Some(_) => Err(LiteralError::OutOfRange {
                    expected,
                    value: self.to_string(),
                }),
                #[allow(clippy::cast_precision_loss)]
                None if expected.is_float() => Self::Float(*v as f64).conform(expected),
                None => Err(self.mismatch(expected)),
            },

            Self::Float(v) if expected.is_float() => {
                if !v.is_finite() {
                    return Err(LiteralError::OutOfRange {
                        expected,
                        value: self.to_string(),
                    });
                }
                if expected == Primitive::Float32 && v.abs() > f64::from(f32::MAX) {
                    return Err(LiteralError::OutOfRange {
                        expected,
                        value: self.to_string(),
                    });
                }
                Ok(self.clone())
            }

            Self::Text(_) if expected == Primitive::Text => Ok(self.clone()),

            Self::Text(v) if expected == Primitive::Ulid => {
                ulid::Ulid::from_string(v).map_err(|_| LiteralError::Unparseable {
                    expected,
                    value: v.clone(),
                })?;
                Ok(self.clone())
            }

            _ => Err(self.mismatch(expected)),
        }
    }

    fn mismatch(&self, expected: Primitive) -> LiteralError {
        LiteralError::KindMismatch {
            expected,
            found: self.kind(),
            value: self.to_string(),
        }
    }

    // Total order needs a stable rank across variants.
    const fn rank(&self) -> u8 {
        match self {
            Self::Null => 0,
            Self::Bool(_) => 1,
            Self::Int(_) => 2,
            Self::Float(_) => 3,
            Self::Text(_) => 4,
            Self::Bytes(_) => 5,
            Self::List(_) => 6,
        }
    }
}

impl PartialEq for Literal {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Literal {}

impl Ord for Literal {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Bool(a), Self::Bool(b)) => a.cmp(b),
            (Self::Bytes(a), Self::Bytes(b)) => a.cmp(b),
            // total_cmp keeps NaN orderable so sets stay well-formed
            (Self::Float(a), Self::Float(b)) => a.total_cmp(b),
            (Self::Int(a), Self::Int(b)) => a.cmp(b),
            (Self::List(a), Self::List(b)) => a.cmp(b),
            (Self::Text(a), Self::Text(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl PartialOrd for Literal {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(v) => write!(f, "{v}"),
            Self::Bytes(v) => write!(f, "<blob {} bytes>", v.len()),
            Self::Float(v) => write!(f, "{v}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
            Self::Null => write!(f, "null"),
            Self::Text(v) => write!(f, "\"{v}\""),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conform_checks_integer_bounds() {
        assert!(Literal::Int(200).conform(Primitive::Nat8).is_err());
        assert!(Literal::Int(200).conform(Primitive::Nat16).is_ok());
        assert!(Literal::Int(-1).conform(Primitive::Nat64).is_err());
        assert_eq!(
            Literal::Int(i128::from(i64::MAX)).conform(Primitive::Int64),
            Ok(Literal::Int(i128::from(i64::MAX)))
        );
    }

    #[test]
    fn conform_widens_ints_for_float_storage() {
        assert_eq!(
            Literal::Int(10).conform(Primitive::Float64),
            Ok(Literal::Float(10.0))
        );
    }

    #[test]
    fn conform_rejects_null_and_list() {
        assert_eq!(
            Literal::Null.conform(Primitive::Int32),
            Err(LiteralError::NullValue)
        );
        assert_eq!(
            Literal::List(vec![Literal::Int(1)]).conform(Primitive::Int32),
            Err(LiteralError::ListValue)
        );
    }

    #[test]
    fn conform_validates_ulid_text() {
        assert!(
            Literal::Text("01ARZ3NDEKTSV4RRFFQ69G5FAV".into())
                .conform(Primitive::Ulid)
                .is_ok()
        );
        assert!(
            Literal::Text("not-a-ulid".into())
                .conform(Primitive::Ulid)
                .is_err()
        );
    }

    #[test]
    fn ordering_is_total_within_kinds() {
        assert!(Literal::Int(1) < Literal::Int(2));
        assert!(Literal::Text("a".into()) < Literal::Text("b".into()));
        assert_eq!(
            Literal::Float(1.5).cmp(&Literal::Float(1.5)),
            Ordering::Equal
        );
    }

    #[test]
    fn display_quotes_text() {
        assert_eq!(Literal::Text("abc".into()).to_string(), "\"abc\"");
        assert_eq!(Literal::Int(5).to_string(), "5");
    }
}
