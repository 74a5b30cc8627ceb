use derive_more::{Display, FromStr};
use serde::{Deserialize, Serialize};

///
/// Primitive
///
/// The fixed set of storage kinds a compiled field can take.
///

#[derive(
    Clone, Copy, Debug, Deserialize, Display, Eq, FromStr, Hash, PartialEq, Serialize,
)]
#[remain::sorted]
pub enum Primitive {
    Blob,
    Bool,
    Date,
    Float32,
    Float64,
    Int8,
    Int16,
    Int32,
    Int64,
    Nat8,
    Nat16,
    Nat32,
    Nat64,
    Text,
    Timestamp,
    Ulid,
}

impl Primitive {
    #[must_use]
    pub const fn is_float(self) -> bool {
        matches!(self, Self::Float32 | Self::Float64)
    }

    #[must_use]
    pub const fn is_signed_int(self) -> bool {
        matches!(self, Self::Int8 | Self::Int16 | Self::Int32 | Self::Int64)
    }

    #[must_use]
    pub const fn is_unsigned_int(self) -> bool {
        matches!(self, Self::Nat8 | Self::Nat16 | Self::Nat32 | Self::Nat64)
    }

    #[must_use]
    pub const fn is_int(self) -> bool {
        self.is_signed_int() || self.is_unsigned_int()
    }

    // is_numeric
    // Date and Timestamp count: they store as bounded integers.
    #[must_use]
    pub const fn is_numeric(self) -> bool {
        self.is_int() || self.is_float() || self.is_temporal()
    }

    #[must_use]
    pub const fn is_temporal(self) -> bool {
        matches!(self, Self::Date | Self::Timestamp)
    }

    /// Whether length constraints ("length of") apply to this storage kind.
    #[must_use]
    pub const fn supports_length(self) -> bool {
        matches!(self, Self::Blob | Self::Text)
    }

    /// Whether values of this kind carry a total order usable in intervals.
    #[must_use]
    pub const fn supports_ord(self) -> bool {
        !matches!(self, Self::Blob)
    }

    /// Inclusive integer bounds for integral storage kinds.
    #[must_use]
    pub const fn int_bounds(self) -> Option<(i128, i128)> {
        match self {
            Self::Int8 => Some((i8::MIN as i128, i8::MAX as i128)),
            Self::Int16 => Some((i16::MIN as i128, i16::MAX as i128)),
            Self::Int32 => Some((i32::MIN as i128, i32::MAX as i128)),
            Self::Int64 => Some((i64::MIN as i128, i64::MAX as i128)),
            Self::Nat8 => Some((0, u8::MAX as i128)),
            Self::Nat16 => Some((0, u16::MAX as i128)),
            Self::Nat32 => Some((0, u32::MAX as i128)),
            Self::Nat64 => Some((0, u64::MAX as i128)),
            // days relative to the epoch, stored as Int32
            Self::Date => Some((i32::MIN as i128, i32::MAX as i128)),
            // nanoseconds since the epoch, stored as Nat64
            Self::Timestamp => Some((0, u64::MAX as i128)),
            _ => None,
        }
    }
}
