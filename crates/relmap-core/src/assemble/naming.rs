//! Final name derivation and validation.
//!
//! Default names derive from the dotted source path; renames replace their
//! own segment. Every final name is checked for emptiness, reserved words,
//! and length ceilings before duplicate detection runs.

use crate::{
    error::{Location, Problem, TranslateError},
    options::{CompilerOptions, is_reserved},
};
use convert_case::Casing;

/// Derive a field's final name from its (ident, rename) segments.
#[must_use]
pub fn field_name(segments: &[(String, Option<String>)], options: &CompilerOptions) -> String {
    segments
        .iter()
        .map(|(ident, rename)| {
            rename
                .clone()
                .unwrap_or_else(|| derived(ident, options))
        })
        .collect::<Vec<_>>()
        .join(".")
}

// Renames are taken verbatim; only derived names are case-normalized.
fn derived(ident: &str, options: &CompilerOptions) -> String {
    options
        .name_case
        .map_or_else(|| ident.to_string(), |case| ident.to_case(case))
}

/// Validate a final field name.
pub fn check_field_name(
    name: &str,
    options: &CompilerOptions,
    location: &Location,
) -> Result<(), TranslateError> {
    if name.is_empty() {
        return Err(invalid(name, "the name is empty", location));
    }
    if name.len() > options.max_field_name_len {
        return Err(invalid(
            name,
            &format!("exceeds max length {}", options.max_field_name_len),
            location,
        ));
    }
    if options.check_reserved {
        for segment in name.split('.') {
            if is_reserved(segment) {
                return Err(invalid(
                    name,
                    &format!("the segment `{segment}` is reserved"),
                    location,
                ));
            }
        }
    }
    Ok(())
}

/// Validate a final table name.
pub fn check_table_name(
    name: &str,
    options: &CompilerOptions,
    location: &Location,
) -> Result<(), TranslateError> {
    if name.is_empty() {
        return Err(invalid(name, "the name is empty", location));
    }
    if name.len() > options.max_table_name_len {
        return Err(invalid(
            name,
            &format!("exceeds max length {}", options.max_table_name_len),
            location,
        ));
    }
    if options.check_reserved {
        for segment in name.split('.') {
            if is_reserved(segment) {
                return Err(invalid(
                    name,
                    &format!("the segment `{segment}` is reserved"),
                    location,
                ));
            }
        }
    }
    Ok(())
}

fn invalid(name: &str, reason: &str, location: &Location) -> TranslateError {
    TranslateError::new(
        location.clone(),
        Problem::InvalidName {
            name: name.to_string(),
            reason: reason.to_string(),
        },
    )
}
