//! Constraint composition: every directive touching a field is normalized
//! into intervals and value sets, intersected, and checked for
//! satisfiability; defaults are validated against the composed result.

pub mod interval;

use crate::{
    error::{Location, Problem, TranslateError},
    resolve::tree::FlatLeaf,
    schema::{Bound, ConstraintKind, ScalarFunction},
};
use interval::Interval;
use relmap_model::{CompareOp, DirectiveKind};
use relmap_primitives::{Literal, Primitive};
use std::collections::BTreeSet;

///
/// ComposedLeaf
///
/// One field's fully composed constraint parts plus its validated default.
///

#[derive(Clone, Debug, Default)]
pub struct ComposedLeaf {
    pub parts: Vec<(Option<ScalarFunction>, ConstraintKind)>,
    pub default: Option<Literal>,
}

/// Compose every flattened leaf of an entity, reporting failures at the
/// leaf's fully-qualified location.
pub fn compose_all(
    entity_ident: &str,
    leaves: &[FlatLeaf],
) -> Result<Vec<ComposedLeaf>, TranslateError> {
    let root = Location::root(entity_ident.to_string());

    leaves
        .iter()
        .map(|leaf| {
            let location = leaf
                .source_path
                .split('.')
                .fold(root.clone(), |loc, seg| loc.child(seg.to_string()));
            compose(leaf, &location)
        })
        .collect()
}

/// Compose all constraint directives gathered on one leaf.
pub fn compose(leaf: &FlatLeaf, location: &Location) -> Result<ComposedLeaf, TranslateError> {
    let storage = leaf.storage;

    let mut range = Interval::full();
    let mut length = Interval::full();
    let mut include: Option<BTreeSet<Literal>> = None;
    let mut exclude: BTreeSet<Literal> = BTreeSet::new();
    let mut saw_exclude = false;

    for constraint in &leaf.constraints {
        let directive = constraint.directive;

        match &constraint.kind {
            DirectiveKind::Compare(op) => {
                require_ord(storage, directive, location)?;
                let value = conform_constraint(
                    single(constraint.values.as_slice(), directive, location)?,
                    storage,
                    directive,
                    location,
                )?;
                apply_bound(&mut range, *op, value);
                if range.is_empty() {
                    return Err(unsatisfiable(
                        format!("the interval {} is empty", range.render()),
                        directive,
                        location,
                    ));
                }
            }

            DirectiveKind::Length(op) => {
                if !storage.supports_length() {
                    return Err(inapplicable(storage, directive, location));
                }
                let value = length_value(
                    single(constraint.values.as_slice(), directive, location)?,
                    directive,
                    location,
                )?;
                apply_bound(&mut length, *op, value);
                if length.is_empty() {
                    return Err(unsatisfiable(
                        format!("the length interval {} is empty", length.render()),
                        directive,
                        location,
                    ));
                }
            }

            DirectiveKind::OneOf => {
                let mut set = BTreeSet::new();
                for value in &constraint.values {
                    set.insert(conform_constraint(value, storage, directive, location)?);
                }
                let merged = match include.take() {
                    None => set,
                    Some(prev) => prev.intersection(&set).cloned().collect(),
                };
                if merged.is_empty() {
                    return Err(unsatisfiable(
                        "the inclusion set is empty".to_string(),
                        directive,
                        location,
                    ));
                }
                include = Some(merged);
            }

            DirectiveKind::NoneOf => {
                saw_exclude = true;
                for value in &constraint.values {
                    exclude.insert(conform_constraint(value, storage, directive, location)?);
                }
            }

            DirectiveKind::NonNegative => {
                if !storage.is_numeric() {
                    return Err(inapplicable(storage, directive, location));
                }
                // already implied on unsigned storage
                if storage.is_signed_int() || storage.is_float() || storage == Primitive::Date {
                    let zero = if storage.is_float() {
                        Literal::Float(0.0)
                    } else {
                        Literal::Int(0)
                    };
                    range.tighten_lo(zero, true);
                    if range.is_empty() {
                        return Err(unsatisfiable(
                            format!("the interval {} is empty", range.render()),
                            directive,
                            location,
                        ));
                    }
                }
            }

            _ => unreachable!("only constraint directives are gathered onto leaves"),
        }
    }

    // Intersect the inclusion set with everything else, or fold exclusions
    // into the interval.
    if let Some(set) = include.take() {
        let filtered: BTreeSet<Literal> = set
            .into_iter()
            .filter(|v| range.contains(v) && length_contains(&length, v) && !exclude.contains(v))
            .collect();
        if filtered.is_empty() {
            let mut err = unsatisfiable(
                "the inclusion set is empty after filtering".to_string(),
                "OneOf",
                location,
            );
            if saw_exclude {
                err = err.with_directive("NoneOf");
            }
            return Err(err);
        }
        include = Some(filtered);
        exclude.clear();
    } else if !exclude.is_empty() {
        let mut residual = BTreeSet::new();
        for value in std::mem::take(&mut exclude) {
            if !range.contains(&value) || !length_contains(&length, &value) {
                // already outside the allowed region; silently absorbed
                continue;
            }
            if !range.exclude_endpoint(&value) {
                residual.insert(value);
            }
        }
        if range.is_empty() {
            return Err(unsatisfiable(
                format!("the interval {} is empty", range.render()),
                "NoneOf",
                location,
            ));
        }
        exclude = residual;
    }

    let default = validate_default(leaf, storage, &range, &length, include.as_ref(), &exclude, location)?;

    let mut parts = Vec::new();
    if !range.is_full() {
        parts.push((None, range_kind(&range)));
    }
    if !length.is_full() {
        parts.push((Some(ScalarFunction::Length), range_kind(&length)));
    }
    if let Some(set) = include {
        parts.push((
            None,
            ConstraintKind::OneOf {
                values: set.into_iter().collect(),
            },
        ));
    } else if !exclude.is_empty() {
        parts.push((
            None,
            ConstraintKind::NoneOf {
                values: exclude.into_iter().collect(),
            },
        ));
    }

    Ok(ComposedLeaf { parts, default })
}

fn validate_default(
    leaf: &FlatLeaf,
    storage: Primitive,
    range: &Interval,
    length: &Interval,
    include: Option<&BTreeSet<Literal>>,
    exclude: &BTreeSet<Literal>,
    location: &Location,
) -> Result<Option<Literal>, TranslateError> {
    let Some(raw) = &leaf.default else {
        return Ok(None);
    };

    let value = raw.conform(storage).map_err(|e| {
        TranslateError::new(
            location.clone(),
            Problem::InvalidDefault {
                detail: e.to_string(),
            },
        )
        .with_directive("Default")
    })?;

    let satisfied = range.contains(&value)
        && length_contains(length, &value)
        && include.is_none_or(|set| set.contains(&value))
        && !exclude.contains(&value);

    if !satisfied {
        return Err(TranslateError::new(
            location.clone(),
            Problem::InvalidatedDefault {
                value: value.to_string(),
            },
        )
        .with_directive("Default"));
    }

    Ok(Some(value))
}

fn apply_bound(interval: &mut Interval, op: CompareOp, value: Literal) {
    match op {
        CompareOp::Gt => interval.tighten_lo(value, false),
        CompareOp::Ge => interval.tighten_lo(value, true),
        CompareOp::Lt => interval.tighten_hi(value, false),
        CompareOp::Le => interval.tighten_hi(value, true),
    }
}

fn range_kind(interval: &Interval) -> ConstraintKind {
    ConstraintKind::Range {
        min: interval.lo.as_ref().map(|e| Bound {
            value: e.value.clone(),
            inclusive: e.inclusive,
        }),
        max: interval.hi.as_ref().map(|e| Bound {
            value: e.value.clone(),
            inclusive: e.inclusive,
        }),
    }
}

// Text lengths count characters; blob lengths count bytes.
fn length_contains(length: &Interval, value: &Literal) -> bool {
    if length.is_full() {
        return true;
    }
    let len = match value {
        Literal::Text(s) => s.chars().count(),
        Literal::Bytes(b) => b.len(),
        _ => return true,
    };
    length.contains(&Literal::Int(len as i128))
}

fn conform_constraint(
    value: &Literal,
    storage: Primitive,
    directive: &'static str,
    location: &Location,
) -> Result<Literal, TranslateError> {
    value.conform(storage).map_err(|e| {
        TranslateError::new(
            location.clone(),
            Problem::InvalidConstraintValue {
                detail: e.to_string(),
            },
        )
        .with_directive(directive)
    })
}

fn length_value(
    value: &Literal,
    directive: &'static str,
    location: &Location,
) -> Result<Literal, TranslateError> {
    match value {
        Literal::Int(n) if *n >= 0 => Ok(Literal::Int(*n)),
        other => Err(TranslateError::new(
            location.clone(),
            Problem::InvalidConstraintValue {
                detail: format!(
                    "length bounds must be non-negative integers, found {} `{other}`",
                    other.kind()
                ),
            },
        )
        .with_directive(directive)),
    }
}

fn single<'v>(
    values: &'v [Literal],
    directive: &'static str,
    location: &Location,
) -> Result<&'v Literal, TranslateError> {
    match values {
        [value] => Ok(value),
        _ => Err(TranslateError::new(
            location.clone(),
            Problem::InvalidConstraintValue {
                detail: format!("expected exactly one value, found {}", values.len()),
            },
        )
        .with_directive(directive)),
    }
}

fn require_ord(
    storage: Primitive,
    directive: &'static str,
    location: &Location,
) -> Result<(), TranslateError> {
    if storage.supports_ord() {
        Ok(())
    } else {
        Err(inapplicable(storage, directive, location))
    }
}

fn inapplicable(
    storage: Primitive,
    directive: &'static str,
    location: &Location,
) -> TranslateError {
    TranslateError::new(
        location.clone(),
        Problem::InapplicableAnnotation {
            directive: directive.to_string(),
            kind: format!("storage kind {storage}"),
        },
    )
    .with_directive(directive)
}

fn unsatisfiable(detail: String, directive: &'static str, location: &Location) -> TranslateError {
    TranslateError::new(
        location.clone(),
        Problem::UnsatisfiableConstraint { detail },
    )
    .with_directive(directive)
}
