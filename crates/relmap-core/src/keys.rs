//! Candidate-key grouping and primary-key deduction.

use crate::{
    error::{Location, Problem, TranslateError},
    options::CompilerOptions,
    resolve::tree::{FlatLeaf, KeyApp},
    schema::PrimaryKeySource,
};
use std::collections::{BTreeMap, BTreeSet};

///
/// DeducedKey
///
/// A key over leaf source paths; final field names are assigned during
/// assembly.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DeducedKey {
    pub name: Option<String>,
    pub paths: Vec<String>,
}

impl DeducedKey {
    fn path_set(&self) -> BTreeSet<&str> {
        self.paths.iter().map(String::as_str).collect()
    }
}

///
/// KeySet
///

#[derive(Clone, Debug)]
pub struct KeySet {
    pub candidates: Vec<DeducedKey>,
    pub primary: DeducedKey,
    pub primary_source: PrimaryKeySource,
}

/// Group, collapse, and deduce the keys of one entity.
pub fn deduce(
    entity_ident: &str,
    leaves: &[FlatLeaf],
    apps: &[KeyApp],
    options: &CompilerOptions,
) -> Result<KeySet, TranslateError> {
    let location = Location::root(entity_ident.to_string());

    // A key that resolved to no fields went through a cyclic identity
    // placeholder; such a key cannot be satisfied.
    for app in apps {
        if app.paths.is_empty() {
            return Err(TranslateError::new(
                location.clone(),
                Problem::CouldNotDeduceKey {
                    detail: "the primary key transitively depends on itself".to_string(),
                },
            )
            .with_directive(app.directive));
        }
    }

    let nullable: BTreeMap<&str, bool> = leaves
        .iter()
        .map(|l| (l.source_path.as_str(), l.nullable))
        .collect();

    let candidates = collapse(group(apps));

    let (primary, primary_source) = if apps.iter().any(|a| a.primary) {
        declared_primary(apps, &candidates, &nullable, &location)?
    } else {
        deduced_primary(entity_ident, leaves, &candidates, &location, options)?
    };

    Ok(KeySet {
        candidates,
        primary,
        primary_source,
    })
}

// Phase 1: accumulate named groups, one fresh group per anonymous directive.
fn group(apps: &[KeyApp]) -> Vec<DeducedKey> {
    let mut groups: Vec<DeducedKey> = Vec::new();

    for app in apps.iter().filter(|a| !a.primary) {
        if let Some(name) = &app.name
            && let Some(existing) = groups
                .iter_mut()
                .find(|g| g.name.as_deref() == Some(name.as_str()))
        {
            for path in &app.paths {
                if !existing.paths.contains(path) {
                    existing.paths.push(path.clone());
                }
            }
            continue;
        }

        let mut paths = Vec::new();
        for path in &app.paths {
            if !paths.contains(path) {
                paths.push(path.clone());
            }
        }
        groups.push(DeducedKey {
            name: app.name.clone(),
            paths,
        });
    }

    groups
}

// Phase 2: identical final field-sets collapse; the first name wins.
fn collapse(groups: Vec<DeducedKey>) -> Vec<DeducedKey> {
    let mut collapsed: Vec<DeducedKey> = Vec::new();

    for key in groups {
        let set = key.path_set();
        if let Some(existing) = collapsed.iter_mut().find(|c| c.path_set() == set) {
            if existing.name.is_none() {
                existing.name = key.name;
            }
        } else {
            collapsed.push(key);
        }
    }

    collapsed
}

// Selection step 1: explicit primary-key directives.
fn declared_primary(
    apps: &[KeyApp],
    candidates: &[DeducedKey],
    nullable: &BTreeMap<&str, bool>,
    location: &Location,
) -> Result<(DeducedKey, PrimaryKeySource), TranslateError> {
    let mut paths: Vec<String> = Vec::new();
    let mut name: Option<String> = None;

    for app in apps.iter().filter(|a| a.primary) {
        for path in &app.paths {
            if !paths.contains(path) {
                paths.push(path.clone());
            }
        }
        match (&name, &app.name) {
            (None, Some(n)) => name = Some(n.clone()),
            (Some(existing), Some(n)) if existing != n => {
                return Err(TranslateError::new(
                    location.clone(),
                    Problem::DuplicateAnnotation {
                        directive: "PrimaryKey".to_string(),
                    },
                )
                .with_directive("PrimaryKey"));
            }
            _ => {}
        }
    }

    for path in &paths {
        if nullable.get(path.as_str()).copied().unwrap_or(true) {
            return Err(TranslateError::new(
                location.clone(),
                Problem::PrimaryKeyNullable { field: path.clone() },
            )
            .with_directive("PrimaryKey"));
        }
    }

    let key = DeducedKey { name, paths };

    // A declared name may coincide with a candidate only when the field-sets
    // agree; otherwise two keys would answer to one name.
    if let Some(name) = &key.name
        && let Some(clash) = candidates
            .iter()
            .find(|c| c.name.as_deref() == Some(name.as_str()))
        && clash.path_set() != key.path_set()
    {
        return Err(TranslateError::new(
            location.clone(),
            Problem::DuplicateName {
                name: name.clone(),
                first: format!("candidate key ({})", clash.paths.join(", ")),
                second: format!("primary key ({})", key.paths.join(", ")),
            },
        )
        .with_directive("PrimaryKey"));
    }

    Ok((key, PrimaryKeySource::Declared))
}

// Selection steps 2 and 3: promotion, then the naming conventions.
fn deduced_primary(
    entity_ident: &str,
    leaves: &[FlatLeaf],
    candidates: &[DeducedKey],
    location: &Location,
    options: &CompilerOptions,
) -> Result<(DeducedKey, PrimaryKeySource), TranslateError> {
    let nullable: BTreeMap<&str, bool> = leaves
        .iter()
        .map(|l| (l.source_path.as_str(), l.nullable))
        .collect();

    let eligible: Vec<&DeducedKey> = candidates
        .iter()
        .filter(|c| {
            c.paths
                .iter()
                .all(|p| !nullable.get(p.as_str()).copied().unwrap_or(true))
        })
        .collect();

    if eligible.len() == 1 {
        return Ok((eligible[0].clone(), PrimaryKeySource::Promoted));
    }

    let conventions = [
        options.identity_ident.clone(),
        format!("{entity_ident}{}", options.identity_ident),
    ];

    for convention in &conventions {
        let matches: Vec<&FlatLeaf> = leaves
            .iter()
            .filter(|l| {
                l.top_level_scalar
                    && !l.nullable
                    && l.source_path.eq_ignore_ascii_case(convention)
            })
            .collect();

        match matches.len() {
            0 => {}
            1 => {
                let path = matches[0].source_path.clone();
                // reuse a declared candidate over the same single field
                let key = candidates
                    .iter()
                    .find(|c| c.paths.len() == 1 && c.paths[0] == path)
                    .cloned()
                    .unwrap_or(DeducedKey {
                        name: None,
                        paths: vec![path],
                    });
                return Ok((key, PrimaryKeySource::Deduced));
            }
            _ => {
                return Err(TranslateError::new(
                    location.clone(),
                    Problem::CouldNotDeduceKey {
                        detail: format!(
                            "multiple fields match the identity convention `{convention}`"
                        ),
                    },
                ));
            }
        }
    }

    Err(TranslateError::new(
        location.clone(),
        Problem::CouldNotDeduceKey {
            detail: "no candidate key qualifies and no field matches the identity conventions"
                .to_string(),
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use relmap_primitives::Primitive;

    fn leaf(path: &str, nullable: bool) -> FlatLeaf {
        FlatLeaf {
            source_path: path.to_string(),
            segments: vec![(path.to_string(), None)],
            storage: Primitive::Int32,
            nullable,
            non_null_native: !nullable,
            from_reference: false,
            top_level_scalar: !path.contains('.'),
            default: None,
            constraints: Vec::new(),
        }
    }

    fn app(name: Option<&str>, paths: &[&str], primary: bool) -> KeyApp {
        KeyApp {
            name: name.map(str::to_string),
            primary,
            paths: paths.iter().map(|p| (*p).to_string()).collect(),
            directive: if primary { "PrimaryKey" } else { "Key" },
        }
    }

    #[test]
    fn named_groups_accumulate_across_directives() {
        let leaves = vec![leaf("A", false), leaf("B", false)];
        let apps = vec![
            app(Some("K"), &["A"], false),
            app(Some("K"), &["B"], false),
        ];

        let keys = deduce("T", &leaves, &apps, &CompilerOptions::default()).unwrap();
        assert_eq!(keys.candidates.len(), 1);
        assert_eq!(keys.candidates[0].name.as_deref(), Some("K"));
        assert_eq!(keys.candidates[0].paths, vec!["A", "B"]);
        // the single all-non-nullable candidate is promoted
        assert_eq!(keys.primary_source, PrimaryKeySource::Promoted);
        assert_eq!(keys.primary.paths, vec!["A", "B"]);
    }

    #[test]
    fn identical_field_sets_collapse_and_keep_the_first_name() {
        let leaves = vec![leaf("A", false), leaf("B", false)];
        let apps = vec![
            app(None, &["A", "B"], false),
            app(Some("K"), &["B", "A"], false),
        ];

        let keys = deduce("T", &leaves, &apps, &CompilerOptions::default()).unwrap();
        assert_eq!(keys.candidates.len(), 1);
        assert_eq!(keys.candidates[0].name.as_deref(), Some("K"));
    }

    #[test]
    fn declared_primary_rejects_nullable_fields() {
        let leaves = vec![leaf("A", true), leaf("B", false)];
        let apps = vec![app(None, &["A"], true)];

        let err = deduce("T", &leaves, &apps, &CompilerOptions::default()).unwrap_err();
        assert_eq!(
            err.problem,
            Problem::PrimaryKeyNullable {
                field: "A".to_string()
            }
        );
        assert_eq!(err.directives, vec!["PrimaryKey".to_string()]);
    }

    #[test]
    fn named_primary_colliding_with_a_different_candidate_errors() {
        let leaves = vec![leaf("A", false), leaf("B", false)];
        let apps = vec![
            app(Some("K"), &["A"], false),
            app(Some("K"), &["B"], true),
        ];

        let err = deduce("T", &leaves, &apps, &CompilerOptions::default()).unwrap_err();
        assert!(matches!(err.problem, Problem::DuplicateName { .. }));
    }

    #[test]
    fn named_primary_matching_a_candidate_set_is_redundant() {
        let leaves = vec![leaf("A", false), leaf("B", false)];
        let apps = vec![
            app(Some("K"), &["A"], false),
            app(Some("K"), &["A"], true),
        ];

        let keys = deduce("T", &leaves, &apps, &CompilerOptions::default()).unwrap();
        assert_eq!(keys.primary_source, PrimaryKeySource::Declared);
        assert_eq!(keys.primary.paths, vec!["A"]);
    }

    #[test]
    fn nullable_candidates_are_ignored_for_promotion() {
        let leaves = vec![leaf("A", true), leaf("Id", false)];
        let apps = vec![app(None, &["A"], false)];

        let keys = deduce("T", &leaves, &apps, &CompilerOptions::default()).unwrap();
        // the nullable candidate is skipped; the Id convention takes over
        assert_eq!(keys.primary_source, PrimaryKeySource::Deduced);
        assert_eq!(keys.primary.paths, vec!["Id"]);
    }

    #[test]
    fn entity_name_convention_is_second_in_precedence() {
        let leaves = vec![leaf("TId", false), leaf("Other", false)];
        let keys = deduce("T", &leaves, &[], &CompilerOptions::default()).unwrap();
        assert_eq!(keys.primary.paths, vec!["TId"]);
    }

    #[test]
    fn identity_ties_are_an_error() {
        let leaves = vec![leaf("Id", false), leaf("id", false)];
        let err = deduce("T", &leaves, &[], &CompilerOptions::default()).unwrap_err();
        assert!(matches!(err.problem, Problem::CouldNotDeduceKey { .. }));
    }

    #[test]
    fn absence_of_any_key_is_an_error() {
        let leaves = vec![leaf("A", false), leaf("B", false)];
        let err = deduce("T", &leaves, &[], &CompilerOptions::default()).unwrap_err();
        assert!(matches!(err.problem, Problem::CouldNotDeduceKey { .. }));
    }
}
