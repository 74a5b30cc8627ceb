//! Table assembly: final names, field ordering, key promotion, foreign-key
//! wiring, and relation tables with their anchor back to the owner.

pub mod naming;

use crate::{
    constrain::{self, ComposedLeaf},
    error::{Location, Problem, TranslateError},
    keys::KeySet,
    options::CompilerOptions,
    resolve::{
        apply_directives, flatten_node,
        tree::{
            FkSeed, FlatLeaf, LeafNode, Node, RefTarget, ReferenceNode, ResolvedEntity,
            ResolvedRelation,
        },
    },
    schema::{
        CandidateKey, CascadeAction, Constraint, Field, ForeignKey, PrimaryKey, PrimaryKeySource,
        Principal, RelationUnit, Table, Translation,
    },
};
use relmap_model::{CollectionKind, Directive, DirectiveKind};
use relmap_primitives::Primitive;
use std::collections::BTreeMap;

/// Assemble the full translation: the principal table plus one relation
/// table per relation member.
#[allow(clippy::too_many_arguments)]
pub fn assemble(
    entity: &ResolvedEntity,
    leaves: &[FlatLeaf],
    seeds: &[FkSeed],
    keys: &KeySet,
    composed: &[ComposedLeaf],
    instances: Vec<String>,
    options: &CompilerOptions,
) -> Result<Translation, TranslateError> {
    let location = Location::root(entity.ident.clone());

    let table_name = naming::field_name(
        &[(entity.ident.clone(), entity.table_rename.clone())],
        options,
    );
    naming::check_table_name(&table_name, options, &location)?;

    let (fields, name_of) = build_fields(leaves, composed, options, &location)?;
    if fields.len() < 2 {
        return Err(TranslateError::new(
            location.clone(),
            Problem::NotEnoughFields {
                expected: 2,
                found: fields.len(),
            },
        ));
    }

    let candidate_keys: Vec<CandidateKey> = keys
        .candidates
        .iter()
        .map(|k| CandidateKey {
            name: k.name.clone(),
            fields: rename_paths(&k.paths, &name_of),
        })
        .collect();

    let primary_key = PrimaryKey {
        key: CandidateKey {
            name: keys.primary.name.clone(),
            fields: rename_paths(&keys.primary.paths, &name_of),
        },
        source: keys.primary_source,
    };

    let foreign_keys: Vec<ForeignKey> = seeds
        .iter()
        .map(|seed| foreign_key(seed, &name_of))
        .collect();

    let constraints = constraints_of(leaves, composed, &name_of);

    let table = Table {
        name: table_name.clone(),
        fields,
        primary_key,
        candidate_keys,
        foreign_keys,
        constraints,
    };

    let owner = RefTarget {
        type_ident: entity.ident.clone(),
        table_name: table_name.clone(),
        pk_fields: table
            .primary_key
            .fields()
            .iter()
            .map(|name| {
                let storage = table
                    .field(name)
                    .map_or(Primitive::Int64, |f| f.storage);
                (name.clone(), storage)
            })
            .collect(),
        member_idents: entity.members.iter().map(|m| m.ident.clone()).collect(),
    };

    let mut relations = Vec::new();
    for relation in &entity.relations {
        relations.push(assemble_relation(relation, &owner, options, &location)?);
    }

    // Table names must be unique within the translation; the compiler
    // extends the check to the whole run.
    let mut seen: BTreeMap<&str, String> = BTreeMap::new();
    seen.insert(table.name.as_str(), entity.ident.clone());
    for unit in &relations {
        if let Some(first) = seen.insert(unit.table.name.as_str(), unit.member.clone()) {
            return Err(TranslateError::new(
                location,
                Problem::DuplicateName {
                    name: unit.table.name.clone(),
                    first,
                    second: unit.member.clone(),
                },
            ));
        }
    }

    Ok(Translation {
        source: entity.ident.clone(),
        principal: Principal { table, instances },
        relations,
    })
}

// Build one relation table: anchor fields, the collection's discriminator
// column, and the element fields.
fn assemble_relation(
    relation: &ResolvedRelation,
    owner: &RefTarget,
    options: &CompilerOptions,
    entity_loc: &Location,
) -> Result<RelationUnit, TranslateError> {
    let member_dotted = relation.member_path_dotted();
    let rel_loc = if relation.synthetic {
        entity_loc.synthetic(&member_dotted)
    } else {
        entity_loc.child(member_dotted.clone())
    };

    let mut anchor = Node::Reference(ReferenceNode {
        ident: options.anchor_ident.clone(),
        rename: None,
        nullable: false,
        target: owner.clone(),
        children: owner
            .pk_fields
            .iter()
            .map(|(name, storage)| Node::Leaf(LeafNode::contributed(name.clone(), *storage)))
            .collect(),
    });

    let table_rename = apply_relation_directives(
        &mut anchor,
        &relation.directives,
        &rel_loc,
        options,
    )?;

    let (anchor_leaves, anchor_seeds) = flatten_node(&anchor, &rel_loc, options, false)?;
    let (mut element_leaves, element_seeds) =
        flatten_node(&relation.element, &rel_loc, options, false)?;

    // Set elements are part of the row identity and must be comparable.
    if relation.kind == CollectionKind::Set {
        for leaf in &mut element_leaves {
            leaf.nullable = false;
            leaf.non_null_native = true;
        }
    }

    let discriminator = match relation.kind {
        CollectionKind::Map { key } => Some(synthetic_leaf(&options.map_key_ident, key)),
        CollectionKind::List => Some(synthetic_leaf(&options.list_index_ident, Primitive::Nat32)),
        CollectionKind::Set => None,
    };

    let mut ordered = anchor_leaves;
    let anchor_count = ordered.len();
    if let Some(leaf) = discriminator {
        ordered.push(leaf);
    }
    ordered.extend(element_leaves);

    let mut composed = Vec::new();
    for leaf in &ordered {
        composed.push(constrain::compose(leaf, &rel_loc)?);
    }

    let (fields, name_of) = build_fields(&ordered, &composed, options, &rel_loc)?;

    let default_name = format!(
        "{}.{}",
        owner.table_name,
        naming::field_name(
            &relation
                .member_path
                .iter()
                .map(|s| (s.clone(), None))
                .collect::<Vec<_>>(),
            options
        )
    );
    let table_name = table_rename.unwrap_or(default_name);
    naming::check_table_name(&table_name, options, &rel_loc)?;

    // Row identity: anchor plus the discriminator, or anchor plus the whole
    // element for sets.
    let mut pk_paths: Vec<String> = ordered[..anchor_count]
        .iter()
        .map(|l| l.source_path.clone())
        .collect();
    match relation.kind {
        CollectionKind::Map { .. } => pk_paths.push(options.map_key_ident.clone()),
        CollectionKind::List => pk_paths.push(options.list_index_ident.clone()),
        CollectionKind::Set => {
            pk_paths.extend(ordered[anchor_count..].iter().map(|l| l.source_path.clone()));
        }
    }
    let pk_fields = rename_paths(&pk_paths, &name_of);

    for name in &pk_fields {
        if fields.iter().any(|f| &f.name == name && f.nullable) {
            return Err(TranslateError::new(
                rel_loc.clone(),
                Problem::PrimaryKeyNullable {
                    field: name.clone(),
                },
            ));
        }
    }

    let mut foreign_keys = Vec::new();
    for seed in anchor_seeds.iter().chain(element_seeds.iter()) {
        foreign_keys.push(foreign_key(seed, &name_of));
    }

    let constraints = constraints_of(&ordered, &composed, &name_of);

    let table = Table {
        name: table_name,
        fields,
        primary_key: PrimaryKey {
            key: CandidateKey {
                name: None,
                fields: pk_fields,
            },
            source: PrimaryKeySource::Synthetic,
        },
        candidate_keys: Vec::new(),
        foreign_keys,
        constraints,
    };

    Ok(RelationUnit {
        member: member_dotted,
        table,
    })
}

// Relation annotations: table naming takes no path at all; everything else
// must address the anchor subtree.
fn apply_relation_directives(
    anchor: &mut Node,
    directives: &[Directive],
    location: &Location,
    options: &CompilerOptions,
) -> Result<Option<String>, TranslateError> {
    let mut table_rename: Option<String> = None;

    for directive in directives {
        let ident = directive.kind.ident();

        match &directive.kind {
            DirectiveKind::Include | DirectiveKind::Exclude => {}

            DirectiveKind::Key | DirectiveKind::PrimaryKey => {
                return Err(TranslateError::new(
                    location.clone(),
                    Problem::InapplicableAnnotation {
                        directive: ident.to_string(),
                        kind: "a relation member".to_string(),
                    },
                )
                .with_directive(ident));
            }

            DirectiveKind::Rename if directive.path.is_none() => {
                let name = directive.name.clone().unwrap_or_default();
                if name.is_empty() {
                    return Err(TranslateError::new(
                        location.clone(),
                        Problem::InvalidName {
                            name,
                            reason: "no name was supplied".to_string(),
                        },
                    )
                    .with_directive(ident));
                }
                match &table_rename {
                    Some(existing) if *existing == name => {}
                    Some(_) => {
                        return Err(TranslateError::new(
                            location.clone(),
                            Problem::DuplicateAnnotation {
                                directive: ident.to_string(),
                            },
                        )
                        .with_directive(ident));
                    }
                    None => table_rename = Some(name),
                }
            }

            _ => {
                let Some(path) = directive.path.as_deref().filter(|p| !p.is_empty()) else {
                    return Err(TranslateError::new(location.clone(), Problem::NullPath)
                        .with_directive(ident));
                };

                let anchor_ident = options.anchor_ident.as_str();
                let rest = if path == anchor_ident {
                    None
                } else if let Some(rest) = path.strip_prefix(&format!("{anchor_ident}.")) {
                    Some(rest.to_string())
                } else {
                    return Err(TranslateError::new(
                        location.clone(),
                        Problem::PathOutsideAnchor {
                            path: path.to_string(),
                            anchor: anchor_ident.to_string(),
                        },
                    )
                    .with_path(path)
                    .with_directive(ident));
                };

                let rebased = Directive {
                    kind: directive.kind.clone(),
                    path: rest,
                    name: directive.name.clone(),
                    values: directive.values.clone(),
                };
                apply_directives(
                    anchor,
                    anchor_ident,
                    std::slice::from_ref(&rebased),
                    location,
                    None,
                    1,
                )?;
            }
        }
    }

    Ok(table_rename)
}

fn synthetic_leaf(ident: &str, storage: Primitive) -> FlatLeaf {
    FlatLeaf {
        source_path: ident.to_string(),
        segments: vec![(ident.to_string(), None)],
        storage,
        nullable: false,
        non_null_native: true,
        from_reference: false,
        top_level_scalar: false,
        default: None,
        constraints: Vec::new(),
    }
}

// Derive, validate, and de-duplicate final field names; returns the fields
// plus the source-path to final-name map.
fn build_fields(
    leaves: &[FlatLeaf],
    composed: &[ComposedLeaf],
    options: &CompilerOptions,
    location: &Location,
) -> Result<(Vec<Field>, BTreeMap<String, String>), TranslateError> {
    let mut fields = Vec::new();
    let mut by_name: BTreeMap<String, String> = BTreeMap::new();
    let mut name_of = BTreeMap::new();

    for (leaf, comp) in leaves.iter().zip(composed) {
        let name = naming::field_name(&leaf.segments, options);
        naming::check_field_name(&name, options, location)?;

        if let Some(first) = by_name.insert(name.clone(), leaf.source_path.clone()) {
            return Err(TranslateError::new(
                location.clone(),
                Problem::DuplicateName {
                    name,
                    first,
                    second: leaf.source_path.clone(),
                },
            ));
        }

        name_of.insert(leaf.source_path.clone(), name.clone());
        fields.push(Field {
            name,
            path: leaf.source_path.clone(),
            storage: leaf.storage,
            nullable: leaf.nullable,
            default: comp.default.clone(),
        });
    }

    Ok((fields, name_of))
}

fn constraints_of(
    leaves: &[FlatLeaf],
    composed: &[ComposedLeaf],
    name_of: &BTreeMap<String, String>,
) -> Vec<Constraint> {
    let mut out = Vec::new();

    for (leaf, comp) in leaves.iter().zip(composed) {
        let Some(name) = name_of.get(&leaf.source_path) else {
            continue;
        };
        for (function, kind) in &comp.parts {
            out.push(Constraint {
                field: name.clone(),
                function: *function,
                kind: kind.clone(),
            });
        }
    }

    out
}

fn foreign_key(seed: &FkSeed, name_of: &BTreeMap<String, String>) -> ForeignKey {
    ForeignKey {
        fields: rename_paths(&seed.local_paths, name_of),
        target_type: seed.target_type.clone(),
        target_table: seed.target_table.clone(),
        target_fields: seed.target_fields.clone(),
        on_delete: CascadeAction::Cascade,
        on_update: CascadeAction::Cascade,
    }
}

fn rename_paths(paths: &[String], name_of: &BTreeMap<String, String>) -> Vec<String> {
    paths
        .iter()
        .map(|p| name_of.get(p).cloned().unwrap_or_else(|| p.clone()))
        .collect()
}
