//! Structural resolution: expand each model member into a tree of leaf
//! fields, distribute path-carrying directives onto the exact nodes they
//! target, and flatten the result for the downstream stages.

pub mod path;
pub mod tree;

use crate::{
    classify::{ModelMember, StructuralKind, classify_members},
    error::{Location, Problem, TranslateError},
    options::CompilerOptions,
};
use path::{PathError, for_each_leaf, leaf_paths, locate};
use relmap_model::{
    CollectionKind, ConverterDef, DeclaredType, Directive, DirectiveKind, EnumRepr, ScalarType,
    TypeDef, TypeGraph, TypeShape,
};
use relmap_primitives::{Literal, Primitive};
use tree::{
    AggregateNode, FkSeed, FlatLeaf, KeyApp, LeafConstraint, LeafNode, Node, RefTarget, Rename,
    ReferenceNode, ResolvedEntity, ResolvedMember, ResolvedRelation, TargetResolver,
};

// Relations discovered inside an aggregate bubble up to the owning entity.
struct BubbledRelation {
    path: Vec<String>,
    kind: CollectionKind,
    element: DeclaredType,
    directives: Vec<Directive>,
}

/// Resolve an entity's classified members into trees and relation units.
///
/// With `include_relations` off (the identity pass) relation members are
/// skipped entirely; references resolve through `targets` either way.
pub fn resolve_entity(
    graph: &dyn TypeGraph,
    options: &CompilerOptions,
    def: &TypeDef,
    members: &[ModelMember],
    targets: &mut dyn TargetResolver,
    include_relations: bool,
) -> Result<ResolvedEntity, TranslateError> {
    let location = Location::root(def.ident.clone());

    let mut resolved = Vec::new();
    let mut relations = Vec::new();
    let mut key_apps = Vec::new();

    for member in members {
        let member_loc = location.child(member.def.ident.clone());

        if member.kind == StructuralKind::Relation {
            if include_relations {
                let DeclaredType::Collection { kind, element } = &member.def.declared else {
                    return Err(TranslateError::new(
                        member_loc,
                        Problem::InvalidEntityShape {
                            category: "a non-collection relation member".to_string(),
                        },
                    ));
                };
                let element = resolve_element(graph, options, element, targets, &member_loc)?;
                relations.push(ResolvedRelation {
                    member_path: vec![member.def.ident.clone()],
                    synthetic: false,
                    kind: *kind,
                    element,
                    directives: member.def.directives.clone(),
                });
            }
            continue;
        }

        let (mut node, bubbled) = resolve_node(
            graph,
            options,
            member,
            targets,
            &member_loc,
            include_relations,
        )?;

        apply_directives(
            &mut node,
            &member.def.ident,
            &member.def.directives,
            &member_loc,
            Some(&mut key_apps),
            0,
        )?;
        resolved.push(ResolvedMember {
            ident: member.def.ident.clone(),
            node,
        });

        for b in bubbled {
            let mut member_path = vec![member.def.ident.clone()];
            member_path.extend(b.path);
            let rel_loc = location.synthetic(&member_path.join("."));
            let element = resolve_element(graph, options, &b.element, targets, &rel_loc)?;
            relations.push(ResolvedRelation {
                member_path,
                synthetic: true,
                kind: b.kind,
                element,
                directives: b.directives,
            });
        }
    }

    let table_rename =
        apply_type_directives(&mut resolved, &def.directives, &location, &mut key_apps)?;

    Ok(ResolvedEntity {
        ident: def.ident.clone(),
        table_rename,
        members: resolved,
        relations,
        key_apps,
    })
}

// Resolve one non-relation member into its tree.
fn resolve_node(
    graph: &dyn TypeGraph,
    options: &CompilerOptions,
    member: &ModelMember,
    targets: &mut dyn TargetResolver,
    location: &Location,
    include_relations: bool,
) -> Result<(Node, Vec<BubbledRelation>), TranslateError> {
    match member.kind {
        StructuralKind::Scalar => {
            let DeclaredType::Scalar(scalar) = &member.def.declared else {
                unreachable!("classified scalar must carry a scalar type");
            };
            Ok((
                Node::Leaf(LeafNode::scalar(member.def.ident.clone(), scalar.clone())),
                Vec::new(),
            ))
        }

        StructuralKind::Aggregate => {
            let DeclaredType::Named(target_ident) = &member.def.declared else {
                unreachable!("classified aggregate must carry a named type");
            };
            let target_def = graph.get(target_ident).ok_or_else(|| {
                TranslateError::new(
                    location.clone(),
                    Problem::UnknownType {
                        ident: target_ident.clone(),
                    },
                )
            })?;
            let mut visiting = Vec::new();
            resolve_aggregate(
                graph,
                options,
                &member.def.ident,
                target_def,
                targets,
                location,
                include_relations,
                false,
                &mut visiting,
            )
        }

        StructuralKind::Reference => {
            let DeclaredType::Named(target_ident) = &member.def.declared else {
                unreachable!("classified reference must carry a named type");
            };
            let target = targets.resolve_target(target_ident, location)?;
            Ok((
                Node::Reference(reference_node(member.def.ident.clone(), target)),
                Vec::new(),
            ))
        }

        StructuralKind::Relation => unreachable!("relations are handled by the caller"),
    }
}

fn reference_node(ident: String, target: RefTarget) -> ReferenceNode {
    let children = target
        .pk_fields
        .iter()
        .map(|(name, storage)| Node::Leaf(LeafNode::contributed(name.clone(), *storage)))
        .collect();

    ReferenceNode {
        ident,
        rename: None,
        nullable: false,
        target,
        children,
    }
}

// Recursively flatten an embedded aggregate type under `node_ident`.
#[allow(clippy::too_many_arguments)]
fn resolve_aggregate(
    graph: &dyn TypeGraph,
    options: &CompilerOptions,
    node_ident: &str,
    def: &TypeDef,
    targets: &mut dyn TargetResolver,
    location: &Location,
    include_relations: bool,
    forbid_relations: bool,
    visiting: &mut Vec<String>,
) -> Result<(Node, Vec<BubbledRelation>), TranslateError> {
    if visiting.iter().any(|v| v == &def.ident) {
        return Err(TranslateError::new(
            location.clone(),
            Problem::InvalidEntityShape {
                category: "a self-embedding aggregate type".to_string(),
            },
        ));
    }
    match def.shape {
        TypeShape::Concrete => {}
        TypeShape::Abstract => {
            return Err(TranslateError::new(
                location.clone(),
                Problem::InvalidEntityShape {
                    category: "an abstract type".to_string(),
                },
            ));
        }
        TypeShape::OpenGeneric => {
            return Err(TranslateError::new(
                location.clone(),
                Problem::InvalidEntityShape {
                    category: "an open generic type".to_string(),
                },
            ));
        }
    }

    // The aggregate's own typedef carries no addressable table or keys.
    if let Some(directive) = def.directives.first() {
        return Err(TranslateError::new(
            location.child(def.ident.clone()),
            Problem::InapplicableAnnotation {
                directive: directive.kind.ident().to_string(),
                kind: "an embedded aggregate type".to_string(),
            },
        )
        .with_directive(directive.kind.ident()));
    }

    visiting.push(def.ident.clone());

    let agg_loc = location.child(def.ident.clone());
    let members = classify_members(graph, def, &agg_loc)?;

    let mut children = Vec::new();
    let mut bubbled = Vec::new();

    for member in &members {
        let member_loc = agg_loc.child(member.def.ident.clone());

        if member.kind == StructuralKind::Relation {
            if forbid_relations {
                return Err(TranslateError::new(member_loc, Problem::RelationInRelation));
            }
            if include_relations {
                let DeclaredType::Collection { kind, element } = &member.def.declared else {
                    continue;
                };
                bubbled.push(BubbledRelation {
                    path: vec![member.def.ident.clone()],
                    kind: *kind,
                    element: (**element).clone(),
                    directives: member.def.directives.clone(),
                });
            }
            continue;
        }

        let (mut node, nested) = resolve_node(
            graph,
            options,
            member,
            targets,
            &member_loc,
            include_relations,
        )?;
        apply_directives(
            &mut node,
            &member.def.ident,
            &member.def.directives,
            &member_loc,
            None,
            0,
        )?;
        children.push(node);

        for mut b in nested {
            let mut path = vec![member.def.ident.clone()];
            path.append(&mut b.path);
            if forbid_relations {
                return Err(TranslateError::new(
                    member_loc.clone(),
                    Problem::RelationInRelation,
                ));
            }
            bubbled.push(BubbledRelation { path, ..b });
        }
    }

    visiting.pop();

    let node = Node::Aggregate(AggregateNode {
        ident: node_ident.to_string(),
        rename: None,
        nullable: false,
        children,
    });

    // Relations contribute no inline fields, so an aggregate made only of
    // them resolves to nothing.
    let mut paths = Vec::new();
    leaf_paths(&node, "", &mut paths);
    if paths.is_empty() {
        return Err(TranslateError::new(
            agg_loc,
            Problem::NotEnoughFields {
                expected: 1,
                found: 0,
            },
        ));
    }

    Ok((node, bubbled))
}

// Resolve a relation's element type into a node rooted at the element ident.
fn resolve_element(
    graph: &dyn TypeGraph,
    options: &CompilerOptions,
    element: &DeclaredType,
    targets: &mut dyn TargetResolver,
    location: &Location,
) -> Result<Node, TranslateError> {
    match element {
        DeclaredType::Collection { .. } => Err(TranslateError::new(
            location.clone(),
            Problem::RelationInRelation,
        )),

        DeclaredType::Scalar(scalar) => Ok(Node::Leaf(LeafNode::scalar(
            options.element_ident.clone(),
            scalar.clone(),
        ))),

        DeclaredType::Named(ident) => {
            let target_def = graph.get(ident).ok_or_else(|| {
                TranslateError::new(
                    location.clone(),
                    Problem::UnknownType {
                        ident: ident.clone(),
                    },
                )
            })?;

            if target_def.is_entity() {
                let target = targets.resolve_target(ident, location)?;
                Ok(Node::Reference(reference_node(
                    options.element_ident.clone(),
                    target,
                )))
            } else {
                let mut visiting = Vec::new();
                let (node, bubbled) = resolve_aggregate(
                    graph,
                    options,
                    &options.element_ident,
                    target_def,
                    targets,
                    location,
                    true,
                    true,
                    &mut visiting,
                )?;
                debug_assert!(bubbled.is_empty(), "forbidden relations cannot bubble");
                Ok(node)
            }
        }
    }
}

//
// directive distribution
//

/// Apply one member's directives onto its resolved tree. `key_sink` is None
/// inside embedded aggregates, where key directives do not apply.
/// `rank_offset` accounts for path segments already consumed above this node,
/// so rename precedence stays measured from the leaf.
pub(crate) fn apply_directives(
    node: &mut Node,
    member_ident: &str,
    directives: &[Directive],
    location: &Location,
    mut key_sink: Option<&mut Vec<KeyApp>>,
    rank_offset: usize,
) -> Result<(), TranslateError> {
    for directive in directives {
        let ident = directive.kind.ident();

        match &directive.kind {
            // consumed by the classifier
            DirectiveKind::Include | DirectiveKind::Exclude => {}

            DirectiveKind::Key | DirectiveKind::PrimaryKey => {
                let Some(sink) = key_sink.as_deref_mut() else {
                    return Err(TranslateError::new(
                        location.clone(),
                        Problem::InapplicableAnnotation {
                            directive: ident.to_string(),
                            kind: "an embedded aggregate member".to_string(),
                        },
                    )
                    .with_directive(ident));
                };
                let paths = resolve_key_paths(node, member_ident, directive, location)?;
                sink.push(KeyApp {
                    name: directive.name.clone(),
                    primary: matches!(directive.kind, DirectiveKind::PrimaryKey),
                    paths,
                    directive: ident,
                });
            }

            DirectiveKind::NonNull => {
                let target = locate_target(node, directive, location, ident)?;
                let conflicts = match target {
                    Node::Aggregate(agg) => agg.nullable,
                    Node::Reference(reference) => reference.nullable,
                    Node::Leaf(_) => false,
                };
                if conflicts {
                    return Err(conflicting(location, "NonNull", "Nullable"));
                }
                for_each_leaf(target, &mut |leaf| leaf.non_null = true);
            }

            DirectiveKind::Nullable => {
                let target = locate_target(node, directive, location, ident)?;
                match target {
                    // natively nullable already; NonNull would conflict
                    Node::Leaf(leaf) => {
                        if leaf.non_null {
                            return Err(conflicting(location, "Nullable", "NonNull"));
                        }
                    }
                    Node::Aggregate(agg) => agg.nullable = true,
                    Node::Reference(reference) => reference.nullable = true,
                }
            }

            DirectiveKind::Default => {
                let target = locate_target(node, directive, location, ident)?;
                let Node::Leaf(leaf) = target else {
                    return Err(TranslateError::new(
                        location.clone(),
                        Problem::InapplicableAnnotation {
                            directive: ident.to_string(),
                            kind: "a structural container".to_string(),
                        },
                    )
                    .with_directive(ident));
                };
                let value = single_value(directive, location, ident, |detail| {
                    Problem::InvalidDefault { detail }
                })?;
                match &leaf.default {
                    Some(existing) if *existing == value => {}
                    Some(_) => {
                        return Err(TranslateError::new(
                            location.clone(),
                            Problem::DuplicateAnnotation {
                                directive: ident.to_string(),
                            },
                        )
                        .with_directive(ident));
                    }
                    None => leaf.default = Some(value),
                }
            }

            DirectiveKind::Rename => {
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
                let rank = rank_offset
                    + directive
                        .path
                        .as_deref()
                        .map_or(0, |p| p.split('.').filter(|s| !s.is_empty()).count());
                let target = locate_target(node, directive, location, ident)?;
                let slot = match target {
                    Node::Leaf(leaf) => &mut leaf.rename,
                    Node::Aggregate(agg) => &mut agg.rename,
                    Node::Reference(reference) => &mut reference.rename,
                };
                set_rename(slot, name, rank, location)?;
            }

            DirectiveKind::Compare(_)
            | DirectiveKind::OneOf
            | DirectiveKind::NoneOf
            | DirectiveKind::Length(_)
            | DirectiveKind::NonNegative => {
                let target = locate_constraint_target(node, directive, location, ident)?;
                target.constraints.push(LeafConstraint {
                    kind: directive.kind.clone(),
                    values: directive.values.clone(),
                    directive: ident,
                });
            }

            DirectiveKind::EnumStorage(repr) => {
                let target = locate_constraint_target(node, directive, location, ident)?;
                if !matches!(target.scalar, ScalarType::Enum(_)) {
                    return Err(TranslateError::new(
                        location.clone(),
                        Problem::InapplicableAnnotation {
                            directive: ident.to_string(),
                            kind: "a non-enumerated scalar".to_string(),
                        },
                    )
                    .with_directive(ident));
                }
                set_repr(target, *repr, location)?;
            }

            DirectiveKind::Convert(converter) => {
                let target = locate_constraint_target(node, directive, location, ident)?;
                check_converter(target, converter, location)?;
                match &target.converter {
                    Some(existing) if existing == converter => {}
                    Some(_) => {
                        return Err(TranslateError::new(
                            location.clone(),
                            Problem::DuplicateAnnotation {
                                directive: ident.to_string(),
                            },
                        )
                        .with_directive(ident));
                    }
                    None => target.converter = Some(converter.clone()),
                }
            }
        }
    }

    Ok(())
}

// Type-level directives: table renaming plus root-pathed renames and keys.
fn apply_type_directives(
    members: &mut [ResolvedMember],
    directives: &[Directive],
    location: &Location,
    key_apps: &mut Vec<KeyApp>,
) -> Result<Option<String>, TranslateError> {
    let mut table_rename: Option<String> = None;

    for directive in directives {
        let ident = directive.kind.ident();

        match &directive.kind {
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

            DirectiveKind::Rename
            | DirectiveKind::Key
            | DirectiveKind::PrimaryKey
            | DirectiveKind::NonNull
            | DirectiveKind::Nullable
            | DirectiveKind::Default => {
                // Root-pathed directives walk into a member's subtree; the
                // first segment selects the member.
                let Some(path) = directive.path.as_deref().filter(|p| !p.is_empty()) else {
                    if matches!(
                        directive.kind,
                        DirectiveKind::Key | DirectiveKind::PrimaryKey
                    ) {
                        return Err(TranslateError::new(location.clone(), Problem::NullPath)
                            .with_directive(ident));
                    }
                    return Err(TranslateError::new(
                        location.clone(),
                        Problem::InapplicableAnnotation {
                            directive: ident.to_string(),
                            kind: "the type".to_string(),
                        },
                    )
                    .with_directive(ident));
                };

                let (head, rest) = match path.split_once('.') {
                    Some((head, rest)) => (head, Some(rest.to_string())),
                    None => (path, None),
                };
                let member = members
                    .iter_mut()
                    .find(|m| m.ident == head)
                    .ok_or_else(|| {
                        TranslateError::new(
                            location.clone(),
                            Problem::PathDoesNotExist {
                                path: path.to_string(),
                            },
                        )
                        .with_path(path)
                        .with_directive(ident)
                    })?;
                let rebased = Directive {
                    kind: directive.kind.clone(),
                    path: rest,
                    name: directive.name.clone(),
                    values: directive.values.clone(),
                };
                let member_ident = member.ident.clone();
                let member_loc = location.child(member_ident.clone());
                apply_directives(
                    &mut member.node,
                    &member_ident,
                    std::slice::from_ref(&rebased),
                    &member_loc,
                    Some(&mut *key_apps),
                    1,
                )?;
            }

            _ => {
                return Err(TranslateError::new(
                    location.clone(),
                    Problem::InapplicableAnnotation {
                        directive: ident.to_string(),
                        kind: "the type".to_string(),
                    },
                )
                .with_directive(ident));
            }
        }
    }

    Ok(table_rename)
}

//
// directive targeting helpers
//

fn locate_target<'t>(
    node: &'t mut Node,
    directive: &Directive,
    location: &Location,
    ident: &'static str,
) -> Result<&'t mut Node, TranslateError> {
    match directive.path.as_deref() {
        None | Some("") => Ok(node),
        Some(path) => locate(node, path).map_err(|e| path_error(e, location, ident)),
    }
}

// Constraint-flavored directives must land on a leaf; a container target
// with no path is a missing path, not an inapplicable directive.
fn locate_constraint_target<'t>(
    node: &'t mut Node,
    directive: &Directive,
    location: &Location,
    ident: &'static str,
) -> Result<&'t mut LeafNode, TranslateError> {
    let has_path = directive.path.as_deref().is_some_and(|p| !p.is_empty());
    let target = locate_target(node, directive, location, ident)?;

    match target {
        Node::Leaf(leaf) => Ok(leaf),
        Node::Aggregate(_) | Node::Reference(_) if !has_path => Err(TranslateError::new(
            location.clone(),
            Problem::NullPath,
        )
        .with_directive(ident)),
        Node::Aggregate(_) | Node::Reference(_) => Err(TranslateError::new(
            location.clone(),
            Problem::InapplicableAnnotation {
                directive: ident.to_string(),
                kind: "a structural container".to_string(),
            },
        )
        .with_directive(ident)),
    }
}

fn resolve_key_paths(
    node: &mut Node,
    member_ident: &str,
    directive: &Directive,
    location: &Location,
) -> Result<Vec<String>, TranslateError> {
    let ident = directive.kind.ident();

    match directive.path.as_deref() {
        None | Some("") => match node {
            Node::Leaf(_) => Ok(vec![member_ident.to_string()]),
            // a pathless key on a reference covers its full contributed set
            Node::Reference(_) => {
                let mut out = Vec::new();
                leaf_paths(node, "", &mut out);
                Ok(out)
            }
            Node::Aggregate(_) => Err(TranslateError::new(location.clone(), Problem::NullPath)
                .with_directive(ident)),
        },
        Some(path) => {
            let target = locate(node, path).map_err(|e| path_error(e, location, ident))?;
            let prefix = key_path_prefix(member_ident, path, target.ident());
            let mut out = Vec::new();
            leaf_paths(target, &prefix, &mut out);
            Ok(out)
        }
    }
}

// Rebuild the dotted source prefix for leaves under a located node: the
// member ident plus the path minus the target's own trailing ident.
fn key_path_prefix(member_ident: &str, path: &str, target_ident: &str) -> String {
    let stripped = path
        .strip_suffix(target_ident)
        .map_or("", |p| p.trim_end_matches('.'));

    if stripped.is_empty() {
        member_ident.to_string()
    } else {
        format!("{member_ident}.{stripped}")
    }
}

fn set_rename(
    slot: &mut Option<Rename>,
    name: String,
    rank: usize,
    location: &Location,
) -> Result<(), TranslateError> {
    let replace = match &*slot {
        None => true,
        // the directive closest to the leaf wins
        Some(existing) if rank < existing.rank => true,
        Some(existing) if rank > existing.rank => false,
        Some(existing) if existing.name == name => false,
        Some(_) => {
            return Err(TranslateError::new(
                location.clone(),
                Problem::DuplicateAnnotation {
                    directive: "Rename".to_string(),
                },
            )
            .with_directive("Rename"));
        }
    };
    if replace {
        *slot = Some(Rename { name, rank });
    }
    Ok(())
}

fn set_repr(
    leaf: &mut LeafNode,
    repr: EnumRepr,
    location: &Location,
) -> Result<(), TranslateError> {
    match leaf.repr {
        Some(existing) if existing == repr => Ok(()),
        Some(_) => Err(TranslateError::new(
            location.clone(),
            Problem::DuplicateAnnotation {
                directive: "EnumStorage".to_string(),
            },
        )
        .with_directive("EnumStorage")),
        None => {
            leaf.repr = Some(repr);
            Ok(())
        }
    }
}

fn check_converter(
    leaf: &LeafNode,
    converter: &ConverterDef,
    location: &Location,
) -> Result<(), TranslateError> {
    let source_kind = leaf.scalar.kind_ident();
    if converter.source != source_kind {
        return Err(TranslateError::new(
            location.clone(),
            Problem::InvalidDataConverter {
                ident: converter.ident.clone(),
                detail: format!(
                    "source type `{}` does not match the member's scalar kind `{source_kind}`",
                    converter.source
                ),
            },
        )
        .with_directive("Convert"));
    }
    // blob storage cannot back the key and constraint machinery
    if converter.storage == Primitive::Blob {
        return Err(TranslateError::new(
            location.clone(),
            Problem::InvalidDataConverter {
                ident: converter.ident.clone(),
                detail: "the result type Blob is unsupported".to_string(),
            },
        )
        .with_directive("Convert"));
    }
    Ok(())
}

fn single_value(
    directive: &Directive,
    location: &Location,
    ident: &'static str,
    problem: impl FnOnce(String) -> Problem,
) -> Result<Literal, TranslateError> {
    if directive.values.len() == 1 {
        Ok(directive.values[0].clone())
    } else {
        Err(TranslateError::new(
            location.clone(),
            problem(format!(
                "expected exactly one value, found {}",
                directive.values.len()
            )),
        )
        .with_directive(ident))
    }
}

fn conflicting(location: &Location, a: &str, b: &str) -> TranslateError {
    TranslateError::new(
        location.clone(),
        Problem::ConflictingAnnotations {
            a: a.to_string(),
            b: b.to_string(),
        },
    )
    .with_directive(a)
    .with_directive(b)
}

fn path_error(err: PathError, location: &Location, ident: &'static str) -> TranslateError {
    match err {
        PathError::DoesNotExist(path) => TranslateError::new(
            location.clone(),
            Problem::PathDoesNotExist { path: path.clone() },
        )
        .with_path(path)
        .with_directive(ident),
        PathError::BeyondReferenceKey(path) => TranslateError::new(
            location.clone(),
            Problem::PathBeyondReferenceKey { path: path.clone() },
        )
        .with_path(path)
        .with_directive(ident),
    }
}

//
// flattening
//

/// Flatten the resolved member trees into leaf fields and foreign-key
/// seeds, checking container-nullability coherence on the way down.
pub fn flatten(
    entity: &ResolvedEntity,
    options: &CompilerOptions,
) -> Result<(Vec<FlatLeaf>, Vec<FkSeed>), TranslateError> {
    let location = Location::root(entity.ident.clone());
    let mut leaves = Vec::new();
    let mut seeds = Vec::new();

    for member in &entity.members {
        walk(
            &member.node,
            &location,
            &mut Vec::new(),
            WalkCtx {
                nullable: false,
                from_reference: false,
                depth: 0,
            },
            options,
            &mut leaves,
            &mut seeds,
        )?;
    }

    Ok((leaves, seeds))
}

/// Flatten a single already-resolved tree (relation elements, anchors).
pub fn flatten_node(
    node: &Node,
    location: &Location,
    options: &CompilerOptions,
    from_reference: bool,
) -> Result<(Vec<FlatLeaf>, Vec<FkSeed>), TranslateError> {
    let mut leaves = Vec::new();
    let mut seeds = Vec::new();
    walk(
        node,
        location,
        &mut Vec::new(),
        WalkCtx {
            nullable: false,
            from_reference,
            depth: 0,
        },
        options,
        &mut leaves,
        &mut seeds,
    )?;
    Ok((leaves, seeds))
}

#[derive(Clone, Copy)]
struct WalkCtx {
    nullable: bool,
    from_reference: bool,
    depth: usize,
}

fn walk(
    node: &Node,
    location: &Location,
    segments: &mut Vec<(String, Option<String>)>,
    ctx: WalkCtx,
    options: &CompilerOptions,
    leaves: &mut Vec<FlatLeaf>,
    seeds: &mut Vec<FkSeed>,
) -> Result<(), TranslateError> {
    match node {
        Node::Leaf(leaf) => {
            segments.push((
                leaf.ident.clone(),
                leaf.rename.as_ref().map(|r| r.name.clone()),
            ));
            let source_path = source_path(segments);
            leaves.push(FlatLeaf {
                source_path,
                segments: segments.clone(),
                storage: leaf_storage(leaf, options),
                nullable: ctx.nullable || !leaf.non_null,
                non_null_native: leaf.non_null,
                from_reference: ctx.from_reference,
                top_level_scalar: ctx.depth == 0 && !ctx.from_reference,
                default: leaf.default.clone(),
                constraints: leaf.constraints.clone(),
            });
            segments.pop();
        }

        Node::Aggregate(agg) => {
            if agg.nullable && !any_native_non_null(node) {
                return Err(TranslateError::new(
                    location.child(agg.ident.clone()),
                    Problem::AmbiguousNullable,
                )
                .with_directive("Nullable"));
            }
            segments.push((agg.ident.clone(), agg.rename.as_ref().map(|r| r.name.clone())));
            let child_ctx = WalkCtx {
                nullable: ctx.nullable || agg.nullable,
                from_reference: ctx.from_reference,
                depth: ctx.depth + 1,
            };
            let child_loc = location.child(agg.ident.clone());
            for child in &agg.children {
                walk(child, &child_loc, segments, child_ctx, options, leaves, seeds)?;
            }
            segments.pop();
        }

        Node::Reference(reference) => {
            segments.push((
                reference.ident.clone(),
                reference.rename.as_ref().map(|r| r.name.clone()),
            ));
            let child_ctx = WalkCtx {
                nullable: ctx.nullable || reference.nullable,
                from_reference: true,
                depth: ctx.depth + 1,
            };
            let child_loc = location.child(reference.ident.clone());

            let mut local_paths = Vec::new();
            for child in &reference.children {
                let mut child_segments = segments.clone();
                child_segments.push((child.ident().to_string(), None));
                local_paths.push(source_path(&child_segments));
            }
            seeds.push(FkSeed {
                local_paths,
                target_type: reference.target.type_ident.clone(),
                target_table: reference.target.table_name.clone(),
                target_fields: reference
                    .target
                    .pk_fields
                    .iter()
                    .map(|(name, _)| name.clone())
                    .collect(),
            });

            for child in &reference.children {
                walk(child, &child_loc, segments, child_ctx, options, leaves, seeds)?;
            }
            segments.pop();
        }
    }

    Ok(())
}

fn source_path(segments: &[(String, Option<String>)]) -> String {
    segments
        .iter()
        .map(|(ident, _)| ident.as_str())
        .collect::<Vec<_>>()
        .join(".")
}

fn any_native_non_null(node: &Node) -> bool {
    match node {
        Node::Leaf(leaf) => leaf.non_null,
        Node::Aggregate(agg) => agg.children.iter().any(any_native_non_null),
        Node::Reference(reference) => reference.children.iter().any(any_native_non_null),
    }
}

fn leaf_storage(leaf: &LeafNode, options: &CompilerOptions) -> Primitive {
    if let Some(converter) = &leaf.converter {
        return converter.storage;
    }
    if let Some(fixed) = leaf.fixed_storage {
        return fixed;
    }
    match &leaf.scalar {
        ScalarType::Primitive(primitive) => *primitive,
        ScalarType::Enum(_) => match leaf.repr.unwrap_or(options.enum_storage) {
            EnumRepr::Numeric => Primitive::Int32,
            EnumRepr::Symbolic => Primitive::Text,
        },
    }
}
