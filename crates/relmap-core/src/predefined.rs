//! Pre-defined entity validation: instance construction rules and the
//! reachability closure (everything a pre-defined entity can reach must be
//! pre-defined too).

use crate::{
    classify::classify_members,
    error::{Location, Problem, TranslateError},
};
use relmap_model::{DeclaredType, PreDefined, TypeGraph};
use std::collections::BTreeSet;

/// Validate the frozen instance set and return its idents in order.
pub fn validate_instances(
    predefined: &PreDefined,
    location: &Location,
) -> Result<Vec<String>, TranslateError> {
    if predefined.instances.len() < 2 {
        return Err(TranslateError::new(
            location.clone(),
            Problem::NotEnoughInstances {
                found: predefined.instances.len(),
            },
        ));
    }

    if predefined.public_constructor {
        return Err(TranslateError::new(
            location.clone(),
            Problem::InvalidPreDefinedInstance {
                detail: "a public constructor is exposed".to_string(),
            },
        ));
    }

    for instance in &predefined.instances {
        if instance.writable {
            return Err(TranslateError::new(
                location.clone(),
                Problem::InvalidPreDefinedInstance {
                    detail: format!("instance `{}` is writable", instance.ident),
                },
            ));
        }
    }

    Ok(predefined
        .instances
        .iter()
        .map(|i| i.ident.clone())
        .collect())
}

/// Walk every entity reachable from `root` (references and relation element
/// types, through nested aggregates) and require each to be pre-defined.
/// `verified` memoizes entities whose own closure already passed.
pub fn check_closure(
    graph: &dyn TypeGraph,
    root: &str,
    verified: &mut BTreeSet<String>,
) -> Result<(), TranslateError> {
    if verified.contains(root) {
        return Ok(());
    }

    let mut queue = vec![(root.to_string(), vec![root.to_string()])];
    let mut visited: BTreeSet<String> = BTreeSet::new();

    while let Some((ident, chain)) = queue.pop() {
        if !visited.insert(ident.clone()) || verified.contains(&ident) {
            continue;
        }

        let Some(def) = graph.get(&ident) else {
            // resolution has already validated the graph; a vanished type is
            // an oracle determinism violation
            return Err(TranslateError::new(
                chain_location(&chain),
                Problem::UnknownType { ident },
            ));
        };

        let location = chain_location(&chain);
        let members = classify_members(graph, def, &location)?;

        let mut targets = Vec::new();
        for member in &members {
            collect_entity_targets(graph, &member.def.declared, &chain, &mut targets);
        }

        for (target, target_chain) in targets {
            let Some(target_def) = graph.get(&target) else {
                continue;
            };
            if target_def.predefined().is_none() {
                return Err(TranslateError::new(
                    chain_location(&target_chain),
                    Problem::PreDefinedReference { target },
                ));
            }
            queue.push((target, target_chain));
        }
    }

    verified.extend(visited);

    Ok(())
}

// Collect entity types reachable from one declared type, carrying the chain
// of type names traversed to reach each.
fn collect_entity_targets(
    graph: &dyn TypeGraph,
    declared: &DeclaredType,
    chain: &[String],
    out: &mut Vec<(String, Vec<String>)>,
) {
    match declared {
        DeclaredType::Scalar(_) => {}

        DeclaredType::Named(ident) => {
            let Some(def) = graph.get(ident) else {
                return;
            };
            let mut next_chain = chain.to_vec();
            next_chain.push(ident.clone());

            if def.is_entity() {
                out.push((ident.clone(), next_chain));
            } else {
                // descend through the aggregate's own members
                if chain.iter().any(|c| c == ident) {
                    return;
                }
                for member in &def.members {
                    collect_entity_targets(graph, &member.declared, &next_chain, out);
                }
            }
        }

        DeclaredType::Collection { element, .. } => {
            collect_entity_targets(graph, element, chain, out);
        }
    }
}

fn chain_location(chain: &[String]) -> Location {
    let mut iter = chain.iter();
    let mut location = Location::root(iter.next().cloned().unwrap_or_default());
    for segment in iter {
        location = location.child(segment.clone());
    }
    location
}
