//! Member discovery: which raw members participate in the model, and what
//! structural kind each one carries.

use crate::error::{Location, Problem, TranslateError};
use relmap_model::{
    DeclaredType, DirectiveKind, MemberDef, MemberOrigin, MemberScope, MemberVisibility, TypeDef,
    TypeGraph, TypeKind,
};
use serde::Serialize;

///
/// StructuralKind
///
/// Closed classification of an eligible member. Every consuming stage
/// matches exhaustively on these four kinds.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
pub enum StructuralKind {
    Scalar,
    Aggregate,
    Reference,
    Relation,
}

///
/// ModelMember
///

#[derive(Clone, Debug)]
pub struct ModelMember {
    pub def: MemberDef,
    pub kind: StructuralKind,
}

/// Discover the model members of a type, in declaration order.
pub fn classify_members(
    graph: &dyn TypeGraph,
    def: &TypeDef,
    location: &Location,
) -> Result<Vec<ModelMember>, TranslateError> {
    let mut members = Vec::new();

    for member in &def.members {
        let member_loc = location.child(member.ident.clone());

        if let Some(member) = discover(graph, member, &member_loc)? {
            members.push(member);
        }
    }

    let minimum = match def.kind {
        TypeKind::Entity { .. } => 2,
        TypeKind::Aggregate => 1,
    };
    if members.len() < minimum {
        return Err(TranslateError::new(
            location.clone(),
            Problem::NotEnoughMembers {
                expected: minimum,
                found: members.len(),
            },
        ));
    }

    Ok(members)
}

// Apply the eligibility precedence to one raw member.
fn discover(
    graph: &dyn TypeGraph,
    member: &MemberDef,
    location: &Location,
) -> Result<Option<ModelMember>, TranslateError> {
    let forced_in = has_directive(member, |k| matches!(k, DirectiveKind::Include));
    let forced_out = has_directive(member, |k| matches!(k, DirectiveKind::Exclude));

    if forced_in && forced_out {
        return Err(TranslateError::new(
            location.clone(),
            Problem::ConflictingAnnotations {
                a: "Include".to_string(),
                b: "Exclude".to_string(),
            },
        )
        .with_directive("Include")
        .with_directive("Exclude"));
    }

    // Rules 1-2 plus non-redeclared inheritance: ineligible for reasons a
    // directive cannot override.
    let fixed_reason = if member.access.indexer {
        Some("an indexer member")
    } else if !member.access.readable {
        Some("a write-only member")
    } else if member.origin == MemberOrigin::Inherited {
        Some("a member inherited without local redeclaration")
    } else if member.origin == MemberOrigin::ContractOnly {
        Some("a contract-only member")
    } else if member.scope == MemberScope::Shared {
        Some("a shared (type-level) member")
    } else {
        None
    };

    if let Some(reason) = fixed_reason {
        if forced_in || forced_out {
            let directive = if forced_in { "Include" } else { "Exclude" };
            return Err(TranslateError::new(
                location.clone(),
                Problem::InvalidMemberInModel {
                    reason: reason.to_string(),
                },
            )
            .with_directive(directive));
        }
        return Ok(None);
    }

    if forced_out {
        // Redundant on an already-ineligible member, effective otherwise.
        return Ok(None);
    }

    let default_eligible = member.visibility == MemberVisibility::Public
        && matches!(
            member.origin,
            MemberOrigin::Declared | MemberOrigin::Shadowing | MemberOrigin::ContractImpl
        );

    if !default_eligible && !forced_in {
        return Ok(None);
    }

    let kind = classify_declared(graph, &member.declared, location)?;

    Ok(Some(ModelMember {
        def: member.clone(),
        kind,
    }))
}

/// Classify a declared type into its structural kind.
pub fn classify_declared(
    graph: &dyn TypeGraph,
    declared: &DeclaredType,
    location: &Location,
) -> Result<StructuralKind, TranslateError> {
    match declared {
        DeclaredType::Scalar(_) => Ok(StructuralKind::Scalar),
        DeclaredType::Collection { .. } => Ok(StructuralKind::Relation),
        DeclaredType::Named(ident) => match graph.get(ident) {
            None => Err(TranslateError::new(
                location.clone(),
                Problem::UnknownType {
                    ident: ident.clone(),
                },
            )),
            Some(target) if target.is_entity() => Ok(StructuralKind::Reference),
            Some(_) => Ok(StructuralKind::Aggregate),
        },
    }
}

fn has_directive(member: &MemberDef, pred: impl Fn(&DirectiveKind) -> bool) -> bool {
    member.directives.iter().any(|d| pred(&d.kind))
}

#[cfg(test)]
mod tests {
    use super::*;
    use relmap_model::{Directive, ModelGraph};
    use relmap_primitives::Primitive;

    fn scalar(ident: &str) -> MemberDef {
        MemberDef::new(ident, DeclaredType::primitive(Primitive::Int32))
    }

    fn classify_one(def: TypeDef) -> Result<Vec<ModelMember>, TranslateError> {
        let graph = ModelGraph::builder().build();
        let location = Location::root(def.ident.clone());
        classify_members(&graph, &def, &location)
    }

    #[test]
    fn include_and_exclude_conflict() {
        let def = TypeDef::entity("T")
            .member(scalar("A"))
            .member(
                scalar("B")
                    .directive(Directive::include())
                    .directive(Directive::exclude()),
            );

        let err = classify_one(def).unwrap_err();
        assert!(matches!(err.problem, Problem::ConflictingAnnotations { .. }));
        assert_eq!(err.location.to_string(), "T -> B");
    }

    #[test]
    fn forcing_an_indexer_in_is_an_error() {
        let def = TypeDef::entity("T")
            .member(scalar("A"))
            .member(scalar("B").indexer().directive(Directive::include()));

        let err = classify_one(def).unwrap_err();
        assert!(matches!(err.problem, Problem::InvalidMemberInModel { .. }));
        assert_eq!(err.directives, vec!["Include".to_string()]);
    }

    #[test]
    fn forcing_a_write_only_member_out_is_an_error() {
        let def = TypeDef::entity("T")
            .member(scalar("A"))
            .member(scalar("B").write_only().directive(Directive::exclude()));

        let err = classify_one(def).unwrap_err();
        assert!(matches!(err.problem, Problem::InvalidMemberInModel { .. }));
    }

    #[test]
    fn silent_skips_do_not_error() {
        // write-only, shared, contract-only, inherited, dispatch overrides:
        // all drop out quietly when unforced
        let def = TypeDef::entity("T")
            .member(scalar("A"))
            .member(scalar("B"))
            .member(scalar("W").write_only())
            .member(scalar("S").shared())
            .member(scalar("C").origin(MemberOrigin::ContractOnly))
            .member(scalar("I").origin(MemberOrigin::Inherited))
            .member(scalar("D").origin(MemberOrigin::DispatchOverride));

        let members = classify_one(def).unwrap();
        let idents: Vec<&str> = members.iter().map(|m| m.def.ident.as_str()).collect();
        assert_eq!(idents, vec!["A", "B"]);
    }

    #[test]
    fn force_include_covers_private_and_dispatch_override() {
        let def = TypeDef::entity("T")
            .member(scalar("A"))
            .member(scalar("P").private().directive(Directive::include()))
            .member(
                scalar("D")
                    .origin(MemberOrigin::DispatchOverride)
                    .directive(Directive::include()),
            );

        let members = classify_one(def).unwrap();
        assert_eq!(members.len(), 3);
    }

    #[test]
    fn shadowing_and_contract_impl_are_included() {
        let def = TypeDef::entity("T")
            .member(scalar("A").origin(MemberOrigin::Shadowing))
            .member(scalar("B").origin(MemberOrigin::ContractImpl));

        assert_eq!(classify_one(def).unwrap().len(), 2);
    }

    #[test]
    fn entity_needs_two_members() {
        let err = classify_one(TypeDef::entity("T").member(scalar("A"))).unwrap_err();
        assert_eq!(
            err.problem,
            Problem::NotEnoughMembers {
                expected: 2,
                found: 1
            }
        );
    }

    #[test]
    fn unknown_named_type_is_reported_at_the_member() {
        let def = TypeDef::entity("T")
            .member(scalar("A"))
            .member(MemberDef::new("B", DeclaredType::named("Missing")));

        let err = classify_one(def).unwrap_err();
        assert_eq!(
            err.problem,
            Problem::UnknownType {
                ident: "Missing".to_string()
            }
        );
        assert_eq!(err.location.to_string(), "T -> B");
    }
}
