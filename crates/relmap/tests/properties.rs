//! Property tests over generated type graphs: the invariants every
//! successful translation must hold.

use proptest::prelude::*;
use relmap::prelude::*;
use std::collections::BTreeSet;

fn scalar_primitive() -> impl Strategy<Value = Primitive> {
    prop_oneof![
        Just(Primitive::Bool),
        Just(Primitive::Int32),
        Just(Primitive::Int64),
        Just(Primitive::Nat16),
        Just(Primitive::Float64),
        Just(Primitive::Text),
        Just(Primitive::Timestamp),
    ]
}

// (storage, non-null, in-group-K) per generated member
fn arb_members() -> impl Strategy<Value = Vec<(Primitive, bool, bool)>> {
    prop::collection::vec((scalar_primitive(), any::<bool>(), any::<bool>()), 1..6)
}

fn entity_graph(members: &[(Primitive, bool, bool)]) -> ModelGraph {
    let mut def = TypeDef::entity("T").member(
        MemberDef::new("Id", DeclaredType::primitive(Primitive::Ulid))
            .directive(Directive::non_null()),
    );

    for (i, (storage, non_null, grouped)) in members.iter().enumerate() {
        let mut member = MemberDef::new(format!("F{i}"), DeclaredType::primitive(*storage));
        if *non_null || *grouped {
            member = member.directive(Directive::non_null());
        }
        if *grouped {
            member = member.directive(Directive::key().named("K"));
        }
        def = def.member(member);
    }

    ModelGraph::builder().ty(def).build()
}

proptest! {
    #[test]
    fn principal_tables_hold_the_core_invariants(members in arb_members()) {
        let translation = Compiler::new(entity_graph(&members))
            .translate("T")
            .unwrap();
        let table = &translation.principal.table;

        // at least two fields, and every primary-key field is non-nullable
        prop_assert!(table.fields.len() >= 2);
        prop_assert!(!table.primary_key.fields().is_empty());
        for name in table.primary_key.fields() {
            let field = table.field(name).unwrap();
            prop_assert!(!field.nullable, "pk field {name} must be non-nullable");
        }

        // field names are unique
        let names: BTreeSet<&str> = table.fields.iter().map(|f| f.name.as_str()).collect();
        prop_assert_eq!(names.len(), table.fields.len());

        // no two candidate keys share a field-set
        let sets: Vec<BTreeSet<&str>> = table
            .candidate_keys
            .iter()
            .map(|k| k.fields.iter().map(String::as_str).collect())
            .collect();
        for (i, a) in sets.iter().enumerate() {
            for b in &sets[i + 1..] {
                prop_assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn grouped_members_form_one_named_candidate_key(members in arb_members()) {
        let grouped: Vec<String> = members
            .iter()
            .enumerate()
            .filter(|(_, (_, _, grouped))| *grouped)
            .map(|(i, _)| format!("F{i}"))
            .collect();

        let translation = Compiler::new(entity_graph(&members))
            .translate("T")
            .unwrap();
        let table = &translation.principal.table;

        let named: Vec<_> = table
            .candidate_keys
            .iter()
            .filter(|k| k.name.as_deref() == Some("K"))
            .collect();

        if grouped.is_empty() {
            prop_assert!(named.is_empty());
        } else {
            prop_assert_eq!(named.len(), 1);
            prop_assert_eq!(&named[0].fields, &grouped);
        }
    }

    #[test]
    fn translation_is_deterministic(members in arb_members()) {
        let first = Compiler::new(entity_graph(&members))
            .translate("T")
            .unwrap();
        let second = Compiler::new(entity_graph(&members))
            .translate("T")
            .unwrap();

        prop_assert_eq!(&*first, &*second);
    }

    #[test]
    fn composed_inclusion_is_include_minus_exclude(
        include in prop::collection::btree_set(1i128..20, 1..8),
        exclude in prop::collection::btree_set(1i128..20, 0..8),
    ) {
        let graph = ModelGraph::builder()
            .ty(TypeDef::entity("T")
                .member(
                    MemberDef::new("Id", DeclaredType::primitive(Primitive::Ulid))
                        .directive(Directive::non_null()),
                )
                .member(
                    MemberDef::new("Rating", DeclaredType::primitive(Primitive::Int32))
                        .directive(Directive::one_of(include.iter().map(|v| Literal::Int(*v))))
                        .directive(Directive::none_of(exclude.iter().map(|v| Literal::Int(*v)))),
                ))
            .build();

        let difference: Vec<Literal> = include
            .difference(&exclude)
            .map(|v| Literal::Int(*v))
            .collect();

        match Compiler::new(graph).translate("T") {
            Ok(translation) => {
                prop_assert!(!difference.is_empty());
                let kinds: Vec<_> = translation
                    .principal
                    .table
                    .constraints
                    .iter()
                    .map(|c| &c.kind)
                    .collect();
                let expected_kind = ConstraintKind::OneOf { values: difference };
                prop_assert_eq!(kinds, vec![&expected_kind]);
            }
            Err(err) => {
                prop_assert!(difference.is_empty());
                let is_unsatisfiable =
                    matches!(err.problem, Problem::UnsatisfiableConstraint { .. });
                prop_assert!(is_unsatisfiable);
            }
        }
    }

    #[test]
    fn disjoint_bounds_always_fail_as_unsatisfiable(lo in 0i128..100, gap in 1i128..50) {
        let graph = ModelGraph::builder()
            .ty(TypeDef::entity("T")
                .member(
                    MemberDef::new("Id", DeclaredType::primitive(Primitive::Ulid))
                        .directive(Directive::non_null()),
                )
                .member(
                    MemberDef::new("Score", DeclaredType::primitive(Primitive::Int64))
                        .directive(Directive::greater_than(Literal::Int(lo)))
                        .directive(Directive::less_than(Literal::Int(lo - gap))),
                ))
            .build();

        let err = Compiler::new(graph).translate("T").unwrap_err();
        let is_unsatisfiable = matches!(err.problem, Problem::UnsatisfiableConstraint { .. });
        prop_assert!(is_unsatisfiable);
    }
}
