//! Successful translation shapes: principals, aggregates, references,
//! relations, naming, caching, and concurrency.

use relmap::prelude::*;
use std::sync::{Arc, Mutex};

fn ulid_id() -> MemberDef {
    MemberDef::new("Id", DeclaredType::primitive(Primitive::Ulid)).directive(Directive::non_null())
}

fn text(ident: &str) -> MemberDef {
    MemberDef::new(ident, DeclaredType::primitive(Primitive::Text))
}

fn field_names(table: &Table) -> Vec<&str> {
    table.fields.iter().map(|f| f.name.as_str()).collect()
}

#[test]
fn principal_table_carries_fields_and_deduced_primary_key() {
    let graph = ModelGraph::builder()
        .ty(TypeDef::entity("Customer")
            .member(ulid_id())
            .member(text("Name")))
        .build();

    let translation = Compiler::new(graph).translate("Customer").unwrap();

    assert_eq!(translation.source, "Customer");
    assert!(translation.relations.is_empty());
    assert!(translation.principal.instances.is_empty());

    let table = &translation.principal.table;
    assert_eq!(table.name, "Customer");
    assert_eq!(field_names(table), vec!["Id", "Name"]);
    assert!(!table.field("Id").unwrap().nullable);
    assert!(table.field("Name").unwrap().nullable);
    assert_eq!(table.field("Id").unwrap().storage, Primitive::Ulid);
    assert_eq!(table.primary_key.fields(), ["Id".to_string()]);
    assert_eq!(table.primary_key.source, PrimaryKeySource::Deduced);
}

#[test]
fn aggregates_flatten_into_dotted_fields() {
    let graph = ModelGraph::builder()
        .ty(TypeDef::aggregate("Address")
            .member(text("City"))
            .member(text("Zip")))
        .ty(TypeDef::entity("Customer")
            .member(ulid_id())
            .member(MemberDef::new("Home", DeclaredType::named("Address"))))
        .build();

    let translation = Compiler::new(graph).translate("Customer").unwrap();
    let table = &translation.principal.table;

    assert_eq!(field_names(table), vec!["Id", "Home.City", "Home.Zip"]);
    assert_eq!(table.field("Home.City").unwrap().path, "Home.City");
}

#[test]
fn references_contribute_target_key_fields_and_a_foreign_key() {
    let graph = ModelGraph::builder()
        .ty(TypeDef::entity("Country")
            .member(ulid_id())
            .member(text("Name")))
        .ty(TypeDef::entity("Customer")
            .member(ulid_id())
            .member(MemberDef::new("Homeland", DeclaredType::named("Country"))))
        .build();

    let translation = Compiler::new(graph).translate("Customer").unwrap();
    let table = &translation.principal.table;

    assert_eq!(field_names(table), vec!["Id", "Homeland.Id"]);
    // reference-contributed fields carry the target storage and are
    // required unless the container is marked nullable
    let fk_field = table.field("Homeland.Id").unwrap();
    assert_eq!(fk_field.storage, Primitive::Ulid);
    assert!(!fk_field.nullable);

    assert_eq!(table.foreign_keys.len(), 1);
    let fk = &table.foreign_keys[0];
    assert_eq!(fk.fields, ["Homeland.Id".to_string()]);
    assert_eq!(fk.target_type, "Country");
    assert_eq!(fk.target_table, "Country");
    assert_eq!(fk.target_fields, ["Id".to_string()]);
    assert_eq!(fk.on_delete, CascadeAction::Cascade);
    assert_eq!(fk.on_update, CascadeAction::Cascade);
}

#[test]
fn nullable_reference_renders_its_fields_nullable() {
    let graph = ModelGraph::builder()
        .ty(TypeDef::entity("Country")
            .member(ulid_id())
            .member(text("Name")))
        .ty(TypeDef::entity("Customer")
            .member(ulid_id())
            .member(
                MemberDef::new("Homeland", DeclaredType::named("Country"))
                    .directive(Directive::nullable()),
            ))
        .build();

    let translation = Compiler::new(graph).translate("Customer").unwrap();
    assert!(
        translation
            .principal
            .table
            .field("Homeland.Id")
            .unwrap()
            .nullable
    );
}

#[test]
fn shared_key_group_yields_one_named_candidate_key() {
    // Scenario A: two members jointly annotated with group "K"
    let graph = ModelGraph::builder()
        .ty(TypeDef::entity("Account")
            .member(
                text("Code")
                    .directive(Directive::non_null())
                    .directive(Directive::key().named("K")),
            )
            .member(
                text("Branch")
                    .directive(Directive::non_null())
                    .directive(Directive::key().named("K")),
            ))
        .build();

    let translation = Compiler::new(graph).translate("Account").unwrap();
    let table = &translation.principal.table;

    assert_eq!(table.candidate_keys.len(), 1);
    let key = &table.candidate_keys[0];
    assert_eq!(key.name.as_deref(), Some("K"));
    assert_eq!(key.fields, ["Code".to_string(), "Branch".to_string()]);
}

#[test]
fn single_non_nullable_candidate_key_is_promoted() {
    // Scenario B
    let graph = ModelGraph::builder()
        .ty(TypeDef::entity("Account")
            .member(
                text("Email")
                    .directive(Directive::non_null())
                    .directive(Directive::key()),
            )
            .member(text("Name")))
        .build();

    let translation = Compiler::new(graph).translate("Account").unwrap();
    let table = &translation.principal.table;

    assert_eq!(table.primary_key.fields(), ["Email".to_string()]);
    assert_eq!(table.primary_key.source, PrimaryKeySource::Promoted);
}

#[test]
fn inclusion_minus_exclusion_composes_the_allowed_set() {
    // Scenario C
    let graph = ModelGraph::builder()
        .ty(TypeDef::entity("Survey")
            .member(ulid_id())
            .member(
                MemberDef::new("Rating", DeclaredType::primitive(Primitive::Int32))
                    .directive(Directive::one_of([
                        Literal::Int(1),
                        Literal::Int(2),
                        Literal::Int(3),
                    ]))
                    .directive(Directive::none_of([Literal::Int(2)])),
            ))
        .build();

    let translation = Compiler::new(graph).translate("Survey").unwrap();
    let constraints = &translation.principal.table.constraints;

    assert_eq!(constraints.len(), 1);
    assert_eq!(constraints[0].field, "Rating");
    assert_eq!(
        constraints[0].kind,
        ConstraintKind::OneOf {
            values: vec![Literal::Int(1), Literal::Int(3)]
        }
    );
}

#[test]
fn defaults_survive_onto_fields() {
    let graph = ModelGraph::builder()
        .ty(TypeDef::entity("Customer")
            .member(ulid_id())
            .member(text("Name").directive(Directive::default_value(Literal::Text(
                "unknown".to_string(),
            )))))
        .build();

    let translation = Compiler::new(graph).translate("Customer").unwrap();
    assert_eq!(
        translation.principal.table.field("Name").unwrap().default,
        Some(Literal::Text("unknown".to_string()))
    );
}

#[test]
fn map_relations_get_anchor_key_and_value_columns() {
    let graph = ModelGraph::builder()
        .ty(TypeDef::entity("Customer")
            .member(ulid_id())
            .member(MemberDef::new(
                "Phones",
                DeclaredType::map(Primitive::Text, DeclaredType::primitive(Primitive::Text)),
            )))
        .build();

    let translation = Compiler::new(graph).translate("Customer").unwrap();
    assert_eq!(translation.relations.len(), 1);

    let unit = &translation.relations[0];
    assert_eq!(unit.member, "Phones");
    assert_eq!(unit.table.name, "Customer.Phones");
    assert_eq!(field_names(&unit.table), vec!["Owner.Id", "Key", "Value"]);
    assert_eq!(
        unit.table.primary_key.fields(),
        ["Owner.Id".to_string(), "Key".to_string()]
    );
    assert_eq!(unit.table.primary_key.source, PrimaryKeySource::Synthetic);

    let anchor = &unit.table.foreign_keys[0];
    assert_eq!(anchor.fields, ["Owner.Id".to_string()]);
    assert_eq!(anchor.target_table, "Customer");
    assert_eq!(anchor.target_fields, ["Id".to_string()]);
}

#[test]
fn list_relations_get_a_positional_index_column() {
    let graph = ModelGraph::builder()
        .ty(TypeDef::entity("Invoice")
            .member(ulid_id())
            .member(text("Memo")))
        .ty(TypeDef::entity("Customer")
            .member(ulid_id())
            .member(MemberDef::new(
                "Invoices",
                DeclaredType::list(DeclaredType::named("Invoice")),
            )))
        .build();

    let translation = Compiler::new(graph).translate("Customer").unwrap();
    let unit = &translation.relations[0];

    assert_eq!(
        field_names(&unit.table),
        vec!["Owner.Id", "Index", "Value.Id"]
    );
    assert_eq!(unit.table.field("Index").unwrap().storage, Primitive::Nat32);
    assert_eq!(
        unit.table.primary_key.fields(),
        ["Owner.Id".to_string(), "Index".to_string()]
    );

    // anchor first, then the element's own foreign key
    assert_eq!(unit.table.foreign_keys.len(), 2);
    assert_eq!(unit.table.foreign_keys[1].target_table, "Invoice");
    assert_eq!(unit.table.foreign_keys[1].fields, ["Value.Id".to_string()]);
}

#[test]
fn set_relations_fold_the_element_into_the_row_identity() {
    let graph = ModelGraph::builder()
        .ty(TypeDef::entity("Customer")
            .member(ulid_id())
            .member(MemberDef::new(
                "Tags",
                DeclaredType::set(DeclaredType::primitive(Primitive::Text)),
            )))
        .build();

    let translation = Compiler::new(graph).translate("Customer").unwrap();
    let unit = &translation.relations[0];

    assert_eq!(field_names(&unit.table), vec!["Owner.Id", "Value"]);
    assert!(!unit.table.field("Value").unwrap().nullable);
    assert_eq!(
        unit.table.primary_key.fields(),
        ["Owner.Id".to_string(), "Value".to_string()]
    );
}

#[test]
fn relations_nested_in_aggregates_bubble_up_to_the_owner() {
    let graph = ModelGraph::builder()
        .ty(TypeDef::aggregate("Address")
            .member(text("City"))
            .member(MemberDef::new(
                "Phones",
                DeclaredType::set(DeclaredType::primitive(Primitive::Text)),
            )))
        .ty(TypeDef::entity("Customer")
            .member(ulid_id())
            .member(MemberDef::new("Home", DeclaredType::named("Address"))))
        .build();

    let translation = Compiler::new(graph).translate("Customer").unwrap();

    assert_eq!(
        field_names(&translation.principal.table),
        vec!["Id", "Home.City"]
    );
    assert_eq!(translation.relations.len(), 1);
    assert_eq!(translation.relations[0].member, "Home.Phones");
    assert_eq!(translation.relations[0].table.name, "Customer.Home.Phones");
}

#[test]
fn self_references_resolve_through_the_forward_handle() {
    let graph = ModelGraph::builder()
        .ty(TypeDef::entity("Employee")
            .member(ulid_id())
            .member(MemberDef::new("Manager", DeclaredType::named("Employee"))))
        .build();

    let compiler = Compiler::new(graph);
    let translation = compiler.translate("Employee").unwrap();
    let table = &translation.principal.table;

    assert_eq!(field_names(table), vec!["Id", "Manager.Id"]);
    assert_eq!(table.foreign_keys[0].target_table, "Employee");
    assert!(compiler.obs_report().forward_handles >= 1);
}

#[test]
fn mutually_referencing_entities_resolve() {
    let graph = ModelGraph::builder()
        .ty(TypeDef::entity("Author")
            .member(ulid_id())
            .member(MemberDef::new("Favorite", DeclaredType::named("Book"))))
        .ty(TypeDef::entity("Book")
            .member(ulid_id())
            .member(MemberDef::new("Writer", DeclaredType::named("Author"))))
        .build();

    let compiler = Compiler::new(graph);
    let author = compiler.translate("Author").unwrap();
    let book = compiler.translate("Book").unwrap();

    assert_eq!(
        author.principal.table.foreign_keys[0].target_table,
        "Book"
    );
    assert_eq!(
        book.principal.table.foreign_keys[0].target_table,
        "Author"
    );
}

#[test]
fn renames_closest_to_the_leaf_win() {
    let graph = ModelGraph::builder()
        .ty(TypeDef::aggregate("Address")
            .member(text("City").directive(Directive::rename("Town")))
            .member(text("Zip")))
        .ty(TypeDef::entity("Customer")
            .member(ulid_id())
            .member(
                MemberDef::new("Home", DeclaredType::named("Address"))
                    // farther from the leaf than the aggregate's own rename
                    .directive(Directive::rename("Ville").path("City"))
                    .directive(Directive::rename("Zipcode").path("Zip")),
            ))
        .build();

    let translation = Compiler::new(graph).translate("Customer").unwrap();
    let table = &translation.principal.table;

    assert_eq!(
        field_names(table),
        vec!["Id", "Home.Town", "Home.Zipcode"]
    );
}

#[test]
fn container_renames_replace_their_own_segment() {
    let graph = ModelGraph::builder()
        .ty(TypeDef::aggregate("Address").member(text("City")))
        .ty(TypeDef::entity("Customer")
            .member(ulid_id())
            .member(
                MemberDef::new("Home", DeclaredType::named("Address"))
                    .directive(Directive::rename("Casa")),
            ))
        .build();

    let translation = Compiler::new(graph).translate("Customer").unwrap();
    assert_eq!(
        field_names(&translation.principal.table),
        vec!["Id", "Casa.City"]
    );
}

#[test]
fn type_level_rename_names_the_principal_table() {
    let graph = ModelGraph::builder()
        .ty(TypeDef::entity("Customer")
            .directive(Directive::rename("Client"))
            .member(ulid_id())
            .member(text("Name")))
        .build();

    let translation = Compiler::new(graph).translate("Customer").unwrap();
    assert_eq!(translation.principal.table.name, "Client");
}

#[test]
fn enum_scalars_store_numerically_by_default_and_symbolically_on_request() {
    let color = || EnumDef::new("Color", [("Red", 0), ("Green", 1), ("Blue", 2)]);

    let graph = ModelGraph::builder()
        .ty(TypeDef::entity("Paint")
            .member(ulid_id())
            .member(MemberDef::new("Tone", DeclaredType::enumerated(color())))
            .member(
                MemberDef::new("Label", DeclaredType::enumerated(color())).directive(
                    Directive::new(DirectiveKind::EnumStorage(EnumRepr::Symbolic)),
                ),
            ))
        .build();

    let translation = Compiler::new(graph).translate("Paint").unwrap();
    let table = &translation.principal.table;

    assert_eq!(table.field("Tone").unwrap().storage, Primitive::Int32);
    assert_eq!(table.field("Label").unwrap().storage, Primitive::Text);
}

#[test]
fn converters_override_the_storage_kind() {
    let graph = ModelGraph::builder()
        .ty(TypeDef::entity("Vault")
            .member(ulid_id())
            .member(
                MemberDef::new("Token", DeclaredType::primitive(Primitive::Ulid)).directive(
                    Directive::new(DirectiveKind::Convert(ConverterDef::new(
                        "UlidAsText",
                        "Ulid",
                        Primitive::Text,
                    ))),
                ),
            ))
        .build();

    let translation = Compiler::new(graph).translate("Vault").unwrap();
    assert_eq!(
        translation.principal.table.field("Token").unwrap().storage,
        Primitive::Text
    );
}

#[test]
fn pre_defined_entities_carry_their_instances() {
    let graph = ModelGraph::builder()
        .ty(TypeDef::pre_defined("Currency", PreDefined::new(["Usd", "Eur", "Gbp"]))
            .member(ulid_id())
            .member(text("Code")))
        .build();

    let translation = Compiler::new(graph).translate("Currency").unwrap();
    assert_eq!(
        translation.principal.instances,
        vec!["Usd".to_string(), "Eur".to_string(), "Gbp".to_string()]
    );
}

#[test]
fn second_translation_is_served_from_cache_and_is_identical() {
    let graph = ModelGraph::builder()
        .ty(TypeDef::entity("Customer")
            .member(ulid_id())
            .member(text("Name")))
        .build();

    let compiler = Compiler::new(graph);
    let first = compiler.translate("Customer").unwrap();
    let second = compiler.translate("Customer").unwrap();

    assert_eq!(*first, *second);

    let report = compiler.obs_report();
    assert_eq!(report.translations, 1);
    assert_eq!(report.cache_misses, 1);
    assert_eq!(report.cache_hits, 1);
}

#[test]
fn independent_compilers_produce_structurally_identical_translations() {
    let build = || {
        ModelGraph::builder()
            .ty(TypeDef::aggregate("Address")
                .member(text("City"))
                .member(text("Zip")))
            .ty(TypeDef::entity("Customer")
                .member(ulid_id())
                .member(MemberDef::new("Home", DeclaredType::named("Address"))))
            .build()
    };

    let first = Compiler::new(build()).translate("Customer").unwrap();
    let second = Compiler::new(build()).translate("Customer").unwrap();

    assert_eq!(*first, *second);
}

#[test]
fn concurrent_translations_compute_at_most_once() {
    let graph = ModelGraph::builder()
        .ty(TypeDef::entity("Customer")
            .member(ulid_id())
            .member(text("Name")))
        .build();

    let compiler = Arc::new(Compiler::new(graph));

    std::thread::scope(|scope| {
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let compiler = Arc::clone(&compiler);
                scope.spawn(move || compiler.translate("Customer").unwrap())
            })
            .collect();

        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        for pair in results.windows(2) {
            assert_eq!(*pair[0], *pair[1]);
        }
    });

    assert_eq!(compiler.obs_report().translations, 1);
}

#[test]
fn failures_are_not_cached_and_can_be_retried() {
    let graph = ModelGraph::builder()
        .ty(TypeDef::entity("Broken").member(ulid_id()))
        .build();

    let compiler = Compiler::new(graph);
    assert!(compiler.translate("Broken").is_err());
    assert!(compiler.translate("Broken").is_err());

    let report = compiler.obs_report();
    assert_eq!(report.failures, 2);
    assert_eq!(report.cache_misses, 2);
    assert_eq!(report.cache_hits, 0);
}

#[test]
fn trace_sink_observes_cache_traffic_and_stages() {
    #[derive(Default)]
    struct Recorder(Mutex<Vec<String>>);

    impl TraceSink for Recorder {
        fn on_event(&self, event: TraceEvent<'_>) {
            self.0
                .lock()
                .unwrap()
                .push(format!("{event:?}"));
        }
    }

    let graph = ModelGraph::builder()
        .ty(TypeDef::entity("Customer")
            .member(ulid_id())
            .member(text("Name")))
        .build();

    let sink = Arc::new(Recorder::default());
    let compiler = Compiler::with_options(
        graph,
        CompilerOptions::default().with_trace(sink.clone()),
    );

    compiler.translate("Customer").unwrap();
    compiler.translate("Customer").unwrap();

    let events = sink.0.lock().unwrap();
    assert!(events.iter().any(|e| e.contains("CacheMiss")));
    assert!(events.iter().any(|e| e.contains("CacheHit")));
    assert!(events.iter().any(|e| e.contains("Assemble")));
}

#[test]
fn translations_serialize_for_downstream_snapshots() {
    let graph = ModelGraph::builder()
        .ty(TypeDef::entity("Customer")
            .member(ulid_id())
            .member(text("Name")))
        .build();

    let translation = Compiler::new(graph).translate("Customer").unwrap();
    let json = serde_json::to_value(&*translation).unwrap();

    assert_eq!(json["source"], "Customer");
    assert_eq!(json["principal"]["table"]["name"], "Customer");
    assert_eq!(
        json["principal"]["table"]["fields"][0]["name"],
        "Id"
    );
}
