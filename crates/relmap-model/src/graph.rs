use crate::TypeDef;
use std::collections::BTreeMap;

///
/// TypeGraph
///
/// The read-only oracle the compiler consults. Implementations must be
/// deterministic and side-effect free: the same identifier always yields the
/// same definition for the lifetime of a compilation run.
///

pub trait TypeGraph: Send + Sync {
    fn get(&self, ident: &str) -> Option<&TypeDef>;
}

///
/// ModelGraph
///
/// In-memory `TypeGraph` backed by an ordered map, used by fixtures and by
/// hosts that assemble their model programmatically.
///

#[derive(Clone, Debug, Default)]
pub struct ModelGraph {
    types: BTreeMap<String, TypeDef>,
}

impl ModelGraph {
    #[must_use]
    pub fn builder() -> ModelGraphBuilder {
        ModelGraphBuilder::default()
    }

    #[must_use]
    pub fn idents(&self) -> impl Iterator<Item = &str> {
        self.types.keys().map(String::as_str)
    }
}

impl TypeGraph for ModelGraph {
    fn get(&self, ident: &str) -> Option<&TypeDef> {
        self.types.get(ident)
    }
}

///
/// ModelGraphBuilder
///

#[derive(Clone, Debug, Default)]
pub struct ModelGraphBuilder {
    types: BTreeMap<String, TypeDef>,
}

impl ModelGraphBuilder {
    /// Add a type definition; a repeated ident replaces the earlier one.
    #[must_use]
    pub fn ty(mut self, def: TypeDef) -> Self {
        self.types.insert(def.ident.clone(), def);
        self
    }

    #[must_use]
    pub fn build(self) -> ModelGraph {
        ModelGraph { types: self.types }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{DeclaredType, MemberDef};
    use relmap_primitives::Primitive;

    #[test]
    fn builder_replaces_duplicate_idents() {
        let graph = ModelGraph::builder()
            .ty(TypeDef::entity("A"))
            .ty(TypeDef::entity("A").member(MemberDef::new(
                "Id",
                DeclaredType::primitive(Primitive::Ulid),
            )))
            .build();

        let def = graph.get("A").expect("A must resolve");
        assert_eq!(def.members.len(), 1);
    }

    #[test]
    fn lookup_misses_return_none() {
        let graph = ModelGraph::builder().build();
        assert!(graph.get("Missing").is_none());
    }
}
