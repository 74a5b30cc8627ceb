//! The compiler: one injectable instance owning one translation cache.
//!
//! Translation of a single type is synchronous; the cache provides
//! at-most-once computation per key under concurrent callers, and the run
//! context breaks cycles by serving in-flight types through their identity
//! shape (table name + primary-key fields) instead of recursing.

use crate::{
    assemble::{self, naming},
    classify::classify_members,
    constrain,
    error::{Location, Problem, TranslateError},
    keys,
    obs::{ObsCounters, ObsReport, Stage, TraceEvent},
    options::CompilerOptions,
    predefined,
    resolve::{
        self,
        tree::{RefTarget, TargetResolver},
    },
    schema::Translation,
};
use relmap_model::{TypeDef, TypeGraph, TypeShape};
use relmap_primitives::Primitive;
use std::{
    collections::BTreeMap,
    sync::{Arc, Condvar, Mutex},
};

///
/// Compiler
///

pub struct Compiler<G: TypeGraph> {
    graph: G,
    options: CompilerOptions,
    cache: Mutex<BTreeMap<String, Slot>>,
    identities: Mutex<BTreeMap<String, IdentityShape>>,
    table_registry: Mutex<BTreeMap<String, String>>,
    predefined_ok: Mutex<std::collections::BTreeSet<String>>,
    counters: ObsCounters,
}

impl<G: TypeGraph> Compiler<G> {
    #[must_use]
    pub fn new(graph: G) -> Self {
        Self::with_options(graph, CompilerOptions::default())
    }

    #[must_use]
    pub fn with_options(graph: G, options: CompilerOptions) -> Self {
        Self {
            graph,
            options,
            cache: Mutex::new(BTreeMap::new()),
            identities: Mutex::new(BTreeMap::new()),
            table_registry: Mutex::new(BTreeMap::new()),
            predefined_ok: Mutex::new(std::collections::BTreeSet::new()),
            counters: ObsCounters::default(),
        }
    }

    /// Translate one entity type, served from the cache when possible.
    pub fn translate(&self, ident: &str) -> Result<Arc<Translation>, TranslateError> {
        let mut ctx = RunCtx::default();
        self.translate_entry(ident, &mut ctx)
    }

    /// Cumulative cache and translation counters.
    pub fn obs_report(&self) -> ObsReport {
        self.counters.report()
    }

    #[must_use]
    pub const fn options(&self) -> &CompilerOptions {
        &self.options
    }

    #[must_use]
    pub const fn graph(&self) -> &G {
        &self.graph
    }

    //
    // cache entry
    //

    fn translate_entry(
        &self,
        ident: &str,
        ctx: &mut RunCtx,
    ) -> Result<Arc<Translation>, TranslateError> {
        let flight = {
            let mut cache = self.cache.lock().expect("translation cache poisoned");
            match cache.get(ident) {
                Some(Slot::Ready(translation)) => {
                    ObsCounters::bump(&self.counters.cache_hits);
                    self.trace(TraceEvent::CacheHit { ident });
                    return Ok(Arc::clone(translation));
                }
                Some(Slot::InFlight(flight)) => Arc::clone(flight),
                None => {
                    ObsCounters::bump(&self.counters.cache_misses);
                    self.trace(TraceEvent::CacheMiss { ident });
                    let flight = Arc::new(Flight::default());
                    cache.insert(ident.to_string(), Slot::InFlight(Arc::clone(&flight)));
                    drop(cache);

                    let result = self.compute(ident, ctx).map(Arc::new);

                    let mut cache = self.cache.lock().expect("translation cache poisoned");
                    match &result {
                        Ok(translation) => {
                            cache.insert(ident.to_string(), Slot::Ready(Arc::clone(translation)));
                            ObsCounters::bump(&self.counters.translations);
                        }
                        // failures are not cached; a retry recomputes
                        Err(_) => {
                            cache.remove(ident);
                            ObsCounters::bump(&self.counters.failures);
                        }
                    }
                    drop(cache);

                    flight.complete(result.clone());
                    return result;
                }
            }
        };

        flight.wait()
    }

    //
    // pipeline
    //

    fn compute(&self, ident: &str, ctx: &mut RunCtx) -> Result<Translation, TranslateError> {
        ctx.stack.push(ident.to_string());
        let result = self.compute_inner(ident, ctx);
        ctx.stack.pop();
        result
    }

    fn compute_inner(&self, ident: &str, ctx: &mut RunCtx) -> Result<Translation, TranslateError> {
        let def = self.lookup_entity(ident)?;
        let location = Location::root(ident.to_string());

        let members = classify_members(&self.graph, def, &location)?;
        self.trace_stage(ident, Stage::Classify);

        let resolved = {
            let mut targets = FullTargets {
                compiler: self,
                ctx,
            };
            resolve::resolve_entity(&self.graph, &self.options, def, &members, &mut targets, true)?
        };
        self.trace_stage(ident, Stage::Resolve);

        let (leaves, seeds) = resolve::flatten(&resolved, &self.options)?;

        let keyset = keys::deduce(ident, &leaves, &resolved.key_apps, &self.options)?;
        self.trace_stage(ident, Stage::Keys);

        let composed = constrain::compose_all(ident, &leaves)?;
        self.trace_stage(ident, Stage::Constrain);

        let instances = match def.predefined() {
            Some(predefined) => predefined::validate_instances(predefined, &location)?,
            None => Vec::new(),
        };

        let translation = assemble::assemble(
            &resolved,
            &leaves,
            &seeds,
            &keyset,
            &composed,
            instances,
            &self.options,
        )?;
        self.trace_stage(ident, Stage::Assemble);

        if def.predefined().is_some() {
            let mut verified = self
                .predefined_ok
                .lock()
                .expect("pre-defined closure memo poisoned");
            predefined::check_closure(&self.graph, ident, &mut verified)?;
            self.trace_stage(ident, Stage::Closure);
        }

        self.register_tables(&translation)?;

        Ok(translation)
    }

    fn lookup_entity(&self, ident: &str) -> Result<&TypeDef, TranslateError> {
        let location = Location::root(ident.to_string());

        let def = self.graph.get(ident).ok_or_else(|| {
            TranslateError::new(
                location.clone(),
                Problem::UnknownType {
                    ident: ident.to_string(),
                },
            )
        })?;

        let category = match def.shape {
            TypeShape::Abstract => Some("an abstract type"),
            TypeShape::OpenGeneric => Some("an open generic type"),
            TypeShape::Concrete if !def.is_entity() => Some("an embedded aggregate type"),
            TypeShape::Concrete => None,
        };
        if let Some(category) = category {
            return Err(TranslateError::new(
                location,
                Problem::InvalidEntityShape {
                    category: category.to_string(),
                },
            ));
        }

        Ok(def)
    }

    //
    // reference targets
    //

    // A reference triggers full translation of its target (memoized), except
    // when the target is already being resolved: the identity shape then acts
    // as the forward handle filled in when the outer resolution completes.
    fn target_of(
        &self,
        ident: &str,
        ctx: &mut RunCtx,
        trail: &Location,
    ) -> Result<RefTarget, TranslateError> {
        let in_stack = ctx.stack.iter().any(|s| s == ident);

        if in_stack {
            ObsCounters::bump(&self.counters.forward_handles);
            self.trace(TraceEvent::ForwardHandle { ident });
        } else {
            let in_flight = matches!(
                self.cache
                    .lock()
                    .expect("translation cache poisoned")
                    .get(ident),
                Some(Slot::InFlight(_))
            );
            if in_flight {
                // another caller owns the computation; serve the identity
                // rather than blocking a resolution on a resolution
                ObsCounters::bump(&self.counters.forward_handles);
                self.trace(TraceEvent::ForwardHandle { ident });
            } else {
                self.translate_entry(ident, ctx)
                    .map_err(|e| e.prefixed(trail))?;
            }
        }

        let shape = self.identity(ident, ctx).map_err(|e| e.prefixed(trail))?;

        Ok(RefTarget {
            type_ident: ident.to_string(),
            table_name: shape.table_name,
            pk_fields: shape.pk_fields,
            member_idents: shape.member_idents,
        })
    }

    //
    // identity shapes
    //

    fn identity(&self, ident: &str, ctx: &mut RunCtx) -> Result<IdentityShape, TranslateError> {
        match self.identity_try(ident, ctx)? {
            IdentityOutcome::Shape(shape) => Ok(shape),
            IdentityOutcome::Cycle => {
                let mut chain = ctx.identity_stack.clone();
                chain.push(ident.to_string());
                Err(TranslateError::new(
                    chain_location(&chain),
                    Problem::CouldNotDeduceKey {
                        detail: "the primary key transitively depends on itself".to_string(),
                    },
                ))
            }
        }
    }

    // Cycle-aware identity lookup. A type already on the identity stack is
    // reported as a cycle rather than recursed into; the caller decides
    // whether that is fatal (it is only when the key actually needs those
    // fields).
    fn identity_try(
        &self,
        ident: &str,
        ctx: &mut RunCtx,
    ) -> Result<IdentityOutcome, TranslateError> {
        if let Some(shape) = self
            .identities
            .lock()
            .expect("identity memo poisoned")
            .get(ident)
        {
            return Ok(IdentityOutcome::Shape(shape.clone()));
        }

        if ctx.identity_stack.iter().any(|s| s == ident) {
            return Ok(IdentityOutcome::Cycle);
        }

        ctx.identity_stack.push(ident.to_string());
        let result = self.compute_identity(ident, ctx);
        ctx.identity_stack.pop();
        let shape = result?;

        self.identities
            .lock()
            .expect("identity memo poisoned")
            .insert(ident.to_string(), shape.clone());

        Ok(IdentityOutcome::Shape(shape))
    }

    // The identity pass runs the same classify/resolve/keys stages with
    // relations skipped and references resolved identity-to-identity, so the
    // result always agrees with the full translation.
    fn compute_identity(
        &self,
        ident: &str,
        ctx: &mut RunCtx,
    ) -> Result<IdentityShape, TranslateError> {
        let def = self.lookup_entity(ident)?;
        let location = Location::root(ident.to_string());

        let members = classify_members(&self.graph, def, &location)?;
        let member_idents: Vec<String> = members.iter().map(|m| m.def.ident.clone()).collect();

        let resolved = {
            let mut targets = IdentityTargets {
                compiler: self,
                ctx,
            };
            resolve::resolve_entity(&self.graph, &self.options, def, &members, &mut targets, false)?
        };

        let (leaves, _) = resolve::flatten(&resolved, &self.options)?;
        let keyset = keys::deduce(ident, &leaves, &resolved.key_apps, &self.options)?;

        let table_name = naming::field_name(
            &[(def.ident.clone(), resolved.table_rename.clone())],
            &self.options,
        );

        let by_path: BTreeMap<&str, (String, Primitive)> = leaves
            .iter()
            .map(|l| {
                (
                    l.source_path.as_str(),
                    (naming::field_name(&l.segments, &self.options), l.storage),
                )
            })
            .collect();

        let pk_fields = keyset
            .primary
            .paths
            .iter()
            .map(|p| {
                by_path
                    .get(p.as_str())
                    .cloned()
                    .unwrap_or_else(|| (p.clone(), Primitive::Int64))
            })
            .collect();

        Ok(IdentityShape {
            table_name,
            pk_fields,
            member_idents,
        })
    }

    //
    // run-wide naming
    //

    // Table names are unique across the whole compilation run.
    fn register_tables(&self, translation: &Translation) -> Result<(), TranslateError> {
        let mut registry = self
            .table_registry
            .lock()
            .expect("table registry poisoned");

        for table in translation.tables() {
            if let Some(owner) = registry.get(&table.name)
                && owner != &translation.source
            {
                return Err(TranslateError::new(
                    Location::root(translation.source.clone()),
                    Problem::DuplicateName {
                        name: table.name.clone(),
                        first: owner.clone(),
                        second: translation.source.clone(),
                    },
                ));
            }
        }
        for table in translation.tables() {
            registry.insert(table.name.clone(), translation.source.clone());
        }

        Ok(())
    }

    fn trace(&self, event: TraceEvent<'_>) {
        if let Some(sink) = &self.options.trace {
            sink.on_event(event);
        }
    }

    fn trace_stage(&self, ident: &str, stage: Stage) {
        self.trace(TraceEvent::StageCompleted { ident, stage });
    }
}

///
/// IdentityShape
///
/// The forward handle served for in-flight types: everything a reference
/// needs from its target.
///

#[derive(Clone, Debug)]
struct IdentityShape {
    table_name: String,
    pk_fields: Vec<(String, Primitive)>,
    member_idents: Vec<String>,
}

///
/// IdentityOutcome
///

enum IdentityOutcome {
    Shape(IdentityShape),
    Cycle,
}

///
/// RunCtx
///
/// The per-call resolution stacks used for cycle detection.
///

#[derive(Debug, Default)]
struct RunCtx {
    stack: Vec<String>,
    identity_stack: Vec<String>,
}

///
/// Slot
///

enum Slot {
    Ready(Arc<Translation>),
    InFlight(Arc<Flight>),
}

///
/// Flight
///
/// Single-flight rendezvous: waiters block until the computing caller
/// publishes the shared result.
///

#[derive(Default)]
struct Flight {
    result: Mutex<Option<Result<Arc<Translation>, TranslateError>>>,
    cv: Condvar,
}

impl Flight {
    fn complete(&self, result: Result<Arc<Translation>, TranslateError>) {
        let mut slot = self.result.lock().expect("flight slot poisoned");
        *slot = Some(result);
        drop(slot);
        self.cv.notify_all();
    }

    fn wait(&self) -> Result<Arc<Translation>, TranslateError> {
        let mut slot = self.result.lock().expect("flight slot poisoned");
        while slot.is_none() {
            slot = self.cv.wait(slot).expect("flight slot poisoned");
        }
        slot.clone().expect("checked above")
    }
}

// adapters plugging the compiler into the resolver's target seam

struct FullTargets<'a, G: TypeGraph> {
    compiler: &'a Compiler<G>,
    ctx: &'a mut RunCtx,
}

impl<G: TypeGraph> TargetResolver for FullTargets<'_, G> {
    fn resolve_target(
        &mut self,
        ident: &str,
        trail: &Location,
    ) -> Result<RefTarget, TranslateError> {
        self.compiler.target_of(ident, self.ctx, trail)
    }
}

struct IdentityTargets<'a, G: TypeGraph> {
    compiler: &'a Compiler<G>,
    ctx: &'a mut RunCtx,
}

impl<G: TypeGraph> TargetResolver for IdentityTargets<'_, G> {
    fn resolve_target(
        &mut self,
        ident: &str,
        trail: &Location,
    ) -> Result<RefTarget, TranslateError> {
        let outcome = self
            .compiler
            .identity_try(ident, self.ctx)
            .map_err(|e| e.prefixed(trail))?;

        match outcome {
            IdentityOutcome::Shape(shape) => Ok(RefTarget {
                type_ident: ident.to_string(),
                table_name: shape.table_name,
                pk_fields: shape.pk_fields,
                member_idents: shape.member_idents,
            }),
            // A back-reference into a type whose identity is being computed:
            // its fields cannot be part of this key, so serve an empty
            // placeholder. Key deduction rejects any key that resolved
            // through one.
            IdentityOutcome::Cycle => Ok(RefTarget {
                type_ident: ident.to_string(),
                table_name: ident.to_string(),
                pk_fields: Vec::new(),
                member_idents: Vec::new(),
            }),
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
