//! Translation tracing boundary.
//!
//! Tracing is optional, injected by the caller, and must not affect
//! translation semantics.

use std::sync::atomic::{AtomicU64, Ordering};

///
/// TraceSink
///

pub trait TraceSink: Send + Sync {
    fn on_event(&self, event: TraceEvent<'_>);
}

///
/// TraceEvent
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TraceEvent<'a> {
    /// A translation was served from the cache.
    CacheHit { ident: &'a str },
    /// A translation had to be computed.
    CacheMiss { ident: &'a str },
    /// A cyclic reference was satisfied with the in-flight type's identity.
    ForwardHandle { ident: &'a str },
    /// One pipeline stage finished for a type.
    StageCompleted { ident: &'a str, stage: Stage },
}

///
/// Stage
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Stage {
    Classify,
    Resolve,
    Keys,
    Constrain,
    Assemble,
    Closure,
}

///
/// ObsCounters
///
/// Cheap cumulative counters kept by the compiler regardless of whether a
/// sink is installed.
///

#[derive(Debug, Default)]
pub(crate) struct ObsCounters {
    pub cache_hits: AtomicU64,
    pub cache_misses: AtomicU64,
    pub forward_handles: AtomicU64,
    pub translations: AtomicU64,
    pub failures: AtomicU64,
}

impl ObsCounters {
    pub fn report(&self) -> ObsReport {
        ObsReport {
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            cache_misses: self.cache_misses.load(Ordering::Relaxed),
            forward_handles: self.forward_handles.load(Ordering::Relaxed),
            translations: self.translations.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
        }
    }

    pub fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

///
/// ObsReport
///

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct ObsReport {
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub forward_handles: u64,
    pub translations: u64,
    pub failures: u64,
}
