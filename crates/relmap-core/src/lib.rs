//! Core translation engine: classification, structural resolution, path
//! resolution, key deduction, constraint composition, table assembly, and
//! the memoizing compiler that ties the stages together.

pub mod assemble;
pub mod classify;
pub mod compiler;
pub mod constrain;
pub mod error;
pub mod keys;
pub mod obs;
pub mod options;
pub mod predefined;
pub mod resolve;
pub mod schema;

pub use compiler::Compiler;
pub use error::{Location, Problem, TranslateError};
pub use obs::{ObsReport, Stage, TraceEvent, TraceSink};
pub use options::CompilerOptions;

///
/// Prelude
///
/// Domain vocabulary only; stage internals stay one module level down.
///

pub mod prelude {
    pub use crate::{
        Compiler, CompilerOptions, Location, Problem, TranslateError,
        classify::StructuralKind,
        obs::{ObsReport, TraceEvent, TraceSink},
        schema::{
            Bound, CandidateKey, CascadeAction, Constraint, ConstraintKind, Field, ForeignKey,
            PrimaryKey, PrimaryKeySource, Principal, RelationUnit, ScalarFunction, Table,
            Translation,
        },
    };
}
