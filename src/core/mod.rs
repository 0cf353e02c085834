pub mod analyzer;
pub mod error;
pub mod graph;
pub mod resolver;
pub mod scanner;

pub use analyzer::{BuildOutcome, ModuleAnalyzer};
pub use error::{AnalysisWarning, BuildError, WarningReason};
pub use graph::{
    DependencyGraph, GraphBuilder, GraphSummary, Relation, RelationKind, Vertex, VertexKey,
    VertexKind,
};
pub use resolver::{CallKind, CallResolver, CallSite};
pub use scanner::ModuleScanner;
