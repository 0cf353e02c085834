use std::path::Path;
use tracing::{debug, warn};

use super::error::{AnalysisWarning, BuildError, WarningReason};
use super::graph::{
    file_key, DependencyGraph, GraphBuilder, Relation, RelationKind, Vertex, VertexKey, VertexKind,
};
use super::resolver::{CallResolver, CallSite};
use super::scanner::{ModuleScanner, ScanReport, SourceFile};
use crate::parsers::{cache::InspectionCache, Inspection, InspectorFactory};

/// Everything one `build` run produces: the completed graph plus the
/// sub-units that had to be skipped.
#[derive(Debug)]
pub struct BuildOutcome {
    pub graph: DependencyGraph,
    pub warnings: Vec<AnalysisWarning>,
}

/// The dependency graph builder. Resolves a root module identifier, walks
/// its files through per-language inspectors and assembles the directed
/// entity graph. All vertex and edge insertion is serialized through the
/// single `GraphBuilder` owner; only read-only phases run in parallel.
pub struct ModuleAnalyzer {
    scanner: ModuleScanner,
    inspectors: InspectorFactory,
    cache: InspectionCache,
}

impl ModuleAnalyzer {
    pub fn new() -> Self {
        Self {
            scanner: ModuleScanner::new(),
            inspectors: InspectorFactory::new(),
            cache: InspectionCache::new(),
        }
    }

    /// Build the full dependency graph for the module rooted at `root`.
    ///
    /// Fails only when the root itself cannot be resolved; sub-units that
    /// resist introspection are skipped and reported in the outcome's
    /// warning list.
    pub fn build(&mut self, root: &Path, languages: &[&str]) -> Result<BuildOutcome, BuildError> {
        let report = self.scanner.scan(root, languages)?;

        let mut warnings: Vec<AnalysisWarning> = report
            .opaque
            .iter()
            .map(|path| AnalysisWarning::new(path.clone(), WarningReason::NativeExtension))
            .collect();

        let inspections = self.inspect_files(&report, &mut warnings);

        let mut builder = GraphBuilder::new();
        builder.get_or_create_vertex(Vertex::new(VertexKind::Module, report.root_module.clone()));

        for file in &report.files {
            record_module_chain(&mut builder, file);
        }

        for inspection in &inspections {
            for vertex in &inspection.vertices {
                builder.get_or_create_vertex(vertex.clone());
            }
        }

        let mut call_sites: Vec<CallSite> = Vec::new();
        for inspection in &inspections {
            for relation in &inspection.relations {
                // Imports and inheritance may point at entities defined
                // outside the walked tree; those get a bare vertex so the
                // edge has a real endpoint.
                if !builder.contains(&relation.target) {
                    builder.get_or_create_vertex(Vertex::new(
                        relation.target.kind,
                        relation.target.qualified_name.clone(),
                    ));
                }
                builder.add_relation(relation);
            }
            call_sites.extend(inspection.call_sites.iter().cloned());
        }

        let mut resolver = CallResolver::new();
        resolver.index_vertices(builder.vertices());
        let call_edges = resolver.resolve(&call_sites);
        let mut resolved = 0usize;
        for relation in &call_edges {
            if builder.add_relation(relation).is_some() {
                resolved += 1;
            }
        }
        debug!(
            "resolved {resolved} call edges from {} call sites",
            call_sites.len()
        );

        Ok(BuildOutcome {
            graph: builder.build(),
            warnings,
        })
    }

    fn inspect_files(
        &mut self,
        report: &ScanReport,
        warnings: &mut Vec<AnalysisWarning>,
    ) -> Vec<Inspection> {
        let mut inspections = Vec::with_capacity(report.files.len());

        for file in &report.files {
            if let Some(cached) = self.cache.get_fresh(&file.path) {
                inspections.push(cached);
                continue;
            }

            let inspector = match self.inspectors.get(&file.language) {
                Ok(inspector) => inspector,
                Err(err) => {
                    warnings.push(AnalysisWarning::new(
                        file.path.clone(),
                        WarningReason::ParseFailure(err.to_string()),
                    ));
                    continue;
                }
            };

            match inspector.inspect_file(&file.path, &file.module_path) {
                Ok(inspection) => {
                    self.cache.store(&file.path, &inspection);
                    inspections.push(inspection);
                }
                Err(err) => {
                    warn!("could not introspect {}: {err}", file.path.display());
                    let reason = match err.downcast_ref::<std::io::Error>() {
                        Some(io) => WarningReason::Unreadable(io.to_string()),
                        None => WarningReason::ParseFailure(err.to_string()),
                    };
                    warnings.push(AnalysisWarning::new(file.path.clone(), reason));
                }
            }
        }

        inspections
    }
}

impl Default for ModuleAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

/// Vertices and containment edges for the module ancestry of one file:
/// `pkg` contains `pkg.sub` contains `pkg.sub.util`, and the leaf module
/// is recorded as defined in the file.
fn record_module_chain(builder: &mut GraphBuilder, file: &SourceFile) {
    let mut parent: Option<VertexKey> = None;
    let mut prefix = String::new();

    for segment in file.module_path.split('.') {
        if prefix.is_empty() {
            prefix.push_str(segment);
        } else {
            prefix.push('.');
            prefix.push_str(segment);
        }
        let key = VertexKey::new(VertexKind::Module, prefix.clone());
        builder.get_or_create_vertex(Vertex::new(VertexKind::Module, prefix.clone()));
        if let Some(parent) = parent.take() {
            builder.add_relation(&Relation::new(RelationKind::Contains, parent, key.clone()));
        }
        parent = Some(key);
    }

    let module_key = match parent {
        Some(key) => key,
        None => return,
    };

    let file_vertex = Vertex::new(VertexKind::File, file.path.display().to_string())
        .located_at(file.path.clone(), None);
    builder.get_or_create_vertex(file_vertex);
    builder.add_relation(&Relation::new(
        RelationKind::DefinedIn,
        module_key,
        file_key(&file.path),
    ));
}
