use anyhow::Result;
use serde_json::json;
use std::fs;
use std::path::Path;

use crate::core::{DependencyGraph, Relation, Vertex};

/// Serializes a completed graph to JSON: summary counts, the vertex set
/// and the edge set with keyed endpoints. This is the hand-off artifact
/// for downstream consumers.
pub struct JsonExporter {
    pretty: bool,
}

impl JsonExporter {
    pub fn new() -> Self {
        Self { pretty: false }
    }

    pub fn with_pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    pub fn export_to_file(&self, graph: &DependencyGraph, output_path: &Path) -> Result<()> {
        fs::write(output_path, self.export_string(graph)?)?;
        Ok(())
    }

    pub fn export_string(&self, graph: &DependencyGraph) -> Result<String> {
        let vertices: Vec<&Vertex> = graph.vertices().collect();
        let edges: Vec<Relation> = graph.relations().collect();

        let output = json!({
            "summary": graph.summary(),
            "vertices": vertices,
            "edges": edges,
        });

        let rendered = if self.pretty {
            serde_json::to_string_pretty(&output)?
        } else {
            serde_json::to_string(&output)?
        };
        Ok(rendered)
    }
}

impl Default for JsonExporter {
    fn default() -> Self {
        Self::new()
    }
}
