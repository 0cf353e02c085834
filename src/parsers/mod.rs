pub mod cache;
pub mod common;
pub mod python;
pub mod rust;

use anyhow::Result;
use std::path::Path;

use crate::core::{CallSite, Relation, Vertex};

/// Everything one inspector discovered in one file: entity vertices,
/// structural relations keyed by `(kind, qualified_name)`, and the raw
/// call sites left for post-walk resolution.
#[derive(Debug, Clone, Default)]
pub struct Inspection {
    pub vertices: Vec<Vertex>,
    pub relations: Vec<Relation>,
    pub call_sites: Vec<CallSite>,
}

/// Capability interface for per-language structure discovery. The graph
/// builder depends only on this trait, never on a grammar.
pub trait LanguageInspector {
    /// Inspect one file belonging to the module at `module_path` (dotted).
    fn inspect_file(&self, path: &Path, module_path: &str) -> Result<Inspection>;

    fn language_name(&self) -> &'static str;
}

pub struct InspectorFactory;

impl InspectorFactory {
    pub fn new() -> Self {
        Self
    }

    pub fn get(&self, language: &str) -> Result<Box<dyn LanguageInspector + Send + Sync>> {
        match language {
            "rust" => Ok(Box::new(rust::RustInspector::new()?)),
            "python" => Ok(Box::new(python::PythonInspector::new()?)),
            _ => anyhow::bail!("unsupported language: {}", language),
        }
    }
}

impl Default for InspectorFactory {
    fn default() -> Self {
        Self::new()
    }
}
