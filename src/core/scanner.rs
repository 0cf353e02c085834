use rayon::prelude::*;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

use super::error::BuildError;

/// Extensions that mark a compiled/native sub-unit we cannot introspect.
const NATIVE_EXTENSIONS: &[&str] = &["so", "pyd", "dll", "dylib"];

/// Source file stems that name the enclosing directory module rather than
/// a sub-module of their own. Anchors are a per-language convention:
/// `main.py` is an ordinary Python module, not a package anchor.
fn anchor_stems(language: &str) -> &'static [&'static str] {
    match language {
        "rust" => &["mod", "lib", "main"],
        "python" => &["__init__"],
        _ => &[],
    }
}

#[derive(Debug, Clone)]
pub struct SourceFile {
    pub path: PathBuf,
    pub language: String,
    /// Dotted path of the module this file belongs to, rooted at the root
    /// module name (e.g. `pkg.sub.util`).
    pub module_path: String,
}

#[derive(Debug)]
pub struct ScanReport {
    pub root_module: String,
    pub files: Vec<SourceFile>,
    /// Native-extension binaries found under the root; surfaced as
    /// analysis warnings by the caller.
    pub opaque: Vec<PathBuf>,
}

enum Classified {
    Source(SourceFile),
    Opaque(PathBuf),
}

/// Resolves a root module identifier to the set of source files it spans,
/// with a deterministic (sorted) walk order.
pub struct ModuleScanner;

impl ModuleScanner {
    pub fn new() -> Self {
        Self
    }

    pub fn scan(&self, root: &Path, languages: &[&str]) -> Result<ScanReport, BuildError> {
        if !root.exists() {
            return Err(BuildError::resolution(root, "path does not exist"));
        }

        let extensions = self.extensions_for_languages(languages);
        let root_module = root_module_name(root);

        if root.is_file() {
            return self.scan_single_file(root, root_module, &extensions);
        }

        let entries: Vec<_> = WalkDir::new(root)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.path().is_file())
            .collect();

        let classified: Vec<Classified> = entries
            .par_iter()
            .filter_map(|entry| {
                let path = entry.path();
                let extension = path.extension()?.to_str()?;
                if NATIVE_EXTENSIONS.contains(&extension) {
                    return Some(Classified::Opaque(path.to_path_buf()));
                }
                let language = extensions.get(extension)?;
                let module_path = module_path_for(root, &root_module, path, language)?;
                Some(Classified::Source(SourceFile {
                    path: path.to_path_buf(),
                    language: language.clone(),
                    module_path,
                }))
            })
            .collect();

        let mut files = Vec::new();
        let mut opaque = Vec::new();
        for entry in classified {
            match entry {
                Classified::Source(file) => files.push(file),
                Classified::Opaque(path) => opaque.push(path),
            }
        }

        if files.is_empty() {
            return Err(BuildError::resolution(
                root,
                format!("no source files for languages {languages:?}"),
            ));
        }

        debug!(
            "resolved {} as module `{}`: {} source files, {} opaque",
            root.display(),
            root_module,
            files.len(),
            opaque.len()
        );

        Ok(ScanReport {
            root_module,
            files,
            opaque,
        })
    }

    fn scan_single_file(
        &self,
        root: &Path,
        root_module: String,
        extensions: &HashMap<&str, String>,
    ) -> Result<ScanReport, BuildError> {
        let extension = root
            .extension()
            .and_then(|ext| ext.to_str())
            .ok_or_else(|| BuildError::resolution(root, "file has no recognizable extension"))?;
        let language = extensions.get(extension).ok_or_else(|| {
            BuildError::resolution(root, format!("unsupported file extension `.{extension}`"))
        })?;

        Ok(ScanReport {
            root_module: root_module.clone(),
            files: vec![SourceFile {
                path: root.to_path_buf(),
                language: language.clone(),
                module_path: root_module,
            }],
            opaque: Vec::new(),
        })
    }

    fn extensions_for_languages(&self, languages: &[&str]) -> HashMap<&str, String> {
        let mut extensions = HashMap::with_capacity(languages.len() * 3);

        for &language in languages {
            match language {
                "python" => {
                    extensions.insert("py", "python".to_string());
                    extensions.insert("pyi", "python".to_string());
                    extensions.insert("pyw", "python".to_string());
                }
                "rust" => {
                    extensions.insert("rs", "rust".to_string());
                }
                _ => {}
            }
        }

        extensions
    }
}

impl Default for ModuleScanner {
    fn default() -> Self {
        Self::new()
    }
}

/// Root module name derived from the root path: the directory name, or the
/// file stem for a single-file root, normalized to identifier characters.
fn root_module_name(root: &Path) -> String {
    let raw = if root.is_file() {
        root.file_stem().and_then(|stem| stem.to_str())
    } else {
        root.file_name().and_then(|name| name.to_str())
    };
    raw.map(sanitize_segment)
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| "root".to_string())
}

/// Dotted module path for a file relative to the root. The language's
/// anchor stems (`mod.rs`, `lib.rs`, `main.rs`, `__init__.py`) collapse
/// into their directory module.
fn module_path_for(root: &Path, root_module: &str, path: &Path, language: &str) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let mut segments = vec![root_module.to_string()];

    if let Some(parent) = relative.parent() {
        for component in parent.components() {
            let name = component.as_os_str().to_str()?;
            segments.push(sanitize_segment(name));
        }
    }

    let stem = path.file_stem()?.to_str()?;
    if !anchor_stems(language).contains(&stem) {
        segments.push(sanitize_segment(stem));
    }

    Some(segments.join("."))
}

fn sanitize_segment(raw: &str) -> String {
    raw.chars()
        .map(|c| if c.is_alphanumeric() || c == '_' { c } else { '_' })
        .collect()
}
