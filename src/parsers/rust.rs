use anyhow::Result;
use std::path::Path;
use tree_sitter::Node as TSNode;

use super::common::{children_of_kind, node_line, node_text, read_source, TreeSitterParser};
use super::{Inspection, LanguageInspector};
use crate::core::graph::file_key;
use crate::core::{CallKind, CallSite, Relation, RelationKind, Vertex, VertexKey, VertexKind};

/// Structure discovery for Rust sources. Structs, enums and traits map to
/// Class vertices; impl and trait callables to Methods; `impl Trait for
/// Type` to an Inherits edge from the type to the trait.
pub struct RustInspector;

impl RustInspector {
    pub fn new() -> Result<Self> {
        // Fail construction early if the grammar cannot be loaded.
        TreeSitterParser::new(tree_sitter_rust::language())?;
        Ok(Self)
    }

    fn walk_items(
        &self,
        container: &TSNode,
        source: &[u8],
        path: &Path,
        module_path: &str,
        out: &mut Inspection,
    ) {
        let mut cursor = container.walk();
        for child in container.children(&mut cursor) {
            match child.kind() {
                "mod_item" => self.process_module(&child, source, path, module_path, out),
                "use_declaration" => self.process_use(&child, source, module_path, out),
                "function_item" => self.process_function(&child, source, path, module_path, out),
                "struct_item" | "enum_item" => {
                    self.process_type(&child, source, path, module_path, out)
                }
                "trait_item" => self.process_trait(&child, source, path, module_path, out),
                "impl_item" => self.process_impl(&child, source, path, module_path, out),
                _ => {}
            }
        }
    }

    fn process_module(
        &self,
        mod_node: &TSNode,
        source: &[u8],
        path: &Path,
        module_path: &str,
        out: &mut Inspection,
    ) {
        let Some(name_node) = mod_node.child_by_field_name("name") else {
            return;
        };
        let submodule = qualify(module_path, node_text(&name_node, source));

        out.vertices.push(
            Vertex::new(VertexKind::Module, submodule.clone())
                .located_at(path.to_path_buf(), Some(node_line(mod_node))),
        );
        out.relations.push(Relation::new(
            RelationKind::Contains,
            VertexKey::new(VertexKind::Module, module_path),
            VertexKey::new(VertexKind::Module, submodule.clone()),
        ));

        // Inline module bodies nest arbitrarily.
        if let Some(body) = mod_node.child_by_field_name("body") {
            self.walk_items(&body, source, path, &submodule, out);
        }
    }

    fn process_use(&self, use_node: &TSNode, source: &[u8], module_path: &str, out: &mut Inspection) {
        let Some(argument) = use_node.child_by_field_name("argument") else {
            return;
        };
        let Some(target) = normalize_use_path(node_text(&argument, source), module_path) else {
            return;
        };

        out.vertices.push(Vertex::new(VertexKind::Module, target.clone()));
        out.relations.push(Relation::new(
            RelationKind::Imports,
            VertexKey::new(VertexKind::Module, module_path),
            VertexKey::new(VertexKind::Module, target),
        ));
    }

    fn process_function(
        &self,
        func_node: &TSNode,
        source: &[u8],
        path: &Path,
        module_path: &str,
        out: &mut Inspection,
    ) {
        let Some(name_node) = func_node.child_by_field_name("name") else {
            return;
        };
        let qualified = qualify(module_path, node_text(&name_node, source));
        let key = VertexKey::new(VertexKind::Function, qualified.clone());

        out.vertices.push(
            Vertex::new(VertexKind::Function, qualified)
                .located_at(path.to_path_buf(), Some(node_line(func_node))),
        );
        out.relations.push(Relation::new(
            RelationKind::Contains,
            VertexKey::new(VertexKind::Module, module_path),
            key.clone(),
        ));
        out.relations.push(Relation::new(
            RelationKind::DefinedIn,
            key.clone(),
            file_key(path),
        ));

        if let Some(body) = func_node.child_by_field_name("body") {
            self.collect_calls(&body, source, &key, out);
        }
    }

    fn process_type(
        &self,
        type_node: &TSNode,
        source: &[u8],
        path: &Path,
        module_path: &str,
        out: &mut Inspection,
    ) {
        let Some(name_node) = type_node.child_by_field_name("name") else {
            return;
        };
        let qualified = qualify(module_path, node_text(&name_node, source));
        self.record_class(&qualified, node_line(type_node), path, module_path, out);
    }

    fn process_trait(
        &self,
        trait_node: &TSNode,
        source: &[u8],
        path: &Path,
        module_path: &str,
        out: &mut Inspection,
    ) {
        let Some(name_node) = trait_node.child_by_field_name("name") else {
            return;
        };
        let qualified = qualify(module_path, node_text(&name_node, source));
        self.record_class(&qualified, node_line(trait_node), path, module_path, out);

        let Some(body) = trait_node.child_by_field_name("body") else {
            return;
        };
        let mut cursor = body.walk();
        for item in body.children(&mut cursor) {
            if !matches!(item.kind(), "function_item" | "function_signature_item") {
                continue;
            }
            self.process_callable_in_class(&item, source, path, &qualified, out);
        }
    }

    fn process_impl(
        &self,
        impl_node: &TSNode,
        source: &[u8],
        path: &Path,
        module_path: &str,
        out: &mut Inspection,
    ) {
        let Some(type_node) = impl_node.child_by_field_name("type") else {
            return;
        };
        let type_name = base_type_name(node_text(&type_node, source));
        if type_name.is_empty() {
            return;
        }
        let class_qualified = qualify_type(module_path, &type_name);
        self.record_class(&class_qualified, node_line(impl_node), path, module_path, out);

        if let Some(trait_node) = impl_node.child_by_field_name("trait") {
            let trait_name = base_type_name(node_text(&trait_node, source));
            if !trait_name.is_empty() {
                let trait_qualified = qualify_type(module_path, &trait_name);
                out.relations.push(Relation::new(
                    RelationKind::Inherits,
                    VertexKey::new(VertexKind::Class, class_qualified.clone()),
                    VertexKey::new(VertexKind::Class, trait_qualified),
                ));
            }
        }

        if let Some(body) = impl_node.child_by_field_name("body") {
            for func in children_of_kind(&body, "function_item") {
                self.process_callable_in_class(&func, source, path, &class_qualified, out);
            }
        }
    }

    /// Class vertex plus its containment and file edges. Deduplication in
    /// the graph builder merges repeated sightings (definition plus any
    /// number of impl blocks).
    fn record_class(
        &self,
        qualified: &str,
        line: usize,
        path: &Path,
        module_path: &str,
        out: &mut Inspection,
    ) {
        let key = VertexKey::new(VertexKind::Class, qualified);
        out.vertices.push(
            Vertex::new(VertexKind::Class, qualified)
                .located_at(path.to_path_buf(), Some(line)),
        );
        out.relations.push(Relation::new(
            RelationKind::Contains,
            VertexKey::new(VertexKind::Module, module_path),
            key.clone(),
        ));
        out.relations
            .push(Relation::new(RelationKind::DefinedIn, key, file_key(path)));
    }

    fn process_callable_in_class(
        &self,
        func_node: &TSNode,
        source: &[u8],
        path: &Path,
        class_qualified: &str,
        out: &mut Inspection,
    ) {
        let Some(name_node) = func_node.child_by_field_name("name") else {
            return;
        };
        let qualified = qualify(class_qualified, node_text(&name_node, source));
        let key = VertexKey::new(VertexKind::Method, qualified.clone());

        out.vertices.push(
            Vertex::new(VertexKind::Method, qualified)
                .located_at(path.to_path_buf(), Some(node_line(func_node))),
        );
        out.relations.push(Relation::new(
            RelationKind::Contains,
            VertexKey::new(VertexKind::Class, class_qualified),
            key.clone(),
        ));

        if let Some(body) = func_node.child_by_field_name("body") {
            self.collect_calls(&body, source, &key, out);
        }
    }

    fn collect_calls(&self, node: &TSNode, source: &[u8], caller: &VertexKey, out: &mut Inspection) {
        if node.kind() == "call_expression" {
            if let Some(function) = node.child_by_field_name("function") {
                let line = node_line(node);
                match function.kind() {
                    "identifier" => out.call_sites.push(CallSite::new(
                        caller.clone(),
                        node_text(&function, source),
                        CallKind::Simple,
                        line,
                    )),
                    "field_expression" => {
                        if let Some(field) = function.child_by_field_name("field") {
                            out.call_sites.push(CallSite::new(
                                caller.clone(),
                                node_text(&field, source),
                                CallKind::Method,
                                line,
                            ));
                        }
                    }
                    "scoped_identifier" => {
                        if let Some(name) = function.child_by_field_name("name") {
                            out.call_sites.push(CallSite::new(
                                caller.clone(),
                                node_text(&name, source),
                                CallKind::Qualified,
                                line,
                            ));
                        }
                    }
                    _ => {}
                }
            }
        }

        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            self.collect_calls(&child, source, caller, out);
        }
    }
}

impl LanguageInspector for RustInspector {
    fn inspect_file(&self, path: &Path, module_path: &str) -> Result<Inspection> {
        let source = read_source(path)?;
        let mut parser = TreeSitterParser::new(tree_sitter_rust::language())?;
        let tree = parser.parse(&source, path)?;
        let root = tree.root_node();

        let mut out = Inspection::default();
        out.vertices.push(
            Vertex::new(VertexKind::File, path.display().to_string())
                .located_at(path.to_path_buf(), None),
        );
        self.walk_items(&root, source.as_bytes(), path, module_path, &mut out);
        Ok(out)
    }

    fn language_name(&self) -> &'static str {
        "rust"
    }
}

fn qualify(scope: &str, name: &str) -> String {
    format!("{scope}.{name}")
}

/// Single-segment type names are assumed local to the module; multi-segment
/// paths keep their written form with `::` folded to dots.
fn qualify_type(module_path: &str, type_name: &str) -> String {
    if type_name.contains('.') {
        type_name.to_string()
    } else {
        qualify(module_path, type_name)
    }
}

/// Text of a type reference reduced to its path: generics stripped,
/// `::` folded to dots.
fn base_type_name(raw: &str) -> String {
    raw.split('<')
        .next()
        .unwrap_or("")
        .trim()
        .replace("::", ".")
}

/// Reduce a `use` argument to the dotted path of the imported module.
/// Braced groups and globs are cut at the group, `crate`/`self`/`super`
/// resolve against the current module, and a trailing CamelCase item
/// segment links its parent module.
fn normalize_use_path(raw: &str, module_path: &str) -> Option<String> {
    let raw = raw.split(['{', '*']).next()?.trim();
    let raw = raw.trim_end_matches("::").trim();
    let raw = raw.split(" as ").next()?.trim();
    if raw.is_empty() {
        return None;
    }

    let mut segments: Vec<&str> = raw
        .split("::")
        .map(str::trim)
        .filter(|segment| !segment.is_empty())
        .collect();
    if segments.is_empty() {
        return None;
    }

    let module_segments: Vec<&str> = module_path.split('.').collect();
    let mut resolved: Vec<String> = Vec::new();

    match segments[0] {
        "crate" => {
            resolved.push(module_segments[0].to_string());
            segments.remove(0);
        }
        "self" => {
            resolved.extend(module_segments.iter().map(|s| s.to_string()));
            segments.remove(0);
        }
        "super" => {
            let mut keep = module_segments.len();
            while segments.first() == Some(&"super") && keep > 0 {
                keep -= 1;
                segments.remove(0);
            }
            resolved.extend(module_segments[..keep].iter().map(|s| s.to_string()));
        }
        _ => {}
    }

    resolved.extend(segments.iter().map(|s| s.to_string()));

    if resolved.len() > 1
        && resolved
            .last()
            .and_then(|segment| segment.chars().next())
            .is_some_and(|c| c.is_uppercase())
    {
        resolved.pop();
    }

    if resolved.is_empty() {
        None
    } else {
        Some(resolved.join("."))
    }
}
