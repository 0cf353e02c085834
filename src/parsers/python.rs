use anyhow::Result;
use std::path::Path;
use tree_sitter::Node as TSNode;

use super::common::{node_line, node_text, read_source, TreeSitterParser};
use super::{Inspection, LanguageInspector};
use crate::core::graph::file_key;
use crate::core::{CallKind, CallSite, Relation, RelationKind, Vertex, VertexKey, VertexKind};

/// Structure discovery for Python sources. The method-vs-function
/// discriminator is containment: a `def` inside a class body is a Method,
/// a top-level `def` a Function.
pub struct PythonInspector;

impl PythonInspector {
    pub fn new() -> Result<Self> {
        TreeSitterParser::new(tree_sitter_python::language())?;
        Ok(Self)
    }

    fn walk_module(
        &self,
        root: &TSNode,
        source: &[u8],
        path: &Path,
        module_path: &str,
        out: &mut Inspection,
    ) {
        let mut cursor = root.walk();
        for child in root.children(&mut cursor) {
            let item = unwrap_decorated(&child);
            match item.kind() {
                "import_statement" | "import_from_statement" => {
                    self.process_import(&item, source, module_path, out)
                }
                "class_definition" => self.process_class(&item, source, path, module_path, out),
                "function_definition" => {
                    self.process_function(&item, source, path, module_path, out)
                }
                _ => {}
            }
        }
    }

    fn process_import(
        &self,
        import_node: &TSNode,
        source: &[u8],
        module_path: &str,
        out: &mut Inspection,
    ) {
        for target in import_targets(import_node, source, module_path) {
            out.vertices.push(Vertex::new(VertexKind::Module, target.clone()));
            out.relations.push(Relation::new(
                RelationKind::Imports,
                VertexKey::new(VertexKind::Module, module_path),
                VertexKey::new(VertexKind::Module, target),
            ));
        }
    }

    fn process_class(
        &self,
        class_node: &TSNode,
        source: &[u8],
        path: &Path,
        module_path: &str,
        out: &mut Inspection,
    ) {
        let Some(name_node) = class_node.child_by_field_name("name") else {
            return;
        };
        let qualified = format!("{module_path}.{}", node_text(&name_node, source));
        let class_key = VertexKey::new(VertexKind::Class, qualified.clone());

        out.vertices.push(
            Vertex::new(VertexKind::Class, qualified.clone())
                .located_at(path.to_path_buf(), Some(node_line(class_node))),
        );
        out.relations.push(Relation::new(
            RelationKind::Contains,
            VertexKey::new(VertexKind::Module, module_path),
            class_key.clone(),
        ));
        out.relations.push(Relation::new(
            RelationKind::DefinedIn,
            class_key.clone(),
            file_key(path),
        ));

        if let Some(superclasses) = class_node.child_by_field_name("superclasses") {
            self.process_bases(&superclasses, source, module_path, &class_key, out);
        }

        if let Some(body) = class_node.child_by_field_name("body") {
            let mut cursor = body.walk();
            for child in body.children(&mut cursor) {
                let item = unwrap_decorated(&child);
                if item.kind() == "function_definition" {
                    self.process_method(&item, source, path, &qualified, out);
                }
            }
        }
    }

    fn process_bases(
        &self,
        argument_list: &TSNode,
        source: &[u8],
        module_path: &str,
        class_key: &VertexKey,
        out: &mut Inspection,
    ) {
        let mut cursor = argument_list.walk();
        for argument in argument_list.children(&mut cursor) {
            let base = match argument.kind() {
                "identifier" => format!("{module_path}.{}", node_text(&argument, source)),
                // already dotted, e.g. `abc.ABC`
                "attribute" => node_text(&argument, source).to_string(),
                _ => continue,
            };
            out.relations.push(Relation::new(
                RelationKind::Inherits,
                class_key.clone(),
                VertexKey::new(VertexKind::Class, base),
            ));
        }
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
        let qualified = format!("{module_path}.{}", node_text(&name_node, source));
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

    fn process_method(
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
        let qualified = format!("{class_qualified}.{}", node_text(&name_node, source));
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
        if node.kind() == "call" {
            if let Some(function) = node.child_by_field_name("function") {
                let line = node_line(node);
                match function.kind() {
                    "identifier" => out.call_sites.push(CallSite::new(
                        caller.clone(),
                        node_text(&function, source),
                        CallKind::Simple,
                        line,
                    )),
                    "attribute" => {
                        if let Some(attribute) = function.child_by_field_name("attribute") {
                            out.call_sites.push(CallSite::new(
                                caller.clone(),
                                node_text(&attribute, source),
                                CallKind::Method,
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

impl LanguageInspector for PythonInspector {
    fn inspect_file(&self, path: &Path, module_path: &str) -> Result<Inspection> {
        let source = read_source(path)?;
        let mut parser = TreeSitterParser::new(tree_sitter_python::language())?;
        let tree = parser.parse(&source, path)?;
        let root = tree.root_node();

        let mut out = Inspection::default();
        out.vertices.push(
            Vertex::new(VertexKind::File, path.display().to_string())
                .located_at(path.to_path_buf(), None),
        );
        self.walk_module(&root, source.as_bytes(), path, module_path, &mut out);
        Ok(out)
    }

    fn language_name(&self) -> &'static str {
        "python"
    }
}

/// Decorated definitions wrap the class/function node they decorate.
fn unwrap_decorated<'a>(node: &TSNode<'a>) -> TSNode<'a> {
    if node.kind() == "decorated_definition" {
        if let Some(definition) = node.child_by_field_name("definition") {
            return definition;
        }
    }
    *node
}

/// Dotted module targets of one import statement. `import a.b` and
/// `from a.b import c` both link `a.b`; relative imports resolve against
/// the current module path.
fn import_targets(import_node: &TSNode, source: &[u8], module_path: &str) -> Vec<String> {
    let mut targets = Vec::new();

    if import_node.kind() == "import_from_statement" {
        if let Some(module_name) = import_node.child_by_field_name("module_name") {
            let raw = node_text(&module_name, source);
            if let Some(resolved) = resolve_import(raw, module_path) {
                targets.push(resolved);
            }
        }
        return targets;
    }

    let mut cursor = import_node.walk();
    for child in import_node.children(&mut cursor) {
        let name = match child.kind() {
            "dotted_name" => Some(node_text(&child, source)),
            "aliased_import" => child
                .child_by_field_name("name")
                .map(|name| node_text(&name, source)),
            _ => None,
        };
        if let Some(raw) = name {
            if let Some(resolved) = resolve_import(raw, module_path) {
                targets.push(resolved);
            }
        }
    }

    targets
}

fn resolve_import(raw: &str, module_path: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    let dots = raw.chars().take_while(|&c| c == '.').count();
    if dots == 0 {
        return Some(raw.to_string());
    }

    // One dot names the containing package, each further dot walks one
    // level higher.
    let mut base: Vec<&str> = module_path.split('.').collect();
    for _ in 0..dots {
        base.pop();
    }
    // hopped past the root: keep the root as the anchor
    if base.is_empty() {
        base.push(module_path.split('.').next().unwrap_or(module_path));
    }

    let remainder = &raw[dots..];
    if remainder.is_empty() {
        return Some(base.join("."));
    }
    Some(format!("{}.{}", base.join("."), remainder))
}
