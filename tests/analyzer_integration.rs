use funnel_web::core::{
    BuildError, ModuleAnalyzer, RelationKind, VertexKey, VertexKind, WarningReason,
};
use std::fs;
use std::path::Path;

fn module_key(name: &str) -> VertexKey {
    VertexKey::new(VertexKind::Module, name)
}

#[test]
fn class_with_two_methods_and_a_free_function() {
    let dir = tempfile::TempDir::new().unwrap();
    let file = dir.path().join("shapes.py");
    fs::write(
        &file,
        r#"
class Circle:
    def area(self):
        return 3.14

    def perimeter(self):
        return 6.28

def free():
    pass
"#,
    )
    .unwrap();

    let mut analyzer = ModuleAnalyzer::new();
    let outcome = analyzer.build(&file, &["python"]).unwrap();
    let graph = outcome.graph;

    let summary = graph.summary();
    assert_eq!(summary.modules, 1);
    assert_eq!(summary.classes, 1);
    assert_eq!(summary.methods, 2);
    assert_eq!(summary.functions, 1);
    assert_eq!(summary.files, 1);

    let class = VertexKey::new(VertexKind::Class, "shapes.Circle");
    assert!(graph.has_relation(RelationKind::Contains, &module_key("shapes"), &class));
    assert!(graph.has_relation(
        RelationKind::Contains,
        &class,
        &VertexKey::new(VertexKind::Method, "shapes.Circle.area"),
    ));
    assert!(graph.has_relation(
        RelationKind::Contains,
        &class,
        &VertexKey::new(VertexKind::Method, "shapes.Circle.perimeter"),
    ));
    assert!(graph.has_relation(
        RelationKind::Contains,
        &module_key("shapes"),
        &VertexKey::new(VertexKind::Function, "shapes.free"),
    ));
}

#[test]
fn every_edge_endpoint_is_a_known_vertex() {
    let dir = tempfile::TempDir::new().unwrap();
    let root = dir.path().join("pkg");
    fs::create_dir_all(&root).unwrap();
    fs::write(root.join("a.py"), "import pkg.b\n\ndef fa():\n    pass\n").unwrap();
    fs::write(root.join("b.py"), "import os\n\nclass B:\n    pass\n").unwrap();

    let mut analyzer = ModuleAnalyzer::new();
    let graph = analyzer.build(&root, &["python"]).unwrap().graph;

    assert!(graph.edge_count() > 0);
    for relation in graph.relations() {
        assert!(graph.contains(&relation.source), "dangling {relation:?}");
        assert!(graph.contains(&relation.target), "dangling {relation:?}");
    }
}

#[test]
fn circular_imports_terminate_with_one_edge_per_direction() {
    let dir = tempfile::TempDir::new().unwrap();
    let root = dir.path().join("pkg");
    fs::create_dir_all(&root).unwrap();
    fs::write(root.join("a.py"), "import pkg.b\n").unwrap();
    fs::write(root.join("b.py"), "import pkg.a\n").unwrap();

    let mut analyzer = ModuleAnalyzer::new();
    let graph = analyzer.build(&root, &["python"]).unwrap().graph;

    assert!(graph.has_relation(RelationKind::Imports, &module_key("pkg.a"), &module_key("pkg.b")));
    assert!(graph.has_relation(RelationKind::Imports, &module_key("pkg.b"), &module_key("pkg.a")));
    assert_eq!(graph.relation_count(RelationKind::Imports), 2);
}

#[test]
fn builds_are_idempotent_for_unchanged_modules() {
    let dir = tempfile::TempDir::new().unwrap();
    let root = dir.path().join("pkg");
    fs::create_dir_all(&root).unwrap();
    fs::write(
        root.join("a.py"),
        "import pkg.b\n\nclass A:\n    def go(self):\n        self.go()\n",
    )
    .unwrap();
    fs::write(root.join("b.py"), "def util():\n    util()\n").unwrap();

    // same analyzer twice (second run is served from the parse cache) and
    // a fresh analyzer, all three must agree
    let mut analyzer = ModuleAnalyzer::new();
    let first = analyzer.build(&root, &["python"]).unwrap().graph;
    let second = analyzer.build(&root, &["python"]).unwrap().graph;
    let third = ModuleAnalyzer::new().build(&root, &["python"]).unwrap().graph;

    let vertex_set = |graph: &funnel_web::core::DependencyGraph| {
        let mut set: Vec<String> = graph
            .vertices()
            .map(|v| format!("{:?}:{}", v.kind, v.qualified_name))
            .collect();
        set.sort();
        set
    };
    let edge_set = |graph: &funnel_web::core::DependencyGraph| {
        let mut set: Vec<String> = graph
            .relations()
            .map(|r| {
                format!(
                    "{:?}:{}->{}",
                    r.kind, r.source.qualified_name, r.target.qualified_name
                )
            })
            .collect();
        set.sort();
        set
    };

    assert_eq!(vertex_set(&first), vertex_set(&second));
    assert_eq!(vertex_set(&first), vertex_set(&third));
    assert_eq!(edge_set(&first), edge_set(&second));
    assert_eq!(edge_set(&first), edge_set(&third));
}

#[test]
fn python_main_keeps_its_own_module_and_entities() {
    let dir = tempfile::TempDir::new().unwrap();
    let root = dir.path().join("pkg");
    fs::create_dir_all(&root).unwrap();
    fs::write(root.join("__init__.py"), "").unwrap();
    fs::write(root.join("main.py"), "def entry():\n    pass\n").unwrap();

    let mut analyzer = ModuleAnalyzer::new();
    let graph = analyzer.build(&root, &["python"]).unwrap().graph;

    assert!(graph.contains(&module_key("pkg.main")));
    assert!(graph.contains(&VertexKey::new(VertexKind::Function, "pkg.main.entry")));
    assert!(!graph.contains(&VertexKey::new(VertexKind::Function, "pkg.entry")));
}

#[test]
fn native_extensions_are_skipped_with_a_warning() {
    let dir = tempfile::TempDir::new().unwrap();
    let root = dir.path().join("pkg");
    fs::create_dir_all(&root).unwrap();
    fs::write(root.join("good.py"), "def fine():\n    pass\n").unwrap();
    fs::write(root.join("_native.so"), [0x7f, b'E', b'L', b'F']).unwrap();

    let mut analyzer = ModuleAnalyzer::new();
    let outcome = analyzer.build(&root, &["python"]).unwrap();

    assert_eq!(outcome.warnings.len(), 1);
    assert_eq!(outcome.warnings[0].reason, WarningReason::NativeExtension);
    assert!(outcome
        .graph
        .contains(&VertexKey::new(VertexKind::Function, "pkg.good.fine")));
    // nothing from the opaque binary leaks into the graph
    assert!(!outcome
        .graph
        .vertices()
        .any(|v| v.qualified_name.contains("_native")));
}

#[test]
fn unresolvable_roots_are_fatal() {
    let mut analyzer = ModuleAnalyzer::new();
    let err = analyzer
        .build(Path::new("/no/such/module"), &["python"])
        .unwrap_err();
    assert!(matches!(err, BuildError::Resolution { .. }));
}

#[test]
fn recursive_calls_resolve_to_self_loops() {
    let dir = tempfile::TempDir::new().unwrap();
    let file = dir.path().join("loops.py");
    fs::write(&file, "def rec(n):\n    return rec(n - 1)\n").unwrap();

    let mut analyzer = ModuleAnalyzer::new();
    let graph = analyzer.build(&file, &["python"]).unwrap().graph;

    let rec = VertexKey::new(VertexKind::Function, "loops.rec");
    assert!(graph.has_relation(RelationKind::Calls, &rec, &rec));
}

#[test]
fn method_calls_resolve_within_the_class() {
    let dir = tempfile::TempDir::new().unwrap();
    let file = dir.path().join("engine.py");
    fs::write(
        &file,
        r#"
class Engine:
    def run(self):
        return self.step()

    def step(self):
        return 1
"#,
    )
    .unwrap();

    let mut analyzer = ModuleAnalyzer::new();
    let graph = analyzer.build(&file, &["python"]).unwrap().graph;

    assert!(graph.has_relation(
        RelationKind::Calls,
        &VertexKey::new(VertexKind::Method, "engine.Engine.run"),
        &VertexKey::new(VertexKind::Method, "engine.Engine.step"),
    ));
}

#[test]
fn qualified_calls_resolve_to_associated_functions() {
    let dir = tempfile::TempDir::new().unwrap();
    let file = dir.path().join("engine.rs");
    fs::write(
        &file,
        r#"
struct Engine;

impl Engine {
    fn run(&self) {
        Self::helper();
    }

    fn helper() {}
}
"#,
    )
    .unwrap();

    let mut analyzer = ModuleAnalyzer::new();
    let graph = analyzer.build(&file, &["rust"]).unwrap().graph;

    assert!(graph.has_relation(
        RelationKind::Calls,
        &VertexKey::new(VertexKind::Method, "engine.Engine.run"),
        &VertexKey::new(VertexKind::Method, "engine.Engine.helper"),
    ));
}

#[test]
fn mixed_language_modules_share_one_graph() {
    let dir = tempfile::TempDir::new().unwrap();
    let root = dir.path().join("mixed");
    fs::create_dir_all(&root).unwrap();
    fs::write(root.join("lib.rs"), "pub fn entry() {}\n").unwrap();
    fs::write(root.join("glue.py"), "def bridge():\n    pass\n").unwrap();

    let mut analyzer = ModuleAnalyzer::new();
    let graph = analyzer.build(&root, &["rust", "python"]).unwrap().graph;

    assert!(graph.contains(&VertexKey::new(VertexKind::Function, "mixed.entry")));
    assert!(graph.contains(&VertexKey::new(VertexKind::Function, "mixed.glue.bridge")));
    assert!(graph.has_relation(
        RelationKind::Contains,
        &module_key("mixed"),
        &module_key("mixed.glue"),
    ));
}
