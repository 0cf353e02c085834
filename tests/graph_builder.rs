use funnel_web::core::{
    GraphBuilder, Relation, RelationKind, Vertex, VertexKey, VertexKind,
};
use std::path::PathBuf;

fn module(name: &str) -> Vertex {
    Vertex::new(VertexKind::Module, name)
}

fn key(kind: VertexKind, name: &str) -> VertexKey {
    VertexKey::new(kind, name)
}

#[test]
fn vertices_are_unique_per_kind_and_name() {
    let mut builder = GraphBuilder::new();

    let first = builder.get_or_create_vertex(module("pkg.a"));
    let second = builder.get_or_create_vertex(module("pkg.a"));
    assert_eq!(first, second);

    // same name, different kind is a different vertex
    builder.get_or_create_vertex(Vertex::new(VertexKind::Class, "pkg.a"));

    let graph = builder.build();
    assert_eq!(graph.vertex_count(), 2);
}

#[test]
fn duplicate_relations_are_recorded_once() {
    let mut builder = GraphBuilder::new();
    builder.get_or_create_vertex(module("pkg"));
    builder.get_or_create_vertex(module("pkg.a"));

    let relation = Relation::new(
        RelationKind::Contains,
        key(VertexKind::Module, "pkg"),
        key(VertexKind::Module, "pkg.a"),
    );
    assert!(builder.add_relation(&relation).is_some());
    assert!(builder.add_relation(&relation).is_none());

    let graph = builder.build();
    assert_eq!(graph.edge_count(), 1);
}

#[test]
fn relations_with_missing_endpoints_are_rejected() {
    let mut builder = GraphBuilder::new();
    builder.get_or_create_vertex(module("pkg"));

    let dangling = Relation::new(
        RelationKind::Imports,
        key(VertexKind::Module, "pkg"),
        key(VertexKind::Module, "missing"),
    );
    assert!(builder.add_relation(&dangling).is_none());

    let graph = builder.build();
    assert_eq!(graph.edge_count(), 0);
}

#[test]
fn self_loops_are_only_allowed_for_calls() {
    let mut builder = GraphBuilder::new();
    builder.get_or_create_vertex(Vertex::new(VertexKind::Function, "pkg.rec"));
    builder.get_or_create_vertex(module("pkg"));

    let recursive = Relation::new(
        RelationKind::Calls,
        key(VertexKind::Function, "pkg.rec"),
        key(VertexKind::Function, "pkg.rec"),
    );
    assert!(builder.add_relation(&recursive).is_some());

    let self_import = Relation::new(
        RelationKind::Imports,
        key(VertexKind::Module, "pkg"),
        key(VertexKind::Module, "pkg"),
    );
    assert!(builder.add_relation(&self_import).is_none());
}

#[test]
fn later_sightings_backfill_missing_locations() {
    let mut builder = GraphBuilder::new();
    builder.get_or_create_vertex(module("pkg.a"));
    builder.get_or_create_vertex(
        module("pkg.a").located_at(PathBuf::from("/tmp/pkg/a.py"), Some(1)),
    );

    let graph = builder.build();
    let vertex = graph
        .vertex(&key(VertexKind::Module, "pkg.a"))
        .expect("vertex exists");
    assert_eq!(vertex.file, Some(PathBuf::from("/tmp/pkg/a.py")));
    assert_eq!(vertex.line, Some(1));
}

#[test]
fn summary_counts_break_down_by_kind() {
    let mut builder = GraphBuilder::new();
    builder.get_or_create_vertex(module("pkg"));
    builder.get_or_create_vertex(Vertex::new(VertexKind::Class, "pkg.C"));
    builder.get_or_create_vertex(Vertex::new(VertexKind::Method, "pkg.C.m"));
    builder.get_or_create_vertex(Vertex::new(VertexKind::Method, "pkg.C.n"));
    builder.get_or_create_vertex(Vertex::new(VertexKind::Function, "pkg.f"));
    builder.get_or_create_vertex(Vertex::new(VertexKind::File, "/tmp/pkg.py"));

    builder.add_relation(&Relation::new(
        RelationKind::Contains,
        key(VertexKind::Module, "pkg"),
        key(VertexKind::Class, "pkg.C"),
    ));

    let graph = builder.build();
    let summary = graph.summary();
    assert_eq!(summary.vertices, 6);
    assert_eq!(summary.edges, 1);
    assert_eq!(summary.modules, 1);
    assert_eq!(summary.classes, 1);
    assert_eq!(summary.methods, 2);
    assert_eq!(summary.functions, 1);
    assert_eq!(summary.files, 1);
}
