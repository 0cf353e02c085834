use petgraph::graph::{EdgeIndex, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::{Directed, Graph};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

/// The kinds of code entities a graph vertex can represent.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum VertexKind {
    Module,
    Class,
    Method,
    Function,
    File,
}

/// Directed relationships between two vertices.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum RelationKind {
    Contains,
    Imports,
    Calls,
    Inherits,
    DefinedIn,
}

/// Stable identity of a vertex. `(kind, qualified_name)` pairs are unique
/// within one graph.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct VertexKey {
    pub kind: VertexKind,
    pub qualified_name: String,
}

impl VertexKey {
    pub fn new(kind: VertexKind, qualified_name: impl Into<String>) -> Self {
        Self {
            kind,
            qualified_name: qualified_name.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vertex {
    pub kind: VertexKind,
    pub qualified_name: String,
    pub file: Option<PathBuf>,
    pub line: Option<usize>,
}

impl Vertex {
    pub fn new(kind: VertexKind, qualified_name: impl Into<String>) -> Self {
        Self {
            kind,
            qualified_name: qualified_name.into(),
            file: None,
            line: None,
        }
    }

    pub fn located_at(mut self, file: PathBuf, line: Option<usize>) -> Self {
        self.file = Some(file);
        self.line = line;
        self
    }

    pub fn key(&self) -> VertexKey {
        VertexKey::new(self.kind, self.qualified_name.clone())
    }
}

/// A relationship between two vertices, addressed by key. This is the
/// pre-insertion form produced by inspectors and the call resolver; inside
/// the graph the endpoints live as indices and only the kind is stored on
/// the edge.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Relation {
    pub kind: RelationKind,
    pub source: VertexKey,
    pub target: VertexKey,
}

impl Relation {
    pub fn new(kind: RelationKind, source: VertexKey, target: VertexKey) -> Self {
        Self {
            kind,
            source,
            target,
        }
    }
}

/// Key under which a source file is tracked as a `File` vertex.
pub fn file_key(path: &Path) -> VertexKey {
    VertexKey::new(VertexKind::File, path.display().to_string())
}

/// Post-traversal counts, one per vertex kind plus totals; logged as the
/// run summary.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct GraphSummary {
    pub vertices: usize,
    pub edges: usize,
    pub modules: usize,
    pub classes: usize,
    pub methods: usize,
    pub functions: usize,
    pub files: usize,
}

type StructureGraph = Graph<Vertex, RelationKind, Directed>;

/// Incremental graph assembly with get-or-create vertex semantics and edge
/// deduplication. Edges are stored as index pairs into the vertex arena, so
/// cyclic structures (circular imports, recursive calls) need no special
/// ownership handling.
pub struct GraphBuilder {
    graph: StructureGraph,
    index: HashMap<VertexKey, NodeIndex>,
    seen_relations: HashSet<(NodeIndex, RelationKind, NodeIndex)>,
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self {
            graph: Graph::new(),
            index: HashMap::new(),
            seen_relations: HashSet::new(),
        }
    }

    /// Insert a vertex unless one already exists for its `(kind,
    /// qualified_name)` pair. A later sighting that carries a source
    /// location backfills a location-less earlier one.
    pub fn get_or_create_vertex(&mut self, vertex: Vertex) -> NodeIndex {
        let key = vertex.key();
        if let Some(&existing) = self.index.get(&key) {
            let known = &mut self.graph[existing];
            if known.file.is_none() && vertex.file.is_some() {
                known.file = vertex.file;
                known.line = vertex.line;
            }
            return existing;
        }
        let idx = self.graph.add_node(vertex);
        self.index.insert(key, idx);
        idx
    }

    pub fn contains(&self, key: &VertexKey) -> bool {
        self.index.contains_key(key)
    }

    /// Record one relation. Returns `None` when an endpoint is missing,
    /// when the relation was already recorded, or for a self-loop on
    /// anything but a recursive call.
    pub fn add_relation(&mut self, relation: &Relation) -> Option<EdgeIndex> {
        let source = *self.index.get(&relation.source)?;
        let target = *self.index.get(&relation.target)?;
        if source == target && relation.kind != RelationKind::Calls {
            return None;
        }
        if !self.seen_relations.insert((source, relation.kind, target)) {
            return None;
        }
        Some(self.graph.add_edge(source, target, relation.kind))
    }

    pub fn vertices(&self) -> impl Iterator<Item = &Vertex> {
        self.graph.node_weights()
    }

    pub fn build(self) -> DependencyGraph {
        DependencyGraph {
            graph: self.graph,
            index: self.index,
        }
    }
}

impl Default for GraphBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// The completed graph for one analysis run. Owns its vertices and edges;
/// read-only once `GraphBuilder::build` has returned it.
#[derive(Debug)]
pub struct DependencyGraph {
    graph: StructureGraph,
    index: HashMap<VertexKey, NodeIndex>,
}

impl DependencyGraph {
    pub fn vertex_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn contains(&self, key: &VertexKey) -> bool {
        self.index.contains_key(key)
    }

    pub fn vertex(&self, key: &VertexKey) -> Option<&Vertex> {
        self.index.get(key).map(|&idx| &self.graph[idx])
    }

    pub fn vertices(&self) -> impl Iterator<Item = &Vertex> {
        self.graph.node_weights()
    }

    /// Materialize every edge back into its keyed `Relation` form.
    pub fn relations(&self) -> impl Iterator<Item = Relation> + '_ {
        self.graph.edge_references().map(|edge| {
            Relation::new(
                *edge.weight(),
                self.graph[edge.source()].key(),
                self.graph[edge.target()].key(),
            )
        })
    }

    pub fn has_relation(&self, kind: RelationKind, source: &VertexKey, target: &VertexKey) -> bool {
        let (Some(&source), Some(&target)) = (self.index.get(source), self.index.get(target))
        else {
            return false;
        };
        self.graph
            .edges_connecting(source, target)
            .any(|edge| *edge.weight() == kind)
    }

    pub fn relation_count(&self, kind: RelationKind) -> usize {
        self.graph
            .edge_references()
            .filter(|edge| *edge.weight() == kind)
            .count()
    }

    pub fn summary(&self) -> GraphSummary {
        let mut summary = GraphSummary {
            vertices: self.graph.node_count(),
            edges: self.graph.edge_count(),
            ..GraphSummary::default()
        };
        for vertex in self.graph.node_weights() {
            match vertex.kind {
                VertexKind::Module => summary.modules += 1,
                VertexKind::Class => summary.classes += 1,
                VertexKind::Method => summary.methods += 1,
                VertexKind::Function => summary.functions += 1,
                VertexKind::File => summary.files += 1,
            }
        }
        summary
    }
}
