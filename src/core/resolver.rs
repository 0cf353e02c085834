use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::graph::{Relation, RelationKind, Vertex, VertexKey, VertexKind};

/// Shape of a call expression as the inspectors saw it.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum CallKind {
    /// `name()`
    Simple,
    /// `receiver.name()`
    Method,
    /// `path::name()` / `module.name()`
    Qualified,
}

/// One unresolved call expression, recorded per file during inspection and
/// resolved against the finished vertex set after the walk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallSite {
    pub caller: VertexKey,
    pub callee: String,
    pub kind: CallKind,
    pub line: usize,
}

impl CallSite {
    pub fn new(caller: VertexKey, callee: impl Into<String>, kind: CallKind, line: usize) -> Self {
        Self {
            caller,
            callee: callee.into(),
            kind,
            line,
        }
    }
}

/// Maps call sites onto `Calls` relations by callee name, preferring
/// candidates in the caller's own scope. Unresolved or ambiguous calls are
/// dropped; callees outside the analyzed module are not part of the graph.
#[derive(Debug, Default, Clone)]
pub struct CallResolver {
    functions: HashMap<String, Vec<VertexKey>>,
    methods: HashMap<String, Vec<VertexKey>>,
}

impl CallResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index every Function and Method vertex by its unqualified name.
    pub fn index_vertices<'a>(&mut self, vertices: impl Iterator<Item = &'a Vertex>) {
        for vertex in vertices {
            let name = last_segment(&vertex.qualified_name).to_string();
            match vertex.kind {
                VertexKind::Function => self.functions.entry(name).or_default().push(vertex.key()),
                VertexKind::Method => self.methods.entry(name).or_default().push(vertex.key()),
                _ => {}
            }
        }
    }

    /// Resolution is read-only over the indexes, so call sites resolve in
    /// parallel; the caller serializes edge insertion through the single
    /// graph owner.
    pub fn resolve(&self, sites: &[CallSite]) -> Vec<Relation> {
        sites
            .par_iter()
            .filter_map(|site| self.resolve_one(site))
            .collect()
    }

    fn resolve_one(&self, site: &CallSite) -> Option<Relation> {
        let candidates = match site.kind {
            CallKind::Simple => self.functions.get(&site.callee),
            CallKind::Method => self.methods.get(&site.callee),
            // `Type::new()` / `Self::helper()` name an associated
            // function, which lives in the method index
            CallKind::Qualified => self
                .functions
                .get(&site.callee)
                .or_else(|| self.methods.get(&site.callee)),
        }?;
        let target = self.pick(candidates, &site.caller)?;
        Some(Relation::new(
            RelationKind::Calls,
            site.caller.clone(),
            target.clone(),
        ))
    }

    fn pick<'a>(&self, candidates: &'a [VertexKey], caller: &VertexKey) -> Option<&'a VertexKey> {
        if candidates.len() == 1 {
            return candidates.first();
        }
        let caller_module = enclosing_module(caller);
        candidates
            .iter()
            .find(|candidate| enclosing_module(candidate) == caller_module)
    }
}

fn last_segment(qualified_name: &str) -> &str {
    qualified_name
        .rsplit('.')
        .next()
        .unwrap_or(qualified_name)
}

/// Module scope of an entity: strip the name itself, and the class segment
/// for methods.
fn enclosing_module(key: &VertexKey) -> &str {
    let strip = match key.kind {
        VertexKind::Method => 2,
        _ => 1,
    };
    let mut scope = key.qualified_name.as_str();
    for _ in 0..strip {
        match scope.rsplit_once('.') {
            Some((prefix, _)) => scope = prefix,
            None => return "",
        }
    }
    scope
}
