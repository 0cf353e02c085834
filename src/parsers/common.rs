use anyhow::Result;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use tree_sitter::{Language, Node as TSNode, Parser, Tree};

pub struct TreeSitterParser {
    parser: Parser,
}

impl TreeSitterParser {
    pub fn new(language: Language) -> Result<Self> {
        let mut parser = Parser::new();
        parser.set_language(language)?;
        Ok(Self { parser })
    }

    pub fn parse(&mut self, source: &str, path: &Path) -> Result<Tree> {
        self.parser
            .parse(source, None)
            .ok_or_else(|| anyhow::anyhow!("failed to parse {}", path.display()))
    }
}

/// Buffered whole-file read sized to the file.
pub fn read_source(path: &Path) -> Result<String> {
    let file = File::open(path)?;
    let file_size = file.metadata()?.len() as usize;
    let mut reader = BufReader::with_capacity(file_size.clamp(1, 8192), file);
    let mut content = String::with_capacity(file_size);
    reader.read_to_string(&mut content)?;
    Ok(content)
}

pub fn node_text<'a>(node: &TSNode, source: &'a [u8]) -> &'a str {
    std::str::from_utf8(&source[node.byte_range()]).unwrap_or("")
}

pub fn node_line(node: &TSNode) -> usize {
    node.start_position().row + 1
}

pub fn children_of_kind<'a>(node: &'a TSNode<'a>, kind: &str) -> Vec<TSNode<'a>> {
    let mut cursor = node.walk();
    node.children(&mut cursor)
        .filter(|child| child.kind() == kind)
        .collect()
}
