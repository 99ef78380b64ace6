/// XML document model — an arena of parsed nodes with parent links, and an
/// owned element tree for everything that gets written back out.

use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::reader::Reader;
use quick_xml::writer::Writer;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed XML at byte {position}: {message}")]
    Malformed { position: u64, message: String },
    #[error("document has no root element")]
    Empty,
    #[error("missing <{field}> under <{parent}>")]
    MissingField { parent: String, field: String },
    #[error("XML write error: {0}")]
    Write(String),
}

/// Newtype wrapper for node indices inside a [`Document`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub usize);

#[derive(Debug, Clone)]
struct Node {
    name: String,
    attributes: Vec<(String, String)>,
    text: Option<String>,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// A parsed XML document. Nodes live in one arena and refer to each other by
/// [`NodeId`]; the parent link never owns anything.
#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<Node>,
}

impl Document {
    /// Load and parse a document from disk.
    pub fn load(path: &Path) -> Result<Document, DocumentError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse a document from a string.
    ///
    /// Comments, processing instructions and the declaration are dropped.
    /// Whitespace-only text is dropped, any other text is kept verbatim; text
    /// split around child elements is concatenated.
    pub fn parse(input: &str) -> Result<Document, DocumentError> {
        let mut reader = Reader::from_str(input);

        let mut nodes: Vec<Node> = Vec::new();
        let mut stack: Vec<NodeId> = Vec::new();

        loop {
            let position = reader.buffer_position() as u64;
            let malformed = |message: String| DocumentError::Malformed { position, message };

            match reader.read_event().map_err(|e| malformed(e.to_string()))? {
                Event::Start(start) => {
                    let id = open_node(&mut nodes, &stack, &start).map_err(malformed)?;
                    stack.push(id);
                }
                Event::Empty(start) => {
                    open_node(&mut nodes, &stack, &start).map_err(malformed)?;
                }
                Event::End(_) => {
                    stack.pop();
                }
                Event::Text(text) => {
                    let text = text.unescape().map_err(|e| malformed(e.to_string()))?;
                    append_text(&mut nodes, &stack, &text).map_err(malformed)?;
                }
                Event::CData(data) => {
                    let raw = data.into_inner();
                    let text = std::str::from_utf8(&raw).map_err(|e| malformed(e.to_string()))?;
                    append_text(&mut nodes, &stack, text).map_err(malformed)?;
                }
                Event::Eof => break,
                _ => {}
            }
        }

        if !stack.is_empty() {
            return Err(DocumentError::Malformed {
                position: input.len() as u64,
                message: "unexpected end of document".to_string(),
            });
        }
        if nodes.is_empty() {
            return Err(DocumentError::Empty);
        }
        Ok(Document { nodes })
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn name(&self, id: NodeId) -> &str {
        &self.nodes[id.0].name
    }

    pub fn text(&self, id: NodeId) -> Option<&str> {
        self.nodes[id.0].text.as_deref()
    }

    pub fn set_text(&mut self, id: NodeId, text: impl Into<String>) {
        self.nodes[id.0].text = Some(text.into());
    }

    pub fn attribute(&self, id: NodeId, key: &str) -> Option<&str> {
        self.nodes[id.0]
            .attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    /// First child element with the given name.
    pub fn child(&self, id: NodeId, name: &str) -> Option<NodeId> {
        self.children(id)
            .iter()
            .copied()
            .find(|&child| self.name(child) == name)
    }

    /// Text of the first child element with the given name.
    pub fn child_text(&self, id: NodeId, name: &str) -> Option<&str> {
        self.child(id, name).and_then(|child| self.text(child))
    }

    /// Walk a path of child element names from `id`, returning every node
    /// reached in document order. An empty path selects `id` itself.
    pub fn select(&self, id: NodeId, path: &[&str]) -> Vec<NodeId> {
        let mut current = vec![id];
        for segment in path {
            current = current
                .iter()
                .flat_map(|&node| self.children(node).iter().copied())
                .filter(|&child| self.name(child) == *segment)
                .collect();
        }
        current
    }

    /// The ancestor `levels` steps above `id`, if the tree is that deep.
    pub fn ancestor(&self, id: NodeId, levels: usize) -> Option<NodeId> {
        let mut current = id;
        for _ in 0..levels {
            current = self.parent(current)?;
        }
        Some(current)
    }

    /// Deep copy of the subtree rooted at `id`. The result shares nothing
    /// with this document.
    pub fn to_element(&self, id: NodeId) -> Element {
        let node = &self.nodes[id.0];
        Element {
            name: node.name.clone(),
            attributes: node.attributes.clone(),
            text: node.text.clone(),
            children: node
                .children
                .iter()
                .map(|&child| self.to_element(child))
                .collect(),
        }
    }
}

fn open_node(
    nodes: &mut Vec<Node>,
    stack: &[NodeId],
    start: &BytesStart<'_>,
) -> Result<NodeId, String> {
    let parent = stack.last().copied();
    if parent.is_none() && !nodes.is_empty() {
        return Err("multiple root elements".to_string());
    }

    let name = std::str::from_utf8(start.name().as_ref())
        .map_err(|e| e.to_string())?
        .to_string();
    let mut attributes = Vec::new();
    for attribute in start.attributes() {
        let attribute = attribute.map_err(|e| e.to_string())?;
        let key = std::str::from_utf8(attribute.key.as_ref())
            .map_err(|e| e.to_string())?
            .to_string();
        let value = attribute.unescape_value().map_err(|e| e.to_string())?;
        attributes.push((key, value.into_owned()));
    }

    let id = NodeId(nodes.len());
    nodes.push(Node {
        name,
        attributes,
        text: None,
        parent,
        children: Vec::new(),
    });
    if let Some(parent) = parent {
        nodes[parent.0].children.push(id);
    }
    Ok(id)
}

fn append_text(nodes: &mut [Node], stack: &[NodeId], text: &str) -> Result<(), String> {
    if text.trim().is_empty() {
        return Ok(());
    }
    let Some(&top) = stack.last() else {
        return Err("text outside of the root element".to_string());
    };
    nodes[top.0]
        .text
        .get_or_insert_with(String::new)
        .push_str(text);
    Ok(())
}

/// An owned XML element tree.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Element {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub text: Option<String>,
    pub children: Vec<Element>,
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// An element holding only text, e.g. `<Name>Voice</Name>`.
    pub fn with_text(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            text: Some(text.into()),
            ..Self::default()
        }
    }

    pub fn push(&mut self, child: Element) {
        self.children.push(child);
    }

    pub fn child(&self, name: &str) -> Option<&Element> {
        self.children.iter().find(|c| c.name == name)
    }

    pub fn child_mut(&mut self, name: &str) -> Option<&mut Element> {
        self.children.iter_mut().find(|c| c.name == name)
    }

    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Element> {
        self.children.iter().filter(move |c| c.name == name)
    }

    /// Serialize with tab indentation and no XML declaration.
    pub fn to_xml_string(&self) -> Result<String, DocumentError> {
        let mut writer = Writer::new_with_indent(Vec::new(), b'\t', 1);
        self.write_events(&mut writer)?;
        String::from_utf8(writer.into_inner()).map_err(|e| DocumentError::Write(e.to_string()))
    }

    /// Write the element to a file that must not exist yet.
    pub fn write_xml(&self, path: &Path) -> Result<(), DocumentError> {
        let xml = self.to_xml_string()?;
        let mut file = OpenOptions::new().write(true).create_new(true).open(path)?;
        file.write_all(xml.as_bytes())?;
        file.write_all(b"\n")?;
        Ok(())
    }

    fn write_events(&self, writer: &mut Writer<Vec<u8>>) -> Result<(), DocumentError> {
        let mut start = BytesStart::new(self.name.as_str());
        for (key, value) in &self.attributes {
            start.push_attribute((key.as_str(), value.as_str()));
        }

        if self.text.is_none() && self.children.is_empty() {
            return emit(writer, Event::Empty(start));
        }

        emit(writer, Event::Start(start))?;
        if let Some(text) = &self.text {
            emit(writer, Event::Text(BytesText::new(text)))?;
        }
        for child in &self.children {
            child.write_events(writer)?;
        }
        emit(writer, Event::End(BytesEnd::new(self.name.as_str())))
    }
}

fn emit(writer: &mut Writer<Vec<u8>>, event: Event<'_>) -> Result<(), DocumentError> {
    writer
        .write_event(event)
        .map_err(|e| DocumentError::Write(e.to_string()))
}
