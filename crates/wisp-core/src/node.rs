//! The node tree: the unit of application-layer traffic.

use std::fmt;

use crate::jid::Jid;

/// An attribute value.
///
/// The decoder produces exactly these shapes; anything else on the wire is
/// a structural error, never a dynamically-typed fallback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    /// UTF-8 text (including dictionary tokens and packed digits).
    Text(String),
    /// Raw bytes.
    Bytes(Vec<u8>),
    /// A peer address.
    Jid(Jid),
}

impl Value {
    /// Human-readable type name, used in strict-decode diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Text(_) => "string",
            Self::Bytes(_) => "bytes",
            Self::Jid(_) => "jid",
        }
    }

    /// The text content, if this value is text.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }
}

/// Node body content.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum NodeContent {
    /// No body (declared size was odd).
    #[default]
    Empty,
    /// Text body.
    Text(String),
    /// Binary body (encrypted payloads travel here).
    Bytes(Vec<u8>),
    /// Child nodes.
    Children(Vec<Node>),
    /// A jid body.
    Jid(Jid),
}

/// Insertion-ordered attribute map with last-write-wins semantics.
///
/// Decode inserts pairs in read order and encode replays the same order, so
/// a decoded node re-encodes to the byte sequence it came from.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Attributes(Vec<(String, Value)>);

impl Attributes {
    /// An empty attribute map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True when no attributes are present.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Insert a value, overwriting in place if the key already exists.
    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        let key = key.into();
        match self.0.iter_mut().find(|(existing, _)| *existing == key) {
            Some((_, slot)) => *slot = value,
            None => self.0.push((key, value)),
        }
    }

    /// Look up a value by key.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0
            .iter()
            .find(|(existing, _)| existing == key)
            .map(|(_, value)| value)
    }

    /// Look up a text value by key.
    pub fn get_text(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_text)
    }

    /// Iterate entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().map(|(key, value)| (key.as_str(), value))
    }
}

impl<K: Into<String>> FromIterator<(K, Value)> for Attributes {
    fn from_iter<I: IntoIterator<Item = (K, Value)>>(iter: I) -> Self {
        let mut attributes = Self::new();
        for (key, value) in iter {
            attributes.insert(key, value);
        }
        attributes
    }
}

/// A node: description tag, ordered attributes, and content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    /// Tag name.
    pub description: String,
    /// Ordered attribute map.
    pub attributes: Attributes,
    /// Body content.
    pub content: NodeContent,
}

impl Node {
    /// A node with attributes and no body.
    pub fn new(description: impl Into<String>, attributes: Attributes) -> Self {
        Self {
            description: description.into(),
            attributes,
            content: NodeContent::Empty,
        }
    }

    /// A node with attributes and a body.
    pub fn with_content(
        description: impl Into<String>,
        attributes: Attributes,
        content: NodeContent,
    ) -> Self {
        Self {
            description: description.into(),
            attributes,
            content,
        }
    }

    /// The binary body, if present.
    pub fn bytes(&self) -> Option<&[u8]> {
        match &self.content {
            NodeContent::Bytes(bytes) => Some(bytes),
            _ => None,
        }
    }

    /// The child nodes, if present.
    pub fn children(&self) -> &[Node] {
        match &self.content {
            NodeContent::Children(children) => children,
            _ => &[],
        }
    }

    /// First child with the given description.
    pub fn find_child(&self, description: &str) -> Option<&Node> {
        self.children()
            .iter()
            .find(|child| child.description == description)
    }

    /// Declared wire size: description + attribute cells + optional body.
    pub fn declared_size(&self) -> usize {
        1 + 2 * self.attributes.len() + usize::from(self.content != NodeContent::Empty)
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}", self.description)?;
        for (key, value) in self.attributes.iter() {
            match value {
                Value::Text(text) => write!(f, " {key}=\"{text}\"")?,
                Value::Bytes(bytes) => write!(f, " {key}=[{} bytes]", bytes.len())?,
                Value::Jid(jid) => write!(f, " {key}=\"{jid}\"")?,
            }
        }
        match &self.content {
            NodeContent::Empty => write!(f, "/>"),
            NodeContent::Text(text) => write!(f, ">{text}</{}>", self.description),
            NodeContent::Bytes(bytes) => {
                write!(f, ">[{} bytes]</{}>", bytes.len(), self.description)
            }
            NodeContent::Jid(jid) => write!(f, ">{jid}</{}>", self.description),
            NodeContent::Children(children) => {
                write!(f, ">")?;
                for child in children {
                    write!(f, "{child}")?;
                }
                write!(f, "</{}>", self.description)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attributes_preserve_insertion_order() {
        let mut attributes = Attributes::new();
        attributes.insert("z", Value::Text("1".into()));
        attributes.insert("a", Value::Text("2".into()));
        let keys: Vec<_> = attributes.iter().map(|(key, _)| key).collect();
        assert_eq!(keys, ["z", "a"]);
    }

    #[test]
    fn test_attributes_last_write_wins_in_place() {
        let mut attributes = Attributes::new();
        attributes.insert("id", Value::Text("1".into()));
        attributes.insert("type", Value::Text("get".into()));
        attributes.insert("id", Value::Text("2".into()));
        assert_eq!(attributes.len(), 2);
        assert_eq!(attributes.get_text("id"), Some("2"));
        let keys: Vec<_> = attributes.iter().map(|(key, _)| key).collect();
        assert_eq!(keys, ["id", "type"]);
    }

    #[test]
    fn test_declared_size_parity() {
        let mut attributes = Attributes::new();
        attributes.insert("id", Value::Text("1".into()));
        let without_body = Node::new("iq", attributes.clone());
        // tag + one key/value pair, odd: no body cell.
        assert_eq!(without_body.declared_size(), 3);

        let with_body =
            Node::with_content("iq", attributes, NodeContent::Bytes(vec![1, 2, 3]));
        assert_eq!(with_body.declared_size(), 4);
    }

    #[test]
    fn test_find_child() {
        let child = Node::new("enc", Attributes::new());
        let parent = Node::with_content(
            "message",
            Attributes::new(),
            NodeContent::Children(vec![child.clone()]),
        );
        assert_eq!(parent.find_child("enc"), Some(&child));
        assert_eq!(parent.find_child("missing"), None);
    }
}
