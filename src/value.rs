//! Compiled configuration values.
//!
//! [`Value`] is what a successful build hands back to the caller. It owns the
//! evaluated tree of one package and no longer references the engine that produced it.

use indexmap::IndexMap;
use std::fmt;
use thiserror::Error;

use crate::engine::CompiledValue;

/// Kind of an incomplete (type-only) value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    /// `_`, any value
    Top,
    Null,
    Bool,
    Int,
    Float,
    /// `number`, int or float
    Number,
    String,
}

impl Kind {
    /// Whether a concrete node is an instance of this kind.
    pub fn admits(&self, node: &Node) -> bool {
        match (self, node) {
            (Kind::Top, _) => true,
            (Kind::Null, Node::Null) => true,
            (Kind::Bool, Node::Bool(_)) => true,
            (Kind::Int, Node::Int(_)) => true,
            (Kind::Float, Node::Float(_)) => true,
            (Kind::Number, Node::Int(_) | Node::Float(_)) => true,
            (Kind::String, Node::String(_)) => true,
            _ => false,
        }
    }

    /// Greatest lower bound of two kinds, `None` when disjoint.
    pub fn meet(self, other: Kind) -> Option<Kind> {
        match (self, other) {
            (a, b) if a == b => Some(a),
            (Kind::Top, k) | (k, Kind::Top) => Some(k),
            (Kind::Number, k @ (Kind::Int | Kind::Float))
            | (k @ (Kind::Int | Kind::Float), Kind::Number) => Some(k),
            _ => None,
        }
    }

    /// Keyword spelling of the kind.
    pub fn keyword(&self) -> &'static str {
        match self {
            Kind::Top => "_",
            Kind::Null => "null",
            Kind::Bool => "bool",
            Kind::Int => "int",
            Kind::Float => "float",
            Kind::Number => "number",
            Kind::String => "string",
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

/// An evaluated configuration node.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    List(Vec<Node>),
    /// Fields in declaration order
    Struct(IndexMap<String, Node>),
    /// A constraint with no concrete value yet
    Type(Kind),
}

impl Node {
    /// An empty struct.
    pub fn empty_struct() -> Self {
        Node::Struct(IndexMap::new())
    }

    /// Whether this node and all of its children are concrete.
    pub fn is_concrete(&self) -> bool {
        match self {
            Node::Type(_) => false,
            Node::List(items) => items.iter().all(Node::is_concrete),
            Node::Struct(fields) => fields.values().all(Node::is_concrete),
            _ => true,
        }
    }

    /// Short name of the node's kind, used in messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Node::Null => "null",
            Node::Bool(_) => "bool",
            Node::Int(_) => "int",
            Node::Float(_) => "float",
            Node::String(_) => "string",
            Node::List(_) => "list",
            Node::Struct(_) => "struct",
            Node::Type(k) => k.keyword(),
        }
    }

    fn to_json(&self, path: &mut Vec<String>) -> Result<serde_json::Value, ValueError> {
        use serde_json::Value as Json;

        Ok(match self {
            Node::Null => Json::Null,
            Node::Bool(b) => Json::Bool(*b),
            Node::Int(i) => Json::from(*i),
            Node::Float(f) => serde_json::Number::from_f64(*f)
                .map(Json::Number)
                .ok_or_else(|| ValueError::NotRepresentable { path: path.join("."), value: f.to_string() })?,
            Node::String(s) => Json::String(s.clone()),
            Node::List(items) => {
                let mut out = Vec::with_capacity(items.len());
                for (i, item) in items.iter().enumerate() {
                    path.push(i.to_string());
                    out.push(item.to_json(path)?);
                    path.pop();
                }
                Json::Array(out)
            }
            Node::Struct(fields) => {
                let mut out = serde_json::Map::new();
                for (name, child) in fields {
                    path.push(name.clone());
                    out.insert(name.clone(), child.to_json(path)?);
                    path.pop();
                }
                Json::Object(out)
            }
            Node::Type(kind) => {
                return Err(ValueError::Incomplete { path: path.join("."), kind: *kind });
            }
        })
    }

    fn write(&self, f: &mut fmt::Formatter<'_>, indent: usize) -> fmt::Result {
        match self {
            Node::Null => f.write_str("null"),
            Node::Bool(b) => write!(f, "{}", b),
            Node::Int(i) => write!(f, "{}", i),
            Node::Float(v) => {
                if v.fract() == 0.0 && v.is_finite() {
                    write!(f, "{:.1}", v)
                } else {
                    write!(f, "{}", v)
                }
            }
            Node::String(s) => f.write_str(&quote(s)),
            Node::Type(k) => f.write_str(k.keyword()),
            Node::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    item.write(f, indent)?;
                }
                f.write_str("]")
            }
            Node::Struct(fields) => {
                if fields.is_empty() {
                    return f.write_str("{}");
                }
                f.write_str("{\n")?;
                for (name, child) in fields {
                    write!(f, "{:width$}{}: ", "", quote_label(name), width = (indent + 1) * 4)?;
                    child.write(f, indent + 1)?;
                    f.write_str("\n")?;
                }
                write!(f, "{:width$}}}", "", width = indent * 4)
            }
        }
    }
}

/// Quote a label unless it is a plain identifier.
fn quote_label(label: &str) -> String {
    let mut chars = label.chars();
    let plain = match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' || c == '$' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
        }
        _ => false,
    };
    if plain {
        label.to_string()
    } else {
        quote(label)
    }
}

/// Double-quoted string literal that the source lexer reads back unchanged.
fn quote(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('"');
    for c in text.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            c if c.is_control() => out.push_str(&format!("\\u{:04x}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write(f, 0)
    }
}

/// Error converting a value to another representation.
#[derive(Debug, Clone, PartialEq, Error)]
#[non_exhaustive]
pub enum ValueError {
    /// A field still holds a type constraint
    #[error("incomplete value at '{path}': {kind}")]
    Incomplete { path: String, kind: Kind },
    /// A float that JSON cannot express (NaN or infinity)
    #[error("value at '{path}' cannot be represented in JSON: {value}")]
    NotRepresentable { path: String, value: String },
}

/// The compiled value of one package.
#[derive(Debug, Clone, PartialEq)]
pub struct Value {
    package: String,
    root: Node,
}

impl Value {
    /// Wrap an engine's validated compiled value.
    pub fn wrap<C: CompiledValue>(compiled: C) -> Self {
        let package = compiled.package().to_string();
        Self { package, root: compiled.into_node() }
    }

    /// Build a value directly from a node.
    pub fn new(package: impl Into<String>, root: Node) -> Self {
        Self { package: package.into(), root }
    }

    /// Package the value was built from.
    pub fn package(&self) -> &str {
        &self.package
    }

    /// Root node of the value.
    pub fn root(&self) -> &Node {
        &self.root
    }

    /// Consume the value, returning its root node.
    pub fn into_root(self) -> Node {
        self.root
    }

    /// Look up a dotted path such as `services.web.ports.0`.
    ///
    /// Numeric segments index into lists. An empty path returns the root.
    pub fn lookup(&self, path: &str) -> Option<&Node> {
        if path.is_empty() {
            return Some(&self.root);
        }
        path.split('.').try_fold(&self.root, |node, segment| match node {
            Node::Struct(fields) => fields.get(segment),
            Node::List(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        })
    }

    /// Whether every field has a concrete value.
    pub fn is_concrete(&self) -> bool {
        self.root.is_concrete()
    }

    /// Export the value as JSON. Fails if any field is incomplete.
    pub fn to_json(&self) -> Result<serde_json::Value, ValueError> {
        self.root.to_json(&mut Vec::new())
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.root.fmt(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Value {
        let mut web = IndexMap::new();
        web.insert("image".to_string(), Node::String("nginx".to_string()));
        web.insert("ports".to_string(), Node::List(vec![Node::Int(80), Node::Int(443)]));
        let mut root = IndexMap::new();
        root.insert("web".to_string(), Node::Struct(web));
        root.insert("debug".to_string(), Node::Bool(false));
        Value::new("main", Node::Struct(root))
    }

    #[test]
    fn test_lookup_nested() {
        let v = sample();
        assert_eq!(v.lookup("web.image"), Some(&Node::String("nginx".to_string())));
        assert_eq!(v.lookup("web.ports.1"), Some(&Node::Int(443)));
        assert_eq!(v.lookup("web.ports.2"), None);
        assert_eq!(v.lookup("missing"), None);
        assert_eq!(v.lookup(""), Some(v.root()));
    }

    #[test]
    fn test_to_json_preserves_fields() {
        let json = sample().to_json().unwrap();
        assert_eq!(json["web"]["ports"][0], 80);
        assert_eq!(json["debug"], false);
    }

    #[test]
    fn test_to_json_incomplete() {
        let mut root = IndexMap::new();
        root.insert("name".to_string(), Node::Type(Kind::String));
        let v = Value::new("main", Node::Struct(root));
        assert!(!v.is_concrete());
        let err = v.to_json().unwrap_err();
        assert_eq!(err, ValueError::Incomplete { path: "name".to_string(), kind: Kind::String });
    }

    #[test]
    fn test_kind_meet() {
        assert_eq!(Kind::Number.meet(Kind::Int), Some(Kind::Int));
        assert_eq!(Kind::Top.meet(Kind::String), Some(Kind::String));
        assert_eq!(Kind::String.meet(Kind::Int), None);
        assert!(Kind::Number.admits(&Node::Float(1.5)));
        assert!(!Kind::Int.admits(&Node::Float(1.5)));
    }

    #[test]
    fn test_display_renders_config_syntax() {
        let rendered = sample().to_string();
        assert_eq!(
            rendered,
            "{\n    web: {\n        image: \"nginx\"\n        ports: [80, 443]\n    }\n    debug: false\n}"
        );
    }

    #[test]
    fn test_quote_label() {
        assert_eq!(quote_label("name"), "name");
        assert_eq!(quote_label("content-type"), "\"content-type\"");
        assert_eq!(quote_label("1st"), "\"1st\"");
        assert_eq!(quote_label("a\u{1}b"), "\"a\\u0001b\"");
    }

    #[test]
    fn test_string_display_escapes_control_characters() {
        let node = Node::String("bell\u{7}\ttab \"q\" é".to_string());
        assert_eq!(node.to_string(), "\"bell\\u0007\\ttab \\\"q\\\" é\"");
    }
}
