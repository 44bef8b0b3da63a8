//! Configuration tree nodes.
//!
//! A [`Node`] owns its children outright, so a tree is always acyclic and
//! every non-root node has exactly one parent. Values are scalar
//! `serde_json::Value`s (strings, numbers, booleans).

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// JSON key used for the value of a node that also has children.
const VALUE_KEY: &str = "$value";

/// JSON key prefix marking an attribute.
const ATTRIBUTE_PREFIX: char = '@';

/// A named attribute attached to a node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attribute {
    pub name: String,
    pub value: Value,
}

impl Attribute {
    pub fn new(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// One element of a configuration tree.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Node {
    name: String,
    value: Option<Value>,
    children: Vec<Node>,
    attributes: Vec<Attribute>,
}

impl Node {
    /// Create an empty node with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Create a leaf node carrying a value.
    pub fn with_value(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            name: name.into(),
            value: Some(value.into()),
            ..Self::default()
        }
    }

    /// Create an unnamed root node.
    pub fn root() -> Self {
        Self::default()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn value(&self) -> Option<&Value> {
        self.value.as_ref()
    }

    /// Replace the node's value. `Value::Null` clears it.
    pub fn set_value(&mut self, value: Option<Value>) {
        self.value = value.filter(|v| !v.is_null());
    }

    pub fn children(&self) -> &[Node] {
        &self.children
    }

    pub fn children_mut(&mut self) -> &mut Vec<Node> {
        &mut self.children
    }

    /// Children with the given name, in document order.
    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Node> + 'a {
        self.children.iter().filter(move |c| c.name == name)
    }

    /// Positions of the children with the given name.
    pub fn child_positions(&self, name: &str) -> Vec<usize> {
        self.children
            .iter()
            .enumerate()
            .filter(|(_, c)| c.name == name)
            .map(|(i, _)| i)
            .collect()
    }

    pub fn child_count(&self, name: &str) -> usize {
        self.children_named(name).count()
    }

    /// Append a child and return a mutable reference to it.
    pub fn add_child(&mut self, child: Node) -> &mut Node {
        self.children.push(child);
        let last = self.children.len() - 1;
        &mut self.children[last]
    }

    pub fn remove_child(&mut self, index: usize) -> Option<Node> {
        (index < self.children.len()).then(|| self.children.remove(index))
    }

    /// Append deep copies of all of `other`'s children.
    pub fn append_children(&mut self, other: &Node) {
        self.children.extend(other.children.iter().cloned());
    }

    /// Append copies of all of `other`'s attributes.
    pub fn append_attributes(&mut self, other: &Node) {
        self.attributes.extend(other.attributes.iter().cloned());
    }

    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    pub fn attributes_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Attribute> + 'a {
        self.attributes.iter().filter(move |a| a.name == name)
    }

    pub fn has_attribute(&self, name: &str) -> bool {
        self.attributes.iter().any(|a| a.name == name)
    }

    pub fn add_attribute(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.attributes.push(Attribute::new(name, value));
    }

    pub fn attribute_mut(&mut self, index: usize) -> Option<&mut Attribute> {
        self.attributes.get_mut(index)
    }

    pub fn remove_attribute(&mut self, index: usize) -> Option<Attribute> {
        (index < self.attributes.len()).then(|| self.attributes.remove(index))
    }

    /// A node is defined if it carries a value, children or attributes.
    pub fn is_defined(&self) -> bool {
        self.value.is_some() || !self.children.is_empty() || !self.attributes.is_empty()
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Follow a path of child positions starting at this node.
    pub fn child_at_path(&self, path: &[usize]) -> Option<&Node> {
        path.iter()
            .try_fold(self, |node, &index| node.children.get(index))
    }

    pub fn child_at_path_mut(&mut self, path: &[usize]) -> Option<&mut Node> {
        path.iter()
            .try_fold(self, |node, &index| node.children.get_mut(index))
    }

    /// Build a node from a JSON document.
    ///
    /// Objects become children, arrays become repeated same-named children,
    /// scalars become values. Keys starting with `@` are read back as
    /// attributes and `$value` as the value of a node with children, which
    /// mirrors [`Node::to_json`].
    pub fn from_json(name: impl Into<String>, value: &Value) -> Node {
        let mut node = Node::new(name);
        node.absorb_json(value);
        node
    }

    fn absorb_json(&mut self, value: &Value) {
        match value {
            Value::Object(map) => {
                for (key, item) in map {
                    if key == VALUE_KEY && is_scalar(item) {
                        self.value = Some(item.clone());
                    } else if let Some(attr) = key.strip_prefix(ATTRIBUTE_PREFIX) {
                        self.absorb_attribute(attr, item);
                    } else {
                        self.push_json(key, item);
                    }
                }
            }
            Value::Array(items) => {
                let name = self.name.clone();
                for item in items {
                    self.push_json(&name, item);
                }
            }
            Value::Null => {}
            scalar => self.value = Some(scalar.clone()),
        }
    }

    fn absorb_attribute(&mut self, name: &str, value: &Value) {
        match value {
            Value::Array(items) => {
                for item in items.iter().filter(|v| is_scalar(v)) {
                    self.add_attribute(name, item.clone());
                }
            }
            v if is_scalar(v) => self.add_attribute(name, v.clone()),
            _ => {}
        }
    }

    fn push_json(&mut self, key: &str, value: &Value) {
        match value {
            Value::Array(items) => {
                for item in items {
                    self.push_json(key, item);
                }
            }
            other => {
                self.add_child(Node::from_json(key, other));
            }
        }
    }

    /// Render the subtree as JSON.
    ///
    /// Leaves render as their value (`null` when undefined); repeated child
    /// names collapse into arrays.
    pub fn to_json(&self) -> Value {
        if self.children.is_empty() && self.attributes.is_empty() {
            return self.value.clone().unwrap_or(Value::Null);
        }

        let mut map = Map::new();
        for attr in &self.attributes {
            insert_grouped(&mut map, format!("{}{}", ATTRIBUTE_PREFIX, attr.name), attr.value.clone());
        }
        if let Some(value) = &self.value {
            map.insert(VALUE_KEY.to_string(), value.clone());
        }
        for child in &self.children {
            insert_grouped(&mut map, child.name.clone(), child.to_json());
        }
        Value::Object(map)
    }
}

fn is_scalar(value: &Value) -> bool {
    matches!(value, Value::String(_) | Value::Number(_) | Value::Bool(_))
}

fn insert_grouped(map: &mut Map<String, Value>, key: String, value: Value) {
    match map.get_mut(&key) {
        None => {
            map.insert(key, value);
        }
        Some(Value::Array(items)) => items.push(value),
        Some(existing) => {
            let first = existing.take();
            *existing = Value::Array(vec![first, value]);
        }
    }
}
