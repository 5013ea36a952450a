//! Node and mark types, attribute defaults, and the declarative schema table.
//!
//! A [`Schema`] is built once from a [`SchemaSpec`]; every node type's content
//! expression is compiled into a [`ContentMatch`] automaton at that point and
//! never changes afterwards. [`NodeType`] and [`MarkType`] are cheap handles
//! (an `Arc` to the schema plus an index into its type table).

use super::content::{ContentExpr, ContentMatch, Dfa};
use super::{Attrs, Fragment, Mark, ModelError, Node};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchemaError {
    #[error("schema is missing top node type {0:?}")]
    MissingTopNode(String),
    #[error("duplicate type name {0:?}")]
    DuplicateName(String),
    #[error("no node type or group {name:?} found (in content expression {expr:?})")]
    UnknownName { name: String, expr: String },
    #[error("{message} (in content expression {expr:?})")]
    Syntax { message: String, expr: String },
    #[error("mixing inline and block content (in content expression {0:?})")]
    MixedContent(String),
    #[error("every schema needs a \"text\" type when inline content is used")]
    MissingText,
    #[error("the text node type should not have attributes")]
    TextAttrs,
    #[error("unknown mark type {mark:?} allowed on node type {node:?}")]
    UnknownMark { node: String, mark: String },
}

/// Declaration of one attribute. `default: None` makes the attribute required.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AttributeSpec {
    #[serde(default, deserialize_with = "present_value")]
    pub default: Option<Value>,
}

impl AttributeSpec {
    pub fn required() -> Self {
        Self { default: None }
    }

    pub fn with_default(value: impl Into<Value>) -> Self {
        Self {
            default: Some(value.into()),
        }
    }
}

// A present `"default": null` is a real default, unlike a missing key.
fn present_value<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Value>, D::Error> {
    Value::deserialize(deserializer).map(Some)
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeSpec {
    pub name: String,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub group: Option<String>,
    #[serde(default)]
    pub inline: bool,
    #[serde(default)]
    pub atom: bool,
    #[serde(default)]
    pub defining: bool,
    #[serde(default)]
    pub isolating: bool,
    /// `None` allows every mark on inline content, `Some("")` none, otherwise
    /// a space-separated list of mark names (`"_"` for all).
    #[serde(default)]
    pub marks: Option<String>,
    #[serde(default)]
    pub attrs: BTreeMap<String, AttributeSpec>,
}

impl NodeSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn content(mut self, expr: impl Into<String>) -> Self {
        self.content = Some(expr.into());
        self
    }

    pub fn group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    pub fn inline(mut self) -> Self {
        self.inline = true;
        self
    }

    pub fn defining(mut self) -> Self {
        self.defining = true;
        self
    }

    pub fn isolating(mut self) -> Self {
        self.isolating = true;
        self
    }

    pub fn marks(mut self, marks: impl Into<String>) -> Self {
        self.marks = Some(marks.into());
        self
    }

    pub fn attr(mut self, name: impl Into<String>, spec: AttributeSpec) -> Self {
        self.attrs.insert(name.into(), spec);
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MarkSpec {
    pub name: String,
    #[serde(default)]
    pub attrs: BTreeMap<String, AttributeSpec>,
}

impl MarkSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attrs: BTreeMap::new(),
        }
    }
}

fn default_top_node() -> String {
    "doc".to_string()
}

/// The declarative table a collaborator hands over at startup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaSpec {
    pub nodes: Vec<NodeSpec>,
    #[serde(default)]
    pub marks: Vec<MarkSpec>,
    #[serde(default = "default_top_node")]
    pub top_node: String,
}

impl SchemaSpec {
    /// The list-editing schema the engine was designed around.
    pub fn outline() -> Self {
        Self {
            nodes: vec![
                NodeSpec::new("doc").content("block+"),
                NodeSpec::new("paragraph").content("inline*").group("block"),
                NodeSpec::new("bulletList")
                    .content("listItem+")
                    .group("block")
                    .attr("nestingDepth", AttributeSpec::with_default(0)),
                NodeSpec::new("listItem")
                    .content("paragraph* bulletList*")
                    .group("block")
                    .defining(),
                NodeSpec::new("text").group("inline"),
                NodeSpec::new("linebreak").group("inline").inline(),
            ],
            marks: vec![MarkSpec::new("strong"), MarkSpec::new("em")],
            top_node: default_top_node(),
        }
    }
}

pub(crate) struct NodeTypeData {
    pub(crate) name: String,
    pub(crate) groups: Vec<String>,
    pub(crate) spec: NodeSpec,
    pub(crate) content: Dfa,
    pub(crate) inline_content: bool,
    pub(crate) leaf: bool,
    /// `None` means every mark is allowed.
    pub(crate) allowed_marks: Option<Vec<usize>>,
}

pub(crate) struct MarkTypeData {
    pub(crate) name: String,
    pub(crate) spec: MarkSpec,
}

pub(crate) struct SchemaInner {
    pub(crate) nodes: Vec<NodeTypeData>,
    pub(crate) marks: Vec<MarkTypeData>,
    node_index: BTreeMap<String, usize>,
    mark_index: BTreeMap<String, usize>,
    top: usize,
}

/// A compiled schema. Cloning shares the compiled tables.
#[derive(Clone)]
pub struct Schema(pub(crate) Arc<SchemaInner>);

impl Schema {
    pub fn new(spec: SchemaSpec) -> Result<Self, SchemaError> {
        let mut node_index = BTreeMap::new();
        for (index, node) in spec.nodes.iter().enumerate() {
            if node_index.insert(node.name.clone(), index).is_some() {
                return Err(SchemaError::DuplicateName(node.name.clone()));
            }
        }
        let mut mark_index = BTreeMap::new();
        for (index, mark) in spec.marks.iter().enumerate() {
            if node_index.contains_key(&mark.name)
                || mark_index.insert(mark.name.clone(), index).is_some()
            {
                return Err(SchemaError::DuplicateName(mark.name.clone()));
            }
        }
        let top = *node_index
            .get(&spec.top_node)
            .ok_or_else(|| SchemaError::MissingTopNode(spec.top_node.clone()))?;

        let names: Vec<NodeName> = spec
            .nodes
            .iter()
            .map(|node| NodeName {
                name: node.name.clone(),
                groups: split_groups(node.group.as_deref()),
                inline: node.inline || node.name == "text",
            })
            .collect();

        let text = node_index.get("text").copied();
        let mut nodes = Vec::with_capacity(spec.nodes.len());
        for node in &spec.nodes {
            if node.name == "text" && !node.attrs.is_empty() {
                return Err(SchemaError::TextAttrs);
            }
            let (content, leaf) = match node.content.as_deref() {
                Some(expr) if !expr.trim().is_empty() => {
                    let parsed = ContentExpr::parse(expr, &names)?;
                    (Dfa::compile(&parsed), false)
                }
                _ => (Dfa::empty(), true),
            };
            let inline_content = content
                .first_edge_type()
                .is_some_and(|ty| names[ty].inline);
            if inline_content && text.is_none() {
                return Err(SchemaError::MissingText);
            }
            let allowed_marks = match node.marks.as_deref() {
                None | Some("_") => None,
                Some(list) => {
                    let mut allowed = Vec::new();
                    for name in list.split_whitespace() {
                        let Some(&mark) = mark_index.get(name) else {
                            return Err(SchemaError::UnknownMark {
                                node: node.name.clone(),
                                mark: name.to_string(),
                            });
                        };
                        allowed.push(mark);
                    }
                    Some(allowed)
                }
            };
            nodes.push(NodeTypeData {
                name: node.name.clone(),
                groups: split_groups(node.group.as_deref()),
                spec: node.clone(),
                content,
                inline_content,
                leaf,
                allowed_marks,
            });
        }

        let marks = spec
            .marks
            .iter()
            .map(|mark| MarkTypeData {
                name: mark.name.clone(),
                spec: mark.clone(),
            })
            .collect();

        Ok(Self(Arc::new(SchemaInner {
            nodes,
            marks,
            node_index,
            mark_index,
            top,
        })))
    }

    /// The built-in list schema (see [`SchemaSpec::outline`]).
    pub fn outline() -> Self {
        Self::new(SchemaSpec::outline()).expect("built-in outline schema is valid")
    }

    pub fn node_type(&self, name: &str) -> Option<NodeType> {
        self.0.node_index.get(name).map(|&index| NodeType {
            schema: self.clone(),
            index,
        })
    }

    pub fn mark_type(&self, name: &str) -> Option<MarkType> {
        self.0.mark_index.get(name).map(|&index| MarkType {
            schema: self.clone(),
            index,
        })
    }

    pub fn top_node_type(&self) -> NodeType {
        NodeType {
            schema: self.clone(),
            index: self.0.top,
        }
    }

    pub fn node_types(&self) -> impl Iterator<Item = NodeType> + '_ {
        (0..self.0.nodes.len()).map(|index| NodeType {
            schema: self.clone(),
            index,
        })
    }

    pub(crate) fn node_type_at(&self, index: usize) -> NodeType {
        NodeType {
            schema: self.clone(),
            index,
        }
    }

    /// Looks up `name` and builds a checked node.
    pub fn node(
        &self,
        name: &str,
        attrs: Option<&Attrs>,
        content: Fragment,
        marks: Vec<Mark>,
    ) -> Result<Node, ModelError> {
        let ty = self
            .node_type(name)
            .ok_or_else(|| ModelError::UnknownNodeType(name.to_string()))?;
        ty.create(attrs, content, marks)
    }

    pub fn text(&self, text: &str, marks: Vec<Mark>) -> Result<Node, ModelError> {
        let ty = self
            .node_type("text")
            .ok_or_else(|| ModelError::UnknownNodeType("text".to_string()))?;
        Node::new_text(ty, text.to_string(), marks)
    }

    pub fn ptr_eq(&self, other: &Schema) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Schema")
            .field(
                "nodes",
                &self.0.nodes.iter().map(|n| &n.name).collect::<Vec<_>>(),
            )
            .field(
                "marks",
                &self.0.marks.iter().map(|m| &m.name).collect::<Vec<_>>(),
            )
            .finish()
    }
}

/// Name-resolution view used while parsing content expressions, before the
/// node tables exist.
pub(crate) struct NodeName {
    pub(crate) name: String,
    pub(crate) groups: Vec<String>,
    pub(crate) inline: bool,
}

fn split_groups(group: Option<&str>) -> Vec<String> {
    group
        .map(|g| g.split_whitespace().map(str::to_string).collect())
        .unwrap_or_default()
}

#[derive(Clone)]
pub struct NodeType {
    pub(crate) schema: Schema,
    pub(crate) index: usize,
}

impl NodeType {
    pub(crate) fn data(&self) -> &NodeTypeData {
        &self.schema.0.nodes[self.index]
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn name(&self) -> &str {
        &self.data().name
    }

    pub fn spec(&self) -> &NodeSpec {
        &self.data().spec
    }

    pub fn groups(&self) -> &[String] {
        &self.data().groups
    }

    pub fn is_text(&self) -> bool {
        self.data().name == "text"
    }

    pub fn is_inline(&self) -> bool {
        self.data().spec.inline || self.is_text()
    }

    pub fn is_block(&self) -> bool {
        !self.is_inline()
    }

    pub fn is_textblock(&self) -> bool {
        self.is_block() && self.data().inline_content
    }

    pub fn inline_content(&self) -> bool {
        self.data().inline_content
    }

    pub fn is_leaf(&self) -> bool {
        self.data().leaf
    }

    pub fn is_atom(&self) -> bool {
        self.is_leaf() || self.data().spec.atom
    }

    pub fn is_defining(&self) -> bool {
        self.data().spec.defining
    }

    pub fn is_isolating(&self) -> bool {
        self.data().spec.isolating
    }

    pub fn has_required_attrs(&self) -> bool {
        self.data()
            .spec
            .attrs
            .values()
            .any(|attr| attr.default.is_none())
    }

    /// Start state of this type's content automaton.
    pub fn content_match(&self) -> ContentMatch {
        ContentMatch::start(self.clone())
    }

    pub fn compatible_content(&self, other: &NodeType) -> bool {
        self == other || self.content_match().compatible(&other.content_match())
    }

    /// Fills in attribute defaults; fails when a required attribute is absent.
    pub fn compute_attrs(&self, given: Option<&Attrs>) -> Result<Attrs, ModelError> {
        compute_attrs(self.name(), &self.data().spec.attrs, given)
    }

    pub fn allows_mark_type(&self, mark: &MarkType) -> bool {
        match &self.data().allowed_marks {
            None => true,
            Some(allowed) => allowed.contains(&mark.index),
        }
    }

    pub fn allows_marks(&self, marks: &[Mark]) -> bool {
        marks.iter().all(|mark| self.allows_mark_type(mark.ty()))
    }

    pub fn valid_content(&self, content: &Fragment) -> bool {
        let Some(end) = self.content_match().match_fragment(content) else {
            return false;
        };
        end.valid_end() && content.iter().all(|child| self.allows_marks(child.marks()))
    }

    /// Builds a node, rejecting content that violates this type's grammar.
    pub fn create(
        &self,
        attrs: Option<&Attrs>,
        content: Fragment,
        marks: Vec<Mark>,
    ) -> Result<Node, ModelError> {
        if self.is_text() {
            return Err(ModelError::InvalidText);
        }
        if !self.valid_content(&content) {
            return Err(ModelError::InvalidContent {
                type_name: self.name().to_string(),
                content: content.to_string(),
            });
        }
        Ok(Node::new(self.clone(), self.compute_attrs(attrs)?, content, marks))
    }

    /// Builds a node without checking its content. Used for shells that are
    /// only valid once other content has been merged into them.
    pub fn create_unchecked(
        &self,
        attrs: Option<&Attrs>,
        content: Fragment,
        marks: Vec<Mark>,
    ) -> Result<Node, ModelError> {
        if self.is_text() {
            return Err(ModelError::InvalidText);
        }
        Ok(Node::new(self.clone(), self.compute_attrs(attrs)?, content, marks))
    }

    /// Like [`create`](Self::create), but adds the nodes required before and
    /// after `content` to make it valid. `None` when no such fill exists.
    pub fn create_and_fill(
        &self,
        attrs: Option<&Attrs>,
        content: Fragment,
        marks: Vec<Mark>,
    ) -> Option<Node> {
        if self.is_text() {
            return None;
        }
        let attrs = self.compute_attrs(attrs).ok()?;
        let mut content = content;
        if content.size() > 0 {
            let before = self.content_match().fill_before(&content, false, 0)?;
            content = before.append(&content);
        }
        let matched = self.content_match().match_fragment(&content)?;
        let after = matched.fill_before(&Fragment::empty(), true, 0)?;
        Some(Node::new(self.clone(), attrs, content.append(&after), marks))
    }
}

impl PartialEq for NodeType {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index && self.schema.ptr_eq(&other.schema)
    }
}

impl Eq for NodeType {}

impl fmt::Debug for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeType({})", self.name())
    }
}

#[derive(Clone)]
pub struct MarkType {
    pub(crate) schema: Schema,
    pub(crate) index: usize,
}

impl MarkType {
    fn data(&self) -> &MarkTypeData {
        &self.schema.0.marks[self.index]
    }

    pub fn name(&self) -> &str {
        &self.data().name
    }

    /// Position in the schema's mark table; mark sets are ordered by rank.
    pub fn rank(&self) -> usize {
        self.index
    }

    pub fn create(&self, attrs: Option<&Attrs>) -> Result<Mark, ModelError> {
        let attrs = compute_attrs(self.name(), &self.data().spec.attrs, attrs)?;
        Ok(Mark::new(self.clone(), attrs))
    }
}

impl PartialEq for MarkType {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index && self.schema.ptr_eq(&other.schema)
    }
}

impl Eq for MarkType {}

impl fmt::Debug for MarkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MarkType({})", self.name())
    }
}

fn compute_attrs(
    type_name: &str,
    declared: &BTreeMap<String, AttributeSpec>,
    given: Option<&Attrs>,
) -> Result<Attrs, ModelError> {
    let mut attrs = Attrs::new();
    for (name, spec) in declared {
        let value = given
            .and_then(|given| given.get(name).cloned())
            .or_else(|| spec.default.clone())
            .ok_or_else(|| ModelError::MissingAttribute {
                type_name: type_name.to_string(),
                attr: name.clone(),
            })?;
        attrs.insert(name.clone(), value);
    }
    Ok(attrs)
}
