//! JSON mapping of nodes, marks and slices.
//!
//! Layout: `{"type", "attrs"?, "content"?, "text"?, "marks"?}` for nodes and
//! `{"content"?, "openStart"?, "openEnd"?}` for slices. Empty members are left
//! out when writing and defaulted when reading.

use super::{Attrs, Fragment, Mark, ModelError, Node, Schema, Slice};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkJson {
    #[serde(rename = "type")]
    pub ty: String,
    #[serde(default, skip_serializing_if = "Attrs::is_empty")]
    pub attrs: Attrs,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeJson {
    #[serde(rename = "type")]
    pub ty: String,
    #[serde(default, skip_serializing_if = "Attrs::is_empty")]
    pub attrs: Attrs,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub content: Vec<NodeJson>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub marks: Vec<MarkJson>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SliceJson {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub content: Vec<NodeJson>,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub open_start: usize,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub open_end: usize,
}

fn is_zero(n: &usize) -> bool {
    *n == 0
}

impl From<&Mark> for MarkJson {
    fn from(mark: &Mark) -> Self {
        Self {
            ty: mark.ty().name().to_string(),
            attrs: mark.attrs().clone(),
        }
    }
}

impl MarkJson {
    pub fn to_mark(&self, schema: &Schema) -> Result<Mark, ModelError> {
        let ty = schema
            .mark_type(&self.ty)
            .ok_or_else(|| ModelError::UnknownMarkType(self.ty.clone()))?;
        ty.create(Some(&self.attrs))
    }
}

impl From<&Node> for NodeJson {
    fn from(node: &Node) -> Self {
        Self {
            ty: node.ty().name().to_string(),
            attrs: node.attrs().clone(),
            content: node.content().iter().map(NodeJson::from).collect(),
            text: node.text().map(str::to_string),
            marks: node.marks().iter().map(MarkJson::from).collect(),
        }
    }
}

impl NodeJson {
    /// Builds the node. With `checked`, every container's content must match
    /// its grammar; slices skip that since their open nodes may be partial.
    pub fn to_node(&self, schema: &Schema, checked: bool) -> Result<Node, ModelError> {
        let marks = self
            .marks
            .iter()
            .map(|mark| mark.to_mark(schema))
            .collect::<Result<Vec<_>, _>>()?;
        if let Some(text) = &self.text {
            return schema.text(text, marks);
        }
        let ty = schema
            .node_type(&self.ty)
            .ok_or_else(|| ModelError::UnknownNodeType(self.ty.clone()))?;
        let content = fragment_from_json(&self.content, schema, checked)?;
        if checked {
            ty.create(Some(&self.attrs), content, marks)
        } else {
            ty.create_unchecked(Some(&self.attrs), content, marks)
        }
    }
}

fn fragment_from_json(
    nodes: &[NodeJson],
    schema: &Schema,
    checked: bool,
) -> Result<Fragment, ModelError> {
    let nodes = nodes
        .iter()
        .map(|node| node.to_node(schema, checked))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Fragment::from_nodes(nodes))
}

impl From<&Slice> for SliceJson {
    fn from(slice: &Slice) -> Self {
        Self {
            content: slice.content().iter().map(NodeJson::from).collect(),
            open_start: slice.open_start(),
            open_end: slice.open_end(),
        }
    }
}

impl SliceJson {
    pub fn to_slice(&self, schema: &Schema) -> Result<Slice, ModelError> {
        let content = fragment_from_json(&self.content, schema, false)?;
        let deepest = Slice::max_open(content.clone(), true);
        if self.open_start > deepest.open_start() || self.open_end > deepest.open_end() {
            return Err(ModelError::Json(format!(
                "slice open depths {}/{} exceed its content ({}/{})",
                self.open_start,
                self.open_end,
                deepest.open_start(),
                deepest.open_end()
            )));
        }
        Ok(Slice::new(content, self.open_start, self.open_end))
    }
}

impl Node {
    pub fn to_json(&self) -> Value {
        serde_json::to_value(NodeJson::from(self)).unwrap_or(Value::Null)
    }

    /// Parses a checked node tree.
    pub fn from_json(schema: &Schema, value: &Value) -> Result<Node, ModelError> {
        let json = NodeJson::deserialize(value)?;
        json.to_node(schema, true)
    }
}

impl Slice {
    pub fn to_json(&self) -> Value {
        serde_json::to_value(SliceJson::from(self)).unwrap_or(Value::Null)
    }

    pub fn from_json(schema: &Schema, value: &Value) -> Result<Slice, ModelError> {
        if value.is_null() {
            return Ok(Slice::empty());
        }
        SliceJson::deserialize(value)?.to_slice(schema)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::builders::{doc, li, p, schema, ul};
    use serde_json::json;

    #[test]
    fn node_round_trips_through_json() {
        let d = doc([ul([li([p("a"), p("")])]), p("b")]);
        let value = d.to_json();
        assert_eq!(
            value,
            json!({
                "type": "doc",
                "content": [
                    {"type": "bulletList", "attrs": {"nestingDepth": 0}, "content": [
                        {"type": "listItem", "content": [
                            {"type": "paragraph", "content": [{"type": "text", "text": "a"}]},
                            {"type": "paragraph"}
                        ]}
                    ]},
                    {"type": "paragraph", "content": [{"type": "text", "text": "b"}]}
                ]
            })
        );
        assert_eq!(Node::from_json(&schema(), &value).unwrap(), d);
    }

    #[test]
    fn marks_are_read_and_written() {
        let value = json!({"type": "paragraph", "content": [
            {"type": "text", "text": "x", "marks": [{"type": "strong"}]}
        ]});
        let node = Node::from_json(&schema(), &value).unwrap();
        assert_eq!(node.to_string(), "paragraph(strong(\"x\"))");
        assert_eq!(node.to_json(), value);
    }

    #[test]
    fn invalid_documents_are_rejected() {
        let value = json!({"type": "bulletList", "content": [{"type": "paragraph"}]});
        assert!(matches!(
            Node::from_json(&schema(), &value),
            Err(ModelError::InvalidContent { .. })
        ));
        let unknown = json!({"type": "heading"});
        assert_eq!(
            Node::from_json(&schema(), &unknown),
            Err(ModelError::UnknownNodeType("heading".to_string()))
        );
    }

    #[test]
    fn open_slices_keep_partial_nodes() {
        let value = json!({
            "content": [{"type": "bulletList", "attrs": {"nestingDepth": 0}}],
            "openStart": 1,
            "openEnd": 1
        });
        let slice = Slice::from_json(&schema(), &value).unwrap();
        assert_eq!((slice.open_start(), slice.open_end()), (1, 1));
        assert_eq!(slice.to_json(), value);
    }
}
