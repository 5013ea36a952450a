//! Document model: schema, immutable node tree, positions and slices.
//!
//! - [`Schema`], [`NodeType`], [`MarkType`] - the content model
//! - [`ContentMatch`] - states of a node type's compiled content grammar
//! - [`Node`] and [`Fragment`] - the persistent document tree
//! - [`ResolvedPos`] and [`NodeRange`] - positions with their ancestor path
//! - [`Slice`] - a cut of a document with open boundaries

use std::collections::BTreeMap;

#[cfg(test)]
pub(crate) mod builders;
pub mod content;
mod fragment;
mod json;
mod mark;
mod node;
mod replace;
mod resolve;
pub mod schema;

pub use content::ContentMatch;
pub use fragment::Fragment;
pub use json::{MarkJson, NodeJson, SliceJson};
pub use mark::Mark;
pub use node::Node;
pub use replace::{ReplaceError, Slice};
pub use resolve::{NodeRange, ResolvedPos};
pub use schema::{
    AttributeSpec, MarkSpec, MarkType, NodeSpec, NodeType, Schema, SchemaError, SchemaSpec,
};

/// Node and mark attributes, kept sorted so equality and output are stable.
pub type Attrs = BTreeMap<String, serde_json::Value>;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ModelError {
    #[error("invalid content for node {type_name}: {content}")]
    InvalidContent { type_name: String, content: String },
    #[error("position {pos} out of range (content size {size})")]
    PositionOutOfRange { pos: usize, size: usize },
    #[error("no value supplied for attribute {attr} on {type_name}")]
    MissingAttribute { type_name: String, attr: String },
    #[error("unknown node type {0:?}")]
    UnknownNodeType(String),
    #[error("unknown mark type {0:?}")]
    UnknownMarkType(String),
    #[error("text nodes need non-empty text and cannot be built through create")]
    InvalidText,
    #[error("invalid mark set on node {0}")]
    InvalidMarks(String),
    #[error("invalid JSON: {0}")]
    Json(String),
}

impl From<serde_json::Error> for ModelError {
    fn from(err: serde_json::Error) -> Self {
        ModelError::Json(err.to_string())
    }
}
