//! outline-edit: a structural editing engine for outline documents.
//!
//! Documents are immutable trees of typed nodes checked against a schema.
//! Every edit is a [`Step`] that maps positions and can be inverted, and the
//! list commands build [`Transaction`]s out of those steps:
//!
//! - **Model** - schema, content automata, nodes, slices and resolved positions
//! - **Transform** - replace, replace-around, split and lift steps with their
//!   position maps
//! - **State** - editor snapshots, selections and transactions
//! - **Commands** - wrap, lift, sink and split for list items, plus text input
//!
//! # Quick Start
//!
//! ```rust
//! use outline_edit::{EditorState, ListCommand, Node, Schema, Selection};
//! use serde_json::json;
//!
//! let schema = Schema::outline();
//! let doc = Node::from_json(&schema, &json!({
//!     "type": "doc",
//!     "content": [{"type": "paragraph", "content": [{"type": "text", "text": "a"}]}]
//! }))
//! .unwrap();
//! let state = EditorState::new(doc, Selection::cursor(1)).unwrap();
//!
//! let tr = ListCommand::WrapInList.run(&state).unwrap();
//! let next = state.apply(&tr).unwrap();
//! assert_eq!(next.doc().to_string(), r#"doc(bulletList(listItem(paragraph("a"))))"#);
//! ```

// Schema, nodes and positions
pub mod model;

// Steps and position mapping
pub mod transform;

// Editor state and transactions
pub mod state;

// List and text commands
pub mod commands;

pub use model::{
    Attrs, ContentMatch, Fragment, Mark, MarkType, ModelError, Node, NodeRange, NodeType,
    ReplaceError, ResolvedPos, Schema, SchemaError, SchemaSpec, Slice,
};

pub use transform::{
    Bias, CheckMode, LiftStep, Mapping, ReplaceAroundStep, ReplaceStep, SplitStep, Step,
    StepError, StepMap, Transform, TransformConfig, Wrapper, can_split, find_wrapping,
    lift_target,
};

pub use state::{EditorState, Selection, StateError, Transaction};

pub use commands::{
    ListCommand, ListTypes, insert_tab, insert_text, lift_list_item, sink_list_item,
    split_list_item, start_bullet_list, wrap_in_list,
};
