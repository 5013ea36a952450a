#![allow(dead_code)]

use outline_edit::{EditorState, Node, Schema, Selection};
use serde_json::{Value, json};
use std::sync::LazyLock;

static SCHEMA: LazyLock<Schema> = LazyLock::new(Schema::outline);

pub fn schema() -> Schema {
    SCHEMA.clone()
}

pub fn p(text: &str) -> Value {
    if text.is_empty() {
        json!({"type": "paragraph"})
    } else {
        json!({"type": "paragraph", "content": [{"type": "text", "text": text}]})
    }
}

pub fn li(children: Vec<Value>) -> Value {
    json!({"type": "listItem", "content": children})
}

pub fn ul(items: Vec<Value>) -> Value {
    json!({"type": "bulletList", "content": items})
}

pub fn doc(blocks: Vec<Value>) -> Node {
    Node::from_json(&SCHEMA, &json!({"type": "doc", "content": blocks})).unwrap()
}

pub fn state(doc: Node, anchor: usize, head: usize) -> EditorState {
    EditorState::new(doc, Selection::new(anchor, head)).unwrap()
}
