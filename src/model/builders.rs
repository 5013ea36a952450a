//! Node builders over one shared outline schema, for unit tests.

use super::{Fragment, Node, Schema};
use std::sync::LazyLock;

static SCHEMA: LazyLock<Schema> = LazyLock::new(Schema::outline);

pub(crate) fn schema() -> Schema {
    SCHEMA.clone()
}

fn build(name: &str, children: impl IntoIterator<Item = Node>) -> Node {
    schema()
        .node(name, None, Fragment::from_nodes(children.into_iter().collect()), Vec::new())
        .unwrap()
}

pub(crate) fn doc(children: impl IntoIterator<Item = Node>) -> Node {
    build("doc", children)
}

pub(crate) fn ul(children: impl IntoIterator<Item = Node>) -> Node {
    build("bulletList", children)
}

pub(crate) fn li(children: impl IntoIterator<Item = Node>) -> Node {
    build("listItem", children)
}

pub(crate) fn p(text: &str) -> Node {
    let content = if text.is_empty() {
        Vec::new()
    } else {
        vec![schema().text(text, Vec::new()).unwrap()]
    };
    build("paragraph", content)
}

pub(crate) fn text(text: &str) -> Node {
    schema().text(text, Vec::new()).unwrap()
}
