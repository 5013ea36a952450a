use super::lists::{sink_list_item, wrap_selection};
use super::{ListTypes, Skip, ensure, finish};
use crate::model::{Fragment, Slice};
use crate::state::{EditorState, Selection, Transaction};

/// Replaces the selection with `text`, leaving the cursor after it.
pub fn insert_text(state: &EditorState, text: &str) -> Option<Transaction> {
    let attempt = || -> Result<Transaction, Skip> {
        let (from, _) = state.selection().resolve(state.doc())?;
        ensure(from.parent().inline_content(), "selection is not in a textblock")?;
        let mut tr = state.tr();
        if text.is_empty() {
            tr.replace_selection(Slice::empty())?;
        } else {
            let node = state.schema().text(text, Vec::new())?;
            tr.replace_selection(Slice::new(Fragment::from_node(node), 0, 0))?;
        }
        tr.set_selection(Selection::cursor(from.pos() + text.chars().count()))?;
        Ok(tr)
    };
    finish("insert_text", attempt())
}

/// Tab: sinks the current list item, or inserts a tab character where
/// the item cannot be sunk.
pub fn insert_tab(state: &EditorState, types: &ListTypes) -> Option<Transaction> {
    sink_list_item(state, types).or_else(|| insert_text(state, "\t"))
}

/// The "- " shortcut: when the text before the cursor in a block outside
/// any list is a dash followed by one whitespace character, the marker is
/// removed and the block is wrapped in a list.
pub fn start_bullet_list(state: &EditorState, types: &ListTypes) -> Option<Transaction> {
    let attempt = || -> Result<Transaction, Skip> {
        let (list, item) = types.resolve(state.schema())?;
        let selection = state.selection();
        ensure(selection.is_empty(), "selection is not collapsed")?;
        let pos = state.doc().resolve(selection.head)?;
        ensure(pos.parent().is_textblock(), "cursor is not in a textblock")?;
        ensure(
            (0..pos.depth()).all(|d| {
                let ty = pos.node(d).ty();
                ty != &list && ty != &item
            }),
            "block is already in a list",
        )?;
        let before = pos.parent().text_between(0, pos.parent_offset(), None);
        ensure(is_bullet_marker(&before), "no list marker before the cursor")?;

        let start = pos.start(pos.depth());
        let mut tr = state.tr();
        tr.delete(start, pos.pos())?;
        wrap_selection(&mut tr, &list, None)?;
        Ok(tr)
    };
    finish("start_bullet_list", attempt())
}

fn is_bullet_marker(text: &str) -> bool {
    let mut chars = text.chars();
    matches!(
        (chars.next(), chars.next(), chars.next()),
        (Some('-'), Some(space), None) if space.is_whitespace() && space != '\n'
    )
}
