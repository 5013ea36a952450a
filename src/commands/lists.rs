use super::{ListTypes, Skip, ensure, finish};
use crate::model::{Attrs, Fragment, Node, NodeRange, NodeType, ResolvedPos, Slice};
use crate::state::{EditorState, Selection, Transaction};
use crate::transform::{ReplaceAroundStep, Wrapper, can_split, find_wrapping, lift_target};

/// Wraps the blocks touched by the selection in a list, one item per block.
///
/// When the selection starts at the top of a list item that has a previous
/// sibling, the new list is nested into that sibling instead of wrapping
/// the item's content in a list of its own.
pub fn wrap_in_list(
    state: &EditorState,
    types: &ListTypes,
    attrs: Option<Attrs>,
) -> Option<Transaction> {
    let attempt = || -> Result<Transaction, Skip> {
        let (list, _) = types.resolve(state.schema())?;
        let mut tr = state.tr();
        wrap_selection(&mut tr, &list, attrs)?;
        Ok(tr)
    };
    finish("wrap_in_list", attempt())
}

/// Wraps the blocks around `tr`'s current selection.
pub(crate) fn wrap_selection(
    tr: &mut Transaction,
    list: &NodeType,
    attrs: Option<Attrs>,
) -> Result<(), Skip> {
    let doc = tr.doc().clone();
    let (from, to) = tr.selection().resolve(&doc)?;
    let mut range = from
        .block_range(&to, |_| true)
        .ok_or(Skip::Precondition("selection has no block range"))?;
    let depth = range.depth();
    let mut outer = range.clone();
    let mut join = false;
    if depth >= 2
        && from.node(depth - 1).ty().compatible_content(list)
        && range.start_index() == 0
    {
        ensure(from.index(depth - 1) > 0, "already at the top of a list")?;
        let insert = doc.resolve(range.start() - 2)?;
        outer = NodeRange::new(insert.clone(), insert, depth);
        if range.end_index() < range.parent().child_count() {
            range = NodeRange::new(from.clone(), doc.resolve(to.end(depth))?, depth);
        }
        join = true;
    }
    let wrappers = find_wrapping(&outer, list, attrs, Some(&range))
        .ok_or(Skip::Precondition("no valid wrapping for the range"))?;

    let mut content = Fragment::empty();
    for wrapper in wrappers.iter().rev() {
        let node = wrapper
            .ty
            .create_unchecked(wrapper.attrs.as_ref(), content, Vec::new())?;
        content = Fragment::from_node(node);
    }
    let back = if join { 2 } else { 0 };
    let (start, end) = (range.start(), range.end());
    tr.step(ReplaceAroundStep::new(
        start - back,
        end,
        start,
        end,
        Slice::new(content, 0, 0),
        wrappers.len(),
        true,
    ))?;

    // Every block after the first gets its own item.
    let found = wrappers
        .iter()
        .rposition(|wrapper| wrapper.ty == *list)
        .map_or(0, |i| i + 1);
    let split_depth = wrappers.len() - found;
    let mut split_pos = start + wrappers.len() - back;
    let parent = range.parent();
    for i in range.start_index()..range.end_index() {
        if i > range.start_index()
            && split_depth > 0
            && can_split(tr.doc(), split_pos, split_depth, &[])
        {
            tr.split(split_pos, split_depth, Vec::new())?;
            split_pos += 2 * split_depth;
        }
        split_pos += parent.child(i).node_size();
    }
    Ok(())
}

fn is_list_of(node: &Node, item: &NodeType) -> bool {
    node.first_child().is_some_and(|child| child.ty() == item)
}

fn item_range(state: &EditorState, item: &NodeType) -> Result<(ResolvedPos, NodeRange), Skip> {
    let (from, to) = state.selection().resolve(state.doc())?;
    let range = from
        .block_range(&to, |node| is_list_of(node, item))
        .ok_or(Skip::Precondition("selection is not inside a list"))?;
    Ok((from, range))
}

/// Moves the selected list items one level out: into the outer list when
/// nested, out of the list entirely otherwise.
pub fn lift_list_item(state: &EditorState, types: &ListTypes) -> Option<Transaction> {
    let attempt = || -> Result<Transaction, Skip> {
        let (_, item) = types.resolve(state.schema())?;
        let (from, range) = item_range(state, &item)?;
        let mut tr = state.tr();
        let nested = range
            .depth()
            .checked_sub(1)
            .is_some_and(|depth| from.node(depth).ty() == &item);
        if nested {
            lift_to_outer_list(&mut tr, &item, range)?;
        } else {
            lift_out_of_list(&mut tr, &range)?;
        }
        Ok(tr)
    };
    finish("lift_list_item", attempt())
}

fn lift_to_outer_list(tr: &mut Transaction, item: &NodeType, range: NodeRange) -> Result<(), Skip> {
    let mut range = range;
    let end = range.end();
    let end_of_list = range.to().end(range.depth());
    if end < end_of_list {
        // Items after the range move into the last lifted item.
        let nested = range.parent().copy(Fragment::empty());
        let shell = item.create_unchecked(None, Fragment::from_node(nested), Vec::new())?;
        tr.step(ReplaceAroundStep::new(
            end - 1,
            end_of_list,
            end,
            end_of_list,
            Slice::new(Fragment::from_node(shell), 1, 0),
            1,
            true,
        ))?;
        range = NodeRange::new(
            tr.doc().resolve(range.from().pos())?,
            tr.doc().resolve(end_of_list)?,
            range.depth(),
        );
    }
    let target = lift_target(&range).ok_or(Skip::Precondition("range cannot be lifted"))?;
    tr.lift(&range, target)?;
    Ok(())
}

fn lift_out_of_list(tr: &mut Transaction, range: &NodeRange) -> Result<(), Skip> {
    let list = range.parent().clone();

    // Merge the selected items into the first one.
    let mut pos = range.end();
    for i in (range.start_index() + 1..range.end_index()).rev() {
        pos -= list.child(i).node_size();
        tr.delete(pos - 1, pos + 1)?;
    }

    let start_pos = tr.doc().resolve(range.start())?;
    let item = start_pos
        .node_after()
        .ok_or(Skip::Precondition("no item at the start of the range"))?;
    let at_start = range.start_index() == 0;
    let at_end = range.end_index() == list.child_count();
    let outer_depth = start_pos
        .depth()
        .checked_sub(1)
        .ok_or(Skip::Precondition("list has no parent"))?;
    let parent = start_pos.node(outer_depth);
    let index_before = start_pos.index(outer_depth);
    let rest = if at_end {
        Fragment::empty()
    } else {
        Fragment::from_node(list.clone())
    };
    ensure(
        parent.can_replace_fragment(
            index_before + usize::from(!at_start),
            index_before + 1,
            &item.content().append(&rest),
        ),
        "item content does not fit outside the list",
    )?;

    // The list is closed on each side that keeps items and dropped on each
    // side that has none.
    let start = start_pos.pos();
    let end = start + item.node_size();
    let shell = |dropped: bool| {
        if dropped {
            Fragment::empty()
        } else {
            Fragment::from_node(list.copy(Fragment::empty()))
        }
    };
    tr.step(ReplaceAroundStep::new(
        start - usize::from(at_start),
        end + usize::from(at_end),
        start + 1,
        end - 1,
        Slice::new(
            shell(at_start).append(&shell(at_end)),
            usize::from(!at_start),
            usize::from(!at_end),
        ),
        usize::from(!at_start),
        false,
    ))?;
    Ok(())
}

/// Nests the selected list items into a list inside the previous item,
/// joining a list that item already ends with.
pub fn sink_list_item(state: &EditorState, types: &ListTypes) -> Option<Transaction> {
    let attempt = || -> Result<Transaction, Skip> {
        let (_, item) = types.resolve(state.schema())?;
        let (_, range) = item_range(state, &item)?;
        let start_index = range.start_index();
        ensure(start_index > 0, "first item cannot be sunk")?;
        let parent = range.parent();
        let node_before = parent.child(start_index - 1);
        ensure(node_before.ty() == &item, "previous sibling is not a list item")?;

        let nested_before = node_before
            .last_child()
            .is_some_and(|last| last.ty() == parent.ty());
        let inner = if nested_before {
            Fragment::from_node(item.create_unchecked(None, Fragment::empty(), Vec::new())?)
        } else {
            Fragment::empty()
        };
        let nested = parent.ty().create_unchecked(None, inner, Vec::new())?;
        let shell = item.create_unchecked(None, Fragment::from_node(nested), Vec::new())?;
        let open = if nested_before { 3 } else { 1 };
        let (before, after) = (range.start(), range.end());
        let mut tr = state.tr();
        tr.step(ReplaceAroundStep::new(
            before - open,
            after,
            before,
            after,
            Slice::new(Fragment::from_node(shell), open, 0),
            1,
            true,
        ))?;
        Ok(tr)
    };
    finish("sink_list_item", attempt())
}

/// Splits the list item around the cursor's block.
///
/// In an empty block that ends the last item of a nested list, the nested
/// entry is moved out instead: a new item after the enclosing item takes its
/// place.
pub fn split_list_item(state: &EditorState, types: &ListTypes) -> Option<Transaction> {
    let attempt = || -> Result<Transaction, Skip> {
        let (_, item) = types.resolve(state.schema())?;
        let (from, to) = state.selection().resolve(state.doc())?;
        let depth = from.depth();
        ensure(
            depth >= 2 && from.same_parent(&to),
            "selection is not inside one block",
        )?;
        ensure(
            from.parent().is_textblock() && from.node(depth - 1).ty() == &item,
            "cursor is not in a list item's block",
        )?;
        if from.parent().content_size() == 0 {
            return split_empty_nested_item(state, &from, &item);
        }

        let next_type = if to.pos() == from.end(depth) {
            from.node(depth - 1).content_match_at(0)?.default_type()
        } else {
            None
        };
        let mut tr = state.tr();
        tr.delete(from.pos(), to.pos())?;
        let types_after = match next_type {
            Some(ty) => vec![None, Some(Wrapper::new(ty))],
            None => Vec::new(),
        };
        ensure(
            can_split(tr.doc(), from.pos(), 2, &types_after),
            "item cannot be split here",
        )?;
        tr.split(from.pos(), 2, types_after)?;
        Ok(tr)
    };
    finish("split_list_item", attempt())
}

fn split_empty_nested_item(
    state: &EditorState,
    from: &ResolvedPos,
    item: &NodeType,
) -> Result<Transaction, Skip> {
    let depth = from.depth();
    ensure(
        depth >= 4 && from.node(depth - 3).ty() == item,
        "empty item is not inside a nested list",
    )?;
    ensure(
        from.index_after(depth - 1) == from.node(depth - 1).child_count(),
        "empty block is not the last in its item",
    )?;
    ensure(
        from.index(depth - 2) + 1 == from.node(depth - 2).child_count(),
        "empty item is not the last in its list",
    )?;

    // How many levels, counted up from the block, keep content before it.
    let keep = if from.index(depth - 1) > 0 {
        1
    } else if from.index(depth - 2) > 0 {
        2
    } else {
        3
    };
    let mut wrap = Fragment::empty();
    for d in (depth - 3..=depth - keep).rev() {
        wrap = Fragment::from_node(from.node(d).copy(wrap));
    }
    wrap = wrap.append(&Fragment::from_node(empty_item(item)?));

    let start = from.before(depth + 1 - keep);
    let end = from.after(depth - 2);
    let mut tr = state.tr();
    tr.replace(start, end, Slice::new(wrap, 4 - keep, 1))?;
    if let Some(selection) = Selection::find_from(tr.doc(), start) {
        tr.set_selection(selection)?;
    }
    Ok(tr)
}

/// A list item holding one empty block of the item's default type.
fn empty_item(item: &NodeType) -> Result<Node, Skip> {
    let block = item
        .content_match()
        .default_type()
        .and_then(|ty| ty.create_and_fill(None, Fragment::empty(), Vec::new()));
    let content = block.map_or_else(Fragment::empty, Fragment::from_node);
    item.create_and_fill(None, content, Vec::new())
        .ok_or(Skip::Precondition("cannot build an empty list item"))
}
