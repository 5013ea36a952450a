use super::{Fragment, ModelError, Node, ResolvedPos};
use std::fmt;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ReplaceError {
    #[error(transparent)]
    Model(#[from] ModelError),
    #[error("inserted content deeper than insertion position")]
    TooDeep,
    #[error("inconsistent open depths")]
    InconsistentOpenDepths,
    #[error("cannot join {sub} onto {main}")]
    CannotJoin { sub: String, main: String },
    #[error("invalid content for node {type_name}: {content}")]
    InvalidContent { type_name: String, content: String },
    #[error("removing non-flat range")]
    NonFlatRange,
}

/// A piece of a document: a fragment plus how many levels of nodes are open
/// (cut through) at its start and end.
#[derive(Clone, Default, PartialEq)]
pub struct Slice {
    content: Fragment,
    open_start: usize,
    open_end: usize,
}

impl Slice {
    pub fn new(content: Fragment, open_start: usize, open_end: usize) -> Self {
        Self {
            content,
            open_start,
            open_end,
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn content(&self) -> &Fragment {
        &self.content
    }

    pub fn open_start(&self) -> usize {
        self.open_start
    }

    pub fn open_end(&self) -> usize {
        self.open_end
    }

    /// Size the slice adds when inserted: content minus the open boundary
    /// tokens.
    pub fn size(&self) -> usize {
        self.content.size() - self.open_start - self.open_end
    }

    /// Inserts `fragment` at `pos` (slice coordinates). `None` when the
    /// enclosing node cannot hold it.
    pub fn insert_at(&self, pos: usize, fragment: &Fragment) -> Option<Slice> {
        let content = insert_into(&self.content, pos + self.open_start, fragment, None)?;
        Some(Slice::new(content, self.open_start, self.open_end))
    }

    pub fn remove_between(&self, from: usize, to: usize) -> Result<Slice, ReplaceError> {
        let content = remove_range(&self.content, from + self.open_start, to + self.open_start)?;
        Ok(Slice::new(content, self.open_start, self.open_end))
    }

    /// A slice of `fragment` open as deep as its first and last children go.
    pub fn max_open(fragment: Fragment, open_isolating: bool) -> Slice {
        let opens = |node: &Node| !node.is_leaf() && (open_isolating || !node.ty().is_isolating());
        let mut open_start = 0;
        let mut cursor = fragment.first_child().cloned();
        while let Some(node) = cursor.filter(opens) {
            open_start += 1;
            cursor = node.first_child().cloned();
        }
        let mut open_end = 0;
        let mut cursor = fragment.last_child().cloned();
        while let Some(node) = cursor.filter(opens) {
            open_end += 1;
            cursor = node.last_child().cloned();
        }
        Slice::new(fragment, open_start, open_end)
    }
}

impl fmt::Debug for Slice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}({},{})", self.content, self.open_start, self.open_end)
    }
}

fn remove_range(content: &Fragment, from: usize, to: usize) -> Result<Fragment, ReplaceError> {
    let (index, offset) = content.find_index(from, -1)?;
    let (index_to, offset_to) = content.find_index(to, -1)?;
    let child = content.maybe_child(index);
    if offset == from || child.is_some_and(Node::is_text) {
        if offset_to != to && !content.child(index_to).is_text() {
            return Err(ReplaceError::NonFlatRange);
        }
        return Ok(content
            .cut(0, from)
            .append(&content.cut(to, content.size())));
    }
    let Some(child) = child else {
        return Err(ReplaceError::NonFlatRange);
    };
    if index != index_to {
        return Err(ReplaceError::NonFlatRange);
    }
    let inner = remove_range(child.content(), from - offset - 1, to - offset - 1)?;
    Ok(content.replace_child(index, child.copy(inner)))
}

fn insert_into(
    content: &Fragment,
    dist: usize,
    insert: &Fragment,
    parent: Option<&Node>,
) -> Option<Fragment> {
    let (index, offset) = content.find_index(dist, -1).ok()?;
    let child = content.maybe_child(index);
    if offset == dist || child.is_some_and(Node::is_text) {
        if let Some(parent) = parent
            && !parent.can_replace_fragment(index, index, insert)
        {
            return None;
        }
        return Some(
            content
                .cut(0, dist)
                .append(insert)
                .append(&content.cut(dist, content.size())),
        );
    }
    let child = child?;
    let inner = insert_into(child.content(), dist - offset - 1, insert, Some(child))?;
    Some(content.replace_child(index, child.copy(inner)))
}

impl Node {
    /// Replaces `from..to` with `slice`, joining the slice's open sides onto
    /// the nodes at the boundaries. Every node whose content changes is
    /// re-checked against its grammar.
    pub fn replace(&self, from: usize, to: usize, slice: &Slice) -> Result<Node, ReplaceError> {
        let rfrom = self.resolve(from)?;
        let rto = self.resolve(to)?;
        if slice.open_start > rfrom.depth() {
            return Err(ReplaceError::TooDeep);
        }
        if rto.depth().checked_sub(slice.open_end) != Some(rfrom.depth() - slice.open_start) {
            return Err(ReplaceError::InconsistentOpenDepths);
        }
        replace_outer(&rfrom, &rto, slice, 0)
    }
}

fn replace_outer(
    rfrom: &ResolvedPos,
    rto: &ResolvedPos,
    slice: &Slice,
    depth: usize,
) -> Result<Node, ReplaceError> {
    let index = rfrom.index(depth);
    let node = rfrom.node(depth);
    if index == rto.index(depth) && depth < rfrom.depth() - slice.open_start {
        let inner = replace_outer(rfrom, rto, slice, depth + 1)?;
        Ok(node.copy(node.content().replace_child(index, inner)))
    } else if slice.content.size() == 0 {
        close(node, replace_two_way(rfrom, rto, depth)?)
    } else if slice.open_start == 0
        && slice.open_end == 0
        && rfrom.depth() == depth
        && rto.depth() == depth
    {
        let parent = rfrom.parent();
        let content = parent.content();
        close(
            parent,
            content
                .cut(0, rfrom.parent_offset())
                .append(&slice.content)
                .append(&content.cut(rto.parent_offset(), content.size())),
        )
    } else {
        let (start, end) = prepare_slice_for_replace(slice, rfrom)?;
        close(node, replace_three_way(rfrom, &start, &end, rto, depth)?)
    }
}

fn check_join(main: &Node, sub: &Node) -> Result<(), ReplaceError> {
    if sub.ty().compatible_content(main.ty()) {
        Ok(())
    } else {
        Err(ReplaceError::CannotJoin {
            sub: sub.ty().name().to_string(),
            main: main.ty().name().to_string(),
        })
    }
}

fn joinable(before: &ResolvedPos, after: &ResolvedPos, depth: usize) -> Result<Node, ReplaceError> {
    let node = before.node(depth);
    check_join(node, after.node(depth))?;
    Ok(node.clone())
}

fn add_node(child: Node, target: &mut Vec<Node>) {
    if let Some(last) = target.last_mut()
        && child.is_text()
        && child.same_markup(last)
    {
        *last = last.with_text(format!(
            "{}{}",
            last.text().unwrap_or_default(),
            child.text().unwrap_or_default()
        ));
    } else {
        target.push(child);
    }
}

fn add_range(
    start: Option<&ResolvedPos>,
    end: Option<&ResolvedPos>,
    depth: usize,
    target: &mut Vec<Node>,
) {
    let Some(node) = end.or(start).map(|rp| rp.node(depth)) else {
        return;
    };
    let mut start_index = 0;
    let end_index = end.map_or(node.child_count(), |rp| rp.index(depth));
    if let Some(start) = start {
        start_index = start.index(depth);
        if start.depth() > depth {
            start_index += 1;
        } else if start.text_offset() > 0 {
            if let Some(after) = start.node_after() {
                add_node(after, target);
            }
            start_index += 1;
        }
    }
    for i in start_index..end_index {
        add_node(node.child(i).clone(), target);
    }
    if let Some(end) = end
        && end.depth() == depth
        && end.text_offset() > 0
        && let Some(before) = end.node_before()
    {
        add_node(before, target);
    }
}

fn close(node: &Node, content: Fragment) -> Result<Node, ReplaceError> {
    if !node.ty().valid_content(&content) {
        return Err(ReplaceError::InvalidContent {
            type_name: node.ty().name().to_string(),
            content: content.to_string(),
        });
    }
    Ok(node.copy(content))
}

fn replace_three_way(
    rfrom: &ResolvedPos,
    rstart: &ResolvedPos,
    rend: &ResolvedPos,
    rto: &ResolvedPos,
    depth: usize,
) -> Result<Fragment, ReplaceError> {
    let open_start = if rfrom.depth() > depth {
        Some(joinable(rfrom, rstart, depth + 1)?)
    } else {
        None
    };
    let open_end = if rto.depth() > depth {
        Some(joinable(rend, rto, depth + 1)?)
    } else {
        None
    };

    let mut content = Vec::new();
    add_range(None, Some(rfrom), depth, &mut content);
    match (&open_start, &open_end) {
        (Some(open_start), Some(open_end)) if rstart.index(depth) == rend.index(depth) => {
            check_join(open_start, open_end)?;
            let inner = replace_three_way(rfrom, rstart, rend, rto, depth + 1)?;
            add_node(close(open_start, inner)?, &mut content);
        }
        _ => {
            if let Some(open_start) = &open_start {
                let inner = replace_two_way(rfrom, rstart, depth + 1)?;
                add_node(close(open_start, inner)?, &mut content);
            }
            add_range(Some(rstart), Some(rend), depth, &mut content);
            if let Some(open_end) = &open_end {
                let inner = replace_two_way(rend, rto, depth + 1)?;
                add_node(close(open_end, inner)?, &mut content);
            }
        }
    }
    add_range(Some(rto), None, depth, &mut content);
    Ok(Fragment::from_raw(content))
}

fn replace_two_way(
    rfrom: &ResolvedPos,
    rto: &ResolvedPos,
    depth: usize,
) -> Result<Fragment, ReplaceError> {
    let mut content = Vec::new();
    add_range(None, Some(rfrom), depth, &mut content);
    if rfrom.depth() > depth {
        let ty = joinable(rfrom, rto, depth + 1)?;
        let inner = replace_two_way(rfrom, rto, depth + 1)?;
        add_node(close(&ty, inner)?, &mut content);
    }
    add_range(Some(rto), None, depth, &mut content);
    Ok(Fragment::from_raw(content))
}

/// Wraps the slice in copies of the ancestors of `along` so its open sides
/// can be resolved like positions in a document.
fn prepare_slice_for_replace(
    slice: &Slice,
    along: &ResolvedPos,
) -> Result<(ResolvedPos, ResolvedPos), ReplaceError> {
    let extra = along.depth() - slice.open_start;
    let mut node = along.node(extra).copy(slice.content.clone());
    for depth in (0..extra).rev() {
        node = along.node(depth).copy(Fragment::from_node(node));
    }
    let start = node.resolve(slice.open_start + extra)?;
    let end = node.resolve(node.content_size() - slice.open_end - extra)?;
    Ok((start, end))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::builders::{doc, li, p, text, ul};

    #[test]
    fn replaces_text_inside_a_block() {
        let d = doc([p("abc")]);
        let slice = Slice::new(Fragment::from_node(text("XY")), 0, 0);
        let out = d.replace(2, 3, &slice).unwrap();
        assert_eq!(out, doc([p("aXYc")]));
    }

    #[test]
    fn deleting_across_blocks_joins_them() {
        let d = doc([p("ab"), p("cd")]);
        let out = d.replace(2, 6, &Slice::empty()).unwrap();
        assert_eq!(out, doc([p("ad")]));
    }

    #[test]
    fn open_slice_splits_a_block() {
        let d = doc([p("ab")]);
        let slice = Slice::new(Fragment::from_nodes(vec![p(""), p("")]), 1, 1);
        let out = d.replace(2, 2, &slice).unwrap();
        assert_eq!(out, doc([p("a"), p("b")]));
    }

    #[test]
    fn rejects_inconsistent_open_depths() {
        let d = doc([p("ab")]);
        let slice = Slice::new(Fragment::from_node(p("x")), 1, 0);
        assert_eq!(
            d.replace(2, 2, &slice),
            Err(ReplaceError::InconsistentOpenDepths)
        );
    }

    #[test]
    fn rejects_grammar_violation() {
        // A paragraph directly inside a bullet list is not allowed.
        let d = doc([ul([li([p("a")])])]);
        let slice = Slice::new(Fragment::from_node(p("x")), 0, 0);
        assert!(matches!(
            d.replace(1, 1, &slice),
            Err(ReplaceError::InvalidContent { .. })
        ));
    }

    #[test]
    fn rejects_incompatible_join() {
        // doc(paragraph("a"), listItem(paragraph("b"))): deleting from inside
        // the paragraph to inside the item would join the two.
        let d = doc([p("a"), li([p("b")])]);
        assert_eq!(
            d.replace(1, 4, &Slice::empty()),
            Err(ReplaceError::CannotJoin {
                sub: "listItem".to_string(),
                main: "paragraph".to_string(),
            })
        );
    }

    #[test]
    fn rejects_positions_at_different_depths() {
        let d = doc([ul([li([p("a")])]), p("b")]);
        assert_eq!(
            d.replace(3, 8, &Slice::empty()),
            Err(ReplaceError::InconsistentOpenDepths)
        );
    }

    #[test]
    fn max_open_follows_first_and_last_children() {
        let slice = Slice::max_open(Fragment::from_node(ul([li([p("a")])])), true);
        assert_eq!((slice.open_start(), slice.open_end()), (3, 3));
        assert_eq!(slice.size(), 1);
    }

    #[test]
    fn remove_between_rejects_non_flat_range() {
        let slice = Slice::new(Fragment::from_nodes(vec![p("ab"), p("cd")]), 0, 0);
        assert_eq!(
            slice.remove_between(2, 6).unwrap_err(),
            ReplaceError::NonFlatRange
        );
        let flat = slice.remove_between(0, 4).unwrap();
        assert_eq!(flat.content(), &Fragment::from_node(p("cd")));
    }
}
