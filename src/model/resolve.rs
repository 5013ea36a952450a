use super::{ModelError, Node};
use std::fmt;

#[derive(Clone)]
struct PathEntry {
    node: Node,
    index: usize,
    offset: usize,
}

/// A position resolved against a document: the chain of ancestors from the
/// root down to the innermost node that contains it.
///
/// Depth 0 is the document itself. Methods taking a `depth` accept
/// `0..=self.depth()`; [`before`](Self::before) and [`after`](Self::after)
/// also accept `self.depth() + 1` and panic on 0, since the document has no
/// position outside itself.
#[derive(Clone)]
pub struct ResolvedPos {
    pos: usize,
    path: Vec<PathEntry>,
    parent_offset: usize,
}

impl ResolvedPos {
    pub(crate) fn resolve(doc: &Node, pos: usize) -> Result<Self, ModelError> {
        if pos > doc.content_size() {
            return Err(ModelError::PositionOutOfRange {
                pos,
                size: doc.content_size(),
            });
        }
        let mut path = Vec::new();
        let mut start = 0;
        let mut parent_offset = pos;
        let mut node = doc.clone();
        loop {
            let (index, offset) = node.content().find_index(parent_offset, -1)?;
            let rem = parent_offset - offset;
            path.push(PathEntry {
                node: node.clone(),
                index,
                offset: start + offset,
            });
            if rem == 0 {
                break;
            }
            let child = node.child(index).clone();
            if child.is_text() {
                break;
            }
            parent_offset = rem - 1;
            start += offset + 1;
            node = child;
        }
        Ok(Self {
            pos,
            path,
            parent_offset,
        })
    }

    pub fn pos(&self) -> usize {
        self.pos
    }

    pub fn depth(&self) -> usize {
        self.path.len() - 1
    }

    /// Offset of the position inside its parent's content.
    pub fn parent_offset(&self) -> usize {
        self.parent_offset
    }

    /// The ancestor at `depth`.
    pub fn node(&self, depth: usize) -> &Node {
        &self.path[depth].node
    }

    pub fn parent(&self) -> &Node {
        self.node(self.depth())
    }

    pub fn doc(&self) -> &Node {
        self.node(0)
    }

    /// Index into the ancestor at `depth` of the child the position is in
    /// (or before).
    pub fn index(&self, depth: usize) -> usize {
        self.path[depth].index
    }

    /// Index pointing after this position in the ancestor at `depth`.
    pub fn index_after(&self, depth: usize) -> usize {
        let index = self.index(depth);
        if depth == self.depth() && self.text_offset() == 0 {
            index
        } else {
            index + 1
        }
    }

    /// Position at the start of the ancestor's content.
    pub fn start(&self, depth: usize) -> usize {
        if depth == 0 {
            0
        } else {
            self.path[depth - 1].offset + 1
        }
    }

    pub fn end(&self, depth: usize) -> usize {
        self.start(depth) + self.node(depth).content_size()
    }

    /// Position directly before the ancestor at `depth`.
    pub fn before(&self, depth: usize) -> usize {
        assert!(depth > 0, "there is no position before the top-level node");
        if depth == self.depth() + 1 {
            self.pos
        } else {
            self.path[depth - 1].offset
        }
    }

    /// Position directly after the ancestor at `depth`.
    pub fn after(&self, depth: usize) -> usize {
        assert!(depth > 0, "there is no position after the top-level node");
        if depth == self.depth() + 1 {
            self.pos
        } else {
            self.path[depth - 1].offset + self.node(depth).node_size()
        }
    }

    /// Offset into a text node when the position points inside one.
    pub fn text_offset(&self) -> usize {
        self.pos - self.path[self.depth()].offset
    }

    pub fn node_after(&self) -> Option<Node> {
        let parent = self.parent();
        let index = self.index(self.depth());
        let child = parent.maybe_child(index)?;
        let offset = self.text_offset();
        if offset > 0 {
            Some(child.cut(offset, child.node_size()))
        } else {
            Some(child.clone())
        }
    }

    pub fn node_before(&self) -> Option<Node> {
        let parent = self.parent();
        let index = self.index(self.depth());
        let offset = self.text_offset();
        if offset > 0 {
            return Some(parent.child(index).cut(0, offset));
        }
        if index == 0 {
            None
        } else {
            Some(parent.child(index - 1).clone())
        }
    }

    /// Position of the child boundary `index` inside the ancestor at `depth`.
    pub fn pos_at_index(&self, index: usize, depth: usize) -> usize {
        let node = self.node(depth);
        let mut pos = self.start(depth);
        for i in 0..index {
            pos += node.child(i).node_size();
        }
        pos
    }

    /// Depth of the deepest ancestor that also contains `pos`.
    pub fn shared_depth(&self, pos: usize) -> usize {
        (1..=self.depth())
            .rev()
            .find(|&depth| self.start(depth) <= pos && self.end(depth) >= pos)
            .unwrap_or(0)
    }

    pub fn same_parent(&self, other: &ResolvedPos) -> bool {
        self.pos - self.parent_offset == other.pos - other.parent_offset
    }

    /// The block range around this position and `other`: the deepest depth
    /// (not counting inline parents) whose node contains both positions and
    /// satisfies `pred`.
    pub fn block_range<F>(&self, other: &ResolvedPos, pred: F) -> Option<NodeRange>
    where
        F: Fn(&Node) -> bool,
    {
        if other.pos < self.pos {
            return other.block_range(self, pred);
        }
        let skip = usize::from(self.parent().inline_content() || self.pos == other.pos);
        let top = self.depth().checked_sub(skip)?;
        (0..=top)
            .rev()
            .find(|&depth| other.pos <= self.end(depth) && pred(self.node(depth)))
            .map(|depth| NodeRange::new(self.clone(), other.clone(), depth))
    }

    pub fn min(&self, other: &ResolvedPos) -> ResolvedPos {
        if other.pos < self.pos { other } else { self }.clone()
    }

    pub fn max(&self, other: &ResolvedPos) -> ResolvedPos {
        if other.pos > self.pos { other } else { self }.clone()
    }
}

impl fmt::Debug for ResolvedPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut path = String::new();
        for depth in 1..=self.depth() {
            if !path.is_empty() {
                path.push('/');
            }
            path.push_str(&format!(
                "{}_{}",
                self.node(depth).ty().name(),
                self.index(depth - 1)
            ));
        }
        write!(f, "{path}:{}", self.parent_offset)
    }
}

/// A range of sibling nodes inside the ancestor at `depth`.
#[derive(Clone, Debug)]
pub struct NodeRange {
    from: ResolvedPos,
    to: ResolvedPos,
    depth: usize,
}

impl NodeRange {
    pub fn new(from: ResolvedPos, to: ResolvedPos, depth: usize) -> Self {
        Self { from, to, depth }
    }

    pub fn from(&self) -> &ResolvedPos {
        &self.from
    }

    pub fn to(&self) -> &ResolvedPos {
        &self.to
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn start(&self) -> usize {
        self.from.before(self.depth + 1)
    }

    pub fn end(&self) -> usize {
        self.to.after(self.depth + 1)
    }

    pub fn parent(&self) -> &Node {
        self.from.node(self.depth)
    }

    pub fn start_index(&self) -> usize {
        self.from.index(self.depth)
    }

    pub fn end_index(&self) -> usize {
        self.to.index_after(self.depth)
    }
}

impl Node {
    /// Resolves `pos` (in `0..=content_size`) against this node.
    pub fn resolve(&self, pos: usize) -> Result<ResolvedPos, ModelError> {
        ResolvedPos::resolve(self, pos)
    }
}

#[cfg(test)]
mod tests {
    use crate::model::builders::{doc, li, p, ul};

    #[test]
    fn resolves_inside_nested_list() {
        // doc(ul(li(p("ab"))))  positions: 0 ul 1 li 2 p 3 a 4 b 5 /p 6 /li 7 /ul 8
        let d = doc([ul([li([p("ab")])])]);
        let rp = d.resolve(4).unwrap();
        assert_eq!(rp.depth(), 3);
        assert_eq!(rp.parent().ty().name(), "paragraph");
        assert_eq!(rp.parent_offset(), 1);
        assert_eq!(rp.start(3), 3);
        assert_eq!(rp.end(3), 5);
        assert_eq!(rp.before(3), 2);
        assert_eq!(rp.after(3), 6);
        assert_eq!(rp.before(1), 0);
        assert_eq!(rp.after(1), 8);
        assert_eq!(rp.text_offset(), 1);
        assert_eq!(rp.node_before().unwrap().text(), Some("a"));
        assert_eq!(rp.node_after().unwrap().text(), Some("b"));
    }

    #[test]
    fn resolves_between_blocks() {
        let d = doc([p("a"), p("b")]);
        let rp = d.resolve(3).unwrap();
        assert_eq!(rp.depth(), 0);
        assert_eq!(rp.index(0), 1);
        assert_eq!(rp.index_after(0), 1);
        assert_eq!(rp.node_before().unwrap().text_content(), "a");
        assert_eq!(rp.node_after().unwrap().text_content(), "b");
        assert_eq!(rp.pos_at_index(1, 0), 3);
        assert_eq!(rp.pos_at_index(2, 0), 6);
    }

    #[test]
    fn rejects_out_of_range() {
        let d = doc([p("a")]);
        assert!(d.resolve(3).is_ok());
        assert!(d.resolve(4).is_err());
    }

    #[test]
    fn block_range_finds_list_item_siblings() {
        let d = doc([ul([li([p("a")]), li([p("b")])])]);
        let from = d.resolve(3).unwrap();
        let to = d.resolve(8).unwrap();
        let range = from
            .block_range(&to, |node| {
                node.first_child()
                    .is_some_and(|child| child.ty().name() == "listItem")
            })
            .unwrap();
        assert_eq!(range.depth(), 1);
        assert_eq!(range.start(), 1);
        assert_eq!(range.end(), 11);
        assert_eq!(range.start_index(), 0);
        assert_eq!(range.end_index(), 2);
    }

    #[test]
    fn block_range_of_cursor_is_parent_block() {
        let d = doc([p("a")]);
        let rp = d.resolve(1).unwrap();
        let range = rp.block_range(&rp, |_| true).unwrap();
        assert_eq!(range.depth(), 0);
        assert_eq!((range.start(), range.end()), (0, 3));
    }

    #[test]
    fn shared_depth_and_same_parent() {
        let d = doc([ul([li([p("a"), p("b")])])]);
        let a = d.resolve(3).unwrap();
        let b = d.resolve(6).unwrap();
        assert_eq!(a.shared_depth(6), 2);
        assert!(!a.same_parent(&b));
        assert!(a.same_parent(&d.resolve(4).unwrap()));
    }
}
