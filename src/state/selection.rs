use crate::model::{ModelError, Node, ResolvedPos};
use crate::transform::{Bias, Mapping};
use serde::{Deserialize, Serialize};

/// A text selection. `anchor` is the fixed end, `head` the end that moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename = "text")]
pub struct Selection {
    pub anchor: usize,
    pub head: usize,
}

impl Selection {
    pub fn new(anchor: usize, head: usize) -> Self {
        Self { anchor, head }
    }

    pub fn cursor(pos: usize) -> Self {
        Self::new(pos, pos)
    }

    pub fn from(&self) -> usize {
        self.anchor.min(self.head)
    }

    pub fn to(&self) -> usize {
        self.anchor.max(self.head)
    }

    pub fn is_empty(&self) -> bool {
        self.anchor == self.head
    }

    /// Resolves `(from, to)` against `doc`.
    pub fn resolve(&self, doc: &Node) -> Result<(ResolvedPos, ResolvedPos), ModelError> {
        Ok((doc.resolve(self.from())?, doc.resolve(self.to())?))
    }

    /// Maps both ends through `mapping` into `doc` (the mapped document).
    /// When the head no longer lands in inline content the selection moves
    /// to the nearest textblock.
    pub fn map(&self, doc: &Node, mapping: &Mapping) -> Result<Selection, ModelError> {
        let head = doc.resolve(mapping.map(self.head, Bias::After))?;
        if !head.parent().inline_content() {
            return Ok(Selection::near(&head, 1));
        }
        let anchor = doc.resolve(mapping.map(self.anchor, Bias::After))?;
        let anchor = if anchor.parent().inline_content() {
            anchor.pos()
        } else {
            head.pos()
        };
        Ok(Selection::new(anchor, head.pos()))
    }

    /// A cursor in the textblock nearest to `pos`, searching in direction
    /// `dir` (1 forward, -1 backward) first. Falls back to `pos` itself
    /// when the document has no textblock.
    pub fn near(pos: &ResolvedPos, dir: i32) -> Selection {
        let dir = if dir < 0 { -1 } else { 1 };
        let doc = pos.doc();
        let index = pos.index(pos.depth());
        find_cursor_in(pos.parent(), pos.pos(), index, dir)
            .or_else(|| find_cursor_in(pos.parent(), pos.pos(), index, -dir))
            .or_else(|| find_cursor_in(doc, 0, 0, 1))
            .map_or_else(|| Selection::cursor(pos.pos()), Selection::cursor)
    }

    /// A cursor at `pos` when it is inside a textblock, otherwise at the
    /// start of the first textblock after it.
    pub fn find_from(doc: &Node, pos: usize) -> Option<Selection> {
        let rpos = doc.resolve(pos).ok()?;
        if rpos.parent().inline_content() {
            return Some(Selection::cursor(pos));
        }
        let mut found = None;
        doc.nodes_between(pos, doc.content_size(), &mut |node, start, _, _| {
            if found.is_some() {
                return false;
            }
            if node.is_textblock() && start >= pos {
                found = Some(start + 1);
                return false;
            }
            true
        });
        found.map(Selection::cursor)
    }
}

fn find_cursor_in(node: &Node, pos: usize, index: usize, dir: isize) -> Option<usize> {
    if node.inline_content() {
        return Some(pos);
    }
    let mut pos = pos as isize;
    let mut i = index as isize - if dir > 0 { 0 } else { 1 };
    while i >= 0 && (i as usize) < node.child_count() {
        let child = node.child(i as usize);
        if !child.is_atom() && !child.is_leaf() {
            let inner_index = if dir < 0 { child.child_count() } else { 0 };
            if let Some(found) = find_cursor_in(child, (pos + dir) as usize, inner_index, dir) {
                return Some(found);
            }
        }
        pos += child.node_size() as isize * dir;
        i += dir;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::builders::{doc, li, p, ul};
    use crate::transform::StepMap;

    #[test]
    fn from_and_to_are_ordered() {
        let sel = Selection::new(7, 3);
        assert_eq!((sel.from(), sel.to()), (3, 7));
        assert!(!sel.is_empty());
    }

    #[test]
    fn map_follows_insertions() {
        let d = doc([p("xab")]);
        let mut mapping = Mapping::new();
        mapping.append_map(StepMap::new(vec![(1, 0, 1)]));
        let sel = Selection::cursor(2).map(&d, &mapping).unwrap();
        assert_eq!(sel, Selection::cursor(3));
    }

    #[test]
    fn near_finds_textblock_inside_list() {
        let d = doc([ul([li([p("a")])])]);
        let pos = d.resolve(0).unwrap();
        assert_eq!(Selection::near(&pos, 1), Selection::cursor(3));
        let end = d.resolve(7).unwrap();
        assert_eq!(Selection::near(&end, 1), Selection::cursor(4));
    }

    #[test]
    fn find_from_skips_to_next_textblock() {
        let d = doc([ul([li([p("a")])]), p("b")]);
        assert_eq!(Selection::find_from(&d, 2), Some(Selection::cursor(3)));
        assert_eq!(Selection::find_from(&d, 4), Some(Selection::cursor(4)));
        assert_eq!(Selection::find_from(&d, 6), Some(Selection::cursor(8)));
        assert_eq!(Selection::find_from(&d, 10), None);
    }

    #[test]
    fn serializes_with_type_tag() {
        let json = serde_json::to_value(Selection::new(1, 2)).unwrap();
        assert_eq!(json, serde_json::json!({"type": "text", "anchor": 1, "head": 2}));
        let back: Selection = serde_json::from_value(json).unwrap();
        assert_eq!(back, Selection::new(1, 2));
    }
}
