//! Structural queries (where can a range be lifted, wrapped or split) and
//! the split and lift steps built on them.

use super::StepError;
use super::map::StepMap;
use super::replace_step::{ReplaceAroundStep, ReplaceStep};
use crate::model::{Attrs, Fragment, Node, NodeRange, NodeType, Slice};

/// A node type plus attributes, used for wrappers and split overrides.
#[derive(Debug, Clone, PartialEq)]
pub struct Wrapper {
    pub ty: NodeType,
    pub attrs: Option<Attrs>,
}

impl Wrapper {
    pub fn new(ty: NodeType) -> Self {
        Self { ty, attrs: None }
    }

    pub fn with_attrs(ty: NodeType, attrs: Attrs) -> Self {
        Self {
            ty,
            attrs: Some(attrs),
        }
    }

    fn create(&self, content: Fragment) -> Result<Node, StepError> {
        Ok(self
            .ty
            .create_unchecked(self.attrs.as_ref(), content, Vec::new())?)
    }
}

fn can_cut(node: &Node, start: usize, end: usize) -> bool {
    (start == 0 || node.can_replace_fragment(start, node.child_count(), &Fragment::empty()))
        && (end == node.child_count() || node.can_replace_fragment(0, end, &Fragment::empty()))
}

/// The depth the range can be lifted to, if any: the nearest ancestor depth
/// below `range.depth()` that accepts the range's nodes in place of its own
/// children, without crossing an isolating node.
pub fn lift_target(range: &NodeRange) -> Option<usize> {
    let content = range
        .parent()
        .content()
        .cut_by_index(range.start_index(), range.end_index());
    let mut depth = range.depth();
    loop {
        let node = range.from().node(depth);
        let index = range.from().index(depth);
        let end_index = range.to().index_after(depth);
        if depth < range.depth() && node.can_replace_fragment(index, end_index, &content) {
            return Some(depth);
        }
        if depth == 0 || node.ty().is_isolating() || !can_cut(node, index, end_index) {
            return None;
        }
        depth -= 1;
    }
}

/// The wrappers needed to put the range inside a node of `ty`: first the
/// nodes around it, then `ty`, then the nodes between it and the range's
/// content. `inner_range` is the range whose content must fit (defaults to
/// `range`).
pub fn find_wrapping(
    range: &NodeRange,
    ty: &NodeType,
    attrs: Option<Attrs>,
    inner_range: Option<&NodeRange>,
) -> Option<Vec<Wrapper>> {
    let around = find_wrapping_outside(range, ty)?;
    let inner = find_wrapping_inside(inner_range.unwrap_or(range), ty)?;
    let mut wrappers: Vec<Wrapper> = around.into_iter().map(Wrapper::new).collect();
    wrappers.push(Wrapper {
        ty: ty.clone(),
        attrs,
    });
    wrappers.extend(inner.into_iter().map(Wrapper::new));
    Some(wrappers)
}

fn find_wrapping_outside(range: &NodeRange, ty: &NodeType) -> Option<Vec<NodeType>> {
    let parent = range.parent();
    let around = parent
        .content_match_at(range.start_index())
        .ok()?
        .find_wrapping(ty)?;
    let outer = around.first().unwrap_or(ty);
    parent
        .can_replace_with(range.start_index(), range.end_index(), outer)
        .then_some(around)
}

fn find_wrapping_inside(range: &NodeRange, ty: &NodeType) -> Option<Vec<NodeType>> {
    let parent = range.parent();
    let inner = parent.maybe_child(range.start_index())?;
    let inside = ty.content_match().find_wrapping(inner.ty())?;
    let last = inside.last().unwrap_or(ty);
    let mut matched = Some(last.content_match());
    for i in range.start_index()..range.end_index() {
        matched = matched.and_then(|m| m.match_type(parent.child(i).ty()));
    }
    matched.filter(|m| m.valid_end()).map(|_| inside)
}

/// Whether splitting at `pos` through `depth` levels yields valid nodes.
/// `types_after[i]` overrides the type of the new node at split level `i`
/// (0 is the outermost).
pub fn can_split(doc: &Node, pos: usize, depth: usize, types_after: &[Option<Wrapper>]) -> bool {
    if depth == 0 {
        return false;
    }
    let Ok(rpos) = doc.resolve(pos) else {
        return false;
    };
    let Some(base) = rpos.depth().checked_sub(depth) else {
        return false;
    };
    let parent = rpos.parent();
    let index = rpos.index(rpos.depth());
    let inner_type = types_after
        .last()
        .cloned()
        .flatten()
        .map_or_else(|| parent.ty().clone(), |w| w.ty);
    if parent.ty().is_isolating()
        || !parent.can_replace_fragment(index, parent.child_count(), &Fragment::empty())
        || !inner_type.valid_content(&parent.content().cut_by_index(index, parent.child_count()))
    {
        return false;
    }
    let override_at = |i: isize| -> Option<Wrapper> {
        usize::try_from(i)
            .ok()
            .and_then(|i| types_after.get(i).cloned().flatten())
    };
    let mut i = depth as isize - 2;
    for d in (base + 1..rpos.depth()).rev() {
        let node = rpos.node(d);
        let index = rpos.index(d);
        if node.ty().is_isolating() {
            return false;
        }
        let mut rest = node.content().cut_by_index(index, node.child_count());
        if let Some(child) = override_at(i + 1) {
            let Ok(replacement) = child.create(Fragment::empty()) else {
                return false;
            };
            if rest.is_empty() {
                return false;
            }
            rest = rest.replace_child(0, replacement);
        }
        let after = override_at(i).map_or_else(|| node.ty().clone(), |w| w.ty);
        if !node.can_replace_fragment(index + 1, node.child_count(), &Fragment::empty())
            || !after.valid_content(&rest)
        {
            return false;
        }
        i -= 1;
    }
    let index = rpos.index_after(base);
    let base_type = override_at(0).map_or_else(|| rpos.node(base + 1).ty().clone(), |w| w.ty);
    rpos.node(base).can_replace_with(index, index, &base_type)
}

/// Splits the nodes around `pos`, `depth` levels deep.
#[derive(Debug, Clone, PartialEq)]
pub struct SplitStep {
    pub pos: usize,
    pub depth: usize,
    pub types_after: Vec<Option<Wrapper>>,
}

impl SplitStep {
    pub fn new(pos: usize, depth: usize, types_after: Vec<Option<Wrapper>>) -> Self {
        Self {
            pos,
            depth,
            types_after,
        }
    }

    /// The structural replace this split performs on `doc`.
    pub fn to_replace(&self, doc: &Node) -> Result<ReplaceStep, StepError> {
        let rpos = doc.resolve(self.pos)?;
        let base = rpos
            .depth()
            .checked_sub(self.depth)
            .ok_or(StepError::CannotSplit)?;
        let mut before = Fragment::empty();
        let mut after = Fragment::empty();
        for (i, d) in (base + 1..=rpos.depth()).rev().enumerate() {
            let level = self.depth - 1 - i;
            before = Fragment::from_node(rpos.node(d).copy(before));
            let node = match self.types_after.get(level).cloned().flatten() {
                Some(wrapper) => wrapper.create(after)?,
                None => rpos.node(d).copy(after),
            };
            after = Fragment::from_node(node);
        }
        Ok(ReplaceStep::structural(
            self.pos,
            self.pos,
            Slice::new(before.append(&after), self.depth, self.depth),
        ))
    }

    pub fn apply(&self, doc: &Node) -> Result<Node, StepError> {
        if !can_split(doc, self.pos, self.depth, &self.types_after) {
            return Err(StepError::CannotSplit);
        }
        self.to_replace(doc)?.apply(doc)
    }

    pub fn get_map(&self) -> StepMap {
        StepMap::new(vec![(self.pos, 0, 2 * self.depth)])
    }

    /// Deleting the inserted boundary tokens joins the halves again.
    pub fn invert(&self) -> ReplaceStep {
        ReplaceStep::new(self.pos, self.pos + 2 * self.depth, Slice::empty())
    }
}

/// Moves a range of siblings out of their enclosing nodes up to `target`
/// depth, splitting the enclosing nodes where content remains on either side.
#[derive(Debug, Clone, PartialEq)]
pub struct LiftStep {
    pub range_from: usize,
    pub range_to: usize,
    pub depth: usize,
    pub target: usize,
    pub around: ReplaceAroundStep,
}

impl LiftStep {
    pub fn new(range: &NodeRange, target: usize) -> Self {
        let (from, to, depth) = (range.from(), range.to(), range.depth());
        let gap_start = from.before(depth + 1);
        let gap_end = to.after(depth + 1);

        let mut start = gap_start;
        let mut before = Fragment::empty();
        let mut open_start = 0;
        let mut splitting = false;
        for d in (target + 1..=depth).rev() {
            if splitting || from.index(d) > 0 {
                splitting = true;
                before = Fragment::from_node(from.node(d).copy(before));
                open_start += 1;
            } else {
                start -= 1;
            }
        }

        let mut end = gap_end;
        let mut after = Fragment::empty();
        let mut open_end = 0;
        let mut splitting = false;
        for d in (target + 1..=depth).rev() {
            if splitting || to.after(d + 1) < to.end(d) {
                splitting = true;
                after = Fragment::from_node(to.node(d).copy(after));
                open_end += 1;
            } else {
                end += 1;
            }
        }

        let insert = before.size() - open_start;
        let around = ReplaceAroundStep::new(
            start,
            end,
            gap_start,
            gap_end,
            Slice::new(before.append(&after), open_start, open_end),
            insert,
            true,
        );
        Self {
            range_from: from.pos(),
            range_to: to.pos(),
            depth,
            target,
            around,
        }
    }

    pub fn apply(&self, doc: &Node) -> Result<Node, StepError> {
        self.around.apply(doc)
    }

    pub fn get_map(&self) -> StepMap {
        self.around.get_map()
    }

    pub fn invert(&self, doc: &Node) -> Result<ReplaceAroundStep, StepError> {
        self.around.invert(doc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::builders::{doc, li, p, schema, ul};

    fn item_range(d: &Node, from: usize, to: usize) -> NodeRange {
        let rfrom = d.resolve(from).unwrap();
        let rto = d.resolve(to).unwrap();
        rfrom.block_range(&rto, |_| true).unwrap()
    }

    #[test]
    fn lift_target_skips_the_list_level() {
        // A paragraph cannot be a direct child of a bullet list.
        let d = doc([ul([li([p("a")])])]);
        let range = item_range(&d, 3, 3);
        assert_eq!(range.depth(), 2);
        assert_eq!(lift_target(&range), Some(0));
    }

    #[test]
    fn lift_moves_item_content_out_of_list() {
        let d = doc([ul([li([p("a")])])]);
        let range = item_range(&d, 3, 3);
        let step = LiftStep::new(&range, 0);
        let after = step.apply(&d).unwrap();
        assert_eq!(after, doc([p("a")]));
        let undo = step.invert(&d).unwrap();
        assert_eq!(undo.apply(&after).unwrap(), d);
    }

    #[test]
    fn lift_splits_surrounding_list() {
        let d = doc([ul([li([p("a")]), li([p("b")]), li([p("c")])])]);
        // Range over the middle item's paragraph.
        let range = item_range(&d, 8, 8);
        let target = lift_target(&range).unwrap();
        let after = LiftStep::new(&range, target).apply(&d).unwrap();
        assert_eq!(
            after,
            doc([ul([li([p("a")])]), p("b"), ul([li([p("c")])])])
        );
    }

    #[test]
    fn find_wrapping_for_bullet_list_adds_item() {
        let d = doc([p("a")]);
        let range = item_range(&d, 1, 1);
        let list = schema().node_type("bulletList").unwrap();
        let wrappers = find_wrapping(&range, &list, None, None).unwrap();
        let names: Vec<&str> = wrappers.iter().map(|w| w.ty.name()).collect();
        assert_eq!(names, ["bulletList", "listItem"]);
    }

    #[test]
    fn split_paragraph_and_item() {
        let d = doc([ul([li([p("ab")])])]);
        assert!(can_split(&d, 4, 2, &[]));
        let step = SplitStep::new(4, 2, Vec::new());
        let after = step.apply(&d).unwrap();
        assert_eq!(after, doc([ul([li([p("a")]), li([p("b")])])]));
        assert_eq!(step.get_map().map(5, Default::default()), 9);
        assert_eq!(step.invert().apply(&after).unwrap(), d);
    }

    #[test]
    fn split_cannot_leave_the_document() {
        let d = doc([p("ab")]);
        assert!(!can_split(&d, 2, 2, &[]));
        assert_eq!(
            SplitStep::new(2, 2, Vec::new()).apply(&d),
            Err(StepError::CannotSplit)
        );
    }

    #[test]
    fn split_through_zero_levels_is_rejected() {
        let d = doc([p("ab")]);
        assert!(!can_split(&d, 2, 0, &[]));
        assert_eq!(
            SplitStep::new(2, 0, Vec::new()).apply(&d),
            Err(StepError::CannotSplit)
        );
    }
}
