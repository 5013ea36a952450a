use super::StepError;
use super::map::StepMap;
use crate::model::{Node, Slice};

/// Replaces `from..to` with a slice.
///
/// With `structure` set the step may only move boundary tokens; applying it
/// over a range that holds real content fails.
#[derive(Debug, Clone, PartialEq)]
pub struct ReplaceStep {
    pub from: usize,
    pub to: usize,
    pub slice: Slice,
    pub structure: bool,
}

impl ReplaceStep {
    pub fn new(from: usize, to: usize, slice: Slice) -> Self {
        Self {
            from,
            to,
            slice,
            structure: false,
        }
    }

    pub fn structural(from: usize, to: usize, slice: Slice) -> Self {
        Self {
            structure: true,
            ..Self::new(from, to, slice)
        }
    }

    pub fn apply(&self, doc: &Node) -> Result<Node, StepError> {
        if self.from > self.to {
            return Err(StepError::Unordered);
        }
        if self.structure && content_between(doc, self.from, self.to)? {
            return Err(StepError::StructureOverwrite);
        }
        Ok(doc.replace(self.from, self.to, &self.slice)?)
    }

    pub fn get_map(&self) -> StepMap {
        StepMap::new(vec![(self.from, self.to - self.from, self.slice.size())])
    }

    pub fn invert(&self, doc: &Node) -> Result<ReplaceStep, StepError> {
        Ok(ReplaceStep::new(
            self.from,
            self.from + self.slice.size(),
            doc.slice(self.from, self.to, false)?,
        ))
    }
}

/// Replaces `from..to` with a slice while keeping `gap_from..gap_to`, which
/// is re-inserted into the slice at offset `insert`.
///
/// This is how content gets wrapped or unwrapped without being copied: the
/// boundary tokens around the gap change and the gap itself is preserved.
#[derive(Debug, Clone, PartialEq)]
pub struct ReplaceAroundStep {
    pub from: usize,
    pub to: usize,
    pub gap_from: usize,
    pub gap_to: usize,
    pub slice: Slice,
    pub insert: usize,
    pub structure: bool,
}

impl ReplaceAroundStep {
    pub fn new(
        from: usize,
        to: usize,
        gap_from: usize,
        gap_to: usize,
        slice: Slice,
        insert: usize,
        structure: bool,
    ) -> Self {
        Self {
            from,
            to,
            gap_from,
            gap_to,
            slice,
            insert,
            structure,
        }
    }

    pub fn apply(&self, doc: &Node) -> Result<Node, StepError> {
        if !(self.from <= self.gap_from && self.gap_from <= self.gap_to && self.gap_to <= self.to)
            || self.insert > self.slice.size()
        {
            return Err(StepError::Unordered);
        }
        if self.structure
            && (content_between(doc, self.from, self.gap_from)?
                || content_between(doc, self.gap_to, self.to)?)
        {
            return Err(StepError::StructureOverwrite);
        }
        let gap = doc.slice(self.gap_from, self.gap_to, false)?;
        if gap.open_start() > 0 || gap.open_end() > 0 {
            return Err(StepError::GapNotFlat);
        }
        let inserted = self
            .slice
            .insert_at(self.insert, gap.content())
            .ok_or(StepError::GapDoesNotFit)?;
        Ok(doc.replace(self.from, self.to, &inserted)?)
    }

    pub fn get_map(&self) -> StepMap {
        StepMap::new(vec![
            (self.from, self.gap_from - self.from, self.insert),
            (
                self.gap_to,
                self.to - self.gap_to,
                self.slice.size() - self.insert,
            ),
        ])
    }

    pub fn invert(&self, doc: &Node) -> Result<ReplaceAroundStep, StepError> {
        let gap = self.gap_to - self.gap_from;
        let removed = doc
            .slice(self.from, self.to, false)?
            .remove_between(self.gap_from - self.from, self.gap_to - self.from)?;
        Ok(ReplaceAroundStep::new(
            self.from,
            self.from + self.slice.size() + gap,
            self.from + self.insert,
            self.from + self.insert + gap,
            removed,
            self.gap_from - self.from,
            self.structure,
        ))
    }
}

/// Whether `from..to` holds anything besides closing and opening tokens.
fn content_between(doc: &Node, from: usize, to: usize) -> Result<bool, StepError> {
    let rfrom = doc.resolve(from)?;
    let mut dist = to.saturating_sub(from);
    let mut depth = rfrom.depth();
    while dist > 0 && depth > 0 && rfrom.index_after(depth) == rfrom.node(depth).child_count() {
        depth -= 1;
        dist -= 1;
    }
    if dist > 0 {
        let mut next = rfrom
            .node(depth)
            .maybe_child(rfrom.index_after(depth))
            .cloned();
        while dist > 0 {
            match next {
                Some(node) if !node.is_leaf() => {
                    next = node.first_child().cloned();
                    dist -= 1;
                }
                _ => return Ok(true),
            }
        }
    }
    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::builders::{doc, li, p, ul};
    use crate::model::Fragment;

    #[test]
    fn replace_step_inverts_to_original() {
        let d = doc([p("ab"), p("cd")]);
        let step = ReplaceStep::new(2, 6, Slice::empty());
        let after = step.apply(&d).unwrap();
        assert_eq!(after, doc([p("ad")]));
        let undo = step.invert(&d).unwrap();
        assert_eq!(undo.apply(&after).unwrap(), d);
    }

    #[test]
    fn structure_replace_refuses_to_drop_content() {
        let d = doc([p("ab"), p("cd")]);
        let step = ReplaceStep::structural(2, 6, Slice::empty());
        assert_eq!(step.apply(&d), Err(StepError::StructureOverwrite));
        // Joining at the boundary only removes tokens.
        let join = ReplaceStep::structural(3, 5, Slice::empty());
        assert_eq!(join.apply(&d).unwrap(), doc([p("abcd")]));
    }

    #[test]
    fn around_step_wraps_gap_in_list() {
        let d = doc([p("a")]);
        let wrapper = Fragment::from_node(ul([li([])]));
        let step = ReplaceAroundStep::new(0, 3, 0, 3, Slice::new(wrapper, 0, 0), 2, true);
        let after = step.apply(&d).unwrap();
        assert_eq!(after, doc([ul([li([p("a")])])]));
        assert_eq!(step.get_map().map(1, Default::default()), 3);
        let undo = step.invert(&d).unwrap();
        assert_eq!(undo.apply(&after).unwrap(), d);
    }

    #[test]
    fn around_step_rejects_open_gap() {
        let d = doc([p("ab")]);
        let step = ReplaceAroundStep::new(0, 4, 2, 4, Slice::empty(), 0, false);
        assert_eq!(step.apply(&d), Err(StepError::GapNotFlat));
    }

    #[test]
    fn steps_with_unordered_positions_are_rejected() {
        let d = doc([p("ab")]);
        let around = ReplaceAroundStep::new(2, 4, 0, 4, Slice::empty(), 0, false);
        assert_eq!(around.apply(&d), Err(StepError::Unordered));
        let replace = ReplaceStep::new(3, 1, Slice::empty());
        assert_eq!(replace.apply(&d), Err(StepError::Unordered));
    }
}
