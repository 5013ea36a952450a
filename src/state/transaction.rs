use super::Selection;
use crate::model::{Fragment, ModelError, Node, NodeRange, Slice};
use crate::transform::{Mapping, Step, StepError, Transform, TransformConfig, Wrapper};
use tracing::trace;

/// A [`Transform`] that also tracks the selection through every step.
#[derive(Debug, Clone)]
pub struct Transaction {
    transform: Transform,
    selection: Selection,
    selection_set: bool,
}

impl Transaction {
    pub(crate) fn new(doc: Node, selection: Selection, config: TransformConfig) -> Self {
        Self {
            transform: Transform::with_config(doc, config),
            selection,
            selection_set: false,
        }
    }

    pub fn doc(&self) -> &Node {
        self.transform.doc()
    }

    /// The document the transaction started from.
    pub fn before(&self) -> &Node {
        self.transform.before()
    }

    pub fn selection(&self) -> Selection {
        self.selection
    }

    /// Whether the selection was set explicitly rather than only mapped.
    pub fn selection_set(&self) -> bool {
        self.selection_set
    }

    pub fn steps(&self) -> &[Step] {
        self.transform.steps()
    }

    pub fn mapping(&self) -> &Mapping {
        self.transform.mapping()
    }

    pub fn doc_changed(&self) -> bool {
        self.transform.doc_changed()
    }

    pub fn transform(&self) -> &Transform {
        &self.transform
    }

    pub fn set_selection(&mut self, selection: Selection) -> Result<&mut Self, ModelError> {
        selection.resolve(self.doc())?;
        trace!(anchor = selection.anchor, head = selection.head, "selection set");
        self.selection = selection;
        self.selection_set = true;
        Ok(self)
    }

    /// Runs `f` on the transform and maps the selection through whatever
    /// steps it added.
    fn track<F>(&mut self, f: F) -> Result<&mut Self, StepError>
    where
        F: FnOnce(&mut Transform) -> Result<&mut Transform, StepError>,
    {
        let start = self.transform.steps().len();
        f(&mut self.transform)?;
        let end = self.transform.steps().len();
        if end > start {
            let mapping = self.transform.mapping().slice(start, end);
            self.selection = self.selection.map(self.transform.doc(), &mapping)?;
        }
        Ok(self)
    }

    pub fn step(&mut self, step: impl Into<Step>) -> Result<&mut Self, StepError> {
        self.track(|tr| tr.step(step))
    }

    pub fn replace(&mut self, from: usize, to: usize, slice: Slice) -> Result<&mut Self, StepError> {
        self.track(|tr| tr.replace(from, to, slice))
    }

    pub fn delete(&mut self, from: usize, to: usize) -> Result<&mut Self, StepError> {
        self.track(|tr| tr.delete(from, to))
    }

    pub fn insert(&mut self, pos: usize, content: Fragment) -> Result<&mut Self, StepError> {
        self.track(|tr| tr.insert(pos, content))
    }

    pub fn split(
        &mut self,
        pos: usize,
        depth: usize,
        types_after: Vec<Option<Wrapper>>,
    ) -> Result<&mut Self, StepError> {
        self.track(|tr| tr.split(pos, depth, types_after))
    }

    pub fn lift(&mut self, range: &NodeRange, target: usize) -> Result<&mut Self, StepError> {
        self.track(|tr| tr.lift(range, target))
    }

    pub fn wrap(&mut self, range: &NodeRange, wrappers: &[Wrapper]) -> Result<&mut Self, StepError> {
        self.track(|tr| tr.wrap(range, wrappers))
    }

    /// Replaces the selection with `slice`.
    pub fn replace_selection(&mut self, slice: Slice) -> Result<&mut Self, StepError> {
        let (from, to) = (self.selection.from(), self.selection.to());
        self.replace(from, to, slice)
    }
}
