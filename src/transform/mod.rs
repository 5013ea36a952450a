//! Steps and the transform that accumulates them.
//!
//! - [`Step`] - replace, replace-around, split and lift steps
//! - [`StepMap`] and [`Mapping`] - position maps produced by steps
//! - [`can_split`], [`lift_target`], [`find_wrapping`] - structural queries
//! - [`Transform`] - an append-only step log over a document

use crate::model::{Fragment, Node, NodeRange, Slice};
use tracing::trace;

mod map;
mod replace_step;
mod step;
mod structure;

pub use map::{Bias, MapResult, Mapping, StepMap};
pub use replace_step::{ReplaceAroundStep, ReplaceStep};
pub use step::{Step, StepError};
pub use structure::{LiftStep, SplitStep, Wrapper, can_split, find_wrapping, lift_target};

/// How much validation runs after each step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckMode {
    /// Only the checks the replace algorithm makes on every node it closes.
    Local,
    /// Additionally runs [`Node::check`] on the whole document.
    Full,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformConfig {
    pub check: CheckMode,
}

impl TransformConfig {
    pub fn local() -> Self {
        Self {
            check: CheckMode::Local,
        }
    }

    pub fn full() -> Self {
        Self {
            check: CheckMode::Full,
        }
    }
}

impl Default for TransformConfig {
    fn default() -> Self {
        Self::full()
    }
}

/// A document plus the steps applied to it so far.
///
/// Steps either apply completely or leave the transform untouched.
#[derive(Debug, Clone)]
pub struct Transform {
    docs: Vec<Node>,
    steps: Vec<Step>,
    mapping: Mapping,
    doc: Node,
    config: TransformConfig,
}

impl Transform {
    pub fn new(doc: Node) -> Self {
        Self::with_config(doc, TransformConfig::default())
    }

    pub fn with_config(doc: Node, config: TransformConfig) -> Self {
        Self {
            docs: Vec::new(),
            steps: Vec::new(),
            mapping: Mapping::new(),
            doc,
            config,
        }
    }

    /// The current document.
    pub fn doc(&self) -> &Node {
        &self.doc
    }

    /// The document before any step.
    pub fn before(&self) -> &Node {
        self.docs.first().unwrap_or(&self.doc)
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// The document each step was applied to, parallel to [`steps`](Self::steps).
    pub fn docs(&self) -> &[Node] {
        &self.docs
    }

    pub fn mapping(&self) -> &Mapping {
        &self.mapping
    }

    pub fn doc_changed(&self) -> bool {
        !self.steps.is_empty()
    }

    pub fn config(&self) -> &TransformConfig {
        &self.config
    }

    /// Applies `step`, recording it on success.
    pub fn step(&mut self, step: impl Into<Step>) -> Result<&mut Self, StepError> {
        let step = step.into();
        let doc = step.apply(&self.doc)?;
        if self.config.check == CheckMode::Full {
            doc.check().map_err(StepError::Invalid)?;
        }
        trace!(
            step = step.name(),
            index = self.steps.len(),
            size = doc.content_size(),
            "step applied"
        );
        self.mapping.append_map(step.get_map());
        self.docs.push(std::mem::replace(&mut self.doc, doc));
        self.steps.push(step);
        Ok(self)
    }

    pub fn replace(&mut self, from: usize, to: usize, slice: Slice) -> Result<&mut Self, StepError> {
        if from == to && slice.size() == 0 {
            return Ok(self);
        }
        self.step(ReplaceStep::new(from, to, slice))
    }

    pub fn delete(&mut self, from: usize, to: usize) -> Result<&mut Self, StepError> {
        self.replace(from, to, Slice::empty())
    }

    pub fn insert(&mut self, pos: usize, content: Fragment) -> Result<&mut Self, StepError> {
        self.replace(pos, pos, Slice::new(content, 0, 0))
    }

    pub fn split(
        &mut self,
        pos: usize,
        depth: usize,
        types_after: Vec<Option<Wrapper>>,
    ) -> Result<&mut Self, StepError> {
        self.step(SplitStep::new(pos, depth, types_after))
    }

    /// Lifts the range to `target` depth (see [`lift_target`]).
    pub fn lift(&mut self, range: &NodeRange, target: usize) -> Result<&mut Self, StepError> {
        self.step(LiftStep::new(range, target))
    }

    /// Wraps the range in the given wrappers, outermost first (see
    /// [`find_wrapping`]).
    pub fn wrap(&mut self, range: &NodeRange, wrappers: &[Wrapper]) -> Result<&mut Self, StepError> {
        let mut content = Fragment::empty();
        for wrapper in wrappers.iter().rev() {
            let node = wrapper
                .ty
                .create_unchecked(wrapper.attrs.as_ref(), content, Vec::new())?;
            content = Fragment::from_node(node);
        }
        let (start, end) = (range.start(), range.end());
        self.step(ReplaceAroundStep::new(
            start,
            end,
            start,
            end,
            Slice::new(content, 0, 0),
            wrappers.len(),
            true,
        ))
    }
}
