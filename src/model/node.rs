use super::fragment::char_slice;
use super::{Attrs, ContentMatch, Fragment, Mark, ModelError, NodeType, Slice};
use std::fmt;
use std::sync::Arc;

struct NodeData {
    ty: NodeType,
    attrs: Attrs,
    content: Fragment,
    marks: Vec<Mark>,
    text: Option<String>,
    size: usize,
}

/// An immutable document node.
///
/// Cloning a `Node` clones a reference; edits build new nodes that share the
/// untouched children of the old ones.
#[derive(Clone)]
pub struct Node(Arc<NodeData>);

impl Node {
    pub(crate) fn new(ty: NodeType, attrs: Attrs, content: Fragment, marks: Vec<Mark>) -> Self {
        let size = if ty.is_leaf() { 1 } else { content.size() + 2 };
        Self(Arc::new(NodeData {
            ty,
            attrs,
            content,
            marks: Mark::set_from(&marks),
            text: None,
            size,
        }))
    }

    pub(crate) fn new_text(ty: NodeType, text: String, marks: Vec<Mark>) -> Result<Self, ModelError> {
        if text.is_empty() || !ty.is_text() {
            return Err(ModelError::InvalidText);
        }
        Ok(Self(Arc::new(NodeData {
            size: text.chars().count(),
            ty,
            attrs: Attrs::new(),
            content: Fragment::empty(),
            marks: Mark::set_from(&marks),
            text: Some(text),
        })))
    }

    pub fn ty(&self) -> &NodeType {
        &self.0.ty
    }

    pub fn attrs(&self) -> &Attrs {
        &self.0.attrs
    }

    pub fn content(&self) -> &Fragment {
        &self.0.content
    }

    pub fn marks(&self) -> &[Mark] {
        &self.0.marks
    }

    pub fn text(&self) -> Option<&str> {
        self.0.text.as_deref()
    }

    /// Size in position units: text length, 1 for other leaves, content
    /// size plus the two boundary tokens for containers.
    pub fn node_size(&self) -> usize {
        self.0.size
    }

    pub fn content_size(&self) -> usize {
        self.0.content.size()
    }

    pub fn child_count(&self) -> usize {
        self.0.content.child_count()
    }

    pub fn child(&self, index: usize) -> &Node {
        self.0.content.child(index)
    }

    pub fn maybe_child(&self, index: usize) -> Option<&Node> {
        self.0.content.maybe_child(index)
    }

    pub fn first_child(&self) -> Option<&Node> {
        self.0.content.first_child()
    }

    pub fn last_child(&self) -> Option<&Node> {
        self.0.content.last_child()
    }

    pub fn is_text(&self) -> bool {
        self.0.text.is_some()
    }

    pub fn is_leaf(&self) -> bool {
        self.0.ty.is_leaf()
    }

    pub fn is_atom(&self) -> bool {
        self.0.ty.is_atom()
    }

    pub fn is_block(&self) -> bool {
        self.0.ty.is_block()
    }

    pub fn is_inline(&self) -> bool {
        self.0.ty.is_inline()
    }

    pub fn is_textblock(&self) -> bool {
        self.0.ty.is_textblock()
    }

    pub fn inline_content(&self) -> bool {
        self.0.ty.inline_content()
    }

    /// True when both values are the same allocation, i.e. the same snapshot.
    pub fn ptr_eq(&self, other: &Node) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    pub fn same_markup(&self, other: &Node) -> bool {
        self.has_markup(other.ty(), other.attrs(), other.marks())
    }

    pub fn has_markup(&self, ty: &NodeType, attrs: &Attrs, marks: &[Mark]) -> bool {
        self.ty() == ty && self.attrs() == attrs && Mark::same_set(self.marks(), marks)
    }

    /// A node with the same markup and different content.
    pub fn copy(&self, content: Fragment) -> Node {
        Self(Arc::new(NodeData {
            ty: self.0.ty.clone(),
            attrs: self.0.attrs.clone(),
            size: if self.is_leaf() { 1 } else { content.size() + 2 },
            content,
            marks: self.0.marks.clone(),
            text: None,
        }))
    }

    pub fn mark(&self, marks: Vec<Mark>) -> Node {
        let marks = Mark::set_from(&marks);
        if Mark::same_set(&marks, self.marks()) {
            return self.clone();
        }
        Self(Arc::new(NodeData {
            ty: self.0.ty.clone(),
            attrs: self.0.attrs.clone(),
            content: self.0.content.clone(),
            marks,
            text: self.0.text.clone(),
            size: self.0.size,
        }))
    }

    /// A text node with the same markup and new (non-empty) text.
    pub(crate) fn with_text(&self, text: String) -> Node {
        debug_assert!(!text.is_empty(), "text nodes cannot be empty");
        Self(Arc::new(NodeData {
            ty: self.0.ty.clone(),
            attrs: self.0.attrs.clone(),
            content: Fragment::empty(),
            marks: self.0.marks.clone(),
            size: text.chars().count(),
            text: Some(text),
        }))
    }

    /// The part of this node between two content offsets (char offsets for
    /// text nodes).
    pub fn cut(&self, from: usize, to: usize) -> Node {
        if let Some(text) = self.text() {
            if from == 0 && to >= self.node_size() {
                return self.clone();
            }
            return self.with_text(char_slice(text, from, to).to_string());
        }
        if from == 0 && to == self.content_size() {
            return self.clone();
        }
        self.copy(self.content().cut(from, to))
    }

    /// The content between two positions as a slice, open as deep as the
    /// positions are inside their shared ancestor.
    pub fn slice(&self, from: usize, to: usize, include_parents: bool) -> Result<Slice, ModelError> {
        if from == to {
            return Ok(Slice::empty());
        }
        let rfrom = self.resolve(from)?;
        let rto = self.resolve(to)?;
        let depth = if include_parents { 0 } else { rfrom.shared_depth(to) };
        let start = rfrom.start(depth);
        let node = rfrom.node(depth);
        let content = node.content().cut(rfrom.pos() - start, rto.pos() - start);
        Ok(Slice::new(content, rfrom.depth() - depth, rto.depth() - depth))
    }

    /// The node directly after `pos`, if any.
    pub fn node_at(&self, pos: usize) -> Option<Node> {
        let mut node = self.clone();
        let mut pos = pos;
        loop {
            let (index, offset) = node.content().find_index(pos, -1).ok()?;
            let child = node.maybe_child(index)?.clone();
            if offset == pos || child.is_text() {
                return Some(child);
            }
            pos -= offset + 1;
            node = child;
        }
    }

    pub fn nodes_between<F>(&self, from: usize, to: usize, f: &mut F)
    where
        F: FnMut(&Node, usize, Option<&Node>, usize) -> bool,
    {
        self.content().nodes_between(from, to, f, 0, Some(self));
    }

    pub fn descendants<F>(&self, f: &mut F)
    where
        F: FnMut(&Node, usize, Option<&Node>, usize) -> bool,
    {
        self.nodes_between(0, self.content_size(), f);
    }

    pub fn text_content(&self) -> String {
        match self.text() {
            Some(text) => text.to_string(),
            None => self.text_between(0, self.content_size(), None),
        }
    }

    pub fn text_between(&self, from: usize, to: usize, block_separator: Option<&str>) -> String {
        self.content().text_between(from, to, block_separator)
    }

    /// The automaton state after the first `index` children.
    pub fn content_match_at(&self, index: usize) -> Result<ContentMatch, ModelError> {
        self.ty()
            .content_match()
            .match_fragment_range(self.content(), 0, index)
            .ok_or_else(|| self.invalid_content())
    }

    /// Whether replacing children `[from, to)` with `replacement[start..end]`
    /// leaves valid content.
    pub fn can_replace(
        &self,
        from: usize,
        to: usize,
        replacement: &Fragment,
        start: usize,
        end: usize,
    ) -> bool {
        let Ok(at) = self.content_match_at(from) else {
            return false;
        };
        let Some(one) = at.match_fragment_range(replacement, start, end) else {
            return false;
        };
        let Some(two) = one.match_fragment_range(self.content(), to, self.child_count()) else {
            return false;
        };
        two.valid_end()
            && (start..end).all(|i| self.ty().allows_marks(replacement.child(i).marks()))
    }

    /// [`can_replace`](Self::can_replace) for a whole fragment.
    pub fn can_replace_fragment(&self, from: usize, to: usize, replacement: &Fragment) -> bool {
        self.can_replace(from, to, replacement, 0, replacement.child_count())
    }

    /// Whether children `[from, to)` can be replaced by one node of `ty`.
    pub fn can_replace_with(&self, from: usize, to: usize, ty: &NodeType) -> bool {
        let Ok(at) = self.content_match_at(from) else {
            return false;
        };
        at.match_type(ty)
            .and_then(|start| start.match_fragment_range(self.content(), to, self.child_count()))
            .is_some_and(|end| end.valid_end())
    }

    pub fn can_append(&self, other: &Node) -> bool {
        if other.content_size() > 0 {
            self.can_replace(
                self.child_count(),
                self.child_count(),
                other.content(),
                0,
                other.child_count(),
            )
        } else {
            self.ty().compatible_content(other.ty())
        }
    }

    /// Deep validity check of grammar and marks.
    pub fn check(&self) -> Result<(), ModelError> {
        if !self.ty().valid_content(self.content()) {
            return Err(self.invalid_content());
        }
        if !Mark::same_set(&Mark::set_from(self.marks()), self.marks()) {
            return Err(ModelError::InvalidMarks(self.ty().name().to_string()));
        }
        for child in self.content() {
            child.check()?;
        }
        Ok(())
    }

    fn invalid_content(&self) -> ModelError {
        ModelError::InvalidContent {
            type_name: self.ty().name().to_string(),
            content: self.content().to_string(),
        }
    }
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
            || (self.same_markup(other)
                && self.text() == other.text()
                && self.content() == other.content())
    }
}

impl Eq for Node {}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut body = match self.text() {
            Some(text) => format!("{text:?}"),
            None if self.is_leaf() => self.ty().name().to_string(),
            None => format!("{}({})", self.ty().name(), self.content()),
        };
        for mark in self.marks().iter().rev() {
            body = format!("{}({body})", mark.ty().name());
        }
        f.write_str(&body)
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self}")
    }
}
