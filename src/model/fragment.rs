use super::{ModelError, Node};
use std::fmt;

/// An ordered run of sibling nodes with its cached size.
///
/// Fragments are values: every operation returns a new fragment and the
/// children that did not change are shared with the original.
#[derive(Clone, Default, PartialEq)]
pub struct Fragment {
    content: Vec<Node>,
    size: usize,
}

impl Fragment {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_node(node: Node) -> Self {
        Self {
            size: node.node_size(),
            content: vec![node],
        }
    }

    /// Builds a fragment, joining adjacent text nodes that carry the same marks.
    pub fn from_nodes(nodes: Vec<Node>) -> Self {
        let mut joined: Vec<Node> = Vec::with_capacity(nodes.len());
        let mut size = 0;
        for node in nodes {
            size += node.node_size();
            if let Some(last) = joined.last_mut()
                && node.is_text()
                && last.is_text()
                && node.same_markup(last)
            {
                *last = last.with_text(format!(
                    "{}{}",
                    last.text().unwrap_or_default(),
                    node.text().unwrap_or_default()
                ));
                continue;
            }
            joined.push(node);
        }
        Self {
            content: joined,
            size,
        }
    }

    /// Builds a fragment without joining text nodes; the caller guarantees
    /// the nodes are already normalized.
    pub(crate) fn from_raw(nodes: Vec<Node>) -> Self {
        let size = nodes.iter().map(Node::node_size).sum();
        Self {
            content: nodes,
            size,
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn child_count(&self) -> usize {
        self.content.len()
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }

    /// Panics when `index` is out of range, like slice indexing.
    pub fn child(&self, index: usize) -> &Node {
        &self.content[index]
    }

    pub fn maybe_child(&self, index: usize) -> Option<&Node> {
        self.content.get(index)
    }

    pub fn first_child(&self) -> Option<&Node> {
        self.content.first()
    }

    pub fn last_child(&self) -> Option<&Node> {
        self.content.last()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Node> {
        self.content.iter()
    }

    pub fn append(&self, other: &Fragment) -> Fragment {
        if other.is_empty() {
            return self.clone();
        }
        if self.is_empty() {
            return other.clone();
        }
        let mut content = self.content.clone();
        let mut rest = other.content.iter();
        if let (Some(last), Some(first)) = (content.last_mut(), other.first_child())
            && last.is_text()
            && first.is_text()
            && last.same_markup(first)
        {
            *last = last.with_text(format!(
                "{}{}",
                last.text().unwrap_or_default(),
                first.text().unwrap_or_default()
            ));
            rest.next();
        }
        content.extend(rest.cloned());
        Fragment {
            content,
            size: self.size + other.size,
        }
    }

    pub fn add_to_start(&self, node: Node) -> Fragment {
        Fragment::from_node(node).append(self)
    }

    pub fn add_to_end(&self, node: Node) -> Fragment {
        self.append(&Fragment::from_node(node))
    }

    pub fn replace_child(&self, index: usize, node: Node) -> Fragment {
        let current = &self.content[index];
        if current.ptr_eq(&node) {
            return self.clone();
        }
        let size = self.size + node.node_size() - current.node_size();
        let mut content = self.content.clone();
        content[index] = node;
        Fragment { content, size }
    }

    /// The part of this fragment between two content offsets, cutting into
    /// the children that straddle the boundaries.
    pub fn cut(&self, from: usize, to: usize) -> Fragment {
        if from == 0 && to == self.size {
            return self.clone();
        }
        let mut result = Vec::new();
        let mut size = 0;
        if to > from {
            let mut pos = 0;
            for child in &self.content {
                if pos >= to {
                    break;
                }
                let end = pos + child.node_size();
                if end > from {
                    let child = if pos < from || end > to {
                        if child.is_text() {
                            child.cut(from.saturating_sub(pos), (to - pos).min(child.node_size()))
                        } else {
                            child.cut(
                                from.saturating_sub(pos + 1),
                                (to - pos - 1).min(child.content().size()),
                            )
                        }
                    } else {
                        child.clone()
                    };
                    size += child.node_size();
                    result.push(child);
                }
                pos = end;
            }
        }
        Fragment {
            content: result,
            size,
        }
    }

    pub fn cut_by_index(&self, from: usize, to: usize) -> Fragment {
        if from == to {
            return Fragment::empty();
        }
        if from == 0 && to == self.content.len() {
            return self.clone();
        }
        Fragment::from_raw(self.content[from..to].to_vec())
    }

    /// Index of the child at content offset `pos` and that child's start
    /// offset. With `round > 0`, a position at the end of a child rounds to
    /// the next index.
    pub fn find_index(&self, pos: usize, round: i32) -> Result<(usize, usize), ModelError> {
        if pos == 0 {
            return Ok((0, 0));
        }
        if pos == self.size {
            return Ok((self.content.len(), pos));
        }
        if pos > self.size {
            return Err(ModelError::PositionOutOfRange {
                pos,
                size: self.size,
            });
        }
        let mut cur = 0;
        for (index, child) in self.content.iter().enumerate() {
            let end = cur + child.node_size();
            if end >= pos {
                if end == pos || round > 0 {
                    return Ok((index + 1, end));
                }
                return Ok((index, cur));
            }
            cur = end;
        }
        Err(ModelError::PositionOutOfRange {
            pos,
            size: self.size,
        })
    }

    /// Calls `f(node, pos, parent, index)` for every node overlapping
    /// `[from, to)`, descending into a node when `f` returns true.
    pub fn nodes_between<F>(
        &self,
        from: usize,
        to: usize,
        f: &mut F,
        node_start: usize,
        parent: Option<&Node>,
    ) where
        F: FnMut(&Node, usize, Option<&Node>, usize) -> bool,
    {
        let mut pos = 0;
        for (index, child) in self.content.iter().enumerate() {
            if pos >= to {
                break;
            }
            let end = pos + child.node_size();
            if end > from
                && f(child, node_start + pos, parent, index)
                && child.content().size() > 0
            {
                let start = pos + 1;
                child.content().nodes_between(
                    from.saturating_sub(start),
                    child.content().size().min(to - start),
                    f,
                    node_start + start,
                    Some(child),
                );
            }
            pos = end;
        }
    }

    pub fn text_between(&self, from: usize, to: usize, block_separator: Option<&str>) -> String {
        let mut text = String::new();
        let mut first = true;
        self.nodes_between(
            from,
            to,
            &mut |node: &Node, pos: usize, _: Option<&Node>, _: usize| {
                let node_text = match node.text() {
                    Some(body) => char_slice(body, from.max(pos) - pos, to - pos).to_string(),
                    None => String::new(),
                };
                if node.is_block() && node.is_textblock() {
                    if let Some(separator) = block_separator {
                        if first {
                            first = false;
                        } else {
                            text.push_str(separator);
                        }
                    }
                }
                text.push_str(&node_text);
                true
            },
            0,
            None,
        );
        text
    }
}

/// Slice of `text` between two char offsets (clamped to its length).
pub(crate) fn char_slice(text: &str, from: usize, to: usize) -> &str {
    let byte_at = |offset: usize| {
        text.char_indices()
            .nth(offset)
            .map(|(byte, _)| byte)
            .unwrap_or(text.len())
    };
    let start = byte_at(from);
    let end = byte_at(to).max(start);
    &text[start..end]
}

impl<'a> IntoIterator for &'a Fragment {
    type Item = &'a Node;
    type IntoIter = std::slice::Iter<'a, Node>;

    fn into_iter(self) -> Self::IntoIter {
        self.content.iter()
    }
}

impl From<Node> for Fragment {
    fn from(node: Node) -> Self {
        Fragment::from_node(node)
    }
}

impl From<Vec<Node>> for Fragment {
    fn from(nodes: Vec<Node>) -> Self {
        Fragment::from_nodes(nodes)
    }
}

impl fmt::Display for Fragment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, child) in self.content.iter().enumerate() {
            if index > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{child}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for Fragment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{self}>")
    }
}
