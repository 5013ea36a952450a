//! A naive, flat document model for differential testing.
//!
//! A document is flattened into one token per position unit: an open and a
//! close token for every container node, one token per character, one per
//! leaf. Steps are applied by splicing token vectors, with none of the tree
//! surgery the engine performs, so the engine's result can be compared with
//! the splice.
use outline_edit::{Attrs, Fragment, Node, ReplaceAroundStep, Slice, SplitStep, Step};
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Open { ty: String, attrs: Attrs },
    Close,
    Char { ch: char, marks: Vec<String> },
    Leaf { ty: String, marks: Vec<String> },
}

fn mark_names(node: &Node) -> Vec<String> {
    node.marks()
        .iter()
        .map(|mark| mark.ty().name().to_string())
        .collect()
}

fn push_node(node: &Node, out: &mut Vec<Token>) {
    if let Some(text) = node.text() {
        let marks = mark_names(node);
        out.extend(text.chars().map(|ch| Token::Char {
            ch,
            marks: marks.clone(),
        }));
    } else if node.is_leaf() {
        out.push(Token::Leaf {
            ty: node.ty().name().to_string(),
            marks: mark_names(node),
        });
    } else {
        out.push(Token::Open {
            ty: node.ty().name().to_string(),
            attrs: node.attrs().clone(),
        });
        push_fragment(node.content(), out);
        out.push(Token::Close);
    }
}

fn push_fragment(fragment: &Fragment, out: &mut Vec<Token>) {
    for child in fragment.iter() {
        push_node(child, out);
    }
}

/// The tokens of `doc`'s content. Token `i` sits between positions `i` and
/// `i + 1`.
pub fn flatten(doc: &Node) -> Vec<Token> {
    flatten_fragment(doc.content())
}

pub fn flatten_fragment(fragment: &Fragment) -> Vec<Token> {
    let mut out = Vec::new();
    push_fragment(fragment, &mut out);
    out
}

/// The slice's tokens without the open tokens of its open start and the
/// close tokens of its open end.
pub fn slice_tokens(slice: &Slice) -> Option<Vec<Token>> {
    let tokens = flatten_fragment(slice.content());
    let (open_start, open_end) = (slice.open_start(), slice.open_end());
    if open_start + open_end > tokens.len() {
        return None;
    }
    let end = tokens.len() - open_end;
    let opens_ok = tokens[..open_start]
        .iter()
        .all(|t| matches!(t, Token::Open { .. }));
    let closes_ok = tokens[end..].iter().all(|t| matches!(t, Token::Close));
    (opens_ok && closes_ok).then(|| tokens[open_start..end].to_vec())
}

/// `tokens[..from] ++ insert ++ tokens[to..]`.
pub fn splice(tokens: &[Token], from: usize, to: usize, insert: &[Token]) -> Option<Vec<Token>> {
    if from > to || to > tokens.len() {
        return None;
    }
    let mut out = Vec::with_capacity(tokens.len() - (to - from) + insert.len());
    out.extend_from_slice(&tokens[..from]);
    out.extend_from_slice(insert);
    out.extend_from_slice(&tokens[to..]);
    Some(out)
}

fn around_tokens(tokens: &[Token], step: &ReplaceAroundStep) -> Option<Vec<Token>> {
    if step.gap_to > tokens.len() || step.gap_from > step.gap_to {
        return None;
    }
    let slice = slice_tokens(&step.slice)?;
    splice(&slice, step.insert, step.insert, &tokens[step.gap_from..step.gap_to])
}

fn split_tokens(tokens: &[Token], step: &SplitStep) -> Option<Vec<Token>> {
    if step.pos > tokens.len() {
        return None;
    }
    let mut stack: Vec<&Token> = Vec::new();
    for token in &tokens[..step.pos] {
        match token {
            Token::Open { .. } => stack.push(token),
            Token::Close => {
                stack.pop()?;
            }
            _ => {}
        }
    }
    let enclosing = &stack[stack.len().checked_sub(step.depth)?..];
    let mut inserted = vec![Token::Close; step.depth];
    for (level, open) in enclosing.iter().enumerate() {
        let token = match step.types_after.get(level).cloned().flatten() {
            Some(wrapper) => Token::Open {
                ty: wrapper.ty.name().to_string(),
                attrs: wrapper.ty.compute_attrs(wrapper.attrs.as_ref()).ok()?,
            },
            None => (*open).clone(),
        };
        inserted.push(token);
    }
    splice(tokens, step.pos, step.pos, &inserted)
}

/// The token stream after `step`, or `None` when the step does not fit.
pub fn apply_step(tokens: &[Token], step: &Step) -> Option<Vec<Token>> {
    match step {
        Step::Replace(step) => splice(tokens, step.from, step.to, &slice_tokens(&step.slice)?),
        Step::ReplaceAround(step) => {
            let inserted = around_tokens(tokens, step)?;
            splice(tokens, step.from, step.to, &inserted)
        }
        Step::Split(step) => split_tokens(tokens, step),
        Step::Lift(step) => {
            let inserted = around_tokens(tokens, &step.around)?;
            splice(tokens, step.around.from, step.around.to, &inserted)
        }
    }
}

/// Where a position strictly outside the changed ranges of `step` ends up.
/// `None` for positions inside or on the edge of a changed range.
pub fn map_outside(step: &Step, pos: usize) -> Option<usize> {
    let around = |step: &ReplaceAroundStep| -> Option<usize> {
        let slice = slice_tokens(&step.slice)?.len();
        let gap = step.gap_to - step.gap_from;
        if pos < step.from {
            Some(pos)
        } else if pos > step.gap_from && pos < step.gap_to {
            Some(step.from + step.insert + (pos - step.gap_from))
        } else if pos > step.to {
            Some(pos + slice + gap - (step.to - step.from))
        } else {
            None
        }
    };
    match step {
        Step::Replace(step) => {
            let inserted = slice_tokens(&step.slice)?.len();
            if pos < step.from {
                Some(pos)
            } else if pos > step.to {
                Some(pos + inserted - (step.to - step.from))
            } else {
                None
            }
        }
        Step::ReplaceAround(step) => around(step),
        Step::Lift(step) => around(&step.around),
        Step::Split(step) => match pos.cmp(&step.pos) {
            std::cmp::Ordering::Less => Some(pos),
            std::cmp::Ordering::Greater => Some(pos + 2 * step.depth),
            std::cmp::Ordering::Equal => None,
        },
    }
}

/// A node rebuilt from tokens.
#[derive(Debug, Clone, PartialEq)]
pub enum Tree {
    Node { ty: String, children: Vec<Tree> },
    Text { text: String, marks: Vec<String> },
    Leaf { ty: String, marks: Vec<String> },
}

/// Rebuilds the node sequence a token stream describes. `None` when opens
/// and closes do not nest.
pub fn rebuild(tokens: &[Token]) -> Option<Vec<Tree>> {
    let mut stack: Vec<(String, Vec<Tree>)> = vec![(String::new(), Vec::new())];
    for token in tokens {
        match token {
            Token::Open { ty, .. } => stack.push((ty.clone(), Vec::new())),
            Token::Close => {
                let (ty, children) = stack.pop()?;
                stack.last_mut()?.1.push(Tree::Node { ty, children });
            }
            Token::Char { ch, marks } => {
                let children = &mut stack.last_mut()?.1;
                if let Some(Tree::Text { text, marks: run }) = children.last_mut()
                    && *run == *marks
                {
                    text.push(*ch);
                } else {
                    children.push(Tree::Text {
                        text: ch.to_string(),
                        marks: marks.clone(),
                    });
                }
            }
            Token::Leaf { ty, marks } => stack.last_mut()?.1.push(Tree::Leaf {
                ty: ty.clone(),
                marks: marks.clone(),
            }),
        }
    }
    let (_, top) = stack.pop()?;
    stack.is_empty().then_some(top)
}

fn wrap_marks(body: String, marks: &[String]) -> String {
    marks
        .iter()
        .rev()
        .fold(body, |body, mark| format!("{mark}({body})"))
}

/// Same outline notation as the engine's `Display` for nodes.
impl fmt::Display for Tree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tree::Node { ty, children } => {
                write!(f, "{ty}(")?;
                for (index, child) in children.iter().enumerate() {
                    if index > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{child}")?;
                }
                f.write_str(")")
            }
            Tree::Text { text, marks } => f.write_str(&wrap_marks(format!("{text:?}"), marks)),
            Tree::Leaf { ty, marks } => f.write_str(&wrap_marks(ty.clone(), marks)),
        }
    }
}
