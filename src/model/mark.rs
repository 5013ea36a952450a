use super::{Attrs, MarkType};
use std::fmt;

/// An inline annotation attached to text (or other inline) nodes.
#[derive(Clone, PartialEq)]
pub struct Mark {
    ty: MarkType,
    attrs: Attrs,
}

impl Mark {
    pub(crate) fn new(ty: MarkType, attrs: Attrs) -> Self {
        Self { ty, attrs }
    }

    pub fn ty(&self) -> &MarkType {
        &self.ty
    }

    pub fn attrs(&self) -> &Attrs {
        &self.attrs
    }

    /// Adds this mark to a sorted set, replacing any mark of the same type.
    pub fn add_to_set(&self, set: &[Mark]) -> Vec<Mark> {
        if self.is_in_set(set) {
            return set.to_vec();
        }
        let mut result: Vec<Mark> = set.iter().filter(|m| m.ty != self.ty).cloned().collect();
        let at = result
            .iter()
            .position(|m| m.ty.rank() > self.ty.rank())
            .unwrap_or(result.len());
        result.insert(at, self.clone());
        result
    }

    pub fn remove_from_set(&self, set: &[Mark]) -> Vec<Mark> {
        set.iter().filter(|m| *m != self).cloned().collect()
    }

    pub fn is_in_set(&self, set: &[Mark]) -> bool {
        set.contains(self)
    }

    pub fn same_set(a: &[Mark], b: &[Mark]) -> bool {
        a == b
    }

    /// Normalizes an arbitrary list of marks into a sorted set.
    pub fn set_from(marks: &[Mark]) -> Vec<Mark> {
        marks
            .iter()
            .fold(Vec::new(), |set, mark| mark.add_to_set(&set))
    }
}

impl fmt::Debug for Mark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.attrs.is_empty() {
            write!(f, "{}", self.ty.name())
        } else {
            write!(f, "{}{:?}", self.ty.name(), self.attrs)
        }
    }
}
