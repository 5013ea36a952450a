//! Editor state: a document snapshot with its selection, and the
//! transactions that move it forward.

use crate::model::{ModelError, Node, Schema};
use crate::transform::TransformConfig;
use tracing::debug;

mod selection;
mod transaction;

pub use selection::Selection;
pub use transaction::Transaction;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StateError {
    #[error("transaction was not built from this state's document")]
    StaleTransaction,
    #[error(transparent)]
    Position(#[from] ModelError),
}

/// An immutable `(doc, selection)` snapshot.
#[derive(Debug, Clone)]
pub struct EditorState {
    doc: Node,
    selection: Selection,
    config: TransformConfig,
}

impl EditorState {
    /// Fails when the selection does not fit in `doc`.
    pub fn new(doc: Node, selection: Selection) -> Result<Self, StateError> {
        Self::with_config(doc, selection, TransformConfig::default())
    }

    pub fn with_config(
        doc: Node,
        selection: Selection,
        config: TransformConfig,
    ) -> Result<Self, StateError> {
        selection.resolve(&doc)?;
        Ok(Self {
            doc,
            selection,
            config,
        })
    }

    pub fn doc(&self) -> &Node {
        &self.doc
    }

    pub fn selection(&self) -> Selection {
        self.selection
    }

    pub fn schema(&self) -> &Schema {
        self.doc.ty().schema()
    }

    /// Starts a transaction on this snapshot.
    pub fn tr(&self) -> Transaction {
        Transaction::new(self.doc.clone(), self.selection, self.config.clone())
    }

    /// The state after `tr`. The transaction must start from this state's
    /// document.
    pub fn apply(&self, tr: &Transaction) -> Result<EditorState, StateError> {
        if !tr.before().ptr_eq(&self.doc) {
            debug!(steps = tr.steps().len(), "rejected stale transaction");
            return Err(StateError::StaleTransaction);
        }
        Ok(EditorState {
            doc: tr.doc().clone(),
            selection: tr.selection(),
            config: self.config.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::builders::{doc, p};

    #[test]
    fn apply_adopts_doc_and_mapped_selection() {
        let state = EditorState::new(doc([p("ab")]), Selection::cursor(3)).unwrap();
        let mut tr = state.tr();
        tr.delete(1, 2).unwrap();
        let next = state.apply(&tr).unwrap();
        assert_eq!(next.doc(), &doc([p("b")]));
        assert_eq!(next.selection(), Selection::cursor(2));
    }

    #[test]
    fn stale_transaction_is_rejected() {
        let state = EditorState::new(doc([p("ab")]), Selection::cursor(1)).unwrap();
        let mut tr = state.tr();
        tr.delete(1, 2).unwrap();
        let next = state.apply(&tr).unwrap();
        assert_eq!(next.apply(&tr).unwrap_err(), StateError::StaleTransaction);
    }

    #[test]
    fn selection_must_fit_document() {
        let err = EditorState::new(doc([p("a")]), Selection::cursor(9)).unwrap_err();
        assert!(matches!(err, StateError::Position(_)));
    }
}
