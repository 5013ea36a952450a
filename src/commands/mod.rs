//! Editing commands over an [`EditorState`].
//!
//! A command is a pure function of the state: it returns the transaction to
//! apply, or `None` when it does not apply here. Nothing is ever partially
//! applied; the reason a command declined is logged at `debug` level.
//!
//! - [`wrap_in_list`], [`lift_list_item`], [`sink_list_item`],
//!   [`split_list_item`] - the structural list commands
//! - [`insert_text`], [`insert_tab`], [`start_bullet_list`] - text input

use crate::model::{ModelError, NodeType, Schema};
use crate::state::{EditorState, Transaction};
use crate::transform::StepError;
use serde::{Deserialize, Serialize};
use tracing::debug;

mod lists;
mod text;

pub use lists::{lift_list_item, sink_list_item, split_list_item, wrap_in_list};
pub use text::{insert_tab, insert_text, start_bullet_list};

/// Names of the list container and list item node types the list commands
/// work with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListTypes {
    pub list: String,
    pub item: String,
}

impl ListTypes {
    pub fn new(list: impl Into<String>, item: impl Into<String>) -> Self {
        Self {
            list: list.into(),
            item: item.into(),
        }
    }

    /// `bulletList` / `listItem`.
    pub fn bullet() -> Self {
        Self::new("bulletList", "listItem")
    }

    /// Looks both names up in `schema`, returning `(list, item)`.
    pub fn resolve(&self, schema: &Schema) -> Result<(NodeType, NodeType), ModelError> {
        let lookup = |name: &str| {
            schema
                .node_type(name)
                .ok_or_else(|| ModelError::UnknownNodeType(name.to_string()))
        };
        Ok((lookup(&self.list)?, lookup(&self.item)?))
    }
}

impl Default for ListTypes {
    fn default() -> Self {
        Self::bullet()
    }
}

/// The list commands, as triggers a host can bind to its own input events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ListCommand {
    WrapInList,
    LiftListItem,
    SinkListItem,
    SplitListItem,
}

impl ListCommand {
    pub const ALL: [ListCommand; 4] = [
        ListCommand::WrapInList,
        ListCommand::LiftListItem,
        ListCommand::SinkListItem,
        ListCommand::SplitListItem,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ListCommand::WrapInList => "wrap_in_list",
            ListCommand::LiftListItem => "lift_list_item",
            ListCommand::SinkListItem => "sink_list_item",
            ListCommand::SplitListItem => "split_list_item",
        }
    }

    /// Runs the command with the default bullet list types.
    pub fn run(self, state: &EditorState) -> Option<Transaction> {
        self.run_with(state, &ListTypes::default())
    }

    pub fn run_with(self, state: &EditorState, types: &ListTypes) -> Option<Transaction> {
        match self {
            ListCommand::WrapInList => wrap_in_list(state, types, None),
            ListCommand::LiftListItem => lift_list_item(state, types),
            ListCommand::SinkListItem => sink_list_item(state, types),
            ListCommand::SplitListItem => split_list_item(state, types),
        }
    }
}

/// Why a command declined.
#[derive(Debug, thiserror::Error)]
pub(crate) enum Skip {
    #[error("{0}")]
    Precondition(&'static str),
    #[error(transparent)]
    Step(#[from] StepError),
    #[error(transparent)]
    Model(#[from] ModelError),
}

pub(crate) fn ensure(condition: bool, reason: &'static str) -> Result<(), Skip> {
    if condition {
        Ok(())
    } else {
        Err(Skip::Precondition(reason))
    }
}

/// Turns a command body's outcome into the public `Option`.
pub(crate) fn finish(command: &'static str, result: Result<Transaction, Skip>) -> Option<Transaction> {
    match result {
        Ok(tr) => Some(tr),
        Err(skip) => {
            debug!(command, reason = %skip, "command not applicable");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::builders::{doc, li, p, schema, ul};
    use crate::state::Selection;

    #[test]
    fn list_types_resolve_against_schema() {
        let (list, item) = ListTypes::default().resolve(&schema()).unwrap();
        assert_eq!(list.name(), "bulletList");
        assert_eq!(item.name(), "listItem");
        let err = ListTypes::new("orderedList", "listItem")
            .resolve(&schema())
            .unwrap_err();
        assert_eq!(err, ModelError::UnknownNodeType("orderedList".into()));
    }

    #[test]
    fn unknown_list_type_makes_commands_inapplicable() {
        let state = EditorState::new(doc([p("a")]), Selection::cursor(1)).unwrap();
        let types = ListTypes::new("orderedList", "listItem");
        for command in ListCommand::ALL {
            assert!(command.run_with(&state, &types).is_none(), "{}", command.name());
        }
    }

    #[test]
    fn run_dispatches_by_command() {
        let d = doc([ul([li([p("a")]), li([p("b")])])]);
        let state = EditorState::new(d, Selection::cursor(8)).unwrap();
        let tr = ListCommand::SinkListItem.run(&state).unwrap();
        assert_eq!(tr.doc(), &doc([ul([li([p("a"), ul([li([p("b")])])])])]));
        assert!(ListCommand::WrapInList.run(&state).is_some());
    }
}
