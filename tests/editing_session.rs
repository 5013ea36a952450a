use outline_edit::{
    EditorState, ListCommand, ListTypes, Node, Selection, Step, insert_tab, insert_text,
    start_bullet_list,
};
mod support;

use support::{doc, li, p, schema, state, ul};

/// Applies a command and returns the next state together with its steps.
fn run(
    state: &EditorState,
    command: impl Fn(&EditorState) -> Option<outline_edit::Transaction>,
) -> (EditorState, Vec<Step>) {
    let tr = command(state).expect("command should apply");
    (state.apply(&tr).unwrap(), tr.steps().to_vec())
}

fn typed(text: &'static str) -> impl Fn(&EditorState) -> Option<outline_edit::Transaction> {
    move |state| insert_text(state, text)
}

/// Types a small outline from scratch: "- " starts a list, Enter splits,
/// Tab nests, Enter on an empty nested item outdents, and the last item is
/// lifted out of the list.
fn session() -> (Node, Vec<(EditorState, Vec<Step>)>) {
    let types = ListTypes::default();
    let start = state(doc(vec![p("- ")]), 3, 3);
    let mut history = Vec::new();
    let mut current = start.clone();
    let actions: Vec<Box<dyn Fn(&EditorState) -> Option<outline_edit::Transaction>>> = vec![
        Box::new(|s: &EditorState| start_bullet_list(s, &ListTypes::default())),
        Box::new(typed("a")),
        Box::new(|s: &EditorState| ListCommand::SplitListItem.run(s)),
        Box::new(typed("b")),
        Box::new(move |s: &EditorState| insert_tab(s, &types)),
        Box::new(|s: &EditorState| ListCommand::SplitListItem.run(s)),
        Box::new(|s: &EditorState| ListCommand::SplitListItem.run(s)),
        Box::new(typed("c")),
        Box::new(|s: &EditorState| ListCommand::LiftListItem.run(s)),
    ];
    for action in &actions {
        let (next, steps) = run(&current, action);
        history.push((next.clone(), steps));
        current = next;
    }
    (start.doc().clone(), history)
}

#[test]
fn test_session_produces_outline() {
    let (_, history) = session();
    let cursors: Vec<usize> = history.iter().map(|(s, _)| s.selection().head).collect();
    assert_eq!(cursors, vec![3, 4, 8, 9, 9, 13, 15, 16, 16]);

    let (last, _) = history.last().unwrap();
    assert_eq!(
        last.doc(),
        &doc(vec![ul(vec![li(vec![p("a"), ul(vec![li(vec![p("b")])])])]), p("c")])
    );
    assert_eq!(
        last.doc().to_string(),
        r#"doc(bulletList(listItem(paragraph("a"), bulletList(listItem(paragraph("b"))))), paragraph("c"))"#
    );
}

#[test]
fn test_session_intermediate_documents() {
    let (_, history) = session();
    assert_eq!(history[0].0.doc(), &doc(vec![ul(vec![li(vec![p("")])])]));
    assert_eq!(
        history[4].0.doc(),
        &doc(vec![ul(vec![li(vec![p("a"), ul(vec![li(vec![p("b")])])])])])
    );
    assert_eq!(
        history[6].0.doc(),
        &doc(vec![ul(vec![
            li(vec![p("a"), ul(vec![li(vec![p("b")])])]),
            li(vec![p("")]),
        ])])
    );
}

#[test]
fn test_session_replays_from_json() {
    let (original, history) = session();
    let schema = schema();
    let mut replayed = original;
    for (expected, steps) in &history {
        for step in steps {
            let json = step.to_json();
            let parsed = Step::from_json(&schema, &json).unwrap();
            assert_eq!(&parsed, step);
            replayed = parsed.apply(&replayed).unwrap();
        }
        assert_eq!(&replayed, expected.doc());
    }
}

#[test]
fn test_session_undoes_with_inverted_steps() {
    let (original, history) = session();
    let steps: Vec<Step> = history.into_iter().flat_map(|(_, steps)| steps).collect();

    let mut docs = vec![original.clone()];
    for step in &steps {
        let next = step.apply(docs.last().unwrap()).unwrap();
        docs.push(next);
    }

    let mut current = docs.last().unwrap().clone();
    for (step, before) in steps.iter().zip(&docs).rev() {
        current = step.invert(before).unwrap().apply(&current).unwrap();
        assert_eq!(&current, before);
    }
    assert_eq!(current, original);
}

#[test]
fn test_commands_decline_without_changing_state() {
    let s = state(doc(vec![p("plain")]), 2, 2);
    for command in ListCommand::ALL {
        if command == ListCommand::WrapInList {
            continue;
        }
        assert!(command.run(&s).is_none(), "{}", command.name());
    }
    assert!(start_bullet_list(&s, &ListTypes::default()).is_none());
    assert_eq!(s.selection(), Selection::cursor(2));
}
