#![no_main]

use libfuzzer_sys::fuzz_target;
use outline_edit::{
    EditorState, ListCommand, ListTypes, Node, Schema, Selection, insert_text, start_bullet_list,
};
use serde_json::json;

fuzz_target!(|data: &[u8]| {
    let schema = Schema::outline();
    let doc = Node::from_json(
        &schema,
        &json!({"type": "doc", "content": [
            {"type": "paragraph", "content": [{"type": "text", "text": "ab"}]},
            {"type": "paragraph", "content": [{"type": "text", "text": "cd"}]}
        ]}),
    )
    .unwrap();
    let mut state = EditorState::new(doc, Selection::cursor(1)).unwrap();
    let types = ListTypes::default();

    for chunk in data.chunks(3) {
        if chunk.len() < 3 {
            break;
        }
        let size = state.doc().content_size() + 1;
        let selection = Selection::new(chunk[1] as usize % size, chunk[2] as usize % size);
        let Ok(current) = EditorState::new(state.doc().clone(), selection) else {
            continue;
        };
        let tr = match chunk[0] % 7 {
            0..=3 => ListCommand::ALL[(chunk[0] % 4) as usize].run_with(&current, &types),
            4 => insert_text(&current, "- "),
            5 => start_bullet_list(&current, &types),
            _ => insert_text(&current, "x"),
        };
        if let Some(tr) = tr {
            let next = current.apply(&tr).unwrap();
            next.doc().check().unwrap();
            state = next;
        }
    }
});
