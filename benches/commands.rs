use criterion::{Criterion, black_box, criterion_group, criterion_main};
use outline_edit::{EditorState, ListCommand, Node, Schema, Selection};
use serde_json::{Value, json};

const ITEMS: usize = 500;

fn paragraph() -> Value {
    json!({"type": "paragraph", "content": [{"type": "text", "text": "item"}]})
}

fn list_doc(schema: &Schema) -> Node {
    let items: Vec<Value> = (0..ITEMS)
        .map(|_| json!({"type": "listItem", "content": [paragraph()]}))
        .collect();
    Node::from_json(
        schema,
        &json!({"type": "doc", "content": [{"type": "bulletList", "content": items}]}),
    )
    .unwrap()
}

fn paragraph_doc(schema: &Schema) -> Node {
    let paragraphs: Vec<Value> = (0..ITEMS).map(|_| paragraph()).collect();
    Node::from_json(schema, &json!({"type": "doc", "content": paragraphs})).unwrap()
}

// Each item is 8 positions wide; the text of item k starts at 8k + 3.
fn item_text_start(k: usize) -> usize {
    8 * k + 3
}

fn bench_sink(c: &mut Criterion) {
    let schema = Schema::outline();
    let state = EditorState::new(
        list_doc(&schema),
        Selection::cursor(item_text_start(ITEMS / 2)),
    )
    .unwrap();

    c.bench_function("sink_list_item", |b| {
        b.iter(|| black_box(ListCommand::SinkListItem.run(&state)))
    });
}

fn bench_split(c: &mut Criterion) {
    let schema = Schema::outline();
    let state = EditorState::new(
        list_doc(&schema),
        Selection::cursor(item_text_start(ITEMS / 2) + 4),
    )
    .unwrap();

    c.bench_function("split_list_item", |b| {
        b.iter(|| {
            let tr = ListCommand::SplitListItem.run(&state).unwrap();
            black_box(state.apply(&tr).unwrap());
        })
    });
}

fn bench_wrap(c: &mut Criterion) {
    let schema = Schema::outline();
    let doc = paragraph_doc(&schema);
    let end = doc.content_size() - 1;
    let state = EditorState::new(doc, Selection::new(1, end)).unwrap();

    c.bench_function("wrap_in_list", |b| {
        b.iter(|| black_box(ListCommand::WrapInList.run(&state)))
    });
}

criterion_group!(benches, bench_sink, bench_split, bench_wrap);
criterion_main!(benches);
