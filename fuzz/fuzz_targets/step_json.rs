#![no_main]

use libfuzzer_sys::fuzz_target;
use outline_edit::{Bias, Node, Schema, Step};
use serde_json::json;

fuzz_target!(|data: &[u8]| {
    let Ok(value) = serde_json::from_slice::<serde_json::Value>(data) else {
        return;
    };
    let schema = Schema::outline();
    let Ok(step) = Step::from_json(&schema, &value) else {
        return;
    };
    let doc = Node::from_json(
        &schema,
        &json!({"type": "doc", "content": [
            {"type": "bulletList", "content": [
                {"type": "listItem", "content": [
                    {"type": "paragraph", "content": [{"type": "text", "text": "ab"}]}
                ]}
            ]},
            {"type": "paragraph"}
        ]}),
    )
    .unwrap();
    if let Ok(after) = step.apply(&doc) {
        let _ = step.get_map().map(doc.content_size(), Bias::After);
        if let Ok(inverse) = step.invert(&doc) {
            let _ = inverse.apply(&after);
        }
    }
});
