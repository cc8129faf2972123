use serde_json::{json, Value};
use sidenote_core::{AnnotationKind, AnnotationRecord, AnnotationTree};

fn line(record: &AnnotationRecord, indent: &str) -> String {
    let mut out = format!("{indent}[{}] {} {}", record.id, record.kind.icon(), record.content);
    if record.kind == AnnotationKind::Todo && record.completed {
        out.push_str(" (done)");
    }
    if record.from_source {
        out.push_str(" [captured]");
    }
    out
}

/// Roots in order, each followed by its children indented one level.
pub fn render_text(tree: &AnnotationTree<'_>) -> String {
    if tree.is_empty() {
        return "No items yet.".to_string();
    }
    let mut lines = Vec::with_capacity(tree.len());
    for node in &tree.roots {
        lines.push(line(node.record, ""));
        for child in &node.children {
            lines.push(line(child, "    "));
        }
    }
    lines.join("\n")
}

pub fn render_json(tree: &AnnotationTree<'_>) -> Value {
    let roots: Vec<Value> = tree
        .roots
        .iter()
        .map(|node| {
            json!({
                "item": node.record,
                "children": node.children,
            })
        })
        .collect();
    Value::Array(roots)
}
