//! Batch shapes used across tests and benchmarks.
//!
//! Every builder uses target `"work"` and ids of the form `n{index}`, so the
//! submission index can be read straight from the id.

use serde_json::json;
use strata::{ArgValue, InvocationId, InvocationSpec, Target};

/// Id for the node at `index`.
pub fn node_id(index: usize) -> InvocationId {
    InvocationId::new_unchecked(format!("n{index}"))
}

fn node(index: usize) -> InvocationSpec {
    InvocationSpec::new(node_id(index), Target::new_unchecked("work"))
        .with_argument("index", ArgValue::literal(json!(index)))
}

/// `n0 <- n1 <- ... <- n{len-1}`, each consuming the previous output.
pub fn chain(len: usize) -> Vec<InvocationSpec> {
    (0..len)
        .map(|i| match i {
            0 => node(i),
            _ => node(i).with_argument("input", ArgValue::reference(node_id(i - 1))),
        })
        .collect()
}

/// `width` independent invocations.
pub fn wide(width: usize) -> Vec<InvocationSpec> {
    (0..width).map(node).collect()
}

/// `width` roots feeding a single sink.
pub fn fan_in(width: usize) -> Vec<InvocationSpec> {
    let mut batch = wide(width);
    let sink = (0..width).fold(node(width), |spec, i| spec.with_dependency(node_id(i)));
    batch.push(sink);
    batch
}

/// `top -> (left, right) -> bottom`.
pub fn diamond() -> Vec<InvocationSpec> {
    vec![
        node(0),
        node(1).with_argument("input", ArgValue::reference(node_id(0))),
        node(2).with_argument("input", ArgValue::reference(node_id(0))),
        node(3)
            .with_dependency(node_id(1))
            .with_dependency(node_id(2)),
    ]
}

/// `depth` layers of `width` nodes. Each node depends on up to two nodes of
/// the previous layer.
pub fn layered(width: usize, depth: usize) -> Vec<InvocationSpec> {
    let width = width.max(1);
    (0..width * depth)
        .map(|i| {
            let (layer, slot) = (i / width, i % width);
            if layer == 0 {
                return node(i);
            }
            let above = (layer - 1) * width;
            let mut spec = node(i).with_dependency(node_id(above + slot));
            if width > 1 {
                spec = spec.with_dependency(node_id(above + (slot + 1) % width));
            }
            spec
        })
        .collect()
}
