//! Result propagation between levels.
//!
//! Before a level runs, every invocation in it either becomes a ready
//! [`ExecutionRequest`] with its references substituted, or is resolved
//! immediately (skipped because a dependency did not succeed, or failed
//! because a referenced output path does not exist).

use crate::graph::DependencyGraph;
use serde_json::Value;
use std::collections::BTreeMap;
use strata_core::argument::coerce_to_string;
use strata_core::{
    ArgValue, ExecutionRequest, FailureKind, InvocationSpec, Outcome, Reference, TemplatePart,
};

/// An invocation whose arguments are fully resolved.
#[derive(Debug, Clone)]
pub struct ReadyInvocation {
    /// Submission index
    pub index: usize,
    pub request: ExecutionRequest,
}

/// One level after propagation.
#[derive(Debug, Default)]
pub struct Prepared {
    /// Invocations to hand to the executor
    pub ready: Vec<ReadyInvocation>,
    /// Invocations resolved without running, by submission index
    pub resolved: Vec<(usize, Outcome)>,
}

/// Prepare one level for execution.
///
/// `prior[i]` holds the outcome of invocation `i` if it has resolved. Every
/// dependency of an invocation in `level` sits in an earlier level, so its
/// entry is expected to be filled.
pub fn prepare(
    level: &[usize],
    graph: &DependencyGraph,
    specs: &[InvocationSpec],
    prior: &[Option<Outcome>],
) -> Prepared {
    let mut prepared = Prepared::default();

    for &idx in level {
        if let Some(skip) = blocked_by(idx, graph, prior) {
            prepared.resolved.push((idx, skip));
            continue;
        }

        let spec = &specs[idx];
        match resolve_arguments(spec, graph, prior) {
            Ok(arguments) => prepared.ready.push(ReadyInvocation {
                index: idx,
                request: ExecutionRequest {
                    invocation_id: spec.id.clone(),
                    target: spec.target.clone(),
                    arguments,
                },
            }),
            Err(failure) => prepared.resolved.push((idx, failure)),
        }
    }

    prepared
}

/// The skip outcome for `idx` if any dependency did not succeed.
fn blocked_by(idx: usize, graph: &DependencyGraph, prior: &[Option<Outcome>]) -> Option<Outcome> {
    graph.dependencies(idx).iter().find_map(|&dep| {
        let dep_id = graph.id(dep);
        match &prior[dep] {
            Some(Outcome::Success { .. }) => None,
            Some(Outcome::Failure { .. }) => {
                Some(Outcome::skipped(format!("dependency failed: {dep_id}")))
            }
            Some(Outcome::Skipped { .. }) => {
                Some(Outcome::skipped(format!("dependency skipped: {dep_id}")))
            }
            None => Some(Outcome::skipped(format!("dependency unresolved: {dep_id}"))),
        }
    })
}

fn resolve_arguments(
    spec: &InvocationSpec,
    graph: &DependencyGraph,
    prior: &[Option<Outcome>],
) -> Result<BTreeMap<String, Value>, Outcome> {
    let mut arguments = BTreeMap::new();
    for (name, arg) in &spec.arguments {
        arguments.insert(name.clone(), resolve_value(arg, graph, prior)?);
    }
    Ok(arguments)
}

fn resolve_value(
    arg: &ArgValue,
    graph: &DependencyGraph,
    prior: &[Option<Outcome>],
) -> Result<Value, Outcome> {
    match arg {
        ArgValue::Literal { value } => Ok(value.clone()),
        ArgValue::Reference(reference) => lookup(reference, graph, prior).cloned(),
        ArgValue::Template { parts } => {
            let mut rendered = String::new();
            for part in parts {
                match part {
                    TemplatePart::Text(text) => rendered.push_str(text),
                    TemplatePart::Reference(reference) => {
                        rendered.push_str(&coerce_to_string(lookup(reference, graph, prior)?))
                    }
                }
            }
            Ok(Value::String(rendered))
        }
    }
}

fn lookup<'a>(
    reference: &Reference,
    graph: &DependencyGraph,
    prior: &'a [Option<Outcome>],
) -> Result<&'a Value, Outcome> {
    let output = graph
        .index_of(&reference.invocation)
        .and_then(|idx| prior[idx].as_ref())
        .and_then(Outcome::output)
        .ok_or_else(|| {
            Outcome::failure(
                FailureKind::Resolution,
                format!("output of '{}' is not available", reference.invocation),
            )
        })?;

    reference.path.lookup(output).ok_or_else(|| {
        Outcome::failure(
            FailureKind::Resolution,
            format!(
                "output of '{}' has no value at path '{}'",
                reference.invocation, reference.path
            ),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use strata_core::{InvocationId, OutputPath};

    fn id(s: &str) -> InvocationId {
        InvocationId::parse(s).unwrap()
    }

    fn spec(name: &str) -> InvocationSpec {
        InvocationSpec::builder().id(name).target("noop").build().unwrap()
    }

    fn setup(specs: &[InvocationSpec]) -> DependencyGraph {
        DependencyGraph::build(specs).unwrap()
    }

    #[test]
    fn test_substitutes_whole_and_path_references() {
        let specs = vec![
            spec("fetch"),
            spec("use")
                .with_argument("all", ArgValue::reference(id("fetch")))
                .with_argument(
                    "first",
                    ArgValue::reference_at(id("fetch"), OutputPath::parse("items.0").unwrap()),
                )
                .with_argument("mode", ArgValue::literal("fast")),
        ];
        let graph = setup(&specs);
        let prior = vec![Some(Outcome::success(json!({"items": [10, 20]}))), None];

        let prepared = prepare(&[1], &graph, &specs, &prior);
        assert!(prepared.resolved.is_empty());
        assert_eq!(prepared.ready.len(), 1);

        let request = &prepared.ready[0].request;
        assert_eq!(request.invocation_id, id("use"));
        assert_eq!(request.argument("all"), Some(&json!({"items": [10, 20]})));
        assert_eq!(request.argument("first"), Some(&json!(10)));
        assert_eq!(request.argument("mode"), Some(&json!("fast")));
    }

    #[test]
    fn test_template_coerces_to_string() {
        let specs = vec![
            spec("name"),
            spec("count"),
            spec("greet").with_argument(
                "text",
                ArgValue::template([
                    TemplatePart::Text("hello ".into()),
                    TemplatePart::Reference(Reference::whole(id("name"))),
                    TemplatePart::Text(", you have ".into()),
                    TemplatePart::Reference(Reference::whole(id("count"))),
                ]),
            ),
        ];
        let graph = setup(&specs);
        let prior = vec![
            Some(Outcome::success(json!("ada"))),
            Some(Outcome::success(json!({"n": 3}))),
            None,
        ];

        let prepared = prepare(&[2], &graph, &specs, &prior);
        assert_eq!(
            prepared.ready[0].request.argument("text"),
            Some(&json!(r#"hello ada, you have {"n":3}"#))
        );
    }

    #[test]
    fn test_literal_placeholders_are_not_scanned() {
        let specs = vec![spec("a").with_argument("raw", ArgValue::literal("{{b}}"))];
        let graph = setup(&specs);
        let prepared = prepare(&[0], &graph, &specs, &[None]);
        assert_eq!(prepared.ready[0].request.argument("raw"), Some(&json!("{{b}}")));
    }

    #[test]
    fn test_failed_dependency_skips() {
        let specs = vec![spec("a"), spec("b").with_dependency(id("a"))];
        let graph = setup(&specs);
        let prior = vec![Some(Outcome::failure(FailureKind::Execution, "boom")), None];

        let prepared = prepare(&[1], &graph, &specs, &prior);
        assert!(prepared.ready.is_empty());
        assert_eq!(
            prepared.resolved,
            vec![(1, Outcome::skipped("dependency failed: a"))]
        );
    }

    #[test]
    fn test_skipped_dependency_skips_transitively() {
        let specs = vec![spec("a"), spec("b").with_argument("x", ArgValue::reference(id("a")))];
        let graph = setup(&specs);
        let prior = vec![Some(Outcome::skipped("dependency failed: root")), None];

        let prepared = prepare(&[1], &graph, &specs, &prior);
        assert_eq!(
            prepared.resolved,
            vec![(1, Outcome::skipped("dependency skipped: a"))]
        );
    }

    #[test]
    fn test_first_blocking_dependency_in_submission_order_wins() {
        let specs = vec![
            spec("a"),
            spec("b"),
            spec("c").with_dependency(id("b")).with_dependency(id("a")),
        ];
        let graph = setup(&specs);
        let prior = vec![
            Some(Outcome::skipped("batch cancelled")),
            Some(Outcome::failure(FailureKind::Timeout, "slow")),
            None,
        ];

        let prepared = prepare(&[2], &graph, &specs, &prior);
        assert_eq!(prepared.resolved[0].1.skip_reason(), Some("dependency skipped: a"));
    }

    #[test]
    fn test_missing_path_is_resolution_failure() {
        let specs = vec![
            spec("a"),
            spec("b").with_argument(
                "x",
                ArgValue::reference_at(id("a"), OutputPath::parse("missing.key").unwrap()),
            ),
        ];
        let graph = setup(&specs);
        let prior = vec![Some(Outcome::success(json!({"present": 1}))), None];

        let prepared = prepare(&[1], &graph, &specs, &prior);
        assert!(prepared.ready.is_empty());
        let (idx, outcome) = &prepared.resolved[0];
        assert_eq!(*idx, 1);
        assert_eq!(outcome.failure_kind(), Some(FailureKind::Resolution));
        assert_eq!(
            outcome.failure_detail(),
            Some("output of 'a' has no value at path 'missing.key'")
        );
    }

    #[test]
    fn test_mixed_level() {
        let specs = vec![
            spec("ok"),
            spec("bad"),
            spec("x").with_argument("v", ArgValue::reference(id("ok"))),
            spec("y").with_dependency(id("bad")),
        ];
        let graph = setup(&specs);
        let prior = vec![
            Some(Outcome::success(json!(1))),
            Some(Outcome::failure(FailureKind::Execution, "nope")),
            None,
            None,
        ];

        let prepared = prepare(&[2, 3], &graph, &specs, &prior);
        assert_eq!(prepared.ready.len(), 1);
        assert_eq!(prepared.ready[0].index, 2);
        assert_eq!(prepared.resolved.len(), 1);
        assert_eq!(prepared.resolved[0].0, 3);
    }
}
