//! Built-in demo executor
//!
//! Targets:
//! - `echo`: returns the resolved arguments as an object
//! - `sleep`: waits for `duration` (e.g. `"250ms"`), honoring cancellation
//! - `fail`: fails with `message`
//! - `concat`: joins `parts` (strings verbatim, other values as JSON) with `separator`
//! - `uppercase`: uppercases `text`

use async_trait::async_trait;
use serde_json::{Value, json};
use std::time::Duration;
use strata::core::argument::coerce_to_string;
use strata::{CancellationToken, ExecutionRequest, ToolExecutor, ToolFailure};

#[derive(Debug, Clone, Copy, Default)]
pub struct DemoExecutor;

impl DemoExecutor {
    pub const TARGETS: [&'static str; 5] = ["echo", "sleep", "fail", "concat", "uppercase"];
}

#[async_trait]
impl ToolExecutor for DemoExecutor {
    async fn execute(
        &self,
        request: ExecutionRequest,
        cancel: CancellationToken,
    ) -> Result<Value, ToolFailure> {
        tracing::debug!(invocation = %request.invocation_id, target = %request.target, "Running demo target");

        match request.target.as_str() {
            "echo" => Ok(json!(request.arguments)),
            "sleep" => {
                let duration = parse_duration_arg(&request)?;
                tokio::select! {
                    _ = tokio::time::sleep(duration) => {
                        Ok(json!({ "slept": humantime::format_duration(duration).to_string() }))
                    }
                    _ = cancel.cancelled() => Err(ToolFailure::new("sleep cancelled")),
                }
            }
            "fail" => Err(ToolFailure::new(
                request
                    .str_argument("message")
                    .unwrap_or("requested failure"),
            )),
            "concat" => {
                let parts = request
                    .argument("parts")
                    .and_then(Value::as_array)
                    .ok_or_else(|| ToolFailure::new("concat requires an array argument 'parts'"))?;
                let separator = request.str_argument("separator").unwrap_or("");
                let joined = parts
                    .iter()
                    .map(coerce_to_string)
                    .collect::<Vec<_>>()
                    .join(separator);
                Ok(Value::String(joined))
            }
            "uppercase" => request
                .str_argument("text")
                .map(|text| Value::String(text.to_uppercase()))
                .ok_or_else(|| ToolFailure::new("uppercase requires a string argument 'text'")),
            other => Err(ToolFailure::new(format!(
                "unknown target '{}', expected one of: {}",
                other,
                Self::TARGETS.join(", ")
            ))),
        }
    }
}

fn parse_duration_arg(request: &ExecutionRequest) -> Result<Duration, ToolFailure> {
    match request.argument("duration") {
        Some(Value::String(raw)) => humantime::parse_duration(raw).map_err(ToolFailure::from_error),
        Some(Value::Number(ms)) => ms
            .as_u64()
            .map(Duration::from_millis)
            .ok_or_else(|| ToolFailure::new("duration must be a non-negative number of milliseconds")),
        _ => Err(ToolFailure::new("sleep requires a 'duration' argument")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use strata::{InvocationId, Target};

    fn request(target: &str, arguments: Value) -> ExecutionRequest {
        let arguments: BTreeMap<String, Value> = serde_json::from_value(arguments).unwrap();
        ExecutionRequest {
            invocation_id: InvocationId::parse("demo").unwrap(),
            target: Target::parse(target).unwrap(),
            arguments,
        }
    }

    async fn run(target: &str, arguments: Value) -> Result<Value, ToolFailure> {
        DemoExecutor
            .execute(request(target, arguments), CancellationToken::new())
            .await
    }

    #[tokio::test]
    async fn test_echo_and_uppercase() {
        assert_eq!(run("echo", json!({"a": 1})).await, Ok(json!({"a": 1})));
        assert_eq!(run("uppercase", json!({"text": "hi"})).await, Ok(json!("HI")));
        assert!(run("uppercase", json!({"text": 5})).await.is_err());
    }

    #[tokio::test]
    async fn test_concat() {
        let value = run(
            "concat",
            json!({"parts": ["a", 1, {"k": true}], "separator": "-"}),
        )
        .await;
        assert_eq!(value, Ok(json!(r#"a-1-{"k":true}"#)));
    }

    #[tokio::test]
    async fn test_fail_and_unknown() {
        assert_eq!(
            run("fail", json!({"message": "nope"})).await,
            Err(ToolFailure::new("nope"))
        );
        let err = run("teleport", json!({})).await.unwrap_err();
        assert!(err.message.contains("unknown target 'teleport'"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_sleep() {
        assert_eq!(
            run("sleep", json!({"duration": "2s"})).await,
            Ok(json!({"slept": "2s"}))
        );
        assert_eq!(
            run("sleep", json!({"duration": 1500})).await,
            Ok(json!({"slept": "1s 500ms"}))
        );

        let token = CancellationToken::new();
        token.cancel();
        let cancelled = DemoExecutor
            .execute(request("sleep", json!({"duration": "1h"})), token)
            .await;
        assert_eq!(cancelled, Err(ToolFailure::new("sleep cancelled")));
    }
}
