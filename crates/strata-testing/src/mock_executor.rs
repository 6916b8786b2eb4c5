//! # Mock Executor for Testing
//!
//! A [`ToolExecutor`] whose behavior is scripted per target or per
//! invocation, and which records every call it receives together with
//! start/finish events and the peak number of concurrent calls.

use async_trait::async_trait;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use strata_core::{CancellationToken, ExecutionRequest, InvocationId, ToolExecutor, ToolFailure};

/// What the mock does when called.
#[derive(Debug, Clone, PartialEq)]
pub enum MockBehavior {
    /// Return the resolved arguments as a JSON object
    Echo,
    /// Return a fixed value
    Respond(Value),
    /// Return a failure with the given message
    Fail(String),
    /// Panic with the given message
    Panic(String),
    /// Wait until cancelled, then fail with `"cancelled"`
    Hang,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum MatchKey {
    Invocation(String),
    Target(String),
}

/// A start or finish of one call, in the order observed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallEvent {
    Started(InvocationId),
    Finished(InvocationId),
}

#[derive(Debug, Default)]
struct CallLog {
    calls: Vec<ExecutionRequest>,
    events: Vec<CallEvent>,
    active: usize,
    peak: usize,
}

/// Scriptable executor for scheduler tests.
///
/// Lookups go invocation id first, then target, then the default behavior
/// (which echoes the arguments). Clones share their call log.
///
/// ```rust
/// use strata_testing::MockExecutor;
/// use serde_json::json;
/// use std::time::Duration;
///
/// let mock = MockExecutor::new()
///     .with_response("search", json!(["a", "b"]))
///     .with_failure("flaky", "upstream unavailable")
///     .with_delay("search", Duration::from_millis(5));
/// assert_eq!(mock.call_count(), 0);
/// ```
#[derive(Debug, Clone)]
pub struct MockExecutor {
    behaviors: HashMap<MatchKey, MockBehavior>,
    delays: HashMap<MatchKey, Duration>,
    default_behavior: MockBehavior,
    log: Arc<Mutex<CallLog>>,
}

impl Default for MockExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl MockExecutor {
    /// Create a mock that echoes arguments for every call
    pub fn new() -> Self {
        Self {
            behaviors: HashMap::new(),
            delays: HashMap::new(),
            default_behavior: MockBehavior::Echo,
            log: Arc::new(Mutex::new(CallLog::default())),
        }
    }

    /// Set the behavior for every invocation of `target`
    pub fn with_target_behavior(mut self, target: &str, behavior: MockBehavior) -> Self {
        self.behaviors
            .insert(MatchKey::Target(target.to_string()), behavior);
        self
    }

    /// Set the behavior for one invocation id
    pub fn with_invocation_behavior(mut self, invocation: &str, behavior: MockBehavior) -> Self {
        self.behaviors
            .insert(MatchKey::Invocation(invocation.to_string()), behavior);
        self
    }

    /// Return `value` for every invocation of `target`
    pub fn with_response(self, target: &str, value: Value) -> Self {
        self.with_target_behavior(target, MockBehavior::Respond(value))
    }

    /// Fail every invocation of `target`
    pub fn with_failure(self, target: &str, message: impl Into<String>) -> Self {
        self.with_target_behavior(target, MockBehavior::Fail(message.into()))
    }

    /// Panic on every invocation of `target`
    pub fn with_panic(self, target: &str, message: impl Into<String>) -> Self {
        self.with_target_behavior(target, MockBehavior::Panic(message.into()))
    }

    /// Block every invocation of `target` until it is cancelled
    pub fn with_hang(self, target: &str) -> Self {
        self.with_target_behavior(target, MockBehavior::Hang)
    }

    /// Return `value` for one invocation id
    pub fn with_invocation_response(self, invocation: &str, value: Value) -> Self {
        self.with_invocation_behavior(invocation, MockBehavior::Respond(value))
    }

    /// Fail one invocation id
    pub fn with_invocation_failure(self, invocation: &str, message: impl Into<String>) -> Self {
        self.with_invocation_behavior(invocation, MockBehavior::Fail(message.into()))
    }

    /// Sleep before responding to every invocation of `target`
    pub fn with_delay(mut self, target: &str, delay: Duration) -> Self {
        self.delays.insert(MatchKey::Target(target.to_string()), delay);
        self
    }

    /// Sleep before responding to one invocation id
    pub fn with_invocation_delay(mut self, invocation: &str, delay: Duration) -> Self {
        self.delays
            .insert(MatchKey::Invocation(invocation.to_string()), delay);
        self
    }

    /// Behavior for anything without a specific script
    pub fn with_default_behavior(mut self, behavior: MockBehavior) -> Self {
        self.default_behavior = behavior;
        self
    }

    /// Number of calls received
    pub fn call_count(&self) -> usize {
        self.lock().calls.len()
    }

    /// Every request received, in call order
    pub fn calls(&self) -> Vec<ExecutionRequest> {
        self.lock().calls.clone()
    }

    /// The request received for `invocation`, if it was called
    pub fn request_for(&self, invocation: &str) -> Option<ExecutionRequest> {
        self.lock()
            .calls
            .iter()
            .find(|request| request.invocation_id.as_str() == invocation)
            .cloned()
    }

    /// Check if `invocation` was called
    pub fn was_called(&self, invocation: &str) -> bool {
        self.request_for(invocation).is_some()
    }

    /// Start and finish events, in observed order
    pub fn events(&self) -> Vec<CallEvent> {
        self.lock().events.clone()
    }

    /// Invocation ids in the order their calls started
    pub fn start_order(&self) -> Vec<InvocationId> {
        self.lock()
            .events
            .iter()
            .filter_map(|event| match event {
                CallEvent::Started(id) => Some(id.clone()),
                CallEvent::Finished(_) => None,
            })
            .collect()
    }

    /// Whether `first` finished before `second` started
    pub fn finished_before_started(&self, first: &str, second: &str) -> bool {
        let log = self.lock();
        let finished = log
            .events
            .iter()
            .position(|e| matches!(e, CallEvent::Finished(id) if id.as_str() == first));
        let started = log
            .events
            .iter()
            .position(|e| matches!(e, CallEvent::Started(id) if id.as_str() == second));
        matches!((finished, started), (Some(f), Some(s)) if f < s)
    }

    /// Highest number of calls that were in flight at once
    pub fn peak_concurrency(&self) -> usize {
        self.lock().peak
    }

    /// Clear the call log
    pub fn reset(&self) {
        *self.lock() = CallLog::default();
    }

    fn lock(&self) -> MutexGuard<'_, CallLog> {
        self.log.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn lookup<'a, T>(map: &'a HashMap<MatchKey, T>, request: &ExecutionRequest) -> Option<&'a T> {
    map.get(&MatchKey::Invocation(request.invocation_id.to_string()))
        .or_else(|| map.get(&MatchKey::Target(request.target.to_string())))
}

/// Marks a call finished even if it panics or is dropped mid-flight.
struct InFlight {
    id: InvocationId,
    log: Arc<Mutex<CallLog>>,
}

impl InFlight {
    fn start(log: &Arc<Mutex<CallLog>>, request: &ExecutionRequest) -> Self {
        let mut guard = log.lock().unwrap_or_else(PoisonError::into_inner);
        guard.calls.push(request.clone());
        guard
            .events
            .push(CallEvent::Started(request.invocation_id.clone()));
        guard.active += 1;
        guard.peak = guard.peak.max(guard.active);
        Self {
            id: request.invocation_id.clone(),
            log: Arc::clone(log),
        }
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        let mut guard = self.log.lock().unwrap_or_else(PoisonError::into_inner);
        guard.active = guard.active.saturating_sub(1);
        guard.events.push(CallEvent::Finished(self.id.clone()));
    }
}

#[async_trait]
impl ToolExecutor for MockExecutor {
    async fn execute(
        &self,
        request: ExecutionRequest,
        cancel: CancellationToken,
    ) -> Result<Value, ToolFailure> {
        let _in_flight = InFlight::start(&self.log, &request);

        if let Some(delay) = lookup(&self.delays, &request).copied() {
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = cancel.cancelled() => return Err(ToolFailure::new("cancelled")),
            }
        }

        let behavior = lookup(&self.behaviors, &request)
            .unwrap_or(&self.default_behavior)
            .clone();

        match behavior {
            MockBehavior::Echo => Ok(json!(request.arguments)),
            MockBehavior::Respond(value) => Ok(value),
            MockBehavior::Fail(message) => Err(ToolFailure::new(message)),
            MockBehavior::Panic(message) => panic!("{message}"),
            MockBehavior::Hang => {
                cancel.cancelled().await;
                Err(ToolFailure::new("cancelled"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use strata_core::Target;

    fn request(id: &str, target: &str) -> ExecutionRequest {
        ExecutionRequest {
            invocation_id: InvocationId::parse(id).unwrap(),
            target: Target::parse(target).unwrap(),
            arguments: BTreeMap::from([("q".to_string(), json!("rust"))]),
        }
    }

    #[tokio::test]
    async fn test_default_echoes_arguments() {
        let mock = MockExecutor::new();
        let value = mock
            .execute(request("a", "anything"), CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(value, json!({"q": "rust"}));
        assert_eq!(mock.call_count(), 1);
        assert!(mock.was_called("a"));
    }

    #[tokio::test]
    async fn test_invocation_script_overrides_target() {
        let mock = MockExecutor::new()
            .with_response("search", json!("by target"))
            .with_invocation_failure("special", "by id");

        let by_target = mock
            .execute(request("plain", "search"), CancellationToken::new())
            .await;
        let by_id = mock
            .execute(request("special", "search"), CancellationToken::new())
            .await;

        assert_eq!(by_target, Ok(json!("by target")));
        assert_eq!(by_id, Err(ToolFailure::new("by id")));
    }

    #[tokio::test]
    async fn test_hang_returns_on_cancel() {
        let mock = MockExecutor::new().with_hang("slow");
        let token = CancellationToken::new();
        token.cancel();
        let result = mock.execute(request("a", "slow"), token).await;
        assert_eq!(result, Err(ToolFailure::new("cancelled")));
        assert_eq!(
            mock.events(),
            vec![
                CallEvent::Started(InvocationId::parse("a").unwrap()),
                CallEvent::Finished(InvocationId::parse("a").unwrap()),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_tracks_peak_concurrency() {
        let mock = MockExecutor::new().with_delay("work", Duration::from_millis(10));
        let calls = (0..3).map(|i| {
            mock.execute(request(&format!("w{i}"), "work"), CancellationToken::new())
        });
        let results = futures::future::join_all(calls).await;

        assert!(results.iter().all(Result::is_ok));
        assert_eq!(mock.peak_concurrency(), 3);
        assert_eq!(mock.start_order().len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_finished_before_started() {
        let mock = MockExecutor::new();
        mock.execute(request("first", "t"), CancellationToken::new())
            .await
            .unwrap();
        mock.execute(request("second", "t"), CancellationToken::new())
            .await
            .unwrap();

        assert!(mock.finished_before_started("first", "second"));
        assert!(!mock.finished_before_started("second", "first"));

        mock.reset();
        assert_eq!(mock.call_count(), 0);
    }
}
