//! Agent loop — the LLM ↔ tool-calling state machine.
//!
//! ```text
//! Requesting ──(no tool calls)──────────────► Terminal(Completed)
//!     │ ──(tool calls)──► Dispatching ──────► Requesting
//!     │ ──(context overflow)──► SelfHealing ► Requesting
//!     │ ──(other backend error)─────────────► Terminal(BackendError)
//!     └──(iteration ceiling)────────────────► Terminal(IterationLimit)
//! ```
//!
//! The caller owns the history: `run` takes it and hands it back, extended,
//! in a [`RunOutcome`].

use std::sync::Arc;

use futures::future::join_all;
use serde_json::json;
use tracing::{debug, error, info, warn};

use nanox_core::config::Config;
use nanox_core::types::{Message, ToolCall, ToolDefinition};
use nanox_core::utils::{truncate_output, truncate_string};
use nanox_providers::{LlmProvider, LlmRequestConfig, ProviderError};

use crate::context::ContextBuilder;
use crate::interaction_log::InteractionLog;
use crate::tools::registry::ToolRegistry;

/// Synthetic system message appended after a context-overflow reset.
pub const SELF_HEAL_NOTICE: &str = "The session was reset because the previous context overloaded \
the model. Retry the task and use tools more precisely (read files in ranges, narrow searches).";

// ─────────────────────────────────────────────
// Settings, outcome, observer
// ─────────────────────────────────────────────

/// Per-loop knobs, usually taken from [`Config`].
#[derive(Clone, Debug)]
pub struct LoopSettings {
    pub model: String,
    /// Backend calls allowed per run (a self-heal consumes one).
    pub max_iterations: u32,
    /// Character budget applied to every tool result.
    pub tool_result_budget: usize,
    pub request: LlmRequestConfig,
}

impl LoopSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            model: config.provider.model.clone(),
            max_iterations: config.agent.max_tool_iterations,
            tool_result_budget: config.budgets.tool_result_chars,
            request: LlmRequestConfig {
                max_tokens: config.provider.max_tokens,
                temperature: config.provider.temperature,
            },
        }
    }
}

/// Why a run stopped.
#[derive(Debug)]
pub enum StopReason {
    /// The model answered without requesting tools.
    Completed,
    /// The iteration ceiling was reached first.
    IterationLimit,
    /// A backend failure that self-healing does not cover.
    BackendError(ProviderError),
}

/// The extended history plus the reason the run stopped.
#[derive(Debug)]
pub struct RunOutcome {
    pub messages: Vec<Message>,
    pub stop: StopReason,
}

impl RunOutcome {
    /// Text of the final assistant message, when the run completed.
    pub fn final_text(&self) -> Option<&str> {
        match self.stop {
            StopReason::Completed => self.messages.last().and_then(Message::text),
            _ => None,
        }
    }
}

/// Progress callbacks, invoked as messages are appended to the history.
pub trait LoopObserver: Send + Sync {
    fn on_assistant(&self, _message: &Message) {}
    fn on_tool_call(&self, _call: &ToolCall) {}
    fn on_tool_result(&self, _call: &ToolCall, _result: &str) {}
    fn on_self_heal(&self) {}
}

enum LoopState {
    Requesting,
    Dispatching(Vec<ToolCall>),
    SelfHealing,
    Terminal(StopReason),
}

// ─────────────────────────────────────────────
// AgentLoop
// ─────────────────────────────────────────────

pub struct AgentLoop {
    provider: Arc<dyn LlmProvider>,
    tools: ToolRegistry,
    context: ContextBuilder,
    settings: LoopSettings,
    log: InteractionLog,
    observer: Option<Arc<dyn LoopObserver>>,
}

impl AgentLoop {
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        tools: ToolRegistry,
        context: ContextBuilder,
        settings: LoopSettings,
        log: InteractionLog,
    ) -> Self {
        info!(
            provider = provider.display_name(),
            model = %settings.model,
            tools = tools.len(),
            max_iterations = settings.max_iterations,
            "agent loop ready"
        );
        Self {
            provider,
            tools,
            context,
            settings,
            log,
            observer: None,
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn LoopObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    pub fn context(&self) -> &ContextBuilder {
        &self.context
    }

    pub fn model(&self) -> &str {
        &self.settings.model
    }

    /// A fresh history: the system prompt built without user input.
    pub fn initial_messages(&self) -> Vec<Message> {
        vec![Message::system(self.context.build_system_prompt(None))]
    }

    /// Drive one user turn (or a bare continuation when `user_input` is `None`).
    pub async fn run(&self, mut messages: Vec<Message>, user_input: Option<&str>) -> RunOutcome {
        if let Some(input) = user_input {
            if let Some(Message::System { content }) = messages.first_mut() {
                *content = self.context.build_system_prompt(Some(input));
            }
            messages.push(Message::user(input));
        }

        let definitions = self.tools.definitions();
        let mut iteration: u32 = 0;
        let mut state = LoopState::Requesting;

        loop {
            state = match state {
                LoopState::Requesting => {
                    if iteration >= self.settings.max_iterations {
                        warn!(iterations = iteration, "max iterations reached");
                        self.log.record(
                            &format!("Iteration {iteration} Max Iterations"),
                            &json!({ "maxIterations": self.settings.max_iterations }),
                        );
                        LoopState::Terminal(StopReason::IterationLimit)
                    } else {
                        iteration += 1;
                        self.request(iteration, &mut messages, &definitions).await
                    }
                }
                LoopState::Dispatching(calls) => {
                    self.dispatch(iteration, &calls, &mut messages).await;
                    LoopState::Requesting
                }
                LoopState::SelfHealing => {
                    self.self_heal(iteration, &mut messages);
                    LoopState::Requesting
                }
                LoopState::Terminal(stop) => {
                    debug!(iterations = iteration, stop = ?stop, "run finished");
                    return RunOutcome { messages, stop };
                }
            };
        }
    }

    async fn request(
        &self,
        iteration: u32,
        messages: &mut Vec<Message>,
        definitions: &[ToolDefinition],
    ) -> LoopState {
        self.log.record(
            &format!("Iteration {iteration} Request"),
            &json!({ "model": self.settings.model, "messages": messages }),
        );
        debug!(iteration, messages = messages.len(), "LLM call");

        let tools = (!definitions.is_empty()).then_some(definitions);
        let response = self
            .provider
            .chat(messages, tools, &self.settings.model, &self.settings.request)
            .await;

        match response {
            Ok(response) => {
                let message = response.to_message();
                self.log
                    .record(&format!("Iteration {iteration} Response"), &message);
                if let Some(observer) = &self.observer {
                    observer.on_assistant(&message);
                }
                messages.push(message);

                if response.has_tool_calls() {
                    LoopState::Dispatching(response.tool_calls)
                } else {
                    LoopState::Terminal(StopReason::Completed)
                }
            }
            Err(e) if e.is_context_overflow() => {
                warn!(iteration, error = %e, "context limit exceeded, self-healing");
                LoopState::SelfHealing
            }
            Err(e) => {
                error!(iteration, error = %e, "backend call failed");
                self.log.record(
                    &format!("Iteration {iteration} Error"),
                    &json!({
                        "kind": format!("{:?}", e.kind),
                        "status": e.status,
                        "code": e.code,
                        "message": e.message,
                    }),
                );
                LoopState::Terminal(StopReason::BackendError(e))
            }
        }
    }

    /// Run every call of the turn concurrently; results keep call order.
    async fn dispatch(&self, iteration: u32, calls: &[ToolCall], messages: &mut Vec<Message>) {
        info!(iteration, count = calls.len(), "dispatching tool calls");
        if let Some(observer) = &self.observer {
            calls.iter().for_each(|c| observer.on_tool_call(c));
        }

        let budget = self.settings.tool_result_budget;
        let results = join_all(calls.iter().map(|call| async move {
            let raw = self
                .tools
                .execute(&call.function.name, &call.function.arguments)
                .await;
            truncate_output(&raw, budget)
        }))
        .await;

        let tool_messages: Vec<Message> = calls
            .iter()
            .zip(results)
            .map(|(call, result)| {
                debug!(tool = %call.function.name, result = %truncate_string(&result, 200), "tool result");
                if let Some(observer) = &self.observer {
                    observer.on_tool_result(call, &result);
                }
                Message::tool_result(&call.id, result)
            })
            .collect();

        self.log
            .record(&format!("Iteration {iteration} Tool Results"), &tool_messages);
        messages.extend(tool_messages);
    }

    /// Keep message[0], drop the rest, explain the reset to the model.
    fn self_heal(&self, iteration: u32, messages: &mut Vec<Message>) {
        messages.truncate(1);
        messages.push(Message::system(SELF_HEAL_NOTICE));
        self.log.record(
            &format!("Iteration {iteration} Self-Healing"),
            &json!({ "action": "Context Cleared" }),
        );
        if let Some(observer) = &self.observer {
            observer.on_self_heal();
        }
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::base::{Capability, Tool};
    use crate::tools::schema::ParamSpec;
    use crate::tools::registry::ToolsSettings;
    use crate::workspace::Workspace;
    use async_trait::async_trait;
    use nanox_core::types::LlmResponse;
    use nanox_providers::ProviderErrorKind;
    use serde_json::Value;
    use std::collections::HashMap;

    /// A mock LLM provider that returns canned responses and records requests.
    struct MockProvider {
        responses: std::sync::Mutex<Vec<Result<LlmResponse, ProviderError>>>,
        seen: std::sync::Mutex<Vec<Vec<Message>>>,
    }

    impl MockProvider {
        fn new(responses: Vec<Result<LlmResponse, ProviderError>>) -> Self {
            Self {
                responses: std::sync::Mutex::new(responses),
                seen: std::sync::Mutex::new(Vec::new()),
            }
        }

        fn simple(text: &str) -> Self {
            Self::new(vec![Ok(LlmResponse::text(text))])
        }

        fn calls(&self) -> usize {
            self.seen.lock().unwrap().len()
        }

        fn request(&self, n: usize) -> Vec<Message> {
            self.seen.lock().unwrap()[n].clone()
        }
    }

    #[async_trait]
    impl LlmProvider for MockProvider {
        async fn chat(
            &self,
            messages: &[Message],
            _tools: Option<&[ToolDefinition]>,
            _model: &str,
            _config: &LlmRequestConfig,
        ) -> Result<LlmResponse, ProviderError> {
            self.seen.lock().unwrap().push(messages.to_vec());
            let mut responses = self.responses.lock().unwrap();
            if responses.is_empty() {
                Ok(LlmResponse::text("(no more responses)"))
            } else {
                responses.remove(0)
            }
        }

        fn default_model(&self) -> &str {
            "mock-model"
        }

        fn display_name(&self) -> &str {
            "MockProvider"
        }
    }

    struct EchoTool;

    #[async_trait]
    impl Tool for EchoTool {
        fn name(&self) -> &str {
            "echo"
        }
        fn description(&self) -> &str {
            "Echoes text"
        }
        fn capability(&self) -> Capability {
            Capability::Shell
        }
        fn params(&self) -> Vec<ParamSpec> {
            vec![ParamSpec::string("text", "Text")]
        }
        async fn execute(&self, params: HashMap<String, Value>) -> anyhow::Result<String> {
            Ok(params["text"].as_str().unwrap_or_default().to_string())
        }
    }

    fn overflow() -> ProviderError {
        ProviderError {
            kind: ProviderErrorKind::ContextOverflow,
            status: Some(400),
            code: Some("context_length_exceeded".into()),
            message: "too long".into(),
        }
    }

    fn tool_turn(calls: Vec<ToolCall>) -> Result<LlmResponse, ProviderError> {
        Ok(LlmResponse::with_tool_calls(calls))
    }

    fn echo_call(id: &str, text: &str) -> ToolCall {
        ToolCall::new(id, "echo", json!({ "text": text }).to_string())
    }

    fn settings(max_iterations: u32, budget: usize) -> LoopSettings {
        LoopSettings {
            model: "mock-model".into(),
            max_iterations,
            tool_result_budget: budget,
            request: LlmRequestConfig::default(),
        }
    }

    fn create_test_loop(
        tmp: &tempfile::TempDir,
        provider: Arc<MockProvider>,
        tools: ToolRegistry,
        settings: LoopSettings,
    ) -> AgentLoop {
        let context = ContextBuilder::new(Workspace::new(tmp.path().join("workspace")), "nanox", 3000);
        let log = InteractionLog::new(tmp.path().join("agent_interaction"));
        AgentLoop::new(provider, tools, context, settings, log)
    }

    fn echo_registry() -> ToolRegistry {
        let mut reg = ToolRegistry::new();
        reg.register(Arc::new(EchoTool));
        reg
    }

    #[tokio::test]
    async fn test_simple_completion() {
        let tmp = tempfile::tempdir().unwrap();
        let provider = Arc::new(MockProvider::simple("Hello from nanox!"));
        let agent = create_test_loop(&tmp, provider.clone(), echo_registry(), settings(10, 5000));

        let outcome = agent.run(agent.initial_messages(), Some("Hi")).await;
        assert!(matches!(outcome.stop, StopReason::Completed));
        assert_eq!(outcome.final_text(), Some("Hello from nanox!"));
        assert_eq!(outcome.messages.len(), 3);
        assert!(outcome.messages[0].is_system());
        assert_eq!(outcome.messages[1], Message::user("Hi"));
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn test_tool_round_trip_with_builtin_read() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("test.txt"), "file content here").unwrap();

        let provider = Arc::new(MockProvider::new(vec![
            tool_turn(vec![ToolCall::new(
                "call_1",
                "fs_read_file",
                r#"{"path": "test.txt"}"#,
            )]),
            Ok(LlmResponse::text("The file says hello")),
        ]));
        let tools = ToolRegistry::builtin(&ToolsSettings::from_config(
            &Config::default(),
            tmp.path().to_path_buf(),
            Workspace::new(tmp.path().join("workspace")),
            None,
        ));
        let agent = create_test_loop(&tmp, provider.clone(), tools, settings(10, 5000));

        let outcome = agent.run(agent.initial_messages(), Some("Read test.txt")).await;
        assert_eq!(outcome.final_text(), Some("The file says hello"));

        // system, user, assistant(tool call), tool, assistant
        assert_eq!(outcome.messages.len(), 5);
        assert_eq!(outcome.messages[2].tool_calls()[0].id, "call_1");
        match &outcome.messages[3] {
            Message::Tool { content, tool_call_id } => {
                assert_eq!(tool_call_id, "call_1");
                assert!(content.starts_with("file content here\n\nTotal lines: 1"));
            }
            other => panic!("expected tool message, got {other:?}"),
        }
        assert_eq!(provider.request(1).len(), 4);
    }

    #[tokio::test]
    async fn test_parallel_calls_keep_order() {
        let tmp = tempfile::tempdir().unwrap();
        let provider = Arc::new(MockProvider::new(vec![
            tool_turn(vec![
                echo_call("a", "first"),
                ToolCall::new("b", "missing_tool", "{}"),
                echo_call("c", "third"),
            ]),
            Ok(LlmResponse::text("done")),
        ]));
        let agent = create_test_loop(&tmp, provider, echo_registry(), settings(10, 5000));

        let outcome = agent.run(agent.initial_messages(), Some("go")).await;
        let tool_messages: Vec<_> = outcome.messages[3..6]
            .iter()
            .map(|m| match m {
                Message::Tool { content, tool_call_id } => (tool_call_id.as_str(), content.as_str()),
                other => panic!("expected tool message, got {other:?}"),
            })
            .collect();
        assert_eq!(
            tool_messages,
            vec![
                ("a", "first"),
                ("b", "Error: Unknown tool 'missing_tool'"),
                ("c", "third"),
            ]
        );
        assert_eq!(outcome.final_text(), Some("done"));
    }

    #[tokio::test]
    async fn test_invalid_arguments_become_text() {
        let tmp = tempfile::tempdir().unwrap();
        let provider = Arc::new(MockProvider::new(vec![
            tool_turn(vec![ToolCall::new("x", "echo", "{broken")]),
            Ok(LlmResponse::text("recovered")),
        ]));
        let agent = create_test_loop(&tmp, provider, echo_registry(), settings(10, 5000));

        let outcome = agent.run(agent.initial_messages(), Some("go")).await;
        assert!(outcome.messages[3]
            .text()
            .unwrap()
            .starts_with("Error: Invalid arguments for echo:"));
        assert_eq!(outcome.final_text(), Some("recovered"));
    }

    #[tokio::test]
    async fn test_tool_results_truncated_to_budget() {
        let tmp = tempfile::tempdir().unwrap();
        let long = "x".repeat(500);
        let provider = Arc::new(MockProvider::new(vec![
            tool_turn(vec![echo_call("a", &long)]),
            Ok(LlmResponse::text("ok")),
        ]));
        let agent = create_test_loop(&tmp, provider, echo_registry(), settings(10, 100));

        let outcome = agent.run(agent.initial_messages(), Some("go")).await;
        let content = outcome.messages[3].text().unwrap();
        assert!(content.starts_with(&"x".repeat(50)));
        assert!(content.ends_with(&"x".repeat(50)));
        assert!(content.contains("[Output truncated]"));
        assert!(content.contains("400 characters removed"));
    }

    #[tokio::test]
    async fn test_self_heal_then_complete() {
        let tmp = tempfile::tempdir().unwrap();
        let provider = Arc::new(MockProvider::new(vec![
            tool_turn(vec![echo_call("a", "big output")]),
            Err(overflow()),
            Ok(LlmResponse::text("retried")),
        ]));
        let agent = create_test_loop(&tmp, provider.clone(), echo_registry(), settings(10, 5000));

        let initial = agent.initial_messages();
        let outcome = agent.run(initial, Some("do it")).await;
        assert_eq!(outcome.final_text(), Some("retried"));
        assert_eq!(provider.calls(), 3);

        // The retry sees only the kept system prompt and the notice.
        let retry = provider.request(2);
        assert_eq!(retry.len(), 2);
        assert_eq!(retry[0], outcome.messages[0]);
        assert_eq!(retry[1], Message::system(SELF_HEAL_NOTICE));
        assert_eq!(outcome.messages.len(), 3);
    }

    #[tokio::test]
    async fn test_self_heal_consumes_iterations() {
        let tmp = tempfile::tempdir().unwrap();
        let provider = Arc::new(MockProvider::new(vec![Err(overflow()), Err(overflow()), Err(overflow())]));
        let agent = create_test_loop(&tmp, provider.clone(), echo_registry(), settings(2, 5000));

        let outcome = agent.run(agent.initial_messages(), Some("go")).await;
        assert!(matches!(outcome.stop, StopReason::IterationLimit));
        assert_eq!(provider.calls(), 2);
        assert_eq!(outcome.messages.last(), Some(&Message::system(SELF_HEAL_NOTICE)));
    }

    #[tokio::test]
    async fn test_backend_error_is_terminal() {
        let tmp = tempfile::tempdir().unwrap();
        let provider = Arc::new(MockProvider::new(vec![Err(ProviderError {
            kind: ProviderErrorKind::Auth,
            status: Some(401),
            code: None,
            message: "bad key".into(),
        })]));
        let agent = create_test_loop(&tmp, provider.clone(), echo_registry(), settings(10, 5000));

        let outcome = agent.run(agent.initial_messages(), Some("hello")).await;
        match &outcome.stop {
            StopReason::BackendError(e) => assert_eq!(e.kind, ProviderErrorKind::Auth),
            other => panic!("expected backend error, got {other:?}"),
        }
        assert_eq!(outcome.final_text(), None);
        // Partial history preserved.
        assert_eq!(outcome.messages.len(), 2);
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn test_iteration_limit() {
        let tmp = tempfile::tempdir().unwrap();
        let responses = (0..10)
            .map(|i| tool_turn(vec![echo_call(&format!("c{i}"), "again")]))
            .collect();
        let provider = Arc::new(MockProvider::new(responses));
        let agent = create_test_loop(&tmp, provider.clone(), echo_registry(), settings(3, 5000));

        let outcome = agent.run(agent.initial_messages(), Some("loop")).await;
        assert!(matches!(outcome.stop, StopReason::IterationLimit));
        assert_eq!(provider.calls(), 3);
        // system + user + 3 × (assistant + tool)
        assert_eq!(outcome.messages.len(), 8);

        let log_file = agent.log.current_file().unwrap();
        let text = std::fs::read_to_string(log_file).unwrap();
        assert!(text.contains("=== Iteration 3 Max Iterations ==="));
        assert!(!text.contains("Iteration 4 Request"));
    }

    #[tokio::test]
    async fn test_system_prompt_refreshed_with_input() {
        let tmp = tempfile::tempdir().unwrap();
        let provider = Arc::new(MockProvider::new(vec![
            Ok(LlmResponse::text("one")),
            Ok(LlmResponse::text("two")),
        ]));
        let agent = create_test_loop(&tmp, provider.clone(), echo_registry(), settings(10, 5000));

        let initial = agent.initial_messages();
        assert!(!initial[0].text().unwrap().contains("# Active Skill Context"));

        let first = agent.run(initial, Some("please review my code")).await;
        assert!(first.messages[0].text().unwrap().contains("# Active Skill Context"));

        let second = agent.run(first.messages, Some("thanks")).await;
        assert!(!second.messages[0].text().unwrap().contains("# Active Skill Context"));
        assert_eq!(second.messages.len(), 5);
        assert_eq!(provider.request(1).len(), 4);
    }

    #[tokio::test]
    async fn test_run_without_input_keeps_history() {
        let tmp = tempfile::tempdir().unwrap();
        let provider = Arc::new(MockProvider::simple("continued"));
        let agent = create_test_loop(&tmp, provider, echo_registry(), settings(10, 5000));

        let history = vec![Message::system("custom prompt"), Message::user("earlier")];
        let outcome = agent.run(history, None).await;
        assert_eq!(outcome.messages[0], Message::system("custom prompt"));
        assert_eq!(outcome.messages.len(), 3);
    }

    #[tokio::test]
    async fn test_interaction_log_steps() {
        let tmp = tempfile::tempdir().unwrap();
        let provider = Arc::new(MockProvider::new(vec![
            tool_turn(vec![echo_call("a", "hi")]),
            Err(overflow()),
            Ok(LlmResponse::text("bye")),
        ]));
        let agent = create_test_loop(&tmp, provider, echo_registry(), settings(10, 5000));
        agent.run(agent.initial_messages(), Some("go")).await;

        let log_file = tmp
            .path()
            .join("agent_interaction")
            .join(format!("session_{}.log", nanox_core::utils::today_date()));
        let text = std::fs::read_to_string(log_file).unwrap();
        let steps = [
            "=== Iteration 1 Request ===",
            "=== Iteration 1 Response ===",
            "=== Iteration 1 Tool Results ===",
            "=== Iteration 2 Request ===",
            "=== Iteration 2 Self-Healing ===",
            "=== Iteration 3 Request ===",
            "=== Iteration 3 Response ===",
        ];
        let mut last = 0;
        for step in steps {
            let at = text[last..].find(step).unwrap_or_else(|| panic!("missing {step}"));
            last += at + step.len();
        }
    }

    #[derive(Default)]
    struct RecordingObserver {
        events: std::sync::Mutex<Vec<String>>,
    }

    impl LoopObserver for RecordingObserver {
        fn on_assistant(&self, message: &Message) {
            let text = message.text().unwrap_or("<tools>").to_string();
            self.events.lock().unwrap().push(format!("assistant:{text}"));
        }
        fn on_tool_call(&self, call: &ToolCall) {
            self.events.lock().unwrap().push(format!("call:{}", call.function.name));
        }
        fn on_tool_result(&self, call: &ToolCall, result: &str) {
            self.events.lock().unwrap().push(format!("result:{}={result}", call.id));
        }
        fn on_self_heal(&self) {
            self.events.lock().unwrap().push("heal".into());
        }
    }

    #[tokio::test]
    async fn test_observer_sees_progress() {
        let tmp = tempfile::tempdir().unwrap();
        let provider = Arc::new(MockProvider::new(vec![
            tool_turn(vec![echo_call("a", "ping")]),
            Ok(LlmResponse::text("pong")),
        ]));
        let observer = Arc::new(RecordingObserver::default());
        let agent = create_test_loop(&tmp, provider, echo_registry(), settings(10, 5000))
            .with_observer(observer.clone());

        agent.run(agent.initial_messages(), Some("go")).await;
        assert_eq!(
            *observer.events.lock().unwrap(),
            vec!["assistant:<tools>", "call:echo", "result:a=ping", "assistant:pong"]
        );
    }

    #[test]
    fn test_settings_from_config() {
        let cfg = Config::default();
        let s = LoopSettings::from_config(&cfg);
        assert_eq!(s.model, "moonshot-v1-8k");
        assert_eq!(s.max_iterations, 10);
        assert_eq!(s.tool_result_budget, 5000);
        assert_eq!(s.request.max_tokens, 4096);
    }
}
