//! Agent loop between the model and the connected tools
//!
//! One `send_message` call alternates model requests with tool executions
//! until the model answers in plain text, repeats a call it already made,
//! or the round limit is reached.

mod error;

pub use error::{OrchestratorError, OrchestratorResult};

use std::collections::HashSet;
use std::sync::Arc;

use serde_json::{json, Value};

use crate::config::ConfigurationHolder;
use crate::{log_debug, log_info, log_warn};
use crate::logging::Logger;
use crate::providers::{ChatOptions, ChatResponse, Provider, ProviderModelConfig, ResponseContent};
use crate::tools::{ToolConnectionRegistry, ToolInvoker};
use crate::types::{ChatMessage, ContentBlock, ConversationMessage, MessageRole, ToolCall};

const SUMMARY_PROMPT: &str = "Please summarize your findings so far and answer the question.";

fn repeat_notice(tool: &str) -> String {
    format!(
        "I've already called {} with these arguments, so I'll stop here to avoid repeating myself.",
        tool
    )
}

/// How a model round ended
enum RoundOutcome {
    /// Plain answer; the conversation is done
    Answered,
    /// At least one tool ran; ask the model again
    ToolsCalled,
    /// The model asked for a call it already made
    Repeated,
}

/// Accumulates everything one `send_message` call produces
struct Turn {
    /// Model-facing history, starting from the caller's messages
    messages: Vec<ChatMessage>,
    /// Blocks of the assistant message being built
    output: Vec<ContentBlock>,
    /// `(tool, serialized args)` pairs already invoked
    invoked: HashSet<(String, String)>,
    used_tools: bool,
}

impl Turn {
    fn new(history: &[ConversationMessage]) -> Self {
        Self {
            messages: history
                .iter()
                .filter_map(ConversationMessage::to_chat_message)
                .collect(),
            output: Vec::new(),
            invoked: HashSet::new(),
            used_tools: false,
        }
    }

    /// Move pending round text into the output, returning it joined
    fn flush(&mut self, pending: &mut Vec<String>) -> String {
        let said = pending.join("\n");
        self.output
            .extend(pending.drain(..).map(ContentBlock::text));
        said
    }
}

/// Drives the conversation loop for a chat front-end
pub struct ConversationOrchestrator {
    provider: Arc<dyn Provider>,
    invoker: ToolInvoker,
    config: Arc<ConfigurationHolder>,
    max_iterations: Option<usize>,
    logger: Arc<dyn Logger>,
}

impl ConversationOrchestrator {
    pub fn new(
        provider: Arc<dyn Provider>,
        registry: Arc<ToolConnectionRegistry>,
        config: Arc<ConfigurationHolder>,
        logger: Arc<dyn Logger>,
    ) -> Self {
        Self {
            provider,
            invoker: ToolInvoker::new(registry, Arc::clone(&logger)),
            config,
            max_iterations: None,
            logger,
        }
    }

    /// Override the configured round limit
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = Some(max_iterations);
        self
    }

    pub fn invoker(&self) -> &ToolInvoker {
        &self.invoker
    }

    /// Produce the assistant's reply to `history`.
    ///
    /// Tool failures become error results in the transcript. A failed model
    /// call aborts the whole reply and nothing partial is returned.
    pub async fn send_message(
        &self,
        history: &[ConversationMessage],
    ) -> OrchestratorResult<ConversationMessage> {
        let settings = self.config.snapshot();
        let model = ProviderModelConfig::from(&settings);
        let max_iterations = self.max_iterations.unwrap_or(settings.max_iterations);
        let base_options = ChatOptions::new().with_max_tokens(settings.max_tokens);

        let mut turn = Turn::new(history);
        let original = turn.messages.clone();
        let mut rounds = 0usize;

        loop {
            let tools = self.invoker.available_tools();
            let options = if tools.is_empty() {
                base_options.clone()
            } else {
                base_options.clone().with_tools(tools)
            };

            log_debug!(
                self.logger,
                "[Orchestrator] Requesting model (round {}, {} message(s))",
                rounds + 1,
                turn.messages.len()
            );
            let response = self
                .provider
                .chat(turn.messages.clone(), model.clone(), options)
                .await?;

            match self.interpret(&mut turn, response).await {
                RoundOutcome::Answered | RoundOutcome::Repeated => break,
                RoundOutcome::ToolsCalled => {
                    rounds += 1;
                    if rounds >= max_iterations {
                        log_warn!(
                            self.logger,
                            "[Orchestrator] Reached {} tool round(s), asking for a summary",
                            max_iterations
                        );
                        let summary = self.summarize(history, &model, &base_options).await?;
                        turn.output.extend(summary.texts().map(ContentBlock::text));
                        break;
                    }
                }
            }
        }

        if turn.output.is_empty() && !turn.used_tools {
            self.logger
                .warn("[Orchestrator] Model returned nothing, retrying without tools");
            let response = self
                .provider
                .chat(original, model, base_options)
                .await?;
            turn.output.extend(response.texts().map(ContentBlock::text));
        }

        Ok(ConversationMessage::assistant(turn.output))
    }

    /// Walk one response in order, running each new tool request
    async fn interpret(&self, turn: &mut Turn, response: ChatResponse) -> RoundOutcome {
        let mut pending: Vec<String> = Vec::new();
        let mut called = false;

        for item in response.content {
            match item {
                ResponseContent::Text(text) => pending.push(text),
                ResponseContent::ToolUse(call) => {
                    let said = turn.flush(&mut pending);
                    if !turn.invoked.insert(call.dedup_key()) {
                        log_info!(
                            self.logger,
                            "[Orchestrator] Model repeated a call to '{}', stopping",
                            call.name
                        );
                        turn.output.push(ContentBlock::tool_use(&call.name, call.input.clone()));
                        turn.output.push(ContentBlock::text(repeat_notice(&call.name)));
                        return RoundOutcome::Repeated;
                    }
                    called = true;
                    turn.used_tools = true;
                    self.execute(turn, call, said).await;
                }
            }
        }

        let said = turn.flush(&mut pending);
        if !said.is_empty() {
            turn.messages.push(ChatMessage::assistant(said));
        }
        if called {
            RoundOutcome::ToolsCalled
        } else {
            RoundOutcome::Answered
        }
    }

    /// Run one tool and record both the call and its outcome
    async fn execute(&self, turn: &mut Turn, call: ToolCall, said: String) {
        let ToolCall { name, input, .. } = call;
        turn.output.push(ContentBlock::tool_use(&name, input.clone()));

        let preface = if said.is_empty() {
            format!("Calling tool {}", name)
        } else {
            said
        };
        turn.messages.push(ChatMessage::assistant(preface));

        match self.invoker.invoke(&name, input.clone()).await {
            Ok(result) => {
                turn.messages.push(ChatMessage::user(format!(
                    "Tool {} returned: {}",
                    name, result
                )));
                turn.output.push(ContentBlock::tool_result(name, input, result));
            }
            Err(e) => {
                log_warn!(self.logger, "[Orchestrator] Tool '{}' failed: {}", name, e);
                let message = e.to_string();
                turn.messages.push(ChatMessage::user(format!(
                    "Tool {} failed: {}",
                    name, message
                )));
                let result: Value = json!({ "error": message });
                turn.output.push(ContentBlock::tool_result(name, input, result));
            }
        }
    }

    /// Tool-less request built only from the question the user asked
    async fn summarize(
        &self,
        history: &[ConversationMessage],
        model: &ProviderModelConfig,
        options: &ChatOptions,
    ) -> OrchestratorResult<ChatResponse> {
        let question = history
            .iter()
            .rev()
            .find(|m| m.role == MessageRole::User)
            .map(|m| m.texts().collect::<Vec<_>>().join("\n"))
            .unwrap_or_default();
        let prompt = if question.is_empty() {
            SUMMARY_PROMPT.to_string()
        } else {
            format!("{}\n\n{}", question, SUMMARY_PROMPT)
        };

        let response = self
            .provider
            .chat(vec![ChatMessage::user(prompt)], model.clone(), options.clone())
            .await?;
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use crate::logging::NoOpLogger;
    use crate::providers::{ProviderError, ScriptedProvider, ScriptedReply};
    use crate::tools::testing::{configs, FakeConnector, FakeSession};
    use crate::tools::{ConnectOptions, FixedBackoff};
    use crate::types::MessageContent;

    fn logger() -> Arc<dyn Logger> {
        Arc::new(NoOpLogger::new())
    }

    async fn registry_with(sessions: Vec<(&str, Arc<FakeSession>)>) -> Arc<ToolConnectionRegistry> {
        let names: Vec<&str> = sessions.iter().map(|(name, _)| *name).collect();
        let connector = sessions
            .iter()
            .fold(FakeConnector::new(), |c, (name, session)| c.serve(name, Arc::clone(session)));
        let registry = ToolConnectionRegistry::new(Arc::new(connector), logger())
            .with_backoff(Arc::new(FixedBackoff::none()));
        registry.install_configs(configs(&names));
        for name in &names {
            registry.connect(name, &ConnectOptions::default()).await.unwrap();
        }
        Arc::new(registry)
    }

    fn orchestrator(provider: Arc<ScriptedProvider>, registry: Arc<ToolConnectionRegistry>) -> ConversationOrchestrator {
        ConversationOrchestrator::new(provider, registry, ConfigurationHolder::shared(Settings::default()), logger())
    }

    fn question(text: &str) -> Vec<ConversationMessage> {
        vec![ConversationMessage::user(text)]
    }

    fn add_call(id: &str, a: i64, b: i64) -> ChatResponse {
        ChatResponse::tool_use(ToolCall::new(id, "add", json!({"a": a, "b": b})))
    }

    #[tokio::test]
    async fn test_plain_answer_without_tools() {
        let provider = Arc::new(ScriptedProvider::new([ChatResponse::text("4")]));
        let orchestrator = orchestrator(provider.clone(), registry_with(vec![]).await);

        let reply = orchestrator.send_message(&question("What's 2+2?")).await.unwrap();

        assert_eq!(reply.role, MessageRole::Assistant);
        assert_eq!(reply.content, vec![ContentBlock::text("4")]);
        let requests = provider.requests();
        assert_eq!(requests.len(), 1);
        assert!(requests[0].options.tools.is_none());
        assert_eq!(requests[0].options.max_tokens, Some(1000));
        assert_eq!(requests[0].messages, vec![ChatMessage::user("What's 2+2?")]);
    }

    #[tokio::test]
    async fn test_tool_round_then_answer() {
        let session = Arc::new(FakeSession::with_tools(&["add"]).returning("add", json!(4)));
        let registry = registry_with(vec![("math", session.clone())]).await;
        let provider = Arc::new(ScriptedProvider::new([add_call("call_1", 2, 2), ChatResponse::text("4")]));
        let orchestrator = orchestrator(provider.clone(), registry);

        let reply = orchestrator.send_message(&question("What's 2+2?")).await.unwrap();

        let args = json!({"a": 2, "b": 2});
        assert_eq!(
            reply.content,
            vec![
                ContentBlock::tool_use("add", args.clone()),
                ContentBlock::tool_result("add", args.clone(), json!(4)),
                ContentBlock::text("4"),
            ]
        );
        assert_eq!(session.calls(), vec![("add".to_string(), args)]);

        let requests = provider.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].options.tools.as_ref().map(Vec::len), Some(1));
        assert_eq!(
            requests[1].messages,
            vec![
                ChatMessage::user("What's 2+2?"),
                ChatMessage::assistant("Calling tool add"),
                ChatMessage::user("Tool add returned: 4"),
            ]
        );
    }

    #[tokio::test]
    async fn test_round_text_precedes_tool_use() {
        let session = Arc::new(FakeSession::with_tools(&["add"]).returning("add", json!(4)));
        let registry = registry_with(vec![("math", session)]).await;
        let first = ChatResponse::new(vec![
            ResponseContent::Text("Let me add those.".into()),
            ResponseContent::ToolUse(ToolCall::new("c1", "add", json!({"a": 2, "b": 2}))),
        ]);
        let provider = Arc::new(ScriptedProvider::new([first, ChatResponse::text("It's 4.")]));
        let orchestrator = orchestrator(provider.clone(), registry);

        let reply = orchestrator.send_message(&question("2+2?")).await.unwrap();

        assert_eq!(reply.content[0], ContentBlock::text("Let me add those."));
        assert!(matches!(reply.content[1], ContentBlock::ToolUse { .. }));
        assert_eq!(reply.content.last(), Some(&ContentBlock::text("It's 4.")));
        assert_eq!(provider.requests()[1].messages[1], ChatMessage::assistant("Let me add those."));
    }

    #[tokio::test]
    async fn test_repeated_call_stops_the_loop() {
        let session = Arc::new(FakeSession::with_tools(&["add"]).returning("add", json!(2)));
        let registry = registry_with(vec![("math", session.clone())]).await;
        let provider = Arc::new(ScriptedProvider::new([add_call("c1", 1, 1), add_call("c2", 1, 1)]));
        let orchestrator = orchestrator(provider.clone(), registry);

        let reply = orchestrator.send_message(&question("1+1?")).await.unwrap();

        assert_eq!(session.calls().len(), 1);
        assert_eq!(provider.call_count(), 2);
        let args = json!({"a": 1, "b": 1});
        assert_eq!(
            reply.content,
            vec![
                ContentBlock::tool_use("add", args.clone()),
                ContentBlock::tool_result("add", args.clone(), json!(2)),
                ContentBlock::tool_use("add", args),
                ContentBlock::text(repeat_notice("add")),
            ]
        );
    }

    #[tokio::test]
    async fn test_iteration_cap_forces_summary() {
        let session = Arc::new(FakeSession::with_tools(&["add"]));
        let registry = registry_with(vec![("math", session.clone())]).await;
        let provider = Arc::new(ScriptedProvider::from_fn(|index, _messages, options| {
            if options.has_tools() {
                Ok(add_call(&format!("c{index}"), index as i64, 1))
            } else {
                Ok(ChatResponse::text("Here is what I found."))
            }
        }));
        let orchestrator = orchestrator(provider.clone(), registry).with_max_iterations(3);

        let reply = orchestrator.send_message(&question("Keep adding")).await.unwrap();

        assert_eq!(session.calls().len(), 3);
        let requests = provider.requests();
        assert_eq!(requests.len(), 4);
        let summary = &requests[3];
        assert!(summary.options.tools.is_none());
        assert_eq!(summary.messages.len(), 1);
        let prompt = summary.messages[0].joined_text();
        assert!(prompt.starts_with("Keep adding"));
        assert!(prompt.ends_with(SUMMARY_PROMPT));
        assert_eq!(reply.content.last(), Some(&ContentBlock::text("Here is what I found.")));
    }

    #[tokio::test]
    async fn test_configured_iteration_limit_applies() {
        let session = Arc::new(FakeSession::with_tools(&["add"]));
        let registry = registry_with(vec![("math", session.clone())]).await;
        let provider = Arc::new(ScriptedProvider::from_fn(|index, _messages, options| {
            if options.has_tools() {
                Ok(add_call(&format!("c{index}"), index as i64, 0))
            } else {
                Ok(ChatResponse::text("done"))
            }
        }));
        let config = ConfigurationHolder::shared(Settings::default());
        config.update(|s| s.max_iterations = 2);
        let orchestrator = ConversationOrchestrator::new(provider.clone(), registry, config, logger());

        orchestrator.send_message(&question("go")).await.unwrap();

        assert_eq!(session.calls().len(), 2);
        assert_eq!(provider.call_count(), 3);
    }

    #[tokio::test]
    async fn test_tool_failure_is_folded_into_transcript() {
        let session = Arc::new(FakeSession::with_tools(&["div"]).failing_call("div", "division by zero"));
        let registry = registry_with(vec![("math", session)]).await;
        let provider = Arc::new(ScriptedProvider::new([
            ChatResponse::tool_use(ToolCall::new("c1", "div", json!({"a": 1, "b": 0}))),
            ChatResponse::text("That can't be computed."),
        ]));
        let orchestrator = orchestrator(provider.clone(), registry);

        let reply = orchestrator.send_message(&question("1/0?")).await.unwrap();

        match &reply.content[1] {
            ContentBlock::ToolResult { name, result, .. } => {
                assert_eq!(name, "div");
                let error = result["error"].as_str().unwrap_or_default();
                assert!(error.contains("division by zero"));
            }
            other => panic!("expected tool result, got {other:?}"),
        }
        let history = &provider.requests()[1].messages;
        assert!(history[2].joined_text().starts_with("Tool div failed:"));
        assert_eq!(reply.content.last(), Some(&ContentBlock::text("That can't be computed.")));
    }

    #[tokio::test]
    async fn test_unknown_tool_request_is_folded_into_transcript() {
        let registry = registry_with(vec![("math", Arc::new(FakeSession::with_tools(&["add"])))]).await;
        let provider = Arc::new(ScriptedProvider::new([
            ChatResponse::tool_use(ToolCall::new("c1", "search", json!({"q": "rust"}))),
            ChatResponse::text("No search available."),
        ]));
        let orchestrator = orchestrator(provider, registry);

        let reply = orchestrator.send_message(&question("search rust")).await.unwrap();

        assert!(matches!(
            &reply.content[1],
            ContentBlock::ToolResult { result, .. } if result["error"].as_str().is_some_and(|e| e.contains("search"))
        ));
    }

    #[tokio::test]
    async fn test_model_error_propagates() {
        let provider = Arc::new(ScriptedProvider::with_replies([ScriptedReply::Error("overloaded".into())]));
        let orchestrator = orchestrator(provider, registry_with(vec![]).await);

        let err = orchestrator.send_message(&question("hi")).await.unwrap_err();
        assert!(matches!(err, OrchestratorError::Model(ProviderError::ApiError { .. })));
    }

    #[tokio::test]
    async fn test_empty_response_falls_back_to_plain_request() {
        let provider = Arc::new(ScriptedProvider::new([ChatResponse::default(), ChatResponse::text("Hello!")]));
        let registry = registry_with(vec![("math", Arc::new(FakeSession::with_tools(&["add"])))]).await;
        let orchestrator = orchestrator(provider.clone(), registry);

        let reply = orchestrator.send_message(&question("hi")).await.unwrap();

        assert_eq!(reply.content, vec![ContentBlock::text("Hello!")]);
        let requests = provider.requests();
        assert_eq!(requests.len(), 2);
        assert!(requests[0].options.has_tools());
        assert!(requests[1].options.tools.is_none());
        assert_eq!(requests[1].messages, requests[0].messages);
    }

    #[tokio::test]
    async fn test_history_collapses_to_text() {
        let provider = Arc::new(ScriptedProvider::new([ChatResponse::text("ok")]));
        let orchestrator = orchestrator(provider.clone(), registry_with(vec![]).await);
        let history = vec![
            ConversationMessage::user("first"),
            ConversationMessage::assistant(vec![
                ContentBlock::tool_use("add", json!({})),
                ContentBlock::tool_result("add", json!({}), json!(0)),
            ]),
            ConversationMessage::new(
                MessageRole::User,
                vec![ContentBlock::text("a"), ContentBlock::text("b")],
            ),
        ];

        orchestrator.send_message(&history).await.unwrap();

        let sent = &provider.requests()[0].messages;
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].content, MessageContent::Text("first".into()));
        assert!(matches!(&sent[1].content, MessageContent::Blocks(blocks) if blocks.len() == 2));
    }
}
