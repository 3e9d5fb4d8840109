//! ReAct pattern: Thought → Action → Observation, as an explicit state machine.
//!
//! ```text
//!            ┌──────────── ANSWER: / plain text ───────────┐
//!            │                                             ▼
//!  THINKING ─┼─ tool call ─▶ ACTING ─▶ OBSERVING ─▶ THINKING ...   DONE
//!            │
//!            └─ step budget spent ─▶ FAILED (ReasoningExhausted + partial trace)
//! ```
//!
//! # Signals
//!
//! - A native function call is an action.
//! - Text containing `ANSWER:` is the final answer (the text after the marker).
//! - Text containing `TOOL:` is a textual action against the retrieval tool.
//! - Any other non-empty text ends the run with that text (degraded completion).
//!
//! Every THINKING round costs one step. Invalid calls are never executed;
//! they come back as error observations. Only model failures abort a run.

use folio_core::error::ToolError;
use folio_core::message::Message;
use folio_core::provider::{PromptRole, PromptTurn, ProviderResponse};
use folio_core::tool::{Observation, ToolCall, ToolRegistry};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::context::history;
use crate::model::ModelClient;
use crate::selector::single_call;

pub const DEFAULT_MAX_STEPS: usize = 3;

pub const REACT_PROMPT: &str = "You are an AI assistant with access to document search capabilities. \
Based on the current information, decide if you have enough to answer the user query, \
or if you need more information. \
If you have enough information, respond with 'ANSWER: <your answer>'. \
If you need more information, respond with 'TOOL: <question for the tool>'. \
Keep the question concise.";

const ANSWER_MARKER: &str = "ANSWER:";
const TOOL_MARKER: &str = "TOOL:";

/// Observation recorded when a round yields neither an action nor any text.
pub const UNCLEAR_DECISION: &str = "Unable to determine next action.";

/// What the user sees when the step budget runs out.
pub const EXHAUSTED_NOTICE: &str = "I couldn't find a definitive answer after exploring the \
available information. Please try rephrasing your question.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReactState {
    Thinking,
    Acting,
    Observing,
    Done,
    Failed,
}

/// One THINKING round and what came of it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReasoningStep {
    pub thought: String,
    /// The executed call. `None` when the round proposed nothing valid.
    pub action: Option<ToolCall>,
    pub observation: Option<Observation>,
}

/// How a DONE run got there.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Termination {
    /// The model gave the final-answer signal.
    Answer,
    /// The model answered in plain text without any signal.
    Degraded,
}

/// The step budget ran out before a final answer.
#[derive(Debug, Clone, thiserror::Error)]
#[error("no final answer after {max_steps} steps")]
pub struct ReasoningExhausted {
    pub max_steps: usize,
    pub trace: Vec<ReasoningStep>,
}

#[derive(Debug, Clone)]
pub enum ReactOutcome {
    Done {
        answer: String,
        termination: Termination,
        trace: Vec<ReasoningStep>,
        steps: usize,
    },
    Failed(ReasoningExhausted),
}

impl ReactOutcome {
    pub fn state(&self) -> ReactState {
        match self {
            Self::Done { .. } => ReactState::Done,
            Self::Failed(_) => ReactState::Failed,
        }
    }

    pub fn trace(&self) -> &[ReasoningStep] {
        match self {
            Self::Done { trace, .. } => trace,
            Self::Failed(exhausted) => &exhausted.trace,
        }
    }

    /// THINKING rounds used.
    pub fn steps(&self) -> usize {
        match self {
            Self::Done { steps, .. } => *steps,
            Self::Failed(exhausted) => exhausted.trace.len(),
        }
    }

    /// Tool calls that were actually executed.
    pub fn tool_invocations(&self) -> usize {
        self.trace().iter().filter(|s| s.action.is_some()).count()
    }

    /// The text to show the user: the answer, or the exhaustion notice.
    pub fn reply(&self) -> &str {
        match self {
            Self::Done { answer, .. } => answer,
            Self::Failed(_) => EXHAUSTED_NOTICE,
        }
    }

    pub fn into_result(self) -> Result<String, folio_core::Error> {
        match self {
            Self::Done { answer, .. } => Ok(answer),
            Self::Failed(exhausted) => Err(folio_core::Error::ReasoningExhausted {
                max_steps: exhausted.max_steps,
            }),
        }
    }
}

/// What the model's response amounts to.
enum Decision {
    Answer(String),
    Degraded(String),
    Act(Result<ToolCall, ToolError>),
    Unclear,
}

pub struct ReactController {
    model: ModelClient,
    registry: Arc<ToolRegistry>,
    /// Tool that `TOOL:` text maps onto.
    retrieval_tool: String,
    max_steps: usize,
}

impl ReactController {
    pub fn new(model: ModelClient, registry: Arc<ToolRegistry>, retrieval_tool: impl Into<String>) -> Self {
        Self {
            model,
            registry,
            retrieval_tool: retrieval_tool.into(),
            max_steps: DEFAULT_MAX_STEPS,
        }
    }

    pub fn with_max_steps(mut self, max: usize) -> Self {
        self.max_steps = max;
        self
    }

    pub fn max_steps(&self) -> usize {
        self.max_steps
    }

    /// Run the loop for `query`, seeded with the session so far.
    ///
    /// Returns `Err` only when the model itself fails or times out.
    pub async fn run(
        &self,
        query: &str,
        session_history: &[Message],
    ) -> Result<ReactOutcome, folio_core::Error> {
        let tool_defs = self.registry.definitions();
        let mut turns = vec![PromptTurn::system(REACT_PROMPT)];
        turns.extend(history::to_turns(session_history));
        turns.push(PromptTurn::user(format!(
            "User query: {query}\nCurrent information:"
        )));

        let mut state = ReactState::Thinking;
        let mut trace: Vec<ReasoningStep> = Vec::new();
        let mut pending: Option<Result<ToolCall, ToolError>> = None;
        let mut finished: Option<(String, Termination)> = None;

        info!(model = %self.model.model(), max_steps = self.max_steps, "ReAct loop starting");

        loop {
            match state {
                ReactState::Thinking => {
                    if trace.len() >= self.max_steps {
                        state = ReactState::Failed;
                        continue;
                    }
                    let step = trace.len() + 1;
                    debug!(step, "ReAct thinking");

                    let response = self.model.complete(turns.clone(), tool_defs.clone()).await?;
                    let thought = response.content.trim().to_string();
                    if !thought.is_empty() {
                        turns.push(PromptTurn::assistant(&thought));
                    }

                    match self.interpret(&response) {
                        Decision::Answer(answer) => {
                            trace.push(ReasoningStep {
                                thought,
                                action: None,
                                observation: None,
                            });
                            finished = Some((answer, Termination::Answer));
                            state = ReactState::Done;
                        }
                        Decision::Degraded(answer) => {
                            debug!(step, "No action and no answer signal, taking text as answer");
                            trace.push(ReasoningStep {
                                thought,
                                action: None,
                                observation: None,
                            });
                            finished = Some((answer, Termination::Degraded));
                            state = ReactState::Done;
                        }
                        Decision::Act(call) => {
                            trace.push(ReasoningStep {
                                thought,
                                action: None,
                                observation: None,
                            });
                            pending = Some(call);
                            state = ReactState::Acting;
                        }
                        Decision::Unclear => {
                            warn!(step, "Unclear decision from model");
                            trace.push(ReasoningStep {
                                thought,
                                action: None,
                                observation: Some(Observation::Text(UNCLEAR_DECISION.into())),
                            });
                            state = ReactState::Observing;
                        }
                    }
                }

                ReactState::Acting => {
                    let observation = match pending.take() {
                        Some(Ok(call)) => {
                            info!(tool = %call.tool_name, "ReAct executing tool");
                            let observation = match self.registry.execute(&call).await {
                                Ok(obs) => obs,
                                Err(e) => {
                                    warn!(tool = %call.tool_name, error = %e, "Tool failed");
                                    Observation::Error(e.to_string())
                                }
                            };
                            if let Some(step) = trace.last_mut() {
                                step.action = Some(call);
                            }
                            observation
                        }
                        Some(Err(e)) => {
                            warn!(error = %e, "Rejected tool call");
                            Observation::Error(e.to_string())
                        }
                        None => Observation::Text(UNCLEAR_DECISION.into()),
                    };
                    if let Some(step) = trace.last_mut() {
                        step.observation = Some(observation);
                    }
                    state = ReactState::Observing;
                }

                ReactState::Observing => {
                    if let Some(observation) = trace.last().and_then(|s| s.observation.as_ref()) {
                        turns.push(observation_turn(observation));
                    }
                    state = ReactState::Thinking;
                }

                ReactState::Done => {
                    if let Some((answer, termination)) = finished.take() {
                        info!(steps = trace.len(), ?termination, "ReAct loop finished");
                        let steps = trace.len();
                        return Ok(ReactOutcome::Done {
                            answer,
                            termination,
                            trace,
                            steps,
                        });
                    }
                    state = ReactState::Failed;
                }

                ReactState::Failed => {
                    warn!(max_steps = self.max_steps, "ReAct step budget exhausted");
                    return Ok(ReactOutcome::Failed(ReasoningExhausted {
                        max_steps: self.max_steps,
                        trace,
                    }));
                }
            }
        }
    }

    fn interpret(&self, response: &ProviderResponse) -> Decision {
        if !response.tool_calls.is_empty() {
            return Decision::Act(
                single_call(&self.registry, &response.tool_calls).and_then(|call| {
                    call.ok_or_else(|| ToolError::invalid(&self.retrieval_tool, "empty tool call round"))
                }),
            );
        }

        let text = response.content.trim();
        if let Some((_, answer)) = text.split_once(ANSWER_MARKER) {
            let answer = answer.trim();
            return if answer.is_empty() {
                Decision::Unclear
            } else {
                Decision::Answer(answer.to_string())
            };
        }
        if let Some((_, question)) = text.split_once(TOOL_MARKER) {
            return Decision::Act(self.textual_call(question.trim()));
        }
        if text.is_empty() {
            Decision::Unclear
        } else {
            Decision::Degraded(text.to_string())
        }
    }

    /// Map `TOOL: <question>` onto the retrieval tool's text parameter.
    fn textual_call(&self, question: &str) -> Result<ToolCall, ToolError> {
        let tool = self
            .registry
            .get(&self.retrieval_tool)
            .ok_or_else(|| ToolError::invalid(&self.retrieval_tool, "no such tool is registered"))?;
        let declaration = tool.declaration();
        let param = declaration.primary_text_param().ok_or_else(|| {
            ToolError::invalid(&self.retrieval_tool, "tool takes no text parameter")
        })?;
        let mut arguments = serde_json::Map::new();
        arguments.insert(param.name.clone(), question.into());
        declaration.validate(&serde_json::Value::Object(arguments))
    }
}

/// The turn that feeds an observation back to the model.
fn observation_turn(observation: &Observation) -> PromptTurn {
    observation
        .results()
        .iter()
        .fold(PromptTurn::text(PromptRole::Tool, observation.render()), |turn, r| {
            turn.with_image(&r.reference_key)
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::*;
    use folio_core::error::RetrievalError;
    use folio_core::message::{NewMessage, SessionId};
    use folio_core::retrieval::{RetrievalResult, Retriever};

    fn controller(
        provider: Arc<dyn folio_core::provider::Provider>,
        retriever: Arc<dyn Retriever>,
    ) -> ReactController {
        ReactController::new(
            ModelClient::new(provider, "mock-model"),
            registry_with(retriever),
            folio_tools::PAGE_SEARCH_TOOL,
        )
    }

    fn page3() -> Arc<StubRetriever> {
        Arc::new(StubRetriever::new(vec![RetrievalResult::image("p3.png", 0.91)]))
    }

    #[tokio::test]
    async fn answer_on_first_step_is_done() {
        let provider = Arc::new(SequentialMockProvider::single_text("ANSWER: A bar chart."));
        let retriever = page3();
        let outcome = controller(provider.clone(), retriever.clone())
            .run("What is shown on page 3?", &[])
            .await
            .unwrap();

        assert_eq!(outcome.state(), ReactState::Done);
        assert_eq!(outcome.steps(), 1);
        assert_eq!(outcome.tool_invocations(), 0);
        assert_eq!(outcome.reply(), "A bar chart.");
        assert_eq!(retriever.call_count(), 0);
        assert_eq!(provider.call_count(), 1);
    }

    #[tokio::test]
    async fn always_acting_model_exhausts_budget() {
        let provider = Arc::new(AlwaysToolProvider::new(page_search_call("page 3")));
        let retriever = page3();
        let outcome = controller(provider.clone(), retriever.clone())
            .run("What is shown on page 3?", &[])
            .await
            .unwrap();

        let ReactOutcome::Failed(exhausted) = &outcome else {
            panic!("expected FAILED, got {:?}", outcome.state());
        };
        assert_eq!(exhausted.max_steps, DEFAULT_MAX_STEPS);
        assert_eq!(exhausted.trace.len(), DEFAULT_MAX_STEPS);
        assert_eq!(provider.call_count(), DEFAULT_MAX_STEPS);
        assert_eq!(retriever.call_count(), DEFAULT_MAX_STEPS);
        assert_eq!(outcome.reply(), EXHAUSTED_NOTICE);
        assert!(matches!(
            outcome.into_result(),
            Err(folio_core::Error::ReasoningExhausted { max_steps: 3 })
        ));
    }

    #[tokio::test]
    async fn budget_is_configurable() {
        let provider = Arc::new(AlwaysToolProvider::new(page_search_call("page 3")));
        let outcome = controller(provider.clone(), page3())
            .with_max_steps(5)
            .run("q", &[])
            .await
            .unwrap();
        assert_eq!(outcome.state(), ReactState::Failed);
        assert_eq!(provider.call_count(), 5);
    }

    #[tokio::test]
    async fn act_observe_then_answer() {
        let provider = Arc::new(SequentialMockProvider::new(vec![
            make_tool_call_response(vec![page_search_call("page 3")], "I need page 3."),
            make_text_response("ANSWER: Page 3 shows revenue by quarter."),
        ]));
        let outcome = controller(provider.clone(), page3())
            .run("What is shown on page 3?", &[])
            .await
            .unwrap();

        assert_eq!(outcome.state(), ReactState::Done);
        assert_eq!(outcome.steps(), 2);
        assert_eq!(outcome.tool_invocations(), 1);
        let first = &outcome.trace()[0];
        assert_eq!(first.thought, "I need page 3.");
        assert_eq!(first.observation.as_ref().unwrap().results()[0].reference_key, "p3.png");

        // The second round sees the retrieved page.
        let request = provider.last_request().unwrap();
        let observed = request.turns.last().unwrap();
        assert_eq!(observed.role, PromptRole::Tool);
        assert_eq!(observed.image_references(), vec!["p3.png"]);
    }

    #[tokio::test]
    async fn textual_tool_signal_maps_to_retrieval() {
        let provider = Arc::new(SequentialMockProvider::new(vec![
            make_text_response("TOOL: chart on page 3"),
            make_text_response("ANSWER: A chart."),
        ]));
        let retriever = page3();
        let outcome = controller(provider, retriever.clone())
            .run("What is shown on page 3?", &[])
            .await
            .unwrap();

        assert_eq!(outcome.tool_invocations(), 1);
        let action = outcome.trace()[0].action.as_ref().unwrap();
        assert_eq!(action.str_arg(folio_tools::QUERY_PARAM), Some("chart on page 3"));
        assert_eq!(
            retriever.queries(),
            vec![folio_core::retrieval::SearchQuery::text("chart on page 3")]
        );
    }

    #[tokio::test]
    async fn answer_marker_wins_over_tool_marker() {
        let provider = Arc::new(SequentialMockProvider::single_text(
            "ANSWER: no need for TOOL: lookups",
        ));
        let outcome = controller(provider, page3()).run("q", &[]).await.unwrap();
        assert_eq!(outcome.reply(), "no need for TOOL: lookups");
        assert_eq!(outcome.tool_invocations(), 0);
    }

    // Degradation is a policy choice, not part of the contract.
    #[tokio::test]
    async fn policy_plain_text_degrades_to_done() {
        let provider = Arc::new(SequentialMockProvider::single_text("It is a chart."));
        let outcome = controller(provider, page3()).run("q", &[]).await.unwrap();
        match outcome {
            ReactOutcome::Done {
                answer, termination, ..
            } => {
                assert_eq!(answer, "It is a chart.");
                assert_eq!(termination, Termination::Degraded);
            }
            other => panic!("expected DONE, got {:?}", other.state()),
        }
    }

    #[tokio::test]
    async fn empty_response_is_observed_and_retried() {
        let provider = Arc::new(SequentialMockProvider::new(vec![
            make_text_response(""),
            make_text_response("ANSWER: done"),
        ]));
        let outcome = controller(provider, page3()).run("q", &[]).await.unwrap();
        assert_eq!(outcome.steps(), 2);
        assert_eq!(
            outcome.trace()[0].observation,
            Some(Observation::Text(UNCLEAR_DECISION.into()))
        );
    }

    #[tokio::test]
    async fn invalid_call_becomes_observation_without_execution() {
        let provider = Arc::new(SequentialMockProvider::new(vec![
            make_tool_call_response(
                vec![make_tool_call("web_search", serde_json::json!({"q": "x"}))],
                "",
            ),
            make_tool_call_response(vec![page_search_call("a"), page_search_call("b")], ""),
            make_text_response("ANSWER: gave up on tools"),
        ]));
        let retriever = page3();
        let outcome = controller(provider, retriever.clone()).run("q", &[]).await.unwrap();

        assert_eq!(outcome.state(), ReactState::Done);
        assert_eq!(outcome.tool_invocations(), 0);
        assert_eq!(retriever.call_count(), 0);
        for step in &outcome.trace()[..2] {
            assert!(step.observation.as_ref().unwrap().is_error());
        }
    }

    #[tokio::test]
    async fn retrieval_failure_is_an_observation() {
        let provider = Arc::new(SequentialMockProvider::new(vec![
            make_tool_call_response(vec![page_search_call("page 3")], ""),
            make_text_response("ANSWER: I DON'T KNOW"),
        ]));
        let retriever = Arc::new(StubRetriever::failing(RetrievalError::Unavailable(
            "index offline".into(),
        )));
        let outcome = controller(provider, retriever).run("q", &[]).await.unwrap();
        assert_eq!(outcome.state(), ReactState::Done);
        let observation = outcome.trace()[0].observation.as_ref().unwrap();
        assert!(observation.render().contains("index offline"));
    }

    #[tokio::test]
    async fn model_failure_aborts_the_run() {
        let err = controller(Arc::new(FailingProvider), page3())
            .run("q", &[])
            .await
            .unwrap_err();
        assert!(matches!(err, folio_core::Error::Provider(_)));
    }

    #[tokio::test]
    async fn history_seeds_the_first_round() {
        let provider = Arc::new(SequentialMockProvider::single_text("ANSWER: ok"));
        let session = SessionId::from("s1");
        let history = vec![NewMessage::user_text("earlier question").into_message(&session, 1)];
        controller(provider.clone(), page3())
            .run("q", &history)
            .await
            .unwrap();
        let request = provider.last_request().unwrap();
        assert_eq!(request.turns[0].role, PromptRole::System);
        assert_eq!(request.turns[1].text_content(), "earlier question");
        assert!(request.turns[2].text_content().starts_with("User query: q"));
        assert_eq!(request.tools.len(), 1);
    }
}
