//! Tool trait: the abstraction over agent capabilities.
//!
//! A tool publishes a [`ToolDeclaration`] (name, description, typed
//! parameters). The model proposes calls as raw JSON; the [`ToolRegistry`]
//! validates them into typed [`ToolCall`]s before anything executes.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use crate::error::ToolError;
use crate::provider::{ProposedToolCall, ToolDefinition};
use crate::retrieval::RetrievalResult;

/// The type of a single tool parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamKind {
    String,
    Integer,
    Number,
    Boolean,
}

impl ParamKind {
    /// JSON Schema type name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Number => "number",
            Self::Boolean => "boolean",
        }
    }
}

/// One declared parameter of a tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterSpec {
    pub name: String,
    pub kind: ParamKind,
    pub description: String,
    #[serde(default)]
    pub required: bool,
}

impl ParameterSpec {
    pub fn required(name: impl Into<String>, kind: ParamKind, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind,
            description: description.into(),
            required: true,
        }
    }

    pub fn optional(name: impl Into<String>, kind: ParamKind, description: impl Into<String>) -> Self {
        Self {
            required: false,
            ..Self::required(name, kind, description)
        }
    }
}

/// What a tool tells the model about itself. Immutable once registered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDeclaration {
    pub name: String,
    pub description: String,
    pub parameters: Vec<ParameterSpec>,
}

impl ToolDeclaration {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters: Vec::new(),
        }
    }

    pub fn param(mut self, spec: ParameterSpec) -> Self {
        self.parameters.push(spec);
        self
    }

    /// The first required string parameter, if any.
    pub fn primary_text_param(&self) -> Option<&ParameterSpec> {
        self.parameters
            .iter()
            .find(|p| p.required && p.kind == ParamKind::String)
    }

    /// Render the parameter list as a JSON Schema object.
    pub fn to_json_schema(&self) -> serde_json::Value {
        let properties: serde_json::Map<String, serde_json::Value> = self
            .parameters
            .iter()
            .map(|p| {
                (
                    p.name.clone(),
                    serde_json::json!({
                        "type": p.kind.as_str(),
                        "description": p.description,
                    }),
                )
            })
            .collect();
        let required: Vec<&str> = self
            .parameters
            .iter()
            .filter(|p| p.required)
            .map(|p| p.name.as_str())
            .collect();

        serde_json::json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }

    /// Convert into the wire form sent to the LLM.
    pub fn to_definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name.clone(),
            description: self.description.clone(),
            parameters: self.to_json_schema(),
        }
    }

    /// Check raw JSON arguments against this declaration and type them.
    pub fn validate(&self, arguments: &serde_json::Value) -> std::result::Result<ToolCall, ToolError> {
        let parsed;
        let object = match arguments {
            serde_json::Value::Object(map) => map,
            serde_json::Value::Null => {
                parsed = serde_json::Map::new();
                &parsed
            }
            // Some backends send the arguments as an encoded JSON string.
            serde_json::Value::String(s) => {
                parsed = match serde_json::from_str::<serde_json::Value>(s) {
                    Ok(serde_json::Value::Object(map)) => map,
                    _ => return Err(ToolError::invalid(&self.name, "arguments are not a JSON object")),
                };
                &parsed
            }
            _ => return Err(ToolError::invalid(&self.name, "arguments are not a JSON object")),
        };

        let mut typed = BTreeMap::new();
        for (key, value) in object {
            let spec = self
                .parameters
                .iter()
                .find(|p| &p.name == key)
                .ok_or_else(|| ToolError::invalid(&self.name, format!("undeclared parameter '{key}'")))?;
            let arg = ArgValue::from_json(spec.kind, value).ok_or_else(|| {
                ToolError::invalid(
                    &self.name,
                    format!("parameter '{key}' must be of type {}", spec.kind.as_str()),
                )
            })?;
            typed.insert(key.clone(), arg);
        }

        for spec in self.parameters.iter().filter(|p| p.required) {
            match typed.get(&spec.name) {
                None => {
                    return Err(ToolError::invalid(
                        &self.name,
                        format!("missing required parameter '{}'", spec.name),
                    ));
                }
                Some(ArgValue::String(s)) if s.trim().is_empty() => {
                    return Err(ToolError::invalid(
                        &self.name,
                        format!("required parameter '{}' is blank", spec.name),
                    ));
                }
                Some(_) => {}
            }
        }

        Ok(ToolCall {
            tool_name: self.name.clone(),
            arguments: typed,
        })
    }
}

/// A typed argument value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ArgValue {
    Boolean(bool),
    Integer(i64),
    Number(f64),
    String(String),
}

impl ArgValue {
    fn from_json(kind: ParamKind, value: &serde_json::Value) -> Option<Self> {
        match kind {
            ParamKind::String => value.as_str().map(|s| Self::String(s.to_string())),
            ParamKind::Integer => value.as_i64().map(Self::Integer),
            ParamKind::Number => value.as_f64().map(Self::Number),
            ParamKind::Boolean => value.as_bool().map(Self::Boolean),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }
}

/// A validated request to execute a tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub tool_name: String,
    pub arguments: BTreeMap<String, ArgValue>,
}

impl ToolCall {
    pub fn str_arg(&self, name: &str) -> Option<&str> {
        self.arguments.get(name).and_then(ArgValue::as_str)
    }
}

/// What the agent learns from running a tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Observation {
    Results(Vec<RetrievalResult>),
    Text(String),
    Error(String),
}

impl Observation {
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }

    /// Retrieval results carried by this observation, if any.
    pub fn results(&self) -> &[RetrievalResult] {
        match self {
            Self::Results(r) => r,
            _ => &[],
        }
    }

    /// Plain-text rendering for the model and the session log.
    pub fn render(&self) -> String {
        match self {
            Self::Results(results) if results.is_empty() => {
                "No relevant information found for this query.".to_string()
            }
            Self::Results(results) => results
                .iter()
                .enumerate()
                .map(|(i, r)| {
                    let page = r.page_number.map(|p| format!(", page {p}")).unwrap_or_default();
                    format!("[{}] {} (score {:.2}{page})", i + 1, r.reference_key, r.relevance_score)
                })
                .collect::<Vec<_>>()
                .join("\n"),
            Self::Text(text) => text.clone(),
            Self::Error(reason) => format!("Error: {reason}"),
        }
    }
}

/// The core Tool trait.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Name, description and parameter schema sent to the LLM.
    fn declaration(&self) -> &ToolDeclaration;

    /// Execute an already validated call.
    async fn execute(&self, call: &ToolCall) -> std::result::Result<Observation, ToolError>;
}

/// A registry of available tools.
///
/// Built once at startup and then shared read-only (`Arc<ToolRegistry>`).
/// Declaration order is preserved so the model always sees tools in the
/// same order.
pub struct ToolRegistry {
    tools: Vec<Box<dyn Tool>>,
    by_name: HashMap<String, usize>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: Vec::new(),
            by_name: HashMap::new(),
        }
    }

    /// Register a tool. Fails if the name is already taken.
    pub fn register(&mut self, tool: Box<dyn Tool>) -> std::result::Result<(), ToolError> {
        let name = tool.declaration().name.clone();
        if self.by_name.contains_key(&name) {
            return Err(ToolError::DuplicateTool(name));
        }
        self.by_name.insert(name, self.tools.len());
        self.tools.push(tool);
        Ok(())
    }

    /// Get a tool by name.
    pub fn get(&self, name: &str) -> Option<&dyn Tool> {
        self.by_name.get(name).map(|&i| self.tools[i].as_ref())
    }

    /// All declarations, in registration order.
    pub fn declarations(&self) -> Vec<&ToolDeclaration> {
        self.tools.iter().map(|t| t.declaration()).collect()
    }

    /// Get all tool definitions (for sending to the LLM).
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.iter().map(|t| t.declaration().to_definition()).collect()
    }

    /// Validate a model-proposed call against the declared schema.
    pub fn validate(&self, proposed: &ProposedToolCall) -> std::result::Result<ToolCall, ToolError> {
        let tool = self
            .get(&proposed.name)
            .ok_or_else(|| ToolError::invalid(&proposed.name, "no such tool is registered"))?;
        tool.declaration().validate(&proposed.arguments)
    }

    /// Execute a validated tool call.
    pub async fn execute(&self, call: &ToolCall) -> std::result::Result<Observation, ToolError> {
        let tool = self
            .get(&call.tool_name)
            .ok_or_else(|| ToolError::invalid(&call.tool_name, "no such tool is registered"))?;
        tool.execute(call).await
    }

    /// List all registered tool names.
    pub fn names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.declaration().name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct EchoTool {
        decl: ToolDeclaration,
    }

    impl EchoTool {
        fn named(name: &str) -> Self {
            Self {
                decl: ToolDeclaration::new(name, "Echo the input back")
                    .param(ParameterSpec::required("text", ParamKind::String, "What to echo"))
                    .param(ParameterSpec::optional("times", ParamKind::Integer, "Repeat count"))
                    .param(ParameterSpec::optional("weight", ParamKind::Number, "Unused")),
            }
        }
    }

    #[async_trait]
    impl Tool for EchoTool {
        fn declaration(&self) -> &ToolDeclaration {
            &self.decl
        }

        async fn execute(&self, call: &ToolCall) -> Result<Observation, ToolError> {
            Ok(Observation::Text(call.str_arg("text").unwrap_or_default().to_string()))
        }
    }

    fn proposed(name: &str, arguments: serde_json::Value) -> ProposedToolCall {
        ProposedToolCall {
            id: "call_1".into(),
            name: name.into(),
            arguments,
        }
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let mut registry = ToolRegistry::new();
        registry.register(Box::new(EchoTool::named("echo"))).unwrap();
        let err = registry.register(Box::new(EchoTool::named("echo"))).unwrap_err();
        assert!(matches!(err, ToolError::DuplicateTool(name) if name == "echo"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn distinct_names_are_both_available() {
        let mut registry = ToolRegistry::new();
        registry.register(Box::new(EchoTool::named("echo"))).unwrap();
        registry.register(Box::new(EchoTool::named("shout"))).unwrap();
        assert_eq!(registry.names(), vec!["echo", "shout"]);
        assert!(registry.validate(&proposed("echo", json!({"text": "a"}))).is_ok());
        assert!(registry.validate(&proposed("shout", json!({"text": "b"}))).is_ok());
    }

    #[test]
    fn schema_lists_required_params() {
        let schema = EchoTool::named("echo").decl.to_json_schema();
        assert_eq!(schema["type"], "object");
        assert_eq!(schema["properties"]["text"]["type"], "string");
        assert_eq!(schema["properties"]["times"]["type"], "integer");
        assert_eq!(schema["required"], json!(["text"]));
    }

    #[test]
    fn validation_types_arguments() {
        let registry = {
            let mut r = ToolRegistry::new();
            r.register(Box::new(EchoTool::named("echo"))).unwrap();
            r
        };
        let call = registry
            .validate(&proposed("echo", json!({"text": "hi", "times": 2, "weight": 3})))
            .unwrap();
        assert_eq!(call.tool_name, "echo");
        assert_eq!(call.str_arg("text"), Some("hi"));
        assert_eq!(call.arguments["times"], ArgValue::Integer(2));
        assert_eq!(call.arguments["weight"], ArgValue::Number(3.0));
    }

    #[test]
    fn validation_rejects_bad_calls() {
        let mut registry = ToolRegistry::new();
        registry.register(Box::new(EchoTool::named("echo"))).unwrap();

        let cases = [
            proposed("missing", json!({"text": "hi"})),
            proposed("echo", json!({})),
            proposed("echo", json!({"text": "   "})),
            proposed("echo", json!({"text": 5})),
            proposed("echo", json!({"text": "hi", "times": "two"})),
            proposed("echo", json!({"text": "hi", "extra": true})),
            proposed("echo", json!(["hi"])),
        ];
        for case in cases {
            let err = registry.validate(&case).unwrap_err();
            assert!(matches!(err, ToolError::InvalidToolCall { .. }), "{case:?} gave {err:?}");
        }
    }

    #[test]
    fn string_encoded_arguments_are_accepted() {
        let decl = EchoTool::named("echo").decl;
        let call = decl.validate(&json!(r#"{"text":"page 3"}"#)).unwrap();
        assert_eq!(call.str_arg("text"), Some("page 3"));
    }

    #[tokio::test]
    async fn registry_executes_validated_call() {
        let mut registry = ToolRegistry::new();
        registry.register(Box::new(EchoTool::named("echo"))).unwrap();
        let call = registry.validate(&proposed("echo", json!({"text": "hello"}))).unwrap();
        let obs = registry.execute(&call).await.unwrap();
        assert_eq!(obs, Observation::Text("hello".into()));
    }

    #[test]
    fn empty_results_render_as_no_information() {
        assert_eq!(
            Observation::Results(vec![]).render(),
            "No relevant information found for this query."
        );
        let rendered = Observation::Results(vec![RetrievalResult::image("p3.png", 0.91).with_page(3)]).render();
        assert_eq!(rendered, "[1] p3.png (score 0.91, page 3)");
    }
}
