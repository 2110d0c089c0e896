//! Tool trait and the fetch-and-reshape tools
//!
//! The three data tools share one operation, [`fetch`]: a single GET with the
//! caller's query parameters, followed by a projection of one list field of
//! the JSON response onto a fixed set of output fields. They differ only in
//! their [`FetchSpec`].

use crate::error::{Error, Result};
use async_trait::async_trait;
use reqwest::header::ACCEPT;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error as ThisError;
use url::Url;

/// Context provided to tools during execution
#[derive(Debug, Clone)]
pub struct ToolContext {
    /// Who is invoking the tool (agent key, "cli", ...)
    pub caller: String,
}

impl ToolContext {
    /// Create a new tool context
    pub fn new(caller: impl Into<String>) -> Self {
        Self {
            caller: caller.into(),
        }
    }
}

/// Output from a tool execution
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolOutput {
    /// Whether the tool execution was successful
    pub success: bool,
    /// Output content
    pub content: String,
    /// Optional structured data
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    /// Optional error message
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ToolOutput {
    /// Create a successful tool output with data
    pub fn success_with_data(content: impl Into<String>, data: Value) -> Self {
        Self {
            success: true,
            content: content.into(),
            data: Some(data),
            error: None,
        }
    }

    /// Create a failed tool output
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            content: String::new(),
            data: None,
            error: Some(error.into()),
        }
    }
}

/// JSON Schema for tool parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonSchema {
    /// Schema type
    #[serde(rename = "type")]
    pub schema_type: String,
    /// Additional properties
    #[serde(flatten)]
    pub additional: HashMap<String, Value>,
}

impl JsonSchema {
    /// Object whose values are all query-string scalars
    pub fn query_parameters() -> Self {
        let mut additional = HashMap::new();
        additional.insert(
            "additionalProperties".to_string(),
            serde_json::json!({ "type": ["string", "number", "boolean"] }),
        );
        Self {
            schema_type: "object".to_string(),
            additional,
        }
    }
}

/// Tool trait defining the interface for agent capabilities
#[async_trait]
pub trait Tool: Send + Sync {
    /// Unique identifier for this tool
    fn id(&self) -> &str;

    /// Human-readable name
    fn name(&self) -> &str;

    /// Description for LLM function calling
    fn description(&self) -> &str;

    /// JSON Schema for input parameters
    fn input_schema(&self) -> JsonSchema;

    /// Execute the tool with given parameters
    async fn execute(&self, params: Value, ctx: &ToolContext) -> Result<ToolOutput>;
}

/// One flat output record; field order follows the projection
pub type Record = Map<String, Value>;

/// Outcome of a fetch: records on success, a tagged failure otherwise
pub type FetchResult = std::result::Result<Vec<Record>, FetchError>;

/// Why a fetch failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchErrorKind {
    /// HTTP 400
    BadRequest,
    /// HTTP 401
    Unauthorized,
    /// HTTP 403
    Forbidden,
    /// HTTP 404
    NotFound,
    /// Any other 4xx/5xx status
    Status(u16),
    /// The request could not be sent or the body could not be read
    Transport,
    /// The body was not valid JSON
    Decode,
}

/// A failed fetch
#[derive(Debug, Clone, PartialEq, Eq, ThisError)]
#[error("{detail}")]
pub struct FetchError {
    /// Failure category
    pub kind: FetchErrorKind,
    /// Human-readable detail
    pub detail: String,
}

impl FetchError {
    /// Create a failure
    pub fn new(kind: FetchErrorKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            detail: detail.into(),
        }
    }

    /// Map a 4xx/5xx status to its failure; the four common client errors
    /// carry fixed messages
    pub fn from_status(status: StatusCode, url: &str) -> Self {
        match status.as_u16() {
            400 => Self::new(FetchErrorKind::BadRequest, "Bad Request - Query was malformed."),
            401 => Self::new(FetchErrorKind::Unauthorized, "Unauthorized - API key is invalid."),
            403 => Self::new(
                FetchErrorKind::Forbidden,
                "Forbidden - Access to the resource is denied.",
            ),
            404 => Self::new(
                FetchErrorKind::NotFound,
                "Not Found - The specified resource was not found.",
            ),
            code => {
                let class = if status.is_server_error() {
                    "server"
                } else {
                    "client"
                };
                Self::new(
                    FetchErrorKind::Status(code),
                    format!("HTTP status {} error ({}) for url ({})", class, status, url),
                )
            }
        }
    }
}

/// Maps one source field of a list item to one output field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldMapping {
    /// Field name in the output record
    pub output: String,
    /// Field name in the source item
    pub source: String,
}

impl FieldMapping {
    /// Keep a field under its own name
    pub fn same(name: &str) -> Self {
        Self::renamed(name, name)
    }

    /// Copy `source` into `output`
    pub fn renamed(output: &str, source: &str) -> Self {
        Self {
            output: output.to_string(),
            source: source.to_string(),
        }
    }
}

/// Configuration of one fetch-and-reshape tool
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchSpec {
    /// Tool identifier
    pub id: String,
    /// Human-readable name
    pub name: String,
    /// What the tool is for
    pub description: String,
    /// Endpoint queried with GET
    pub base_url: Url,
    /// Name of the list field in the response body
    pub list_field: String,
    /// Output fields, in order
    pub projection: Vec<FieldMapping>,
}

impl FetchSpec {
    /// Market reports: title, summary, date, source
    pub fn market_data() -> Result<Self> {
        Ok(Self {
            id: "saas_market_data".to_string(),
            name: "SaaS Market Data Fetcher".to_string(),
            description: "Fetches and processes market data relevant to the SaaS industry from various API endpoints.".to_string(),
            base_url: Url::parse("https://api.saas-market-data.com/v1/reports")?,
            list_field: "results".to_string(),
            projection: vec![
                FieldMapping::same("title"),
                FieldMapping::same("summary"),
                FieldMapping::same("date"),
                FieldMapping::same("source"),
            ],
        })
    }

    /// Technology stacks: technology (from `name`), advantages, popularity
    pub fn technology_stack() -> Result<Self> {
        Ok(Self {
            id: "technology_stack".to_string(),
            name: "Technology Stack Analyzer".to_string(),
            description: "Analyzes and recommends technology stacks suitable for SaaS applications based on current trends.".to_string(),
            base_url: Url::parse("https://api.technology-trends.com/v1/techstacks")?,
            list_field: "technologies".to_string(),
            projection: vec![
                FieldMapping::renamed("technology", "name"),
                FieldMapping::same("advantages"),
                FieldMapping::same("popularity"),
            ],
        })
    }

    /// Financial projections: type, value, description
    pub fn financial_analysis() -> Result<Self> {
        Ok(Self {
            id: "financial_analysis".to_string(),
            name: "Financial Analysis Tool".to_string(),
            description: "Performs financial analysis and projections for SaaS products.".to_string(),
            base_url: Url::parse("https://api.financial-projections.com/v1/analyze")?,
            list_field: "results".to_string(),
            projection: vec![
                FieldMapping::same("type"),
                FieldMapping::same("value"),
                FieldMapping::same("description"),
            ],
        })
    }

    /// Query another endpoint with the same projection
    pub fn with_base_url(mut self, base_url: Url) -> Self {
        self.base_url = base_url;
        self
    }

    /// Project the list field of a response body. A missing list yields no
    /// records; a missing item field yields `null`.
    pub fn reshape(&self, body: &Value) -> Vec<Record> {
        let Some(items) = body.get(&self.list_field).and_then(Value::as_array) else {
            return Vec::new();
        };

        items
            .iter()
            .map(|item| {
                self.projection
                    .iter()
                    .map(|field| {
                        let value = item.get(&field.source).cloned().unwrap_or(Value::Null);
                        (field.output.clone(), value)
                    })
                    .collect()
            })
            .collect()
    }
}

/// Issue one GET for `spec` and reshape the response. Every failure is
/// logged before it is returned.
pub async fn fetch(client: &Client, spec: &FetchSpec, params: &[(String, String)]) -> FetchResult {
    fetch_inner(client, spec, params).await.inspect_err(|e| {
        tracing::error!(
            tool = %spec.id,
            kind = ?e.kind,
            "Failed to fetch or process data: {}",
            e.detail
        );
    })
}

async fn fetch_inner(
    client: &Client,
    spec: &FetchSpec,
    params: &[(String, String)],
) -> FetchResult {
    let response = client
        .get(spec.base_url.clone())
        .header(ACCEPT, "application/json")
        .query(params)
        .send()
        .await
        .map_err(|e| FetchError::new(FetchErrorKind::Transport, e.to_string()))?;

    let status = response.status();
    if status.is_client_error() || status.is_server_error() {
        return Err(FetchError::from_status(status, response.url().as_str()));
    }
    if status != StatusCode::OK {
        tracing::warn!(tool = %spec.id, %status, "non-200 success status, no records read");
        return Ok(Vec::new());
    }

    let body = response
        .text()
        .await
        .map_err(|e| FetchError::new(FetchErrorKind::Transport, e.to_string()))?;
    let data: Value = serde_json::from_str(&body)
        .map_err(|e| FetchError::new(FetchErrorKind::Decode, e.to_string()))?;

    let records = spec.reshape(&data);
    tracing::debug!(tool = %spec.id, records = records.len(), "fetch succeeded");
    Ok(records)
}

/// Convert a JSON object of scalars into query pairs
pub fn query_pairs(params: &Value) -> Result<Vec<(String, String)>> {
    let object = match params {
        Value::Object(map) => map,
        Value::Null => return Ok(Vec::new()),
        _ => {
            return Err(Error::InvalidInput(
                "query parameters must be a JSON object".to_string(),
            ))
        }
    };

    let mut pairs = Vec::with_capacity(object.len());
    for (key, value) in object {
        let text = match value {
            Value::Null => continue,
            Value::String(s) => s.clone(),
            Value::Bool(_) | Value::Number(_) => value.to_string(),
            Value::Array(_) | Value::Object(_) => {
                return Err(Error::InvalidInput(format!(
                    "query parameter '{}' must be a scalar",
                    key
                )))
            }
        };
        pairs.push((key.clone(), text));
    }
    Ok(pairs)
}

/// A [`FetchSpec`] exposed as a [`Tool`]
pub struct FetchTool {
    client: Client,
    spec: FetchSpec,
}

impl FetchTool {
    /// Create a tool with a default HTTP client
    pub fn new(spec: FetchSpec) -> Result<Self> {
        Ok(Self {
            client: Client::builder().build()?,
            spec,
        })
    }

    /// Tool configuration
    pub fn spec(&self) -> &FetchSpec {
        &self.spec
    }

    /// Run the fetch directly
    pub async fn fetch(&self, params: &[(String, String)]) -> FetchResult {
        fetch(&self.client, &self.spec, params).await
    }
}

#[async_trait]
impl Tool for FetchTool {
    fn id(&self) -> &str {
        &self.spec.id
    }

    fn name(&self) -> &str {
        &self.spec.name
    }

    fn description(&self) -> &str {
        &self.spec.description
    }

    fn input_schema(&self) -> JsonSchema {
        JsonSchema::query_parameters()
    }

    async fn execute(&self, params: Value, ctx: &ToolContext) -> Result<ToolOutput> {
        let pairs = query_pairs(&params)?;
        tracing::debug!(tool = %self.spec.id, caller = %ctx.caller, "executing fetch tool");

        Ok(match self.fetch(&pairs).await {
            Ok(records) => ToolOutput::success_with_data(
                format!("{} record(s) from {}", records.len(), self.spec.name),
                Value::Array(records.into_iter().map(Value::Object).collect()),
            ),
            Err(e) => ToolOutput::failure(e.to_string()),
        })
    }
}

/// All three fetch tools with default endpoints
pub fn fetch_tools() -> Result<Vec<Arc<dyn Tool>>> {
    Ok(vec![
        Arc::new(FetchTool::new(FetchSpec::market_data()?)?) as Arc<dyn Tool>,
        Arc::new(FetchTool::new(FetchSpec::technology_stack()?)?),
        Arc::new(FetchTool::new(FetchSpec::financial_analysis()?)?),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use serde_json::json;

    async fn tool_for(server: &mockito::ServerGuard, spec: FetchSpec, path: &str) -> FetchTool {
        let url = Url::parse(&format!("{}{}", server.url(), path)).unwrap();
        FetchTool::new(spec.with_base_url(url)).unwrap()
    }

    fn params(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[tokio::test]
    async fn ok_response_is_projected_in_order() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/v1/reports")
            .match_header("accept", "application/json")
            .match_query(Matcher::UrlEncoded("industry".into(), "crm".into()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!({
                    "results": [
                        {"title": "CRM growth", "summary": "Up 12%", "date": "2024-01-02",
                         "source": "Gartner", "author": "dropped"},
                        {"title": "Churn study", "date": "2024-02-03"}
                    ],
                    "page": 1
                })
                .to_string(),
            )
            .create_async()
            .await;

        let tool = tool_for(&server, FetchSpec::market_data().unwrap(), "/v1/reports").await;
        let records = tool.fetch(&params(&[("industry", "crm")])).await.unwrap();
        mock.assert_async().await;

        assert_eq!(records.len(), 2);
        let keys: Vec<&str> = records[0].keys().map(String::as_str).collect();
        assert_eq!(keys, ["title", "summary", "date", "source"]);
        assert_eq!(records[0]["title"], "CRM growth");
        assert!(!records[0].contains_key("author"));
        assert_eq!(records[1]["title"], "Churn study");
        assert_eq!(records[1]["summary"], Value::Null);
        assert_eq!(records[1]["source"], Value::Null);
    }

    #[tokio::test]
    async fn technology_name_is_renamed() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/v1/techstacks")
            .with_status(200)
            .with_body(r#"{"technologies":[{"name":"Rust","advantages":["speed"],"popularity":87}]}"#)
            .create_async()
            .await;

        let tool = tool_for(&server, FetchSpec::technology_stack().unwrap(), "/v1/techstacks").await;
        let records = tool.fetch(&[]).await.unwrap();
        assert_eq!(
            Value::Object(records[0].clone()),
            json!({"technology": "Rust", "advantages": ["speed"], "popularity": 87})
        );
    }

    #[tokio::test]
    async fn client_errors_carry_fixed_messages() {
        let cases = [
            (400, FetchErrorKind::BadRequest, "Bad Request - Query was malformed."),
            (401, FetchErrorKind::Unauthorized, "Unauthorized - API key is invalid."),
            (403, FetchErrorKind::Forbidden, "Forbidden - Access to the resource is denied."),
            (404, FetchErrorKind::NotFound, "Not Found - The specified resource was not found."),
        ];

        for (status, kind, message) in cases {
            let mut server = mockito::Server::new_async().await;
            server
                .mock("GET", "/v1/analyze")
                .with_status(status)
                .with_body(r#"{"error":"details that are not kept"}"#)
                .create_async()
                .await;

            let tool = tool_for(&server, FetchSpec::financial_analysis().unwrap(), "/v1/analyze").await;
            let err = tool.fetch(&[]).await.unwrap_err();
            assert_eq!(err.kind, kind);
            assert_eq!(err.to_string(), message);
        }
    }

    #[tokio::test]
    async fn other_error_status_keeps_code() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/v1/reports")
            .with_status(503)
            .create_async()
            .await;

        let tool = tool_for(&server, FetchSpec::market_data().unwrap(), "/v1/reports").await;
        let err = tool.fetch(&[]).await.unwrap_err();
        assert_eq!(err.kind, FetchErrorKind::Status(503));
        assert!(err.detail.contains("503"));
    }

    #[tokio::test]
    async fn malformed_json_is_a_decode_failure() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/v1/reports")
            .with_status(200)
            .with_body("<html>maintenance</html>")
            .create_async()
            .await;

        let tool = tool_for(&server, FetchSpec::market_data().unwrap(), "/v1/reports").await;
        match tool.fetch(&[]).await {
            Err(FetchError { kind: FetchErrorKind::Decode, .. }) => {}
            other => panic!("expected decode failure, got {other:?}"),
        }
    }

    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<parking_lot::Mutex<Vec<u8>>>);

    impl CapturedLogs {
        fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.lock()).into_owned()
        }
    }

    impl std::io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for CapturedLogs {
        type Writer = CapturedLogs;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    #[tokio::test]
    async fn decode_failure_is_logged_at_error_level() {
        let logs = CapturedLogs::default();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(logs.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::ERROR)
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/v1/analyze")
            .with_status(200)
            .with_body("not json")
            .create_async()
            .await;

        let tool = tool_for(&server, FetchSpec::financial_analysis().unwrap(), "/v1/analyze").await;
        assert!(tool.fetch(&[]).await.is_err());

        let output = logs.contents();
        let errors: Vec<&str> = output.lines().filter(|l| l.contains("ERROR")).collect();
        assert_eq!(errors.len(), 1, "{output}");
        assert!(errors[0].contains("kind=Decode"), "{output}");
        assert!(errors[0].contains("tool=financial_analysis"), "{output}");
    }

    #[tokio::test]
    async fn tool_execute_reports_failure_without_erroring() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/v1/reports")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("q".into(), "crm".into()),
                Matcher::UrlEncoded("limit".into(), "5".into()),
            ]))
            .with_status(401)
            .create_async()
            .await;

        let tool = tool_for(&server, FetchSpec::market_data().unwrap(), "/v1/reports").await;
        let output = tool
            .execute(json!({"q": "crm", "limit": 5}), &ToolContext::new("cli"))
            .await
            .unwrap();
        assert!(!output.success);
        assert_eq!(output.error.as_deref(), Some("Unauthorized - API key is invalid."));
    }

    #[test]
    fn reshape_without_list_field_is_empty() {
        let spec = FetchSpec::market_data().unwrap();
        assert!(spec.reshape(&json!({"data": []})).is_empty());
        assert!(spec.reshape(&json!({"results": "nope"})).is_empty());
    }

    #[test]
    fn query_pairs_rejects_nested_values() {
        assert_eq!(
            query_pairs(&json!({"q": "crm", "n": 2, "skip": null})).unwrap(),
            vec![("q".to_string(), "crm".to_string()), ("n".to_string(), "2".to_string())]
        );
        assert!(query_pairs(&json!({"q": ["a"]})).is_err());
        assert!(query_pairs(&json!("crm")).is_err());
    }

    #[test]
    fn three_tools_with_distinct_ids() {
        let tools = fetch_tools().unwrap();
        let ids: Vec<&str> = tools.iter().map(|t| t.id()).collect();
        assert_eq!(ids, ["saas_market_data", "technology_stack", "financial_analysis"]);
    }
}
