//! Web search and page loading built-ins.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use scraper::{Html, Selector};
use serde_json::{Value, json};
use url::Url;

use maestro_llm::{ToolHandle, ToolInvokeError};

/// Shared settings for the web built-ins.
#[derive(Debug, Clone)]
pub struct WebToolConfig {
    pub timeout: Duration,
    pub user_agent: String,
    /// Maximum number of search results returned.
    pub max_results: usize,
    /// Maximum extracted text length for page loads.
    pub max_text_length: usize,
}

impl Default for WebToolConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            user_agent: concat!("Maestro/", env!("CARGO_PKG_VERSION")).to_string(),
            max_results: 10,
            max_text_length: 50_000,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// search_web
// ─────────────────────────────────────────────────────────────────────────────

/// Web search via the DuckDuckGo instant answer API. No API key needed,
/// limited coverage.
pub struct SearchWebTool {
    client: Client,
    config: WebToolConfig,
}

impl SearchWebTool {
    pub fn new(client: Client, config: WebToolConfig) -> Self {
        Self { client, config }
    }

    /// Requested result count, capped by the configured maximum.
    fn result_limit(&self, args: &Value) -> usize {
        args.get("num_results")
            .and_then(Value::as_u64)
            .map(|n| (n as usize).clamp(1, self.config.max_results))
            .unwrap_or(self.config.max_results)
    }

    fn format_results(&self, data: &Value, limit: usize) -> String {
        let mut lines = Vec::new();

        if let Some(abstract_text) = data["AbstractText"].as_str() {
            if !abstract_text.is_empty() {
                lines.push(format!(
                    "{}\n{}\n{}",
                    data["Heading"].as_str().unwrap_or("Result"),
                    data["AbstractURL"].as_str().unwrap_or(""),
                    abstract_text
                ));
            }
        }

        if let Some(topics) = data["RelatedTopics"].as_array() {
            for topic in topics {
                if lines.len() >= limit {
                    break;
                }
                if let (Some(text), Some(url)) =
                    (topic["Text"].as_str(), topic["FirstURL"].as_str())
                {
                    lines.push(format!("{}\n{}", text, url));
                }
            }
        }

        if lines.is_empty() {
            "No results found".to_string()
        } else {
            lines.join("\n\n")
        }
    }
}

#[async_trait]
impl ToolHandle for SearchWebTool {
    fn name(&self) -> &str {
        "search_web"
    }

    fn description(&self) -> &str {
        "Search the web and return result titles, URLs, and snippets."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": { "type": "string", "description": "The search query" },
                "num_results": { "type": "integer", "description": "Number of results to return", "default": 5 }
            },
            "required": ["query"]
        })
    }

    async fn invoke(&self, args: Value) -> std::result::Result<String, ToolInvokeError> {
        let query = args
            .get("query")
            .and_then(|v| v.as_str())
            .filter(|q| !q.trim().is_empty())
            .ok_or_else(|| ToolInvokeError::new("missing 'query' argument"))?;
        let limit = self.result_limit(&args);

        let url = format!(
            "https://api.duckduckgo.com/?q={}&format=json&no_html=1&skip_disambig=1",
            urlencoding::encode(query)
        );

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| ToolInvokeError::new(format!("search request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(ToolInvokeError::new(format!(
                "search error: {}",
                response.status()
            )));
        }

        let data: Value = response
            .json()
            .await
            .map_err(|e| ToolInvokeError::new(format!("failed to parse search response: {}", e)))?;

        tracing::debug!(query = %query, limit, "search_web completed");
        Ok(self.format_results(&data, limit))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// load_webpage_content
// ─────────────────────────────────────────────────────────────────────────────

/// Fetch a page and extract readable text.
pub struct LoadWebpageTool {
    client: Client,
    config: WebToolConfig,
}

impl LoadWebpageTool {
    pub fn new(client: Client, config: WebToolConfig) -> Self {
        Self { client, config }
    }

    /// Pull readable text out of HTML, preferring content containers over
    /// the raw body.
    fn extract_text(&self, html: &str) -> String {
        let document = Html::parse_document(html);
        let mut parts = Vec::new();

        let content_selectors = ["article", "main", "[role='main']", "#content", ".content"];
        for selector_str in content_selectors {
            if let Ok(selector) = Selector::parse(selector_str) {
                for element in document.select(&selector) {
                    let text = element.text().collect::<Vec<_>>().join(" ");
                    if !text.trim().is_empty() {
                        parts.push(text);
                    }
                }
            }
            if !parts.is_empty() {
                break;
            }
        }

        if parts.is_empty() {
            if let Ok(body) = Selector::parse("body") {
                for element in document.select(&body) {
                    parts.push(element.text().collect::<Vec<_>>().join(" "));
                }
            }
        }

        let text = parts.join("\n");
        let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
        self.truncate(text)
    }

    fn extract_title(&self, html: &str) -> Option<String> {
        let document = Html::parse_document(html);
        let selector = Selector::parse("title").ok()?;
        document
            .select(&selector)
            .next()
            .map(|el| el.text().collect::<String>().trim().to_string())
            .filter(|t| !t.is_empty())
    }

    fn truncate(&self, text: String) -> String {
        if text.len() > self.config.max_text_length {
            let mut cut = self.config.max_text_length;
            while !text.is_char_boundary(cut) {
                cut -= 1;
            }
            format!("{}...[truncated]", &text[..cut])
        } else {
            text
        }
    }
}

#[async_trait]
impl ToolHandle for LoadWebpageTool {
    fn name(&self) -> &str {
        "load_webpage_content"
    }

    fn description(&self) -> &str {
        "Fetch a URL and return its readable text content."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "url": { "type": "string", "description": "The HTTP or HTTPS URL to load" }
            },
            "required": ["url"]
        })
    }

    async fn invoke(&self, args: Value) -> std::result::Result<String, ToolInvokeError> {
        let url_str = args
            .get("url")
            .and_then(|v| v.as_str())
            .ok_or_else(|| ToolInvokeError::new("missing 'url' argument"))?;

        let url = Url::parse(url_str)
            .map_err(|e| ToolInvokeError::new(format!("invalid URL: {}", e)))?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(ToolInvokeError::new(
                "only HTTP and HTTPS URLs are supported",
            ));
        }

        let response = self
            .client
            .get(url.as_str())
            .send()
            .await
            .map_err(|e| ToolInvokeError::new(format!("failed to fetch URL: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ToolInvokeError::new(format!(
                "fetch returned HTTP {}",
                status
            )));
        }

        let content_type = response
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("text/html")
            .to_string();

        let body = response
            .text()
            .await
            .map_err(|e| ToolInvokeError::new(format!("failed to read response: {}", e)))?;

        // HTML parsing stays on this side of the await; scraper types are
        // not Send.
        if content_type.contains("text/html") {
            let text = self.extract_text(&body);
            let output = match self.extract_title(&body) {
                Some(title) => format!("{}\n\n{}", title, text),
                None => text,
            };
            tracing::debug!(url = %url_str, bytes = body.len(), "loaded webpage");
            Ok(output)
        } else {
            Ok(self.truncate(body))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn load_tool() -> LoadWebpageTool {
        LoadWebpageTool::new(Client::new(), WebToolConfig::default())
    }

    #[test]
    fn search_tool_metadata() {
        let tool = SearchWebTool::new(Client::new(), WebToolConfig::default());
        assert_eq!(tool.name(), "search_web");
        assert!(tool.parameters()["properties"].get("query").is_some());
    }

    #[test]
    fn load_tool_metadata() {
        let tool = load_tool();
        assert_eq!(tool.name(), "load_webpage_content");
        assert!(tool.parameters()["required"]
            .as_array()
            .unwrap()
            .contains(&json!("url")));
    }

    #[test]
    fn extract_text_prefers_main_content() {
        let tool = load_tool();
        let html = r#"
            <html><head><title>Doc</title></head>
            <body>
                <nav>Navigation links</nav>
                <main><h1>Heading</h1><p>The real content lives here.</p></main>
            </body></html>
        "#;
        let text = tool.extract_text(html);
        assert!(text.contains("real content"));
        assert!(!text.contains("Navigation links"));
    }

    #[test]
    fn extract_title_trims_whitespace() {
        let tool = load_tool();
        let html = "<html><head><title>  A Page  </title></head><body></body></html>";
        assert_eq!(tool.extract_title(html), Some("A Page".to_string()));
    }

    #[test]
    fn truncation_marks_cut_content() {
        let tool = LoadWebpageTool::new(
            Client::new(),
            WebToolConfig {
                max_text_length: 10,
                ..Default::default()
            },
        );
        let out = tool.truncate("a".repeat(50));
        assert!(out.ends_with("...[truncated]"));
        assert!(out.starts_with("aaaaaaaaaa"));
    }

    #[test]
    fn search_results_formatting() {
        let tool = SearchWebTool::new(Client::new(), WebToolConfig::default());
        let data = json!({
            "Heading": "Rust",
            "AbstractText": "A systems programming language.",
            "AbstractURL": "https://rust-lang.org",
            "RelatedTopics": [
                { "Text": "Cargo - the Rust package manager", "FirstURL": "https://doc.rust-lang.org/cargo" }
            ]
        });
        let formatted = tool.format_results(&data, 10);
        assert!(formatted.contains("systems programming"));
        assert!(formatted.contains("Cargo"));
    }

    #[test]
    fn empty_search_results() {
        let tool = SearchWebTool::new(Client::new(), WebToolConfig::default());
        let formatted = tool.format_results(&json!({"RelatedTopics": []}), 10);
        assert_eq!(formatted, "No results found");
    }

    #[test]
    fn num_results_is_honored_and_capped() {
        let tool = SearchWebTool::new(
            Client::new(),
            WebToolConfig {
                max_results: 3,
                ..Default::default()
            },
        );
        assert_eq!(tool.result_limit(&json!({})), 3);
        assert_eq!(tool.result_limit(&json!({"num_results": 2})), 2);
        assert_eq!(tool.result_limit(&json!({"num_results": 50})), 3);
        assert_eq!(tool.result_limit(&json!({"num_results": 0})), 1);

        let topics: Vec<Value> = (0..5)
            .map(|i| json!({"Text": format!("result {i}"), "FirstURL": "https://example.com"}))
            .collect();
        let formatted = tool.format_results(&json!({"RelatedTopics": topics}), 2);
        assert!(formatted.contains("result 1"));
        assert!(!formatted.contains("result 2"));
    }

    #[tokio::test]
    async fn load_rejects_invalid_url() {
        let err = load_tool().invoke(json!({"url": "not a url"})).await.unwrap_err();
        assert!(err.to_string().contains("invalid URL"));
    }

    #[tokio::test]
    async fn load_rejects_non_http_scheme() {
        let err = load_tool()
            .invoke(json!({"url": "ftp://example.com/x"}))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("HTTP"));
    }

    #[tokio::test]
    async fn search_requires_query() {
        let tool = SearchWebTool::new(Client::new(), WebToolConfig::default());
        let err = tool.invoke(json!({})).await.unwrap_err();
        assert!(err.to_string().contains("query"));
    }
}
