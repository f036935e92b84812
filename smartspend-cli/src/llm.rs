use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use smartspend_intake::{parser_prompt, ExpenseParser, ParsedExpense, RuleParser, PARSER_INSTRUCTIONS};

use crate::auth::AuthState;
use crate::config::LlmSection;

const OPENAI_BASE: &str = "https://api.openai.com/v1";
const ANTHROPIC_BASE: &str = "https://api.anthropic.com/v1";
const ANTHROPIC_DEFAULT_MODEL: &str = "claude-3-5-haiku-latest";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    OpenAI,
    Anthropic,
    Rules,
}

impl Provider {
    pub fn parse(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(Provider::OpenAI),
            "anthropic" => Ok(Provider::Anthropic),
            "rules" | "offline" => Ok(Provider::Rules),
            other => bail!("unknown llm provider {other:?} (expected openai, anthropic or rules)"),
        }
    }
}

/// Expense parser backed by a hosted chat model.
#[derive(Debug, Clone)]
pub struct LlmParser {
    provider: Provider,
    model: String,
    base_url: String,
    key: String,
    temperature: f32,
    client: reqwest::Client,
}

impl LlmParser {
    pub fn new(provider: Provider, cfg: &LlmSection, key: String) -> Result<Self> {
        let default_base = match provider {
            Provider::Anthropic => ANTHROPIC_BASE,
            _ => OPENAI_BASE,
        };
        // the shipped default model is an OpenAI one
        let model = if provider == Provider::Anthropic && cfg.model.starts_with("gpt-") {
            ANTHROPIC_DEFAULT_MODEL.to_string()
        } else {
            cfg.model.clone()
        };
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_secs.max(1)))
            .build()
            .context("build http client")?;
        Ok(Self {
            provider,
            model,
            base_url: cfg
                .base_url
                .clone()
                .unwrap_or_else(|| default_base.to_string())
                .trim_end_matches('/')
                .to_string(),
            key,
            temperature: cfg.temperature,
            client,
        })
    }

    pub async fn complete(&self, system: &str, user: &str) -> Result<String> {
        match self.provider {
            Provider::Anthropic => self.anthropic_complete(system, user).await,
            _ => self.openai_complete(system, user).await,
        }
    }

    async fn anthropic_complete(&self, system: &str, user: &str) -> Result<String> {
        #[derive(Serialize)]
        struct Msg<'a> {
            role: &'a str,
            content: &'a str,
        }

        #[derive(Serialize)]
        struct Req<'a> {
            model: &'a str,
            max_tokens: i32,
            temperature: f32,
            system: &'a str,
            messages: Vec<Msg<'a>>,
        }

        #[derive(Deserialize)]
        struct Resp {
            content: Vec<ContentBlock>,
        }

        #[derive(Deserialize)]
        struct ContentBlock {
            #[serde(rename = "type")]
            t: String,
            text: Option<String>,
        }

        let body = Req {
            model: &self.model,
            max_tokens: 300,
            temperature: self.temperature,
            system,
            messages: vec![Msg {
                role: "user",
                content: user,
            }],
        };

        let mut headers = HeaderMap::new();
        headers.insert("x-api-key", HeaderValue::from_str(&self.key)?);
        headers.insert("anthropic-version", HeaderValue::from_static("2023-06-01"));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let resp = self
            .client
            .post(format!("{}/messages", self.base_url))
            .headers(headers)
            .json(&body)
            .send()
            .await
            .context("anthropic request")?;

        let status = resp.status();
        if !status.is_success() {
            let txt = resp.text().await.unwrap_or_default();
            bail!("anthropic error: {status} {txt}");
        }

        let out: Resp = resp.json().await.context("parse anthropic response")?;
        let s: String = out
            .content
            .into_iter()
            .filter(|b| b.t == "text")
            .filter_map(|b| b.text)
            .collect();
        Ok(s.trim().to_string())
    }

    async fn openai_complete(&self, system: &str, user: &str) -> Result<String> {
        #[derive(Serialize)]
        struct Msg<'a> {
            role: &'a str,
            content: &'a str,
        }

        #[derive(Serialize)]
        struct Req<'a> {
            model: &'a str,
            messages: Vec<Msg<'a>>,
            temperature: f32,
        }

        #[derive(Deserialize)]
        struct Resp {
            choices: Vec<Choice>,
        }

        #[derive(Deserialize)]
        struct Choice {
            message: MsgOut,
        }

        #[derive(Deserialize)]
        struct MsgOut {
            content: Option<String>,
        }

        let body = Req {
            model: &self.model,
            messages: vec![
                Msg {
                    role: "system",
                    content: system,
                },
                Msg {
                    role: "user",
                    content: user,
                },
            ],
            temperature: self.temperature,
        };

        let resp = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header(AUTHORIZATION, format!("Bearer {}", self.key))
            .json(&body)
            .send()
            .await
            .context("openai request")?;

        let status = resp.status();
        if !status.is_success() {
            let txt = resp.text().await.unwrap_or_default();
            bail!("openai error: {status} {txt}");
        }

        let out: Resp = resp.json().await.context("parse openai response")?;
        let content = out
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default();
        Ok(content.trim().to_string())
    }
}

#[async_trait]
impl ExpenseParser for LlmParser {
    async fn parse(&self, text: &str, today: NaiveDate) -> Result<ParsedExpense> {
        let reply = self
            .complete(PARSER_INSTRUCTIONS, &parser_prompt(text, today))
            .await?;
        debug!(provider = ?self.provider, reply = %reply, "model reply");
        ParsedExpense::from_model_text(&reply)
    }
}

/// Pick the parser the config asks for.
///
/// A hosted provider without a stored key falls back to the offline rule
/// parser so `chat` and `add` keep working.
pub fn parser_from_config(cfg: &LlmSection, auth: &AuthState) -> Result<Arc<dyn ExpenseParser>> {
    let provider = Provider::parse(&cfg.provider)?;
    let key = match provider {
        Provider::OpenAI => auth.openai_api_key.clone(),
        Provider::Anthropic => auth.anthropic_token.clone(),
        Provider::Rules => None,
    };
    match key {
        Some(key) => Ok(Arc::new(LlmParser::new(provider, cfg, key)?)),
        None => {
            if provider != Provider::Rules {
                warn!(?provider, "no api key stored, using the offline rule parser");
            }
            Ok(Arc::new(RuleParser::new()?))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_string_contains, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 18).unwrap()
    }

    fn section(base: &str) -> LlmSection {
        LlmSection {
            base_url: Some(base.to_string()),
            ..LlmSection::default()
        }
    }

    #[test]
    fn test_provider_parse() {
        assert_eq!(Provider::parse("OpenAI").unwrap(), Provider::OpenAI);
        assert_eq!(Provider::parse(" anthropic ").unwrap(), Provider::Anthropic);
        assert_eq!(Provider::parse("rules").unwrap(), Provider::Rules);
        assert!(Provider::parse("gemini").is_err());
    }

    #[tokio::test]
    async fn test_openai_reply_is_parsed() {
        let server = MockServer::start().await;
        let content = r#"{"amount": 2000, "category": "Food", "description": "dinner", "date": "2026-10-17"}"#;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("authorization", "Bearer sk-test"))
            .and(body_string_contains("Current date: 2026-10-18"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {"role": "assistant", "content": content}}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let p = LlmParser::new(Provider::OpenAI, &section(&server.uri()), "sk-test".into()).unwrap();
        let parsed = p.parse("dinner 2000 yesterday", today()).await.unwrap();
        assert_eq!(parsed.amount, Some(2000.0));
        assert_eq!(parsed.category.as_deref(), Some("Food"));
        assert_eq!(parsed.date.as_deref(), Some("2026-10-17"));
    }

    #[tokio::test]
    async fn test_anthropic_reply_is_parsed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/messages"))
            .and(header("x-api-key", "sk-ant-test"))
            .and(header("anthropic-version", "2023-06-01"))
            .and(body_string_contains(ANTHROPIC_DEFAULT_MODEL))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "content": [
                    {"type": "text", "text": "Here you go: {\"amount\": 300, \"category\": \"Transport\", \"description\": \"uber\", \"date\": null}"}
                ]
            })))
            .mount(&server)
            .await;

        let p = LlmParser::new(
            Provider::Anthropic,
            &section(&server.uri()),
            "sk-ant-test".into(),
        )
        .unwrap();
        let parsed = p.parse("uber 300", today()).await.unwrap();
        assert_eq!(parsed.amount, Some(300.0));
        assert_eq!(parsed.date, None);
    }

    #[tokio::test]
    async fn test_http_error_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_string("bad key"))
            .mount(&server)
            .await;

        let p = LlmParser::new(Provider::OpenAI, &section(&server.uri()), "sk-x".into()).unwrap();
        let err = p.parse("lunch 100", today()).await.unwrap_err();
        let msg = format!("{err:#}");
        assert!(msg.contains("openai error"), "{msg}");
        assert!(msg.contains("401"), "{msg}");
    }

    #[tokio::test]
    async fn test_missing_key_falls_back_to_rules() {
        let parser = parser_from_config(&LlmSection::default(), &AuthState::default()).unwrap();
        let parsed = parser.parse("coffee 120", today()).await.unwrap();
        assert_eq!(parsed.amount, Some(120.0));
        assert_eq!(parsed.category.as_deref(), Some("Food"));
    }

    #[test]
    fn test_unknown_provider_is_an_error() {
        let cfg = LlmSection {
            provider: "mystery".into(),
            ..LlmSection::default()
        };
        assert!(parser_from_config(&cfg, &AuthState::default()).is_err());
    }
}
