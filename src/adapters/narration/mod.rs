//! Narration script producers
//!
//! `VerbatimNarration` reads the source text as-is. `ChatNarration` asks an
//! OpenAI-compatible chat completion endpoint to write the lesson and then
//! normalizes sentence punctuation so the speech engine pauses correctly.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{NarrationError, TransportError};
use crate::ports::NarrationPort;

/// Source characters sent to the chat model
const CONTEXT_CHARS: usize = 8000;

const SYSTEM_PROMPT: &str =
    "You are a helpful technical writer who always uses proper punctuation.";

/// First `max_chars` characters of `text`
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_index, _)) => &text[..byte_index],
        None => text,
    }
}

fn is_list_item(trimmed: &str) -> bool {
    if let Some(rest) = trimmed.strip_prefix(['-', '*', '+']) {
        return rest.starts_with(char::is_whitespace);
    }
    let digits = trimmed.chars().take_while(|c| c.is_ascii_digit()).count();
    digits > 0
        && trimmed[digits..].starts_with('.')
        && trimmed[digits + 1..].starts_with(char::is_whitespace)
}

/// Make every prose and list line end with terminal punctuation.
///
/// Blank lines, headers and fenced code are left alone. Prose lines ending in
/// `:` introduce a list and are kept; list items may also end in `:` or `)`.
pub fn ensure_terminal_punctuation(text: &str) -> String {
    let mut in_fence = false;
    let mut fixed = Vec::new();

    for line in text.split('\n') {
        let trimmed = line.trim();
        if trimmed.starts_with("```") {
            in_fence = !in_fence;
            fixed.push(line.to_string());
            continue;
        }
        if in_fence || trimmed.is_empty() || trimmed.starts_with('#') {
            fixed.push(line.to_string());
            continue;
        }

        let mut line = line.trim_end().to_string();
        let accepted: &[char] = if is_list_item(trimmed) {
            &['.', '!', '?', ':', ')']
        } else {
            &['.', '!', '?', ':']
        };
        if !line.ends_with(accepted) {
            line.push('.');
        }
        fixed.push(line);
    }

    fixed.join("\n")
}

/// Uses the source text as the narration script
#[derive(Debug, Clone, Default)]
pub struct VerbatimNarration;

impl VerbatimNarration {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl NarrationPort for VerbatimNarration {
    async fn generate_script(
        &self,
        topic: &str,
        source_text: &str,
    ) -> Result<String, NarrationError> {
        let script = if source_text.trim().is_empty() {
            topic.trim()
        } else {
            source_text.trim()
        };
        if script.is_empty() {
            return Err(NarrationError::Empty);
        }
        Ok(script.to_string())
    }
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: String,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Deserialize)]
struct ChatReply {
    #[serde(default)]
    content: Option<String>,
}

/// Chat completion narration writer
#[derive(Clone)]
pub struct ChatNarration {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
}

impl ChatNarration {
    pub fn new(
        base_url: impl Into<String>,
        api_key: Option<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            client: Client::builder()
                .timeout(timeout)
                .build()
                .unwrap_or_default(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
            model: model.into(),
        }
    }

    fn lesson_prompt(topic: &str, source_text: &str) -> String {
        format!(
            "You are an expert technical instructor.\n\
             Write a clear, engaging spoken lesson for the topic: \"{}\".\n\n\
             Use the following background context:\n{}\n\n\
             Every sentence must end with proper punctuation (. ! or ?).\n\
             Write in complete sentences, introduce the topic, explain the key \
             concepts step by step and finish with a short summary of key takeaways.",
            topic,
            truncate_chars(source_text, CONTEXT_CHARS)
        )
    }
}

#[async_trait]
impl NarrationPort for ChatNarration {
    async fn generate_script(
        &self,
        topic: &str,
        source_text: &str,
    ) -> Result<String, NarrationError> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT.to_string(),
                },
                ChatMessage {
                    role: "user",
                    content: Self::lesson_prompt(topic, source_text),
                },
            ],
        };

        let mut builder = self.client.post(&url).json(&body);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }
        let response = builder.send().await.map_err(|e| TransportError::Request {
            url: url.clone(),
            message: e.to_string(),
        })?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(NarrationError::Service(format!(
                "HTTP {}: {}",
                status,
                text.trim()
            )));
        }

        let reply: ChatResponse = response.json().await.map_err(|e| TransportError::Malformed {
            url: url.clone(),
            message: e.to_string(),
        })?;
        let content = reply
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default();
        if content.trim().is_empty() {
            return Err(NarrationError::Empty);
        }

        let script = ensure_terminal_punctuation(content.trim());
        info!(model = %self.model, chars = script.chars().count(), "Narration script generated");
        Ok(script)
    }
}
