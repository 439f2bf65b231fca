//! Remote fallback backend
//!
//! Generic interface for asking a language-model backend for a chat reply.
//! Supports a real HTTP implementation (Ollama or OpenAI-compatible) and a
//! scripted fake for tests. Calls are blocking; the resolver runs them on the
//! blocking pool under a timeout.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use crate::config::RemoteSettings;
use crate::conversation::Turn;
use crate::error::{ParleyError, RemoteError};
use crate::locking::lock;

const SYSTEM_PROMPT: &str = "You are a friendly and helpful assistant in a chat. \
Keep responses concise (2-3 sentences max). \
Use emojis occasionally. Be conversational and warm.";

/// Something that can produce a reply given recent history
pub trait RemoteResponder: Send + Sync {
    /// `history` is oldest first and does not include `message`
    fn respond(&self, history: &[Turn], message: &str) -> Result<String, RemoteError>;
}

/// Single-string prompt for completion-style backends
pub fn build_prompt(history: &[Turn], message: &str) -> String {
    let mut transcript = String::new();
    for turn in history {
        transcript.push_str(turn.role.as_str());
        transcript.push_str(": ");
        transcript.push_str(&turn.content);
        transcript.push('\n');
    }

    format!(
        "{}\n\nPrevious conversation:\n{}\nCurrent message from User: {}\n\nYour response:",
        SYSTEM_PROMPT, transcript, message
    )
}

/// Real backend over HTTP
pub struct HttpRemoteResponder {
    settings: RemoteSettings,
    api_key: Option<String>,
    client: reqwest::blocking::Client,
}

impl HttpRemoteResponder {
    pub fn new(settings: RemoteSettings) -> Result<Self, ParleyError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(|e| RemoteError::Http(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            api_key: settings.resolved_api_key(),
            settings,
            client,
        })
    }

    /// Check if endpoint is Ollama-style
    fn is_ollama_endpoint(&self) -> bool {
        self.settings.endpoint.contains("11434") || self.settings.endpoint.contains("ollama")
    }

    fn send(&self, url: &str, body: &serde_json::Value) -> Result<serde_json::Value, RemoteError> {
        let mut request = self.client.post(url).json(body);
        if let Some(api_key) = &self.api_key {
            request = request.bearer_auth(api_key);
        }

        let response = request.send().map_err(|e| {
            if e.is_timeout() {
                RemoteError::Timeout(self.settings.timeout_secs)
            } else {
                RemoteError::Http(format!("Request failed: {}", e))
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(RemoteError::from_http(status.as_u16(), &body));
        }

        response
            .json()
            .map_err(|e| RemoteError::InvalidResponse(format!("Failed to parse response: {}", e)))
    }

    fn call_ollama(&self, history: &[Turn], message: &str) -> Result<String, RemoteError> {
        let url = format!("{}/api/generate", self.settings.endpoint.trim_end_matches('/'));
        let body = serde_json::json!({
            "model": self.settings.model,
            "prompt": build_prompt(history, message),
            "stream": false,
            "options": {
                "temperature": self.settings.temperature,
                "num_predict": self.settings.max_output_tokens,
            },
        });

        let json = self.send(&url, &body)?;
        extract_text(json.get("response"))
    }

    fn call_openai_compatible(&self, history: &[Turn], message: &str) -> Result<String, RemoteError> {
        let url = format!(
            "{}/v1/chat/completions",
            self.settings.endpoint.trim_end_matches('/')
        );

        let mut messages = vec![serde_json::json!({"role": "system", "content": SYSTEM_PROMPT})];
        for turn in history {
            messages.push(serde_json::json!({
                "role": turn.role,
                "content": turn.content,
            }));
        }
        messages.push(serde_json::json!({"role": "user", "content": message}));

        let body = serde_json::json!({
            "model": self.settings.model,
            "messages": messages,
            "temperature": self.settings.temperature,
            "max_tokens": self.settings.max_output_tokens,
        });

        let json = self.send(&url, &body)?;
        extract_text(
            json.get("choices")
                .and_then(|v| v.get(0))
                .and_then(|v| v.get("message"))
                .and_then(|v| v.get("content")),
        )
    }
}

fn extract_text(value: Option<&serde_json::Value>) -> Result<String, RemoteError> {
    let text = value
        .and_then(|v| v.as_str())
        .map(str::trim)
        .ok_or(RemoteError::EmptyResponse)?;
    if text.is_empty() {
        return Err(RemoteError::EmptyResponse);
    }
    Ok(text.to_string())
}

impl RemoteResponder for HttpRemoteResponder {
    fn respond(&self, history: &[Turn], message: &str) -> Result<String, RemoteError> {
        if !self.settings.enabled {
            return Err(RemoteError::Disabled);
        }

        let start = history.len().saturating_sub(self.settings.history_turns);
        let history = &history[start..];

        if self.is_ollama_endpoint() {
            self.call_ollama(history, message)
        } else {
            self.call_openai_compatible(history, message)
        }
    }
}

/// Scripted backend for tests.
///
/// Results are handed out in order; the last one repeats forever.
pub struct FakeRemote {
    responses: Mutex<Vec<Result<String, RemoteError>>>,
    call_count: AtomicUsize,
    delay: Duration,
}

impl FakeRemote {
    pub fn new(responses: Vec<Result<String, RemoteError>>) -> Self {
        Self {
            responses: Mutex::new(responses),
            call_count: AtomicUsize::new(0),
            delay: Duration::ZERO,
        }
    }

    pub fn always_ok(reply: &str) -> Self {
        Self::new(vec![Ok(reply.to_string())])
    }

    pub fn always_error(error: RemoteError) -> Self {
        Self::new(vec![Err(error)])
    }

    /// Sleep this long inside every call
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }
}

impl RemoteResponder for FakeRemote {
    fn respond(&self, _history: &[Turn], _message: &str) -> Result<String, RemoteError> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            std::thread::sleep(self.delay);
        }

        let mut responses = lock(&self.responses);
        match responses.len() {
            0 => Err(RemoteError::EmptyResponse),
            1 => responses[0].clone(),
            _ => responses.remove(0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_includes_history_and_message() {
        let history = vec![Turn::user("hi"), Turn::assistant("Hello!")];
        let prompt = build_prompt(&history, "what's up?");

        assert!(prompt.contains("User: hi\nAssistant: Hello!\n"));
        assert!(prompt.contains("Current message from User: what's up?"));
        assert!(prompt.ends_with("Your response:"));
    }

    #[test]
    fn test_extract_text() {
        let value = serde_json::json!("  hello \n");
        assert_eq!(extract_text(Some(&value)).unwrap(), "hello");
        assert_eq!(extract_text(None), Err(RemoteError::EmptyResponse));
        assert_eq!(
            extract_text(Some(&serde_json::json!("   "))),
            Err(RemoteError::EmptyResponse)
        );
    }

    #[test]
    fn test_http_responder_disabled() {
        let responder = HttpRemoteResponder::new(RemoteSettings::default()).unwrap();
        assert_eq!(responder.respond(&[], "hello"), Err(RemoteError::Disabled));
    }

    #[test]
    fn test_ollama_detection() {
        let responder = HttpRemoteResponder::new(RemoteSettings::default()).unwrap();
        assert!(responder.is_ollama_endpoint());

        let settings = RemoteSettings {
            endpoint: "https://api.example.com".to_string(),
            ..RemoteSettings::default()
        };
        let responder = HttpRemoteResponder::new(settings).unwrap();
        assert!(!responder.is_ollama_endpoint());
    }

    #[test]
    fn test_fake_scripted_sequence() {
        let fake = FakeRemote::new(vec![
            Ok("one".to_string()),
            Err(RemoteError::Timeout(5)),
            Ok("last".to_string()),
        ]);

        assert_eq!(fake.respond(&[], "x").unwrap(), "one");
        assert_eq!(fake.respond(&[], "x"), Err(RemoteError::Timeout(5)));
        assert_eq!(fake.respond(&[], "x").unwrap(), "last");
        assert_eq!(fake.respond(&[], "x").unwrap(), "last");
        assert_eq!(fake.call_count(), 4);
    }

    #[test]
    fn test_fake_empty_script() {
        let fake = FakeRemote::new(vec![]);
        assert_eq!(fake.respond(&[], "x"), Err(RemoteError::EmptyResponse));
    }
}
