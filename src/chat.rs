use crate::model::{ChatMessage, Role};
use crate::storage::{self, Store};
use anyhow::{bail, Result};
use serde_json::{json, Value};

pub const ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const CONFIGURE_KEY_PROMPT: &str =
    "No API key is configured. Run `studyhall config --api-key <key>` and try again.";
pub const EMPTY_COMPLETION: &str = "(no response)";

pub struct ChatClient {
    endpoint: String,
    api_key: String,
    model: String,
}

impl ChatClient {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        ChatClient {
            endpoint: ENDPOINT.to_string(),
            api_key: api_key.into(),
            model: model.into(),
        }
    }

    /// One blocking request carrying the entire history. Failures come
    /// back as a formatted string, never an error: the caller appends
    /// whatever this returns as the assistant's reply.
    pub fn complete(&self, history: &[ChatMessage]) -> String {
        let body = request_body(&self.model, history);
        let result = ureq::post(&self.endpoint)
            .set("Authorization", &format!("Bearer {}", self.api_key))
            .send_json(body);
        match result {
            Ok(response) => match response.into_json::<Value>() {
                Ok(value) => extract_content(&value),
                Err(err) => format!("Error: unreadable response: {}", err),
            },
            Err(ureq::Error::Status(code, _)) => {
                format!("Error: request failed with status {}", code)
            }
            Err(err) => format!("Error: {}", err),
        }
    }
}

/// Appends the user message, persists, performs the exchange, persists
/// the assistant reply. Only an empty input or a failed write is an
/// error; remote failures land in the history as assistant text.
pub fn send(store: &Store, history: &mut Vec<ChatMessage>, input: &str) -> Result<()> {
    let input = input.trim();
    if input.is_empty() {
        bail!("message is empty");
    }
    history.push(ChatMessage::new(Role::User, input));
    store.save(storage::CHAT_HISTORY, history)?;

    let api_key: String = store.load(storage::API_KEY, String::new());
    let reply = if api_key.trim().is_empty() {
        CONFIGURE_KEY_PROMPT.to_string()
    } else {
        let model: String = store.load(storage::CHAT_MODEL, DEFAULT_MODEL.to_string());
        ChatClient::new(api_key, model).complete(history)
    };
    history.push(ChatMessage::new(Role::Assistant, reply));
    store.save(storage::CHAT_HISTORY, history)?;
    Ok(())
}

fn request_body(model: &str, history: &[ChatMessage]) -> Value {
    let messages: Vec<Value> = history
        .iter()
        .map(|m| {
            json!({
                "role": match m.role {
                    Role::User => "user",
                    Role::Assistant => "assistant",
                },
                "content": m.content,
            })
        })
        .collect();
    json!({ "model": model, "messages": messages })
}

fn extract_content(response: &Value) -> String {
    response["choices"][0]["message"]["content"]
        .as_str()
        .map(str::to_string)
        .unwrap_or_else(|| EMPTY_COMPLETION.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{distributions::Alphanumeric, Rng};

    fn scratch_store() -> Store {
        let suffix: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(8)
            .map(char::from)
            .collect();
        Store::at(std::env::temp_dir().join(format!("studyhall-chat-{}", suffix)))
    }

    #[test]
    fn request_body_carries_full_history_and_model() {
        let history = vec![
            ChatMessage::new(Role::User, "hello"),
            ChatMessage::new(Role::Assistant, "hi"),
            ChatMessage::new(Role::User, "explain fractions"),
        ];
        let body = request_body("gpt-4o-mini", &history);
        assert_eq!(body["model"], "gpt-4o-mini");
        let messages = body["messages"].as_array().unwrap();
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[0]["role"], "user");
        assert_eq!(messages[1]["role"], "assistant");
        assert_eq!(messages[2]["content"], "explain fractions");
        // Role and content only; timestamps stay local.
        assert!(messages[0].get("ts").is_none());
    }

    #[test]
    fn extract_content_reads_first_choice() {
        let response = serde_json::json!({
            "choices": [{"message": {"role": "assistant", "content": "sure thing"}}]
        });
        assert_eq!(extract_content(&response), "sure thing");
    }

    #[test]
    fn extract_content_falls_back_on_missing_choice() {
        assert_eq!(extract_content(&serde_json::json!({})), EMPTY_COMPLETION);
        assert_eq!(
            extract_content(&serde_json::json!({"choices": []})),
            EMPTY_COMPLETION
        );
    }

    #[test]
    fn send_rejects_empty_input() {
        let store = scratch_store();
        let mut history = Vec::new();
        assert!(send(&store, &mut history, "   ").is_err());
        assert!(history.is_empty());
    }

    #[test]
    fn send_without_key_appends_prompt_and_skips_network() {
        let store = scratch_store();
        let mut history = Vec::new();
        send(&store, &mut history, "help me study").unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].role, Role::User);
        assert_eq!(history[0].content, "help me study");
        assert_eq!(history[1].role, Role::Assistant);
        assert_eq!(history[1].content, CONFIGURE_KEY_PROMPT);
        let persisted: Vec<ChatMessage> = store.load(storage::CHAT_HISTORY, Vec::new());
        assert_eq!(persisted.len(), 2);
    }
}
