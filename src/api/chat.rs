use http::Method;
use serde_json::Value;

use crate::api::client::ApiClient;
use crate::transport::client::RequestOptions;
use crate::transport::envelope::Envelope;
use crate::utils::constants::GROUP_CHAT_MESSAGES;

/// Send a message to the assistant; the cached conversation is dropped on success.
pub async fn send_message(api: &ApiClient, message: &Value) -> Envelope {
    api.mutate(Method::POST, "/chat/", Some(message), GROUP_CHAT_MESSAGES).await
}

/// Conversation history of the current account
pub async fn history(api: &ApiClient) -> Envelope {
    let key = api.account_key(GROUP_CHAT_MESSAGES);
    api.cached_get(key, "/chat/", RequestOptions::new(), None).await
}
