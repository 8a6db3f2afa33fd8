//! Channel activities
//!
//! One inbound [`Activity`] drives exactly one turn. The wire shape follows the
//! common chat-channel activity schema (`type`, `from`, `recipient`,
//! `conversation`, `membersAdded`) so a channel connector can post it as-is.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of inbound activity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ActivityKind {
    /// A user message carrying text
    Message,
    /// Members joined or left the conversation
    ConversationUpdate,
    /// Any other event type, kept verbatim
    Other(String),
}

impl ActivityKind {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Message => "message",
            Self::ConversationUpdate => "conversationUpdate",
            Self::Other(raw) => raw.as_str(),
        }
    }
}

impl From<String> for ActivityKind {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "message" => Self::Message,
            "conversationUpdate" => Self::ConversationUpdate,
            _ => Self::Other(raw),
        }
    }
}

impl From<ActivityKind> for String {
    fn from(kind: ActivityKind) -> Self {
        kind.as_str().to_string()
    }
}

impl fmt::Display for ActivityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A participant on the channel (user or bot)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ChannelAccount {
    /// Channel-specific participant id
    pub id: String,
    /// Display name
    #[serde(default)]
    pub name: String,
}

impl ChannelAccount {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// Conversation the activity belongs to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ConversationAccount {
    pub id: String,
}

/// Inbound activity (one per turn)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    /// Activity type
    #[serde(rename = "type")]
    pub kind: ActivityKind,
    /// Channel-assigned activity id
    #[serde(default)]
    pub id: Option<String>,
    /// Message text (messages only)
    #[serde(default)]
    pub text: Option<String>,
    /// Sender
    #[serde(default)]
    pub from: ChannelAccount,
    /// Receiver (the bot itself)
    #[serde(default)]
    pub recipient: ChannelAccount,
    /// Conversation reference
    #[serde(default)]
    pub conversation: ConversationAccount,
    /// Channel name (e.g. "webchat", "emulator")
    #[serde(default)]
    pub channel_id: String,
    /// Members added (conversation updates only)
    #[serde(default)]
    pub members_added: Vec<ChannelAccount>,
}

impl Activity {
    /// Build a user message activity
    pub fn message(
        conversation_id: impl Into<String>,
        from: ChannelAccount,
        text: impl Into<String>,
    ) -> Self {
        Self {
            kind: ActivityKind::Message,
            id: None,
            text: Some(text.into()),
            from,
            recipient: ChannelAccount::new("bot", "Bot"),
            conversation: ConversationAccount {
                id: conversation_id.into(),
            },
            channel_id: "test".to_string(),
            members_added: Vec::new(),
        }
    }

    /// Build a members-added conversation update
    pub fn members_added(
        conversation_id: impl Into<String>,
        recipient: ChannelAccount,
        members: Vec<ChannelAccount>,
    ) -> Self {
        Self {
            kind: ActivityKind::ConversationUpdate,
            id: None,
            text: None,
            from: members.first().cloned().unwrap_or_default(),
            recipient,
            conversation: ConversationAccount {
                id: conversation_id.into(),
            },
            channel_id: "test".to_string(),
            members_added: members,
        }
    }

    /// Message text, or empty when absent
    pub fn text(&self) -> &str {
        self.text.as_deref().unwrap_or("")
    }

    /// Members added to the conversation, excluding the bot itself
    pub fn added_users(&self) -> impl Iterator<Item = &ChannelAccount> {
        self.members_added
            .iter()
            .filter(move |member| member.id != self.recipient.id)
    }

    /// Key for conversation-scoped state
    pub fn conversation_key(&self) -> String {
        format!("{}/conversations/{}", self.channel_id, self.conversation.id)
    }

    /// Key for user-scoped state
    pub fn user_key(&self) -> String {
        format!("{}/users/{}", self.channel_id, self.from.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_activity_kind_roundtrip() {
        assert_eq!(ActivityKind::from("message".to_string()), ActivityKind::Message);
        assert_eq!(
            ActivityKind::from("conversationUpdate".to_string()),
            ActivityKind::ConversationUpdate
        );
        assert_eq!(
            ActivityKind::from("typing".to_string()),
            ActivityKind::Other("typing".to_string())
        );
        assert_eq!(ActivityKind::Other("typing".into()).to_string(), "typing");
    }

    #[test]
    fn test_activity_deserialization() {
        let json = r#"{
            "type": "conversationUpdate",
            "recipient": {"id": "bot-1", "name": "CampusBot"},
            "conversation": {"id": "c-1"},
            "channelId": "webchat",
            "membersAdded": [
                {"id": "bot-1", "name": "CampusBot"},
                {"id": "u-1", "name": "Ana"}
            ]
        }"#;

        let activity: Activity = serde_json::from_str(json).unwrap();
        assert_eq!(activity.kind, ActivityKind::ConversationUpdate);
        assert_eq!(activity.text(), "");

        let added: Vec<_> = activity.added_users().map(|m| m.name.as_str()).collect();
        assert_eq!(added, vec!["Ana"]);
    }

    #[test]
    fn test_state_keys() {
        let mut activity = Activity::message("c-9", ChannelAccount::new("u-3", "Luis"), "hola");
        activity.channel_id = "webchat".to_string();

        assert_eq!(activity.conversation_key(), "webchat/conversations/c-9");
        assert_eq!(activity.user_key(), "webchat/users/u-3");
    }
}
