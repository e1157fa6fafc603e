//! Player → lead messages, lead → player direct messages, and the merged chat view.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::{is_false, now, ServiceError, ServiceResult};
use crate::store::{Datastore, Direction, Entity, EntityExt, Key, Query};

const PLAYER_FIELD: &str = "playerID";
const TIMESTAMP_FIELD: &str = "timestamp";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerMessage {
    /// Storage key, filled in on load.
    #[serde(default)]
    pub id: i64,
    #[serde(rename = "playerID")]
    pub player_id: String,
    pub content: String,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    pub is_read: bool,
}

impl Entity for PlayerMessage {
    const KIND: &'static str = "PlayerMessage";

    fn with_key(mut self, key: &Key) -> Self {
        if let Some(id) = key.as_id() {
            self.id = id;
        }
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectMessage {
    #[serde(default)]
    pub id: i64,
    #[serde(rename = "playerID")]
    pub player_id: String,
    pub content: String,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
}

impl Entity for DirectMessage {
    const KIND: &'static str = "DirectMessage";

    fn with_key(mut self, key: &Key) -> Self {
        if let Some(id) = key.as_id() {
            self.id = id;
        }
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatSender {
    Player,
    Lead,
}

/// One line of a player's conversation with the leads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub from: ChatSender,
    pub content: String,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    #[serde(default, skip_serializing_if = "is_false")]
    pub is_read: bool,
}

#[derive(Clone)]
pub struct MessageService {
    store: Arc<dyn Datastore>,
}

impl MessageService {
    pub fn new(store: Arc<dyn Datastore>) -> Self {
        Self { store }
    }

    /// Append an unread message from a player. Returns the new message id.
    pub fn send_player_message(&self, player_id: &str, content: &str) -> ServiceResult<i64> {
        let msg = PlayerMessage {
            id: 0,
            player_id: player_id.to_string(),
            content: content.to_string(),
            timestamp: now(),
            is_read: false,
        };
        let key = self.store.insert_entity(&msg)?;
        Ok(key.as_id().unwrap_or_default())
    }

    pub fn latest_player_message(&self, player_id: &str) -> ServiceResult<Option<PlayerMessage>> {
        let query = Self::latest_for::<PlayerMessage>(player_id);
        Ok(self.store.query_entities(&query)?.into_iter().next())
    }

    /// Flag a message as read. Marking an already-read message is a no-op.
    pub fn mark_read(&self, message_id: i64) -> ServiceResult<PlayerMessage> {
        let key = Key::Id(message_id);
        let mut msg = self
            .store
            .get_entity::<PlayerMessage>(&key)?
            .ok_or_else(|| ServiceError::NotFound(format!("message {message_id}")))?;
        msg.is_read = true;
        self.store.put_entity(key, &msg)?;
        Ok(msg)
    }

    /// Append a message from the leads to a player. Returns the new message id.
    pub fn send_direct_message(&self, player_id: &str, content: &str) -> ServiceResult<i64> {
        let dm = DirectMessage {
            id: 0,
            player_id: player_id.to_string(),
            content: content.to_string(),
            timestamp: now(),
        };
        let key = self.store.insert_entity(&dm)?;
        Ok(key.as_id().unwrap_or_default())
    }

    pub fn latest_direct_message(&self, player_id: &str) -> ServiceResult<Option<DirectMessage>> {
        let query = Self::latest_for::<DirectMessage>(player_id);
        Ok(self.store.query_entities(&query)?.into_iter().next())
    }

    /// Every player message, newest first.
    pub fn all_player_messages(&self) -> ServiceResult<Vec<PlayerMessage>> {
        let query = Query::of::<PlayerMessage>().order_by(TIMESTAMP_FIELD, Direction::Descending);
        Ok(self.store.query_entities(&query)?)
    }

    /// Both sides of a player's conversation, oldest first.
    pub fn chat_history(&self, player_id: &str) -> ServiceResult<Vec<ChatMessage>> {
        let from_player = self
            .store
            .query_entities::<PlayerMessage>(&Self::for_player::<PlayerMessage>(player_id))?;
        let from_lead = self
            .store
            .query_entities::<DirectMessage>(&Self::for_player::<DirectMessage>(player_id))?;

        let mut chat: Vec<ChatMessage> = from_player
            .into_iter()
            .map(|m| ChatMessage {
                from: ChatSender::Player,
                content: m.content,
                timestamp: m.timestamp,
                is_read: m.is_read,
            })
            .chain(from_lead.into_iter().map(|m| ChatMessage {
                from: ChatSender::Lead,
                content: m.content,
                timestamp: m.timestamp,
                is_read: false,
            }))
            .collect();
        chat.sort_by_key(|m| m.timestamp);
        Ok(chat)
    }

    fn for_player<E: Entity>(player_id: &str) -> Query {
        Query::of::<E>().filter_eq(PLAYER_FIELD, player_id)
    }

    fn latest_for<E: Entity>(player_id: &str) -> Query {
        Self::for_player::<E>(player_id)
            .order_by(TIMESTAMP_FIELD, Direction::Descending)
            .limit(1)
    }
}
