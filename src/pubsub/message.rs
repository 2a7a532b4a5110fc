use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::pattern::validate_topic;
use crate::error::{BusError, BusResult};

/// Полезная нагрузка сообщения: JSON-объект со строковыми ключами.
pub type Payload = serde_json::Map<String, Value>;

/// Неизменяемое сообщение шины.
///
/// Конструктор валидирует топик; остальные поля фиксируются в момент
/// создания. Метка времени по умолчанию берётся в UTC на момент
/// конструирования.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Топик, в который было опубликовано сообщение.
    pub topic: String,
    /// Данные события.
    pub data: Payload,
    /// Момент создания сообщения (UTC).
    pub timestamp: DateTime<Utc>,
    /// Служебные метаданные, по умолчанию пустые.
    #[serde(default)]
    pub metadata: Payload,
    /// Correlation id, проставленный при публикации.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,
}

impl Message {
    /// Создаёт сообщение с пустыми метаданными и без correlation id.
    pub fn new(topic: impl Into<String>, data: Payload) -> BusResult<Self> {
        Self::with_details(topic, data, Payload::new(), None)
    }

    /// Создаёт сообщение со всеми полями.
    pub fn with_details(
        topic: impl Into<String>,
        data: Payload,
        metadata: Payload,
        correlation_id: Option<String>,
    ) -> BusResult<Self> {
        let topic = topic.into();
        validate_topic(&topic)?;
        Ok(Self {
            topic,
            data,
            timestamp: Utc::now(),
            metadata,
            correlation_id,
        })
    }

    /// Создаёт сообщение из динамического JSON-значения.
    ///
    /// Значение обязано быть объектом, иначе возвращается
    /// [`BusError::InvalidPayload`].
    pub fn from_value(topic: impl Into<String>, data: Value) -> BusResult<Self> {
        match data {
            Value::Object(map) => Self::new(topic, map),
            _ => Err(BusError::InvalidPayload),
        }
    }
}
