//! Подсистема Publish–Subscribe (pub/sub).
//!
//! Внутрипроцессная асинхронная шина сообщений с доставкой через
//! фоновый диспетчер:
//!
//! - `pattern`: шаблоны топиков и их сопоставление.
//! - `correlation`: правила и генерация correlation id.
//! - `message`: структура сообщения и полезная нагрузка.
//! - `registry` (приватный): реестр подписчиков с корзинами фильтров.
//! - `bus`: движок диспетчеризации `PubSub` с очередью доставки.
//! - `aggregator`: объединение нескольких шин в одну точку подписки.
//! - `solo`: процессный реестр одиночных шин по областям.
//!
//! Публичный API переэкспортирует основные типы всех вложенных
//! модулей, чтобы упростить доступ к ним из внешнего кода.

pub mod aggregator;
pub mod bus;
pub mod correlation;
pub mod message;
pub mod pattern;
mod registry;
pub mod solo;

pub use aggregator::PubSubAggregator;
pub use bus::{BusConfig, ErrorHandler, PubSub, PublishOptions, TopicHook};
pub use correlation::{
    generate_correlation_id, is_valid_correlation_id, validate_correlation_id,
    MATCH_ANY_CORRELATION,
};
pub use message::{Message, Payload};
pub use pattern::{validate_topic, TopicPattern, MATCH_ALL_TOPICS, TOPIC_SEPARATOR};
pub use registry::SubscriberCallback;
pub use solo::PubSubSolo;
