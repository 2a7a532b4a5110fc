use std::{collections::HashSet, time::Duration};

use dashmap::DashMap;
use once_cell::sync::Lazy;

use super::{
    bus::{BusConfig, PubSub, PublishOptions, TopicHook},
    message::{Message, Payload},
};
use crate::error::BusResult;

/// Процессная таблица шин по имени области.
/// Crate-private: снаружи доступ только через [`PubSubSolo`].
static SCOPES: Lazy<DashMap<String, PubSub>> = Lazy::new(DashMap::new);

/// Реестр одиночных шин по областям.
///
/// Разрозненные компоненты получают общую шину по строковому имени
/// области, не передавая ссылку друг другу. Экземпляр создаётся лениво
/// при первом обращении; конфигурация применяется только при создании
/// и молча игнорируется в последующих вызовах для той же области.
///
/// Тип не конструируется: все операции являются ассоциированными
/// функциями, область передаётся явным параметром.
pub struct PubSubSolo {
    _private: (),
}

impl PubSubSolo {
    /// Возвращает шину области, создавая её при первом обращении.
    pub fn instance(scope: &str) -> PubSub {
        if let Some(existing) = SCOPES.get(scope) {
            return existing.clone();
        }
        SCOPES
            .entry(scope.to_string())
            .or_insert_with(PubSub::new)
            .clone()
    }

    /// То же с конфигурацией для первого создания.
    ///
    /// Если область уже инициализирована, конфигурация игнорируется
    /// и возвращается существующий экземпляр.
    pub fn instance_with(scope: &str, config: BusConfig) -> BusResult<PubSub> {
        if let Some(existing) = SCOPES.get(scope) {
            return Ok(existing.clone());
        }
        match SCOPES.entry(scope.to_string()) {
            dashmap::mapref::entry::Entry::Occupied(occupied) => Ok(occupied.get().clone()),
            dashmap::mapref::entry::Entry::Vacant(vacant) => {
                let bus = PubSub::with_config(config)?;
                vacant.insert(bus.clone());
                Ok(bus)
            }
        }
    }

    /// `true`, если область уже инициализирована.
    pub fn is_initialized(scope: &str) -> bool {
        SCOPES.contains_key(scope)
    }

    /// Имена всех инициализированных областей.
    pub fn all_scopes() -> HashSet<String> {
        SCOPES.iter().map(|entry| entry.key().clone()).collect()
    }

    /// Останавливает шину области и убирает её из таблицы.
    ///
    /// Следующий `instance` для этой области создаст свежую шину.
    pub fn shutdown(scope: &str) {
        if let Some((_, bus)) = SCOPES.remove(scope) {
            bus.shutdown();
        }
    }

    // Сквозные операции: маршрутизируют вызов в шину области,
    // лениво создавая её при необходимости.

    pub fn subscribe<F>(scope: &str, topic: &str, callback: F) -> BusResult<String>
    where
        F: Fn(&Message) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        Self::instance(scope).subscribe(topic, callback)
    }

    pub fn subscribe_with<F>(
        scope: &str,
        topic: &str,
        correlation_id: Option<&str>,
        callback: F,
    ) -> BusResult<String>
    where
        F: Fn(&Message) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        Self::instance(scope).subscribe_with(topic, correlation_id, callback)
    }

    pub fn publish(scope: &str, topic: &str, data: Payload) -> BusResult<()> {
        Self::instance(scope).publish(topic, data)
    }

    pub fn publish_with(
        scope: &str,
        topic: &str,
        data: Payload,
        options: PublishOptions,
    ) -> BusResult<()> {
        Self::instance(scope).publish_with(topic, data, options)
    }

    pub fn on(scope: &str, topic: &str) -> TopicHook {
        Self::instance(scope).on(topic)
    }

    pub fn unsubscribe(scope: &str, topic: &str, subscriber_id: &str) -> BusResult<()> {
        Self::instance(scope).unsubscribe(topic, subscriber_id)
    }

    pub fn clear(scope: &str, topic: Option<&str>) -> BusResult<()> {
        Self::instance(scope).clear(topic)
    }

    pub async fn drain(scope: &str, timeout: Option<Duration>) -> bool {
        Self::instance(scope).drain(timeout).await
    }

    pub fn correlation_id(scope: &str) -> String {
        Self::instance(scope).correlation_id().to_string()
    }

    pub fn correlation_ids(scope: &str) -> HashSet<String> {
        Self::instance(scope).correlation_ids()
    }

    pub fn is_shutdown(scope: &str) -> bool {
        SCOPES
            .get(scope)
            .map_or(false, |entry| entry.is_shutdown())
    }
}
