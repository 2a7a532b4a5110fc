use std::{
    collections::{hash_map::Entry, HashMap},
    sync::Arc,
};

use uuid::Uuid;

use super::{
    message::Message,
    pattern::{TopicPattern, MATCH_ALL_TOPICS},
};
use crate::error::{BusError, BusResult};

/// Колбэк подписчика.
///
/// Принимает доставленное сообщение; ошибка возврата перенаправляется
/// обработчику ошибок шины и не прерывает доставку остальным
/// подписчикам.
pub type SubscriberCallback = Arc<dyn Fn(&Message) -> anyhow::Result<()> + Send + Sync>;

/// Фильтр по correlation id, зафиксированный при подписке.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum CorrelationFilter {
    /// Совпадает с любым correlation id.
    Any,
    /// Совпадает только с точным значением.
    Exact(String),
}

impl CorrelationFilter {
    pub(crate) fn accepts(&self, correlation_id: Option<&str>) -> bool {
        match self {
            CorrelationFilter::Any => true,
            CorrelationFilter::Exact(expected) => correlation_id == Some(expected.as_str()),
        }
    }
}

/// Одна запись подписки внутри корзины.
pub(crate) struct SubscriberEntry {
    pub id: String,
    /// Глобальный порядковый номер регистрации на шине.
    pub seq: u64,
    pub filter: CorrelationFilter,
    pub callback: SubscriberCallback,
}

/// Фильтр топика, закреплённый за корзиной.
enum TopicFilter {
    /// Зарезервированная корзина `"*"`: любой топик.
    All,
    Pattern(TopicPattern),
}

impl TopicFilter {
    fn matches(&self, topic: &str) -> bool {
        match self {
            TopicFilter::All => true,
            TopicFilter::Pattern(pattern) => pattern.matches(topic),
        }
    }
}

struct Bucket {
    filter: TopicFilter,
    entries: Vec<SubscriberEntry>,
}

/// Реестр подписчиков: фильтр топика -> упорядоченный список записей.
///
/// Сам по себе не потокобезопасен: шина держит его под своим замком
/// и снимает срез подходящих записей до вызова колбэков.
pub(crate) struct Registry {
    buckets: HashMap<String, Bucket>,
    next_seq: u64,
}

impl Registry {
    pub(crate) fn new() -> Self {
        Self {
            buckets: HashMap::new(),
            next_seq: 0,
        }
    }

    /// Регистрирует подписку и возвращает её идентификатор.
    ///
    /// Ключом корзины служит строка фильтра в исходном виде. `"*"`
    /// попадает в зарезервированную корзину, минуя компиляцию шаблона.
    pub(crate) fn add(
        &mut self,
        topic_filter: &str,
        filter: CorrelationFilter,
        callback: SubscriberCallback,
    ) -> BusResult<String> {
        let bucket = match self.buckets.entry(topic_filter.to_string()) {
            Entry::Occupied(occupied) => occupied.into_mut(),
            Entry::Vacant(vacant) => {
                let filter = if topic_filter == MATCH_ALL_TOPICS {
                    TopicFilter::All
                } else {
                    TopicFilter::Pattern(TopicPattern::compile(topic_filter)?)
                };
                vacant.insert(Bucket {
                    filter,
                    entries: Vec::new(),
                })
            }
        };
        let id = Uuid::new_v4().to_string();
        let seq = self.next_seq;
        self.next_seq += 1;
        bucket.entries.push(SubscriberEntry {
            id: id.clone(),
            seq,
            filter,
            callback,
        });
        Ok(id)
    }

    /// Удаляет подписку по паре (фильтр топика, идентификатор).
    ///
    /// Пустая корзина после удаления выбрасывается целиком.
    pub(crate) fn remove(&mut self, topic_filter: &str, subscriber_id: &str) -> BusResult<()> {
        let not_found = || BusError::UnknownSubscriber {
            topic: topic_filter.to_string(),
            subscriber_id: subscriber_id.to_string(),
        };
        let bucket = self.buckets.get_mut(topic_filter).ok_or_else(not_found)?;
        let position = bucket
            .entries
            .iter()
            .position(|entry| entry.id == subscriber_id)
            .ok_or_else(not_found)?;
        bucket.entries.remove(position);
        if bucket.entries.is_empty() {
            self.buckets.remove(topic_filter);
        }
        Ok(())
    }

    /// Очищает одну корзину или весь реестр.
    pub(crate) fn remove_all(&mut self, topic_filter: Option<&str>) {
        match topic_filter {
            Some(topic) => {
                self.buckets.remove(topic);
            }
            None => self.buckets.clear(),
        }
    }

    /// Срез подходящих колбэков для сообщения.
    ///
    /// Объединяет все корзины, чей фильтр совпадает с топиком, включая
    /// зарезервированную `"*"`, отбрасывает записи с несовпавшим
    /// correlation-фильтром и возвращает колбэки в порядке регистрации.
    pub(crate) fn snapshot(
        &self,
        topic: &str,
        correlation_id: Option<&str>,
    ) -> Vec<SubscriberCallback> {
        let mut matched: Vec<(u64, SubscriberCallback)> = Vec::new();
        for bucket in self.buckets.values() {
            if !bucket.filter.matches(topic) {
                continue;
            }
            for entry in &bucket.entries {
                if entry.filter.accepts(correlation_id) {
                    matched.push((entry.seq, Arc::clone(&entry.callback)));
                }
            }
        }
        matched.sort_by_key(|(seq, _)| *seq);
        matched.into_iter().map(|(_, callback)| callback).collect()
    }

    /// Список зарегистрированных фильтров топиков.
    pub(crate) fn topics(&self) -> Vec<String> {
        self.buckets.keys().cloned().collect()
    }

    /// Количество подписок в корзине фильтра.
    pub(crate) fn subscriber_count(&self, topic_filter: &str) -> usize {
        self.buckets
            .get(topic_filter)
            .map_or(0, |bucket| bucket.entries.len())
    }
}
