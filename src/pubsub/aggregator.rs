use std::{
    sync::atomic::{AtomicBool, Ordering},
    time::Duration,
};

use parking_lot::Mutex;

use super::{
    bus::{BusConfig, PubSub, PublishOptions, TopicHook},
    correlation::MATCH_ANY_CORRELATION,
    message::{Message, Payload},
    pattern::MATCH_ALL_TOPICS,
};
use crate::error::{BusError, BusResult};

/// Управляемая шина и идентификатор её пересылочной подписки.
struct ManagedBus {
    bus: PubSub,
    forward_id: String,
}

/// Агрегатор нескольких шин.
///
/// Владеет одной внутренней шиной для собственных подписчиков и
/// набором внешних управляемых шин. На каждую управляемую шину
/// вешается пересылочная подписка (`"*"` по топику и по correlation
/// id), которая перепубликовывает входящие сообщения во внутреннюю
/// шину. Пересылка строго односторонняя: публикация через агрегатор
/// никогда не попадает в управляемые шины.
///
/// Жизненным циклом управляемых шин агрегатор не владеет, пока
/// каскад не запрошен явно.
pub struct PubSubAggregator {
    internal: PubSub,
    managed: Mutex<Vec<ManagedBus>>,
    shutdown: AtomicBool,
}

impl PubSubAggregator {
    /// Создаёт пустой агрегатор.
    pub fn new() -> Self {
        Self {
            internal: PubSub::new(),
            managed: Mutex::new(Vec::new()),
            shutdown: AtomicBool::new(false),
        }
    }

    /// Создаёт агрегатор с конфигурацией внутренней шины.
    pub fn with_config(config: BusConfig) -> BusResult<Self> {
        Ok(Self {
            internal: PubSub::with_config(config)?,
            managed: Mutex::new(Vec::new()),
            shutdown: AtomicBool::new(false),
        })
    }

    /// Создаёт агрегатор и сразу берёт шины под управление.
    pub fn with_pubsubs(buses: Vec<PubSub>) -> BusResult<Self> {
        let aggregator = Self::new();
        for bus in &buses {
            aggregator.add_pubsub(bus)?;
        }
        Ok(aggregator)
    }

    /// Берёт шину под управление.
    ///
    /// Повторное добавление того же экземпляра возвращает
    /// [`BusError::AlreadyManaged`]; идентичность определяется по
    /// экземпляру, а не по содержимому.
    pub fn add_pubsub(&self, bus: &PubSub) -> BusResult<()> {
        self.ensure_open()?;
        let mut managed = self.managed.lock();
        if managed.iter().any(|entry| entry.bus == *bus) {
            return Err(BusError::AlreadyManaged);
        }
        let internal = self.internal.clone();
        let forward_id = bus.subscribe_with(
            MATCH_ALL_TOPICS,
            Some(MATCH_ANY_CORRELATION),
            move |message| forward(&internal, message),
        )?;
        managed.push(ManagedBus {
            bus: bus.clone(),
            forward_id,
        });
        Ok(())
    }

    /// Снимает шину с управления и отписывает пересылочный хук.
    ///
    /// Шина, уже остановленная со стороны, снимается без ошибок: её
    /// реестр и так пуст.
    pub fn remove_pubsub(&self, bus: &PubSub) -> BusResult<()> {
        let entry = {
            let mut managed = self.managed.lock();
            let position = managed
                .iter()
                .position(|entry| entry.bus == *bus)
                .ok_or(BusError::NotManaged)?;
            managed.remove(position)
        };
        if !entry.bus.is_shutdown() {
            entry.bus.unsubscribe(MATCH_ALL_TOPICS, &entry.forward_id)?;
        }
        Ok(())
    }

    /// Снимок текущего набора управляемых шин.
    pub fn managed_pubsubs(&self) -> Vec<PubSub> {
        self.managed.lock().iter().map(|entry| entry.bus.clone()).collect()
    }

    /// Подписка на внутренней шине.
    pub fn subscribe<F>(&self, topic: &str, callback: F) -> BusResult<String>
    where
        F: Fn(&Message) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.internal.subscribe(topic, callback)
    }

    /// Подписка на внутренней шине с correlation-фильтром.
    pub fn subscribe_with<F>(
        &self,
        topic: &str,
        correlation_id: Option<&str>,
        callback: F,
    ) -> BusResult<String>
    where
        F: Fn(&Message) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.internal.subscribe_with(topic, correlation_id, callback)
    }

    /// Обёртка подписки над топиком внутренней шины.
    pub fn on(&self, topic: &str) -> TopicHook {
        self.internal.on(topic)
    }

    /// Публикация во внутреннюю шину.
    ///
    /// В управляемые шины ничего не пересылается.
    pub fn publish(&self, topic: &str, data: Payload) -> BusResult<()> {
        self.internal.publish(topic, data)
    }

    /// Публикация во внутреннюю шину с параметрами.
    pub fn publish_with(
        &self,
        topic: &str,
        data: Payload,
        options: PublishOptions,
    ) -> BusResult<()> {
        self.internal.publish_with(topic, data, options)
    }

    /// Отписка на внутренней шине.
    pub fn unsubscribe(&self, topic: &str, subscriber_id: &str) -> BusResult<()> {
        self.internal.unsubscribe(topic, subscriber_id)
    }

    /// Очистка подписок внутренней шины.
    pub fn clear(&self, topic: Option<&str>) -> BusResult<()> {
        self.internal.clear(topic)
    }

    /// Ждёт опустошения внутренней шины.
    ///
    /// При каскаде сначала опустошаются все управляемые шины, чтобы
    /// их пересылки успели дойти до внутренней очереди.
    pub async fn drain(&self, timeout: Option<Duration>, cascade: bool) -> bool {
        let mut drained = true;
        if cascade {
            let buses = self.managed_pubsubs();
            for bus in buses {
                drained &= bus.drain(timeout).await;
            }
        }
        let internal_drained = self.internal.drain(timeout).await;
        drained && internal_drained
    }

    /// Останавливает агрегатор.
    ///
    /// Идемпотентна. Сначала снимаются все пересылочные подписки и
    /// очищается набор управляемых шин, затем при каскаде каждая
    /// управляемая шина останавливается; после остановленной шины
    /// ни одно пересланное сообщение уже не придёт.
    pub fn shutdown(&self, cascade: bool) {
        if self.shutdown.swap(true, Ordering::AcqRel) {
            return;
        }
        let entries = std::mem::take(&mut *self.managed.lock());
        for entry in &entries {
            if !entry.bus.is_shutdown() {
                let _ = entry.bus.unsubscribe(MATCH_ALL_TOPICS, &entry.forward_id);
            }
        }
        if cascade {
            for entry in &entries {
                entry.bus.shutdown();
            }
        }
        self.internal.shutdown();
    }

    pub fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::Acquire)
    }

    /// Correlation id внутренней шины.
    pub fn correlation_id(&self) -> &str {
        self.internal.correlation_id()
    }

    /// Копия набора correlation id внутренней шины.
    pub fn correlation_ids(&self) -> std::collections::HashSet<String> {
        self.internal.correlation_ids()
    }

    fn ensure_open(&self) -> BusResult<()> {
        if self.is_shutdown() {
            Err(BusError::Shutdown)
        } else {
            Ok(())
        }
    }
}

impl Default for PubSubAggregator {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for PubSubAggregator {
    fn drop(&mut self) {
        self.shutdown(false);
    }
}

/// Пересылочный колбэк: перепубликовывает сообщение управляемой шины
/// во внутреннюю, сохраняя топик, данные, метаданные и correlation id.
fn forward(internal: &PubSub, message: &Message) -> anyhow::Result<()> {
    let mut options = PublishOptions::new().metadata(message.metadata.clone());
    if let Some(correlation_id) = &message.correlation_id {
        options = options.correlation_id(correlation_id.clone());
    }
    internal.publish_with(&message.topic, message.data.clone(), options)?;
    Ok(())
}
