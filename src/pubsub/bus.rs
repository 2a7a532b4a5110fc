use std::{
    collections::HashSet,
    fmt,
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};

use parking_lot::RwLock;
use tokio::sync::{mpsc, Notify};

use super::{
    correlation::{generate_correlation_id, validate_correlation_id, MATCH_ANY_CORRELATION},
    message::{Message, Payload},
    registry::{CorrelationFilter, Registry, SubscriberCallback},
};
use crate::error::{BusError, BusResult, CorrelationError};

/// Обработчик ошибок подписчиков.
///
/// Вызывается для каждой ошибки колбэка с самой ошибкой и топиком
/// сообщения. Ошибка самого обработчика не перехватывается: остаток
/// подписчиков текущего сообщения пропускается, диспетчер переходит
/// к следующему сообщению очереди.
pub type ErrorHandler = Arc<dyn Fn(&anyhow::Error, &str) -> anyhow::Result<()> + Send + Sync>;

/// Конфигурация шины при создании.
///
/// Пустой или отсутствующий correlation id означает автогенерацию.
#[derive(Default)]
pub struct BusConfig {
    pub correlation_id: Option<String>,
    pub error_handler: Option<ErrorHandler>,
}

impl BusConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn correlation_id(mut self, correlation_id: impl Into<String>) -> Self {
        self.correlation_id = Some(correlation_id.into());
        self
    }

    pub fn error_handler<F>(mut self, handler: F) -> Self
    where
        F: Fn(&anyhow::Error, &str) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.error_handler = Some(Arc::new(handler));
        self
    }
}

/// Необязательные параметры публикации.
#[derive(Default)]
pub struct PublishOptions {
    /// Correlation id сообщения; пустая строка и `None` заменяются
    /// на id экземпляра шины. `"*"` отклоняется.
    pub correlation_id: Option<String>,
    /// Метаданные сообщения.
    pub metadata: Option<Payload>,
}

impl PublishOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn correlation_id(mut self, correlation_id: impl Into<String>) -> Self {
        self.correlation_id = Some(correlation_id.into());
        self
    }

    pub fn metadata(mut self, metadata: Payload) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

/// Разделяемое состояние шины.
///
/// Реестр и набор correlation id защищены отдельными замками; оба
/// никогда не удерживаются во время вызова колбэков.
struct BusShared {
    registry: RwLock<Registry>,
    correlation_ids: RwLock<HashSet<String>>,
    /// Сообщения, принятые publish и ещё не завершившие доставку.
    pending: AtomicUsize,
    /// Сигнал "очередь опустела" для drain.
    idle: Notify,
    shutdown: AtomicBool,
    correlation_id: String,
    error_handler: ErrorHandler,
}

impl Drop for BusShared {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::Release);
        self.registry.get_mut().remove_all(None);
    }
}

/// Асинхронная шина публикации-подписки.
///
/// Publish ставит сообщение во внутреннюю FIFO-очередь и сразу
/// возвращается; фоновая задача диспетчера доставляет сообщения
/// подходящим подписчикам строго по одному. Для одной шины колбэки
/// никогда не выполняются параллельно друг другу.
///
/// Экземпляр дёшево клонируется: все клоны разделяют одно состояние.
/// Создавать шину нужно внутри работающего tokio runtime.
#[derive(Clone)]
pub struct PubSub {
    shared: Arc<BusShared>,
    tx: mpsc::UnboundedSender<Message>,
}

impl PubSub {
    /// Создаёт шину с автогенерированным correlation id и
    /// логирующим обработчиком ошибок.
    pub fn new() -> Self {
        Self::build(generate_correlation_id(), default_error_handler())
    }

    /// Создаёт шину с конфигурацией.
    ///
    /// Явный непустой correlation id проходит валидацию.
    pub fn with_config(config: BusConfig) -> BusResult<Self> {
        let correlation_id = match config.correlation_id.as_deref() {
            None | Some("") => generate_correlation_id(),
            Some(id) => {
                validate_correlation_id(id)?;
                id.to_string()
            }
        };
        let handler = config.error_handler.unwrap_or_else(default_error_handler);
        Ok(Self::build(correlation_id, handler))
    }

    fn build(correlation_id: String, error_handler: ErrorHandler) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut seen = HashSet::new();
        seen.insert(correlation_id.clone());
        let shared = Arc::new(BusShared {
            registry: RwLock::new(Registry::new()),
            correlation_ids: RwLock::new(seen),
            pending: AtomicUsize::new(0),
            idle: Notify::new(),
            shutdown: AtomicBool::new(false),
            correlation_id,
            error_handler,
        });
        tokio::spawn(dispatch_loop(Arc::clone(&shared), rx));
        Self { shared, tx }
    }

    /// Подписка на топик с фильтром по correlation id экземпляра.
    pub fn subscribe<F>(&self, topic: &str, callback: F) -> BusResult<String>
    where
        F: Fn(&Message) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.subscribe_with(topic, None, callback)
    }

    /// Подписка с явным фильтром по correlation id.
    ///
    /// `None` и пустая строка означают точный фильтр по id экземпляра,
    /// `"*"` пропускает любой correlation id, прочие значения проходят
    /// валидацию и используются как точный фильтр.
    ///
    /// Топиком может быть шаблон с подстановками либо `"*"`,
    /// совпадающий со всеми топиками.
    pub fn subscribe_with<F>(
        &self,
        topic: &str,
        correlation_id: Option<&str>,
        callback: F,
    ) -> BusResult<String>
    where
        F: Fn(&Message) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.ensure_open()?;
        let filter = self.correlation_filter(correlation_id)?;
        let callback: SubscriberCallback = Arc::new(callback);
        self.shared.registry.write().add(topic, filter, callback)
    }

    /// Подписка в форме обёртки над топиком: `bus.on("user.created")
    /// .handler(|msg| ...)`.
    pub fn on(&self, topic: &str) -> TopicHook {
        TopicHook {
            bus: self.clone(),
            topic: topic.to_string(),
        }
    }

    /// Публикация с параметрами по умолчанию.
    pub fn publish(&self, topic: &str, data: Payload) -> BusResult<()> {
        self.publish_with(topic, data, PublishOptions::default())
    }

    /// Публикация сообщения в топик.
    ///
    /// Неблокирующая операция: сообщение ставится в очередь доставки,
    /// а разрешённый correlation id фиксируется в наборе всех
    /// встреченных id.
    pub fn publish_with(
        &self,
        topic: &str,
        data: Payload,
        options: PublishOptions,
    ) -> BusResult<()> {
        self.ensure_open()?;
        let correlation_id = self.resolve_correlation(options.correlation_id.as_deref())?;
        let message = Message::with_details(
            topic,
            data,
            options.metadata.unwrap_or_default(),
            Some(correlation_id.clone()),
        )?;
        self.shared.correlation_ids.write().insert(correlation_id);
        self.shared.pending.fetch_add(1, Ordering::AcqRel);
        if self.tx.send(message).is_err() {
            self.shared.pending.fetch_sub(1, Ordering::AcqRel);
            return Err(BusError::Shutdown);
        }
        Ok(())
    }

    /// Точное удаление подписки.
    ///
    /// Неизвестная пара (топик, id), включая повторную отписку,
    /// возвращает [`BusError::UnknownSubscriber`].
    pub fn unsubscribe(&self, topic: &str, subscriber_id: &str) -> BusResult<()> {
        self.ensure_open()?;
        self.shared.registry.write().remove(topic, subscriber_id)
    }

    /// Очищает одну корзину подписок или весь реестр.
    ///
    /// Отсутствие подписок не считается ошибкой.
    pub fn clear(&self, topic: Option<&str>) -> BusResult<()> {
        self.ensure_open()?;
        self.shared.registry.write().remove_all(topic);
        Ok(())
    }

    /// Ждёт, пока очередь доставки опустеет и текущая доставка
    /// завершится.
    ///
    /// Возвращает `true` при полном опустошении, `false` по таймауту.
    /// Таймаут ничего не отменяет: сообщение в полёте доедет позже.
    /// После shutdown немедленно возвращает `true`.
    pub async fn drain(&self, timeout: Option<Duration>) -> bool {
        if self.is_shutdown() {
            return true;
        }
        let deadline = timeout.map(|t| tokio::time::Instant::now() + t);
        loop {
            let notified = self.shared.idle.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if self.shared.pending.load(Ordering::Acquire) == 0 {
                return true;
            }
            match deadline {
                None => notified.await,
                Some(deadline) => {
                    if tokio::time::timeout_at(deadline, notified).await.is_err() {
                        return self.shared.pending.load(Ordering::Acquire) == 0;
                    }
                }
            }
        }
    }

    /// Останавливает шину.
    ///
    /// Идемпотентна. Выставляет флаг и очищает реестр: новые колбэки
    /// не вызываются, а уже начатая доставка завершается штатно.
    pub fn shutdown(&self) {
        if self.shared.shutdown.swap(true, Ordering::AcqRel) {
            return;
        }
        self.shared.registry.write().remove_all(None);
    }

    /// Correlation id экземпляра.
    pub fn correlation_id(&self) -> &str {
        &self.shared.correlation_id
    }

    /// Копия набора всех correlation id, встреченных шиной.
    pub fn correlation_ids(&self) -> HashSet<String> {
        self.shared.correlation_ids.read().clone()
    }

    pub fn is_shutdown(&self) -> bool {
        self.shared.shutdown.load(Ordering::Acquire)
    }

    /// Список активных фильтров топиков.
    pub fn topics(&self) -> Vec<String> {
        self.shared.registry.read().topics()
    }

    /// Количество подписок на конкретный фильтр топика.
    pub fn subscriber_count(&self, topic: &str) -> usize {
        self.shared.registry.read().subscriber_count(topic)
    }

    fn ensure_open(&self) -> BusResult<()> {
        if self.is_shutdown() {
            Err(BusError::Shutdown)
        } else {
            Ok(())
        }
    }

    fn correlation_filter(&self, correlation_id: Option<&str>) -> BusResult<CorrelationFilter> {
        match correlation_id {
            None | Some("") => Ok(CorrelationFilter::Exact(
                self.shared.correlation_id.clone(),
            )),
            Some(MATCH_ANY_CORRELATION) => Ok(CorrelationFilter::Any),
            Some(id) => {
                validate_correlation_id(id)?;
                Ok(CorrelationFilter::Exact(id.to_string()))
            }
        }
    }

    fn resolve_correlation(&self, correlation_id: Option<&str>) -> BusResult<String> {
        match correlation_id {
            None | Some("") => Ok(self.shared.correlation_id.clone()),
            Some(MATCH_ANY_CORRELATION) => Err(CorrelationError::WildcardValue.into()),
            Some(id) => {
                validate_correlation_id(id)?;
                Ok(id.to_string())
            }
        }
    }
}

impl Default for PubSub {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for PubSub {
    /// Две ручки равны, когда указывают на один и тот же экземпляр.
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.shared, &other.shared)
    }
}

impl Eq for PubSub {}

impl fmt::Debug for PubSub {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PubSub")
            .field("correlation_id", &self.shared.correlation_id)
            .field("is_shutdown", &self.is_shutdown())
            .field("pending", &self.shared.pending.load(Ordering::Relaxed))
            .finish()
    }
}

/// Обёртка подписки над одним топиком, аналог декоратора.
///
/// Держит собственную ручку шины, поэтому её можно вернуть из
/// функции и использовать позже.
pub struct TopicHook {
    bus: PubSub,
    topic: String,
}

impl TopicHook {
    /// Регистрирует колбэк на топик обёртки.
    pub fn handler<F>(self, callback: F) -> BusResult<String>
    where
        F: Fn(&Message) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.bus.subscribe(&self.topic, callback)
    }

    /// То же с явным correlation-фильтром.
    pub fn handler_with<F>(self, correlation_id: &str, callback: F) -> BusResult<String>
    where
        F: Fn(&Message) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.bus
            .subscribe_with(&self.topic, Some(correlation_id), callback)
    }
}

fn default_error_handler() -> ErrorHandler {
    Arc::new(|error, topic| {
        tracing::error!(topic, error = %error, "subscriber callback failed");
        Ok(())
    })
}

/// Цикл диспетчера: одна фоновая задача на шину.
///
/// Сообщения обрабатываются в порядке публикации. Счётчик pending
/// уменьшается после завершения доставки, поэтому drain видит и
/// очередь, и сообщение в полёте.
async fn dispatch_loop(shared: Arc<BusShared>, mut rx: mpsc::UnboundedReceiver<Message>) {
    while let Some(message) = rx.recv().await {
        if !shared.shutdown.load(Ordering::Acquire) {
            dispatch_message(&shared, &message);
        }
        if shared.pending.fetch_sub(1, Ordering::AcqRel) == 1 {
            shared.idle.notify_waiters();
        }
    }
}

/// Доставка одного сообщения.
///
/// Срез подходящих подписчиков снимается под замком реестра, сами
/// колбэки выполняются уже без замка, поэтому колбэк может свободно
/// подписываться, отписываться и публиковать на этой же шине.
fn dispatch_message(shared: &BusShared, message: &Message) {
    let callbacks = shared
        .registry
        .read()
        .snapshot(&message.topic, message.correlation_id.as_deref());
    for callback in callbacks {
        if let Err(error) = callback(message) {
            if let Err(handler_error) = (shared.error_handler)(&error, &message.topic) {
                tracing::error!(
                    topic = %message.topic,
                    error = %handler_error,
                    "error handler failed, remaining subscribers for this message are skipped"
                );
                break;
            }
        }
    }
}
