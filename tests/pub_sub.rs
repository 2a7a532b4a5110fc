use std::{
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use serde_json::json;

use molva::{BusConfig, BusError, Message, Payload, PubSub, PublishOptions};

fn payload(value: serde_json::Value) -> Payload {
    match value {
        serde_json::Value::Object(map) => map,
        _ => panic!("ожидался JSON-объект"),
    }
}

/// Тест проверяет базовый сценарий: подписка на топик, публикация,
/// drain и ровно один вызов колбэка с теми же данными.
#[tokio::test]
async fn test_subscribe_publish_drain_roundtrip() {
    let bus = PubSub::new();
    let received = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&received);

    bus.subscribe("user.created", move |msg: &Message| {
        sink.lock().unwrap().push(msg.clone());
        Ok(())
    })
    .unwrap();

    bus.publish("user.created", payload(json!({"id": 1}))).unwrap();
    assert!(bus.drain(None).await);

    let received = received.lock().unwrap();
    assert_eq!(received.len(), 1);
    assert_eq!(received[0].data, payload(json!({"id": 1})));
    assert_eq!(received[0].topic, "user.created");
}

/// Тест проверяет доставку по шаблону: `user.*` получает события
/// user.created и user.updated, но не user.created.v2 и не
/// order.created.
#[tokio::test]
async fn test_pattern_subscription_scope() {
    let bus = PubSub::new();
    let received = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&received);

    bus.subscribe_with("user.*", Some("*"), move |msg: &Message| {
        sink.lock().unwrap().push(msg.topic.clone());
        Ok(())
    })
    .unwrap();

    for topic in ["user.created", "user.updated", "user.created.v2", "order.created"] {
        bus.publish(topic, Payload::new()).unwrap();
    }
    assert!(bus.drain(None).await);

    let received = received.lock().unwrap();
    assert_eq!(*received, vec!["user.created", "user.updated"]);
}

/// Тест проверяет подсчёт доставок при фильтрах по correlation id:
/// точный фильтр получает ровно одно сообщение, фильтр `"*"` оба.
#[tokio::test]
async fn test_correlation_filter_counts() {
    let bus = PubSub::new();
    let exact = Arc::new(AtomicUsize::new(0));
    let any = Arc::new(AtomicUsize::new(0));

    {
        let exact = Arc::clone(&exact);
        bus.subscribe_with("orders", Some("flow-a"), move |_| {
            exact.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
        .unwrap();
    }
    {
        let any = Arc::clone(&any);
        bus.subscribe_with("orders", Some("*"), move |_| {
            any.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
        .unwrap();
    }

    bus.publish_with(
        "orders",
        Payload::new(),
        PublishOptions::new().correlation_id("flow-a"),
    )
    .unwrap();
    bus.publish_with(
        "orders",
        Payload::new(),
        PublishOptions::new().correlation_id("flow-b"),
    )
    .unwrap();
    assert!(bus.drain(None).await);

    assert_eq!(exact.load(Ordering::SeqCst), 1);
    assert_eq!(any.load(Ordering::SeqCst), 2);
}

/// Тест проверяет веерную доставку: 500 подписчиков на одном топике,
/// одна публикация, ровно 500 вызовов.
#[tokio::test]
async fn test_fanout_500_subscribers() {
    let bus = PubSub::new();
    let calls = Arc::new(AtomicUsize::new(0));

    for _ in 0..500 {
        let calls = Arc::clone(&calls);
        bus.subscribe("broadcast", move |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
        .unwrap();
    }

    bus.publish("broadcast", Payload::new()).unwrap();
    assert!(bus.drain(None).await);
    assert_eq!(calls.load(Ordering::SeqCst), 500);
}

/// Тест проверяет порядок доставки: для одного подписчика сообщения
/// приходят строго в порядке публикации, даже при публикации из
/// нескольких потоков внутри каждого потока порядок сохраняется.
#[tokio::test]
async fn test_fifo_order_across_threads() {
    let bus = PubSub::new();
    let received = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&received);

    bus.subscribe_with("seq", Some("*"), move |msg: &Message| {
        let thread = msg.data["thread"].as_i64().unwrap();
        let n = msg.data["n"].as_i64().unwrap();
        sink.lock().unwrap().push((thread, n));
        Ok(())
    })
    .unwrap();

    let handles: Vec<_> = (0..4)
        .map(|thread| {
            let bus = bus.clone();
            std::thread::spawn(move || {
                for n in 0..25 {
                    bus.publish("seq", payload(json!({"thread": thread, "n": n})))
                        .unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert!(bus.drain(None).await);

    let received = received.lock().unwrap();
    assert_eq!(received.len(), 100);
    // порядок внутри каждого потока-публикатора сохранён
    for thread in 0..4 {
        let per_thread: Vec<i64> = received
            .iter()
            .filter(|(t, _)| *t == thread)
            .map(|(_, n)| *n)
            .collect();
        assert_eq!(per_thread, (0..25).collect::<Vec<i64>>());
    }
}

/// Тест проверяет, что подписка с немедленной отпиской не получает
/// последующую публикацию.
#[tokio::test]
async fn test_unsubscribe_before_publish() {
    let bus = PubSub::new();
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);

    let id = bus
        .subscribe("topic", move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
        .unwrap();
    bus.unsubscribe("topic", &id).unwrap();

    bus.publish("topic", Payload::new()).unwrap();
    assert!(bus.drain(None).await);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

/// Тест проверяет изоляцию сбоев: подписчик с ошибкой не мешает
/// зарегистрированным после него получить то же сообщение.
#[tokio::test]
async fn test_error_isolation_between_subscribers() {
    let errors = Arc::new(Mutex::new(Vec::new()));
    let error_sink = Arc::clone(&errors);
    let bus = PubSub::with_config(BusConfig::new().error_handler(move |error, topic| {
        error_sink
            .lock()
            .unwrap()
            .push((error.to_string(), topic.to_string()));
        Ok(())
    }))
    .unwrap();

    let calls = Arc::new(Mutex::new(Vec::new()));
    {
        let calls = Arc::clone(&calls);
        bus.subscribe("topic", move |_| {
            calls.lock().unwrap().push("first");
            Ok(())
        })
        .unwrap();
    }
    bus.subscribe("topic", |_| Err(anyhow::anyhow!("subscriber failure")))
        .unwrap();
    {
        let calls = Arc::clone(&calls);
        bus.subscribe("topic", move |_| {
            calls.lock().unwrap().push("third");
            Ok(())
        })
        .unwrap();
    }

    bus.publish("topic", Payload::new()).unwrap();
    assert!(bus.drain(None).await);

    assert_eq!(*calls.lock().unwrap(), vec!["first", "third"]);
    let errors = errors.lock().unwrap();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].0.contains("subscriber failure"));
    assert_eq!(errors[0].1, "topic");
}

/// Тест проверяет конкурентную подписку из нескольких потоков:
/// все 50 подписчиков получают публикацию.
#[tokio::test]
async fn test_concurrent_subscriptions() {
    let bus = PubSub::new();
    let calls = Arc::new(AtomicUsize::new(0));

    let handles: Vec<_> = (0..5)
        .map(|_| {
            let bus = bus.clone();
            let calls = Arc::clone(&calls);
            std::thread::spawn(move || {
                for _ in 0..10 {
                    let calls = Arc::clone(&calls);
                    bus.subscribe("topic", move |_| {
                        calls.fetch_add(1, Ordering::SeqCst);
                        Ok(())
                    })
                    .unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    bus.publish("topic", Payload::new()).unwrap();
    assert!(bus.drain(None).await);
    assert_eq!(calls.load(Ordering::SeqCst), 50);
}

/// Тест проверяет жизненный цикл: после shutdown мутирующие операции
/// падают, drain возвращает true, свойства читаются.
#[tokio::test]
async fn test_shutdown_lifecycle() {
    let bus = PubSub::with_config(BusConfig::new().correlation_id("bus-main")).unwrap();
    bus.subscribe("topic", |_| Ok(())).unwrap();

    bus.shutdown();
    bus.shutdown();
    assert!(bus.is_shutdown());
    assert_eq!(bus.subscribe("topic", |_| Ok(())), Err(BusError::Shutdown));
    assert_eq!(bus.publish("topic", Payload::new()), Err(BusError::Shutdown));
    assert!(bus.drain(Some(Duration::from_millis(5))).await);
    assert_eq!(bus.correlation_id(), "bus-main");
    assert!(bus.correlation_ids().contains("bus-main"));
    assert!(bus.topics().is_empty());
}

/// Тест проверяет, что сообщения, опубликованные до shutdown, но не
/// доставленные, после shutdown уже не вызывают колбэки.
#[tokio::test]
async fn test_shutdown_stops_pending_deliveries() {
    let bus = PubSub::new();
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    bus.subscribe("topic", move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(())
    })
    .unwrap();

    // публикуем и сразу останавливаем, не дожидаясь доставки
    for _ in 0..100 {
        bus.publish("topic", Payload::new()).unwrap();
    }
    bus.shutdown();

    // реестр очищен, поэтому недоставленный остаток уже никого не вызовет
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(calls.load(Ordering::SeqCst) <= 100);
    assert!(bus.drain(None).await);
}
