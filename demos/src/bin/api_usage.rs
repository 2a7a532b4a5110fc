use std::sync::{Arc, Mutex};

use serde_json::json;

use molva::{Message, Payload, PubSub, PublishOptions, TopicPattern};

fn payload(value: serde_json::Value) -> Payload {
    match value {
        serde_json::Value::Object(map) => map,
        other => panic!("ожидался JSON-объект, получено {other}"),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    println!("=== Molva: базовые примеры API ===\n");

    example_1_basic_pubsub().await?;
    example_2_multiple_subscribers().await?;
    example_3_on_hook().await?;
    example_4_topic_patterns().await?;
    example_5_correlation_filters().await?;
    example_6_error_handling().await?;

    println!("\n=== Все примеры завершены ===");
    Ok(())
}

/// Пример 1: базовая публикация-подписка.
async fn example_1_basic_pubsub() -> anyhow::Result<()> {
    println!("Example 1: Basic publish-subscribe");
    println!("----------------------------------");

    let bus = PubSub::new();

    let subscriber_id = bus.subscribe("user.created", |msg: &Message| {
        println!(
            "  событие {}: {}",
            msg.topic,
            serde_json::Value::Object(msg.data.clone())
        );
        Ok(())
    })?;
    println!("подписка оформлена: {}...", &subscriber_id[..8]);

    bus.publish("user.created", payload(json!({"id": 123, "name": "Alice"})))?;
    bus.drain(None).await;

    bus.unsubscribe("user.created", &subscriber_id)?;
    // публикация без подписчиков не является ошибкой
    bus.publish("user.created", payload(json!({"id": 456, "name": "Bob"})))?;
    bus.drain(None).await;
    bus.shutdown();
    println!();
    Ok(())
}

/// Пример 2: несколько подписчиков на одном топике.
async fn example_2_multiple_subscribers() -> anyhow::Result<()> {
    println!("Example 2: Multiple subscribers, fan-out");
    println!("----------------------------------------");

    let bus = PubSub::new();

    bus.subscribe("order.created", |msg: &Message| {
        println!("  [LOG] топик {}", msg.topic);
        Ok(())
    })?;
    bus.subscribe("order.created", |msg: &Message| {
        println!("  [STORE] сохранение заказа {}", msg.data["order_id"]);
        Ok(())
    })?;
    bus.subscribe("order.created", |_msg: &Message| {
        println!("  [NOTIFY] рассылка уведомлений");
        Ok(())
    })?;

    bus.publish(
        "order.created",
        payload(json!({"order_id": "ORD-001", "total": 99.99})),
    )?;
    bus.drain(None).await;
    bus.shutdown();
    println!();
    Ok(())
}

/// Пример 3: подписка через обёртку on().
async fn example_3_on_hook() -> anyhow::Result<()> {
    println!("Example 3: on() hook");
    println!("--------------------");

    let bus = PubSub::new();
    bus.on("user.created").handler(|msg: &Message| {
        println!("  новый пользователь: {}", msg.data["name"]);
        Ok(())
    })?;

    bus.publish("user.created", payload(json!({"name": "Carol"})))?;
    bus.drain(None).await;
    bus.shutdown();
    println!();
    Ok(())
}

/// Пример 4: шаблоны топиков.
async fn example_4_topic_patterns() -> anyhow::Result<()> {
    println!("Example 4: Topic patterns");
    println!("-------------------------");

    let pattern = TopicPattern::compile("user.*")?;
    for topic in ["user.created", "user.updated", "user.created.v2", "order.created"] {
        println!("  {} ~ user.* -> {}", topic, pattern.matches(topic));
    }

    let bus = PubSub::new();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    bus.subscribe_with("user.*", Some("*"), move |msg: &Message| {
        sink.lock().unwrap().push(msg.topic.clone());
        Ok(())
    })?;

    bus.publish("user.created", Payload::new())?;
    bus.publish("user.deleted", Payload::new())?;
    bus.publish("billing.charged", Payload::new())?;
    bus.drain(None).await;

    println!("  подписчик user.* получил: {:?}", seen.lock().unwrap());
    bus.shutdown();
    println!();
    Ok(())
}

/// Пример 5: фильтры по correlation id.
async fn example_5_correlation_filters() -> anyhow::Result<()> {
    println!("Example 5: Correlation filters");
    println!("------------------------------");

    let bus = PubSub::new();
    bus.subscribe_with("payments", Some("flow-a"), |msg: &Message| {
        println!("  [flow-a] {:?}", msg.correlation_id);
        Ok(())
    })?;
    bus.subscribe_with("payments", Some("*"), |msg: &Message| {
        println!("  [any] {:?}", msg.correlation_id);
        Ok(())
    })?;

    bus.publish_with(
        "payments",
        Payload::new(),
        PublishOptions::new().correlation_id("flow-a"),
    )?;
    bus.publish_with(
        "payments",
        Payload::new(),
        PublishOptions::new().correlation_id("flow-b"),
    )?;
    bus.drain(None).await;
    bus.shutdown();
    println!();
    Ok(())
}

/// Пример 6: обработка ошибок подписчиков.
async fn example_6_error_handling() -> anyhow::Result<()> {
    println!("Example 6: Subscriber error handling");
    println!("------------------------------------");

    let bus = molva::PubSub::with_config(molva::BusConfig::new().error_handler(
        |error, topic| {
            println!("  обработчик ошибок: топик {topic}, ошибка: {error}");
            Ok(())
        },
    ))?;

    bus.subscribe("jobs", |_| Err(anyhow::anyhow!("задача не разобрана")))?;
    bus.subscribe("jobs", |_| {
        println!("  второй подписчик отработал несмотря на сбой первого");
        Ok(())
    })?;

    bus.publish("jobs", Payload::new())?;
    bus.drain(None).await;
    bus.shutdown();
    println!();
    Ok(())
}
