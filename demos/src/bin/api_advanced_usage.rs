use std::sync::{Arc, Mutex};

use serde_json::json;

use molva::{Message, Payload, PubSub, PubSubAggregator};

fn payload(value: serde_json::Value) -> Payload {
    match value {
        serde_json::Value::Object(map) => map,
        other => panic!("ожидался JSON-объект, получено {other}"),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    println!("=== Molva: примеры работы агрегатора ===\n");

    example_1_basic_aggregator().await?;
    example_2_dynamic_add_remove().await?;
    example_3_cascade_shutdown().await?;
    example_4_cascade_drain().await?;

    println!("\n=== Все примеры завершены ===");
    Ok(())
}

/// Пример 1: объединение независимых шин в одну точку подписки.
async fn example_1_basic_aggregator() -> anyhow::Result<()> {
    println!("Example 1: Unified subscriber view");
    println!("----------------------------------");

    let pack_b = PubSub::new();
    let pack_c = PubSub::new();
    let aggregator = PubSubAggregator::with_pubsubs(vec![pack_b.clone(), pack_c.clone()])?;

    aggregator.subscribe_with("user.created", Some("*"), |msg: &Message| {
        println!("  объединённый обработчик: source={}", msg.data["source"]);
        Ok(())
    })?;

    pack_b.publish("user.created", payload(json!({"id": 1, "source": "pack-b"})))?;
    pack_c.publish("user.created", payload(json!({"id": 2, "source": "pack-c"})))?;

    aggregator.drain(None, true).await;
    aggregator.shutdown(true);
    println!();
    Ok(())
}

/// Пример 2: динамическое добавление и снятие шин.
async fn example_2_dynamic_add_remove() -> anyhow::Result<()> {
    println!("Example 2: Dynamic add/remove");
    println!("-----------------------------");

    let bus_a = PubSub::new();
    let bus_b = PubSub::new();
    let aggregator = PubSubAggregator::new();

    let received = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&received);
    aggregator.subscribe_with("event.topic", Some("*"), move |msg: &Message| {
        sink.lock()
            .unwrap()
            .push(format!("{}:{}", msg.data["source"], msg.data["step"]));
        Ok(())
    })?;

    aggregator.add_pubsub(&bus_a)?;
    bus_a.publish("event.topic", payload(json!({"source": "bus_a", "step": 1})))?;
    aggregator.drain(None, true).await;

    aggregator.add_pubsub(&bus_b)?;
    bus_b.publish("event.topic", payload(json!({"source": "bus_b", "step": 2})))?;
    aggregator.drain(None, true).await;

    // снятая шина больше не пересылает
    aggregator.remove_pubsub(&bus_a)?;
    bus_a.publish("event.topic", payload(json!({"source": "bus_a", "step": 3})))?;
    bus_a.drain(None).await;
    aggregator.drain(None, false).await;

    bus_b.publish("event.topic", payload(json!({"source": "bus_b", "step": 4})))?;
    aggregator.drain(None, true).await;

    println!("  получено: {:?}", received.lock().unwrap());
    aggregator.shutdown(true);
    bus_a.shutdown();
    println!();
    Ok(())
}

/// Пример 3: каскадная остановка.
async fn example_3_cascade_shutdown() -> anyhow::Result<()> {
    println!("Example 3: Cascade shutdown");
    println!("---------------------------");

    let bus_a = PubSub::new();
    let bus_b = PubSub::new();
    let aggregator = PubSubAggregator::with_pubsubs(vec![bus_a.clone(), bus_b.clone()])?;

    aggregator.shutdown(true);
    println!(
        "  aggregator={}, bus_a={}, bus_b={}",
        aggregator.is_shutdown(),
        bus_a.is_shutdown(),
        bus_b.is_shutdown()
    );
    println!();
    Ok(())
}

/// Пример 4: каскадное опустошение очередей.
async fn example_4_cascade_drain() -> anyhow::Result<()> {
    println!("Example 4: Cascade drain");
    println!("------------------------");

    let bus_a = PubSub::new();
    let bus_b = PubSub::new();
    let aggregator = PubSubAggregator::with_pubsubs(vec![bus_a.clone(), bus_b.clone()])?;

    let counter = Arc::new(Mutex::new(0usize));
    let sink = Arc::clone(&counter);
    aggregator.subscribe_with("test.topic", Some("*"), move |_| {
        *sink.lock().unwrap() += 1;
        Ok(())
    })?;

    aggregator.publish("test.topic", payload(json!({"source": "aggregator"})))?;
    bus_a.publish("test.topic", payload(json!({"source": "bus_a"})))?;
    bus_b.publish("test.topic", payload(json!({"source": "bus_b"})))?;

    // каскад сначала опустошает источники, затем внутреннюю шину
    aggregator.drain(None, true).await;
    println!("  доставлено сообщений: {}", counter.lock().unwrap());

    aggregator.shutdown(true);
    println!();
    Ok(())
}
