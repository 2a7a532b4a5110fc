use std::sync::{Arc, Mutex};

use serde_json::json;

use molva::{BusConfig, Message, Payload, PubSubSolo};

fn payload(value: serde_json::Value) -> Payload {
    match value {
        serde_json::Value::Object(map) => map,
        other => panic!("ожидался JSON-объект, получено {other}"),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    println!("=== Molva: примеры реестра одиночных шин ===\n");

    example_1_shared_scope().await?;
    example_2_scope_isolation().await?;
    example_3_config_on_first_use().await?;

    println!("\n=== Все примеры завершены ===");
    Ok(())
}

/// Пример 1: два компонента делят шину по имени области.
async fn example_1_shared_scope() -> anyhow::Result<()> {
    println!("Example 1: Shared scope");
    println!("-----------------------");

    // потребитель знает только имя области
    PubSubSolo::subscribe("orders", "order.paid", |msg: &Message| {
        println!("  оплата получена: {}", msg.data["order_id"]);
        Ok(())
    })?;

    // производитель обращается к той же области из другого места
    PubSubSolo::publish("orders", "order.paid", payload(json!({"order_id": "ORD-7"})))?;
    PubSubSolo::drain("orders", None).await;

    PubSubSolo::shutdown("orders");
    println!();
    Ok(())
}

/// Пример 2: области изолированы друг от друга.
async fn example_2_scope_isolation() -> anyhow::Result<()> {
    println!("Example 2: Scope isolation");
    println!("--------------------------");

    let billing_events = Arc::new(Mutex::new(0usize));
    let sink = Arc::clone(&billing_events);
    PubSubSolo::subscribe("billing", "event", move |_| {
        *sink.lock().unwrap() += 1;
        Ok(())
    })?;

    PubSubSolo::publish("analytics", "event", Payload::new())?;
    PubSubSolo::drain("analytics", None).await;
    PubSubSolo::drain("billing", None).await;

    println!(
        "  событий в billing после публикации в analytics: {}",
        billing_events.lock().unwrap()
    );
    println!("  области: {:?}", PubSubSolo::all_scopes());

    PubSubSolo::shutdown("billing");
    PubSubSolo::shutdown("analytics");
    println!();
    Ok(())
}

/// Пример 3: конфигурация применяется только при первом обращении.
async fn example_3_config_on_first_use() -> anyhow::Result<()> {
    println!("Example 3: Config on first use");
    println!("------------------------------");

    let first = PubSubSolo::instance_with(
        "configured",
        BusConfig::new().correlation_id("primary-flow"),
    )?;
    let second = PubSubSolo::instance_with(
        "configured",
        BusConfig::new().correlation_id("ignored-flow"),
    )?;

    println!("  один и тот же экземпляр: {}", first == second);
    println!("  действующий correlation id: {}", second.correlation_id());

    PubSubSolo::shutdown("configured");
    println!();
    Ok(())
}
