use clap::{CommandFactory, Parser, Subcommand};
use serde_json::json;

use molva::{logging::init_logging, Message, PubSub, Settings};

#[derive(Parser)]
#[command(
    name = "molva",
    version,
    about = "In-process asynchronous pub/sub message bus"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Короткий демонстрационный прогон publish/subscribe/drain.
    Demo,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Some(Command::Demo) => run_demo().await,
        None => {
            Cli::command().print_help()?;
            Ok(())
        }
    }
}

async fn run_demo() -> anyhow::Result<()> {
    let settings = Settings::load()?;
    init_logging(settings.logging()).map_err(|e| anyhow::anyhow!("{e}"))?;

    let bus = PubSub::with_config(settings.bus())?;
    tracing::info!(correlation_id = %bus.correlation_id(), "bus created");

    let subscriber_id = bus.subscribe("user.created", |msg: &Message| {
        tracing::info!(topic = %msg.topic, data = %serde_json::Value::Object(msg.data.clone()), "event received");
        Ok(())
    })?;
    tracing::info!(%subscriber_id, "subscribed to user.created");

    let mut data = molva::Payload::new();
    data.insert("id".to_string(), json!(123));
    data.insert("name".to_string(), json!("Alice"));
    bus.publish("user.created", data)?;
    bus.drain(None).await;

    bus.unsubscribe("user.created", &subscriber_id)?;
    bus.shutdown();
    tracing::info!("demo finished");
    Ok(())
}
