pub mod config;

pub use config::LoggingConfig;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Инициализация логирования с конфигурацией.
///
/// Повторный вызов в том же процессе вернёт ошибку от уже
/// установленного глобального подписчика.
pub fn init_logging(
    mut config: LoggingConfig,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    config.apply_env_overrides();
    let env_filter = EnvFilter::try_new(&config.level)?;
    let registry = tracing_subscriber::registry().with(env_filter);

    if !config.console_enabled {
        registry.try_init()?;
    } else if config.json {
        registry.with(tracing_subscriber::fmt::layer().json()).try_init()?;
    } else {
        registry.with(tracing_subscriber::fmt::layer()).try_init()?;
    }

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        log_level = %config.level,
        json = config.json,
        "logging initialized"
    );
    Ok(())
}
