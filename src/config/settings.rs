use config::{Config, ConfigError, Environment};
use serde::{Deserialize, Serialize};

use crate::{logging::LoggingConfig, pubsub::BusConfig};

#[derive(Debug, Serialize, Deserialize)]
pub struct Settings {
    pub log_level: String,
    pub log_json: bool,
    /// Correlation id шины по умолчанию; если не задан, генерируется.
    pub correlation_id: Option<String>,
}

impl Settings {
    pub fn load() -> Result<Self, ConfigError> {
        let cfg = Config::builder()
            // Значения по умолчанию
            .set_default("log_level", "info")?
            .set_default("log_json", false)?
            // Переменные окружения с префиксом MOLVA_
            .add_source(Environment::with_prefix("MOLVA"))
            .build()?;

        cfg.try_deserialize()
    }

    /// Конфигурация логирования из настроек.
    pub fn logging(&self) -> LoggingConfig {
        LoggingConfig {
            level: self.log_level.clone(),
            json: self.log_json,
            ..LoggingConfig::default()
        }
    }

    /// Конфигурация шины из настроек.
    pub fn bus(&self) -> BusConfig {
        let mut config = BusConfig::new();
        if let Some(correlation_id) = &self.correlation_id {
            config = config.correlation_id(correlation_id.clone());
        }
        config
    }
}
