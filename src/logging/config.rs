use serde::{Deserialize, Serialize};

/// Конфигурация логирования.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Уровень либо директивы фильтра в синтаксисе EnvFilter.
    pub level: String,
    /// Вывод в консоль.
    pub console_enabled: bool,
    /// JSON-формат вместо текстового.
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            console_enabled: true,
            json: false,
        }
    }
}

impl LoggingConfig {
    /// Переопределения из окружения: `MOLVA_LOG_LEVEL`, `MOLVA_LOG_JSON`.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(level) = std::env::var("MOLVA_LOG_LEVEL") {
            if !level.is_empty() {
                self.level = level;
            }
        }
        if let Ok(json) = std::env::var("MOLVA_LOG_JSON") {
            self.json = matches!(json.as_str(), "1" | "true" | "yes");
        }
    }
}
