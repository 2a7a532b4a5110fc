use thiserror::Error;

/// Минимальная длина явно заданного correlation id.
pub const CORRELATION_ID_MIN_LEN: usize = 2;
/// Максимальная длина correlation id.
pub const CORRELATION_ID_MAX_LEN: usize = 64;

/// Ошибка синтаксиса топика или шаблона топика.
///
/// Возникает при компиляции шаблона подписки и при валидации
/// конкретного топика в момент публикации.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PatternError {
    #[error("topic pattern cannot be empty")]
    Empty,

    #[error("topic pattern cannot start or end with a dot: {0:?}")]
    Boundary(String),

    #[error("topic pattern cannot contain consecutive dots: {0:?}")]
    Consecutive(String),

    #[error("invalid character {ch:?} in topic pattern {pattern:?}")]
    InvalidCharacter { pattern: String, ch: char },
}

/// Ошибка валидации correlation id.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CorrelationError {
    #[error("correlation id cannot be an empty string")]
    Empty,

    #[error("correlation id \"*\" is reserved for subscription filters")]
    WildcardValue,

    #[error(
        "correlation id length must be within [{min}, {max}], got {0}",
        min = CORRELATION_ID_MIN_LEN,
        max = CORRELATION_ID_MAX_LEN
    )]
    Length(usize),

    #[error("correlation id cannot start or end with a separator: {0:?}")]
    Boundary(String),

    #[error("correlation id cannot contain consecutive separators: {0:?}")]
    Consecutive(String),

    #[error("invalid character {ch:?} in correlation id {value:?}")]
    InvalidCharacter { value: String, ch: char },
}

/// Ошибка операций над шиной (подписка, публикация, отписка,
/// управление агрегатором).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BusError {
    #[error("pub/sub bus has been shutdown")]
    Shutdown,

    #[error(transparent)]
    Pattern(#[from] PatternError),

    #[error(transparent)]
    Correlation(#[from] CorrelationError),

    #[error("subscriber {subscriber_id:?} is not registered for topic {topic:?}")]
    UnknownSubscriber {
        topic: String,
        subscriber_id: String,
    },

    #[error("message payload must be a JSON object with string keys")]
    InvalidPayload,

    #[error("bus is already managed by this aggregator")]
    AlreadyManaged,

    #[error("bus is not managed by this aggregator")]
    NotManaged,
}

/// Результат операций pub/sub.
pub type BusResult<T> = Result<T, BusError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pattern_error_display() {
        assert_eq!(
            PatternError::Empty.to_string(),
            "topic pattern cannot be empty"
        );
        assert!(PatternError::Boundary(".user".into())
            .to_string()
            .contains(".user"));
    }

    #[test]
    fn test_correlation_error_display() {
        assert_eq!(
            CorrelationError::Empty.to_string(),
            "correlation id cannot be an empty string"
        );
        let err = CorrelationError::Length(65);
        assert!(err.to_string().contains("[2, 64]"));
        assert!(err.to_string().contains("65"));
    }

    #[test]
    fn test_bus_error_from_pattern() {
        let err: BusError = PatternError::Empty.into();
        assert_eq!(err, BusError::Pattern(PatternError::Empty));
        // transparent: текст совпадает с вложенной ошибкой
        assert_eq!(err.to_string(), PatternError::Empty.to_string());
    }

    #[test]
    fn test_bus_error_from_correlation() {
        let err: BusError = CorrelationError::WildcardValue.into();
        assert!(matches!(err, BusError::Correlation(_)));
        assert!(err.to_string().contains("reserved"));
    }

    #[test]
    fn test_unknown_subscriber_mentions_pair() {
        let err = BusError::UnknownSubscriber {
            topic: "user.created".into(),
            subscriber_id: "abc".into(),
        };
        let text = err.to_string();
        assert!(text.contains("user.created"));
        assert!(text.contains("abc"));
    }
}
