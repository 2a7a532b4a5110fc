use uuid::Uuid;

use crate::error::{CorrelationError, CORRELATION_ID_MAX_LEN, CORRELATION_ID_MIN_LEN};

/// Фильтр подписки "любой correlation id".
///
/// Допустим только как фильтр при подписке. Публикация с таким
/// значением отклоняется.
pub const MATCH_ANY_CORRELATION: &str = "*";

/// Символы-разделители внутри correlation id.
const SEPARATORS: [char; 3] = ['.', '-', '_'];

/// Валидация явного correlation id.
///
/// Правила:
/// - непустая строка, не `"*"`;
/// - длина в пределах [2, 64];
/// - символы: латинские буквы, цифры и разделители `.`, `-`, `_`;
/// - разделитель не может стоять в начале или в конце;
/// - два разделителя подряд недопустимы, в том числе разные.
pub fn validate_correlation_id(value: &str) -> Result<(), CorrelationError> {
    if value.is_empty() {
        return Err(CorrelationError::Empty);
    }
    if value == MATCH_ANY_CORRELATION {
        return Err(CorrelationError::WildcardValue);
    }
    let len = value.chars().count();
    if !(CORRELATION_ID_MIN_LEN..=CORRELATION_ID_MAX_LEN).contains(&len) {
        return Err(CorrelationError::Length(len));
    }
    let first = value.chars().next().unwrap_or_default();
    let last = value.chars().next_back().unwrap_or_default();
    if SEPARATORS.contains(&first) || SEPARATORS.contains(&last) {
        return Err(CorrelationError::Boundary(value.to_string()));
    }
    let mut prev_is_separator = false;
    for ch in value.chars() {
        let is_separator = SEPARATORS.contains(&ch);
        if !is_separator && !ch.is_ascii_alphanumeric() {
            return Err(CorrelationError::InvalidCharacter {
                value: value.to_string(),
                ch,
            });
        }
        if is_separator && prev_is_separator {
            return Err(CorrelationError::Consecutive(value.to_string()));
        }
        prev_is_separator = is_separator;
    }
    Ok(())
}

/// Неброская форма проверки: `true`, если id корректен.
pub fn is_valid_correlation_id(value: &str) -> bool {
    validate_correlation_id(value).is_ok()
}

/// Генерирует новый correlation id (UUID v4 в текстовой форме).
pub fn generate_correlation_id() -> String {
    Uuid::new_v4().to_string()
}
