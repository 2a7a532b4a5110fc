use std::fmt;

use crate::error::PatternError;

/// Разделитель сегментов топика.
pub const TOPIC_SEPARATOR: char = '.';

/// Зарезервированный фильтр подписки "на все топики".
///
/// Обрабатывается реестром подписчиков как отдельная корзина и не
/// проходит через сегментное сопоставление: скомпилированный шаблон
/// `"*"` совпадает только с односегментными топиками, а этот фильтр
/// совпадает с любым топиком независимо от числа сегментов.
pub const MATCH_ALL_TOPICS: &str = "*";

/// Скомпилированный шаблон топика.
///
/// Хранит строку шаблона в исходном виде плюс предразобранные сегменты.
/// Поддерживает два вида подстановок внутри сегмента:
/// - `*` совпадает с любой непустой последовательностью символов,
///   не пересекая точку;
/// - `?` совпадает ровно с одним символом.
///
/// Сопоставление чистое и детерминированное: одна и та же пара
/// (шаблон, топик) всегда даёт один и тот же результат.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TopicPattern {
    pattern: String,
    segments: Vec<String>,
    is_exact: bool,
}

impl TopicPattern {
    /// Компилирует строку шаблона.
    ///
    /// # Ошибки
    /// - пустая строка;
    /// - точка в начале или в конце;
    /// - две точки подряд;
    /// - символ вне множества `[A-Za-z0-9_.\-*?]`.
    pub fn compile(pattern: &str) -> Result<Self, PatternError> {
        validate_topic(pattern)?;
        let segments = pattern
            .split(TOPIC_SEPARATOR)
            .map(str::to_string)
            .collect();
        let is_exact = !pattern.contains(['*', '?']);
        Ok(Self {
            pattern: pattern.to_string(),
            segments,
            is_exact,
        })
    }

    /// Исходная строка шаблона.
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// `true`, если шаблон не содержит подстановок.
    pub fn is_exact(&self) -> bool {
        self.is_exact
    }

    /// Проверяет, совпадает ли конкретный топик с шаблоном.
    ///
    /// Количество сегментов должно совпадать точно: подстановки не
    /// пересекают границы сегментов.
    pub fn matches(&self, topic: &str) -> bool {
        if self.is_exact {
            return self.pattern == topic;
        }
        let topic_segments: Vec<&str> = topic.split(TOPIC_SEPARATOR).collect();
        if topic_segments.len() != self.segments.len() {
            return false;
        }
        self.segments
            .iter()
            .zip(topic_segments)
            .all(|(pat, seg)| segment_matches(pat, seg))
    }
}

impl fmt::Display for TopicPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.pattern)
    }
}

/// Валидация синтаксиса топика или шаблона.
///
/// Конкретные топики публикации и шаблоны подписки проверяются по
/// одним и тем же правилам.
pub fn validate_topic(value: &str) -> Result<(), PatternError> {
    if value.is_empty() {
        return Err(PatternError::Empty);
    }
    if value.starts_with(TOPIC_SEPARATOR) || value.ends_with(TOPIC_SEPARATOR) {
        return Err(PatternError::Boundary(value.to_string()));
    }
    if value.contains("..") {
        return Err(PatternError::Consecutive(value.to_string()));
    }
    if let Some(ch) = value.chars().find(|c| !is_topic_char(*c)) {
        return Err(PatternError::InvalidCharacter {
            pattern: value.to_string(),
            ch,
        });
    }
    Ok(())
}

#[inline]
fn is_topic_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.' | '*' | '?')
}

/// Сопоставляет один сегмент топика с одним сегментом шаблона.
fn segment_matches(pattern: &str, segment: &str) -> bool {
    if pattern == "*" {
        return !segment.is_empty();
    }
    let pat: Vec<char> = pattern.chars().collect();
    let seg: Vec<char> = segment.chars().collect();
    glob_match(&pat, &seg)
}

/// Итеративный глоб с одной точкой отката: линейная сложность даже
/// на шаблонах из сплошных `*`.
fn glob_match(pattern: &[char], segment: &[char]) -> bool {
    let mut p = 0;
    let mut s = 0;
    let mut star: Option<usize> = None;
    let mut backtrack = 0;

    while s < segment.len() {
        if p < pattern.len() && pattern[p] == '*' {
            star = Some(p);
            backtrack = s;
            p += 1;
        } else if p < pattern.len() && (pattern[p] == '?' || pattern[p] == segment[s]) {
            p += 1;
            s += 1;
        } else if let Some(star_at) = star {
            p = star_at + 1;
            backtrack += 1;
            s = backtrack;
        } else {
            return false;
        }
    }
    while p < pattern.len() && pattern[p] == '*' {
        p += 1;
    }
    p == pattern.len()
}
