use regex::{Regex, RegexBuilder};
use std::fmt;

use crate::error::{Result, WinEventError};

/// Шаблон для сравнения заголовка или класса окна
#[derive(Debug, Clone)]
pub enum TextPattern {
    /// Точное совпадение строки
    Exact { text: String, case_sensitive: bool },
    /// Shell-шаблон: `*`, `?`, `[seq]`, `[!seq]`; сопоставляется со всей строкой
    Wildcard { source: String, regex: Regex },
    /// Регулярное выражение; ищется в любом месте строки, якоря ставит автор
    Regex { source: String, regex: Regex },
}

impl TextPattern {
    pub fn exact(text: impl Into<String>, case_sensitive: bool) -> Self {
        TextPattern::Exact {
            text: text.into(),
            case_sensitive,
        }
    }

    pub fn wildcard(pattern: &str, case_sensitive: bool) -> Result<Self> {
        let regex = build_regex(pattern, &wildcard_to_regex(pattern), case_sensitive)?;
        Ok(TextPattern::Wildcard {
            source: pattern.to_string(),
            regex,
        })
    }

    pub fn regex(pattern: &str, case_sensitive: bool) -> Result<Self> {
        let regex = build_regex(pattern, pattern, case_sensitive)?;
        Ok(TextPattern::Regex {
            source: pattern.to_string(),
            regex,
        })
    }

    pub fn matches(&self, text: &str) -> bool {
        match self {
            TextPattern::Exact {
                text: expected,
                case_sensitive: true,
            } => expected == text,
            TextPattern::Exact {
                text: expected,
                case_sensitive: false,
            } => expected.to_lowercase() == text.to_lowercase(),
            TextPattern::Wildcard { regex, .. } | TextPattern::Regex { regex, .. } => {
                regex.is_match(text)
            }
        }
    }
}

impl fmt::Display for TextPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TextPattern::Exact { text, .. } => write!(f, "{:?}", text),
            TextPattern::Wildcard { source, .. } => write!(f, "glob:{:?}", source),
            TextPattern::Regex { source, .. } => write!(f, "re:{:?}", source),
        }
    }
}

fn build_regex(source: &str, expr: &str, case_sensitive: bool) -> Result<Regex> {
    RegexBuilder::new(expr)
        .case_insensitive(!case_sensitive)
        .build()
        .map_err(|e| WinEventError::InvalidPattern {
            pattern: source.to_string(),
            reason: e.to_string(),
        })
}

/// Перевод shell-шаблона в якорное регулярное выражение.
/// Незакрытая `[` трактуется как обычный символ.
pub fn wildcard_to_regex(pattern: &str) -> String {
    let chars: Vec<char> = pattern.chars().collect();
    let mut out = String::from("(?s)^");
    let mut i = 0;

    while i < chars.len() {
        match chars[i] {
            '*' => out.push_str(".*"),
            '?' => out.push('.'),
            '[' => match class_end(&chars, i) {
                Some(end) => {
                    out.push('[');
                    let mut body = &chars[i + 1..end];
                    if body.first() == Some(&'!') {
                        out.push('^');
                        body = &body[1..];
                    }
                    for &ch in body {
                        if matches!(ch, '\\' | '[' | ']' | '^' | '&' | '~') {
                            out.push('\\');
                        }
                        out.push(ch);
                    }
                    out.push(']');
                    i = end;
                }
                None => out.push_str(r"\["),
            },
            ch => out.push_str(&regex::escape(ch.encode_utf8(&mut [0u8; 4]))),
        }
        i += 1;
    }

    out.push('$');
    out
}

/// Индекс закрывающей `]` для класса, начинающегося в `start`
fn class_end(chars: &[char], start: usize) -> Option<usize> {
    let mut j = start + 1;
    if chars.get(j) == Some(&'!') {
        j += 1;
    }
    // `]` сразу после открытия входит в класс
    if chars.get(j) == Some(&']') {
        j += 1;
    }
    while j < chars.len() && chars[j] != ']' {
        j += 1;
    }
    (j < chars.len()).then_some(j)
}
