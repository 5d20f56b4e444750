//! Key names and accelerator strings such as `Ctrl+Shift+T`.

use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum KeyError {
    #[error("empty key combination")]
    Empty,
    #[error("unknown key `{0}`")]
    UnknownKey(String),
    #[error("`{0}` is not a modifier")]
    NotModifier(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum KeyCode {
    /// Printable character, lower-cased for letters.
    Char(char),
    /// Function key F1..F12
    F(u8),

    Control,
    Alt,
    Shift,
    Meta,

    Up,
    Down,
    Left,
    Right,
    Home,
    End,
    PageUp,
    PageDown,

    Backspace,
    Delete,
    Enter,
    Tab,
    Escape,
    Space,
    CapsLock,
}

impl KeyCode {
    /// Parses a key name, case-insensitively.
    pub fn parse(name: &str) -> Option<Self> {
        let lower = name.trim().to_lowercase();
        let mut chars = lower.chars();
        if let (Some(c), None) = (chars.next(), chars.next()) {
            if c.is_ascii_alphanumeric() || c.is_ascii_punctuation() {
                return Some(KeyCode::Char(c));
            }
        }
        if let Some(n) = lower.strip_prefix('f').and_then(|n| n.parse::<u8>().ok()) {
            return (1..=12).contains(&n).then_some(KeyCode::F(n));
        }
        let key = match lower.as_str() {
            "ctrl" | "control" => KeyCode::Control,
            "alt" | "option" => KeyCode::Alt,
            "shift" => KeyCode::Shift,
            "meta" | "win" | "cmd" | "command" | "search" => KeyCode::Meta,
            "up" => KeyCode::Up,
            "down" => KeyCode::Down,
            "left" => KeyCode::Left,
            "right" => KeyCode::Right,
            "home" => KeyCode::Home,
            "end" => KeyCode::End,
            "pageup" | "pgup" => KeyCode::PageUp,
            "pagedown" | "pgdn" => KeyCode::PageDown,
            "backspace" | "bs" => KeyCode::Backspace,
            "delete" | "del" => KeyCode::Delete,
            "enter" | "return" => KeyCode::Enter,
            "tab" => KeyCode::Tab,
            "escape" | "esc" => KeyCode::Escape,
            "space" => KeyCode::Space,
            "capslock" => KeyCode::CapsLock,
            _ => return None,
        };
        Some(key)
    }

    pub fn is_modifier(self) -> bool {
        matches!(
            self,
            KeyCode::Control | KeyCode::Alt | KeyCode::Shift | KeyCode::Meta
        )
    }
}

/// Modifiers pressed in order, `key` clicked, modifiers released in reverse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Accelerator {
    pub modifiers: Vec<KeyCode>,
    pub key: KeyCode,
}

impl Accelerator {
    pub fn parse(combo: &str) -> Result<Self, KeyError> {
        let parts: Vec<&str> = combo
            .split('+')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .collect();
        let (last, rest) = parts.split_last().ok_or(KeyError::Empty)?;

        let key = KeyCode::parse(last).ok_or_else(|| KeyError::UnknownKey(last.to_string()))?;
        let modifiers = rest
            .iter()
            .map(|name| {
                let code =
                    KeyCode::parse(name).ok_or_else(|| KeyError::UnknownKey(name.to_string()))?;
                if code.is_modifier() {
                    Ok(code)
                } else {
                    Err(KeyError::NotModifier(name.to_string()))
                }
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { modifiers, key })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_parsing() {
        assert_eq!(KeyCode::parse("a"), Some(KeyCode::Char('a')));
        assert_eq!(KeyCode::parse("T"), Some(KeyCode::Char('t')));
        assert_eq!(KeyCode::parse("CTRL"), Some(KeyCode::Control));
        assert_eq!(KeyCode::parse("enter"), Some(KeyCode::Enter));
        assert_eq!(KeyCode::parse("F5"), Some(KeyCode::F(5)));
        assert_eq!(KeyCode::parse("f13"), None);
        assert_eq!(KeyCode::parse("unknown"), None);
    }

    #[test]
    fn test_accelerator_parsing() {
        let acc = Accelerator::parse("Ctrl+Shift+T").unwrap();
        assert_eq!(acc.modifiers, vec![KeyCode::Control, KeyCode::Shift]);
        assert_eq!(acc.key, KeyCode::Char('t'));

        let acc = Accelerator::parse("Escape").unwrap();
        assert!(acc.modifiers.is_empty());
        assert_eq!(acc.key, KeyCode::Escape);
    }

    #[test]
    fn test_accelerator_errors() {
        assert_eq!(Accelerator::parse(""), Err(KeyError::Empty));
        assert_eq!(
            Accelerator::parse("Ctrl+Bogus"),
            Err(KeyError::UnknownKey("Bogus".to_string()))
        );
        assert_eq!(
            Accelerator::parse("a+b"),
            Err(KeyError::NotModifier("a".to_string()))
        );
    }
}
