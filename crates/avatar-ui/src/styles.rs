//! Ayu color theme and rendering for avatar CLI output.
//!
//! Color source: <https://github.com/ayu-theme/ayu-colors>
//!
//! Numbers are accented, strings green, booleans yellow; list brackets are
//! muted. Changed indicators are bold.

use avatar_core::avatar::FormulaIssue;
use avatar_core::propagation::Change;
use avatar_core::value::Value;
use owo_colors::OwoColorize;

use crate::terminal::supports_color;

// ---------------------------------------------------------------------------
// Ayu Dark color palette (RGB values)
// ---------------------------------------------------------------------------

const PASS: (u8, u8, u8) = (0xc2, 0xd9, 0x4c); // #c2d94c - bright green
const WARN: (u8, u8, u8) = (0xff, 0xb4, 0x54); // #ffb454 - bright yellow
const FAIL: (u8, u8, u8) = (0xf0, 0x71, 0x78); // #f07178 - bright red
const MUTED: (u8, u8, u8) = (0x6c, 0x76, 0x80); // #6c7680 - muted gray
const ACCENT: (u8, u8, u8) = (0x59, 0xc2, 0xff); // #59c2ff - bright blue

pub const ICON_PASS: &str = "\u{2713}"; // ✓
pub const ICON_FAIL: &str = "\u{2716}"; // ✖
pub const ARROW: &str = "\u{2192}"; // →

/// Icon shown before an organ or indicator heading, if one is known.
pub fn organ_icon(name: &str) -> Option<&'static str> {
    match name {
        "heart" => Some("\u{2764}\u{fe0f} "),
        "ecg" => Some("\u{303d}\u{fe0f}"),
        "lungs" => Some("\u{1fac1} "),
        "brain" => Some("\u{1f9e0}"),
        _ => None,
    }
}

/// Rendering settings for one output stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Theme {
    color: bool,
}

impl Default for Theme {
    /// Colors only when the environment allows it.
    fn default() -> Self {
        Self::new(supports_color())
    }
}

impl Theme {
    pub fn new(color: bool) -> Self {
        Self { color }
    }

    /// A theme that never emits escape codes.
    pub fn plain() -> Self {
        Self::new(false)
    }

    pub fn is_colored(&self) -> bool {
        self.color
    }

    fn paint(&self, s: &str, rgb: (u8, u8, u8)) -> String {
        if self.color {
            s.truecolor(rgb.0, rgb.1, rgb.2).to_string()
        } else {
            s.to_string()
        }
    }

    pub fn pass(&self, s: &str) -> String {
        self.paint(s, PASS)
    }

    pub fn warn(&self, s: &str) -> String {
        self.paint(s, WARN)
    }

    pub fn fail(&self, s: &str) -> String {
        self.paint(s, FAIL)
    }

    pub fn muted(&self, s: &str) -> String {
        self.paint(s, MUTED)
    }

    pub fn accent(&self, s: &str) -> String {
        self.paint(s, ACCENT)
    }

    pub fn bold(&self, s: &str) -> String {
        if self.color {
            s.bold().to_string()
        } else {
            s.to_string()
        }
    }

    /// Renders a value with per-type coloring.
    ///
    /// Without color the output equals `value.to_string()`.
    pub fn value(&self, value: &Value) -> String {
        match value {
            Value::Float(_) | Value::Int(_) => self.accent(&value.to_string()),
            Value::Bool(_) => self.warn(&value.to_string()),
            Value::Str(s) => self.pass(s),
            Value::List(items) => {
                let inner: Vec<String> = items
                    .iter()
                    .map(|item| match item {
                        Value::Str(s) => self.pass(&format!("{s:?}")),
                        other => self.value(other),
                    })
                    .collect();
                format!("{}{}{}", self.muted("["), inner.join(", "), self.muted("]"))
            }
        }
    }

    /// `  rate: 70.0`, bold name when `changed`.
    pub fn indicator_line(&self, indicator: &str, value: &Value, changed: bool) -> String {
        let name = if changed {
            self.bold(indicator)
        } else {
            indicator.to_string()
        };
        format!("  {}: {}", name, self.value(value))
    }

    /// Organ heading, with an icon when `emoji` is set and one is known.
    pub fn organ_heading(&self, organ: &str, emoji: bool) -> String {
        match organ_icon(organ).filter(|_| emoji) {
            Some(icon) => format!("{} {}", icon, self.bold(organ)),
            None => self.bold(organ),
        }
    }

    /// `[pass 2] #3 brain.size: 700.0 → 776.0`
    pub fn change(&self, change: &Change) -> String {
        format!(
            "{} {} {}: {} {} {}",
            self.muted(&format!("[pass {}]", change.pass)),
            self.muted(&format!("#{}", change.rule)),
            self.bold(&change.target.to_string()),
            self.value(&change.old),
            self.muted(ARROW),
            self.value(&change.new)
        )
    }

    pub fn issue(&self, issue: &FormulaIssue) -> String {
        format!("{} {}", self.fail(ICON_FAIL), issue)
    }

    pub fn ok(&self, message: &str) -> String {
        format!("{} {}", self.pass(ICON_PASS), message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use avatar_core::avatar::FormulaIssueKind;
    use avatar_core::rule::IndicatorRef;
    use pretty_assertions::assert_eq;

    #[test]
    fn plain_value_matches_display() {
        let theme = Theme::plain();
        let value = Value::List(vec![Value::Int(1), Value::from("a"), Value::Float(2.0)]);
        assert_eq!(theme.value(&value), value.to_string());
        assert_eq!(theme.value(&Value::Float(76.0)), "76.0");
    }

    #[test]
    fn colored_value_contains_escape_codes() {
        let theme = Theme::new(true);
        let rendered = theme.value(&Value::Float(76.0));
        assert!(rendered.contains("76.0"));
        assert!(rendered.contains('\u{1b}'));
    }

    #[test]
    fn change_line() {
        let change = Change {
            pass: 2,
            rule: 2,
            target: IndicatorRef::new("brain", "size"),
            old: Value::Float(700.0),
            new: Value::Float(776.0),
        };
        assert_eq!(
            Theme::plain().change(&change),
            "[pass 2] #2 brain.size: 700.0 \u{2192} 776.0"
        );
    }

    #[test]
    fn indicator_and_heading() {
        let theme = Theme::plain();
        assert_eq!(
            theme.indicator_line("rate", &Value::Float(70.0), true),
            "  rate: 70.0"
        );
        assert_eq!(theme.organ_heading("liver", true), "liver");
        assert!(theme.organ_heading("heart", true).ends_with(" heart"));
        assert_eq!(theme.organ_heading("heart", false), "heart");
    }

    #[test]
    fn issue_line() {
        let issue = FormulaIssue {
            rule: 1,
            kind: FormulaIssueKind::MissingTarget(IndicatorRef::new("brain", "size")),
        };
        assert_eq!(
            Theme::plain().issue(&issue),
            "\u{2716} formula #1: target brain.size does not exist"
        );
    }
}
