use crate::location::Pin;
use crate::tree::TreeRecord;

pub const DEFAULT_RED: &str = "/icons/pin-red.png";
pub const DEFAULT_ORANGE: &str = "/icons/pin-orange.png";
pub const DEFAULT_GREEN: &str = "/icons/pin-green.png";

/// Marker colour derived from a conservation status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusClass {
    /// endangered, critical, vulnerable
    Red,
    /// threatened, concern
    Orange,
    Green,
}

impl StatusClass {
    /// Case-insensitive substring match; red keywords take precedence over
    /// orange ones.
    #[must_use]
    pub fn classify(status: Option<&str>) -> Self {
        let Some(status) = status else {
            return Self::Green;
        };
        let lower = status.to_lowercase();
        if contains_any(&lower, &["endangered", "critical", "vulnerable"]) {
            Self::Red
        } else if contains_any(&lower, &["threatened", "concern"]) {
            Self::Orange
        } else {
            Self::Green
        }
    }

    /// Single-character glyph for terminal maps.
    #[must_use]
    pub fn glyph(self) -> char {
        match self {
            Self::Red => 'R',
            Self::Orange => 'O',
            Self::Green => 'G',
        }
    }
}

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|n| haystack.contains(n))
}

/// Marker image URIs for each status class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IconSet {
    pub red: String,
    pub orange: String,
    pub green: String,
}

impl Default for IconSet {
    fn default() -> Self {
        Self {
            red: DEFAULT_RED.to_string(),
            orange: DEFAULT_ORANGE.to_string(),
            green: DEFAULT_GREEN.to_string(),
        }
    }
}

impl IconSet {
    #[must_use]
    pub fn for_class(&self, class: StatusClass) -> &str {
        match class {
            StatusClass::Red => &self.red,
            StatusClass::Orange => &self.orange,
            StatusClass::Green => &self.green,
        }
    }

    /// Marker for one pin: the pin's own icon, then the tree's `pin_icon`,
    /// then the status default.
    #[must_use]
    pub fn select_pin_icon<'a>(&'a self, tree: &'a TreeRecord, pin: Option<&'a Pin>) -> &'a str {
        pin.and_then(|p| p.icon.as_deref())
            .filter(|icon| !icon.trim().is_empty())
            .or_else(|| tree.pin_icon())
            .unwrap_or_else(|| self.for_class(StatusClass::classify(tree.tree_status.as_deref())))
    }

    /// Like [`IconSet::select_pin_icon`], looking the pin up by index among
    /// the tree's normalized pins. An index past the end behaves like no pin.
    #[must_use]
    pub fn select_icon(&self, tree: &TreeRecord, pin_index: Option<usize>) -> String {
        let pins = pin_index.map(|_| tree.pins()).unwrap_or_default();
        let pin = pin_index.and_then(|i| pins.get(i));
        self.select_pin_icon(tree, pin).to_string()
    }
}
