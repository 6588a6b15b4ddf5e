//! Item-number heuristic that decides whether a BOM line is a standalone
//! component, an assembly, or a part that only exists inside an assembly.
//!
//! Item numbers come from the CAD BOM balloon column: `1`, `2`, `2.1`, `2.2`, ...
//! A whole number followed by dotted children marks an assembly; the dotted
//! children are its sub-components.

use std::fmt;
use std::str::FromStr;

use serde_json::Value;

use crate::error::{ItemNumberError, ItemTypeError};

/// A parsed `ITEM NO.` value.
///
/// Stored as dot-separated segments with trailing zero segments dropped, so
/// `3.0` and `3` compare equal while `2.10` stays distinct from `2.1`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ItemNumber {
    segments: Vec<u32>,
}

impl ItemNumber {
    /// Integer part (`2` for `2.1`).
    pub fn whole(&self) -> u32 {
        self.segments[0]
    }

    pub fn is_integral(&self) -> bool {
        self.segments.len() == 1
    }

    /// Parses a metadata value, which may arrive as text or as a JSON number.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) => s.parse().ok(),
            Value::Number(n) => n.to_string().parse().ok(),
            _ => None,
        }
    }

    /// Whether `self` is one of the children of the assembly numbered `assembly`.
    pub fn belongs_to(&self, assembly: &ItemNumber) -> bool {
        self.whole() == assembly.whole() && self != assembly
    }
}

impl FromStr for ItemNumber {
    type Err = ItemNumberError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(ItemNumberError(raw.to_string()));
        }
        let mut segments = trimmed
            .split('.')
            .map(|part| {
                if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
                    return Err(ItemNumberError(raw.to_string()));
                }
                part.parse::<u32>()
                    .map_err(|_| ItemNumberError(raw.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        while segments.len() > 1 && segments.last() == Some(&0) {
            segments.pop();
        }
        Ok(ItemNumber { segments })
    }
}

impl fmt::Display for ItemNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.segments.iter().map(u32::to_string).collect();
        write!(f, "{}", parts.join("."))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemType {
    Component,
    SubAssembly,
    SubComponent,
}

impl ItemType {
    pub fn as_str(self) -> &'static str {
        match self {
            ItemType::Component => "Component",
            ItemType::SubAssembly => "SubAssembly",
            ItemType::SubComponent => "SubComponent",
        }
    }
}

impl fmt::Display for ItemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ItemType {
    type Err = ItemTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "Component" => Ok(ItemType::Component),
            "SubAssembly" => Ok(ItemType::SubAssembly),
            "SubComponent" => Ok(ItemType::SubComponent),
            other => Err(ItemTypeError(other.to_string())),
        }
    }
}

/// Classifies every item number, returning types in input order.
///
/// Walks the numbers from highest to lowest. Dotted numbers are
/// sub-components; a whole number whose predecessor in that walk had the same
/// integer part is an assembly (its children sort just above it); every other
/// whole number is a component.
pub fn classify(items: &[ItemNumber]) -> Vec<ItemType> {
    let mut order: Vec<usize> = (0..items.len()).collect();
    // Stable, so equal item numbers keep their input order.
    order.sort_by(|&a, &b| items[b].cmp(&items[a]));

    let mut types = vec![ItemType::Component; items.len()];
    let mut prev: Option<u32> = None;
    for index in order {
        let item = &items[index];
        types[index] = if !item.is_integral() {
            ItemType::SubComponent
        } else if prev == Some(item.whole()) {
            ItemType::SubAssembly
        } else {
            ItemType::Component
        };
        prev = Some(item.whole());
    }
    types
}
