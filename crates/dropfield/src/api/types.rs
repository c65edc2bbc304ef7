use serde::Deserialize;

/// Unique identifier for an element placed on the field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementId(pub u64);

/// Size class of a rendered glyph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SizeClass {
    #[default]
    Normal,
    Small,
}

impl SizeClass {
    pub fn from_small(is_small: bool) -> Self {
        if is_small {
            SizeClass::Small
        } else {
            SizeClass::Normal
        }
    }

    pub fn is_small(self) -> bool {
        self == SizeClass::Small
    }
}

/// Which subsystem asked for an element. Drops get their own CSS class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementRole {
    Drop,
    Environment,
}

/// One server-originated drop. Immutable once received.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DropEvent {
    pub exploded: bool,
}

impl DropEvent {
    pub fn normal() -> Self {
        Self { exploded: false }
    }

    pub fn exploded() -> Self {
        Self { exploded: true }
    }
}

/// A transient glyph on the field.
#[derive(Debug, Clone, PartialEq)]
pub struct VisualElement {
    pub id: ElementId,
    pub symbol: String,
    pub size: SizeClass,
    pub role: ElementRole,
    /// Horizontal position, uniform in [0, 1).
    pub position: f64,
    /// Scheduler time (ms) at which the element was attached.
    pub created_at: f64,
}
