//! Display colors for categories.

/// Preset category colors, in the same order as the default budgets.
pub const PALETTE: [(&str, &str); 7] = [
    ("Food", "#FF6B6B"),
    ("Transport", "#4ECDC4"),
    ("Bills", "#FFD93D"),
    ("Shopping", "#A78BFA"),
    ("Health", "#34D399"),
    ("Entertainment", "#F472B6"),
    ("Other", "#94A3B8"),
];

/// Color used for any category outside the preset list.
pub const DEFAULT_COLOR: &str = "#CBD5E1";

pub fn color_for(category: &str) -> &'static str {
    let category = category.trim();
    PALETTE
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(category))
        .map(|(_, color)| *color)
        .unwrap_or(DEFAULT_COLOR)
}
