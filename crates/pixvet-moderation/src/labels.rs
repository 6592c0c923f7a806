//! Rejection calibration for moderation labels.

use crate::provider::ModerationLabel;

/// Label categories that reject an upload when detected with sufficient
/// confidence. Calibrated for game content: weapons, violence, and combat
/// imagery are deliberately absent from this list.
pub const DISALLOWED_CATEGORIES: &[&str] = &[
    "Explicit Nudity",
    "Visually Disturbing",
    "Hate Symbols",
    "Gambling",
    "Drugs",
    "Tobacco",
    "Alcohol",
    "Rude Gestures",
    "Adult Content",
];

/// Whether a detected label is a disallowed-content candidate, by its own
/// name or its parent category.
pub fn is_disallowed(label: &ModerationLabel) -> bool {
    let matches_category = |name: &str| {
        DISALLOWED_CATEGORIES
            .iter()
            .any(|category| category.eq_ignore_ascii_case(name))
    };

    matches_category(&label.name)
        || label
            .parent_name
            .as_deref()
            .map(matches_category)
            .unwrap_or(false)
}
