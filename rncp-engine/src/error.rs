//! Error types for loading reference data.

/// Reference data (anchor table or certification catalog) violates an invariant.
///
/// Every variant is fatal at load time: the engine refuses to run on a
/// malformed table rather than produce silently wrong levels.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    /// Input could not be parsed
    #[error("Failed to parse reference data: {0}")]
    Parse(#[from] serde_json::Error),

    /// Anchor table has no entries
    #[error("Level anchor table is empty")]
    EmptyAnchorTable,

    /// Anchor level does not match its position in the table
    #[error("Anchor at index {index} has level {level}, expected {index}")]
    NonSequentialAnchor { index: usize, level: u32 },

    /// Anchor xp is not strictly greater than the previous anchor
    #[error("Anchor for level {level} has xp {xp}, not above previous {previous}")]
    NonIncreasingAnchor { level: u32, xp: u64, previous: u64 },

    /// Certification requires a level beyond the anchor table
    #[error("Certification {certification} requires level {level}, table stops at {max}")]
    UnknownLevel {
        certification: String,
        level: f64,
        max: u32,
    },

    /// Two certifications share an id
    #[error("Duplicate certification id: {0}")]
    DuplicateCertification(String),

    /// Negative or non-finite numeric value
    #[error("Invalid value for {field} in {owner}: {value}")]
    NegativeValue {
        owner: String,
        field: &'static str,
        value: f64,
    },
}

/// Professional experience data failed validation.
#[derive(Debug, thiserror::Error)]
pub enum ExperienceError {
    /// Input could not be parsed
    #[error("Failed to parse experiences: {0}")]
    Parse(#[from] serde_json::Error),

    /// An entry failed validation
    #[error("Invalid experience at index {index}: {reason}")]
    Invalid { index: usize, reason: String },
}
