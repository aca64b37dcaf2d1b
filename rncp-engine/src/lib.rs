//! RNCP Engine - progression and certification validation
//!
//! Pure, synchronous computations over data the gateway has already fetched:
//! - XP ⇄ level conversion through a monotonic anchor table
//! - What-if simulation of projects, sub-projects and custom projects
//! - Reconciliation of local catalog ids with upstream project names
//! - Per-category and overall validation of RNCP certifications
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────┐   ┌───────────────┐   ┌────────────────────┐
//! │ LevelTable    │   │ Catalog       │   │ SimulationState    │
//! │ (anchors)     │   │ (RNCP defs)   │   │ (caller-owned)     │
//! └───────┬───────┘   └───────┬───────┘   └─────────┬──────────┘
//!         │                   │                     │
//!         ▼                   ▼                     ▼
//! ┌──────────────────────────────────────────────────────────────┐
//! │ progression (projected XP) ── validation (matcher) ── report │
//! └──────────────────────────────────────────────────────────────┘
//! ```

pub mod anchors;
pub mod catalog;
pub mod error;
pub mod experience;
pub mod matcher;
pub mod progression;
pub mod report;
pub mod simulation;
pub mod validation;

// Re-export main types for convenience
pub use anchors::{LevelAnchor, LevelTable};
pub use catalog::{Catalog, CertificationDefinition, ProjectCategory, SimulatorProject};
pub use error::{CatalogError, ExperienceError};
pub use experience::{ExperienceKind, ProfessionalExperience};
pub use matcher::{find_percentage, is_completed, normalize, GradeMap};
pub use progression::{simulate, simulated_total_xp, SimulationResult};
pub use report::{build_report, CertificationProgress, ProgressReport, ReportInput};
pub use simulation::SimulationState;
pub use validation::{
    real_progress_percentage, validate_all, validate_certification, CategoryValidation, UserProgress,
    ValidationInput, ValidationResult,
};
