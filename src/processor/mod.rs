//! The editing engine: reconciliation, placement, stamps, previews.
//!
//! Everything here operates on the data model and never touches files; the
//! codec and the CLI live elsewhere.

pub mod context;
pub mod place;
pub mod preview;
pub mod reconciler;
pub mod stamp;

pub use context::{EditContext, EditorConfig, PlaceMode};
pub use reconciler::{ObsoleteConfig, Reconciliation};
