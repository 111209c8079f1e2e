//! rf-state: Project data model, edit operations and persistence
//!
//! Projects own nodes (speakers); nodes own their audio clips and motion
//! segments. Everything derived from them (clip widths, cached positions)
//! is recomputed on demand and never stored.

mod clip;
mod demo;
mod edit;
mod node;
mod project;
mod store;

pub use clip::*;
pub use demo::*;
pub use edit::*;
pub use node::*;
pub use project::*;
pub use store::*;
