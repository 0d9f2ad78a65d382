//! Step guides: the in-memory list with its cursor, and template files

mod list;
pub mod template;

pub use list::StepList;
pub use template::{TemplateDocument, TemplateError};
