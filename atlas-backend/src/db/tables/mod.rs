pub mod access_grants;
pub mod notes;
pub mod object_types;
pub mod record_detail;
pub mod records;
pub mod search;
pub mod type_values;

pub use object_types::{DeleteOutcome, TypeFilter, TypeScope};
pub use type_values::ValueVisibility;
