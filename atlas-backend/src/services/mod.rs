//! Request-scoped operations. Each service owns a handle to the shared
//! database and enforces organization scoping and roles before writing.

pub mod access;
pub mod notes;
pub mod records;
pub mod registry;
pub mod search;
pub mod values;

pub use access::AccessControl;
pub use notes::NoteStore;
pub use records::RecordStore;
pub use registry::SchemaRegistry;
pub use search::SearchEngine;
pub use values::ValueStore;
