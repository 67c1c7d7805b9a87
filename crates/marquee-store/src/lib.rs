pub mod document;
pub mod error;
pub mod factory;
pub mod json_file;
pub mod memory;
pub mod traits;

pub use document::{to_fields, Direction, Document, DocumentPath, Fields, Filter, OrderBy, Query, WriteOp};
pub use error::StoreError;
pub use factory::{create_store, StoreFactory, StoreFactoryRegistry};
pub use json_file::JsonFileStore;
pub use memory::MemoryStore;
pub use traits::DocumentStore;
