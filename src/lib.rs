// Library interface for the ptimer container tools

// Declare all modules
pub mod config;
pub mod constants;
pub mod create;
pub mod db;
pub mod descriptor;
pub mod error;
pub mod extract;
pub mod model;
pub mod path_guard;
pub mod queries;
pub mod schema;
pub mod sequencer;

// Re-export the main entry points for convenience
pub use create::{create_container, write_container};
pub use descriptor::Descriptor;
pub use error::{PtimerError, Result};
pub use extract::{extract_container, read_container};
pub use model::Ptimer;
