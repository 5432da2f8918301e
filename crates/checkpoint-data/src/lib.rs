pub mod loader;
pub mod schema;

pub use loader::{DataLoadError, Format, load_config, load_config_dir, parse_config};
pub use schema::CheckpointFile;
