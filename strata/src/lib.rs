// Include handlers module directly from handlers.rs
#[path = "handlers.rs"]
pub mod handlers;

// Re-export commonly used handler functions for convenience
pub use handlers::{
    WalkOverrides, describe_plan, expand_path, init_tracing, load_config, write_config_template,
};
