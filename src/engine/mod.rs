//! Engine module: store, naming, progress and CLI plumbing

pub mod arg_parser;
pub mod cli;
pub mod db_ops;
pub mod handlers;
pub mod hashing;
pub mod progress;
pub mod tools;

// Re-export commonly used functions
pub use arg_parser::{BuildArgs, CheckArgs, Cli, Commands, LookupArgs};
pub use cli::handle_run;
pub use db_ops::{
    add_source_image, add_variant, find_best_variant, open_store, open_store_fresh,
    open_store_in_memory, open_store_read_only,
};
pub use handlers::{handle_build, handle_check, handle_lookup, resolve_build_opts};
pub use hashing::{content_hash, content_hash_hex, variant_filename};
pub use tools::{path_relative_to, strip_extension};
