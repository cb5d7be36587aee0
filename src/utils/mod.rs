pub mod breakpoints;
pub mod config;
pub mod imgen_toml;
pub mod logger;
pub mod manifest;

pub use breakpoints::{Breakpoints, load_breakpoints, parse_breakpoints};
pub use config::*;
pub use imgen_toml::{ImgenToml, apply_file_to_opts, load_imgen_toml, parse_imgen_toml};
pub use logger::{Colors, setup_logging};
pub use manifest::{Manifest, ManifestEntry, load_manifest, parse_manifest, select_entries};
