//! Front-end configuration.
//! Provides configuration types, the config path lookup, and XML loading.
//! The library primitives never read configuration; only the binary does.

pub mod paths;
pub mod types;
pub mod xml;

pub use paths::{default_config_path, path_has_symlink_ancestor, resolve_config_path};
pub use types::{parse_mode, Config, LogLevel};
pub use xml::{create_template_config, load_config, load_config_from_xml_path, LoadResult};

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV: &str = "ATOMIC_TMP_CONFIG";
