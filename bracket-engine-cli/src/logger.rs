use std::env;

use log::LevelFilter;

/// Installs the logger. `RUST_LOG` takes precedence over the configured `level`.
pub fn init(level: LevelFilter) {
    let mut builder = pretty_env_logger::formatted_builder();
    builder.filter_level(level);

    if let Ok(filters) = env::var("RUST_LOG") {
        builder.parse_filters(&filters);
    }

    builder.init();
}
