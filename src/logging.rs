//=====================================================
// File: logging.rs
//=====================================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: One-time tracing subscriber installation
//=====================================================

use once_cell::sync::OnceCell;
use tracing_subscriber::EnvFilter;

use crate::config::{LogFormat, VmConfig};

static INSTALLED: OnceCell<()> = OnceCell::new();

/// Installs the global subscriber. `RUST_LOG` wins over the configured level;
/// later calls are no-ops.
pub fn init(config: &VmConfig) {
    INSTALLED.get_or_init(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(&config.log_level));
        let builder = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr);
        let _ = match config.log_format {
            LogFormat::Compact => builder.compact().with_target(false).try_init(),
            LogFormat::Pretty => builder.pretty().try_init(),
        };
    });
}

//=====================================================
// End of file
//=====================================================
