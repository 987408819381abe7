pub mod config;
pub mod reference;

pub use config::{ConfigError, Preset, RunConfig, load_run_config};
pub use reference::{ReferenceError, ReferenceSequence, ZETA_ZERO_ORDINATES};
