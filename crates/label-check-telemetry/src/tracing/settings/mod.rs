//! Per output settings consumed by [`Tracing`](super::Tracing).

use std::path::Path;

use tracing::level_filters::LevelFilter;

pub mod console_log;
pub use console_log::*;

pub mod file_log;
pub use file_log::*;

/// Level filter configuration shared by all outputs.
#[derive(Debug, PartialEq, Eq)]
pub struct Settings {
    /// Environment variable holding an `EnvFilter` directive string. Takes
    /// precedence over [`Self::default_level`] when set.
    pub environment_variable: &'static str,

    pub default_level: LevelFilter,
}

impl Settings {
    pub fn builder() -> SettingsBuilder {
        SettingsBuilder::default()
    }
}

impl Default for Settings {
    fn default() -> Self {
        SettingsBuilder::default().build()
    }
}

pub trait SettingsToggle {
    fn is_enabled(&self) -> bool;

    fn is_disabled(&self) -> bool {
        !self.is_enabled()
    }
}

/// Starts with `RUST_LOG` and [`LevelFilter::OFF`].
pub struct SettingsBuilder {
    environment_variable: &'static str,
    default_level: LevelFilter,
}

impl SettingsBuilder {
    pub fn with_environment_variable(mut self, name: &'static str) -> Self {
        self.environment_variable = name;
        self
    }

    pub fn with_default_level(mut self, level: impl Into<LevelFilter>) -> Self {
        self.default_level = level.into();
        self
    }

    /// Continues with the console output settings.
    pub fn console_log_settings_builder(self) -> ConsoleLogSettingsBuilder {
        self.into()
    }

    /// Continues with the file output settings. Files are never rolled over
    /// and never deleted unless configured otherwise.
    pub fn file_log_settings_builder(
        self,
        directory: impl AsRef<Path>,
        filename_suffix: impl Into<String>,
    ) -> FileLogSettingsBuilder {
        FileLogSettingsBuilder {
            common_settings: self.build(),
            file_log_dir: directory.as_ref().to_path_buf(),
            filename_suffix: filename_suffix.into(),
            rotation_period: Rotation::NEVER,
            max_log_files: None,
        }
    }

    pub fn build(self) -> Settings {
        Settings {
            environment_variable: self.environment_variable,
            default_level: self.default_level,
        }
    }
}

impl Default for SettingsBuilder {
    fn default() -> Self {
        Self {
            environment_variable: "RUST_LOG",
            default_level: LevelFilter::OFF,
        }
    }
}
