//! Settings of the rolling JSON file output.

use std::path::PathBuf;

pub use tracing_appender::rolling::Rotation;

use super::{Settings, SettingsToggle};

#[derive(Debug, Default, PartialEq, Eq)]
pub enum FileLogSettings {
    #[default]
    Disabled,

    Enabled {
        common_settings: Settings,

        /// Directory the log files are created in.
        file_log_dir: PathBuf,

        rotation_period: Rotation,

        /// Appended to the service name to form the file names.
        filename_suffix: String,

        /// Older files are deleted once this many exist, unbounded if unset.
        max_log_files: Option<usize>,
    },
}

impl SettingsToggle for FileLogSettings {
    fn is_enabled(&self) -> bool {
        matches!(self, Self::Enabled { .. })
    }
}

/// Created by [`SettingsBuilder::file_log_settings_builder`](super::SettingsBuilder::file_log_settings_builder).
pub struct FileLogSettingsBuilder {
    pub(crate) common_settings: Settings,
    pub(crate) file_log_dir: PathBuf,
    pub(crate) rotation_period: Rotation,
    pub(crate) filename_suffix: String,
    pub(crate) max_log_files: Option<usize>,
}

impl FileLogSettingsBuilder {
    pub fn with_rotation_period(mut self, rotation_period: impl Into<Rotation>) -> Self {
        self.rotation_period = rotation_period.into();
        self
    }

    pub fn with_max_files(mut self, max_log_files: impl Into<Option<usize>>) -> Self {
        self.max_log_files = max_log_files.into();
        self
    }

    pub fn build(self) -> FileLogSettings {
        let Self {
            common_settings,
            file_log_dir,
            rotation_period,
            filename_suffix,
            max_log_files,
        } = self;

        FileLogSettings::Enabled {
            common_settings,
            file_log_dir,
            rotation_period,
            filename_suffix,
            max_log_files,
        }
    }
}

impl<T> From<Option<T>> for FileLogSettings
where
    T: Into<FileLogSettings>,
{
    fn from(settings: Option<T>) -> Self {
        settings.map_or_else(Self::default, Into::into)
    }
}
