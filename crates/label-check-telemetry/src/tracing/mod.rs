//! Installs the global `tracing` subscriber of the operator.
//!
//! Two outputs are supported: human readable (or JSON) lines on the console
//! and JSON lines in rolling log files. See [`Tracing`].

use std::{marker::PhantomData, path::PathBuf};

use snafu::{ResultExt as _, Snafu};
use tracing::{level_filters::LevelFilter, subscriber::SetGlobalDefaultError};
use tracing_appender::{
    non_blocking::WorkerGuard,
    rolling::{InitError, RollingFileAppender},
};
use tracing_subscriber::{EnvFilter, Layer, Registry, filter::Directive, layer::SubscriberExt};

use crate::tracing::settings::*;

pub mod settings;

type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("failed to initialize rolling file appender"))]
    InitRollingFileAppender { source: InitError },

    #[snafu(display("unable to set the global default subscriber"))]
    SetGlobalDefaultSubscriber { source: SetGlobalDefaultError },
}

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Configured console and file outputs, ready to be installed with
/// [`Tracing::init`].
///
/// The value returned by [`Tracing::init`] owns the background writer of the
/// file output. Log lines still buffered are lost if it is dropped before the
/// program ends, so bind it to a named variable in `main`:
///
/// ```
/// # use label_check_telemetry::tracing::{Error, Tracing};
/// # use tracing_subscriber::filter::LevelFilter;
/// fn main() -> Result<(), Error> {
///     let _tracing_guard = Tracing::builder()
///         .service_name("label-check-operator")
///         .with_console_output(("CONSOLE_LOG_LEVEL", LevelFilter::INFO))
///         .build()
///         .init()?;
///
///     tracing::info!("ready");
///     Ok(())
/// }
/// ```
///
/// The operator binary uses [`Tracing::pre_configured`], which is driven by
/// [`TelemetryOptions`]:
///
/// - `--console-log-disabled` / `CONSOLE_LOG_DISABLED` turns the console output off.
/// - `--console-log-format` / `CONSOLE_LOG_FORMAT` selects `plain` or `json`.
/// - `--file-log-directory` / `FILE_LOG_DIRECTORY` turns the file output on.
/// - `--file-log-rotation-period` / `FILE_LOG_ROTATION_PERIOD` sets how often files roll.
/// - `CONSOLE_LOG_LEVEL` and `FILE_LOG_LEVEL` hold the level filter of each output.
pub struct Tracing {
    service_name: &'static str,
    console_log_settings: ConsoleLogSettings,
    file_log_settings: FileLogSettings,

    file_writer_guard: Option<WorkerGuard>,
}

impl Tracing {
    /// Environment variable holding the console level filter.
    pub const CONSOLE_LOG_LEVEL: &str = "CONSOLE_LOG_LEVEL";
    /// Environment variable holding the file level filter.
    pub const FILE_LOG_LEVEL: &str = "FILE_LOG_LEVEL";
    /// Suffix of every log file name, the prefix is the service name.
    pub const FILE_LOG_SUFFIX: &str = "tracing-rs.json";
    /// Rolled over log files kept on disk.
    pub const FILE_LOG_MAX_FILES: usize = 6;

    pub fn builder() -> TracingBuilder<NeedsServiceName> {
        TracingBuilder {
            service_name: "",
            console_log_settings: ConsoleLogSettings::Disabled,
            file_log_settings: FileLogSettings::Disabled,
            _state: PhantomData,
        }
    }

    /// Both outputs at INFO, configured from the command line.
    ///
    /// Files are never rolled over unless a rotation period is given.
    pub fn pre_configured(service_name: &'static str, options: TelemetryOptions) -> Self {
        let TelemetryOptions {
            console_log_disabled,
            console_log_format,
            file_log_directory,
            file_log_rotation_period,
        } = options;

        let console_output = (!console_log_disabled).then(|| {
            Settings::builder()
                .with_environment_variable(Self::CONSOLE_LOG_LEVEL)
                .with_default_level(LevelFilter::INFO)
                .console_log_settings_builder()
                .with_log_format(console_log_format.into())
                .build()
        });

        let file_output = file_log_directory.map(|directory| {
            Settings::builder()
                .with_environment_variable(Self::FILE_LOG_LEVEL)
                .with_default_level(LevelFilter::INFO)
                .file_log_settings_builder(directory, Self::FILE_LOG_SUFFIX)
                .with_rotation_period(file_log_rotation_period.unwrap_or_default())
                .with_max_files(Self::FILE_LOG_MAX_FILES)
                .build()
        });

        Self::builder()
            .service_name(service_name)
            .with_console_output(console_output)
            .with_file_output(file_output)
            .build()
    }

    /// Installs the enabled outputs as the global default subscriber.
    ///
    /// Keep the returned value alive for the lifetime of the program.
    pub fn init(mut self) -> Result<Tracing> {
        let mut layers: Vec<BoxedLayer> = Vec::new();

        if let ConsoleLogSettings::Enabled {
            common_settings,
            log_format,
        } = &self.console_log_settings
        {
            layers.push(console_layer(common_settings, log_format));
        }

        if let FileLogSettings::Enabled {
            common_settings,
            file_log_dir,
            rotation_period,
            filename_suffix,
            max_log_files,
        } = &self.file_log_settings
        {
            let mut appender = RollingFileAppender::builder()
                .rotation(rotation_period.clone())
                .filename_prefix(self.service_name)
                .filename_suffix(filename_suffix.as_str());
            if let Some(max_log_files) = max_log_files {
                appender = appender.max_log_files(*max_log_files);
            }
            let appender = appender
                .build(file_log_dir)
                .context(InitRollingFileAppenderSnafu)?;

            let (writer, guard) = tracing_appender::non_blocking(appender);
            self.file_writer_guard = Some(guard);

            layers.push(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(writer)
                    .with_filter(env_filter(common_settings))
                    .boxed(),
            );
        }

        if !layers.is_empty() {
            tracing::subscriber::set_global_default(tracing_subscriber::registry().with(layers))
                .context(SetGlobalDefaultSubscriberSnafu)?;
        }

        // Only visible now that the subscriber is installed
        match &self.file_log_settings {
            FileLogSettings::Enabled { file_log_dir, .. } => {
                tracing::info!(directory = %file_log_dir.display(), "file logging enabled");
            }
            FileLogSettings::Disabled => {
                tracing::debug!("file logging disabled, because no log directory set");
            }
        }

        Ok(self)
    }
}

fn console_layer(settings: &Settings, format: &Format) -> BoxedLayer {
    let filter = env_filter(settings);

    match format {
        Format::Plain => tracing_subscriber::fmt::layer().with_filter(filter).boxed(),
        Format::Json => tracing_subscriber::fmt::layer()
            .json()
            .with_filter(filter)
            .boxed(),
    }
}

/// Level filter read from the settings' environment variable, falling back to
/// the settings' default level.
fn env_filter(settings: &Settings) -> EnvFilter {
    EnvFilter::builder()
        .with_env_var(settings.environment_variable)
        .with_default_directive(Directive::from(settings.default_level))
        .from_env_lossy()
}

/// Builder state before [`TracingBuilder::service_name`] was called.
pub struct NeedsServiceName;

/// Builder state in which the outputs can be configured.
pub struct Configurable;

/// Builds a [`Tracing`]. The service name must be set first, it prefixes the
/// log file names.
pub struct TracingBuilder<S> {
    service_name: &'static str,
    console_log_settings: ConsoleLogSettings,
    file_log_settings: FileLogSettings,
    _state: PhantomData<S>,
}

impl TracingBuilder<NeedsServiceName> {
    pub fn service_name(self, service_name: &'static str) -> TracingBuilder<Configurable> {
        TracingBuilder {
            service_name,
            console_log_settings: self.console_log_settings,
            file_log_settings: self.file_log_settings,
            _state: PhantomData,
        }
    }
}

impl TracingBuilder<Configurable> {
    /// Replaces the console output settings.
    pub fn with_console_output(mut self, settings: impl Into<ConsoleLogSettings>) -> Self {
        self.console_log_settings = settings.into();
        self
    }

    /// Replaces the file output settings.
    pub fn with_file_output(mut self, settings: impl Into<FileLogSettings>) -> Self {
        self.file_log_settings = settings.into();
        self
    }

    pub fn build(self) -> Tracing {
        Tracing {
            service_name: self.service_name,
            console_log_settings: self.console_log_settings,
            file_log_settings: self.file_log_settings,
            file_writer_guard: None,
        }
    }
}

/// Command line options of [`Tracing::pre_configured`].
///
/// With the `clap` feature these can be flattened into the arguments of a
/// binary.
#[cfg_attr(
    feature = "clap",
    doc = r#"
```
# use label_check_telemetry::tracing::TelemetryOptions;
use clap::Parser;

#[derive(Parser)]
struct Cli {
    #[clap(flatten)]
    telemetry: TelemetryOptions,
}
```
"#
)]
#[cfg_attr(feature = "clap", derive(clap::Args))]
#[cfg_attr(feature = "clap", command(next_help_heading = "Telemetry Options"))]
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TelemetryOptions {
    /// Disable console logs.
    #[cfg_attr(feature = "clap", arg(long, env))]
    pub console_log_disabled: bool,

    /// Output FORMAT of the console logs.
    #[cfg_attr(
        feature = "clap",
        arg(long, env, value_name = "FORMAT", default_value_t = ConsoleLogFormat::Plain)
    )]
    pub console_log_format: ConsoleLogFormat,

    /// Write JSON logs to rolling files in DIRECTORY.
    #[cfg_attr(
        feature = "clap",
        arg(long, env, value_name = "DIRECTORY", group = "file_log")
    )]
    pub file_log_directory: Option<PathBuf>,

    /// Roll the log files over every PERIOD.
    #[cfg_attr(
        feature = "clap",
        arg(long, env, value_name = "PERIOD", requires = "file_log")
    )]
    pub file_log_rotation_period: Option<RotationPeriod>,
}

/// Console output formats selectable on the command line.
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, strum::Display, strum::EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum ConsoleLogFormat {
    #[default]
    Plain,
    Json,
}

impl From<ConsoleLogFormat> for Format {
    fn from(value: ConsoleLogFormat) -> Self {
        match value {
            ConsoleLogFormat::Plain => Self::Plain,
            ConsoleLogFormat::Json => Self::Json,
        }
    }
}

/// How often log files are rolled over.
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
#[derive(Clone, Debug, Default, PartialEq, Eq, strum::Display, strum::EnumString)]
#[strum(serialize_all = "PascalCase")]
pub enum RotationPeriod {
    Minutely,
    Hourly,
    Daily,

    #[default]
    Never,
}

impl From<RotationPeriod> for Rotation {
    fn from(value: RotationPeriod) -> Self {
        match value {
            RotationPeriod::Minutely => Self::MINUTELY,
            RotationPeriod::Hourly => Self::HOURLY,
            RotationPeriod::Daily => Self::DAILY,
            RotationPeriod::Never => Self::NEVER,
        }
    }
}
