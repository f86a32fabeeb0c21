//! The command line of the operator.
//!
//! ```no_run
//! use clap::Parser;
//! use label_check_operator::cli::Command;
//!
//! #[derive(Parser)]
//! #[command(about, version)]
//! struct Opts {
//!     #[command(subcommand)]
//!     command: Command,
//! }
//!
//! let opts = Opts::parse();
//! ```
use clap::{Args, Parser};
use label_check_telemetry::tracing::TelemetryOptions;

use crate::{namespace::WatchNamespace, reconcile::CorrectionWrites};

/// The field manager recorded on every write if none is configured.
pub const DEFAULT_FIELD_MANAGER: &str = "label-check-operator";

#[derive(Debug, PartialEq, Eq, Parser)]
pub enum Command<Run: Args = RunArguments> {
    /// Print CRD objects
    Crd,

    /// Run the operator
    Run(Run),
}

#[derive(Debug, PartialEq, Eq, Parser)]
#[command(long_about = "")]
pub struct RunArguments {
    /// Namespace to watch for checks, all namespaces if empty
    #[arg(long, env, default_value = "")]
    pub watch_namespace: WatchNamespace,

    /// Whether the label and the restart marker are written in one or two updates
    #[arg(long, env, value_enum, default_value_t = CorrectionWrites::Combined)]
    pub correction_writes: CorrectionWrites,

    /// Delay before a failed reconcile is retried
    #[arg(long, env, default_value = "10s")]
    pub error_requeue_delay: humantime::Duration,

    /// Field manager recorded on updates of Deployments
    #[arg(long, env, default_value = DEFAULT_FIELD_MANAGER)]
    pub field_manager: String,

    // IMPORTANT: All (flattened) sub structs should be placed at the end to ensure the help
    // headings are correct.
    #[command(flatten)]
    pub telemetry: TelemetryOptions,
}
