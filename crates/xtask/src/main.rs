//! Development tasks of the workspace, run with `cargo run -p xtask -- <command>`.
use clap::{Parser, Subcommand};
use snafu::{ResultExt, Snafu};

mod crd;

#[derive(Debug, Snafu)]
enum Error {
    #[snafu(display("failed to write the CRD preview"))]
    WriteCrdPreview { source: crd::Error },
}

#[derive(Debug, Parser)]
#[command(about)]
struct Cli {
    #[command(subcommand)]
    command: Task,
}

#[derive(Debug, Subcommand)]
enum Task {
    /// Tasks around the CustomResourceDefinition of the operator
    #[command(subcommand)]
    Crd(CrdTask),
}

#[derive(Debug, Subcommand)]
enum CrdTask {
    /// Write the CRD manifest to deploy/crds
    Preview,
}

#[snafu::report]
fn main() -> Result<(), Error> {
    match Cli::parse().command {
        Task::Crd(CrdTask::Preview) => crd::generate_preview().context(WriteCrdPreviewSnafu),
    }
}
