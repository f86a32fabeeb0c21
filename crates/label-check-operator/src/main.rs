use clap::Parser;
use label_check_operator::{
    cli::{Command, RunArguments},
    controller::{self, OPERATOR_NAME},
    crd::{self, CustomResourceExt as _, DeploymentLabelCheck},
};
use label_check_telemetry::Tracing;
use snafu::{ResultExt as _, Snafu};

#[derive(Debug, Snafu)]
enum Error {
    #[snafu(display("failed to print the CRD"))]
    PrintCrd { source: crd::Error },

    #[snafu(display("failed to initialize tracing"))]
    InitializeTracing {
        source: label_check_telemetry::tracing::Error,
    },

    #[snafu(display("failed to create the Kubernetes client"))]
    CreateClient { source: label_check_operator::kube::Error },

    #[snafu(display("failed to run the controller"))]
    RunController { source: controller::Error },
}

#[derive(Parser)]
#[command(about, version)]
struct Opts {
    #[command(subcommand)]
    command: Command,
}

#[snafu::report]
#[tokio::main]
async fn main() -> Result<(), Error> {
    let opts = Opts::parse();

    match opts.command {
        Command::Crd => DeploymentLabelCheck::print_yaml_schema().context(PrintCrdSnafu)?,
        Command::Run(args) => run(args).await?,
    }

    Ok(())
}

async fn run(args: RunArguments) -> Result<(), Error> {
    // NOTE: The guard flushes the file log writer when dropped, keep it until the end.
    let _tracing_guard = Tracing::pre_configured(OPERATOR_NAME, args.telemetry.clone())
        .init()
        .context(InitializeTracingSnafu)?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        "starting {OPERATOR_NAME}"
    );

    let client = label_check_operator::kube::Client::try_default()
        .await
        .context(CreateClientSnafu)?;

    controller::run(client, args)
        .await
        .context(RunControllerSnafu)
}
