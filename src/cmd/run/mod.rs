use rama::{
    error::{ErrorContext as _, OpaqueError},
    graceful::ShutdownGuard,
    http::client::EasyHttpWebClient,
    net::socket::Interface,
    telemetry::tracing,
};

use clap::Args;

use crate::{
    config::WorkloadConfig,
    server::{SleepServer, diag},
    workload::{
        WorkloadLoop,
        reporter::{HumanReporter, JsonlReporter, Reporter},
    },
};

#[derive(Debug, Clone, Args)]
/// run the profiler validation workload
pub struct RunCommand {
    #[clap(flatten)]
    config: WorkloadConfig,

    /// network interface to bind the sleep server to
    #[arg(
        long,
        short = 'b',
        value_name = "INTERFACE",
        default_value = "127.0.0.1:0"
    )]
    pub bind: Interface,

    /// network interface to bind the diagnostics http server to
    #[arg(
        long = "diag",
        value_name = "INTERFACE",
        default_value = "127.0.0.1:0"
    )]
    pub diag_bind: Interface,

    /// report json lines instead of a human-friendly format
    #[arg(long, default_value_t = false)]
    json: bool,

    /// stop after this many loop iterations (runs until shutdown when omitted)
    #[arg(long, value_name = "N")]
    iterations: Option<u64>,
}

pub async fn exec(guard: ShutdownGuard, args: RunCommand) -> Result<(), OpaqueError> {
    // The diagnostics server is a passive collaborator: profiling tools
    // attach to it while the loop below generates the load they observe.
    let diag_bind = args.diag_bind.clone();
    guard.spawn_task_fn(async move |guard| {
        if let Err(err) = diag::run_diag_server(guard, diag_bind).await {
            tracing::error!("diagnostics http server failed: {err}");
        }
    });

    let sleep_server = SleepServer::bind(args.bind.clone())
        .await
        .context("start sleep server")?;
    tracing::info!("sleep server bound to: {}", sleep_server.addr());

    let client = EasyHttpWebClient::default();

    let reporter: Box<dyn Reporter> = if args.json {
        Box::new(JsonlReporter::new())
    } else {
        Box::new(HumanReporter::new())
    };

    let mut load = WorkloadLoop::new(client, sleep_server.addr(), args.config, reporter);

    let result = match args.iterations {
        Some(n) => load.run_iterations(n).await,
        None => load.run(guard).await,
    };

    sleep_server.stop().await;

    result
}
