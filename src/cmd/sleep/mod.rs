use rama::{
    error::{ErrorContext as _, OpaqueError},
    graceful::ShutdownGuard,
    net::socket::Interface,
    telemetry::tracing,
};

use clap::Args;

use crate::server::SleepServer;

#[derive(Debug, Clone, Args)]
/// run only the sleep server, for external workloads to call into
pub struct SleepCommand {
    /// network interface to bind the sleep server to
    #[arg(
        long,
        short = 'b',
        value_name = "INTERFACE",
        default_value = "127.0.0.1:0"
    )]
    pub bind: Interface,
}

pub async fn exec(guard: ShutdownGuard, args: SleepCommand) -> Result<(), OpaqueError> {
    let sleep_server = SleepServer::bind(args.bind.clone())
        .await
        .context("start sleep server")?;

    tracing::info!("sleep server bound to: {}", sleep_server.addr());

    guard.clone_weak().into_cancelled().await;

    sleep_server.stop().await;

    Ok(())
}
