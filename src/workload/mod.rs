//! The workload driver: an unbounded single-task loop that serializes the
//! three tasks every cycle so their durations compose additively, measures
//! each, and periodically reports timing samples.

use rama::{
    Service,
    error::{BoxError, OpaqueError},
    graceful::ShutdownGuard,
    http::{Request, Response},
    net::address::SocketAddress,
    telemetry::tracing,
};

use tokio::time::Instant;

use crate::config::WorkloadConfig;

pub mod reporter;
pub mod tasks;

use self::reporter::{Reporter, TaskSample};

/// Drives the three-task cycle against a sleep server at a fixed address.
///
/// The sleep server address is an explicit construction value rather than
/// ambient process state, so the loop can be pointed at any server in
/// tests. The loop owns all of its mutable state; nothing is shared.
pub struct WorkloadLoop<S> {
    client: S,
    sleep_addr: SocketAddress,
    cfg: WorkloadConfig,
    reporter: Box<dyn Reporter>,
    iteration: u64,
}

impl<S> WorkloadLoop<S>
where
    S: Service<Request, Output = Response>,
    S::Error: Into<BoxError>,
{
    pub fn new(
        client: S,
        sleep_addr: SocketAddress,
        cfg: WorkloadConfig,
        reporter: Box<dyn Reporter>,
    ) -> Self {
        Self {
            client,
            sleep_addr,
            cfg,
            reporter,
            iteration: 0,
        }
    }

    /// Run until the guard is cancelled.
    ///
    /// A network task failure is returned as-is: the harness treats it as
    /// fatal rather than retrying, since the sleep server is local and
    /// assumed always reachable.
    pub async fn run(mut self, guard: ShutdownGuard) -> Result<(), OpaqueError> {
        let mut cancelled = std::pin::pin!(guard.clone_weak().into_cancelled());

        loop {
            tokio::select! {
                _ = cancelled.as_mut() => {
                    tracing::debug!("exit workload loop after {} iterations: guard shutdown", self.iteration);
                    self.reporter.finish();
                    return Ok(());
                }
                result = self.run_once() => {
                    if let Err(err) = result {
                        // the summary line still goes out on the fatal path
                        self.reporter.finish();
                        return Err(err);
                    }
                }
            }
        }
    }

    /// Run exactly `n` iterations, then flush the reporter.
    ///
    /// Deterministic finite driver used by tests and `--iterations N`.
    /// The reporter is flushed whether the loop completes or aborts.
    pub async fn run_iterations(&mut self, n: u64) -> Result<(), OpaqueError> {
        for _ in 0..n {
            if let Err(err) = self.run_once().await {
                self.reporter.finish();
                return Err(err);
            }
        }
        self.reporter.finish();
        Ok(())
    }

    async fn run_once(&mut self) -> Result<(), OpaqueError> {
        let start = Instant::now();
        tasks::slow_network_request(&self.client, self.sleep_addr, self.cfg.network_time).await?;
        let network = start.elapsed();

        let cpu_start = Instant::now();
        tasks::cpu_intensive_task(self.cfg.cpu_time);
        let cpu = cpu_start.elapsed();

        let sleep_start = Instant::now();
        tasks::scheduler_sleep(self.cfg.sleep_time).await;
        let sleep = sleep_start.elapsed();

        // unbounded by design; saturating only so an absurdly long run
        // cannot crash the loop
        self.iteration = self.iteration.saturating_add(1);

        if self.iteration % self.cfg.sample_every.max(1) == 0 {
            self.reporter.on_sample(&TaskSample {
                iteration: self.iteration,
                network,
                cpu,
                sleep,
            });
        }

        Ok(())
    }
}
