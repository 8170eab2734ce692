use std::time::Duration;

/// Workload shape configuration.
///
/// Each task has a fixed target duration; together they define the
/// on-CPU/off-CPU mixture one loop iteration produces. The defaults
/// match the canonical profiler-validation mix.
#[derive(Debug, Clone, clap::Args)]
pub struct WorkloadConfig {
    /// Target duration of the simulated slow network round trip.
    #[arg(
        long,
        value_name = "DURATION",
        default_value = "60ms",
        value_parser = humantime::parse_duration
    )]
    pub network_time: Duration,

    /// Target duration of the cpu-bound computation.
    #[arg(
        long,
        value_name = "DURATION",
        default_value = "30ms",
        value_parser = humantime::parse_duration
    )]
    pub cpu_time: Duration,

    /// Target duration of the scheduler sleep.
    #[arg(
        long,
        value_name = "DURATION",
        default_value = "10ms",
        value_parser = humantime::parse_duration
    )]
    pub sleep_time: Duration,

    /// Report task timings once every N loop iterations.
    ///
    /// Periodic sampling keeps long runs observable without
    /// flooding the output sink.
    #[arg(long, value_name = "N", default_value_t = 10_000)]
    pub sample_every: u64,
}

impl Default for WorkloadConfig {
    fn default() -> Self {
        Self {
            network_time: Duration::from_millis(60),
            cpu_time: Duration::from_millis(30),
            sleep_time: Duration::from_millis(10),
            sample_every: 10_000,
        }
    }
}
