use std::time::Duration;

/// Elapsed wall-clock time of each task within one loop iteration.
#[derive(Debug, Clone)]
pub struct TaskSample {
    pub iteration: u64,
    pub network: Duration,
    pub cpu: Duration,
    pub sleep: Duration,
}

/// Sink for the periodically sampled task timings.
pub trait Reporter: Send + 'static {
    fn on_sample(&mut self, sample: &TaskSample);
    fn finish(&mut self);
}

#[derive(Default)]
struct Totals {
    samples: u64,
    network: Duration,
    cpu: Duration,
    sleep: Duration,
}

impl Totals {
    fn apply(&mut self, sample: &TaskSample) {
        self.samples += 1;
        self.network += sample.network;
        self.cpu += sample.cpu;
        self.sleep += sample.sleep;
    }

    fn mean(total: Duration, samples: u64) -> Duration {
        if samples == 0 {
            Duration::ZERO
        } else {
            // Duration only divides by u32 directly; go through f64 so the
            // sample count cannot wrap
            total.div_f64(samples as f64)
        }
    }
}

/// Human-friendly line-per-sample output.
#[derive(Default)]
pub struct HumanReporter {
    totals: Totals,
}

impl HumanReporter {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Reporter for HumanReporter {
    fn on_sample(&mut self, sample: &TaskSample) {
        self.totals.apply(sample);
        println!(
            "iter={} slow_network_request={:?} cpu_intensive_task={:?} scheduler_sleep={:?}",
            sample.iteration, sample.network, sample.cpu, sample.sleep,
        );
    }

    fn finish(&mut self) {
        let samples = self.totals.samples;
        println!(
            "done samples={} mean_network={:?} mean_cpu={:?} mean_sleep={:?}",
            samples,
            Totals::mean(self.totals.network, samples),
            Totals::mean(self.totals.cpu, samples),
            Totals::mean(self.totals.sleep, samples),
        );
    }
}

/// JSONL output, one object per sample plus a final summary object.
#[derive(Default)]
pub struct JsonlReporter {
    totals: Totals,
}

impl JsonlReporter {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Reporter for JsonlReporter {
    fn on_sample(&mut self, sample: &TaskSample) {
        self.totals.apply(sample);
        let line = serde_json::json!({
            "type": "sample",
            "iteration": sample.iteration,
            "network_us": sample.network.as_micros(),
            "cpu_us": sample.cpu.as_micros(),
            "sleep_us": sample.sleep.as_micros(),
        });
        println!("{}", line);
    }

    fn finish(&mut self) {
        let samples = self.totals.samples;
        let line = serde_json::json!({
            "type": "final",
            "samples": samples,
            "mean_network_us": Totals::mean(self.totals.network, samples).as_micros(),
            "mean_cpu_us": Totals::mean(self.totals.cpu, samples).as_micros(),
            "mean_sleep_us": Totals::mean(self.totals.sleep, samples).as_micros(),
        });
        println!("{}", line);
    }
}
