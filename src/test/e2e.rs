use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use rama::{
    http::{
        BodyExtractExt as _, StatusCode, client::EasyHttpWebClient,
        service::client::HttpClientExt as _,
    },
    net::socket::Interface,
};

use tokio::time::Instant;

use crate::{
    config::WorkloadConfig,
    server::SleepServer,
    workload::{
        WorkloadLoop,
        reporter::{Reporter, TaskSample},
        tasks,
    },
};

async fn start_sleep_server() -> SleepServer {
    let interface: Interface = "127.0.0.1:0".parse().unwrap();
    SleepServer::bind(interface).await.unwrap()
}

#[tokio::test]
#[tracing_test::traced_test]
async fn test_sleep_server_sleeps_for_requested_duration() {
    let server = start_sleep_server().await;
    let client = EasyHttpWebClient::default();

    let start = Instant::now();
    let resp = client
        .get(format!("http://{}/?sleep=60ms", server.addr()))
        .send()
        .await
        .unwrap();
    let elapsed = start.elapsed();

    assert_eq!(StatusCode::OK, resp.status());
    assert!(elapsed >= Duration::from_millis(60), "elapsed: {elapsed:?}");

    let body = resp.try_into_string().await.unwrap();
    assert_eq!("slept for: 60ms\n", body);

    server.stop().await;
}

#[tokio::test]
#[tracing_test::traced_test]
async fn test_sleep_server_rejects_bad_duration() {
    let server = start_sleep_server().await;
    let client = EasyHttpWebClient::default();

    let start = Instant::now();
    let resp = client
        .get(format!("http://{}/?sleep=notaduration", server.addr()))
        .send()
        .await
        .unwrap();
    let elapsed = start.elapsed();

    assert_eq!(StatusCode::BAD_REQUEST, resp.status());
    // the error path never sleeps
    assert!(elapsed < Duration::from_secs(1), "elapsed: {elapsed:?}");

    let body = resp.try_into_string().await.unwrap();
    assert!(body.contains("bad duration"), "body: {body}");

    server.stop().await;
}

#[tokio::test]
#[tracing_test::traced_test]
async fn test_sleep_server_serves_concurrent_requests_independently() {
    let server = start_sleep_server().await;
    let addr = server.addr();

    let mut handles = Vec::with_capacity(50);
    for i in 0..50u64 {
        let ms = 10 + (i % 5) * 10;
        handles.push(tokio::spawn(async move {
            let client = EasyHttpWebClient::default();
            let resp = client
                .get(format!("http://{addr}/?sleep={ms}ms"))
                .send()
                .await
                .unwrap();
            assert_eq!(StatusCode::OK, resp.status());
            let body = resp.try_into_string().await.unwrap();
            assert_eq!(format!("slept for: {ms}ms\n"), body, "request #{i}");
        }));
    }

    for handle in handles {
        handle.await.unwrap();
    }

    server.stop().await;
}

#[tokio::test]
#[tracing_test::traced_test]
async fn test_network_task_handles_compound_durations() {
    let server = start_sleep_server().await;
    let client = EasyHttpWebClient::default();

    // a delay spanning multiple humantime units ("1ms 500us") must still
    // be encoded into a valid request-target
    let delay = Duration::from_micros(1500);
    let start = Instant::now();
    tasks::slow_network_request(&client, server.addr(), delay)
        .await
        .unwrap();
    assert!(start.elapsed() >= delay, "elapsed: {:?}", start.elapsed());

    server.stop().await;
}

#[tokio::test]
#[tracing_test::traced_test]
async fn test_network_task_fails_once_server_is_stopped() {
    let server = start_sleep_server().await;
    let addr = server.addr();
    let client = EasyHttpWebClient::default();

    tasks::slow_network_request(&client, addr, Duration::from_millis(5))
        .await
        .unwrap();

    server.stop().await;

    // the bound address is released; the harness dependency is gone and
    // the task must surface that as an error for the loop to abort on
    let result = tasks::slow_network_request(&client, addr, Duration::from_millis(5)).await;
    assert!(result.is_err());
}

#[derive(Debug, Clone, Default)]
struct RecordingReporter {
    samples: Arc<Mutex<Vec<TaskSample>>>,
    finished: Arc<Mutex<u64>>,
}

impl Reporter for RecordingReporter {
    fn on_sample(&mut self, sample: &TaskSample) {
        self.samples.lock().unwrap().push(sample.clone());
    }

    fn finish(&mut self) {
        *self.finished.lock().unwrap() += 1;
    }
}

#[tokio::test]
#[tracing_test::traced_test]
async fn test_workload_loop_measures_and_samples_periodically() {
    let server = start_sleep_server().await;

    let cfg = WorkloadConfig {
        network_time: Duration::from_millis(20),
        cpu_time: Duration::from_millis(10),
        sleep_time: Duration::from_millis(5),
        sample_every: 2,
    };
    let per_iteration = cfg.network_time + cfg.cpu_time + cfg.sleep_time;

    let reporter = RecordingReporter::default();
    let samples = reporter.samples.clone();
    let finished = reporter.finished.clone();

    let mut load = WorkloadLoop::new(
        EasyHttpWebClient::default(),
        server.addr(),
        cfg.clone(),
        Box::new(reporter),
    );

    let start = Instant::now();
    load.run_iterations(6).await.unwrap();
    let elapsed = start.elapsed();

    // tasks are strictly serialized, so durations compose additively
    assert!(elapsed >= per_iteration * 6, "elapsed: {elapsed:?}");

    let samples = samples.lock().unwrap();
    assert_eq!(
        vec![2, 4, 6],
        samples.iter().map(|s| s.iteration).collect::<Vec<_>>()
    );
    for sample in samples.iter() {
        assert!(sample.network >= cfg.network_time, "sample: {sample:?}");
        assert!(sample.cpu >= cfg.cpu_time, "sample: {sample:?}");
        assert!(sample.sleep >= cfg.sleep_time, "sample: {sample:?}");
    }

    assert_eq!(1, *finished.lock().unwrap());

    server.stop().await;
}

#[tokio::test]
#[tracing_test::traced_test]
async fn test_workload_loop_flushes_reporter_on_fatal_error() {
    let server = start_sleep_server().await;
    let addr = server.addr();
    server.stop().await;

    let reporter = RecordingReporter::default();
    let finished = reporter.finished.clone();

    let mut load = WorkloadLoop::new(
        EasyHttpWebClient::default(),
        addr,
        WorkloadConfig {
            network_time: Duration::from_millis(5),
            cpu_time: Duration::from_millis(1),
            sleep_time: Duration::from_millis(1),
            sample_every: 1,
        },
        Box::new(reporter),
    );

    let result = load.run_iterations(3).await;
    assert!(result.is_err());
    // the abort still emits the summary
    assert_eq!(1, *finished.lock().unwrap());
}
