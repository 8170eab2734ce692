use std::sync::Arc;

use rama::{
    Layer as _,
    error::{ErrorContext as _, OpaqueError},
    graceful::ShutdownGuard,
    http::{
        HeaderValue,
        layer::{required_header::AddRequiredResponseHeadersLayer, trace::TraceLayer},
        server::HttpServer,
        service::web::Router,
    },
    net::socket::Interface,
    rt::Executor,
    tcp::server::TcpListener,
    telemetry::tracing,
};

/// Run the diagnostics HTTP server the workload process exposes for
/// profiling tooling to attach to.
///
/// The workload loop never calls into this server; it only has to keep
/// running concurrently without being starved, which the multithreaded
/// runtime guarantees even while the cpu task burns a worker.
pub async fn run_diag_server(guard: ShutdownGuard, interface: Interface) -> Result<(), OpaqueError> {
    let exec = Executor::graceful(guard);

    let tcp_listener = TcpListener::bind(interface, exec.clone())
        .await
        .map_err(OpaqueError::from_boxed)
        .context("bind diagnostics http server")?;

    let diag_addr = tcp_listener
        .local_addr()
        .context("get bound address for diagnostics http server")?;

    tracing::info!("diagnostics http server bound to: {diag_addr}");

    let started = std::time::Instant::now();
    let http_router = Router::new()
        .with_get("/ping", "pong")
        .with_get("/status", move || {
            let uptime = started.elapsed();
            std::future::ready(format!(
                "{} pid={} uptime={}\n",
                crate::utils::project_name(),
                std::process::id(),
                humantime::format_duration(std::time::Duration::from_secs(uptime.as_secs())),
            ))
        });

    let http_svc = (
        TraceLayer::new_for_http(),
        AddRequiredResponseHeadersLayer::new()
            .with_server_header_value(HeaderValue::from_static(crate::utils::project_name())),
    )
        .into_layer(http_router);

    let http_server = HttpServer::auto(exec).service(Arc::new(http_svc));

    tcp_listener.serve(http_server).await;

    Ok(())
}
