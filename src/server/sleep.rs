use std::{borrow::Cow, convert::Infallible, sync::Arc};

use rama::{
    Layer as _, Service,
    error::{ErrorContext as _, OpaqueError},
    http::{
        HeaderValue, Request, Response, StatusCode,
        layer::{required_header::AddRequiredResponseHeadersLayer, trace::TraceLayer},
        server::HttpServer,
        service::web::{extract::Query, response::IntoResponse},
    },
    net::{address::SocketAddress, socket::Interface},
    rt::Executor,
    tcp::server::TcpListener,
    telemetry::tracing,
};

use serde::Deserialize;
use tokio::sync::oneshot;

/// A server that simulates a slow upstream dependency: every request
/// carries a `sleep` query parameter and the handling path blocks for
/// exactly that duration before responding.
///
/// The handle owns the server lifecycle: it is bound once and torn down
/// exactly once via [`SleepServer::stop`], which consumes the handle.
pub struct SleepServer {
    addr: SocketAddress,
    stop_tx: oneshot::Sender<()>,
    shutdown: rama::graceful::Shutdown,
}

impl SleepServer {
    /// Bind the sleep server to the given interface and start serving.
    ///
    /// Use an ephemeral interface (e.g. `127.0.0.1:0`) to let the
    /// environment pick the port; the bound address is available via
    /// [`SleepServer::addr`].
    pub async fn bind(interface: Interface) -> Result<Self, OpaqueError> {
        let (stop_tx, stop_rx) = oneshot::channel();
        let shutdown = rama::graceful::Shutdown::new(async move {
            let _ = stop_rx.await;
        });

        let exec = Executor::graceful(shutdown.guard());
        let tcp_listener = TcpListener::bind(interface, exec.clone())
            .await
            .map_err(OpaqueError::from_boxed)
            .context("bind sleep server")?;

        let addr: SocketAddress = tcp_listener
            .local_addr()
            .context("get bound address for sleep server")?
            .into();

        let http_svc = (
            TraceLayer::new_for_http(),
            AddRequiredResponseHeadersLayer::new()
                .with_server_header_value(HeaderValue::from_static(crate::utils::project_name())),
        )
            .into_layer(Arc::new(SleepService::default()));

        let http_server = HttpServer::auto(exec).service(Arc::new(http_svc));

        shutdown.spawn_task_fn(async move |_guard| {
            tcp_listener.serve(http_server).await;
        });

        tracing::debug!("sleep server bound to: {addr}");

        Ok(Self {
            addr,
            stop_tx,
            shutdown,
        })
    }

    /// The address the server is reachable at for the process lifetime.
    pub fn addr(&self) -> SocketAddress {
        self.addr
    }

    /// Tear the server down: stop accepting, release the bound address
    /// and wait for outstanding connections to finish.
    pub async fn stop(self) {
        let _ = self.stop_tx.send(());
        self.shutdown.shutdown().await;
    }
}

impl std::fmt::Debug for SleepServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SleepServer").field("addr", &self.addr).finish()
    }
}

#[derive(Debug, Deserialize)]
struct SleepParams<'a> {
    sleep: Option<Cow<'a, str>>,
}

/// Per-request sleep logic. Stateless: concurrent requests sleep
/// independently without any shared mutable state.
#[derive(Debug, Clone, Default)]
pub struct SleepService;

impl Service<Request> for SleepService {
    type Output = Response;
    type Error = Infallible;

    async fn serve(&self, req: Request) -> Result<Self::Output, Self::Error> {
        let raw = req
            .uri()
            .query()
            .and_then(|query| {
                Query::parse_query_str(query)
                    .ok()
                    .and_then(|Query(SleepParams { sleep })| sleep)
            })
            .unwrap_or_default();

        match humantime::parse_duration(&raw) {
            Ok(delay) => {
                // Intentionally occupies this handling path for the full
                // delay, the same way a slow upstream holds a connection open.
                tokio::time::sleep(delay).await;
                Ok((
                    StatusCode::OK,
                    format!("slept for: {}\n", humantime::format_duration(delay)),
                )
                    .into_response())
            }
            Err(err) => {
                tracing::debug!("reject sleep request with invalid duration '{raw}': {err}");
                Ok((
                    StatusCode::BAD_REQUEST,
                    format!("bad duration: {raw}: {err}\n"),
                )
                    .into_response())
            }
        }
    }
}
