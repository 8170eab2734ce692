pub mod telemetry;

/// Name used to identify this tool over the network (e.g. `Server` header).
pub fn project_name() -> &'static str {
    env!("CARGO_PKG_NAME")
}
