use anyhow::Result;

/// Runtime for the daemon binary. The loop has a single timer and no parallel work, so one thread
/// is enough.
pub fn daemon_runtime() -> Result<tokio::runtime::Runtime> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .enable_io()
        .thread_name("timefor-daemon")
        .build()?;
    Ok(runtime)
}
