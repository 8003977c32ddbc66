//! Tracing initialization
//!
//! The embedding application decides where log output goes; components in
//! this crate only emit structured events through `tracing`.

pub fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "media_downloader_deluxe=info".into());

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .try_init();
}
