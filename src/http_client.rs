use std::time::Duration;

use once_cell::sync::OnceCell;
use reqwest::blocking::Client;

const DEFAULT_TIMEOUT_SECS: u64 = 10;

static CLIENT: OnceCell<Client> = OnceCell::new();
static TIMEOUT: OnceCell<Duration> = OnceCell::new();

/// Sets the per-request timeout. Only effective before the first call to
/// [`http_client`]; later calls are ignored.
pub fn set_request_timeout(timeout: Duration) {
    let _ = TIMEOUT.set(timeout);
}

/// Shared blocking client. Must be first touched from a thread that is not
/// driving an async runtime (the poller thread or `spawn_blocking`).
pub fn http_client() -> reqwest::Result<&'static Client> {
    CLIENT.get_or_try_init(|| {
        let timeout = TIMEOUT
            .get()
            .copied()
            .unwrap_or(Duration::from_secs(DEFAULT_TIMEOUT_SECS));
        Client::builder()
            .timeout(timeout)
            .user_agent(concat!("pulse_server/", env!("CARGO_PKG_VERSION")))
            .build()
    })
}
