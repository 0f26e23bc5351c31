use std::{sync::OnceLock, time::Duration};

use tracing::{debug, warn};

use crate::Result;

const USER_AGENT: &str = concat!("tvsrc/", env!("CARGO_PKG_VERSION"));

pub fn install_rustls_provider() {
    static PROVIDER_INSTALLED: OnceLock<()> = OnceLock::new();
    PROVIDER_INSTALLED.get_or_init(|| {
        if let Err(e) = rustls::crypto::aws_lc_rs::default_provider().install_default() {
            // Safe to ignore: can happen if another crate installed it first.
            debug!(existing_provider = ?e, "rustls CryptoProvider already installed");
        }
    });
}

/// Apply an optional proxy URL to an existing `reqwest::ClientBuilder`.
///
/// - `None` => reqwest defaults (system/env proxy)
/// - `Some("")` or `Some("none")` => disable all proxy
/// - `Some(url)` => explicit proxy; an invalid URL disables proxying
pub fn apply_proxy(builder: reqwest::ClientBuilder, proxy: Option<&str>) -> reqwest::ClientBuilder {
    let Some(url) = proxy.map(str::trim) else {
        return builder;
    };

    if url.is_empty() || url.eq_ignore_ascii_case("none") {
        return builder.no_proxy();
    }

    match reqwest::Proxy::all(url) {
        Ok(proxy) => builder.proxy(proxy),
        Err(error) => {
            warn!(proxy_url = %url, error = %error, "Invalid proxy URL; disabling proxy");
            builder.no_proxy()
        }
    }
}

/// Build the HTTP client shared by the subscribe provider and the speed ranker.
pub fn build_client(proxy: Option<&str>, request_timeout: Duration) -> Result<reqwest::Client> {
    install_rustls_provider();

    let mut builder = reqwest::Client::builder().user_agent(USER_AGENT);
    if request_timeout > Duration::ZERO {
        builder = builder
            .timeout(request_timeout)
            .connect_timeout(request_timeout);
    }
    builder = apply_proxy(builder, proxy);

    Ok(builder.build()?)
}
