//! Shared reqwest plumbing.

use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use tracing::warn;

use crate::Result;

fn user_agent() -> String {
    format!("xkcd_vk_poster/{}", env!("CARGO_PKG_VERSION"))
}

/// Default client used for JSON APIs.
pub(crate) fn client() -> Result<Client> {
    Ok(Client::builder().user_agent(user_agent()).build()?)
}

/// Client that skips TLS certificate verification.
pub(crate) fn insecure_client() -> Result<Client> {
    warn!("TLS certificate verification is disabled for image downloads");
    Ok(Client::builder()
        .user_agent(user_agent())
        .danger_accept_invalid_certs(true)
        .build()?)
}

/// Fail on non-2xx, then decode the body as JSON.
pub(crate) async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T> {
    let response = response.error_for_status()?;
    let text = response.text().await?;
    Ok(serde_json::from_str(&text)?)
}
