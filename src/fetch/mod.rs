mod api_key;
mod basic;
mod client;
#[cfg(test)]
pub(crate) mod stub;

pub use api_key::ApiKey;
pub use basic::BasicClient;
pub use client::HttpClient;

use reqwest::{StatusCode, Url};
use serde::de::DeserializeOwned;

use crate::observation::FailureReason;

/// Issues a single GET and decodes a JSON body.
///
/// Only `200 OK` counts as an answer; any other status, a transport error or
/// a body that does not match `T` becomes a [`FailureReason`].
pub async fn fetch_json<T, C>(client: &C, url: Url) -> Result<T, FailureReason>
where
    T: DeserializeOwned,
    C: HttpClient + ?Sized,
{
    let req = reqwest::Request::new(reqwest::Method::GET, url);

    let resp = client
        .execute(req)
        .await
        .map_err(|e| FailureReason::Transport(e.to_string()))?;

    let status = resp.status();
    if status != StatusCode::OK {
        return Err(FailureReason::HttpStatus(status.as_u16()));
    }

    let bytes = resp
        .bytes()
        .await
        .map_err(|e| FailureReason::Transport(e.to_string()))?;

    serde_json::from_slice(&bytes).map_err(|e| FailureReason::Malformed(e.to_string()))
}
