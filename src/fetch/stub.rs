//! In-process [`HttpClient`] returning canned replies, for adapter tests.

use super::client::HttpClient;
use async_trait::async_trait;
use std::sync::Mutex;

#[derive(Clone)]
pub(crate) enum Reply {
    Json { status: u16, body: String },
    TransportError,
}

impl Reply {
    pub(crate) fn json(status: u16, body: &str) -> Self {
        Reply::Json {
            status,
            body: body.to_string(),
        }
    }
}

/// Routes each request to the first reply whose key is a substring of the URL.
/// Unrouted requests get a 404.
pub(crate) struct StubClient {
    routes: Vec<(String, Reply)>,
    requests: Mutex<Vec<(String, Option<String>)>>,
}

impl StubClient {
    pub(crate) fn new(routes: Vec<(&str, Reply)>) -> Self {
        Self {
            routes: routes.into_iter().map(|(k, r)| (k.to_string(), r)).collect(),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn urls(&self) -> Vec<String> {
        self.requests.lock().unwrap().iter().map(|(u, _)| u.clone()).collect()
    }

    /// `Authorization` header of each request, in order.
    pub(crate) fn headers(&self) -> Vec<Option<String>> {
        self.requests.lock().unwrap().iter().map(|(_, h)| h.clone()).collect()
    }

    fn transport_error() -> reqwest::Error {
        reqwest::Client::new().get("not a url").build().unwrap_err()
    }
}

#[async_trait]
impl HttpClient for StubClient {
    async fn execute(&self, req: reqwest::Request) -> reqwest::Result<reqwest::Response> {
        let url = req.url().to_string();
        let auth = req
            .headers()
            .get(reqwest::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        self.requests.lock().unwrap().push((url.clone(), auth));

        let reply = self
            .routes
            .iter()
            .find(|(key, _)| url.contains(key.as_str()))
            .map(|(_, r)| r.clone())
            .unwrap_or_else(|| Reply::json(404, "{}"));

        match reply {
            Reply::Json { status, body } => {
                let resp = http::Response::builder().status(status).body(body).unwrap();
                Ok(reqwest::Response::from(resp))
            }
            Reply::TransportError => Err(Self::transport_error()),
        }
    }
}
