//! HTTP transport underneath the sheet client.

use std::future::Future;
use std::time::Duration;

use url::Url;

use crate::error::SheetError;

const USER_AGENT: &str = concat!("hondenschool/", env!("CARGO_PKG_VERSION"));
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Status and body of a completed HTTP exchange.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Performs raw requests. Timeouts, retries and decoding live in the client.
pub trait Transport: Send + Sync {
    fn get(&self, url: &Url) -> impl Future<Output = Result<HttpResponse, SheetError>> + Send;

    fn post(
        &self,
        url: &Url,
        content_type: &str,
        body: String,
    ) -> impl Future<Output = Result<HttpResponse, SheetError>> + Send;
}

pub struct ReqwestTransport {
    http_client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new() -> Result<Self, SheetError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| SheetError::Network(e.to_string()))?;

        Ok(ReqwestTransport { http_client })
    }

    async fn read(response: reqwest::Response) -> Result<HttpResponse, SheetError> {
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| SheetError::Network(e.to_string()))?;
        Ok(HttpResponse { status, body })
    }
}

impl Transport for ReqwestTransport {
    async fn get(&self, url: &Url) -> Result<HttpResponse, SheetError> {
        let response = self
            .http_client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| SheetError::Network(e.to_string()))?;

        Self::read(response).await
    }

    async fn post(
        &self,
        url: &Url,
        content_type: &str,
        body: String,
    ) -> Result<HttpResponse, SheetError> {
        let response = self
            .http_client
            .post(url.clone())
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(body)
            .send()
            .await
            .map_err(|e| SheetError::Network(e.to_string()))?;

        Self::read(response).await
    }
}

#[cfg(test)]
pub(crate) mod fake {
    //! Scripted transport for client and loader tests.

    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    #[derive(Debug, Clone)]
    pub enum Reply {
        Status(u16, &'static str),
        Json(&'static str),
        /// Never completes; the client's timeout has to fire.
        Hang,
        NetworkDown,
    }

    /// Routes requests by URL prefix. Each route replays its replies in
    /// order and repeats the last one forever.
    #[derive(Default)]
    pub struct FakeTransport {
        routes: Mutex<Vec<(String, VecDeque<Reply>)>>,
        calls: Mutex<Vec<String>>,
        posts: Mutex<Vec<(String, String, String)>>,
    }

    impl FakeTransport {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn route(self, prefix: &str, replies: Vec<Reply>) -> Self {
            self.routes
                .lock()
                .unwrap()
                .push((prefix.to_string(), replies.into()));
            self
        }

        pub fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        pub fn calls_to(&self, prefix: &str) -> usize {
            self.calls().iter().filter(|u| u.starts_with(prefix)).count()
        }

        pub fn posts(&self) -> Vec<(String, String, String)> {
            self.posts.lock().unwrap().clone()
        }

        fn next_reply(&self, url: &Url) -> Option<Reply> {
            self.calls.lock().unwrap().push(url.to_string());
            let mut routes = self.routes.lock().unwrap();
            let (_, replies) = routes
                .iter_mut()
                .find(|(prefix, _)| url.as_str().starts_with(prefix.as_str()))?;
            if replies.len() > 1 {
                replies.pop_front()
            } else {
                replies.front().cloned()
            }
        }

        async fn respond(&self, url: &Url) -> Result<HttpResponse, SheetError> {
            let reply = self.next_reply(url);
            match reply {
                Some(Reply::Status(status, body)) => Ok(HttpResponse {
                    status,
                    body: body.to_string(),
                }),
                Some(Reply::Json(body)) => Ok(HttpResponse {
                    status: 200,
                    body: body.to_string(),
                }),
                Some(Reply::Hang) => std::future::pending().await,
                Some(Reply::NetworkDown) | None => {
                    Err(SheetError::Network("connection refused".into()))
                }
            }
        }
    }

    impl Transport for FakeTransport {
        async fn get(&self, url: &Url) -> Result<HttpResponse, SheetError> {
            self.respond(url).await
        }

        async fn post(
            &self,
            url: &Url,
            content_type: &str,
            body: String,
        ) -> Result<HttpResponse, SheetError> {
            self.posts
                .lock()
                .unwrap()
                .push((url.to_string(), content_type.to_string(), body));
            self.respond(url).await
        }
    }
}
