use async_trait::async_trait;
use reqwest::cookie::Jar;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT_LANGUAGE};
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

use crate::config::HttpConfig;
use crate::{Result, TranscriptError};

const YOUTUBE_ORIGIN: &str = "https://www.youtube.com";

/// Raw response handed back by a transport
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Network access used by the caption pipeline.
///
/// Implementations own cookies, headers, proxies and timeouts. Connection-level failures
/// are reported as [`TranscriptError::Transport`]; any HTTP status is a successful
/// round-trip and is returned as-is for the classifier to judge.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Transport: Send + Sync {
    /// Perform a GET request
    async fn get(&self, url: &str) -> Result<HttpResponse>;

    /// Perform a POST request with a JSON body, as the innertube endpoints expect
    async fn post(&self, url: &str, body: &str) -> Result<HttpResponse>;

    /// Remember the consent cookie for all subsequent youtube.com requests
    fn set_consent_cookie(&self, value: &str) -> Result<()>;
}

/// Transport backed by a cookie-keeping reqwest client
pub struct ReqwestTransport {
    client: Client,
    jar: Arc<Jar>,
}

impl ReqwestTransport {
    pub fn new(config: &HttpConfig) -> Result<Self> {
        let jar = Arc::new(Jar::default());

        let mut headers = HeaderMap::new();
        let accept_language = HeaderValue::from_str(&config.accept_language)
            .map_err(|e| TranscriptError::Transport(format!("Invalid Accept-Language: {}", e)))?;
        headers.insert(ACCEPT_LANGUAGE, accept_language);

        let mut builder = Client::builder()
            .cookie_provider(jar.clone())
            .default_headers(headers)
            .user_agent(config.user_agent.clone())
            .timeout(Duration::from_secs(config.timeout_secs));

        if let Some(proxy) = &config.proxy {
            tracing::debug!("Routing requests through proxy {}", proxy);
            builder = builder.proxy(reqwest::Proxy::all(proxy.as_str())?);
        }

        Ok(Self {
            client: builder.build()?,
            jar,
        })
    }

    async fn read(response: reqwest::Response) -> Result<HttpResponse> {
        let status = response.status().as_u16();
        let body = response.text().await?;
        Ok(HttpResponse { status, body })
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn get(&self, url: &str) -> Result<HttpResponse> {
        tracing::debug!("GET {}", url);
        let response = self.client.get(url).send().await?;
        Self::read(response).await
    }

    async fn post(&self, url: &str, body: &str) -> Result<HttpResponse> {
        tracing::debug!("POST {}", url);
        let response = self
            .client
            .post(url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body.to_string())
            .send()
            .await?;
        Self::read(response).await
    }

    fn set_consent_cookie(&self, value: &str) -> Result<()> {
        let origin = Url::parse(YOUTUBE_ORIGIN)
            .map_err(|e| TranscriptError::Transport(e.to_string()))?;
        self.jar.add_cookie_str(
            &format!("CONSENT=YES+{}; Domain=.youtube.com; Path=/", value),
            &origin,
        );
        tracing::debug!("Stored consent cookie");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::cookie::CookieStore;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Answer one request with `reply` and hand back the raw request text
    async fn serve_once(reply: &'static str, until: &'static str) -> (String, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = format!("http://{}", listener.local_addr().unwrap());

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buffer = [0u8; 1024];
            while !String::from_utf8_lossy(&request).contains(until) {
                let read = socket.read(&mut buffer).await.unwrap();
                if read == 0 {
                    break;
                }
                request.extend_from_slice(&buffer[..read]);
            }
            socket.write_all(reply.as_bytes()).await.unwrap();
            socket.shutdown().await.unwrap();
            String::from_utf8_lossy(&request).into_owned()
        });

        (address, handle)
    }

    #[test]
    fn test_response_success_range() {
        assert!(HttpResponse::new(200, "").is_success());
        assert!(HttpResponse::new(204, "").is_success());
        assert!(!HttpResponse::new(302, "").is_success());
        assert!(!HttpResponse::new(429, "").is_success());
    }

    #[test]
    fn test_consent_cookie_is_scoped_to_youtube() {
        let transport = ReqwestTransport::new(&HttpConfig::default()).unwrap();
        transport.set_consent_cookie("cb.20210328-17-p0.de+FX+123").unwrap();

        let url = Url::parse("https://www.youtube.com/watch?v=abc").unwrap();
        let cookies = transport.jar.cookies(&url).unwrap();
        assert!(cookies
            .to_str()
            .unwrap()
            .contains("CONSENT=YES+cb.20210328-17-p0.de+FX+123"));
    }

    #[tokio::test]
    async fn test_post_sends_json_body() {
        let (address, server) = serve_once(
            "HTTP/1.1 200 OK\r\nContent-Length: 2\r\nConnection: close\r\n\r\nok",
            r#"{"videoId":"abc"}"#,
        )
        .await;

        let transport = ReqwestTransport::new(&HttpConfig::default()).unwrap();
        let response = transport
            .post(&format!("{}/youtubei/v1/player", address), r#"{"videoId":"abc"}"#)
            .await
            .unwrap();

        assert_eq!(response, HttpResponse::new(200, "ok"));
        let request = server.await.unwrap().to_ascii_lowercase();
        assert!(request.starts_with("post /youtubei/v1/player "));
        assert!(request.contains("content-type: application/json"));
        assert!(request.contains("accept-language: en-us"));
    }

    #[tokio::test]
    async fn test_get_returns_error_status_as_response() {
        let (address, server) = serve_once(
            "HTTP/1.1 429 Too Many Requests\r\nContent-Length: 4\r\nConnection: close\r\n\r\nslow",
            "\r\n\r\n",
        )
        .await;

        let transport = ReqwestTransport::new(&HttpConfig::default()).unwrap();
        let response = transport.get(&format!("{}/watch?v=abc", address)).await.unwrap();

        assert_eq!(response, HttpResponse::new(429, "slow"));
        assert!(server.await.unwrap().starts_with("GET /watch?v=abc "));
    }

    #[test]
    fn test_invalid_proxy_is_a_transport_error() {
        let config = HttpConfig {
            proxy: Some("not a proxy url".to_string()),
            ..HttpConfig::default()
        };

        assert!(matches!(
            ReqwestTransport::new(&config),
            Err(TranscriptError::Transport(_))
        ));
    }
}
