//! The public HTTP client.
//!
//! # Examples
//!
//! ## Synchronous GET
//!
//! ```no_run
//! use strand_http::HttpClient;
//!
//! let client = HttpClient::synchronous();
//! let response = client.get("http://example.com/");
//! if response.is_ok() {
//!     println!("{} ({} bytes)", response.status(), response.payload().len());
//! } else {
//!     eprintln!("{}: {}", response.error(), response.description());
//! }
//! ```
//!
//! ## Form POST with options
//!
//! ```no_run
//! use std::time::Duration;
//! use strand_http::{HttpClient, HttpRequest};
//!
//! let client = HttpClient::synchronous();
//! let options = HttpRequest::get("http://example.com/login")
//!     .with_transfer_timeout(Duration::from_secs(10))
//!     .with_header("X-Client", "demo");
//! let no_files: &[(&str, &[u8])] = &[];
//! let response = client.post_form(&options, &[("user", "ada"), ("pass", "secret")], no_files);
//! println!("{}", response.status());
//! ```
//!
//! ## Queued requests
//!
//! ```no_run
//! use strand_http::{ClientConfig, HttpClient, HttpRequest};
//!
//! let client = HttpClient::new(ClientConfig::asynchronous()).unwrap();
//! client
//!     .submit(HttpRequest::get("http://example.com/"), |response| {
//!         println!("done: {}", response.status());
//!     })
//!     .unwrap();
//! ```

use std::sync::Arc;

use bytes::Bytes;
use http::Method;
use tokio::sync::oneshot;
use tracing::{debug, warn};

use crate::client::config::ClientConfig;
use crate::client::connection::{Engine, Settings};
use crate::client::dispatcher::Dispatcher;
use crate::codec::{default_codec, ContentCodec};
use crate::error::{HttpError, Result};
use crate::net::{DefaultSocketFactory, SocketFactory, TlsOptions};
use crate::protocol::{generate_multipart_boundary, serialize_multipart, serialize_params};
use crate::types::{HttpRequest, HttpResponse};

/// An HTTP/1.1 client owning one connection.
///
/// Exchanges on one client never overlap: concurrent calls from several threads
/// are serialized, and in asynchronous mode queued requests run one at a time
/// on a single worker thread.
///
/// Failed exchanges are not `Err`s. Every call returns an [`HttpResponse`] whose
/// [`error`](HttpResponse::error) says how far the exchange got.
pub struct HttpClient {
    engine: Arc<Engine>,
    dispatcher: Option<Dispatcher>,
}

impl HttpClient {
    /// Create a client. In asynchronous mode this starts the worker thread.
    pub fn new(config: ClientConfig) -> Result<Self> {
        Self::with_collaborators(config, Arc::new(DefaultSocketFactory), default_codec())
    }

    /// Create a synchronous client with default settings.
    pub fn synchronous() -> Self {
        HttpClient {
            engine: Arc::new(Engine::new(
                settings_from(&ClientConfig::synchronous()),
                Arc::new(DefaultSocketFactory),
                default_codec(),
            )),
            dispatcher: None,
        }
    }

    /// Create a client with a custom socket factory and content codec.
    pub fn with_collaborators(
        config: ClientConfig,
        factory: Arc<dyn SocketFactory>,
        codec: Arc<dyn ContentCodec>,
    ) -> Result<Self> {
        let engine = Arc::new(Engine::new(settings_from(&config), factory, codec));
        let dispatcher = if config.async_mode {
            Some(Dispatcher::start(engine.clone())?)
        } else {
            None
        };
        debug!(async_mode = config.async_mode, "client created");
        Ok(HttpClient { engine, dispatcher })
    }

    /// Whether the client was created in asynchronous mode.
    pub fn is_async(&self) -> bool {
        self.dispatcher.is_some()
    }

    /// Current TLS settings.
    pub fn tls_options(&self) -> TlsOptions {
        self.engine.settings().tls
    }

    /// Replace the TLS settings used by subsequent exchanges.
    pub fn set_tls_options(&self, tls: TlsOptions) {
        self.engine.update_settings(|settings| settings.tls = tls);
    }

    /// Whether every verb sends body headers and the body.
    pub fn force_body(&self) -> bool {
        self.engine.settings().force_body
    }

    /// Send body headers and the body for every verb, not only POST/PUT/PATCH.
    pub fn set_force_body(&self, force_body: bool) {
        self.engine.update_settings(|settings| settings.force_body = force_body);
    }

    /// The content codec used for gzip.
    pub fn codec(&self) -> &Arc<dyn ContentCodec> {
        self.engine.codec()
    }

    /// A request with default settings.
    pub fn create_request(&self, url: impl Into<String>, method: Method) -> HttpRequest {
        HttpRequest::new(url, method)
    }

    /// Run one exchange for `url` with `method` and `body`, taking every other
    /// setting from `options`.
    pub fn execute(
        &self,
        url: &str,
        method: Method,
        body: impl Into<Bytes>,
        options: &HttpRequest,
    ) -> HttpResponse {
        let mut request = options.clone();
        request.url = url.to_string();
        request.method = method;
        request.body = body.into();
        self.engine.execute(&request)
    }

    /// Run `request` as-is.
    pub fn request(&self, request: &HttpRequest) -> HttpResponse {
        self.engine.execute(request)
    }

    /// `GET url` with default settings.
    pub fn get(&self, url: &str) -> HttpResponse {
        self.request(&HttpRequest::get(url))
    }

    /// `HEAD url` with default settings.
    pub fn head(&self, url: &str) -> HttpResponse {
        self.request(&HttpRequest::head(url))
    }

    /// `DELETE url` with default settings.
    pub fn delete(&self, url: &str) -> HttpResponse {
        self.request(&HttpRequest::delete(url))
    }

    /// `POST url` with a raw body, sent verbatim.
    pub fn post(&self, url: &str, body: impl Into<Bytes>) -> HttpResponse {
        self.request(&HttpRequest::post(url, body))
    }

    /// `PUT url` with a raw body, sent verbatim.
    pub fn put(&self, url: &str, body: impl Into<Bytes>) -> HttpResponse {
        self.request(&HttpRequest::put(url, body))
    }

    /// `PATCH url` with a raw body, sent verbatim.
    pub fn patch(&self, url: &str, body: impl Into<Bytes>) -> HttpResponse {
        self.request(&HttpRequest::patch(url, body))
    }

    /// `POST` a form to `options.url`.
    ///
    /// Without `form_data` the body is `params` URL-encoded. Otherwise the body
    /// is `multipart/form-data` with a fresh boundary: `form_data` entries become
    /// file parts and `params` plain fields. The body is gzip-compressed when
    /// `options.compress_request` is set and gzip is available.
    pub fn post_form<K, V, FK, FV>(
        &self,
        options: &HttpRequest,
        params: &[(K, V)],
        form_data: &[(FK, FV)],
    ) -> HttpResponse
    where
        K: AsRef<str>,
        V: AsRef<[u8]>,
        FK: AsRef<str>,
        FV: AsRef<[u8]>,
    {
        self.request(&self.form_request(options, Method::POST, params, form_data))
    }

    /// `PUT` a form to `options.url`. See [`post_form`](Self::post_form).
    pub fn put_form<K, V, FK, FV>(
        &self,
        options: &HttpRequest,
        params: &[(K, V)],
        form_data: &[(FK, FV)],
    ) -> HttpResponse
    where
        K: AsRef<str>,
        V: AsRef<[u8]>,
        FK: AsRef<str>,
        FV: AsRef<[u8]>,
    {
        self.request(&self.form_request(options, Method::PUT, params, form_data))
    }

    /// `PATCH` a form to `options.url`. See [`post_form`](Self::post_form).
    pub fn patch_form<K, V, FK, FV>(
        &self,
        options: &HttpRequest,
        params: &[(K, V)],
        form_data: &[(FK, FV)],
    ) -> HttpResponse
    where
        K: AsRef<str>,
        V: AsRef<[u8]>,
        FK: AsRef<str>,
        FV: AsRef<[u8]>,
    {
        self.request(&self.form_request(options, Method::PATCH, params, form_data))
    }

    /// Queue `request`; `callback` receives the response on the worker thread.
    ///
    /// Fails with [`HttpError::NotAsync`] on a synchronous client, without
    /// queuing anything.
    pub fn submit<F>(&self, request: HttpRequest, callback: F) -> Result<()>
    where
        F: FnOnce(HttpResponse) + Send + 'static,
    {
        let dispatcher = self.dispatcher.as_ref().ok_or(HttpError::NotAsync)?;
        if self.engine.is_stopped() {
            return Err(HttpError::ShuttingDown);
        }
        dispatcher.submit(request, Box::new(callback))
    }

    /// Queue `request` and get its response through a future.
    ///
    /// Dropping the receiver does not cancel the request.
    ///
    /// ```no_run
    /// # async fn demo() -> strand_http::Result<()> {
    /// use strand_http::{ClientConfig, HttpClient, HttpRequest};
    ///
    /// let client = HttpClient::new(ClientConfig::asynchronous())?;
    /// let response = client
    ///     .submit_async(HttpRequest::get("http://example.com/"))?
    ///     .await
    ///     .expect("worker dropped the request");
    /// println!("{}", response.status());
    /// # Ok(())
    /// # }
    /// ```
    pub fn submit_async(&self, request: HttpRequest) -> Result<oneshot::Receiver<HttpResponse>> {
        let (tx, rx) = oneshot::channel();
        self.submit(request, move |response| {
            let _ = tx.send(response);
        })?;
        Ok(rx)
    }

    /// Requests queued but not yet started.
    pub fn pending(&self) -> usize {
        self.dispatcher.as_ref().map_or(0, Dispatcher::pending)
    }

    /// Stop the client: cancel the exchange in flight, drop queued requests,
    /// and join the worker. Later calls fail fast.
    pub fn shutdown(&mut self) {
        if let Some(dispatcher) = self.dispatcher.as_ref() {
            dispatcher.close();
        }
        self.engine.stop();
        if let Some(dispatcher) = self.dispatcher.as_mut() {
            dispatcher.shutdown();
        }
        self.engine.close();
    }

    fn form_request<K, V, FK, FV>(
        &self,
        options: &HttpRequest,
        method: Method,
        params: &[(K, V)],
        form_data: &[(FK, FV)],
    ) -> HttpRequest
    where
        K: AsRef<str>,
        V: AsRef<[u8]>,
        FK: AsRef<str>,
        FV: AsRef<[u8]>,
    {
        let mut request = options.clone();
        request.method = method;

        let fields = params.iter().map(|(k, v)| (k.as_ref(), v.as_ref()));
        let body = if form_data.is_empty() {
            request.multipart_boundary = None;
            serialize_params(fields.map(|(k, v)| (k.as_bytes(), v))).into_bytes()
        } else {
            let boundary = generate_multipart_boundary();
            let files = form_data.iter().map(|(k, v)| (k.as_ref(), v.as_ref()));
            let body = serialize_multipart(&boundary, files, fields);
            request.multipart_boundary = Some(boundary);
            body
        };

        request.body = if request.compress_request && self.codec().is_supported() {
            let packed = self.codec().compress(&body);
            if packed.is_empty() {
                warn!("request compression failed, sending body uncompressed");
                request.compress_request = false;
                Bytes::from(body)
            } else {
                Bytes::from(packed)
            }
        } else {
            Bytes::from(body)
        };
        request
    }
}

impl Default for HttpClient {
    fn default() -> Self {
        Self::synchronous()
    }
}

impl Drop for HttpClient {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn settings_from(config: &ClientConfig) -> Settings {
    Settings {
        tls: config.tls.clone(),
        force_body: config.force_body,
        user_agent: config.effective_user_agent(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::testing::{Script, ScriptedFactory};
    use crate::codec::UnsupportedGzip;
    use crate::error::ErrorKind;

    fn client(scripts: Vec<Script>) -> (HttpClient, Arc<ScriptedFactory>) {
        let factory = ScriptedFactory::new(scripts);
        let client = HttpClient::with_collaborators(
            ClientConfig::default(),
            factory.clone(),
            default_codec(),
        )
        .unwrap();
        (client, factory)
    }

    const OK: &str = "HTTP/1.1 200 OK\r\nContent-Length: 2\r\n\r\nok";

    #[test]
    fn test_client_creation() {
        let client = HttpClient::synchronous();
        assert!(!client.is_async());
        assert!(!client.force_body());
        assert_eq!(client.pending(), 0);
    }

    #[test]
    fn test_submit_requires_async_mode() {
        let (client, factory) = client(vec![]);
        let result = client.submit(HttpRequest::get("http://h.test/"), |_| {});
        assert!(matches!(result, Err(HttpError::NotAsync)));
        assert_eq!(factory.created(), 0);
    }

    #[test]
    fn test_execute_overrides_url_method_and_body() {
        let (client, factory) = client(vec![Script::reply(OK)]);
        let options = HttpRequest::get("http://ignored.test/").with_header("X-Extra", "1");
        let response = client.execute("http://h.test/put", Method::PUT, "data", &options);
        assert_eq!(response.status(), 200);

        let sent = factory.transcripts()[0].request_text();
        assert!(sent.starts_with("PUT /put HTTP/1.1\r\nHost: h.test\r\n"));
        assert!(sent.contains("X-Extra: 1\r\n"));
        assert!(sent.ends_with("\r\n\r\ndata"));
    }

    #[test]
    fn test_post_form_urlencoded() {
        let (client, factory) = client(vec![Script::reply(OK)]);
        let no_files: &[(&str, &str)] = &[];
        let options = HttpRequest::get("http://h.test/form");
        let response = client.post_form(&options, &[("a", "1 2"), ("b", "&")], no_files);
        assert!(response.is_ok());

        let sent = factory.transcripts()[0].request_text();
        assert!(sent.starts_with("POST /form HTTP/1.1\r\n"));
        assert!(sent.contains("Content-Type: application/x-www-form-urlencoded\r\n"));
        assert!(sent.contains("Content-Length: 13\r\n"));
        assert!(sent.ends_with("\r\n\r\na=1%202&b=%26"));
    }

    #[test]
    fn test_put_form_multipart() {
        let (client, factory) = client(vec![Script::reply(OK)]);
        let options = HttpRequest::get("http://h.test/upload");
        let response = client.put_form(&options, &[("name", "x")], &[("file", b"\x00\x01")]);
        assert!(response.is_ok());

        let sent = factory.transcripts()[0].request_text();
        let boundary = sent
            .split("multipart/form-data; boundary=")
            .nth(1)
            .and_then(|rest| rest.split("\r\n").next())
            .unwrap()
            .to_string();
        assert_eq!(boundary.len(), 62);
        assert!(sent.starts_with("PUT /upload HTTP/1.1\r\n"));
        assert!(sent.contains("filename=\"file\""));
        assert!(sent.ends_with(&format!("--{}--\r\n", boundary)));
    }

    #[cfg(any(feature = "gzip", feature = "gzip-sized"))]
    #[test]
    fn test_patch_form_compressed() {
        let (client, factory) = client(vec![Script::reply(OK)]);
        let options = HttpRequest::get("http://h.test/p").with_compress_request(true);
        let no_files: &[(&str, &str)] = &[];
        client.patch_form(&options, &[("k", "v")], no_files);

        let transcript = &factory.transcripts()[0];
        let sent = transcript.request_text();
        assert!(sent.contains("Content-Encoding: gzip\r\n"));
        let split = transcript
            .sent
            .windows(4)
            .position(|w| w == b"\r\n\r\n")
            .unwrap();
        let body = &transcript.sent[split + 4..];
        assert_eq!(client.codec().decompress(body).unwrap(), b"k=v");
    }

    #[test]
    fn test_unsupported_codec_sends_plain_form() {
        let factory = ScriptedFactory::new(vec![Script::reply(OK)]);
        let client = HttpClient::with_collaborators(
            ClientConfig::default(),
            factory.clone(),
            Arc::new(UnsupportedGzip),
        )
        .unwrap();
        let options = HttpRequest::get("http://h.test/p").with_compress_request(true);
        let no_files: &[(&str, &str)] = &[];
        client.post_form(&options, &[("k", "v")], no_files);

        let sent = factory.transcripts()[0].request_text();
        assert!(!sent.contains("Content-Encoding"));
        assert!(!sent.contains("Accept-Encoding"));
        assert!(sent.ends_with("\r\n\r\nk=v"));
    }

    #[test]
    fn test_force_body_setter() {
        let (client, factory) = client(vec![Script::reply(OK)]);
        client.set_force_body(true);
        client.request(&HttpRequest::get("http://h.test/").with_body("q"));

        let sent = factory.transcripts()[0].request_text();
        assert!(sent.contains("Content-Length: 1\r\n"));
        assert!(sent.ends_with("\r\n\r\nq"));
    }

    #[test]
    fn test_tls_setter_and_scheme() {
        let (client, factory) = client(vec![Script::reply(OK)]);
        let tls = TlsOptions {
            disable_hostname_validation: true,
            ..Default::default()
        };
        client.set_tls_options(tls.clone());
        assert_eq!(client.tls_options(), tls);

        let response = client.get("https://secure.test/");
        assert_eq!(response.error(), ErrorKind::Ok);
        let transcript = &factory.transcripts()[0];
        assert!(transcript.tls);
        assert_eq!(transcript.port, 443);
    }

    #[test]
    fn test_shutdown_fails_fast() {
        let factory = ScriptedFactory::new(vec![]);
        let mut client = HttpClient::with_collaborators(
            ClientConfig::asynchronous(),
            factory.clone(),
            default_codec(),
        )
        .unwrap();
        client.shutdown();
        assert!(matches!(
            client.submit(HttpRequest::get("http://h.test/"), |_| {}),
            Err(HttpError::ShuttingDown)
        ));
        // The stop flag cancels synchronous calls at their first check point.
        assert_eq!(client.get("http://h.test/").error(), ErrorKind::CannotConnect);
    }
}
