//! The connection engine.
//!
//! One [`Engine`] per client. It owns the client's single socket slot and
//! drives one exchange at a time through a fixed sequence of steps: parse the
//! URL, create a socket, serialize, connect, send, read the status line and
//! headers, follow redirects, read the body, decode gzip. The first step that
//! fails decides the [`ErrorKind`] of the response and nothing after it runs.
//!
//! Redirects are followed in a loop rather than by re-entering `execute`. The
//! socket of the hop in flight is owned by that hop; the slot only parks it
//! between exchanges, so a callback running on the same thread can start a
//! nested exchange.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use http::Method;
use parking_lot::{Mutex, ReentrantMutex, ReentrantMutexGuard, RwLock};
use tracing::{debug, trace, warn};

use crate::cancel::CancellationToken;
use crate::client::parser::{self, Framing};
use crate::client::utils::{is_gzip_encoded, is_redirect};
use crate::codec::ContentCodec;
use crate::error::{CodecError, ErrorKind};
use crate::net::{parse_url, resolve_location, Socket, SocketFactory, TlsOptions, UrlParts};
use crate::protocol::constants::headers;
use crate::protocol::{serialize_request, Headers, RequestLine};
use crate::types::{HttpRequest, HttpResponse};

/// A failed engine step: the kind to report plus a diagnostic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Failure {
    pub(crate) kind: ErrorKind,
    pub(crate) message: String,
}

impl Failure {
    pub(crate) fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Failure {
            kind,
            message: message.into(),
        }
    }
}

/// Client-wide settings the engine reads at the start of every exchange.
#[derive(Debug, Clone)]
pub(crate) struct Settings {
    pub(crate) tls: TlsOptions,
    pub(crate) force_body: bool,
    pub(crate) user_agent: String,
}

/// How a single hop ended.
enum Step {
    Done(Bytes),
    Redirect(String),
}

/// What one hop has obtained so far. Survives failures so the response can
/// report the status and headers read before the failing step.
#[derive(Debug, Default)]
struct Exchange {
    status: u16,
    headers: Headers,
    upload_size: u64,
    download_size: u64,
}

impl Exchange {
    fn finish(self, outcome: Result<Bytes, Failure>, request: &HttpRequest) -> HttpResponse {
        match outcome {
            Ok(payload) => {
                debug!(status = self.status, bytes = payload.len(), "exchange complete");
                HttpResponse::new(
                    self.status,
                    ErrorKind::Ok,
                    self.headers,
                    payload,
                    String::new(),
                    self.upload_size,
                    self.download_size,
                )
            }
            Err(failure) => {
                debug!(kind = %failure.kind, message = %failure.message, "exchange failed");
                request.log(&format!("{}: {}", failure.kind, failure.message));
                HttpResponse::new(
                    self.status,
                    failure.kind,
                    self.headers,
                    Bytes::new(),
                    failure.message,
                    self.upload_size,
                    self.download_size,
                )
            }
        }
    }
}

pub(crate) struct Engine {
    exclusive: ReentrantMutex<()>,
    slot: Mutex<Option<Box<dyn Socket>>>,
    factory: Arc<dyn SocketFactory>,
    codec: Arc<dyn ContentCodec>,
    settings: RwLock<Settings>,
    stop: Arc<AtomicBool>,
}

impl Engine {
    pub(crate) fn new(
        settings: Settings,
        factory: Arc<dyn SocketFactory>,
        codec: Arc<dyn ContentCodec>,
    ) -> Self {
        Engine {
            exclusive: ReentrantMutex::new(()),
            slot: Mutex::new(None),
            factory,
            codec,
            settings: RwLock::new(settings),
            stop: Arc::new(AtomicBool::new(false)),
        }
    }

    pub(crate) fn codec(&self) -> &Arc<dyn ContentCodec> {
        &self.codec
    }

    pub(crate) fn settings(&self) -> Settings {
        self.settings.read().clone()
    }

    pub(crate) fn update_settings(&self, update: impl FnOnce(&mut Settings)) {
        update(&mut self.settings.write());
    }

    /// Hold this while running an exchange and anything that must not overlap
    /// with one. Re-entrant on the holding thread.
    pub(crate) fn exclusive(&self) -> ReentrantMutexGuard<'_, ()> {
        self.exclusive.lock()
    }

    /// Raise the stop flag: every blocking call in flight gives up at its next
    /// check point.
    pub(crate) fn stop(&self) {
        self.stop.store(true, Ordering::Release);
    }

    pub(crate) fn is_stopped(&self) -> bool {
        self.stop.load(Ordering::Acquire)
    }

    /// Run `request` to completion, following redirects.
    pub(crate) fn execute(&self, request: &HttpRequest) -> HttpResponse {
        let _exclusive = self.exclusive();
        let settings = self.settings();

        let mut url = request.url.clone();
        let mut redirects = 0;
        loop {
            let mut exchange = Exchange::default();
            match self.hop(&settings, &url, redirects, request, &mut exchange) {
                Ok(Step::Redirect(next)) => {
                    debug!(status = exchange.status, from = %url, to = %next, "following redirect");
                    request.log(&format!("redirect {} -> {}", exchange.status, next));
                    url = next;
                    redirects += 1;
                }
                Ok(Step::Done(payload)) => return exchange.finish(Ok(payload), request),
                Err(failure) => return exchange.finish(Err(failure), request),
            }
        }
    }

    /// Close the current socket, if any.
    pub(crate) fn close(&self) {
        if let Some(mut socket) = self.slot.lock().take() {
            socket.close();
        }
    }

    /// Park `socket` in the slot, closing whatever it replaces.
    fn park(&self, socket: Box<dyn Socket>) {
        let replaced = self.slot.lock().replace(socket);
        if let Some(mut previous) = replaced {
            previous.close();
        }
    }

    fn hop(
        &self,
        settings: &Settings,
        url: &str,
        redirects: u32,
        request: &HttpRequest,
        exchange: &mut Exchange,
    ) -> Result<Step, Failure> {
        let parts = parse_url(url).ok_or_else(|| {
            Failure::new(ErrorKind::UrlMalformed, format!("malformed url {:?}", url))
        })?;

        self.close();
        let mut socket = self
            .factory
            .create(parts.is_tls(), None, &settings.tls)
            .map_err(|e| {
                Failure::new(
                    ErrorKind::CannotCreateSocket,
                    format!("cannot create socket: {}", e),
                )
            })?;
        let outcome = self.converse(socket.as_mut(), &parts, settings, request, exchange);
        self.park(socket);

        match outcome? {
            Step::Redirect(location) => {
                if redirects >= request.max_redirects {
                    return Err(Failure::new(
                        ErrorKind::TooManyRedirects,
                        format!("more than {} redirects", request.max_redirects),
                    ));
                }
                let next = resolve_location(url, &location).unwrap_or(location);
                Ok(Step::Redirect(next))
            }
            done => Ok(done),
        }
    }

    /// Connect, send, and read the response over `socket`. A redirect is
    /// returned with its raw `Location`.
    fn converse(
        &self,
        socket: &mut dyn Socket,
        parts: &UrlParts,
        settings: &Settings,
        request: &HttpRequest,
        exchange: &mut Exchange,
    ) -> Result<Step, Failure> {
        let host = parts.host_header();
        let wire = serialize_request(
            request,
            RequestLine {
                target: &parts.path,
                host: &host,
                user_agent: &settings.user_agent,
                force_body: settings.force_body,
                gzip_supported: self.codec.is_supported(),
            },
        );

        let connect_token =
            CancellationToken::with_timeout(request.connect_timeout, self.stop.clone());
        debug!(host = %parts.host, port = parts.port, tls = parts.is_tls(), "connecting");
        request.log(&format!("connecting to {}:{}", parts.host, parts.port));
        socket
            .connect(&parts.host, parts.port, &connect_token)
            .map_err(|e| {
                Failure::new(
                    ErrorKind::CannotConnect,
                    format!("cannot connect to {}:{}: {}", parts.host, parts.port, e),
                )
            })?;

        let token = CancellationToken::with_timeout(request.transfer_timeout, self.stop.clone());
        socket.write_all(&wire, &token).map_err(|e| {
            Failure::new(ErrorKind::SendError, format!("cannot send request: {}", e))
        })?;
        exchange.upload_size = wire.len() as u64;
        trace!(bytes = wire.len(), method = %request.method, target = %parts.path, "request sent");
        request.log(&format!("> {} {} ({} bytes)", request.method, parts.path, wire.len()));

        exchange.status = parser::read_status(socket, &token)?;
        request.log(&format!("< {}", exchange.status));
        parser::read_headers(socket, &token, &mut exchange.headers)?;

        if request.follow_redirects && is_redirect(exchange.status) {
            let location = exchange
                .headers
                .get(headers::LOCATION)
                .ok_or_else(|| {
                    Failure::new(
                        ErrorKind::MissingLocation,
                        format!("redirect {} without Location header", exchange.status),
                    )
                })?
                .to_string();
            return Ok(Step::Redirect(location));
        }

        if request.method == Method::HEAD {
            return Ok(Step::Done(Bytes::new()));
        }

        let progress = request.on_progress.as_ref();
        let framing = parser::select_framing(exchange.status, &exchange.headers)?;
        trace!(?framing, "reading body");
        let payload = match framing {
            Framing::Fixed(length) => parser::read_fixed(socket, length, progress, &token)?,
            Framing::Chunked => parser::read_chunked(socket, progress, &token)?,
            Framing::Empty => Bytes::new(),
        };
        exchange.download_size = payload.len() as u64;

        if !is_gzip_encoded(&exchange.headers) {
            return Ok(Step::Done(payload));
        }

        self.decode(&payload).map(Step::Done)
    }

    fn decode(&self, payload: &[u8]) -> Result<Bytes, Failure> {
        if !self.codec.is_supported() {
            return Err(Failure::new(ErrorKind::Gzip, CodecError::Unsupported.to_string()));
        }
        match self.codec.decompress(payload) {
            Ok(decoded) => {
                trace!(
                    codec = self.codec.name(),
                    from = payload.len(),
                    to = decoded.len(),
                    "decoded gzip body"
                );
                Ok(Bytes::from(decoded))
            }
            Err(e) => {
                warn!(codec = self.codec.name(), error = %e, "gzip decoding failed");
                Err(Failure::new(ErrorKind::Gzip, format!("cannot decode body: {}", e)))
            }
        }
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        if let Some(mut socket) = self.slot.get_mut().take() {
            socket.close();
        }
    }
}
