mod v1;

use crate::{Error, State};

use std::convert::Infallible;
use std::fmt::{self, Display, Formatter};
use std::net::SocketAddr;
use std::pin::Pin;
use std::str::FromStr;
use std::task::{Context, Poll};
use std::time::Duration;

use futures::future::BoxFuture;
use hyper::header::{
    HeaderValue, IntoHeaderName, ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_ORIGIN,
    CONTENT_LENGTH, CONTENT_TYPE,
};
use hyper::http::request::Parts;
use hyper::server::conn::Http;
use hyper::service::Service;
use hyper::{Body, HeaderMap, Method, StatusCode, Uri};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::net::TcpSocket;
use tokio::time::Instant;

pub type Result = std::result::Result<Response, Error>;

/// The maximum accepted request body size in bytes.
const MAX_BODY_SIZE: u64 = 256 * 1024;

pub async fn bind(state: State) -> std::result::Result<(), Error> {
    let addr = state.config.bind;
    let mut shutdown_rx = state.shutdown_rx.clone();

    let service = RootService { state };

    let socket = match addr {
        SocketAddr::V4(_) => TcpSocket::new_v4()?,
        SocketAddr::V6(_) => TcpSocket::new_v6()?,
    };
    if let Err(err) = socket.set_reuseaddr(true) {
        log::warn!("Failed to set SO_REUSEADDR flag: {}", err);
    }

    socket.bind(addr)?;
    let listener = socket.listen(1024)?;
    log::info!("Listening on {}", addr);

    loop {
        tokio::select! {
            res = listener.accept() => {
                let (stream, addr) = match res {
                    Ok((stream, addr)) => (stream, addr),
                    Err(err) => {
                        log::warn!("Failed to accept connection: {:?}", err);
                        continue;
                    }
                };
                log::debug!("Accepting new connection from {:?}", addr);

                let service = service.clone();
                let mut shutdown_rx = shutdown_rx.clone();
                tokio::task::spawn(async move {
                    let mut conn = Http::new()
                        .http1_keep_alive(true)
                        .serve_connection(stream, service);

                    let mut conn = Pin::new(&mut conn);

                    tokio::select! {
                        res = &mut conn => {
                            if let Err(err) = res {
                                log::warn!("Http error: {:?}", err);
                            }
                        }
                        _ = shutdown_rx.changed() => {
                            log::debug!("Shutting down connection");
                            conn.as_mut().graceful_shutdown();
                            if let Err(err) = conn.await {
                                log::warn!("Http error: {:?}", err);
                            }
                        }
                    }
                });
            }
            // Shut down the server.
            _ = shutdown_rx.changed() => {
                log::debug!("Shutting down http server");
                return Ok(());
            }
        }
    }
}

#[derive(Clone, Debug)]
struct RootService {
    state: State,
}

impl Service<hyper::Request<Body>> for RootService {
    type Response = hyper::Response<Body>;
    type Error = Infallible;
    type Future = BoxFuture<'static, std::result::Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, _cx: &mut Context) -> Poll<std::result::Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    #[inline]
    fn call(&mut self, req: hyper::Request<Body>) -> Self::Future {
        Box::pin(service_root(req, self.state.clone()))
    }
}

async fn service_root(
    req: hyper::Request<Body>,
    state: State,
) -> std::result::Result<hyper::Response<Body>, Infallible> {
    log::trace!("Received Request:");
    log::trace!("Head: {} {}", req.method(), req.uri());
    log::trace!("Headers: {:?}", req.headers());

    let req = Request::new(req, state);

    let origin = req.headers().get("Origin").cloned();

    let res = if matches!(*req.method(), Method::POST | Method::PUT) {
        match req.content_length() {
            Ok(length) if length > MAX_BODY_SIZE => Err(StatusCodeError::payload_too_large()
                .message(format!("Request body exceeds {} bytes", MAX_BODY_SIZE))
                .into()),
            Ok(_) => route(req).await,
            Err(err) => Err(err),
        }
    } else {
        route(req).await
    };

    let resp = match res {
        Ok(resp) => resp,
        Err(err) => {
            let code = err.status_code();
            if code.is_server_error() {
                log::error!("Failed to serve request: {}", err);
            } else {
                log::debug!("Request failed: {}", err);
            }

            let message = match code {
                StatusCode::INTERNAL_SERVER_ERROR => "Internal Server Error".to_owned(),
                _ => err.to_string(),
            };

            Response::ok().status(code).json(&ErrorResponse {
                code: code.as_u16(),
                message,
            })
        }
    };

    let mut resp = resp.header(
        ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("content-type"),
    );
    if let Some(origin) = origin {
        resp = resp.header(ACCESS_CONTROL_ALLOW_ORIGIN, origin);
    }

    Ok(resp.build())
}

async fn route(req: Request) -> Result {
    let path = req.uri().path().to_owned();
    let mut uri = RequestUri::new(&path);

    match uri.take_str() {
        Some("v1") => v1::route(req, uri).await,
        _ => Err(StatusCodeError::not_found().into()),
    }
}

impl Error {
    /// Returns the http status code used to respond with this error.
    pub fn status_code(&self) -> StatusCode {
        use knockout_core::Error as BracketError;

        match self {
            Self::Bracket(err) => match err {
                BracketError::InsufficientParticipants { .. }
                | BracketError::TooManyParticipants { .. }
                | BracketError::DuplicateParticipantId(_)
                | BracketError::DegenerateMatch(_)
                | BracketError::InvalidWinner { .. }
                | BracketError::InvalidNumberOfMatches { .. }
                | BracketError::InvalidMatch(_) => StatusCode::BAD_REQUEST,
                BracketError::MatchNotFound(_) => StatusCode::NOT_FOUND,
                BracketError::MatchAlreadyDecided { .. } => StatusCode::CONFLICT,
            },
            Self::TournamentNotFound(_) => StatusCode::NOT_FOUND,
            Self::BracketExists(_) | Self::ConcurrentModification { .. } => StatusCode::CONFLICT,
            Self::StatusCodeError(err) => err.code,
            Self::Io(_) | Self::Json(_) | Self::Hyper(_) | Self::Reqwest(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

#[derive(Debug)]
pub struct Request {
    pub parts: Parts,
    pub body: Option<Body>,
    state: State,
}

impl Request {
    #[inline]
    fn new(req: hyper::Request<Body>, state: State) -> Self {
        let (parts, body) = req.into_parts();

        Self {
            parts,
            body: Some(body),
            state,
        }
    }

    #[inline]
    pub fn state(&self) -> &State {
        &self.state
    }

    #[inline]
    pub fn method(&self) -> &Method {
        &self.parts.method
    }

    #[inline]
    pub fn headers(&self) -> &HeaderMap<HeaderValue> {
        &self.parts.headers
    }

    #[inline]
    pub fn uri(&self) -> &Uri {
        &self.parts.uri
    }

    /// Returns the value of the query parameter `key`.
    pub fn query(&self, key: &str) -> Option<&str> {
        self.uri().query()?.split('&').find_map(|pair| {
            let (k, v) = pair.split_once('=').unwrap_or((pair, ""));
            (k == key).then_some(v)
        })
    }

    pub async fn json<T>(&mut self) -> std::result::Result<T, Error>
    where
        T: DeserializeOwned,
    {
        const DUR: Duration = Duration::new(30, 0);

        let deadline = Instant::now() + DUR;

        let body = match self.body.take() {
            Some(body) => body,
            None => return Err(StatusCodeError::bad_request().into()),
        };

        let bytes = tokio::select! {
            res = hyper::body::to_bytes(body) => {
                res?
            }
            _ = tokio::time::sleep_until(deadline) => {
                log::info!("Client failed to transmit body in {}s, dropping connection", DUR.as_secs());
                return Err(StatusCodeError::request_timeout().into());
            }
        };

        match serde_json::from_slice(&bytes) {
            Ok(value) => Ok(value),
            Err(err) => Err(StatusCodeError::bad_request().message(err).into()),
        }
    }

    /// Returns the value of the "Content-Length" header. If the header is not present or has an
    /// invalid value an error is returned.
    pub fn content_length(&self) -> std::result::Result<u64, Error> {
        match self.headers().get(CONTENT_LENGTH) {
            Some(value) => match value.to_str().ok().and_then(|value| value.parse().ok()) {
                Some(value) => Ok(value),
                None => {
                    log::debug!("Failed to parse \"Content-Length\" header: {:?}", value);

                    Err(StatusCodeError::bad_request().into())
                }
            },
            None => Err(StatusCodeError::length_required().into()),
        }
    }
}

#[derive(Copy, Clone, Debug)]
pub struct RequestUri<'a> {
    path: &'a str,
}

impl<'a> RequestUri<'a> {
    pub fn new(mut path: &'a str) -> Self {
        if path.starts_with('/') {
            path = &path[1..];
        }

        Self { path }
    }

    pub fn take(&mut self) -> Option<UriPart<'a>> {
        let part = self.take_str()?;

        Some(UriPart { part })
    }

    pub fn take_str(&mut self) -> Option<&'a str> {
        if self.path.is_empty() {
            None
        } else {
            Some(match self.path.split_once('/') {
                Some((part, rem)) => {
                    self.path = rem;
                    part
                }
                None => {
                    let path = self.path;
                    self.path = "";
                    path
                }
            })
        }
    }

    /// Returns `true` if all segments of the path were consumed.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.path.is_empty()
    }
}

#[derive(Copy, Clone, Debug)]
pub struct UriPart<'a> {
    part: &'a str,
}

impl<'a> UriPart<'a> {
    pub fn parse<T>(&self) -> std::result::Result<T, Error>
    where
        T: FromStr,
    {
        match self.part.parse() {
            Ok(v) => Ok(v),
            Err(_) => Err(StatusCodeError::bad_request()
                .message(format!("Invalid path segment: {:?}", self.part))
                .into()),
        }
    }
}

impl<'a> AsRef<str> for UriPart<'a> {
    fn as_ref(&self) -> &str {
        self.part
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub code: u16,
    pub message: String,
}

/// An error that directly maps to a http status code.
#[derive(Clone, Debug)]
pub struct StatusCodeError {
    pub code: StatusCode,
    pub message: String,
}

impl StatusCodeError {
    pub fn new<T>(code: StatusCode, message: T) -> Self
    where
        T: ToString,
    {
        Self {
            code,
            message: message.to_string(),
        }
    }

    fn from_code(code: StatusCode) -> Self {
        Self::new(code, code.canonical_reason().unwrap_or_default())
    }

    /// 400 Bad Request
    pub fn bad_request() -> Self {
        Self::from_code(StatusCode::BAD_REQUEST)
    }

    /// 404 Not Found
    pub fn not_found() -> Self {
        Self::from_code(StatusCode::NOT_FOUND)
    }

    /// 405 Method Not Allowed
    pub fn method_not_allowed() -> Self {
        Self::from_code(StatusCode::METHOD_NOT_ALLOWED)
    }

    /// 408 Request Timeout
    pub fn request_timeout() -> Self {
        Self::from_code(StatusCode::REQUEST_TIMEOUT)
    }

    /// 411 Length Required
    pub fn length_required() -> Self {
        Self::from_code(StatusCode::LENGTH_REQUIRED)
    }

    /// 413 Payload Too Large
    pub fn payload_too_large() -> Self {
        Self::from_code(StatusCode::PAYLOAD_TOO_LARGE)
    }

    /// Replaces the message of the error.
    pub fn message<T>(mut self, message: T) -> Self
    where
        T: ToString,
    {
        self.message = message.to_string();
        self
    }
}

impl Display for StatusCodeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for StatusCodeError {}

#[derive(Debug)]
pub struct Response {
    status: StatusCode,
    headers: HeaderMap,
    body: Body,
}

impl Response {
    /// 200 OK
    pub fn ok() -> Self {
        Self {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            body: Body::empty(),
        }
    }

    /// 201 Created
    pub fn created() -> Self {
        Self::ok().status(StatusCode::CREATED)
    }

    /// 204 No Content
    pub fn no_content() -> Self {
        Self::ok().status(StatusCode::NO_CONTENT)
    }

    pub fn status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }

    pub fn body<T>(mut self, body: T) -> Self
    where
        T: Into<Body>,
    {
        self.body = body.into();
        self
    }

    pub fn json<T>(mut self, body: &T) -> Self
    where
        T: ?Sized + Serialize,
    {
        match serde_json::to_vec(body) {
            Ok(buf) => {
                self.body = Body::from(buf);
                self.header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
            }
            Err(err) => {
                log::error!("Failed to serialize response body: {}", err);

                self.body = Body::empty();
                self.status(StatusCode::INTERNAL_SERVER_ERROR)
            }
        }
    }

    pub fn header<K>(mut self, key: K, value: HeaderValue) -> Self
    where
        K: IntoHeaderName,
    {
        self.headers.append(key, value);
        self
    }

    fn build(self) -> hyper::Response<Body> {
        let mut resp = hyper::Response::new(self.body);
        *resp.status_mut() = self.status;
        *resp.headers_mut() = self.headers;
        resp
    }
}
