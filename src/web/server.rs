//! HTTP/1 front end for the CAPTCHA pipeline.
//!
//! `GET /` serves the form, `GET /captcha` a fresh image for the caller's
//! session and `POST /` checks the submitted code.

use crate::captcha::{CaptchaGenerator, EncodedImage, FontLoader, TracingObserver, check};
use crate::config::{Result, ServerConfig};
use crate::store::SessionStore;
use crate::web::form::{CODE_FIELD, form_field};
use crate::web::headers::no_cache;
use crate::web::pages::{index_page, result_page};
use crate::web::session::{
    SESSION_COOKIE_NAME, format_set_cookie, generate_session_id, session_from_cookie,
};
use http_body_util::{BodyExt, Full, Limited};
use hyper::body::{Bytes, Incoming};
use hyper::header::{CONTENT_TYPE, COOKIE, LOCATION, SET_COOKIE};
use http::response::Builder;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::{debug, error, info, warn};

pub const IMAGE_PATH: &str = "/captcha";

/// Form bodies are a handful of short fields.
const MAX_FORM_BYTES: usize = 4096;

const PURGE_INTERVAL: Duration = Duration::from_secs(60);

/// Shared state for every connection.
pub struct AppState {
    config: Arc<ServerConfig>,
    generator: CaptchaGenerator,
    sessions: Arc<SessionStore>,
}

impl AppState {
    #[must_use]
    pub fn new(config: Arc<ServerConfig>, fonts: Arc<dyn FontLoader>) -> Self {
        let sessions = Arc::new(SessionStore::new(Duration::from_secs(
            config.session_expiry_secs,
        )));
        Self {
            generator: CaptchaGenerator::new(fonts).with_observer(Arc::new(TracingObserver)),
            sessions,
            config,
        }
    }

    #[must_use]
    pub const fn sessions(&self) -> &Arc<SessionStore> {
        &self.sessions
    }
}

/// Accepts connections until the listener fails.
///
/// # Errors
///
/// Returns `Io` when accepting a connection fails.
pub async fn serve(listener: TcpListener, state: Arc<AppState>) -> Result<()> {
    let sessions = Arc::clone(&state.sessions);
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(PURGE_INTERVAL);
        loop {
            interval.tick().await;
            sessions.purge_expired();
        }
    });

    info!(addr = %listener.local_addr()?, "Listening");
    loop {
        let (stream, peer) = listener.accept().await?;
        let io = TokioIo::new(stream);
        let state = Arc::clone(&state);

        tokio::task::spawn(async move {
            let service = service_fn(move |req| handle(req, Arc::clone(&state)));
            if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                debug!(peer = %peer, error = %err, "Connection closed with error");
            }
        });
    }
}

async fn handle(
    req: Request<Incoming>,
    state: Arc<AppState>,
) -> std::result::Result<Response<Full<Bytes>>, Infallible> {
    let session = req
        .headers()
        .get(COOKIE)
        .and_then(|v| v.to_str().ok())
        .and_then(session_from_cookie)
        .map(ToString::to_string);

    debug!(method = %req.method(), path = req.uri().path(), "Request");
    let response = match (req.method(), req.uri().path()) {
        (&Method::GET, "/") => {
            let (id, builder) = ensure_session(session, &state.config);
            debug!(session = %id, "Serving form");
            let captcha = &state.config.captcha;
            let html = index_page(IMAGE_PATH, captcha.width, captcha.height);
            respond(
                builder.header(CONTENT_TYPE, "text/html; charset=utf-8"),
                html,
            )
        }
        (&Method::GET, IMAGE_PATH) => {
            let (id, builder) = ensure_session(session, &state.config);
            serve_image(&state, id, builder).await
        }
        (&Method::POST, "/") => verify(req, &state, session).await,
        _ => respond(
            Response::builder()
                .status(StatusCode::NOT_FOUND)
                .header(CONTENT_TYPE, "text/plain"),
            "404 Not Found",
        ),
    };
    Ok(response)
}

/// Reuses the caller's session or mints one and sets its cookie.
fn ensure_session(session: Option<String>, config: &ServerConfig) -> (String, Builder) {
    if let Some(id) = session {
        return (id, Response::builder());
    }
    let id = generate_session_id();
    let cookie = format_set_cookie(
        SESSION_COOKIE_NAME,
        &id,
        config.session_expiry_secs,
        config.secure_cookies,
    );
    (id, Response::builder().header(SET_COOKIE, cookie))
}

async fn serve_image(
    state: &Arc<AppState>,
    id: String,
    builder: Builder,
) -> Response<Full<Bytes>> {
    let worker = Arc::clone(state);
    let result = tokio::task::spawn_blocking(move || -> Result<EncodedImage> {
        let scope = worker.sessions.scope(&id);
        worker.generator.process(&worker.config.captcha, &scope)
    })
    .await;

    match result {
        Ok(Ok(image)) => {
            let builder = no_cache(builder, image.content_type());
            respond(builder, image.bytes)
        }
        Ok(Err(e)) => {
            error!(error = %e, "CAPTCHA generation failed");
            internal_error()
        }
        Err(e) => {
            error!(error = %e, "CAPTCHA worker panicked");
            internal_error()
        }
    }
}

async fn verify(
    req: Request<Incoming>,
    state: &AppState,
    session: Option<String>,
) -> Response<Full<Bytes>> {
    let body = match Limited::new(req.into_body(), MAX_FORM_BYTES).collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            warn!(error = %e, "Rejected form body");
            return respond(
                Response::builder()
                    .status(StatusCode::PAYLOAD_TOO_LARGE)
                    .header(CONTENT_TYPE, "text/plain"),
                "Form too large",
            );
        }
    };

    if form_field(&body, "reload").is_some() {
        return respond(
            Response::builder()
                .status(StatusCode::SEE_OTHER)
                .header(LOCATION, "/"),
            Bytes::new(),
        );
    }

    let code = form_field(&body, CODE_FIELD).unwrap_or_default();
    let passed = session.is_some_and(|id| check(&state.sessions.scope(&id), &code));
    info!(passed, "CAPTCHA checked");

    respond(
        Response::builder().header(CONTENT_TYPE, "text/html; charset=utf-8"),
        result_page(&code, passed),
    )
}

fn internal_error() -> Response<Full<Bytes>> {
    respond(
        Response::builder()
            .status(StatusCode::INTERNAL_SERVER_ERROR)
            .header(CONTENT_TYPE, "text/plain"),
        "CAPTCHA generation failed",
    )
}

fn respond(builder: Builder, body: impl Into<Bytes>) -> Response<Full<Bytes>> {
    builder.body(Full::new(body.into())).unwrap_or_else(|e| {
        error!(error = %e, "Failed to build response");
        let mut response =
            Response::new(Full::new(Bytes::from_static(b"Internal Server Error")));
        *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
        response
    })
}
