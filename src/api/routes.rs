//! Route table for the gateway.
//!
//! Each route states its path, the methods it accepts and whether it is
//! covered by CSRF protection. Any other method is answered with 405 by the
//! router before a handler runs. The machine-to-machine endpoints opt out of
//! CSRF protection here, one by one, so the posture is readable in one place.

use axum::{
    Router,
    extract::Request,
    handler::Handler,
    http::{HeaderMap, Method, header},
    middleware::{self, Next},
    response::Response,
    routing::{MethodFilter, MethodRouter},
};
use tower_http::decompression::RequestDecompressionLayer;

use super::error::ApiError;
use super::services;
use super::state::AppState;

/// Cookie carrying the CSRF token.
pub const CSRF_COOKIE: &str = "csrftoken";
/// Header that must echo the cookie on unsafe methods.
pub const CSRF_HEADER: &str = "x-csrftoken";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verb {
    Get,
    Post,
}

impl Verb {
    fn filter(self) -> MethodFilter {
        match self {
            Verb::Get => MethodFilter::GET,
            Verb::Post => MethodFilter::POST,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RouteSpec {
    pub name: &'static str,
    pub path: &'static str,
    pub methods: &'static [Verb],
    pub requires_csrf_protection: bool,
}

pub const UPDATE: RouteSpec = RouteSpec {
    name: "update",
    path: "/update",
    methods: &[Verb::Post],
    requires_csrf_protection: false,
};

pub const USERID_AUTOCOMPLETE: RouteSpec = RouteSpec {
    name: "userid_autocomplete",
    path: "/userid-autocomplete",
    methods: &[Verb::Get],
    requires_csrf_protection: false,
};

pub const USAGE_STATS: RouteSpec = RouteSpec {
    name: "usagestats",
    path: "/usagestats",
    methods: &[Verb::Get, Verb::Post],
    requires_csrf_protection: false,
};

pub const CODE_RED: RouteSpec = RouteSpec {
    name: "codered",
    path: "/codered",
    methods: &[Verb::Get],
    requires_csrf_protection: false,
};

pub const HEALTH: RouteSpec = RouteSpec {
    name: "health",
    path: "/health",
    methods: &[Verb::Get],
    requires_csrf_protection: false,
};

pub const ROUTES: &[RouteSpec] = &[UPDATE, USERID_AUTOCOMPLETE, USAGE_STATS, CODE_RED, HEALTH];

/// Builds the gateway router from the route table.
///
/// Gzip request bodies are inflated before any handler sees them. Bodies in
/// an encoding the gateway cannot decode are passed through as-is rather than
/// refused with 415.
pub fn router(state: AppState) -> Router {
    let routes: [Router<AppState>; 5] = [
        mount(&UPDATE, services::update),
        mount(&USERID_AUTOCOMPLETE, services::userid_autocomplete),
        mount(&USAGE_STATS, services::usage_stats),
        mount(&CODE_RED, services::code_red),
        mount(&HEALTH, services::health),
    ];

    routes
        .into_iter()
        .fold(Router::new(), |app, route| app.merge(route))
        .layer(RequestDecompressionLayer::new().pass_through_unaccepted(true))
        .with_state(state)
}

/// Mounts `handler` for every method `spec` allows.
pub fn mount<H, T, S>(spec: &RouteSpec, handler: H) -> Router<S>
where
    H: Handler<T, S>,
    T: 'static,
    S: Clone + Send + Sync + 'static,
{
    let mut method_router: MethodRouter<S> = MethodRouter::new();
    for verb in spec.methods {
        method_router = method_router.on(verb.filter(), handler.clone());
    }

    if spec.requires_csrf_protection {
        method_router = method_router.route_layer(middleware::from_fn(csrf_guard));
    }

    tracing::debug!(
        route = spec.name,
        path = spec.path,
        csrf = spec.requires_csrf_protection,
        "Route mounted"
    );

    Router::new().route(spec.path, method_router)
}

/// Double-submit check: unsafe methods must send the `csrftoken` cookie
/// value back in the `X-CSRFToken` header.
async fn csrf_guard(request: Request, next: Next) -> Result<Response, ApiError> {
    if is_safe_method(request.method()) || csrf_tokens_match(request.headers()) {
        return Ok(next.run(request).await);
    }

    tracing::warn!(
        method = %request.method(),
        path = %request.uri().path(),
        "CSRF verification failed"
    );
    Err(ApiError::CsrfRejected)
}

fn is_safe_method(method: &Method) -> bool {
    matches!(
        *method,
        Method::GET | Method::HEAD | Method::OPTIONS | Method::TRACE
    )
}

fn csrf_tokens_match(headers: &HeaderMap) -> bool {
    let Some(submitted) = headers.get(CSRF_HEADER).and_then(|v| v.to_str().ok()) else {
        return false;
    };

    let cookie = headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == CSRF_COOKIE)
        .map(|(_, value)| value);

    matches!(cookie, Some(token) if !token.is_empty() && token == submitted)
}
