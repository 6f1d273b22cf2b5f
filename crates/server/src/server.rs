use axum::{
    Router,
    extract::{Request, State},
    http::{HeaderName, HeaderValue, header::AUTHORIZATION},
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
};
use axum_extra::headers::{Error as HeaderError, Header, HeaderMapExt};
use tower_http::trace::TraceLayer;

use std::{net::SocketAddr, sync::Arc};

use crate::{ServerError, auth, categories, reports, transactions};
use engine::{Engine, EngineError};

#[derive(Clone)]
pub struct ServerState {
    pub engine: Arc<Engine>,
}

/// `Authorization` header carrying an opaque token.
///
/// Both `Bearer <key>` and the older `Token <key>` schemes are accepted.
#[derive(Debug)]
struct TokenAuthorization(String);

impl Header for TokenAuthorization {
    fn name() -> &'static HeaderName {
        &AUTHORIZATION
    }

    fn decode<'i, I>(values: &mut I) -> Result<Self, HeaderError>
    where
        Self: Sized,
        I: Iterator<Item = &'i HeaderValue>,
    {
        let value = values.next().ok_or_else(HeaderError::invalid)?;
        let Ok(value) = value.to_str() else {
            return Err(HeaderError::invalid());
        };
        let Some((scheme, key)) = value.trim().split_once(' ') else {
            return Err(HeaderError::invalid());
        };
        if !scheme.eq_ignore_ascii_case("bearer") && !scheme.eq_ignore_ascii_case("token") {
            return Err(HeaderError::invalid());
        }
        let key = key.trim();
        if key.is_empty() || key.contains(' ') {
            return Err(HeaderError::invalid());
        }

        Ok(TokenAuthorization(key.to_string()))
    }

    fn encode<E: Extend<HeaderValue>>(&self, values: &mut E) {
        match HeaderValue::from_str(&format!("Bearer {}", self.0)) {
            Ok(value) => values.extend(std::iter::once(value)),
            Err(_) => tracing::error!("failed to encode authorization header"),
        }
    }
}

async fn auth(
    State(state): State<ServerState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ServerError> {
    let Some(TokenAuthorization(token)) = request.headers().typed_get::<TokenAuthorization>()
    else {
        return Err(EngineError::Unauthorized(
            "Authentication credentials were not provided.".to_string(),
        )
        .into());
    };

    let principal = state.engine.authenticate(&token).await?;

    request.extensions_mut().insert(principal);
    Ok(next.run(request).await)
}

/// Builds the HTTP API around `engine`.
pub fn router(engine: Engine) -> Router {
    let state = ServerState {
        engine: Arc::new(engine),
    };

    Router::new()
        .route("/auth/logout", post(auth::logout))
        .route(
            "/categories",
            get(categories::list).post(categories::create),
        )
        .route(
            "/categories/{id}",
            get(categories::get)
                .put(categories::update)
                .delete(categories::delete),
        )
        .route(
            "/transactions",
            get(transactions::list).post(transactions::create),
        )
        .route(
            "/transactions/{id}",
            get(transactions::get)
                .put(transactions::update)
                .patch(transactions::partial_update)
                .delete(transactions::delete),
        )
        .route("/reports/monthly", get(reports::monthly))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth))
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn run(engine: Engine, addr: SocketAddr) {
    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(err) => {
            tracing::error!("failed to bind server listener on {addr}: {err}");
            return;
        }
    };
    if let Err(err) = run_with_listener(engine, listener).await {
        tracing::error!("server failed: {err}");
    }
}

pub async fn run_with_listener(
    engine: Engine,
    listener: tokio::net::TcpListener,
) -> Result<(), std::io::Error> {
    let addr = listener.local_addr()?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, router(engine)).await
}

pub fn spawn_with_listener(
    engine: Engine,
    listener: tokio::net::TcpListener,
) -> Result<SocketAddr, std::io::Error> {
    let addr = listener.local_addr()?;

    tokio::spawn(async move {
        if let Err(err) = run_with_listener(engine, listener).await {
            tracing::error!("server failed: {err}");
        }
    });

    Ok(addr)
}
