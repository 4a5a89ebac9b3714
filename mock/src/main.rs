use std::{net::SocketAddr, sync::Arc};

use anyhow::Context;
use axum::{
    extract::State,
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::get,
    Router,
};
use tokio::{net::TcpListener, sync::Mutex};
use tracing::{info, warn};

use setpoint_common::{basic_auth_value, EndpointConfig};

const MIN_SETPOINT_F: i32 = 60;
const MAX_SETPOINT_F: i32 = 84;
const DEFAULT_SETPOINT_F: i32 = 72;

#[derive(Clone)]
struct AppState {
    setpoint_f: Arc<Mutex<i32>>,
    authorization: Arc<String>,
}

impl AppState {
    fn new(password: &str, setpoint_f: i32) -> Self {
        Self {
            setpoint_f: Arc::new(Mutex::new(setpoint_f)),
            authorization: Arc::new(basic_auth_value("", password)),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let password =
        std::env::var("MOCK_PASSWORD").unwrap_or_else(|_| EndpointConfig::default().password);
    let setpoint_f = std::env::var("MOCK_SETPOINT")
        .ok()
        .and_then(|value| value.parse::<i32>().ok())
        .unwrap_or(DEFAULT_SETPOINT_F)
        .clamp(MIN_SETPOINT_F, MAX_SETPOINT_F);

    let app = router(AppState::new(&password, setpoint_f));

    let port = std::env::var("MOCK_HTTP_PORT")
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(8080);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind mock thermostat at {addr}"))?;

    info!("mock thermostat listening on http://{addr} (setpoint {setpoint_f}F)");
    axum::serve(listener, app).await?;
    Ok(())
}

fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handle_status))
        .route("/increase", get(handle_increase))
        .route("/decrease", get(handle_decrease))
        .with_state(state)
}

async fn handle_status(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if !is_authorized(&headers, &state.authorization) {
        return unauthorized();
    }
    let setpoint_f = *state.setpoint_f.lock().await;
    Html(render_status_page(setpoint_f)).into_response()
}

async fn handle_increase(State(state): State<AppState>, headers: HeaderMap) -> Response {
    adjust_setpoint(&state, &headers, 1).await
}

async fn handle_decrease(State(state): State<AppState>, headers: HeaderMap) -> Response {
    adjust_setpoint(&state, &headers, -1).await
}

async fn adjust_setpoint(state: &AppState, headers: &HeaderMap, delta: i32) -> Response {
    if !is_authorized(headers, &state.authorization) {
        return unauthorized();
    }
    let mut setpoint_f = state.setpoint_f.lock().await;
    *setpoint_f = (*setpoint_f + delta).clamp(MIN_SETPOINT_F, MAX_SETPOINT_F);
    info!("setpoint adjusted by {delta:+} to {}F", *setpoint_f);
    (StatusCode::OK, "OK").into_response()
}

fn is_authorized(headers: &HeaderMap, expected: &str) -> bool {
    headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value == expected)
}

fn unauthorized() -> Response {
    warn!("rejecting request with missing or wrong credentials");
    (StatusCode::UNAUTHORIZED, "Unauthorized").into_response()
}

fn render_status_page(setpoint_f: i32) -> String {
    format!(
        "<!doctype html><html><head><title>Thermostat</title></head><body>\
         <p>Set point: <span id='tempSet'>{setpoint_f}</span> F</p>\
         <p><a href='/increase'>+</a> <a href='/decrease'>-</a></p>\
         </body></html>"
    )
}

#[cfg(test)]
mod tests {
    use axum::{body::to_bytes, http::HeaderValue};
    use pretty_assertions::assert_eq;
    use setpoint_common::extract_setpoint;

    use super::*;

    fn auth_headers(password: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&basic_auth_value("", password)).unwrap(),
        );
        headers
    }

    async fn body_text(response: Response) -> String {
        let bytes = to_bytes(response.into_body(), 64 * 1024).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[test]
    fn status_page_matches_panel_extractor() {
        let page = render_status_page(71);
        assert_eq!(extract_setpoint(&page), Ok("71"));
    }

    #[tokio::test]
    async fn status_requires_credentials() {
        let state = AppState::new("secret", 72);

        let denied = handle_status(State(state.clone()), HeaderMap::new()).await;
        assert_eq!(denied.status(), StatusCode::UNAUTHORIZED);

        let wrong = handle_status(State(state.clone()), auth_headers("nope")).await;
        assert_eq!(wrong.status(), StatusCode::UNAUTHORIZED);

        let allowed = handle_status(State(state), auth_headers("secret")).await;
        assert_eq!(allowed.status(), StatusCode::OK);
        assert_eq!(extract_setpoint(&body_text(allowed).await), Ok("72"));
    }

    #[tokio::test]
    async fn adjustments_clamp_to_range() {
        let state = AppState::new("secret", MAX_SETPOINT_F);

        let response = handle_increase(State(state.clone()), auth_headers("secret")).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(*state.setpoint_f.lock().await, MAX_SETPOINT_F);

        handle_decrease(State(state.clone()), auth_headers("secret")).await;
        assert_eq!(*state.setpoint_f.lock().await, MAX_SETPOINT_F - 1);
    }

    #[tokio::test]
    async fn unauthorized_adjustment_leaves_setpoint() {
        let state = AppState::new("secret", 70);

        let response = handle_increase(State(state.clone()), HeaderMap::new()).await;

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(*state.setpoint_f.lock().await, 70);
    }
}
