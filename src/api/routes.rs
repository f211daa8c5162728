//! Consumer route definitions
//!
//! - `GET /` - banner
//! - `GET /health` - counters
//! - `POST /eis-data` - impedance triples
//! - `POST /eis-data/batch` - spectrum batches

use axum::{
    routing::{get, post},
    Router,
};

use super::handlers::{self, ConsumerState};

pub fn consumer_routes(state: ConsumerState) -> Router {
    Router::new()
        .route("/", get(handlers::banner))
        .route("/health", get(handlers::health))
        .route("/eis-data", post(handlers::receive_points))
        .route("/eis-data/batch", post(handlers::receive_batch))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use tower::ServiceExt;

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn post_json(uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_banner() {
        let app = consumer_routes(ConsumerState::new());
        let response = app
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&bytes[..], handlers::BANNER.as_bytes());
    }

    #[tokio::test]
    async fn test_post_points() {
        let app = consumer_routes(ConsumerState::new());
        let response = app
            .oneshot(post_json(
                "/eis-data",
                r#"[{"frequency":0.0,"real":2.0,"imag":0.0},{"frequency":1.0,"real":1.5,"imag":-0.5}]"#,
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["status"], "success");
        assert_eq!(json["received_points"], 2);
    }

    #[tokio::test]
    async fn test_malformed_json_rejected() {
        let app = consumer_routes(ConsumerState::new());
        let response = app
            .oneshot(post_json("/eis-data", "[{\"frequency\": 1.0,"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_unknown_route() {
        let app = consumer_routes(ConsumerState::new());
        let response = app
            .oneshot(Request::builder().uri("/nope").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
