use axum::{body::Body, response::Response};
use serde::de::DeserializeOwned;

pub(crate) async fn parse_json_body<T: DeserializeOwned>(response: Response<Body>) -> T {
    let body = response.into_body();
    let body = axum::body::to_bytes(body, usize::MAX).await.unwrap();

    serde_json::from_slice(&body).expect("Could not parse response body as JSON")
}
