//! Axum routes for collection handlers
//!
//! [`collection_router`] mounts the five collection operations of any
//! [`CollectionHandler`]:
//!
//! | Method | Path    | Operation | Success |
//! |--------|---------|-----------|---------|
//! | GET    | `/`     | list      | 200     |
//! | POST   | `/`     | create    | 201     |
//! | GET    | `/{id}` | get       | 200     |
//! | PUT    | `/{id}` | update    | 200     |
//! | DELETE | `/{id}` | delete    | 204     |

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use uuid::Uuid;

use super::error::{ApiError, ApiOperation};
use super::query::ListQuery;
use super::response::ListResponse;
use super::traits::CollectionHandler;
use crate::binder::{Bindable, Bound, FieldBinding};

/// The `{id}` segment of item routes
#[derive(Debug, Clone, Copy, Default)]
pub struct IdPath {
    pub id: Uuid,
}

impl Bindable for IdPath {
    fn bindings() -> Vec<FieldBinding<Self>> {
        vec![FieldBinding::path("id", "id", |p: &mut Self, v| p.id = v).required()]
    }
}

/// Router serving `handler` at `/` and `/{id}`; nest it under a resource path
pub fn collection_router<H: CollectionHandler>(handler: Arc<H>) -> Router {
    Router::new()
        .route("/", get(list::<H>).post(create::<H>))
        .route("/{id}", get(fetch::<H>).put(update::<H>).delete(remove::<H>))
        .with_state(handler)
}

/// Turn a body rejection into an API error
fn body<T>(
    payload: Result<Json<T>, JsonRejection>,
    operation: ApiOperation,
) -> Result<T, ApiError> {
    payload
        .map(|Json(dto)| dto)
        .map_err(|e| ApiError::bad_request(e.body_text()).with_operation(operation))
}

async fn list<H: CollectionHandler>(
    State(handler): State<Arc<H>>,
    Bound(query): Bound<ListQuery>,
) -> Result<ListResponse<H::Response>, ApiError> {
    handler.list(query).await
}

async fn fetch<H: CollectionHandler>(
    State(handler): State<Arc<H>>,
    Bound(path): Bound<IdPath>,
) -> Result<Json<H::Response>, ApiError> {
    handler.get(path.id).await.map(Json)
}

async fn create<H: CollectionHandler>(
    State(handler): State<Arc<H>>,
    payload: Result<Json<H::Create>, JsonRejection>,
) -> Result<(StatusCode, Json<H::Response>), ApiError> {
    let dto = body(payload, ApiOperation::Create)?;
    let created = handler.create(dto).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

async fn update<H: CollectionHandler>(
    State(handler): State<Arc<H>>,
    Bound(path): Bound<IdPath>,
    payload: Result<Json<H::Update>, JsonRejection>,
) -> Result<Json<H::Response>, ApiError> {
    let dto = body(payload, ApiOperation::Update)?;
    handler.update(path.id, dto).await.map(Json)
}

async fn remove<H: CollectionHandler>(
    State(handler): State<Arc<H>>,
    Bound(path): Bound<IdPath>,
) -> Result<StatusCode, ApiError> {
    handler.delete(path.id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::GenericController;
    use crate::lab::SwitchService;
    use axum::{body::Body, http::Request};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    fn app() -> Router {
        let service = Arc::new(SwitchService::in_memory().unwrap());
        Router::new().nest(
            "/switches",
            collection_router(Arc::new(GenericController::new(service))),
        )
    }

    async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    fn post(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get_request(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_crud_round_trip() {
        let app = app();
        let (status, created) = send(
            &app,
            post(
                "/switches",
                json!({"name": "sw1", "managementAddress": "10.0.0.2", "model": "cisco-ios"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let id = created["id"].as_str().unwrap().to_string();

        let (status, fetched) = send(&app, get_request(&format!("/switches/{}", id))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(fetched["name"], "sw1");

        let (status, _) = send(
            &app,
            Request::builder()
                .method("PUT")
                .uri(format!("/switches/{}", id))
                .header("content-type", "application/json")
                .body(Body::from(
                    json!({"name": "sw1", "managementAddress": "10.0.0.3", "model": "cisco-ios"})
                        .to_string(),
                ))
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, _) = send(
            &app,
            Request::builder()
                .method("DELETE")
                .uri(format!("/switches/{}", id))
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, body) = send(&app, get_request(&format!("/switches/{}", id))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn test_list_uses_defaults_for_bad_paging() {
        let app = app();
        let (status, body) = send(&app, get_request("/switches?page=abc&pageSize=-4")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["page"], 1);
        assert_eq!(body["pageSize"], 10);
        assert_eq!(body["total"], 0);
    }

    #[tokio::test]
    async fn test_malformed_id_is_bad_request() {
        let (status, body) = send(&app(), get_request("/switches/42")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "BAD_REQUEST");
    }

    #[tokio::test]
    async fn test_invalid_body_is_unprocessable() {
        let (status, body) = send(&app(), post("/switches", json!({"name": ""}))).await;
        assert!(status == StatusCode::BAD_REQUEST || status == StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body["code"].is_string());
    }

    #[tokio::test]
    async fn test_validation_errors_render_fields() {
        let (status, body) = send(
            &app(),
            post(
                "/switches",
                json!({"name": "", "managementAddress": "10.0.0.2", "model": "cisco-ios"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body["fields"]["name"].is_string());
    }
}
