//! Power routes of one device
//!
//! | Method | Path       | Result |
//! |--------|------------|--------|
//! | GET    | `/`        | current state, `unknown` when unresolvable |
//! | POST   | `/on`      | history entry written |
//! | POST   | `/off`     | history entry written |
//! | GET    | `/history` | paged history, newest first |
//!
//! Nest under a path carrying a `{device_id}` segment.

use std::sync::Arc;

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::driver::PowerDriver;
use super::error::PowerError;
use super::state::PowerState;
use crate::binder::{Bindable, Bound, FieldBinding};
use crate::handlers::{ApiError, ApiErrorKind, ApiOperation, ListQuery, ListResponse};
use crate::lab::PowerStateResponse;

/// The `{device_id}` segment of power routes
#[derive(Debug, Clone, Copy, Default)]
pub struct DevicePath {
    pub device_id: Uuid,
}

impl Bindable for DevicePath {
    fn bindings() -> Vec<FieldBinding<Self>> {
        vec![
            FieldBinding::path("device_id", "device_id", |p: &mut Self, v| p.device_id = v)
                .required(),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DevicePowerResponse {
    pub device_id: Uuid,
    pub state: PowerState,
}

pub fn power_router(driver: Arc<PowerDriver>) -> Router {
    Router::new()
        .route("/", get(state))
        .route("/on", post(power_on))
        .route("/off", post(power_off))
        .route("/history", get(history))
        .with_state(driver)
}

async fn state(
    State(driver): State<Arc<PowerDriver>>,
    Bound(path): Bound<DevicePath>,
) -> Json<DevicePowerResponse> {
    let state = driver.power_state_or_unknown(path.device_id).await;
    Json(DevicePowerResponse {
        device_id: path.device_id,
        state,
    })
}

async fn power_on(
    State(driver): State<Arc<PowerDriver>>,
    Bound(path): Bound<DevicePath>,
) -> Result<Json<PowerStateResponse>, ApiError> {
    Ok(Json(driver.power_on(path.device_id).await?))
}

async fn power_off(
    State(driver): State<Arc<PowerDriver>>,
    Bound(path): Bound<DevicePath>,
) -> Result<Json<PowerStateResponse>, ApiError> {
    Ok(Json(driver.power_off(path.device_id).await?))
}

async fn history(
    State(driver): State<Arc<PowerDriver>>,
    Bound(path): Bound<DevicePath>,
    Bound(query): Bound<ListQuery>,
) -> Result<ListResponse<PowerStateResponse>, ApiError> {
    let descriptor = query.descriptor();
    let (items, total) = driver
        .history(path.device_id, &descriptor)
        .await
        .map_err(|e| ApiError::from_service(ApiOperation::List, e.into()))?;
    Ok(ListResponse::new(items, total, &descriptor))
}

impl From<PowerError> for ApiError {
    fn from(error: PowerError) -> Self {
        let kind = match &error {
            e if e.is_not_found() => ApiErrorKind::NotFound,
            PowerError::NotConnected { .. } => ApiErrorKind::Conflict,
            PowerError::Capability { .. } | PowerError::Device { .. } => ApiErrorKind::BadGateway,
            _ => ApiErrorKind::InternalError,
        };
        if kind == ApiErrorKind::InternalError {
            tracing::error!(error = %error, hop = %error.hop(), "power operation failed");
            return Self::new(ApiOperation::Power, kind, "An internal error occurred");
        }
        Self::new(ApiOperation::Power, kind, error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lab::{DeviceNetworkInterface, DevicePowerState, EthernetSwitch, EthernetSwitchPort, Location, PoeType};
    use crate::power::{CapabilityError, SimulatedProvider};
    use crate::repository::{GenericRepository, RepositoryError};
    use axum::{body::Body, http::Request, http::StatusCode};
    use serde_json::Value;
    use tower::ServiceExt;

    async fn wired_app() -> (Router, Uuid) {
        let switches = GenericRepository::<EthernetSwitch>::in_memory().unwrap();
        let ports = GenericRepository::<EthernetSwitchPort>::in_memory().unwrap();
        let interfaces = GenericRepository::<DeviceNetworkInterface>::in_memory().unwrap();
        let history = GenericRepository::<DevicePowerState>::in_memory().unwrap();

        let switch_id = switches
            .insert(EthernetSwitch {
                name: "sw1".to_string(),
                management_address: "10.0.0.2".to_string(),
                model: "simulated".to_string(),
                description: String::new(),
                location: Location::default(),
            })
            .await
            .unwrap();
        let port_id = ports
            .insert(EthernetSwitchPort {
                switch_id,
                name: "eth0".to_string(),
                description: String::new(),
                poe_type: PoeType::PoePlus,
            })
            .await
            .unwrap();
        let device_id = Uuid::new_v4();
        interfaces
            .insert(DeviceNetworkInterface {
                device_id,
                name: "eth0".to_string(),
                mac_address: "02:00:00:00:00:01".to_string(),
                switch_id: Some(switch_id),
                switch_port_id: Some(port_id),
            })
            .await
            .unwrap();

        let driver = PowerDriver::new(
            interfaces,
            ports,
            history,
            Arc::new(SimulatedProvider::new()),
        );
        let app = Router::new().nest("/devices/{device_id}/power", power_router(Arc::new(driver)));
        (app, device_id)
    }

    async fn send(app: &Router, method: &str, uri: &str) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_power_cycle_over_http() {
        let (app, device_id) = wired_app().await;
        let base = format!("/devices/{device_id}/power");

        let (status, body) = send(&app, "GET", &base).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["state"], "off");

        let (status, body) = send(&app, "POST", &format!("{base}/on")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["state"], "on");
        assert_eq!(body["deviceId"], device_id.to_string());

        let (_, body) = send(&app, "GET", &base).await;
        assert_eq!(body["state"], "on");

        send(&app, "POST", &format!("{base}/off")).await;
        let (status, body) = send(&app, "GET", &format!("{base}/history?pageSize=1")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total"], 2);
        assert_eq!(body["items"][0]["state"], "off");
    }

    #[tokio::test]
    async fn test_unknown_device() {
        let (app, _) = wired_app().await;
        let base = format!("/devices/{}/power", Uuid::new_v4());

        let (status, body) = send(&app, "GET", &base).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["state"], "unknown");

        let (status, body) = send(&app, "POST", &format!("{base}/on")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["code"], "NOT_FOUND");

        let (status, _) = send(&app, "POST", "/devices/not-a-uuid/power/on").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_power_error_classification() {
        let device_id = Uuid::new_v4();
        let switch_id = Uuid::new_v4();

        let error: ApiError = PowerError::NotConnected {
            device_id,
            interface_id: Uuid::new_v4(),
        }
        .into();
        assert_eq!(error.kind, ApiErrorKind::Conflict);

        let error: ApiError = PowerError::Capability {
            switch_id,
            source: CapabilityError::Unsupported(switch_id),
        }
        .into();
        assert_eq!(error.kind, ApiErrorKind::NotFound);

        let error: ApiError = PowerError::Device {
            switch_id,
            port: "eth0".to_string(),
            source: CapabilityError::Command("timeout".to_string()),
        }
        .into();
        assert_eq!(error.kind, ApiErrorKind::BadGateway);

        let error: ApiError = PowerError::History {
            device_id,
            state: PowerState::On,
            source: RepositoryError::connection_failed(
                crate::repository::RepositoryOperation::Insert,
                "pool closed",
            ),
        }
        .into();
        assert_eq!(error.kind, ApiErrorKind::InternalError);
        assert!(!error.message.contains("pool closed"));
    }
}
