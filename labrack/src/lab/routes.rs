//! HTTP surface of the lab inventory
//!
//! | Path | Served by |
//! |------|-----------|
//! | `/api/v1/switches` | [`collection_router`] over [`SwitchService`] |
//! | `/api/v1/switches/{id}/ports` | ports of one switch |
//! | `/api/v1/switches/{id}/ports/{port_id}` | one port, scoped to the switch |
//! | `/api/v1/ports` | [`collection_router`] over [`PortService`] |
//! | `/api/v1/vlans` | [`collection_router`] over [`VlanService`] |
//! | `/api/v1/interfaces` | [`collection_router`] over [`InterfaceService`] |
//! | `/api/v1/devices/{device_id}/power` | [`power_router`] |
//!
//! The switch segment of the scoped port routes is named `{id}` to share the
//! route tree node with the switch item routes.

use std::sync::Arc;

use axum::{extract::State, routing::get, Json, Router};
use uuid::Uuid;

use super::{
    DeviceNetworkInterface, DevicePowerState, EthernetSwitch, EthernetSwitchPort,
    InterfaceMapper, InterfaceService, PortResponse, PortService, SwitchMapper, SwitchService,
    Vlan, VlanService,
};
use crate::binder::{Bindable, Bound, FieldBinding};
use crate::handlers::{
    collection_router, ApiError, ApiOperation, GenericController, ListQuery, ListResponse,
};
use crate::power::{power_router, CapabilityProvider, PowerDriver};
use crate::repository::{GenericRepository, SchemaError};
use crate::service::GenericService;

/// API version prefix of every lab route
pub const API_PREFIX: &str = "/api/v1";

/// Every service the lab router serves
#[derive(Clone)]
pub struct LabServices {
    pub switches: Arc<SwitchService>,
    pub ports: Arc<PortService>,
    pub vlans: Arc<VlanService>,
    pub interfaces: Arc<InterfaceService>,
    pub power: Arc<PowerDriver>,
}

impl LabServices {
    /// Wire services over existing repositories
    ///
    /// The port and interface repositories are shared with the power driver,
    /// so power control sees inventory changes immediately.
    pub fn from_repositories(
        switches: GenericRepository<EthernetSwitch>,
        ports: GenericRepository<EthernetSwitchPort>,
        vlans: GenericRepository<Vlan>,
        interfaces: GenericRepository<DeviceNetworkInterface>,
        history: GenericRepository<DevicePowerState>,
        provider: Arc<dyn CapabilityProvider>,
    ) -> Self {
        let power = PowerDriver::new(interfaces.clone(), ports.clone(), history, provider);
        Self {
            switches: Arc::new(GenericService::new(switches.clone(), SwitchMapper)),
            ports: Arc::new(PortService::from_repositories(ports, switches.clone())),
            vlans: Arc::new(VlanService::from_repositories(vlans, switches)),
            interfaces: Arc::new(GenericService::new(interfaces, InterfaceMapper)),
            power: Arc::new(power),
        }
    }

    /// Services over fresh memory stores
    pub fn in_memory(provider: Arc<dyn CapabilityProvider>) -> Result<Self, SchemaError> {
        Ok(Self::from_repositories(
            GenericRepository::in_memory()?,
            GenericRepository::in_memory()?,
            GenericRepository::in_memory()?,
            GenericRepository::in_memory()?,
            GenericRepository::in_memory()?,
            provider,
        ))
    }
}

impl std::fmt::Debug for LabServices {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LabServices").finish_non_exhaustive()
    }
}

/// Path of the switch-scoped port routes
#[derive(Debug, Clone, Copy, Default)]
struct SwitchPortPath {
    switch_id: Uuid,
    port_id: Option<Uuid>,
}

impl Bindable for SwitchPortPath {
    fn bindings() -> Vec<FieldBinding<Self>> {
        vec![
            FieldBinding::path("switch_id", "id", |p: &mut Self, v| p.switch_id = v).required(),
            FieldBinding::path("port_id", "port_id", |p: &mut Self, v| p.port_id = Some(v))
                .required(),
        ]
    }
}

/// Router serving the whole lab API
pub fn router(services: LabServices) -> Router {
    let scoped_ports = Router::new()
        .route("/{id}/ports", get(switch_ports))
        .route("/{id}/ports/{port_id}", get(switch_port))
        .with_state(Arc::clone(&services.ports));

    let switches = collection_router(Arc::new(GenericController::new(services.switches)))
        .merge(scoped_ports);

    Router::new()
        .nest(&format!("{API_PREFIX}/switches"), switches)
        .nest(
            &format!("{API_PREFIX}/ports"),
            collection_router(Arc::new(GenericController::new(services.ports))),
        )
        .nest(
            &format!("{API_PREFIX}/vlans"),
            collection_router(Arc::new(GenericController::new(services.vlans))),
        )
        .nest(
            &format!("{API_PREFIX}/interfaces"),
            collection_router(Arc::new(GenericController::new(services.interfaces))),
        )
        .nest(
            &format!("{API_PREFIX}/devices/{{device_id}}/power"),
            power_router(services.power),
        )
}

async fn switch_ports(
    State(ports): State<Arc<PortService>>,
    Bound(path): Bound<SwitchPortPath>,
    Bound(query): Bound<ListQuery>,
) -> Result<ListResponse<PortResponse>, ApiError> {
    let descriptor = query.descriptor();
    let (items, total) = ports
        .list_for_owner(path.switch_id, &descriptor)
        .await
        .map_err(|e| ApiError::from_service(ApiOperation::List, e))?;
    Ok(ListResponse::new(items, total, &descriptor))
}

async fn switch_port(
    State(ports): State<Arc<PortService>>,
    Bound(path): Bound<SwitchPortPath>,
) -> Result<Json<PortResponse>, ApiError> {
    // Required binding guarantees the segment on this route
    let Some(port_id) = path.port_id else {
        return Err(ApiError::bad_request("missing port id"));
    };
    ports
        .get_port_by_id(path.switch_id, port_id)
        .await
        .map(Json)
        .map_err(|e| ApiError::from_service(ApiOperation::Get, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::power::SimulatedProvider;
    use axum::{body::Body, http::Request, http::StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    fn app() -> Router {
        let services = LabServices::in_memory(Arc::new(SimulatedProvider::new())).unwrap();
        router(services)
    }

    async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let mut request = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(body) => {
                request = request.header("content-type", "application/json");
                Body::from(body.to_string())
            }
            None => Body::empty(),
        };
        let response = app.clone().oneshot(request.body(body).unwrap()).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    async fn create_switch(app: &Router, name: &str) -> String {
        let (status, body) = send(
            app,
            "POST",
            "/api/v1/switches",
            Some(json!({"name": name, "managementAddress": "10.0.0.2", "model": "simulated"})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        body["id"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn test_scoped_port_routes() {
        let app = app();
        let sw1 = create_switch(&app, "sw1").await;
        let sw2 = create_switch(&app, "sw2").await;

        let (status, port) = send(
            &app,
            "POST",
            "/api/v1/ports",
            Some(json!({"switchId": sw1, "name": "eth0", "poeType": "poe+"})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let port_id = port["id"].as_str().unwrap();

        let (status, body) = send(&app, "GET", &format!("/api/v1/switches/{sw1}/ports/{port_id}"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["name"], "eth0");

        let (status, _) = send(&app, "GET", &format!("/api/v1/switches/{sw2}/ports/{port_id}"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, body) = send(&app, "GET", &format!("/api/v1/switches/{sw1}/ports"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total"], 1);

        let (status, _) = send(&app, "GET", &format!("/api/v1/switches/{}/ports", Uuid::new_v4()), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_all_collections_are_mounted() {
        let app = app();
        for collection in ["switches", "ports", "vlans", "interfaces"] {
            let (status, body) = send(&app, "GET", &format!("/api/v1/{collection}"), None).await;
            assert_eq!(status, StatusCode::OK, "{collection}");
            assert_eq!(body["total"], 0);
        }
    }

    #[tokio::test]
    async fn test_power_is_mounted_per_device() {
        let app = app();
        let (status, body) = send(&app, "GET", &format!("/api/v1/devices/{}/power", Uuid::new_v4()), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["state"], "unknown");
    }
}
