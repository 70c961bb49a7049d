//! Append-only device power history

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::power::PowerState;
use crate::repository::{Column, Entity, FieldRef, Record};

/// One power transition of a device
///
/// Rows are only ever inserted. The record's `created_at` is the time of the
/// transition.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DevicePowerState {
    pub device_id: Uuid,
    pub state: PowerState,
}

impl DevicePowerState {
    pub const DEVICE_ID: FieldRef<Self, Uuid> = FieldRef::new("device_id");
    pub const STATE: FieldRef<Self, PowerState> = FieldRef::new("state");
}

impl Entity for DevicePowerState {
    const KIND: &'static str = "device_power_state";

    fn columns() -> Vec<Column> {
        vec![Column::uuid("device_id"), Column::enumeration("state")]
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PowerStateResponse {
    pub id: Uuid,
    pub device_id: Uuid,
    pub state: PowerState,
    pub timestamp: DateTime<Utc>,
}

impl From<Record<DevicePowerState>> for PowerStateResponse {
    fn from(record: Record<DevicePowerState>) -> Self {
        Self {
            id: record.id,
            device_id: record.data.device_id,
            state: record.data.state,
            timestamp: record.created_at,
        }
    }
}
