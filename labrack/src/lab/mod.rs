//! Lab infrastructure resources
//!
//! Every resource is an [`Entity`](crate::repository::Entity) with its DTOs
//! and a [`Mapper`](crate::service::Mapper); the generic repository, service
//! and controller do the rest.
//!
//! | Resource | Kind | Service |
//! |----------|------|---------|
//! | [`EthernetSwitch`] | `ethernet_switch` | [`SwitchService`] |
//! | [`EthernetSwitchPort`] | `ethernet_switch_port` | [`PortService`] |
//! | [`Vlan`] | `vlan` | [`VlanService`] |
//! | [`DeviceNetworkInterface`] | `device_network_interface` | [`InterfaceService`] |
//! | [`DevicePowerState`] | `device_power_state` | read through [`PowerDriver`](crate::power::PowerDriver) |

mod interface;
mod port;
mod power_state;
mod routes;
mod switch;
mod vlan;

pub use interface::{
    normalize_mac, CreateInterface, DeviceNetworkInterface, InterfaceMapper, InterfaceResponse,
    InterfaceService, UpdateInterface,
};
pub use port::{
    CreatePort, EthernetSwitchPort, PoeType, PortMapper, PortResponse, PortService, UpdatePort,
};
pub use power_state::{DevicePowerState, PowerStateResponse};
pub use routes::{router, LabServices, API_PREFIX};
pub use switch::{
    CreateSwitch, EthernetSwitch, Location, SwitchMapper, SwitchResponse, SwitchService,
    UpdateSwitch,
};
pub use vlan::{
    CreateVlan, UpdateVlan, Vlan, VlanMapper, VlanResponse, VlanService, MAX_VLAN_TAG,
    MIN_VLAN_TAG,
};
