//! Server configuration

use crate::gatt::Uuid;
use crate::ots::constants::OTS_SERVICE_UUID;
use crate::ots::{GattHandles, OtsFeatures};

/// Optional behaviour of one service instance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServerCapabilities {
    /// The instance exposes more than one object (OLCP is served)
    pub multiple_objects: bool,
    /// Object Changed indications are sent
    pub object_changed: bool,
    /// The Object List Filter characteristic is served
    pub object_list_filter: bool,
    /// Real-time clock available for time stamps
    pub time: bool,
    pub first_created: bool,
    pub last_modified: bool,
}

impl Default for ServerCapabilities {
    fn default() -> Self {
        Self {
            multiple_objects: true,
            object_changed: true,
            object_list_filter: true,
            time: false,
            first_created: false,
            last_modified: false,
        }
    }
}

impl ServerCapabilities {
    pub fn supports_first_created(&self) -> bool {
        self.time && self.first_created
    }

    pub fn supports_last_modified(&self) -> bool {
        self.time && self.last_modified
    }
}

/// Configuration of one OTS service instance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OtsServiceConfig {
    pub service_uuid: Uuid,
    /// Local attribute handles of the instance's characteristics
    pub handles: GattHandles,
    /// Advertised OACP/OLCP features
    pub features: OtsFeatures,
    pub capabilities: ServerCapabilities,
}

impl Default for OtsServiceConfig {
    fn default() -> Self {
        Self {
            service_uuid: Uuid::Uuid16(OTS_SERVICE_UUID),
            handles: GattHandles::default(),
            features: OtsFeatures::default(),
            capabilities: ServerCapabilities::default(),
        }
    }
}

/// Configuration shared by all service instances of a server
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OtsServerConfig {
    /// Maximum number of simultaneously served connections per instance
    pub concurrency: usize,
    /// Pending indications kept per connection
    pub indication_queue_size: usize,
    /// Largest indication payload accepted for sending or queuing
    pub indication_size_max: usize,
    /// Drop the oldest pending indication instead of the new one when full
    pub replace_oldest_indication: bool,
}

impl Default for OtsServerConfig {
    fn default() -> Self {
        Self {
            concurrency: 4,
            indication_queue_size: 4,
            indication_size_max: 64,
            replace_oldest_indication: false,
        }
    }
}
