use georep_executor::SessionStatus;
use serde::{Deserialize, Serialize};

// ============================================================================
// Inventory Types
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cluster {
    pub cluster_id: String,
    pub nodes: Vec<String>,
    pub volumes: Vec<String>,
    pub created_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListClustersResponse {
    pub clusters: Vec<Cluster>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddNodeRequest {
    pub cluster_id: String,
    pub manage_hostname: String,
    /// Defaults to the management hostname
    pub storage_hostname: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    pub node_id: String,
    pub cluster_id: String,
    pub manage_hostname: String,
    pub storage_hostname: String,
    pub registered_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateVolumeRequest {
    pub name: String,
    pub cluster_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Volume {
    pub volume_id: String,
    pub name: String,
    pub cluster_id: String,
    pub created_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListVolumesResponse {
    pub volumes: Vec<Volume>,
}

// ============================================================================
// Geo-Replication Types
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeoReplicationVolume {
    pub name: String,
    pub sessions: Vec<SessionStatus>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeoReplicationVolumeStatus {
    pub volume: GeoReplicationVolume,
}

// ============================================================================
// Health Check
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}
