use mcbp::{Message, MessageBuilder, Opcode};
use serde::{Deserialize, Serialize};

/// The bucket configuration a node publishes on its data port. Only the
/// pieces the router consumes are modelled; unknown fields are ignored.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterConfig {
    pub rev: u32,
    pub name: Option<String>,
    #[serde(default)]
    pub bucket_capabilities: Vec<String>,
    pub node_locator: Option<String>,
    pub v_bucket_server_map: Option<VBucketServerMap>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VBucketServerMap {
    pub hash_algorithm: String,
    pub num_replicas: u32,
    pub server_list: Vec<String>,
    /// One chain per vbucket; the first entry is the active owner's
    /// index into `server_list`, -1 while unassigned.
    pub v_bucket_map: Vec<Vec<i32>>,
}

#[derive(Debug)]
pub struct GetClusterConfigRequest;

impl GetClusterConfigRequest {
    pub fn encode(&self) -> Message {
        MessageBuilder::new(Opcode::GetClusterConfig).build()
    }
}

#[derive(Debug, Clone)]
pub struct GetClusterConfigResponse {
    pub config: ClusterConfig,
}

impl GetClusterConfigResponse {
    pub fn decode(resp: &Message) -> Result<GetClusterConfigResponse, serde_json::Error> {
        serde_json::from_slice(&resp.value).map(|config| GetClusterConfigResponse { config })
    }
}
