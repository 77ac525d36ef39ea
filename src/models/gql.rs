use serde_json::{json, Value};

/// A persisted GQL query, identified by operation name and the sha256 of its text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GqlOperation {
    pub name: &'static str,
    pub sha256: &'static str,
}

impl GqlOperation {
    pub const fn new(name: &'static str, sha256: &'static str) -> Self {
        Self { name, sha256 }
    }

    /// Request body for this operation with the given variables.
    pub fn with_variables(&self, variables: Value) -> Value {
        json!({
            "operationName": self.name,
            "extensions": {
                "persistedQuery": {
                    "version": 1,
                    "sha256Hash": self.sha256,
                }
            },
            "variables": variables,
        })
    }
}

// Stream info used by the player overlay, keyed by channel login
pub const GET_STREAM_INFO: GqlOperation = GqlOperation::new(
    "VideoPlayerStreamInfoOverlayChannel",
    "a5f2e34d626a9f4f5c0204f910bab2194948a9502089be558bb6e779a9e1b3d2",
);

pub const CHANNEL_POINTS_CONTEXT: GqlOperation = GqlOperation::new(
    "ChannelPointsContext",
    "1530a003a7d374b0380b79db0be0534f30ff46e61cffa2bc0e2468a909fbc024",
);

pub const CLAIM_COMMUNITY_POINTS: GqlOperation = GqlOperation::new(
    "ClaimCommunityPoints",
    "46aaeebe02c99afdf4fc97c7c0cba964124bf6b0af229395f1f6d1feed05b3d0",
);
