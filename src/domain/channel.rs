use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Chat channel between a client and a provider. There is at most one per
/// pair; `resumed` is set when an existing channel was returned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelHandle {
    pub id: Uuid,
    pub client_id: String,
    pub artist_id: String,
    pub created_at: DateTime<Utc>,
    pub resumed: bool,
}
