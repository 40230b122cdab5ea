use serde::{Deserialize, Serialize};

/// Live view of one in-progress recording, as shown by the website.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct StatusEntry {
    pub host: String,
    pub link: String,
    /// Elapsed recording time, already formatted for display.
    pub length: String,
    pub description: String,
    pub starting_time: String,
}
