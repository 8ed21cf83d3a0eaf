use serde::{Deserialize, Serialize};

use crate::types::HumanDuration;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RuntimeConfig {
    /// Period of the useless-data removal sweep (wrapper tables and sensor
    /// tables).
    pub retention_interval: HumanDuration,
    /// Capacity of each wrapper's inbound element channel.
    #[serde(default = "default_channel_capacity")]
    pub element_channel_capacity: usize,
    /// Capacity of the slid-window event channel handed to consumers.
    #[serde(default = "default_channel_capacity")]
    pub window_channel_capacity: usize,
}

fn default_channel_capacity() -> usize {
    1024
}
