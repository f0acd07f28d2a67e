use serde::{Deserialize, Serialize};

/// Broker connection and topic for the button reporter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MqttConfig {
    pub enabled: bool,
    pub host: String,
    pub port: u16,
    pub client_id: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub topic: String,
    pub keep_alive_secs: u64,
    /// Pending reports between consumer and publisher
    pub queue_capacity: usize,
    pub reconnect_delay_ms: u64,
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            host: "localhost".to_string(),
            port: 1883,
            client_id: "buttonlamp".to_string(),
            username: None,
            password: None,
            topic: "/esp32/button".to_string(),
            keep_alive_secs: 5,
            queue_capacity: 100,
            reconnect_delay_ms: 1000,
        }
    }
}
