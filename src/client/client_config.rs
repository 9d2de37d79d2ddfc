use std::time::Duration;

#[derive(Clone, Debug)]
pub struct ClientConfig {
    pub connect_timeout_in_ms: u64,
    pub request_timeout_in_ms: u64,
    pub tcp_nodelay: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            connect_timeout_in_ms: 1_000,
            request_timeout_in_ms: 3_000,
            tcp_nodelay: true,
        }
    }
}

impl ClientConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_in_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_in_ms)
    }
}
