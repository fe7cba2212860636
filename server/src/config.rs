/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub listen_addr: String,
    /// Capacity of the connection -> world loop command queue
    pub command_buffer: usize,
    /// Capacity of the world loop -> connections broadcast channel
    pub broadcast_buffer: usize,
    /// Text frames larger than this are dropped unparsed
    pub max_message_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:3000".to_string(),
            command_buffer: 256,
            broadcast_buffer: 1024,
            max_message_bytes: 16 * 1024,
        }
    }
}

impl ServerConfig {
    /// Defaults, with `SANDBOX_LISTEN_ADDR` overriding the listen address.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(addr) = std::env::var("SANDBOX_LISTEN_ADDR") {
            config.listen_addr = addr;
        }
        config
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.listen_addr.parse::<std::net::SocketAddr>().is_err() {
            return Err(format!("listen_addr {:?} is not a socket address", self.listen_addr));
        }
        if self.command_buffer == 0 {
            return Err("command_buffer must be > 0".to_string());
        }
        if self.broadcast_buffer == 0 {
            return Err("broadcast_buffer must be > 0".to_string());
        }
        if self.max_message_bytes < 64 {
            return Err("max_message_bytes must be >= 64".to_string());
        }
        Ok(())
    }
}
