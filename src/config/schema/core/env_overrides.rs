use super::Config;

impl Config {
    pub fn apply_env_overrides(&mut self) {
        if let Ok(ttl_str) = std::env::var("LOCKGATE_TOKEN_TTL_SECS")
            && let Ok(ttl) = ttl_str.trim().parse::<u64>()
            && ttl > 0
        {
            self.token_ttl_secs = ttl;
        }

        if let Ok(host) =
            std::env::var("LOCKGATE_GATEWAY_HOST").or_else(|_| std::env::var("HOST"))
            && !host.is_empty()
        {
            self.gateway.host = host;
        }

        if let Ok(port_str) =
            std::env::var("LOCKGATE_GATEWAY_PORT").or_else(|_| std::env::var("PORT"))
            && let Ok(port) = port_str.parse::<u16>()
        {
            self.gateway.port = port;
        }

        if let Ok(token) = std::env::var("LOCKGATE_GATEWAY_TOKEN")
            && !token.trim().is_empty()
        {
            self.gateway.api_token = Some(token.trim().to_string());
        }

        if let Ok(level) = std::env::var("LOCKGATE_LOG_LEVEL")
            && !level.is_empty()
        {
            self.observability.log_level = level;
        }
    }
}
