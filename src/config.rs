use clap::Parser;

/// HTTP front end for the in-memory store.
#[derive(Parser, Debug, Clone)]
#[command(name = "redislike", version, about)]
pub struct Config {
    /// Address to bind.
    #[arg(long, env = "REDISLIKE_HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port to listen on.
    #[arg(short, long, env = "REDISLIKE_PORT", default_value_t = 8080)]
    pub port: u16,
}

impl Config {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::parse_from(["redislike"]);
        assert_eq!(config.bind_addr(), "0.0.0.0:8080");
    }

    #[test]
    fn test_overrides() {
        let config = Config::parse_from(["redislike", "--host", "127.0.0.1", "-p", "9000"]);
        assert_eq!(config.bind_addr(), "127.0.0.1:9000");
    }
}
