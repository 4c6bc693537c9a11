use serde::Deserialize;

/// Server configuration, read once at startup.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub host: String,
    pub port: u16,
    /// Path of the ONNX pipeline artifact.
    pub model_path: String,
    /// Maximum number of simultaneous inference calls; 1 serializes them.
    pub inference_concurrency: usize,
    pub rate_limit_per_second: u64,
    pub rate_limit_burst: u32,
    pub max_body_bytes: usize,
}

fn default_concurrency() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self {
            host: std::env::var("HOST")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| "0.0.0.0".to_string()),
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8000".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number between 1-65535"))?,
            model_path: std::env::var("MODEL_PATH")
                .or_else(|_| Ok::<_, anyhow::Error>("models/model.onnx".to_string()))
                .and_then(|path| {
                    if path.trim().is_empty() {
                        anyhow::bail!("MODEL_PATH cannot be empty");
                    }
                    Ok(path)
                })?,
            inference_concurrency: match std::env::var("INFERENCE_CONCURRENCY") {
                Ok(raw) => raw
                    .parse::<usize>()
                    .ok()
                    .filter(|n| *n >= 1)
                    .ok_or_else(|| {
                        anyhow::anyhow!("INFERENCE_CONCURRENCY must be a positive integer")
                    })?,
                Err(_) => default_concurrency(),
            },
            rate_limit_per_second: std::env::var("RATE_LIMIT_PER_SECOND")
                .unwrap_or_else(|_| "10".to_string())
                .parse()
                .ok()
                .filter(|n| *n >= 1)
                .ok_or_else(|| anyhow::anyhow!("RATE_LIMIT_PER_SECOND must be a positive integer"))?,
            rate_limit_burst: std::env::var("RATE_LIMIT_BURST")
                .unwrap_or_else(|_| "20".to_string())
                .parse()
                .ok()
                .filter(|n| *n >= 1)
                .ok_or_else(|| anyhow::anyhow!("RATE_LIMIT_BURST must be a positive integer"))?,
            max_body_bytes: std::env::var("MAX_BODY_BYTES")
                .unwrap_or_else(|_| "65536".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("MAX_BODY_BYTES must be a number of bytes"))?,
        };

        tracing::info!("Configuration loaded successfully");
        tracing::debug!("Model path: {}", config.model_path);
        tracing::debug!("Inference concurrency: {}", config.inference_concurrency);
        tracing::debug!(
            "Rate limit: {}/s, burst {}",
            config.rate_limit_per_second,
            config.rate_limit_burst
        );
        tracing::debug!("Server address: {}:{}", config.host, config.port);

        Ok(config)
    }

    /// Interval in milliseconds after which one request quota is restored.
    pub fn replenish_period_ms(&self) -> u64 {
        (1000 / self.rate_limit_per_second.max(1)).max(1)
    }

    /// Configuration for tests and tools that never bind a socket.
    pub fn for_model(model_path: impl Into<String>) -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
            model_path: model_path.into(),
            inference_concurrency: default_concurrency(),
            rate_limit_per_second: 10,
            rate_limit_burst: 20,
            max_body_bytes: 65536,
        }
    }
}

/// Settings of the form client.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub api_url: String,
}

impl ClientConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let api_url = std::env::var("PREDICT_API_URL")
            .unwrap_or_else(|_| "http://127.0.0.1:8000".to_string());
        if api_url.trim().is_empty() {
            anyhow::bail!("PREDICT_API_URL cannot be empty");
        }
        let parsed = url::Url::parse(&api_url)
            .map_err(|e| anyhow::anyhow!("PREDICT_API_URL is not a valid URL: {}", e))?;
        if parsed.scheme() != "http" && parsed.scheme() != "https" {
            anyhow::bail!("PREDICT_API_URL must start with http:// or https://");
        }

        Ok(Self {
            api_url: api_url.trim_end_matches('/').to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_replenish_period_follows_rate() {
        let mut config = Config::for_model("models/model.onnx");
        config.rate_limit_per_second = 10;
        assert_eq!(config.replenish_period_ms(), 100);

        config.rate_limit_per_second = 1;
        assert_eq!(config.replenish_period_ms(), 1000);

        config.rate_limit_per_second = 2000;
        assert_eq!(config.replenish_period_ms(), 1);
    }
}
