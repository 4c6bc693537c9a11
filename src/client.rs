use crate::errors::ClientError;
use crate::models::{PredictionResponse, PropertyFeatures};
use std::time::Duration;

/// HTTP client the form application uses to reach `POST /predict`.
#[derive(Clone)]
pub struct PredictClient {
    client: reqwest::Client,
    base_url: String,
}

impl PredictClient {
    /// Creates a new `PredictClient`.
    ///
    /// # Arguments
    ///
    /// * `base_url` - Base URL of the prediction API, without the `/predict` path.
    pub fn new(base_url: impl Into<String>) -> Result<Self, ClientError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| ClientError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Requests a price estimate for one listing.
    ///
    /// # Returns
    ///
    /// * `Result<f64, ClientError>` - The predicted price, or the status and body of a
    ///   rejected request.
    pub async fn predict(&self, features: &PropertyFeatures) -> Result<f64, ClientError> {
        let url = format!("{}/predict", self.base_url);
        tracing::info!("Requesting prediction from {}", url);

        let response = self
            .client
            .post(&url)
            .json(features)
            .send()
            .await
            .map_err(|e| ClientError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ClientError::Rejected { status, body });
        }

        let body: PredictionResponse = response
            .json()
            .await
            .map_err(|e| ClientError::Decode(e.to_string()))?;

        tracing::info!("✓ Predicted price: {:.0}", body.predicted_price);
        Ok(body.predicted_price)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_client_creation() {
        let client = PredictClient::new("https://example.com/");
        assert!(client.is_ok());
        assert_eq!(client.unwrap().base_url, "https://example.com");
    }
}
