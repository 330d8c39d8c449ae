use crate::config::Config;
use anyhow::{Result, anyhow};
use async_trait::async_trait;
use bytes::Bytes;
use std::sync::Arc;

/// Trait for the external asynchronous document processing service.
///
/// The service exposes no callback channel; its HTTP response is the
/// job's only outcome signal.
#[async_trait]
pub trait ProcessingService: Send + Sync {
    /// Submit a file for out-of-band processing. Ok on a 2xx response,
    /// Err on any other status or transport failure.
    async fn process(&self, file_id: &str, file_name: &str, bytes: Bytes) -> Result<()>;

    /// Ask the service to release server-side state tied to a deleted
    /// file. Callers treat failures as log-only.
    async fn release(&self, file_id: &str) -> Result<()>;

    /// Check if the service is reachable/healthy
    async fn health_check(&self) -> bool;
}

/// PageIndex document processor invoked over HTTP
pub struct PageIndexClient {
    client: reqwest::Client,
    base_url: String,
    bot_id: String,
}

impl PageIndexClient {
    pub fn new(base_url: &str, bot_id: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            bot_id: bot_id.to_string(),
        }
    }
}

#[async_trait]
impl ProcessingService for PageIndexClient {
    async fn process(&self, file_id: &str, file_name: &str, bytes: Bytes) -> Result<()> {
        let part = reqwest::multipart::Part::bytes(bytes.to_vec()).file_name(file_name.to_string());
        let form = reqwest::multipart::Form::new()
            .part("file", part)
            .text("file_id", file_id.to_string())
            .text("bot_id", self.bot_id.clone())
            .text("file_type", "document");

        let response = self
            .client
            .post(format!("{}/upload_file_pageindex", self.base_url))
            .multipart(form)
            .send()
            .await
            .map_err(|e| anyhow!("processing request for {} failed in transit: {}", file_id, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(anyhow!(
                "processing service returned {} for {}",
                status,
                file_id
            ));
        }

        tracing::debug!("Processing service accepted {}", file_id);
        Ok(())
    }

    async fn release(&self, file_id: &str) -> Result<()> {
        let response = self
            .client
            .post(format!("{}/remove_file_pageindex", self.base_url))
            .form(&[("file_id", file_id)])
            .send()
            .await
            .map_err(|e| anyhow!("release request for {} failed in transit: {}", file_id, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(anyhow!("release returned {} for {}", status, file_id));
        }
        Ok(())
    }

    async fn health_check(&self) -> bool {
        self.client.get(self.base_url.as_str()).send().await.is_ok()
    }
}

/// No-op processor for development/testing
pub struct NoOpProcessor;

#[async_trait]
impl ProcessingService for NoOpProcessor {
    async fn process(&self, file_id: &str, _file_name: &str, _bytes: Bytes) -> Result<()> {
        tracing::warn!(
            "NoOpProcessor: skipping remote processing for {} (development mode)",
            file_id
        );
        Ok(())
    }

    async fn release(&self, _file_id: &str) -> Result<()> {
        Ok(())
    }

    async fn health_check(&self) -> bool {
        true
    }
}

/// Processor that always fails (for testing)
#[cfg(test)]
pub struct FailingProcessor;

#[cfg(test)]
#[async_trait]
impl ProcessingService for FailingProcessor {
    async fn process(&self, file_id: &str, _file_name: &str, _bytes: Bytes) -> Result<()> {
        Err(anyhow!("simulated processing failure for {}", file_id))
    }

    async fn release(&self, file_id: &str) -> Result<()> {
        Err(anyhow!("simulated release failure for {}", file_id))
    }

    async fn health_check(&self) -> bool {
        false
    }
}

/// Factory function to create the appropriate processor based on config
pub fn create_processor(config: &Config) -> Arc<dyn ProcessingService> {
    match config.processor_type.to_lowercase().as_str() {
        "pageindex" => Arc::new(PageIndexClient::new(
            &config.processing_base_url,
            &config.processing_bot_id,
        )),
        "noop" | "none" | "disabled" => Arc::new(NoOpProcessor),
        other => {
            tracing::warn!("Unknown processor type '{}', using NoOpProcessor", other);
            Arc::new(NoOpProcessor)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_noop_processor() {
        let processor = NoOpProcessor;
        processor
            .process("1-test.pdf", "test.pdf", Bytes::from_static(b"data"))
            .await
            .unwrap();
        processor.release("1-test.pdf").await.unwrap();
        assert!(processor.health_check().await);
    }

    #[tokio::test]
    async fn test_failing_processor() {
        let processor = FailingProcessor;
        assert!(
            processor
                .process("1-test.pdf", "test.pdf", Bytes::from_static(b"data"))
                .await
                .is_err()
        );
        assert!(!processor.health_check().await);
    }

    #[tokio::test]
    async fn test_create_processor() {
        let processor = create_processor(&Config::development());
        assert!(processor.health_check().await);

        let config = Config {
            processor_type: "disabled".to_string(),
            ..Config::default()
        };
        let processor = create_processor(&config);
        assert!(processor.health_check().await);
    }
}
