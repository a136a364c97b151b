use crate::config::ImageApiSettings;
use crate::error::{Result, VideoError};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::{info, warn};

/// Appended to every prompt for the children's story look.
pub const KIDS_STYLE: &str = "children's book illustration style, cute and friendly, \
soft pastel colors, whimsical, age-appropriate for toddlers, \
warm lighting, safe and comforting atmosphere, \
pixar style, dreamworks animation style, high quality";

pub const KIDS_NEGATIVE_PROMPT: &str =
    "scary, dark, violence, blood, horror, adult content, nsfw, realistic, photo";

const DEFAULT_LOADING_ESTIMATE: f64 = 20.0;

/// Fixed-count retries with fixed or server-supplied waits.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    /// Upper bound on the wait the server suggests while the model loads.
    pub loading_wait_cap: Duration,
    pub rate_limit_wait: Duration,
    pub error_wait: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            loading_wait_cap: Duration::from_secs(60),
            rate_limit_wait: Duration::from_secs(30),
            error_wait: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    /// No sleeping between attempts.
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            loading_wait_cap: Duration::ZERO,
            rate_limit_wait: Duration::ZERO,
            error_wait: Duration::ZERO,
        }
    }

    fn loading_wait(&self, estimated_secs: f64) -> Duration {
        let estimate = Duration::try_from_secs_f64(estimated_secs.max(0.0))
            .unwrap_or(self.loading_wait_cap);
        estimate.min(self.loading_wait_cap)
    }
}

#[derive(Debug, Serialize)]
struct GenerationRequest<'a> {
    inputs: String,
    parameters: GenerationParameters<'a>,
}

#[derive(Debug, Serialize)]
struct GenerationParameters<'a> {
    negative_prompt: &'a str,
    guidance_scale: f64,
    num_inference_steps: u32,
}

#[derive(Debug, Deserialize)]
struct LoadingResponse {
    estimated_time: Option<f64>,
}

/// Text-to-image client for a hosted inference endpoint.
#[derive(Debug, Clone)]
pub struct ImageClient {
    client: Client,
    endpoint: String,
    token: Option<String>,
    style: String,
    negative_prompt: String,
    retry: RetryPolicy,
}

impl ImageClient {
    pub fn new(settings: &ImageApiSettings) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(120))
            .build()?;

        Ok(Self {
            client,
            endpoint: format!(
                "{}/{}",
                settings.base_url.trim_end_matches('/'),
                settings.model
            ),
            token: settings.token.clone(),
            style: KIDS_STYLE.to_string(),
            negative_prompt: KIDS_NEGATIVE_PROMPT.to_string(),
            retry: RetryPolicy::default(),
        })
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_style(mut self, style: impl Into<String>, negative_prompt: impl Into<String>) -> Self {
        self.style = style.into();
        self.negative_prompt = negative_prompt.into();
        self
    }

    pub fn has_token(&self) -> bool {
        self.token.is_some()
    }

    fn full_prompt(&self, prompt: &str) -> String {
        if self.style.is_empty() {
            prompt.to_string()
        } else {
            format!("{}, {}", prompt, self.style)
        }
    }

    /// Generates an image for `prompt` and writes it to `output_path`.
    ///
    /// 503 (model loading) and 429 (rate limited) are retried after a wait,
    /// transport errors after a short pause; any other status fails at once.
    pub async fn generate_image(&self, prompt: &str, output_path: &Path) -> Result<()> {
        let body = GenerationRequest {
            inputs: self.full_prompt(prompt),
            parameters: GenerationParameters {
                negative_prompt: &self.negative_prompt,
                guidance_scale: 7.5,
                num_inference_steps: 30,
            },
        };

        for attempt in 1..=self.retry.max_attempts {
            let mut request = self.client.post(&self.endpoint).json(&body);
            if let Some(token) = &self.token {
                request = request.header("Authorization", format!("Bearer {}", token));
            }

            let response = match request.send().await {
                Ok(response) => response,
                Err(e) => {
                    warn!(
                        "Image API request failed (attempt {}/{}): {}",
                        attempt, self.retry.max_attempts, e
                    );
                    if attempt < self.retry.max_attempts {
                        tokio::time::sleep(self.retry.error_wait).await;
                        continue;
                    }
                    return Err(e.into());
                }
            };

            match response.status() {
                StatusCode::OK => match save_image(response, output_path).await {
                    Ok(()) => {
                        info!("Image saved to: {}", output_path.display());
                        return Ok(());
                    }
                    Err(e) => {
                        warn!(
                            "Unusable image body (attempt {}/{}): {}",
                            attempt, self.retry.max_attempts, e
                        );
                        if attempt < self.retry.max_attempts {
                            tokio::time::sleep(self.retry.error_wait).await;
                            continue;
                        }
                        return Err(e);
                    }
                },
                StatusCode::SERVICE_UNAVAILABLE => {
                    let estimate = response
                        .json::<LoadingResponse>()
                        .await
                        .ok()
                        .and_then(|r| r.estimated_time)
                        .unwrap_or(DEFAULT_LOADING_ESTIMATE);
                    let wait = self.retry.loading_wait(estimate);
                    info!("Model loading, waiting {:.0}s...", wait.as_secs_f64());
                    tokio::time::sleep(wait).await;
                }
                StatusCode::TOO_MANY_REQUESTS => {
                    info!(
                        "Rate limited, waiting {:.0}s...",
                        self.retry.rate_limit_wait.as_secs_f64()
                    );
                    tokio::time::sleep(self.retry.rate_limit_wait).await;
                }
                status => {
                    let error_text = response.text().await.unwrap_or_default();
                    return Err(VideoError::Api(format!(
                        "Image generation API error {}: {}",
                        status, error_text
                    )));
                }
            }
        }

        Err(VideoError::Api(format!(
            "Image generation gave up after {} attempts",
            self.retry.max_attempts
        )))
    }
}

async fn save_image(response: reqwest::Response, output_path: &Path) -> Result<()> {
    let bytes = response.bytes().await?;
    let image = image::load_from_memory(&bytes)?;
    image.save(output_path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_loading_wait_is_capped() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.loading_wait(12.5), Duration::from_millis(12_500));
        assert_eq!(policy.loading_wait(400.0), Duration::from_secs(60));
        assert_eq!(policy.loading_wait(-3.0), Duration::ZERO);
    }

    #[test]
    fn test_prompt_gets_style_suffix() {
        let client = ImageClient::new(&ImageApiSettings::default()).unwrap();
        let prompt = client.full_prompt("A tiny star");
        assert!(prompt.starts_with("A tiny star, children's book illustration style"));

        let plain = client.with_style("", "");
        assert_eq!(plain.full_prompt("A tiny star"), "A tiny star");
    }

    #[test]
    fn test_endpoint_joins_model() {
        let settings = ImageApiSettings {
            base_url: "http://localhost:1234/models/".to_string(),
            model: "org/model".to_string(),
            token: None,
        };
        let client = ImageClient::new(&settings).unwrap();
        assert_eq!(client.endpoint, "http://localhost:1234/models/org/model");
        assert!(!client.has_token());
    }
}
