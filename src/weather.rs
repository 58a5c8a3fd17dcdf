use std::fmt;

use anyhow::Context;
use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::config::WeatherConfig;

/// Current conditions for one city, ready to be shown to a user.
#[derive(Debug, Clone, PartialEq)]
pub struct WeatherReport {
    /// The city as the user typed it (trimmed), not the provider's canonical name.
    pub city: String,
    pub temperature_c: f64,
    pub description: String,
}

impl fmt::Display for WeatherReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "🌤 В городе {} сейчас {:.1}°C, {}.",
            self.city, self.temperature_c, self.description
        )
    }
}

#[derive(Debug, Error)]
pub enum WeatherError {
    /// DNS, connect, timeout or body read failure.
    #[error("ошибка запроса к API: {0}")]
    Request(String),

    /// The provider answered with a non-success status; `body` is passed through untouched.
    #[error("город не найден или ошибка API: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },

    /// Success status, but the payload lacks the fields we need.
    #[error("ошибка получения данных о погоде")]
    Data { reason: String },
}

impl WeatherError {
    fn transport(err: reqwest::Error) -> Self {
        // The URL carries the API key
        let err = err.without_url();
        let mut message = err.to_string();
        let mut source = std::error::Error::source(&err);
        while let Some(cause) = source {
            message.push_str(": ");
            message.push_str(&cause.to_string());
            source = cause.source();
        }
        WeatherError::Request(message)
    }

    /// Log-only detail that the user-facing message leaves out.
    pub fn detail(&self) -> String {
        match self {
            WeatherError::Request(message) => message.clone(),
            WeatherError::Status { status, .. } => format!("provider returned {}", status),
            WeatherError::Data { reason } => reason.clone(),
        }
    }

    fn data(reason: impl Into<String>) -> Self {
        WeatherError::Data {
            reason: reason.into(),
        }
    }
}

#[async_trait]
pub trait WeatherLookup: Send + Sync {
    async fn lookup(&self, city: &str) -> Result<WeatherReport, WeatherError>;
}

#[derive(Debug, Deserialize)]
struct MainBlock {
    temp: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct Condition {
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CurrentWeather {
    main: Option<MainBlock>,
    /// Only the first entry is read; later entries stay untyped.
    weather: Option<Vec<serde_json::Value>>,
}

fn parse_report(city: &str, body: &str) -> Result<WeatherReport, WeatherError> {
    let parsed: CurrentWeather = serde_json::from_str(body)
        .map_err(|e| WeatherError::data(format!("invalid JSON: {}", e)))?;

    let temperature_c = parsed
        .main
        .and_then(|m| m.temp)
        .ok_or_else(|| WeatherError::data("missing main.temp"))?;

    let first = parsed
        .weather
        .and_then(|w| w.into_iter().next())
        .ok_or_else(|| WeatherError::data("missing weather[0]"))?;

    let description = Condition::deserialize(first)
        .map_err(|e| WeatherError::data(format!("invalid weather[0]: {}", e)))?
        .description
        .ok_or_else(|| WeatherError::data("missing weather[0].description"))?;

    Ok(WeatherReport {
        city: city.to_string(),
        temperature_c,
        description,
    })
}

/// OpenWeather current-conditions client.
pub struct WeatherClient {
    client: reqwest::Client,
    config: WeatherConfig,
}

impl WeatherClient {
    pub fn new(config: WeatherConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .context("Failed to build weather HTTP client")?;
        Ok(Self { client, config })
    }
}

#[async_trait]
impl WeatherLookup for WeatherClient {
    async fn lookup(&self, city: &str) -> Result<WeatherReport, WeatherError> {
        let url = self.config.endpoint();

        debug!("Requesting current weather for {:?} from {}", city, url);

        let response = self
            .client
            .get(&url)
            .query(&[
                ("q", city),
                ("appid", self.config.api_key.as_str()),
                ("units", self.config.units.as_str()),
                ("lang", self.config.lang.as_str()),
            ])
            .send()
            .await
            .map_err(WeatherError::transport)?;

        let status = response.status();
        let body = response.text().await.map_err(WeatherError::transport)?;

        if !status.is_success() {
            return Err(WeatherError::Status { status, body });
        }

        parse_report(city, &body)
    }
}
