use std::sync::Arc;

use tracing::{info, warn};

use crate::platform::IncomingMessage;
use crate::weather::WeatherLookup;

pub const GREETING: &str = "👋 Привет! Хочешь узнать погоду?";
pub const ASK_CITY: &str = "🌍 Введите название города:";
pub const DISMISS: &str = "Хорошо! Обращайся, если передумаешь 🙂";
pub const YES: &str = "Да";
pub const NO: &str = "Нет";

const ERROR_MARKER: &str = "❗";

/// What the user asked for. Matching is exact; only the city is trimmed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command<'a> {
    Start,
    Yes,
    No,
    /// Anything else is taken as a city name, whatever was said before.
    City(&'a str),
}

impl<'a> Command<'a> {
    pub fn parse(text: &'a str) -> Self {
        match text {
            "/start" => Command::Start,
            YES => Command::Yes,
            NO => Command::No,
            other => Command::City(other.trim()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyKeyboard {
    YesNo,
}

impl ReplyKeyboard {
    /// Button labels, row by row
    pub fn rows(self) -> Vec<Vec<&'static str>> {
        match self {
            ReplyKeyboard::YesNo => vec![vec![YES, NO]],
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    pub text: String,
    pub keyboard: Option<ReplyKeyboard>,
}

impl Reply {
    fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            keyboard: None,
        }
    }
}

/// Turns one incoming message into exactly one reply.
/// Platform-agnostic; holds no per-chat state.
pub struct WeatherBot {
    weather: Arc<dyn WeatherLookup>,
}

impl WeatherBot {
    pub fn new(weather: Arc<dyn WeatherLookup>) -> Self {
        Self { weather }
    }

    pub async fn process_message(&self, incoming: &IncomingMessage) -> Reply {
        match Command::parse(&incoming.text) {
            Command::Start => Reply {
                text: GREETING.to_string(),
                keyboard: Some(ReplyKeyboard::YesNo),
            },
            Command::Yes => Reply::text(ASK_CITY),
            Command::No => Reply::text(DISMISS),
            Command::City(city) => match self.weather.lookup(city).await {
                Ok(report) => {
                    info!(
                        "Weather for {:?} requested by {} (chat {}): {:.1}°C",
                        city, incoming.user_name, incoming.chat_id, report.temperature_c
                    );
                    Reply::text(report.to_string())
                }
                Err(e) => {
                    warn!(
                        "Weather lookup for {:?} requested by {} (chat {}) failed: {}",
                        city,
                        incoming.user_name,
                        incoming.chat_id,
                        e.detail()
                    );
                    Reply::text(format!("{} {}", ERROR_MARKER, e))
                }
            },
        }
    }
}
