use anyhow::{Context, Result};
use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    pub telegram: TelegramConfig,
    pub weather: WeatherConfig,
}

#[derive(Debug, Clone)]
pub struct TelegramConfig {
    pub bot_token: String,
    /// Server-side wait for `getUpdates` long polling, in seconds.
    pub poll_timeout_secs: u64,
}

#[derive(Debug, Clone)]
pub struct WeatherConfig {
    pub api_key: String,
    pub base_url: String,
    pub lang: String,
    pub units: String,
    pub timeout_secs: u64,
}

impl TelegramConfig {
    pub fn poll_timeout(&self) -> Duration {
        Duration::from_secs(self.poll_timeout_secs)
    }
}

impl WeatherConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Current-conditions endpoint, tolerating a trailing slash in `base_url`.
    pub fn endpoint(&self) -> String {
        format!("{}/weather", self.base_url.trim_end_matches('/'))
    }
}

fn default_base_url() -> String {
    "https://api.openweathermap.org/data/2.5".to_string()
}

fn default_lang() -> String {
    "ru".to_string()
}

fn default_units() -> String {
    "metric".to_string()
}

fn default_weather_timeout_secs() -> u64 {
    10
}

fn default_poll_timeout_secs() -> u64 {
    60
}

impl Config {
    /// Read settings from the env file at `path`, with process variables taking precedence.
    /// The process environment itself is left untouched.
    pub fn load(path: &Path) -> Result<Self> {
        Self::load_with(path, |key| std::env::var(key).ok())
    }

    /// Like [`Config::load`], with `env` standing in for the process environment.
    pub fn load_with<E>(path: &Path, env: E) -> Result<Self>
    where
        E: Fn(&str) -> Option<String>,
    {
        let file_vars = dotenvy::from_path_iter(path)
            .and_then(|iter| iter.collect::<Result<HashMap<String, String>, _>>())
            .with_context(|| format!("Failed to load env file: {}", path.display()))?;

        Self::from_lookup(|key| env(key).or_else(|| file_vars.get(key).cloned()))
    }

    /// Build the config from an arbitrary variable source.
    pub fn from_lookup<F>(get: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let telegram = TelegramConfig {
            bot_token: required(&get, "BOT_TOKEN")?,
            poll_timeout_secs: parsed_or(&get, "POLL_TIMEOUT_SECS", default_poll_timeout_secs)?,
        };

        let weather = WeatherConfig {
            api_key: required(&get, "WEATHER_KEY")?,
            base_url: optional(&get, "WEATHER_API_URL").unwrap_or_else(default_base_url),
            lang: optional(&get, "WEATHER_LANG").unwrap_or_else(default_lang),
            units: optional(&get, "WEATHER_UNITS").unwrap_or_else(default_units),
            timeout_secs: parsed_or(&get, "WEATHER_TIMEOUT_SECS", default_weather_timeout_secs)?,
        };

        Ok(Config { telegram, weather })
    }
}

fn optional<F>(get: &F, key: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    get(key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn required<F>(get: &F, key: &str) -> Result<String>
where
    F: Fn(&str) -> Option<String>,
{
    optional(get, key).with_context(|| format!("Missing required setting {}", key))
}

fn parsed_or<F, T>(get: &F, key: &str, default: fn() -> T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match optional(get, key) {
        Some(raw) => raw
            .parse()
            .with_context(|| format!("Invalid value for {}: {:?}", key, raw)),
        None => Ok(default()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults_applied() {
        let config =
            Config::from_lookup(lookup(&[("BOT_TOKEN", "123:abc"), ("WEATHER_KEY", "key")]))
                .unwrap();

        assert_eq!(config.telegram.bot_token, "123:abc");
        assert_eq!(config.telegram.poll_timeout_secs, 60);
        assert_eq!(config.weather.api_key, "key");
        assert_eq!(config.weather.lang, "ru");
        assert_eq!(config.weather.units, "metric");
        assert_eq!(config.weather.timeout_secs, 10);
        assert_eq!(
            config.weather.endpoint(),
            "https://api.openweathermap.org/data/2.5/weather"
        );
    }

    #[test]
    fn test_missing_bot_token_is_error() {
        let err = Config::from_lookup(lookup(&[("WEATHER_KEY", "key")])).unwrap_err();
        assert!(err.to_string().contains("BOT_TOKEN"));
    }

    #[test]
    fn test_blank_weather_key_is_error() {
        let err = Config::from_lookup(lookup(&[("BOT_TOKEN", "t"), ("WEATHER_KEY", "   ")]))
            .unwrap_err();
        assert!(err.to_string().contains("WEATHER_KEY"));
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_lookup(lookup(&[
            ("BOT_TOKEN", "t"),
            ("WEATHER_KEY", "k"),
            ("WEATHER_API_URL", "http://localhost:8080/"),
            ("WEATHER_LANG", "en"),
            ("WEATHER_TIMEOUT_SECS", "3"),
            ("POLL_TIMEOUT_SECS", "30"),
        ]))
        .unwrap();

        assert_eq!(config.weather.endpoint(), "http://localhost:8080/weather");
        assert_eq!(config.weather.lang, "en");
        assert_eq!(config.weather.timeout(), Duration::from_secs(3));
        assert_eq!(config.telegram.poll_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_invalid_number_is_error() {
        let err = Config::from_lookup(lookup(&[
            ("BOT_TOKEN", "t"),
            ("WEATHER_KEY", "k"),
            ("POLL_TIMEOUT_SECS", "soon"),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("POLL_TIMEOUT_SECS"));
    }

    fn env_file(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_load_reads_env_file() {
        let file = env_file(
            "# credentials\n\
             BOT_TOKEN=123:file-token\n\
             WEATHER_KEY=\"file-key\"\n\
             WEATHER_LANG=en\n",
        );

        let config = Config::load_with(file.path(), |_| None).unwrap();

        assert_eq!(config.telegram.bot_token, "123:file-token");
        assert_eq!(config.weather.api_key, "file-key");
        assert_eq!(config.weather.lang, "en");
        assert_eq!(config.weather.units, "metric");
    }

    #[test]
    fn test_process_env_wins_over_env_file() {
        let file = env_file("BOT_TOKEN=file-token\nWEATHER_KEY=file-key\n");
        let env = lookup(&[("WEATHER_KEY", "env-key"), ("POLL_TIMEOUT_SECS", "5")]);

        let config = Config::load_with(file.path(), env).unwrap();

        assert_eq!(config.telegram.bot_token, "file-token");
        assert_eq!(config.weather.api_key, "env-key");
        assert_eq!(config.telegram.poll_timeout_secs, 5);
    }

    #[test]
    fn test_load_leaves_process_env_untouched() {
        let file = env_file("BOT_TOKEN=t\nWEATHER_KEY=k\nWEATHERBOT_TEST_ONLY_VAR=set\n");

        Config::load_with(file.path(), |_| None).unwrap();

        assert!(std::env::var("WEATHERBOT_TEST_ONLY_VAR").is_err());
    }

    #[test]
    fn test_missing_env_file_is_error() {
        let err = Config::load(Path::new("/nonexistent/weatherbot/.env")).unwrap_err();
        assert!(err.to_string().contains("Failed to load env file"));
    }
}
