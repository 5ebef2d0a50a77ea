//! Configuration loading and management

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{anyhow, Result};

use crate::intent::{EntityKind, EntityThresholds, DEFAULT_THRESHOLD};

/// Wake phrase used when none is configured
pub const DEFAULT_WAKE_PHRASE: &str = "hey robot";

/// Common recognizer renderings of the default wake phrase
pub const DEFAULT_WAKE_VARIANTS: [&str; 7] = [
    "hay robot",
    "hey robat",
    "hey robert",
    "hey robo",
    "hai robot",
    "he robot",
    "hi robot",
];

/// Agent configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory holding `campus.json`, `campus_map.json` and `logs/`
    pub data_dir: PathBuf,

    pub wake_phrase: String,
    /// Accepted alternative spellings of the wake phrase
    pub wake_variants: Vec<String>,
    pub wake_threshold: u8,

    /// Entity acceptance thresholds, global and per kind
    pub thresholds: EntityThresholds,

    /// How long Listening waits for the request
    pub listen_timeout: Duration,
    pub queue_capacity: usize,
    /// Capture stays deaf this long after output stops
    pub post_output_drain: Duration,
    /// Pause after an error apology before returning to Idle
    pub error_cooldown: Duration,

    /// Map node every route starts from
    pub default_origin: String,

    /// External recognizer command line
    pub stt_command: Option<String>,
    /// External synthesizer command line
    pub tts_command: Option<String>,

    pub capture_max_retries: u32,
    pub capture_retry_interval: Duration,

    /// Recognitions below this confidence go to the tuning log
    pub low_confidence: f32,

    /// Speak a greeting at boot and a farewell at shutdown
    pub announce: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            wake_phrase: DEFAULT_WAKE_PHRASE.to_string(),
            wake_variants: DEFAULT_WAKE_VARIANTS.iter().map(|v| v.to_string()).collect(),
            wake_threshold: 80,
            thresholds: EntityThresholds::uniform(DEFAULT_THRESHOLD),
            listen_timeout: Duration::from_millis(5000),
            queue_capacity: 10,
            post_output_drain: Duration::from_millis(300),
            error_cooldown: Duration::from_millis(1000),
            default_origin: "main_gate".to_string(),
            stt_command: None,
            tts_command: None,
            capture_max_retries: 3,
            capture_retry_interval: Duration::from_millis(1000),
            low_confidence: 0.5,
            announce: true,
        }
    }
}

impl Config {
    /// Load configuration from environment and defaults
    pub fn load() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; unset keys keep their defaults
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let wake_phrase = get("KIOSK_WAKE_PHRASE").unwrap_or(defaults.wake_phrase.clone());
        let wake_variants = if wake_phrase.eq_ignore_ascii_case(DEFAULT_WAKE_PHRASE) {
            defaults.wake_variants.clone()
        } else {
            Vec::new()
        };

        let mut thresholds = EntityThresholds::uniform(parse_percent(
            "KIOSK_FUZZY_THRESHOLD",
            get("KIOSK_FUZZY_THRESHOLD"),
            defaults.thresholds.default,
        )?);
        for kind in EntityKind::ALL {
            let key = format!("KIOSK_THRESHOLD_{}", kind.key().to_uppercase());
            if let Some(value) = get(&key) {
                let threshold = parse_percent(&key, Some(value), thresholds.default)?;
                thresholds.overrides.insert(kind, threshold);
            }
        }

        let low_confidence: f32 = parse("KIOSK_LOW_CONFIDENCE", get("KIOSK_LOW_CONFIDENCE"), defaults.low_confidence)?;
        if !(0.0..=1.0).contains(&low_confidence) {
            return Err(anyhow!("invalid value for KIOSK_LOW_CONFIDENCE: {low_confidence} (expected 0.0 to 1.0)"));
        }

        Ok(Self {
            data_dir: get("KIOSK_DATA_DIR").map(PathBuf::from).unwrap_or(defaults.data_dir),
            wake_phrase,
            wake_variants,
            wake_threshold: parse_percent("KIOSK_WAKE_THRESHOLD", get("KIOSK_WAKE_THRESHOLD"), defaults.wake_threshold)?,
            thresholds,
            listen_timeout: parse_millis("KIOSK_LISTEN_TIMEOUT_MS", get("KIOSK_LISTEN_TIMEOUT_MS"), defaults.listen_timeout)?,
            queue_capacity: parse("KIOSK_QUEUE_CAPACITY", get("KIOSK_QUEUE_CAPACITY"), defaults.queue_capacity)?,
            post_output_drain: parse_millis("KIOSK_POST_OUTPUT_DRAIN_MS", get("KIOSK_POST_OUTPUT_DRAIN_MS"), defaults.post_output_drain)?,
            error_cooldown: parse_millis("KIOSK_ERROR_COOLDOWN_MS", get("KIOSK_ERROR_COOLDOWN_MS"), defaults.error_cooldown)?,
            default_origin: get("KIOSK_DEFAULT_ORIGIN").unwrap_or(defaults.default_origin),
            stt_command: get("KIOSK_STT_COMMAND"),
            tts_command: get("KIOSK_TTS_COMMAND"),
            capture_max_retries: parse("KIOSK_CAPTURE_MAX_RETRIES", get("KIOSK_CAPTURE_MAX_RETRIES"), defaults.capture_max_retries)?,
            capture_retry_interval: parse_millis("KIOSK_CAPTURE_RETRY_MS", get("KIOSK_CAPTURE_RETRY_MS"), defaults.capture_retry_interval)?,
            low_confidence,
            announce: parse("KIOSK_ANNOUNCE", get("KIOSK_ANNOUNCE"), defaults.announce)?,
        })
    }

    pub fn campus_path(&self) -> PathBuf {
        self.data_dir.join("campus.json")
    }

    pub fn map_path(&self) -> PathBuf {
        self.data_dir.join("campus_map.json")
    }

    pub fn log_dir(&self) -> PathBuf {
        self.data_dir.join("logs")
    }

    pub fn low_confidence_log(&self) -> PathBuf {
        self.log_dir().join("low_confidence.jsonl")
    }

    /// Ensure the log directory exists
    pub fn ensure_dirs(&self) -> Result<()> {
        std::fs::create_dir_all(self.log_dir())?;
        Ok(())
    }
}

fn parse<T>(key: &str, value: Option<String>, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match value {
        None => Ok(default),
        Some(raw) => raw
            .parse()
            .map_err(|e| anyhow!("invalid value for {key}: {raw:?} ({e})")),
    }
}

fn parse_millis(key: &str, value: Option<String>, default: Duration) -> Result<Duration> {
    let ms: u64 = parse(key, value, default.as_millis() as u64)?;
    Ok(Duration::from_millis(ms))
}

fn parse_percent(key: &str, value: Option<String>, default: u8) -> Result<u8> {
    let pct: u8 = parse(key, value, default)?;
    if pct > 100 {
        return Err(anyhow!("invalid value for {key}: {pct} (expected 0 to 100)"));
    }
    Ok(pct)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<Config> {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| env.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.wake_phrase, "hey robot");
        assert_eq!(config.wake_variants.len(), 7);
        assert_eq!(config.thresholds.default, 70);
        assert_eq!(config.listen_timeout, Duration::from_secs(5));
        assert_eq!(config.queue_capacity, 10);
        assert_eq!(config.default_origin, "main_gate");
        assert_eq!(config.campus_path(), PathBuf::from("data/campus.json"));
        assert!(config.stt_command.is_none());
    }

    #[test]
    fn test_overrides() {
        let config = config_from(&[
            ("KIOSK_DATA_DIR", "/srv/kiosk"),
            ("KIOSK_FUZZY_THRESHOLD", "75"),
            ("KIOSK_THRESHOLD_ROLL_NUMBER", "90"),
            ("KIOSK_LISTEN_TIMEOUT_MS", "8000"),
            ("KIOSK_TTS_COMMAND", "espeak-ng -s 150"),
            ("KIOSK_ANNOUNCE", "false"),
        ])
        .unwrap();

        assert_eq!(config.map_path(), PathBuf::from("/srv/kiosk/campus_map.json"));
        assert_eq!(config.thresholds.for_kind(EntityKind::Location), 75);
        assert_eq!(config.thresholds.for_kind(EntityKind::RollNumber), 90);
        assert_eq!(config.listen_timeout, Duration::from_secs(8));
        assert_eq!(config.tts_command.as_deref(), Some("espeak-ng -s 150"));
        assert!(!config.announce);
    }

    #[test]
    fn test_custom_wake_phrase_drops_variants() {
        let config = config_from(&[("KIOSK_WAKE_PHRASE", "hello kiosk")]).unwrap();
        assert_eq!(config.wake_phrase, "hello kiosk");
        assert!(config.wake_variants.is_empty());
    }

    #[test]
    fn test_malformed_values_name_the_key() {
        let err = config_from(&[("KIOSK_QUEUE_CAPACITY", "lots")]).unwrap_err();
        assert!(err.to_string().contains("KIOSK_QUEUE_CAPACITY"));

        let err = config_from(&[("KIOSK_THRESHOLD_LOCATION", "150")]).unwrap_err();
        assert!(err.to_string().contains("KIOSK_THRESHOLD_LOCATION"));

        let err = config_from(&[("KIOSK_LOW_CONFIDENCE", "2")]).unwrap_err();
        assert!(err.to_string().contains("KIOSK_LOW_CONFIDENCE"));
    }

    #[test]
    fn test_ensure_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            data_dir: dir.path().to_path_buf(),
            ..Config::default()
        };
        config.ensure_dirs().unwrap();
        assert!(config.log_dir().is_dir());
    }
}
