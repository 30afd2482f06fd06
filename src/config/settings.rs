//! Environment-driven service settings.

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;
use url::Url;

use super::PHOTO_COUNT;
use crate::signing::DEFAULT_TOKEN_TTL;

const DEFAULT_SITE_URL: &str = "https://next-level-form.onrender.com";
const DEFAULT_PORT: u16 = 8080;
const DEFAULT_SHORT_DELAY_SECS: u64 = 60 * 60;
const DEFAULT_LONG_DELAY_SECS: u64 = 24 * 60 * 60;

const DEFAULT_PHOTOS: [&str; PHOTO_COUNT] = [
    "photo_2025-08-23_23-07-59.jpg",
    "photo_2025-08-23_23-08-29.jpg",
    "photo_2025-08-23_23-59-13.jpg",
    "photo_2025-08-24_00-00-54.jpg",
    "photo_2025-08-24_00-01-43.jpg",
];

const PHOTO_VARS: [&str; PHOTO_COUNT] = [
    "FUNNEL_PHOTO1",
    "FUNNEL_PHOTO2",
    "FUNNEL_PHOTO3",
    "FUNNEL_PHOTO4",
    "FUNNEL_PHOTO5",
];

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(&'static str),

    #[error("Invalid URL in {var}: {source}")]
    InvalidUrl {
        var: &'static str,
        #[source]
        source: url::ParseError,
    },

    #[error("Invalid number in {var}: {value:?}")]
    InvalidNumber { var: &'static str, value: String },
}

/// Delays of the two reminder slots, both measured from funnel entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReminderTiming {
    /// Delay of the short-delay reminder.
    pub short_delay: Duration,

    /// Delay of the long-delay reminder.
    pub long_delay: Duration,
}

impl Default for ReminderTiming {
    fn default() -> Self {
        Self {
            short_delay: Duration::from_secs(DEFAULT_SHORT_DELAY_SECS),
            long_delay: Duration::from_secs(DEFAULT_LONG_DELAY_SECS),
        }
    }
}

/// Everything the service reads from its environment.
#[derive(Debug)]
pub struct FunnelSettings {
    /// Bot API token (`FUNNEL_BOT_TOKEN`).
    pub bot_token: SecretString,

    /// Secret shared with the form backend (`FUNNEL_SIGNING_SECRET`).
    pub signing_secret: SecretString,

    /// Destination site with the form (`SITE_URL`).
    pub site_url: Url,

    /// Public URL of this service, enables `/go` links (`FUNNEL_BASE_URL`).
    pub base_url: Option<Url>,

    /// Raw photo sources for messages 1..5 (`FUNNEL_PHOTO1`..`FUNNEL_PHOTO5`).
    pub photos: [String; PHOTO_COUNT],

    /// Directory relative photo paths are resolved against (`FUNNEL_ASSETS_DIR`).
    pub assets_dir: PathBuf,

    /// HTTP listening port (`PORT`).
    pub port: u16,

    /// Reminder delays (`FUNNEL_SHORT_DELAY_SECS`, `FUNNEL_LONG_DELAY_SECS`).
    pub timing: ReminderTiming,

    /// Tracking token validity (`FUNNEL_TOKEN_TTL_SECS`).
    pub token_ttl: Duration,
}

impl FunnelSettings {
    /// Creates settings from process environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if the bot token or signing secret is missing, or if
    /// any URL or number is malformed.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Creates settings from an arbitrary variable lookup.
    ///
    /// Empty values are treated as unset.
    ///
    /// # Errors
    ///
    /// See [`FunnelSettings::from_env`].
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let bot_token = get("FUNNEL_BOT_TOKEN")
            .map(SecretString::from)
            .ok_or(ConfigError::MissingEnvVar("FUNNEL_BOT_TOKEN"))?;

        let signing_secret = get("FUNNEL_SIGNING_SECRET")
            .map(SecretString::from)
            .ok_or(ConfigError::MissingEnvVar("FUNNEL_SIGNING_SECRET"))?;

        let site_url = parse_url(
            "SITE_URL",
            &get("SITE_URL").unwrap_or_else(|| DEFAULT_SITE_URL.to_owned()),
        )?;

        let base_url = get("FUNNEL_BASE_URL")
            .map(|raw| parse_url("FUNNEL_BASE_URL", raw.trim_end_matches('/')))
            .transpose()?;

        let photos = std::array::from_fn(|i| {
            get(PHOTO_VARS[i]).unwrap_or_else(|| DEFAULT_PHOTOS[i].to_owned())
        });

        let assets_dir = get("FUNNEL_ASSETS_DIR").map_or_else(|| PathBuf::from("."), PathBuf::from);

        let port = parse_number("PORT", get("PORT"), DEFAULT_PORT)?;

        let timing = ReminderTiming {
            short_delay: Duration::from_secs(parse_number(
                "FUNNEL_SHORT_DELAY_SECS",
                get("FUNNEL_SHORT_DELAY_SECS"),
                DEFAULT_SHORT_DELAY_SECS,
            )?),
            long_delay: Duration::from_secs(parse_number(
                "FUNNEL_LONG_DELAY_SECS",
                get("FUNNEL_LONG_DELAY_SECS"),
                DEFAULT_LONG_DELAY_SECS,
            )?),
        };

        let token_ttl = Duration::from_secs(parse_number(
            "FUNNEL_TOKEN_TTL_SECS",
            get("FUNNEL_TOKEN_TTL_SECS"),
            DEFAULT_TOKEN_TTL.as_secs(),
        )?);

        Ok(Self {
            bot_token,
            signing_secret,
            site_url,
            base_url,
            photos,
            assets_dir,
            port,
            timing,
            token_ttl,
        })
    }
}

fn parse_url(var: &'static str, raw: &str) -> Result<Url, ConfigError> {
    Url::parse(raw.trim()).map_err(|source| ConfigError::InvalidUrl { var, source })
}

fn parse_number<T: std::str::FromStr>(
    var: &'static str,
    raw: Option<String>,
    default: T,
) -> Result<T, ConfigError> {
    match raw {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidNumber { var, value }),
    }
}
