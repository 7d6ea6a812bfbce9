use std::path::Path;

use anyhow::Context;

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, Timelike, Utc};

use serde::Serialize;

use uaparser::{Parser, UserAgentParser};

const UNKNOWN: &str = "unknown";

/// A site-local calendar day, expressed as a half-open UTC range
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayWindow {
    pub day: NaiveDate,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl DayWindow {
    /// The local day that `now` falls into
    pub fn containing(now: DateTime<Utc>, offset: FixedOffset) -> Self {
        let local = now.with_timezone(&offset);
        let since_midnight = Duration::seconds(i64::from(local.num_seconds_from_midnight()))
            + Duration::nanoseconds(i64::from(local.nanosecond() % 1_000_000_000));
        let start = now - since_midnight;

        Self {
            day: local.date_naive(),
            start,
            end: start + Duration::days(1),
        }
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.start <= at && at < self.end
    }
}

/// Length of the rolling window in which repeat blog views are collapsed
pub fn blog_view_window() -> Duration {
    Duration::hours(1)
}

/// Coarse client description stored with every visit
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceInfo {
    pub device: String,
    pub browser: String,
    pub os: String,
}

/// Turns `User-Agent` headers into [`DeviceInfo`]
pub struct DeviceParser {
    parser: Option<UserAgentParser>,
}

impl DeviceParser {
    /// Load the parser from a uap-core `regexes.yaml` file
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let yaml = std::fs::read(path)
            .with_context(|| format!("Failed to read user agent regexes {}", path.display()))?;
        let parser = UserAgentParser::from_bytes(&yaml)
            .map_err(|e| anyhow::anyhow!("Invalid user agent regexes: {:?}", e))?;

        Ok(Self {
            parser: Some(parser),
        })
    }

    /// A parser that only recognises the device class
    pub fn keywords_only() -> Self {
        Self { parser: None }
    }

    pub fn parse(&self, user_agent: Option<&str>) -> DeviceInfo {
        let Some(user_agent) = user_agent.filter(|ua| !ua.trim().is_empty()) else {
            return DeviceInfo {
                device: UNKNOWN.into(),
                browser: UNKNOWN.into(),
                os: UNKNOWN.into(),
            };
        };

        match &self.parser {
            Some(parser) => {
                let client = parser.parse(user_agent);
                DeviceInfo {
                    device: device_class(user_agent).into(),
                    browser: client.user_agent.family.into(),
                    os: client.os.family.into(),
                }
            }
            None => DeviceInfo {
                device: device_class(user_agent).into(),
                browser: UNKNOWN.into(),
                os: UNKNOWN.into(),
            },
        }
    }
}

fn device_class(user_agent: &str) -> &'static str {
    lazy_static::lazy_static! {
        static ref TABLET: regex::Regex = regex::Regex::new(r"(?i)ipad|tablet|kindle|silk").unwrap();
        static ref MOBILE: regex::Regex = regex::Regex::new(r"(?i)mobi|iphone|ipod|android").unwrap();
        static ref BOT: regex::Regex = regex::Regex::new(r"(?i)bot|crawl|spider|slurp").unwrap();
    }

    if BOT.is_match(user_agent) {
        "bot"
    } else if TABLET.is_match(user_agent) {
        "tablet"
    } else if MOBILE.is_match(user_agent) {
        "mobile"
    } else {
        "desktop"
    }
}
