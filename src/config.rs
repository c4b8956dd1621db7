use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::error::AppError;
use crate::subscriber::header_badge::DEFAULT_BADGE_CAPACITY;
use crate::subscriber::notification_panel::DEFAULT_PANEL_CAPACITY;
use crate::task::event_feed::DEFAULT_MAX_DELAY;
use crate::task::event_feed::DEFAULT_MIN_DELAY;
use crate::task::event_feed::DelayRange;

/// One year of hourly samples.
pub const MAX_HISTORY_WINDOW_HOURS: u32 = 24 * 366;

#[derive(Clone, Debug)]
pub struct Config {
    pub min_delay: Duration,
    pub max_delay: Duration,
    pub seed: Option<u64>,
    pub notification_capacity: usize,
    pub badge_capacity: usize,
    pub history_window_hours: u32,
    pub logs_path: PathBuf,
}

impl Config {
    pub fn new() -> Self {
        Self {
            min_delay: DEFAULT_MIN_DELAY,
            max_delay: DEFAULT_MAX_DELAY,
            seed: None,
            notification_capacity: DEFAULT_PANEL_CAPACITY,
            badge_capacity: DEFAULT_BADGE_CAPACITY,
            history_window_hours: 24,
            logs_path: PathBuf::from("logs"),
        }
    }

    /// Overlays values from the process environment.
    pub fn load(&mut self) -> Result<(), AppError> {
        self.load_from(|key| std::env::var(key).ok())
    }

    /// Overlays values returned by `lookup`, then validates the result.
    pub fn load_from<F>(&mut self, lookup: F) -> Result<(), AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(ms) = parse::<u64>(&lookup, "FEED_MIN_DELAY_MS")? {
            self.min_delay = Duration::from_millis(ms);
        }
        if let Some(ms) = parse::<u64>(&lookup, "FEED_MAX_DELAY_MS")? {
            self.max_delay = Duration::from_millis(ms);
        }
        if let Some(seed) = parse::<u64>(&lookup, "FEED_SEED")? {
            self.seed = Some(seed);
        }
        if let Some(n) = parse::<usize>(&lookup, "NOTIFICATION_CAPACITY")? {
            self.notification_capacity = n;
        }
        if let Some(n) = parse::<usize>(&lookup, "BADGE_CAPACITY")? {
            self.badge_capacity = n;
        }
        if let Some(h) = parse::<u32>(&lookup, "HISTORY_WINDOW_HOURS")? {
            if h > MAX_HISTORY_WINDOW_HOURS {
                return Err(AppError::InvalidConfig {
                    key: "HISTORY_WINDOW_HOURS".to_string(),
                    value: h.to_string(),
                });
            }
            self.history_window_hours = h;
        }
        if let Some(path) = lookup("LOGS_PATH") {
            self.logs_path = PathBuf::from(path);
        }

        self.delay_range()?;
        Ok(())
    }

    pub fn delay_range(&self) -> Result<DelayRange, AppError> {
        Ok(DelayRange::new(self.min_delay, self.max_delay)?)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

fn parse<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Result<Option<T>, AppError> {
    match lookup(key) {
        None => Ok(None),
        Some(value) => value
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| AppError::InvalidConfig {
                key: key.to_string(),
                value,
            }),
    }
}
