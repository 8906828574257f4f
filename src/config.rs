//! # Configuration Management
//!
//! This module handles loading and parsing configuration from the glucose-config.toml file.
//! Everything is read once at startup; there is no runtime reconfiguration.

use crate::severity::{Severity, Thresholds};
use embedded_graphics::pixelcolor::Rgb888;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Default configuration file, looked up in the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "glucose-config.toml";

/// Grid size the numeral layout is drawn for.
pub const MIN_WIDTH: u32 = 16;
pub const MIN_HEIGHT: u32 = 10;
/// Largest grid side accepted from a config file.
pub const MAX_SIDE: u32 = 256;

/// Problems found by [`Config::validate`].
#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("severity thresholds must be strictly increasing, got {0:?}")]
    Thresholds(Thresholds),

    #[error("off-hours hour {0} is outside 0-23")]
    Hour(u32),

    #[error("timezone offset {0}h is outside -23..=23")]
    TimezoneOffset(i32),

    #[error(
        "grid {width}x{height} is outside {}x{} to {}x{}",
        MIN_WIDTH,
        MIN_HEIGHT,
        MAX_SIDE,
        MAX_SIDE
    )]
    Grid { width: u32, height: u32 },

    /// A resync resets the poll counter, so it must come less often than polls
    #[error("clock_refresh_cycles {clock_refresh_cycles} must exceed update_cycles {update_cycles}")]
    Schedule {
        update_cycles: u32,
        clock_refresh_cycles: u32,
    },

    #[error("brightness {0} is outside 0.0-1.0")]
    Brightness(f32),

    #[error("invalid Nightscout URL {0:?}")]
    Url(String),
}

/// Application configuration loaded from glucose-config.toml
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// Remote data source
    pub nightscout: NightscoutConfig,
    /// Severity band boundaries
    pub thresholds: Thresholds,
    /// Tick length and cycle counts
    pub schedule: ScheduleConfig,
    /// Hours during which the display is forced off
    pub night: NightConfig,
    /// Wall-clock settings
    pub clock: ClockConfig,
    /// Grid and presentation settings
    pub display: DisplayConfig,
    /// The six display colors
    pub palette: PaletteConfig,
    /// What to do after a fault
    pub device: DeviceConfig,
}

/// Nightscout site settings
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct NightscoutConfig {
    /// Site root, e.g. "https://my-site.herokuapp.com"
    pub url: String,
    /// API token sent as the `token` query parameter
    pub token: String,
    /// Transport timeout for one fetch
    pub request_timeout_secs: u64,
}

impl Default for NightscoutConfig {
    fn default() -> Self {
        NightscoutConfig {
            url: "https://nightscout.example.com".to_string(),
            token: String::new(),
            request_timeout_secs: 30,
        }
    }
}

/// Loop timing
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ScheduleConfig {
    /// Sleep between ticks in milliseconds
    pub tick_ms: u64,
    /// Ticks between two polls (a poll fires on tick `update_cycles + 1`)
    pub update_cycles: u32,
    /// Ticks between two clock resyncs
    pub clock_refresh_cycles: u32,
}

impl ScheduleConfig {
    /// Wall time from one poll to the next.
    pub fn poll_period(&self) -> Duration {
        Duration::from_millis((u64::from(self.update_cycles) + 1).saturating_mul(self.tick_ms))
    }
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        ScheduleConfig {
            tick_ms: 2000,
            update_cycles: 16,
            clock_refresh_cycles: 1800, // one hour at 2s ticks
        }
    }
}

/// Off-hours window, inclusive on both ends
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct NightConfig {
    pub off_hours_begin: u32,
    pub off_hours_end: u32,
}

impl Default for NightConfig {
    fn default() -> Self {
        NightConfig {
            off_hours_begin: 0,
            off_hours_end: 8,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ClockConfig {
    /// Local time offset from UTC in whole hours
    pub tz_offset_hours: i32,
}

impl Default for ClockConfig {
    fn default() -> Self {
        ClockConfig { tz_offset_hours: 1 }
    }
}

/// Grid and presentation settings
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DisplayConfig {
    pub width: u32,
    pub height: u32,
    /// Global brightness applied when a frame is presented (0.0-1.0)
    pub brightness: f32,
    /// Present frames rotated by 180 degrees (matrix mounted upside down)
    pub rotate_180: bool,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        DisplayConfig {
            width: 16,
            height: 10,
            brightness: 0.1,
            rotate_180: true,
        }
    }
}

/// Display colors as 0xRRGGBB values
#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
#[serde(default)]
pub struct PaletteConfig {
    /// Presented instead of everything while the display is suppressed
    pub off: u32,
    pub background: u32,
    /// Progress bar color
    pub foreground: u32,
    pub urgent_out_of_range: u32,
    pub out_of_range: u32,
    pub in_range: u32,
}

impl Default for PaletteConfig {
    fn default() -> Self {
        PaletteConfig {
            off: 0x000000,
            background: 0x000000,
            foreground: 0x222222,
            urgent_out_of_range: 0xFF0000,
            out_of_range: 0xFFFF00,
            in_range: 0x00FF00,
        }
    }
}

impl PaletteConfig {
    pub fn off(&self) -> Rgb888 {
        rgb(self.off)
    }

    pub fn background(&self) -> Rgb888 {
        rgb(self.background)
    }

    pub fn foreground(&self) -> Rgb888 {
        rgb(self.foreground)
    }

    /// Color for a severity class.
    pub fn severity(&self, severity: Severity) -> Rgb888 {
        match severity {
            Severity::UrgentOutOfRange => rgb(self.urgent_out_of_range),
            Severity::OutOfRange => rgb(self.out_of_range),
            Severity::InRange => rgb(self.in_range),
        }
    }
}

/// Split a 0xRRGGBB value into an RGB color.
pub fn rgb(value: u32) -> Rgb888 {
    Rgb888::new(
        ((value >> 16) & 0xFF) as u8,
        ((value >> 8) & 0xFF) as u8,
        (value & 0xFF) as u8,
    )
}

/// How the supervisor restarts after a fault
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RestartMode {
    /// Rebuild every handle in-process
    Reinitialize,
    /// Exit and let the service manager start a fresh process
    Process,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DeviceConfig {
    pub restart: RestartMode,
    /// Pause before an in-process restart
    pub restart_delay_ms: u64,
    /// Consecutive in-process restarts before escalating to a process restart
    pub max_reinitializations: u32,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        DeviceConfig {
            restart: RestartMode::Reinitialize,
            restart_delay_ms: 5000,
            max_reinitializations: 5,
        }
    }
}

impl Config {
    /// Load configuration from glucose-config.toml
    /// Falls back to default configuration if file doesn't exist or is invalid
    pub fn load() -> Self {
        Self::load_from_path(DEFAULT_CONFIG_PATH)
    }

    /// Load configuration from specified path
    /// Falls back to default configuration if file doesn't exist or is invalid
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        match fs::read_to_string(path) {
            Ok(contents) => match toml::from_str::<Config>(&contents) {
                Ok(config) => {
                    log::info!(
                        "Loaded configuration from {} for {}",
                        path.display(),
                        config.nightscout.url
                    );
                    config
                }
                Err(e) => {
                    log::warn!("Invalid config file format: {}", e);
                    log::warn!("Using default configuration");
                    Self::default()
                }
            },
            Err(_) => {
                log::info!(
                    "No config file found at {}, using default configuration",
                    path.display()
                );
                Self::default()
            }
        }
    }

    /// Save current configuration as pretty TOML
    pub fn save<P: AsRef<Path>>(&self, path: P) -> anyhow::Result<()> {
        let contents = toml::to_string_pretty(self)?;
        fs::write(&path, contents)?;
        log::info!("Configuration saved to {}", path.as_ref().display());
        Ok(())
    }

    /// Check the values the core relies on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.thresholds.is_strictly_increasing() {
            return Err(ConfigError::Thresholds(self.thresholds));
        }
        for hour in [self.night.off_hours_begin, self.night.off_hours_end] {
            if hour > 23 {
                return Err(ConfigError::Hour(hour));
            }
        }
        if !(-23..=23).contains(&self.clock.tz_offset_hours) {
            return Err(ConfigError::TimezoneOffset(self.clock.tz_offset_hours));
        }
        if self.schedule.clock_refresh_cycles <= self.schedule.update_cycles {
            return Err(ConfigError::Schedule {
                update_cycles: self.schedule.update_cycles,
                clock_refresh_cycles: self.schedule.clock_refresh_cycles,
            });
        }
        if !(MIN_WIDTH..=MAX_SIDE).contains(&self.display.width)
            || !(MIN_HEIGHT..=MAX_SIDE).contains(&self.display.height)
        {
            return Err(ConfigError::Grid {
                width: self.display.width,
                height: self.display.height,
            });
        }
        if !(0.0..=1.0).contains(&self.display.brightness) {
            return Err(ConfigError::Brightness(self.display.brightness));
        }
        if reqwest::Url::parse(&self.nightscout.url).is_err() {
            return Err(ConfigError::Url(self.nightscout.url.clone()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.thresholds, Thresholds::default());
        assert_eq!(config.schedule.update_cycles, 16);
        assert_eq!(config.schedule.tick_ms, 2000);
        assert_eq!(config.night.off_hours_begin, 0);
        assert_eq!(config.night.off_hours_end, 8);
        assert_eq!(config.clock.tz_offset_hours, 1);
        assert_eq!(config.display.width, 16);
        assert_eq!(config.display.height, 10);
        assert_eq!(config.palette.foreground, 0x222222);
        assert_eq!(config.device.restart, RestartMode::Reinitialize);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_roundtrip() {
        let config = Config::default();
        let toml_str = toml::to_string(&config).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(config.nightscout.url, parsed.nightscout.url);
        assert_eq!(config.thresholds, parsed.thresholds);
    }

    #[test]
    fn test_load_nonexistent_file() {
        let config = Config::load_from_path("/nonexistent/path");
        // Should fallback to default
        assert_eq!(config.schedule.update_cycles, 16);
    }

    #[test]
    fn test_load_partial_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
[nightscout]
url = "https://cgm.example.org"
token = "reader-123"

[thresholds]
urgent_low = 3
low = 4
high = 10
urgent_high = 13

[night]
off_hours_begin = 22
off_hours_end = 6

[palette]
in_range = 0x00AA00

[device]
restart = "process"
"#
        )
        .unwrap();

        let config = Config::load_from_path(file.path());
        assert_eq!(config.nightscout.url, "https://cgm.example.org");
        assert_eq!(config.nightscout.token, "reader-123");
        assert_eq!(config.nightscout.request_timeout_secs, 30);
        assert_eq!(config.thresholds.high, 10);
        assert_eq!(config.night.off_hours_begin, 22);
        assert_eq!(config.palette.in_range, 0x00AA00);
        assert_eq!(config.palette.foreground, 0x222222);
        assert_eq!(config.device.restart, RestartMode::Process);
        assert_eq!(config.schedule.update_cycles, 16);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_malformed_file_falls_back() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "[schedule\ntick_ms = ").unwrap();
        let config = Config::load_from_path(file.path());
        assert_eq!(config.schedule.tick_ms, 2000);
    }

    #[test]
    fn test_save_then_load() {
        let file = NamedTempFile::new().unwrap();
        let mut config = Config::default();
        config.schedule.update_cycles = 30;
        config.save(file.path()).unwrap();

        let loaded = Config::load_from_path(file.path());
        assert_eq!(loaded.schedule.update_cycles, 30);
    }

    #[test]
    fn test_validation_errors() {
        let mut config = Config::default();
        config.thresholds.low = config.thresholds.high;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Thresholds(_))
        ));

        let mut config = Config::default();
        config.night.off_hours_end = 24;
        assert_eq!(config.validate(), Err(ConfigError::Hour(24)));

        let mut config = Config::default();
        config.display.height = 8;
        assert_eq!(
            config.validate(),
            Err(ConfigError::Grid {
                width: 16,
                height: 8
            })
        );

        let mut config = Config::default();
        config.display.width = 100_000;
        config.display.height = 100_000;
        assert_eq!(
            config.validate(),
            Err(ConfigError::Grid {
                width: 100_000,
                height: 100_000
            })
        );

        let mut config = Config::default();
        config.schedule.clock_refresh_cycles = 0;
        assert_eq!(
            config.validate(),
            Err(ConfigError::Schedule {
                update_cycles: 16,
                clock_refresh_cycles: 0
            })
        );
        config.schedule.clock_refresh_cycles = 16;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Schedule { .. })
        ));
        config.schedule.clock_refresh_cycles = 17;
        assert!(config.validate().is_ok());

        let mut config = Config::default();
        config.display.brightness = 1.5;
        assert_eq!(config.validate(), Err(ConfigError::Brightness(1.5)));

        let mut config = Config::default();
        config.nightscout.url = "not a url".to_string();
        assert!(matches!(config.validate(), Err(ConfigError::Url(_))));
    }

    #[test]
    fn test_poll_period() {
        assert_eq!(
            ScheduleConfig::default().poll_period(),
            Duration::from_secs(34)
        );
    }

    #[test]
    fn test_palette_colors() {
        let palette = PaletteConfig::default();
        assert_eq!(palette.foreground(), Rgb888::new(0x22, 0x22, 0x22));
        assert_eq!(
            palette.severity(Severity::OutOfRange),
            Rgb888::new(0xFF, 0xFF, 0x00)
        );
        assert_eq!(rgb(0x123456), Rgb888::new(0x12, 0x34, 0x56));
    }
}
