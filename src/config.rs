use crate::engine::Mode;
use crate::log_store::LogTimeZone;
use crate::plate::{PlateFormat, DEFAULT_PLATE_PATTERN};
use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use tracing::{debug, info};

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct PlatecamConfig {
    pub camera: CameraConfig,
    pub ocr: OcrConfig,
    pub parking: ParkingConfig,
    pub log: LogConfig,
    pub alert: AlertConfig,
    pub display: DisplayConfig,
    pub keyboard: KeyboardConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct CameraConfig {
    /// Camera device index (e.g., 0 for /dev/video0)
    #[serde(default = "default_camera_index")]
    pub index: u32,

    /// Frame size handed to OCR (width, height)
    #[serde(default = "default_camera_resolution")]
    pub resolution: (u32, u32),

    /// Frames per second
    #[serde(default = "default_camera_fps")]
    pub fps: u32,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct OcrConfig {
    /// Tesseract executable
    #[serde(default = "default_ocr_command")]
    pub command: String,

    /// Tesseract page segmentation mode
    #[serde(default = "default_page_segmentation_mode")]
    pub page_segmentation_mode: u32,

    /// Characters the OCR engine may emit
    #[serde(default = "default_ocr_whitelist")]
    pub whitelist: String,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ParkingConfig {
    /// Number of parking slots in the facility
    #[serde(default = "default_total_slots")]
    pub total_slots: usize,

    /// Seconds during which the same plate is not accepted twice
    #[serde(default = "default_debounce_seconds")]
    pub debounce_seconds: u32,

    /// Mode at startup
    #[serde(default)]
    pub initial_mode: Mode,

    /// Debounce unmatched exits too, instead of logging every sighting
    #[serde(default)]
    pub fishy_debounce: bool,

    /// Regular expression describing a valid plate
    #[serde(default = "default_plate_pattern")]
    pub plate_pattern: String,

    /// Pause between cycles in milliseconds (0 runs as fast as frames arrive)
    #[serde(default)]
    pub cycle_interval_ms: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct LogConfig {
    /// Directory holding the plate logs
    #[serde(default = "default_log_directory")]
    pub directory: String,

    #[serde(default = "default_entry_file")]
    pub entry_file: String,

    #[serde(default = "default_exit_file")]
    pub exit_file: String,

    #[serde(default = "default_fishy_file")]
    pub fishy_file: String,

    /// Time zone for the Time column: "local" or an IANA name
    #[serde(default = "default_log_timezone")]
    pub timezone: String,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq)]
pub struct Tone {
    pub frequency_hz: u32,
    pub duration_ms: u32,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct AlertConfig {
    /// Ring the terminal bell on alerts
    #[serde(default = "default_alert_enabled")]
    pub enabled: bool,

    #[serde(default = "default_entry_tone")]
    pub entry: Tone,

    #[serde(default = "default_exit_tone")]
    pub exit: Tone,

    #[serde(default = "default_fishy_tone")]
    pub fishy: Tone,

    #[serde(default = "default_fault_tone")]
    pub fault: Tone,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct DisplayConfig {
    /// Draw the terminal dashboard
    #[serde(default = "default_display_enabled")]
    pub enabled: bool,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct KeyboardConfig {
    /// Read mode switches from the keyboard
    #[serde(default = "default_keyboard_enabled")]
    pub enabled: bool,
}

impl PlatecamConfig {
    /// Load configuration from default sources (file + environment variables)
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from_file("platecam.toml")
    }

    /// Load configuration from a specific file path
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path_str = path.as_ref().to_string_lossy();
        debug!("Loading configuration from: {}", path_str);

        let settings = Config::builder()
            // Start with default values
            .set_default("camera.index", default_camera_index())?
            .set_default(
                "camera.resolution",
                vec![default_camera_resolution().0, default_camera_resolution().1],
            )?
            .set_default("camera.fps", default_camera_fps())?
            .set_default("ocr.command", default_ocr_command())?
            .set_default("ocr.page_segmentation_mode", default_page_segmentation_mode())?
            .set_default("ocr.whitelist", default_ocr_whitelist())?
            .set_default("parking.total_slots", default_total_slots() as i64)?
            .set_default("parking.debounce_seconds", default_debounce_seconds())?
            .set_default("parking.initial_mode", "entry")?
            .set_default("parking.fishy_debounce", false)?
            .set_default("parking.plate_pattern", default_plate_pattern())?
            .set_default("parking.cycle_interval_ms", 0i64)?
            .set_default("log.directory", default_log_directory())?
            .set_default("log.entry_file", default_entry_file())?
            .set_default("log.exit_file", default_exit_file())?
            .set_default("log.fishy_file", default_fishy_file())?
            .set_default("log.timezone", default_log_timezone())?
            .set_default("alert.enabled", default_alert_enabled())?
            .set_default("alert.entry.frequency_hz", default_entry_tone().frequency_hz)?
            .set_default("alert.entry.duration_ms", default_entry_tone().duration_ms)?
            .set_default("alert.exit.frequency_hz", default_exit_tone().frequency_hz)?
            .set_default("alert.exit.duration_ms", default_exit_tone().duration_ms)?
            .set_default("alert.fishy.frequency_hz", default_fishy_tone().frequency_hz)?
            .set_default("alert.fishy.duration_ms", default_fishy_tone().duration_ms)?
            .set_default("alert.fault.frequency_hz", default_fault_tone().frequency_hz)?
            .set_default("alert.fault.duration_ms", default_fault_tone().duration_ms)?
            .set_default("display.enabled", default_display_enabled())?
            .set_default("keyboard.enabled", default_keyboard_enabled())?
            // Add configuration file (optional)
            .add_source(File::with_name(&path_str).required(false))
            // Add environment variables with PLATECAM_ prefix
            .add_source(Environment::with_prefix("PLATECAM").separator("_"))
            .build()?;

        let config: PlatecamConfig = settings.try_deserialize()?;

        info!("Configuration loaded successfully");
        debug!("Final configuration: {:#?}", config);

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.camera.resolution.0 == 0 || self.camera.resolution.1 == 0 {
            return Err(ConfigError::Message(
                "Camera resolution must be greater than 0".to_string(),
            ));
        }

        if self.camera.fps == 0 {
            return Err(ConfigError::Message(
                "Camera fps must be greater than 0".to_string(),
            ));
        }

        if self.ocr.command.trim().is_empty() {
            return Err(ConfigError::Message(
                "OCR command must not be empty".to_string(),
            ));
        }

        if self.parking.total_slots == 0 {
            return Err(ConfigError::Message(
                "Parking total_slots must be greater than 0".to_string(),
            ));
        }

        PlateFormat::new(&self.parking.plate_pattern).map_err(|e| {
            ConfigError::Message(format!("Invalid plate_pattern: {}", e))
        })?;

        LogTimeZone::resolve(&self.log.timezone).map_err(ConfigError::Message)?;

        let files = [&self.log.entry_file, &self.log.exit_file, &self.log.fishy_file];
        if files.iter().any(|name| name.trim().is_empty()) {
            return Err(ConfigError::Message(
                "Log file names must not be empty".to_string(),
            ));
        }
        if files.iter().collect::<HashSet<_>>().len() != files.len() {
            return Err(ConfigError::Message(
                "Entry, exit and fishy logs must use different files".to_string(),
            ));
        }

        Ok(())
    }

    /// Compiled plate grammar for this configuration
    pub fn plate_format(&self) -> Result<PlateFormat, ConfigError> {
        PlateFormat::new(&self.parking.plate_pattern)
            .map_err(|e| ConfigError::Message(format!("Invalid plate_pattern: {}", e)))
    }
}

impl Default for PlatecamConfig {
    fn default() -> Self {
        Self {
            camera: CameraConfig {
                index: default_camera_index(),
                resolution: default_camera_resolution(),
                fps: default_camera_fps(),
            },
            ocr: OcrConfig {
                command: default_ocr_command(),
                page_segmentation_mode: default_page_segmentation_mode(),
                whitelist: default_ocr_whitelist(),
            },
            parking: ParkingConfig {
                total_slots: default_total_slots(),
                debounce_seconds: default_debounce_seconds(),
                initial_mode: Mode::Entry,
                fishy_debounce: false,
                plate_pattern: default_plate_pattern(),
                cycle_interval_ms: 0,
            },
            log: LogConfig {
                directory: default_log_directory(),
                entry_file: default_entry_file(),
                exit_file: default_exit_file(),
                fishy_file: default_fishy_file(),
                timezone: default_log_timezone(),
            },
            alert: AlertConfig {
                enabled: default_alert_enabled(),
                entry: default_entry_tone(),
                exit: default_exit_tone(),
                fishy: default_fishy_tone(),
                fault: default_fault_tone(),
            },
            display: DisplayConfig {
                enabled: default_display_enabled(),
            },
            keyboard: KeyboardConfig {
                enabled: default_keyboard_enabled(),
            },
        }
    }
}

// Default value functions
fn default_camera_index() -> u32 {
    0
}
fn default_camera_resolution() -> (u32, u32) {
    (640, 480)
}
fn default_camera_fps() -> u32 {
    30
}

fn default_ocr_command() -> String {
    "tesseract".to_string()
}
fn default_page_segmentation_mode() -> u32 {
    6
}
fn default_ocr_whitelist() -> String {
    crate::ocr::PLATE_CHARSET.to_string()
}

fn default_total_slots() -> usize {
    30
}
fn default_debounce_seconds() -> u32 {
    3
}
fn default_plate_pattern() -> String {
    DEFAULT_PLATE_PATTERN.to_string()
}

fn default_log_directory() -> String {
    ".".to_string()
}
fn default_entry_file() -> String {
    "detected_plates.csv".to_string()
}
fn default_exit_file() -> String {
    "exited_plates.csv".to_string()
}
fn default_fishy_file() -> String {
    "fishy_plates.csv".to_string()
}
fn default_log_timezone() -> String {
    "local".to_string()
}

fn default_alert_enabled() -> bool {
    true
}
fn default_entry_tone() -> Tone {
    Tone {
        frequency_hz: 1000,
        duration_ms: 200,
    }
}
fn default_exit_tone() -> Tone {
    Tone {
        frequency_hz: 800,
        duration_ms: 200,
    }
}
fn default_fishy_tone() -> Tone {
    Tone {
        frequency_hz: 600,
        duration_ms: 500,
    }
}
fn default_fault_tone() -> Tone {
    Tone {
        frequency_hz: 400,
        duration_ms: 800,
    }
}

fn default_display_enabled() -> bool {
    true
}
fn default_keyboard_enabled() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = PlatecamConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.parking.total_slots, 30);
        assert_eq!(config.parking.debounce_seconds, 3);
        assert_eq!(config.parking.initial_mode, Mode::Entry);
        assert_eq!(config.alert.fishy.frequency_hz, 600);
        assert_eq!(config.alert.fishy.duration_ms, 500);
    }

    #[test]
    fn test_load_without_file_matches_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("missing.toml");

        let config = PlatecamConfig::load_from_file(&path).unwrap();
        assert_eq!(config, PlatecamConfig::default());
    }

    #[test]
    fn test_load_from_file_overrides() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("platecam.toml");
        std::fs::write(
            &path,
            r#"
[parking]
total_slots = 12
initial_mode = "exit"
fishy_debounce = true

[log]
directory = "/var/lib/platecam"
timezone = "Asia/Kolkata"

[alert.fishy]
frequency_hz = 700
duration_ms = 900
"#,
        )
        .unwrap();

        let config = PlatecamConfig::load_from_file(&path).unwrap();
        assert_eq!(config.parking.total_slots, 12);
        assert_eq!(config.parking.initial_mode, Mode::Exit);
        assert!(config.parking.fishy_debounce);
        assert_eq!(config.parking.debounce_seconds, 3);
        assert_eq!(config.log.directory, "/var/lib/platecam");
        assert_eq!(config.alert.fishy.frequency_hz, 700);
        assert_eq!(config.alert.entry.frequency_hz, 1000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = PlatecamConfig::default();

        config.parking.total_slots = 0;
        assert!(config.validate().is_err());
        config.parking.total_slots = 30;

        config.parking.plate_pattern = "[A-Z".to_string();
        assert!(config.validate().is_err());
        config.parking.plate_pattern = default_plate_pattern();

        config.log.timezone = "Nowhere/Special".to_string();
        assert!(config.validate().is_err());
        config.log.timezone = "UTC".to_string();

        config.log.exit_file = config.log.entry_file.clone();
        assert!(config.validate().is_err());
        config.log.exit_file = default_exit_file();

        config.camera.resolution = (0, 0);
        assert!(config.validate().is_err());
        config.camera.resolution = (640, 480);

        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_serializes_to_toml() {
        let config = PlatecamConfig::default();
        let text = toml::to_string_pretty(&config).unwrap();
        assert!(text.contains("[parking]"));
        assert!(text.contains("initial_mode = \"entry\""));
        let parsed: PlatecamConfig = toml::from_str(&text).unwrap();
        assert_eq!(parsed, config);
    }
}
