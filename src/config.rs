use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::path::Path;

use crate::detect::{BlobParams, ColorChannel, Connectivity, SelectionPolicy};
use crate::display::{DisplaySettings, Orientation};
use crate::frame::{FlipMode, DEFAULT_HEIGHT, DEFAULT_WIDTH};
use crate::pipeline::{DetectionSettings, DEFAULT_MARKER_RADIUS};

const DEFAULT_DEVICE: &str = "stub://laser";
const DEFAULT_TARGET_FPS: u32 = 30;

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct LaserdotConfigFile {
    source: Option<SourceConfigFile>,
    detection: Option<DetectionConfigFile>,
    display: Option<DisplayConfigFile>,
    orientation: Option<OrientationConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct SourceConfigFile {
    device: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    target_fps: Option<u32>,
    repeat: Option<bool>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct DetectionConfigFile {
    channel: Option<String>,
    threshold: Option<u8>,
    blur_kernel: Option<usize>,
    blur_sigma: Option<f64>,
    mask_level: Option<u8>,
    connectivity: Option<String>,
    policy: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct DisplayConfigFile {
    marker_radius: Option<u32>,
    canny_low: Option<f32>,
    canny_high: Option<f32>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct OrientationConfigFile {
    input_flip: Option<String>,
    display_flip: Option<String>,
}

#[derive(Debug, Clone)]
pub struct LaserdotConfig {
    pub source: SourceSettings,
    pub detection: DetectionSettings,
    pub display: DisplaySettings,
    pub orientation: Orientation,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceSettings {
    /// `stub://...`, `/dev/videoN` or a directory of still frames.
    pub device: String,
    pub width: u32,
    pub height: u32,
    pub target_fps: u32,
    /// Loop a replay directory instead of stopping after the last frame.
    pub repeat: bool,
}

impl Default for SourceSettings {
    fn default() -> Self {
        Self {
            device: DEFAULT_DEVICE.to_string(),
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            target_fps: DEFAULT_TARGET_FPS,
            repeat: false,
        }
    }
}

impl Default for LaserdotConfig {
    fn default() -> Self {
        Self {
            source: SourceSettings::default(),
            detection: DetectionSettings::default(),
            display: DisplaySettings::default(),
            orientation: Orientation::default(),
        }
    }
}

impl LaserdotConfig {
    /// File named by `LASERDOT_CONFIG` (if any), then defaults, then
    /// `LASERDOT_*` overrides.
    pub fn load() -> Result<Self> {
        let config_path = std::env::var("LASERDOT_CONFIG").ok();
        let file_cfg = match config_path.as_deref() {
            Some(path) if !path.trim().is_empty() => Some(read_config_file(Path::new(path))?),
            _ => None,
        };
        let mut cfg = Self::from_file(file_cfg.unwrap_or_default())?;
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Load `path` without consulting the environment.
    pub fn from_path(path: &Path) -> Result<Self> {
        let cfg = Self::from_file(read_config_file(path)?)?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: LaserdotConfigFile) -> Result<Self> {
        let source_file = file.source.unwrap_or_default();
        let source_defaults = SourceSettings::default();
        let source = SourceSettings {
            device: source_file.device.unwrap_or(source_defaults.device),
            width: source_file.width.unwrap_or(source_defaults.width),
            height: source_file.height.unwrap_or(source_defaults.height),
            target_fps: source_file.target_fps.unwrap_or(source_defaults.target_fps),
            repeat: source_file.repeat.unwrap_or(source_defaults.repeat),
        };

        let detection_file = file.detection.unwrap_or_default();
        let display_file = file.display.unwrap_or_default();
        let blob_defaults = BlobParams::default();
        let detection = DetectionSettings {
            channel: parse_or(detection_file.channel, ColorChannel::parse, ColorChannel::Red)?,
            blob: BlobParams {
                threshold: detection_file.threshold.unwrap_or(blob_defaults.threshold),
                blur_kernel: detection_file.blur_kernel.unwrap_or(blob_defaults.blur_kernel),
                blur_sigma: detection_file.blur_sigma.unwrap_or(blob_defaults.blur_sigma),
                mask_level: detection_file.mask_level.unwrap_or(blob_defaults.mask_level),
            },
            connectivity: parse_or(
                detection_file.connectivity,
                Connectivity::parse,
                Connectivity::Eight,
            )?,
            policy: parse_or(
                detection_file.policy,
                SelectionPolicy::parse,
                SelectionPolicy::LargestArea,
            )?,
            marker_radius: display_file.marker_radius.unwrap_or(DEFAULT_MARKER_RADIUS),
        };

        let display_defaults = DisplaySettings::default();
        let display = DisplaySettings {
            canny_low: display_file.canny_low.unwrap_or(display_defaults.canny_low),
            canny_high: display_file.canny_high.unwrap_or(display_defaults.canny_high),
        };

        let orientation_file = file.orientation.unwrap_or_default();
        let orientation_defaults = Orientation::default();
        let orientation = Orientation {
            input_flip: parse_or(
                orientation_file.input_flip,
                FlipMode::parse,
                orientation_defaults.input_flip,
            )?,
            display_flip: parse_or(
                orientation_file.display_flip,
                FlipMode::parse,
                orientation_defaults.display_flip,
            )?,
        };

        Ok(Self {
            source,
            detection,
            display,
            orientation,
        })
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(index) = std::env::var("LASERDOT_DEVICE_INDEX") {
            if !index.trim().is_empty() {
                let index: u32 = index
                    .trim()
                    .parse()
                    .map_err(|_| anyhow!("LASERDOT_DEVICE_INDEX must be a camera index"))?;
                self.source.device = format!("/dev/video{index}");
            }
        }
        if let Ok(device) = std::env::var("LASERDOT_DEVICE") {
            if !device.trim().is_empty() {
                self.source.device = device;
            }
        }
        if let Some(width) = env_number("LASERDOT_WIDTH")? {
            self.source.width = width;
        }
        if let Some(height) = env_number("LASERDOT_HEIGHT")? {
            self.source.height = height;
        }
        if let Some(fps) = env_number("LASERDOT_FPS")? {
            self.source.target_fps = fps;
        }
        if let Ok(threshold) = std::env::var("LASERDOT_THRESHOLD") {
            self.detection.blob.threshold = threshold
                .trim()
                .parse()
                .map_err(|_| anyhow!("LASERDOT_THRESHOLD must be an integer in 0..=255"))?;
        }
        if let Ok(policy) = std::env::var("LASERDOT_POLICY") {
            if !policy.trim().is_empty() {
                self.detection.policy = SelectionPolicy::parse(&policy)?;
            }
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.source.width == 0 || self.source.height == 0 {
            return Err(anyhow!(
                "frame size must be non-zero (got {}x{})",
                self.source.width,
                self.source.height
            ));
        }
        if self.source.device.trim().is_empty() {
            return Err(anyhow!("source device must not be empty"));
        }
        self.detection.validate().context("detection settings")?;
        self.display.validate().context("display settings")?;
        Ok(())
    }
}

fn read_config_file(path: &Path) -> Result<LaserdotConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let is_json = path
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case("json"))
        .unwrap_or(false);
    let cfg = if is_json {
        serde_json::from_str(&raw)
            .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    } else {
        toml::from_str(&raw)
            .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    };
    Ok(cfg)
}

fn parse_or<T, E>(
    value: Option<String>,
    parse: impl Fn(&str) -> std::result::Result<T, E>,
    default: T,
) -> Result<T>
where
    E: std::error::Error + Send + Sync + 'static,
{
    match value {
        Some(value) => Ok(parse(&value)?),
        None => Ok(default),
    }
}

fn env_number(key: &str) -> Result<Option<u32>> {
    match std::env::var(key) {
        Ok(value) if !value.trim().is_empty() => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| anyhow!("{key} must be a non-negative integer")),
        _ => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(suffix: &str, body: &str) -> Result<tempfile::NamedTempFile> {
        let mut file = tempfile::Builder::new().suffix(suffix).tempfile()?;
        file.write_all(body.as_bytes())?;
        Ok(file)
    }

    #[test]
    fn empty_file_gives_defaults() -> Result<()> {
        let file = write_temp(".toml", "")?;
        let cfg = LaserdotConfig::from_path(file.path())?;
        assert_eq!(cfg.source, SourceSettings::default());
        assert_eq!(cfg.detection, DetectionSettings::default());
        assert_eq!(cfg.display, DisplaySettings::default());
        assert_eq!(cfg.orientation, Orientation::default());
        Ok(())
    }

    #[test]
    fn toml_sections_override_defaults() -> Result<()> {
        let file = write_temp(
            ".toml",
            r#"
            [source]
            device = "stub://bench"
            width = 640
            height = 480

            [detection]
            channel = "green"
            threshold = 200
            connectivity = "four"
            policy = "first_label"

            [display]
            marker_radius = 12

            [orientation]
            display_flip = "none"
            "#,
        )?;
        let cfg = LaserdotConfig::from_path(file.path())?;
        assert_eq!(cfg.source.device, "stub://bench");
        assert_eq!((cfg.source.width, cfg.source.height), (640, 480));
        assert_eq!(cfg.source.target_fps, DEFAULT_TARGET_FPS);
        assert_eq!(cfg.detection.channel, ColorChannel::Green);
        assert_eq!(cfg.detection.blob.threshold, 200);
        assert_eq!(cfg.detection.blob.blur_kernel, 5);
        assert_eq!(cfg.detection.connectivity, Connectivity::Four);
        assert_eq!(cfg.detection.policy, SelectionPolicy::FirstLabel);
        assert_eq!(cfg.detection.marker_radius, 12);
        assert_eq!(cfg.orientation.display_flip, FlipMode::None);
        Ok(())
    }

    #[test]
    fn even_kernel_is_rejected() -> Result<()> {
        let file = write_temp(".toml", "[detection]\nblur_kernel = 4\n")?;
        assert!(LaserdotConfig::from_path(file.path()).is_err());
        Ok(())
    }

    #[test]
    fn nan_canny_threshold_is_rejected() -> Result<()> {
        let file = write_temp(".toml", "[display]\ncanny_low = nan\n")?;
        assert!(LaserdotConfig::from_path(file.path()).is_err());
        let file = write_temp(".toml", "[display]\ncanny_low = 150\ncanny_high = 50\n")?;
        assert!(LaserdotConfig::from_path(file.path()).is_err());
        Ok(())
    }

    #[test]
    fn degenerate_blur_and_marker_are_rejected() -> Result<()> {
        let file = write_temp(".toml", "[detection]\nblur_sigma = 1e-200\n")?;
        assert!(LaserdotConfig::from_path(file.path()).is_err());
        let file = write_temp(".toml", "[detection]\nblur_kernel = 1000001\n")?;
        assert!(LaserdotConfig::from_path(file.path()).is_err());
        let file = write_temp(".toml", "[display]\nmarker_radius = 3000000000\n")?;
        assert!(LaserdotConfig::from_path(file.path()).is_err());
        Ok(())
    }

    #[test]
    fn unknown_channel_is_rejected() -> Result<()> {
        let file = write_temp(".json", r#"{"detection": {"channel": "alpha"}}"#)?;
        assert!(LaserdotConfig::from_path(file.path()).is_err());
        Ok(())
    }

    #[test]
    fn unknown_keys_are_rejected() -> Result<()> {
        let file = write_temp(".toml", "[source]\nresolution = 12\n")?;
        assert!(LaserdotConfig::from_path(file.path()).is_err());
        Ok(())
    }
}
