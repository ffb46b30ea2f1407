use std::env::var_os;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use charlcd_gpio::GpioError;
use charlcd_gpio::lcd::controller::LcdPins;
use dotenv::var;
use log::info;
use serde::{Serialize, Deserialize};
use thiserror::Error;
use crate::scene::Scene;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value {value:?} for {name}")]
    InvalidPin { name: &'static str, value: String },
    #[error("invalid pin assignment: {0}")]
    Pins(#[from] GpioError),
    #[error("scene {index} is on line {line}, the display has lines 1 to 4")]
    InvalidLine { index: usize, line: usize },
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed config: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Serialize, Deserialize, Debug, PartialEq)]
pub struct Config {
    /// How many times the scenes are played. 0 loops forever.
    #[serde(default)]
    pub cycles: u32,
    /// Pause after every cycle.
    #[serde(default = "default_pause_millis")]
    pub pause_millis: u64,
    pub scenes: Vec<Scene>,
}

fn default_pause_millis() -> u64 {
    60_000
}

impl Config {
    /// `CONFIG_FILE`, or `config.json` in the working directory.
    pub fn path() -> PathBuf {
        let config_str = var_os("CONFIG_FILE");
        let config_str: &OsStr = config_str.as_deref().unwrap_or(OsStr::new("config.json"));
        PathBuf::from(config_str)
    }

    /// Loads the config at `config_path`. `None` only if there is no file.
    pub fn try_load_from(config_path: &Path) -> Result<Option<Self>, ConfigError> {
        if config_path.exists() {
            let file = std::fs::File::open(config_path)?;
            let reader = std::io::BufReader::new(file);
            Ok(Some(serde_json::from_reader(reader)?))
        } else {
            Ok(None)
        }
    }

    pub fn save_to(&self, config_path: &Path) -> std::io::Result<()> {
        let file = std::fs::File::create(config_path)?;
        let writer = std::io::BufWriter::new(file);
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }

    /// Checks every scene targets an existing line.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (index, scene) in self.scenes.iter().enumerate() {
            if let Some(line) = scene.line() {
                if !(1..=4).contains(&line) {
                    return Err(ConfigError::InvalidLine { index, line });
                }
            }
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            cycles: 0,
            pause_millis: default_pause_millis(),
            scenes: Scene::showcase(),
        }
    }
}

/// Loads the config at `config_path`, writing out the default one if there is no file.
///
/// A file that exists but can't be read or parsed is an error and is left untouched.
pub fn load_or_create(config_path: &Path) -> Result<Config, ConfigError> {
    if let Some(config) = Config::try_load_from(config_path)? {
        info!("Config loaded.");
        return Ok(config);
    }

    info!("Config not found. Using default");
    let config = Config::default();
    config.save_to(config_path)?;
    info!("Default config saved to {}.", config_path.display());
    Ok(config)
}

fn parse_pin(name: &'static str, value: &str) -> Result<usize, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidPin {
        name,
        value: value.to_string(),
    })
}

fn parse_pin_bus(name: &'static str, pin_str: &str) -> Result<[usize; 4], ConfigError> {
    pin_str
        .split([',', ' ', ';'])
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| parse_pin(name, s))
        .collect::<Result<Vec<_>, _>>()?
        .try_into()
        .map_err(|_| ConfigError::InvalidPin {
            name,
            value: pin_str.to_string(),
        })
}

/// Builds the pin assignment from `lookup`, falling back to the default for every missing variable.
pub fn pins_from(lookup: impl Fn(&str) -> Option<String>) -> Result<LcdPins, ConfigError> {
    let mut pins = LcdPins::default();

    if let Some(value) = lookup("CHARLCD_PIN_RS") {
        pins.rs = parse_pin("CHARLCD_PIN_RS", &value)?;
    }
    if let Some(value) = lookup("CHARLCD_PIN_E") {
        pins.e = parse_pin("CHARLCD_PIN_E", &value)?;
    }
    if let Some(value) = lookup("CHARLCD_PINS_DATA") {
        pins.data = parse_pin_bus("CHARLCD_PINS_DATA", &value)?;
    }
    if let Some(value) = lookup("CHARLCD_PIN_BACKLIGHT") {
        pins.backlight = parse_pin("CHARLCD_PIN_BACKLIGHT", &value)?;
    }
    if let Some(value) = lookup("CHARLCD_PIN_BUTTON") {
        pins.button = parse_pin("CHARLCD_PIN_BUTTON", &value)?;
    }

    pins.validate()?;
    Ok(pins)
}

/// Pin assignment from the environment (and `.env`).
pub fn pins_from_env() -> Result<LcdPins, ConfigError> {
    pins_from(|name| var(name).ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::tempdir;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(name, value)| (name.to_string(), value.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn missing_variables_use_defaults() {
        assert_eq!(pins_from(env(&[])).unwrap(), LcdPins::default());
    }

    #[test]
    fn variables_override_pins() {
        let pins = pins_from(env(&[
            ("CHARLCD_PIN_RS", "22"),
            ("CHARLCD_PINS_DATA", "26, 16;20 21"),
            ("CHARLCD_PIN_BUTTON", " 17 "),
        ]))
        .unwrap();

        assert_eq!(pins.rs, 22);
        assert_eq!(pins.e, LcdPins::default().e);
        assert_eq!(pins.data, [26, 16, 20, 21]);
        assert_eq!(pins.button, 17);
    }

    #[test]
    fn bad_values_are_rejected() {
        assert!(matches!(
            pins_from(env(&[("CHARLCD_PIN_E", "eight")])),
            Err(ConfigError::InvalidPin { name: "CHARLCD_PIN_E", .. })
        ));
        assert!(matches!(
            pins_from(env(&[("CHARLCD_PINS_DATA", "1,2,3")])),
            Err(ConfigError::InvalidPin { name: "CHARLCD_PINS_DATA", .. })
        ));
        assert!(matches!(
            pins_from(env(&[("CHARLCD_PIN_BACKLIGHT", "4")])),
            Err(ConfigError::Pins(GpioError::InvalidArgument))
        ));
    }

    #[test]
    fn save_then_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        assert_eq!(Config::try_load_from(&path).unwrap(), None);

        let config = Config {
            cycles: 3,
            ..Config::default()
        };
        config.save_to(&path).unwrap();
        assert_eq!(Config::try_load_from(&path).unwrap(), Some(config));
    }

    #[test]
    fn minimal_file_gets_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{ "scenes": [ { "effect": "static", "text": "Hi" } ] }"#).unwrap();

        let config = Config::try_load_from(&path).unwrap().unwrap();
        assert_eq!(config.cycles, 0);
        assert_eq!(config.pause_millis, default_pause_millis());
        assert_eq!(config.scenes.len(), 1);
        config.validate().unwrap();
    }

    #[test]
    fn malformed_file_is_reported_and_kept() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        let broken = r#"{ "scenes": [ { "effect": "static", "text": "Hi" }, ] }"#;
        std::fs::write(&path, broken).unwrap();

        assert!(matches!(Config::try_load_from(&path), Err(ConfigError::Parse(_))));
        assert!(matches!(load_or_create(&path), Err(ConfigError::Parse(_))));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), broken);
    }

    #[test]
    fn missing_file_is_created_with_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");

        assert_eq!(load_or_create(&path).unwrap(), Config::default());
        assert_eq!(Config::try_load_from(&path).unwrap(), Some(Config::default()));
    }

    #[test]
    fn out_of_range_line_is_rejected() {
        let config = Config {
            scenes: vec![Scene::SlideRight {
                text: "x".to_string(),
                line: 5,
            }],
            ..Config::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidLine { index: 0, line: 5 })
        ));
        Config::default().validate().unwrap();
    }
}
