use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

pub const CONFIG_PATH_ENV: &str = "TUMORX_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "config/tumorx.yaml";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_yaml::Error,
    },
    #[error("Invalid value for {key}: {value}")]
    InvalidEnv { key: &'static str, value: String },
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub models: ModelPaths,
    pub upload: UploadConfig,
    pub report: ReportConfig,
    /// Replaces the built-in tumor information catalog when set.
    pub tumor_info_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub static_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelPaths {
    pub classifier: PathBuf,
    pub segmenter: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadConfig {
    pub max_bytes: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    pub output_dir: PathBuf,
    pub logo_candidates: Vec<PathBuf>,
    pub system_name: String,
    pub model_version: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8081,
            static_dir: None,
        }
    }
}

impl Default for ModelPaths {
    fn default() -> Self {
        Self {
            classifier: PathBuf::from("models/brain_tumor_model.pt"),
            segmenter: PathBuf::from("models/final_model.pt"),
        }
    }
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_bytes: 20 * 1024 * 1024,
        }
    }
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("."),
            logo_candidates: vec![
                PathBuf::from("logo.png"),
                PathBuf::from("tumorx_logo.png"),
                PathBuf::from("logo.jpg"),
            ],
            system_name: "TumorX AI System".to_string(),
            model_version: "TumorX v2.1.0".to_string(),
        }
    }
}

impl AppConfig {
    /// Loads `.env`, the YAML file named by `TUMORX_CONFIG` (or the default
    /// path), then applies environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();

        let path = env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        let mut config = Self::from_file_or_default(Path::new(&path))?;
        config.apply_overrides(|key| env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file_or_default(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            log::info!("No config file at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let config_str = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_yaml(&config_str).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        log::info!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn from_yaml(yaml: &str) -> Result<Self, serde_yaml::Error> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(yaml)
    }

    /// Environment values win over the file. `lookup` is injectable so tests
    /// never touch the process environment.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(port) = lookup("PORT") {
            self.server.port = port.parse().map_err(|_| ConfigError::InvalidEnv {
                key: "PORT",
                value: port.clone(),
            })?;
        }
        if let Some(host) = lookup("TUMORX_HOST") {
            self.server.host = host;
        }
        if let Some(dir) = lookup("TUMORX_STATIC_DIR") {
            self.server.static_dir = Some(PathBuf::from(dir));
        }
        if let Some(path) = lookup("TUMORX_CLASSIFIER_MODEL") {
            self.models.classifier = PathBuf::from(path);
        }
        if let Some(path) = lookup("TUMORX_SEGMENTER_MODEL") {
            self.models.segmenter = PathBuf::from(path);
        }
        if let Some(dir) = lookup("TUMORX_REPORT_DIR") {
            self.report.output_dir = PathBuf::from(dir);
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::Invalid("server.port must be non-zero".into()));
        }
        if self.upload.max_bytes == 0 {
            return Err(ConfigError::Invalid("upload.max_bytes must be non-zero".into()));
        }
        if self.models.classifier.as_os_str().is_empty()
            || self.models.segmenter.as_os_str().is_empty()
        {
            return Err(ConfigError::Invalid("model paths must not be empty".into()));
        }
        Ok(())
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
