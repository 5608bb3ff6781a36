use crate::domain::config::{DeviceConfig, Gc100Config, GlobalConfig, SerialPortConfig};
use crate::domain::error::{Gc100Error, Gc100Result};
use std::fs;
use std::path::{Path, PathBuf};

const PROJECT_DIR: &str = ".gc100";
const CONFIG_FILE: &str = "config.toml";

/// Configuration manager
pub struct ConfigManager {
    global_config_path: PathBuf,
    project_config_path: Option<PathBuf>,
}

impl ConfigManager {
    /// Create new configuration manager
    pub fn new() -> Gc100Result<Self> {
        let global_config_path = Self::get_global_config_path()?;
        let project_config_path = std::env::current_dir()
            .ok()
            .and_then(|dir| Self::find_project_config_path(&dir));

        Ok(Self {
            global_config_path,
            project_config_path,
        })
    }

    /// Manager with explicit paths, bypassing home and directory discovery
    pub fn with_paths(global_config_path: PathBuf, project_config_path: Option<PathBuf>) -> Self {
        Self {
            global_config_path,
            project_config_path,
        }
    }

    /// Load configuration from files
    pub fn load_config(&self) -> Gc100Result<Gc100Config> {
        let mut config = Gc100Config::default();

        if self.global_config_path.exists() {
            let global_config = self.load_config_from_path(&self.global_config_path)?;
            config.global = global_config.global;
            config.devices = global_config.devices;
        }

        // Project devices are added after global ones and win on name clashes
        if let Some(project_path) = &self.project_config_path {
            if project_path.exists() {
                let project_config = self.load_config_from_path(project_path)?;
                for device in project_config.devices {
                    config.devices.retain(|d| d.name != device.name);
                    config.devices.push(device);
                }
            }
        }

        Ok(config)
    }

    /// Get global configuration path
    fn get_global_config_path() -> Gc100Result<PathBuf> {
        let home = dirs::home_dir().ok_or_else(|| Gc100Error::Config {
            message: "Could not determine home directory".to_string(),
        })?;

        Ok(home.join(".config").join("gc100").join(CONFIG_FILE))
    }

    /// Find project configuration path by walking up directory tree
    fn find_project_config_path(start: &Path) -> Option<PathBuf> {
        let mut path = start;

        loop {
            let config_path = path.join(PROJECT_DIR).join(CONFIG_FILE);
            if config_path.exists() {
                return Some(config_path);
            }

            path = path.parent()?;
        }
    }

    /// Load configuration from specific path
    pub fn load_config_from_path(&self, path: &Path) -> Gc100Result<Gc100Config> {
        let content = fs::read_to_string(path).map_err(|e| Gc100Error::Config {
            message: format!("Failed to read config file {}: {}", path.display(), e),
        })?;

        toml::from_str(&content).map_err(|e| Gc100Error::Config {
            message: format!("Failed to parse config file {}: {}", path.display(), e),
        })
    }

    /// Save configuration to specific path
    pub fn save_config_to_path(&self, path: &Path, config: &Gc100Config) -> Gc100Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| Gc100Error::Config {
                message: format!("Failed to create config directory: {}", e),
            })?;
        }

        let content = toml::to_string_pretty(config).map_err(|e| Gc100Error::Config {
            message: format!("Failed to serialize config: {}", e),
        })?;

        fs::write(path, content).map_err(|e| Gc100Error::Config {
            message: format!("Failed to write config file {}: {}", path.display(), e),
        })
    }

    /// Create default project configuration under `path`, returning the file written
    pub fn init_project_config(&self, path: &Path) -> Gc100Result<PathBuf> {
        let config_file = path.join(PROJECT_DIR).join(CONFIG_FILE);

        if config_file.exists() {
            return Err(Gc100Error::Config {
                message: "Project configuration already exists".to_string(),
            });
        }

        let mut device = DeviceConfig::new("gc100", "192.168.11.120");
        device.description = "Example GC-100 unit".to_string();
        device.serial_ports.push(SerialPortConfig {
            index: 0,
            addr: "1:1".to_string(),
        });

        let default_config = Gc100Config {
            global: GlobalConfig::default(),
            devices: vec![device],
        };

        self.save_config_to_path(&config_file, &default_config)?;
        Ok(config_file)
    }

    /// Get the current project config path (if any)
    pub fn get_project_config_path(&self) -> Option<&PathBuf> {
        self.project_config_path.as_ref()
    }

    /// Get the global config path
    pub fn get_global_config_path_ref(&self) -> &PathBuf {
        &self.global_config_path
    }
}
