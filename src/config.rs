use anyhow::{Context, Result};
use directories::BaseDirs;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

pub const DEFAULT_SCRIPTS_DIR: &str = "functions";
pub const DEFAULT_WIDTH: u16 = 120;
pub const DEFAULT_HEIGHT: u16 = 36;
const CONFIG_FILE: &str = "config.json";
const GEOMETRY_FILE: &str = "window_size.json";
const LOG_FILE: &str = "scriptdeck.log";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LauncherConfig {
    #[serde(default = "default_scripts_dir")]
    pub scripts_dir: PathBuf,
    #[serde(default = "default_interpreter")]
    pub interpreter: String,
    #[serde(skip)]
    pub data_dir: PathBuf,
}

impl LauncherConfig {
    pub fn load_or_create() -> Result<Self> {
        let data_dir = base_data_dir()?;
        Self::load_or_create_in(&data_dir)
    }

    pub fn load_or_create_in(data_dir: &Path) -> Result<Self> {
        fs::create_dir_all(data_dir).context("create app data dir")?;
        let path = data_dir.join(CONFIG_FILE);
        if path.exists() {
            let raw = fs::read_to_string(&path).context("read launcher config")?;
            let mut config: LauncherConfig =
                serde_json::from_str(&raw).context("parse launcher config")?;
            config.data_dir = data_dir.to_path_buf();
            return Ok(config);
        }

        let config = LauncherConfig {
            scripts_dir: default_scripts_dir(),
            interpreter: default_interpreter(),
            data_dir: data_dir.to_path_buf(),
        };
        config.save()?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        fs::create_dir_all(&self.data_dir).context("create app data dir")?;
        let path = self.data_dir.join(CONFIG_FILE);
        let raw = serde_json::to_string_pretty(self).context("serialize launcher config")?;
        fs::write(path, raw).context("write launcher config")?;
        Ok(())
    }

    pub fn geometry_path(&self) -> PathBuf {
        self.data_dir.join(GEOMETRY_FILE)
    }

    pub fn log_path(&self) -> PathBuf {
        self.data_dir.join(LOG_FILE)
    }
}

/// Terminal size in cells, restored on startup and recorded on exit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowGeometry {
    #[serde(default = "default_width")]
    pub width: u16,
    #[serde(default = "default_height")]
    pub height: u16,
}

impl Default for WindowGeometry {
    fn default() -> Self {
        Self {
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
        }
    }
}

impl WindowGeometry {
    pub fn load(path: &Path) -> Self {
        let Ok(raw) = fs::read_to_string(path) else {
            return Self::default();
        };
        match serde_json::from_str::<WindowGeometry>(&raw) {
            Ok(geometry) if geometry.width > 0 && geometry.height > 0 => geometry,
            _ => Self::default(),
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let raw = serde_json::to_string(self).context("serialize window size")?;
        fs::write(path, raw).context("write window size")?;
        Ok(())
    }
}

fn default_scripts_dir() -> PathBuf {
    PathBuf::from(DEFAULT_SCRIPTS_DIR)
}

fn default_interpreter() -> String {
    if cfg!(windows) {
        "python".to_string()
    } else {
        "python3".to_string()
    }
}

fn default_width() -> u16 {
    DEFAULT_WIDTH
}

fn default_height() -> u16 {
    DEFAULT_HEIGHT
}

fn base_data_dir() -> Result<PathBuf> {
    let base = BaseDirs::new().context("resolve home dir")?;
    Ok(base.data_local_dir().join("scriptdeck"))
}
