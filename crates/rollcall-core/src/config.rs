use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// File read when no explicit config path is given and it exists.
pub const DEFAULT_CONFIG_FILE: &str = "rollcall.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Runtime configuration shared by the daemon and the CLI.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// V4L2 device path.
    pub camera_device: String,
    /// Directory containing `det_10g.onnx` and `w600k_r50.onnx`.
    pub model_dir: PathBuf,
    /// SQLite database file.
    pub db_path: PathBuf,
    /// Enrollment photos, one `{id}_{name}.jpg` per person.
    pub faces_dir: PathBuf,
    /// Cosine similarity at or above which a face counts as recognized.
    pub similarity_threshold: f32,
    /// Delay between processed frames in the live session.
    pub poll_interval_ms: u64,
    /// How often the live session re-checks the current lecture.
    pub status_interval_secs: u64,
    /// Frames discarded after opening the camera (auto exposure settling).
    pub warmup_frames: usize,
    /// Frames captured when registering a new person.
    pub frames_per_register: usize,
    /// Extra border around a registered face, as a fraction of its size.
    pub face_margin: f32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            camera_device: "/dev/video0".to_string(),
            model_dir: default_model_dir(),
            db_path: PathBuf::from("attendance.db"),
            faces_dir: PathBuf::from("known_faces"),
            similarity_threshold: 0.40,
            poll_interval_ms: 200,
            status_interval_secs: 30,
            warmup_frames: 4,
            frames_per_register: 5,
            face_margin: 0.25,
        }
    }
}

/// `$XDG_DATA_HOME/rollcall/models`, falling back to `~/.local/share`.
pub fn default_model_dir() -> PathBuf {
    std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".local/share")
        })
        .join("rollcall/models")
}

impl Config {
    /// Defaults, then the TOML file, then `ROLLCALL_*` environment variables.
    ///
    /// With no explicit `path`, `ROLLCALL_CONFIG` is consulted, then
    /// `./rollcall.toml` if present.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let explicit = path
            .map(Path::to_path_buf)
            .or_else(|| std::env::var_os("ROLLCALL_CONFIG").map(PathBuf::from));

        let mut cfg = match explicit {
            Some(p) => Self::from_file(&p)?,
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
                Self::from_file(Path::new(DEFAULT_CONFIG_FILE))?
            }
            None => Self::default(),
        };
        cfg.apply_env(|key| std::env::var(key).ok());
        Ok(cfg)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let cfg = toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::debug!(path = %path.display(), "configuration file loaded");
        Ok(cfg)
    }

    /// Override fields from `ROLLCALL_*` variables looked up through `var`.
    /// Unparseable values are logged and ignored.
    pub fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(v) = var("ROLLCALL_CAMERA_DEVICE") {
            self.camera_device = v;
        }
        if let Some(v) = var("ROLLCALL_MODEL_DIR") {
            self.model_dir = PathBuf::from(v);
        }
        if let Some(v) = var("ROLLCALL_DB_PATH") {
            self.db_path = PathBuf::from(v);
        }
        if let Some(v) = var("ROLLCALL_FACES_DIR") {
            self.faces_dir = PathBuf::from(v);
        }
        parse_into(&var, "ROLLCALL_SIMILARITY_THRESHOLD", &mut self.similarity_threshold);
        parse_into(&var, "ROLLCALL_POLL_INTERVAL_MS", &mut self.poll_interval_ms);
        parse_into(&var, "ROLLCALL_STATUS_INTERVAL_SECS", &mut self.status_interval_secs);
        parse_into(&var, "ROLLCALL_WARMUP_FRAMES", &mut self.warmup_frames);
        parse_into(&var, "ROLLCALL_FRAMES_PER_REGISTER", &mut self.frames_per_register);
        parse_into(&var, "ROLLCALL_FACE_MARGIN", &mut self.face_margin);
    }

    /// Path to the SCRFD detection model.
    pub fn scrfd_model_path(&self) -> PathBuf {
        self.model_dir.join("det_10g.onnx")
    }

    /// Path to the ArcFace recognition model.
    pub fn arcface_model_path(&self) -> PathBuf {
        self.model_dir.join("w600k_r50.onnx")
    }
}

fn parse_into<T: std::str::FromStr>(
    var: &impl Fn(&str) -> Option<String>,
    key: &str,
    slot: &mut T,
) {
    let Some(raw) = var(key) else {
        return;
    };
    match raw.trim().parse() {
        Ok(v) => *slot = v,
        Err(_) => tracing::warn!(key, value = %raw, "ignoring unparseable environment override"),
    }
}
