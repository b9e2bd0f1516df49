use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct Paths {
    pub base: PathBuf,
}

impl Paths {
    pub fn new() -> Self {
        let base = dirs::home_dir()
            .map(|h| h.join(".webpilot"))
            .unwrap_or_else(|| PathBuf::from(".webpilot"));
        Self { base }
    }

    pub fn with_base(base: PathBuf) -> Self {
        Self { base }
    }

    pub fn config_file(&self) -> PathBuf {
        self.base.join("config.json")
    }

    /// Per-session browser profile directories live under here.
    pub fn profiles_dir(&self) -> PathBuf {
        self.base.join("profiles")
    }

    pub fn plugins_dir(&self) -> PathBuf {
        self.base.join("plugins")
    }

    /// Default output directory for screenshots and other captures.
    pub fn artifacts_dir(&self) -> PathBuf {
        self.base.join("artifacts")
    }
}

impl Default for Paths {
    fn default() -> Self {
        Self::new()
    }
}
