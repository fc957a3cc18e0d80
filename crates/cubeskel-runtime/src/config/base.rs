use super::{
    distribution::DistributionConfig, registry::RegistryConfig, transfer::TransferConfig,
};
use cubeskel_common::device::DeviceType;
use std::sync::Arc;

/// Static mutex holding the global configuration, initialized as `None`.
static SKEL_GLOBAL_CONFIG: spin::Mutex<Option<Arc<GlobalConfig>>> = spin::Mutex::new(None);

/// Represents the global configuration for CubeSkel, combining registry, transfer and
/// distribution settings.
#[derive(Default, Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct GlobalConfig {
    /// Configuration for device discovery and selection.
    #[serde(default)]
    pub registry: RegistryConfig,

    /// Configuration for host/device transfers.
    #[serde(default)]
    pub transfer: TransferConfig,

    /// Configuration for data distributions.
    #[serde(default)]
    pub distribution: DistributionConfig,
}

impl GlobalConfig {
    /// Retrieves the current global configuration, loading it from the current directory if not
    /// set.
    ///
    /// If no configuration is set, it attempts to load one from `cubeskel.toml` or `CubeSkel.toml`
    /// in the current directory or its parents. If no file is found, a default configuration is
    /// used. Environment variables are applied on top of the loaded file.
    ///
    /// # Notes
    ///
    /// Calling this function takes a global lock. Read the values you need once, during
    /// initialization, rather than on hot paths.
    pub fn get() -> Arc<Self> {
        let mut state = SKEL_GLOBAL_CONFIG.lock();

        match state.as_ref() {
            Some(config) => config.clone(),
            None => {
                let config = Arc::new(Self::from_current_dir().override_from_env());
                *state = Some(config.clone());
                config
            }
        }
    }

    /// Sets the global configuration to the provided value.
    ///
    /// # Panics
    /// Panics if the configuration has already been set or read, as it cannot be overridden.
    ///
    /// # Warning
    /// This method must be called at the start of the program, before any calls to `get`.
    /// Attempting to set the configuration after it has been initialized will cause a panic.
    pub fn set(config: Self) {
        let mut state = SKEL_GLOBAL_CONFIG.lock();
        if state.is_some() {
            panic!("Cannot set the global configuration multiple times.");
        }
        *state = Some(Arc::new(config));
    }

    /// Overrides configuration fields based on environment variables.
    pub fn override_from_env(self) -> Self {
        self.override_from(|key| std::env::var(key).ok())
    }

    /// Overrides configuration fields using the given variable lookup.
    ///
    /// Recognized variables are `CUBESKEL_DEBUG_LOG`, `CUBESKEL_DEVICE_COUNT` and
    /// `CUBESKEL_DEVICE_TYPE`. Values that can't be parsed are ignored with a warning.
    pub fn override_from<F>(mut self, var: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        use super::{registry::RegistryLogLevel, transfer::TransferLogLevel};

        if let Some(val) = var("CUBESKEL_DEBUG_LOG") {
            self.registry.logger.level = RegistryLogLevel::Full;
            self.transfer.logger.level = TransferLogLevel::Full;

            match val.as_str() {
                "stdout" => {
                    self.registry.logger.stdout = true;
                    self.transfer.logger.stdout = true;
                }
                "stderr" => {
                    self.registry.logger.stderr = true;
                    self.transfer.logger.stderr = true;
                }
                "1" | "true" => {
                    let file_path = "/tmp/cubeskel.log";
                    self.registry.logger.file = Some(file_path.into());
                    self.transfer.logger.file = Some(file_path.into());
                }
                "0" | "false" => {
                    self.registry.logger.level = RegistryLogLevel::Disabled;
                    self.transfer.logger.level = TransferLogLevel::Disabled;
                }
                file_path => {
                    self.registry.logger.file = Some(file_path.into());
                    self.transfer.logger.file = Some(file_path.into());
                }
            }
        };

        if let Some(val) = var("CUBESKEL_DEVICE_COUNT") {
            match val.trim().parse::<usize>() {
                Ok(0) => self.registry.device_count = None,
                Ok(count) => self.registry.device_count = Some(count),
                Err(err) => log::warn!("Ignoring CUBESKEL_DEVICE_COUNT={val}: {err}"),
            }
        }

        if let Some(val) = var("CUBESKEL_DEVICE_TYPE") {
            match val.trim().to_ascii_lowercase().as_str() {
                "any" | "all" => self.registry.device_type = None,
                other => match other.parse::<DeviceType>() {
                    Ok(device_type) => self.registry.device_type = Some(device_type),
                    Err(err) => log::warn!("Ignoring CUBESKEL_DEVICE_TYPE: {err}"),
                },
            }
        }

        self
    }

    // Loads configuration from `cubeskel.toml` or `CubeSkel.toml` in the current directory or its
    // parents, walking up until a valid file is found or the root is reached. Falls back to the
    // default configuration.
    fn from_current_dir() -> Self {
        let Ok(mut dir) = std::env::current_dir() else {
            return Self::default();
        };

        loop {
            for name in ["cubeskel.toml", "CubeSkel.toml"] {
                let path = dir.join(name);
                if path.is_file() {
                    match Self::from_file_path(&path) {
                        Ok(config) => return config,
                        Err(err) => {
                            log::warn!("Ignoring configuration file {}: {err}", path.display())
                        }
                    }
                }
            }

            if !dir.pop() {
                break;
            }
        }

        Self::default()
    }

    /// Loads configuration from a specified file path.
    pub fn from_file_path<P: AsRef<std::path::Path>>(path: P) -> std::io::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parses a configuration from TOML text.
    pub fn from_toml(content: &str) -> std::io::Result<Self> {
        toml::from_str(content)
            .map_err(|err| std::io::Error::new(std::io::ErrorKind::InvalidData, err))
    }
}
