use crate::{
    config::{GlobalConfig, Logger, registry::RegistryLogLevel},
    device::{Device, DeviceInfo},
    platform::{Platform, PlatformDescriptor},
    server::ServerError,
};
use cubeskel_common::device::{DeviceId, DeviceType, PlatformDeviceId};
use std::sync::Arc;
use thiserror::Error;

/// Errors raised while building the device registry.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// The backend reported no platform at all.
    #[error("No compute platform found on the system")]
    NoPlatforms,

    /// The backend failed while enumerating or opening devices.
    #[error("The backend failed during device discovery\nCaused by:\n  {0}")]
    Backend(#[from] ServerError),

    /// An explicit selector doesn't point to an existing device.
    #[error("No device exists at {location}")]
    InvalidSelector {
        /// The requested location.
        location: PlatformDeviceId,
    },

    /// None of the enumerated devices matches the selection criteria.
    #[error("None of the available devices matches the selection {selection}")]
    NoMatchingDevice {
        /// Description of the selection.
        selection: String,
    },

    /// `init` was called on a registry that was already initialized.
    #[error("The device registry is already initialized, call `clear` first")]
    AlreadyInitialized,
}

/// Which devices a [registry](DeviceRegistry) should select.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceSelection {
    kind: SelectionKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum SelectionKind {
    Criteria {
        device_type: Option<DeviceType>,
        count: Option<usize>,
    },
    Explicit(Vec<PlatformDeviceId>),
}

impl Default for DeviceSelection {
    fn default() -> Self {
        Self::all()
    }
}

impl DeviceSelection {
    /// Every device of every platform.
    pub fn all() -> Self {
        Self {
            kind: SelectionKind::Criteria {
                device_type: None,
                count: None,
            },
        }
    }

    /// The first `count` devices in enumeration order.
    pub fn count(count: usize) -> Self {
        Self {
            kind: SelectionKind::Criteria {
                device_type: None,
                count: Some(count),
            },
        }
    }

    /// Restrict the criteria to one device type.
    ///
    /// Has no effect on an explicit selection.
    pub fn device_type(mut self, device_type: DeviceType) -> Self {
        if let SelectionKind::Criteria {
            device_type: selected,
            ..
        } = &mut self.kind
        {
            *selected = Some(device_type);
        }
        self
    }

    /// Exactly the device at the given platform/device position.
    pub fn explicit(platform: usize, device: usize) -> Self {
        Self {
            kind: SelectionKind::Explicit(vec![PlatformDeviceId::new(platform, device)]),
        }
    }

    /// Add another explicit device. Turns a criteria selection into an explicit one.
    pub fn with_device(mut self, platform: usize, device: usize) -> Self {
        let location = PlatformDeviceId::new(platform, device);
        match &mut self.kind {
            SelectionKind::Explicit(locations) => locations.push(location),
            SelectionKind::Criteria { .. } => {
                self.kind = SelectionKind::Explicit(vec![location]);
            }
        }
        self
    }

    /// The selection described by the `registry` section of the [global config](GlobalConfig).
    pub fn from_config() -> Self {
        let config = GlobalConfig::get();
        Self {
            kind: SelectionKind::Criteria {
                device_type: config.registry.device_type,
                count: config.registry.device_count,
            },
        }
    }

    fn select(
        &self,
        platforms: &[PlatformDescriptor],
    ) -> Result<Vec<PlatformDeviceId>, RegistryError> {
        match &self.kind {
            SelectionKind::Explicit(locations) => {
                for location in locations {
                    let exists = platforms
                        .get(location.platform)
                        .is_some_and(|platform| location.device < platform.devices.len());

                    if !exists {
                        return Err(RegistryError::InvalidSelector {
                            location: *location,
                        });
                    }
                }
                Ok(locations.clone())
            }
            SelectionKind::Criteria { device_type, count } => {
                let mut remaining = count.unwrap_or(usize::MAX);
                let mut selected = Vec::new();

                'platforms: for (p, platform) in platforms.iter().enumerate() {
                    for (d, device) in platform.devices.iter().enumerate() {
                        if remaining == 0 {
                            break 'platforms;
                        }
                        if device_type.is_none_or(|ty| ty == device.device_type) {
                            selected.push(PlatformDeviceId::new(p, d));
                            remaining -= 1;
                        }
                    }
                }

                if let Some(count) = count {
                    if !selected.is_empty() && selected.len() < *count {
                        log::warn!(
                            "Requested {count} device(s) but only {} match {self}",
                            selected.len()
                        );
                    }
                }

                Ok(selected)
            }
        }
    }
}

impl core::fmt::Display for DeviceSelection {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match &self.kind {
            SelectionKind::Criteria { device_type, count } => {
                let device_type = device_type
                    .map(|ty| ty.to_string())
                    .unwrap_or_else(|| "any".to_string());
                match count {
                    Some(count) => write!(f, "{{ type: {device_type}, count: {count} }}"),
                    None => write!(f, "{{ type: {device_type}, count: all }}"),
                }
            }
            SelectionKind::Explicit(locations) => {
                let locations = locations
                    .iter()
                    .map(|location| location.to_string())
                    .collect::<Vec<_>>();
                write!(f, "[{}]", locations.join(", "))
            }
        }
    }
}

/// The ordered set of devices a process computes on.
///
/// The registry is an explicit context: it is built once, handed by reference to containers and
/// skeletons, and torn down with [`clear`](DeviceRegistry::clear). Its lifecycle is strictly
/// `init` → use → `clear` and can't be nested.
pub struct DeviceRegistry<P: Platform> {
    platform: P,
    devices: Vec<Device<P::Server>>,
    initialized: bool,
    logger: Arc<spin::Mutex<Logger>>,
}

impl<P: Platform> core::fmt::Debug for DeviceRegistry<P> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("DeviceRegistry")
            .field("platform", &self.platform.name())
            .field("devices", &self.devices)
            .field("initialized", &self.initialized)
            .finish()
    }
}

impl<P: Platform> DeviceRegistry<P> {
    /// Create an uninitialized registry for the given backend.
    pub fn new(platform: P) -> Self {
        Self::with_logger(platform, Logger::new())
    }

    /// Create an uninitialized registry using an explicit logger.
    pub fn with_logger(platform: P, logger: Logger) -> Self {
        Self {
            platform,
            devices: Vec::new(),
            initialized: false,
            logger: Arc::new(spin::Mutex::new(logger)),
        }
    }

    /// Create a registry and initialize it right away.
    pub fn init_with(platform: P, selection: &DeviceSelection) -> Result<Self, RegistryError> {
        let mut registry = Self::new(platform);
        registry.init(selection)?;
        Ok(registry)
    }

    /// Enumerates the platform devices and opens every device matching `selection`, in order.
    ///
    /// Fails if the registry is already initialized, if no platform exists, if the backend
    /// reports an error, or if nothing matches the selection. On failure the registry stays
    /// uninitialized.
    pub fn init(&mut self, selection: &DeviceSelection) -> Result<(), RegistryError> {
        if self.initialized {
            log::error!("Device registry initialized twice without `clear`");
            return Err(RegistryError::AlreadyInitialized);
        }

        let result = self.open_devices(selection);

        match result {
            Ok(devices) => {
                self.log_registry(RegistryLogLevel::Basic, || {
                    format!(
                        "Selected {} device(s) on platform `{}` for {selection}",
                        devices.len(),
                        self.platform.name()
                    )
                });
                self.devices = devices;
                self.initialized = true;
                Ok(())
            }
            Err(err) => {
                log::error!("Device registry initialization failed: {err}");
                Err(err)
            }
        }
    }

    fn open_devices(
        &self,
        selection: &DeviceSelection,
    ) -> Result<Vec<Device<P::Server>>, RegistryError> {
        let platforms = self.platform.platforms()?;
        if platforms.is_empty() {
            return Err(RegistryError::NoPlatforms);
        }

        self.log_registry(RegistryLogLevel::Full, || {
            let mut msg = format!("Found {} platform(s):", platforms.len());
            for (p, platform) in platforms.iter().enumerate() {
                for (d, device) in platform.devices.iter().enumerate() {
                    msg += &format!(
                        "\n  {} `{}` / `{}` ({}, max work group size {})",
                        PlatformDeviceId::new(p, d),
                        platform.name,
                        device.name,
                        device.device_type,
                        device.max_work_group_size,
                    );
                }
            }
            msg
        });

        let locations = selection.select(&platforms)?;
        if locations.is_empty() {
            return Err(RegistryError::NoMatchingDevice {
                selection: selection.to_string(),
            });
        }

        let mut devices = Vec::with_capacity(locations.len());
        for (index, location) in locations.into_iter().enumerate() {
            let descriptor = platforms[location.platform].devices[location.device].clone();
            let server = self.platform.open(location)?;
            let id = DeviceId::new(index as u32);

            self.log_registry(RegistryLogLevel::Full, || {
                format!("Using {location} `{}` as {id}", descriptor.name)
            });

            devices.push(Device::new(
                id,
                DeviceInfo::new(location, descriptor),
                server,
                self.logger.clone(),
            ));
        }

        Ok(devices)
    }

    /// Releases every device and returns the registry to its uninitialized state.
    pub fn clear(&mut self) {
        if self.initialized {
            log::info!("Releasing {} device(s)", self.devices.len());
        }
        self.devices.clear();
        self.initialized = false;
    }

    /// Blocks until every device has drained its queue, in device order.
    pub fn barrier(&self) -> Result<(), ServerError> {
        for device in self.devices.iter() {
            device.wait()?;
        }
        Ok(())
    }

    /// The selected devices, in id order.
    pub fn devices(&self) -> &[Device<P::Server>] {
        &self.devices
    }

    /// The device with the given id.
    pub fn device(&self, id: DeviceId) -> Option<&Device<P::Server>> {
        self.devices.get(id.index())
    }

    /// The number of selected devices.
    pub fn len(&self) -> usize {
        self.devices.len()
    }

    /// Whether no device is selected.
    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    /// Whether `init` succeeded and `clear` hasn't been called since.
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// The backend platform.
    pub fn platform(&self) -> &P {
        &self.platform
    }

    fn log_registry<F: FnOnce() -> String>(&self, level: RegistryLogLevel, msg: F) {
        let mut logger = self.logger.lock();
        let enabled = match (logger.log_level_registry(), level) {
            (RegistryLogLevel::Disabled, _) => false,
            (RegistryLogLevel::Basic, RegistryLogLevel::Full) => false,
            _ => true,
        };

        if enabled {
            logger.log_registry(&msg());
        }
    }
}
