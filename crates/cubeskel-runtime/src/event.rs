use crate::server::ServerError;
use cubeskel_common::device::DeviceId;
use cubeskel_common::future::DynFut;
use cubeskel_common::reader::read_sync;

/// Completion handle of an enqueued write.
///
/// The operation runs to completion whether or not the event is waited on; waiting is how
/// the caller observes completion and backend errors.
#[must_use = "events must be waited on to observe completion and errors"]
pub struct Event {
    device: DeviceId,
    fut: DynFut<Result<(), ServerError>>,
}

impl Event {
    /// Wraps the future returned by a server.
    pub fn new(device: DeviceId, fut: DynFut<Result<(), ServerError>>) -> Self {
        Self { device, fut }
    }

    /// The device the operation was enqueued on.
    pub fn device(&self) -> DeviceId {
        self.device
    }

    /// Block until the operation has completed.
    pub fn wait(self) -> Result<(), ServerError> {
        read_sync(self.fut)
    }
}

impl core::fmt::Debug for Event {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Event").field("device", &self.device).finish()
    }
}

/// Completion handle of an enqueued read, resolving to the bytes read.
#[must_use = "read events must be waited on to obtain the data"]
pub struct ReadEvent {
    device: DeviceId,
    fut: DynFut<Result<Vec<u8>, ServerError>>,
}

impl ReadEvent {
    /// Wraps the future returned by a server.
    pub fn new(device: DeviceId, fut: DynFut<Result<Vec<u8>, ServerError>>) -> Self {
        Self { device, fut }
    }

    /// The device the operation was enqueued on.
    pub fn device(&self) -> DeviceId {
        self.device
    }

    /// Block until the data is available.
    pub fn wait(self) -> Result<Vec<u8>, ServerError> {
        read_sync(self.fut)
    }
}

impl core::fmt::Debug for ReadEvent {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ReadEvent")
            .field("device", &self.device)
            .finish()
    }
}

/// A collection of events issued together and waited on once.
#[derive(Debug, Default)]
pub struct Events {
    events: Vec<Event>,
}

impl Events {
    /// Create an empty collection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an event to the collection.
    pub fn push(&mut self, event: Event) {
        self.events.push(event);
    }

    /// The number of events not yet waited on.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Whether the collection holds no event.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Wait on every event in issue order.
    ///
    /// All events are drained even when one of them fails; the first error is returned.
    pub fn wait_all(self) -> Result<(), ServerError> {
        let mut result = Ok(());

        for event in self.events {
            let device = event.device();
            if let Err(err) = event.wait() {
                log::error!("Operation on {device} failed: {err}");
                if result.is_ok() {
                    result = Err(err);
                }
            }
        }

        result
    }
}

impl Extend<Event> for Events {
    fn extend<I: IntoIterator<Item = Event>>(&mut self, iter: I) {
        self.events.extend(iter);
    }
}

impl FromIterator<Event> for Events {
    fn from_iter<I: IntoIterator<Item = Event>>(iter: I) -> Self {
        Self {
            events: iter.into_iter().collect(),
        }
    }
}
