//! Camera and microphone stream ownership
//!
//! A [`DeviceSlot`] guards one physical device. Acquiring it opens the stream
//! through a [`MediaSource`] and returns a [`StreamLease`]; while a lease is alive
//! no other session can acquire the slot. A lease closes its stream exactly once,
//! on [`StreamLease::release`] or on drop.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::TherapyError;

/// Kind of capture device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Camera,
    Microphone,
}

impl MediaKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Camera => "camera",
            MediaKind::Microphone => "microphone",
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An open capture stream
pub trait MediaStream: Send {
    /// Disconnect and close the underlying device stream
    fn close(&mut self);
}

/// Opens capture streams, asking the platform for permission
pub trait MediaSource: Send + Sync {
    /// Fails with [`TherapyError::PermissionDenied`] when access is refused
    fn open(&self, kind: MediaKind) -> Result<Box<dyn MediaStream>, TherapyError>;
}

/// Exclusive-ownership guard for one device
#[derive(Debug, Clone)]
pub struct DeviceSlot {
    kind: MediaKind,
    held: Arc<AtomicBool>,
}

impl DeviceSlot {
    pub fn new(kind: MediaKind) -> Self {
        Self {
            kind,
            held: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn kind(&self) -> MediaKind {
        self.kind
    }

    pub fn is_held(&self) -> bool {
        self.held.load(Ordering::SeqCst)
    }

    /// Claim the slot and open a stream
    ///
    /// The slot is left free when the source refuses access.
    pub fn acquire(&self, source: &dyn MediaSource) -> Result<StreamLease, TherapyError> {
        if self
            .held
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(TherapyError::StreamBusy(self.kind));
        }

        match source.open(self.kind) {
            Ok(stream) => {
                debug!(kind = %self.kind, "stream acquired");
                Ok(StreamLease {
                    kind: self.kind,
                    stream: Some(stream),
                    held: Arc::clone(&self.held),
                })
            }
            Err(e) => {
                self.held.store(false, Ordering::SeqCst);
                warn!(kind = %self.kind, error = %e, "failed to open stream");
                Err(e)
            }
        }
    }
}

/// Exclusive handle on an open stream
pub struct StreamLease {
    kind: MediaKind,
    stream: Option<Box<dyn MediaStream>>,
    held: Arc<AtomicBool>,
}

impl fmt::Debug for StreamLease {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamLease")
            .field("kind", &self.kind)
            .field("open", &self.is_open())
            .finish()
    }
}

impl StreamLease {
    pub fn kind(&self) -> MediaKind {
        self.kind
    }

    pub fn is_open(&self) -> bool {
        self.stream.is_some()
    }

    /// Close the stream and free the slot; returns `false` if already released
    pub fn release(&mut self) -> bool {
        match self.stream.take() {
            Some(mut stream) => {
                stream.close();
                self.held.store(false, Ordering::SeqCst);
                debug!(kind = %self.kind, "stream released");
                true
            }
            None => false,
        }
    }
}

impl Drop for StreamLease {
    fn drop(&mut self) {
        self.release();
    }
}
