//! Events posted from the engine to the UI thread.

use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info, warn};

use crate::{Error, Result, host::HostWindowId};

/// Messages from the engine to the host UI.
///
/// Every event names the host window it concerns; the UI thread is expected
/// to route it back to that window's controller or status widget.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiEvent {
    /// The effect was switched on or off.
    StateChanged {
        /// Window whose effect changed.
        window: HostWindowId,
        /// New state.
        enabled: bool,
    },
    /// The supervisor gave up restarting a crashed worker. Call
    /// `EffectController::release_contrast` from the UI thread.
    EffectDisabledByFailure {
        /// Window whose effect was switched off.
        window: HostWindowId,
    },
    /// A background operation failed and should be reported to the user.
    OperationFailed {
        /// Window the operation ran for.
        window: HostWindowId,
        /// User-facing description.
        message: String,
    },
    /// The number of open host windows changed; call
    /// `EffectController::reconcile_contrast` from the UI thread.
    ReconcileContrast {
        /// Window whose controller should reconcile.
        window: HostWindowId,
    },
}

impl UiEvent {
    /// Host window this event belongs to.
    pub fn window(&self) -> HostWindowId {
        match self {
            Self::StateChanged { window, .. }
            | Self::EffectDisabledByFailure { window }
            | Self::OperationFailed { window, .. }
            | Self::ReconcileContrast { window } => *window,
        }
    }
}

/// Posts [`UiEvent`]s to the UI layer.
#[derive(Clone)]
pub struct NotificationDispatcher {
    /// Sender half of the UI thread's queue.
    tx: UnboundedSender<UiEvent>,
}

impl NotificationDispatcher {
    /// Create a new dispatcher from a UI message channel.
    pub fn new(tx: UnboundedSender<UiEvent>) -> Self {
        Self { tx }
    }

    /// Queue `event`; fails once the UI receiver is gone.
    fn send(&self, event: UiEvent) -> Result<()> {
        self.tx.send(event).map_err(|_| Error::ChannelClosed)
    }

    /// Announce an enable/disable transition.
    pub fn state_changed(&self, window: HostWindowId, enabled: bool) -> Result<()> {
        debug!(%window, enabled, "effect_state_changed");
        self.send(UiEvent::StateChanged { window, enabled })
    }

    /// Tell the user the effect was switched off after repeated crashes.
    pub fn effect_disabled_by_failure(&self, window: HostWindowId) -> Result<()> {
        warn!(%window, "effect_disabled_by_failure");
        self.send(UiEvent::EffectDisabledByFailure { window })
    }

    /// Report a failed operation.
    pub fn operation_failed(&self, window: HostWindowId, message: String) -> Result<()> {
        info!(%window, message = %message, "notification_display");
        self.send(UiEvent::OperationFailed { window, message })
    }

    /// Ask the UI thread to re-evaluate contrast mode for `window`.
    pub fn reconcile_contrast(&self, window: HostWindowId) -> Result<()> {
        self.send(UiEvent::ReconcileContrast { window })
    }
}
