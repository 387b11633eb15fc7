//! Command channel to a running worker's control window.

use std::{fmt, sync::Arc};

use glass_protocol::{ChannelAddress, CommandId, CommandRecord, ProtocolRevision, WindowHandle};
use tracing::{debug, warn};

use crate::{Error, Result, desktop::Desktop};

/// Best-effort command transport to one running worker.
///
/// Addressed by the control window announced at handshake. Sends are
/// fire-and-forget: there is no acknowledgement beyond the transport's own
/// accept/reject, and a rejected send is never retried here.
#[derive(Clone)]
pub struct CommandChannel {
    /// Worker control window.
    address: ChannelAddress,
    /// Host window named as the sender of every record.
    sender: WindowHandle,
    /// Numbering used by the worker.
    revision: ProtocolRevision,
    /// Transport.
    desktop: Arc<dyn Desktop>,
}

impl fmt::Debug for CommandChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandChannel")
            .field("address", &self.address)
            .field("sender", &self.sender)
            .field("revision", &self.revision)
            .finish_non_exhaustive()
    }
}

impl CommandChannel {
    /// Create a channel to `address`.
    pub fn new(
        address: ChannelAddress,
        sender: WindowHandle,
        revision: ProtocolRevision,
        desktop: Arc<dyn Desktop>,
    ) -> Self {
        Self {
            address,
            sender,
            revision,
            desktop,
        }
    }

    /// Worker control window this channel talks to.
    pub fn address(&self) -> ChannelAddress {
        self.address
    }

    /// Send one command.
    pub fn send(&self, command: CommandId, value: i32) -> Result<()> {
        let record = CommandRecord::new(self.revision, command, value)
            .ok_or(Error::UnsupportedCommand(command))?;
        debug!(to = %self.address, %command, value, "send_command");
        if self.desktop.deliver(self.address, self.sender, record) {
            Ok(())
        } else {
            warn!(to = %self.address, %command, value, "command rejected by transport");
            Err(Error::ChannelSend { command, value })
        }
    }
}
