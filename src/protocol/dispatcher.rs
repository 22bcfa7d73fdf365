use crate::core::command::command_name;
use crate::core::packet::SmbPacket;
use crate::error::{constants, ProtocolError, Result};
use crate::protocol::exchange::AsyncResponseSink;
use crate::utils::metrics::global_metrics;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tokio::sync::mpsc;
use tracing::{debug, warn};

type HandlerFn = dyn Fn(&SmbPacket) -> Result<()> + Send + Sync + 'static;

/// Routes unsolicited packets to handlers keyed by SMB command code.
///
/// Packets with no registered handler go to the fallback channel when one is
/// set, otherwise they are logged and counted.
pub struct Dispatcher {
    handlers: Arc<RwLock<HashMap<u8, Box<HandlerFn>>>>,
    fallback: Option<mpsc::UnboundedSender<SmbPacket>>,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Dispatcher {
    pub fn new() -> Self {
        Self {
            handlers: Arc::new(RwLock::new(HashMap::new())),
            fallback: None,
        }
    }

    pub fn with_fallback(fallback: mpsc::UnboundedSender<SmbPacket>) -> Self {
        Self {
            handlers: Arc::new(RwLock::new(HashMap::new())),
            fallback: Some(fallback),
        }
    }

    pub fn register<F>(&self, command: u8, handler: F) -> Result<()>
    where
        F: Fn(&SmbPacket) -> Result<()> + Send + Sync + 'static,
    {
        let mut handlers = self
            .handlers
            .write()
            .map_err(|_| ProtocolError::Custom(constants::ERR_DISPATCHER_WRITE_LOCK.to_string()))?;

        handlers.insert(command, Box::new(handler));
        Ok(())
    }

    pub fn dispatch(&self, packet: &SmbPacket) -> Result<()> {
        let handlers = self
            .handlers
            .read()
            .map_err(|_| ProtocolError::Custom(constants::ERR_DISPATCHER_READ_LOCK.to_string()))?;

        handlers
            .get(&packet.command())
            .ok_or(ProtocolError::UnexpectedCommand(packet.command()))
            .and_then(|handler| handler(packet))
    }
}

impl AsyncResponseSink for Dispatcher {
    fn process_async_response(&self, packet: &SmbPacket) {
        let command = packet.command();
        match self.dispatch(packet) {
            Ok(()) => debug!(command = command_name(command), "Async packet handled"),
            Err(ProtocolError::UnexpectedCommand(_)) => match &self.fallback {
                Some(fallback) => fallback.process_async_response(packet),
                None => {
                    global_metrics().async_unhandled();
                    warn!(
                        command = command_name(command),
                        mid = packet.multiplex_id(),
                        "No handler for async packet"
                    );
                }
            },
            Err(e) => warn!(
                command = command_name(command),
                error = %e,
                "Async packet handler failed"
            ),
        }
    }
}
