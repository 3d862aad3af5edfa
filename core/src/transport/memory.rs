use super::{Delivery, RecordChannel};
use crate::prelude::{LocalizerError, LocalizerResult};
use std::io;
use std::sync::Mutex;

#[derive(Debug, Default)]
struct State {
    destination: Option<(String, u16)>,
    sent: Vec<Vec<u8>>,
    fail_with: Option<io::ErrorKind>,
}

/// In-memory channel that captures every datagram. Used for dry runs and tests.
#[derive(Debug, Default)]
pub struct MemoryChannel {
    state: Mutex<State>,
}

impl MemoryChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// A channel already "connected" to a placeholder destination.
    pub fn connected() -> Self {
        let channel = Self::new();
        if let Ok(mut state) = channel.state.lock() {
            state.destination = Some(("memory".into(), 0));
        }
        channel
    }

    /// Makes every following send fail with `kind` (or succeed again with `None`).
    pub fn fail_sends(&self, kind: Option<io::ErrorKind>) {
        if let Ok(mut state) = self.state.lock() {
            state.fail_with = kind;
        }
    }

    pub fn sent(&self) -> Vec<Vec<u8>> {
        self.state
            .lock()
            .map(|state| state.sent.clone())
            .unwrap_or_default()
    }

    pub fn destination(&self) -> Option<(String, u16)> {
        self.state
            .lock()
            .ok()
            .and_then(|state| state.destination.clone())
    }
}

impl RecordChannel for MemoryChannel {
    fn connect(&self, host: &str, port: u16) -> LocalizerResult<()> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| LocalizerError::Transport("channel lock poisoned".into()))?;
        state.destination = (!host.is_empty()).then(|| (host.to_string(), port));
        Ok(())
    }

    fn disconnect(&self) {
        if let Ok(mut state) = self.state.lock() {
            state.destination = None;
        }
    }

    fn is_connected(&self) -> bool {
        self.state
            .lock()
            .map(|state| state.destination.is_some())
            .unwrap_or(false)
    }

    fn send(&self, payload: &[u8]) -> LocalizerResult<Delivery> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| LocalizerError::Transport("channel lock poisoned".into()))?;
        if state.destination.is_none() {
            return Ok(Delivery::Skipped);
        }
        if let Some(kind) = state.fail_with {
            return Err(io::Error::new(kind, "simulated send failure").into());
        }
        state.sent.push(payload.to_vec());
        Ok(Delivery::Sent(payload.len()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn captures_payloads_while_connected() {
        let channel = MemoryChannel::connected();
        channel.send(&[1, 2]).unwrap();
        channel.disconnect();
        assert_eq!(channel.send(&[3]).unwrap(), Delivery::Skipped);
        assert_eq!(channel.sent(), vec![vec![1, 2]]);
    }

    #[test]
    fn simulated_failure_surfaces_as_error() {
        let channel = MemoryChannel::connected();
        channel.fail_sends(Some(io::ErrorKind::ConnectionRefused));
        assert!(matches!(channel.send(&[0]), Err(LocalizerError::Io(_))));
        assert!(channel.sent().is_empty());
    }
}
