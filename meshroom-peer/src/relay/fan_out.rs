use crate::error::RelaySendError;
use crate::transport::Connection;
use meshroom_core::{ConnectionId, RelayEnvelope};
use tracing::{debug, error};

/// Result of one broadcast.
#[derive(Debug, Default)]
pub struct RelayOutcome {
    pub delivered: usize,
    /// Connections that could not take the envelope. The caller prunes them.
    pub failed: Vec<(ConnectionId, RelaySendError)>,
}

impl RelayOutcome {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Sends `envelope` to every connection in `connections` except `except`.
///
/// The envelope is encoded once. A link that is already closed counts as a failure.
pub async fn fan_out(
    connections: &[Connection],
    envelope: &RelayEnvelope,
    except: Option<ConnectionId>,
) -> RelayOutcome {
    let mut outcome = RelayOutcome::default();

    let data = match envelope.encode() {
        Ok(data) => data,
        Err(e) => {
            error!("Failed to encode {} envelope: {}", envelope.kind(), e);
            for connection in connections.iter().filter(|c| Some(c.id()) != except) {
                outcome.failed.push((
                    connection.id(),
                    RelaySendError::Io {
                        connection: connection.id(),
                        reason: e.to_string(),
                    },
                ));
            }
            return outcome;
        }
    };

    for connection in connections {
        if Some(connection.id()) == except {
            continue;
        }
        if !connection.is_open() {
            outcome
                .failed
                .push((connection.id(), RelaySendError::Closed(connection.id())));
            continue;
        }
        match connection.link().send(data.clone()).await {
            Ok(()) => outcome.delivered += 1,
            Err(e) => {
                error!("Relay of {} to {} failed: {}", envelope.kind(), connection.remote(), e);
                outcome.failed.push((connection.id(), e));
            }
        }
    }

    debug!(
        "Relayed {} to {} connection(s), {} failed",
        envelope.kind(),
        outcome.delivered,
        outcome.failed.len()
    );
    outcome
}
