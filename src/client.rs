//! Client struct definition
//!
//! Represents a live connection: where it came from and the channel its
//! outbound frames are queued on.

use std::net::IpAddr;

use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use crate::error::SendError;
use crate::message::ServerMessage;

/// Connected client information
#[derive(Debug)]
pub struct Client {
    /// Peer IP address
    pub origin: IpAddr,
    /// Server → Client message channel
    pub sender: mpsc::Sender<ServerMessage>,
}

impl Client {
    /// Create a new client with the given origin and sender channel
    pub fn new(origin: IpAddr, sender: mpsc::Sender<ServerMessage>) -> Self {
        Self { origin, sender }
    }

    /// Queue a message for this client without waiting
    ///
    /// Fails if the client's queue is full or the connection is gone.
    pub fn send(&self, msg: ServerMessage) -> Result<(), SendError> {
        self.sender.try_send(msg).map_err(|e| match e {
            TrySendError::Full(_) => SendError::ChannelFull,
            TrySendError::Closed(_) => SendError::ChannelClosed,
        })
    }

    /// Queue the last message this client will get, consuming the client.
    ///
    /// If the queue is full, a task waits for room and sends it; the channel
    /// closes once that task finishes. Never blocks the caller.
    pub fn send_final(self, msg: ServerMessage) -> Result<(), SendError> {
        match self.sender.try_send(msg) {
            Ok(()) => Ok(()),
            Err(TrySendError::Closed(_)) => Err(SendError::ChannelClosed),
            Err(TrySendError::Full(msg)) => {
                let Ok(runtime) = Handle::try_current() else {
                    return Err(SendError::ChannelFull);
                };
                let sender = self.sender;
                runtime.spawn(async move {
                    let _ = sender.send(msg).await;
                });
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::net::Ipv4Addr;

    use super::*;

    fn client(capacity: usize) -> (Client, mpsc::Receiver<ServerMessage>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Client::new(IpAddr::V4(Ipv4Addr::LOCALHOST), tx), rx)
    }

    #[test]
    fn test_client_send() {
        let (client, mut rx) = client(1);

        assert!(client.send(ServerMessage::ChatCleared).is_ok());
        assert!(matches!(
            client.send(ServerMessage::ChatCleared),
            Err(SendError::ChannelFull)
        ));

        assert!(matches!(rx.try_recv(), Ok(ServerMessage::ChatCleared)));
    }

    #[test]
    fn test_client_send_closed() {
        let (client, rx) = client(4);
        drop(rx);

        assert!(matches!(
            client.send(ServerMessage::ChatCleared),
            Err(SendError::ChannelClosed)
        ));
    }

    #[tokio::test]
    async fn test_send_final_waits_for_room() {
        let (client, mut rx) = client(1);
        client.send(ServerMessage::ChatCleared).unwrap();

        let notice = ServerMessage::Kicked {
            reason: "bye".to_string(),
        };
        assert!(client.send_final(notice).is_ok());

        assert!(matches!(rx.recv().await, Some(ServerMessage::ChatCleared)));
        assert!(matches!(rx.recv().await, Some(ServerMessage::Kicked { .. })));
        // Channel closes after the final message
        assert!(rx.recv().await.is_none());
    }

    #[test]
    fn test_send_final_closes_channel() {
        let (client, mut rx) = client(4);
        client.send_final(ServerMessage::ChatCleared).unwrap();

        assert!(matches!(rx.try_recv(), Ok(ServerMessage::ChatCleared)));
        assert!(matches!(
            rx.try_recv(),
            Err(mpsc::error::TryRecvError::Disconnected)
        ));
    }
}
