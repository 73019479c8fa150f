//! Client session state machine
//!
//! A session walks linearly through discovery and the three subscriptions
//! until it is initialized. From there every request moves it into a wait
//! state which is left again when the response (and, for the control
//! points, the indication) has arrived.

use crate::ots::CharacteristicIndex;

/// State of one client session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ClientStatus {
    /// Waiting for the connection to become free for discovery
    #[default]
    Begin,
    Discovery,
    SubscribeOacp,
    SubscribeOlcp,
    SubscribeObjectChanged,
    Initialized,
    WaitRead,
    WaitWrite,
    WaitOacp,
    WaitOacpIndication,
    WaitOacpTransfer,
    WaitOlcp,
    WaitOlcpIndication,
    /// Initialization failed
    Error,
    Disconnected,
}

impl ClientStatus {
    /// Whether the session accepts new requests
    pub fn is_idle(&self) -> bool {
        *self == ClientStatus::Initialized
    }

    pub fn is_initializing(&self) -> bool {
        matches!(
            self,
            ClientStatus::Begin
                | ClientStatus::Discovery
                | ClientStatus::SubscribeOacp
                | ClientStatus::SubscribeOlcp
                | ClientStatus::SubscribeObjectChanged
        )
    }

    /// Next step of the initialization sequence
    pub fn next_subscription(self) -> ClientStatus {
        match self {
            ClientStatus::Begin => ClientStatus::Discovery,
            ClientStatus::Discovery => ClientStatus::SubscribeOacp,
            ClientStatus::SubscribeOacp => ClientStatus::SubscribeOlcp,
            ClientStatus::SubscribeOlcp => ClientStatus::SubscribeObjectChanged,
            ClientStatus::SubscribeObjectChanged => ClientStatus::Initialized,
            other => other,
        }
    }

    /// Characteristic whose indications are enabled in this state
    pub fn subscription_target(&self) -> Option<CharacteristicIndex> {
        match self {
            ClientStatus::SubscribeOacp => Some(CharacteristicIndex::Oacp),
            ClientStatus::SubscribeOlcp => Some(CharacteristicIndex::Olcp),
            ClientStatus::SubscribeObjectChanged => Some(CharacteristicIndex::ObjectChanged),
            _ => None,
        }
    }

    /// State after the GATT procedure of a request completed successfully
    ///
    /// Control point writes go on to wait for their indication, plain reads
    /// and writes are done.
    pub fn acknowledged(self) -> ClientStatus {
        match self {
            ClientStatus::WaitOacp => ClientStatus::WaitOacpIndication,
            ClientStatus::WaitOlcp => ClientStatus::WaitOlcpIndication,
            ClientStatus::WaitRead | ClientStatus::WaitWrite => ClientStatus::Initialized,
            other => other,
        }
    }

    /// State once initialization finished
    pub fn initialized(succeeded: bool) -> ClientStatus {
        if succeeded {
            ClientStatus::Initialized
        } else {
            ClientStatus::Error
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initialization_sequence() {
        let mut status = ClientStatus::default();
        let mut visited = vec![status];
        while status != ClientStatus::Initialized {
            status = status.next_subscription();
            visited.push(status);
        }
        assert_eq!(
            visited,
            vec![
                ClientStatus::Begin,
                ClientStatus::Discovery,
                ClientStatus::SubscribeOacp,
                ClientStatus::SubscribeOlcp,
                ClientStatus::SubscribeObjectChanged,
                ClientStatus::Initialized,
            ]
        );
        assert!(visited[..5].iter().all(|status| status.is_initializing()));
        assert_eq!(
            ClientStatus::SubscribeOlcp.subscription_target(),
            Some(CharacteristicIndex::Olcp)
        );
        assert_eq!(ClientStatus::Discovery.subscription_target(), None);
    }

    #[test]
    fn test_acknowledged() {
        assert_eq!(
            ClientStatus::WaitOacp.acknowledged(),
            ClientStatus::WaitOacpIndication
        );
        assert_eq!(
            ClientStatus::WaitOlcp.acknowledged(),
            ClientStatus::WaitOlcpIndication
        );
        assert_eq!(ClientStatus::WaitRead.acknowledged(), ClientStatus::Initialized);
        assert_eq!(
            ClientStatus::WaitOacpTransfer.acknowledged(),
            ClientStatus::WaitOacpTransfer
        );
        assert!(!ClientStatus::WaitWrite.is_idle());
        assert_eq!(ClientStatus::initialized(false), ClientStatus::Error);
    }
}
