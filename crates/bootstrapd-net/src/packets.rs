//! Datagram vocabulary spoken by the production engines.
//!
//! Every datagram starts with a one-byte kind. Presence datagrams carry the
//! sender's public key; the bootstrap-info exchange lets clients query a seed
//! node's version and message of the day without joining the network.

use crate::identity::{PUBLIC_KEY_LEN, PublicKey};

/// Asks the receiver to record the sender as a peer and answer.
pub const PACKET_HELLO: u8 = 0x01;

/// Answer to [`PACKET_HELLO`].
pub const PACKET_HELLO_ACK: u8 = 0x02;

/// Local network announcement.
pub const PACKET_LAN_ANNOUNCE: u8 = 0x21;

/// Bootstrap-info request and response.
pub const PACKET_BOOTSTRAP_INFO: u8 = 0xF0;

/// Exact length of a bootstrap-info request.
pub const INFO_REQUEST_LENGTH: usize = 78;

/// Largest MOTD carried in an info response, counting its terminator.
pub const MAX_INFO_MOTD_LENGTH: usize = 256;

/// Length of a presence datagram.
pub const PRESENCE_LENGTH: usize = 1 + PUBLIC_KEY_LEN;

/// Decoded inbound datagram.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Packet {
    /// A peer introduced itself.
    Hello(PublicKey),
    /// A peer answered our hello.
    HelloAck(PublicKey),
    /// A node on the local segment announced itself.
    LanAnnounce(PublicKey),
    /// A client asked for version and MOTD.
    InfoRequest,
}

impl Packet {
    /// Decodes a datagram, returning `None` for anything unrecognised.
    #[must_use]
    pub fn decode(datagram: &[u8]) -> Option<Self> {
        let (&kind, body) = datagram.split_first()?;
        match kind {
            PACKET_BOOTSTRAP_INFO if datagram.len() == INFO_REQUEST_LENGTH => {
                Some(Self::InfoRequest)
            }
            PACKET_HELLO => presence_key(body).map(Self::Hello),
            PACKET_HELLO_ACK => presence_key(body).map(Self::HelloAck),
            PACKET_LAN_ANNOUNCE => presence_key(body).map(Self::LanAnnounce),
            _ => None,
        }
    }
}

fn presence_key(body: &[u8]) -> Option<PublicKey> {
    let bytes: [u8; PUBLIC_KEY_LEN] = body.try_into().ok()?;
    Some(PublicKey::from_bytes(bytes))
}

/// Encodes a presence datagram of `kind` carrying `key`.
#[must_use]
pub fn presence(kind: u8, key: &PublicKey) -> [u8; PRESENCE_LENGTH] {
    let mut datagram = [0_u8; PRESENCE_LENGTH];
    let (head, tail) = datagram.split_at_mut(1);
    head.copy_from_slice(&[kind]);
    tail.copy_from_slice(key.as_bytes());
    datagram
}

/// Encodes a bootstrap-info response: kind, big-endian version, then the
/// NUL-terminated MOTD.
#[must_use]
#[expect(clippy::big_endian_bytes, reason = "the version field is network byte order")]
pub fn info_response(version: u32, motd: &str) -> Vec<u8> {
    let mut datagram = Vec::with_capacity(1 + 4 + motd.len() + 1);
    datagram.push(PACKET_BOOTSTRAP_INFO);
    datagram.extend_from_slice(&version.to_be_bytes());
    datagram.extend_from_slice(motd.as_bytes());
    datagram.push(0);
    datagram
}
