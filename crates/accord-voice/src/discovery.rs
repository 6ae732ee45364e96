//! UDP IP discovery.
//!
//! Before audio can flow, the client must learn its externally-visible
//! address so the media server can route packets back through NAT. The
//! exchange is one bit-exact 74-byte datagram each way:
//!
//! ```text
//! request:  type(2, 0x0001) | length(2 BE, 70) | ssrc(4 BE) | zeros(64) | zeros(2)
//! response: type(2)         | length(2)        | ssrc(4)    | address(64, NUL-terminated ASCII) | port(2 BE)
//! ```

use std::time::Duration;

use tokio::net::UdpSocket;
use tracing::debug;

use crate::VoiceError;

/// Size of both discovery datagrams.
pub const DISCOVERY_LEN: usize = 74;

/// Request type field of the discovery request.
const REQUEST_TYPE: u16 = 0x0001;

/// Value of the length field: the 70 bytes following it.
const PAYLOAD_LEN: u16 = 70;

/// How long to wait for the discovery response.
const DISCOVERY_TIMEOUT: Duration = Duration::from_secs(5);

/// The externally-visible address learned from discovery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalAddress {
    /// Dotted-quad IP as the server saw it.
    pub ip: String,
    /// Source port as the server saw it.
    pub port: u16,
}

/// Builds the 74-byte discovery request for the given ssrc.
pub fn encode_discovery_request(ssrc: u32) -> [u8; DISCOVERY_LEN] {
    let mut buf = [0u8; DISCOVERY_LEN];
    buf[0..2].copy_from_slice(&REQUEST_TYPE.to_be_bytes());
    buf[2..4].copy_from_slice(&PAYLOAD_LEN.to_be_bytes());
    buf[4..8].copy_from_slice(&ssrc.to_be_bytes());
    // Remaining 66 bytes stay zero.
    buf
}

/// Parses the 74-byte discovery response.
pub fn parse_discovery_response(data: &[u8]) -> Result<ExternalAddress, VoiceError> {
    if data.len() < DISCOVERY_LEN {
        return Err(VoiceError::Discovery(format!(
            "short response: {} bytes",
            data.len()
        )));
    }

    let address = &data[8..72];
    let end = address.iter().position(|&b| b == 0).unwrap_or(address.len());
    let ip = std::str::from_utf8(&address[..end])
        .map_err(|_| VoiceError::Discovery("address is not ASCII".into()))?
        .to_owned();
    let port = u16::from_be_bytes([data[72], data[73]]);

    Ok(ExternalAddress { ip, port })
}

/// Runs the discovery round-trip on a connected socket.
pub async fn discover_external_address(
    socket: &UdpSocket,
    ssrc: u32,
) -> Result<ExternalAddress, VoiceError> {
    let request = encode_discovery_request(ssrc);
    socket.send(&request).await?;
    debug!(ssrc, "ip discovery request sent");

    let mut buf = [0u8; 2048];
    let len = tokio::time::timeout(DISCOVERY_TIMEOUT, socket.recv(&mut buf))
        .await
        .map_err(|_| VoiceError::Discovery("no response within timeout".into()))??;

    let external = parse_discovery_response(&buf[..len])?;
    debug!(ip = %external.ip, port = external.port, "ip discovery successful");
    Ok(external)
}

// =========================================================================
// Tests
// =========================================================================
