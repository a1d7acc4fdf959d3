//! UDP peer fabric for inter-robot messaging.
//!
//! Envelopes are framed the same way on every transport:
//!
//! ```text
//! ┌──────────────────┬──────────────────────────┐
//! │ Length (4 bytes) │ Postcard envelope        │
//! │ Big-endian u32   │ (variable size)          │
//! └──────────────────┴──────────────────────────┘
//! ```
//!
//! Sends are best-effort unicast to every configured peer; a background
//! thread receives frames and routes them to local subscribers. Published
//! envelopes are also delivered locally, so a robot hears fleet-wide topics
//! it publishes on.

use super::bus::{Envelope, LocalBus, MessageBus};
use crate::config::NetworkConfig;
use crossbeam_channel::Receiver;
use serde::{Deserialize, Serialize};
use std::net::{SocketAddr, ToSocketAddrs, UdpSocket};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Maximum UDP datagram size accepted.
const MAX_DATAGRAM_SIZE: usize = 65_536;

#[derive(Serialize, Deserialize)]
struct WireEnvelope {
    topic: String,
    payload: Vec<u8>,
}

/// UDP transport connecting a fixed set of peers.
pub struct UdpTransport {
    socket: UdpSocket,
    peers: Vec<SocketAddr>,
    router: LocalBus,
}

impl UdpTransport {
    /// Bind the socket, resolve peers, and start the receive thread.
    pub fn bind(
        config: &NetworkConfig,
        running: Arc<AtomicBool>,
    ) -> std::io::Result<Arc<Self>> {
        let socket = UdpSocket::bind(&config.bind_addr)?;
        socket.set_read_timeout(Some(Duration::from_millis(200)))?;

        let mut peers = Vec::new();
        for peer in &config.peers {
            match peer.to_socket_addrs() {
                Ok(mut addrs) => {
                    if let Some(addr) = addrs.next() {
                        peers.push(addr);
                    }
                }
                Err(e) => log::warn!("ignoring unresolvable peer {peer}: {e}"),
            }
        }
        log::info!(
            "udp transport bound to {} with {} peers",
            config.bind_addr,
            peers.len()
        );

        let transport = Arc::new(Self {
            socket,
            peers,
            router: LocalBus::new(),
        });

        let receiver = Arc::clone(&transport);
        thread::Builder::new()
            .name("udp-recv".into())
            .spawn(move || receiver.recv_loop(running))
            .expect("Failed to spawn UDP receive thread");

        Ok(transport)
    }

    fn recv_loop(&self, running: Arc<AtomicBool>) {
        let mut buf = vec![0u8; MAX_DATAGRAM_SIZE];
        while running.load(Ordering::Relaxed) {
            let len = match self.socket.recv(&mut buf) {
                Ok(len) => len,
                Err(e)
                    if e.kind() == std::io::ErrorKind::WouldBlock
                        || e.kind() == std::io::ErrorKind::TimedOut =>
                {
                    continue;
                }
                Err(e) => {
                    log::warn!("udp receive failed: {e}");
                    continue;
                }
            };
            match decode_frame(&buf[..len]) {
                Some(envelope) => self.router.publish(envelope),
                None => log::debug!("dropping malformed {len}-byte datagram"),
            }
        }
        log::info!("udp receive thread stopping");
    }
}

impl MessageBus for UdpTransport {
    fn publish(&self, envelope: Envelope) {
        if let Some(frame) = encode_frame(&envelope) {
            for peer in &self.peers {
                // Best-effort; UDP losses surface as round timeouts.
                if let Err(e) = self.socket.send_to(&frame, peer) {
                    log::trace!("udp send to {peer} failed: {e}");
                }
            }
        }
        self.router.publish(envelope);
    }

    fn subscribe(&self, topic: &str) -> Receiver<Envelope> {
        self.router.subscribe(topic)
    }
}

fn encode_frame(envelope: &Envelope) -> Option<Vec<u8>> {
    let wire = WireEnvelope {
        topic: envelope.topic.clone(),
        payload: envelope.payload.clone(),
    };
    let body = match postcard::to_allocvec(&wire) {
        Ok(body) => body,
        Err(e) => {
            log::warn!("envelope encode failed: {e}");
            return None;
        }
    };
    let mut frame = Vec::with_capacity(4 + body.len());
    frame.extend_from_slice(&(body.len() as u32).to_be_bytes());
    frame.extend_from_slice(&body);
    Some(frame)
}

fn decode_frame(frame: &[u8]) -> Option<Envelope> {
    if frame.len() < 4 {
        return None;
    }
    let len = u32::from_be_bytes([frame[0], frame[1], frame[2], frame[3]]) as usize;
    let body = frame.get(4..4 + len)?;
    let wire: WireEnvelope = postcard::from_bytes(body).ok()?;
    Some(Envelope::new(wire.topic, wire.payload))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_roundtrip() {
        let envelope = Envelope::new("/pose_graph", vec![1, 2, 3, 4]);
        let frame = encode_frame(&envelope).unwrap();
        let back = decode_frame(&frame).unwrap();
        assert_eq!(back.topic, "/pose_graph");
        assert_eq!(back.payload, vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_decode_rejects_short_frames() {
        assert!(decode_frame(&[]).is_none());
        assert!(decode_frame(&[0, 0, 0]).is_none());
        // Length prefix larger than the body.
        assert!(decode_frame(&[0, 0, 0, 10, 1, 2]).is_none());
    }

    #[test]
    fn test_loopback_delivery() {
        let running = Arc::new(AtomicBool::new(true));
        let config = NetworkConfig {
            bind_addr: "127.0.0.1:0".to_string(),
            peers: Vec::new(),
        };
        let transport = UdpTransport::bind(&config, Arc::clone(&running)).unwrap();
        let rx = transport.subscribe("/t");
        transport.publish(Envelope::new("/t", vec![5]));
        assert_eq!(rx.recv().unwrap().payload, vec![5]);
        running.store(false, Ordering::Relaxed);
    }
}
