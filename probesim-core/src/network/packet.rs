use crate::node::NodeId;
use std::{
    fmt,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
};

/// a generator for monotonicaly increasing **unique** [`PacketId`]
///
/// Cloning the generator shares the underlying counter, so identifiers
/// stay unique across every thread generating packets.
#[derive(Debug, Clone)]
pub struct PacketIdGenerator(Arc<AtomicU64>);

/// # [`Packet`] Identifier
///
/// During the lifetime of the packet, this identifier can uniquely
/// identify the packet.
///
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PacketId(u64);

/// # An addressed message crossing the ground truth network
///
/// The packet is created by a traffic generator, travels from `source`
/// to `destination` and is handed to the destination [`Switch`]. When the
/// network samples its transit delay it records it as the packet's
/// `true_delay`, so that passive collaborators can compare their
/// estimates against what really happened.
///
/// [`Switch`]: crate::network::Switch
#[derive(Debug, Clone, PartialEq)]
pub struct Packet {
    id: PacketId,
    source: NodeId,
    destination: NodeId,
    true_delay: Option<f64>,
}

impl PacketIdGenerator {
    pub fn new() -> Self {
        Self(Arc::new(AtomicU64::new(1)))
    }

    /// generate a new unique identifier
    pub fn generate(&self) -> PacketId {
        let id = self.0.fetch_add(1, Ordering::SeqCst);

        debug_assert!(
            id != 0,
            "The only case this can be equal to 0 is if the generator overflowed. If this \
            happens it means we have generated `u64::MAX` unique packet identifier and we \
            wrapped around on overflow. This shouldn't happen!"
        );

        PacketId(id)
    }
}

impl Default for PacketIdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl Packet {
    /// Create a packet with a freshly generated identifier.
    pub fn new(generator: &PacketIdGenerator, source: NodeId, destination: NodeId) -> Self {
        Self {
            id: generator.generate(),
            source,
            destination,
            true_delay: None,
        }
    }

    pub fn id(&self) -> PacketId {
        self.id
    }

    pub fn source(&self) -> NodeId {
        self.source
    }

    pub fn destination(&self) -> NodeId {
        self.destination
    }

    /// The transit delay (in milliseconds) the network sampled for this
    /// packet, if it has crossed the network already.
    pub fn true_delay(&self) -> Option<f64> {
        self.true_delay
    }

    pub fn set_true_delay(&mut self, delay: f64) {
        self.true_delay = Some(delay);
    }
}

impl fmt::Display for PacketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:016x}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{collections::HashSet, thread};

    #[test]
    fn ids_are_unique_and_increasing() {
        let generator = PacketIdGenerator::new();
        let first = generator.generate();
        let second = generator.generate();
        assert!(first < second);
    }

    #[test]
    fn clones_share_the_counter() {
        let generator = PacketIdGenerator::new();
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let generator = generator.clone();
                thread::spawn(move || (0..100).map(|_| generator.generate()).collect::<Vec<_>>())
            })
            .collect();

        let mut ids = HashSet::new();
        for handle in handles {
            for id in handle.join().unwrap() {
                assert!(ids.insert(id), "duplicated packet id {id}");
            }
        }
        assert_eq!(ids.len(), 400);
    }

    #[test]
    fn new_packet_has_no_delay() {
        let generator = PacketIdGenerator::new();
        let mut packet = Packet::new(&generator, NodeId::SOURCE, NodeId::DESTINATION);
        assert_eq!(packet.source(), NodeId::SOURCE);
        assert_eq!(packet.destination(), NodeId::DESTINATION);
        assert_eq!(packet.true_delay(), None);

        packet.set_true_delay(9.5);
        assert_eq!(packet.true_delay(), Some(9.5));
    }

    #[test]
    fn display_id() {
        let generator = PacketIdGenerator::new();
        assert_eq!(generator.generate().to_string(), "0x0000000000000001");
    }
}
