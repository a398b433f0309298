//! The process model behind the island distribution.
//!
//! Every rank runs the same code over its own subset of islands and
//! meets the others at well-defined points: tagged point-to-point
//! sends during migration, one all-gather collective for rank-map
//! synchronisation, and barriers closing each crossover event. The
//! [`Communicator`] trait is that seam. [`SoloWorld`] is the
//! single-process world the driver uses; [`ThreadWorld`] builds an
//! in-process world of N ranks over channels, with identical matching
//! and collective semantics, which is how the multi-rank protocol is
//! exercised under test.
//!
//! All collectives must be entered by every rank in the same cycle; a
//! rank that skips one deadlocks the world.

use crate::error::fatal;
use crate::gene::{GeneFrame, FRAME_BYTES};
use crate::genome::Genome;
use crossbeam_channel::{unbounded, Receiver, Sender};
use std::sync::{Arc, Barrier, Mutex};

pub trait Communicator {
    /// This process's rank in `[0, world_size)`.
    fn rank(&self) -> u32;

    /// Number of ranks participating in the world.
    fn world_size(&self) -> u32;

    /// Synchronous tagged send to `dest`.
    fn send(&self, dest: u32, tag: u32, payload: &[u8]);

    /// Byte length of the next pending message matching `(source, tag)`,
    /// blocking until one arrives. The message is left queued.
    fn probe(&self, source: u32, tag: u32) -> usize;

    /// Matched receive of the next `(source, tag)` message.
    fn recv(&self, source: u32, tag: u32) -> Vec<u8>;

    /// Collective gather of every rank's contribution, concatenated in
    /// rank order and returned on all ranks.
    fn all_gather_v(&self, local: &[u32]) -> Vec<u32>;

    /// Collective barrier over all ranks.
    fn barrier(&self);
}

/// The one-process world: everything is local, collectives are
/// identities, and point-to-point traffic cannot exist.
#[derive(Clone, Copy, Debug, Default)]
pub struct SoloWorld;

impl Communicator for SoloWorld {
    fn rank(&self) -> u32 {
        0
    }

    fn world_size(&self) -> u32 {
        1
    }

    fn send(&self, dest: u32, _tag: u32, _payload: &[u8]) {
        fatal(0, format!("send to rank {dest} in a single-process world"));
    }

    fn probe(&self, source: u32, _tag: u32) -> usize {
        fatal(0, format!("probe of rank {source} in a single-process world"));
    }

    fn recv(&self, source: u32, _tag: u32) -> Vec<u8> {
        fatal(0, format!("receive from rank {source} in a single-process world"));
    }

    fn all_gather_v(&self, local: &[u32]) -> Vec<u32> {
        local.to_vec()
    }

    fn barrier(&self) {}
}

struct Message {
    source: u32,
    tag: u32,
    payload: Vec<u8>,
}

struct SharedWorld {
    barrier: Barrier,
    gather_slots: Mutex<Vec<Vec<u32>>>,
}

/// One rank's endpoint in an in-process world.
///
/// Endpoints are produced as a set by [`ThreadWorld::create`] and moved
/// onto their own threads; each endpoint then behaves exactly like a
/// process rank.
pub struct ThreadWorld {
    rank: u32,
    senders: Vec<Sender<Message>>,
    inbox: Receiver<Message>,
    stash: Mutex<Vec<Message>>,
    shared: Arc<SharedWorld>,
}

impl ThreadWorld {
    /// Build a world of `world_size` connected endpoints.
    pub fn create(world_size: u32) -> Vec<ThreadWorld> {
        assert!(world_size > 0, "world must hold at least one rank");
        let shared = Arc::new(SharedWorld {
            barrier: Barrier::new(world_size as usize),
            gather_slots: Mutex::new(vec![Vec::new(); world_size as usize]),
        });
        let mut senders = Vec::with_capacity(world_size as usize);
        let mut inboxes = Vec::with_capacity(world_size as usize);
        for _ in 0..world_size {
            let (tx, rx) = unbounded();
            senders.push(tx);
            inboxes.push(rx);
        }
        inboxes
            .into_iter()
            .enumerate()
            .map(|(rank, inbox)| ThreadWorld {
                rank: rank as u32,
                senders: senders.clone(),
                inbox,
                stash: Mutex::new(Vec::new()),
                shared: Arc::clone(&shared),
            })
            .collect()
    }

    /// Block until a `(source, tag)` message is stashed; returns its
    /// stash position.
    fn wait_for(&self, source: u32, tag: u32) -> usize {
        loop {
            {
                let stash = self.stash.lock().unwrap();
                if let Some(index) = stash
                    .iter()
                    .position(|m| m.source == source && m.tag == tag)
                {
                    return index;
                }
            }
            match self.inbox.recv() {
                Ok(message) => self.stash.lock().unwrap().push(message),
                Err(_) => fatal(self.rank, "world disconnected while awaiting a message"),
            }
        }
    }
}

impl Communicator for ThreadWorld {
    fn rank(&self) -> u32 {
        self.rank
    }

    fn world_size(&self) -> u32 {
        self.senders.len() as u32
    }

    fn send(&self, dest: u32, tag: u32, payload: &[u8]) {
        if dest as usize >= self.senders.len() {
            fatal(self.rank, format!("send to nonexistent rank {dest}"));
        }
        let message = Message {
            source: self.rank,
            tag,
            payload: payload.to_vec(),
        };
        if self.senders[dest as usize].send(message).is_err() {
            fatal(self.rank, format!("rank {dest} left the world"));
        }
    }

    fn probe(&self, source: u32, tag: u32) -> usize {
        let index = self.wait_for(source, tag);
        self.stash.lock().unwrap()[index].payload.len()
    }

    fn recv(&self, source: u32, tag: u32) -> Vec<u8> {
        let index = self.wait_for(source, tag);
        self.stash.lock().unwrap().remove(index).payload
    }

    fn all_gather_v(&self, local: &[u32]) -> Vec<u32> {
        self.shared.gather_slots.lock().unwrap()[self.rank as usize] = local.to_vec();
        self.shared.barrier.wait();
        let gathered = {
            let slots = self.shared.gather_slots.lock().unwrap();
            slots.iter().flatten().copied().collect()
        };
        // Second wait keeps slow readers ahead of the next gather's writes.
        self.shared.barrier.wait();
        gathered
    }

    fn barrier(&self) {
        self.shared.barrier.wait();
    }
}

/// Serialisation buffer for genome migration.
///
/// Holds a bounded run of gene wire frames; a full genome occupies
/// `genome_length` consecutive frames, multiple genomes are
/// concatenated with no separator.
pub struct FrameBuffer {
    frames: Vec<GeneFrame>,
    gene_capacity: usize,
}

impl FrameBuffer {
    pub fn new(gene_capacity: usize) -> Self {
        Self {
            frames: Vec::with_capacity(gene_capacity),
            gene_capacity,
        }
    }

    pub fn frames(&self) -> &[GeneFrame] {
        &self.frames
    }

    pub fn append_frame(&mut self, frame: GeneFrame) {
        assert!(
            self.frames.len() < self.gene_capacity,
            "transmission buffer overflow"
        );
        self.frames.push(frame);
    }

    pub fn append_genome(&mut self, genome: &Genome) {
        for gene in genome.genes() {
            self.append_frame(gene.frame());
        }
    }

    /// Synchronously transmit the buffer contents to `dest`.
    pub fn transmit<C: Communicator>(&self, comm: &C, dest: u32, tag: u32) {
        let mut bytes = Vec::with_capacity(self.frames.len() * FRAME_BYTES);
        for frame in &self.frames {
            bytes.extend_from_slice(&frame.encode());
        }
        comm.send(dest, tag, &bytes);
    }

    /// Receive a matching transmission into this buffer. The incoming
    /// byte count must decompose into whole frames and fill the buffer
    /// exactly.
    pub fn receive<C: Communicator>(&mut self, comm: &C, source: u32, tag: u32) {
        let byte_count = comm.probe(source, tag);
        if byte_count % FRAME_BYTES != 0 {
            fatal(
                comm.rank(),
                format!("received {byte_count} bytes, not divisible into gene frames"),
            );
        }
        if byte_count / FRAME_BYTES != self.gene_capacity {
            fatal(
                comm.rank(),
                format!(
                    "received {} gene frames into a buffer of {}",
                    byte_count / FRAME_BYTES,
                    self.gene_capacity
                ),
            );
        }
        let bytes = comm.recv(source, tag);
        self.frames.clear();
        for chunk in bytes.chunks_exact(FRAME_BYTES) {
            match GeneFrame::decode(chunk) {
                Some(frame) => self.frames.push(frame),
                None => fatal(
                    comm.rank(),
                    format!("unknown gene function byte {:#04x} on the wire", chunk[0]),
                ),
            }
        }
    }
}
