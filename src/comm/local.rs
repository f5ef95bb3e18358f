//! In-process rank group over channels.
//!
//! [`LocalCluster`] runs one closure per rank on scoped threads. Ranks share
//! nothing but their channel endpoints: every matrix a rank receives is a
//! copy that travelled through a message, so the row-partitioned algorithms
//! see exactly the data flow a multi-process launch would give them.

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{channel, Receiver, Sender};
use std::thread;

use tracing::{debug, trace};

use super::Communicator;
use crate::matrix::Matrix;
use crate::partition::RowPartition;

struct Envelope {
    seq: u64,
    source: usize,
    matrix: Matrix,
}

enum Message {
    Data(Envelope),
    /// The sender panicked; the group cannot complete any further collective.
    Abort { source: usize },
}

/// Panic payload of a rank torn down because a peer failed.
#[derive(Debug)]
struct GroupAborted {
    rank: usize,
    source: usize,
}

/// A fixed-size group of ranks executed on local threads.
#[derive(Debug, Clone, Copy)]
pub struct LocalCluster {
    size: usize,
}

impl LocalCluster {
    /// # Panics
    ///
    /// Panics if `size == 0`.
    pub fn new(size: usize) -> Self {
        assert!(size > 0, "a rank group needs at least one rank");
        Self { size }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Runs `f` once on every rank and returns the per-rank results in rank
    /// order.
    ///
    /// # Panics
    ///
    /// If any rank panics the group aborts: blocked peers are woken and
    /// unwound, and the failing rank's panic is resumed on the caller.
    pub fn run<T, F>(&self, f: F) -> Vec<T>
    where
        T: Send,
        F: Fn(&LocalComm) -> T + Sync,
    {
        debug!(size = self.size, "starting local rank group");

        let (senders, receivers): (Vec<Sender<Message>>, Vec<Receiver<Message>>) =
            (0..self.size).map(|_| channel()).unzip();

        let comms: Vec<LocalComm> = receivers
            .into_iter()
            .enumerate()
            .map(|(rank, receiver)| LocalComm {
                rank,
                size: self.size,
                peers: senders
                    .iter()
                    .enumerate()
                    .map(|(peer, tx)| (peer != rank).then(|| tx.clone()))
                    .collect(),
                receiver,
                seq: Cell::new(0),
                stash: RefCell::new(Vec::new()),
            })
            .collect();
        // Only the ranks may hold senders, so a rank whose peers are all gone
        // sees a disconnect instead of blocking forever.
        drop(senders);

        let f = &f;
        let outcomes: Vec<thread::Result<T>> = thread::scope(|scope| {
            let handles: Vec<_> = comms
                .into_iter()
                .map(|comm| {
                    scope.spawn(move || {
                        let outcome = panic::catch_unwind(AssertUnwindSafe(|| f(&comm)));
                        if outcome.is_err() {
                            comm.abort_peers();
                        }
                        outcome
                    })
                })
                .collect();
            handles
                .into_iter()
                .map(|handle| handle.join().and_then(|outcome| outcome))
                .collect()
        });

        let mut results = Vec::with_capacity(self.size);
        let mut root_cause: Option<Box<dyn Any + Send>> = None;
        let mut aborted: Option<Box<dyn Any + Send>> = None;
        for outcome in outcomes {
            match outcome {
                Ok(value) => results.push(value),
                Err(payload) => match payload.downcast_ref::<GroupAborted>() {
                    Some(abort) => {
                        trace!(rank = abort.rank, failed = abort.source, "rank unwound by group abort");
                        aborted.get_or_insert(payload);
                    }
                    None => {
                        root_cause.get_or_insert(payload);
                    }
                },
            }
        }
        if let Some(payload) = root_cause.or(aborted) {
            panic::resume_unwind(payload);
        }
        results
    }
}

/// One rank's endpoint in a [`LocalCluster`].
pub struct LocalComm {
    rank: usize,
    size: usize,
    /// Sender to every other rank, `None` at this rank's own index.
    peers: Vec<Option<Sender<Message>>>,
    receiver: Receiver<Message>,
    /// Collective sequence number; all ranks advance it in lockstep.
    seq: Cell<u64>,
    /// Messages that arrived ahead of the collective waiting for them.
    stash: RefCell<Vec<Envelope>>,
}

impl LocalComm {
    fn next_seq(&self) -> u64 {
        let seq = self.seq.get();
        self.seq.set(seq + 1);
        seq
    }

    fn send(&self, dest: usize, seq: u64, matrix: Matrix) {
        let Some(tx) = &self.peers[dest] else {
            return;
        };
        // A departed peer either finished or already broadcast its abort.
        if tx
            .send(Message::Data(Envelope {
                seq,
                source: self.rank,
                matrix,
            }))
            .is_err()
        {
            trace!(rank = self.rank, dest, seq, "peer already left the group");
        }
    }

    fn recv_from(&self, seq: u64, source: usize) -> Matrix {
        let mut stash = self.stash.borrow_mut();
        if let Some(pos) = stash
            .iter()
            .position(|e| e.seq == seq && e.source == source)
        {
            return stash.swap_remove(pos).matrix;
        }

        loop {
            match self.receiver.recv() {
                Ok(Message::Data(envelope)) => {
                    if envelope.seq == seq && envelope.source == source {
                        return envelope.matrix;
                    }
                    stash.push(envelope);
                }
                Ok(Message::Abort { source: failed }) => {
                    debug!(rank = self.rank, failed, "aborting after peer failure");
                    panic::panic_any(GroupAborted {
                        rank: self.rank,
                        source: failed,
                    });
                }
                Err(_) => panic!(
                    "rank {} waited on rank {source} after every peer left the group",
                    self.rank
                ),
            }
        }
    }

    fn abort_peers(&self) {
        for tx in self.peers.iter().flatten() {
            // Peers that already exited need no wake-up.
            let _ = tx.send(Message::Abort { source: self.rank });
        }
    }
}

impl Communicator for LocalComm {
    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.size
    }

    fn broadcast(&self, root: usize, matrix: &mut Matrix) {
        assert!(root < self.size, "broadcast root {root} outside group of {}", self.size);
        let seq = self.next_seq();
        if self.rank == root {
            for dest in (0..self.size).filter(|&r| r != root) {
                self.send(dest, seq, matrix.clone());
            }
        } else {
            *matrix = self.recv_from(seq, root);
        }
        trace!(rank = self.rank, root, seq, dims = %matrix.dims(), "broadcast complete");
    }

    fn all_gather_rows(&self, local: &Matrix, partition: &RowPartition, cols: usize) -> Matrix {
        assert_eq!(
            partition.workers(),
            self.size,
            "partition built for another group size"
        );
        let counts = partition.counts(cols);
        let displacements = partition.displacements(cols);
        assert_eq!(
            local.len(),
            counts[self.rank],
            "rank {} contributed a slice of the wrong size",
            self.rank
        );

        let seq = self.next_seq();
        for dest in (0..self.size).filter(|&r| r != self.rank) {
            self.send(dest, seq, local.clone());
        }

        let mut gathered = Matrix::new(partition.total_rows(), cols);
        let out = gathered.as_mut_slice();
        for source in 0..self.size {
            let start = displacements[source];
            let end = start + counts[source];
            if source == self.rank {
                out[start..end].copy_from_slice(local.as_slice());
                continue;
            }
            let slice = self.recv_from(seq, source);
            assert_eq!(
                slice.len(),
                counts[source],
                "rank {source} contributed a slice of the wrong size"
            );
            out[start..end].copy_from_slice(slice.as_slice());
        }
        trace!(rank = self.rank, seq, rows = partition.total_rows(), cols, "all-gather complete");
        gathered
    }
}
