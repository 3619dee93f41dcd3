//! Root composition: the node owns every stateful component and drives
//! block production.
//!
//! A periodic tick drains the mempool, dry-runs the candidate against a
//! state snapshot to learn the post-state root, then hands the sealed
//! block to the chain, which re-executes and commits under state-root
//! agreement. Validator votes and witness attestations arrive here and
//! feed the next header's tier slots. Outbound gossip goes through the
//! [`Broadcaster`] hook; peer-originated items enter through the
//! `accept_remote_*` methods and are never re-broadcast.

use crate::core::block::{Block, BlockHeader};
use crate::core::blockchain::Blockchain;
use crate::core::error::ChainError;
use crate::core::executor::Executor;
use crate::core::mempool::Mempool;
use crate::core::transaction::Transaction;
use crate::core::vote::ValidatorVote;
use crate::core::witness::Witness;
use crate::storage::state_db::StateDb;
use crate::types::address::Address;
use crate::types::hash::Hash;
use crate::{info, warn};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::time::interval;

/// Outbound gossip hook implemented by the P2P collaborator.
///
/// Best-effort: the core never depends on delivery.
pub trait Broadcaster: Send + Sync {
    fn broadcast_tx(&self, tx: &Transaction);
    fn broadcast_block(&self, block: &Block);
}

/// Broadcaster that drops everything; used standalone and in tests.
pub struct NoopBroadcaster;

impl Broadcaster for NoopBroadcaster {
    fn broadcast_tx(&self, _tx: &Transaction) {}
    fn broadcast_block(&self, _block: &Block) {}
}

struct NodeInner {
    /// FIFO queue of verified witness attestations awaiting a tier-3 slot.
    witness_queue: VecDeque<Witness>,
    /// Verified votes bucketed by height, deduped by voter.
    votes: HashMap<u64, Vec<ValidatorVote>>,
}

/// A running node instance.
pub struct Node {
    chain: Arc<Blockchain>,
    state: Arc<StateDb>,
    mempool: Arc<Mempool>,
    executor: Arc<Executor>,
    miner: Address,
    running: AtomicBool,
    inner: Mutex<NodeInner>,
    broadcaster: Arc<dyn Broadcaster>,
}

impl Node {
    /// Wires the node over its owned components.
    ///
    /// `miner` is the proposer written into produced headers; the zero
    /// address disables production.
    pub fn new(
        chain: Arc<Blockchain>,
        state: Arc<StateDb>,
        mempool: Arc<Mempool>,
        executor: Arc<Executor>,
        miner: Address,
        broadcaster: Arc<dyn Broadcaster>,
    ) -> Self {
        Self {
            chain,
            state,
            mempool,
            executor,
            miner,
            running: AtomicBool::new(false),
            inner: Mutex::new(NodeInner {
                witness_queue: VecDeque::new(),
                votes: HashMap::new(),
            }),
            broadcaster,
        }
    }

    /// Spawns the block-production loop on the current tokio runtime.
    ///
    /// One tick per configured block time; idempotent while running.
    pub fn start(self: &Arc<Self>) {
        if self.running.swap(true, Ordering::SeqCst) {
            return;
        }
        info!("node started");

        let node = Arc::clone(self);
        let block_time = Duration::from_secs(node.executor.config().block_time);
        tokio::spawn(async move {
            let mut ticker = interval(block_time);
            // The first tick of a tokio interval fires immediately.
            ticker.tick().await;
            while node.running.load(Ordering::SeqCst) {
                ticker.tick().await;
                node.produce_round();
            }
            info!("node stopped");
        });
    }

    /// Signals the production loop to exit after its current tick.
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    /// Returns `true` while the production loop is live.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Admits a locally submitted transaction and gossips it on success.
    pub fn submit_transaction(&self, tx: Transaction) -> Result<Hash, ChainError> {
        let broadcast_copy = tx.clone();
        let hash = self.mempool.add_tx(tx)?;
        self.broadcaster.broadcast_tx(&broadcast_copy);
        Ok(hash)
    }

    /// Admits a peer-originated transaction without re-broadcasting.
    pub fn accept_remote_transaction(&self, tx: Transaction) -> Result<Hash, ChainError> {
        self.mempool.add_tx(tx)
    }

    /// Applies a peer-originated block without re-broadcasting.
    pub fn accept_remote_block(&self, block: Block) -> Result<(), ChainError> {
        self.chain.add_block(block)
    }

    /// Verifies and enqueues a witness attestation (FIFO).
    pub fn add_witness(&self, witness: Witness) -> Result<(), ChainError> {
        witness.verify()?;
        self.inner.lock().unwrap().witness_queue.push_back(witness);
        Ok(())
    }

    /// Verifies and stores a validator vote for the current head.
    ///
    /// The vote must target the head's height and hash. Duplicate voters
    /// for a height are ignored. The first stored vote for a height fills
    /// the tier-2 slot of the block built on top of it.
    pub fn add_validator_vote(&self, vote: ValidatorVote) -> Result<(), ChainError> {
        vote.verify()?;

        let head = self
            .chain
            .head()
            .ok_or_else(|| ChainError::InvalidBlock("no head to vote on".into()))?;
        if vote.height != head.header.height || vote.block_hash != head.hash() {
            return Err(ChainError::InvalidBlock(
                "vote does not target the current head".into(),
            ));
        }

        let mut inner = self.inner.lock().unwrap();
        let bucket = inner.votes.entry(vote.height).or_default();
        if bucket.iter().any(|v| v.voter == vote.voter) {
            return Ok(());
        }
        bucket.push(vote);
        Ok(())
    }

    /// Runs one production round: drain, dry-run, seal, commit, broadcast.
    ///
    /// Public so deployments (and tests) can drive rounds without the
    /// timer. Does nothing when no miner is configured, no genesis exists,
    /// or the mempool is empty.
    pub fn produce_round(&self) {
        if self.miner.is_zero() {
            return;
        }
        let Some(head) = self.chain.head() else {
            warn!("no genesis block, skipping production round");
            return;
        };

        let config = self.executor.config();
        let mut txs = self.mempool.pop_for_block(config.max_block_txs);
        if txs.is_empty() {
            return;
        }

        // Fee priority decided selection; execution order must follow each
        // sender's nonce sequence or the executor fails the gapped tx.
        txs.sort_by_key(|tx| (tx.sender().unwrap_or(Address::zero()), tx.nonce));

        // Attestations are consumed tentatively. The dry run needs them in
        // the header (the fee split pays into the tier slots, so the state
        // root depends on them); a round that fails to seal puts them back.
        let round_votes = self.take_votes_for(head.header.height);
        let round_witness = self.take_witness();

        let mut header = BlockHeader {
            parent_hash: head.hash(),
            height: head.header.height + 1,
            timestamp: unix_now(),
            gas_limit: config.block_gas_limit,
            proposer: self.miner,
            validator: round_votes
                .first()
                .map(|vote| vote.voter)
                .unwrap_or(Address::zero()),
            witness: round_witness
                .as_ref()
                .map(|w| w.address)
                .unwrap_or(Address::zero()),
            ..BlockHeader::default()
        };

        // Dry run against a snapshot to learn the post-state root. Failing
        // or over-budget transactions drop out of the candidate and go
        // back to the pool.
        let snap = self.state.snapshot();
        self.executor.set_current_header(header.clone());

        let mut included = Vec::with_capacity(txs.len());
        let mut returned = Vec::new();
        let mut gas_left = config.block_gas_limit;
        for tx in txs {
            if tx.gas_limit > gas_left {
                returned.push(tx);
                continue;
            }
            match self.executor.execute_tx(&tx) {
                Ok(receipt) => {
                    gas_left -= receipt.gas_used;
                    included.push(tx);
                }
                Err(e) => {
                    warn!("transaction {} dropped from candidate: {e}", tx.hash());
                    returned.push(tx);
                }
            }
        }

        header.gas_used = config.block_gas_limit - gas_left;
        header.state_root = self.state.state_root();
        self.state.revert_to_snapshot(snap);

        self.readmit(returned);

        if included.is_empty() {
            self.requeue_attestations(head.header.height, round_votes, round_witness);
            return;
        }

        let block = Block::new(header, included);
        match self.chain.add_block(block.clone()) {
            Ok(()) => {
                info!(
                    "block sealed: height={} hash={} txs={}",
                    block.header.height,
                    block.hash(),
                    block.transactions.len()
                );
                self.broadcaster.broadcast_block(&block);
            }
            Err(e) => {
                warn!(
                    "candidate block rejected at height {}: {e}",
                    block.header.height
                );
                self.readmit(block.transactions);
                self.requeue_attestations(head.header.height, round_votes, round_witness);
            }
        }
    }

    /// Removes and returns the vote bucket for `height`.
    ///
    /// The first vote fills the tier-2 slot; the bucket comes back via
    /// [`Node::requeue_attestations`] if the round seals no block.
    fn take_votes_for(&self, height: u64) -> Vec<ValidatorVote> {
        self.inner
            .lock()
            .unwrap()
            .votes
            .remove(&height)
            .unwrap_or_default()
    }

    /// Draws the next queued witness, if any.
    fn take_witness(&self) -> Option<Witness> {
        self.inner.lock().unwrap().witness_queue.pop_front()
    }

    /// Restores attestations consumed by a round that sealed no block.
    ///
    /// The witness returns to the front of the queue and the taken votes
    /// go back ahead of any that arrived mid-round (deduped by voter), so
    /// the attestors keep their original turn.
    fn requeue_attestations(
        &self,
        height: u64,
        votes: Vec<ValidatorVote>,
        witness: Option<Witness>,
    ) {
        if votes.is_empty() && witness.is_none() {
            return;
        }
        let mut inner = self.inner.lock().unwrap();
        if let Some(w) = witness {
            inner.witness_queue.push_front(w);
        }
        if !votes.is_empty() {
            let arrived = inner.votes.remove(&height).unwrap_or_default();
            let mut restored = votes;
            for vote in arrived {
                if !restored.iter().any(|v| v.voter == vote.voter) {
                    restored.push(vote);
                }
            }
            inner.votes.insert(height, restored);
        }
    }

    /// Pushes transactions back through normal admission, dropping any the
    /// pool no longer accepts.
    fn readmit(&self, txs: Vec<Transaction>) {
        for tx in txs {
            if let Err(e) = self.mempool.add_tx(tx) {
                warn!("could not re-admit transaction: {e}");
            }
        }
    }
}

fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}
