//! Canonical chain: block indexing and atomic commit under state-root
//! agreement.
//!
//! `add_block` is the only writer of the block indexes and the head
//! pointer, and holds the chain's exclusive lock for its entire duration:
//! validation, execution, root check, commit. Either the full block lands
//! (state root advanced, indexes updated, head moved) or nothing does.
//!
//! There is no fork choice. A block extending some indexed non-head parent
//! is accepted when its height is parent + 1, but the head only advances
//! by height; since one child of the head is produced per round, a single
//! canonical chain emerges in practice.

use crate::core::block::Block;
use crate::core::error::ChainError;
use crate::core::executor::Executor;
use crate::storage::state_db::StateDb;
use crate::types::hash::Hash;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

struct ChainStore {
    by_hash: HashMap<Hash, Arc<Block>>,
    by_height: HashMap<u64, Arc<Block>>,
    head: Option<Arc<Block>>,
}

/// The canonical chain with full state execution.
pub struct Blockchain {
    state: Arc<StateDb>,
    executor: Arc<Executor>,
    store: RwLock<ChainStore>,
}

impl Blockchain {
    /// Initializes an empty chain over a state store and executor.
    pub fn new(state: Arc<StateDb>, executor: Arc<Executor>) -> Self {
        Self {
            state,
            executor,
            store: RwLock::new(ChainStore {
                by_hash: HashMap::new(),
                by_height: HashMap::new(),
                head: None,
            }),
        }
    }

    /// Returns the current tip block, if any.
    pub fn head(&self) -> Option<Arc<Block>> {
        self.store.read().unwrap().head.clone()
    }

    /// Returns the height of the current tip (0 when only genesis exists).
    pub fn height(&self) -> u64 {
        self.store
            .read()
            .unwrap()
            .head
            .as_ref()
            .map(|b| b.header.height)
            .unwrap_or(0)
    }

    /// Looks up an indexed block by its id.
    pub fn get_block_by_hash(&self, hash: Hash) -> Option<Arc<Block>> {
        self.store.read().unwrap().by_hash.get(&hash).cloned()
    }

    /// Looks up an indexed block by height.
    pub fn get_block_by_height(&self, height: u64) -> Option<Arc<Block>> {
        self.store.read().unwrap().by_height.get(&height).cloned()
    }

    /// Validates, executes, and commits a block.
    ///
    /// Wraps the whole attempt in a state snapshot: any rejection (bad
    /// parent, bad height, execution failure, state-root disagreement)
    /// reverts to the pre-call state before the error propagates.
    pub fn add_block(&self, block: Block) -> Result<(), ChainError> {
        block.validate_basic()?;

        let mut store = self.store.write().unwrap();
        let snap = self.state.snapshot();

        if block.header.height == 0 {
            if store.head.is_some() {
                self.state.revert_to_snapshot(snap);
                return Err(ChainError::GenesisAlreadyExists);
            }

            self.executor.set_current_header(block.header.clone());
            if !block.transactions.is_empty() {
                if let Err(e) = self.executor.execute_block(&block) {
                    self.state.revert_to_snapshot(snap);
                    return Err(e);
                }
            }

            let computed = self.state.state_root();
            if computed != block.header.state_root {
                self.state.revert_to_snapshot(snap);
                return Err(ChainError::StateRootMismatch {
                    header: block.header.state_root,
                    computed,
                });
            }

            self.state.commit_snapshot(snap);
            Self::commit_block(&mut store, block);
            return Ok(());
        }

        let parent = match store.by_hash.get(&block.header.parent_hash) {
            Some(parent) => Arc::clone(parent),
            None => {
                self.state.revert_to_snapshot(snap);
                return Err(ChainError::UnknownParent(block.header.parent_hash));
            }
        };
        if block.header.height != parent.header.height + 1 {
            self.state.revert_to_snapshot(snap);
            return Err(ChainError::InvalidHeight {
                expected: parent.header.height + 1,
                got: block.header.height,
            });
        }

        if let Err(e) = self.executor.execute_block(&block) {
            self.state.revert_to_snapshot(snap);
            return Err(e);
        }

        let computed = self.state.state_root();
        if computed != block.header.state_root {
            self.state.revert_to_snapshot(snap);
            return Err(ChainError::StateRootMismatch {
                header: block.header.state_root,
                computed,
            });
        }

        self.state.commit_snapshot(snap);
        Self::commit_block(&mut store, block);
        Ok(())
    }

    /// Indexes the block and advances the head monotonically by height.
    fn commit_block(store: &mut ChainStore, block: Block) {
        let block = Arc::new(block);
        store.by_hash.insert(block.hash(), Arc::clone(&block));
        store
            .by_height
            .insert(block.header.height, Arc::clone(&block));

        let advances = match &store.head {
            Some(head) => block.header.height > head.header.height,
            None => true,
        };
        if advances {
            store.head = Some(block);
        }
    }
}
