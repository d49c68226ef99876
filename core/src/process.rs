//! The sequenced block processing pipeline.
//!
//! Stages run strictly in order and abort on the first error. Fork
//! notifications are emitted before the error that caused them is
//! surfaced, and the fork-two rollback (undo, then mempool removal)
//! happens before the underlying error propagates; downstream accounting
//! relies on that ordering.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use arkona_config::chain;
use arkona_data_model::prelude::*;
use parking_lot::Mutex;

use crate::{
    modules::{
        AccountLedger, BlockStore, ChainApplication, DelegateLedger, ForkCause, TransactionPool,
    },
    verify::{BlockVerifier, Receipt, RecentBlockIds, RejectionReason},
};

/// A block was refused by the processing pipeline.
#[derive(Debug, displaydoc::Display, thiserror::Error)]
pub enum ProcessError {
    /// Cleaning up
    CleaningUp,
    /// Blockchain is loading
    BlockchainLoading,
    /// {0}
    Normalize(#[from] NormalizeError),
    /// {0}
    Rejected(RejectionReason),
    /// Block {0} already exists
    AlreadyExists(BlockId),
    /// {0}
    SlotValidation(eyre::Report),
    /// {0}
    Transaction(eyre::Report),
    /// {0}
    Collaborator(eyre::Report),
}

/// Orchestrates normalise → verify → broadcast → storage checks →
/// per-transaction checks → chain application for every candidate block.
pub struct BlockPipeline {
    verifier: BlockVerifier,
    store: Arc<dyn BlockStore>,
    chain: Arc<dyn ChainApplication>,
    delegates: Arc<dyn DelegateLedger>,
    accounts: Arc<dyn AccountLedger>,
    transactions: Arc<dyn TransactionPool>,
    recent_ids: Arc<Mutex<RecentBlockIds>>,
    block_slot_window: usize,
    loaded: AtomicBool,
}

impl BlockPipeline {
    /// Wire the pipeline to its collaborators.
    ///
    /// The pipeline refuses work until [`Self::on_bind`] is called.
    #[must_use]
    pub fn new(
        configuration: &chain::Configuration,
        store: Arc<dyn BlockStore>,
        chain: Arc<dyn ChainApplication>,
        delegates: Arc<dyn DelegateLedger>,
        accounts: Arc<dyn AccountLedger>,
        transactions: Arc<dyn TransactionPool>,
    ) -> Self {
        let block_slot_window = configuration.block_slot_window as usize;
        let recent_ids = Arc::new(Mutex::new(RecentBlockIds::new(block_slot_window)));
        let verifier = BlockVerifier::new(
            configuration,
            Arc::clone(&store),
            Arc::clone(&delegates),
            Arc::clone(&recent_ids),
        );

        Self {
            verifier,
            store,
            chain,
            delegates,
            accounts,
            transactions,
            recent_ids,
            block_slot_window,
            loaded: AtomicBool::new(false),
        }
    }

    /// All subsystems are wired; start accepting work.
    pub fn on_bind(&self) {
        self.loaded.store(true, Ordering::SeqCst);
        arkona_logger::debug!("Block pipeline bound, accepting work");
    }

    /// Whether the pipeline accepts work.
    #[must_use]
    pub fn is_loaded(&self) -> bool {
        self.loaded.load(Ordering::SeqCst)
    }

    /// Rebuild the recent-id window from storage.
    ///
    /// Failures are logged but do not abort startup; the window then
    /// fills organically as blocks arrive.
    pub async fn on_blockchain_ready(&self) {
        match self.store.load_last_block_ids(self.block_slot_window).await {
            Ok(ids) => self.recent_ids.lock().replace(ids),
            Err(err) => {
                arkona_logger::error!(%err, "Failed to load recent block ids");
            }
        }
    }

    /// Record a freshly accepted block in the recent-id window.
    pub fn on_new_block(&self, block: &Block) {
        if let Some(id) = block.id {
            self.recent_ids.lock().push(id);
        }
    }

    /// Receipt-time verification for opportunistically received blocks.
    ///
    /// See [`BlockVerifier::verify_receipt`].
    pub fn verify_receipt(&self, block: &mut Block) -> Receipt {
        self.verifier.verify_receipt(block)
    }

    /// Run a candidate block through the full pipeline.
    ///
    /// `broadcast` marks blocks that should be relayed to peers on
    /// acceptance; those arrive fully populated, whereas replayed blocks
    /// (`broadcast == false`) arrive compact and get their canonical
    /// defaults filled first. `save_block` is forwarded to the
    /// chain-application stage.
    ///
    /// # Errors
    /// The first failing stage aborts processing; see [`ProcessError`].
    pub async fn process_block(
        &self,
        draft: BlockDraft,
        broadcast: bool,
        save_block: bool,
    ) -> Result<Block, ProcessError> {
        if self.store.is_cleaning() {
            return Err(ProcessError::CleaningUp);
        }
        if !self.is_loaded() {
            return Err(ProcessError::BlockchainLoading);
        }

        let draft = if broadcast { draft } else { draft.add_properties() };
        let mut block = draft.normalize()?;

        let receipt = self.verifier.verify_block(&mut block);
        if let Err(reason) = receipt.into_result() {
            arkona_logger::warn!(height = block.height, %reason, "Block verification failed");
            return Err(ProcessError::Rejected(reason));
        }

        if broadcast {
            self.chain.broadcast_reduced_block(block.reduce(), broadcast);
        }

        let id = block.id.expect("INTERNAL BUG: verified block carries an id");
        if self
            .store
            .block_exists(id)
            .await
            .map_err(ProcessError::Collaborator)?
        {
            return Err(ProcessError::AlreadyExists(id));
        }

        if let Err(err) = self.delegates.validate_block_slot(&block).await {
            arkona_logger::warn!(block = %id, "Delegate slot validation failed");
            self.delegates.fork(&block, ForkCause::WrongSlotDelegate);
            return Err(ProcessError::SlotValidation(err));
        }

        self.check_transactions(&mut block).await?;

        self.chain
            .apply_block(&block, save_block)
            .await
            .map_err(ProcessError::Collaborator)?;

        Ok(block)
    }

    // Transactions run strictly in block order: later ones may read state
    // mutated by earlier ones in the same block.
    async fn check_transactions(&self, block: &mut Block) -> Result<(), ProcessError> {
        let block_id = block.id.expect("INTERNAL BUG: verified block carries an id");

        let mut index = 0;
        while let Some(tx) = block.transactions.get_mut(index) {
            let id = tx
                .calculate_id()
                .map_err(|err| ProcessError::Transaction(eyre::Report::new(err)))?;
            tx.id = Some(id);
            tx.block_id = Some(block_id);
            let transaction = tx.clone();

            if let Err(err) = self.transactions.check_confirmed(&transaction).await {
                self.delegates
                    .fork(block, ForkCause::DuplicateConfirmedTransaction);
                if let Err(undo_err) = self.transactions.undo_unconfirmed(&transaction).await {
                    arkona_logger::warn!(transaction = %id, %undo_err, "Failed to undo unconfirmed transaction");
                }
                self.transactions.remove_unconfirmed(id);
                return Err(ProcessError::Transaction(err));
            }

            let sender = self
                .accounts
                .account_by_public_key(transaction.sender_public_key)
                .await
                .map_err(ProcessError::Collaborator)?;
            transaction
                .verify(sender.as_ref())
                .map_err(|err| ProcessError::Transaction(eyre::Report::new(err)))?;

            index += 1;
        }

        Ok(())
    }
}
