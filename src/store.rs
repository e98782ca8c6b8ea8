use std::sync::Mutex;

use chrono::{DateTime, Utc};

use crate::error::{AppError, AppResult};
use crate::models::schedule::{BlockRecord, RecurringSlot};
use crate::models::task::TaskRecord;

/// Durable state the reschedule engine reads from and commits to. The
/// engine only needs these five operations; the backing storage is the
/// host application's concern.
pub trait ScheduleStore: Send + Sync {
    fn tasks(&self) -> AppResult<Vec<TaskRecord>>;

    /// Blocks whose start lies in `[start, end)`.
    fn blocks_in_window(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> AppResult<Vec<BlockRecord>>;

    fn fixed_commitments(&self) -> AppResult<Vec<RecurringSlot>>;

    fn blocked_templates(&self) -> AppResult<Vec<RecurringSlot>>;

    /// Commit a batch of new blocks. Must be all-or-nothing: a failed
    /// insert leaves no partial batch behind.
    fn insert_blocks(&self, blocks: &[BlockRecord]) -> AppResult<()>;
}

#[derive(Default)]
struct StoreInner {
    tasks: Vec<TaskRecord>,
    blocks: Vec<BlockRecord>,
    fixed_commitments: Vec<RecurringSlot>,
    blocked_templates: Vec<RecurringSlot>,
}

/// Mutex-guarded in-process store, used as the reference implementation
/// and by the integration tests.
#[derive(Default)]
pub struct InMemoryStore {
    inner: Mutex<StoreInner>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> AppResult<std::sync::MutexGuard<'_, StoreInner>> {
        self.inner
            .lock()
            .map_err(|_| AppError::store("store lock poisoned"))
    }

    pub fn put_task(&self, task: TaskRecord) -> AppResult<()> {
        let mut inner = self.lock()?;
        match inner.tasks.iter().position(|existing| existing.id == task.id) {
            Some(index) => inner.tasks[index] = task,
            None => inner.tasks.push(task),
        }
        Ok(())
    }

    pub fn put_block(&self, block: BlockRecord) -> AppResult<()> {
        self.lock()?.blocks.push(block);
        Ok(())
    }

    pub fn put_fixed_commitment(&self, slot: RecurringSlot) -> AppResult<()> {
        self.lock()?.fixed_commitments.push(slot);
        Ok(())
    }

    pub fn put_blocked_template(&self, slot: RecurringSlot) -> AppResult<()> {
        self.lock()?.blocked_templates.push(slot);
        Ok(())
    }

    pub fn all_blocks(&self) -> AppResult<Vec<BlockRecord>> {
        Ok(self.lock()?.blocks.clone())
    }
}

impl ScheduleStore for InMemoryStore {
    fn tasks(&self) -> AppResult<Vec<TaskRecord>> {
        Ok(self.lock()?.tasks.clone())
    }

    fn blocks_in_window(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> AppResult<Vec<BlockRecord>> {
        Ok(self
            .lock()?
            .blocks
            .iter()
            .filter(|block| block.start_at >= start && block.start_at < end)
            .cloned()
            .collect())
    }

    fn fixed_commitments(&self) -> AppResult<Vec<RecurringSlot>> {
        Ok(self.lock()?.fixed_commitments.clone())
    }

    fn blocked_templates(&self) -> AppResult<Vec<RecurringSlot>> {
        Ok(self.lock()?.blocked_templates.clone())
    }

    fn insert_blocks(&self, blocks: &[BlockRecord]) -> AppResult<()> {
        self.lock()?.blocks.extend_from_slice(blocks);
        Ok(())
    }
}
