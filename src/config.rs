use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{TrotError, TrotErrorKind};

/// Context passed to the log hook on every logged event,
///
/// Mirrors the "library-id / file-id / line / error-code / three integer
/// context values" contract of the external log hook.
///
#[derive(Debug, Clone, Copy)]
pub struct LogRecord {
    pub library_id: u32,
    pub file_id: u32,
    pub line: u32,
    pub error: TrotErrorKind,
    pub context: [i64; 3],
}

/// A synchronous logging callback, invoked in addition to the `tracing`
/// events this crate emits for every mutating operation,
///
pub type LogHook = Arc<dyn Fn(LogRecord) + Send + Sync>;

/// Bundles the allocator budget and log hook threaded through every
/// mutating operation,
///
/// There is no function-pointer allocator hook here (see DESIGN.md) — the
/// crate allocates through the ordinary global allocator and only tracks a
/// running total against an optional ceiling.
///
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct TrotConfig {
    memory_limit: Option<u64>,
    #[serde(skip)]
    log_hook: Option<LogHook>,
}

impl std::fmt::Debug for TrotConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrotConfig")
            .field("memory_limit", &self.memory_limit)
            .field("log_hook", &self.log_hook.is_some())
            .finish()
    }
}

impl TrotConfig {
    /// Returns a config with no memory ceiling and no log hook,
    ///
    pub fn unbounded() -> Self {
        Self::default()
    }

    /// Returns a config with the given memory ceiling,
    ///
    pub fn with_memory_limit(limit: u64) -> Self {
        Self {
            memory_limit: Some(limit),
            log_hook: None,
        }
    }

    /// Installs a log hook, replacing any previous one,
    ///
    pub fn set_log_hook(&mut self, hook: LogHook) {
        self.log_hook = Some(hook);
    }

    pub fn memory_limit(&self) -> Option<u64> {
        self.memory_limit
    }

    pub fn set_memory_limit(&mut self, limit: Option<u64>) {
        self.memory_limit = limit;
    }

    pub(crate) fn log(&self, record: LogRecord) {
        tracing::warn!(
            error = record.error.as_str(),
            file_id = record.file_id,
            line = record.line,
            "{}",
            record.error.as_str()
        );
        if let Some(hook) = &self.log_hook {
            hook(record);
        }
    }
}

/// Tracks the running allocation total against an optional ceiling,
///
/// Charging is checked before any structural mutation happens (per the
/// "Failure semantics" rule: overflow checks precede any mutation), and
/// release always succeeds.
///
#[derive(Debug, Default)]
pub(crate) struct MemoryMeter {
    used: u64,
}

impl MemoryMeter {
    pub(crate) fn charge(&mut self, amount: u64, config: &TrotConfig) -> Result<(), TrotError> {
        if let Some(limit) = config.memory_limit() {
            if self.used.saturating_add(amount) > limit {
                config.log(LogRecord {
                    library_id: 1,
                    file_id: 0,
                    line: line!(),
                    error: TrotErrorKind::MemoryLimitReached,
                    context: [amount as i64, self.used as i64, limit as i64],
                });
                return Err(TrotError::new(TrotErrorKind::MemoryLimitReached));
            }
        }
        self.used += amount;
        Ok(())
    }

    pub(crate) fn release(&mut self, amount: u64) {
        self.used = self.used.saturating_sub(amount);
    }

    pub(crate) fn used(&self) -> u64 {
        self.used
    }
}
