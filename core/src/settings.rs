use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use compact_str::{CompactString, format_compact};

use crate::logging::{Logger, TracingLogger};
use crate::schema::{NamingResolver, SnakeCaseNaming};
use crate::syntax::{AnsiSyntax, SqlSyntax};

/// Monotonically increasing source of names for temporary SQL artifacts.
///
/// Share one sequence between `Settings` that render into the same scope
/// (e.g. one connection) to keep names unique across compilations.
#[derive(Debug, Default)]
pub struct TempIdSequence {
    next: AtomicU64,
}

impl TempIdSequence {
    pub const fn new() -> Self {
        Self {
            next: AtomicU64::new(0),
        }
    }

    pub fn next_id(&self) -> u64 {
        self.next.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn next_alias(&self) -> CompactString {
        format_compact!("rs_tmp_{}", self.next_id())
    }
}

/// Policy objects consulted while compiling and executing.
#[derive(Debug, Clone)]
pub struct Settings {
    pub syntax: Arc<dyn SqlSyntax>,
    pub naming: Arc<dyn NamingResolver>,
    pub logger: Arc<dyn Logger>,
    pub temp_ids: Arc<TempIdSequence>,
}

impl Settings {
    pub fn new(syntax: impl SqlSyntax + 'static) -> Self {
        Self {
            syntax: Arc::new(syntax),
            ..Self::default()
        }
    }

    pub fn with_syntax(mut self, syntax: impl SqlSyntax + 'static) -> Self {
        self.syntax = Arc::new(syntax);
        self
    }

    pub fn with_naming(mut self, naming: impl NamingResolver + 'static) -> Self {
        self.naming = Arc::new(naming);
        self
    }

    pub fn with_logger(mut self, logger: Arc<dyn Logger>) -> Self {
        self.logger = logger;
        self
    }

    pub fn with_temp_ids(mut self, temp_ids: Arc<TempIdSequence>) -> Self {
        self.temp_ids = temp_ids;
        self
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            syntax: Arc::new(AnsiSyntax),
            naming: Arc::new(SnakeCaseNaming),
            logger: Arc::new(TracingLogger),
            temp_ids: Arc::new(TempIdSequence::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::thread;

    use super::*;

    #[test]
    fn temp_ids_never_collide_across_threads() {
        let seq = Arc::new(TempIdSequence::new());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let seq = Arc::clone(&seq);
                thread::spawn(move || (0..250).map(|_| seq.next_id()).collect::<Vec<_>>())
            })
            .collect();

        let mut seen = HashSet::new();
        for handle in handles {
            for id in handle.join().unwrap() {
                assert!(seen.insert(id));
            }
        }
        assert_eq!(seen.len(), 1000);
    }

    #[test]
    fn shared_sequences_continue() {
        let seq = Arc::new(TempIdSequence::new());
        let a = Settings::default().with_temp_ids(Arc::clone(&seq));
        let b = Settings::default().with_temp_ids(seq);
        assert_eq!(a.temp_ids.next_alias(), "rs_tmp_1");
        assert_eq!(b.temp_ids.next_alias(), "rs_tmp_2");
    }
}
