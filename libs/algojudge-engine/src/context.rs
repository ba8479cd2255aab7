//! Per-run state threaded through the grading pipeline.
//!
//! Each `execute` call owns exactly one [`RunContext`]. Nothing here is
//! global, so concurrent runs never interleave their logs.

use tokio_util::sync::CancellationToken;
use uuid::Uuid;

pub const DEFAULT_MAX_LOG_BYTES: usize = 64 * 1024;
pub const TRUNCATION_NOTICE: &str = "[log output truncated]";

#[derive(Debug, Clone)]
pub struct RunContext {
    pub run_id: Uuid,
    pub cancel: CancellationToken,
    timeout_ms: Option<u64>,
    logs: Vec<String>,
    log_bytes: usize,
    max_log_bytes: usize,
    truncated: bool,
}

impl RunContext {
    pub fn new(run_id: Uuid, cancel: CancellationToken) -> Self {
        Self {
            run_id,
            cancel,
            timeout_ms: None,
            logs: Vec::new(),
            log_bytes: 0,
            max_log_bytes: DEFAULT_MAX_LOG_BYTES,
            truncated: false,
        }
    }

    pub fn with_max_log_bytes(mut self, max_log_bytes: usize) -> Self {
        self.max_log_bytes = max_log_bytes;
        self
    }

    /// Per-invocation wall-clock limit overriding the sandbox default.
    pub fn with_timeout_ms(mut self, timeout_ms: Option<u64>) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    pub fn timeout_ms(&self) -> Option<u64> {
        self.timeout_ms
    }

    /// Appends one line. Once the byte limit is reached a single truncation
    /// notice is recorded and further lines are dropped.
    pub fn log(&mut self, line: impl Into<String>) {
        if self.truncated {
            return;
        }
        let line = line.into();
        if self.log_bytes + line.len() > self.max_log_bytes {
            self.truncated = true;
            self.logs.push(TRUNCATION_NOTICE.to_string());
            return;
        }
        self.log_bytes += line.len() + 1;
        self.logs.push(line);
    }

    pub fn extend<I, S>(&mut self, lines: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for line in lines {
            self.log(line);
        }
    }

    pub fn reset(&mut self) {
        self.logs.clear();
        self.log_bytes = 0;
        self.truncated = false;
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn lines(&self) -> &[String] {
        &self.logs
    }

    pub fn render_logs(&self) -> String {
        self.logs.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context() -> RunContext {
        RunContext::new(Uuid::new_v4(), CancellationToken::new())
    }

    #[test]
    fn test_log_and_render() {
        let mut ctx = context();
        ctx.log("first");
        ctx.extend(["second", "third"]);
        assert_eq!(ctx.render_logs(), "first\nsecond\nthird");
    }

    #[test]
    fn test_truncates_once() {
        let mut ctx = context().with_max_log_bytes(10);
        ctx.log("12345");
        ctx.log("67890abc");
        ctx.log("more");
        assert_eq!(ctx.lines(), ["12345", TRUNCATION_NOTICE]);
    }

    #[test]
    fn test_reset_clears_truncation() {
        let mut ctx = context().with_max_log_bytes(4);
        ctx.log("too long");
        ctx.reset();
        ctx.log("ok");
        assert_eq!(ctx.lines(), ["ok"]);
    }

    #[test]
    fn test_cancellation_is_shared() {
        let ctx = context();
        let handle = ctx.cancel.clone();
        assert!(!ctx.is_cancelled());
        handle.cancel();
        assert!(ctx.is_cancelled());
    }
}
