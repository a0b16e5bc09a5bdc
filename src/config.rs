//! Runtime configuration types.

/// Default operand stack depth limit.
pub const DEFAULT_STACK_LIMIT: usize = 256;

/// Output format for the driver's timing report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TimingsFormat {
    #[default]
    Human,
    Json,
}

/// Runtime configuration for the VM.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Print each instruction and the stack to stderr before executing it
    pub trace_execution: bool,
    /// Maximum operand stack depth; pushing past it is a runtime error
    pub stack_limit: usize,
    /// Print heap registry statistics after shutdown
    pub heap_stats: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            trace_execution: false,
            stack_limit: DEFAULT_STACK_LIMIT,
            heap_stats: false,
        }
    }
}
