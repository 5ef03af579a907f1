//! Configuration types for transfer tuning and output settings

/// Default size of a single payload read/write
pub const DEFAULT_CHUNK_SIZE: usize = 4 * 1024;

/// Default upper bound on bytes scanned while looking for the end of a header
pub const DEFAULT_MAX_HEADER_LEN: usize = 4 * 1024;

/// Tuning shared by both ends of a transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferConfig {
    /// Maximum number of payload bytes moved by a single read or write
    pub chunk_size: usize,
    /// Maximum number of bytes the receiver buffers before giving up on a header
    pub max_header_len: usize,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            max_header_len: DEFAULT_MAX_HEADER_LEN,
        }
    }
}

impl TransferConfig {
    /// Validate configuration and return errors if invalid
    pub fn validate(&self) -> Result<(), String> {
        if self.chunk_size == 0 {
            return Err("chunk_size must be greater than 0".to_string());
        }
        if self.max_header_len == 0 {
            return Err("max_header_len must be greater than 0".to_string());
        }
        Ok(())
    }
}

/// Output and logging configuration
#[derive(Debug, Clone, Copy, Default)]
pub struct OutputConfig {
    /// Suppress error output
    pub quiet: bool,
    /// Verbosity level: 0=ERROR, 1=INFO, 2=DEBUG, 3=TRACE
    pub verbose: u8,
    /// Print summary at the end
    pub print_summary: bool,
}

impl OutputConfig {
    /// Log level implied by the verbosity flags
    pub fn log_level(&self) -> tracing::Level {
        match self.verbose {
            0 => tracing::Level::ERROR,
            1 => tracing::Level::INFO,
            2 => tracing::Level::DEBUG,
            _ => tracing::Level::TRACE,
        }
    }
}
