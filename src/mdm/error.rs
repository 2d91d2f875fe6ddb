//! Rich diagnostic error types for the local management channel.

use miette::Diagnostic;
use thiserror::Error;

/// Errors from a single SyncML exchange with the local MDM stack.
#[derive(Debug, Error, Diagnostic)]
pub enum ChannelError {
    #[error("MDM local management requires a multi-threaded apartment (0x{code:08X})")]
    #[diagnostic(
        code(cspscope::mdm::threading_model),
        help(
            "The calling thread was initialized as a single-threaded COM apartment. \
             Run queries from a thread that has not called CoInitialize, or one \
             initialized with COINIT_MULTITHREADED. No query in this batch can succeed."
        )
    )]
    ThreadingModel { code: u32 },

    #[error("unexpected return code from ApplyLocalManagementSyncML: 0x{code:08X}")]
    #[diagnostic(
        code(cspscope::mdm::apply),
        help("The local management stack rejected the request. Check that the process is elevated.")
    )]
    Apply { code: u32 },

    #[error("{body}")]
    #[diagnostic(
        code(cspscope::mdm::error_body),
        help("The local management stack returned an error text instead of a SyncML response.")
    )]
    ErrorBody { body: String },
}

impl ChannelError {
    /// Whether this error makes the whole batch pointless.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::ThreadingModel { .. })
    }
}

/// Convenience alias for channel results.
pub type ChannelResult<T> = std::result::Result<T, ChannelError>;
