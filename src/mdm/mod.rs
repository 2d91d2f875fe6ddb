//! Local MDM query protocol.
//!
//! Each query registers a local management session, sends one SyncML `Get`,
//! classifies the command status and unregisters again. Ordinary failures
//! come back as an unsuccessful [`QueryOutcome`] with a display marker; only
//! [`ChannelError::ThreadingModel`] is returned as an error, because it means
//! no query on this thread can succeed.

pub mod error;
#[cfg(windows)]
pub mod native;
pub mod syncml;

pub use error::{ChannelError, ChannelResult};
#[cfg(windows)]
pub use native::NativeChannel;
pub use syncml::SyncResponse;

/// `RPC_E_CHANGED_MODE`: the apartment model does not allow the call.
pub const RPC_E_CHANGED_MODE: u32 = 0x8001_0106;

pub const NOT_FOUND_MARKER: &str = "Not Found";
pub const EMPTY_MARKER: &str = "(Empty)";

/// Raw result of `ApplyLocalManagementSyncML`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplyResponse {
    pub code: u32,
    pub body: String,
}

/// The native local management entry points.
///
/// Return codes are raw HRESULTs; zero means success.
pub trait ManagementChannel {
    fn register(&mut self) -> u32;
    fn apply(&mut self, request: &str) -> ApplyResponse;
    fn unregister(&mut self) -> u32;
}

/// How a query ended, for summary counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutcomeKind {
    /// Status 200.
    Applied,
    /// Status 404.
    NotFound,
    /// Any other command status (including unparseable, -1).
    Status(i32),
    /// Registration, transport or protocol failure.
    Failed,
}

/// Display value plus success flag for one queried path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryOutcome {
    pub value: String,
    pub success: bool,
    pub kind: OutcomeKind,
}

impl QueryOutcome {
    fn failed(value: String) -> Self {
        Self {
            value,
            success: false,
            kind: OutcomeKind::Failed,
        }
    }

    fn from_response(response: SyncResponse) -> Self {
        match response.status {
            200 => {
                let data = response.data.trim();
                Self {
                    value: if data.is_empty() {
                        EMPTY_MARKER.to_string()
                    } else {
                        data.to_string()
                    },
                    success: true,
                    kind: OutcomeKind::Applied,
                }
            }
            404 => Self {
                value: NOT_FOUND_MARKER.to_string(),
                success: false,
                kind: OutcomeKind::NotFound,
            },
            status => Self {
                value: format!("Status: {status}"),
                success: false,
                kind: OutcomeKind::Status(status),
            },
        }
    }
}

/// SyncML client over a [`ManagementChannel`].
///
/// Holds the command-id counter, so one client must not be shared between
/// concurrent callers.
pub struct LocalMdmClient<C: ManagementChannel> {
    channel: C,
    cmd_counter: u32,
}

impl<C: ManagementChannel> LocalMdmClient<C> {
    pub fn new(channel: C) -> Self {
        Self {
            channel,
            cmd_counter: 0,
        }
    }

    /// The command id used by the most recent request (0 before any).
    pub fn last_command_id(&self) -> u32 {
        self.cmd_counter
    }

    pub fn channel(&self) -> &C {
        &self.channel
    }

    /// Query the current value at `loc_uri`.
    pub fn query_value(&mut self, loc_uri: &str) -> ChannelResult<QueryOutcome> {
        let registered = self.channel.register();
        let result = if registered == 0 {
            self.exchange(loc_uri)
        } else {
            tracing::warn!(
                code = format_args!("0x{registered:08X}"),
                "local management registration failed"
            );
            Ok(QueryOutcome::failed(format!(
                "Register failed: 0x{registered:08X}"
            )))
        };

        let unregistered = self.channel.unregister();
        if unregistered != 0 {
            tracing::warn!(
                code = format_args!("0x{unregistered:08X}"),
                "failed to unregister from local management"
            );
        }

        match result {
            Ok(outcome) => Ok(outcome),
            Err(e) if e.is_fatal() => Err(e),
            Err(e) => {
                tracing::warn!(uri = loc_uri, error = %e, "query failed");
                Ok(QueryOutcome::failed(format!("(Ex: {e})")))
            }
        }
    }

    fn exchange(&mut self, loc_uri: &str) -> ChannelResult<QueryOutcome> {
        self.cmd_counter = self.cmd_counter.wrapping_add(1);
        let request = syncml::build_get(loc_uri, self.cmd_counter);
        let response = self.channel.apply(&request);

        if response.code == RPC_E_CHANGED_MODE {
            return Err(ChannelError::ThreadingModel {
                code: response.code,
            });
        }
        if response.code != 0 {
            return Err(ChannelError::Apply {
                code: response.code,
            });
        }
        if response.body.starts_with("Error") {
            return Err(ChannelError::ErrorBody {
                body: response.body,
            });
        }

        Ok(QueryOutcome::from_response(SyncResponse::parse(
            &response.body,
        )))
    }
}
