use thiserror::Error;

/// Failures talking to the bridge actor
#[derive(Debug, Error)]
pub enum CommandError {
	/// The actor has stopped
	#[error("Bridge actor is not running")]
	ChannelClosed,

	/// The actor stopped before answering
	#[error("Bridge actor dropped the response")]
	ResponseLost,
}
