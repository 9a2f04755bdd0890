pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Invalid input: {message}")]
	InvalidInput { message: String },
	#[error("Retrieval failed at {stage}: {message}")]
	Retrieval { stage: &'static str, message: String },
	#[error("Stage {stage} exceeded its time budget.")]
	StageTimeout { stage: &'static str },
	#[error("Internal error: {message}")]
	Internal { message: String },
}
impl Error {
	pub fn retrieval(stage: &'static str, err: impl std::fmt::Display) -> Self {
		Self::Retrieval { stage, message: err.to_string() }
	}

	/// Stage-qualified abstention reason reported to callers.
	pub fn reason(&self) -> String {
		match self {
			Self::InvalidInput { message } => format!("invalid_input:{message}"),
			Self::Retrieval { stage, message } => format!("retrieval_error:{stage}:{message}"),
			Self::StageTimeout { stage } => format!("timeout:{stage}"),
			Self::Internal { message } => format!("internal_error:{message}"),
		}
	}
}
