use serde::{Serialize, Serializer};
use std::fmt;
use std::io;
use std::process::ExitStatus;

/// Lifecycle of the supervised slot as seen by `status()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
	Idle,
	Running,
	Exited(i32),
}

impl JobState {
	pub fn is_running(&self) -> bool {
		matches!(self, JobState::Running)
	}
}

impl fmt::Display for JobState {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			JobState::Idle => write!(f, "idle"),
			JobState::Running => write!(f, "running"),
			JobState::Exited(code) => write!(f, "exit({})", code),
		}
	}
}

impl Serialize for JobState {
	fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
		serializer.collect_str(self)
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobStatus {
	pub state: JobState,
	pub command: Option<String>,
}

impl JobStatus {
	pub fn idle() -> Self {
		Self {
			state: JobState::Idle,
			command: None,
		}
	}
}

/// Errors from launching a job. Admission conflicts are not errors.
#[derive(Debug)]
pub enum SpawnError {
	/// The command had no program to run.
	EmptyCommand,
	/// The OS refused to create the child.
	Io { program: String, source: io::Error },
}

impl fmt::Display for SpawnError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			SpawnError::EmptyCommand => write!(f, "empty command"),
			SpawnError::Io { program, source } => {
				write!(f, "failed to spawn {}: {}", program, source)
			}
		}
	}
}

impl std::error::Error for SpawnError {
	fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
		match self {
			SpawnError::EmptyCommand => None,
			SpawnError::Io { source, .. } => Some(source),
		}
	}
}

/// Exit code of a finished child. A child killed by signal N reports -N.
pub fn exit_code(status: ExitStatus) -> i32 {
	use std::os::unix::process::ExitStatusExt;
	status
		.code()
		.or_else(|| status.signal().map(|sig| -sig))
		.unwrap_or(-1)
}
