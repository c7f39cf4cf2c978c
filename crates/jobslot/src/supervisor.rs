use std::path::Path;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::ring::{LogRing, DEFAULT_CAPACITY};
use crate::types::*;

pub struct SupervisorConfig {
	/// Lines kept in memory for the current job.
	pub log_capacity: usize,
	/// Escalate `stop()` to SIGKILL if the job outlives this delay.
	pub kill_after: Option<Duration>,
}

impl Default for SupervisorConfig {
	fn default() -> Self {
		Self {
			log_capacity: DEFAULT_CAPACITY,
			kill_after: None,
		}
	}
}

/// Owns the single job slot. Every field lives behind one mutex, which is
/// also the only thing the output readers share with it.
pub struct Supervisor {
	slot: Arc<Mutex<Slot>>,
	config: SupervisorConfig,
}

struct Slot {
	generation: u64,
	command: Option<Vec<String>>,
	child: Option<Child>,
	pid: Option<u32>,
	exit_code: Option<i32>,
	ring: LogRing,
	readers: Vec<JoinHandle<()>>,
}

impl Slot {
	/// Non-blocking liveness check. The first observed exit code is cached
	/// and the child handle released, so later polls never re-read the OS.
	fn poll(&mut self) -> JobState {
		if let Some(code) = self.exit_code {
			return JobState::Exited(code);
		}
		let Some(child) = self.child.as_mut() else {
			return if self.command.is_some() {
				JobState::Exited(-1)
			} else {
				JobState::Idle
			};
		};
		let code = match child.try_wait() {
			Ok(None) => return JobState::Running,
			Ok(Some(status)) => exit_code(status),
			Err(e) => {
				tracing::warn!("failed to poll pid {:?}: {}", self.pid, e);
				-1
			}
		};
		tracing::info!("job exited with code {}: {}", code, self.command_line().unwrap_or_default());
		self.exit_code = Some(code);
		self.child = None;
		JobState::Exited(code)
	}

	fn command_line(&self) -> Option<String> {
		self.command.as_ref().map(|argv| argv.join(" "))
	}
}

impl Supervisor {
	pub fn new(config: SupervisorConfig) -> Arc<Self> {
		Arc::new(Self {
			slot: Arc::new(Mutex::new(Slot {
				generation: 0,
				command: None,
				child: None,
				pid: None,
				exit_code: None,
				ring: LogRing::new(config.log_capacity),
				readers: Vec::new(),
			})),
			config,
		})
	}

	/// Launch `command` in `dir`. Returns `Ok(false)` without side effects
	/// while a previous job is still alive.
	pub async fn start(&self, command: &[String], dir: &Path) -> Result<bool, SpawnError> {
		let (program, args) = command.split_first().ok_or(SpawnError::EmptyCommand)?;

		let mut slot = self.slot.lock().await;
		if slot.poll().is_running() {
			return Ok(false);
		}

		let mut child = Command::new(program)
			.args(args)
			.current_dir(dir)
			.stdin(Stdio::null())
			.stdout(Stdio::piped())
			.stderr(Stdio::piped())
			.process_group(0)
			.spawn()
			.map_err(|source| SpawnError::Io {
				program: program.clone(),
				source,
			})?;

		for reader in slot.readers.drain(..) {
			reader.abort();
		}
		slot.generation += 1;
		let generation = slot.generation;
		slot.command = Some(command.to_vec());
		slot.exit_code = None;
		slot.ring.clear();
		slot.pid = child.id();

		if let Some(stdout) = child.stdout.take() {
			let handle = tokio::spawn(pipe_lines(Arc::clone(&self.slot), generation, stdout));
			slot.readers.push(handle);
		}
		if let Some(stderr) = child.stderr.take() {
			let handle = tokio::spawn(pipe_lines(Arc::clone(&self.slot), generation, stderr));
			slot.readers.push(handle);
		}
		slot.child = Some(child);

		tracing::info!(
			"started job (pid {:?}): {}",
			slot.pid,
			slot.command_line().unwrap_or_default()
		);
		Ok(true)
	}

	/// Ask the current job to terminate. Fire-and-forget: returns at once and
	/// is a no-op when nothing is running.
	pub async fn stop(&self) {
		let mut slot = self.slot.lock().await;
		if !slot.poll().is_running() {
			return;
		}
		let Some(pid) = slot.pid else {
			return;
		};
		tracing::info!("stopping job (pid {})", pid);
		signal_group(pid, nix::sys::signal::Signal::SIGTERM);

		if let Some(delay) = self.config.kill_after {
			let shared = Arc::clone(&self.slot);
			let generation = slot.generation;
			tokio::spawn(async move {
				tokio::time::sleep(delay).await;
				let mut slot = shared.lock().await;
				if slot.generation == generation && slot.poll().is_running() {
					tracing::warn!("job (pid {}) ignored SIGTERM, sending SIGKILL", pid);
					signal_group(pid, nix::sys::signal::Signal::SIGKILL);
				}
			});
		}
	}

	pub async fn status(&self) -> JobStatus {
		let mut slot = self.slot.lock().await;
		match slot.command_line() {
			None => JobStatus::idle(),
			Some(command) => JobStatus {
				state: slot.poll(),
				command: Some(command),
			},
		}
	}

	/// Point-in-time copy of the captured lines, oldest first.
	pub async fn logs(&self) -> Vec<String> {
		self.slot.lock().await.ring.snapshot()
	}

	/// Wait for the current job's output readers to drain. They finish when
	/// the child's pipes close, so this blocks until the job has exited.
	pub async fn wait_readers(&self) {
		let readers: Vec<JoinHandle<()>> = {
			let mut slot = self.slot.lock().await;
			slot.readers.drain(..).collect()
		};
		for reader in readers {
			let _ = reader.await;
		}
	}
}

/// Longest line kept before it is cut, for output that never ends a line.
pub const MAX_LINE_BYTES: usize = 64 * 1024;

/// Read `reader` until EOF, splitting on `\n`, `\r` or `\r\n` so progress
/// bars that redraw with a bare carriage return still arrive line by line.
async fn pipe_lines<R: AsyncRead + Unpin>(slot: Arc<Mutex<Slot>>, generation: u64, reader: R) {
	let mut reader = BufReader::new(reader);
	let mut line = Vec::new();
	let mut after_cr = false;
	loop {
		let chunk = match reader.fill_buf().await {
			Ok([]) => break,
			Ok(chunk) => chunk,
			Err(e) => {
				tracing::warn!("output reader stopped: {}", e);
				break;
			}
		};
		let n = chunk.len();
		let mut lines = Vec::new();
		for &byte in chunk {
			if after_cr {
				after_cr = false;
				if byte == b'\n' {
					continue;
				}
			}
			match byte {
				b'\n' | b'\r' => {
					after_cr = byte == b'\r';
					lines.push(decode_line(&line));
					line.clear();
				}
				_ => {
					line.push(byte);
					if line.len() >= MAX_LINE_BYTES {
						lines.push(decode_line(&line));
						line.clear();
					}
				}
			}
		}
		reader.consume(n);
		if !append_lines(&slot, generation, lines).await {
			return;
		}
	}
	if !line.is_empty() {
		append_lines(&slot, generation, vec![decode_line(&line)]).await;
	}
}

fn decode_line(bytes: &[u8]) -> String {
	String::from_utf8_lossy(bytes).trim_end().to_string()
}

/// Append under the guard. Returns false once a newer job owns the slot.
async fn append_lines(slot: &Mutex<Slot>, generation: u64, lines: Vec<String>) -> bool {
	if lines.is_empty() {
		return true;
	}
	let mut slot = slot.lock().await;
	if slot.generation != generation {
		return false;
	}
	for line in lines {
		slot.ring.push(line);
	}
	true
}

fn signal_group(pid: u32, signal: nix::sys::signal::Signal) {
	use nix::sys::signal::killpg;
	use nix::unistd::Pid;
	if let Err(e) = killpg(Pid::from_raw(pid as i32), signal) {
		tracing::warn!("failed to send {:?} to pid {}: {}", signal, pid, e);
	}
}
