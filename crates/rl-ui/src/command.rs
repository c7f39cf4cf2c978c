//! Translation of `/run` payloads into the command line of a training or
//! evaluation script.

use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

#[derive(Debug)]
pub enum CommandError {
	/// `task`/`game` missing or not a known combination.
	InvalidTaskGame,
	/// Body was not a valid run request.
	Json(serde_json::Error),
}

impl fmt::Display for CommandError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			CommandError::InvalidTaskGame => write!(f, "invalid task/game"),
			CommandError::Json(e) => write!(f, "invalid request body: {}", e),
		}
	}
}

impl std::error::Error for CommandError {}

impl From<serde_json::Error> for CommandError {
	fn from(e: serde_json::Error) -> Self {
		CommandError::Json(e)
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Task {
	Train,
	Eval,
}

impl FromStr for Task {
	type Err = CommandError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"train" => Ok(Task::Train),
			"eval" => Ok(Task::Eval),
			_ => Err(CommandError::InvalidTaskGame),
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Game {
	LunarLander,
	Pong,
}

impl FromStr for Game {
	type Err = CommandError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"lunarlander" => Ok(Game::LunarLander),
			"pong" => Ok(Game::Pong),
			_ => Err(CommandError::InvalidTaskGame),
		}
	}
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Device {
	#[default]
	Auto,
	Cpu,
	Cuda,
}

impl Device {
	pub fn as_str(&self) -> &'static str {
		match self {
			Device::Auto => "auto",
			Device::Cpu => "cpu",
			Device::Cuda => "cuda",
		}
	}
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VecEnv {
	#[default]
	Subproc,
	Dummy,
}

impl VecEnv {
	pub fn as_str(&self) -> &'static str {
		match self {
			VecEnv::Subproc => "subproc",
			VecEnv::Dummy => "dummy",
		}
	}
}

/// Body of `POST /run`. Unknown fields are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RunRequest {
	pub task: Option<String>,
	pub game: Option<String>,
	pub device: Option<Device>,
	pub timesteps: Option<u64>,
	pub n_envs: Option<u32>,
	pub episodes: Option<u32>,
	pub vec_env: Option<VecEnv>,
	pub vec_normalize: Option<bool>,
}

impl RunRequest {
	/// Parse a request body; an empty body is an empty request.
	pub fn from_json(body: &[u8]) -> Result<Self, CommandError> {
		if body.iter().all(u8::is_ascii_whitespace) {
			return Ok(Self::default());
		}
		Ok(serde_json::from_slice(body)?)
	}

	fn task_game(&self) -> Result<(Task, Game), CommandError> {
		let task = self.task.as_deref().ok_or(CommandError::InvalidTaskGame)?;
		let game = self.game.as_deref().ok_or(CommandError::InvalidTaskGame)?;
		Ok((task.parse()?, game.parse()?))
	}
}

/// Builds script invocations relative to a project root.
#[derive(Debug, Clone)]
pub struct CommandBuilder {
	root: PathBuf,
	python: String,
}

impl CommandBuilder {
	pub fn new(root: impl Into<PathBuf>, python: impl Into<String>) -> Self {
		Self {
			root: root.into(),
			python: python.into(),
		}
	}

	pub fn root(&self) -> &Path {
		&self.root
	}

	/// The project virtualenv's interpreter if there is one, else the
	/// configured fallback.
	pub fn interpreter(&self) -> String {
		let candidates = [
			self.root.join(".venv").join("bin").join("python"),
			self.root.join(".venv").join("Scripts").join("python.exe"),
		];
		candidates
			.iter()
			.find(|p| p.is_file())
			.map(|p| p.to_string_lossy().to_string())
			.unwrap_or_else(|| self.python.clone())
	}

	fn script(&self, name: &str) -> String {
		self.root.join("scripts").join(name).to_string_lossy().to_string()
	}

	pub fn build(&self, request: &RunRequest) -> Result<Vec<String>, CommandError> {
		let (task, game) = request.task_game()?;
		let device = request.device.unwrap_or_default().as_str().to_string();
		let episodes = request.episodes.unwrap_or(3).to_string();

		let mut cmd = vec![self.interpreter()];
		match (task, game) {
			(Task::Train, Game::LunarLander) => {
				cmd.push(self.script("train_lunarlander_ppo.py"));
				cmd.extend([
					"--timesteps".to_string(),
					request.timesteps.unwrap_or(500_000).to_string(),
					"--n-envs".to_string(),
					request.n_envs.unwrap_or(16).to_string(),
					"--device".to_string(),
					device,
					"--vec-env".to_string(),
					request.vec_env.unwrap_or_default().as_str().to_string(),
				]);
				if request.vec_normalize.unwrap_or(false) {
					cmd.push("--vec-normalize".to_string());
				}
			}
			(Task::Eval, Game::LunarLander) => {
				cmd.push(self.script("eval_lunarlander_ppo.py"));
				cmd.extend(["--episodes".to_string(), episodes, "--device".to_string(), device]);
			}
			(Task::Train, Game::Pong) => {
				cmd.push(self.script("train_pong_dqn.py"));
				cmd.extend([
					"--timesteps".to_string(),
					request.timesteps.unwrap_or(1_000_000).to_string(),
					"--n-envs".to_string(),
					request.n_envs.unwrap_or(1).to_string(),
					"--device".to_string(),
					device,
				]);
			}
			(Task::Eval, Game::Pong) => {
				cmd.push(self.script("eval_pong_dqn.py"));
				cmd.extend(["--episodes".to_string(), episodes, "--device".to_string(), device]);
			}
		}
		Ok(cmd)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn request(json: &str) -> RunRequest {
		RunRequest::from_json(json.as_bytes()).unwrap()
	}

	fn builder() -> CommandBuilder {
		CommandBuilder::new("/nonexistent/rl", "python")
	}

	#[test]
	fn test_train_lunarlander_defaults() {
		let cmd = builder()
			.build(&request(r#"{"task":"train","game":"lunarlander"}"#))
			.unwrap();
		assert_eq!(
			cmd,
			vec![
				"python",
				"/nonexistent/rl/scripts/train_lunarlander_ppo.py",
				"--timesteps",
				"500000",
				"--n-envs",
				"16",
				"--device",
				"auto",
				"--vec-env",
				"subproc",
			]
		);
	}

	#[test]
	fn test_train_lunarlander_options() {
		let cmd = builder()
			.build(&request(
				r#"{"task":"train","game":"lunarlander","timesteps":1000,"n_envs":4,
				"device":"cuda","vec_env":"dummy","vec_normalize":true}"#,
			))
			.unwrap();
		assert_eq!(
			&cmd[2..],
			&[
				"--timesteps",
				"1000",
				"--n-envs",
				"4",
				"--device",
				"cuda",
				"--vec-env",
				"dummy",
				"--vec-normalize",
			]
		);
	}

	#[test]
	fn test_train_pong_defaults() {
		let cmd = builder().build(&request(r#"{"task":"train","game":"pong"}"#)).unwrap();
		assert_eq!(cmd[1], "/nonexistent/rl/scripts/train_pong_dqn.py");
		assert_eq!(&cmd[2..], &["--timesteps", "1000000", "--n-envs", "1", "--device", "auto"]);
	}

	#[test]
	fn test_eval_commands() {
		let cmd = builder()
			.build(&request(r#"{"task":"eval","game":"pong","episodes":7,"device":"cpu"}"#))
			.unwrap();
		assert_eq!(cmd[1], "/nonexistent/rl/scripts/eval_pong_dqn.py");
		assert_eq!(&cmd[2..], &["--episodes", "7", "--device", "cpu"]);

		let cmd = builder()
			.build(&request(r#"{"task":"eval","game":"lunarlander","eval_device":"cpu"}"#))
			.unwrap();
		assert_eq!(cmd[1], "/nonexistent/rl/scripts/eval_lunarlander_ppo.py");
		assert_eq!(&cmd[2..], &["--episodes", "3", "--device", "auto"]);
	}

	#[test]
	fn test_invalid_task_game() {
		for body in [
			"",
			"{}",
			r#"{"task":"train"}"#,
			r#"{"task":"play","game":"pong"}"#,
			r#"{"task":"eval","game":"chess"}"#,
		] {
			let err = builder().build(&request(body)).unwrap_err();
			assert!(matches!(err, CommandError::InvalidTaskGame), "body: {}", body);
			assert_eq!(err.to_string(), "invalid task/game");
		}
	}

	#[test]
	fn test_bad_body() {
		assert!(matches!(RunRequest::from_json(b"{not json"), Err(CommandError::Json(_))));
		let err = RunRequest::from_json(br#"{"task":"train","game":"pong","device":"tpu"}"#)
			.unwrap_err();
		assert!(err.to_string().starts_with("invalid request body"));
	}

	#[test]
	fn test_interpreter_prefers_venv() {
		let root = std::env::temp_dir().join(format!("rl-ui-venv-{}", std::process::id()));
		let bin = root.join(".venv").join("bin");
		let _ = std::fs::create_dir_all(&bin);

		let builder = CommandBuilder::new(&root, "python3");
		assert_eq!(builder.interpreter(), "python3");

		std::fs::write(bin.join("python"), "").unwrap();
		assert_eq!(builder.interpreter(), bin.join("python").to_string_lossy());

		let _ = std::fs::remove_dir_all(&root);
	}
}
