use jobslot::SupervisorConfig;
use serde::Deserialize;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const CONFIG_FILE: &str = "rl-ui.toml";

#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
	#[serde(default)]
	pub server: ServerConfig,
	#[serde(default)]
	pub paths: PathsConfig,
	#[serde(default)]
	pub supervisor: SupervisorSection,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
	#[serde(default = "default_host")]
	pub host: IpAddr,
	#[serde(default = "default_port")]
	pub port: u16,
}

impl Default for ServerConfig {
	fn default() -> Self {
		Self {
			host: default_host(),
			port: default_port(),
		}
	}
}

fn default_host() -> IpAddr {
	IpAddr::V4(Ipv4Addr::LOCALHOST)
}
fn default_port() -> u16 {
	8000
}

#[derive(Debug, Clone, Deserialize)]
pub struct PathsConfig {
	/// Project root. Jobs run here and scripts are resolved against it.
	pub root: Option<PathBuf>,
	#[serde(default = "default_ui_dir")]
	pub ui_dir: PathBuf,
	#[serde(default = "default_python")]
	pub python: String,
}

impl Default for PathsConfig {
	fn default() -> Self {
		Self {
			root: None,
			ui_dir: default_ui_dir(),
			python: default_python(),
		}
	}
}

fn default_ui_dir() -> PathBuf {
	PathBuf::from("ui")
}
fn default_python() -> String {
	"python".into()
}

#[derive(Debug, Clone, Deserialize)]
pub struct SupervisorSection {
	#[serde(default = "default_log_lines")]
	pub log_lines: usize,
	#[serde(default)]
	pub kill_after_secs: u64,
}

impl Default for SupervisorSection {
	fn default() -> Self {
		Self {
			log_lines: default_log_lines(),
			kill_after_secs: 0,
		}
	}
}

fn default_log_lines() -> usize {
	jobslot::ring::DEFAULT_CAPACITY
}

impl Config {
	pub fn bind_addr(&self) -> SocketAddr {
		SocketAddr::new(self.server.host, self.server.port)
	}

	pub fn root(&self) -> PathBuf {
		let root = self.paths.root.clone().unwrap_or_else(|| PathBuf::from("."));
		std::fs::canonicalize(&root).unwrap_or(root)
	}

	pub fn ui_dir(&self) -> PathBuf {
		if self.paths.ui_dir.is_absolute() {
			self.paths.ui_dir.clone()
		} else {
			self.root().join(&self.paths.ui_dir)
		}
	}

	pub fn supervisor_config(&self) -> SupervisorConfig {
		SupervisorConfig {
			log_capacity: self.supervisor.log_lines,
			kill_after: match self.supervisor.kill_after_secs {
				0 => None,
				secs => Some(Duration::from_secs(secs)),
			},
		}
	}
}

/// Load `path`, or `<root>/rl-ui.toml` when no path is given. A missing
/// default file means defaults; an explicit path must exist. Unreadable or
/// invalid files fall back to defaults with a warning.
pub fn load_config(path: Option<&Path>, root: Option<&Path>) -> Result<Config, String> {
	let path = match path {
		Some(p) if !p.exists() => {
			return Err(format!("config file not found: {}", p.display()));
		}
		Some(p) => p.to_path_buf(),
		None => {
			let p = root.unwrap_or(Path::new(".")).join(CONFIG_FILE);
			if !p.exists() {
				return Ok(Config::default());
			}
			p
		}
	};
	let config = match std::fs::read_to_string(&path) {
		Ok(content) => match toml::from_str(&content) {
			Ok(config) => {
				tracing::info!("loaded config from {}", path.display());
				config
			}
			Err(e) => {
				tracing::warn!("failed to parse {}: {}", path.display(), e);
				Config::default()
			}
		},
		Err(e) => {
			tracing::warn!("failed to read {}: {}", path.display(), e);
			Config::default()
		}
	};
	Ok(config)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_defaults() {
		let config = Config::default();
		assert_eq!(config.bind_addr(), "127.0.0.1:8000".parse().unwrap());
		assert_eq!(config.paths.python, "python");
		assert_eq!(config.supervisor.log_lines, 500);
		assert!(config.supervisor_config().kill_after.is_none());
	}

	#[test]
	fn test_partial_toml() {
		let config: Config = toml::from_str(
			r#"
			[server]
			port = 9001

			[supervisor]
			kill_after_secs = 5
			"#,
		)
		.unwrap();
		assert_eq!(config.server.port, 9001);
		assert_eq!(config.server.host, default_host());
		assert_eq!(config.paths.ui_dir, PathBuf::from("ui"));
		let sup = config.supervisor_config();
		assert_eq!(sup.log_capacity, 500);
		assert_eq!(sup.kill_after, Some(Duration::from_secs(5)));
	}

	#[test]
	fn test_ui_dir_relative_to_root() {
		let mut config = Config::default();
		config.paths.root = Some(PathBuf::from("/nonexistent/project"));
		assert_eq!(config.ui_dir(), PathBuf::from("/nonexistent/project/ui"));
		config.paths.ui_dir = PathBuf::from("/srv/ui");
		assert_eq!(config.ui_dir(), PathBuf::from("/srv/ui"));
	}

	#[test]
	fn test_missing_default_file_uses_defaults() {
		let config = load_config(None, Some(Path::new("/nonexistent/project"))).unwrap();
		assert_eq!(config.server.port, 8000);
	}

	#[test]
	fn test_missing_explicit_file_is_an_error() {
		let err = load_config(Some(Path::new("/nonexistent/rl-ui.toml")), None).unwrap_err();
		assert!(err.contains("config file not found"), "err: {}", err);
		assert!(err.contains("/nonexistent/rl-ui.toml"));
	}

	#[test]
	fn test_load_from_root() {
		let dir = std::env::temp_dir().join(format!("rl-ui-config-{}", std::process::id()));
		let _ = std::fs::create_dir_all(&dir);
		std::fs::write(dir.join(CONFIG_FILE), "[paths]\npython = \"python3\"\n").unwrap();

		let config = load_config(None, Some(&dir)).unwrap();
		assert_eq!(config.paths.python, "python3");

		let _ = std::fs::remove_dir_all(&dir);
	}
}
