use std::path::PathBuf;

#[tokio::main]
async fn main() {
	let args: Vec<String> = std::env::args().skip(1).collect();

	if args.iter().any(|a| a == "--help" || a == "-h") {
		print_usage();
		return;
	}
	if args.iter().any(|a| a == "--version" || a == "-V") {
		println!("rl-ui {}", env!("CARGO_PKG_VERSION"));
		return;
	}

	tracing_subscriber::fmt().init();

	let root = flag_value(&args, "--root", "-r").map(PathBuf::from);
	let config_path = flag_value(&args, "--config", "-c").map(PathBuf::from);

	let port = match parse_port(&args) {
		Ok(port) => port,
		Err(e) => {
			eprintln!("error: {}", e);
			eprintln!();
			print_usage();
			std::process::exit(2);
		}
	};

	let mut config = match rl_ui::config::load_config(config_path.as_deref(), root.as_deref()) {
		Ok(config) => config,
		Err(e) => {
			eprintln!("error: {}", e);
			std::process::exit(1);
		}
	};
	if let Some(root) = root {
		config.paths.root = Some(root);
	}
	if let Some(port) = port {
		config.server.port = port;
	}

	if let Err(e) = rl_ui::serve(config).await {
		eprintln!("error: {}", e);
		std::process::exit(1);
	}
}

fn flag_value<'a>(args: &'a [String], long: &str, short: &str) -> Option<&'a str> {
	args.iter()
		.position(|a| a == long || a == short)
		.and_then(|i| args.get(i + 1))
		.map(String::as_str)
}

fn parse_port(args: &[String]) -> Result<Option<u16>, String> {
	if !args.iter().any(|a| a == "--port" || a == "-p") {
		return Ok(None);
	}
	let value = flag_value(args, "--port", "-p").ok_or("--port needs a value")?;
	value
		.parse()
		.map(Some)
		.map_err(|_| format!("invalid port: {}", value))
}

fn print_usage() {
	eprintln!("rl-ui - control panel for RL training and evaluation runs");
	eprintln!();
	eprintln!("usage: rl-ui [options]");
	eprintln!("  -p, --port PORT    HTTP port (default: 8000)");
	eprintln!("  -r, --root DIR     Project root holding scripts/ and ui/ (default: .)");
	eprintln!("  -c, --config FILE  Config file (default: <root>/{})", rl_ui::config::CONFIG_FILE);
	eprintln!("  -h, --help         Show this help");
}
