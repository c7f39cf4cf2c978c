//! # jobslot
//!
//! Single-slot process supervisor.
//!
//! Runs at most one child process at a time, captures its stdout and stderr
//! line by line into a bounded in-memory ring, and reports or stops it on
//! demand.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use jobslot::{Supervisor, SupervisorConfig};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let sup = Supervisor::new(SupervisorConfig::default());
//!
//! let command = vec!["echo".to_string(), "hello".to_string()];
//! let started = sup.start(&command, "/tmp".as_ref()).await.unwrap();
//! assert!(started);
//!
//! sup.wait_readers().await;
//! println!("{}: {:?}", sup.status().await.state, sup.logs().await);
//! # }
//! ```

pub mod ring;
pub mod supervisor;
pub mod types;

pub use ring::LogRing;
pub use supervisor::{Supervisor, SupervisorConfig, MAX_LINE_BYTES};
pub use types::*;
