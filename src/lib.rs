//! expectrun - Expectation-Driven Test Case Runner
//!
//! This library compiles test sources against a shared driver, runs the
//! resulting binaries, and compares their captured output with recorded
//! expectation files.
//!
//! # Architecture
//!
//! Each case flows through five stages:
//!
//! 1. **Property resolution** (`properties` module)
//!    - Reads `//!key=value` header lines from the source and its driver
//!    - Resolves local, then driver, then built-in defaults
//!
//! 2. **Command templating** (`template`, `toolchain` modules)
//!    - Expands `{name}` placeholders in compile and run commands
//!    - Detects GCC/Clang and disables PIE when the template needs it
//!
//! 3. **Buffered execution** (`exec` module)
//!    - Runs each command through `/bin/sh` in the working directory
//!    - Splits output into lines and drops `!DBG` lines
//!
//! 4. **Filtering** (`filter` module)
//!    - Pipes each stream through `P.expect_filter` / `P.expect_stderr_filter`
//!
//! 5. **State machine** (`case` module)
//!    - `Waiting -> Compiled -> Executed -> Success | Failed | Ignored`
//!    - Verify, record, or print the captured output
//!
//! The `batch` module discovers cases, drives them sequentially and prints
//! the verdicts plus a final tally.
//!
//! # Example
//!
//! ```rust,no_run
//! use expectrun::{Action, Batch, Engine, EngineConfig, discover};
//!
//! let config = EngineConfig::from_env(".");
//! let paths = discover(&[], &config).unwrap();
//! let engine = Engine::new(config);
//! let report = Batch::new(&engine, Action::Verify)
//!     .run(&paths, &mut std::io::stdout())
//!     .unwrap();
//! std::process::exit(report.exit_code().into());
//! ```

pub mod batch;
pub mod case;
pub mod config;
pub mod diff;
pub mod engine;
pub mod error;
pub mod exec;
pub mod filter;
pub mod properties;
pub mod template;
pub mod toolchain;

pub use batch::{discover, Batch, BatchReport, CaseReport};
pub use case::{Action, FailReason, Outcome, Status, TestCase};
pub use config::{ConfigError, EngineConfig, RunnerConfig, VerbosityLevel};
pub use engine::Engine;
pub use error::{CaseError, CaseResult, DiscoveryError};
pub use exec::{ExecResult, Shell, SystemShell};
