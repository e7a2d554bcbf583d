//! # CLI Module
//!
//! Command-line entry points for the `brrtdispatch` binary.
//!
//! ## Commands
//!
//! ### `serve`
//!
//! Start the HTTP binding with the demo echo handlers (`echo`, `test::echo`):
//!
//! ```bash
//! brrtdispatch serve --addr 0.0.0.0:8080 --config dispatch.yaml
//! curl -d 'msg_id=echo&msg={"message":"hi"}' http://localhost:8080/zgame
//! curl 'http://localhost:8080/test/echo?message=hi'
//! ```
//!
//! ### `check`
//!
//! Load a configuration file plus `BRRTD_*` overrides and print the effective
//! settings as YAML:
//!
//! ```bash
//! brrtdispatch check --config dispatch.yaml
//! ```

mod commands;


pub use commands::{build_service, run_cli, Cli, Commands};
