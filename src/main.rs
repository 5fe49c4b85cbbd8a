//! # replay-enforcer CLI
//!
//! Command-line interface for the replay ingestion core.
//!
//! ## Usage
//! ```bash
//! replay-enforcer fingerprint ~/Slippi
//! replay-enforcer fingerprint ~/Slippi --output json
//! ```

mod cli;

use replay_enforcer::Result;

fn main() -> Result<()> {
    replay_enforcer::init_tracing();
    cli::run()
}
