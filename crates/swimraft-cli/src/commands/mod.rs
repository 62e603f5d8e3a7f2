//! # swimraft-cli::commands
//!
//! One module per subcommand.

pub mod list_protocols;
pub mod run;
pub mod validate;
