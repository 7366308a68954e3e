// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Vellum CLI
//!
//! Inspects the resolved configuration and replays recorded agent sessions
//! through the same session machinery the editor integration uses.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::{debug, info};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use vellum_cli_config::{load_config_with_cli, CliOverrides, LogFormat, LogLevel, LoggingConfig};
use vellum_session::SessionSettings;

mod replay;

/// Vellum - agent chat sessions for your notes
#[derive(Parser, Debug)]
#[command(name = "vellum", version, about, long_about = None)]
struct Args {
	/// Path to custom configuration file
	#[arg(short, long)]
	config: Option<PathBuf>,

	/// Log level (overrides config)
	#[arg(short, long)]
	log_level: Option<String>,

	/// Output logs as JSON (overrides config)
	#[arg(long)]
	json_logs: bool,

	/// Agent to use (overrides config)
	#[arg(short, long, env = "VELLUM_AGENT")]
	agent: Option<String>,

	#[command(subcommand)]
	command: Command,
}

#[derive(ValueEnum, Clone, Copy, Debug, Default)]
enum OutputFormat {
	#[default]
	Summary,
	Json,
}

#[derive(Subcommand, Debug)]
enum Command {
	/// Replay a recorded session (JSON-RPC messages, one per line)
	Replay {
		/// Recording to replay
		file: PathBuf,
		/// Approve every permission request with its first allow option
		#[arg(long)]
		auto_allow: bool,
		/// Output format
		#[arg(long, value_enum, default_value_t = OutputFormat::Summary)]
		format: OutputFormat,
	},
	/// Print the resolved configuration
	Config,
}

impl From<&Args> for CliOverrides {
	fn from(args: &Args) -> Self {
		let auto_allow = match &args.command {
			Command::Replay { auto_allow: true, .. } => Some(true),
			_ => None,
		};
		Self {
			active_agent: args.agent.clone(),
			auto_allow,
			log_level: args.log_level.clone(),
			log_format: if args.json_logs {
				Some("json".to_string())
			} else {
				None
			},
			config_file: args.config.clone(),
		}
	}
}

fn log_level_to_tracing(level: LogLevel) -> tracing::Level {
	match level {
		LogLevel::Trace => tracing::Level::TRACE,
		LogLevel::Debug => tracing::Level::DEBUG,
		LogLevel::Info => tracing::Level::INFO,
		LogLevel::Warn => tracing::Level::WARN,
		LogLevel::Error => tracing::Level::ERROR,
	}
}

// Logs go to stderr so replay output on stdout stays machine readable.
fn init_tracing(logging: &LoggingConfig) {
	let filter = EnvFilter::try_from_default_env()
		.unwrap_or_else(|_| EnvFilter::new(format!("vellum={}", log_level_to_tracing(logging.level))));

	match logging.format {
		LogFormat::Json => {
			tracing_subscriber::registry()
				.with(filter)
				.with(fmt::layer().json().with_writer(std::io::stderr))
				.init();
		}
		LogFormat::Compact => {
			tracing_subscriber::registry()
				.with(filter)
				.with(fmt::layer().compact().with_writer(std::io::stderr))
				.init();
		}
		LogFormat::Pretty => {
			tracing_subscriber::registry()
				.with(filter)
				.with(fmt::layer().with_writer(std::io::stderr))
				.init();
		}
	}
}

#[tokio::main]
async fn main() -> Result<()> {
	let args = Args::parse();
	let config = load_config_with_cli(CliOverrides::from(&args)).context("failed to load configuration")?;
	init_tracing(&config.logging);
	debug!(agent = %config.global.active_agent, "configuration loaded");

	match args.command {
		Command::Config => {
			let rendered = toml::to_string_pretty(&config).context("failed to render configuration")?;
			print!("{rendered}");
		}
		Command::Replay { file, format, .. } => {
			let settings = SessionSettings::from_config(&config)?;
			info!(file = %file.display(), agent = %settings.agent_id, "starting replay");
			let report = replay::replay_file(&file, settings).await?;
			match format {
				OutputFormat::Summary => print!("{}", replay::render_summary(&report)),
				OutputFormat::Json => println!("{}", replay::render_json(&report)?),
			}
		}
	}

	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_replay_auto_allow_flag_becomes_override() {
		let args = Args::parse_from(["vellum", "--agent", "gemini", "replay", "rec.jsonl", "--auto-allow"]);
		let overrides = CliOverrides::from(&args);
		assert_eq!(overrides.active_agent.as_deref(), Some("gemini"));
		assert_eq!(overrides.auto_allow, Some(true));
		assert_eq!(overrides.log_format, None);
	}

	#[test]
	fn test_config_command_leaves_auto_allow_unset() {
		let args = Args::parse_from(["vellum", "--json-logs", "-l", "debug", "config"]);
		let overrides = CliOverrides::from(&args);
		assert_eq!(overrides.auto_allow, None);
		assert_eq!(overrides.log_format.as_deref(), Some("json"));
		assert_eq!(overrides.log_level.as_deref(), Some("debug"));
	}

	#[test]
	fn test_replay_format_defaults_to_summary() {
		let args = Args::parse_from(["vellum", "replay", "rec.jsonl"]);
		assert!(matches!(
			args.command,
			Command::Replay {
				format: OutputFormat::Summary,
				auto_allow: false,
				..
			}
		));
	}
}
