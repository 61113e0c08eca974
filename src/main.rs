// Copyright (c) 2024-2025 Jesse Morgan / Morgan Forge
// SPDX-License-Identifier: AGPL-3.0-or-later

use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::io::{self, BufRead, Write};
use std::sync::Arc;
use std::time::{Duration, Instant};

use agentguard::config::{self, GatewayConfig};
use agentguard::logging::{init_tracing, FileSink, SecureLogger};
use agentguard::security::{contains_pii, generate_session_id, mask_pii, sanitize, SecurityGateway};
use agentguard::{AssistantApp, EchoPipeline};

/// Exit codes following sysexits.h conventions
mod exit_codes {
    /// Data error - input rejected by the sanitizer
    pub const DATA_ERR: i32 = 65;
}

const DEFAULT_USE_CASE: &str = "Basic Chatbot";

/// How often the chat loop sweeps abandoned sessions out of the store.
const SESSION_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Parser)]
#[command(name = "agentguard", version, about = "Session-security gateway for LLM assistants")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Interactive chat through the gateway (messages are echoed back as
    /// they would be forwarded)
    ///
    /// Examples:
    ///   agentguard chat
    ///   agentguard chat --use-case "Chatbot With Web"
    Chat {
        /// Use case to route messages to
        #[arg(short, long, default_value = DEFAULT_USE_CASE)]
        use_case: String,
    },

    /// Sanitize a single message and print the result
    ///
    /// Examples:
    ///   agentguard check "Hello <b>world</b>"
    Check {
        /// Message to check
        text: String,
    },

    /// Print text with PII masked
    ///
    /// Examples:
    ///   agentguard mask "Contact me at a@b.com"
    Mask {
        /// Text to mask
        text: String,
    },

    /// Show or initialise the configuration
    ///
    /// Examples:
    ///   agentguard config show
    ///   agentguard config init
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Write the default configuration file if none exists
    Init,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = config::load_config()?;
    init_tracing(&config.log_level);

    match cli.command {
        Commands::Chat { use_case } => run_chat(&config, &use_case),
        Commands::Check { text } => {
            match sanitize(&text) {
                Some(clean) => println!("{} {}", "[✓]".green(), clean),
                None => {
                    println!("{} Rejected: input contains disallowed content", "[✗]".red());
                    std::process::exit(exit_codes::DATA_ERR);
                }
            }
            Ok(())
        }
        Commands::Mask { text } => {
            println!("{}", mask_pii(&text));
            if !contains_pii(&text) {
                eprintln!("{}", "(no PII detected)".dimmed());
            }
            Ok(())
        }
        Commands::Config { command } => handle_config(command, &config),
    }
}

fn build_logger(config: &GatewayConfig) -> SecureLogger {
    let logger = SecureLogger::default();
    if !config.file_log_enabled {
        return logger;
    }

    match config.resolved_log_dir().and_then(|dir| FileSink::create(&dir)) {
        Ok(sink) => {
            tracing::debug!(path = %sink.path().display(), "File logging enabled");
            logger.with_sink(Arc::new(sink))
        }
        Err(e) => {
            eprintln!("{} Failed to initialize file logging: {:#}", "[!]".yellow(), e);
            logger
        }
    }
}

fn run_chat(config: &GatewayConfig, use_case: &str) -> Result<()> {
    let gateway = SecurityGateway::new(config).with_logger(build_logger(config));
    let app = AssistantApp::new(gateway, EchoPipeline);
    let mut session_id = generate_session_id();
    let mut last_sweep = Instant::now();

    println!("{}", "=== agentguard chat ===".bright_cyan().bold());
    println!(
        "{}",
        format!("Use case: {}  |  /logout to reset session, /quit to exit", use_case).dimmed()
    );
    println!();

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    loop {
        print!("{} ", ">".bright_cyan());
        stdout.flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let message = line.trim_end_matches(['\r', '\n']);

        if last_sweep.elapsed() >= SESSION_SWEEP_INTERVAL {
            let stats = app.gateway().purge_expired();
            tracing::debug!(evicted = stats.evicted, removed = stats.removed, "Session sweep");
            last_sweep = Instant::now();
        }

        match message.trim() {
            "" => continue,
            "/quit" | "/exit" => break,
            "/logout" => {
                app.gateway().logout(&session_id);
                session_id = generate_session_id();
                println!("{} Logged out. New session started.", "[✓]".green());
                continue;
            }
            _ => {}
        }

        match app.handle_message(&session_id, Some(use_case), message) {
            Ok(response) => println!("{} {}", "[forwarded]".green(), response),
            Err(e) => println!("{} {}", "[✗]".red(), e.user_message()),
        }
    }

    app.gateway().logout(&session_id);
    Ok(())
}

fn handle_config(command: Option<ConfigCommands>, config: &GatewayConfig) -> Result<()> {
    let path = config::config_path()?;

    match command {
        None | Some(ConfigCommands::Show) => {
            println!();
            println!("{}", "=== agentguard Configuration ===".bright_cyan().bold());
            println!();
            println!("  Rate limit window: {}s", config.rate_limit_window_secs);
            println!("  Max requests:      {}", config.max_requests);
            println!("  Session timeout:   {}s", config.session_timeout_secs);
            println!("  Log level:         {}", config.log_level);
            println!("  File logging:      {}", config.file_log_enabled);
            match config.resolved_log_dir() {
                Ok(dir) => println!("  Log directory:     {}", dir.display()),
                Err(_) => println!("  Log directory:     {}", "(unavailable)".dimmed()),
            }
            println!();
            println!("Config file: {}", path.display());
            println!();
        }
        Some(ConfigCommands::Init) => {
            if path.exists() {
                println!("{} Config already exists: {}", "[!]".yellow(), path.display());
            } else {
                config::save_config(&GatewayConfig::default())?;
                println!("{} Wrote default config to {}", "[✓]".green(), path.display());
            }
        }
    }
    Ok(())
}
