use anyhow::{anyhow, Result};
use clap::Parser;
use quill::client::{Client, Turn};
use quill::config::{self, Config};
use quill::pipeline::{self, ExecuteOptions};
use quill::prompt::SYSTEM_PROMPT;
use quill::repl::{render_outcome, Repl};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "quill",
    about = "A terminal pair programmer that turns model replies into files and commands",
    version
)]
struct Args {
    /// One-shot prompt; omit it to start the interactive REPL
    prompt: Option<String>,

    /// Working directory for file writes and commands
    #[arg(short, long, default_value = ".")]
    dir: PathBuf,

    /// Apply the reply (write files, run commands) after printing it
    #[arg(short, long)]
    apply: bool,

    /// Skip the confirmation before applying
    #[arg(short, long)]
    yes: bool,

    /// Override the configured model id
    #[arg(short, long)]
    model: Option<String>,

    /// Don't back up existing files before overwriting them
    #[arg(long)]
    no_backup: bool,

    /// Configure the provider API key and exit
    #[arg(long)]
    setup: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if args.setup {
        config::setup_api_key_interactive().map_err(|e| anyhow!(e))?;
        return Ok(());
    }

    let mut config = Config::load();
    let Some(api_key) = config.get_api_key() else {
        eprintln!("  No API key configured. Run 'quill --setup' to get started.");
        std::process::exit(1);
    };

    let cwd = args.dir.canonicalize()?;
    let model = args.model.clone().or_else(|| config.model.clone());
    let client = Client::new(api_key, model);

    match args.prompt.clone() {
        Some(prompt) => one_shot(&client, &config, &prompt, cwd, &args).await,
        None => Repl::new(client, config, cwd).run().await,
    }
}

async fn one_shot(
    client: &Client,
    config: &Config,
    prompt: &str,
    cwd: PathBuf,
    args: &Args,
) -> Result<()> {
    eprintln!("  thinking...");
    let reply = client
        .complete(Some(SYSTEM_PROMPT), &[Turn::user(prompt)])
        .await?;

    println!("{}", reply.trim());

    if !args.apply {
        return Ok(());
    }

    let parsed = pipeline::parse_response(&reply);
    if parsed.is_empty() {
        println!();
        println!("  No actionable content found in the reply.");
        return Ok(());
    }

    if !args.yes && !confirm(&parsed)? {
        println!("  Skipped.");
        return Ok(());
    }

    let options = ExecuteOptions {
        backup_on_overwrite: config.backup_on_overwrite && !args.no_backup,
        ..ExecuteOptions::default()
    };
    let outcome = pipeline::run_pipeline(&reply, &cwd, options);
    println!();
    render_outcome(&outcome);
    Ok(())
}

fn confirm(parsed: &pipeline::ParsedResponse) -> Result<bool> {
    println!();
    println!(
        "  About to write {} file(s) and run {} command(s).",
        parsed.files.len(),
        parsed.commands.len()
    );
    for file in &parsed.files {
        println!("    file: {}", file.path);
    }
    for command in &parsed.commands {
        println!("    run:  {}", command);
    }
    print!("  Proceed? [y/N] ");
    io::stdout().flush()?;

    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(matches!(line.trim().to_lowercase().as_str(), "y" | "yes"))
}
