//! Interactive REPL front-end
//!
//! Owns user-facing command parsing (`/cd`, `/apply`, ...) and renders
//! pipeline outcomes. All real behavior lives in `client` and
//! `pipeline`; this layer only wires stdin to them.

use crate::client::{Client, CompletionError, Turn};
use crate::config::Config;
use crate::pipeline::{self, ActionOutcome, ExecuteOptions, PipelineOutcome};
use crate::prompt::SYSTEM_PROMPT;
use crate::session::Session;
use crate::util::truncate;
use anyhow::Result;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;

pub struct Repl {
    client: Client,
    config: Config,
    session: Session,
    cwd: PathBuf,
    /// Pipeline runs automatically after each reply when set.
    auto_apply: bool,
    last_reply: Option<String>,
}

impl Repl {
    pub fn new(client: Client, config: Config, cwd: PathBuf) -> Self {
        let session = Session::load_latest().unwrap_or_default();
        let auto_apply = config.auto_apply;
        Self {
            client,
            config,
            session,
            cwd,
            auto_apply,
            last_reply: None,
        }
    }

    pub async fn run(&mut self) -> Result<()> {
        println!("  quill — type a request, /help for commands, /quit to exit");
        println!("  model: {}   dir: {}", self.client.model(), self.cwd.display());
        println!();

        let stdin = io::stdin();
        loop {
            print!("> ");
            io::stdout().flush()?;

            let mut line = String::new();
            if stdin.lock().read_line(&mut line)? == 0 {
                break; // EOF
            }
            let input = line.trim();
            if input.is_empty() {
                continue;
            }

            if let Some(command) = input.strip_prefix('/') {
                if !self.dispatch_command(command) {
                    break;
                }
                continue;
            }

            self.ask(input).await;
        }

        Ok(())
    }

    /// Handle a `/` command. Returns false when the REPL should exit.
    fn dispatch_command(&mut self, command: &str) -> bool {
        let (name, arg) = match command.split_once(char::is_whitespace) {
            Some((name, arg)) => (name, arg.trim()),
            None => (command, ""),
        };

        match name {
            "help" => print_help(),
            "quit" | "exit" => return false,
            "cd" => self.change_directory(arg),
            "apply" => self.apply_last_reply(),
            "run" => self.apply_last_reply(),
            "auto" => {
                self.auto_apply = !self.auto_apply;
                println!("  auto-apply {}", if self.auto_apply { "on" } else { "off" });
            }
            "session" => {
                println!(
                    "  session {} — {} turns, updated {}",
                    self.session.id,
                    self.session.turns.len(),
                    self.session.updated_at.format("%Y-%m-%d %H:%M UTC")
                );
            }
            "clear" => {
                self.session.clear();
                if let Err(e) = self.session.save() {
                    eprintln!("  Warning: {}", e);
                }
                println!("  conversation cleared");
            }
            _ => println!("  Unknown command: /{} (try /help)", name),
        }
        true
    }

    async fn ask(&mut self, input: &str) {
        let mut turns: Vec<Turn> = self.session.turns.clone();
        turns.push(Turn::user(input));

        eprintln!("  thinking...");
        let reply = match self.client.complete(Some(SYSTEM_PROMPT), &turns).await {
            Ok(reply) => reply,
            Err(CompletionError::EmptyResult) => {
                eprintln!("  The provider returned nothing. Try rephrasing.");
                return;
            }
            Err(err) => {
                eprintln!("  {}", err);
                return;
            }
        };

        println!();
        println!("{}", reply.trim());
        println!();

        self.session.push_exchange(input, &reply);
        if let Err(e) = self.session.save() {
            eprintln!("  Warning: failed to save session: {}", e);
        }
        self.last_reply = Some(reply);

        if self.auto_apply {
            self.apply_last_reply();
        } else {
            let parsed = pipeline::parse_response(self.last_reply.as_deref().unwrap_or(""));
            if !parsed.is_empty() {
                println!(
                    "  {} file(s), {} command(s) detected — /apply to run them",
                    parsed.files.len(),
                    parsed.commands.len()
                );
            }
        }
    }

    fn apply_last_reply(&mut self) {
        let Some(reply) = self.last_reply.clone() else {
            println!("  Nothing to apply yet.");
            return;
        };

        let options = ExecuteOptions {
            backup_on_overwrite: self.config.backup_on_overwrite,
            ..ExecuteOptions::default()
        };
        let outcome = pipeline::run_pipeline(&reply, &self.cwd, options);
        self.cwd = outcome.working_dir.clone();
        render_outcome(&outcome);
    }

    fn change_directory(&mut self, arg: &str) {
        if arg.is_empty() {
            println!("  {}", self.cwd.display());
            return;
        }
        let candidate = if PathBuf::from(arg).is_absolute() {
            PathBuf::from(arg)
        } else {
            self.cwd.join(arg)
        };
        match candidate.canonicalize() {
            Ok(dir) if dir.is_dir() => {
                self.cwd = dir;
                println!("  {}", self.cwd.display());
            }
            _ => println!("  Directory not found: {}", arg),
        }
    }
}

fn print_help() {
    println!("  /help       show this help");
    println!("  /cd <dir>   change the working directory");
    println!("  /apply      apply the last reply (write files, run commands)");
    println!("  /run        alias for /apply");
    println!("  /auto       toggle auto-apply");
    println!("  /session    show the current session");
    println!("  /clear      clear the conversation");
    println!("  /quit       exit");
}

/// Print a pipeline outcome, one line per recorded action.
pub fn render_outcome(outcome: &PipelineOutcome) {
    if outcome.nothing_actionable() {
        println!("  No actionable content found in the reply.");
        return;
    }

    for action in &outcome.actions {
        match action {
            ActionOutcome::FileWritten { path, backup } => {
                match backup {
                    Some(backup) => println!(
                        "  + wrote {} (previous saved as {})",
                        path.display(),
                        backup.display()
                    ),
                    None => println!("  + wrote {}", path.display()),
                }
            }
            ActionOutcome::WriteFailed { path, error } => {
                println!("  ● failed to write {}: {}", path.display(), error);
            }
            ActionOutcome::DirectoryChanged { dir } => {
                println!("  + cd {}", dir.display());
            }
            ActionOutcome::DirectoryNotFound { command } => {
                println!("  ● {}: directory not found", command);
            }
            ActionOutcome::CommandBlocked { command, reason } => {
                println!("  · skipped `{}` ({})", command, reason);
            }
            ActionOutcome::CommandRun { command, result } => {
                if result.success {
                    println!("  + ran `{}`", command);
                    let stdout = result.stdout.trim();
                    if !stdout.is_empty() {
                        println!("{}", indent(&truncate(stdout, 1800)));
                    }
                } else {
                    let detail = result
                        .error_message
                        .as_deref()
                        .unwrap_or("failed");
                    println!("  ● `{}`: {}", command, detail);
                    let stderr = result.stderr.trim();
                    if !stderr.is_empty() {
                        println!("{}", indent(&truncate(stderr, 1800)));
                    }
                }
            }
        }
    }

    if let Some(listing) = &outcome.listing {
        println!();
        println!("  {} now contains:", outcome.working_dir.display());
        for name in listing {
            println!("    {}", name);
        }
    }
}

fn indent(s: &str) -> String {
    s.lines()
        .map(|l| format!("      {}", l))
        .collect::<Vec<_>>()
        .join("\n")
}
