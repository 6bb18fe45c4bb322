//! `gdpilot chat`: interactive or single-message chat mode.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use gdpilot_agent::{ChatEvent, ChatSession, ExchangeOutcome, NoticeLevel, UserInput};
use gdpilot_config::AppConfig;
use gdpilot_core::message::{ContentPart, Role};
use gdpilot_core::tool::ToolExecutor;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::{Notify, mpsc};

pub async fn run(message: Option<String>, image: Option<PathBuf>) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;

    if !config.has_api_key() {
        eprintln!();
        eprintln!("  WARNING: No API key configured.");
        eprintln!("  Requests are sent without credentials. Set one of:");
        eprintln!("    GDPILOT_API_KEY or OPENAI_API_KEY");
        eprintln!("  or run: gdpilot config set api_key <key>");
        eprintln!();
    }

    let transport = gdpilot_providers::build_from_config(&config)?;
    let host = gdpilot_host::context_from_config(&config)?;
    let registry = Arc::new(gdpilot_tools::default_registry(&host)?);
    let tool_count = registry.len();
    tracing::debug!(endpoint = %config.endpoint, model = %config.model, tools = tool_count, "Chat session ready");

    let (tx, rx) = mpsc::unbounded_channel();
    let idle = Arc::new(Notify::new());
    tokio::spawn(render_events(rx, Arc::clone(&idle)));

    let mut session = ChatSession::from_config(transport, ToolExecutor::new(registry), &config).with_events(tx);

    // Ctrl-C cancels the running exchange; when idle it quits.
    let handle = session.handle();
    tokio::spawn(async move {
        while tokio::signal::ctrl_c().await.is_ok() {
            if !handle.cancel() {
                println!();
                std::process::exit(130);
            }
        }
    });

    if let Some(path) = &image {
        session.attach_image(load_image(path)?);
    }

    if let Some(msg) = message {
        // Single message mode
        let outcome = session.submit(UserInput::text(msg)).await?;
        idle.notified().await;
        return match outcome {
            ExchangeOutcome::Error { message } => Err(message.into()),
            _ => Ok(()),
        };
    }

    println!();
    println!("  ╔══════════════════════════════════════════════╗");
    println!("  ║        gdpilot: Interactive Mode             ║");
    println!("  ╚══════════════════════════════════════════════╝");
    println!();
    println!("  Endpoint:  {}", config.endpoint);
    println!("  Model:     {}", config.model);
    println!("  Project:   {}", config.project.root.display());
    println!("  Tools:     {tool_count}");
    println!();
    println!("  Commands:  /clear  /usage  /image <file>  /exit");
    println!("  Ctrl+C cancels a running request.");
    println!();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("  You > ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match ReplCommand::parse(line) {
            Some(ReplCommand::Exit) => break,
            Some(ReplCommand::Clear) => session.clear(),
            Some(ReplCommand::Usage) => match session.last_usage() {
                Some(u) => println!(
                    "  Tokens: {} prompt + {} completion = {} total",
                    u.prompt_tokens, u.completion_tokens, u.total_tokens
                ),
                None => println!("  No usage reported yet."),
            },
            Some(ReplCommand::Image(path)) => match load_image(Path::new(path)) {
                Ok(part) => {
                    session.attach_image(part);
                    println!("  Image attached; it goes with your next message.");
                }
                Err(e) => eprintln!("  [Error] {e}"),
            },
            None => {
                if let Err(e) = session.submit(UserInput::text(line)).await {
                    eprintln!("  [Error] {e}");
                    continue;
                }
                idle.notified().await;
                println!();
            }
        }
    }

    println!();
    println!("  Goodbye!");
    println!();
    Ok(())
}

#[derive(Debug, PartialEq, Eq)]
enum ReplCommand<'a> {
    Exit,
    Clear,
    Usage,
    Image(&'a str),
}

impl<'a> ReplCommand<'a> {
    /// `None` means the line is a message for the model.
    fn parse(line: &'a str) -> Option<Self> {
        match line.split_once(char::is_whitespace) {
            Some(("/image", path)) => Some(Self::Image(path.trim())),
            _ => match line {
                "/exit" | "/quit" | "exit" => Some(Self::Exit),
                "/clear" => Some(Self::Clear),
                "/usage" => Some(Self::Usage),
                "/image" => Some(Self::Image("")),
                _ => None,
            },
        }
    }
}

/// Print session events as they arrive; wakes `idle` when an exchange ends.
async fn render_events(mut rx: mpsc::UnboundedReceiver<ChatEvent>, idle: Arc<Notify>) {
    while let Some(event) = rx.recv().await {
        match event {
            ChatEvent::Transcript {
                role: Role::Assistant,
                text,
            } => {
                println!();
                for line in text.lines() {
                    println!("  Assistant > {line}");
                }
            }
            ChatEvent::ToolCallStarted { name, arguments, .. } => {
                eprintln!("  [tool] {name} {arguments}");
            }
            ChatEvent::ToolCallFinished { success: false, name, .. } => {
                eprintln!("  [tool] {name} failed");
            }
            ChatEvent::Notice { level, message } => match level {
                NoticeLevel::Info => eprintln!("  {message}"),
                NoticeLevel::Warning => eprintln!("  [Warning] {message}"),
                NoticeLevel::Error => eprintln!("  [Error] {message}"),
            },
            ChatEvent::Busy { busy: false } => idle.notify_one(),
            _ => {}
        }
    }
}

/// Read an image file into a base64 content part.
fn load_image(path: &Path) -> Result<ContentPart, Box<dyn std::error::Error>> {
    let mime_type = image_mime(path).ok_or_else(|| format!("Unsupported image type: {}", path.display()))?;
    let bytes = std::fs::read(path).map_err(|e| format!("Cannot read {}: {e}", path.display()))?;
    Ok(ContentPart::Image {
        mime_type: mime_type.to_string(),
        data: STANDARD.encode(bytes),
    })
}

fn image_mime(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "webp" => Some("image/webp"),
        "gif" => Some("image/gif"),
        _ => None,
    }
}
