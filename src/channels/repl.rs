//! Interactive console with line editing.
//!
//! Drives the wallet feed, the network selection and the analytics
//! controller from slash commands, and renders the event log.
//! Uses rustyline for line editing, history, and tab-completion.
//!
//! ## Commands
//!
//! - `/status` - Show controller status, network and wallet
//! - `/connect [pubkey] [wallet]` - Connect a wallet (demo key by default)
//! - `/disconnect` - Disconnect the wallet
//! - `/network <id>` - Switch network (`devnet`, `testnet`, `mainnet-beta`)
//! - `/key <value>` / `/key clear` - Replace or remove the write key
//! - `/track <name> [json]` - Report a custom event
//! - `/preset <name>` - Report a preset event
//! - `/record <kind> [json]` - Append an entry to the event log
//! - `/log` - Print the event log, newest first
//! - `/clear` - Clear the event log
//! - `/help` - Show available commands
//! - `/quit` or `/exit` - Exit

use std::borrow::Cow;
use std::sync::Arc;

use chrono::Local;
use rustyline::completion::Completer;
use rustyline::config::Config as EditorConfig;
use rustyline::error::ReadlineError;
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::validate::Validator;
use rustyline::{CompletionType, Editor, Helper};
use tokio::sync::mpsc;

use crate::analytics::{self, AnalyticsFactory, PRESET_EVENTS};
use crate::config::{Config, WriteKey};
use crate::event_log::{EventLog, EventLogEntry};
use crate::lifecycle::{AnalyticsController, ControllerInputs, LifecycleState, StatusIndicator};
use crate::network::{Network, NetworkSelection};
use crate::wallet::{WalletFeed, WalletSnapshot, shorten_address};

/// Public key used by `/connect` without arguments and by auto-connect.
pub const DEMO_PUBLIC_KEY: &str = "7xKXtg2CW87d97TXJSDpbD5jBkheTqA83TZRuJosgAsU";
const DEMO_WALLET_NAME: &str = "Demo";

/// Max characters for payload previews in the terminal.
const PAYLOAD_PREVIEW_MAX: usize = 160;

/// Slash commands available in the console.
const SLASH_COMMANDS: &[&str] = &[
    "/help",
    "/quit",
    "/exit",
    "/status",
    "/connect",
    "/disconnect",
    "/network",
    "/key",
    "/track",
    "/preset",
    "/record",
    "/log",
    "/clear",
];

/// A parsed console line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplCommand {
    Help,
    Quit,
    Status,
    Connect {
        public_key: String,
        wallet_name: Option<String>,
    },
    Disconnect,
    Network(String),
    SetKey(Option<String>),
    Track {
        event: String,
        properties: String,
    },
    Preset(String),
    Record {
        kind: String,
        payload: String,
    },
    Log,
    Clear,
    /// Missing argument or unknown command; carries the usage hint.
    Invalid(String),
}

impl ReplCommand {
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        let (head, rest) = match line.split_once(char::is_whitespace) {
            Some((head, rest)) => (head, rest.trim()),
            None => (line, ""),
        };

        match head.to_lowercase().as_str() {
            "/help" => Self::Help,
            "/quit" | "/exit" => Self::Quit,
            "/status" => Self::Status,
            "/connect" => {
                let mut parts = rest.split_whitespace();
                let public_key = parts.next().unwrap_or(DEMO_PUBLIC_KEY).to_string();
                let wallet_name = match parts.collect::<Vec<_>>().join(" ") {
                    name if name.is_empty() => None,
                    name => Some(name),
                };
                Self::Connect {
                    public_key,
                    wallet_name,
                }
            }
            "/disconnect" => Self::Disconnect,
            "/network" if !rest.is_empty() => Self::Network(rest.to_string()),
            "/network" => Self::Invalid("usage: /network <devnet|testnet|mainnet-beta>".into()),
            "/key" if rest.eq_ignore_ascii_case("clear") => Self::SetKey(None),
            "/key" if !rest.is_empty() => Self::SetKey(Some(rest.to_string())),
            "/key" => Self::Invalid("usage: /key <write key> | /key clear".into()),
            "/track" | "/record" if rest.is_empty() => {
                Self::Invalid(format!("usage: {head} <name> [json object]"))
            }
            "/track" | "/record" => {
                let (name, json) = match rest.split_once(char::is_whitespace) {
                    Some((name, json)) => (name.to_string(), json.trim().to_string()),
                    None => (rest.to_string(), String::new()),
                };
                if head.eq_ignore_ascii_case("/track") {
                    Self::Track {
                        event: name,
                        properties: json,
                    }
                } else {
                    Self::Record {
                        kind: name,
                        payload: json,
                    }
                }
            }
            "/preset" if !rest.is_empty() => Self::Preset(rest.to_string()),
            "/preset" => Self::Invalid(format!("usage: /preset <{}>", PRESET_EVENTS.join("|"))),
            "/log" => Self::Log,
            "/clear" => Self::Clear,
            _ => Self::Invalid(format!("unknown command '{head}', try /help")),
        }
    }
}

/// Console state: the inputs the controller watches plus the controller.
pub struct ReplSession {
    controller: AnalyticsController,
    network: NetworkSelection,
    wallet: WalletFeed,
}

impl ReplSession {
    pub fn new(
        factory: Arc<dyn AnalyticsFactory>,
        config: &Config,
        event_log: Arc<EventLog>,
    ) -> Self {
        let network = NetworkSelection::new(config.network.default_network);
        let wallet = WalletFeed::default();
        let controller = AnalyticsController::spawn(
            factory,
            ControllerInputs {
                write_key: config.analytics.write_key.clone(),
                endpoints: config.network.endpoints(),
                network: network.subscribe(),
                wallet: wallet.subscribe(),
                event_log,
            },
        );
        Self {
            controller,
            network,
            wallet,
        }
    }

    pub fn controller(&self) -> &AnalyticsController {
        &self.controller
    }

    /// Run one command. Returns `None` when the console should exit.
    pub async fn execute(&self, command: ReplCommand) -> Option<Vec<String>> {
        let lines = match command {
            ReplCommand::Quit => return None,
            ReplCommand::Help => help_lines(),
            ReplCommand::Status => vec![self.status_line()],
            ReplCommand::Connect {
                public_key,
                wallet_name,
            } => {
                self.wallet
                    .publish(WalletSnapshot::connected(public_key, wallet_name));
                self.controller.flush().await;
                vec![self.status_line()]
            }
            ReplCommand::Disconnect => {
                let current = self.wallet.current();
                if !current.connected {
                    vec![dim("wallet already disconnected")]
                } else {
                    self.wallet.publish(current.disconnecting());
                    self.wallet.publish(WalletSnapshot::disconnected());
                    self.controller.flush().await;
                    vec![self.status_line()]
                }
            }
            ReplCommand::Network(candidate) => {
                if Network::parse(&candidate).is_none() {
                    vec![error_line(&format!(
                        "unknown network '{candidate}', expected devnet, testnet or mainnet-beta"
                    ))]
                } else {
                    self.network.set(&candidate);
                    self.controller.flush().await;
                    vec![self.status_line()]
                }
            }
            ReplCommand::SetKey(raw) => {
                let key = raw.as_deref().and_then(WriteKey::parse);
                let changed = self.controller.set_write_key(key);
                self.controller.flush().await;
                if changed {
                    vec![self.status_line()]
                } else {
                    vec![dim("write key unchanged")]
                }
            }
            ReplCommand::Track { event, properties } => {
                match analytics::parse_properties(&properties) {
                    Ok(properties) => self.track(&event, properties).await,
                    Err(e) => vec![error_line(&e.to_string())],
                }
            }
            ReplCommand::Preset(name) => match analytics::preset_event(&name) {
                Some(properties) => self.track(&name, properties).await,
                None => vec![error_line(&format!(
                    "unknown preset '{name}', expected one of: {}",
                    PRESET_EVENTS.join(", ")
                ))],
            },
            ReplCommand::Record { kind, payload } => match analytics::parse_properties(&payload) {
                Ok(payload) => {
                    let entry = self.controller.record_event(kind, payload);
                    vec![render_entry(&entry)]
                }
                Err(e) => vec![error_line(&e.to_string())],
            },
            ReplCommand::Log => {
                let entries = self.controller.event_log_entries();
                if entries.is_empty() {
                    vec![dim("no events yet")]
                } else {
                    entries.iter().map(render_entry).collect()
                }
            }
            ReplCommand::Clear => {
                self.controller.clear_event_log();
                vec![dim("event log cleared")]
            }
            ReplCommand::Invalid(message) => vec![error_line(&message)],
        };
        Some(lines)
    }

    async fn track(&self, event: &str, properties: crate::event_log::EventPayload) -> Vec<String> {
        match self.controller.track(event, properties).await {
            Ok(()) => vec![format!("  \x1b[32m\u{25CF} tracked {event}\x1b[0m")],
            Err(e) => vec![error_line(&e.to_string())],
        }
    }

    pub fn status_line(&self) -> String {
        render_status(
            &self.controller.state(),
            self.network.current(),
            &self.wallet.current(),
        )
    }

    pub async fn shutdown(self) {
        self.controller.shutdown().await;
    }
}

fn help_lines() -> Vec<String> {
    let h = "\x1b[1m";
    let c = "\x1b[1;36m";
    let d = "\x1b[90m";
    let r = "\x1b[0m";

    vec![
        String::new(),
        format!("  {h}Formo Sync{r}"),
        String::new(),
        format!("  {h}Inputs{r}"),
        format!("  {c}/connect [pubkey] [name]{r}  {d}connect a wallet (demo key by default){r}"),
        format!("  {c}/disconnect{r}               {d}disconnect the wallet{r}"),
        format!("  {c}/network <id>{r}             {d}devnet, testnet or mainnet-beta{r}"),
        format!("  {c}/key <value>|clear{r}        {d}replace or remove the write key{r}"),
        String::new(),
        format!("  {h}Events{r}"),
        format!("  {c}/track <name> [json]{r}      {d}report a custom event{r}"),
        format!("  {c}/preset <name>{r}            {d}{}{r}", PRESET_EVENTS.join(", ")),
        format!("  {c}/record <kind> [json]{r}     {d}append to the event log{r}"),
        format!("  {c}/log{r}                      {d}show the event log{r}"),
        format!("  {c}/clear{r}                    {d}clear the event log{r}"),
        String::new(),
        format!("  {c}/status{r}                   {d}controller status{r}"),
        format!("  {c}/quit{r} {c}/exit{r}               {d}exit{r}"),
        String::new(),
    ]
}

fn dim(message: &str) -> String {
    format!("  \x1b[90m{message}\x1b[0m")
}

fn error_line(message: &str) -> String {
    format!("  \x1b[31m\u{2717} {message}\x1b[0m")
}

/// One status line: indicator, network and wallet.
pub fn render_status(state: &LifecycleState, network: Network, wallet: &WalletSnapshot) -> String {
    let (icon, color) = match state.status() {
        StatusIndicator::Active => ("\u{25CF}", "\x1b[32m"),
        StatusIndicator::Initializing => ("\u{25CB}", "\x1b[33m"),
        StatusIndicator::Error(_) => ("\u{2717}", "\x1b[31m"),
        StatusIndicator::Stopped => ("\u{25A0}", "\x1b[90m"),
    };
    let wallet = match wallet.short_address() {
        Some(address) => format!(
            "{address} ({})",
            wallet.wallet_name.as_deref().unwrap_or("Unknown")
        ),
        None if wallet.disconnecting => "disconnecting".to_string(),
        None => "not connected".to_string(),
    };
    format!(
        "  {color}{icon} analytics {}\x1b[0m \x1b[90m| network {network} | wallet {wallet}\x1b[0m",
        state.status()
    )
}

/// One log line, colored by tone.
pub fn render_entry(entry: &EventLogEntry) -> String {
    let color = entry.kind.tone().ansi_color();
    let time = entry.timestamp.with_timezone(&Local).format("%H:%M:%S");
    let payload = if entry.payload.is_empty() {
        String::new()
    } else {
        let rendered = serde_json::Value::Object(entry.payload.clone()).to_string();
        format!(" \x1b[90m{}\x1b[0m", truncate_preview(&rendered, PAYLOAD_PREVIEW_MAX))
    };
    format!("  \x1b[90m{time}\x1b[0m {color}{}\x1b[0m{payload}", entry.kind)
}

fn truncate_preview(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

/// Rustyline helper for slash-command tab completion.
struct ReplHelper;

impl Completer for ReplHelper {
    type Candidate = String;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &rustyline::Context<'_>,
    ) -> rustyline::Result<(usize, Vec<String>)> {
        if !line.starts_with('/') {
            return Ok((0, vec![]));
        }

        let prefix = &line[..pos];
        let matches: Vec<String> = SLASH_COMMANDS
            .iter()
            .filter(|cmd| cmd.starts_with(prefix))
            .map(|cmd| cmd.to_string())
            .collect();

        Ok((0, matches))
    }
}

impl Hinter for ReplHelper {
    type Hint = String;

    fn hint(&self, line: &str, pos: usize, _ctx: &rustyline::Context<'_>) -> Option<String> {
        if !line.starts_with('/') || pos < line.len() {
            return None;
        }

        SLASH_COMMANDS
            .iter()
            .find(|cmd| cmd.starts_with(line) && **cmd != line)
            .map(|cmd| cmd[line.len()..].to_string())
    }
}

impl Highlighter for ReplHelper {
    fn highlight_hint<'h>(&self, hint: &'h str) -> Cow<'h, str> {
        Cow::Owned(format!("\x1b[90m{hint}\x1b[0m"))
    }
}

impl Validator for ReplHelper {}
impl Helper for ReplHelper {}

/// Get the history file path (~/.formo-sync/history).
fn history_path() -> std::path::PathBuf {
    crate::bootstrap::formo_home().join("history")
}

/// Read lines on a blocking thread and forward them to the async loop.
fn spawn_input_thread(tx: mpsc::Sender<String>) {
    std::thread::spawn(move || {
        let config = EditorConfig::builder()
            .auto_add_history(true)
            .completion_type(CompletionType::List);
        let config = match config.history_ignore_dups(true) {
            Ok(builder) => builder.build(),
            Err(_) => EditorConfig::default(),
        };

        let mut rl = match Editor::with_config(config) {
            Ok(editor) => editor,
            Err(e) => {
                eprintln!("Failed to initialize line editor: {e}");
                let _ = tx.blocking_send("/quit".to_string());
                return;
            }
        };
        rl.set_helper(Some(ReplHelper));

        let hist_path = history_path();
        if let Some(parent) = hist_path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        let _ = rl.load_history(&hist_path);

        loop {
            match rl.readline("\x1b[1;36m\u{203A}\x1b[0m ") {
                Ok(line) => {
                    let line = line.trim();
                    if line.is_empty() {
                        continue;
                    }
                    if tx.blocking_send(line.to_string()).is_err() {
                        break;
                    }
                }
                Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => {
                    let _ = tx.blocking_send("/quit".to_string());
                    break;
                }
                Err(e) => {
                    eprintln!("Input error: {e}");
                    let _ = tx.blocking_send("/quit".to_string());
                    break;
                }
            }
        }

        let _ = rl.save_history(&hist_path);
    });
}

/// Run the interactive console until `/quit` or EOF.
pub async fn run_repl(
    factory: Arc<dyn AnalyticsFactory>,
    config: &Config,
    auto_connect: bool,
) -> anyhow::Result<()> {
    let session = ReplSession::new(factory, config, Arc::new(EventLog::new()));
    let mut state_rx = session.controller().subscribe();

    println!("\x1b[1mFormo Sync\x1b[0m  /help for commands, /quit to exit");
    println!();

    if auto_connect || config.repl.auto_connect {
        let command = ReplCommand::Connect {
            public_key: DEMO_PUBLIC_KEY.to_string(),
            wallet_name: Some(DEMO_WALLET_NAME.to_string()),
        };
        session.execute(command).await;
        println!("  \x1b[36mdemo wallet {}\x1b[0m", shorten_address(DEMO_PUBLIC_KEY));
    } else {
        session.controller().flush().await;
    }
    println!("{}", session.status_line());

    let (tx, mut rx) = mpsc::channel(32);
    spawn_input_thread(tx);

    let mut last_status = session.controller().status();
    loop {
        tokio::select! {
            line = rx.recv() => {
                let Some(line) = line else { break };
                match session.execute(ReplCommand::parse(&line)).await {
                    Some(lines) => {
                        for line in lines {
                            println!("{line}");
                        }
                    }
                    None => break,
                }
                last_status = session.controller().status();
            }
            changed = state_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let status = state_rx.borrow_and_update().status();
                if status != last_status {
                    eprintln!("{}", session.status_line());
                    last_status = status;
                }
            }
        }
    }

    session.shutdown().await;
    println!("\x1b[90mbye\x1b[0m");
    Ok(())
}
