//! Interactive explorer sessions.
//!
//! A [`Session`] owns one engine for its lifetime, so permanent locks opened
//! during the session stay open until it ends. Commands arrive as text lines,
//! are parsed into [`Command`]s and executed; every mutation is followed by a
//! save of the lock files that changed.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use engine::{Engine, EngineError, EntryKind, LockState, UnlockResult};
use thiserror::Error;

use crate::config::Config;
use crate::files::{decoration, DirectoryBrowser, NodeNote, TreeBuilder};
use crate::storage::LockFileStore;

/// The engine as wired to the filesystem.
pub type ExplorerEngine = Engine<DirectoryBrowser, LockFileStore>;

/// Errors from parsing a command line.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("empty command")]
    Empty,

    #[error("unknown command: {0} (try 'help')")]
    Unknown(String),

    #[error("{command} requires a {argument}")]
    MissingArgument {
        command: &'static str,
        argument: &'static str,
    },

    #[error("unterminated quote")]
    UnterminatedQuote,
}

/// A parsed session command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Tree(Option<String>),
    Ls(Option<String>),
    Open(String),
    Status(String),
    Lock { path: String, password: String },
    TempLock { path: String, password: String },
    Unlock { path: String, password: String },
    Relock(String),
    Hide(String),
    Reload,
    Rules,
    Root(Option<String>),
    Help,
    Quit,
}

impl Command {
    /// Parses one input line.
    ///
    /// A path may be double-quoted. For commands that take only a path the
    /// remaining words are joined, so unquoted names with spaces work too.
    pub fn parse(line: &str) -> Result<Self, CommandError> {
        let args = split_args(line)?;
        let (name, rest) = args.split_first().ok_or(CommandError::Empty)?;

        let command = match name.to_lowercase().as_str() {
            "tree" => Command::Tree(optional(rest)),
            "ls" => Command::Ls(optional(rest)),
            "open" => Command::Open(required(rest, "open")?),
            "status" => Command::Status(required(rest, "status")?),
            "lock" => {
                let (path, password) = path_and_password(rest, "lock")?;
                Command::Lock { path, password }
            }
            "templock" => {
                let (path, password) = path_and_password(rest, "templock")?;
                Command::TempLock { path, password }
            }
            "unlock" => {
                let (path, password) = path_and_password(rest, "unlock")?;
                Command::Unlock { path, password }
            }
            "relock" => Command::Relock(required(rest, "relock")?),
            "hide" => Command::Hide(required(rest, "hide")?),
            "reload" => Command::Reload,
            "rules" => Command::Rules,
            "root" => Command::Root(optional(rest)),
            "help" | "?" => Command::Help,
            "quit" | "exit" => Command::Quit,
            other => return Err(CommandError::Unknown(other.to_string())),
        };
        Ok(command)
    }

    /// Whether the command changes lock or hidden state.
    pub fn is_mutation(&self) -> bool {
        matches!(
            self,
            Command::Lock { .. }
                | Command::TempLock { .. }
                | Command::Unlock { .. }
                | Command::Relock(_)
                | Command::Hide(_)
        )
    }
}

fn split_args(line: &str) -> Result<Vec<String>, CommandError> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut has_token = false;

    for c in line.chars() {
        match c {
            '"' => {
                in_quotes = !in_quotes;
                has_token = true;
            }
            c if c.is_whitespace() && !in_quotes => {
                if has_token {
                    args.push(std::mem::take(&mut current));
                    has_token = false;
                }
            }
            c => {
                current.push(c);
                has_token = true;
            }
        }
    }
    if in_quotes {
        return Err(CommandError::UnterminatedQuote);
    }
    if has_token {
        args.push(current);
    }
    Ok(args)
}

fn optional(rest: &[String]) -> Option<String> {
    if rest.is_empty() {
        None
    } else {
        Some(rest.join(" "))
    }
}

fn required(rest: &[String], command: &'static str) -> Result<String, CommandError> {
    optional(rest).ok_or(CommandError::MissingArgument {
        command,
        argument: "path",
    })
}

fn path_and_password(
    rest: &[String],
    command: &'static str,
) -> Result<(String, String), CommandError> {
    let (path, password) = rest.split_first().ok_or(CommandError::MissingArgument {
        command,
        argument: "path",
    })?;
    let password = password.join(" ");
    if password.is_empty() {
        return Err(CommandError::MissingArgument {
            command,
            argument: "password",
        });
    }
    Ok((path.clone(), password))
}

/// A context action offered for a tree node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    SetLock,
    SetTemporaryLock,
    Unlock,
    Relock,
    Hide,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Action::SetLock => "Set Password",
            Action::SetTemporaryLock => "Set TEMP Lock",
            Action::Unlock => "Unlock",
            Action::Relock => "Relock",
            Action::Hide => "Hide",
        };
        f.write_str(label)
    }
}

/// Actions that make sense for a node in the given lock state.
pub fn available_actions(state: LockState) -> Vec<Action> {
    match state {
        LockState::UnlockedPermanent => vec![Action::Relock],
        LockState::LockedPermanent | LockState::LockedTemporary => {
            vec![Action::Unlock, Action::Hide]
        }
        LockState::NoLock => vec![Action::SetLock, Action::SetTemporaryLock, Action::Hide],
    }
}

/// Result of executing one command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Text to show; the session continues.
    Continue(String),
    /// The session should end.
    Quit,
}

const HELP: &str = "\
Commands:
  tree [path]              show the visible tree
  ls [dir]                 list visible entries of a directory
  open <path>              open an entry if accessible
  status <path>            show lock, access and visibility state
  lock <path> <pw>         set a permanent lock
  templock <path> <pw>     set a one-time lock
  unlock <path> <pw>       open a lock
  relock <path>            close an opened permanent lock
  hide <path>              hide an entry for this session
  reload                   re-read the rule file
  rules                    list loaded rules
  root [dir]               show or change the root directory
  help                     show this help
  quit                     end the session";

/// One explorer session over the configured root.
pub struct Session {
    engine: ExplorerEngine,
    config: Config,
    config_path: PathBuf,
}

impl Session {
    /// Opens a session: resolves the root, loads both lock files and the
    /// rule file.
    pub fn open(config: Config, config_path: PathBuf) -> Result<Self> {
        let root = config.resolve_root()?;
        let browser = DirectoryBrowser::new(&root)
            .with_context(|| format!("Cannot browse {}", root.display()))?
            .show_dotfiles(config.browse.show_dotfiles);
        let store = LockFileStore::new(&config.explorer.data_dir);
        let canonical_root = browser.root().to_path_buf();

        let mut engine = Engine::new(canonical_root, config.path_style(), browser, store);
        engine.load_locks();
        tracing::info!("Session opened at {}", engine.root());

        let mut session = Self {
            engine,
            config,
            config_path,
        };
        session.load_rules();
        Ok(session)
    }

    /// The underlying engine.
    pub fn engine(&self) -> &ExplorerEngine {
        &self.engine
    }

    /// The session configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Re-reads the rule file. A missing file means no rules; an unreadable
    /// one means no rules plus a diagnostic.
    pub fn load_rules(&mut self) -> Vec<EngineError> {
        let path = self.config.rules_path();
        if !path.exists() {
            tracing::debug!("Rule file not found at {:?}, no rules loaded", path);
            return self.engine.reload_rules("");
        }

        match fs::read_to_string(&path) {
            Ok(source) => self.engine.reload_rules(&source),
            Err(e) => {
                tracing::warn!("Failed to read rule file {:?}: {}", path, e);
                let mut diagnostics = self.engine.reload_rules("");
                diagnostics.insert(
                    0,
                    EngineError::PathResolution {
                        path: path.display().to_string(),
                        reason: e.to_string(),
                    },
                );
                diagnostics
            }
        }
    }

    /// Parses and executes one input line.
    pub fn execute_line(&mut self, line: &str) -> Outcome {
        match Command::parse(line) {
            Ok(command) => self.execute(command),
            Err(CommandError::Empty) => Outcome::Continue(String::new()),
            Err(e) => Outcome::Continue(format!("error: {}", e)),
        }
    }

    /// Executes one command.
    pub fn execute(&mut self, command: Command) -> Outcome {
        if command == Command::Quit {
            return Outcome::Quit;
        }
        let mutation = command.is_mutation();
        let mut output = match self.run(command) {
            Ok(text) => text,
            Err(e) => format!("error: {:#}", e),
        };
        if mutation {
            if let Some(warning) = self.flush() {
                if !output.is_empty() {
                    output.push('\n');
                }
                output.push_str(&warning);
            }
        }
        Outcome::Continue(output)
    }

    /// Saves changed lock files. Returns a warning if a save failed.
    pub fn flush(&mut self) -> Option<String> {
        if !self.engine.has_unsaved_changes() {
            return None;
        }
        match self.engine.save_pending() {
            Ok(()) => None,
            Err(e) => Some(format!("warning: {} (will retry on the next change)", e)),
        }
    }

    fn run(&mut self, command: Command) -> Result<String> {
        match command {
            Command::Tree(path) => Ok(self.tree(path.as_deref())),
            Command::Ls(dir) => self.ls(dir.as_deref()),
            Command::Open(path) => self.open_entry(&path),
            Command::Status(path) => Ok(self.status(&path)),
            Command::Lock { path, password } => {
                self.require_entry(&path)?;
                self.engine.set_permanent_lock(&path, &password);
                Ok(format!("locked {}", path))
            }
            Command::TempLock { path, password } => {
                self.require_entry(&path)?;
                self.engine.set_temporary_lock(&path, &password);
                Ok(format!("set one-time lock on {}", path))
            }
            Command::Unlock { path, password } => {
                let text = match self.engine.attempt_unlock(&path, &password) {
                    UnlockResult::Unlocked => format!("unlocked {}", path),
                    UnlockResult::WrongPassword => format!("wrong password for {}", path),
                    UnlockResult::NotLocked => format!("{} is not locked", path),
                };
                Ok(text)
            }
            Command::Relock(path) => {
                if self.engine.relock(&path) {
                    Ok(format!("relocked {}", path))
                } else {
                    Ok(format!("{} is not an unlocked permanent lock", path))
                }
            }
            Command::Hide(path) => {
                self.require_entry(&path)?;
                if self.engine.hide(&path) {
                    Ok(format!("hid {}", path))
                } else {
                    Ok(format!("{} is already hidden", path))
                }
            }
            Command::Reload => {
                let diagnostics = self.load_rules();
                Ok(format_rule_load(self.engine.rules().len(), &diagnostics))
            }
            Command::Rules => Ok(self.list_rules()),
            Command::Root(None) => Ok(self.engine.root_path().display().to_string()),
            Command::Root(Some(dir)) => self.set_root(Path::new(&dir)),
            Command::Help => Ok(HELP.to_string()),
            Command::Quit => Ok(String::new()),
        }
    }

    fn require_entry(&self, path: &str) -> Result<EntryKind> {
        self.engine
            .entry_kind(path)
            .with_context(|| format!("no such entry: {}", path))
    }

    fn tree(&self, path: Option<&str>) -> String {
        let dir = path.map(PathBuf::from).unwrap_or_else(|| self.engine.root_path().to_path_buf());
        TreeBuilder::new(self.config.browse.max_depth)
            .build(&self.engine, &dir)
            .render()
    }

    fn ls(&self, dir: Option<&str>) -> Result<String> {
        let dir = dir.map(PathBuf::from).unwrap_or_else(|| self.engine.root_path().to_path_buf());
        let node = TreeBuilder::new(1).build(&self.engine, &dir);
        match &node.note {
            Some(NodeNote::Locked) => anyhow::bail!("{} is locked", dir.display()),
            Some(NodeNote::Unreadable(reason)) => anyhow::bail!("{}", reason),
            _ => {}
        }
        if node.kind != EntryKind::Directory {
            anyhow::bail!("not a directory: {}", dir.display());
        }

        let lines: Vec<String> = node
            .children
            .iter()
            .map(|child| {
                let mut line = child.name.clone();
                if child.kind == EntryKind::Directory {
                    line.push('/');
                }
                line.push_str(decoration(child.lock_state));
                if !child.accessible {
                    line.push_str(" (locked)");
                }
                line
            })
            .collect();
        Ok(lines.join("\n"))
    }

    fn open_entry(&self, path: &str) -> Result<String> {
        if self.engine.entry_kind(path).is_none() || !self.engine.is_visible(path) {
            anyhow::bail!("no such entry: {}", path);
        }
        if let Some(blocker) = self.engine.blocking_lock(path) {
            anyhow::bail!("not accessible: locked at {}", blocker);
        }

        let resolved = self.engine.resolve(Path::new(path));
        let entry = self.engine.listing().get_entry(&resolved)?;
        match entry.kind {
            EntryKind::File => Ok(format!("{}: file, {} bytes", entry.name, entry.size)),
            EntryKind::Directory => {
                let mut cache = engine::AccessCache::new();
                let count = self
                    .engine
                    .visible_children(&resolved, &mut cache)
                    .map(|children| children.len())?;
                Ok(format!("{}: directory, {} visible entries", entry.name, count))
            }
        }
    }

    fn status(&self, path: &str) -> String {
        let key = self.engine.normalize(path);
        let state = self.engine.lock_state(path);
        let kind = match self.engine.entry_kind(path) {
            Some(EntryKind::File) => "file",
            Some(EntryKind::Directory) => "directory",
            None => "missing",
        };
        let access = match self.engine.blocking_lock(path) {
            None => "yes".to_string(),
            Some(blocker) => format!("no (locked at {})", blocker),
        };
        let actions: Vec<String> = available_actions(state)
            .iter()
            .map(Action::to_string)
            .collect();

        [
            format!("path:       {}", key),
            format!("kind:       {}", kind),
            format!("visible:    {}", yes_no(self.engine.is_visible(path))),
            format!("accessible: {}", access),
            format!("lock:       {}", describe_state(state)),
            format!("actions:    {}", actions.join(", ")),
        ]
        .join("\n")
    }

    fn list_rules(&self) -> String {
        let rules = self.engine.rules();
        if rules.is_empty() {
            return "no rules loaded".to_string();
        }
        rules
            .iter()
            .enumerate()
            .map(|(i, rule)| format!("{:>3}. {}", i + 1, rule))
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn set_root(&mut self, dir: &Path) -> Result<String> {
        let dir = self.engine.resolve(dir);
        let browser = DirectoryBrowser::new(&dir)
            .with_context(|| format!("Cannot browse {}", dir.display()))?
            .show_dotfiles(self.config.browse.show_dotfiles);
        let root = browser.root().to_path_buf();

        // Nothing changes unless the new root is on disk.
        let mut config = self.config.clone();
        config.explorer.root_dir = Some(root.clone());
        config.save(&self.config_path)?;
        self.config = config;

        *self.engine.listing_mut() = browser;
        let diagnostics = self.engine.set_root(&root);

        let mut text = format!("root set to {}", root.display());
        for diagnostic in diagnostics {
            text.push_str(&format!("\n  {}", diagnostic));
        }
        Ok(text)
    }
}

/// Summary of a rule load.
pub fn format_rule_load(count: usize, diagnostics: &[EngineError]) -> String {
    let mut text = format!("{} rules loaded", count);
    for diagnostic in diagnostics {
        text.push_str(&format!("\n  {}", diagnostic));
    }
    text
}

fn describe_state(state: LockState) -> &'static str {
    match state {
        LockState::NoLock => "none",
        LockState::LockedPermanent => "locked (permanent)",
        LockState::UnlockedPermanent => "unlocked for this session (permanent)",
        LockState::LockedTemporary => "locked (one-time)",
    }
}

fn yes_no(value: bool) -> &'static str {
    if value {
        "yes"
    } else {
        "no"
    }
}
