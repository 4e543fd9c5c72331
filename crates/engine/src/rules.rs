//! Conditional visibility rules.
//!
//! Rule source is plain text, one statement per line:
//!
//! ```text
//! HIDE <name>
//! IF <item>[ AND <item>]* IS UNLOCKED, SHOW <name>[ IN <folder>][.]
//! ```
//!
//! Keywords are case-insensitive. Blank lines and `#` comments are skipped.
//! Any other line that does not parse is skipped with a diagnostic; a bad
//! line never stops the rest of the source from loading.
//!
//! `HIDE` statements are applied once, when rules are loaded, against the
//! immediate children of the root. Conditional statements are kept in
//! declaration order and the first one whose target matches a path decides
//! that path's visibility.

use std::fmt;

use crate::entry::EntryKind;
use crate::error::EngineError;
use crate::locks::LockStore;
use crate::path_key::PathKey;

/// A parsed rule statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rule {
    /// Hide root-level entries with exactly this name.
    Hide(String),
    /// Show a target only while all requirements are satisfied.
    Conditional(ConditionalRule),
}

/// `IF .. IS UNLOCKED, SHOW ..` statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConditionalRule {
    /// Items that must be satisfied, as names relative to the root.
    pub requirements: Vec<String>,
    /// Bare name of the entry this rule governs.
    pub target_name: String,
    /// Folder holding the target, relative to the root. `None` means the root.
    pub target_folder: Option<String>,
}

impl ConditionalRule {
    /// Kind of entry the target is assumed to be, from its name alone.
    pub fn target_kind(&self) -> EntryKind {
        EntryKind::infer_from_name(&self.target_name)
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rule::Hide(name) => write!(f, "HIDE {name}"),
            Rule::Conditional(rule) => {
                write!(
                    f,
                    "IF {} IS UNLOCKED, SHOW {}",
                    rule.requirements.join(" AND "),
                    rule.target_name
                )?;
                if let Some(folder) = &rule.target_folder {
                    write!(f, " IN {folder}")?;
                }
                f.write_str(".")
            }
        }
    }
}

/// Result of parsing a rule source.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedRules {
    /// Statements in declaration order.
    pub rules: Vec<Rule>,
    /// One [`EngineError::InvalidRuleSyntax`] per skipped line.
    pub diagnostics: Vec<EngineError>,
}

/// Parses a complete rule source. Never fails; bad lines become diagnostics.
pub fn parse_rules(source: &str) -> ParsedRules {
    let mut parsed = ParsedRules::default();
    for (idx, line) in source.lines().enumerate() {
        match parse_line(line) {
            Ok(Some(rule)) => parsed.rules.push(rule),
            Ok(None) => {}
            Err(reason) => parsed.diagnostics.push(EngineError::InvalidRuleSyntax {
                line: idx + 1,
                reason,
            }),
        }
    }
    parsed
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Token<'a> {
    Word(&'a str),
    Comma,
}

impl<'a> Token<'a> {
    fn is_keyword(&self, keyword: &str) -> bool {
        matches!(self, Token::Word(w) if w.eq_ignore_ascii_case(keyword))
    }
}

fn tokenize(text: &str) -> Vec<Token<'_>> {
    let mut tokens = Vec::new();
    for word in text.split_whitespace() {
        for (i, piece) in word.split(',').enumerate() {
            if i > 0 {
                tokens.push(Token::Comma);
            }
            if !piece.is_empty() {
                tokens.push(Token::Word(piece));
            }
        }
    }
    tokens
}

fn parse_line(line: &str) -> Result<Option<Rule>, String> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }

    let (keyword, rest) = match line.split_once(char::is_whitespace) {
        Some((keyword, rest)) => (keyword, rest.trim()),
        None => (line, ""),
    };

    if keyword.eq_ignore_ascii_case("HIDE") {
        if rest.is_empty() {
            return Err("HIDE needs a name".to_string());
        }
        return Ok(Some(Rule::Hide(rest.to_string())));
    }

    if keyword.eq_ignore_ascii_case("IF") {
        let body = rest.strip_suffix('.').unwrap_or(rest);
        return parse_conditional(&tokenize(body)).map(|rule| Some(Rule::Conditional(rule)));
    }

    Err(format!("unrecognized statement {keyword:?}"))
}

fn parse_conditional(tokens: &[Token<'_>]) -> Result<ConditionalRule, String> {
    let mut pos = 0;
    let mut requirements = Vec::new();
    let mut current: Vec<&str> = Vec::new();

    // Requirements, up to IS UNLOCKED.
    loop {
        let Some(token) = tokens.get(pos) else {
            return Err("expected IS UNLOCKED".to_string());
        };
        let unlocked_follows = tokens.get(pos + 1).is_some_and(|t| t.is_keyword("UNLOCKED"));
        if token.is_keyword("IS") && unlocked_follows {
            finish_requirement(&mut requirements, &mut current)?;
            pos += 2;
            break;
        }
        match token {
            t if t.is_keyword("AND") => finish_requirement(&mut requirements, &mut current)?,
            Token::Word(word) => current.push(*word),
            Token::Comma => return Err("unexpected ',' in requirements".to_string()),
        }
        pos += 1;
    }

    if tokens.get(pos) == Some(&Token::Comma) {
        pos += 1;
    }
    if !tokens.get(pos).is_some_and(|t| t.is_keyword("SHOW")) {
        return Err("expected SHOW after IS UNLOCKED".to_string());
    }
    pos += 1;

    let target_name = match tokens.get(pos) {
        Some(Token::Word(word)) => word.to_string(),
        _ => return Err("SHOW needs a target name".to_string()),
    };
    pos += 1;

    let mut target_folder = None;
    if pos < tokens.len() {
        if !tokens[pos].is_keyword("IN") {
            return Err(format!("unexpected text after target {target_name:?}"));
        }
        let mut words = Vec::new();
        for token in &tokens[pos + 1..] {
            match token {
                Token::Word(word) => words.push(*word),
                Token::Comma => return Err("unexpected ',' in folder name".to_string()),
            }
        }
        if words.is_empty() {
            return Err("IN needs a folder name".to_string());
        }
        let folder = words.join(" ");
        if folder.contains('.') {
            return Err(format!("folder name {folder:?} cannot contain '.'"));
        }
        target_folder = Some(folder);
    }

    Ok(ConditionalRule {
        requirements,
        target_name,
        target_folder,
    })
}

fn finish_requirement(
    requirements: &mut Vec<String>,
    current: &mut Vec<&str>,
) -> Result<(), String> {
    if current.is_empty() {
        return Err("empty requirement".to_string());
    }
    requirements.push(current.join(" "));
    current.clear();
    Ok(())
}

/// A conditional rule with its names resolved against the root.
#[derive(Debug, Clone)]
struct ResolvedRule {
    target_name: String,
    target_kind: EntryKind,
    folder: PathKey,
    requirements: Vec<PathKey>,
}

/// Loaded rules, ready for evaluation.
#[derive(Debug, Clone, Default)]
pub struct RuleEngine {
    rules: Vec<Rule>,
    resolved: Vec<ResolvedRule>,
}

impl RuleEngine {
    /// Creates an engine with no rules.
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolves parsed rules against `root`.
    pub fn load(rules: Vec<Rule>, root: &PathKey) -> Self {
        let resolved = rules
            .iter()
            .filter_map(|rule| match rule {
                Rule::Conditional(rule) => Some(ResolvedRule {
                    target_name: rule.target_name.clone(),
                    target_kind: rule.target_kind(),
                    folder: match &rule.target_folder {
                        Some(folder) => root.join(folder),
                        None => root.clone(),
                    },
                    requirements: rule.requirements.iter().map(|r| root.join(r)).collect(),
                }),
                Rule::Hide(_) => None,
            })
            .collect();
        Self { rules, resolved }
    }

    /// All statements in declaration order.
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Names from `HIDE` statements.
    pub fn hide_names(&self) -> impl Iterator<Item = &str> {
        self.rules.iter().filter_map(|rule| match rule {
            Rule::Hide(name) => Some(name.as_str()),
            Rule::Conditional(_) => None,
        })
    }

    /// Number of conditional statements.
    pub fn conditional_count(&self) -> usize {
        self.resolved.len()
    }

    /// Decides visibility of the entry at `key` listed as `name`.
    ///
    /// The first rule whose target name, inferred kind, and folder match
    /// decides: `Some(true)` when every requirement is satisfied in `locks`,
    /// `Some(false)` otherwise. `None` when no rule targets the entry or its
    /// kind is unknown.
    pub fn evaluate_visibility(
        &self,
        key: &PathKey,
        name: &str,
        kind: Option<EntryKind>,
        locks: &LockStore,
    ) -> Option<bool> {
        let kind = kind?;
        let parent = key.parent()?;
        let rule = self.resolved.iter().find(|rule| {
            rule.target_kind == kind && rule.target_name == name && rule.folder == parent
        })?;
        Some(rule.requirements.iter().all(|req| locks.is_satisfied(req)))
    }
}
