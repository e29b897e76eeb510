//! Command line parsing
//!
//! One input line becomes one [`Invocation`]: a typed [`Command`] plus an
//! optional `| cp [clip]` capture. Nothing here touches drives or providers.

use crate::error::{AppError, Result};

// =============================================================================
// Tokens
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// A word, with quotes already removed
    Word(String),
    /// Pipe operator `|`
    Pipe,
}

/// Splits a line on whitespace; quotes embed spaces and `|` is its own token
pub struct Lexer<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    pub fn tokenize(mut self) -> Result<Vec<Token>> {
        let mut tokens = Vec::new();
        loop {
            self.skip_whitespace();
            let Some(c) = self.current_char() else {
                return Ok(tokens);
            };

            if c == '|' {
                self.pos += 1;
                tokens.push(Token::Pipe);
            } else {
                tokens.push(Token::Word(self.read_word()?));
            }
        }
    }

    fn current_char(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn skip_whitespace(&mut self) {
        while let Some(c) = self.current_char() {
            if !c.is_whitespace() {
                break;
            }
            self.pos += c.len_utf8();
        }
    }

    /// Read up to the next unquoted space or pipe; `my" "file` is one word
    fn read_word(&mut self) -> Result<String> {
        let mut word = String::new();
        while let Some(c) = self.current_char() {
            match c {
                c if c.is_whitespace() => break,
                '|' => break,
                '"' | '\'' => {
                    self.pos += 1;
                    self.read_quoted(c, &mut word)?;
                }
                _ => {
                    word.push(c);
                    self.pos += c.len_utf8();
                }
            }
        }
        Ok(word)
    }

    fn read_quoted(&mut self, quote: char, word: &mut String) -> Result<()> {
        while let Some(c) = self.current_char() {
            self.pos += c.len_utf8();
            if c == quote {
                return Ok(());
            }
            word.push(c);
        }
        Err(AppError::Usage(format!("missing closing {}", quote)))
    }
}

// =============================================================================
// Commands
// =============================================================================

/// A parsed command, before any path is resolved
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Pwd,
    Cd { target: Option<String> },
    List { target: Option<String> },
    Cat { target: String },
    Copy { from: String, to: String },
    ListClips,
    Move { from: String, to: String },
    Remove { target: String },
    Tree { target: Option<String> },
    Search { target: String, keywords: Vec<String> },
    Paste { clip: Option<String> },
    SwitchDrive { name: String },
    CreateDrive,
    Help,
    Clear,
    Quit,
}

impl Command {
    /// Commands whose result can be piped into a clip
    pub fn produces_listing(&self) -> bool {
        matches!(
            self,
            Command::List { .. } | Command::Tree { .. } | Command::Search { .. }
        )
    }
}

/// `| cp [clip]` suffix
#[derive(Debug, Clone, PartialEq)]
pub struct Capture {
    pub clip: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Invocation {
    pub command: Command,
    pub capture: Option<Capture>,
}

/// Parse one input line; blank lines yield `None`
pub fn parse(line: &str) -> Result<Option<Invocation>> {
    let tokens = Lexer::new(line).tokenize()?;

    let mut segments = tokens.split(|t| *t == Token::Pipe);
    let head = words(segments.next().unwrap_or_default());
    let tail: Vec<Vec<String>> = segments.map(words).collect();

    if head.is_empty() {
        if tail.is_empty() {
            return Ok(None);
        }
        return Err(AppError::Usage("nothing to pipe from".into()));
    }

    let command = parse_command(&head)?;
    let capture = match tail.as_slice() {
        [] => None,
        [pipe] => Some(parse_capture(pipe)?),
        _ => return Err(AppError::Usage("only one `| cp [clip]` is allowed".into())),
    };

    if capture.is_some() && !command.produces_listing() {
        return Err(AppError::Usage(
            "only ls, tree and search results can be piped into a clip".into(),
        ));
    }

    Ok(Some(Invocation { command, capture }))
}

fn words(tokens: &[Token]) -> Vec<String> {
    tokens
        .iter()
        .filter_map(|t| match t {
            Token::Word(w) => Some(w.clone()),
            Token::Pipe => None,
        })
        .collect()
}

fn parse_capture(words: &[String]) -> Result<Capture> {
    match words {
        [verb] if verb == "cp" => Ok(Capture { clip: None }),
        [verb, clip] if verb == "cp" => Ok(Capture { clip: Some(clip.clone()) }),
        _ => Err(AppError::Usage("pipe into `cp [clip]`".into())),
    }
}

fn parse_command(words: &[String]) -> Result<Command> {
    let verb = words[0].as_str();
    let args = &words[1..];

    let command = match verb {
        "pwd" => Command::Pwd,
        "cd" => Command::Cd { target: args.first().cloned() },
        "ls" | "l" | "ll" | "la" | "lf" => Command::List { target: args.first().cloned() },
        "cat" => Command::Cat { target: required(args, 0, "cat <file>")? },
        "cp" if args.iter().any(|a| a == "-l" || a == "--list") => Command::ListClips,
        "cp" => Command::Copy {
            from: required(args, 0, "cp <from> <to>")?,
            to: args.get(1).cloned().unwrap_or_else(|| ".".to_string()),
        },
        "mv" => Command::Move {
            from: required(args, 0, "mv <from> <to>")?,
            to: required(args, 1, "mv <from> <to>")?,
        },
        "rm" => Command::Remove { target: required(args, 0, "rm <file> (or rm <folder>/)")? },
        "tree" => Command::Tree { target: args.first().cloned() },
        "search" => {
            let usage = "search <folder> <keyword>...";
            let target = required(args, 0, usage)?;
            if args.len() < 2 {
                return Err(AppError::Usage(usage.into()));
            }
            Command::Search {
                target,
                keywords: args[1..].to_vec(),
            }
        }
        "pst" => Command::Paste { clip: args.first().cloned() },
        "help" => Command::Help,
        "clear" => Command::Clear,
        "q" | "Q" => Command::Quit,
        v if v.eq_ignore_ascii_case("quit") || v.eq_ignore_ascii_case("exit") => Command::Quit,
        "::" => Command::CreateDrive,
        v if v.len() > 1 && v.ends_with(':') => Command::SwitchDrive {
            name: v[..v.len() - 1].to_string(),
        },
        _ => {
            tracing::warn!("Unknown command: {}", verb);
            return Err(AppError::UnknownCommand(verb.to_string()));
        }
    };

    Ok(command)
}

fn required(args: &[String], index: usize, usage: &str) -> Result<String> {
    args.get(index)
        .cloned()
        .ok_or_else(|| AppError::Usage(usage.to_string()))
}

/// Split an optional `drive:` prefix off a path argument
///
/// Only text before the first `/` can name a drive, so `./a:b` stays a path.
pub fn split_drive(arg: &str) -> (Option<&str>, &str) {
    let head = arg.split('/').next().unwrap_or_default();
    match head.find(':') {
        Some(idx) if idx > 0 => (Some(&arg[..idx]), &arg[idx + 1..]),
        _ => (None, arg),
    }
}
