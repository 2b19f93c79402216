/*
 * Copyright 2025 Security Union LLC
 *
 * Licensed under either of
 *
 * * Apache License, Version 2.0
 *   (http://www.apache.org/licenses/LICENSE-2.0)
 * * MIT license
 *   (http://opensource.org/licenses/MIT)
 *
 * at your option.
 *
 * Unless you explicitly state otherwise, any contribution intentionally
 * submitted for inclusion in the work by you, as defined in the Apache-2.0
 * license, shall be dual licensed as above, without any additional terms or
 * conditions.
 */

//! Parsing of the lines typed at the prompt.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Connect(String),
    Disconnect,
    /// Replace the draft without sending it.
    Draft(String),
    /// Rewrite the draft, optionally replacing it first.
    Polish(Option<String>),
    /// Send the current draft.
    SendDraft,
    /// Send this text right away.
    Message(String),
    ShowId,
    Help,
    Quit,
    /// Whitespace only.
    Empty,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseInputError {
    #[error("unknown command /{0}, try /help")]
    UnknownCommand(String),

    #[error("usage: /{0}")]
    MissingArgument(&'static str),
}

pub const HELP: &str = "\
Commands:
  /connect <id>    start a chat with a friend's ID
  /disconnect      leave the current chat
  /draft <text>    write a draft without sending it
  /polish [text]   rewrite the draft with AI
  /send            send the draft
  /id              show your ID
  /quit            exit
Anything else is sent as a message.";

pub fn parse_input(line: &str) -> Result<Input, ParseInputError> {
    let line = line.trim_end_matches(['\r', '\n']);
    if line.trim().is_empty() {
        return Ok(Input::Empty);
    }
    let Some(command) = line.trim_start().strip_prefix('/') else {
        return Ok(Input::Message(line.to_string()));
    };

    let (name, rest) = match command.split_once(char::is_whitespace) {
        Some((name, rest)) => (name, rest.trim()),
        None => (command, ""),
    };
    let argument = (!rest.is_empty()).then(|| rest.to_string());

    match name {
        "connect" => argument
            .map(Input::Connect)
            .ok_or(ParseInputError::MissingArgument("connect <id>")),
        "disconnect" => Ok(Input::Disconnect),
        "draft" => argument
            .map(Input::Draft)
            .ok_or(ParseInputError::MissingArgument("draft <text>")),
        "polish" => Ok(Input::Polish(argument)),
        "send" => Ok(Input::SendDraft),
        "id" => Ok(Input::ShowId),
        "help" => Ok(Input::Help),
        "quit" | "exit" => Ok(Input::Quit),
        other => Err(ParseInputError::UnknownCommand(other.to_string())),
    }
}
