// SPDX-FileCopyrightText: 2026 Buildchat Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Turning chat text into command tokens.

use std::time::Duration;

use buildchat_core::CommandError;

/// Characters that may follow the bot's nickname when it is addressed
/// directly (`bot: status`, `bot, status`).
const NICKNAME_SEPARATORS: [char; 2] = [':', ','];

/// Strips the command prefix or a leading `nickname:` from `body`.
///
/// Returns `None` when the message is not addressed to the bot.
pub fn extract_payload<'a>(body: &'a str, prefix: &str, nickname: &str) -> Option<&'a str> {
    let body = body.trim_start();

    if !prefix.is_empty()
        && let Some(rest) = body.strip_prefix(prefix)
    {
        return Some(rest.trim());
    }

    if !nickname.is_empty()
        && let Some(rest) = body.strip_prefix(nickname)
        && let Some(rest) = rest.strip_prefix(NICKNAME_SEPARATORS)
    {
        return Some(rest.trim());
    }

    None
}

/// Splits `payload` into whitespace-separated words, keeping double-quoted
/// substrings together.
///
/// An unterminated quote does not fail: an opening quote swallows the rest
/// of the line (quote included) into one token, and a quote in the middle
/// of a word stays part of that word.
pub fn tokenize(payload: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut rest = payload.trim_start();

    while !rest.is_empty() {
        if let Some(quoted) = rest.strip_prefix('"') {
            match quoted.find('"') {
                Some(end) => {
                    tokens.push(quoted[..end].to_string());
                    rest = &quoted[end + 1..];
                }
                None => {
                    tokens.push(rest.trim_end().to_string());
                    rest = "";
                }
            }
        } else {
            let end = rest.find(char::is_whitespace).unwrap_or(rest.len());
            tokens.push(rest[..end].to_string());
            rest = &rest[end..];
        }
        rest = rest.trim_start();
    }

    tokens
}

/// Parses a build delay: `now`, or a number with an optional unit
/// (`s`/`sec`, `m`/`min`, `h`/`hour`). A bare number means seconds.
pub fn parse_delay(arg: &str) -> Result<Duration, CommandError> {
    let arg = arg.trim().to_lowercase();
    if arg == "now" {
        return Ok(Duration::ZERO);
    }

    let split = arg
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(arg.len());
    let (digits, unit) = arg.split_at(split);
    let invalid = || CommandError::Usage(format!("invalid delay `{arg}`; use now, 30s, 5m or 1h"));

    let amount: u64 = digits.parse().map_err(|_| invalid())?;
    let seconds_per_unit = match unit {
        "" | "s" | "sec" | "secs" | "second" | "seconds" => 1,
        "m" | "min" | "mins" | "minute" | "minutes" => 60,
        "h" | "hour" | "hours" => 3600,
        _ => return Err(invalid()),
    };

    Ok(Duration::from_secs(amount.saturating_mul(seconds_per_unit)))
}
