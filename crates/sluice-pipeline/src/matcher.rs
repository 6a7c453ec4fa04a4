// SPDX-FileCopyrightText: 2026 Sluice Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Message matcher expressions.
//!
//! Grammar:
//!
//! ```text
//! expr    := clause ( "&&" clause )*
//! clause  := "TRUE" | "FALSE" | field op quoted
//! field   := "Type" | "Logger" | "Hostname" | "Payload" | "Fields[" name "]"
//! op      := "==" | "!="
//! quoted  := "'" text "'" | '"' text '"'
//! ```

use std::fmt;

use sluice_core::{Message, SluiceError};

#[derive(Debug, Clone, PartialEq, Eq)]
enum MatchField {
    Type,
    Logger,
    Hostname,
    Payload,
    Field(String),
}

impl MatchField {
    fn parse(text: &str) -> Option<Self> {
        match text {
            "Type" => Some(Self::Type),
            "Logger" => Some(Self::Logger),
            "Hostname" => Some(Self::Hostname),
            "Payload" => Some(Self::Payload),
            _ => text
                .strip_prefix("Fields[")
                .and_then(|rest| rest.strip_suffix(']'))
                .filter(|name| !name.is_empty())
                .map(|name| Self::Field(name.to_string())),
        }
    }

    fn value<'a>(&self, message: &'a Message) -> Option<&'a str> {
        match self {
            Self::Type => Some(message.msg_type.as_str()),
            Self::Logger => Some(message.logger.as_str()),
            Self::Hostname => Some(message.hostname.as_str()),
            Self::Payload => Some(message.payload.as_str()),
            Self::Field(name) => message.field(name),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Clause {
    Const(bool),
    Compare {
        field: MatchField,
        negate: bool,
        value: String,
    },
}

impl Clause {
    fn matches(&self, message: &Message) -> bool {
        match self {
            Self::Const(value) => *value,
            Self::Compare {
                field,
                negate,
                value,
            } => (field.value(message) == Some(value.as_str())) != *negate,
        }
    }
}

/// A compiled matcher expression.
#[derive(Clone, PartialEq, Eq)]
pub struct MessageMatcher {
    expression: String,
    clauses: Vec<Clause>,
}

impl MessageMatcher {
    /// Compile `expression`, failing with `InvalidMatcher`.
    pub fn parse(expression: &str) -> Result<Self, SluiceError> {
        let invalid = |reason: &str| SluiceError::InvalidMatcher {
            expression: expression.to_string(),
            reason: reason.to_string(),
        };

        if expression.trim().is_empty() {
            return Err(invalid("expression is empty"));
        }

        let mut clauses = Vec::new();
        for part in expression.split("&&") {
            let part = part.trim();
            let clause = match part {
                "TRUE" => Clause::Const(true),
                "FALSE" => Clause::Const(false),
                "" => return Err(invalid("empty clause")),
                _ => parse_comparison(part).map_err(|reason| invalid(&reason))?,
            };
            clauses.push(clause);
        }

        Ok(Self {
            expression: expression.to_string(),
            clauses,
        })
    }

    /// The source expression.
    pub fn expression(&self) -> &str {
        &self.expression
    }

    /// Whether `message` satisfies every clause.
    pub fn matches(&self, message: &Message) -> bool {
        self.clauses.iter().all(|clause| clause.matches(message))
    }
}

impl fmt::Debug for MessageMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("MessageMatcher")
            .field(&self.expression)
            .finish()
    }
}

fn parse_comparison(part: &str) -> Result<Clause, String> {
    let (field, negate, value) = if let Some((field, value)) = part.split_once("!=") {
        (field, true, value)
    } else if let Some((field, value)) = part.split_once("==") {
        (field, false, value)
    } else {
        return Err(format!("expected '==' or '!=' in '{part}'"));
    };

    let field = field.trim();
    let field =
        MatchField::parse(field).ok_or_else(|| format!("unknown message field '{field}'"))?;
    let value = unquote(value.trim()).ok_or_else(|| format!("value in '{part}' must be quoted"))?;

    Ok(Clause::Compare {
        field,
        negate,
        value: value.to_string(),
    })
}

fn unquote(text: &str) -> Option<&str> {
    ['\'', '"'].into_iter().find_map(|quote| {
        text.strip_prefix(quote)
            .and_then(|rest| rest.strip_suffix(quote))
    })
}
