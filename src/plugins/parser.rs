use crate::state::Settings;

/// What a parser factory gets to build its parser with.
#[derive(Clone, Debug)]
pub struct ParserContext {
    pub index: String,
    pub settings: Settings,
}

impl ParserContext {
    pub fn new(index: impl Into<String>, settings: Settings) -> Self {
        ParserContext {
            index: index.into(),
            settings,
        }
    }
}

/// A query or filter body after parsing, tagged with the parser that produced it.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ParsedQuery {
    pub parser: String,
    pub body: String,
}

#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
pub enum ParseError {
    #[error("[{parser}] malformed body: {reason}")]
    Malformed { parser: String, reason: String },
}

pub trait QueryParser: Send + Sync {
    /// Names this parser answers to. The first one is its canonical name.
    fn names(&self) -> Vec<String>;
    fn parse(&self, body: &str) -> Result<ParsedQuery, ParseError>;
}

pub trait FilterParser: Send + Sync {
    fn names(&self) -> Vec<String>;
    fn parse(&self, body: &str) -> Result<ParsedQuery, ParseError>;
}

pub(super) const MATCH_ALL: &str = "match_all";

/// Matches every document. Takes an empty body or `{}`.
pub(super) struct MatchAllParser;

impl MatchAllParser {
    fn parse_body(body: &str) -> Result<ParsedQuery, ParseError> {
        let trimmed = body.trim();
        if trimmed.is_empty() || trimmed.replace(char::is_whitespace, "") == "{}" {
            Ok(ParsedQuery {
                parser: MATCH_ALL.to_string(),
                body: "{}".to_string(),
            })
        } else {
            Err(ParseError::Malformed {
                parser: MATCH_ALL.to_string(),
                reason: format!("{} takes no parameters, got {:?}", MATCH_ALL, trimmed),
            })
        }
    }
}

impl QueryParser for MatchAllParser {
    fn names(&self) -> Vec<String> {
        vec![MATCH_ALL.to_string(), "matchAll".to_string()]
    }

    fn parse(&self, body: &str) -> Result<ParsedQuery, ParseError> {
        Self::parse_body(body)
    }
}

impl FilterParser for MatchAllParser {
    fn names(&self) -> Vec<String> {
        vec![MATCH_ALL.to_string(), "matchAll".to_string()]
    }

    fn parse(&self, body: &str) -> Result<ParsedQuery, ParseError> {
        Self::parse_body(body)
    }
}
