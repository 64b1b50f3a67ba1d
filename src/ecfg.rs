//! Extended context-free grammars: one regular-expression right-hand side
//! per variable.
use ahash::AHashMap;

use crate::cfg::{is_variable_token, Cfg, CfgSymbol, GrammarParseError};
use crate::regex::Regex;

/// An extended CFG. Every variable has exactly one production whose body is
/// a regular expression over variable and terminal tokens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ecfg {
    start: String,
    productions: AHashMap<String, Regex>,
}

impl Ecfg {
    /// Build the extended form of a CFG: all bodies of one head are unioned
    /// into a single regular expression, with ε for empty bodies.
    pub fn from_cfg(cfg: &Cfg) -> Ecfg {
        let mut bodies: AHashMap<String, Vec<Vec<String>>> = AHashMap::default();
        for production in cfg.productions() {
            let tokens = production
                .body
                .iter()
                .map(|symbol| match symbol {
                    CfgSymbol::Variable(id) => cfg.variable_name(*id).to_owned(),
                    CfgSymbol::Terminal(id) => cfg.terminal_name(*id).to_owned(),
                })
                .collect();
            bodies
                .entry(cfg.variable_name(production.head).to_owned())
                .or_default()
                .push(tokens);
        }
        let mut productions = AHashMap::default();
        for (head, mut alternatives) in bodies {
            alternatives.sort_unstable();
            let mut regexes: Vec<Regex> = alternatives
                .into_iter()
                .map(|tokens| match tokens.len() {
                    0 => Regex::Epsilon,
                    1 => Regex::Symbol(tokens.into_iter().next().unwrap()),
                    _ => Regex::Concat(tokens.into_iter().map(Regex::Symbol).collect()),
                })
                .collect();
            let regex = if regexes.len() == 1 {
                regexes.pop().unwrap()
            } else {
                Regex::Union(regexes)
            };
            productions.insert(head, regex);
        }
        Ecfg {
            start: cfg.variable_name(cfg.start_variable()).to_owned(),
            productions,
        }
    }

    /// Parse an extended CFG from text: one `LHS -> regex-body` rule per
    /// non-empty line.
    ///
    /// # Errors
    ///
    /// Returns a [GrammarParseError] on malformed lines, duplicate rules
    /// for one variable, or malformed rule bodies.
    pub fn parse(text: &str, start: &str) -> Result<Ecfg, GrammarParseError> {
        let mut productions: AHashMap<String, Regex> = AHashMap::default();
        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let (head, body) = line
                .split_once("->")
                .ok_or_else(|| GrammarParseError::MalformedProduction(line.to_owned()))?;
            let head = head.trim();
            if !is_variable_token(head) {
                return Err(GrammarParseError::InvalidHead(head.to_owned()));
            }
            if productions.contains_key(head) {
                return Err(GrammarParseError::DuplicateRule(head.to_owned()));
            }
            let regex = Regex::parse(body)
                .map_err(|error| GrammarParseError::InvalidRuleBody(head.to_owned(), error))?;
            productions.insert(head.to_owned(), regex);
        }
        Ok(Ecfg {
            start: start.to_owned(),
            productions,
        })
    }

    #[inline]
    /// Get the start variable name.
    pub fn start_variable(&self) -> &str {
        &self.start
    }

    /// Get the productions, keyed by variable name.
    pub fn productions(&self) -> &AHashMap<String, Regex> {
        &self.productions
    }
}
