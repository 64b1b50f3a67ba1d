//! Context-free grammars with interned symbols and the weak Chomsky normal
//! form transform.
use std::fmt::{self, Debug, Display};

use ahash::{AHashMap, AHashSet};
use string_interner::backend::StringBackend;
use string_interner::symbol::SymbolU32;
use string_interner::StringInterner;

use crate::regex::RegexParseError;

pub(crate) type Interner = StringInterner<StringBackend<SymbolU32>>;

/// The error type for grammar text parsing, shared by the CFG and ECFG
/// formats.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GrammarParseError {
    /// A line did not have the `LHS -> BODY` shape.
    #[error("malformed production `{0}`: expected `LHS -> BODY`")]
    MalformedProduction(String),
    /// A production head was not a variable token.
    #[error("production head `{0}` is not a variable")]
    InvalidHead(String),
    /// An ECFG contained two rules for the same variable.
    #[error("more than one rule for variable `{0}`")]
    DuplicateRule(String),
    /// An ECFG rule body was not a valid regular expression.
    #[error("malformed rule body for `{0}`: {1}")]
    InvalidRuleBody(String, RegexParseError),
}

/// The wrapper struct that represents a variable id in a grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VariableId(pub SymbolU32);

/// The wrapper struct that represents a terminal id in a grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TerminalId(pub SymbolU32);

/// One symbol of a production body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CfgSymbol {
    /// A grammar variable.
    Variable(VariableId),
    /// A terminal symbol.
    Terminal(TerminalId),
}

/// A production `head -> body`. An empty body denotes ε.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Production {
    /// The head variable.
    pub head: VariableId,
    /// The body symbols, leftmost first.
    pub body: Vec<CfgSymbol>,
}

/// Check whether a token names a variable: variables start with an
/// upper-case letter, terminals do not.
pub fn is_variable_token(token: &str) -> bool {
    token.chars().next().is_some_and(char::is_uppercase)
}

/// A context-free grammar. Variables and terminals are interned; production
/// bodies reference them by id.
#[derive(Clone)]
pub struct Cfg {
    start: VariableId,
    variables: Interner,
    terminals: Interner,
    productions: AHashSet<Production>,
}

impl Cfg {
    /// Create a grammar with the given start variable and no productions.
    pub fn new(start: &str) -> Self {
        let mut variables = Interner::new();
        let start = VariableId(variables.get_or_intern(start));
        Self {
            start,
            variables,
            terminals: Interner::new(),
            productions: AHashSet::default(),
        }
    }

    /// Parse a grammar from text.
    ///
    /// One production per non-empty line, `LHS -> BODY`, with body tokens
    /// separated by whitespace. A token with a leading upper-case letter is
    /// a variable, anything else is a terminal; `$` denotes ε and `|`
    /// separates alternative bodies on one line.
    ///
    /// # Errors
    ///
    /// Returns a [GrammarParseError] on malformed lines.
    pub fn parse(text: &str, start: &str) -> Result<Cfg, GrammarParseError> {
        let mut cfg = Cfg::new(start);
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
            for alternative in body.split('|') {
                let tokens: Vec<&str> = alternative
                    .split_whitespace()
                    .filter(|token| *token != "$")
                    .collect();
                cfg.add_production(head, &tokens);
            }
        }
        Ok(cfg)
    }

    /// Add a production. Body tokens with a leading upper-case letter are
    /// variables, anything else is a terminal; an empty body denotes ε.
    ///
    /// # Panics
    ///
    /// Panics if `head` is not a variable token.
    pub fn add_production(&mut self, head: &str, body: &[&str]) {
        assert!(
            is_variable_token(head),
            "production head `{}` is not a variable",
            head
        );
        let head = VariableId(self.variables.get_or_intern(head));
        let body = body
            .iter()
            .map(|token| {
                if is_variable_token(token) {
                    CfgSymbol::Variable(VariableId(self.variables.get_or_intern(token)))
                } else {
                    CfgSymbol::Terminal(TerminalId(self.terminals.get_or_intern(token)))
                }
            })
            .collect();
        self.productions.insert(Production { head, body });
    }

    #[inline]
    /// Get the start variable id.
    pub fn start_variable(&self) -> VariableId {
        self.start
    }

    /// Look up a variable id by name.
    pub fn variable(&self, name: &str) -> Option<VariableId> {
        self.variables.get(name).map(VariableId)
    }

    /// Get the name of a variable.
    ///
    /// # Panics
    ///
    /// Panics if the id does not belong to this grammar.
    pub fn variable_name(&self, id: VariableId) -> &str {
        self.variables
            .resolve(id.0)
            .expect("variable id from a different grammar")
    }

    /// Get the name of a terminal.
    ///
    /// # Panics
    ///
    /// Panics if the id does not belong to this grammar.
    pub fn terminal_name(&self, id: TerminalId) -> &str {
        self.terminals
            .resolve(id.0)
            .expect("terminal id from a different grammar")
    }

    /// Iterate over the productions.
    pub fn productions(&self) -> impl Iterator<Item = &Production> {
        self.productions.iter()
    }

    /// Collect every variable mentioned by the grammar: the start variable
    /// plus all heads and all body variables. Variables that only occur in
    /// bodies are included, so engines can allocate their (empty) matrices.
    pub fn variables_in_use(&self) -> AHashSet<VariableId> {
        let mut variables: AHashSet<VariableId> = AHashSet::default();
        variables.insert(self.start);
        for production in &self.productions {
            variables.insert(production.head);
            for symbol in &production.body {
                if let CfgSymbol::Variable(id) = symbol {
                    variables.insert(*id);
                }
            }
        }
        variables
    }

    /// Check whether every production body has length 0, length 1 with a
    /// terminal, or length 2 with two variables.
    pub fn is_in_weak_cnf(&self) -> bool {
        self.productions.iter().all(|production| match production.body.as_slice() {
            [] => true,
            [CfgSymbol::Terminal(_)] => true,
            [CfgSymbol::Variable(_), CfgSymbol::Variable(_)] => true,
            _ => false,
        })
    }

    /// Compute the set of nullable variables: those deriving ε.
    pub fn nullable_variables(&self) -> AHashSet<VariableId> {
        let mut nullable: AHashSet<VariableId> = AHashSet::default();
        loop {
            let mut changed = false;
            for production in &self.productions {
                if nullable.contains(&production.head) {
                    continue;
                }
                let body_nullable = production.body.iter().all(|symbol| match symbol {
                    CfgSymbol::Variable(id) => nullable.contains(id),
                    CfgSymbol::Terminal(_) => false,
                });
                if body_nullable {
                    nullable.insert(production.head);
                    changed = true;
                }
            }
            if !changed {
                return nullable;
            }
        }
    }

    /// Convert the grammar to weak Chomsky normal form.
    ///
    /// The result generates the same language, ε included, and every body
    /// has length 0, length 1 with a terminal, or length 2 with two
    /// variables. Fresh variables are named `<head><counter>`, skipping
    /// names the grammar already uses.
    pub fn to_wcnf(&self) -> Cfg {
        if self.is_in_weak_cnf() {
            return self.clone();
        }
        let mut converter = WcnfConverter {
            cfg: self.clone(),
            counter: 0,
        };
        converter.split_long_bodies();
        converter.remove_useless_symbols();
        converter.eliminate_unit_productions();
        converter.remove_useless_symbols();
        converter.lift_terminals();
        converter.cfg
    }

    fn sorted_production_lines(&self) -> Vec<String> {
        let mut lines: Vec<String> = self
            .productions
            .iter()
            .map(|production| {
                let body = if production.body.is_empty() {
                    "$".to_owned()
                } else {
                    production
                        .body
                        .iter()
                        .map(|symbol| match symbol {
                            CfgSymbol::Variable(id) => self.variable_name(*id),
                            CfgSymbol::Terminal(id) => self.terminal_name(*id),
                        })
                        .collect::<Vec<_>>()
                        .join(" ")
                };
                format!("{} -> {}", self.variable_name(production.head), body)
            })
            .collect();
        lines.sort_unstable();
        lines
    }
}

impl Display for Cfg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for line in self.sorted_production_lines() {
            writeln!(f, "{}", line)?;
        }
        Ok(())
    }
}

impl Debug for Cfg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cfg")
            .field("start", &self.variable_name(self.start))
            .field("productions", &self.sorted_production_lines())
            .finish()
    }
}

struct WcnfConverter {
    cfg: Cfg,
    counter: usize,
}

impl WcnfConverter {
    fn fresh_variable(&mut self, base: VariableId) -> VariableId {
        let base_name = self.cfg.variable_name(base).to_owned();
        loop {
            let candidate = format!("{}{}", base_name, self.counter);
            self.counter += 1;
            if self.cfg.variables.get(&candidate).is_none() {
                return VariableId(self.cfg.variables.get_or_intern(candidate));
            }
        }
    }

    /// Replace every body longer than two symbols by a chain of binary
    /// productions through fresh variables.
    fn split_long_bodies(&mut self) {
        let productions = std::mem::take(&mut self.cfg.productions);
        let mut result = AHashSet::default();
        for production in productions {
            if production.body.len() <= 2 {
                result.insert(production);
                continue;
            }
            let last = production.body.len() - 2;
            let mut head = production.head;
            for index in 0..last {
                let fresh = self.fresh_variable(production.head);
                result.insert(Production {
                    head,
                    body: vec![production.body[index], CfgSymbol::Variable(fresh)],
                });
                head = fresh;
            }
            result.insert(Production {
                head,
                body: vec![production.body[last], production.body[last + 1]],
            });
        }
        self.cfg.productions = result;
    }

    /// Drop productions mentioning non-generating variables, then
    /// productions unreachable from the start variable.
    fn remove_useless_symbols(&mut self) {
        let mut generating: AHashSet<VariableId> = AHashSet::default();
        loop {
            let mut changed = false;
            for production in &self.cfg.productions {
                if generating.contains(&production.head) {
                    continue;
                }
                let body_generating = production.body.iter().all(|symbol| match symbol {
                    CfgSymbol::Variable(id) => generating.contains(id),
                    CfgSymbol::Terminal(_) => true,
                });
                if body_generating {
                    generating.insert(production.head);
                    changed = true;
                }
            }
            if !changed {
                break;
            }
        }
        self.cfg.productions.retain(|production| {
            generating.contains(&production.head)
                && production.body.iter().all(|symbol| match symbol {
                    CfgSymbol::Variable(id) => generating.contains(id),
                    CfgSymbol::Terminal(_) => true,
                })
        });

        let mut reachable: AHashSet<VariableId> = AHashSet::default();
        reachable.insert(self.cfg.start);
        loop {
            let mut changed = false;
            for production in &self.cfg.productions {
                if !reachable.contains(&production.head) {
                    continue;
                }
                for symbol in &production.body {
                    if let CfgSymbol::Variable(id) = symbol {
                        if reachable.insert(*id) {
                            changed = true;
                        }
                    }
                }
            }
            if !changed {
                break;
            }
        }
        self.cfg
            .productions
            .retain(|production| reachable.contains(&production.head));
    }

    /// Remove unit (chain) productions `A -> B`, inlining the non-unit
    /// bodies of every variable reachable through chains.
    fn eliminate_unit_productions(&mut self) {
        fn unit_target(production: &Production) -> Option<VariableId> {
            match production.body.as_slice() {
                [CfgSymbol::Variable(id)] => Some(*id),
                _ => None,
            }
        }

        let mut chain: AHashMap<VariableId, Vec<VariableId>> = AHashMap::default();
        for production in &self.cfg.productions {
            if let Some(target) = unit_target(production) {
                chain.entry(production.head).or_default().push(target);
            }
        }
        let variables = self.cfg.variables_in_use();
        let mut result = AHashSet::default();
        for &variable in &variables {
            // Chain closure from this variable, itself included.
            let mut reached: AHashSet<VariableId> = AHashSet::default();
            let mut stack = vec![variable];
            reached.insert(variable);
            while let Some(current) = stack.pop() {
                if let Some(targets) = chain.get(&current) {
                    for &target in targets {
                        if reached.insert(target) {
                            stack.push(target);
                        }
                    }
                }
            }
            for production in &self.cfg.productions {
                if reached.contains(&production.head) && unit_target(production).is_none() {
                    result.insert(Production {
                        head: variable,
                        body: production.body.clone(),
                    });
                }
            }
        }
        self.cfg.productions = result;
    }

    /// Replace terminals inside binary bodies by fresh variables whose sole
    /// production is that terminal.
    fn lift_terminals(&mut self) {
        let productions = std::mem::take(&mut self.cfg.productions);
        let mut result = AHashSet::default();
        for production in productions {
            match production.body.as_slice() {
                [CfgSymbol::Terminal(first), CfgSymbol::Terminal(second)] => {
                    let (first, second) = (*first, *second);
                    let left = self.fresh_variable(production.head);
                    let right = self.fresh_variable(production.head);
                    result.insert(Production {
                        head: production.head,
                        body: vec![CfgSymbol::Variable(left), CfgSymbol::Variable(right)],
                    });
                    result.insert(Production {
                        head: left,
                        body: vec![CfgSymbol::Terminal(first)],
                    });
                    result.insert(Production {
                        head: right,
                        body: vec![CfgSymbol::Terminal(second)],
                    });
                }
                [CfgSymbol::Variable(first), CfgSymbol::Terminal(second)] => {
                    let (first, second) = (*first, *second);
                    let fresh = self.fresh_variable(production.head);
                    result.insert(Production {
                        head: production.head,
                        body: vec![CfgSymbol::Variable(first), CfgSymbol::Variable(fresh)],
                    });
                    result.insert(Production {
                        head: fresh,
                        body: vec![CfgSymbol::Terminal(second)],
                    });
                }
                [CfgSymbol::Terminal(first), CfgSymbol::Variable(second)] => {
                    let (first, second) = (*first, *second);
                    let fresh = self.fresh_variable(production.head);
                    result.insert(Production {
                        head: production.head,
                        body: vec![CfgSymbol::Variable(fresh), CfgSymbol::Variable(second)],
                    });
                    result.insert(Production {
                        head: fresh,
                        body: vec![CfgSymbol::Terminal(first)],
                    });
                }
                _ => {
                    result.insert(production);
                }
            }
        }
        self.cfg.productions = result;
    }
}
