//! Regular expressions over symbolic alphabets: parsing, Thompson
//! construction and compilation down to a minimal DFA.
use std::fmt::{self, Display};

use nom::branch::alt;
use nom::bytes::complete::take_while1;
use nom::character::complete::{char, multispace0, one_of};
use nom::combinator::{all_consuming, map, opt};
use nom::multi::{many0, separated_list1};
use nom::sequence::{delimited, pair, preceded};
use nom::{Finish, IResult};

use crate::fsa::{Dfa, Nfa};

/// The error type for regular expression parsing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegexParseError {
    /// The input contained no expression at all.
    #[error("empty regular expression")]
    Empty,
    /// The input could not be parsed.
    #[error("malformed regular expression near `{0}`")]
    Syntax(String),
}

/// A regular expression whose atoms are whole alphabet symbols, not
/// characters. `a b | c*` denotes the union of the two-symbol word `a b`
/// and any repetition of `c`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Regex {
    /// The empty word.
    Epsilon,
    /// A single alphabet symbol.
    Symbol(String),
    /// A sequence of expressions.
    Concat(Vec<Regex>),
    /// A choice between expressions.
    Union(Vec<Regex>),
    /// Zero or more repetitions.
    Star(Box<Regex>),
    /// One or more repetitions.
    Plus(Box<Regex>),
    /// Zero or one occurrence.
    Optional(Box<Regex>),
}

fn symbol(input: &str) -> IResult<&str, Regex> {
    map(
        take_while1(|c: char| c.is_alphanumeric() || c == '_'),
        |s: &str| Regex::Symbol(s.to_owned()),
    )(input)
}

fn primary(input: &str) -> IResult<&str, Regex> {
    alt((
        map(char('$'), |_| Regex::Epsilon),
        delimited(
            pair(char('('), multispace0),
            union,
            pair(multispace0, char(')')),
        ),
        symbol,
    ))(input)
}

fn term(input: &str) -> IResult<&str, Regex> {
    let (input, base) = primary(input)?;
    let (input, operators) = many0(one_of("*+?"))(input)?;
    let regex = operators.into_iter().fold(base, |inner, op| match op {
        '*' => Regex::Star(Box::new(inner)),
        '+' => Regex::Plus(Box::new(inner)),
        _ => Regex::Optional(Box::new(inner)),
    });
    Ok((input, regex))
}

fn concat(input: &str) -> IResult<&str, Regex> {
    let (input, first) = term(input)?;
    let (input, mut rest) = many0(preceded(
        delimited(multispace0, opt(char('.')), multispace0),
        term,
    ))(input)?;
    if rest.is_empty() {
        Ok((input, first))
    } else {
        rest.insert(0, first);
        Ok((input, Regex::Concat(rest)))
    }
}

fn union(input: &str) -> IResult<&str, Regex> {
    map(
        separated_list1(delimited(multispace0, char('|'), multispace0), concat),
        |mut alternatives| {
            if alternatives.len() == 1 {
                alternatives.pop().unwrap()
            } else {
                Regex::Union(alternatives)
            }
        },
    )(input)
}

impl Regex {
    /// Parse a regular expression.
    ///
    /// Atoms are runs of alphanumeric characters and underscores; `|` is
    /// union, juxtaposition (optionally written `.`) is concatenation,
    /// postfix `*`, `+` and `?` are repetition operators and `$` is the
    /// empty word.
    ///
    /// # Errors
    ///
    /// Returns a [RegexParseError] if the input is empty or malformed.
    pub fn parse(input: &str) -> Result<Regex, RegexParseError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(RegexParseError::Empty);
        }
        match all_consuming(union)(trimmed).finish() {
            Ok((_, regex)) => Ok(regex),
            Err(error) => Err(RegexParseError::Syntax(
                error.input.chars().take(32).collect(),
            )),
        }
    }

    /// Compile the expression into an ε-NFA by Thompson construction.
    pub fn to_nfa(&self) -> Nfa {
        let mut nfa = Nfa::with_states(0);
        let (start, end) = self.build(&mut nfa);
        nfa.add_start_state(start);
        nfa.add_final_state(end);
        nfa
    }

    /// Compile the expression into the canonical minimal DFA.
    pub fn to_minimal_dfa(&self) -> Dfa {
        Dfa::from_nfa(&self.to_nfa()).minimize()
    }

    fn build(&self, nfa: &mut Nfa) -> (usize, usize) {
        match self {
            Regex::Epsilon => {
                let start = nfa.add_state();
                let end = nfa.add_state();
                nfa.add_transition(start, None, end);
                (start, end)
            }
            Regex::Symbol(symbol) => {
                let start = nfa.add_state();
                let end = nfa.add_state();
                nfa.add_transition(start, Some(symbol.as_str()), end);
                (start, end)
            }
            Regex::Concat(parts) => {
                let mut bounds: Option<(usize, usize)> = None;
                for part in parts {
                    let (part_start, part_end) = part.build(nfa);
                    bounds = Some(match bounds {
                        None => (part_start, part_end),
                        Some((start, previous_end)) => {
                            nfa.add_transition(previous_end, None, part_start);
                            (start, part_end)
                        }
                    });
                }
                bounds.unwrap_or_else(|| Regex::Epsilon.build(nfa))
            }
            Regex::Union(parts) => {
                let start = nfa.add_state();
                let end = nfa.add_state();
                for part in parts {
                    let (part_start, part_end) = part.build(nfa);
                    nfa.add_transition(start, None, part_start);
                    nfa.add_transition(part_end, None, end);
                }
                (start, end)
            }
            Regex::Star(inner) => {
                let start = nfa.add_state();
                let end = nfa.add_state();
                let (inner_start, inner_end) = inner.build(nfa);
                nfa.add_transition(start, None, end);
                nfa.add_transition(start, None, inner_start);
                nfa.add_transition(inner_end, None, end);
                nfa.add_transition(inner_end, None, inner_start);
                (start, end)
            }
            Regex::Plus(inner) => {
                let (inner_start, inner_end) = inner.build(nfa);
                nfa.add_transition(inner_end, None, inner_start);
                (inner_start, inner_end)
            }
            Regex::Optional(inner) => {
                let start = nfa.add_state();
                let end = nfa.add_state();
                let (inner_start, inner_end) = inner.build(nfa);
                nfa.add_transition(start, None, end);
                nfa.add_transition(start, None, inner_start);
                nfa.add_transition(inner_end, None, end);
                (start, end)
            }
        }
    }

    fn precedence(&self) -> u8 {
        match self {
            Regex::Union(_) => 0,
            Regex::Concat(_) => 1,
            Regex::Star(_) | Regex::Plus(_) | Regex::Optional(_) => 2,
            Regex::Epsilon | Regex::Symbol(_) => 3,
        }
    }

    fn fmt_child(&self, child: &Regex, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if child.precedence() < self.precedence() {
            write!(f, "({})", child)
        } else {
            write!(f, "{}", child)
        }
    }
}

impl Display for Regex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Regex::Epsilon => write!(f, "$"),
            Regex::Symbol(symbol) => write!(f, "{}", symbol),
            Regex::Concat(parts) => {
                for (index, part) in parts.iter().enumerate() {
                    if index > 0 {
                        write!(f, " ")?;
                    }
                    self.fmt_child(part, f)?;
                }
                Ok(())
            }
            Regex::Union(parts) => {
                for (index, part) in parts.iter().enumerate() {
                    if index > 0 {
                        write!(f, " | ")?;
                    }
                    self.fmt_child(part, f)?;
                }
                Ok(())
            }
            Regex::Star(inner) => {
                self.fmt_child(inner, f)?;
                write!(f, "*")
            }
            Regex::Plus(inner) => {
                self.fmt_child(inner, f)?;
                write!(f, "+")
            }
            Regex::Optional(inner) => {
                self.fmt_child(inner, f)?;
                write!(f, "?")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_with_operator_precedence() {
        let regex = Regex::parse("a b | c*").unwrap();
        assert_eq!(
            regex,
            Regex::Union(vec![
                Regex::Concat(vec![
                    Regex::Symbol("a".to_owned()),
                    Regex::Symbol("b".to_owned()),
                ]),
                Regex::Star(Box::new(Regex::Symbol("c".to_owned()))),
            ])
        );
    }

    #[test]
    fn explicit_dot_concatenation() {
        assert_eq!(Regex::parse("a.b.c").unwrap(), Regex::parse("a b c").unwrap());
    }

    #[test]
    fn rejects_malformed_input() {
        assert_eq!(Regex::parse(""), Err(RegexParseError::Empty));
        assert!(matches!(
            Regex::parse("a |"),
            Err(RegexParseError::Syntax(_))
        ));
        assert!(matches!(
            Regex::parse("(a"),
            Err(RegexParseError::Syntax(_))
        ));
    }

    #[test]
    fn minimal_dfa_language() {
        let dfa = Regex::parse("a b (c | d)*").unwrap().to_minimal_dfa();
        assert!(dfa.accepts(&["a", "b"]));
        assert!(dfa.accepts(&["a", "b", "c", "d", "c"]));
        assert!(!dfa.accepts(&["a"]));
        assert!(!dfa.accepts(&["a", "b", "a"]));
    }

    #[test]
    fn epsilon_and_optional() {
        let dfa = Regex::parse("a? $").unwrap().to_minimal_dfa();
        assert!(dfa.accepts(&[]));
        assert!(dfa.accepts(&["a"]));
        assert!(!dfa.accepts(&["a", "a"]));
    }

    #[test]
    fn display_round_trip() {
        for source in ["a b | c*", "(a | b) c", "a+ b?"] {
            let regex = Regex::parse(source).unwrap();
            let reparsed = Regex::parse(&regex.to_string()).unwrap();
            assert_eq!(regex, reparsed, "{}", source);
        }
    }
}
