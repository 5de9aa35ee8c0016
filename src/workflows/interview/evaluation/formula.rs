//! Scoring formula mini-language: a typed AST compiled once at configuration
//! load and interpreted per evaluation.
//!
//! The grammar is intentionally non-Turing-complete so formulas stay auditable
//! as data:
//!
//! ```text
//! formula := term ( '*' number )?
//! term    := identifier
//!          | 'average' '(' identifier ( ',' identifier )* ')'
//!          | 'from_red_flags' '(' identifier ( ',' identifier )* ')'
//! ```

use std::collections::{BTreeMap, BTreeSet};

use super::super::domain::RedFlag;

/// `from_red_flags` contributions are capped in total, not per flag.
const RED_FLAG_SUM_CAP: f64 = 100.0;

/// Failure raised while parsing or evaluating a formula.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FormulaError {
    #[error("formula syntax error: {0}")]
    Syntax(String),
    #[error("unknown identifier '{0}'")]
    UnknownIdentifier(String),
}

/// Parsed scoring formula. Evaluation is pure: identical inputs always
/// produce identical outputs.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum FormulaAst {
    /// Look up a competency rating (1-5).
    Rating(String),
    /// Arithmetic mean of the named competency ratings.
    Average(Vec<String>),
    /// Sum of absolute impact magnitudes for listed flags with an active match.
    RedFlagSum(Vec<String>),
    /// Scalar multiply, e.g. projecting a 1-5 rating onto the 0-100 scale.
    Scaled { term: Box<FormulaAst>, factor: f64 },
}

/// Read-only lookup context for one formula evaluation.
pub(crate) struct ScoringContext<'a> {
    pub ratings: &'a BTreeMap<String, u8>,
    /// Codes of red flags with at least one active match.
    pub active_flags: &'a BTreeSet<String>,
    pub red_flags: &'a BTreeMap<String, RedFlag>,
    /// Score code the formula is computing; resolves red-flag contributions.
    pub target_score: &'a str,
}

impl FormulaAst {
    pub(crate) fn parse(input: &str) -> Result<Self, FormulaError> {
        let tokens = tokenize(input)?;
        let mut parser = Parser { tokens, position: 0 };
        let ast = parser.formula()?;
        parser.expect_end()?;
        Ok(ast)
    }

    /// Competency codes the formula reads from the rating context.
    pub(crate) fn competency_refs(&self) -> BTreeSet<&str> {
        match self {
            FormulaAst::Rating(code) => BTreeSet::from([code.as_str()]),
            FormulaAst::Average(codes) => codes.iter().map(String::as_str).collect(),
            FormulaAst::RedFlagSum(_) => BTreeSet::new(),
            FormulaAst::Scaled { term, .. } => term.competency_refs(),
        }
    }

    /// Red flag codes the formula aggregates over.
    pub(crate) fn red_flag_refs(&self) -> BTreeSet<&str> {
        match self {
            FormulaAst::RedFlagSum(codes) => codes.iter().map(String::as_str).collect(),
            FormulaAst::Scaled { term, .. } => term.red_flag_refs(),
            _ => BTreeSet::new(),
        }
    }

    pub(crate) fn references_red_flags(&self) -> bool {
        !self.red_flag_refs().is_empty()
    }

    pub(crate) fn evaluate(&self, context: &ScoringContext<'_>) -> Result<f64, FormulaError> {
        match self {
            FormulaAst::Rating(code) => rating(context, code),
            FormulaAst::Average(codes) => {
                let mut total = 0.0;
                for code in codes {
                    total += rating(context, code)?;
                }
                Ok(total / codes.len() as f64)
            }
            FormulaAst::RedFlagSum(codes) => {
                let mut total = 0.0;
                for code in codes {
                    let flag = context
                        .red_flags
                        .get(code)
                        .ok_or_else(|| FormulaError::UnknownIdentifier(code.clone()))?;
                    if !context.active_flags.contains(code) {
                        continue;
                    }
                    total += flag
                        .impacts
                        .iter()
                        .find(|impact| impact.target == context.target_score)
                        .map(|impact| impact.delta.abs() as f64)
                        .unwrap_or(0.0);
                }
                Ok(total.min(RED_FLAG_SUM_CAP))
            }
            FormulaAst::Scaled { term, factor } => Ok(term.evaluate(context)? * factor),
        }
    }
}

fn rating(context: &ScoringContext<'_>, code: &str) -> Result<f64, FormulaError> {
    context
        .ratings
        .get(code)
        .map(|value| *value as f64)
        .ok_or_else(|| FormulaError::UnknownIdentifier(code.to_string()))
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Identifier(String),
    Number(f64),
    Star,
    OpenParen,
    CloseParen,
    Comma,
}

fn tokenize(input: &str) -> Result<Vec<Token>, FormulaError> {
    let mut tokens = Vec::new();
    let mut chars = input.chars().peekable();

    while let Some(&ch) = chars.peek() {
        match ch {
            ' ' | '\t' => {
                chars.next();
            }
            '*' => {
                chars.next();
                tokens.push(Token::Star);
            }
            '(' => {
                chars.next();
                tokens.push(Token::OpenParen);
            }
            ')' => {
                chars.next();
                tokens.push(Token::CloseParen);
            }
            ',' => {
                chars.next();
                tokens.push(Token::Comma);
            }
            'a'..='z' | 'A'..='Z' | '_' => {
                let mut identifier = String::new();
                while let Some(&c) = chars.peek() {
                    if c.is_ascii_alphanumeric() || c == '_' {
                        identifier.push(c);
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push(Token::Identifier(identifier));
            }
            '0'..='9' => {
                let mut literal = String::new();
                while let Some(&c) = chars.peek() {
                    if c.is_ascii_digit() || c == '.' {
                        literal.push(c);
                        chars.next();
                    } else {
                        break;
                    }
                }
                let value = literal
                    .parse::<f64>()
                    .map_err(|_| FormulaError::Syntax(format!("invalid number '{literal}'")))?;
                tokens.push(Token::Number(value));
            }
            other => {
                return Err(FormulaError::Syntax(format!("unexpected character '{other}'")));
            }
        }
    }

    Ok(tokens)
}

struct Parser {
    tokens: Vec<Token>,
    position: usize,
}

impl Parser {
    fn formula(&mut self) -> Result<FormulaAst, FormulaError> {
        let term = self.term()?;

        if matches!(self.peek(), Some(Token::Star)) {
            self.position += 1;
            let factor = match self.next() {
                Some(Token::Number(value)) => value,
                _ => return Err(FormulaError::Syntax("expected number after '*'".to_string())),
            };
            return Ok(FormulaAst::Scaled {
                term: Box::new(term),
                factor,
            });
        }

        Ok(term)
    }

    fn term(&mut self) -> Result<FormulaAst, FormulaError> {
        let name = match self.next() {
            Some(Token::Identifier(name)) => name,
            _ => return Err(FormulaError::Syntax("expected identifier".to_string())),
        };

        if !matches!(self.peek(), Some(Token::OpenParen)) {
            return Ok(FormulaAst::Rating(name));
        }

        self.position += 1;
        let arguments = self.identifier_list()?;
        match name.as_str() {
            "average" => Ok(FormulaAst::Average(arguments)),
            "from_red_flags" => Ok(FormulaAst::RedFlagSum(arguments)),
            other => Err(FormulaError::Syntax(format!("unknown function '{other}'"))),
        }
    }

    fn identifier_list(&mut self) -> Result<Vec<String>, FormulaError> {
        let mut arguments = Vec::new();

        loop {
            match self.next() {
                Some(Token::Identifier(name)) => arguments.push(name),
                _ => return Err(FormulaError::Syntax("expected identifier argument".to_string())),
            }
            match self.next() {
                Some(Token::Comma) => continue,
                Some(Token::CloseParen) => break,
                _ => return Err(FormulaError::Syntax("expected ',' or ')'".to_string())),
            }
        }

        Ok(arguments)
    }

    fn expect_end(&self) -> Result<(), FormulaError> {
        if self.position == self.tokens.len() {
            Ok(())
        } else {
            Err(FormulaError::Syntax("trailing input after formula".to_string()))
        }
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.position)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.position).cloned();
        if token.is_some() {
            self.position += 1;
        }
        token
    }
}
