//! Lexing and structural validation of infix expressions.
//!
//! Everything that can be rejected without computing anything is rejected
//! here, so a malformed expression never publishes a task.

use crate::error::ExpressionError;
use crate::models::Operator;

/// Shortest accepted expression once whitespace is removed (`"1+2"`).
pub const MIN_EXPRESSION_LEN: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Token {
    Number(f64),
    Operator(Operator),
    LParen,
    RParen,
}

impl Token {
    pub fn is_operator(&self) -> bool {
        matches!(self, Self::Operator(_))
    }
}

/// Split `input` into tokens. Whitespace is ignored and literals are
/// `digits[.digits]`; there is no unary minus.
pub fn tokenize(input: &str) -> Result<Vec<Token>, ExpressionError> {
    let mut tokens = Vec::new();
    let mut literal = String::new();

    for c in input.chars() {
        if c.is_ascii_digit() || c == '.' {
            literal.push(c);
            continue;
        }
        flush_literal(&mut literal, &mut tokens)?;

        match c {
            c if c.is_whitespace() => {}
            '(' => tokens.push(Token::LParen),
            ')' => tokens.push(Token::RParen),
            c => match Operator::from_char(c) {
                Some(op) => tokens.push(Token::Operator(op)),
                None => return Err(ExpressionError::UnknownOperation(c)),
            },
        }
    }
    flush_literal(&mut literal, &mut tokens)?;

    Ok(tokens)
}

fn flush_literal(literal: &mut String, tokens: &mut Vec<Token>) -> Result<(), ExpressionError> {
    if literal.is_empty() {
        return Ok(());
    }
    // `f64::from_str` accepts "1." and ".5"; literals need digits on both sides.
    let malformed = || ExpressionError::invalid(format!("malformed number '{literal}'"));
    if literal.starts_with('.') || literal.ends_with('.') {
        return Err(malformed());
    }
    let value = literal.parse::<f64>().map_err(|_| malformed())?;
    tokens.push(Token::Number(value));
    literal.clear();
    Ok(())
}

/// Tokenize and validate a complete user expression.
///
/// Checks run in a fixed order so each malformed input maps to one error
/// kind: emptiness, length, characters, parenthesis balance, then operand and
/// operator placement.
pub fn parse(input: &str) -> Result<Vec<Token>, ExpressionError> {
    let significant = input.chars().filter(|c| !c.is_whitespace()).count();
    if significant == 0 {
        return Err(ExpressionError::EmptyExpression);
    }
    if significant < MIN_EXPRESSION_LEN {
        return Err(ExpressionError::invalid("expression is too short"));
    }

    let tokens = tokenize(input)?;
    check_balance(&tokens)?;
    check_structure(&tokens)?;

    if !tokens.iter().any(Token::is_operator) {
        return Err(ExpressionError::invalid("no operation to perform"));
    }

    Ok(tokens)
}

fn check_balance(tokens: &[Token]) -> Result<(), ExpressionError> {
    let mut depth: usize = 0;
    for token in tokens {
        match token {
            Token::LParen => depth += 1,
            Token::RParen => {
                depth = depth
                    .checked_sub(1)
                    .ok_or(ExpressionError::MismatchedParentheses)?;
            }
            _ => {}
        }
    }
    if depth != 0 {
        return Err(ExpressionError::MismatchedParentheses);
    }
    Ok(())
}

fn check_structure(tokens: &[Token]) -> Result<(), ExpressionError> {
    let mut expect_operand = true;
    let mut previous: Option<Token> = None;

    for (position, token) in tokens.iter().enumerate() {
        match token {
            Token::Number(_) => {
                if !expect_operand {
                    return Err(ExpressionError::invalid(format!(
                        "missing operator before operand at token {position}"
                    )));
                }
                expect_operand = false;
            }
            Token::LParen => {
                if !expect_operand {
                    return Err(ExpressionError::invalid(format!(
                        "missing operator before '(' at token {position}"
                    )));
                }
            }
            Token::RParen => {
                if expect_operand {
                    let reason = match previous {
                        Some(Token::LParen) => "empty parentheses".to_string(),
                        _ => format!("operator without right operand at token {position}"),
                    };
                    return Err(ExpressionError::invalid(reason));
                }
            }
            Token::Operator(op) => {
                if expect_operand {
                    let reason = match previous {
                        None => format!("leading operator '{op}'"),
                        Some(Token::Operator(prev)) => {
                            format!("consecutive operators '{prev}{op}'")
                        }
                        _ => format!("operator '{op}' without left operand"),
                    };
                    return Err(ExpressionError::invalid(reason));
                }
                expect_operand = true;
            }
        }
        previous = Some(*token);
    }

    if expect_operand {
        return Err(ExpressionError::invalid("trailing operator"));
    }
    Ok(())
}
