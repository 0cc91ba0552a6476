//! Parser: builds an expression tree from tokens
//!
//! Binary operators are parsed by precedence climbing. From lowest to
//! highest: ternary, `or`, `and`, comparisons, `+ -`, `~`, `* / %`, unary
//! operators, then member access, calls and indexing.

use super::lexer::{tokenize, Token, TokenKind};
use crate::domain::{ExpressionError, Value};

/// Expression tree node
#[derive(Debug, Clone)]
pub enum Node {
    Literal(Value),
    List(Vec<Node>),
    Variable(String),
    Property {
        target: Box<Node>,
        name: String,
    },
    MethodCall {
        target: Box<Node>,
        name: String,
        args: Vec<Node>,
    },
    Function {
        name: String,
        args: Vec<Node>,
    },
    Index {
        target: Box<Node>,
        index: Box<Node>,
    },
    Unary {
        op: &'static str,
        operand: Box<Node>,
    },
    Binary {
        op: &'static str,
        left: Box<Node>,
        right: Box<Node>,
    },
    Conditional {
        condition: Box<Node>,
        then: Box<Node>,
        otherwise: Box<Node>,
    },
}

const UNARY_NOT_PRECEDENCE: u8 = 50;

fn binary_precedence(op: &str) -> Option<u8> {
    match op {
        "or" | "||" => Some(10),
        "and" | "&&" => Some(15),
        "==" | "!=" | "===" | "!==" | "<" | ">" | "<=" | ">=" => Some(20),
        "+" | "-" => Some(30),
        "~" => Some(40),
        "*" | "/" | "%" => Some(60),
        _ => None,
    }
}

/// Parse expression source into a tree
pub fn parse(input: &str) -> Result<Node, ExpressionError> {
    let tokens = tokenize(input)?;
    let mut parser = Parser::new(tokens);
    let node = parser.parse_conditional()?;
    parser.expect_eof()?;
    Ok(node)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, pos: 0 }
    }

    fn peek(&self) -> &TokenKind {
        self.tokens
            .get(self.pos)
            .map(|t| &t.kind)
            .unwrap_or(&TokenKind::Eof)
    }

    fn advance(&mut self) -> Token {
        let token = self.tokens.get(self.pos).cloned().unwrap_or(Token {
            kind: TokenKind::Eof,
            position: self.tokens.last().map(|t| t.position).unwrap_or_default(),
        });
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
        token
    }

    fn unexpected(&self) -> ExpressionError {
        match self.tokens.get(self.pos) {
            Some(Token {
                kind: TokenKind::Eof,
                ..
            })
            | None => ExpressionError::UnexpectedEof,
            Some(token) => ExpressionError::UnexpectedToken {
                token: token.kind.to_string(),
                position: token.position,
            },
        }
    }

    fn expect_punct(&mut self, punct: char) -> Result<(), ExpressionError> {
        if *self.peek() == TokenKind::Punct(punct) {
            self.pos += 1;
            Ok(())
        } else {
            Err(self.unexpected())
        }
    }

    fn expect_eof(&self) -> Result<(), ExpressionError> {
        match self.peek() {
            TokenKind::Eof => Ok(()),
            _ => Err(self.unexpected()),
        }
    }

    fn parse_conditional(&mut self) -> Result<Node, ExpressionError> {
        let condition = self.parse_binary(0)?;
        if *self.peek() != TokenKind::Punct('?') {
            return Ok(condition);
        }
        self.pos += 1;
        let then = self.parse_conditional()?;
        self.expect_punct(':')?;
        let otherwise = self.parse_conditional()?;

        Ok(Node::Conditional {
            condition: Box::new(condition),
            then: Box::new(then),
            otherwise: Box::new(otherwise),
        })
    }

    fn parse_binary(&mut self, min_precedence: u8) -> Result<Node, ExpressionError> {
        let mut left = self.parse_unary()?;

        loop {
            let op = match self.peek() {
                TokenKind::Operator(op) => *op,
                _ => break,
            };
            let precedence = match binary_precedence(op) {
                Some(p) if p >= min_precedence => p,
                _ => break,
            };
            self.pos += 1;
            let right = self.parse_binary(precedence + 1)?;
            left = Node::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }

        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Node, ExpressionError> {
        match self.peek() {
            TokenKind::Operator(op @ ("!" | "not")) => {
                let op = *op;
                self.pos += 1;
                let operand = self.parse_binary(UNARY_NOT_PRECEDENCE)?;
                Ok(Node::Unary {
                    op,
                    operand: Box::new(operand),
                })
            }
            TokenKind::Operator(op @ ("-" | "+")) => {
                let op = *op;
                self.pos += 1;
                let operand = self.parse_unary()?;
                Ok(Node::Unary {
                    op,
                    operand: Box::new(operand),
                })
            }
            _ => self.parse_postfix(),
        }
    }

    fn parse_postfix(&mut self) -> Result<Node, ExpressionError> {
        let mut node = self.parse_primary()?;

        loop {
            match self.peek() {
                TokenKind::Punct('.') => {
                    self.pos += 1;
                    let name = match self.advance().kind {
                        TokenKind::Name(name) => name,
                        _ => {
                            self.pos -= 1;
                            return Err(self.unexpected());
                        }
                    };
                    if *self.peek() == TokenKind::Punct('(') {
                        let args = self.parse_arguments()?;
                        node = Node::MethodCall {
                            target: Box::new(node),
                            name,
                            args,
                        };
                    } else {
                        node = Node::Property {
                            target: Box::new(node),
                            name,
                        };
                    }
                }
                TokenKind::Punct('[') => {
                    self.pos += 1;
                    let index = self.parse_conditional()?;
                    self.expect_punct(']')?;
                    node = Node::Index {
                        target: Box::new(node),
                        index: Box::new(index),
                    };
                }
                _ => break,
            }
        }

        Ok(node)
    }

    fn parse_primary(&mut self) -> Result<Node, ExpressionError> {
        let token = self.advance();
        match token.kind {
            TokenKind::Integer(i) => Ok(Node::Literal(Value::Int(i))),
            TokenKind::Float(f) => Ok(Node::Literal(Value::Float(f))),
            TokenKind::Str(s) => Ok(Node::Literal(Value::String(s))),
            TokenKind::Name(name) => match name.as_str() {
                "true" | "TRUE" => Ok(Node::Literal(Value::Bool(true))),
                "false" | "FALSE" => Ok(Node::Literal(Value::Bool(false))),
                "null" | "NULL" => Ok(Node::Literal(Value::Null)),
                _ if *self.peek() == TokenKind::Punct('(') => {
                    let args = self.parse_arguments()?;
                    Ok(Node::Function { name, args })
                }
                _ => Ok(Node::Variable(name)),
            },
            TokenKind::Punct('(') => {
                let inner = self.parse_conditional()?;
                self.expect_punct(')')?;
                Ok(inner)
            }
            TokenKind::Punct('[') => {
                let items = self.parse_sequence(']')?;
                Ok(Node::List(items))
            }
            _ => {
                self.pos -= 1;
                Err(self.unexpected())
            }
        }
    }

    fn parse_arguments(&mut self) -> Result<Vec<Node>, ExpressionError> {
        self.expect_punct('(')?;
        self.parse_sequence(')')
    }

    /// Comma-separated expressions up to and including `close`
    fn parse_sequence(&mut self, close: char) -> Result<Vec<Node>, ExpressionError> {
        let mut items = Vec::new();
        if *self.peek() == TokenKind::Punct(close) {
            self.pos += 1;
            return Ok(items);
        }

        loop {
            items.push(self.parse_conditional()?);
            match self.peek() {
                TokenKind::Punct(',') => self.pos += 1,
                TokenKind::Punct(c) if *c == close => {
                    self.pos += 1;
                    return Ok(items);
                }
                _ => return Err(self.unexpected()),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_call() {
        let node = parse("object.getId()").unwrap();
        match node {
            Node::MethodCall { target, name, args } => {
                assert!(matches!(*target, Node::Variable(ref v) if v == "object"));
                assert_eq!(name, "getId");
                assert!(args.is_empty());
            }
            other => panic!("Expected method call, got {other:?}"),
        }
    }

    #[test]
    fn test_precedence() {
        // 1 + 2 * 3 parses as 1 + (2 * 3)
        match parse("1 + 2 * 3").unwrap() {
            Node::Binary { op, right, .. } => {
                assert_eq!(op, "+");
                assert!(matches!(*right, Node::Binary { op: "*", .. }));
            }
            other => panic!("Expected binary, got {other:?}"),
        }
    }

    #[test]
    fn test_left_associativity() {
        // 10 - 4 - 3 parses as (10 - 4) - 3
        match parse("10 - 4 - 3").unwrap() {
            Node::Binary { op, left, .. } => {
                assert_eq!(op, "-");
                assert!(matches!(*left, Node::Binary { op: "-", .. }));
            }
            other => panic!("Expected binary, got {other:?}"),
        }
    }

    #[test]
    fn test_conditional_and_list() {
        assert!(matches!(
            parse("a ? [1, 2] : []").unwrap(),
            Node::Conditional { .. }
        ));
    }

    #[test]
    fn test_trailing_tokens_rejected() {
        let err = parse("1 2").unwrap_err();
        assert!(matches!(err, ExpressionError::UnexpectedToken { position: 2, .. }));
    }

    #[test]
    fn test_incomplete_input() {
        assert_eq!(parse("object.").unwrap_err(), ExpressionError::UnexpectedEof);
        assert_eq!(parse("(1 + 2").unwrap_err(), ExpressionError::UnexpectedEof);
        assert_eq!(parse("").unwrap_err(), ExpressionError::UnexpectedEof);
    }
}
