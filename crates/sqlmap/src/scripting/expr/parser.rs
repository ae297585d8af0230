use super::lexer::{Token, tokenize};
use crate::error::{MapperError, MapperResult};
use crate::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BinaryOp {
    Or,
    And,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Add,
    Sub,
    Mul,
    Div,
    Rem,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum UnaryOp {
    Not,
    Neg,
}

/// Parsed expression tree.
#[derive(Debug, Clone)]
pub(crate) enum Expr {
    Literal(Value),
    Ident(String),
    Property(Box<Expr>, String),
    Index(Box<Expr>, Box<Expr>),
    Call(Box<Expr>, String, Vec<Expr>),
    Unary(UnaryOp, Box<Expr>),
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
}

pub(crate) fn parse(input: &str) -> MapperResult<Expr> {
    let tokens = tokenize(input)?;
    if tokens.is_empty() {
        return Err(MapperError::configuration("empty expression"));
    }
    let mut parser = Parser { tokens, pos: 0 };
    let expr = parser.or()?;
    match parser.peek() {
        None => Ok(expr),
        Some(token) => Err(MapperError::configuration(format!(
            "unexpected {} after end of expression",
            describe(token)
        ))),
    }
}

fn describe(token: &Token) -> String {
    match token {
        Token::Ident(name) => format!("'{name}'"),
        Token::Int(i) => format!("'{i}'"),
        Token::Float(f) => format!("'{f}'"),
        Token::Str(s) => format!("string '{s}'"),
        Token::Symbol(s) => format!("'{s}'"),
    }
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token
    }

    fn eat_symbol(&mut self, symbol: &str) -> bool {
        if matches!(self.peek(), Some(Token::Symbol(s)) if *s == symbol) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn eat_word(&mut self, word: &str) -> bool {
        if matches!(self.peek(), Some(Token::Ident(w)) if w == word) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect_symbol(&mut self, symbol: &str) -> MapperResult<()> {
        if self.eat_symbol(symbol) {
            return Ok(());
        }
        Err(MapperError::configuration(match self.peek() {
            Some(token) => format!("expected '{symbol}' but found {}", describe(token)),
            None => format!("expected '{symbol}' but the expression ended"),
        }))
    }

    fn or(&mut self) -> MapperResult<Expr> {
        let mut left = self.and()?;
        while self.eat_symbol("||") || self.eat_word("or") {
            let right = self.and()?;
            left = Expr::Binary(BinaryOp::Or, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn and(&mut self) -> MapperResult<Expr> {
        let mut left = self.equality()?;
        while self.eat_symbol("&&") || self.eat_word("and") {
            let right = self.equality()?;
            left = Expr::Binary(BinaryOp::And, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn equality(&mut self) -> MapperResult<Expr> {
        let mut left = self.relational()?;
        loop {
            let op = if self.eat_symbol("==") || self.eat_word("eq") {
                BinaryOp::Eq
            } else if self.eat_symbol("!=") || self.eat_word("neq") {
                BinaryOp::Ne
            } else {
                return Ok(left);
            };
            let right = self.relational()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
    }

    fn relational(&mut self) -> MapperResult<Expr> {
        let mut left = self.additive()?;
        loop {
            let op = if self.eat_symbol("<=") || self.eat_word("lte") {
                BinaryOp::Le
            } else if self.eat_symbol(">=") || self.eat_word("gte") {
                BinaryOp::Ge
            } else if self.eat_symbol("<") || self.eat_word("lt") {
                BinaryOp::Lt
            } else if self.eat_symbol(">") || self.eat_word("gt") {
                BinaryOp::Gt
            } else {
                return Ok(left);
            };
            let right = self.additive()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
    }

    fn additive(&mut self) -> MapperResult<Expr> {
        let mut left = self.multiplicative()?;
        loop {
            let op = if self.eat_symbol("+") {
                BinaryOp::Add
            } else if self.eat_symbol("-") {
                BinaryOp::Sub
            } else {
                return Ok(left);
            };
            let right = self.multiplicative()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
    }

    fn multiplicative(&mut self) -> MapperResult<Expr> {
        let mut left = self.unary()?;
        loop {
            let op = if self.eat_symbol("*") {
                BinaryOp::Mul
            } else if self.eat_symbol("/") {
                BinaryOp::Div
            } else if self.eat_symbol("%") {
                BinaryOp::Rem
            } else {
                return Ok(left);
            };
            let right = self.unary()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
    }

    fn unary(&mut self) -> MapperResult<Expr> {
        if self.eat_symbol("!") || self.eat_word("not") {
            return Ok(Expr::Unary(UnaryOp::Not, Box::new(self.unary()?)));
        }
        if self.eat_symbol("-") {
            return Ok(Expr::Unary(UnaryOp::Neg, Box::new(self.unary()?)));
        }
        self.postfix()
    }

    fn postfix(&mut self) -> MapperResult<Expr> {
        let mut expr = self.primary()?;
        loop {
            if self.eat_symbol(".") {
                let name = match self.next() {
                    Some(Token::Ident(name)) => name,
                    Some(other) => {
                        return Err(MapperError::configuration(format!(
                            "expected a property name after '.' but found {}",
                            describe(&other)
                        )));
                    }
                    None => {
                        return Err(MapperError::configuration(
                            "expected a property name after '.'",
                        ));
                    }
                };
                if self.eat_symbol("(") {
                    let args = self.arguments()?;
                    expr = Expr::Call(Box::new(expr), name, args);
                } else {
                    expr = Expr::Property(Box::new(expr), name);
                }
            } else if self.eat_symbol("[") {
                let index = self.or()?;
                self.expect_symbol("]")?;
                expr = Expr::Index(Box::new(expr), Box::new(index));
            } else {
                return Ok(expr);
            }
        }
    }

    fn arguments(&mut self) -> MapperResult<Vec<Expr>> {
        let mut args = Vec::new();
        if self.eat_symbol(")") {
            return Ok(args);
        }
        loop {
            args.push(self.or()?);
            if self.eat_symbol(")") {
                return Ok(args);
            }
            self.expect_symbol(",")?;
        }
    }

    fn primary(&mut self) -> MapperResult<Expr> {
        match self.next() {
            Some(Token::Int(i)) => Ok(Expr::Literal(Value::Int(i))),
            Some(Token::Float(f)) => Ok(Expr::Literal(Value::Float(f))),
            Some(Token::Str(s)) => Ok(Expr::Literal(Value::Text(s))),
            Some(Token::Ident(word)) => Ok(match word.as_str() {
                "null" => Expr::Literal(Value::Null),
                "true" => Expr::Literal(Value::Bool(true)),
                "false" => Expr::Literal(Value::Bool(false)),
                "and" | "or" | "not" | "eq" | "neq" | "lt" | "lte" | "gt" | "gte" => {
                    return Err(MapperError::configuration(format!(
                        "unexpected operator '{word}'"
                    )));
                }
                _ => Expr::Ident(word),
            }),
            Some(Token::Symbol("(")) => {
                let inner = self.or()?;
                self.expect_symbol(")")?;
                Ok(inner)
            }
            Some(other) => Err(MapperError::configuration(format!(
                "unexpected {}",
                describe(&other)
            ))),
            None => Err(MapperError::configuration("unexpected end of expression")),
        }
    }
}
