//! Formula parser
//!
//! A tokenizer feeding a recursive descent parser with Excel operator
//! precedence. Function names are whole identifiers, so `OR(` can never be
//! mistaken for the tail of `XOR(`.

use crate::ast::{BinaryOperator, FormulaExpr, UnaryOperator};
use crate::error::{FormulaError, FormulaResult};
use gridcalc_core::{CellAddress, CellError, CellRange};

/// Deepest parenthesis/call nesting the parser accepts
pub const MAX_NESTING: usize = 256;

/// Parse a formula string into an AST
///
/// The leading `=` is optional.
///
/// # Example
/// ```rust
/// use gridcalc_formula::parse_formula;
///
/// let ast = parse_formula("=1+2").unwrap();
/// let ast = parse_formula("DSUM(A1:C10,\"Salary\",E1:E2)").unwrap();
/// let ast = parse_formula("=IF(A1>0,\"Yes\",\"No\")").unwrap();
/// ```
pub fn parse_formula(formula: &str) -> FormulaResult<FormulaExpr> {
    let formula = formula.trim();
    let formula = formula.strip_prefix('=').unwrap_or(formula);

    if formula.trim().is_empty() {
        return Err(FormulaError::Parse("Empty formula".into()));
    }

    let mut parser = FormulaParser::new(formula)?;
    let expr = parser.parse_expression()?;

    if parser.current_token() != &Token::Eof {
        return Err(FormulaError::Parse(format!(
            "Unexpected {:?} after expression",
            parser.current_token()
        )));
    }

    Ok(expr)
}

/// Token types
#[derive(Debug, Clone, PartialEq)]
enum Token {
    // Literals
    Number(f64),
    String(String),
    Boolean(bool),
    Error(CellError),

    // Identifiers and references
    Identifier(String),
    CellRef(String),

    // Operators
    Plus,
    Minus,
    Star,
    Slash,
    Caret,
    Percent,
    Ampersand,
    Equal,
    NotEqual,
    LessThan,
    LessEqual,
    GreaterThan,
    GreaterEqual,
    Colon,
    Comma,
    Semicolon,

    // Delimiters
    LeftParen,
    RightParen,
    LeftBrace,
    RightBrace,

    Eof,
}

struct FormulaParser<'a> {
    input: &'a str,
    pos: usize,
    current_token: Token,
    nesting: usize,
}

impl<'a> FormulaParser<'a> {
    fn new(input: &'a str) -> FormulaResult<Self> {
        let mut parser = Self {
            input,
            pos: 0,
            current_token: Token::Eof,
            nesting: 0,
        };
        parser.advance_token()?;
        Ok(parser)
    }

    // === Token scanning ===

    fn advance_token(&mut self) -> FormulaResult<()> {
        self.current_token = self.scan_token()?;
        Ok(())
    }

    fn scan_token(&mut self) -> FormulaResult<Token> {
        self.skip_whitespace();

        let c = match self.peek_char() {
            Some(c) => c,
            None => return Ok(Token::Eof),
        };

        let single = match c {
            '+' => Some(Token::Plus),
            '-' => Some(Token::Minus),
            '*' => Some(Token::Star),
            '/' => Some(Token::Slash),
            '^' => Some(Token::Caret),
            '%' => Some(Token::Percent),
            '&' => Some(Token::Ampersand),
            ':' => Some(Token::Colon),
            ',' => Some(Token::Comma),
            ';' => Some(Token::Semicolon),
            '(' => Some(Token::LeftParen),
            ')' => Some(Token::RightParen),
            '{' => Some(Token::LeftBrace),
            '}' => Some(Token::RightBrace),
            '=' => Some(Token::Equal),
            _ => None,
        };
        if let Some(token) = single {
            self.advance();
            return Ok(token);
        }

        match c {
            '<' => {
                self.advance();
                return Ok(match self.peek_char() {
                    Some('=') => {
                        self.advance();
                        Token::LessEqual
                    }
                    Some('>') => {
                        self.advance();
                        Token::NotEqual
                    }
                    _ => Token::LessThan,
                });
            }
            '>' => {
                self.advance();
                if self.peek_char() == Some('=') {
                    self.advance();
                    return Ok(Token::GreaterEqual);
                }
                return Ok(Token::GreaterThan);
            }
            '!' if self.peek_char_at(1) == Some('=') => {
                self.advance();
                self.advance();
                return Ok(Token::NotEqual);
            }
            '"' => return self.scan_string(),
            _ => {}
        }

        if c.is_ascii_digit()
            || (c == '.' && self.peek_char_at(1).map_or(false, |c| c.is_ascii_digit()))
        {
            return self.scan_number();
        }

        if c == '#' {
            return self.scan_error();
        }

        if c.is_ascii_alphabetic() || c == '_' || c == '$' {
            return Ok(self.scan_identifier_or_ref());
        }

        Err(FormulaError::Parse(format!(
            "Unexpected character '{}' at position {}",
            c, self.pos
        )))
    }

    fn scan_string(&mut self) -> FormulaResult<Token> {
        self.advance(); // opening quote

        let mut s = String::new();
        loop {
            match self.peek_char() {
                Some('"') if self.peek_char_at(1) == Some('"') => {
                    s.push('"');
                    self.advance();
                    self.advance();
                }
                Some('"') => {
                    self.advance();
                    return Ok(Token::String(s));
                }
                Some(c) => {
                    s.push(c);
                    self.advance();
                }
                None => return Err(FormulaError::Parse("Unterminated string literal".into())),
            }
        }
    }

    fn scan_number(&mut self) -> FormulaResult<Token> {
        let start = self.pos;

        self.skip_digits();
        if self.peek_char() == Some('.') {
            self.advance();
            self.skip_digits();
        }

        // Only treat 'e' as an exponent when digits follow
        if matches!(self.peek_char(), Some('e' | 'E')) {
            let signed = matches!(self.peek_char_at(1), Some('+' | '-'));
            let digit_at = if signed { 2 } else { 1 };
            if self
                .peek_char_at(digit_at)
                .map_or(false, |c| c.is_ascii_digit())
            {
                for _ in 0..digit_at {
                    self.advance();
                }
                self.skip_digits();
            }
        }

        let text = &self.input[start..self.pos];
        text.parse::<f64>()
            .map(Token::Number)
            .map_err(|_| FormulaError::Parse(format!("Invalid number '{}'", text)))
    }

    fn scan_error(&mut self) -> FormulaResult<Token> {
        let start = self.pos;
        self.advance();
        while self.peek_char().map_or(false, |c| {
            c.is_ascii_alphanumeric() || c == '!' || c == '/' || c == '?'
        }) {
            self.advance();
        }
        let text = &self.input[start..self.pos];
        CellError::parse(text)
            .map(Token::Error)
            .ok_or_else(|| FormulaError::Parse(format!("Unknown error literal '{}'", text)))
    }

    fn scan_identifier_or_ref(&mut self) -> Token {
        let start = self.pos;

        while self.peek_char().map_or(false, |c| {
            c.is_ascii_alphanumeric() || c == '_' || c == '$' || c == '.'
        }) {
            self.advance();
        }

        let text = &self.input[start..self.pos];
        let is_call = self.next_non_space() == Some('(');

        if !is_call {
            if text.eq_ignore_ascii_case("TRUE") {
                return Token::Boolean(true);
            }
            if text.eq_ignore_ascii_case("FALSE") {
                return Token::Boolean(false);
            }
            // LOG10(100) is a call, LOG10 alone is a cell
            if Self::is_cell_reference(text) {
                return Token::CellRef(text.to_string());
            }
        }

        Token::Identifier(text.to_string())
    }

    /// `[$]letters[$]digits`, nothing else
    fn is_cell_reference(text: &str) -> bool {
        let bytes = text.as_bytes();
        let mut i = 0;

        if bytes.get(i) == Some(&b'$') {
            i += 1;
        }
        let letter_start = i;
        while i < bytes.len() && bytes[i].is_ascii_alphabetic() {
            i += 1;
        }
        if i == letter_start {
            return false;
        }
        if bytes.get(i) == Some(&b'$') {
            i += 1;
        }
        let digit_start = i;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }

        i > digit_start && i == bytes.len()
    }

    // === Helper methods ===

    fn peek_char(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn peek_char_at(&self, offset: usize) -> Option<char> {
        self.input[self.pos..].chars().nth(offset)
    }

    fn next_non_space(&self) -> Option<char> {
        self.input[self.pos..].chars().find(|c| !c.is_whitespace())
    }

    fn advance(&mut self) {
        if let Some(c) = self.peek_char() {
            self.pos += c.len_utf8();
        }
    }

    fn skip_digits(&mut self) {
        while self.peek_char().map_or(false, |c| c.is_ascii_digit()) {
            self.advance();
        }
    }

    fn skip_whitespace(&mut self) {
        while self.peek_char().map_or(false, |c| c.is_whitespace()) {
            self.advance();
        }
    }

    fn current_token(&self) -> &Token {
        &self.current_token
    }

    fn consume(&mut self) -> FormulaResult<Token> {
        let token = std::mem::replace(&mut self.current_token, Token::Eof);
        self.advance_token()?;
        Ok(token)
    }

    fn expect(&mut self, expected: &Token) -> FormulaResult<()> {
        if self.current_token() == expected {
            self.consume()?;
            Ok(())
        } else {
            Err(FormulaError::Parse(format!(
                "Expected {:?}, got {:?}",
                expected,
                self.current_token()
            )))
        }
    }

    fn enter(&mut self) -> FormulaResult<()> {
        self.nesting += 1;
        if self.nesting > MAX_NESTING {
            return Err(FormulaError::DepthExceeded(MAX_NESTING));
        }
        Ok(())
    }

    fn leave(&mut self) {
        self.nesting -= 1;
    }

    /// Each operator in a left-nested chain deepens the tree by one level
    fn link(&mut self, links: &mut usize) -> FormulaResult<()> {
        *links += 1;
        self.enter()
    }

    fn unlink(&mut self, links: usize) {
        self.nesting -= links;
    }

    // === Expression parsing with precedence ===
    // Precedence (lowest to highest):
    // 1. Comparison: =, <>, !=, <, <=, >, >=
    // 2. Concatenation: &
    // 3. Addition/Subtraction: +, -
    // 4. Multiplication/Division: *, /
    // 5. Exponentiation: ^ (right associative)
    // 6. Unary: -, + (prefix) and % (postfix)
    // 7. Range: :
    // 8. Primary: literals, references, function calls, parentheses

    fn parse_expression(&mut self) -> FormulaResult<FormulaExpr> {
        self.enter()?;
        let expr = self.parse_comparison();
        self.leave();
        expr
    }

    fn parse_comparison(&mut self) -> FormulaResult<FormulaExpr> {
        let mut left = self.parse_concatenation()?;
        let mut links = 0;

        loop {
            let op = match self.current_token() {
                Token::Equal => BinaryOperator::Equal,
                Token::NotEqual => BinaryOperator::NotEqual,
                Token::LessThan => BinaryOperator::LessThan,
                Token::LessEqual => BinaryOperator::LessEqual,
                Token::GreaterThan => BinaryOperator::GreaterThan,
                Token::GreaterEqual => BinaryOperator::GreaterEqual,
                _ => break,
            };

            self.consume()?;
            self.link(&mut links)?;
            let right = self.parse_concatenation()?;
            left = binary(op, left, right);
        }

        self.unlink(links);
        Ok(left)
    }

    fn parse_concatenation(&mut self) -> FormulaResult<FormulaExpr> {
        let mut left = self.parse_additive()?;
        let mut links = 0;

        while matches!(self.current_token(), Token::Ampersand) {
            self.consume()?;
            self.link(&mut links)?;
            let right = self.parse_additive()?;
            left = binary(BinaryOperator::Concat, left, right);
        }

        self.unlink(links);
        Ok(left)
    }

    fn parse_additive(&mut self) -> FormulaResult<FormulaExpr> {
        let mut left = self.parse_multiplicative()?;
        let mut links = 0;

        loop {
            let op = match self.current_token() {
                Token::Plus => BinaryOperator::Add,
                Token::Minus => BinaryOperator::Subtract,
                _ => break,
            };

            self.consume()?;
            self.link(&mut links)?;
            let right = self.parse_multiplicative()?;
            left = binary(op, left, right);
        }

        self.unlink(links);
        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> FormulaResult<FormulaExpr> {
        let mut left = self.parse_exponent()?;
        let mut links = 0;

        loop {
            let op = match self.current_token() {
                Token::Star => BinaryOperator::Multiply,
                Token::Slash => BinaryOperator::Divide,
                _ => break,
            };

            self.consume()?;
            self.link(&mut links)?;
            let right = self.parse_exponent()?;
            left = binary(op, left, right);
        }

        self.unlink(links);
        Ok(left)
    }

    fn parse_exponent(&mut self) -> FormulaResult<FormulaExpr> {
        let left = self.parse_unary()?;

        if matches!(self.current_token(), Token::Caret) {
            self.consume()?;
            self.enter()?;
            let right = self.parse_exponent();
            self.leave();
            return Ok(binary(BinaryOperator::Power, left, right?));
        }

        Ok(left)
    }

    fn parse_unary(&mut self) -> FormulaResult<FormulaExpr> {
        match self.current_token() {
            Token::Minus | Token::Plus => {
                let negate = matches!(self.consume()?, Token::Minus);
                self.enter()?;
                let operand = self.parse_unary();
                self.leave();
                let operand = operand?;
                return Ok(if negate {
                    FormulaExpr::UnaryOp {
                        op: UnaryOperator::Negate,
                        operand: Box::new(operand),
                    }
                } else {
                    operand
                });
            }
            _ => {}
        }

        let mut expr = self.parse_range()?;
        let mut links = 0;

        while matches!(self.current_token(), Token::Percent) {
            self.consume()?;
            self.link(&mut links)?;
            expr = FormulaExpr::UnaryOp {
                op: UnaryOperator::Percent,
                operand: Box::new(expr),
            };
        }

        self.unlink(links);
        Ok(expr)
    }

    fn parse_range(&mut self) -> FormulaResult<FormulaExpr> {
        let left = self.parse_primary()?;

        if matches!(self.current_token(), Token::Colon) {
            self.consume()?;
            let right = self.parse_primary()?;

            if let (FormulaExpr::CellRef(start), FormulaExpr::CellRef(end)) = (&left, &right) {
                return Ok(FormulaExpr::RangeRef(CellRange::new(*start, *end)));
            }

            return Ok(binary(BinaryOperator::Range, left, right));
        }

        Ok(left)
    }

    fn parse_primary(&mut self) -> FormulaResult<FormulaExpr> {
        match self.consume()? {
            Token::Number(n) => Ok(FormulaExpr::Number(n)),
            Token::String(s) => Ok(FormulaExpr::String(s)),
            Token::Boolean(b) => Ok(FormulaExpr::Boolean(b)),
            Token::Error(e) => Ok(FormulaExpr::Error(e)),

            Token::LeftParen => {
                let expr = self.parse_expression()?;
                self.expect(&Token::RightParen)?;
                Ok(expr)
            }

            Token::LeftBrace => self.parse_array(),

            Token::CellRef(text) => {
                let address = CellAddress::parse(&text).map_err(|e| {
                    FormulaError::Parse(format!("Invalid cell reference '{}': {}", text, e))
                })?;
                Ok(FormulaExpr::CellRef(address))
            }

            Token::Identifier(name) => {
                if matches!(self.current_token(), Token::LeftParen) {
                    self.parse_function_call(name)
                } else {
                    Ok(FormulaExpr::NameRef(name))
                }
            }

            other => Err(FormulaError::Parse(format!("Unexpected token: {:?}", other))),
        }
    }

    /// Called with `{` already consumed
    fn parse_array(&mut self) -> FormulaResult<FormulaExpr> {
        let mut rows = Vec::new();
        let mut current_row = Vec::new();

        if !matches!(self.current_token(), Token::RightBrace) {
            current_row.push(self.parse_expression()?);

            loop {
                match self.current_token() {
                    Token::Comma => {
                        self.consume()?;
                        current_row.push(self.parse_expression()?);
                    }
                    Token::Semicolon => {
                        self.consume()?;
                        rows.push(std::mem::take(&mut current_row));
                        current_row.push(self.parse_expression()?);
                    }
                    Token::RightBrace => break,
                    _ => {
                        return Err(FormulaError::Parse(
                            "Expected ',' ';' or '}' in array".into(),
                        ))
                    }
                }
            }
        }

        if !current_row.is_empty() {
            rows.push(current_row);
        }

        self.expect(&Token::RightBrace)?;
        Ok(FormulaExpr::Array(rows))
    }

    /// A call argument, which may be left out between commas
    fn parse_argument(&mut self) -> FormulaResult<FormulaExpr> {
        match self.current_token() {
            Token::Comma | Token::RightParen => Ok(FormulaExpr::Missing),
            _ => self.parse_expression(),
        }
    }

    fn parse_function_call(&mut self, name: String) -> FormulaResult<FormulaExpr> {
        self.expect(&Token::LeftParen)?;

        let mut args = Vec::new();

        if !matches!(self.current_token(), Token::RightParen) {
            args.push(self.parse_argument()?);

            while matches!(self.current_token(), Token::Comma) {
                self.consume()?;
                args.push(self.parse_argument()?);
            }
        }

        self.expect(&Token::RightParen)?;

        Ok(FormulaExpr::Function {
            name: name.to_ascii_uppercase(),
            args,
        })
    }
}

fn binary(op: BinaryOperator, left: FormulaExpr, right: FormulaExpr) -> FormulaExpr {
    FormulaExpr::BinaryOp {
        op,
        left: Box::new(left),
        right: Box::new(right),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_number() {
        assert_eq!(parse_formula("=42").unwrap(), FormulaExpr::Number(42.0));
        assert_eq!(parse_formula("=3.25").unwrap(), FormulaExpr::Number(3.25));
        assert_eq!(parse_formula("=1e10").unwrap(), FormulaExpr::Number(1e10));
        assert_eq!(parse_formula("=.5").unwrap(), FormulaExpr::Number(0.5));
    }

    #[test]
    fn test_leading_equals_is_optional() {
        assert_eq!(parse_formula("1+2").unwrap(), parse_formula("=1+2").unwrap());
        assert!(parse_formula("=").is_err());
        assert!(parse_formula("   ").is_err());
    }

    #[test]
    fn test_parse_string() {
        assert_eq!(
            parse_formula("=\"Hello\"").unwrap(),
            FormulaExpr::String("Hello".into())
        );
        assert_eq!(
            parse_formula("=\"Hello \"\"World\"\"\"").unwrap(),
            FormulaExpr::String("Hello \"World\"".into())
        );
        assert!(parse_formula("=\"open").is_err());
    }

    #[test]
    fn test_parse_boolean() {
        assert_eq!(parse_formula("=TRUE").unwrap(), FormulaExpr::Boolean(true));
        assert_eq!(parse_formula("=false").unwrap(), FormulaExpr::Boolean(false));
        assert_eq!(
            parse_formula("=TRUE()").unwrap(),
            FormulaExpr::Function {
                name: "TRUE".into(),
                args: vec![]
            }
        );
    }

    #[test]
    fn test_parse_arithmetic_precedence() {
        let ast = parse_formula("=1+2*3").unwrap();
        assert_eq!(
            ast,
            binary(
                BinaryOperator::Add,
                FormulaExpr::Number(1.0),
                binary(
                    BinaryOperator::Multiply,
                    FormulaExpr::Number(2.0),
                    FormulaExpr::Number(3.0)
                )
            )
        );
    }

    #[test]
    fn test_power_is_right_associative() {
        let ast = parse_formula("=2^3^2").unwrap();
        assert_eq!(
            ast,
            binary(
                BinaryOperator::Power,
                FormulaExpr::Number(2.0),
                binary(
                    BinaryOperator::Power,
                    FormulaExpr::Number(3.0),
                    FormulaExpr::Number(2.0)
                )
            )
        );
    }

    #[test]
    fn test_parse_comparison() {
        for (text, op) in [
            ("=A1>5", BinaryOperator::GreaterThan),
            ("=A1>=5", BinaryOperator::GreaterEqual),
            ("=A1<>B1", BinaryOperator::NotEqual),
            ("=A1!=B1", BinaryOperator::NotEqual),
            ("=A1=B1", BinaryOperator::Equal),
        ] {
            match parse_formula(text).unwrap() {
                FormulaExpr::BinaryOp { op: got, .. } => assert_eq!(got, op, "{}", text),
                other => panic!("Expected BinaryOp for {}, got {:?}", text, other),
            }
        }
    }

    #[test]
    fn test_parse_unary() {
        assert!(matches!(
            parse_formula("=-5").unwrap(),
            FormulaExpr::UnaryOp {
                op: UnaryOperator::Negate,
                ..
            }
        ));
        assert_eq!(parse_formula("=+5").unwrap(), FormulaExpr::Number(5.0));
        assert!(matches!(
            parse_formula("=50%").unwrap(),
            FormulaExpr::UnaryOp {
                op: UnaryOperator::Percent,
                ..
            }
        ));
    }

    #[test]
    fn test_parse_references() {
        assert_eq!(
            parse_formula("=A1").unwrap(),
            FormulaExpr::CellRef(CellAddress::new(0, 0))
        );
        assert_eq!(
            parse_formula("=$B$2").unwrap(),
            FormulaExpr::CellRef(CellAddress::absolute(1, 1))
        );
        assert_eq!(
            parse_formula("=A1:B10").unwrap(),
            FormulaExpr::RangeRef(CellRange::from_indices(0, 0, 9, 1))
        );
    }

    #[test]
    fn test_parse_function() {
        match parse_formula("=sum(1, 2, A1:A10)").unwrap() {
            FormulaExpr::Function { name, args } => {
                assert_eq!(name, "SUM");
                assert_eq!(args.len(), 3);
                assert!(matches!(&args[2], FormulaExpr::RangeRef(_)));
            }
            other => panic!("Expected Function, got {:?}", other),
        }
    }

    #[test]
    fn test_dotted_and_digit_names_are_calls() {
        for name in ["ERROR.TYPE", "IMLOG10", "DEC2BIN", "ERF.PRECISE"] {
            let ast = parse_formula(&format!("={}(1)", name)).unwrap();
            assert!(
                matches!(&ast, FormulaExpr::Function { name: n, .. } if n == name),
                "{:?}",
                ast
            );
        }
    }

    #[test]
    fn test_xor_and_or_are_distinct() {
        match parse_formula("=XOR(TRUE,OR(FALSE))").unwrap() {
            FormulaExpr::Function { name, args } => {
                assert_eq!(name, "XOR");
                assert!(matches!(&args[1], FormulaExpr::Function { name, .. } if name == "OR"));
            }
            other => panic!("Expected Function, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_array() {
        match parse_formula("={1,2;3,4}").unwrap() {
            FormulaExpr::Array(rows) => {
                assert_eq!(rows.len(), 2);
                assert_eq!(rows[1], vec![FormulaExpr::Number(3.0), FormulaExpr::Number(4.0)]);
            }
            other => panic!("Expected Array, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_error_literals() {
        assert_eq!(
            parse_formula("=#VALUE!").unwrap(),
            FormulaExpr::Error(CellError::Value)
        );
        assert_eq!(
            parse_formula("=#N/A").unwrap(),
            FormulaExpr::Error(CellError::Na)
        );
        assert!(parse_formula("=#BOGUS!").is_err());
    }

    #[test]
    fn test_parse_failures() {
        assert!(parse_formula("=1+").is_err());
        assert!(parse_formula("=(1+2").is_err());
        assert!(parse_formula("=1 2").is_err());
        assert!(parse_formula("=1~2").is_err());
        assert!(parse_formula("=SUM(1,").is_err());
    }

    #[test]
    fn test_nesting_limit() {
        let deep = format!("={}1{}", "(".repeat(MAX_NESTING + 10), ")".repeat(MAX_NESTING + 10));
        assert_eq!(
            parse_formula(&deep),
            Err(FormulaError::DepthExceeded(MAX_NESTING))
        );

        let shallow = format!("={}1{}", "(".repeat(50), ")".repeat(50));
        assert_eq!(parse_formula(&shallow).unwrap(), FormulaExpr::Number(1.0));
    }

    #[test]
    fn test_operator_chains_count_toward_nesting() {
        for op in ["+", "*", "&", "=", "^"] {
            let long = format!("=1{}", format!("{}1", op).repeat(4000));
            assert_eq!(
                parse_formula(&long),
                Err(FormulaError::DepthExceeded(MAX_NESTING)),
                "{}",
                op
            );
        }
        assert_eq!(
            parse_formula(&format!("=1{}", "%".repeat(4000))),
            Err(FormulaError::DepthExceeded(MAX_NESTING))
        );

        let moderate = format!("=1{}", "+1".repeat(200));
        assert!(parse_formula(&moderate).is_ok());
    }

    #[test]
    fn test_omitted_arguments() {
        assert_eq!(
            parse_formula("=PMT(0.1,10,1000,,1)").unwrap(),
            FormulaExpr::Function {
                name: "PMT".into(),
                args: vec![
                    FormulaExpr::Number(0.1),
                    FormulaExpr::Number(10.0),
                    FormulaExpr::Number(1000.0),
                    FormulaExpr::Missing,
                    FormulaExpr::Number(1.0),
                ],
            }
        );
        assert_eq!(
            parse_formula("=DEC2BIN(5,)").unwrap(),
            FormulaExpr::Function {
                name: "DEC2BIN".into(),
                args: vec![FormulaExpr::Number(5.0), FormulaExpr::Missing],
            }
        );
        assert_eq!(
            parse_formula("=F()").unwrap(),
            FormulaExpr::Function {
                name: "F".into(),
                args: vec![],
            }
        );
    }
}
