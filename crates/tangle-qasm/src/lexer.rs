//! Lexer for `OpenQASM` 2.0.

use logos::Logos;

/// Tokens for `OpenQASM` 2.0.
#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\r\n]+")]
#[logos(skip r"//[^\n]*")]
#[logos(skip r"/\*[^*]*\*+(?:[^/*][^*]*\*+)*/")]
pub enum Token {
    // Keywords
    #[token("OPENQASM")]
    OpenQasm,

    #[token("include")]
    Include,

    #[token("qreg")]
    QReg,

    #[token("creg")]
    CReg,

    #[token("gate")]
    Gate,

    #[token("opaque")]
    Opaque,

    #[token("if")]
    If,

    #[token("measure")]
    Measure,

    #[token("reset")]
    Reset,

    #[token("barrier")]
    Barrier,

    // Built-in gates (higher priority than identifier)
    #[token("U", priority = 3)]
    GateU,

    #[token("CX", priority = 3)]
    GateCX,

    // Constants
    #[token("pi")]
    Pi,

    // Literals
    #[regex(r"[0-9]+\.[0-9]*([eE][+-]?[0-9]+)?", |lex| lex.slice().parse::<f64>().ok())]
    #[regex(r"\.[0-9]+([eE][+-]?[0-9]+)?", |lex| lex.slice().parse::<f64>().ok())]
    #[regex(r"[0-9]+[eE][+-]?[0-9]+", |lex| lex.slice().parse::<f64>().ok())]
    FloatLiteral(f64),

    #[regex(r"[0-9]+", |lex| lex.slice().parse::<u64>().ok())]
    IntLiteral(u64),

    #[regex(r#""[^"]*""#, |lex| {
        let s = lex.slice();
        Some(s[1..s.len()-1].to_string())
    })]
    StringLiteral(String),

    // Identifiers
    #[regex(r"[a-zA-Z_][a-zA-Z0-9_]*", |lex| lex.slice().to_string())]
    Identifier(String),

    // Operators and punctuation
    #[token("+")]
    Plus,

    #[token("-")]
    Minus,

    #[token("*")]
    Star,

    #[token("/")]
    Slash,

    /// Power operator, right-associative.
    #[token("^")]
    Caret,

    #[token("==")]
    EqEq,

    #[token("->")]
    Arrow,

    #[token("(")]
    LParen,

    #[token(")")]
    RParen,

    #[token("[")]
    LBracket,

    #[token("]")]
    RBracket,

    #[token("{")]
    LBrace,

    #[token("}")]
    RBrace,

    #[token(";")]
    Semicolon,

    #[token(",")]
    Comma,
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Token::OpenQasm => write!(f, "OPENQASM"),
            Token::Include => write!(f, "include"),
            Token::QReg => write!(f, "qreg"),
            Token::CReg => write!(f, "creg"),
            Token::Gate => write!(f, "gate"),
            Token::Opaque => write!(f, "opaque"),
            Token::If => write!(f, "if"),
            Token::Measure => write!(f, "measure"),
            Token::Reset => write!(f, "reset"),
            Token::Barrier => write!(f, "barrier"),
            Token::GateU => write!(f, "U"),
            Token::GateCX => write!(f, "CX"),
            Token::Pi => write!(f, "pi"),
            Token::FloatLiteral(v) => write!(f, "{v}"),
            Token::IntLiteral(v) => write!(f, "{v}"),
            Token::StringLiteral(s) => write!(f, "\"{s}\""),
            Token::Identifier(s) => write!(f, "{s}"),
            Token::Plus => write!(f, "+"),
            Token::Minus => write!(f, "-"),
            Token::Star => write!(f, "*"),
            Token::Slash => write!(f, "/"),
            Token::Caret => write!(f, "^"),
            Token::EqEq => write!(f, "=="),
            Token::Arrow => write!(f, "->"),
            Token::LParen => write!(f, "("),
            Token::RParen => write!(f, ")"),
            Token::LBracket => write!(f, "["),
            Token::RBracket => write!(f, "]"),
            Token::LBrace => write!(f, "{{"),
            Token::RBrace => write!(f, "}}"),
            Token::Semicolon => write!(f, ";"),
            Token::Comma => write!(f, ","),
        }
    }
}

/// A token with its span information.
#[derive(Debug, Clone)]
pub struct SpannedToken {
    pub token: Token,
    pub span: std::ops::Range<usize>,
}

/// Tokenize a QASM 2.0 source string.
pub fn tokenize(source: &str) -> Vec<Result<SpannedToken, (std::ops::Range<usize>, String)>> {
    let mut lexer = Token::lexer(source);
    let mut tokens = Vec::new();

    while let Some(result) = lexer.next() {
        let span = lexer.span();
        if let Ok(token) = result {
            tokens.push(Ok(SpannedToken { token, span }));
        } else {
            let slice = &source[span.clone()];
            tokens.push(Err((span, format!("invalid token: '{slice}'"))));
        }
    }

    tokens
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex(source: &str) -> Vec<Token> {
        tokenize(source)
            .into_iter()
            .filter_map(Result::ok)
            .map(|t| t.token)
            .collect()
    }

    #[test]
    fn header_tokens() {
        let tokens = lex("OPENQASM 2.0;");
        assert_eq!(tokens.len(), 3);
        assert_eq!(tokens[0], Token::OpenQasm);
        assert!(matches!(tokens[1], Token::FloatLiteral(v) if (v - 2.0).abs() < 0.001));
        assert_eq!(tokens[2], Token::Semicolon);
    }

    #[test]
    fn register_declaration() {
        let tokens = lex("qreg qr[4];");
        assert_eq!(tokens[0], Token::QReg);
        assert!(matches!(tokens[1], Token::Identifier(ref s) if s == "qr"));
        assert_eq!(tokens[2], Token::LBracket);
        assert!(matches!(tokens[3], Token::IntLiteral(4)));
        assert_eq!(tokens[4], Token::RBracket);
        assert_eq!(tokens[5], Token::Semicolon);
    }

    #[test]
    fn parameterized_call() {
        let tokens = lex("u1(-0.1 + 0.55*pi) qr[0];");
        assert!(matches!(tokens[0], Token::Identifier(ref s) if s == "u1"));
        assert_eq!(tokens[1], Token::LParen);
        assert_eq!(tokens[2], Token::Minus);
        assert!(matches!(tokens[3], Token::FloatLiteral(v) if (v - 0.1).abs() < 1e-12));
        assert_eq!(tokens[4], Token::Plus);
        assert!(matches!(tokens[5], Token::FloatLiteral(v) if (v - 0.55).abs() < 1e-12));
        assert_eq!(tokens[6], Token::Star);
        assert_eq!(tokens[7], Token::Pi);
    }

    #[test]
    fn measure_arrow() {
        let tokens = lex("measure qr[0] -> cr[0];");
        assert_eq!(tokens[0], Token::Measure);
        assert!(tokens.contains(&Token::Arrow));
    }

    #[test]
    fn builtin_vs_identifier() {
        let tokens = lex("U(0,0,0) q[0]; CX q[0],q[1]; cx q[0],q[1];");
        assert_eq!(tokens[0], Token::GateU);
        assert!(tokens.contains(&Token::GateCX));
        assert!(tokens.iter().any(|t| matches!(t, Token::Identifier(s) if s == "cx")));
    }

    #[test]
    fn power_token() {
        let tokens = lex("rx(2^3^2) q;");
        assert_eq!(
            tokens.iter().filter(|t| **t == Token::Caret).count(),
            2
        );
    }

    #[test]
    fn comments_are_skipped() {
        let tokens = lex(r"
            // line comment
            qreg q[1];
            /* block
               comment */
            creg c[1];
        ");
        assert_eq!(tokens.len(), 12);
    }
}
