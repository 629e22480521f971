//! Recursive-descent parser for `OpenQASM` 2.0.

use tangle_ir::MathFn;

use crate::ast::{
    BinOp, BitRef, Condition, Expression, GateCall, GateDef, Program, QubitRef, Statement,
};
use crate::error::{QasmError, QasmResult};
use crate::lexer::{SpannedToken, Token, tokenize};

/// Parse a QASM 2.0 source string into an AST program.
pub fn parse(source: &str) -> QasmResult<Program> {
    let mut parser = Parser::new(source)?;
    parser.parse_program()
}

/// Parse a standalone parameter expression, e.g. `-0.1 + 0.55*pi`.
pub fn parse_expression(source: &str) -> QasmResult<Expression> {
    let mut parser = Parser::new(source)?;
    let expression = parser.parse_expression()?;
    if let Some(token) = parser.peek() {
        return Err(QasmError::UnexpectedToken {
            position: parser.position(),
            expected: "end of expression".into(),
            found: token.to_string(),
        });
    }
    Ok(expression)
}

/// Parser state.
struct Parser {
    tokens: Vec<SpannedToken>,
    pos: usize,
}

#[allow(clippy::cast_possible_truncation)]
impl Parser {
    fn new(source: &str) -> QasmResult<Self> {
        let mut tokens = Vec::new();
        for result in tokenize(source) {
            match result {
                Ok(t) => tokens.push(t),
                Err((span, message)) => {
                    return Err(QasmError::LexerError {
                        position: span.start,
                        message,
                    });
                }
            }
        }
        Ok(Self { tokens, pos: 0 })
    }

    fn is_eof(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|t| &t.token)
    }

    /// Byte offset of the current token, for error reporting.
    fn position(&self) -> usize {
        self.tokens
            .get(self.pos.min(self.tokens.len().saturating_sub(1)))
            .map_or(0, |t| t.span.start)
    }

    fn advance(&mut self) -> Option<Token> {
        if self.is_eof() {
            return None;
        }
        let token = self.tokens[self.pos].token.clone();
        self.pos += 1;
        Some(token)
    }

    #[allow(clippy::needless_pass_by_value)]
    fn expect(&mut self, expected: Token) -> QasmResult<()> {
        let position = self.position();
        let found = self
            .advance()
            .ok_or_else(|| QasmError::UnexpectedEof(format!("{expected}")))?;
        if std::mem::discriminant(&found) != std::mem::discriminant(&expected) {
            return Err(QasmError::UnexpectedToken {
                position,
                expected: expected.to_string(),
                found: found.to_string(),
            });
        }
        Ok(())
    }

    fn check(&self, token: &Token) -> bool {
        self.peek()
            .is_some_and(|t| std::mem::discriminant(t) == std::mem::discriminant(token))
    }

    fn consume(&mut self, token: &Token) -> bool {
        if self.check(token) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn parse_program(&mut self) -> QasmResult<Program> {
        self.expect(Token::OpenQasm)?;
        let version = match self.advance() {
            Some(Token::FloatLiteral(v)) => format!("{v}"),
            Some(other) => return Err(QasmError::InvalidVersion(other.to_string())),
            None => return Err(QasmError::UnexpectedEof("version number".into())),
        };
        if version != "2" && version != "2.0" {
            return Err(QasmError::InvalidVersion(version));
        }
        self.expect(Token::Semicolon)?;

        let mut statements = Vec::new();
        while !self.is_eof() {
            statements.push(self.parse_statement()?);
        }

        Ok(Program {
            version: "2.0".into(),
            statements,
        })
    }

    fn parse_statement(&mut self) -> QasmResult<Statement> {
        let position = self.position();
        let token = self
            .peek()
            .cloned()
            .ok_or_else(|| QasmError::UnexpectedEof("statement".into()))?;

        match token {
            Token::Include => {
                self.advance();
                let path = match self.advance() {
                    Some(Token::StringLiteral(s)) => s,
                    Some(other) => {
                        return Err(QasmError::UnexpectedToken {
                            position,
                            expected: "string literal".into(),
                            found: other.to_string(),
                        });
                    }
                    None => return Err(QasmError::UnexpectedEof("include path".into())),
                };
                self.expect(Token::Semicolon)?;
                Ok(Statement::Include(path))
            }
            Token::QReg => {
                self.advance();
                let (name, size) = self.parse_sized_decl()?;
                Ok(Statement::QRegDecl { name, size })
            }
            Token::CReg => {
                self.advance();
                let (name, size) = self.parse_sized_decl()?;
                Ok(Statement::CRegDecl { name, size })
            }
            Token::Gate => self.parse_gate_def(),
            Token::Opaque => {
                self.advance();
                let name = self.parse_identifier()?;
                let params = if self.consume(&Token::LParen) {
                    let p = if self.check(&Token::RParen) {
                        vec![]
                    } else {
                        self.parse_identifier_list()?
                    };
                    self.expect(Token::RParen)?;
                    p
                } else {
                    vec![]
                };
                let qubits = self.parse_identifier_list()?;
                self.expect(Token::Semicolon)?;
                Ok(Statement::OpaqueDef {
                    name,
                    params,
                    qubits,
                })
            }
            Token::If => {
                self.advance();
                self.expect(Token::LParen)?;
                let register = self.parse_identifier()?;
                self.expect(Token::EqEq)?;
                let value = self.parse_int_literal()?;
                self.expect(Token::RParen)?;
                let condition = Condition { register, value };
                self.parse_qop(Some(condition))
            }
            Token::Barrier => {
                self.advance();
                let qubits = self.parse_argument_list()?;
                self.expect(Token::Semicolon)?;
                Ok(Statement::Barrier { qubits })
            }
            _ => self.parse_qop(None),
        }
    }

    /// Quantum operation: gate call, measure, or reset.
    fn parse_qop(&mut self, condition: Option<Condition>) -> QasmResult<Statement> {
        let position = self.position();
        let token = self
            .peek()
            .cloned()
            .ok_or_else(|| QasmError::UnexpectedEof("quantum operation".into()))?;

        match token {
            Token::Measure => {
                self.advance();
                let qubit = self.parse_argument()?;
                self.expect(Token::Arrow)?;
                let bit = self.parse_bit_argument()?;
                self.expect(Token::Semicolon)?;
                Ok(Statement::Measure {
                    qubit,
                    bit,
                    condition,
                })
            }
            Token::Reset => {
                self.advance();
                let qubit = self.parse_argument()?;
                self.expect(Token::Semicolon)?;
                Ok(Statement::Reset { qubit, condition })
            }
            Token::GateU | Token::GateCX | Token::Identifier(_) => {
                let mut call = self.parse_gate_call()?;
                call.condition = condition;
                Ok(Statement::Gate(call))
            }
            other => Err(QasmError::UnexpectedToken {
                position,
                expected: "gate call, measure, or reset".into(),
                found: other.to_string(),
            }),
        }
    }

    /// `gate name(params?) qubits { body }`
    fn parse_gate_def(&mut self) -> QasmResult<Statement> {
        self.expect(Token::Gate)?;
        let name = self.parse_identifier()?;

        let params = if self.consume(&Token::LParen) {
            let p = if self.check(&Token::RParen) {
                vec![]
            } else {
                self.parse_identifier_list()?
            };
            self.expect(Token::RParen)?;
            p
        } else {
            vec![]
        };

        let qubits = self.parse_identifier_list()?;
        self.expect(Token::LBrace)?;

        let mut body = Vec::new();
        while !self.check(&Token::RBrace) {
            if self.consume(&Token::Barrier) {
                // Barriers in definitions have no effect after expansion.
                self.parse_identifier_list()?;
                self.expect(Token::Semicolon)?;
                continue;
            }
            body.push(self.parse_gate_call()?);
        }
        self.expect(Token::RBrace)?;

        Ok(Statement::GateDef(GateDef {
            name,
            params,
            qubits,
            body,
        }))
    }

    /// `name(params?) args;`
    fn parse_gate_call(&mut self) -> QasmResult<GateCall> {
        let position = self.position();
        let name = match self.advance() {
            Some(Token::GateU) => "U".to_string(),
            Some(Token::GateCX) => "CX".to_string(),
            Some(Token::Identifier(s)) => s,
            Some(other) => {
                return Err(QasmError::UnexpectedToken {
                    position,
                    expected: "gate name".into(),
                    found: other.to_string(),
                });
            }
            None => return Err(QasmError::UnexpectedEof("gate name".into())),
        };

        let params = if self.consume(&Token::LParen) {
            let p = if self.check(&Token::RParen) {
                vec![]
            } else {
                self.parse_expression_list()?
            };
            self.expect(Token::RParen)?;
            p
        } else {
            vec![]
        };

        let qubits = self.parse_argument_list()?;
        self.expect(Token::Semicolon)?;

        Ok(GateCall {
            name,
            params,
            qubits,
            condition: None,
        })
    }

    /// `name[n];` after `qreg`/`creg`.
    fn parse_sized_decl(&mut self) -> QasmResult<(String, u32)> {
        let name = self.parse_identifier()?;
        self.expect(Token::LBracket)?;
        let size = self.parse_int_literal()? as u32;
        self.expect(Token::RBracket)?;
        self.expect(Token::Semicolon)?;
        Ok((name, size))
    }

    /// `name` or `name[i]`.
    fn parse_argument(&mut self) -> QasmResult<QubitRef> {
        let register = self.parse_identifier()?;
        if self.consume(&Token::LBracket) {
            let index = self.parse_int_literal()? as u32;
            self.expect(Token::RBracket)?;
            Ok(QubitRef::single(register, index))
        } else {
            Ok(QubitRef::register(register))
        }
    }

    fn parse_bit_argument(&mut self) -> QasmResult<BitRef> {
        let register = self.parse_identifier()?;
        if self.consume(&Token::LBracket) {
            let index = self.parse_int_literal()? as u32;
            self.expect(Token::RBracket)?;
            Ok(BitRef::single(register, index))
        } else {
            Ok(BitRef::register(register))
        }
    }

    fn parse_argument_list(&mut self) -> QasmResult<Vec<QubitRef>> {
        let mut args = vec![self.parse_argument()?];
        while self.consume(&Token::Comma) {
            args.push(self.parse_argument()?);
        }
        Ok(args)
    }

    fn parse_identifier_list(&mut self) -> QasmResult<Vec<String>> {
        let mut ids = vec![self.parse_identifier()?];
        while self.consume(&Token::Comma) {
            ids.push(self.parse_identifier()?);
        }
        Ok(ids)
    }

    fn parse_identifier(&mut self) -> QasmResult<String> {
        let position = self.position();
        match self.advance() {
            Some(Token::Identifier(s)) => Ok(s),
            Some(other) => Err(QasmError::UnexpectedToken {
                position,
                expected: "identifier".into(),
                found: other.to_string(),
            }),
            None => Err(QasmError::UnexpectedEof("identifier".into())),
        }
    }

    fn parse_int_literal(&mut self) -> QasmResult<u64> {
        let position = self.position();
        match self.advance() {
            Some(Token::IntLiteral(v)) => Ok(v),
            Some(other) => Err(QasmError::UnexpectedToken {
                position,
                expected: "integer".into(),
                found: other.to_string(),
            }),
            None => Err(QasmError::UnexpectedEof("integer".into())),
        }
    }

    fn parse_expression_list(&mut self) -> QasmResult<Vec<Expression>> {
        let mut exprs = vec![self.parse_expression()?];
        while self.consume(&Token::Comma) {
            exprs.push(self.parse_expression()?);
        }
        Ok(exprs)
    }

    fn parse_expression(&mut self) -> QasmResult<Expression> {
        self.parse_binary_expr(0)
    }

    /// Precedence climbing. `^` is right-associative, so its right
    /// operand recurses at the same precedence instead of one higher.
    fn parse_binary_expr(&mut self, min_prec: u8) -> QasmResult<Expression> {
        let mut left = self.parse_unary_expr()?;

        while let Some(op) = self.peek_binary_op() {
            let prec = op_precedence(op);
            if prec < min_prec {
                break;
            }
            self.advance();

            let next_min = if op == BinOp::Pow { prec } else { prec + 1 };
            let right = self.parse_binary_expr(next_min)?;
            left = Expression::BinOp {
                left: Box::new(left),
                op,
                right: Box::new(right),
            };
        }

        Ok(left)
    }

    fn parse_unary_expr(&mut self) -> QasmResult<Expression> {
        if self.consume(&Token::Minus) {
            let expr = self.parse_unary_expr()?;
            return Ok(Expression::Neg(Box::new(expr)));
        }
        if self.consume(&Token::Plus) {
            return self.parse_unary_expr();
        }
        self.parse_primary_expr()
    }

    fn parse_primary_expr(&mut self) -> QasmResult<Expression> {
        let position = self.position();
        let token = self
            .peek()
            .cloned()
            .ok_or_else(|| QasmError::UnexpectedEof("expression".into()))?;

        match token {
            Token::IntLiteral(v) => {
                self.advance();
                Ok(Expression::Int(v))
            }
            Token::FloatLiteral(v) => {
                self.advance();
                Ok(Expression::Float(v))
            }
            Token::Pi => {
                self.advance();
                Ok(Expression::Pi)
            }
            Token::Identifier(name) => {
                self.advance();
                if self.consume(&Token::LParen) {
                    let func = MathFn::from_name(&name)
                        .ok_or_else(|| QasmError::UnknownFunction(name.clone()))?;
                    let arg = self.parse_expression()?;
                    self.expect(Token::RParen)?;
                    Ok(Expression::FnCall {
                        func,
                        arg: Box::new(arg),
                    })
                } else {
                    Ok(Expression::Identifier(name))
                }
            }
            Token::LParen => {
                self.advance();
                let expr = self.parse_expression()?;
                self.expect(Token::RParen)?;
                Ok(expr)
            }
            _ => Err(QasmError::UnexpectedToken {
                position,
                expected: "expression".into(),
                found: token.to_string(),
            }),
        }
    }

    fn peek_binary_op(&self) -> Option<BinOp> {
        match self.peek()? {
            Token::Plus => Some(BinOp::Add),
            Token::Minus => Some(BinOp::Sub),
            Token::Star => Some(BinOp::Mul),
            Token::Slash => Some(BinOp::Div),
            Token::Caret => Some(BinOp::Pow),
            _ => None,
        }
    }
}

fn op_precedence(op: BinOp) -> u8 {
    match op {
        BinOp::Add | BinOp::Sub => 1,
        BinOp::Mul | BinOp::Div => 2,
        BinOp::Pow => 3,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_bell_program() {
        let source = r#"
            OPENQASM 2.0;
            include "qelib1.inc";
            qreg q[2];
            creg c[2];
            h q[0];
            cx q[0], q[1];
            measure q[0] -> c[0];
            measure q[1] -> c[1];
        "#;

        let program = parse(source).unwrap();
        assert_eq!(program.version, "2.0");
        assert_eq!(program.statements.len(), 7);
        assert!(matches!(
            program.statements[1],
            Statement::QRegDecl { ref name, size: 2 } if name == "q"
        ));
        assert!(matches!(program.statements[3], Statement::Gate(_)));
        assert!(matches!(program.statements[5], Statement::Measure { .. }));
    }

    #[test]
    fn parse_gate_definition() {
        let source = r"
            OPENQASM 2.0;
            gate majority a, b, c {
                cx c, b;
                cx c, a;
                ccx a, b, c;
            }
        ";
        let program = parse(source).unwrap();
        let Statement::GateDef(def) = &program.statements[0] else {
            panic!("expected gate definition");
        };
        assert_eq!(def.name, "majority");
        assert!(def.params.is_empty());
        assert_eq!(def.qubits, vec!["a", "b", "c"]);
        assert_eq!(def.body.len(), 3);
        assert_eq!(def.body[2].name, "ccx");
    }

    #[test]
    fn parse_parameterized_definition() {
        let source = r"
            OPENQASM 2.0;
            gate rot(theta, phi) q {
                u3(theta, phi, -phi) q;
            }
            qreg q[1];
            rot(pi/2, 0.1) q[0];
        ";
        let program = parse(source).unwrap();
        let Statement::GateDef(def) = &program.statements[0] else {
            panic!("expected gate definition");
        };
        assert_eq!(def.params, vec!["theta", "phi"]);
        let Statement::Gate(call) = &program.statements[2] else {
            panic!("expected gate call");
        };
        assert_eq!(call.params.len(), 2);
        assert!(
            (call.params[0].to_parameter().as_f64().unwrap() - std::f64::consts::FRAC_PI_2).abs()
                < 1e-12
        );
    }

    #[test]
    fn parse_conditioned_gate() {
        let source = r"
            OPENQASM 2.0;
            qreg q[1];
            creg c[1];
            if (c == 1) x q[0];
        ";
        let program = parse(source).unwrap();
        let Statement::Gate(call) = &program.statements[2] else {
            panic!("expected gate call");
        };
        let cond = call.condition.as_ref().unwrap();
        assert_eq!(cond.register, "c");
        assert_eq!(cond.value, 1);
    }

    #[test]
    fn power_is_right_associative() {
        let source = r"
            OPENQASM 2.0;
            qreg q[1];
            u1(2^3^2) q[0];
        ";
        let program = parse(source).unwrap();
        let Statement::Gate(call) = &program.statements[1] else {
            panic!("expected gate call");
        };
        // 2^(3^2) = 512, not (2^3)^2 = 64
        assert_eq!(call.params[0].to_parameter().as_f64(), Some(512.0));
    }

    #[test]
    fn whole_register_argument() {
        let source = r"
            OPENQASM 2.0;
            qreg q[3];
            h q;
        ";
        let program = parse(source).unwrap();
        let Statement::Gate(call) = &program.statements[1] else {
            panic!("expected gate call");
        };
        assert_eq!(call.qubits[0], QubitRef::register("q"));
    }

    #[test]
    fn rejects_wrong_version() {
        let source = "OPENQASM 3.0;\nqreg q[1];";
        assert!(matches!(parse(source), Err(QasmError::InvalidVersion(_))));
    }

    #[test]
    fn standalone_expression_parses() {
        let expr = parse_expression("-0.1 + 0.55*pi").unwrap();
        assert_eq!(expr.to_parameter().to_string(), "-0.1 + 0.55*pi");
    }

    #[test]
    fn standalone_expression_rejects_trailing_tokens() {
        assert!(matches!(
            parse_expression("1.0 q[0]"),
            Err(QasmError::UnexpectedToken { .. })
        ));
    }

    #[test]
    fn unknown_function_is_an_error() {
        let source = r"
            OPENQASM 2.0;
            qreg q[1];
            u1(sinh(1.0)) q[0];
        ";
        assert!(matches!(
            parse(source),
            Err(QasmError::UnknownFunction(name)) if name == "sinh"
        ));
    }
}
