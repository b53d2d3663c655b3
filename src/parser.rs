//! Recursive-descent parser: token stream in, executable AST out.
//!
//! Grammar sketch (statements end on `Newline`, blocks are `Indent`/`Dedent`
//! delimited):
//!
//! ```text
//! program    = statement* Eof
//! statement  = class-def | if-else | "print" exprs | "return" expr? | simple
//! simple     = target "=" expr | expr
//! expr       = or ; or = and ("or" and)* ; and = not ("and" not)*
//! not        = "not" not | comparison
//! comparison = additive (("==" | "!=" | "<" | ">" | "<=" | ">=") additive)?
//! additive   = multiplicative (("+" | "-") multiplicative)*
//! multiplicative = postfix (("*" | "/") postfix)*
//! postfix    = atom ("." id call-args?)*
//! atom       = number | string | "True" | "False" | "None"
//!            | "str" call-args | "(" expr ")" | id call-args?
//! ```
//!
//! Classes are registered as their definitions are parsed; a call on a name
//! declared as a class becomes `NewInstance`, and a parent class must be
//! declared before it is extended. Method parameter lists name the receiver
//! explicitly (`def bump(self)`), and the parser strips it — the runtime
//! binds `self` itself.

use std::collections::HashMap;
use std::rc::Rc;

use anyhow::{Result, anyhow, bail};

use crate::ast::Statement;
use crate::lexer::Lexer;
use crate::runtime::class::{Class, Method};
use crate::runtime::compare;
use crate::token::Token;

pub struct Parser {
    lexer: Lexer,
    classes: HashMap<String, Rc<Class>>,
}

impl Parser {
    pub fn new(lexer: Lexer) -> Self {
        Self {
            lexer,
            classes: HashMap::new(),
        }
    }

    pub fn parse_program(mut self) -> Result<Statement> {
        let mut statements = Vec::new();
        while *self.lexer.current() != Token::Eof {
            if self.consume_newlines() {
                continue;
            }
            statements.push(self.parse_statement()?);
        }
        Ok(Statement::Compound { statements })
    }

    fn parse_statement(&mut self) -> Result<Statement> {
        match self.lexer.current() {
            Token::Class => self.parse_class_definition(),
            Token::If => self.parse_if_else(),
            Token::Print => self.parse_print(),
            Token::Return => self.parse_return(),
            _ => self.parse_simple_statement(),
        }
    }

    fn parse_class_definition(&mut self) -> Result<Statement> {
        let name = self.lexer.expect_next_id()?.to_string();
        self.lexer.advance();

        let mut parent = None;
        if *self.lexer.current() == Token::Char('(') {
            let parent_name = self.lexer.expect_next_id()?.to_string();
            parent = Some(
                self.classes
                    .get(&parent_name)
                    .cloned()
                    .ok_or_else(|| anyhow!("Unknown parent class '{parent_name}'"))?,
            );
            self.lexer.expect_next(&Token::Char(')'))?;
            self.lexer.advance();
        }
        self.lexer.expect(&Token::Char(':'))?;
        self.lexer.expect_next(&Token::Newline)?;
        self.lexer.expect_next(&Token::Indent)?;
        self.lexer.advance();

        let mut methods = Vec::new();
        while *self.lexer.current() != Token::Dedent {
            if self.consume_newlines() {
                continue;
            }
            methods.push(self.parse_method()?);
        }
        self.lexer.expect(&Token::Dedent)?;
        self.lexer.advance();

        let class = Rc::new(Class::new(name.clone(), methods, parent));
        self.classes.insert(name, Rc::clone(&class));
        Ok(Statement::ClassDefinition { class })
    }

    fn parse_method(&mut self) -> Result<Method> {
        self.lexer.expect(&Token::Def)?;
        let name = self.lexer.expect_next_id()?.to_string();
        self.lexer.expect_next(&Token::Char('('))?;
        self.lexer.advance();

        let mut formal_params = Vec::new();
        if *self.lexer.current() != Token::Char(')') {
            loop {
                formal_params.push(self.lexer.expect_id()?.to_string());
                if *self.lexer.advance() != Token::Char(',') {
                    break;
                }
                self.lexer.advance();
            }
        }
        self.lexer.expect(&Token::Char(')'))?;
        self.lexer.expect_next(&Token::Char(':'))?;
        self.lexer.advance();
        // The receiver is bound by the runtime, not passed as an argument.
        if formal_params.first().map(String::as_str) == Some("self") {
            formal_params.remove(0);
        }

        let body = self.parse_suite()?;
        Ok(Method {
            name,
            formal_params,
            body: Statement::MethodBody {
                body: Box::new(body),
            },
        })
    }

    fn parse_suite(&mut self) -> Result<Statement> {
        self.lexer.expect(&Token::Newline)?;
        self.lexer.expect_next(&Token::Indent)?;
        self.lexer.advance();

        let mut statements = Vec::new();
        while *self.lexer.current() != Token::Dedent {
            if self.consume_newlines() {
                continue;
            }
            if *self.lexer.current() == Token::Eof {
                bail!("Unexpected end of input inside an indented block");
            }
            statements.push(self.parse_statement()?);
        }
        self.lexer.advance();
        Ok(Statement::Compound { statements })
    }

    fn parse_if_else(&mut self) -> Result<Statement> {
        self.lexer.advance();
        let condition = self.parse_expression()?;
        self.lexer.expect(&Token::Char(':'))?;
        self.lexer.advance();
        let if_body = self.parse_suite()?;

        let mut else_body = None;
        if *self.lexer.current() == Token::Else {
            self.lexer.expect_next(&Token::Char(':'))?;
            self.lexer.advance();
            else_body = Some(Box::new(self.parse_suite()?));
        }

        Ok(Statement::IfElse {
            condition: Box::new(condition),
            if_body: Box::new(if_body),
            else_body,
        })
    }

    fn parse_print(&mut self) -> Result<Statement> {
        self.lexer.advance();
        let mut args = Vec::new();
        if *self.lexer.current() != Token::Newline {
            loop {
                args.push(self.parse_expression()?);
                if *self.lexer.current() != Token::Char(',') {
                    break;
                }
                self.lexer.advance();
            }
        }
        self.lexer.expect(&Token::Newline)?;
        self.lexer.advance();
        Ok(Statement::Print { args })
    }

    fn parse_return(&mut self) -> Result<Statement> {
        self.lexer.advance();
        let statement = if *self.lexer.current() == Token::Newline {
            None
        } else {
            Some(Box::new(self.parse_expression()?))
        };
        self.lexer.expect(&Token::Newline)?;
        self.lexer.advance();
        Ok(Statement::Return { statement })
    }

    fn parse_simple_statement(&mut self) -> Result<Statement> {
        let expression = self.parse_expression()?;
        let statement = if *self.lexer.current() == Token::Char('=') {
            self.lexer.advance();
            let value = Box::new(self.parse_expression()?);
            match expression {
                Statement::VariableValue { mut dotted_ids } if dotted_ids.len() == 1 => {
                    Statement::Assignment {
                        var: dotted_ids.remove(0),
                        value,
                    }
                }
                Statement::VariableValue { mut dotted_ids } if dotted_ids.len() > 1 => {
                    let field = dotted_ids.pop().unwrap_or_default();
                    Statement::FieldAssignment {
                        object: Box::new(Statement::VariableValue { dotted_ids }),
                        field,
                        value,
                    }
                }
                _ => bail!("Invalid assignment target"),
            }
        } else {
            expression
        };
        self.lexer.expect(&Token::Newline)?;
        self.lexer.advance();
        Ok(statement)
    }

    fn parse_expression(&mut self) -> Result<Statement> {
        self.parse_or()
    }

    fn parse_or(&mut self) -> Result<Statement> {
        let mut node = self.parse_and()?;
        while *self.lexer.current() == Token::Or {
            self.lexer.advance();
            let rhs = self.parse_and()?;
            node = Statement::Or {
                lhs: Box::new(node),
                rhs: Box::new(rhs),
            };
        }
        Ok(node)
    }

    fn parse_and(&mut self) -> Result<Statement> {
        let mut node = self.parse_not()?;
        while *self.lexer.current() == Token::And {
            self.lexer.advance();
            let rhs = self.parse_not()?;
            node = Statement::And {
                lhs: Box::new(node),
                rhs: Box::new(rhs),
            };
        }
        Ok(node)
    }

    fn parse_not(&mut self) -> Result<Statement> {
        if *self.lexer.current() == Token::Not {
            self.lexer.advance();
            let argument = self.parse_not()?;
            return Ok(Statement::Not {
                argument: Box::new(argument),
            });
        }
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> Result<Statement> {
        let lhs = self.parse_additive()?;
        let comparator = match self.lexer.current() {
            Token::Eq => compare::equal,
            Token::NotEq => compare::not_equal,
            Token::Char('<') => compare::less,
            Token::Char('>') => compare::greater,
            Token::LessOrEq => compare::less_or_equal,
            Token::GreaterOrEq => compare::greater_or_equal,
            _ => return Ok(lhs),
        };
        self.lexer.advance();
        let rhs = self.parse_additive()?;
        Ok(Statement::Comparison {
            comparator,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        })
    }

    fn parse_additive(&mut self) -> Result<Statement> {
        let mut node = self.parse_multiplicative()?;
        loop {
            let add = match self.lexer.current() {
                Token::Char('+') => true,
                Token::Char('-') => false,
                _ => break,
            };
            self.lexer.advance();
            let rhs = Box::new(self.parse_multiplicative()?);
            let lhs = Box::new(node);
            node = if add {
                Statement::Add { lhs, rhs }
            } else {
                Statement::Sub { lhs, rhs }
            };
        }
        Ok(node)
    }

    fn parse_multiplicative(&mut self) -> Result<Statement> {
        let mut node = self.parse_postfix()?;
        loop {
            let mult = match self.lexer.current() {
                Token::Char('*') => true,
                Token::Char('/') => false,
                _ => break,
            };
            self.lexer.advance();
            let rhs = Box::new(self.parse_postfix()?);
            let lhs = Box::new(node);
            node = if mult {
                Statement::Mult { lhs, rhs }
            } else {
                Statement::Div { lhs, rhs }
            };
        }
        Ok(node)
    }

    fn parse_postfix(&mut self) -> Result<Statement> {
        let mut node = self.parse_atom()?;
        while *self.lexer.current() == Token::Char('.') {
            let name = self.lexer.expect_next_id()?.to_string();
            self.lexer.advance();
            if *self.lexer.current() == Token::Char('(') {
                let args = self.parse_call_args()?;
                node = Statement::MethodCall {
                    object: Some(Box::new(node)),
                    method: name,
                    args,
                };
            } else if let Statement::VariableValue { dotted_ids } = &mut node {
                dotted_ids.push(name);
            } else {
                bail!("Field access is only allowed on names, not on call results");
            }
        }
        Ok(node)
    }

    fn parse_atom(&mut self) -> Result<Statement> {
        match self.lexer.current() {
            Token::Number(value) => {
                let value = *value;
                self.lexer.advance();
                Ok(Statement::NumberConst(value))
            }
            Token::String(value) => {
                let value = value.clone();
                self.lexer.advance();
                Ok(Statement::StringConst(value))
            }
            Token::True => {
                self.lexer.advance();
                Ok(Statement::BoolConst(true))
            }
            Token::False => {
                self.lexer.advance();
                Ok(Statement::BoolConst(false))
            }
            Token::None => {
                self.lexer.advance();
                Ok(Statement::NoneConst)
            }
            Token::Char('(') => {
                self.lexer.advance();
                let expression = self.parse_expression()?;
                self.lexer.expect(&Token::Char(')'))?;
                self.lexer.advance();
                Ok(expression)
            }
            Token::Id(name) => {
                let name = name.clone();
                self.lexer.advance();
                if *self.lexer.current() != Token::Char('(') {
                    return Ok(Statement::VariableValue {
                        dotted_ids: vec![name],
                    });
                }
                let mut args = self.parse_call_args()?;
                if let Some(class) = self.classes.get(&name) {
                    return Ok(Statement::NewInstance {
                        class: Rc::clone(class),
                        args,
                    });
                }
                if name == "str" {
                    if args.len() > 1 {
                        bail!("str() takes at most one argument, got {}", args.len());
                    }
                    return Ok(Statement::Stringify {
                        argument: args.pop().map(Box::new),
                    });
                }
                bail!("'{name}' is not a class")
            }
            other => Err(anyhow!("Expected an expression, found {other}")),
        }
    }

    fn parse_call_args(&mut self) -> Result<Vec<Statement>> {
        self.lexer.expect(&Token::Char('('))?;
        self.lexer.advance();
        let mut args = Vec::new();
        if *self.lexer.current() != Token::Char(')') {
            loop {
                args.push(self.parse_expression()?);
                if *self.lexer.current() != Token::Char(',') {
                    break;
                }
                self.lexer.advance();
            }
        }
        self.lexer.expect(&Token::Char(')'))?;
        self.lexer.advance();
        Ok(args)
    }

    fn consume_newlines(&mut self) -> bool {
        let mut consumed = false;
        while *self.lexer.current() == Token::Newline {
            consumed = true;
            self.lexer.advance();
        }
        consumed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;

    fn parse(source: &str) -> Result<Statement> {
        let lexer = Lexer::new(source)?;
        Parser::new(lexer).parse_program()
    }

    fn parse_statements(source: &str) -> Vec<Statement> {
        match parse(source).expect("parse failed") {
            Statement::Compound { statements } => statements,
            other => panic!("expected a compound program, got {other:?}"),
        }
    }

    #[test]
    fn parses_assignment_with_operator_precedence() {
        let statements = parse_statements("x = 1 + 2 * 3\n");
        let [Statement::Assignment { var, value }] = statements.as_slice() else {
            panic!("expected a single assignment, got {statements:?}");
        };
        assert_eq!(var, "x");
        // Multiplication binds tighter than addition.
        let Statement::Add { lhs, rhs } = value.as_ref() else {
            panic!("expected addition at the top, got {value:?}");
        };
        assert!(matches!(lhs.as_ref(), Statement::NumberConst(1)));
        assert!(matches!(rhs.as_ref(), Statement::Mult { .. }));
    }

    #[test]
    fn parses_dotted_assignment_as_field_assignment() {
        let statements = parse_statements("a.b.c = 1\n");
        let [Statement::FieldAssignment { object, field, .. }] = statements.as_slice() else {
            panic!("expected a field assignment, got {statements:?}");
        };
        assert_eq!(field, "c");
        let Statement::VariableValue { dotted_ids } = object.as_ref() else {
            panic!("expected a dotted object path, got {object:?}");
        };
        assert_eq!(dotted_ids, &["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn parses_str_call_as_stringify() {
        let statements = parse_statements("print str(None), str()\n");
        let [Statement::Print { args }] = statements.as_slice() else {
            panic!("expected a print statement, got {statements:?}");
        };
        assert!(matches!(
            args[0],
            Statement::Stringify { argument: Some(_) }
        ));
        assert!(matches!(args[1], Statement::Stringify { argument: None }));
    }

    #[test]
    fn parses_class_with_methods_and_strips_self() {
        let source = indoc! {"
            class Point:
              def __init__(self, x, y):
                self.x = x
                self.y = y
              def norm(self):
                return self.x + self.y
            p = Point(1, 2)
        "};
        let statements = parse_statements(source);
        let [Statement::ClassDefinition { class }, Statement::Assignment { value, .. }] =
            statements.as_slice()
        else {
            panic!("expected class definition then assignment, got {statements:?}");
        };
        assert_eq!(class.name(), "Point");
        let init = class.get_method("__init__").expect("__init__ method");
        assert_eq!(init.formal_params, vec!["x".to_string(), "y".to_string()]);
        let norm = class.get_method("norm").expect("norm method");
        assert!(norm.formal_params.is_empty());
        assert!(matches!(norm.body, Statement::MethodBody { .. }));
        let Statement::NewInstance { class, args } = value.as_ref() else {
            panic!("expected NewInstance on a declared class, got {value:?}");
        };
        assert_eq!(class.name(), "Point");
        assert_eq!(args.len(), 2);
    }

    #[test]
    fn parses_inheritance_from_a_declared_parent() {
        let source = indoc! {"
            class A:
              def f(self):
                return 1
            class B(A):
              def g(self):
                return 2
        "};
        let statements = parse_statements(source);
        let Some(Statement::ClassDefinition { class }) = statements.last() else {
            panic!("expected a class definition, got {statements:?}");
        };
        assert_eq!(class.parent().expect("parent").name(), "A");
        assert!(class.get_method("f").is_some(), "inherited method missing");
    }

    #[test]
    fn rejects_an_undeclared_parent_class() {
        let error = parse("class B(Missing):\n  def f(self):\n    return 1\n")
            .expect_err("expected parse failure");
        assert!(error.to_string().contains("Unknown parent class"));
    }

    #[test]
    fn rejects_calling_an_undeclared_name() {
        let error = parse("x = Missing(1)\n").expect_err("expected parse failure");
        assert!(error.to_string().contains("is not a class"));
    }

    #[test]
    fn rejects_an_invalid_assignment_target() {
        let error = parse("1 = 2\n").expect_err("expected parse failure");
        assert!(error.to_string().contains("Invalid assignment target"));
    }

    #[test]
    fn parses_method_calls_on_call_results() {
        let source = indoc! {"
            class A:
              def twin(self):
                return A()
            x = A().twin()
        "};
        let statements = parse_statements(source);
        let Some(Statement::Assignment { value, .. }) = statements.last() else {
            panic!("expected an assignment, got {statements:?}");
        };
        let Statement::MethodCall { object, method, .. } = value.as_ref() else {
            panic!("expected a method call, got {value:?}");
        };
        assert_eq!(method, "twin");
        assert!(matches!(
            object.as_deref(),
            Some(Statement::NewInstance { .. })
        ));
    }

    #[test]
    fn rejects_field_access_on_a_call_result() {
        let source = indoc! {"
            class A:
              def f(self):
                return 1
            x = A().field
        "};
        let error = parse(source).expect_err("expected parse failure");
        assert!(
            error
                .to_string()
                .contains("Field access is only allowed on names")
        );
    }

    #[test]
    fn parses_logical_operators_with_not_binding_tightest() {
        let statements = parse_statements("x = not True and False or True\n");
        let [Statement::Assignment { value, .. }] = statements.as_slice() else {
            panic!("expected an assignment, got {statements:?}");
        };
        let Statement::Or { lhs, .. } = value.as_ref() else {
            panic!("expected `or` at the top, got {value:?}");
        };
        let Statement::And { lhs, .. } = lhs.as_ref() else {
            panic!("expected `and` under `or`, got {lhs:?}");
        };
        assert!(matches!(lhs.as_ref(), Statement::Not { .. }));
    }
}
