//! Tree-walking executor.
//!
//! Every AST node evaluates itself against a closure (the active lexical
//! scope) and a host context. Control flow for `return` rides the `Signal`
//! channel and is unwound by `MethodBody`; everything else propagates as a
//! `RuntimeError`.

use crate::ast::Statement;
use crate::runtime::class::{ClassInstance, ADD_METHOD, INIT_METHOD};
use crate::runtime::error::{ExecResult, RuntimeError, Signal};
use crate::runtime::object::{
    write_output, write_output_newline, Closure, Context, ObjectHolder, StreamContext, Value,
};

/// Executes a complete program against a fresh top-level scope. A `return`
/// signal escaping the top level is a runtime error.
pub fn run(program: &Statement, context: &mut dyn Context) -> Result<(), RuntimeError> {
    let mut globals = Closure::new();
    match program.execute(&mut globals, context) {
        Ok(_) => Ok(()),
        Err(Signal::Failure(error)) => Err(error),
        Err(Signal::Return(_)) => Err(RuntimeError::ReturnOutsideMethod),
    }
}

impl Statement {
    pub fn execute(&self, closure: &mut Closure, context: &mut dyn Context) -> ExecResult {
        match self {
            Statement::VariableValue { dotted_ids } => lookup_dotted(dotted_ids, closure),
            Statement::NumberConst(value) => Ok(ObjectHolder::own(Value::Number(*value))),
            Statement::StringConst(value) => {
                Ok(ObjectHolder::own(Value::String(value.clone())))
            }
            Statement::BoolConst(value) => Ok(ObjectHolder::own(Value::Bool(*value))),
            Statement::NoneConst => Ok(ObjectHolder::none()),

            Statement::Stringify { argument } => {
                let Some(argument) = argument else {
                    return Ok(ObjectHolder::own(Value::String("None".to_string())));
                };
                let result = argument.execute(closure, context)?;
                if result.is_empty() {
                    return Ok(ObjectHolder::own(Value::String("None".to_string())));
                }
                let mut capture = StreamContext::new(Vec::new());
                result.print(&mut capture)?;
                let text = String::from_utf8_lossy(&capture.into_inner()).into_owned();
                Ok(ObjectHolder::own(Value::String(text)))
            }

            Statement::Add { lhs, rhs } => {
                let lhs = lhs.execute(closure, context)?;
                let rhs = rhs.execute(closure, context)?;
                if let (Some(left), Some(right)) = (lhs.as_number(), rhs.as_number()) {
                    return Ok(ObjectHolder::own(Value::Number(left + right)));
                }
                if let (Some(left), Some(right)) = (lhs.as_string(), rhs.as_string()) {
                    return Ok(ObjectHolder::own(Value::String(left + &right)));
                }
                if lhs
                    .with_instance(|instance| instance.has_method(ADD_METHOD, 1))
                    .unwrap_or(false)
                {
                    return ClassInstance::call(
                        &lhs,
                        ADD_METHOD,
                        std::slice::from_ref(&rhs),
                        context,
                    );
                }
                Err(unsupported_operands("+", &lhs, &rhs))
            }
            Statement::Sub { lhs, rhs } => {
                let lhs = lhs.execute(closure, context)?;
                let rhs = rhs.execute(closure, context)?;
                let (left, right) = numeric_operands(&lhs, &rhs, "-")?;
                Ok(ObjectHolder::own(Value::Number(left - right)))
            }
            Statement::Mult { lhs, rhs } => {
                let lhs = lhs.execute(closure, context)?;
                let rhs = rhs.execute(closure, context)?;
                let (left, right) = numeric_operands(&lhs, &rhs, "*")?;
                Ok(ObjectHolder::own(Value::Number(left * right)))
            }
            Statement::Div { lhs, rhs } => {
                let lhs = lhs.execute(closure, context)?;
                let rhs = rhs.execute(closure, context)?;
                let (left, right) = numeric_operands(&lhs, &rhs, "/")?;
                if right == 0 {
                    return Err(RuntimeError::DivisionByZero.into());
                }
                Ok(ObjectHolder::own(Value::Number(left / right)))
            }

            Statement::Or { lhs, rhs } => {
                // Short-circuits on a truthy left operand.
                let lhs = lhs.execute(closure, context)?;
                if lhs.is_true() {
                    return Ok(ObjectHolder::own(Value::Bool(true)));
                }
                let rhs = rhs.execute(closure, context)?;
                Ok(ObjectHolder::own(Value::Bool(rhs.is_true())))
            }
            Statement::And { lhs, rhs } => {
                // Both operands are always evaluated; `and` does not
                // short-circuit.
                let lhs = lhs.execute(closure, context)?;
                let rhs = rhs.execute(closure, context)?;
                Ok(ObjectHolder::own(Value::Bool(lhs.is_true() && rhs.is_true())))
            }
            Statement::Not { argument } => {
                let result = argument.execute(closure, context)?;
                Ok(ObjectHolder::own(Value::Bool(!result.is_true())))
            }
            Statement::Comparison {
                comparator,
                lhs,
                rhs,
            } => {
                let lhs = lhs.execute(closure, context)?;
                let rhs = rhs.execute(closure, context)?;
                let result = comparator(&lhs, &rhs, context)?;
                Ok(ObjectHolder::own(Value::Bool(result)))
            }

            Statement::NewInstance { class, args } => {
                let instance = ObjectHolder::own(Value::Instance(ClassInstance::new(
                    std::rc::Rc::clone(class),
                )));
                let has_init = instance
                    .with_instance(|instance| instance.has_method(INIT_METHOD, args.len()))
                    .unwrap_or(false);
                if has_init {
                    let mut arg_values = Vec::with_capacity(args.len());
                    for arg in args {
                        arg_values.push(arg.execute(closure, context)?);
                    }
                    ClassInstance::call(&instance, INIT_METHOD, &arg_values, context)?;
                }
                Ok(instance)
            }

            Statement::MethodCall {
                object,
                method,
                args,
            } => {
                let Some(object) = object else {
                    return Ok(ObjectHolder::none());
                };
                let receiver = object.execute(closure, context)?;
                if !receiver.is_instance() {
                    return Ok(ObjectHolder::none());
                }
                let mut arg_values = Vec::with_capacity(args.len());
                for arg in args {
                    arg_values.push(arg.execute(closure, context)?);
                }
                ClassInstance::call(&receiver, method, &arg_values, context)
            }

            Statement::Assignment { var, value } => {
                let value = value.execute(closure, context)?;
                closure.insert(var.clone(), value.clone());
                Ok(value)
            }
            Statement::FieldAssignment {
                object,
                field,
                value,
            } => {
                let target = object.execute(closure, context)?;
                if target.is_empty() {
                    return Ok(ObjectHolder::none());
                }
                let stored = value.execute(closure, context)?;
                let updated = target.with_instance_mut(|instance| {
                    instance.fields_mut().insert(field.clone(), stored.clone());
                });
                if updated.is_none() {
                    return Err(RuntimeError::FieldOnNonInstance {
                        field: field.clone(),
                        type_name: target.type_name(),
                    }
                    .into());
                }
                Ok(stored)
            }

            Statement::Print { args } => {
                for (index, arg) in args.iter().enumerate() {
                    if index > 0 {
                        write_output(context, " ")?;
                    }
                    let value = arg.execute(closure, context)?;
                    value.print(context)?;
                }
                write_output_newline(context)?;
                Ok(ObjectHolder::none())
            }

            Statement::Compound { statements } => {
                for statement in statements {
                    statement.execute(closure, context)?;
                }
                Ok(ObjectHolder::none())
            }
            Statement::Return { statement } => {
                let value = match statement {
                    Some(statement) => statement.execute(closure, context)?,
                    None => ObjectHolder::none(),
                };
                Err(Signal::Return(value))
            }
            Statement::IfElse {
                condition,
                if_body,
                else_body,
            } => {
                let condition = condition.execute(closure, context)?;
                if condition.is_true() {
                    if_body.execute(closure, context)
                } else if let Some(else_body) = else_body {
                    else_body.execute(closure, context)
                } else {
                    Ok(ObjectHolder::none())
                }
            }
            Statement::ClassDefinition { class } => {
                closure.insert(
                    class.name().to_string(),
                    ObjectHolder::own(Value::Class(std::rc::Rc::clone(class))),
                );
                Ok(ObjectHolder::none())
            }
            Statement::MethodBody { body } => match body.execute(closure, context) {
                Ok(_) => Ok(ObjectHolder::none()),
                Err(Signal::Return(value)) => Ok(value),
                Err(failure) => Err(failure),
            },
        }
    }
}

/// Resolves `a.b.c` by walking scopes: the closure first, then the fields of
/// each class instance met along the way. A non-instance value leaves the
/// active scope unchanged for the next component.
fn lookup_dotted(dotted_ids: &[String], closure: &Closure) -> ExecResult {
    if dotted_ids.is_empty() {
        return Err(RuntimeError::EmptyVariablePath.into());
    }
    let mut scope_object: Option<ObjectHolder> = None;
    let mut result = ObjectHolder::none();
    for id in dotted_ids {
        let found = match &scope_object {
            None => closure.get(id).cloned(),
            Some(holder) => holder
                .with_instance(|instance| instance.fields().get(id).cloned())
                .flatten(),
        };
        let found = found.ok_or_else(|| RuntimeError::UndefinedVariable { name: id.clone() })?;
        if found.is_instance() {
            scope_object = Some(found.clone());
        }
        result = found;
    }
    Ok(result)
}

fn numeric_operands(
    lhs: &ObjectHolder,
    rhs: &ObjectHolder,
    operation: &'static str,
) -> Result<(i32, i32), Signal> {
    match (lhs.as_number(), rhs.as_number()) {
        (Some(left), Some(right)) => Ok((left, right)),
        _ => Err(unsupported_operands(operation, lhs, rhs)),
    }
}

fn unsupported_operands(
    operation: &'static str,
    lhs: &ObjectHolder,
    rhs: &ObjectHolder,
) -> Signal {
    RuntimeError::UnsupportedOperandTypes {
        operation,
        lhs: lhs.type_name(),
        rhs: rhs.type_name(),
    }
    .into()
}
