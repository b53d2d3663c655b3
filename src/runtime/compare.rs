//! Polymorphic comparison operators.
//!
//! `equal` and `less` carry the type dispatch; the remaining four are derived
//! from them. Class instances participate through user-defined `__eq__` and
//! `__lt__` methods taking one argument; everything else is a type error.

use crate::runtime::class::{ClassInstance, EQ_METHOD, LT_METHOD};
use crate::runtime::error::{RuntimeError, Signal};
use crate::runtime::object::{Context, ObjectHolder};

pub fn equal(
    lhs: &ObjectHolder,
    rhs: &ObjectHolder,
    context: &mut dyn Context,
) -> Result<bool, Signal> {
    if lhs.is_empty() && rhs.is_empty() {
        return Ok(true);
    }
    if let (Some(left), Some(right)) = (lhs.as_number(), rhs.as_number()) {
        return Ok(left == right);
    }
    if let (Some(left), Some(right)) = (lhs.as_string(), rhs.as_string()) {
        return Ok(left == right);
    }
    if let (Some(left), Some(right)) = (lhs.as_bool(), rhs.as_bool()) {
        return Ok(left == right);
    }
    if lhs
        .with_instance(|instance| instance.has_method(EQ_METHOD, 1))
        .unwrap_or(false)
    {
        let result = ClassInstance::call(lhs, EQ_METHOD, std::slice::from_ref(rhs), context)?;
        return result.as_bool().ok_or_else(|| {
            Signal::from(RuntimeError::ComparisonNotBoolean {
                method: EQ_METHOD.to_string(),
            })
        });
    }
    Err(RuntimeError::NotComparable {
        relation: "equality",
        lhs: lhs.type_name(),
        rhs: rhs.type_name(),
    }
    .into())
}

pub fn less(
    lhs: &ObjectHolder,
    rhs: &ObjectHolder,
    context: &mut dyn Context,
) -> Result<bool, Signal> {
    if let (Some(left), Some(right)) = (lhs.as_number(), rhs.as_number()) {
        return Ok(left < right);
    }
    if let (Some(left), Some(right)) = (lhs.as_string(), rhs.as_string()) {
        return Ok(left < right);
    }
    if let (Some(left), Some(right)) = (lhs.as_bool(), rhs.as_bool()) {
        return Ok(left < right);
    }
    if lhs
        .with_instance(|instance| instance.has_method(LT_METHOD, 1))
        .unwrap_or(false)
    {
        let result = ClassInstance::call(lhs, LT_METHOD, std::slice::from_ref(rhs), context)?;
        return result.as_bool().ok_or_else(|| {
            Signal::from(RuntimeError::ComparisonNotBoolean {
                method: LT_METHOD.to_string(),
            })
        });
    }
    Err(RuntimeError::NotComparable {
        relation: "ordering",
        lhs: lhs.type_name(),
        rhs: rhs.type_name(),
    }
    .into())
}

pub fn not_equal(
    lhs: &ObjectHolder,
    rhs: &ObjectHolder,
    context: &mut dyn Context,
) -> Result<bool, Signal> {
    Ok(!equal(lhs, rhs, context)?)
}

pub fn greater(
    lhs: &ObjectHolder,
    rhs: &ObjectHolder,
    context: &mut dyn Context,
) -> Result<bool, Signal> {
    Ok(!(less(lhs, rhs, context)? || equal(lhs, rhs, context)?))
}

pub fn less_or_equal(
    lhs: &ObjectHolder,
    rhs: &ObjectHolder,
    context: &mut dyn Context,
) -> Result<bool, Signal> {
    Ok(less(lhs, rhs, context)? || equal(lhs, rhs, context)?)
}

pub fn greater_or_equal(
    lhs: &ObjectHolder,
    rhs: &ObjectHolder,
    context: &mut dyn Context,
) -> Result<bool, Signal> {
    Ok(!less(lhs, rhs, context)?)
}
