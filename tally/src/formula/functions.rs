//! Built-in and context functions

use super::{ContextFunction, Operand, Resolver};

/// Every function name the grammar accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Function {
    Max,
    Min,
    Sum,
    Avg,
    Round,
    Abs,
    Floor,
    Ceil,
    State,
    Owns,
    Phase,
    If,
}

impl Function {
    pub const ALL: [Function; 12] = [
        Function::Max,
        Function::Min,
        Function::Sum,
        Function::Avg,
        Function::Round,
        Function::Abs,
        Function::Floor,
        Function::Ceil,
        Function::State,
        Function::Owns,
        Function::Phase,
        Function::If,
    ];

    /// Case-insensitive lookup
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|f| f.name().eq_ignore_ascii_case(name))
    }

    pub fn name(&self) -> &'static str {
        match self {
            Function::Max => "max",
            Function::Min => "min",
            Function::Sum => "sum",
            Function::Avg => "avg",
            Function::Round => "round",
            Function::Abs => "abs",
            Function::Floor => "floor",
            Function::Ceil => "ceil",
            Function::State => "state",
            Function::Owns => "owns",
            Function::Phase => "phase",
            Function::If => "if",
        }
    }

    /// The capability the resolver must provide for this call, if any.
    ///
    /// `round` is only a context function in its zero-argument form.
    pub fn required_context(&self, argc: usize) -> Option<ContextFunction> {
        match self {
            Function::State => Some(ContextFunction::State),
            Function::Owns => Some(ContextFunction::Owns),
            Function::Phase => Some(ContextFunction::Phase),
            Function::Round if argc == 0 => Some(ContextFunction::Round),
            _ => None,
        }
    }
}

/// Comma-separated list of known function names, for suggestions
pub fn known_names() -> String {
    Function::ALL
        .iter()
        .map(|f| f.name())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Call a function with operands already popped from the stack.
///
/// Errors are plain messages; the evaluator attaches the span.
pub fn call(function: Function, args: &[Operand], resolver: &dyn Resolver) -> Result<f64, String> {
    match function {
        Function::Max => {
            let values = numbers(args, resolver);
            non_empty(function, &values)?;
            Ok(values.into_iter().fold(f64::NEG_INFINITY, f64::max))
        }
        Function::Min => {
            let values = numbers(args, resolver);
            non_empty(function, &values)?;
            Ok(values.into_iter().fold(f64::INFINITY, f64::min))
        }
        Function::Sum => Ok(numbers(args, resolver).into_iter().sum()),
        Function::Avg => {
            let values = numbers(args, resolver);
            non_empty(function, &values)?;
            Ok(values.iter().sum::<f64>() / values.len() as f64)
        }
        Function::Round => match args {
            [] => Ok(resolver.round_index().unwrap_or(0) as f64),
            [value] => Ok(round_to(value.resolve(resolver), 0.0)),
            [value, decimals] => Ok(round_to(value.resolve(resolver), decimals.resolve(resolver))),
            _ => Err(arity_message(function, "1 or 2", args.len())),
        },
        Function::Abs => single(function, args, resolver).map(f64::abs),
        Function::Floor => single(function, args, resolver).map(f64::floor),
        Function::Ceil => single(function, args, resolver).map(f64::ceil),
        Function::State => match args {
            [Operand::Reference(name)] => Ok(resolver
                .object_state(name)
                .map(|state| state.code())
                .unwrap_or(0.0)),
            [_] => Err("state() expects a reference such as {name}".to_string()),
            _ => Err(arity_message(function, "1", args.len())),
        },
        Function::Owns => {
            let (name, player) = match args {
                [Operand::Reference(name)] => (name, None),
                [Operand::Reference(name), player] => (name, Some(player_id(player))),
                [_] | [_, _] => {
                    return Err("owns() expects a reference such as {name}".to_string())
                }
                _ => return Err(arity_message(function, "1 or 2", args.len())),
            };
            Ok(if resolver.owns(name, player.as_deref()) {
                1.0
            } else {
                0.0
            })
        }
        Function::Phase => {
            if !args.is_empty() {
                return Err(arity_message(function, "0", args.len()));
            }
            Ok(if resolver.phase_id().is_some() { 1.0 } else { 0.0 })
        }
        Function::If => match args {
            [condition, when_true, when_false] => Ok(if condition.resolve(resolver) != 0.0 {
                when_true.resolve(resolver)
            } else {
                when_false.resolve(resolver)
            }),
            _ => Err(arity_message(function, "3", args.len())),
        },
    }
}

fn numbers(args: &[Operand], resolver: &dyn Resolver) -> Vec<f64> {
    args.iter().map(|arg| arg.resolve(resolver)).collect()
}

fn non_empty(function: Function, values: &[f64]) -> Result<(), String> {
    if values.is_empty() {
        return Err(format!("{}() needs at least one argument", function.name()));
    }
    Ok(())
}

fn single(function: Function, args: &[Operand], resolver: &dyn Resolver) -> Result<f64, String> {
    match args {
        [value] => Ok(value.resolve(resolver)),
        _ => Err(arity_message(function, "1", args.len())),
    }
}

fn arity_message(function: Function, expected: &str, got: usize) -> String {
    format!(
        "{}() takes {} argument(s), got {}",
        function.name(),
        expected,
        got
    )
}

/// Half away from zero at the given number of decimals
fn round_to(value: f64, decimals: f64) -> f64 {
    let factor = 10f64.powi(decimals.trunc() as i32);
    (value * factor).round() / factor
}

/// The player argument of `owns` is a reference naming the player, or a
/// numeric player id
fn player_id(operand: &Operand) -> String {
    match operand {
        Operand::Reference(name) => name.clone(),
        Operand::Number(n) if n.fract() == 0.0 => format!("{}", *n as i64),
        Operand::Number(n) => n.to_string(),
    }
}
