// Copyright 2026 the Adapter Forms Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! A tour of the `adapter_forms` combinators.
//!
//! Set `RUST_LOG=debug` to watch forms being built, published and compiled.

use adapter_forms::combinators::{
    bind_to, branch_profile, counted_loop, guard, guarded_catch, identity, try_finally,
};
use adapter_forms::config::{self, EngineConfig};
use adapter_forms::{Adapter, ElemType, ErrorKind, MethodType, RefType, Thrown, Value, ValueType};

type Demo = Result<(), Box<dyn core::error::Error>>;

fn main() -> Demo {
    simple_logger::SimpleLogger::new()
        .with_level(log::LevelFilter::Info)
        .env()
        .init()?;

    if let Err(active) = config::install(EngineConfig::from_env()) {
        log::warn!("configuration already installed: {active:?}");
    }

    absolute_value()?;
    safe_division()?;
    joined_words()?;
    triangle_numbers()?;
    audited_call()?;
    Ok(())
}

fn int_fn(
    name: &str,
    ret: ValueType,
    arity: usize,
    f: impl Fn(&[i32]) -> Result<Value, Thrown> + Send + Sync + 'static,
) -> Adapter {
    Adapter::from_fn(
        name,
        MethodType::new(ret, vec![ValueType::INT; arity]),
        move |args| {
            let ints: Vec<i32> = args.iter().filter_map(Value::as_int).collect();
            f(&ints)
        },
    )
}

/// `guard` picks a branch per call and keeps a profile of the choices.
fn absolute_value() -> Demo {
    let is_negative = int_fn("isNegative", ValueType::BOOLEAN, 1, |v| Ok(Value::from(v[0] < 0)));
    let negate = int_fn("negate", ValueType::INT, 1, |v| Ok(Value::Int(v[0].wrapping_neg())));
    let abs = guard(&is_negative, &negate, &identity(ValueType::INT)?)?;
    for x in [-7, 3, -1, 0, 12, -40] {
        println!("abs({x}) = {}", abs.invoke(&[Value::Int(x)])?);
    }
    if let Some((taken, not_taken)) = branch_profile(&abs) {
        println!("abs took the negate branch {taken} times and skipped it {not_taken} times");
    }
    Ok(())
}

/// `guarded_catch` turns an arithmetic failure into a fallback value.
fn safe_division() -> Demo {
    let divide = int_fn("divide", ValueType::INT, 2, |v| match v {
        [_, 0] => Err(Thrown::new(ErrorKind::Arithmetic, "/ by zero")),
        [a, b] => Ok(Value::Int(a.wrapping_div(*b))),
        _ => Err(Thrown::new(ErrorKind::InternalError, "divide takes two ints")),
    });
    let fallback = Adapter::from_fn(
        "fallback",
        MethodType::new(ValueType::INT, vec![ValueType::ERROR]),
        |args| {
            if let Some(thrown) = args[0].as_thrown() {
                log::info!("recovered from {thrown}");
            }
            Ok(Value::Int(0))
        },
    );
    let safe = guarded_catch(&divide, ErrorKind::Arithmetic, &fallback)?;
    let halve = bind_to(&safe, Value::Int(100))?;
    for d in [4, 0, 7] {
        println!("100 / {d} = {}", halve.invoke(&[Value::Int(d)])?);
    }
    Ok(())
}

/// A varargs collector accepts any number of trailing strings.
fn joined_words() -> Demo {
    let strings = ValueType::Array(ElemType::Ref(RefType::Str));
    let join = Adapter::from_fn(
        "join",
        MethodType::new(ValueType::STRING, vec![ValueType::STRING, strings]),
        |args| {
            let sep = args[0].as_str().unwrap_or(" ");
            let words = args[1].as_array().map(|a| a.to_vec()).unwrap_or_default();
            let words: Vec<&str> = words.iter().filter_map(Value::as_str).collect();
            Ok(Value::string(&words.join(sep)))
        },
    );
    let join = join.as_varargs_collector(strings)?;
    let phrase = join.invoke_with_arguments(&[
        Value::string(" "),
        Value::string("adapters"),
        Value::string("all"),
        Value::string("the"),
        Value::string("way"),
        Value::string("down"),
    ])?;
    println!("{phrase}");
    Ok(())
}

/// `counted_loop` threads an accumulator through `n` body runs.
fn triangle_numbers() -> Demo {
    // (n, i, acc) => acc + i + 1
    let step = int_fn("step", ValueType::INT, 3, |v| {
        Ok(Value::Int(v[2].wrapping_add(v[1]).wrapping_add(1)))
    });
    let triangle = counted_loop(&identity(ValueType::INT)?, None, &step)?;
    let row: Vec<String> = (0..10)
        .map(|n| triangle.invoke(&[Value::Int(n)]).map(|v| v.to_string()))
        .collect::<Result<_, _>>()?;
    println!("triangle numbers: {}", row.join(", "));
    if let Some(form) = triangle.form() {
        println!("the loop runs form {} (compiled: {})", form.debug_name(), form.is_compiled());
    }
    Ok(())
}

/// `try_finally` runs cleanup on both the normal and the failing path.
fn audited_call() -> Demo {
    let check = int_fn("check", ValueType::INT, 1, |v| {
        if v[0] < 0 {
            Err(Thrown::new(ErrorKind::IllegalArgument, format!("{} is negative", v[0])))
        } else {
            Ok(Value::Int(v[0]))
        }
    });
    let audit = Adapter::from_fn(
        "audit",
        MethodType::new(ValueType::INT, vec![ValueType::ERROR, ValueType::INT, ValueType::INT]),
        |args| {
            match args[0].as_thrown() {
                Some(thrown) => log::warn!("check({}) failed: {thrown}", args[1]),
                None => log::info!("check({}) returned {}", args[1], args[2]),
            }
            Ok(args[2].clone())
        },
    );
    let audited = try_finally(&check, &audit)?;
    println!("audited(5) = {}", audited.invoke(&[Value::Int(5)])?);
    match audited.invoke(&[Value::Int(-5)]) {
        Ok(v) => println!("audited(-5) = {v}"),
        Err(thrown) => println!("audited(-5) raised {thrown}"),
    }
    Ok(())
}
