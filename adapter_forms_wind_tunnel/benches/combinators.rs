// Copyright 2026 the Adapter Forms Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};

use adapter_forms::combinators::{
    bind_to, counted_loop, guard_with_profile, spread, varargs_array,
};
use adapter_forms::compile::ClosureCompiler;
use adapter_forms::species::species_for;
use adapter_forms::{Adapter, Array, ElemType, MethodType, Primitive, Value, ValueType};

/// Entry point for `adapter_forms` wind-tunnel benchmarks.
///
/// Each scenario isolates one cost: interpreting a form against running its compiled code,
/// guard dispatch, array spreading and collecting, loops and the shared form caches.
fn bench_combinators(c: &mut Criterion) {
    bench_interpret_vs_compiled(c);
    bench_guard_dispatch(c);
    bench_varargs_array(c);
    bench_spread(c);
    bench_counted_loop(c);
    bench_cache_hits(c);
}

fn add3() -> Adapter {
    Adapter::from_fn(
        "add3",
        MethodType::new(ValueType::INT, vec![ValueType::INT; 3]),
        |args| {
            let sum = args.iter().filter_map(Value::as_int).fold(0_i32, i32::wrapping_add);
            Ok(Value::Int(sum))
        },
    )
}

fn int_identity() -> Adapter {
    Adapter::from_fn(
        "id",
        MethodType::new(ValueType::INT, vec![ValueType::INT]),
        |args| Ok(args[0].clone()),
    )
}

/// One bound-argument form run through the names interpreter and through the closure compiler.
fn bench_interpret_vs_compiled(c: &mut Criterion) {
    let bound = bind_to(&add3(), Value::Int(7)).unwrap();
    let form = bound.form().unwrap();
    let args = [Value::from(bound.clone()), Value::Int(1), Value::Int(2)];
    let code = form.compile_with(&ClosureCompiler::default()).unwrap();

    let mut group = c.benchmark_group("bind_form");
    group.bench_function("interpret", |b| {
        b.iter(|| form.interpret(black_box(&args)).unwrap());
    });
    group.bench_function("compiled", |b| {
        b.iter(|| code.call(black_box(&args)).unwrap());
    });
    group.finish();
}

/// Guard dispatch with and without a branch profile, alternating branches.
fn bench_guard_dispatch(c: &mut Criterion) {
    let is_even = Adapter::from_fn(
        "isEven",
        MethodType::new(ValueType::BOOLEAN, vec![ValueType::INT]),
        |args| Ok(Value::from(args[0].as_int().is_some_and(|v| v % 2 == 0))),
    );
    let negate = Adapter::from_fn(
        "negate",
        MethodType::new(ValueType::INT, vec![ValueType::INT]),
        |args| Ok(Value::Int(args[0].as_int().unwrap_or(0).wrapping_neg())),
    );
    let mut group = c.benchmark_group("guard");
    for profiled in [false, true] {
        let g = guard_with_profile(&is_even, &negate, &int_identity(), profiled).unwrap();
        group.bench_with_input(BenchmarkId::new("profiled", profiled), &g, |b, g| {
            let mut v = 0_i32;
            b.iter(|| {
                v = v.wrapping_add(1);
                g.invoke(&[Value::Int(black_box(v))]).unwrap()
            });
        });
    }
    group.finish();
}

/// Collecting `n` loose arguments into an `Object[]`.
///
/// Beyond ten arguments the collector switches to chunked filling, which shows up as a step.
fn bench_varargs_array(c: &mut Criterion) {
    let mut group = c.benchmark_group("varargs_array");
    for &n in &[2_usize, 10, 11, 40, 200] {
        let collector = varargs_array(n).unwrap();
        let args: Vec<Value> = (0..n).map(|i| Value::string(&i.to_string())).collect();
        group.bench_with_input(BenchmarkId::from_parameter(n), &args, |b, args| {
            b.iter(|| collector.invoke(black_box(args)).unwrap());
        });
    }
    group.finish();
}

/// Spreading an `int[]` over the three parameters of a target.
fn bench_spread(c: &mut Criterion) {
    let spread3 = spread(&add3(), ValueType::INT_ARRAY, 0, 3).unwrap();
    let array = Array::from_values(
        ElemType::Prim(Primitive::Int),
        vec![Value::Int(1), Value::Int(2), Value::Int(3)],
    )
    .map(Value::from)
    .unwrap();
    c.bench_function("spread_int_array", |b| {
        b.iter(|| spread3.invoke(black_box(core::slice::from_ref(&array))).unwrap());
    });
}

/// A counted loop `(n)int` summing its counter, for growing trip counts.
fn bench_counted_loop(c: &mut Criterion) {
    let body = Adapter::from_fn(
        "accumulate",
        MethodType::new(ValueType::INT, vec![ValueType::INT; 3]),
        |args| {
            let i = args[1].as_int().unwrap_or(0);
            let acc = args[2].as_int().unwrap_or(0);
            Ok(Value::Int(acc.wrapping_add(i)))
        },
    );
    let sum = counted_loop(&int_identity(), None, &body).unwrap();
    let mut group = c.benchmark_group("counted_loop");
    for &n in &[1_i32, 16, 256] {
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, &n| {
            b.iter(|| sum.invoke(&[Value::Int(black_box(n))]).unwrap());
        });
    }
    group.finish();
}

/// Steady-state cost of building adapters whose forms and species are already published.
fn bench_cache_hits(c: &mut Criterion) {
    let target = add3();
    let _warm = bind_to(&target, Value::Int(0)).unwrap();
    let mut group = c.benchmark_group("cache_hit");
    group.bench_function("bind_to", |b| {
        b.iter(|| bind_to(&target, Value::Int(black_box(1))).unwrap());
    });
    group.bench_function("species_for", |b| {
        b.iter(|| species_for(black_box("LLIJ")));
    });
    group.finish();
}

criterion_group!(benches, bench_combinators);
criterion_main!(benches);
