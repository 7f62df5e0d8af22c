// tests/context_tests.rs

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use loglang::output::{dump_lines, snapshot_json};
use loglang::{Config, Context, DefineError, EvalError, Value};
use pretty_assertions::assert_eq;
use serde_json::json;

/// Registers `log(args...)`, which records its arguments joined by spaces.
fn recorder(ctx: &mut Context) -> Rc<RefCell<Vec<String>>> {
    let calls = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&calls);
    ctx.register_function("log", move |_ctx, args| {
        let rendered: Vec<String> = args.iter().map(Value::to_string).collect();
        sink.borrow_mut().push(rendered.join(" "));
        Ok(Value::Bool(true))
    });
    calls
}

/// Registers `tick()`, which counts its calls.
fn counter(ctx: &mut Context) -> Rc<Cell<usize>> {
    let count = Rc::new(Cell::new(0));
    let inner = Rc::clone(&count);
    ctx.register_function("tick", move |_ctx, _args| {
        inner.set(inner.get() + 1);
        Ok(Value::Bool(true))
    });
    count
}

// ============================================================================
// Data lines
// ============================================================================

#[test]
fn test_data_line_values() {
    let mut ctx = Context::new();
    ctx.feed("count 3");
    ctx.feed("load 0.5");
    ctx.feed("temp -3");
    ctx.feed("host db-1");

    assert_eq!(ctx.value("count"), Some(&Value::Int(3)));
    assert_eq!(ctx.value("load"), Some(&Value::Double(0.5)));
    assert_eq!(ctx.value("temp"), Some(&Value::Int(-3)));
    assert_eq!(ctx.value("host"), Some(&Value::from("db-1")));
}

#[test]
fn test_comments_and_blank_lines() {
    let mut ctx = Context::new();
    ctx.feed("a 1 # first sample");
    ctx.feed("# b 2");
    ctx.feed("   ");

    assert_eq!(ctx.value("a"), Some(&Value::Int(1)));
    assert_eq!(ctx.value("b"), None);
}

#[test]
fn test_key_without_value_ignored() {
    let mut ctx = Context::new();
    ctx.feed("lonely");
    assert_eq!(ctx.value("lonely"), None);
}

#[test]
fn test_last_changed_symbol() {
    let mut ctx = Context::new();
    ctx.feed("a 1");
    assert_eq!(ctx.value("%"), Some(&Value::from("a")));
    ctx.feed("b 1");
    assert_eq!(ctx.value("%"), Some(&Value::from("b")));

    // Unchanged value does not touch `%`
    ctx.feed("a 1");
    assert_eq!(ctx.value("%"), Some(&Value::from("b")));
}

#[test]
fn test_last_changed_does_not_run_programs() {
    let mut ctx = Context::new();
    ctx.feed(":echo n = %");
    ctx.feed("a 1");

    assert_eq!(ctx.value("n"), None);
    assert_eq!(ctx.value("%"), Some(&Value::from("a")));
}

#[test]
fn test_last_changed_readable_by_observers() {
    let mut ctx = Context::new();
    let calls = recorder(&mut ctx);
    ctx.feed(":who if a > 0 then log(%)");
    ctx.feed("a 1");
    ctx.feed("b 1");

    assert_eq!(*calls.borrow(), vec!["\"a\""]);
}

// ============================================================================
// Cascade
// ============================================================================

#[test]
fn test_end_to_end_alert() {
    let mut ctx = Context::new();
    ctx.feed(":alert a > 10");
    ctx.feed("a 11");
    assert_eq!(
        ctx.program("alert").unwrap().last_result(),
        Some(&Value::Bool(true))
    );

    ctx.feed("a 5");
    assert_eq!(
        ctx.program("alert").unwrap().last_result(),
        Some(&Value::Bool(false))
    );
}

#[test]
fn test_same_value_runs_observers_once() {
    let mut ctx = Context::new();
    let count = counter(&mut ctx);
    ctx.define_program("watch", "tick(a)").unwrap();

    ctx.feed("a 1");
    ctx.feed("a 1");
    assert_eq!(count.get(), 1);

    ctx.feed("a 2");
    assert_eq!(count.get(), 2);
}

#[test]
fn test_int_and_double_are_different_states() {
    let mut ctx = Context::new();
    let count = counter(&mut ctx);
    ctx.define_program("watch", "tick(a)").unwrap();

    ctx.set("a", Value::Int(1));
    ctx.set("a", Value::Double(1.0));
    assert_eq!(count.get(), 2);
}

#[test]
fn test_chained_programs() {
    let mut ctx = Context::new();
    ctx.feed(":p1 b = a + 1");
    ctx.feed(":p2 c = b * 10");
    ctx.feed("a 1");

    assert_eq!(ctx.value("b"), Some(&Value::Int(2)));
    assert_eq!(ctx.value("c"), Some(&Value::Int(20)));
}

#[test]
fn test_observers_run_in_subscription_order() {
    let mut ctx = Context::new();
    let calls = recorder(&mut ctx);
    ctx.define_program("first", "log(1, a)").unwrap();
    ctx.define_program("second", "log(2, a)").unwrap();

    ctx.feed("a 5");
    assert_eq!(*calls.borrow(), vec!["1 5", "2 5"]);
}

#[test]
fn test_duplicate_reference_subscribes_once() {
    let mut ctx = Context::new();
    let count = counter(&mut ctx);
    ctx.define_program("double", "tick(a + a)").unwrap();

    assert_eq!(ctx.symbol("a").unwrap().observers().len(), 1);
    ctx.feed("a 1");
    assert_eq!(count.get(), 1);
}

#[test]
fn test_assignment_target_is_not_a_dependency() {
    let mut ctx = Context::new();
    let count = counter(&mut ctx);
    ctx.define_program("p", "x = tick(a)").unwrap();

    ctx.feed("x 5");
    assert_eq!(count.get(), 0);
}

// ============================================================================
// Globs
// ============================================================================

#[test]
fn test_glob_subscribes_symbols_created_later() {
    let mut ctx = Context::new();
    ctx.feed(":total t = sum(cpu.*)");
    ctx.feed("cpu.0 1");
    ctx.feed("cpu.1 2");

    assert_eq!(ctx.value("t"), Some(&Value::Double(3.0)));
}

#[test]
fn test_glob_subscribes_existing_symbols() {
    let mut ctx = Context::new();
    ctx.feed("cpu.0 1");
    ctx.feed(":total t = sum(cpu.*)");
    ctx.feed("cpu.0 4");

    assert_eq!(ctx.value("t"), Some(&Value::Double(4.0)));
}

#[test]
fn test_glob_values_in_name_order() {
    let mut ctx = Context::new();
    ctx.feed("cpu.1 2");
    ctx.feed("cpu.0 1");
    ctx.feed("mem 3");

    assert_eq!(
        ctx.get_glob_values("cpu.*"),
        Value::List(vec![Value::Int(1), Value::Int(2)])
    );
    let names: Vec<&str> = ctx
        .symboltable_filter("cpu.?")
        .into_iter()
        .map(|symbol| symbol.name())
        .collect();
    assert_eq!(names, vec!["cpu.0", "cpu.1"]);
}

#[test]
fn test_glob_skips_unset_symbols() {
    let mut ctx = Context::new();
    ctx.get_value("cpu.9");
    ctx.feed("cpu.0 1");

    assert_eq!(ctx.get_glob_values("cpu.*"), Value::List(vec![Value::Int(1)]));
}

// ============================================================================
// Stateful forms
// ============================================================================

#[test]
fn test_edge_if_fires_on_transitions() {
    let mut ctx = Context::new();
    ctx.feed("hits 0");
    ctx.feed("drops 0");
    ctx.feed(":edge edge_if a > 10 then hits = hits + 1 else drops = drops + 1");

    ctx.feed("a 5"); // false, same as the initial state
    assert_eq!(ctx.value("hits"), Some(&Value::Int(0)));
    assert_eq!(ctx.value("drops"), Some(&Value::Int(0)));

    ctx.feed("a 11");
    ctx.feed("a 12");
    assert_eq!(ctx.value("hits"), Some(&Value::Int(1)));

    ctx.feed("a 3");
    assert_eq!(ctx.value("drops"), Some(&Value::Int(1)));

    ctx.feed("a 20");
    assert_eq!(ctx.value("hits"), Some(&Value::Int(2)));
}

#[test]
fn test_edge_if_neutral_result() {
    let mut ctx = Context::new();
    ctx.feed(":edge edge_if a > 10 then 1 else 2");
    ctx.feed("a 5");
    assert_eq!(ctx.program("edge").unwrap().last_result(), Some(&Value::neutral()));

    ctx.feed("a 11");
    assert_eq!(ctx.program("edge").unwrap().last_result(), Some(&Value::Int(1)));
}

#[test]
fn test_at_fires_when_watch_changes() {
    let mut ctx = Context::new();
    ctx.feed("rolls 0");
    ctx.feed(":roll at hour do rolls = rolls + 1");

    ctx.feed("hour 1");
    assert_eq!(ctx.value("rolls"), Some(&Value::Int(1)));

    ctx.feed("hour 2");
    assert_eq!(ctx.value("rolls"), Some(&Value::Int(2)));
}

#[test]
fn test_at_ignores_action_symbols() {
    let mut ctx = Context::new();
    let count = counter(&mut ctx);
    ctx.feed(":roll at hour do tick(load)");

    ctx.feed("load 1");
    ctx.feed("hour 1");
    ctx.feed("load 2");
    assert_eq!(count.get(), 1);
}

#[test]
fn test_at_neutral_when_watch_unchanged() {
    let mut ctx = Context::new();
    let count = counter(&mut ctx);
    ctx.feed("load 0");
    ctx.feed(":p { seen = load; at hour do tick() }");

    ctx.feed("hour 1");
    assert_eq!(count.get(), 1);
    assert_eq!(ctx.program("p").unwrap().last_result(), Some(&Value::Bool(true)));

    ctx.feed("load 1");
    ctx.feed("load 2");
    assert_eq!(count.get(), 1);
    assert_eq!(ctx.value("seen"), Some(&Value::Int(2)));
    assert_eq!(ctx.program("p").unwrap().last_result(), Some(&Value::neutral()));
}

#[test]
fn test_plain_if_evaluates_every_run() {
    let mut ctx = Context::new();
    ctx.feed(":p if a > 1 then x = 1 else x = 0");

    ctx.feed("a 2");
    assert_eq!(ctx.value("x"), Some(&Value::Int(1)));
    ctx.feed("a 0");
    assert_eq!(ctx.value("x"), Some(&Value::Int(0)));
}

#[test]
fn test_block_result_is_last_statement() {
    let mut ctx = Context::new();
    ctx.feed(":p { x = a; y = a * 2 }");
    ctx.feed("a 3");

    assert_eq!(ctx.program("p").unwrap().last_result(), Some(&Value::Int(6)));
}

// ============================================================================
// Program registry
// ============================================================================

#[test]
fn test_removed_program_no_longer_runs() {
    let mut ctx = Context::new();
    ctx.feed(":p x = a * 2");
    ctx.feed("a 2");
    assert_eq!(ctx.value("x"), Some(&Value::Int(4)));

    ctx.feed(":p");
    ctx.feed("a 3");
    assert_eq!(ctx.value("x"), Some(&Value::Int(4)));
    assert!(ctx.program("p").is_none());
    assert!(ctx.symbol("a").unwrap().observers().is_empty());
}

#[test]
fn test_removed_glob_program_no_longer_runs() {
    let mut ctx = Context::new();
    let count = counter(&mut ctx);
    ctx.feed(":p tick(cpu.*)");
    ctx.feed("cpu.0 1");
    ctx.feed(":p");
    ctx.feed("cpu.0 2");
    ctx.feed("cpu.1 2");

    assert_eq!(count.get(), 1);
}

#[test]
fn test_redefinition_replaces_program() {
    let mut ctx = Context::new();
    ctx.feed(":p x = a");
    ctx.feed(":p y = a");
    ctx.feed("a 1");

    assert_eq!(ctx.value("x"), None);
    assert_eq!(ctx.value("y"), Some(&Value::Int(1)));
    assert_eq!(ctx.program("p").unwrap().source(), "y = a");
}

#[test]
fn test_definition_key_split_on_tab() {
    let mut ctx = Context::new();
    ctx.feed(":k\tx = a");
    ctx.feed("a 1");

    assert!(ctx.program("k").is_some());
    assert_eq!(ctx.value("x"), Some(&Value::Int(1)));
}

#[test]
fn test_failed_redefinition_keeps_old_program() {
    let mut ctx = Context::new();
    ctx.define_program("p", "x = a").unwrap();
    assert!(matches!(
        ctx.define_program("p", "x = "),
        Err(DefineError::Parse { .. })
    ));

    ctx.feed("a 1");
    assert_eq!(ctx.value("x"), Some(&Value::Int(1)));
}

#[test]
fn test_define_errors() {
    let mut ctx = Context::new();
    assert!(matches!(ctx.define_program("", "1"), Err(DefineError::EmptyKey)));
    assert!(matches!(
        ctx.remove_program("missing"),
        Err(DefineError::UnknownProgram(key)) if key == "missing"
    ));
    assert!(matches!(
        ctx.try_feed(":p a +"),
        Err(DefineError::Parse { .. })
    ));
    assert!(ctx.program_keys().is_empty());
}

#[test]
fn test_program_introspection() {
    let mut ctx = Context::new();
    ctx.feed(":b y = a");
    ctx.feed(":a x = sum(cpu.*) + base");

    let program = ctx.program("a").unwrap();
    assert_eq!(program.key(), "a");
    let deps: Vec<&str> = program.dependencies().iter().map(String::as_str).collect();
    assert_eq!(deps, vec!["base", "cpu.*"]);
    assert_eq!(program.last_result(), None);
    assert_eq!(ctx.program_keys(), vec!["a", "b"]);
}

// ============================================================================
// Errors inside a cascade
// ============================================================================

#[test]
fn test_failing_program_does_not_stop_cascade() {
    let mut ctx = Context::new();
    ctx.feed(":bad x = nosuch(a)");
    ctx.feed(":good y = a");
    ctx.feed("a 1");

    assert_eq!(ctx.value("y"), Some(&Value::Int(1)));
    assert_eq!(ctx.program("bad").unwrap().last_result(), None);
}

#[test]
fn test_undefined_symbol_until_set() {
    let mut ctx = Context::new();
    ctx.feed(":p x = a + b");
    ctx.feed("a 1");
    assert_eq!(ctx.value("x"), None);

    ctx.feed("b 2");
    assert_eq!(ctx.value("x"), Some(&Value::Int(3)));
}

#[test]
fn test_run_program_reports_error() {
    let mut ctx = Context::new();
    let id = ctx.define_program("p", "x = missing + 1").unwrap();
    assert_eq!(
        ctx.run_program(id),
        Err(EvalError::UndefinedSymbol("missing".to_string()))
    );
}

#[test]
fn test_cascade_depth_limit() {
    let mut ctx = Context::with_config(Config::default().with_max_cascade_depth(Some(3)));
    ctx.feed(":p1 b = a + 1");
    ctx.feed(":p2 a = b + 1");
    ctx.feed("a 0");

    assert_eq!(ctx.value("a"), Some(&Value::Int(2)));
    assert_eq!(ctx.value("b"), Some(&Value::Int(3)));
}

#[test]
fn test_default_depth_limit_stops_block_cycle() {
    let mut ctx = Context::new();
    assert_eq!(ctx.config().max_cascade_depth, Some(64));
    ctx.feed(":p { x = a + 1; y = x * 2; a = y - x + 1 }");
    ctx.feed("a 0");

    assert!(matches!(ctx.value("a"), Some(Value::Int(_))));
    assert!(ctx.program("p").unwrap().last_result().is_some());
}

#[test]
fn test_without_builtins() {
    let mut ctx = Context::with_config(Config::default().with_builtins(false));
    assert!(!ctx.has_function("sum"));
    assert_eq!(
        ctx.call_function("sum", &[]),
        Err(EvalError::UnknownFunction("sum".to_string()))
    );
}

// ============================================================================
// Untrusted input
// ============================================================================

#[test]
fn test_feed_data_rejects_definitions() {
    let mut ctx = Context::new();
    ctx.feed_data(":p x = 1");
    ctx.feed_data("/.*/x = 1");
    ctx.feed_data("a 1");

    assert!(ctx.program("p").is_none());
    assert!(ctx.dispatcher().is_empty());
    assert_eq!(ctx.value("a"), Some(&Value::Int(1)));
}

#[test]
fn test_feed_data_still_dispatches_triggers() {
    let mut ctx = Context::new();
    ctx.feed(r"/^up (\w+)$/last_up = .1");
    ctx.feed_data("up db");

    assert_eq!(ctx.value("last_up"), Some(&Value::from("db")));
}

// ============================================================================
// Snapshots
// ============================================================================

#[test]
fn test_snapshot_json() {
    let mut ctx = Context::new();
    ctx.feed(":alert a > 10");
    ctx.feed("a 11");

    assert_eq!(
        snapshot_json(&ctx),
        json!({
            "symbols": { "a": 11 },
            "programs": {
                "alert": {
                    "source": "a > 10",
                    "dependencies": ["a"],
                    "last_result": true
                }
            }
        })
    );
}

#[test]
fn test_dump_lines() {
    let mut ctx = Context::new();
    ctx.feed("b 2.5");
    ctx.feed("a x");

    assert_eq!(dump_lines(&ctx), vec!["a \"x\"", "b 2.5"]);
}
