//! Tests for the step protocol itself

use super::helpers::{load, new_scope};
use crate::interpreter::executor::{run_until_done, step, Control, Step, Val, Vm};

const WORKFLOW: &str = r#"function score(v) {
    if v % 2 == 0 { return v * 10; }
    return v;
}
total = 0;
i = 0;
while i < 4 {
    total = total + score(i);
    i = i + 1;
}
n = 0;
do {
    n = n + 1;
} while n < 3;
attempts = 0;
retry 2 {
    attempts = attempts + 1;
    if attempts < 2 { throw "again"; }
} while false;
try {
    throw "boom";
} catch {
    caught = __error;
}
summary = "total=" + total;"#;

#[test]
fn test_one_at_a_time_matches_drain() {
    let program = load(WORKFLOW);

    let mut drained = new_scope();
    Vm::from_program(&program, &mut drained).run().unwrap();

    let mut stepped = new_scope();
    let mut count = 0;
    {
        let mut vm = Vm::from_program(&program, &mut stepped);
        while let Some(item) = vm.next() {
            item.unwrap();
            count += 1;
        }
        assert!(vm.is_done());
    }

    assert!(count > 0);
    assert_eq!(drained.globals(), stepped.globals());
    assert_eq!(stepped.get("total"), Val::Int(24));
    assert_eq!(stepped.get("n"), Val::Int(3));
    assert_eq!(stepped.get("attempts"), Val::Int(2));
    assert_eq!(stepped.get("caught"), Val::Str("boom".to_string()));
    assert_eq!(stepped.get("summary"), Val::Str("total=24".to_string()));
}

#[test]
fn test_markers_stay_inside_the_program_span() {
    let program = load(WORKFLOW);
    let last_line = WORKFLOW.lines().count();
    let mut scope = new_scope();

    let markers: Vec<_> = Vm::from_program(&program, &mut scope)
        .collect::<Result<_, _>>()
        .unwrap();

    let first = markers.first().unwrap();
    let last = markers.last().unwrap();
    assert_eq!(first.line, 1);
    assert_eq!(last.line, last_line);
    assert_eq!(last.next_line, last_line);
    for marker in &markers {
        assert!((1..=last_line).contains(&marker.line), "{:?}", marker);
        assert!((1..=last_line).contains(&marker.next_line), "{:?}", marker);
    }
}

#[test]
fn test_each_marker_points_at_the_next_one() {
    // Holds while nothing raises; a raise jumps to its handler
    let source = r#"function score(v) {
    if v % 2 == 0 { return v * 10; }
    return v;
}
i = 0;
while i < 3 {
    if score(i) > 5 {
        big = i;
    } else if i == 1 {
        one = i;
    } else {
        small = i;
    }
    i = i + 1;
}
do {
    i = i - 1;
} while i > 0;
retry 3 {
    i = i + 1;
} while i < 2;
try {
    done = true;
} catch {
    done = false;
}"#;
    let program = load(source);
    let mut scope = new_scope();

    let markers: Vec<_> = Vm::from_program(&program, &mut scope)
        .collect::<Result<_, _>>()
        .unwrap();

    for pair in markers.windows(2) {
        assert_eq!(pair[0].next_line, pair[1].line, "{:?} -> {:?}", pair[0], pair[1]);
    }
}

#[test]
fn test_step_reports_continue_yield_and_done() {
    let program = load("a = 1;");
    let mut scope = new_scope();
    let mut vm = Vm::new(program.body.clone(), &mut scope);

    let mut yields = 0;
    loop {
        match step(&mut vm) {
            Step::Continue => {}
            Step::Yield(marker) => {
                yields += 1;
                assert_eq!(marker.line, 1);
            }
            Step::Done => break,
        }
    }
    assert_eq!(yields, 1);
    assert_eq!(vm.control, Control::None);
    assert!(vm.frames.is_empty());
}

#[test]
fn test_run_until_done_leaves_uncaught_error_in_control() {
    let program = load("throw \"late\";");
    let mut scope = new_scope();
    let mut vm = Vm::new(program.body.clone(), &mut scope);

    run_until_done(&mut vm);
    assert!(matches!(vm.control, Control::Throw(_)));
    assert_eq!(vm.take_error().map(|e| e.message()), Some("late".to_string()));
    assert_eq!(vm.control, Control::None);
}

#[test]
fn test_stopping_early_keeps_call_scopes_balanced() {
    let source = r#"function f(x) { return x + 1; }
a = f(1);
b = f(2);
c = f(3);"#;
    let program = load(source);
    let mut scope = new_scope();

    {
        let mut vm = Vm::from_program(&program, &mut scope);
        vm.next().unwrap().unwrap();
        vm.next().unwrap().unwrap();
    }

    assert_eq!(scope.active_calls(), 0);
    assert_eq!(scope.get("a"), Val::Int(2));
    assert_eq!(scope.lookup("b"), None);
}
