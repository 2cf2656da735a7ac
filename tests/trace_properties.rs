// Whole-trace properties: reference scenarios, loop step counts, bounds,
// determinism and persistence

use ctrace::{trace, RuntimeErrorKind, TraceResult, TraceStatus, Value};

const BUBBLE_SORT: &str = r#"#include <stdio.h>

int main() {
    int arr[5] = {5, 1, 4, 2, 8};
    int n = 5;
    for (int i = 0; i < n - 1; i++) {
        for (int j = 0; j < n - 1 - i; j++) {
            if (arr[j] > arr[j + 1]) {
                int tmp = arr[j];
                arr[j] = arr[j + 1];
                arr[j + 1] = tmp;
            }
        }
    }
    for (int i = 0; i < n; i++) {
        printf("%d ", arr[i]);
    }
    printf("\n");
    return 0;
}
"#;

const FACTORIAL: &str = r#"int factorial(int n) {
    if (n <= 1) {
        return 1;
    }
    return n * factorial(n - 1);
}

int main() {
    int result = factorial(5);
    printf("%d\n", result);
    return 0;
}
"#;

fn ints(values: &[i32]) -> Vec<Value> {
    values.iter().map(|n| Value::Int(*n)).collect()
}

#[test]
fn test_bubble_sort_final_state() {
    let result = trace(BUBBLE_SORT, "");
    assert!(result.is_completed(), "{:?}", result.status);

    let first = result
        .steps
        .iter()
        .find(|s| s.arrays.contains_key("arr"))
        .unwrap();
    assert_eq!(first.arrays["arr"].values(), ints(&[5, 1, 4, 2, 8]));
    assert_eq!(first.description, "declare int arr[5] = {5, 1, 4, 2, 8}");

    let last = result.last_step().unwrap();
    assert_eq!(last.arrays["arr"].values(), ints(&[1, 2, 4, 5, 8]));
    assert_eq!(&*last.console, "1 2 4 5 8 \n");
}

#[test]
fn test_division_by_zero_inside_loop() {
    let source = r#"int main() {
    int y = 3;
    int x = 0;
    for (int i = 0; i < 3; i++) {
        x = y / 0;
    }
    return 0;
}
"#;

    let result = trace(source, "");
    match &result.status {
        TraceStatus::RuntimeError {
            kind,
            line,
            step_index,
            message,
            ..
        } => {
            assert_eq!(*kind, RuntimeErrorKind::DivisionByZero);
            assert_eq!(*line, Some(5));
            assert_eq!(*step_index, result.steps.len());
            assert!(message.contains("division by zero"));
        }
        other => panic!("expected division by zero, got {:?}", other),
    }

    let descriptions: Vec<&str> = result.steps.iter().map(|s| s.description.as_str()).collect();
    assert_eq!(
        descriptions,
        vec![
            "enter main()",
            "declare int y = 3",
            "declare int x = 0",
            "loop condition i < 3 is true",
        ]
    );
    assert_eq!(result.last_step().unwrap().variables["x"].value, Value::Int(0));
}

#[test]
fn test_factorial_call_depth_and_result() {
    let result = trace(FACTORIAL, "");
    assert!(result.is_completed(), "{:?}", result.status);

    let deepest = result.steps.iter().map(|s| s.call_stack.len()).max();
    assert_eq!(deepest, Some(6));

    let outer_return = result
        .steps
        .iter()
        .find(|s| s.return_value == Some(Value::Int(120)))
        .expect("factorial(5) return step");
    assert_eq!(outer_return.call_stack.len(), 2);
    assert_eq!(outer_return.line, 5);
    assert_eq!(outer_return.variables["n"].value, Value::Int(5));

    let last = result.last_step().unwrap();
    assert_eq!(last.variables["result"].value, Value::Int(120));
    assert_eq!(&*last.console, "120\n");
    assert_eq!(last.call_stack.len(), 1);
}

#[test]
fn test_read_binds_stdin_token() {
    let source = r#"int main() {
    int x;
    scanf("%d", &x);
    int doubled = x * 2;
    return doubled;
}
"#;

    let result = trace(source, "7\n");
    assert!(result.is_completed(), "{:?}", result.status);

    let read_index = result
        .steps
        .iter()
        .position(|s| s.line == 3)
        .expect("step for the read");
    let read = &result.steps[read_index];
    assert_eq!(read.description, "read x = 7");
    assert_eq!(read.variables["x"].value, Value::Int(7));
    assert_eq!(result.steps[read_index - 1].variables["x"].value, Value::Undefined);
    assert_eq!(result.last_step().unwrap().return_value, Some(Value::Int(14)));
}

#[test]
fn test_read_reports_exhausted_input() {
    let source = r#"int main() {
    int a = 0;
    int b = 0;
    int got = scanf("%d %d", &a, &b);
    int again = scanf("%d", &a);
    return 0;
}
"#;

    let result = trace(source, "12");
    let last = result.last_step().unwrap();
    assert_eq!(last.variables["got"].value, Value::Int(1));
    assert_eq!(last.variables["again"].value, Value::Int(-1));
    assert_eq!(last.variables["a"].value, Value::Int(12));
    assert_eq!(last.variables["b"].value, Value::Int(0));
}

fn counting_loop(iterations: usize) -> TraceResult {
    let source = format!(
        r#"int main() {{
    int sum = 0;
    for (int i = 0; i < {}; i++) {{
        sum += i;
        sum += 1;
    }}
    return sum;
}}
"#,
        iterations
    );
    trace(&source, "")
}

#[test]
fn test_loop_step_count() {
    for n in [0usize, 1, 5] {
        let result = counting_loop(n);
        assert!(result.is_completed(), "{:?}", result.status);

        let conditions = result
            .steps
            .iter()
            .filter(|s| s.description.starts_with("loop condition"))
            .count();
        let body = result
            .steps
            .iter()
            .filter(|s| s.line == 4 || s.line == 5)
            .count();

        assert_eq!(conditions, n + 1, "condition steps for {} iterations", n);
        assert_eq!(body, 2 * n, "body steps for {} iterations", n);
    }

    // zero iterations: only the failing check
    let empty = counting_loop(0);
    let loop_steps: Vec<&str> = empty
        .steps
        .iter()
        .filter(|s| s.line == 3)
        .map(|s| s.description.as_str())
        .collect();
    assert_eq!(loop_steps, vec!["loop condition i < 0 is false"]);
}

#[test]
fn test_array_bounds() {
    let source = r#"int main() {
    int arr[4];
    arr[3] = 1;
    arr[4] = 2;
    return 0;
}
"#;

    let result = trace(source, "");
    match &result.status {
        TraceStatus::RuntimeError {
            kind,
            line,
            step_index,
            ..
        } => {
            assert_eq!(*kind, RuntimeErrorKind::IndexOutOfBounds);
            assert_eq!(*line, Some(4));
            assert_eq!(*step_index, 3);
        }
        other => panic!("expected index out of bounds, got {:?}", other),
    }
    assert_eq!(result.last_step().unwrap().description, "assign arr[3] = 1");
}

#[test]
fn test_bounds_through_decayed_parameter() {
    let source = r#"void fill(int a[], int n) {
    for (int i = 0; i <= n; i++) {
        a[i] = i;
    }
}

int main() {
    int data[3];
    fill(data, 3);
    return 0;
}
"#;

    let result = trace(source, "");
    match &result.status {
        TraceStatus::RuntimeError { kind, line, .. } => {
            assert_eq!(*kind, RuntimeErrorKind::IndexOutOfBounds);
            assert_eq!(*line, Some(3));
        }
        other => panic!("expected index out of bounds, got {:?}", other),
    }

    let last = result.last_step().unwrap();
    assert_eq!(last.call_stack.len(), 2);
    assert_eq!(last.description, "loop condition i <= n is true");
    assert_eq!(last.variables["i"].value, Value::Int(3));
}

#[test]
fn test_determinism() {
    let first = trace(BUBBLE_SORT, "").to_json().unwrap();
    let second = trace(BUBBLE_SORT, "").to_json().unwrap();
    assert_eq!(first, second);

    let first = trace(FACTORIAL, "").to_json().unwrap();
    let second = trace(FACTORIAL, "").to_json().unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_json_round_trip() {
    let source = r#"struct Node {
    int data;
    struct Node* next;
};

double scale = 0.1;

int main() {
    struct Node* head = (struct Node*)malloc(sizeof(struct Node));
    head->data = 3;
    head->next = NULL;
    double x = scale * 3;
    char c = 'q';
    printf("%.3f %c\n", x, c);
    return 0;
}
"#;

    let result = trace(source, "");
    assert!(result.is_completed(), "{:?}", result.status);

    let json = result.to_json().unwrap();
    let restored = TraceResult::from_json(&json).unwrap();
    assert_eq!(restored, result);

    let failed = trace("int main() {\n  int x = 1 / 0;\n}\n", "");
    let restored = TraceResult::from_json(&failed.to_json_pretty().unwrap()).unwrap();
    assert_eq!(restored, failed);
}
