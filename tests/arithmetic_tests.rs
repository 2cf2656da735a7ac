use ctrace::{trace, RuntimeErrorKind, TraceStatus, Value};

fn run(source: &str) -> String {
    let result = trace(source, "");
    assert!(result.is_completed(), "run failed: {:?}", result.status);
    let console = result.last_step().map(|s| s.console.to_string()).unwrap_or_default();
    println!("Interpreter output:\n{}", console);
    console
}

#[test]
fn test_arithmetic_coercion() {
    let source = r#"
    int main() {
        char c = 'a';
        int i = 10;
        printf("Char + Int: %d\n", c + i);
        printf("Int - Char: %d\n", i - c);
        printf("Char * Int: %d\n", c * 2);
        printf("Char / Int: %d\n", c / 2);
        if (c == 97) {
            printf("Comparison Char == Int: OK\n");
        }
        if (97 == c) {
            printf("Comparison Int == Char: OK\n");
        }
        char d = c + 1;
        printf("Next char: %c\n", d);
        return 0;
    }
    "#;

    let out = run(source);
    assert!(out.contains("Char + Int: 107"));
    assert!(out.contains("Int - Char: -87"));
    assert!(out.contains("Char * Int: 194"));
    assert!(out.contains("Char / Int: 48"));
    assert!(out.contains("Comparison Char == Int: OK"));
    assert!(out.contains("Comparison Int == Char: OK"));
    assert!(out.contains("Next char: b"));
}

#[test]
fn test_pointer_arithmetic() {
    let source = r#"
    int main() {
        int arr[5];
        int *p = arr;     // p points to arr[0]
        int *p2 = p + 2;  // p2 points to arr[2]

        *p2 = 42;

        if (arr[2] == 42) {
             printf("Pointer Write OK\n");
        } else {
             printf("Pointer Write FAIL: %d\n", arr[2]);
        }

        int diff = p2 - p;
        printf("Diff elems: %d\n", diff);

        int *p3 = 2 + p;
        *p3 = 84;
        if (arr[2] == 84) {
             printf("Commutative Add OK\n");
        }

        int *p4 = p3 - 1;
        *p4 = 7;
        printf("Back one: %d\n", arr[1]);
        return 0;
    }
    "#;

    let out = run(source);
    assert!(out.contains("Pointer Write OK"));
    assert!(out.contains("Commutative Add OK"));
    assert!(out.contains("Diff elems: 2"));
    assert!(out.contains("Back one: 7"));
}

#[test]
fn test_integer_division_truncates() {
    let source = r#"
    int main() {
        printf("%d %d\n", 7 / 2, -7 / 2);
        printf("%d %d\n", 7 % 3, -7 % 2);
        return 0;
    }
    "#;

    let out = run(source);
    assert_eq!(out, "3 -3\n1 -1\n");
}

#[test]
fn test_casts_and_float_formatting() {
    let source = r#"
    int main() {
        double pi = 3.14159;
        int whole = (int)pi;
        double half = (double)7 / 2;
        printf("%d\n", whole);
        printf("%.2f\n", pi);
        printf("%f\n", half);
        printf("%5.1f|\n", half);
        return 0;
    }
    "#;

    let out = run(source);
    assert_eq!(out, "3\n3.14\n3.500000\n  3.5|\n");
}

#[test]
fn test_compound_assignment() {
    let source = r#"
    int main() {
        int x = 10;
        x += 5;
        x -= 3;
        x *= 2;
        x /= 4;
        x %= 4;
        printf("%d\n", x);
        return x;
    }
    "#;

    let result = trace(source, "");
    assert!(result.is_completed(), "{:?}", result.status);
    let descriptions: Vec<&str> = result
        .steps
        .iter()
        .filter(|s| s.description.starts_with("assign"))
        .map(|s| s.description.as_str())
        .collect();
    assert_eq!(
        descriptions,
        vec![
            "assign x = 15",
            "assign x = 12",
            "assign x = 24",
            "assign x = 6",
            "assign x = 2",
        ]
    );
    assert_eq!(&*result.last_step().unwrap().console, "2\n");
}

#[test]
fn test_integer_overflow_wraps() {
    let source = r#"
    int main() {
        int big = 2147483647;
        int wrapped = big + 1;
        printf("%d\n", wrapped);
        return 0;
    }
    "#;

    assert_eq!(run(source), "-2147483648\n");
}

#[test]
fn test_modulo_by_zero() {
    let source = "int main() {\n    int a = 5;\n    int b = a % 0;\n    return b;\n}\n";
    let result = trace(source, "");
    match result.status {
        TraceStatus::RuntimeError { kind, line, .. } => {
            assert_eq!(kind, RuntimeErrorKind::DivisionByZero);
            assert_eq!(line, Some(3));
        }
        other => panic!("expected division by zero, got {:?}", other),
    }
}

#[test]
fn test_float_division_by_zero() {
    let source = "int main() {\n    double a = 1.5;\n    double b = a / 0.0;\n    return 0;\n}\n";
    let result = trace(source, "");
    assert!(matches!(
        result.status,
        TraceStatus::RuntimeError {
            kind: RuntimeErrorKind::DivisionByZero,
            ..
        }
    ));
    assert_eq!(
        result.last_step().unwrap().variables["a"].value,
        Value::Float(1.5)
    );
}

#[test]
fn test_int_min_literal() {
    let source = r#"
    int main() {
        int lowest = -2147483648;
        int below = lowest - 1;
        printf("%d %d\n", lowest, below);
        return 0;
    }
    "#;

    assert_eq!(run(source), "-2147483648 2147483647\n");
}
