mod fast_path_tests {
    use std::thread;
    use std::time::Duration;

    use seqscript_core::{
        CancellationToken, Diagnostic, DiagnosticBag, Evaluator, InterpreterConfig, Outcome,
        OutputSink, ScopeMode, parse,
    };

    fn execute(source: &str, config: InterpreterConfig) -> (String, Vec<Diagnostic>) {
        let mut bag = DiagnosticBag::new();
        let program = parse(source, &config, &mut bag);
        let mut output = String::new();
        Evaluator::new(config).execute(&program, &mut bag, &mut output);
        (output, bag.into_items())
    }

    fn assert_parity(source: &str, config: InterpreterConfig) {
        let fast = execute(source, config.with_fast_path(true));
        let slow = execute(source, config.with_fast_path(false));
        assert_eq!(fast, slow, "paths disagree on {:?}", source);
    }

    const PROGRAMS: &[&str] = &[
        "var x = {3, 5}\nvar y = map(x, i -> i*2)\nout y",
        "var x = {1, 3}\nvar y = reduce(x, 0, x y -> x+y)\nout y",
        "out map({1, 4}, i -> i / 2.0)",
        "out map({-3, 3}, i -> 6 / i)\nout 1",
        "out map({-2, 2}, i -> 2 ^ i)",
        "out map({1, 3}, i -> 1.5 ^ i)",
        "out map({1, 3}, i -> 2 ^ (i / 2.0))",
        "out map({1, 3}, i -> i * 9223372036854775807)",
        "out map({1, 3}, i -> -i - -1)",
        "out map({1, 5}, i -> (-1) ^ i)",
        "out reduce({1, 4}, 0.0, a b -> a + b)",
        "out reduce({1, 4}, 1, a b -> a * b / 2.0)",
        "out reduce({1, 4}, 100, v v -> v)",
        "out reduce(map({1, 4}, i -> i * 0.5), 0, a b -> a + b)",
        "out reduce({-2, 2}, 10, a b -> a / b)",
        "var k = 3\nout map({1, 3}, i -> i * k)\nout k",
        "var k = 2.5\nout reduce({1, 3}, k, a b -> a + b * k)",
        "var z = 1 / 0\nout map({1, 3}, i -> i + z)\nout z",
        "var z = 1 / 0\nout map({1, 0}, i -> i + z)\nout 2",
        "var z = 2 ^ -1\nvar w = z + 1\nout reduce({1, 3}, 0, a b -> a + w)",
        "var s = {1, 2}\nout map({1, 3}, i -> i * s)",
        "out map({1, 3}, i -> reduce({1, i}, 0, a b -> a + b))",
        "out map({1, 3}, i -> undefined + i)",
    ];

    #[test]
    fn test_fast_path_matches_tree_walk() {
        for source in PROGRAMS {
            assert_parity(source, InterpreterConfig::default());
        }
    }

    #[test]
    fn test_fast_path_matches_tree_walk_isolated() {
        let isolated = InterpreterConfig::default().with_scope_mode(ScopeMode::Isolated);
        for source in PROGRAMS {
            assert_parity(source, isolated);
        }
    }

    #[test]
    fn test_speculative_force_reports_once() {
        let source = "var z = 1 / 0\nout map({1, 3}, i -> i + z)\nout z";
        let (output, diagnostics) = execute(source, InterpreterConfig::default());

        assert_eq!(output, "");
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].message, "zero division");
        assert_eq!((diagnostics[0].line, diagnostics[0].column), (1, 11));
    }

    #[test]
    fn test_empty_sequence_never_forces_body_variables() {
        let source = "var z = 1 / 0\nout map({1, 0}, i -> i + z)";
        let (output, diagnostics) = execute(source, InterpreterConfig::default());

        assert_eq!(output, "\n");
        assert!(diagnostics.is_empty());
    }

    /// Cancels the run as soon as the first line is written.
    struct CancelAfterFirstLine {
        lines: Vec<String>,
        cancel: CancellationToken,
    }

    impl OutputSink for CancelAfterFirstLine {
        fn write_line(&mut self, line: &str) {
            self.lines.push(line.to_string());
            self.cancel.cancel();
        }
    }

    fn cancel_after_first_line(source: &str, config: InterpreterConfig) -> (Outcome, Vec<String>) {
        let cancel = CancellationToken::new();
        let mut bag = DiagnosticBag::new();
        let program = parse(source, &config, &mut bag);

        let mut sink = CancelAfterFirstLine {
            lines: vec![],
            cancel: cancel.clone(),
        };
        let outcome =
            Evaluator::with_cancellation(config, cancel).execute(&program, &mut bag, &mut sink);

        assert!(bag.is_empty(), "cancellation is not a diagnostic");
        (outcome, sink.lines)
    }

    #[test]
    fn test_cancelled_map_prints_nothing() {
        let source = "print \"first\"\nout map({1, 10000000}, i -> i * 2)\nout 1";

        for fast_path in [true, false] {
            let config = InterpreterConfig::default().with_fast_path(fast_path);
            let (outcome, lines) = cancel_after_first_line(source, config);

            assert_eq!(outcome, Outcome::Cancelled);
            assert_eq!(lines, vec!["first"]);
        }
    }

    #[test]
    fn test_cancelled_reduce_prints_nothing() {
        let source = "out 1\nout reduce({1, 1000000}, 0, a b -> a + b)\nprint \"never\"";
        let (outcome, lines) = cancel_after_first_line(source, InterpreterConfig::default());

        assert_eq!(outcome, Outcome::Cancelled);
        assert_eq!(lines, vec!["1"]);
    }

    #[test]
    fn test_statements_without_loops_are_not_interrupted() {
        // only map/reduce loops sample the token once the run has started
        let source = "print \"a\"\nprint \"b\"\nout 1 + 2";
        let (outcome, lines) = cancel_after_first_line(source, InterpreterConfig::default());

        assert_eq!(outcome, Outcome::Completed);
        assert_eq!(lines, vec!["a", "b", "3"]);
    }

    #[test]
    fn test_cancel_from_another_thread() {
        let config = InterpreterConfig::default();
        let mut bag = DiagnosticBag::new();
        let program = parse(
            "out map({1, 10000000}, i -> reduce({1, 1000}, i, a b -> a + b))\nout 1",
            &config,
            &mut bag,
        );

        let mut evaluator = Evaluator::new(config);
        let token = evaluator.cancellation();
        let canceller = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            token.cancel();
        });

        let mut output = String::new();
        let outcome = evaluator.execute(&program, &mut bag, &mut output);
        canceller.join().unwrap();

        assert_eq!(outcome, Outcome::Cancelled);
        assert_eq!(output, "");
        assert!(bag.is_empty());
    }

    #[test]
    fn test_token_reset_allows_next_run() {
        let config = InterpreterConfig::default();
        let mut bag = DiagnosticBag::new();
        let program = parse("out map({1, 3}, i -> i)", &config, &mut bag);

        let mut evaluator = Evaluator::new(config);
        evaluator.cancellation().cancel();

        let mut output = String::new();
        assert_eq!(
            evaluator.execute(&program, &mut bag, &mut output),
            Outcome::Cancelled
        );

        evaluator.cancellation().reset();
        assert_eq!(
            evaluator.execute(&program, &mut bag, &mut output),
            Outcome::Completed
        );
        assert_eq!(output, "1, 2, 3\n");
    }
}
