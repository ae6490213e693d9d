mod scanner_tests {
    use seqscript_core::Scanner;

    #[test]
    fn test_scanner_initialization() {
        let source = "var x = 5";
        let scanner = Scanner::new(source);

        assert_eq!(scanner.current, 0);
        assert!(!scanner.is_at_end());
        assert_eq!(scanner.position(), (1, 1));
    }

    #[test]
    fn test_scanner_advance() {
        let source = "abc";
        let mut scanner = Scanner::new(source);

        assert_eq!(scanner.advance(), Some('a'));
        assert_eq!(scanner.advance(), Some('b'));
        assert_eq!(scanner.advance(), Some('c'));
        assert_eq!(scanner.advance(), None);
        assert!(scanner.is_at_end());
    }

    #[test]
    fn test_scanner_line_tracking() {
        let source = "line1\nline2\nline3";
        let mut scanner = Scanner::new(source);

        // end of line 1
        for _ in 0..5 {
            scanner.advance();
        }
        assert_eq!(scanner.position(), (1, 6));

        // the new line moves to column 1 of the next line
        scanner.advance();
        assert_eq!(scanner.position(), (2, 1));
    }

    #[test]
    fn test_scanner_unread() {
        let source = "12.5";
        let mut scanner = Scanner::new(source);

        scanner.advance();
        scanner.advance();
        assert_eq!(scanner.advance(), Some('.'));

        assert!(scanner.unread());
        assert_eq!(scanner.peek(), Some('.'));
        assert_eq!(scanner.position(), (1, 3));
    }

    #[test]
    fn test_scanner_advance_if() {
        let source = "->";
        let mut scanner = Scanner::new(source);

        assert!(!scanner.advance_if('>'));
        assert!(scanner.advance_if('-'));
        assert!(scanner.advance_if('>'));
        assert!(scanner.is_at_end());
    }

    #[test]
    fn test_scanner_get_lexeme() {
        let source = "var x = 5";
        let scanner = Scanner::new(source);

        assert_eq!(scanner.get_lexeme(0, 3), "var");
        assert_eq!(scanner.get_lexeme(4, 5), "x");
        assert_eq!(scanner.get_lexeme(6, 7), "=");
        assert_eq!(scanner.get_lexeme(8, 9), "5");
    }
}
