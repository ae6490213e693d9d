mod lexer_tests {
    use seqscript_core::frontend::lexer::LexError;
    use seqscript_core::{Lexer, Scanner, Token, TokenType};

    fn types(source: &str) -> Vec<TokenType> {
        Lexer::tokenize(source)
            .unwrap()
            .iter()
            .map(|token| token.ty)
            .collect()
    }

    #[test]
    fn test_lexer_keywords() {
        let source = "var map reduce print out";
        let lexer = Lexer::from(Scanner::new(source));

        let tokens: Vec<_> = lexer.collect::<Result<_, _>>().unwrap();

        assert_eq!(tokens.len(), 5);
        let expected = [
            TokenType::Var,
            TokenType::Map,
            TokenType::Reduce,
            TokenType::Print,
            TokenType::Out,
        ];
        for (token, ty) in tokens.iter().zip(expected) {
            assert_eq!(token.ty, ty, "unexpected token {:?}", token);
        }
    }

    #[test]
    fn test_lexer_punctuation_columns() {
        let tokens = Lexer::tokenize("(){},=").unwrap();

        assert_eq!(
            tokens,
            vec![
                Token::new(TokenType::LParen, "(", 1, 1),
                Token::new(TokenType::RParen, ")", 1, 2),
                Token::new(TokenType::LCurly, "{", 1, 3),
                Token::new(TokenType::RCurly, "}", 1, 4),
                Token::new(TokenType::Comma, ",", 1, 5),
                Token::new(TokenType::Eq, "=", 1, 6),
            ]
        );
    }

    #[test]
    fn test_lexer_strings() {
        let tokens = Lexer::tokenize("\"qwe\" \"asd\nzxc\" \"\"").unwrap();

        let texts: Vec<_> = tokens.iter().map(|t| t.lexeme.as_str()).collect();
        assert_eq!(texts, vec!["qwe", "asd\nzxc", ""]);
        assert!(tokens.iter().all(|t| t.ty == TokenType::String));

        // the second literal closes on line 2, so the one after it starts there
        assert_eq!(tokens[1].line, 1);
        assert_eq!(tokens[2].line, 2);
    }

    #[test]
    fn test_lexer_numbers() {
        let tokens = Lexer::tokenize("123 456.789").unwrap();

        assert_eq!(tokens[0].ty, TokenType::Int);
        assert_eq!(tokens[0].lexeme, "123");
        assert_eq!(tokens[1].ty, TokenType::Float);
        assert_eq!(tokens[1].lexeme, "456.789");
    }

    #[test]
    fn test_lexer_minus_is_always_an_operator() {
        assert_eq!(
            types("-5 x-1 i -> i"),
            vec![
                TokenType::Sub,
                TokenType::Int,
                TokenType::Id,
                TokenType::Sub,
                TokenType::Int,
                TokenType::Id,
                TokenType::Arrow,
                TokenType::Id,
            ]
        );
    }

    #[test]
    fn test_lexer_line_column_tracking() {
        let source = "var x = 42\nvar y = map(x, i -> i * 2)\nout y";
        let tokens = Lexer::tokenize(source).unwrap();

        assert_eq!((tokens[0].line, tokens[0].column), (1, 1));

        let map = tokens.iter().find(|t| t.ty == TokenType::Map).unwrap();
        assert_eq!((map.line, map.column), (2, 9));

        let out = tokens.iter().find(|t| t.ty == TokenType::Out).unwrap();
        assert_eq!((out.line, out.column), (3, 1));
    }

    #[test]
    fn test_lexer_errors() {
        assert_eq!(
            Lexer::tokenize("var x = 1.2.3"),
            Err(LexError::MalformedNumber {
                text: "1.2.3".into(),
                line: 1,
                column: 9,
            })
        );
        assert_eq!(
            Lexer::tokenize("print \"unterminated"),
            Err(LexError::UnterminatedString { line: 1, column: 7 })
        );
        assert!(matches!(
            Lexer::tokenize("out 1 % 2"),
            Err(LexError::UnexpectedCharacter { found: '%', .. })
        ));
    }

    #[test]
    fn test_lexer_continues_after_error() {
        let items: Vec<_> = Lexer::new("out @ 1").collect();

        assert_eq!(items.len(), 3);
        assert!(items[1].is_err());
        assert_eq!(items[2].as_ref().unwrap().lexeme, "1");
    }

    #[test]
    fn test_complex_program() {
        let source = r#"
            var n = 500
            var sequence = map({0, n}, i -> (-1)^i / (2.0 * i + 1))
            var pi = 4 * reduce(sequence, 0, x y -> x + y)
            print "pi = "
            out pi
        "#;

        let tokens = Lexer::tokenize(source).unwrap();

        let count = |ty: TokenType| tokens.iter().filter(|t| t.ty == ty).count();
        assert_eq!(count(TokenType::Var), 3);
        assert_eq!(count(TokenType::Map), 1);
        assert_eq!(count(TokenType::Reduce), 1);
        assert_eq!(count(TokenType::Arrow), 2);
        assert_eq!(count(TokenType::Float), 1);

        let strings: Vec<_> = tokens.iter().filter(|t| t.ty == TokenType::String).collect();
        assert_eq!(strings.len(), 1);
        assert_eq!(strings[0].lexeme, "pi = ");
    }
}
