use sqlcode_core::{Dialect, Scanner, TokenKind};

fn scan_all(dialect: Dialect, input: &str) -> Vec<(TokenKind, String)> {
    let mut scanner = Scanner::new(dialect, None, input.as_bytes());
    let mut tokens = Vec::new();
    while scanner.kind() != TokenKind::Eof {
        tokens.push((scanner.kind(), scanner.text().to_string()));
        scanner.advance();
    }
    tokens
}

fn kinds(dialect: Dialect, input: &str) -> Vec<TokenKind> {
    scan_all(dialect, input)
        .into_iter()
        .map(|(kind, _)| kind)
        .collect()
}

fn significant(dialect: Dialect, input: &str) -> Vec<(TokenKind, String)> {
    scan_all(dialect, input)
        .into_iter()
        .filter(|(kind, _)| *kind != TokenKind::Whitespace)
        .collect()
}

#[test]
fn tokens_tile_the_input() {
    let input = "create procedure [code].Foo as\nbegin\n  select 'it''s' + 1 -- note\nend\n";
    let mut scanner = Scanner::new(Dialect::Mssql, None, input.as_bytes());
    let mut rebuilt = String::new();
    while scanner.kind() != TokenKind::Eof {
        assert_eq!(
            scanner.text(),
            &input[scanner.start_offset()..scanner.stop_offset()]
        );
        rebuilt.push_str(scanner.text());
        scanner.advance();
    }
    assert_eq!(rebuilt, input);
}

#[test]
fn stop_equals_start_of_next_token() {
    let input = "select 1, 'two' from [t]";
    let mut scanner = Scanner::new(Dialect::Mssql, None, input.as_bytes());
    let mut previous_stop = scanner.start_offset();
    while scanner.kind() != TokenKind::Eof {
        assert_eq!(scanner.start_offset(), previous_stop);
        assert!(scanner.start_offset() <= scanner.stop_offset());
        previous_stop = scanner.stop_offset();
        scanner.advance();
    }
    assert_eq!(previous_stop, input.len());
}

#[test]
fn doubled_quotes_are_escapes() {
    let tokens = significant(Dialect::Mssql, "[a]]b] 'it''s'");
    assert_eq!(
        tokens,
        vec![
            (TokenKind::QuotedIdentifier, "[a]]b]".to_string()),
            (TokenKind::MssqlString, "'it''s'".to_string()),
        ]
    );
}

#[test]
fn reserved_words_are_recognized_case_insensitively() {
    let mut scanner = Scanner::new(Dialect::Mssql, None, b"SeLeCt");
    assert_eq!(scanner.kind(), TokenKind::ReservedWord);
    assert_eq!(scanner.reserved(), Some("select"));
    assert_eq!(scanner.lowercase_text(), "select");
}

#[test]
fn variables_numbers_and_punctuation() {
    let tokens = significant(Dialect::Mssql, "@EnumX = -1.5e3, (7); x.y");
    assert_eq!(
        tokens,
        vec![
            (TokenKind::VariableIdentifier, "@EnumX".to_string()),
            (TokenKind::Equals, "=".to_string()),
            (TokenKind::Number, "-1.5e3".to_string()),
            (TokenKind::Comma, ",".to_string()),
            (TokenKind::LeftParen, "(".to_string()),
            (TokenKind::Number, "7".to_string()),
            (TokenKind::RightParen, ")".to_string()),
            (TokenKind::Semicolon, ";".to_string()),
            (TokenKind::UnquotedIdentifier, "x".to_string()),
            (TokenKind::Dot, ".".to_string()),
            (TokenKind::UnquotedIdentifier, "y".to_string()),
        ]
    );
}

#[test]
fn minus_without_digit_is_not_a_number() {
    let tokens = significant(Dialect::Mssql, "a - b");
    assert_eq!(tokens[1], (TokenKind::Other, "-".to_string()));
}

#[test]
fn go_alone_on_a_line_is_a_batch_separator() {
    let tokens = significant(Dialect::Mssql, "select 1\ngo\nselect 2");
    let separators = tokens
        .iter()
        .filter(|(kind, _)| *kind == TokenKind::BatchSeparator)
        .count();
    assert_eq!(separators, 1);
}

#[test]
fn go_is_case_insensitive_and_may_be_indented() {
    let tokens = significant(Dialect::Mssql, "select 1\n   GO   \nselect 2");
    assert!(
        tokens
            .iter()
            .any(|(kind, text)| *kind == TokenKind::BatchSeparator && text == "GO")
    );
}

#[test]
fn trailing_tokens_after_go_are_malformed() {
    let tokens = significant(Dialect::Mssql, "go trailer /*c*/");
    assert_eq!(
        tokens,
        vec![
            (TokenKind::BatchSeparator, "go".to_string()),
            (TokenKind::MalformedBatchSeparator, "trailer".to_string()),
            (TokenKind::MalformedBatchSeparator, "/*c*/".to_string()),
        ]
    );
}

#[test]
fn newline_resets_the_separator_state() {
    let tokens = significant(Dialect::Mssql, "go\ngo");
    assert!(
        tokens
            .iter()
            .all(|(kind, _)| *kind == TokenKind::BatchSeparator)
    );
}

#[test]
fn go_mid_line_is_a_plain_identifier() {
    let tokens = significant(Dialect::Mssql, "select go");
    assert_eq!(tokens[1], (TokenKind::UnquotedIdentifier, "go".to_string()));
}

#[test]
fn go_inside_strings_and_comments_never_separates() {
    let tokens = significant(Dialect::Mssql, "'go'\n/* go */\n-- go\nselect 1");
    assert!(
        tokens
            .iter()
            .all(|(kind, _)| *kind != TokenKind::BatchSeparator)
    );
}

#[test]
fn pragma_comments_are_classified() {
    let tokens = kinds(Dialect::Mssql, "--sqlcode:include-if foo\n-- plain\n");
    assert_eq!(tokens[0], TokenKind::Pragma);
    assert!(tokens.contains(&TokenKind::SingleLineComment));
}

#[test]
fn multiline_comments_nest() {
    let tokens = significant(Dialect::Mssql, "/* a /* b */ c */ select");
    assert_eq!(tokens[0].0, TokenKind::MultiLineComment);
    assert_eq!(tokens[0].1, "/* a /* b */ c */");
    assert_eq!(tokens[1].0, TokenKind::ReservedWord);
}

#[test]
fn unterminated_runs_produce_error_tokens() {
    assert_eq!(
        kinds(Dialect::Mssql, "'abc"),
        vec![TokenKind::UnterminatedString]
    );
    assert_eq!(
        kinds(Dialect::Mssql, "[abc"),
        vec![TokenKind::UnterminatedIdentifier]
    );
}

#[test]
fn double_quotes_are_rejected_in_the_mssql_dialect() {
    let tokens = kinds(Dialect::Mssql, "\"x\"");
    assert_eq!(
        tokens,
        vec![
            TokenKind::UnsupportedDoubleQuote,
            TokenKind::UnquotedIdentifier,
            TokenKind::UnsupportedDoubleQuote,
        ]
    );
}

#[test]
fn postgres_scans_double_quoted_identifiers_and_dollar_strings() {
    let tokens = significant(Dialect::Postgres, "\"Name\" $$ body $$ $tag$ x $tag$ 'str'");
    assert_eq!(
        tokens,
        vec![
            (TokenKind::QuotedIdentifier, "\"Name\"".to_string()),
            (TokenKind::PgDollarString, "$$ body $$".to_string()),
            (TokenKind::PgDollarString, "$tag$ x $tag$".to_string()),
            (TokenKind::PgString, "'str'".to_string()),
        ]
    );
}

#[test]
fn dialect_string_kinds_project_onto_the_shared_kind() {
    assert_eq!(TokenKind::MssqlString.shared(), TokenKind::StringLiteral);
    assert_eq!(TokenKind::PgString.shared(), TokenKind::StringLiteral);
    assert_eq!(TokenKind::PgDollarString.shared(), TokenKind::StringLiteral);
    assert_eq!(TokenKind::Number.shared(), TokenKind::Number);
}

#[test]
fn invalid_utf8_yields_one_error_token_then_eof() {
    let mut scanner = Scanner::new(Dialect::Mssql, None, b"ok \xff\xfe");
    let mut seen = Vec::new();
    for _ in 0..8 {
        seen.push(scanner.kind());
        if scanner.kind() == TokenKind::Eof {
            break;
        }
        scanner.advance();
    }
    assert_eq!(
        seen,
        vec![
            TokenKind::UnquotedIdentifier,
            TokenKind::Whitespace,
            TokenKind::NotUtf8,
            TokenKind::Eof,
        ]
    );
}

#[test]
fn positions_are_one_indexed_lines_and_byte_columns() {
    let mut scanner = Scanner::new(Dialect::Mssql, None, "ab\n  cd".as_bytes());
    assert_eq!((scanner.start().line, scanner.start().col), (1, 1));
    scanner.advance();
    assert_eq!((scanner.start().line, scanner.start().col), (1, 3));
    scanner.advance();
    assert_eq!((scanner.start().line, scanner.start().col), (2, 3));
    assert_eq!(scanner.text(), "cd");
}

#[test]
fn cloning_supports_lookahead_without_shared_state() {
    let mut scanner = Scanner::new(Dialect::Mssql, None, b"create procedure x");
    let mut look = scanner.clone();
    look.advance_significant();
    assert_eq!(look.reserved(), Some("procedure"));
    assert_eq!(scanner.reserved(), Some("create"));
    scanner.advance_significant();
    assert_eq!(scanner.reserved(), Some("procedure"));
}
