use logos::Logos;

use crate::ast::Span;

#[derive(Logos, Debug, PartialEq, Clone)]
#[logos(skip r"[ \t\r\n]+")]
#[logos(skip(r"//[^\n]*", allow_greedy = true))]
pub enum Token {
    // Keywords
    #[token("let")]
    Let,
    #[token("if")]
    If,
    #[token("while")]
    While,
    #[token("break")]
    Break,
    #[token("return")]
    Return,
    #[token("true")]
    True,
    #[token("false")]
    False,

    // Operators: two-character forms win by longest match
    #[token("==")]
    EqEq,
    #[token("!=")]
    NotEq,
    #[token("<=")]
    LessEq,
    #[token(">=")]
    GreaterEq,
    #[token("<")]
    Less,
    #[token(">")]
    Greater,
    #[token("=")]
    Assign,
    #[token("!")]
    Bang,
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,
    #[token("%")]
    Percent,

    // Punctuation
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token(";")]
    Semi,

    // Literals; a digit run that overflows i64 is rejected as a lex error
    #[regex(r"[0-9]+", |lex| lex.slice().parse::<i64>().ok())]
    Int(i64),

    #[regex(r"[A-Za-z_][A-Za-z0-9_]*", |lex| lex.slice().to_string())]
    Ident(String),
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Token::Let => "'let'",
            Token::If => "'if'",
            Token::While => "'while'",
            Token::Break => "'break'",
            Token::Return => "'return'",
            Token::True => "'true'",
            Token::False => "'false'",
            Token::EqEq => "'=='",
            Token::NotEq => "'!='",
            Token::LessEq => "'<='",
            Token::GreaterEq => "'>='",
            Token::Less => "'<'",
            Token::Greater => "'>'",
            Token::Assign => "'='",
            Token::Bang => "'!'",
            Token::Plus => "'+'",
            Token::Minus => "'-'",
            Token::Star => "'*'",
            Token::Slash => "'/'",
            Token::Percent => "'%'",
            Token::LBrace => "'{'",
            Token::RBrace => "'}'",
            Token::LParen => "'('",
            Token::RParen => "')'",
            Token::Semi => "';'",
            Token::Int(n) => return write!(f, "integer {}", n),
            Token::Ident(name) => return write!(f, "identifier '{}'", name),
        };
        f.write_str(s)
    }
}

/// Lex source code into a stream of tokens with byte spans.
/// Stops at the first character that cannot start a token.
pub fn lex(source: &str) -> Result<Vec<(Token, Span)>, LexError> {
    let mut lexer = Token::lexer(source);
    let mut tokens = Vec::new();

    while let Some(result) = lexer.next() {
        let range = lexer.span();
        let span = Span { start: range.start, end: range.end };
        match result {
            Ok(token) => tokens.push((token, span)),
            Err(()) => {
                let snippet = source[range].to_string();
                return Err(LexError {
                    position: span.start,
                    suggestion: suggest_fix(&snippet),
                    snippet,
                });
            }
        }
    }

    tracing::debug!(count = tokens.len(), "lexed source");
    Ok(tokens)
}

fn suggest_fix(bad: &str) -> String {
    if bad.chars().all(|c| c.is_ascii_digit()) {
        format!("Integer literal '{}' does not fit in a 64-bit signed integer", bad)
    } else if bad == "&" || bad == "|" {
        "There are no logical operators; nest 'if' statements instead".to_string()
    } else if bad.starts_with('"') || bad.starts_with('\'') {
        "Arc has no strings; values are integers and booleans".to_string()
    } else {
        format!("Unexpected character(s): '{}'", bad)
    }
}

#[derive(Debug, thiserror::Error)]
#[error("Lex error at position {position}: illegal character '{snippet}'. {suggestion}")]
pub struct LexError {
    pub position: usize,
    pub snippet: String,
    pub suggestion: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<Token> {
        lex(source).unwrap().into_iter().map(|(t, _)| t).collect()
    }

    #[test]
    fn lex_let_statement() {
        assert_eq!(
            kinds("let a = 5"),
            vec![Token::Let, Token::Ident("a".into()), Token::Assign, Token::Int(5)]
        );
    }

    #[test]
    fn keywords_win_over_identifiers() {
        assert_eq!(
            kinds("while whilex breaks break"),
            vec![
                Token::While,
                Token::Ident("whilex".into()),
                Token::Ident("breaks".into()),
                Token::Break,
            ]
        );
    }

    #[test]
    fn two_char_operators_longest_match() {
        assert_eq!(
            kinds("a==b != c<=d>=e<f>g=!h"),
            vec![
                Token::Ident("a".into()),
                Token::EqEq,
                Token::Ident("b".into()),
                Token::NotEq,
                Token::Ident("c".into()),
                Token::LessEq,
                Token::Ident("d".into()),
                Token::GreaterEq,
                Token::Ident("e".into()),
                Token::Less,
                Token::Ident("f".into()),
                Token::Greater,
                Token::Ident("g".into()),
                Token::Assign,
                Token::Bang,
                Token::Ident("h".into()),
            ]
        );
    }

    #[test]
    fn booleans_and_punctuation() {
        assert_eq!(
            kinds("{ (true) false; }"),
            vec![
                Token::LBrace,
                Token::LParen,
                Token::True,
                Token::RParen,
                Token::False,
                Token::Semi,
                Token::RBrace,
            ]
        );
    }

    #[test]
    fn comments_and_newlines_skipped() {
        let source = "// header\nlet x = 1 // trailing\nreturn x\n";
        assert_eq!(
            kinds(source),
            vec![
                Token::Let,
                Token::Ident("x".into()),
                Token::Assign,
                Token::Int(1),
                Token::Return,
                Token::Ident("x".into()),
            ]
        );
    }

    #[test]
    fn spans_cover_lexemes() {
        let source = "let total = 42";
        let tokens = lex(source).unwrap();
        let (_, span) = &tokens[1];
        assert_eq!(&source[span.start..span.end], "total");
        let (_, span) = &tokens[3];
        assert_eq!(&source[span.start..span.end], "42");
    }

    #[test]
    fn illegal_character_reports_position() {
        let err = lex("let a = 5 $ 3").unwrap_err();
        assert_eq!(err.position, 10);
        assert_eq!(err.snippet, "$");
    }

    #[test]
    fn integer_overflow_is_lex_error() {
        let err = lex("let a = 99999999999999999999").unwrap_err();
        assert_eq!(err.position, 8);
        assert!(err.suggestion.contains("64-bit"));
    }

    #[test]
    fn empty_source_yields_no_tokens() {
        assert!(lex("   \n\t// nothing\n").unwrap().is_empty());
    }
}
