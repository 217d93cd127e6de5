//! Tokenizer for configuration source files.

use chumsky::prelude::*;
use std::fmt;

pub type Span = SimpleSpan;
pub type LexError<'src> = Rich<'src, char, Span>;

/// A lexical token.
#[derive(Debug, Clone, PartialEq)]
pub enum Token<'src> {
    Ident(&'src str),
    Str(String),
    Int(i64),
    Float(f64),
    Colon,
    Comma,
    Amp,
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    LParen,
    RParen,
}

impl fmt::Display for Token<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Ident(name) => write!(f, "{}", name),
            Token::Str(text) => write!(f, "{:?}", text),
            Token::Int(value) => write!(f, "{}", value),
            Token::Float(value) => write!(f, "{}", value),
            Token::Colon => write!(f, ":"),
            Token::Comma => write!(f, ","),
            Token::Amp => write!(f, "&"),
            Token::LBrace => write!(f, "{{"),
            Token::RBrace => write!(f, "}}"),
            Token::LBracket => write!(f, "["),
            Token::RBracket => write!(f, "]"),
            Token::LParen => write!(f, "("),
            Token::RParen => write!(f, ")"),
        }
    }
}

/// Split source text into tokens, each paired with its byte span.
///
/// Whitespace and `//` line comments separate tokens and are dropped.
pub fn lexer<'src>(
) -> impl Parser<'src, &'src str, Vec<(Token<'src>, Span)>, extra::Err<LexError<'src>>> {
    let number = just('-')
        .or_not()
        .then(text::int(10))
        .then(just('.').then(text::digits(10)).or_not())
        .then(one_of("eE").then(one_of("+-").or_not()).then(text::digits(10)).or_not())
        .to_slice()
        .try_map(|literal: &str, span| {
            let token = if literal.contains(['.', 'e', 'E']) {
                literal.parse().ok().map(Token::Float)
            } else {
                literal.parse().ok().map(Token::Int)
            };
            token.ok_or_else(|| Rich::custom(span, format!("number {} out of range", literal)))
        });

    let unicode = just('u').ignore_then(text::digits(16).exactly(4).to_slice().try_map(
        |digits: &str, span| {
            u32::from_str_radix(digits, 16)
                .ok()
                .and_then(char::from_u32)
                .ok_or_else(|| Rich::custom(span, format!("invalid unicode escape \\u{}", digits)))
        },
    ));
    let escape = just('\\').ignore_then(choice((
        just('\\'),
        just('/'),
        just('"'),
        just('n').to('\n'),
        just('t').to('\t'),
        just('r').to('\r'),
        unicode,
    )));
    let string = just('"')
        .ignore_then(none_of("\\\"\n").or(escape).repeated().collect::<String>())
        .then(just('"').or_not())
        .try_map(|(text, closing), span| match closing {
            Some(_) => Ok(Token::Str(text)),
            None => Err(Rich::custom(span, "string literal not terminated")),
        });

    let ident = any()
        .filter(|c: &char| c.is_ascii_alphabetic() || *c == '_' || *c == '$')
        .then(
            any()
                .filter(|c: &char| c.is_ascii_alphanumeric() || *c == '_' || *c == '$')
                .repeated(),
        )
        .to_slice()
        .map(Token::Ident);

    let punctuation = choice((
        just(':').to(Token::Colon),
        just(',').to(Token::Comma),
        just('&').to(Token::Amp),
        just('{').to(Token::LBrace),
        just('}').to(Token::RBrace),
        just('[').to(Token::LBracket),
        just(']').to(Token::RBracket),
        just('(').to(Token::LParen),
        just(')').to(Token::RParen),
    ));

    let comment = just("//").then(any().and_is(just('\n').not()).repeated()).padded();

    choice((number, string, punctuation, ident))
        .map_with(|token, extra| (token, extra.span()))
        .padded_by(comment.clone().repeated())
        .padded()
        .repeated()
        .collect()
        .padded_by(comment.repeated())
        .padded()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(source: &str) -> Vec<Token<'_>> {
        lexer().parse(source).into_result().unwrap().into_iter().map(|(t, _)| t).collect()
    }

    #[test]
    fn test_tokenize_field() {
        assert_eq!(tokens("name: \"web\""), vec![Token::Ident("name"), Token::Colon, Token::Str("web".into())]);
    }

    #[test]
    fn test_tokenize_numbers() {
        assert_eq!(
            tokens("1 -2 3.5 1e3"),
            vec![Token::Int(1), Token::Int(-2), Token::Float(3.5), Token::Float(1000.0)]
        );
    }

    #[test]
    fn test_tokenize_skips_comments() {
        assert_eq!(tokens("// header\na: 1 // trailing"), tokens("a: 1"));
        assert!(tokens("// only a comment\n").is_empty());
    }

    #[test]
    fn test_tokenize_spans() {
        let spanned = lexer().parse("a: 1\n  b: 2").into_result().unwrap();
        assert_eq!(spanned[3].1.into_range(), 7..8);
    }

    #[test]
    fn test_tokenize_escapes() {
        assert_eq!(tokens(r#""a\"b\nA""#)[0], Token::Str("a\"b\nA".into()));
        assert_eq!(tokens(r#""\u0001""#)[0], Token::Str("\u{1}".into()));
    }

    #[test]
    fn test_tokenize_unterminated_string() {
        assert!(lexer().parse("a: \"oops\nb: 1").has_errors());
    }

    #[test]
    fn test_tokenize_illegal_character() {
        let errors = lexer().parse("a: 1 ; b").into_errors();
        assert_eq!(errors[0].span().start, 5);
        assert_eq!(errors[0].found(), Some(&';'));
    }
}
