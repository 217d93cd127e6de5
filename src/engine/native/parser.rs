//! Parser producing a syntax tree from source text.
//!
//! Grammar (commas between fields and list elements are optional):
//!
//! ```text
//! file   = [ "package" ident ] { import } { field [ "," ] }
//! import = "import" ( string | "(" { string } ")" )
//! field  = label ":" ( field | expr )
//! label  = ident | string
//! expr   = operand { "&" operand }
//! operand = string | number | ident | "{" { field [ "," ] } "}" | "[" { expr [ "," ] } "]"
//! ```

use chumsky::error::RichReason;
use chumsky::input::ValueInput;
use chumsky::prelude::*;
use std::fmt;
use std::path::{Path, PathBuf};

use super::lexer::{lexer, Span, Token};
use crate::engine::{Diagnostic, Position};
use crate::value::Kind;

/// Deepest nesting of brackets and shorthand labels accepted in one file.
pub const MAX_NESTING: usize = 64;

type ParseError<'tokens, 'src> = Rich<'tokens, Token<'src>, Span>;

/// A parsed source file.
#[derive(Debug, Clone, PartialEq)]
pub struct File {
    pub path: PathBuf,
    /// Declared package name and where it was declared
    pub package: Option<(String, Position)>,
    pub imports: Vec<Import>,
    pub fields: Vec<Field>,
    lines: LineIndex,
}

impl File {
    /// Line and column of the start of `span`.
    pub fn position(&self, span: Span) -> Position {
        self.lines.position(span.start)
    }
}

/// An `import` declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct Import {
    pub path: String,
    pub pos: Position,
}

/// `label: value`
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub label: String,
    pub span: Span,
    pub value: Expr,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Type(Kind),
    /// Identifier that is not a keyword
    Reference(String),
    Struct(Vec<Field>),
    List(Vec<Expr>),
    /// Two or more operands joined by `&`
    Unify(Vec<Expr>),
}

/// Byte offsets of line starts, for turning spans into positions.
#[derive(Debug, Clone, PartialEq)]
struct LineIndex {
    starts: Vec<usize>,
}

impl LineIndex {
    fn new(source: &str) -> Self {
        let starts = std::iter::once(0)
            .chain(source.match_indices('\n').map(|(i, _)| i + 1))
            .collect();
        Self { starts }
    }

    /// Columns count bytes from one.
    fn position(&self, offset: usize) -> Position {
        let line = self.starts.partition_point(|&start| start <= offset).max(1);
        Position::new(line, offset - self.starts[line - 1] + 1)
    }
}

struct Header<'src> {
    package: Option<(&'src str, Span)>,
    imports: Vec<(String, Span)>,
    fields: Vec<Field>,
}

fn keyword(name: &str) -> ExprKind {
    match name {
        "null" => ExprKind::Null,
        "true" => ExprKind::Bool(true),
        "false" => ExprKind::Bool(false),
        "_" => ExprKind::Type(Kind::Top),
        "bool" => ExprKind::Type(Kind::Bool),
        "int" => ExprKind::Type(Kind::Int),
        "float" => ExprKind::Type(Kind::Float),
        "number" => ExprKind::Type(Kind::Number),
        "string" => ExprKind::Type(Kind::String),
        other => ExprKind::Reference(other.to_string()),
    }
}

fn file_parser<'tokens, 'src: 'tokens, I>(
) -> impl Parser<'tokens, I, Header<'src>, extra::Err<ParseError<'tokens, 'src>>>
where
    I: ValueInput<'tokens, Token = Token<'src>, Span = Span>,
{
    let comma = just(Token::Comma).or_not();
    let label = select! {
        Token::Ident(name) => name.to_string(),
        Token::Str(text) => text,
    };
    let scalar = select! {
        Token::Int(value) => ExprKind::Int(value),
        Token::Float(value) => ExprKind::Float(value),
        Token::Str(text) => ExprKind::Str(text),
        Token::Ident(name) => keyword(name),
    };

    let field = recursive(|field| {
        let value = recursive(|value| {
            let structure = field
                .clone()
                .then_ignore(comma.clone())
                .repeated()
                .collect::<Vec<_>>()
                .delimited_by(just(Token::LBrace), just(Token::RBrace))
                .map(ExprKind::Struct);
            let list = value
                .then_ignore(comma.clone())
                .repeated()
                .collect::<Vec<_>>()
                .delimited_by(just(Token::LBracket), just(Token::RBracket))
                .map(ExprKind::List);

            choice((scalar, structure, list))
                .map_with(|kind, extra| Expr { kind, span: extra.span() })
                .separated_by(just(Token::Amp))
                .at_least(1)
                .collect::<Vec<_>>()
                .map_with(|mut operands: Vec<Expr>, extra| {
                    if operands.len() == 1 {
                        operands.remove(0)
                    } else {
                        Expr { kind: ExprKind::Unify(operands), span: extra.span() }
                    }
                })
        });

        // `a: b: 1` is `a: { b: 1 }`
        let shorthand = field.map_with(|inner, extra| Expr {
            kind: ExprKind::Struct(vec![inner]),
            span: extra.span(),
        });

        label
            .clone()
            .map_with(|label, extra| (label, extra.span()))
            .then_ignore(just(Token::Colon))
            .then(choice((shorthand, value)))
            .map(|((label, span), value)| Field { label, span, value })
    });

    let package = just(Token::Ident("package"))
        .ignore_then(select! { Token::Ident(name) => name }.map_with(|name, extra| (name, extra.span())))
        .or_not();

    let import_path = select! { Token::Str(path) => path }.map_with(|path, extra| (path, extra.span()));
    let imports = just(Token::Ident("import"))
        .ignore_then(choice((
            import_path
                .clone()
                .repeated()
                .collect::<Vec<_>>()
                .delimited_by(just(Token::LParen), just(Token::RParen)),
            import_path.map(|import| vec![import]),
        )))
        .repeated()
        .collect::<Vec<Vec<_>>>()
        .map(|groups| groups.into_iter().flatten().collect::<Vec<_>>());

    package
        .then(imports)
        .then(field.then_ignore(comma).repeated().collect::<Vec<_>>())
        .map(|((package, imports), fields)| Header { package, imports, fields })
}

/// Find the first token nested deeper than [`MAX_NESTING`].
///
/// Brackets count one level each, as does every label in a `a: b: c:` chain.
fn check_nesting(tokens: &[(Token<'_>, Span)]) -> Result<(), Span> {
    let mut enclosing: Vec<usize> = Vec::new();
    let mut enclosing_chains = 0;
    let mut chain = 0;

    for (i, (token, span)) in tokens.iter().enumerate() {
        let follows_colon = i > 0 && tokens[i - 1].0 == Token::Colon;
        let precedes_colon = tokens.get(i + 1).is_some_and(|(next, _)| *next == Token::Colon);
        match token {
            Token::LBrace | Token::LBracket | Token::LParen => {
                enclosing.push(chain);
                enclosing_chains += chain;
                chain = 0;
            }
            Token::RBrace | Token::RBracket | Token::RParen => {
                enclosing_chains -= enclosing.pop().unwrap_or(0);
                chain = 0;
            }
            Token::Colon => {}
            Token::Ident(_) | Token::Str(_) if precedes_colon => {
                chain = if follows_colon { chain + 1 } else { 0 };
            }
            _ => chain = 0,
        }
        if enclosing.len() + enclosing_chains + chain > MAX_NESTING {
            return Err(*span);
        }
    }
    Ok(())
}

fn describe_lex_error(err: &Rich<'_, char, Span>) -> String {
    if let RichReason::Custom(message) = err.reason() {
        return message.clone();
    }
    match err.found() {
        Some(c) => format!("illegal character {:?}", c),
        None => "unexpected end of file".to_string(),
    }
}

fn describe_parse_error<T: fmt::Display>(err: &Rich<'_, T, Span>) -> String {
    if let RichReason::Custom(message) = err.reason() {
        return message.clone();
    }
    let found = match err.found() {
        Some(token) => format!("'{}'", token),
        None => "end of file".to_string(),
    };
    let mut expected: Vec<String> = err.expected().map(ToString::to_string).collect();
    expected.sort();
    expected.dedup();
    if expected.is_empty() {
        format!("unexpected {}", found)
    } else {
        format!("expected {}, found {}", expected.join(" or "), found)
    }
}

fn find_reference(expr: &Expr) -> Option<(&str, Span)> {
    match &expr.kind {
        ExprKind::Reference(name) => Some((name, expr.span)),
        ExprKind::Struct(fields) => fields.iter().find_map(|f| find_reference(&f.value)),
        ExprKind::List(items) | ExprKind::Unify(items) => items.iter().find_map(find_reference),
        _ => None,
    }
}

/// Parse one source file.
///
/// The returned diagnostic names `path` and the position of the first problem.
pub fn parse_file(path: &Path, source: &str) -> Result<File, Diagnostic> {
    let lines = LineIndex::new(source);
    let error_at = |span: Span, message: String| {
        Diagnostic::new(message).with_path(path).with_position(lines.position(span.start))
    };
    let end = Span::from(source.len()..source.len());

    let tokens = lexer().parse(source).into_result().map_err(|errors| match errors.first() {
        Some(err) => error_at(*err.span(), describe_lex_error(err)),
        None => error_at(end, "invalid source".to_string()),
    })?;

    check_nesting(&tokens).map_err(|span| {
        error_at(span, format!("nesting too deep (more than {} levels)", MAX_NESTING))
    })?;

    let header = file_parser()
        .parse(tokens.as_slice().map(end, |(token, span)| (token, span)))
        .into_result()
        .map_err(|errors| match errors.first() {
            Some(err) => error_at(*err.span(), describe_parse_error(err)),
            None => error_at(end, "invalid source".to_string()),
        })?;

    if let Some((name, span)) = header.fields.iter().find_map(|f| find_reference(&f.value)) {
        return Err(error_at(span, format!("reference \"{}\" not supported", name)));
    }

    let package = header.package.map(|(name, span)| (name.to_string(), lines.position(span.start)));
    let imports = header
        .imports
        .into_iter()
        .map(|(import_path, span)| Import { path: import_path, pos: lines.position(span.start) })
        .collect();
    Ok(File { path: path.to_path_buf(), package, imports, fields: header.fields, lines })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(source: &str) -> File {
        parse_file(Path::new("/src/test.cue"), source).unwrap()
    }

    fn nested_lists(depth: usize) -> String {
        format!("x: {}1{}", "[".repeat(depth), "]".repeat(depth))
    }

    #[test]
    fn test_parse_package_and_fields() {
        let file = parse("package web\n\nname: \"site\"\nport: 8080\n");
        assert_eq!(file.package, Some(("web".to_string(), Position::new(1, 9))));
        assert_eq!(file.fields.len(), 2);
        assert_eq!(file.fields[1].value.kind, ExprKind::Int(8080));
        assert_eq!(file.position(file.fields[1].span), Position::new(4, 1));
    }

    #[test]
    fn test_parse_without_package() {
        let file = parse("a: true");
        assert!(file.package.is_none());
        assert_eq!(file.fields[0].value.kind, ExprKind::Bool(true));
    }

    #[test]
    fn test_parse_package_as_label() {
        let file = parse("package: \"npm\"");
        assert!(file.package.is_none());
        assert_eq!(file.fields[0].label, "package");
    }

    #[test]
    fn test_parse_imports() {
        let file = parse("package a\nimport \"strings\"\nimport (\n\"list\"\n\"math\"\n)\nx: 1");
        let paths: Vec<_> = file.imports.iter().map(|i| i.path.as_str()).collect();
        assert_eq!(paths, ["strings", "list", "math"]);
        assert_eq!(file.imports[0].pos, Position::new(2, 8));
    }

    #[test]
    fn test_parse_shorthand_nesting() {
        let file = parse("a: b: c: 1");
        let ExprKind::Struct(ref inner) = file.fields[0].value.kind else {
            panic!("Expected struct");
        };
        assert_eq!(inner[0].label, "b");
    }

    #[test]
    fn test_parse_struct_list_and_unify() {
        let file = parse("svc: { ports: [80, 443,], \"x-y\": string & \"z\" & _ }");
        let ExprKind::Struct(ref fields) = file.fields[0].value.kind else {
            panic!("Expected struct");
        };
        assert!(matches!(fields[0].value.kind, ExprKind::List(ref items) if items.len() == 2));
        assert_eq!(fields[1].label, "x-y");
        assert!(matches!(fields[1].value.kind, ExprKind::Unify(ref operands) if operands.len() == 3));
    }

    #[test]
    fn test_parse_comments_only() {
        assert!(parse("// nothing here\n").fields.is_empty());
    }

    #[test]
    fn test_parse_error_has_position() {
        let err = parse_file(Path::new("/src/bad.cue"), "a: 1\nb 2\n").unwrap_err();
        assert_eq!(err.path.as_deref(), Some(Path::new("/src/bad.cue")));
        assert_eq!(err.position, Some(Position::new(2, 3)));
        assert!(err.message.contains("':'"), "message: {}", err.message);
    }

    #[test]
    fn test_lex_error_has_position() {
        let err = parse_file(Path::new("/src/bad.cue"), "a: 1\nb: 2 ;").unwrap_err();
        assert_eq!(err.position, Some(Position::new(2, 6)));
        assert!(err.message.contains("illegal character"));
    }

    #[test]
    fn test_parse_unclosed_struct() {
        let err = parse_file(Path::new("x.cue"), "a: {\n b: 1\n").unwrap_err();
        assert!(err.message.contains("end of file"), "message: {}", err.message);
    }

    #[test]
    fn test_parse_reference_rejected() {
        let err = parse_file(Path::new("x.cue"), "a: 1\nb: [a]").unwrap_err();
        assert_eq!(err.message, "reference \"a\" not supported");
        assert_eq!(err.position, Some(Position::new(2, 5)));
    }

    #[test]
    fn test_parse_moderate_nesting() {
        let file = parse(&nested_lists(32));
        assert_eq!(file.fields.len(), 1);
    }

    #[test]
    fn test_parse_nesting_too_deep() {
        let err = parse_file(Path::new("/src/deep.cue"), &nested_lists(200_000)).unwrap_err();
        assert!(err.message.starts_with("nesting too deep"));
        assert_eq!(err.path.as_deref(), Some(Path::new("/src/deep.cue")));
        assert_eq!(err.position, Some(Position::new(1, 4 + MAX_NESTING)));
    }

    #[test]
    fn test_parse_shorthand_chain_too_deep() {
        let chain: String = (0..MAX_NESTING + 10).map(|i| format!("l{}: ", i)).collect();
        let err = parse_file(Path::new("x.cue"), &format!("{}1", chain)).unwrap_err();
        assert!(err.message.starts_with("nesting too deep"));
    }

    #[test]
    fn test_quoted_string_reads_back() {
        let text = "tab\there \"quoted\" \\ \u{1}\u{7f} é";
        let rendered = crate::value::Node::String(text.to_string()).to_string();
        let file = parse(&format!("s: {}", rendered));
        assert_eq!(file.fields[0].value.kind, ExprKind::Str(text.to_string()));
    }
}
