use std::ops::Range;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TokenKind {
    Ident,
    Literal,
    Symbol(char),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Token<'a> {
    pub kind: TokenKind,
    pub text: &'a str,
    pub start: usize,
    pub end: usize,
}

impl Token<'_> {
    fn is_ident(&self, word: &str) -> bool {
        self.kind == TokenKind::Ident && self.text == word
    }

    fn is_symbol(&self, symbol: char) -> bool {
        self.kind == TokenKind::Symbol(symbol)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TypeKind {
    Class,
    Interface,
    Enum,
    Record,
}

/// The first top-level type declared in a compilation unit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TypeHeader {
    pub kind: TypeKind,
    pub name: String,
    pub package: Option<String>,
    pub imports: Vec<String>,
    /// Supertypes as written, generics stripped.
    pub extends: Vec<String>,
    /// From the `extends` keyword to the end of the last supertype.
    pub extends_span: Option<Range<usize>>,
    /// Where a new `extends` clause goes: just past the name and type parameters.
    pub insert_at: usize,
    /// Just past the last import, or the package declaration.
    pub import_anchor: usize,
}

impl TypeHeader {
    pub fn qualified_name(&self) -> String {
        match &self.package {
            Some(package) => format!("{package}.{}", self.name),
            None => self.name.clone(),
        }
    }
}

/// Split Java source into identifiers, literals and single-char symbols.
/// Comments and whitespace are dropped.
pub fn tokenize(source: &str) -> Vec<Token<'_>> {
    let chars = source.char_indices().collect::<Vec<_>>();
    let offset = |index: usize| chars.get(index).map_or(source.len(), |(byte, _)| *byte);
    let at = |index: usize| chars.get(index).map(|(_, ch)| *ch);

    let mut tokens = Vec::new();
    let mut i = 0;
    while let Some(ch) = at(i) {
        let start = i;
        let kind = match ch {
            c if c.is_whitespace() => {
                i += 1;
                continue;
            }
            '/' if at(i + 1) == Some('/') => {
                while at(i).is_some_and(|c| c != '\n') {
                    i += 1;
                }
                continue;
            }
            '/' if at(i + 1) == Some('*') => {
                i += 2;
                while at(i).is_some() && !(at(i) == Some('*') && at(i + 1) == Some('/')) {
                    i += 1;
                }
                i += 2;
                continue;
            }
            '"' if at(i + 1) == Some('"') && at(i + 2) == Some('"') => {
                i += 3;
                while at(i).is_some()
                    && !(at(i) == Some('"') && at(i + 1) == Some('"') && at(i + 2) == Some('"'))
                {
                    i += if at(i) == Some('\\') { 2 } else { 1 };
                }
                i += 3;
                TokenKind::Literal
            }
            '"' | '\'' => {
                i += 1;
                while let Some(c) = at(i) {
                    if c == '\\' {
                        i += 2;
                        continue;
                    }
                    i += 1;
                    if c == ch || c == '\n' {
                        break;
                    }
                }
                TokenKind::Literal
            }
            c if c.is_alphabetic() || c == '_' || c == '$' => {
                while at(i).is_some_and(|c| c.is_alphanumeric() || c == '_' || c == '$') {
                    i += 1;
                }
                TokenKind::Ident
            }
            c if c.is_ascii_digit() => {
                while at(i).is_some_and(|c| c.is_alphanumeric() || c == '.' || c == '_') {
                    i += 1;
                }
                TokenKind::Literal
            }
            c => {
                i += 1;
                TokenKind::Symbol(c)
            }
        };

        let (start, end) = (offset(start), offset(i.min(chars.len())));
        tokens.push(Token {
            kind,
            text: &source[start..end],
            start,
            end,
        });
    }
    tokens
}

/// Parse the package, imports and first top-level type header.
pub fn parse_header(source: &str) -> Option<TypeHeader> {
    let tokens = tokenize(source);
    let mut cursor = 0;
    let mut package = None;
    let mut imports = Vec::new();
    let mut import_anchor = 0;

    while let Some(token) = tokens.get(cursor) {
        if token.is_symbol('@') && tokens.get(cursor + 1).is_some_and(|t| !t.is_ident("interface")) {
            cursor = skip_annotation(&tokens, cursor);
        } else if token.is_ident("package") {
            let (name, next) = dotted_name(&tokens, cursor + 1);
            package = Some(name);
            cursor = skip_past(&tokens, next, ';');
            import_anchor = end_of(&tokens, cursor);
        } else if token.is_ident("import") {
            let mut next = cursor + 1;
            if tokens.get(next).is_some_and(|t| t.is_ident("static")) {
                next += 1;
            }
            let (mut name, after) = dotted_name(&tokens, next);
            let mut after = after;
            if tokens.get(after).is_some_and(|t| t.is_symbol('*')) {
                name.push('*');
                after += 1;
            }
            imports.push(name);
            cursor = skip_past(&tokens, after, ';');
            import_anchor = end_of(&tokens, cursor);
        } else {
            break;
        }
    }

    let mut depth = 0usize;
    while let Some(token) = tokens.get(cursor) {
        match token.kind {
            TokenKind::Symbol('{') | TokenKind::Symbol('(') => depth += 1,
            TokenKind::Symbol('}') | TokenKind::Symbol(')') => depth = depth.saturating_sub(1),
            TokenKind::Symbol('@') if depth == 0 => {
                if tokens.get(cursor + 1).is_some_and(|t| t.is_ident("interface")) {
                    return header_at(&tokens, cursor + 1, TypeKind::Interface, package, imports, import_anchor);
                }
                cursor = skip_annotation(&tokens, cursor);
                continue;
            }
            TokenKind::Ident if depth == 0 => {
                let after_dot = cursor > 0 && tokens[cursor - 1].is_symbol('.');
                let kind = match token.text {
                    "class" => Some(TypeKind::Class),
                    "interface" => Some(TypeKind::Interface),
                    "enum" => Some(TypeKind::Enum),
                    "record" if is_record_header(&tokens, cursor) => Some(TypeKind::Record),
                    _ => None,
                };
                if let Some(kind) = kind.filter(|_| !after_dot) {
                    return header_at(&tokens, cursor, kind, package, imports, import_anchor);
                }
            }
            _ => {}
        }
        cursor += 1;
    }
    None
}

fn header_at(
    tokens: &[Token<'_>],
    keyword: usize,
    kind: TypeKind,
    package: Option<String>,
    imports: Vec<String>,
    import_anchor: usize,
) -> Option<TypeHeader> {
    let name_token = tokens.get(keyword + 1).filter(|t| t.kind == TokenKind::Ident)?;
    let mut cursor = keyword + 2;
    let mut insert_at = name_token.end;

    if tokens.get(cursor).is_some_and(|t| t.is_symbol('<')) {
        cursor = skip_balanced(tokens, cursor, '<', '>');
        insert_at = end_of(tokens, cursor);
    }
    if kind == TypeKind::Record && tokens.get(cursor).is_some_and(|t| t.is_symbol('(')) {
        cursor = skip_balanced(tokens, cursor, '(', ')');
        insert_at = end_of(tokens, cursor);
    }

    let mut extends = Vec::new();
    let mut extends_span = None;
    if let Some(clause) = tokens.get(cursor).filter(|t| t.is_ident("extends")) {
        let start = clause.start;
        cursor += 1;
        loop {
            let (name, mut next) = dotted_name(tokens, cursor);
            if name.is_empty() {
                break;
            }
            if tokens.get(next).is_some_and(|t| t.is_symbol('<')) {
                next = skip_balanced(tokens, next, '<', '>');
            }
            extends.push(name);
            cursor = next;
            if tokens.get(cursor).is_some_and(|t| t.is_symbol(',')) {
                cursor += 1;
            } else {
                break;
            }
        }
        if !extends.is_empty() {
            extends_span = Some(start..end_of(tokens, cursor));
        }
    }

    Some(TypeHeader {
        kind,
        name: name_token.text.to_owned(),
        package,
        imports,
        extends,
        extends_span,
        insert_at,
        import_anchor,
    })
}

fn is_record_header(tokens: &[Token<'_>], keyword: usize) -> bool {
    tokens.get(keyword + 1).is_some_and(|t| t.kind == TokenKind::Ident)
        && tokens
            .get(keyword + 2)
            .is_some_and(|t| t.is_symbol('(') || t.is_symbol('<'))
}

/// `a.b.C` starting at `cursor`. Returns the name and the index after it.
fn dotted_name(tokens: &[Token<'_>], mut cursor: usize) -> (String, usize) {
    let mut name = String::new();
    while let Some(token) = tokens.get(cursor) {
        match token.kind {
            TokenKind::Ident if !name.ends_with(|c: char| c.is_alphanumeric() || c == '_' || c == '$') => {
                name.push_str(token.text);
            }
            TokenKind::Symbol('.') if !name.is_empty() && !name.ends_with('.') => name.push('.'),
            _ => break,
        }
        cursor += 1;
    }
    (name, cursor)
}

fn skip_annotation(tokens: &[Token<'_>], at: usize) -> usize {
    let (_, mut cursor) = dotted_name(tokens, at + 1);
    if tokens.get(cursor).is_some_and(|t| t.is_symbol('(')) {
        cursor = skip_balanced(tokens, cursor, '(', ')');
    }
    cursor
}

/// Index just past the group opened at `open`.
fn skip_balanced(tokens: &[Token<'_>], open: usize, opener: char, closer: char) -> usize {
    let mut depth = 0usize;
    let mut cursor = open;
    while let Some(token) = tokens.get(cursor) {
        if token.is_symbol(opener) {
            depth += 1;
        } else if token.is_symbol(closer) {
            depth = depth.saturating_sub(1);
            if depth == 0 {
                return cursor + 1;
            }
        }
        cursor += 1;
    }
    cursor
}

fn skip_past(tokens: &[Token<'_>], mut cursor: usize, symbol: char) -> usize {
    while let Some(token) = tokens.get(cursor) {
        cursor += 1;
        if token.is_symbol(symbol) {
            break;
        }
    }
    cursor
}

fn end_of(tokens: &[Token<'_>], cursor: usize) -> usize {
    cursor
        .checked_sub(1)
        .and_then(|index| tokens.get(index))
        .map_or(0, |token| token.end)
}

#[cfg(test)]
mod tests {
    use super::{TypeKind, parse_header, tokenize};

    #[test]
    fn comments_and_strings_hide_fake_declarations() {
        let source = r#"
            // class Fake extends Nope {}
            /* interface Other extends X {} */
            package com.example.zoo;

            import java.util.List;
            import static java.lang.Math.*;

            @SuppressWarnings("class Bogus extends Thing")
            public final class Dog extends Animal implements Pet {
                String s = "class Inner extends Wrong";
            }
        "#;
        let header = parse_header(source).expect("header");

        assert_eq!(header.kind, TypeKind::Class);
        assert_eq!(header.name, "Dog");
        assert_eq!(header.package.as_deref(), Some("com.example.zoo"));
        assert_eq!(header.imports, vec!["java.util.List", "java.lang.Math.*"]);
        assert_eq!(header.extends, vec!["Animal"]);
        let span = header.extends_span.clone().expect("extends span");
        assert_eq!(&source[span], "extends Animal");
        assert_eq!(header.qualified_name(), "com.example.zoo.Dog");
    }

    #[test]
    fn generic_and_qualified_supertypes_are_stripped() {
        let source = "class Box<T extends Comparable<T>> extends base.Container<Map<K, V>> {}";
        let header = parse_header(source).expect("header");

        assert_eq!(header.extends, vec!["base.Container"]);
        assert_eq!(&source[..header.insert_at], "class Box<T extends Comparable<T>>");
        let span = header.extends_span.expect("extends span");
        assert_eq!(&source[span], "extends base.Container<Map<K, V>>");
    }

    #[test]
    fn interfaces_list_every_supertype() {
        let header = parse_header("public interface Shape extends Drawable, java.io.Serializable { }")
            .expect("header");
        assert_eq!(header.kind, TypeKind::Interface);
        assert_eq!(header.extends, vec!["Drawable", "java.io.Serializable"]);
    }

    #[test]
    fn class_literals_are_not_declarations() {
        let source = "@Target(Foo.class)\nenum Color { RED; Class<?> c = Color.class; }";
        let header = parse_header(source).expect("header");
        assert_eq!(header.kind, TypeKind::Enum);
        assert_eq!(header.name, "Color");
        assert!(header.extends.is_empty());
        assert_eq!(header.insert_at, source.find(" {").expect("brace"));
    }

    #[test]
    fn records_and_annotation_types_are_recognised() {
        let record = parse_header("record Point(int x, int y) implements Shape {}").expect("record");
        assert_eq!(record.kind, TypeKind::Record);
        assert_eq!(record.name, "Point");

        let annotation = parse_header("public @interface Marker {}").expect("annotation");
        assert_eq!(annotation.kind, TypeKind::Interface);
        assert_eq!(annotation.name, "Marker");
    }

    #[test]
    fn files_without_types_have_no_header() {
        assert!(parse_header("package empty;\n// nothing here\n").is_none());
        assert!(parse_header("").is_none());
    }

    #[test]
    fn unterminated_comment_does_not_panic() {
        let tokens = tokenize("class A /* never closed");
        assert_eq!(tokens.len(), 2);
        assert!(parse_header("class A /* never closed").is_some());
    }
}
