use super::parse::TypeHeader;

/// Rewrite the `extends` clause of `header`. `None` removes it.
pub fn set_extends(source: &str, header: &TypeHeader, supertype: Option<&str>) -> String {
    let mut text = source.to_owned();
    match (&header.extends_span, supertype) {
        (Some(span), None) => {
            let start = source[..span.start].trim_end().len();
            text.replace_range(start..span.end, "");
        }
        (Some(span), Some(name)) => {
            text.replace_range(span.clone(), &format!("extends {name}"));
        }
        (None, Some(name)) => {
            text.insert_str(header.insert_at, &format!(" extends {name}"));
        }
        (None, None) => {}
    }
    text
}

/// Add `import qualified;` after the existing imports or package line.
/// Offsets in `header` must still be valid for everything before the anchor.
pub fn add_import(source: &str, header: &TypeHeader, qualified: &str) -> String {
    let mut text = source.to_owned();
    if header.import_anchor == 0 {
        text.insert_str(0, &format!("import {qualified};\n\n"));
    } else {
        text.insert_str(header.import_anchor, &format!("\nimport {qualified};"));
    }
    text
}

#[cfg(test)]
mod tests {
    use super::{add_import, set_extends};
    use crate::source::parse::parse_header;

    #[test]
    fn adds_a_clause_after_type_parameters() {
        let source = "public class Box<T> implements Shape {}";
        let header = parse_header(source).expect("header");
        let edited = set_extends(source, &header, Some("Base"));
        assert_eq!(edited, "public class Box<T> extends Base implements Shape {}");
        assert_eq!(parse_header(&edited).expect("header").extends, vec!["Base"]);
    }

    #[test]
    fn replaces_an_existing_clause() {
        let source = "class Dog extends Animal<Bone> {\n}";
        let header = parse_header(source).expect("header");
        assert_eq!(set_extends(source, &header, Some("Pet")), "class Dog extends Pet {\n}");
    }

    #[test]
    fn removes_the_clause_with_its_leading_space() {
        let source = "class Dog\n    extends Animal implements Pet {}";
        let header = parse_header(source).expect("header");
        let edited = set_extends(source, &header, None);
        assert_eq!(edited, "class Dog implements Pet {}");
        assert!(parse_header(&edited).expect("header").extends.is_empty());
    }

    #[test]
    fn imports_go_after_the_last_import_or_at_the_top() {
        let source = "package zoo;\n\nimport java.util.List;\n\nclass Dog {}";
        let header = parse_header(source).expect("header");
        assert_eq!(
            add_import(source, &header, "farm.Animal"),
            "package zoo;\n\nimport java.util.List;\nimport farm.Animal;\n\nclass Dog {}"
        );

        let bare = "class Dog {}";
        let header = parse_header(bare).expect("header");
        assert_eq!(add_import(bare, &header, "farm.Animal"), "import farm.Animal;\n\nclass Dog {}");
    }
}
