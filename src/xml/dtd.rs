//! Document Type Definitions
//!
//! Only the internal subset of a standalone document is supported: `ELEMENT` and `ATTLIST`
//! declarations, with `CDATA` or enumerated attributes.

use super::Element;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{BTreeMap, BTreeSet};

type Result<T> = std::result::Result<T, String>;

#[derive(Debug, Clone, Copy, PartialEq)]
enum Occurrence {
    Once,
    Optional,
    ZeroOrMore,
    OneOrMore,
}
impl Occurrence {
    fn from_suffix(c: Option<char>) -> Self {
        match c {
            Some('?') => Occurrence::Optional,
            Some('*') => Occurrence::ZeroOrMore,
            Some('+') => Occurrence::OneOrMore,
            _ => Occurrence::Once,
        }
    }
}

#[derive(Debug, PartialEq)]
enum Particle {
    Name(String, Occurrence),
    Seq(Vec<Particle>, Occurrence),
    Choice(Vec<Particle>, Occurrence),
}
impl Particle {
    fn occurrence(&self) -> Occurrence {
        match self {
            Particle::Name(_, occ) | Particle::Seq(_, occ) | Particle::Choice(_, occ) => *occ,
        }
    }
    /// Positions in `names` where a single match of the particle starting at `pos` can end
    fn once(&self, names: &[&str], pos: usize) -> BTreeSet<usize> {
        match self {
            Particle::Name(name, _) => names
                .get(pos)
                .filter(|&&n| n == name.as_str())
                .map(|_| pos + 1)
                .into_iter()
                .collect(),
            Particle::Seq(items, _) => items.iter().fold(BTreeSet::from([pos]), |ends, item| {
                ends.into_iter()
                    .flat_map(|p| item.matches(names, p))
                    .collect()
            }),
            Particle::Choice(items, _) => items
                .iter()
                .flat_map(|item| item.matches(names, pos))
                .collect(),
        }
    }
    /// Positions in `names` where the particle, with its occurrence, can end
    fn matches(&self, names: &[&str], pos: usize) -> BTreeSet<usize> {
        let repeat = |start: BTreeSet<usize>| {
            let mut reached = start.clone();
            let mut pending: Vec<usize> = start.into_iter().collect();
            while let Some(p) = pending.pop() {
                for q in self.once(names, p) {
                    if q > p && reached.insert(q) {
                        pending.push(q);
                    }
                }
            }
            reached
        };
        match self.occurrence() {
            Occurrence::Once => self.once(names, pos),
            Occurrence::Optional => {
                let mut ends = self.once(names, pos);
                ends.insert(pos);
                ends
            }
            Occurrence::ZeroOrMore => repeat(BTreeSet::from([pos])),
            Occurrence::OneOrMore => repeat(self.once(names, pos)),
        }
    }
}

#[derive(Debug, PartialEq)]
enum ContentModel {
    Empty,
    Any,
    /// `(#PCDATA)` or `(#PCDATA|a|b)*`
    Mixed(Vec<String>),
    Children(Particle),
}

/// Recursive descent over a whitespace-free content model
struct ModelParser {
    chars: Vec<char>,
    pos: usize,
}
impl ModelParser {
    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }
    fn suffix(&mut self) -> Occurrence {
        let occ = Occurrence::from_suffix(self.peek());
        if occ != Occurrence::Once {
            self.pos += 1;
        }
        occ
    }
    fn group(&mut self) -> Result<Particle> {
        if self.peek() != Some('(') {
            return Err(format!("expected '(' at position {}", self.pos));
        }
        self.pos += 1;
        let mut items = vec![self.particle()?];
        let mut separator = None;
        loop {
            match self.peek() {
                Some(')') => {
                    self.pos += 1;
                    break;
                }
                Some(c @ (',' | '|')) if separator.is_none() || separator == Some(c) => {
                    separator = Some(c);
                    self.pos += 1;
                    items.push(self.particle()?);
                }
                other => return Err(format!("unexpected {:?} in content model", other)),
            }
        }
        let occ = self.suffix();
        Ok(match separator {
            Some('|') => Particle::Choice(items, occ),
            _ => Particle::Seq(items, occ),
        })
    }
    fn particle(&mut self) -> Result<Particle> {
        if self.peek() == Some('(') {
            return self.group();
        }
        let start = self.pos;
        while let Some(c) = self.peek() {
            if matches!(c, ',' | '|' | '(' | ')' | '?' | '*' | '+') {
                break;
            }
            self.pos += 1;
        }
        if start == self.pos {
            return Err(format!("missing element name at position {}", start));
        }
        let name: String = self.chars[start..self.pos].iter().collect();
        Ok(Particle::Name(name, self.suffix()))
    }
}

fn parse_content_model(spec: &str) -> Result<ContentModel> {
    let spec: String = spec.chars().filter(|c| !c.is_whitespace()).collect();
    match spec.as_str() {
        "EMPTY" => Ok(ContentModel::Empty),
        "ANY" => Ok(ContentModel::Any),
        s if s.starts_with("(#PCDATA") => {
            let inner = s
                .strip_suffix(")*")
                .or_else(|| s.strip_suffix(')'))
                .and_then(|s| s.strip_prefix('('))
                .ok_or_else(|| format!("invalid mixed content model {}", s))?;
            Ok(ContentModel::Mixed(
                inner.split('|').skip(1).map(str::to_string).collect(),
            ))
        }
        s => {
            let mut parser = ModelParser {
                chars: s.chars().collect(),
                pos: 0,
            };
            let particle = parser.group()?;
            if parser.pos != parser.chars.len() {
                return Err(format!("trailing characters in content model {}", s));
            }
            Ok(ContentModel::Children(particle))
        }
    }
}

#[derive(Debug)]
struct AttributeDecl {
    name: String,
    values: Option<Vec<String>>,
    required: bool,
    fixed: Option<String>,
}

static DOCTYPE_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^\s*([^\s\[]+)\s*\[(.*)\]\s*$").unwrap());
static COMMENT_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<!--.*?-->").unwrap());
static DECLARATION_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<!(ELEMENT|ATTLIST)\s+([^>]*)>").unwrap());
/// quoted value, parenthesized enumeration or bare word
static TOKEN_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#""[^"]*"|'[^']*'|\([^)]*\)|\S+"#).unwrap());

/// The grammar declared by a document type
#[derive(Debug)]
pub(crate) struct Dtd {
    root: String,
    elements: BTreeMap<String, ContentModel>,
    attributes: BTreeMap<String, Vec<AttributeDecl>>,
}
impl Dtd {
    /// Parses the contents of a `<!DOCTYPE ...>` declaration, e.g. `offsets [ ... ]`
    pub(crate) fn parse(doctype: &str) -> Result<Self> {
        let capts = DOCTYPE_REGEX
            .captures(doctype)
            .ok_or_else(|| "the document type has no internal subset".to_string())?;
        let mut dtd = Dtd {
            root: capts[1].to_string(),
            elements: BTreeMap::new(),
            attributes: BTreeMap::new(),
        };
        let subset = COMMENT_REGEX.replace_all(&capts[2], "");
        for decl in DECLARATION_REGEX.captures_iter(&subset) {
            let body = decl[2].trim();
            match &decl[1] {
                "ELEMENT" => {
                    let (name, spec) = body
                        .split_once(char::is_whitespace)
                        .ok_or_else(|| format!("invalid element declaration {}", body))?;
                    dtd.elements
                        .insert(name.to_string(), parse_content_model(spec)?);
                }
                _ => {
                    let tokens: Vec<&str> =
                        TOKEN_REGEX.find_iter(body).map(|m| m.as_str()).collect();
                    let (element, mut rest) = tokens
                        .split_first()
                        .ok_or_else(|| "empty attribute list declaration".to_string())?;
                    let decls = dtd.attributes.entry(element.to_string()).or_default();
                    while let [name, kind, default, tail @ ..] = rest {
                        let values = kind
                            .strip_prefix('(')
                            .and_then(|k| k.strip_suffix(')'))
                            .map(|k| k.split('|').map(|v| v.trim().to_string()).collect());
                        let (fixed, tail) = match (*default, tail) {
                            ("#FIXED", [value, tail @ ..]) => (Some(unquote(value)), tail),
                            _ => (None, tail),
                        };
                        decls.push(AttributeDecl {
                            name: name.to_string(),
                            values,
                            required: *default == "#REQUIRED",
                            fixed,
                        });
                        rest = tail;
                    }
                    if !rest.is_empty() {
                        return Err(format!("invalid attribute list declaration {}", body));
                    }
                }
            }
        }
        Ok(dtd)
    }
    /// Checks a document tree against the grammar
    pub(crate) fn validate(&self, root: &Element) -> Result<()> {
        if root.name() != self.root {
            return Err(format!(
                "root element <{}> does not match the document type {}",
                root.name(),
                self.root
            ));
        }
        self.validate_element(root)
    }
    fn validate_element(&self, element: &Element) -> Result<()> {
        let name = element.name();
        let model = self
            .elements
            .get(name)
            .ok_or_else(|| format!("element <{}> is not declared", name))?;
        self.validate_attributes(element)?;
        let has_text = element.text().is_some_and(|t| !t.trim().is_empty());
        let children: Vec<&str> = element.children().iter().map(Element::name).collect();
        match model {
            ContentModel::Any => (),
            ContentModel::Empty => {
                if has_text || !children.is_empty() {
                    return Err(format!("element <{}> must be empty", name));
                }
            }
            ContentModel::Mixed(allowed) => {
                let allowed = |child: &&str| allowed.iter().any(|a| a.as_str() == *child);
                if let Some(child) = children.iter().find(|c| !allowed(*c)) {
                    return Err(format!("element <{}> is not allowed in <{}>", child, name));
                }
            }
            ContentModel::Children(particle) => {
                if has_text {
                    return Err(format!("element <{}> cannot contain text", name));
                }
                if !particle.matches(&children, 0).contains(&children.len()) {
                    return Err(format!(
                        "content of <{}> ({}) does not follow its declaration",
                        name,
                        children.join(", ")
                    ));
                }
            }
        }
        element
            .children()
            .iter()
            .try_for_each(|child| self.validate_element(child))
    }
    fn validate_attributes(&self, element: &Element) -> Result<()> {
        let name = element.name();
        let decls = self.attributes.get(name).map(Vec::as_slice).unwrap_or(&[]);
        for (key, value) in element.attributes() {
            let decl = decls
                .iter()
                .find(|d| d.name == *key)
                .ok_or_else(|| format!("attribute {} of <{}> is not declared", key, name))?;
            if let Some(values) = &decl.values {
                if !values.contains(value) {
                    return Err(format!("{:?} is not a legal value of {}", value, key));
                }
            }
            if let Some(fixed) = &decl.fixed {
                if fixed != value {
                    return Err(format!("attribute {} of <{}> must be {:?}", key, name, fixed));
                }
            }
        }
        match decls
            .iter()
            .find(|d| d.required && element.attribute(&d.name).is_none())
        {
            Some(decl) => Err(format!(
                "required attribute {} of <{}> is missing",
                decl.name, name
            )),
            None => Ok(()),
        }
    }
}

fn unquote(value: &str) -> String {
    value.trim_matches(|c| c == '"' || c == '\'').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOCTYPE: &str = r#"catalog [
<!ELEMENT catalog (header?, (entry | note)*, footer+)>
<!ATTLIST catalog version CDATA #FIXED "1">
<!-- the header -->
<!ELEMENT header (#PCDATA)>
<!ELEMENT entry EMPTY>
<!ATTLIST entry id   CDATA #REQUIRED
                kind (a|b) #IMPLIED>
<!ELEMENT note (#PCDATA|entry)*>
<!ELEMENT footer ANY>
]"#;

    fn leaf(name: &str) -> Element {
        Element::new(name)
    }
    fn entry(id: &str) -> Element {
        Element::new("entry").with_attribute("id", id)
    }

    #[test]
    fn content_models() {
        assert_eq!(parse_content_model("EMPTY"), Ok(ContentModel::Empty));
        assert_eq!(
            parse_content_model("(#PCDATA)"),
            Ok(ContentModel::Mixed(vec![]))
        );
        assert_eq!(
            parse_content_model("(offset+)"),
            Ok(ContentModel::Children(Particle::Seq(
                vec![Particle::Name("offset".into(), Occurrence::OneOrMore)],
                Occurrence::Once
            )))
        );
        assert!(parse_content_model("(a, b | c)").is_err());
        assert!(parse_content_model("(a, b").is_err());
    }

    #[test]
    fn sequence_matching() {
        let Ok(ContentModel::Children(particle)) = parse_content_model("(a, b*, c?)") else {
            panic!("invalid content model")
        };
        let accepts = |names: &[&str]| particle.matches(names, 0).contains(&names.len());
        assert!(accepts(&["a"]));
        assert!(accepts(&["a", "b", "b", "c"]));
        assert!(!accepts(&[]));
        assert!(!accepts(&["a", "c", "b"]));
        assert!(!accepts(&["a", "c", "c"]));
    }

    #[test]
    fn valid_document() {
        let dtd = Dtd::parse(DOCTYPE).unwrap();
        let mut root = Element::new("catalog").with_attribute("version", "1");
        root.push(leaf("header").with_text("title"));
        root.push(entry("1"));
        root.push(
            Element::new("note")
                .with_text("see")
                .with_child(entry("2").with_attribute("kind", "b")),
        );
        root.push(leaf("footer"));
        dtd.validate(&root).unwrap();
    }

    #[test]
    fn invalid_documents() {
        let dtd = Dtd::parse(DOCTYPE).unwrap();
        let footer = || leaf("footer");

        let no_footer = Element::new("catalog").with_child(entry("1"));
        assert!(dtd.validate(&no_footer).is_err());

        let missing_id = Element::new("catalog")
            .with_child(leaf("entry"))
            .with_child(footer());
        assert!(dtd.validate(&missing_id).unwrap_err().contains("required"));

        let bad_kind = Element::new("catalog")
            .with_child(entry("1").with_attribute("kind", "c"))
            .with_child(footer());
        assert!(dtd.validate(&bad_kind).is_err());

        let bad_version = Element::new("catalog")
            .with_attribute("version", "2")
            .with_child(footer());
        assert!(dtd.validate(&bad_version).is_err());

        let undeclared = Element::new("catalog")
            .with_child(leaf("unknown"))
            .with_child(footer());
        assert!(dtd.validate(&undeclared).is_err());

        let wrong_root = Element::new("footer");
        assert!(dtd.validate(&wrong_root).is_err());

        let text_in_empty = Element::new("catalog")
            .with_child(entry("1").with_text("oops"))
            .with_child(footer());
        assert!(dtd.validate(&text_in_empty).is_err());
    }

    #[test]
    fn no_internal_subset() {
        assert!(Dtd::parse("offsets SYSTEM \"offsets.dtd\"").is_err());
    }
}
