//! Selector parser
//!
//! Hand-written recursive descent over the selector text. Supports type,
//! universal, id, class and attribute selectors (all operators plus the
//! `i`/`s` flags), the four combinators, and the structural and logical
//! pseudo-classes listed in `PseudoClass`.

use crate::SelectorError;
use crate::selectors::{
    AttributeMatcher, AttributeSelector, Combinator, ComplexSelector, CompoundSelector,
    NthExpression, PseudoClass, SelectorComponent, SelectorList,
};

pub(crate) struct SelectorParser<'a> {
    input: &'a str,
    chars: Vec<char>,
    pos: usize,
}

type ParseResult<T> = Result<T, SelectorError>;

impl<'a> SelectorParser<'a> {
    pub(crate) fn new(input: &'a str) -> Self {
        Self {
            input,
            chars: input.chars().collect(),
            pos: 0,
        }
    }

    pub(crate) fn parse_list(mut self) -> ParseResult<SelectorList> {
        let list = self.selector_list(false)?;
        self.skip_whitespace();
        if self.pos < self.chars.len() {
            return Err(self.error("unexpected trailing input"));
        }
        Ok(list)
    }

    fn error(&self, message: &str) -> SelectorError {
        SelectorError {
            selector: self.input.to_string(),
            position: self.pos,
            message: message.to_string(),
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        Some(c)
    }

    fn eat(&mut self, c: char) -> bool {
        if self.peek() == Some(c) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, c: char) -> ParseResult<()> {
        if self.eat(c) {
            Ok(())
        } else {
            Err(self.error(&format!("expected '{c}'")))
        }
    }

    fn skip_whitespace(&mut self) -> bool {
        let start = self.pos;
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
        self.pos > start
    }

    fn text_between(&self, start: usize, end: usize) -> String {
        self.chars[start..end].iter().collect::<String>().trim().to_string()
    }

    /// Parses until end of input or an unbalanced `)`
    fn selector_list(&mut self, relative: bool) -> ParseResult<SelectorList> {
        let start = self.pos;
        let mut selectors = Vec::new();
        loop {
            self.skip_whitespace();
            selectors.push(self.complex_selector(relative)?);
            self.skip_whitespace();
            if !self.eat(',') {
                break;
            }
        }
        Ok(SelectorList {
            text: self.text_between(start, self.pos),
            selectors,
        })
    }

    fn complex_selector(&mut self, relative: bool) -> ParseResult<ComplexSelector> {
        let start = self.pos;
        let leading = if relative { self.combinator_symbol() } else { None };
        if leading.is_some() {
            self.skip_whitespace();
        }

        let mut compounds = vec![self.compound_selector()?];
        let mut combinators = Vec::new();
        loop {
            let had_space = self.skip_whitespace();
            let combinator = match self.combinator_symbol() {
                Some(c) => {
                    self.skip_whitespace();
                    c
                }
                None if had_space && self.starts_compound() => Combinator::Descendant,
                None => break,
            };
            combinators.push(combinator);
            compounds.push(self.compound_selector()?);
        }

        Ok(ComplexSelector {
            text: self.text_between(start, self.pos),
            compounds,
            combinators,
            leading,
        })
    }

    fn combinator_symbol(&mut self) -> Option<Combinator> {
        let combinator = match self.peek()? {
            '>' => Combinator::Child,
            '+' => Combinator::NextSibling,
            '~' => Combinator::SubsequentSibling,
            _ => return None,
        };
        self.pos += 1;
        Some(combinator)
    }

    fn starts_compound(&self) -> bool {
        matches!(self.peek(), Some(c) if c == '*' || c == '#' || c == '.' || c == '[' || c == ':' || is_ident_start(c))
    }

    fn compound_selector(&mut self) -> ParseResult<CompoundSelector> {
        let mut components = Vec::new();

        if self.eat('*') {
            components.push(SelectorComponent::Universal);
        } else if self.peek().is_some_and(is_ident_start) {
            components.push(SelectorComponent::Type(self.identifier()?.to_ascii_lowercase()));
        }

        loop {
            match self.peek() {
                Some('#') => {
                    self.pos += 1;
                    components.push(SelectorComponent::Id(self.identifier()?));
                }
                Some('.') => {
                    self.pos += 1;
                    components.push(SelectorComponent::Class(self.identifier()?));
                }
                Some('[') => {
                    self.pos += 1;
                    components.push(SelectorComponent::Attribute(self.attribute()?));
                }
                Some(':') => {
                    self.pos += 1;
                    components.push(SelectorComponent::PseudoClass(self.pseudo_class()?));
                }
                _ => break,
            }
        }

        if components.is_empty() {
            return Err(self.error("expected a selector"));
        }
        Ok(CompoundSelector { components })
    }

    fn identifier(&mut self) -> ParseResult<String> {
        let mut out = String::new();
        while let Some(c) = self.peek() {
            if c == '\\' {
                self.pos += 1;
                match self.bump() {
                    Some(escaped) => out.push(escaped),
                    None => return Err(self.error("dangling escape")),
                }
            } else if is_ident_char(c) {
                out.push(c);
                self.pos += 1;
            } else {
                break;
            }
        }
        if out.is_empty() {
            return Err(self.error("expected an identifier"));
        }
        Ok(out)
    }

    fn attribute(&mut self) -> ParseResult<AttributeSelector> {
        self.skip_whitespace();
        let name = self.identifier()?.to_ascii_lowercase();
        self.skip_whitespace();

        if self.eat(']') {
            return Ok(AttributeSelector { name, matcher: None, case_insensitive: false });
        }

        let op = match self.bump() {
            Some('=') => None,
            Some(c @ ('~' | '|' | '^' | '$' | '*')) => {
                self.expect('=')?;
                Some(c)
            }
            _ => return Err(self.error("expected attribute operator")),
        };
        self.skip_whitespace();
        let value = match self.peek() {
            Some(q @ ('"' | '\'')) => {
                self.pos += 1;
                self.quoted(q)?
            }
            _ => self.identifier()?,
        };
        self.skip_whitespace();

        let mut case_insensitive = false;
        if let Some(flag) = self.peek().filter(|c| matches!(*c, 'i' | 'I' | 's' | 'S')) {
            self.pos += 1;
            case_insensitive = flag.eq_ignore_ascii_case(&'i');
            self.skip_whitespace();
        }
        self.expect(']')?;

        let matcher = match op {
            None => AttributeMatcher::Exact(value),
            Some('~') => AttributeMatcher::Includes(value),
            Some('|') => AttributeMatcher::DashMatch(value),
            Some('^') => AttributeMatcher::Prefix(value),
            Some('$') => AttributeMatcher::Suffix(value),
            Some(_) => AttributeMatcher::Substring(value),
        };
        Ok(AttributeSelector { name, matcher: Some(matcher), case_insensitive })
    }

    fn quoted(&mut self, quote: char) -> ParseResult<String> {
        let mut out = String::new();
        loop {
            match self.bump() {
                Some('\\') => match self.bump() {
                    Some(escaped) => out.push(escaped),
                    None => return Err(self.error("dangling escape")),
                },
                Some(c) if c == quote => return Ok(out),
                Some(c) => out.push(c),
                None => return Err(self.error("unterminated string")),
            }
        }
    }

    fn pseudo_class(&mut self) -> ParseResult<PseudoClass> {
        if self.peek() == Some(':') {
            return Err(self.error("pseudo-elements never match elements"));
        }
        let name = self.identifier()?.to_ascii_lowercase();
        let pseudo = match name.as_str() {
            "root" => PseudoClass::Root,
            "empty" => PseudoClass::Empty,
            "first-child" => PseudoClass::FirstChild,
            "last-child" => PseudoClass::LastChild,
            "only-child" => PseudoClass::OnlyChild,
            "first-of-type" => PseudoClass::FirstOfType,
            "last-of-type" => PseudoClass::LastOfType,
            "nth-child" | "nth-last-child" => {
                self.expect('(')?;
                let start = self.pos;
                while self.peek().is_some_and(|c| c != ')') {
                    self.pos += 1;
                }
                let arg = self.text_between(start, self.pos);
                self.expect(')')?;
                let expr = NthExpression::parse(&arg).ok_or_else(|| self.error("invalid An+B expression"))?;
                if name == "nth-child" {
                    PseudoClass::NthChild(expr)
                } else {
                    PseudoClass::NthLastChild(expr)
                }
            }
            "not" | "is" | "where" | "matches" | "has" => {
                self.expect('(')?;
                let list = self.selector_list(name == "has")?;
                self.skip_whitespace();
                self.expect(')')?;
                match name.as_str() {
                    "not" => PseudoClass::Not(list),
                    "has" => PseudoClass::Has(list),
                    _ => PseudoClass::Is(list),
                }
            }
            _ => return Err(self.error(&format!("unsupported pseudo-class :{name}"))),
        };
        Ok(pseudo)
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_' || c == '-' || c == '\\' || !c.is_ascii()
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '-' || !c.is_ascii()
}

#[cfg(test)]
mod tests {
    use crate::parse_selector;
    use crate::selectors::*;

    #[test]
    fn test_parse_compound() {
        let list = parse_selector("div._5b-_").unwrap();
        assert_eq!(list.selectors.len(), 1);
        assert_eq!(
            list.selectors[0].compounds[0].components,
            vec![SelectorComponent::Type("div".to_string()), SelectorComponent::Class("_5b-_".to_string())]
        );
    }

    #[test]
    fn test_parse_attribute_forms() {
        let list = parse_selector("a[onclick^='LinkshimAsyncLink.referrer_log'], a[href*='fbclid=' i], div[data-sigil=inlineVideo]").unwrap();
        assert_eq!(list.selectors.len(), 3);

        let attr = |i: usize| match &list.selectors[i].compounds[0].components[1] {
            SelectorComponent::Attribute(a) => a.clone(),
            other => panic!("unexpected {other:?}"),
        };
        assert_eq!(attr(0).matcher, Some(AttributeMatcher::Prefix("LinkshimAsyncLink.referrer_log".to_string())));
        assert!(attr(1).case_insensitive);
        assert_eq!(attr(2).matcher, Some(AttributeMatcher::Exact("inlineVideo".to_string())));
        assert_eq!(list.selectors[1].text, "a[href*='fbclid=' i]");
    }

    #[test]
    fn test_parse_combinators() {
        let list = parse_selector("div[role=feed] > div  span + a ~ b").unwrap();
        let sel = &list.selectors[0];
        assert_eq!(sel.compounds.len(), 5);
        assert_eq!(
            sel.combinators,
            vec![Combinator::Child, Combinator::Descendant, Combinator::NextSibling, Combinator::SubsequentSibling]
        );
    }

    #[test]
    fn test_parse_has_relative() {
        let list = parse_selector("div:has(> span.label)").unwrap();
        let SelectorComponent::PseudoClass(PseudoClass::Has(inner)) = &list.selectors[0].compounds[0].components[1] else {
            panic!("expected :has");
        };
        assert_eq!(inner.selectors[0].leading, Some(Combinator::Child));
    }

    #[test]
    fn test_parse_errors() {
        assert!(parse_selector("").is_err());
        assert!(parse_selector("div,").is_err());
        assert!(parse_selector("a[href").is_err());
        assert!(parse_selector("a::before").is_err());
        assert!(parse_selector("a:hover").is_err());
        assert!(parse_selector("a[href='x]").is_err());
    }
}
