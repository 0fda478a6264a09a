use core::fmt;
use std::borrow::Cow;

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref HEAD_RE: Regex = Regex::new(
        r"^\s*((?:[a-zA-Z_][a-zA-Z0-9_]*\s*::\s*)*)([a-zA-Z_][a-zA-Z0-9_]*)\s*(<)?"
    )
    .unwrap();
}

/// Structured view of a tag such as `hud::Bar<hud::Style, i32>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeTagInfo<'s> {
    pub namespace: Vec<Cow<'s, str>>,
    pub name: Cow<'s, str>,
    pub subtypes: Vec<TypeTagInfo<'s>>,
}

impl fmt::Display for TypeTagInfo<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())?;

        let mut sep = "<";
        for st in &self.subtypes {
            write!(f, "{}{}", sep, st)?;
            sep = ", ";
        }

        if self.subtypes.is_empty() {
            Ok(())
        } else {
            f.write_str(">")
        }
    }
}

impl<'s> TypeTagInfo<'s> {
    /// Parses a whole tag; trailing input makes the tag invalid.
    pub fn parse(s: &'s str) -> Option<TypeTagInfo<'s>> {
        let (info, rest) = TypeTagInfo::parse_inner(s)?;

        if rest.trim().is_empty() {
            Some(info)
        } else {
            None
        }
    }

    /// Namespace and name joined with `::`, without subtypes.
    pub fn path(&self) -> String {
        let mut out = String::new();
        for ns in &self.namespace {
            out.push_str(ns);
            out.push_str("::");
        }
        out.push_str(&self.name);
        out
    }

    fn parse_inner(s: &'s str) -> Option<(TypeTagInfo<'s>, &'s str)> {
        let caps = HEAD_RE.captures(s)?;
        let ns = caps.get(1).map(|x| x.as_str()).unwrap_or("");
        let name = caps.get(2)?.as_str();
        let has_subtypes = caps.get(3).is_some();
        let mut rest = &s[caps.get(0)?.end()..];

        let namespace = ns
            .split("::")
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(Cow::Borrowed)
            .collect();

        let mut subtypes = Vec::new();
        if has_subtypes {
            loop {
                let (st, tail) = TypeTagInfo::parse_inner(rest)?;
                subtypes.push(st);
                rest = tail.trim_start();

                if let Some(tail) = rest.strip_prefix(',') {
                    rest = tail;
                } else if let Some(tail) = rest.strip_prefix('>') {
                    rest = tail;
                    break;
                } else {
                    return None;
                }
            }
        }

        Some((
            Self {
                namespace,
                name: Cow::Borrowed(name),
                subtypes,
            },
            rest,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::TypeTagInfo;

    #[test]
    fn parses_namespaced_generic_tag() {
        let info = TypeTagInfo::parse("hud :: Bar<hud::Style, i32>").unwrap();

        assert_eq!(info.namespace, vec!["hud"]);
        assert_eq!(info.name, "Bar");
        assert_eq!(info.subtypes.len(), 2);
        assert_eq!(info.subtypes[0].path(), "hud::Style");
        assert_eq!(info.to_string(), "hud::Bar<hud::Style, i32>");
    }

    #[test]
    fn nested_subtypes() {
        let info = TypeTagInfo::parse("a::Outer<b::Mid<c::Inner>, u8>").unwrap();

        assert_eq!(info.subtypes[0].subtypes[0].path(), "c::Inner");
        assert_eq!(info.subtypes[1].name, "u8");
    }

    #[test]
    fn sibling_generics_keep_their_own_brackets() {
        let info = TypeTagInfo::parse("A<B<C>, D<E>>").unwrap();

        assert_eq!(info.subtypes.len(), 2);
        assert_eq!(info.subtypes[0].to_string(), "B<C>");
        assert_eq!(info.subtypes[1].to_string(), "D<E>");
    }

    #[test]
    fn rejects_garbage() {
        assert!(TypeTagInfo::parse("").is_none());
        assert!(TypeTagInfo::parse("1Widget").is_none());
        assert!(TypeTagInfo::parse("hud::").is_none());
        assert!(TypeTagInfo::parse("Bar<i32").is_none());
        assert!(TypeTagInfo::parse("Bar<i32> extra").is_none());
        assert!(TypeTagInfo::parse("not a tag!").is_none());
    }

    #[test]
    fn whitespace_does_not_change_identity() {
        assert_eq!(
            TypeTagInfo::parse("hud::Bar<i32,u8>"),
            TypeTagInfo::parse(" hud :: Bar < i32 , u8 > ")
        );
    }
}
