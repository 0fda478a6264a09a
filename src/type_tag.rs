mod info;

use core::fmt;
use std::borrow::Cow;

pub use info::TypeTagInfo;

/// Textual name a concrete type is registered under, e.g. `hud::Widget`.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeTag(Cow<'static, str>);

impl TypeTag {
    #[inline]
    pub const fn from_static(tag: &'static str) -> Self {
        Self(Cow::Borrowed(tag))
    }

    /// Tag derived from the compiler's type name. Used for element types
    /// that carry no explicit tag, trait objects included.
    #[inline]
    pub fn of<T: ?Sized>() -> Self {
        Self::from_static(std::any::type_name::<T>())
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[inline]
    pub fn info(&self) -> Option<TypeTagInfo<'_>> {
        TypeTagInfo::parse(&self.0)
    }

    /// Checks the tag parses as `ns::Name<Sub, ...>`.
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.info().is_some()
    }

    /// The tag rewritten as `ns::Name<Sub, ...>` with no stray whitespace,
    /// or `None` when it does not parse.
    pub fn canonical(&self) -> Option<TypeTag> {
        let info = self.info()?;
        let canonical = info.to_string();

        if canonical == self.as_str() {
            Some(self.clone())
        } else {
            Some(TypeTag(Cow::Owned(canonical)))
        }
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeTag({})", &self.0)
    }
}

impl From<&'static str> for TypeTag {
    fn from(tag: &'static str) -> Self {
        Self::from_static(tag)
    }
}

impl From<String> for TypeTag {
    fn from(tag: String) -> Self {
        Self(Cow::Owned(tag))
    }
}

impl From<TypeTagInfo<'_>> for TypeTag {
    fn from(info: TypeTagInfo<'_>) -> Self {
        Self(Cow::Owned(info.to_string()))
    }
}

impl PartialEq<str> for TypeTag {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for TypeTag {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

pub trait TypeTagged {
    #[allow(non_snake_case)]
    fn TYPE_TAG() -> TypeTag
    where
        Self: Sized;

    fn type_tag(&self) -> TypeTag;
}

#[cfg(test)]
mod tests {
    use super::TypeTag;

    #[test]
    fn display_and_compare() {
        let tag = TypeTag::from_static("hud::Widget");

        assert_eq!(tag, "hud::Widget");
        assert_eq!(tag.to_string(), "hud::Widget");
        assert_eq!(format!("{:?}", tag), "TypeTag(hud::Widget)");
        assert_eq!(tag, TypeTag::from(String::from("hud::Widget")));
    }

    #[test]
    fn compiler_names_are_valid_tags() {
        assert!(TypeTag::of::<Vec<u8>>().is_valid());
        assert!(TypeTag::of::<std::collections::HashMap<String, i32>>().is_valid());
    }

    #[test]
    fn normalized_through_info() {
        let tag = TypeTag::from_static(" hud :: Bar<i32,u8>");
        let info = tag.info().unwrap();

        assert_eq!(TypeTag::from(info), "hud::Bar<i32, u8>");
        assert_eq!(tag.canonical().unwrap(), "hud::Bar<i32, u8>");
    }

    #[test]
    fn canonical_tag_is_kept_as_is() {
        let tag = TypeTag::from_static("hud::Widget");

        assert_eq!(tag.canonical(), Some(tag.clone()));
        assert_eq!(TypeTag::from_static("hud::").canonical(), None);
    }
}
