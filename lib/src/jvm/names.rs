use std::borrow::Cow;
use std::fmt;

/// Validated name, cheap to clone when it comes from a constant
pub trait Name: Sized {
    /// Why `name` would be rejected, if it would be
    fn check_valid(name: &str) -> Result<(), String>;

    fn as_cow(&self) -> &Cow<'static, str>;

    fn as_str(&self) -> &str {
        self.as_cow().as_ref()
    }

    fn from_string(name: String) -> Result<Self, String>;

    fn from_str(name: &str) -> Result<Self, String> {
        Self::from_string(name.to_owned())
    }
}

macro_rules! name_type {
    ($(#[$attr:meta])* $name:ident) => {
        $(#[$attr])*
        #[derive(Clone, Hash, Eq, PartialEq, PartialOrd, Ord)]
        pub struct $name(Cow<'static, str>);

        impl $name {
            const fn constant(value: &'static str) -> $name {
                $name(Cow::Borrowed(value))
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

name_type! {
    /// Name of a method or field (JVMS 4.2.2)
    UnqualifiedName
}

name_type! {
    /// Name of a class or interface in internal form, eg. `java/lang/Object` (JVMS 4.2.1)
    BinaryName
}

impl Name for UnqualifiedName {
    fn check_valid(name: &str) -> Result<(), String> {
        if name.is_empty() {
            return Err(String::from("Unqualified name is empty"));
        }
        match name.chars().find(|c| matches!(c, '.' | ';' | '[' | '/')) {
            Some(c) => Err(format!("Unqualified name '{}' contains '{}'", name, c)),
            None => Ok(()),
        }
    }

    fn as_cow(&self) -> &Cow<'static, str> {
        &self.0
    }

    fn from_string(name: String) -> Result<Self, String> {
        Self::check_valid(&name)?;
        Ok(UnqualifiedName(Cow::Owned(name)))
    }
}

impl Name for BinaryName {
    /// Every `/`-separated segment must be a valid unqualified name
    fn check_valid(name: &str) -> Result<(), String> {
        if name.is_empty() {
            return Err(String::from("Binary name is empty"));
        }
        name.split('/')
            .try_for_each(UnqualifiedName::check_valid)
            .map_err(|err| format!("Binary name '{}': {}", name, err))
    }

    fn as_cow(&self) -> &Cow<'static, str> {
        &self.0
    }

    fn from_string(name: String) -> Result<Self, String> {
        Self::check_valid(&name)?;
        Ok(BinaryName(Cow::Owned(name)))
    }
}

impl UnqualifiedName {
    pub const INIT: Self = Self::constant("<init>");
    pub const CLINIT: Self = Self::constant("<clinit>");

    pub const ISMETADOWN: Self = Self::constant("isMetaDown");
    pub const ISRIGHTMOUSEBUTTON: Self = Self::constant("isRightMouseButton");
    pub const MOUSEPRESSED: Self = Self::constant("mousePressed");
}

impl BinaryName {
    pub const BIGINTEGER: Self = Self::constant("java/math/BigInteger");
    pub const CLASS: Self = Self::constant("java/lang/Class");
    pub const MOUSEEVENT: Self = Self::constant("java/awt/event/MouseEvent");
    pub const OBJECT: Self = Self::constant("java/lang/Object");
    pub const STRING: Self = Self::constant("java/lang/String");
    pub const SWINGUTILITIES: Self = Self::constant("javax/swing/SwingUtilities");
    pub const THROWABLE: Self = Self::constant("java/lang/Throwable");
}
