use super::Error;
use crate::jvm::code::{FieldRef, MethodRef};
use crate::jvm::{
    BinaryName, FieldType, MethodDescriptor, Name, ParseDescriptor, RefType, UnqualifiedName,
};
use std::collections::{BTreeMap, HashMap};

fn make_name<N: Name>(name: impl Into<String>) -> Result<N, Error> {
    N::from_string(name.into()).map_err(Error::MalformedName)
}

fn make_descriptor<D: ParseDescriptor>(descriptor: &str) -> Result<D, Error> {
    D::parse(descriptor)
        .map_err(|err| Error::MalformedDescriptor(format!("'{}': {}", descriptor, err)))
}

/// Everything the pipeline needs to know about the client being patched
pub struct Settings {
    /// Static field whose value is always `false`, used to build opaque predicates
    pub sentinel: FieldRef,

    /// Where the embedded RSA key lives
    pub key_fields: KeyFields,

    /// Key which replaces the embedded one
    pub public_key: RsaPublicKey,

    /// Variants to synthesize, grouped by the class declaring them
    pub variants: BTreeMap<BinaryName, Vec<MethodVariants>>,

    pub platform_fix: PlatformFix,

    /// Output names of renamed classes
    ///
    /// Classes missing from the table keep their name.
    pub mappings: HashMap<BinaryName, BinaryName>,

    /// Type-check every method before encoding
    pub verify: bool,
}

impl Settings {
    /// Settings with the default sentinel and platform fix, no variants, and no renaming
    pub fn new(key_fields: KeyFields, public_key: RsaPublicKey) -> Result<Settings, Error> {
        Ok(Settings {
            sentinel: sentinel_field("client", "ob", "Z")?,
            key_fields,
            public_key,
            variants: BTreeMap::new(),
            platform_fix: PlatformFix::default(),
            mappings: HashMap::new(),
            verify: true,
        })
    }

    /// Add a rename, checking both names
    pub fn add_mapping(&mut self, from: &str, to: &str) -> Result<(), Error> {
        self.mappings.insert(make_name(from)?, make_name(to)?);
        Ok(())
    }
}

/// Build the reference to a sentinel field from its textual parts (eg. `client`, `ob`, `Z`)
pub fn sentinel_field(owner: &str, name: &str, descriptor: &str) -> Result<FieldRef, Error> {
    Ok(FieldRef {
        owner: make_name(owner)?,
        name: make_name(name)?,
        descriptor: make_descriptor(descriptor)?,
    })
}

/// Static field of some class, written `class.field`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldLocation {
    pub class: BinaryName,
    pub field: UnqualifiedName,
}

impl FieldLocation {
    /// Split on the first `.` (class names use `/` as a separator, so never contain one)
    pub fn parse(location: &str) -> Result<FieldLocation, Error> {
        match location.split_once('.') {
            Some((class, field)) if !class.is_empty() && !field.is_empty() => Ok(FieldLocation {
                class: make_name(class)?,
                field: make_name(field)?,
            }),
            _ => Err(Error::MalformedKeyField(location.to_owned())),
        }
    }
}

/// Fields holding the modulus and exponent of the embedded RSA key
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeyFields {
    pub modulus: FieldLocation,
    pub exponent: FieldLocation,
}

impl KeyFields {
    pub fn parse(modulus: &str, exponent: &str) -> Result<KeyFields, Error> {
        Ok(KeyFields {
            modulus: FieldLocation::parse(modulus)?,
            exponent: FieldLocation::parse(exponent)?,
        })
    }
}

/// Public half of an RSA key, as the decimal strings `BigInteger` gets constructed from
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RsaPublicKey {
    pub modulus: String,
    pub exponent: String,
}

impl RsaPublicKey {
    pub fn new(modulus: String, exponent: String) -> Result<RsaPublicKey, Error> {
        for (what, digits) in [("modulus", &modulus), ("exponent", &exponent)] {
            if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
                return Err(Error::MalformedKey(format!(
                    "{} '{}' is not a decimal number",
                    what, digits
                )));
            }
        }
        Ok(RsaPublicKey { modulus, exponent })
    }
}

/// One method of a variant table entry
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MethodInfo {
    pub name: UnqualifiedName,
    pub descriptor: MethodDescriptor<BinaryName>,

    /// Parameter which only exists to change the signature
    pub dummy_index: Option<usize>,

    /// Value passed for the dummy parameter when forwarding to this method (`0` if absent)
    pub dummy_value: Option<i64>,

    /// On a variant: for each parameter of the original method, the parameter of this variant
    /// feeding it. Needed once the original has more than two real parameters.
    pub arg_mapping: Option<Vec<usize>>,
}

impl MethodInfo {
    pub fn new(name: &str, descriptor: &str) -> Result<MethodInfo, Error> {
        Ok(MethodInfo {
            name: make_name(name)?,
            descriptor: make_descriptor(descriptor)?,
            dummy_index: None,
            dummy_value: None,
            arg_mapping: None,
        })
    }

    pub fn with_dummy(mut self, index: usize, value: i64) -> MethodInfo {
        self.dummy_index = Some(index);
        self.dummy_value = Some(value);
        self
    }

    pub fn with_arg_mapping(mut self, mapping: Vec<usize>) -> MethodInfo {
        self.arg_mapping = Some(mapping);
        self
    }
}

/// Canonical method along with the variants forwarding to it
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MethodVariants {
    /// Human readable label, only used in logs
    pub name: String,
    pub method: MethodInfo,
    pub variants: Vec<MethodInfo>,
}

/// Call to replace inside mouse handlers
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlatformFix {
    /// Method (in any class) whose calls get replaced
    pub method: UnqualifiedName,

    /// Instance method being called
    pub call: UnqualifiedName,
    pub call_descriptor: MethodDescriptor<BinaryName>,

    /// Static method called instead, taking the receiver of `call` as its only argument
    pub replacement: MethodRef,
}

impl Default for PlatformFix {
    fn default() -> PlatformFix {
        PlatformFix {
            method: UnqualifiedName::MOUSEPRESSED,
            call: UnqualifiedName::ISMETADOWN,
            call_descriptor: MethodDescriptor {
                parameters: vec![],
                return_type: Some(FieldType::boolean()),
            },
            replacement: MethodRef {
                owner: RefType::Object(BinaryName::SWINGUTILITIES),
                name: UnqualifiedName::ISRIGHTMOUSEBUTTON,
                descriptor: MethodDescriptor {
                    parameters: vec![FieldType::object(BinaryName::MOUSEEVENT)],
                    return_type: Some(FieldType::boolean()),
                },
                is_interface: false,
            },
        }
    }
}

impl PlatformFix {
    /// Build the fix from textual names (eg. `mousePressed`, `isMetaDown`, `()Z`,
    /// `javax/swing/SwingUtilities`, `isRightMouseButton`, `(Ljava/awt/event/MouseEvent;)Z`)
    pub fn parse(
        method: &str,
        call: &str,
        call_descriptor: &str,
        replacement_owner: &str,
        replacement_name: &str,
        replacement_descriptor: &str,
    ) -> Result<PlatformFix, Error> {
        Ok(PlatformFix {
            method: make_name(method)?,
            call: make_name(call)?,
            call_descriptor: make_descriptor(call_descriptor)?,
            replacement: MethodRef {
                owner: RefType::Object(make_name(replacement_owner)?),
                name: make_name(replacement_name)?,
                descriptor: make_descriptor(replacement_descriptor)?,
                is_interface: false,
            },
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::jvm::RenderDescriptor;

    #[test]
    fn field_locations() {
        let location = FieldLocation::parse("cb.n").unwrap();
        assert_eq!(location.class.as_str(), "cb");
        assert_eq!(location.field.as_str(), "n");

        let nested = FieldLocation::parse("a/b/Key.MODULUS").unwrap();
        assert_eq!(nested.class.as_str(), "a/b/Key");

        for bad in ["nodot", ".field", "class.", ""] {
            assert!(matches!(
                FieldLocation::parse(bad),
                Err(Error::MalformedKeyField(_))
            ));
        }
        assert!(matches!(
            FieldLocation::parse("a.b.c"),
            Err(Error::MalformedName(_))
        ));
    }

    #[test]
    fn keys_must_be_decimal() {
        assert!(RsaPublicKey::new("123".to_owned(), "65537".to_owned()).is_ok());
        assert!(matches!(
            RsaPublicKey::new("0x1f".to_owned(), "3".to_owned()),
            Err(Error::MalformedKey(_))
        ));
        assert!(matches!(
            RsaPublicKey::new("17".to_owned(), String::new()),
            Err(Error::MalformedKey(_))
        ));
    }

    #[test]
    fn defaults() {
        let settings = Settings::new(
            KeyFields::parse("a.b", "a.c").unwrap(),
            RsaPublicKey::new("7".to_owned(), "3".to_owned()).unwrap(),
        )
        .unwrap();
        assert_eq!(settings.sentinel.to_string(), "client.ob : Z");
        assert!(settings.verify);
        assert_eq!(
            settings.platform_fix.replacement.to_string(),
            "javax/swing/SwingUtilities.isRightMouseButton(Ljava/awt/event/MouseEvent;)Z"
        );
        assert_eq!(settings.platform_fix.call_descriptor.render(), "()Z");
    }

    #[test]
    fn method_infos() {
        let info = MethodInfo::new("f", "(II)V").unwrap().with_dummy(1, -3);
        assert_eq!(info.descriptor.parameters.len(), 2);
        assert_eq!(info.dummy_value, Some(-3));
        assert!(matches!(
            MethodInfo::new("f", "(II"),
            Err(Error::MalformedDescriptor(_))
        ));
        assert!(matches!(
            MethodInfo::new("a/b", "()V"),
            Err(Error::MalformedName(_))
        ));
    }
}
