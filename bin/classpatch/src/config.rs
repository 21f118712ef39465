use crate::error::Error;
use classpatch::jvm::{BinaryName, Name};
use classpatch::patch::{
    self, KeyFields, MethodInfo, MethodVariants, PlatformFix, RsaPublicKey, Settings,
};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

/// Contents of the configuration file
#[derive(Deserialize, Debug)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub sentinel: SentinelConfig,
    pub key_fields: KeyFieldsConfig,

    /// Variant tables, keyed by the class declaring the methods
    #[serde(default)]
    pub variants: BTreeMap<String, Vec<VariantsConfig>>,

    /// Old class name to new class name
    #[serde(default)]
    pub mappings: BTreeMap<String, String>,

    #[serde(default)]
    pub platform_fix: PlatformFixConfig,

    #[serde(default = "default_verify")]
    pub verify: bool,
}

fn default_verify() -> bool {
    true
}

#[derive(Deserialize, Debug)]
#[serde(default, deny_unknown_fields)]
pub struct SentinelConfig {
    pub owner: String,
    pub name: String,
    pub descriptor: String,
}

impl Default for SentinelConfig {
    fn default() -> SentinelConfig {
        SentinelConfig {
            owner: String::from("client"),
            name: String::from("ob"),
            descriptor: String::from("Z"),
        }
    }
}

/// Locations of the key, each as `class.field`
#[derive(Deserialize, Debug)]
#[serde(deny_unknown_fields)]
pub struct KeyFieldsConfig {
    pub modulus: String,
    pub exponent: String,
}

#[derive(Deserialize, Debug)]
#[serde(deny_unknown_fields)]
pub struct VariantsConfig {
    pub name: String,
    pub method: MethodConfig,
    pub variants: Vec<MethodConfig>,
}

#[derive(Deserialize, Debug)]
#[serde(deny_unknown_fields)]
pub struct MethodConfig {
    pub name: String,
    pub descriptor: String,
    #[serde(default)]
    pub dummy_index: Option<usize>,
    #[serde(default)]
    pub dummy_value: Option<DummyValue>,
    #[serde(default)]
    pub arg_mapping: Option<Vec<usize>>,
}

/// Dummy constant, either a number or a boolean (`true` is passed as `1`)
#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(untagged)]
pub enum DummyValue {
    Number(i64),
    Boolean(bool),
}

impl DummyValue {
    fn as_i64(self) -> i64 {
        match self {
            DummyValue::Number(value) => value,
            DummyValue::Boolean(value) => i64::from(value),
        }
    }
}

#[derive(Deserialize, Debug)]
#[serde(default, deny_unknown_fields)]
pub struct PlatformFixConfig {
    pub method: String,
    pub call: String,
    pub call_descriptor: String,
    pub replacement_owner: String,
    pub replacement_name: String,
    pub replacement_descriptor: String,
}

impl Default for PlatformFixConfig {
    fn default() -> PlatformFixConfig {
        PlatformFixConfig {
            method: String::from("mousePressed"),
            call: String::from("isMetaDown"),
            call_descriptor: String::from("()Z"),
            replacement_owner: String::from("javax/swing/SwingUtilities"),
            replacement_name: String::from("isRightMouseButton"),
            replacement_descriptor: String::from("(Ljava/awt/event/MouseEvent;)Z"),
        }
    }
}

impl MethodConfig {
    fn to_method_info(&self) -> Result<MethodInfo, patch::Error> {
        let mut info = MethodInfo::new(&self.name, &self.descriptor)?;
        info.dummy_index = self.dummy_index;
        info.dummy_value = self.dummy_value.map(DummyValue::as_i64);
        info.arg_mapping = self.arg_mapping.clone();
        Ok(info)
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Config, Error> {
        let text = std::fs::read_to_string(path)?;
        Config::parse(&text)
    }

    pub fn parse(text: &str) -> Result<Config, Error> {
        Ok(serde_json::from_str(text)?)
    }

    /// Check every name and descriptor, and combine with the replacement key
    pub fn into_settings(self, public_key: RsaPublicKey) -> Result<Settings, patch::Error> {
        let key_fields = KeyFields::parse(&self.key_fields.modulus, &self.key_fields.exponent)?;
        let mut settings = Settings::new(key_fields, public_key)?;
        settings.sentinel = patch::sentinel_field(
            &self.sentinel.owner,
            &self.sentinel.name,
            &self.sentinel.descriptor,
        )?;

        for (class, tables) in &self.variants {
            let class =
                BinaryName::from_string(class.clone()).map_err(patch::Error::MalformedName)?;
            let mut entries = vec![];
            for table in tables {
                entries.push(MethodVariants {
                    name: table.name.clone(),
                    method: table.method.to_method_info()?,
                    variants: table
                        .variants
                        .iter()
                        .map(MethodConfig::to_method_info)
                        .collect::<Result<_, _>>()?,
                });
            }
            settings.variants.insert(class, entries);
        }

        for (from, to) in &self.mappings {
            settings.add_mapping(from, to)?;
        }

        let fix = &self.platform_fix;
        settings.platform_fix = PlatformFix::parse(
            &fix.method,
            &fix.call,
            &fix.call_descriptor,
            &fix.replacement_owner,
            &fix.replacement_name,
            &fix.replacement_descriptor,
        )?;
        settings.verify = self.verify;
        Ok(settings)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn key() -> RsaPublicKey {
        RsaPublicKey::new(String::from("3233"), String::from("17")).unwrap()
    }

    #[test]
    fn minimal() {
        let config =
            Config::parse(r#"{ "key_fields": { "modulus": "cb.n", "exponent": "cb.e" } }"#).unwrap();
        let settings = config.into_settings(key()).unwrap();
        assert_eq!(settings.sentinel.name.as_str(), "ob");
        assert_eq!(settings.platform_fix, PlatformFix::default());
        assert!(settings.verify);
        assert!(settings.variants.is_empty());
        assert!(settings.mappings.is_empty());
    }

    #[test]
    fn full() {
        let config = Config::parse(
            r#"{
                "sentinel": { "owner": "client", "name": "qa", "descriptor": "Z" },
                "key_fields": { "modulus": "cb.n", "exponent": "cb.e" },
                "variants": {
                    "pk": [{
                        "name": "writeByte",
                        "method": { "name": "f", "descriptor": "(II)V", "dummy_index": 1, "dummy_value": 0 },
                        "variants": [
                            { "name": "g", "descriptor": "(I)V" },
                            { "name": "h", "descriptor": "(BI)V", "dummy_index": 0, "arg_mapping": [1, 1] },
                            { "name": "i", "descriptor": "(ZI)V", "dummy_index": 0, "dummy_value": true }
                        ]
                    }]
                },
                "mappings": { "cb": "rsa/Key" },
                "verify": false
            }"#,
        )
        .unwrap();
        let settings = config.into_settings(key()).unwrap();
        assert_eq!(settings.sentinel.name.as_str(), "qa");
        assert!(!settings.verify);

        let tables = &settings.variants[&BinaryName::from_str("pk").unwrap()];
        assert_eq!(tables[0].method.dummy_index, Some(1));
        assert_eq!(tables[0].method.dummy_value, Some(0));
        assert_eq!(tables[0].variants.len(), 3);
        assert_eq!(tables[0].variants[1].arg_mapping, Some(vec![1, 1]));
        assert_eq!(tables[0].variants[2].dummy_value, Some(1));
        assert_eq!(
            settings.mappings[&BinaryName::from_str("cb").unwrap()].as_str(),
            "rsa/Key"
        );
    }

    #[test]
    fn rejects_bad_input() {
        assert!(matches!(Config::parse("{}"), Err(Error::Json(_))));
        let extra = r#"{ "key_fields": { "modulus": "a.b", "exponent": "a.c" }, "extra": 1 }"#;
        assert!(matches!(Config::parse(extra), Err(Error::Json(_))));
        let dummy = r#"{
            "key_fields": { "modulus": "a.b", "exponent": "a.c" },
            "variants": { "pk": [{
                "name": "w",
                "method": { "name": "f", "descriptor": "(I)V", "dummy_index": 0, "dummy_value": "1" },
                "variants": []
            }] }
        }"#;
        assert!(matches!(Config::parse(dummy), Err(Error::Json(_))));

        let config =
            Config::parse(r#"{ "key_fields": { "modulus": "nodot", "exponent": "cb.e" } }"#).unwrap();
        assert!(matches!(
            config.into_settings(key()),
            Err(patch::Error::MalformedKeyField(_))
        ));

        let config = Config::parse(
            r#"{ "key_fields": { "modulus": "cb.n", "exponent": "cb.e" }, "mappings": { "a": "b;" } }"#,
        )
        .unwrap();
        assert!(matches!(
            config.into_settings(key()),
            Err(patch::Error::MalformedName(_))
        ));
    }
}
