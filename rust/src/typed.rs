//! Typed view over the string-only model: values are coerced to the scalar
//! they look like, and coerced values are written back with a canonical string
//! form so a second conversion gives the same result.

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::config::CryptConfig;
use crate::ini::{IniError, TextFormat};

/// Section dropped from the typed view.
pub const ROOT_SECTION: &str = "root";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TypedValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    None,
    Str(String),
}

pub type TypedConfigDict = IndexMap<String, IndexMap<String, TypedValue>>;

impl TypedValue {
    /// `True`/`False`/`None` literals first, then a float when the text has a
    /// decimal point, otherwise an integer. Anything else stays a string.
    pub fn coerce(raw: &str) -> Self {
        match raw {
            "True" => return TypedValue::Bool(true),
            "False" => return TypedValue::Bool(false),
            "None" => return TypedValue::None,
            _ => {}
        }
        if raw.contains('.') {
            // overflow to inf would not survive a write and re-read
            match raw.parse::<f64>() {
                Ok(f) if f.is_finite() => return TypedValue::Float(f),
                _ => {}
            }
        } else if let Ok(i) = raw.parse::<i64>() {
            return TypedValue::Int(i);
        }
        TypedValue::Str(raw.to_string())
    }
}

impl fmt::Display for TypedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypedValue::Bool(true) => f.write_str("True"),
            TypedValue::Bool(false) => f.write_str("False"),
            TypedValue::Int(i) => write!(f, "{i}"),
            TypedValue::Float(x) if x.is_nan() => f.write_str("nan"),
            TypedValue::Float(x) if x.is_infinite() => {
                f.write_str(if *x > 0.0 { "inf" } else { "-inf" })
            }
            TypedValue::Float(x) => {
                let text = x.to_string();
                // keep a decimal point so the value reads back as a float
                if text.contains('.') {
                    f.write_str(&text)
                } else {
                    write!(f, "{text}.0")
                }
            }
            TypedValue::None => f.write_str("None"),
            TypedValue::Str(s) => f.write_str(s),
        }
    }
}

/// Coerces every visible option (defaults included, interpolated) of every
/// section. The `root` section is left out.
pub fn to_typed_dict<F: TextFormat>(config: &CryptConfig<F>) -> Result<TypedConfigDict, IniError> {
    let mut dict = TypedConfigDict::new();
    for section in config.sections() {
        if section == ROOT_SECTION {
            continue;
        }
        let values = config
            .items(section)?
            .into_iter()
            .map(|(key, value)| (key, TypedValue::coerce(&value)))
            .collect();
        dict.insert(section.to_string(), values);
    }
    Ok(dict)
}

/// Builds a fresh config holding the canonical string form of every value.
pub fn from_typed_dict(dict: &TypedConfigDict) -> Result<CryptConfig, IniError> {
    let mut config = CryptConfig::new();
    for (section, values) in dict {
        config.add_section(section)?;
        for (key, value) in values {
            config.set(section, key, value.to_string())?;
        }
    }
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dict(entries: &[(&str, &[(&str, TypedValue)])]) -> TypedConfigDict {
        entries
            .iter()
            .map(|(section, values)| {
                let values = values
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.clone()))
                    .collect();
                (section.to_string(), values)
            })
            .collect()
    }

    #[test]
    fn coerces_scalars() {
        let mut config = CryptConfig::new();
        config.add_section("s").expect("add");
        for (k, v) in [("n", "42"), ("f", "3.14"), ("b", "True"), ("off", "False"), ("z", "None"), ("t", "text")] {
            config.set("s", k, v).expect("set");
        }
        let typed = to_typed_dict(&config).expect("typed");
        let s = &typed["s"];
        assert_eq!(s["n"], TypedValue::Int(42));
        assert_eq!(s["f"], TypedValue::Float(3.14));
        assert_eq!(s["b"], TypedValue::Bool(true));
        assert_eq!(s["off"], TypedValue::Bool(false));
        assert_eq!(s["z"], TypedValue::None);
        assert_eq!(s["t"], TypedValue::Str("text".into()));
    }

    #[test]
    fn unparseable_numbers_stay_strings() {
        assert_eq!(TypedValue::coerce("1.2.3"), TypedValue::Str("1.2.3".into()));
        assert_eq!(TypedValue::coerce("1e5"), TypedValue::Str("1e5".into()));
        assert_eq!(
            TypedValue::coerce("99999999999999999999"),
            TypedValue::Str("99999999999999999999".into())
        );
        assert_eq!(TypedValue::coerce("-7"), TypedValue::Int(-7));
    }

    #[test]
    fn overflowing_floats_stay_strings() {
        for raw in ["1.0e999", "-1.5e400"] {
            assert_eq!(TypedValue::coerce(raw), TypedValue::Str(raw.into()));
        }
        assert_eq!(TypedValue::coerce("1.5e300"), TypedValue::Float(1.5e300));

        let mut config = CryptConfig::new();
        config.add_section("s").expect("add");
        config.set("s", "huge", "1.0e999").expect("set");
        let once = to_typed_dict(&config).expect("typed");
        assert_eq!(once["s"]["huge"], TypedValue::Str("1.0e999".into()));
        let twice = to_typed_dict(&from_typed_dict(&once).expect("from typed")).expect("typed");
        assert_eq!(twice, once);
    }

    #[test]
    fn drops_root_section_and_includes_defaults() {
        let mut config = CryptConfig::new();
        config.add_section("root").expect("add");
        config.add_section("app").expect("add");
        config.set("DEFAULT", "level", "3").expect("set");
        config.set("app", "home", "/srv").expect("set");
        let typed = to_typed_dict(&config).expect("typed");
        assert_eq!(typed.keys().collect::<Vec<_>>(), vec!["app"]);
        assert_eq!(typed["app"]["level"], TypedValue::Int(3));
    }

    #[test]
    fn canonical_strings() {
        assert_eq!(TypedValue::Float(2.0).to_string(), "2.0");
        assert_eq!(TypedValue::Float(3.14).to_string(), "3.14");
        assert_eq!(TypedValue::Float(1e20).to_string(), "100000000000000000000.0");
        assert_eq!(TypedValue::Float(f64::NEG_INFINITY).to_string(), "-inf");
        assert_eq!(TypedValue::Bool(false).to_string(), "False");
        assert_eq!(TypedValue::None.to_string(), "None");
    }

    #[test]
    fn round_trip_is_idempotent() {
        let original = dict(&[(
            "s",
            &[
                ("n", TypedValue::Int(42)),
                ("f", TypedValue::Float(3.14)),
                ("whole", TypedValue::Float(2.0)),
                ("b", TypedValue::Bool(true)),
                ("z", TypedValue::None),
                ("t", TypedValue::Str("hello".into())),
            ],
        )]);
        let config = from_typed_dict(&original).expect("from typed");
        assert_eq!(config.get("s", "whole").expect("get"), "2.0");
        let once = to_typed_dict(&config).expect("typed");
        assert_eq!(once, original);
        let twice = to_typed_dict(&from_typed_dict(&once).expect("from typed")).expect("typed");
        assert_eq!(twice, once);
    }

    #[test]
    fn serializes_as_plain_json() {
        let typed = dict(&[(
            "s",
            &[
                ("n", TypedValue::Int(1)),
                ("b", TypedValue::Bool(false)),
                ("z", TypedValue::None),
                ("t", TypedValue::Str("x".into())),
            ],
        )]);
        let json = serde_json::to_string(&typed).expect("json");
        assert_eq!(json, r#"{"s":{"n":1,"b":false,"z":null,"t":"x"}}"#);
    }

    #[test]
    fn rejects_values_that_break_interpolation() {
        let bad = dict(&[("s", &[("pct", TypedValue::Str("50% off".into()))])]);
        assert!(matches!(
            from_typed_dict(&bad),
            Err(IniError::InterpolationSyntax { .. })
        ));
    }
}
