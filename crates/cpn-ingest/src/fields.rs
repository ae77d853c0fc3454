//! Typed access to the keys of one raw source record.
//!
//! Every failure is a [`ValidationError`] naming the key, prefixed with the
//! parent key for nested mappings (`Policy.Country`).

use cpn_core::ValidationError;
use serde_json::Value;

/// A raw source record: one mapping from a feed file.
pub type RawRecord = serde_json::Map<String, Value>;

/// Borrowed view over a record, or over a nested mapping within one.
#[derive(Debug, Clone, Copy)]
pub struct Fields<'a> {
    record: &'a RawRecord,
    parent: Option<&'a str>,
}

impl<'a> Fields<'a> {
    /// View over a top-level record.
    pub fn new(record: &'a RawRecord) -> Self {
        Self {
            record,
            parent: None,
        }
    }

    /// Full name of `key` for error messages.
    pub fn path(&self, key: &str) -> String {
        match self.parent {
            Some(parent) => format!("{parent}.{key}"),
            None => key.to_string(),
        }
    }

    /// True if `key` is present with a non-null value.
    pub fn has(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    fn get(&self, key: &str) -> Option<&'a Value> {
        self.record.get(key).filter(|v| !v.is_null())
    }

    fn require(&self, key: &str) -> Result<&'a Value, ValidationError> {
        self.get(key)
            .ok_or_else(|| ValidationError::missing(self.path(key)))
    }

    /// Nested mapping under `key`.
    pub fn mapping(&self, key: &'a str) -> Result<Fields<'a>, ValidationError> {
        match self.require(key)? {
            Value::Object(record) => Ok(Fields {
                record,
                parent: Some(key),
            }),
            other => Err(ValidationError::wrong_type(self.path(key), "mapping", other)),
        }
    }

    /// Required string.
    pub fn str(&self, key: &str) -> Result<&'a str, ValidationError> {
        match self.require(key)? {
            Value::String(s) => Ok(s),
            other => Err(ValidationError::wrong_type(self.path(key), "string", other)),
        }
    }

    /// Optional string; absent and null are `None`.
    pub fn opt_str(&self, key: &str) -> Result<Option<&'a str>, ValidationError> {
        if self.has(key) {
            self.str(key).map(Some)
        } else {
            Ok(None)
        }
    }

    /// Required string holding a separated list, split on `sep`.
    pub fn list(&self, key: &str, sep: &str) -> Result<Vec<&'a str>, ValidationError> {
        Ok(self.str(key)?.split(sep).collect())
    }

    /// Required number.
    pub fn number(&self, key: &str) -> Result<f64, ValidationError> {
        let value = self.require(key)?;
        value
            .as_f64()
            .ok_or_else(|| ValidationError::wrong_type(self.path(key), "number", value))
    }

    /// Optional year: an integer that fits in `i32`. Spreadsheet exports
    /// often write years as `2030.0`, so whole floats are accepted too.
    pub fn opt_year(&self, key: &str) -> Result<Option<i32>, ValidationError> {
        let Some(value) = self.get(key) else {
            return Ok(None);
        };
        let whole = || {
            value
                .as_f64()
                .filter(|n| n.fract() == 0.0)
                .filter(|n| (f64::from(i32::MIN)..=f64::from(i32::MAX)).contains(n))
                .map(|n| n as i32)
        };
        value
            .as_i64()
            .and_then(|n| i32::try_from(n).ok())
            .or_else(whole)
            .map(Some)
            .ok_or_else(|| ValidationError::wrong_type(self.path(key), "integer year", value))
    }

    /// Required pair of numbers, `[low, high]`.
    pub fn pair(&self, key: &str) -> Result<(f64, f64), ValidationError> {
        let value = self.require(key)?;
        let wrong = || ValidationError::wrong_type(self.path(key), "two numbers", value);
        match value.as_array().map(Vec::as_slice) {
            Some([low, high]) => {
                let low = low.as_f64().ok_or_else(wrong)?;
                let high = high.as_f64().ok_or_else(wrong)?;
                Ok((low, high))
            }
            _ => Err(wrong()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> RawRecord {
        match value {
            Value::Object(map) => map,
            _ => panic!("not an object"),
        }
    }

    #[test]
    fn missing_and_null_keys_are_reported_by_name() {
        let r = record(json!({"Unit": null}));
        let f = Fields::new(&r);
        assert_eq!(f.str("Variable"), Err(ValidationError::missing("Variable")));
        assert_eq!(f.str("Unit"), Err(ValidationError::missing("Unit")));
        assert_eq!(f.opt_str("Unit"), Ok(None));
    }

    #[test]
    fn nested_keys_carry_parent_name() {
        let r = record(json!({"Policy": {"Country": 3}}));
        let f = Fields::new(&r).mapping("Policy").unwrap();
        assert_eq!(
            f.str("Name of policy"),
            Err(ValidationError::missing("Policy.Name of policy"))
        );
        assert_eq!(
            f.str("Country"),
            Err(ValidationError::wrong_type("Policy.Country", "string", 3))
        );
    }

    #[test]
    fn years_must_be_integers() {
        let r = record(json!({
            "End year": 2030,
            "Base year": "2005",
            "Other": 2030.5,
            "Float year": 2030.0,
            "Huge": 1e12,
            "Far future": 5_000_000_000i64
        }));
        let f = Fields::new(&r);
        assert_eq!(f.opt_year("End year"), Ok(Some(2030)));
        assert_eq!(f.opt_year("Float year"), Ok(Some(2030)));
        assert_eq!(f.opt_year("Missing"), Ok(None));
        assert!(f.opt_year("Base year").is_err());
        assert!(f.opt_year("Other").is_err());
        assert!(f.opt_year("Huge").is_err());
        assert!(f.opt_year("Far future").is_err());
    }

    #[test]
    fn pair_requires_exactly_two_numbers() {
        let r = record(json!({"ok": [1, 2.5], "short": [1], "text": ["a", 1]}));
        let f = Fields::new(&r);
        assert_eq!(f.pair("ok"), Ok((1.0, 2.5)));
        assert!(f.pair("short").is_err());
        assert!(f.pair("text").is_err());
    }

    #[test]
    fn list_splits_on_separator() {
        let r = record(json!({"Sector name": "ENERGY, TRANSPORT"}));
        assert_eq!(
            Fields::new(&r).list("Sector name", ", ").unwrap(),
            vec!["ENERGY", "TRANSPORT"]
        );
    }
}
