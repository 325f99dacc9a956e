//! Locale string tables.
//!
//! Each supported locale may have `locales/<locale>.toml`. Nested tables are
//! flattened with `.`, so
//!
//! ```toml
//! [nav]
//! home = "Accueil"
//! ```
//!
//! answers the key `nav.home`. The keys `date_format` and `datetime_format`
//! override the site-wide date formats for that locale.

use crate::config::ConfigError;
use rustc_hash::FxHashMap;
use std::{fs, path::Path};

type Table = FxHashMap<String, String>;

#[derive(Debug, Clone, Default)]
pub struct Translator {
    tables: FxHashMap<String, Table>,
}

impl Translator {
    /// Load the table of every locale in `locales`. Missing files are empty tables.
    pub fn load(dir: &Path, locales: &[String]) -> Result<Self, ConfigError> {
        let mut translator = Self::default();

        for locale in locales {
            let path = dir.join(format!("{locale}.toml"));
            if !path.is_file() {
                continue;
            }
            let source = fs::read_to_string(&path).map_err(|e| ConfigError::Io(path.clone(), e))?;
            translator.insert_source(locale, &source)?;
        }

        Ok(translator)
    }

    /// Parse `source` as the table for `locale`, replacing any previous one.
    pub fn insert_source(&mut self, locale: &str, source: &str) -> Result<(), ConfigError> {
        let value: toml::Table = toml::from_str(source)?;
        let mut table = Table::default();
        flatten("", &value, &mut table);
        self.tables.insert(locale.to_owned(), table);
        Ok(())
    }

    pub fn lookup(&self, key: &str, locale: &str) -> Option<&str> {
        self.tables.get(locale)?.get(key).map(String::as_str)
    }

    /// Translated string, or the key itself when the locale has no entry.
    pub fn translate(&self, key: &str, locale: &str) -> String {
        self.lookup(key, locale).unwrap_or(key).to_owned()
    }
}

fn flatten(prefix: &str, table: &toml::Table, out: &mut Table) {
    for (key, value) in table {
        let key = if prefix.is_empty() { key.clone() } else { format!("{prefix}.{key}") };
        match value {
            toml::Value::String(s) => {
                out.insert(key, s.clone());
            }
            toml::Value::Table(nested) => flatten(&key, nested, out),
            toml::Value::Integer(_) | toml::Value::Float(_) | toml::Value::Boolean(_) => {
                out.insert(key, value.to_string());
            }
            toml::Value::Array(_) | toml::Value::Datetime(_) => {}
        }
    }
}
