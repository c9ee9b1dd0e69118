use crate::error::Error;
use std::io;

/// Configuration store, backed by a TOML document
pub struct Config {
    value: toml::Value,
}

impl Default for Config {
    fn default() -> Config {
        Config {
            value: toml::Value::Table(toml::map::Map::new()),
        }
    }
}

impl Config {
    fn lookup(&self, k: &str) -> Option<&toml::Value> {
        let mut item = &self.value;
        for key in k.split('.') {
            item = item.get(key)?;
        }
        Some(item)
    }

    /// Look up `k` and convert it with `f`
    ///
    /// An absent key is `Ok(None)`; a present key that `f` rejects is a
    /// configuration error.
    fn typed<'a, T>(
        &'a self,
        k: &str,
        expected: &str,
        f: impl FnOnce(&'a toml::Value) -> Option<T>,
    ) -> Result<Option<T>, Error> {
        match self.lookup(k) {
            None => Ok(None),
            Some(v) => f(v).map(Some).ok_or_else(|| {
                Error::Config(format!("'{k}': expected {expected}, found {}", v.type_str()))
            }),
        }
    }

    /// Get an entry of type string by path. If the input argument contains dots,
    /// the path is split into keys, each key being requested recursively.
    pub fn get<T: AsRef<str>>(&self, k: T) -> Result<Option<&str>, Error> {
        self.typed(k.as_ref(), "a string", toml::Value::as_str)
    }

    /// Get an entry of type non-negative integer by path
    pub fn get_usize<T: AsRef<str>>(&self, k: T) -> Result<Option<usize>, Error> {
        self.typed(k.as_ref(), "a non-negative integer", |v| {
            v.as_integer().and_then(|i| usize::try_from(i).ok())
        })
    }

    /// Get an entry of type boolean by path
    pub fn get_bool<T: AsRef<str>>(&self, k: T) -> Result<Option<bool>, Error> {
        self.typed(k.as_ref(), "a boolean", toml::Value::as_bool)
    }

    /// Set an entry by path, creating intermediate tables if needed
    ///
    /// Returns `false` if one of the intermediate keys exists and is not a table.
    pub fn set<T: Into<toml::Value>>(&mut self, k: &str, v: T) -> bool {
        let mut keys: Vec<&str> = k.split('.').collect();
        let last = match keys.pop() {
            Some(last) => last,
            None => return false,
        };
        let mut item = &mut self.value;
        for key in keys {
            let table = match item.as_table_mut() {
                Some(table) => table,
                None => return false,
            };
            item = table
                .entry(key)
                .or_insert(toml::Value::Table(toml::map::Map::new()));
        }
        match item.as_table_mut() {
            Some(table) => {
                table.insert(last.to_owned(), v.into());
                true
            }
            None => false,
        }
    }

    /// Load configuration from input object. Previous contents are replaced.
    pub fn load_config<R: io::Read>(&mut self, mut config: R) -> Result<(), Error> {
        let mut s = String::new();
        config.read_to_string(&mut s)?;
        let table: toml::Table =
            toml::from_str(&s).map_err(|e| Error::Config(format!("invalid configuration: {e}")))?;
        self.value = toml::Value::Table(table);
        Ok(())
    }
}
