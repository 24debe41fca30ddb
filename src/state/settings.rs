use std::collections::BTreeMap;

pub const EXCLUDE_ID_SETTING: &str = "cluster.routing.allocation.exclude._id";
pub const EXCLUDE_NAME_SETTING: &str = "cluster.routing.allocation.exclude._name";

/// Settings is an ordered string-to-string map. Transient cluster settings live here; they are
/// carried from one cluster state version to the next and are never written to disk.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Settings {
    values: BTreeMap<String, String>,
}

impl Settings {
    pub fn empty() -> Self {
        Settings::default()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(|v| v.as_str())
    }

    /// Reads a comma separated value. Entries are trimmed and empty entries are dropped.
    pub fn get_as_list(&self, key: &str) -> Vec<String> {
        match self.values.get(key) {
            None => Vec::new(),
            Some(value) => value
                .split(',')
                .map(|entry| entry.trim())
                .filter(|entry| !entry.is_empty())
                .map(String::from)
                .collect(),
        }
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &String)> {
        self.values.iter()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn as_map(&self) -> &BTreeMap<String, String> {
        &self.values
    }

    pub fn into_map(self) -> BTreeMap<String, String> {
        self.values
    }

    /// Returns a new Settings with `delta` applied on top of this one. New keys are added,
    /// existing keys are overwritten and an empty value removes the key.
    pub fn merge(&self, delta: &BTreeMap<String, String>) -> Settings {
        let mut values = self.values.clone();
        for (key, value) in delta.iter() {
            if value.is_empty() {
                values.remove(key);
            } else {
                values.insert(key.clone(), value.clone());
            }
        }

        Settings { values }
    }
}

impl From<BTreeMap<String, String>> for Settings {
    fn from(values: BTreeMap<String, String>) -> Self {
        Settings { values }
    }
}
