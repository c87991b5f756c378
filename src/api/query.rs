//! Query string parameters
//!
//! Parameters keep insertion order. Array values are either repeated
//! (`id=1&id=2`) or comma joined (`field=a,b`); endpoints differ in which
//! form they accept, so the caller picks per parameter.

/// How an array-valued parameter is written
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArrayStyle {
    /// `key=a&key=b`
    Repeat,
    /// `key=a,b`
    Comma,
}

/// Value of one query parameter
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryValue {
    One(String),
    Many(Vec<String>, ArrayStyle),
}

/// Ordered query parameters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query(Vec<(String, QueryValue)>);

impl Query {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Adds a single-valued parameter, replacing any previous value
    pub fn with(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.set(key, QueryValue::One(value.to_string()));
        self
    }

    /// Adds a single-valued parameter if `value` is present
    pub fn with_opt(self, key: impl Into<String>, value: Option<impl ToString>) -> Self {
        match value {
            Some(v) => self.with(key, v),
            None => self,
        }
    }

    /// Adds an array parameter written as repeated keys
    pub fn with_repeated<I, S>(mut self, key: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: ToString,
    {
        let values = values.into_iter().map(|v| v.to_string()).collect();
        self.set(key, QueryValue::Many(values, ArrayStyle::Repeat));
        self
    }

    /// Adds an array parameter written as one comma-joined value
    pub fn with_joined<I, S>(mut self, key: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: ToString,
    {
        let values = values.into_iter().map(|v| v.to_string()).collect();
        self.set(key, QueryValue::Many(values, ArrayStyle::Comma));
        self
    }

    /// Sets a parameter, replacing any previous value for the key
    pub fn set(&mut self, key: impl Into<String>, value: QueryValue) {
        let key = key.into();
        match self.0.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.0.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&QueryValue> {
        self.0.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// All values written for `key`, after expanding arrays
    pub fn values(&self, key: &str) -> Vec<String> {
        self.pairs()
            .into_iter()
            .filter(|(k, _)| k == key)
            .map(|(_, v)| v)
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Flattens to `key=value` pairs in wire order
    pub fn pairs(&self) -> Vec<(String, String)> {
        let mut pairs = Vec::new();
        for (key, value) in &self.0 {
            match value {
                QueryValue::One(v) => pairs.push((key.clone(), v.clone())),
                QueryValue::Many(values, ArrayStyle::Repeat) => {
                    pairs.extend(values.iter().map(|v| (key.clone(), v.clone())));
                }
                QueryValue::Many(values, ArrayStyle::Comma) => {
                    pairs.push((key.clone(), values.join(",")));
                }
            }
        }
        pairs
    }

    /// Percent-encoded query string without the leading `?`
    pub fn encode(&self) -> String {
        let mut serializer = url::form_urlencoded::Serializer::new(String::new());
        for (key, value) in self.pairs() {
            serializer.append_pair(&key, &value);
        }
        serializer.finish()
    }
}
