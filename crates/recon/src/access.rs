//! Typed, path-tracking access into loosely structured plist trees.
//!
//! Every accessor returns a [`ReconError`] naming the dotted path that
//! failed, so a malformed item can be reported precisely and skipped.

use plist::Value;

use crate::error::ReconError;

#[derive(Debug, Clone)]
pub(crate) struct Node<'a> {
    value: &'a Value,
    path: String,
}

impl<'a> Node<'a> {
    pub fn root(value: &'a Value, name: &str) -> Self {
        Self { value, path: name.to_string() }
    }

    pub fn value(&self) -> &'a Value {
        self.value
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    fn child(&self, value: &'a Value, segment: &str) -> Node<'a> {
        Node { value, path: format!("{}.{segment}", self.path) }
    }

    fn dictionary(&self) -> Result<&'a plist::Dictionary, ReconError> {
        self.value.as_dictionary().ok_or_else(|| self.wrong_type("dictionary"))
    }

    fn wrong_type(&self, expected: &'static str) -> ReconError {
        ReconError::WrongType { path: self.path.clone(), expected }
    }

    /// Required key of a dictionary node.
    pub fn get(&self, key: &str) -> Result<Node<'a>, ReconError> {
        self.get_opt(key)?.ok_or_else(|| ReconError::MissingKey {
            path: self.path.clone(),
            key: key.to_string(),
        })
    }

    /// Optional key of a dictionary node. The node itself must still be a dictionary.
    pub fn get_opt(&self, key: &str) -> Result<Option<Node<'a>>, ReconError> {
        Ok(self.dictionary()?.get(key).map(|v| self.child(v, key)))
    }

    pub fn index(&self, index: usize) -> Result<Node<'a>, ReconError> {
        let array = self.value.as_array().ok_or_else(|| self.wrong_type("array"))?;
        let value = array.get(index).ok_or_else(|| ReconError::IndexOutOfRange {
            path: self.path.clone(),
            index,
        })?;
        Ok(Node { value, path: format!("{}[{index}]", self.path) })
    }

    /// Dictionary entries in document order.
    pub fn entries(&self) -> Result<Vec<(&'a str, Node<'a>)>, ReconError> {
        Ok(self
            .dictionary()?
            .iter()
            .map(|(k, v)| (k.as_str(), self.child(v, k)))
            .collect())
    }

    /// Array elements in document order.
    pub fn items(&self) -> Result<Vec<Node<'a>>, ReconError> {
        let array = self.value.as_array().ok_or_else(|| self.wrong_type("array"))?;
        Ok(array
            .iter()
            .enumerate()
            .map(|(i, v)| Node { value: v, path: format!("{}[{i}]", self.path) })
            .collect())
    }

    pub fn as_str(&self) -> Result<&'a str, ReconError> {
        self.value.as_string().ok_or_else(|| self.wrong_type("string"))
    }

    /// Booleans, or integers where non-zero is true.
    pub fn as_bool(&self) -> Result<bool, ReconError> {
        if let Some(b) = self.value.as_boolean() {
            return Ok(b);
        }
        if let Some(i) = self.value.as_signed_integer() {
            return Ok(i != 0);
        }
        if let Some(u) = self.value.as_unsigned_integer() {
            return Ok(u != 0);
        }
        Err(self.wrong_type("boolean"))
    }

    pub fn opt_str(&self, key: &str) -> Result<Option<String>, ReconError> {
        self.get_opt(key)?.map(|n| n.as_str().map(str::to_string)).transpose()
    }

    pub fn opt_bool(&self, key: &str) -> Result<Option<bool>, ReconError> {
        self.get_opt(key)?.map(|n| n.as_bool()).transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use plist::{Dictionary, Integer};

    fn sample() -> Value {
        let mut inner = Dictionary::new();
        inner.insert("Name".into(), Value::String("x".into()));
        inner.insert("Flag".into(), Value::Integer(Integer::from(1i64)));
        let mut root = Dictionary::new();
        root.insert("List".into(), Value::Array(vec![Value::Dictionary(inner)]));
        Value::Dictionary(root)
    }

    #[test]
    fn paths_accumulate() {
        let v = sample();
        let node = Node::root(&v, "doc").get("List").unwrap().index(0).unwrap();
        assert_eq!(node.path(), "doc.List[0]");
        assert_eq!(node.get("Name").unwrap().as_str().unwrap(), "x");
    }

    #[test]
    fn integer_reads_as_bool() {
        let v = sample();
        let node = Node::root(&v, "doc").get("List").unwrap().index(0).unwrap();
        assert_eq!(node.opt_bool("Flag").unwrap(), Some(true));
        assert_eq!(node.opt_bool("Absent").unwrap(), None);
    }

    #[test]
    fn missing_key_names_path() {
        let v = sample();
        let err = Node::root(&v, "doc").get("Nope").unwrap_err();
        assert_eq!(
            err,
            ReconError::MissingKey { path: "doc".into(), key: "Nope".into() }
        );
    }

    #[test]
    fn index_out_of_range() {
        let v = sample();
        let err = Node::root(&v, "doc").get("List").unwrap().index(3).unwrap_err();
        assert!(matches!(err, ReconError::IndexOutOfRange { index: 3, .. }));
    }

    #[test]
    fn wrong_type_on_string_as_dict() {
        let v = Value::String("flat".into());
        let err = Node::root(&v, "doc").get_opt("k").unwrap_err();
        assert!(matches!(err, ReconError::WrongType { expected: "dictionary", .. }));
    }
}
