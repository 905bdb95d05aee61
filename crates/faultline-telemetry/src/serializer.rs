//! Error serialization
//!
//! Converts whatever reached a capture point into a plain JSON record that
//! can be stored and transmitted:
//!
//! - nothing → `None`
//! - a structured error → `{name, message, stack}`
//! - an arbitrary object → shallow copy of its own properties
//! - anything else → its string form
//!
//! [`serialize`] is total. It runs on the error path, so a property that
//! fails to read (or panics while being read) is replaced by a description of
//! the failure instead of escaping.

use std::any::Any;
use std::error::Error as StdError;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};

use serde_json::{json, Map, Value};

use crate::reentry::Reentry;

/// Reflection over the own properties of a captured object.
///
/// Reading is fallible per property: a failing read is recorded, it never
/// aborts the whole serialization.
pub trait OwnProperties: Send + Sync {
    /// Names of every own property, in a stable order.
    fn property_names(&self) -> Result<Vec<String>, String>;

    /// Reads one property.
    fn read_property(&self, name: &str) -> Result<Value, String>;
}

impl OwnProperties for Map<String, Value> {
    fn property_names(&self) -> Result<Vec<String>, String> {
        Ok(self.keys().cloned().collect())
    }

    fn read_property(&self, name: &str) -> Result<Value, String> {
        self.get(name)
            .cloned()
            .ok_or_else(|| format!("property '{}' is not defined", name))
    }
}

/// A value that reached a capture point
pub enum Thrown {
    /// Nothing was thrown
    Null,
    /// A structured error
    Error {
        name: String,
        message: String,
        stack: Option<String>,
    },
    /// Any other object; its own properties are copied
    Object(Box<dyn OwnProperties>),
    /// A primitive, serialized by string coercion
    Primitive(Value),
}

impl fmt::Debug for Thrown {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Thrown::Null => f.write_str("Null"),
            Thrown::Error {
                name,
                message,
                stack,
            } => f
                .debug_struct("Error")
                .field("name", name)
                .field("message", message)
                .field("stack", stack)
                .finish(),
            Thrown::Object(_) => f.write_str("Object(..)"),
            Thrown::Primitive(v) => f.debug_tuple("Primitive").field(v).finish(),
        }
    }
}

impl Thrown {
    /// A structured error with an explicit name.
    pub fn error(
        name: impl Into<String>,
        message: impl Into<String>,
        stack: Option<String>,
    ) -> Self {
        Thrown::Error {
            name: name.into(),
            message: message.into(),
            stack,
        }
    }

    /// A structured error from a Rust error value.
    ///
    /// The `source()` chain stands in for the stack.
    pub fn from_error(err: &(dyn StdError + 'static)) -> Self {
        Self::named_error("Error", err)
    }

    /// Like [`Thrown::from_error`] with a caller-chosen name.
    pub fn named_error(name: &str, err: &(dyn StdError + 'static)) -> Self {
        let mut chain = Vec::new();
        let mut source = err.source();
        while let Some(cause) = source {
            chain.push(format!("caused by: {}", cause));
            source = cause.source();
        }

        Thrown::Error {
            name: name.to_string(),
            message: err.to_string(),
            stack: if chain.is_empty() {
                None
            } else {
                Some(chain.join("\n"))
            },
        }
    }

    /// A structured error from a panic payload.
    pub fn from_panic(
        payload: &(dyn Any + Send),
        location: Option<String>,
        backtrace: Option<String>,
    ) -> Self {
        let message = panic_message(payload);
        let stack = match (location, backtrace) {
            (Some(loc), Some(bt)) => Some(format!("at {}\n{}", loc, bt)),
            (Some(loc), None) => Some(format!("at {}", loc)),
            (None, Some(bt)) => Some(bt),
            (None, None) => None,
        };

        Thrown::Error {
            name: "Panic".to_string(),
            message,
            stack,
        }
    }

    /// An object described by its own properties.
    pub fn object(props: impl OwnProperties + 'static) -> Self {
        Thrown::Object(Box::new(props))
    }

    /// Human-readable message of the value: its own `message` when it has a
    /// non-empty one, otherwise its string form.
    ///
    /// Reads every property of an object once; use [`serialize_with_message`]
    /// when the record is needed as well.
    pub fn message(&self) -> String {
        serialize_with_message(self).1
    }
}

impl From<Value> for Thrown {
    /// Classifies a JSON value by shape: an object carrying `name`, `message`
    /// and `stack` is a structured error.
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Thrown::Null,
            Value::Object(map) => {
                let name = map.get("name").and_then(Value::as_str);
                let message = map.get("message").and_then(Value::as_str);
                match (name, message, map.get("stack")) {
                    (Some(name), Some(message), Some(stack)) => Thrown::Error {
                        name: name.to_string(),
                        message: message.to_string(),
                        stack: stack.as_str().map(str::to_string),
                    },
                    _ => Thrown::Object(Box::new(map)),
                }
            }
            other => Thrown::Primitive(other),
        }
    }
}

impl From<&str> for Thrown {
    fn from(s: &str) -> Self {
        Thrown::Primitive(Value::String(s.to_string()))
    }
}

/// Serializes a thrown value into a transmittable record.
///
/// Never panics and never fails: internal failures degrade to
/// `{"serializationError": "..."}`.
pub fn serialize(value: &Thrown) -> Option<Value> {
    serialize_with_message(value).0
}

/// The record of [`serialize`] together with the message of
/// [`Thrown::message`], computed in a single pass over the value.
pub fn serialize_with_message(value: &Thrown) -> (Option<Value>, String) {
    match value {
        Thrown::Null => (None, "null".to_string()),
        Thrown::Error {
            name,
            message,
            stack,
        } => {
            let record = json!({
                "name": name,
                "message": message,
                "stack": stack,
            });
            let message = if message.is_empty() {
                name.clone()
            } else {
                message.clone()
            };
            (Some(record), message)
        }
        Thrown::Object(props) => {
            let (record, own_message) = copy_own_properties(props.as_ref());
            let message = own_message.unwrap_or_else(|| record.to_string());
            (Some(record), message)
        }
        Thrown::Primitive(v) => {
            let text = coerce(v);
            (Some(Value::String(text.clone())), text)
        }
    }
}

/// Copies every own property. Also returns the `message` property when it
/// was read successfully as a non-empty string.
fn copy_own_properties(props: &dyn OwnProperties) -> (Value, Option<String>) {
    let names = match guarded(|| props.property_names()) {
        Ok(names) => names,
        Err(e) => return (json!({ "serializationError": e }), None),
    };

    let mut out = Map::new();
    let mut own_message = None;
    for name in names {
        let value = match guarded(|| props.read_property(&name)) {
            Ok(v) => {
                if name == "message" {
                    own_message = v.as_str().filter(|m| !m.is_empty()).map(str::to_string);
                }
                v
            }
            Err(e) => Value::String(e),
        };
        out.insert(name, value);
    }
    (Value::Object(out), own_message)
}

/// Runs a fallible read, turning a panic into its message.
fn guarded<T>(read: impl FnOnce() -> Result<T, String>) -> Result<T, String> {
    let _reentry = Reentry::enter();
    match catch_unwind(AssertUnwindSafe(read)) {
        Ok(result) => result,
        Err(payload) => Err(panic_message(payload.as_ref())),
    }
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "Unknown panic".to_string()
    }
}

fn coerce(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Object whose `secret` property fails on read
    struct ThrowingGetter;

    impl OwnProperties for ThrowingGetter {
        fn property_names(&self) -> Result<Vec<String>, String> {
            Ok(vec!["code".to_string(), "secret".to_string()])
        }

        fn read_property(&self, name: &str) -> Result<Value, String> {
            match name {
                "code" => Ok(json!(42)),
                _ => Err("Error: access denied".to_string()),
            }
        }
    }

    struct PanickingGetter;

    impl OwnProperties for PanickingGetter {
        fn property_names(&self) -> Result<Vec<String>, String> {
            Ok(vec!["boom".to_string()])
        }

        fn read_property(&self, _name: &str) -> Result<Value, String> {
            panic!("getter exploded");
        }
    }

    struct Unlistable;

    impl OwnProperties for Unlistable {
        fn property_names(&self) -> Result<Vec<String>, String> {
            Err("revoked proxy".to_string())
        }

        fn read_property(&self, _name: &str) -> Result<Value, String> {
            Ok(Value::Null)
        }
    }

    #[test]
    fn test_null_serializes_to_none() {
        assert_eq!(serialize(&Thrown::Null), None);
        assert!(matches!(Thrown::from(Value::Null), Thrown::Null));
    }

    #[test]
    fn test_structured_error() {
        let thrown = Thrown::error("TypeError", "x is undefined", Some("at f()".into()));
        assert_eq!(
            serialize(&thrown),
            Some(json!({"name": "TypeError", "message": "x is undefined", "stack": "at f()"}))
        );
    }

    #[test]
    fn test_throwing_getter_is_replaced_by_string() {
        let record = serialize(&Thrown::object(ThrowingGetter)).unwrap();
        assert_eq!(record["code"], 42);
        assert_eq!(record["secret"], "Error: access denied");
    }

    #[test]
    fn test_panicking_getter_is_contained() {
        let record = serialize(&Thrown::object(PanickingGetter)).unwrap();
        assert_eq!(record["boom"], "getter exploded");
    }

    #[test]
    fn test_unlistable_object_falls_back() {
        let record = serialize(&Thrown::object(Unlistable)).unwrap();
        assert_eq!(record, json!({"serializationError": "revoked proxy"}));
    }

    #[test]
    fn test_primitive_number_is_coerced_to_string() {
        assert_eq!(serialize(&Thrown::Primitive(json!(404))), Some(json!("404")));
        assert_eq!(serialize(&Thrown::from("oops")), Some(json!("oops")));
    }

    #[test]
    fn test_json_shape_classification() {
        let thrown = Thrown::from(json!({"name": "RangeError", "message": "too big", "stack": null}));
        assert!(matches!(thrown, Thrown::Error { ref name, .. } if name == "RangeError"));

        let thrown = Thrown::from(json!({"message": "no name", "status": 500}));
        assert!(matches!(thrown, Thrown::Object(_)));
        assert_eq!(
            serialize(&thrown),
            Some(json!({"message": "no name", "status": 500}))
        );
    }

    #[test]
    fn test_from_error_collects_source_chain() {
        #[derive(Debug)]
        struct Outer(std::io::Error);
        impl fmt::Display for Outer {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "failed to load users")
            }
        }
        impl StdError for Outer {
            fn source(&self) -> Option<&(dyn StdError + 'static)> {
                Some(&self.0)
            }
        }

        let err = Outer(std::io::Error::new(std::io::ErrorKind::Other, "disk gone"));
        let thrown = Thrown::from_error(&err);
        let record = serialize(&thrown).unwrap();
        assert_eq!(record["name"], "Error");
        assert_eq!(record["message"], "failed to load users");
        assert_eq!(record["stack"], "caused by: disk gone");
    }

    #[test]
    fn test_from_panic_payloads() {
        let payload: Box<dyn Any + Send> = Box::new("static str panic");
        let thrown = Thrown::from_panic(payload.as_ref(), Some("main.rs:1:1".into()), None);
        assert_eq!(thrown.message(), "static str panic");

        let payload: Box<dyn Any + Send> = Box::new(7_u32);
        let thrown = Thrown::from_panic(payload.as_ref(), None, None);
        let record = serialize(&thrown).unwrap();
        assert_eq!(record["message"], "Unknown panic");
        assert_eq!(record["stack"], Value::Null);
    }

    #[test]
    fn test_each_property_is_read_once() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        use std::sync::Arc;

        struct CountingGetter(Arc<AtomicUsize>);

        impl OwnProperties for CountingGetter {
            fn property_names(&self) -> Result<Vec<String>, String> {
                Ok(vec!["message".to_string(), "status".to_string()])
            }

            fn read_property(&self, name: &str) -> Result<Value, String> {
                self.0.fetch_add(1, Ordering::SeqCst);
                match name {
                    "message" => Ok(json!("")),
                    _ => Ok(json!(503)),
                }
            }
        }

        let reads = Arc::new(AtomicUsize::new(0));
        let thrown = Thrown::object(CountingGetter(Arc::clone(&reads)));
        let (record, message) = serialize_with_message(&thrown);

        assert_eq!(reads.load(Ordering::SeqCst), 2);
        assert_eq!(record, Some(json!({"message": "", "status": 503})));
        assert_eq!(message, r#"{"message":"","status":503}"#);
    }

    #[test]
    fn test_failed_message_read_falls_back_to_string_form() {
        struct BrokenMessage;

        impl OwnProperties for BrokenMessage {
            fn property_names(&self) -> Result<Vec<String>, String> {
                Ok(vec!["message".to_string()])
            }

            fn read_property(&self, _name: &str) -> Result<Value, String> {
                panic!("message getter exploded");
            }
        }

        let (record, message) = serialize_with_message(&Thrown::object(BrokenMessage));
        assert_eq!(record, Some(json!({"message": "message getter exploded"})));
        assert_eq!(message, r#"{"message":"message getter exploded"}"#);
    }

    #[test]
    fn test_message_derivation() {
        assert_eq!(Thrown::Null.message(), "null");
        assert_eq!(Thrown::error("SyntaxError", "", None).message(), "SyntaxError");
        assert_eq!(Thrown::from(json!({"message": "bad input"})).message(), "bad input");
        assert_eq!(Thrown::from(json!({"code": 1})).message(), r#"{"code":1}"#);
        assert_eq!(Thrown::Primitive(json!(false)).message(), "false");
    }
}
