/// Builds a [`Value`](crate::Value) from JSON-like syntax.
///
/// Object keys must be string literals. Any other expression, wrapped in
/// parentheses when it is more than one token, goes through `Value::from`,
/// so tokens, byte buffers and existing values can be spliced in.
///
/// # Examples
///
/// ```rust
/// use serde_dataref::{encode_text, value, Value};
///
/// let tree = value!({
///     "name": "Alice",
///     "scores": [1, 2.5, null],
///     "greeting": (encode_text("hi"))
/// });
/// assert_eq!(tree.get("name"), Some(&Value::from("Alice")));
/// ```
#[macro_export]
macro_rules! value {
    (null) => {
        $crate::Value::Null
    };

    (true) => {
        $crate::Value::Bool(true)
    };

    (false) => {
        $crate::Value::Bool(false)
    };

    ([]) => {
        $crate::Value::from(::std::vec::Vec::<$crate::Value>::new())
    };

    ([ $($elem:tt),* $(,)? ]) => {
        $crate::Value::from(vec![$($crate::value!($elem)),*])
    };

    ({}) => {
        $crate::Value::from($crate::Map::new())
    };

    ({ $($key:literal : $value:tt),* $(,)? }) => {{
        let mut object = $crate::Map::new();
        $(
            object.insert($key.to_string(), $crate::value!($value));
        )*
        $crate::Value::from(object)
    }};

    ($s:expr) => {
        $crate::Value::from($s)
    };
}
