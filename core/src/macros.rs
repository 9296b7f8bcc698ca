/// Implements a basic `Debug` trait for types using their type name.
///
/// This macro generates a `Debug` implementation that simply prints the type name,
/// useful for types wrapping closures or trait objects.
macro_rules! impl_debug {
    ($ty:ty) => {
        impl core::fmt::Debug for $ty {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                f.write_str(core::any::type_name::<Self>())
            }
        }
    };
}

/// Builds a [`Props`](crate::Props) bag from `key => value` pairs.
///
/// # Usage
///
/// ```
/// use ripple_core::props;
///
/// let props = props! { "count" => 1, "label" => "clicks" };
/// assert_eq!(props.get_number("count"), Some(1.0));
/// assert_eq!(props.get_str("label"), Some("clicks"));
/// ```
#[macro_export]
macro_rules! props {
    () => {
        $crate::Props::new()
    };
    ($($key:expr => $value:expr),+ $(,)?) => {{
        let mut props = $crate::Props::new();
        $(
            props.insert($key, $value);
        )+
        props
    }};
}
