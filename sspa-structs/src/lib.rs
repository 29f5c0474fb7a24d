pub mod config;
pub mod core;

/// Declares a serde struct whose every field has a default, so partial json
/// documents deserialize into fully populated values.
#[macro_export]
macro_rules! serializable_struct_with_defaults {
    (
        $(#[$meta:meta])*
        $name:ident {
            $( $(#[$attr:meta])* $param:ident : $type:ty = $default:expr ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
        #[serde(default)]
        pub struct $name {
            $(
                $(#[$attr])*
                pub $param : $type,
            )*
        }
        impl Default for $name {
            fn default() -> Self {
                Self {
                    $( $param: $default, )*
                }
            }
        }
    };
}
