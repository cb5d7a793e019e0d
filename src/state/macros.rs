/// Declare a [`State`](crate::State) record together with its patch type.
///
/// ```
/// use tincan_select::{state, State};
///
/// state! {
///     #[derive(Clone, Debug, PartialEq)]
///     pub struct Counter => CounterPatch {
///         pub count: i32,
///         pub name: String,
///     }
/// }
///
/// let s = Counter { count: 1, name: "a".into() };
/// let next = s.merge(CounterPatch::default().count(2));
/// assert_eq!(next, Counter { count: 2, name: "a".into() });
/// ```
///
/// The patch gets one `Option` field and one builder method per record
/// field, a `Default` impl, and a conversion into
/// [`Update`](crate::Update) so it can be passed straight to `set`.
///
/// Builder methods share their field's name, so a field may not be called
/// `default`: its builder would shadow `Default::default` on the patch. The
/// macro rejects such a record at compile time:
///
/// ```compile_fail
/// tincan_select::state! {
///     #[derive(Clone)]
///     pub struct Settings => SettingsPatch {
///         pub default: bool,
///     }
/// }
/// ```
#[macro_export]
macro_rules! state {
    (@reserved default) => {
        ::core::compile_error!(
            "`default` cannot be a state field: its patch builder would shadow `Default::default`"
        );
    };
    (@reserved $field:ident) => {};
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident => $patch:ident {
            $(
                $(#[$fmeta:meta])*
                $fvis:vis $field:ident : $ty:ty
            ),* $(,)?
        }
    ) => {
        $( $crate::state!(@reserved $field); )*

        $(#[$meta])*
        $vis struct $name {
            $(
                $(#[$fmeta])*
                $fvis $field: $ty,
            )*
        }

        #[doc = concat!("Partial update for [`", stringify!($name), "`].")]
        #[derive(Default)]
        $vis struct $patch {
            $(
                #[doc = concat!("New `", stringify!($field), "`, if replaced.")]
                pub $field: ::core::option::Option<$ty>,
            )*
        }

        #[allow(dead_code)]
        impl $patch {
            $(
                #[doc = concat!("Replace `", stringify!($field), "`.")]
                #[must_use]
                pub fn $field(mut self, value: $ty) -> Self {
                    self.$field = ::core::option::Option::Some(value);
                    self
                }
            )*
        }

        impl $crate::State for $name {
            type Patch = $patch;

            fn merge(&self, patch: $patch) -> Self {
                $name {
                    $(
                        $field: match patch.$field {
                            ::core::option::Option::Some(value) => value,
                            ::core::option::Option::None => {
                                ::core::clone::Clone::clone(&self.$field)
                            }
                        },
                    )*
                }
            }
        }

        impl ::core::convert::From<$patch> for $crate::Update<$name> {
            fn from(patch: $patch) -> Self {
                $crate::Update::Patch(patch)
            }
        }
    };
}
