//! Declarative registration of bridged structs.

/// Implement [`HostObject`](crate::HostObject) and [`HostData`](crate::HostData)
/// for a struct from a table of its exposed members.
///
/// Field options, written as attributes in front of a field:
///
/// - `#[rename = "name"]` exposes the field under `name`
/// - `#[serial = "key"]` uses `key` when the struct is marshalled to a mapping
/// - `#[readonly]` rejects assignments
///
/// Methods are listed by signature without the receiver. A method named
/// `method_x` is exposed as `x`, and `property_x` is exposed as the computed
/// attribute `x`. The struct must implement `Default`.
///
/// A `Vec<u8>` field is a sequence of integers and marshals to a `list`.
/// Declare raw byte fields as [`ByteBuf`](crate::ByteBuf) to expose them
/// as `bytes`.
///
/// ```ignore
/// #[derive(Debug, Default)]
/// struct Counter {
///     doc: String,
///     hits: i64,
/// }
///
/// impl Counter {
///     fn method_bump(&mut self, by: i64) -> i64 {
///         self.hits += by;
///         self.hits
///     }
/// }
///
/// aria_pybind::host_object! {
///     Counter as "Counter" {
///         fields {
///             #[rename = "__doc__"] doc: String,
///             hits: i64,
///         }
///         methods {
///             fn method_bump(by: i64) -> i64;
///         }
///     }
/// }
/// ```
#[macro_export]
macro_rules! host_object {
    (@returns) => {
        ::std::vec::Vec::new()
    };
    (@returns $ret:ty) => {
        <$ret as $crate::IntoReturns>::return_types()
    };

    (@invoke $call:expr => $ret:ty) => {
        ::std::option::Option::Some(<$ret as $crate::IntoReturns>::into_returns($call))
    };
    (@invoke $call:expr) => {{
        $call;
        ::std::option::Option::Some(::std::vec::Vec::new())
    }};

    (@impl $ty:ident, $name:expr;
        $( fields {
            $( $( #[$opt:ident $(= $val:literal)?] )* $field:ident : $fty:ty ),* $(,)?
        } )?
        $( methods {
            $( fn $method:ident ( $( $arg:ident : $aty:ty ),* $(,)? ) $( -> $ret:ty )? ; )*
        } )?
    ) => {
        impl $crate::HostData for $ty {
            fn host_type() -> $crate::HostType {
                $crate::HostType::record($name, $crate::layout_of::<Self>)
            }

            fn to_host(&self) -> $crate::HostValue {
                $crate::record_of(self)
            }

            fn from_host(value: $crate::HostValue) -> ::std::option::Option<Self> {
                $crate::from_record(value)
            }
        }

        impl $crate::HostObject for $ty {
            #[allow(unused_variables)]
            fn register(registry: &mut $crate::Registration<Self>) {
                $( $(
                    let _field = registry.field::<$fty>(
                        stringify!($field),
                        |this: &$ty| &this.$field,
                        |this: &mut $ty| &mut this.$field,
                    );
                    $( _field.$opt($($val)?); )*
                )* )?

                $( $(
                    registry.method(
                        stringify!($method),
                        ::std::vec![$( <$aty as $crate::HostData>::host_type() ),*],
                        $crate::host_object!(@returns $($ret)?),
                        |this: &mut $ty, args: ::std::vec::Vec<$crate::HostValue>| {
                            #[allow(unused_mut, unused_variables)]
                            let mut args = args.into_iter();
                            $( let $arg = <$aty as $crate::HostData>::from_host(args.next()?)?; )*
                            $crate::host_object!(@invoke this.$method($($arg),*) $(=> $ret)?)
                        },
                    );
                )* )?
            }
        }
    };

    ($ty:ident as $name:literal { $($body:tt)* }) => {
        $crate::host_object!(@impl $ty, $name; $($body)*);
    };
    ($ty:ident { $($body:tt)* }) => {
        $crate::host_object!(@impl $ty, stringify!($ty); $($body)*);
    };
}
