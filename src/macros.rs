/// Generates a typed wrapper around [`EntityProxy`](crate::EntityProxy).
///
/// ```ignore
/// entity_proxy! {
///     pub proxy for User {
///         fn get_id() -> i64 = "getId";
///         fn get_name() -> String = "getName";
///         fn set_name(name: String) -> () = "setName";
///     }
/// }
///
/// let user = UserProxy::from(factory.create_proxy(42, Some(session))?);
/// assert_eq!(user.get_name()?, "X");
/// ```
///
/// Each method routes through [`EntityProxy::invoke`](crate::EntityProxy::invoke)
/// and converts the result with [`FromValue`](crate::FromValue).
#[macro_export]
macro_rules! entity_proxy {
    (
        $vis:vis proxy for $entity:ident {
            $( fn $fn_name:ident ( $($arg:ident : $arg_ty:ty),* $(,)? ) -> $ret:ty = $method:literal; )*
        }
    ) => {
        $crate::paste::paste! {
            #[derive(Clone, Debug, PartialEq, Eq)]
            $vis struct [<$entity Proxy>]($crate::EntityProxy);

            impl [<$entity Proxy>] {
                $(
                    pub fn $fn_name(&self, $($arg: $arg_ty),*) -> $crate::Result<$ret> {
                        self.0.call::<$ret>($method, vec![$($crate::Value::from($arg)),*])
                    }
                )*

                pub fn into_inner(self) -> $crate::EntityProxy {
                    self.0
                }
            }

            impl ::std::ops::Deref for [<$entity Proxy>] {
                type Target = $crate::EntityProxy;

                fn deref(&self) -> &Self::Target {
                    &self.0
                }
            }

            impl ::std::convert::From<$crate::EntityProxy> for [<$entity Proxy>] {
                fn from(proxy: $crate::EntityProxy) -> Self {
                    Self(proxy)
                }
            }

            impl $crate::FromValue for [<$entity Proxy>] {
                fn from_value(value: $crate::Value) -> $crate::Result<Self> {
                    <$crate::EntityProxy as $crate::FromValue>::from_value(value).map(Self)
                }
            }
        }
    };
}
