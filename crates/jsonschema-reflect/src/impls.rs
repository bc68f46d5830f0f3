//! `Reflect` for standard library and ecosystem types.

use std::borrow::Cow;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};
use std::net::{Ipv4Addr, Ipv6Addr};
use std::rc::Rc;
use std::sync::Arc;

use indexmap::{IndexMap, IndexSet};

use crate::descriptor::{Kind, Reflect, TypeDescriptor};

macro_rules! scalar {
    ($kind:expr => $($ty:ty),+ $(,)?) => {
        $(
            impl Reflect for $ty {
                fn descriptor() -> TypeDescriptor {
                    TypeDescriptor::anonymous::<$ty>($kind)
                }
            }
        )+
    };
}

scalar!(Kind::Bool => bool);
scalar!(Kind::Int => i8, i16, i32, i64, i128, isize);
scalar!(Kind::Uint => u8, u16, u32, u64, u128, usize);
scalar!(Kind::Float => f32, f64);
scalar!(Kind::String => char, String, &'static str, Cow<'static, str>);
scalar!(Kind::Null => ());
scalar!(Kind::Any => serde_json::Value);
scalar!(Kind::Format("ipv4") => Ipv4Addr);
scalar!(Kind::Format("ipv6") => Ipv6Addr);
scalar!(Kind::Format("uri") => url::Url);

#[cfg(feature = "uuid")]
scalar!(Kind::Format("uuid") => uuid::Uuid);

#[cfg(feature = "chrono")]
scalar!(Kind::Format("date") => chrono::NaiveDate);
#[cfg(feature = "chrono")]
scalar!(Kind::Format("time") => chrono::NaiveTime);
#[cfg(feature = "chrono")]
scalar!(Kind::Format("date-time") => chrono::NaiveDateTime);

#[cfg(feature = "chrono")]
impl<Tz: chrono::TimeZone + 'static> Reflect for chrono::DateTime<Tz> {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::anonymous::<Self>(Kind::Format("date-time"))
    }
}

impl Reflect for serde_json::Map<String, serde_json::Value> {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::anonymous::<Self>(Kind::Map {
            key: String::descriptor,
            value: serde_json::Value::descriptor,
        })
    }
}

macro_rules! pointer {
    ($($ty:ident),+) => {
        $(
            impl<T: Reflect> Reflect for $ty<T> {
                fn descriptor() -> TypeDescriptor {
                    TypeDescriptor::anonymous::<Self>(Kind::Pointer(T::descriptor))
                }
            }
        )+
    };
}

pointer!(Option, Box, Rc, Arc);

macro_rules! sequence {
    ($unique:literal => $($ty:ident),+) => {
        $(
            impl<T: Reflect> Reflect for $ty<T> {
                fn descriptor() -> TypeDescriptor {
                    TypeDescriptor::anonymous::<Self>(Kind::Sequence {
                        element: T::descriptor,
                        len: None,
                        unique: $unique,
                    })
                }
            }
        )+
    };
}

sequence!(false => Vec, VecDeque);
sequence!(true => HashSet, BTreeSet, IndexSet);

impl<T: Reflect, const N: usize> Reflect for [T; N] {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::anonymous::<Self>(Kind::Sequence {
            element: T::descriptor,
            len: Some(N),
            unique: false,
        })
    }
}

macro_rules! map {
    ($($ty:ident),+) => {
        $(
            impl<K: Reflect, V: Reflect> Reflect for $ty<K, V> {
                fn descriptor() -> TypeDescriptor {
                    TypeDescriptor::anonymous::<Self>(Kind::Map {
                        key: K::descriptor,
                        value: V::descriptor,
                    })
                }
            }
        )+
    };
}

map!(HashMap, BTreeMap, IndexMap);

macro_rules! tuple {
    ($($name:ident),+) => {
        impl<$($name: Reflect),+> Reflect for ($($name,)+) {
            fn descriptor() -> TypeDescriptor {
                TypeDescriptor::anonymous::<Self>(Kind::Tuple(vec![$($name::descriptor),+]))
            }
        }
    };
}

tuple!(A);
tuple!(A, B);
tuple!(A, B, C);
tuple!(A, B, C, D);
tuple!(A, B, C, D, E);
tuple!(A, B, C, D, E, F);
