//! Type helper utilities for syn type analysis.

/// How a field type maps to a column, decided from its syntax alone.
///
/// Mirrors `daorm::FieldKind` minus `Embedded`, which only comes from
/// `#[orm(flatten)]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeClass {
    Scalar,
    Timestamp,
    Bytes,
    Struct,
    Sequence,
}

impl TypeClass {
    /// Name of the matching `daorm::FieldKind` variant.
    pub fn kind_ident(self) -> &'static str {
        match self {
            TypeClass::Scalar => "Scalar",
            TypeClass::Timestamp => "Timestamp",
            TypeClass::Bytes => "Bytes",
            TypeClass::Struct => "Struct",
            TypeClass::Sequence => "Sequence",
        }
    }
}

/// Extract the single type argument of a path type whose last segment is `name`.
fn single_type_arg<'a>(ty: &'a syn::Type, name: &str) -> Option<&'a syn::Type> {
    let syn::Type::Path(type_path) = ty else {
        return None;
    };
    let seg = type_path.path.segments.last()?;
    if seg.ident != name {
        return None;
    }
    let syn::PathArguments::AngleBracketed(args) = &seg.arguments else {
        return None;
    };
    if args.args.len() != 1 {
        return None;
    }
    let syn::GenericArgument::Type(inner) = args.args.first()? else {
        return None;
    };
    Some(inner)
}

/// Extract the inner type T from Option<T>, or return None if not an Option type.
///
/// Recognizes `Option<T>`, `std::option::Option<T>`, and `core::option::Option<T>`.
pub fn option_inner(ty: &syn::Type) -> Option<&syn::Type> {
    single_type_arg(ty, "Option")
}

/// Extract the inner type T from Vec<T>, or return None if not a Vec type.
///
/// Recognizes `Vec<T>` and `std::vec::Vec<T>`.
pub fn vec_inner(ty: &syn::Type) -> Option<&syn::Type> {
    single_type_arg(ty, "Vec")
}

fn last_ident(ty: &syn::Type) -> Option<String> {
    let syn::Type::Path(type_path) = ty else {
        return None;
    };
    if type_path.qself.is_some() {
        return None;
    }
    type_path.path.segments.last().map(|s| s.ident.to_string())
}

fn is_u8(ty: &syn::Type) -> bool {
    last_ident(ty).is_some_and(|i| i == "u8")
}

const SCALARS: &[&str] = &[
    "i8", "i16", "i32", "i64", "isize", "u8", "u16", "u32", "u64", "usize", "f32", "f64", "bool",
    "String", "Uuid", "Value",
];

const TIMESTAMPS: &[&str] = &["NaiveDateTime", "DateTime", "NaiveDate"];

/// Classify a field type. `Option<T>` is classified as `T`.
pub fn classify(ty: &syn::Type) -> TypeClass {
    let ty = option_inner(ty).unwrap_or(ty);

    match ty {
        syn::Type::Array(_) | syn::Type::Slice(_) => return TypeClass::Sequence,
        syn::Type::Group(group) => return classify(&group.elem),
        syn::Type::Paren(paren) => return classify(&paren.elem),
        _ => {}
    }

    if let Some(elem) = vec_inner(ty) {
        return if is_u8(elem) {
            TypeClass::Bytes
        } else {
            TypeClass::Sequence
        };
    }

    match last_ident(ty) {
        Some(ident) if SCALARS.contains(&ident.as_str()) => TypeClass::Scalar,
        Some(ident) if TIMESTAMPS.contains(&ident.as_str()) => TypeClass::Timestamp,
        Some(ident) if ident == "VecDeque" || ident == "HashSet" || ident == "BTreeSet" => {
            TypeClass::Sequence
        }
        _ => TypeClass::Struct,
    }
}
