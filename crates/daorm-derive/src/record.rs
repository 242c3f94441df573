//! Record derive macro implementation

mod attrs;

use crate::common::syn_types::{TypeClass, classify};
use attrs::field_attr;
use proc_macro2::{Span, TokenStream};
use quote::quote;
use syn::ext::IdentExt;
use syn::{Data, DeriveInput, Fields, Result};

/// How a generated accessor exposes a field.
enum Access {
    Scalar,
    Json,
    Flatten,
}

struct FieldPlan {
    member: syn::Ident,
    name: String,
    ty: syn::Type,
    decl: TokenStream,
    access: Option<Access>,
}

fn plan_field(field: &syn::Field) -> Result<FieldPlan> {
    let attr = field_attr(field)?;
    let member = field
        .ident
        .clone()
        .ok_or_else(|| syn::Error::new_spanned(field, "Record fields must be named"))?;
    let name = member.unraw().to_string();
    let ty = field.ty.clone();

    if attr.flatten {
        let mut decl = quote! {
            ::daorm::FieldDecl::new(#name, ::daorm::FieldKind::Embedded)
                .embedded(<#ty as ::daorm::Record>::declared_fields)
        };
        if attr.skip {
            decl = quote! { #decl.skip() };
        }
        return Ok(FieldPlan {
            member,
            name,
            ty,
            decl,
            access: if attr.skip { None } else { Some(Access::Flatten) },
        });
    }

    let class = if attr.scalar {
        TypeClass::Scalar
    } else {
        classify(&field.ty)
    };
    let kind = syn::Ident::new(class.kind_ident(), Span::call_site());

    let mut decl = quote! { ::daorm::FieldDecl::new(#name, ::daorm::FieldKind::#kind) };
    if let Some(column) = &attr.column {
        decl = quote! { #decl.column(#column) };
    }
    if attr.skip {
        decl = quote! { #decl.skip() };
    }
    if attr.json {
        decl = quote! { #decl.json() };
    }

    let json = attr.json || matches!(class, TypeClass::Struct | TypeClass::Sequence);
    let access = if attr.skip {
        None
    } else if json {
        Some(Access::Json)
    } else {
        Some(Access::Scalar)
    };

    Ok(FieldPlan {
        member,
        name,
        ty,
        decl,
        access,
    })
}

pub fn expand(input: DeriveInput) -> Result<TokenStream> {
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => &fields.named,
            _ => {
                return Err(syn::Error::new_spanned(
                    &input,
                    "Record can only be derived for structs with named fields",
                ));
            }
        },
        _ => {
            return Err(syn::Error::new_spanned(
                &input,
                "Record can only be derived for structs",
            ));
        }
    };

    let plans = fields.iter().map(plan_field).collect::<Result<Vec<_>>>()?;

    let decls = plans.iter().map(|p| &p.decl);

    let mut ref_arms = Vec::new();
    let mut mut_arms = Vec::new();
    for plan in &plans {
        let member = &plan.member;
        let key = &plan.name;
        let ty = &plan.ty;
        match plan.access {
            None => {}
            Some(Access::Scalar) => {
                ref_arms.push(quote! { [#key] => Some(::daorm::FieldRef::Scalar(&self.#member)) });
                mut_arms
                    .push(quote! { [#key] => Some(::daorm::FieldMut::Scalar(&mut self.#member)) });
            }
            Some(Access::Json) => {
                ref_arms.push(quote! { [#key] => Some(::daorm::FieldRef::Json(&self.#member)) });
                mut_arms.push(quote! { [#key] => Some(::daorm::FieldMut::Json(&mut self.#member)) });
            }
            Some(Access::Flatten) => {
                ref_arms.push(quote! {
                    [#key, rest @ ..] => <#ty as ::daorm::Record>::field(&self.#member, rest)
                });
                mut_arms.push(quote! {
                    [#key, rest @ ..] => <#ty as ::daorm::Record>::field_mut(&mut self.#member, rest)
                });
            }
        }
    }

    Ok(quote! {
        impl #impl_generics ::daorm::Record for #name #ty_generics #where_clause {
            fn declared_fields() -> ::std::vec::Vec<::daorm::FieldDecl> {
                ::std::vec![#(#decls),*]
            }

            #[allow(unreachable_patterns)]
            fn field(&self, path: &[&str]) -> ::std::option::Option<::daorm::FieldRef<'_>> {
                match path {
                    #(#ref_arms,)*
                    _ => None,
                }
            }

            #[allow(unreachable_patterns)]
            fn field_mut(&mut self, path: &[&str]) -> ::std::option::Option<::daorm::FieldMut<'_>> {
                match path {
                    #(#mut_arms,)*
                    _ => None,
                }
            }
        }

        impl #impl_generics ::daorm::FromRow for #name #ty_generics #where_clause {
            type Plan = ::daorm::row::RecordPlan;

            fn plan(columns: &[::std::string::String]) -> ::daorm::OrmResult<Self::Plan> {
                ::daorm::row::plan_record::<Self>(columns)
            }

            fn scan(&mut self, plan: &Self::Plan, row: ::daorm::Row) -> ::daorm::OrmResult<()> {
                ::daorm::row::scan_record(self, plan, row)
            }

            fn blank() -> Self {
                ::std::default::Default::default()
            }
        }

        impl #impl_generics ::daorm::Writable for #name #ty_generics #where_clause {
            fn record_values(&self) -> ::daorm::OrmResult<::daorm::RecordValues> {
                ::daorm::writable::record_values(self)
            }
        }
    })
}
