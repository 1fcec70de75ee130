use proc_macro::TokenStream;
use quote::quote;
use syn::{Data, DeriveInput, Expr, Fields, parse_macro_input};

/// Derives `envhub::Params` for a struct with named fields (or a unit
/// struct). Each field is one parameter, in declaration order.
///
/// `#[param(default)]` makes a field optional with `Default::default()`;
/// `#[param(default = expr)]` uses `expr` instead.
#[proc_macro_derive(Params, attributes(param))]
pub fn derive_params(item: TokenStream) -> TokenStream {
    let input = parse_macro_input!(item as DeriveInput);
    match expand(&input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

enum DefaultValue {
    None,
    Trait,
    Expr(Expr),
}

struct Field<'a> {
    ident: &'a syn::Ident,
    ty: &'a syn::Type,
    default: DefaultValue,
}

fn expand(input: &DeriveInput) -> syn::Result<proc_macro2::TokenStream> {
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let Data::Struct(data) = &input.data else {
        return Err(syn::Error::new_spanned(
            name,
            "Params can only be derived for structs",
        ));
    };

    let fields = match &data.fields {
        Fields::Named(named) => named
            .named
            .iter()
            .map(|f| {
                Ok(Field {
                    ident: f
                        .ident
                        .as_ref()
                        .ok_or_else(|| syn::Error::new_spanned(f, "expected a named field"))?,
                    ty: &f.ty,
                    default: parse_default(&f.attrs)?,
                })
            })
            .collect::<syn::Result<Vec<_>>>()?,
        Fields::Unit => Vec::new(),
        Fields::Unnamed(_) => {
            return Err(syn::Error::new_spanned(
                name,
                "Params needs named fields; parameter names come from them",
            ));
        }
    };

    let specs = fields.iter().map(|f| {
        let key = f.ident.to_string();
        let ty = f.ty;
        match &f.default {
            DefaultValue::None => quote! { ::envhub::env::ParamSpec::of::<#ty>(#key) },
            DefaultValue::Trait => quote! {
                ::envhub::env::ParamSpec::defaulted::<#ty>(
                    #key,
                    &<#ty as ::core::default::Default>::default(),
                )?
            },
            DefaultValue::Expr(expr) => quote! {
                ::envhub::env::ParamSpec::defaulted::<#ty>(#key, &{ let v: #ty = #expr; v })?
            },
        }
    });

    let binds = fields.iter().map(|f| {
        let ident = f.ident;
        let key = ident.to_string();
        let ty = f.ty;
        match &f.default {
            DefaultValue::None => quote! { #ident: binder.required::<#ty>(#key)? },
            DefaultValue::Trait => quote! {
                #ident: binder.optional::<#ty, _>(#key, <#ty as ::core::default::Default>::default)?
            },
            DefaultValue::Expr(expr) => quote! {
                #ident: binder.optional::<#ty, _>(#key, || #expr)?
            },
        }
    });

    let construct = if matches!(data.fields, Fields::Unit) {
        quote! { Self }
    } else {
        quote! { Self { #(#binds,)* } }
    };

    let pushes = fields.iter().map(|f| {
        let ident = f.ident;
        quote! { args.push(self.#ident)?; }
    });

    Ok(quote! {
        impl #impl_generics ::envhub::env::Params for #name #ty_generics #where_clause {
            fn params() -> ::std::result::Result<
                ::std::vec::Vec<::envhub::env::ParamSpec>,
                ::envhub::Error,
            > {
                ::std::result::Result::Ok(::std::vec![#(#specs),*])
            }

            #[allow(unused_mut)]
            fn bind(
                args: ::envhub::env::CallArgs,
            ) -> ::std::result::Result<Self, ::envhub::Error> {
                let mut binder = ::envhub::env::Binder::new(args);
                let value = #construct;
                binder.finish()?;
                ::std::result::Result::Ok(value)
            }

            #[allow(unused_mut)]
            fn into_args(self) -> ::std::result::Result<::envhub::env::CallArgs, ::envhub::Error> {
                let mut args = ::envhub::env::CallArgs::new();
                #(#pushes)*
                ::std::result::Result::Ok(args)
            }
        }
    })
}

fn parse_default(attrs: &[syn::Attribute]) -> syn::Result<DefaultValue> {
    let mut default = DefaultValue::None;
    for attr in attrs.iter().filter(|a| a.path().is_ident("param")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("default") {
                default = if meta.input.peek(syn::Token![=]) {
                    DefaultValue::Expr(meta.value()?.parse()?)
                } else {
                    DefaultValue::Trait
                };
                Ok(())
            } else {
                Err(meta.error("unsupported param attribute; expected `default`"))
            }
        })?;
    }
    Ok(default)
}
