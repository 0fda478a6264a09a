#![recursion_limit = "128"]

extern crate proc_macro;

use proc_macro2::{Span, TokenStream};
use quote::quote;
use syn::parse::{Parse, ParseStream};
use syn::{parenthesized, Result};
use syn::{punctuated::Punctuated, token::Comma, DeriveInput};

struct TypeTag {
    pub inner: syn::LitStr,
}

impl Parse for TypeTag {
    fn parse(input: ParseStream) -> Result<Self> {
        let content;
        parenthesized!(content in input);
        let inner: syn::LitStr = content.parse()?;
        let _: Option<Comma> = content.parse()?;

        Ok(TypeTag { inner })
    }
}

#[derive(Default, Debug)]
struct Tags {
    has_construct: bool,
}

impl Tags {
    pub fn add(&mut self, other: Tags) {
        self.has_construct = self.has_construct || other.has_construct;
    }
}

impl Parse for Tags {
    fn parse(input: ParseStream) -> Result<Self> {
        let mut has_construct = false;

        let content;
        parenthesized!(content in input);
        let punctuated = Punctuated::<syn::Ident, Comma>::parse_terminated(&content)?;

        for ident in punctuated {
            match ident.to_string().as_str() {
                "construct" => has_construct = true,
                other => {
                    return Err(syn::Error::new(
                        ident.span(),
                        format!("unknown pooled option `{}`", other),
                    ))
                }
            }
        }

        Ok(Tags { has_construct })
    }
}

struct Upcasts {
    targets: Vec<syn::Type>,
}

impl Parse for Upcasts {
    fn parse(input: ParseStream) -> Result<Self> {
        let content;
        parenthesized!(content in input);
        let punctuated = Punctuated::<syn::Type, Comma>::parse_terminated(&content)?;

        Ok(Upcasts {
            targets: punctuated.into_iter().collect(),
        })
    }
}

#[derive(Default)]
struct ContainerAttrs {
    tags: Tags,
    type_tag: Option<String>,
    namespace: Option<String>,
    upcasts: Vec<syn::Type>,
}

impl ContainerAttrs {
    fn from_ast(ast: &DeriveInput) -> Result<Self> {
        let mut attrs = ContainerAttrs::default();

        for attr in &ast.attrs {
            if let Some(i) = attr.path.get_ident() {
                match i.to_string().as_str() {
                    "pooled" => {
                        let tt: Tags = syn::parse2(attr.tokens.clone())?;
                        attrs.tags.add(tt);
                    }

                    "type_tag" => {
                        let tt: TypeTag = syn::parse2(attr.tokens.clone())?;
                        attrs.type_tag = Some(tt.inner.value());
                    }

                    "namespace" => {
                        let tt: TypeTag = syn::parse2(attr.tokens.clone())?;
                        attrs.namespace = Some(tt.inner.value());
                    }

                    "upcast" => {
                        let up: Upcasts = syn::parse2(attr.tokens.clone())?;
                        attrs.upcasts.extend(up.targets);
                    }

                    _ => (),
                }
            }
        }

        Ok(attrs)
    }
}

/// The `#[owner]` and `#[id]` fields plus everything else.
struct EntityFields {
    owner: (syn::Member, syn::Type),
    id: syn::Member,
    rest: Vec<syn::Member>,
}

fn has_marker(field: &syn::Field, marker: &str) -> bool {
    field.attrs.iter().any(|attr| attr.path.is_ident(marker))
}

fn entity_fields(ast: &DeriveInput) -> Result<EntityFields> {
    let fields = match &ast.data {
        syn::Data::Struct(data) => &data.fields,
        _ => {
            return Err(syn::Error::new_spanned(
                &ast.ident,
                "Pooled can only be derived for structs",
            ))
        }
    };

    let mut owner = None;
    let mut id = None;
    let mut rest = Vec::new();

    for (index, field) in fields.iter().enumerate() {
        let member = match &field.ident {
            Some(ident) => syn::Member::Named(ident.clone()),
            None => syn::Member::Unnamed(syn::Index {
                index: index as u32,
                span: Span::call_site(),
            }),
        };

        if has_marker(field, "owner") {
            if owner.is_some() {
                return Err(syn::Error::new_spanned(field, "duplicate #[owner] field"));
            }
            owner = Some((member, field.ty.clone()));
        } else if has_marker(field, "id") {
            if id.is_some() {
                return Err(syn::Error::new_spanned(field, "duplicate #[id] field"));
            }
            id = Some(member);
        } else {
            rest.push(member);
        }
    }

    let owner = owner.ok_or_else(|| {
        syn::Error::new_spanned(&ast.ident, "Pooled requires a field marked #[owner]")
    })?;
    let id = id.ok_or_else(|| {
        syn::Error::new_spanned(&ast.ident, "Pooled requires a field marked #[id]")
    })?;

    Ok(EntityFields { owner, id, rest })
}

fn type_tag_part(
    ast: &syn::DeriveInput,
    type_tag: Option<String>,
    namespace: Option<String>,
) -> TokenStream {
    let class_name = &ast.ident;
    let (impl_generics, ty_generics, where_clause) = ast.generics.split_for_impl();

    let tag = if let Some(tt) = type_tag {
        quote! { ownedpool::TypeTag::from_static(#tt) }
    } else if !ast.generics.params.is_empty() {
        quote! { ownedpool::TypeTag::of::<Self>() }
    } else {
        let name = match namespace {
            Some(ns) => format!("{}::{}", ns, class_name),
            None => class_name.to_string(),
        };

        quote! { ownedpool::TypeTag::from_static(#name) }
    };

    quote! {
        impl #impl_generics ownedpool::TypeTagged for #class_name #ty_generics #where_clause {
            fn TYPE_TAG() -> ownedpool::TypeTag { #tag }
            fn type_tag(&self) -> ownedpool::TypeTag { Self::TYPE_TAG() }
        }
    }
}

fn entity_part(ast: &syn::DeriveInput, fields: &EntityFields) -> TokenStream {
    let class_name = &ast.ident;
    let (impl_generics, ty_generics, where_clause) = ast.generics.split_for_impl();
    let (owner, owner_ty) = &fields.owner;
    let id = &fields.id;

    quote! {
        impl #impl_generics ownedpool::Identified for #class_name #ty_generics #where_clause {
            fn id(&self) -> ownedpool::Id { self.#id }
        }

        impl #impl_generics ownedpool::Owned for #class_name #ty_generics #where_clause {
            type Owner = #owner_ty;

            fn owner(&self) -> &Self::Owner { &self.#owner }
        }
    }
}

fn construct_part(ast: &syn::DeriveInput, fields: &EntityFields) -> TokenStream {
    let class_name = &ast.ident;
    let (impl_generics, ty_generics, where_clause) = ast.generics.split_for_impl();
    let (owner, owner_ty) = &fields.owner;
    let id = &fields.id;
    let rest = &fields.rest;

    quote! {
        impl #impl_generics ownedpool::Construct<#owner_ty> for #class_name #ty_generics #where_clause {
            fn construct(
                owner: #owner_ty,
                id: ownedpool::Id,
            ) -> std::result::Result<Self, ownedpool::ConstructError> {
                Ok(Self {
                    #owner: owner,
                    #id: id,
                    #(#rest: std::default::Default::default(),)*
                })
            }
        }
    }
}

fn upcast_part(ast: &syn::DeriveInput, targets: &[syn::Type]) -> TokenStream {
    let class_name = &ast.ident;
    let (impl_generics, ty_generics, where_clause) = ast.generics.split_for_impl();

    quote! {
        #(
            impl #impl_generics ownedpool::Upcast<#targets> for #class_name #ty_generics #where_clause {
                fn upcast(self: std::sync::Arc<Self>) -> std::sync::Arc<#targets> { self }
            }
        )*
    }
}

fn expand_pooled(ast: DeriveInput) -> Result<TokenStream> {
    let attrs = ContainerAttrs::from_ast(&ast)?;
    let fields = entity_fields(&ast)?;

    let type_tag_part = type_tag_part(&ast, attrs.type_tag, attrs.namespace);
    let entity_part = entity_part(&ast, &fields);
    let construct_part = if attrs.tags.has_construct {
        construct_part(&ast, &fields)
    } else {
        quote! {}
    };
    let upcast_part = upcast_part(&ast, &attrs.upcasts);

    Ok(quote! {
        #type_tag_part
        #entity_part
        #construct_part
        #upcast_part
    })
}

#[proc_macro_derive(Pooled, attributes(type_tag, namespace, pooled, upcast, owner, id))]
pub fn derive_pooled(input: proc_macro::TokenStream) -> proc_macro::TokenStream {
    let ast: DeriveInput = match syn::parse(input) {
        Ok(ast) => ast,
        Err(err) => return err.to_compile_error().into(),
    };

    expand_pooled(ast)
        .unwrap_or_else(|err| err.to_compile_error())
        .into()
}

#[proc_macro_derive(TypeTagged, attributes(type_tag, namespace))]
pub fn derive_typetagged(input: proc_macro::TokenStream) -> proc_macro::TokenStream {
    let ast: DeriveInput = match syn::parse(input) {
        Ok(ast) => ast,
        Err(err) => return err.to_compile_error().into(),
    };

    let attrs = match ContainerAttrs::from_ast(&ast) {
        Ok(attrs) => attrs,
        Err(err) => return err.to_compile_error().into(),
    };

    type_tag_part(&ast, attrs.type_tag, attrs.namespace).into()
}
