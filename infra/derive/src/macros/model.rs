use fxhash::FxHashSet;
use proc_macro2::{Span, TokenStream};
use quote::quote;
use syn::ext::IdentExt;
use syn::parse::Parser;
use syn::punctuated::Punctuated;
use syn::{Attribute, Expr, Fields, ItemStruct, Lit, LitStr, Meta, Token};

const MARKER: &str = "encrypted";

#[derive(Default)]
struct ModelArgs {
    name: Option<LitStr>,
    paths: Vec<LitStr>,
    krate: Option<syn::Path>,
}

fn string_value(expr: &Expr, what: &str) -> syn::Result<LitStr> {
    match expr {
        Expr::Lit(lit) => match &lit.lit {
            Lit::Str(s) => Ok(s.clone()),
            other => Err(syn::Error::new_spanned(other, format!("Expected string literal for `{what}`"))),
        },
        other => Err(syn::Error::new_spanned(other, format!("Expected string literal for `{what}`"))),
    }
}

fn parse_args(args: TokenStream) -> syn::Result<ModelArgs> {
    let metas = Punctuated::<Meta, Token![,]>::parse_terminated.parse2(args)?;
    let mut parsed = ModelArgs::default();

    for meta in metas {
        match meta {
            Meta::NameValue(nv) if nv.path.is_ident("name") => {
                if parsed.name.is_some() {
                    return Err(syn::Error::new_spanned(nv, "Duplicate `name = \"...\"` argument"));
                }
                parsed.name = Some(string_value(&nv.value, "name")?);
            },
            Meta::NameValue(nv) if nv.path.is_ident("crate") => {
                let lit = string_value(&nv.value, "crate")?;
                parsed.krate = Some(lit.parse()?);
            },
            Meta::List(list) if list.path.is_ident("fields") => {
                let paths = list.parse_args_with(Punctuated::<LitStr, Token![,]>::parse_terminated)?;
                parsed.paths.extend(paths);
            },
            other => {
                return Err(syn::Error::new_spanned(
                    other,
                    "Supported arguments: `name = \"...\"`, `fields(\"...\")`, `crate = \"...\"`",
                ));
            },
        }
    }

    Ok(parsed)
}

/// Reads `rename = "..."` (or `rename(serialize = "...")`) and `rename_all = "..."`
/// out of `#[serde(...)]` attributes.
fn serde_setting(attrs: &[Attribute], key: &str) -> syn::Result<Option<LitStr>> {
    let mut found = None;
    for attr in attrs.iter().filter(|a| a.path().is_ident("serde")) {
        attr.parse_nested_meta(|meta| {
            if !meta.path.is_ident(key) {
                if meta.input.peek(Token![=]) {
                    let _: Expr = meta.value()?.parse()?;
                } else if meta.input.peek(syn::token::Paren) {
                    let _ = meta.parse_nested_meta(|inner| {
                        if inner.input.peek(Token![=]) {
                            let _: Expr = inner.value()?.parse()?;
                        }
                        Ok(())
                    });
                }
                return Ok(());
            }
            if meta.input.peek(Token![=]) {
                found = Some(meta.value()?.parse::<LitStr>()?);
            } else {
                meta.parse_nested_meta(|inner| {
                    let value: LitStr = inner.value()?.parse()?;
                    if inner.path.is_ident("serialize") {
                        found = Some(value);
                    }
                    Ok(())
                })?;
            }
            Ok(())
        })?;
    }
    Ok(found)
}

fn apply_rename_all(rule: &LitStr, field: &str) -> syn::Result<String> {
    let pascal = || {
        field
            .split('_')
            .filter(|part| !part.is_empty())
            .map(|part| {
                let mut chars = part.chars();
                chars.next().map_or_else(String::new, |first| {
                    first.to_uppercase().chain(chars).collect::<String>()
                })
            })
            .collect::<String>()
    };

    let renamed = match rule.value().as_str() {
        "lowercase" | "snake_case" => field.to_owned(),
        "UPPERCASE" | "SCREAMING_SNAKE_CASE" => field.to_ascii_uppercase(),
        "PascalCase" => pascal(),
        "camelCase" => {
            let pascal = pascal();
            let mut chars = pascal.chars();
            chars.next().map_or_else(String::new, |first| {
                first.to_lowercase().chain(chars).collect::<String>()
            })
        },
        "kebab-case" => field.replace('_', "-"),
        "SCREAMING-KEBAB-CASE" => field.replace('_', "-").to_ascii_uppercase(),
        _ => return Err(syn::Error::new_spanned(rule, "Unsupported serde `rename_all` rule")),
    };
    Ok(renamed)
}

fn validate_path(path: &str, span: Span) -> syn::Result<()> {
    if path.is_empty() {
        return Err(syn::Error::new(span, "Sensitive field path must not be empty"));
    }
    if path.split('.').any(str::is_empty) {
        return Err(syn::Error::new(span, format!("Sensitive field path `{path}` has an empty segment")));
    }
    Ok(())
}

fn expand(args: TokenStream, mut item: ItemStruct) -> syn::Result<TokenStream> {
    let args = parse_args(args)?;
    let rename_all = serde_setting(&item.attrs, "rename_all")?;

    let Fields::Named(fields) = &mut item.fields else {
        return Err(syn::Error::new_spanned(
            &item.ident,
            "encrypted_model only supports structs with named fields",
        ));
    };

    let mut paths: Vec<(String, Span)> = Vec::new();
    for field in &mut fields.named {
        let before = field.attrs.len();
        field.attrs.retain(|a| !a.path().is_ident(MARKER));
        if field.attrs.len() == before {
            continue;
        }
        let Some(ident) = &field.ident else { continue };
        let serialized = match (serde_setting(&field.attrs, "rename")?, &rename_all) {
            (Some(rename), _) => rename.value(),
            (None, Some(rule)) => apply_rename_all(rule, &ident.unraw().to_string())?,
            (None, None) => ident.unraw().to_string(),
        };
        paths.push((serialized, ident.span()));
    }
    paths.extend(args.paths.iter().map(|lit| (lit.value(), lit.span())));

    if paths.is_empty() {
        return Err(syn::Error::new_spanned(
            &item.ident,
            "encrypted_model requires at least one `#[encrypted]` field or `fields(\"...\")` entry",
        ));
    }
    let mut seen = FxHashSet::default();
    for (path, span) in &paths {
        validate_path(path, *span)?;
        if !seen.insert(path.as_str()) {
            return Err(syn::Error::new(*span, format!("Sensitive field `{path}` is declared twice")));
        }
    }

    let name = &item.ident;
    let schema_name = args.name.unwrap_or_else(|| LitStr::new(&name.to_string(), name.span()));
    let krate = args.krate.unwrap_or_else(|| syn::parse_quote!(::fcrypt_cryptor));
    let literals = paths.iter().map(|(path, span)| LitStr::new(path, *span));
    let (impl_generics, ty_generics, where_clause) = item.generics.split_for_impl();

    Ok(quote! {
        #item

        #[automatically_derived]
        impl #impl_generics #krate::EncryptedModel for #name #ty_generics #where_clause {
            const NAME: &'static str = #schema_name;
            const SENSITIVE_FIELDS: &'static [&'static str] = &[#(#literals),*];
        }
    })
}

/// Expands the `#[encrypted_model]` macro.
pub fn expand_model(args: TokenStream, item: ItemStruct) -> TokenStream {
    expand(args, item).unwrap_or_else(syn::Error::into_compile_error)
}
