use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{parse_macro_input, ItemEnum};

pub fn opcode_impl(tokens: TokenStream) -> TokenStream {
    let input = parse_macro_input!(tokens as ItemEnum);
    assert!(
        input.variants.len() <= u16::MAX as usize,
        "Too many variants"
    );
    let enum_name = &input.ident;

    let variant_infos: Vec<_> = input
        .variants
        .iter()
        .map(|v| {
            assert!(
                matches!(v.fields, syn::Fields::Unit),
                "Only unit variants are allowed on an OpCode enum"
            );
            (&v.ident, operand_of(v))
        })
        .collect();
    let const_names: Vec<_> = variant_infos
        .iter()
        .map(|(ident, _)| ident_to_upper(ident))
        .collect();

    let consts = generate_u16_values_for_discriminants(&const_names);
    let all_tokens = generate_all_const(&variant_infos);
    let code_fn_tokens = generate_code_fn(&const_names, &variant_infos);
    let (mnemonic_arms, operand_arms): (TokenStream2, TokenStream2) =
        itertools::multiunzip(variant_infos.iter().map(|(var_name, operand)| {
            let mnemonic = to_snake_case(&var_name.to_string());
            (
                quote! { Self::#var_name => #mnemonic, },
                quote! { Self::#var_name => OperandKind::#operand, },
            )
        }));

    quote! {
        impl #enum_name {
            #consts
            #all_tokens
            #code_fn_tokens

            pub fn mnemonic(&self) -> &'static str {
                match self {
                    #mnemonic_arms
                }
            }

            pub fn operand(&self) -> OperandKind {
                match self {
                    #operand_arms
                }
            }
        }
    }
    .into()
}

/// reads the `#[operand(Kind)]` attribute of a variant, defaulting to `Bare`
fn operand_of(v: &syn::Variant) -> syn::Ident {
    v.attrs
        .iter()
        .find(|attr| attr.path().is_ident("operand"))
        .map(|attr| {
            attr.parse_args::<syn::Ident>()
                .expect("expected #[operand(Kind)] with a single OperandKind variant")
        })
        .unwrap_or_else(|| syn::Ident::new("Bare", v.ident.span()))
}

/// generates tokens that define a const u16 for each variant
fn generate_u16_values_for_discriminants(const_names: &[syn::Ident]) -> TokenStream2 {
    const_names
        .iter()
        .enumerate()
        .map(|(i, name)| {
            let i = i as u16;
            quote! {pub const #name: u16 = #i;}
        })
        .collect()
}

fn generate_all_const(variant_infos: &[(&syn::Ident, syn::Ident)]) -> TokenStream2 {
    let variants = variant_infos.iter().map(|(var_name, _)| quote!(Self::#var_name));
    quote! {
        pub const ALL: &'static [Self] = &[#(#variants),*];
    }
}

fn generate_code_fn(
    const_names: &[syn::Ident],
    variant_infos: &[(&syn::Ident, syn::Ident)],
) -> TokenStream2 {
    let arms: TokenStream2 = const_names
        .iter()
        .zip(variant_infos)
        .map(|(c_name, (var_ident, _))| quote! { Self::#var_ident => Self::#c_name, })
        .collect();
    quote! {
        pub fn code(&self) -> u16 {
            match self {
                #arms
            }
        }
    }
}

fn to_snake_case(name: &str) -> String {
    let mut res = String::with_capacity(name.len() + 4);
    for (i, c) in name.chars().enumerate() {
        if c.is_uppercase() {
            if i > 0 {
                res.push('_');
            }
            res.extend(c.to_lowercase());
        } else {
            res.push(c);
        }
    }
    res
}

fn ident_to_upper(i: &syn::Ident) -> syn::Ident {
    syn::Ident::new(&to_snake_case(&i.to_string()).to_uppercase(), i.span())
}
