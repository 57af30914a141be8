use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{
    Attribute, Data, DeriveInput, Error, Field, Fields, GenericArgument, Ident, LitStr, PathArguments, Result, Type,
    parse_macro_input, spanned::Spanned,
};

mod parsed;

use parsed::ParsedEntity;

/// Derive the member descriptor of a struct and register it for
/// `repoquery::DerivedInspector`.
///
/// ```text
/// #[derive(Entity)]
/// #[repoquery(name = "Person")]
/// struct PersonRecord {
///     #[repoquery(id)]
///     key: u64,
///     #[repoquery(rename = "lastname")]
///     last_name: String,
///     addresses: Vec<Address>,
///     #[repoquery(skip)]
///     cache: Cache,
/// }
/// ```
#[proc_macro_derive(Entity, attributes(repoquery))]
pub fn derive_entity(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    match ParsedEntity::from_input(&input) {
        Ok(parsed) => parsed.emit().into(),
        Err(err) => err.to_compile_error().into(),
    }
}
