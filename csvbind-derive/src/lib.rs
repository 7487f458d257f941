extern crate proc_macro;

mod expand;
mod schema;

use proc_macro::TokenStream;

/// Derive `csvbind::Record` for a struct with named fields.
///
/// ```rust,ignore
/// #[derive(Default, CsvRecord)]
/// struct Person {
///     #[csv(index = 0)]
///     id: Option<u32>,
///     #[csv(header = "birthday", format = "dd.MM.yyyy")]
///     birthday: Option<NaiveDate>,
///     #[csv(parent)]
///     contact: Contact,
///     // no #[csv]: not mapped
///     cache: Vec<u8>,
/// }
/// ```
///
/// The struct must implement `Default`.
#[proc_macro_derive(CsvRecord, attributes(csv))]
pub fn derive_csv_record(input: TokenStream) -> TokenStream {
    match generate(input.into()) {
        Ok(output) => output.into(),
        Err(e) => e.to_compile_error().into(),
    }
}

fn generate(input: proc_macro2::TokenStream) -> syn::Result<proc_macro2::TokenStream> {
    let item: syn::ItemStruct = syn::parse2(input)?;
    let record = schema::Record::from_ast(&item)?;

    Ok(expand::record(&record))
}
