use proc_macro2::TokenStream;
use quote::quote;

use crate::schema::{BoundField, ParentField, Record};

pub(crate) fn record(record: &Record) -> TokenStream {
    let ident = &record.ident;
    let record_name = ident.to_string();
    let descriptors = record.fields.iter().map(descriptor);
    let parent_fields = record.parent.as_ref().map(parent_fields);

    quote! {
        impl ::csvbind::Record for #ident {
            fn record_name() -> &'static str {
                #record_name
            }

            fn declared_fields() -> ::std::vec::Vec<::csvbind::FieldDescriptor<Self>> {
                ::std::vec![#(#descriptors,)*]
            }

            #parent_fields

            fn instantiate() -> ::std::result::Result<Self, ::csvbind::InstantiationError> {
                ::std::result::Result::Ok(<Self as ::std::default::Default>::default())
            }
        }
    }
}

fn descriptor(field: &BoundField) -> TokenStream {
    let ident = &field.ident;
    let ty = &field.ty;
    let name = field.name();

    let index = match &field.column.index {
        Some(index) => quote!(#index),
        None => quote!(::csvbind::UNSET_INDEX),
    };
    let header = match &field.column.header {
        Some(header) => quote!(::std::string::String::from(#header)),
        None => quote!(::std::string::String::new()),
    };
    let format = match &field.column.format {
        Some(format) => {
            quote!(::std::option::Option::Some(::std::string::String::from(#format)))
        }
        None => quote!(::std::option::Option::None),
    };

    quote! {
        ::csvbind::FieldDescriptor::<Self>::new::<#ty>(
            #name,
            ::csvbind::ColumnDecl {
                index: #index,
                header: #header,
                format: #format,
            },
            |record| &record.#ident,
            |record| &mut record.#ident,
        )
    }
}

fn parent_fields(parent: &ParentField) -> TokenStream {
    let ident = &parent.ident;
    let ty = &parent.ty;

    quote! {
        fn parent_fields() -> ::std::vec::Vec<::csvbind::FieldDescriptor<Self>> {
            <#ty as ::csvbind::Record>::declared_fields()
                .into_iter()
                .map(|field| field.lift::<Self>(|record| &record.#ident, |record| &mut record.#ident))
                .collect()
        }
    }
}
