use syn::ext::IdentExt;
use syn::spanned::Spanned;

mod kw {
    syn::custom_keyword!(index);
    syn::custom_keyword!(header);
    syn::custom_keyword!(format);
    syn::custom_keyword!(parent);
}

#[derive(Debug)]
pub(crate) struct Record {
    pub(crate) ident: syn::Ident,

    /// Fields carrying a column declaration, in declaration order
    pub(crate) fields: Vec<BoundField>,

    /// Field embedding the parent record
    pub(crate) parent: Option<ParentField>,
}

#[derive(Debug)]
pub(crate) struct BoundField {
    pub(crate) ident: syn::Ident,
    pub(crate) ty: syn::Type,
    pub(crate) column: ColumnAttr,
}

impl BoundField {
    /// Field name as reported in errors, without a raw identifier prefix
    pub(crate) fn name(&self) -> String {
        self.ident.unraw().to_string()
    }
}

#[derive(Debug)]
pub(crate) struct ParentField {
    pub(crate) ident: syn::Ident,
    pub(crate) ty: syn::Type,
}

#[derive(Debug, Default)]
pub(crate) struct ColumnAttr {
    pub(crate) index: Option<syn::Expr>,
    pub(crate) header: Option<syn::LitStr>,
    pub(crate) format: Option<syn::LitStr>,
    pub(crate) parent: Option<kw::parent>,
}

impl Record {
    pub(crate) fn from_ast(item: &syn::ItemStruct) -> syn::Result<Self> {
        if !item.generics.params.is_empty() {
            return Err(syn::Error::new_spanned(
                &item.generics,
                "CsvRecord cannot be derived for generic structs",
            ));
        }

        let syn::Fields::Named(named) = &item.fields else {
            return Err(syn::Error::new_spanned(
                &item.ident,
                "CsvRecord requires a struct with named fields",
            ));
        };

        let mut errs = ErrorSet::new();
        let mut fields = Vec::new();
        let mut parent: Option<ParentField> = None;

        for field in &named.named {
            let column = match ColumnAttr::from_field(field) {
                Ok(Some(column)) => column,
                Ok(None) => continue,
                Err(err) => {
                    errs.push(err);
                    continue;
                }
            };

            // named fields always carry an identifier
            let Some(ident) = field.ident.clone() else {
                continue;
            };

            if let Some(token) = &column.parent {
                if parent.is_some() {
                    errs.push(syn::Error::new(
                        token.span,
                        "only one field can be marked #[csv(parent)]",
                    ));
                    continue;
                }
                parent = Some(ParentField {
                    ident,
                    ty: field.ty.clone(),
                });
                continue;
            }

            fields.push(BoundField {
                ident,
                ty: field.ty.clone(),
                column,
            });
        }

        if let Some(err) = errs.collect() {
            return Err(err);
        }

        Ok(Self {
            ident: item.ident.clone(),
            fields,
            parent,
        })
    }
}

impl ColumnAttr {
    /// Merge every `#[csv(...)]` on a field. `None` when the field has none.
    fn from_field(field: &syn::Field) -> syn::Result<Option<Self>> {
        let mut result: Option<Self> = None;

        for attr in &field.attrs {
            if !attr.path().is_ident("csv") {
                continue;
            }
            if result.is_some() {
                return Err(syn::Error::new(
                    attr.span(),
                    "duplicate #[csv] attribute; combine the arguments instead",
                ));
            }
            result = Some(attr.parse_args()?);
        }

        if let Some(column) = &result {
            if let Some(token) = &column.parent {
                if column.index.is_some() || column.header.is_some() || column.format.is_some() {
                    return Err(syn::Error::new(
                        token.span,
                        "#[csv(parent)] cannot be combined with index, header or format",
                    ));
                }
            }
        }

        Ok(result)
    }
}

impl syn::parse::Parse for ColumnAttr {
    fn parse(input: syn::parse::ParseStream) -> syn::Result<Self> {
        let mut result = Self::default();

        // Allowed syntax:
        //
        // #[csv(index = 0)]
        // #[csv(header = "name")]
        // #[csv(index = 2, format = "yyyy-MM-dd")]
        // #[csv(parent)]
        loop {
            let lookahead = input.lookahead1();

            if lookahead.peek(kw::index) {
                let kw: kw::index = input.parse()?;
                if result.index.is_some() {
                    return Err(syn::Error::new(kw.span, "duplicate index"));
                }
                let _eq_token: syn::Token![=] = input.parse()?;
                result.index = Some(parse_index(input)?);
            } else if lookahead.peek(kw::header) {
                let kw: kw::header = input.parse()?;
                if result.header.is_some() {
                    return Err(syn::Error::new(kw.span, "duplicate header"));
                }
                let _eq_token: syn::Token![=] = input.parse()?;
                result.header = Some(input.parse()?);
            } else if lookahead.peek(kw::format) {
                let kw: kw::format = input.parse()?;
                if result.format.is_some() {
                    return Err(syn::Error::new(kw.span, "duplicate format"));
                }
                let _eq_token: syn::Token![=] = input.parse()?;
                result.format = Some(input.parse()?);
            } else if lookahead.peek(kw::parent) {
                result.parent = Some(input.parse()?);
            } else {
                return Err(lookahead.error());
            }

            if input.is_empty() {
                break;
            }
            let _comma_token: syn::Token![,] = input.parse()?;
            if input.is_empty() {
                break;
            }
        }

        Ok(result)
    }
}

/// An integer literal with an optional minus sign, checked to fit an `i32`.
/// Negative values are reported when the metadata is extracted.
fn parse_index(input: syn::parse::ParseStream) -> syn::Result<syn::Expr> {
    let minus: Option<syn::Token![-]> = input.parse()?;
    let lit: syn::LitInt = input.parse()?;
    let value: i64 = lit.base10_parse()?;

    if value > i64::from(i32::MAX) {
        return Err(syn::Error::new(lit.span(), "index does not fit into an i32"));
    }

    let lit = syn::LitInt::new(&value.to_string(), lit.span());
    Ok(match minus {
        Some(_) => syn::parse_quote!(-#lit),
        None => syn::parse_quote!(#lit),
    })
}

#[derive(Debug)]
pub(crate) struct ErrorSet {
    errors: Vec<syn::Error>,
}

impl ErrorSet {
    pub(crate) fn new() -> Self {
        Self { errors: vec![] }
    }

    pub(crate) fn push(&mut self, err: syn::Error) {
        self.errors.push(err);
    }

    pub(crate) fn collect(self) -> Option<syn::Error> {
        self.errors.into_iter().reduce(|mut acc, err| {
            acc.combine(err);
            acc
        })
    }
}
