pub fn impl_event(input: syn::Result<syn::DeriveInput>) -> syn::Result<proc_macro::TokenStream> {
    let mut input = input?;

    let data_struct = match &input.data {
        syn::Data::Struct(data_struct) => Ok(data_struct),
        _ => Err(syn::Error::new(
            proc_macro2::Span::call_site(),
            "the `Event` trait can only be derived for struct types",
        )),
    }?;

    let center = crate::get_field("center", data_struct)
        .ok_or_else(|| syn::Error::new_spanned(&data_struct.fields, "no `center` field"))?;
    let dimensions = match &center.ty {
        syn::Type::Array(array) => Ok(array.len.clone()),
        ty => Err(syn::Error::new_spanned(
            ty,
            "the `center` field must be an array of coordinates",
        )),
    }?;

    for name in ["signal", "error_squared"] {
        crate::get_field(name, data_struct).ok_or_else(|| {
            syn::Error::new_spanned(&data_struct.fields, format!("no `{name}` field"))
        })?;
    }

    input
        .generics
        .where_clause
        .get_or_insert_with(|| syn::WhereClause {
            where_token: Default::default(),
            predicates: Default::default(),
        })
        .predicates
        .push(syn::parse_quote! {
            Self: ::core::clone::Clone + ::core::marker::Send + ::core::marker::Sync
        });

    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();
    let name = &input.ident;

    Ok(quote::quote! {
        impl #impl_generics Event<{ #dimensions }> for #name #ty_generics #where_clause {
            #[inline]
            fn center(&self) -> [f64; #dimensions] {
                self.center
            }

            #[inline]
            fn signal(&self) -> f64 {
                self.signal
            }

            #[inline]
            fn error_squared(&self) -> f64 {
                self.error_squared
            }

            #[inline]
            fn relocated(&self, center: [f64; #dimensions]) -> Self {
                Self {
                    center,
                    ..::core::clone::Clone::clone(self)
                }
            }
        }
    }
    .into())
}
