mod event;

/// Derive macro generating an implementation of the trait `Event`.
///
/// The struct must have a `center` field of array type `[f64; D]`, and `signal` and
/// `error_squared` fields of type `f64`. Any other field is carried along untouched.
#[proc_macro_derive(Event)]
pub fn event_derive(input: proc_macro::TokenStream) -> proc_macro::TokenStream {
    event::impl_event(syn::parse(input)).unwrap_or_else(|e| syn::Error::to_compile_error(&e).into())
}

fn get_field<'a>(name: &str, data_struct: &'a syn::DataStruct) -> Option<&'a syn::Field> {
    data_struct
        .fields
        .iter()
        .find(|field| field.ident.as_ref().is_some_and(|ident| ident == name))
}
