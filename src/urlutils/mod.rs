//! URL, link and request helpers for the web surface.

mod links;
mod mailto;
mod request;
mod wash;

pub use links::{
    QueryArgs, create_html_link, create_url, drop_default_urlargd, escape_html,
    make_canonical_urlargd, parse_query, quote, quote_plus, same_urls, unquote_plus,
    urlargs_replace_text_in_arg,
};
pub use mailto::{
    EMAIL_PLACEHOLDER, EmailObfuscation, MailtoOptions, UnknownObfuscationMode,
    create_html_mailto, string_to_numeric_char_reference,
};
pub use request::{RedirectError, client_ip_address, get_referer, redirect_to_url};
pub use wash::UrlArgument;
