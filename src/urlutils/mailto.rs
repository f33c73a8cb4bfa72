//! `mailto:` links with optional address obfuscation.

use super::links::{create_html_link, escape_html};
use serde::Deserialize;
use thiserror::Error;

/// Placeholder in link labels replaced by the (possibly obfuscated) address.
pub const EMAIL_PLACEHOLDER: &str = "%(email)s";

/// How e-mail addresses are protected from harvesters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmailObfuscation {
    /// Render nothing.
    HideAll,
    /// Plain link.
    None,
    /// `john [at] example [dot] org`.
    Munging,
    /// Every character as a numeric character reference.
    #[default]
    CharacterReferences,
    /// Link written backwards and reversed by a script.
    ReversedScript,
    /// `@` and `.` drawn as images; no link.
    Images,
}

/// Unknown obfuscation mode.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown e-mail obfuscation mode {0} (expected -1 to 4)")]
pub struct UnknownObfuscationMode(pub i32);

impl TryFrom<i32> for EmailObfuscation {
    type Error = UnknownObfuscationMode;

    fn try_from(mode: i32) -> Result<Self, Self::Error> {
        match mode {
            -1 => Ok(Self::HideAll),
            0 => Ok(Self::None),
            1 => Ok(Self::Munging),
            2 => Ok(Self::CharacterReferences),
            3 => Ok(Self::ReversedScript),
            4 => Ok(Self::Images),
            other => Err(UnknownObfuscationMode(other)),
        }
    }
}

/// Optional parts of a `mailto:` link.
#[derive(Debug, Clone)]
pub struct MailtoOptions<'a> {
    /// `subject` argument.
    pub subject: Option<&'a str>,
    /// `body` argument; line breaks are normalized to CRLF.
    pub body: Option<&'a str>,
    /// `cc` argument.
    pub cc: Option<&'a str>,
    /// `bcc` argument.
    pub bcc: Option<&'a str>,
    /// Link label; [`EMAIL_PLACEHOLDER`] is substituted.
    pub label: &'a str,
    /// Extra attributes of the `<a>` element.
    pub attributes: &'a [(&'a str, &'a str)],
    /// Quote and escape the link arguments.
    pub escape_args: bool,
    /// Escape attribute values.
    pub escape_attributes: bool,
    /// Obfuscation applied to address and label.
    pub obfuscation: EmailObfuscation,
    /// Base URL hosting `img/at.gif` and `img/dot.gif`.
    pub site_url: &'a str,
}

impl Default for MailtoOptions<'_> {
    fn default() -> Self {
        Self {
            subject: None,
            body: None,
            cc: None,
            bcc: None,
            label: EMAIL_PLACEHOLDER,
            attributes: &[],
            escape_args: true,
            escape_attributes: true,
            obfuscation: EmailObfuscation::default(),
            site_url: "",
        }
    }
}

/// Encode every character as `&#N;`.
pub fn string_to_numeric_char_reference(text: &str) -> String {
    text.chars().map(|ch| format!("&#{};", u32::from(ch))).collect()
}

/// Render an HTML `mailto:` link for `email`.
pub fn create_html_mailto(email: &str, options: &MailtoOptions<'_>) -> String {
    let email = match options.obfuscation {
        EmailObfuscation::HideAll => return String::new(),
        EmailObfuscation::Images => return image_address(email, options.site_url),
        EmailObfuscation::Munging => email.replace('@', " [at] ").replace('.', " [dot] "),
        EmailObfuscation::CharacterReferences => string_to_numeric_char_reference(email),
        EmailObfuscation::None | EmailObfuscation::ReversedScript => email.to_string(),
    };

    let body = options.body.map(crlf_line_breaks);
    let parameters: Vec<(&str, &str)> = [
        ("subject", options.subject),
        ("body", body.as_deref()),
        ("cc", options.cc),
        ("bcc", options.bcc),
    ]
    .into_iter()
    .filter_map(|(key, value)| value.map(|value| (key, value)))
    .collect();

    let label = options.label.replace(EMAIL_PLACEHOLDER, &email);
    let link = create_html_link(
        &format!("mailto:{email}"),
        &parameters,
        &label,
        options.attributes,
        options.escape_args,
        options.escape_attributes,
    );

    match options.obfuscation {
        EmailObfuscation::ReversedScript => reversed_script(&link),
        _ => link,
    }
}

fn crlf_line_breaks(text: &str) -> String {
    text.replace("\r\n", "\n").replace('\n', "\r\n")
}

fn reversed_script(link: &str) -> String {
    let reversed: String = link.chars().rev().collect();
    format!(
        "<script language=\"JavaScript\" type=\"text/javascript\">document.write('{}'.split(\"\").reverse().join(\"\"))</script>",
        reversed.replace('\'', "\\'")
    )
}

fn image_address(email: &str, site_url: &str) -> String {
    let site = escape_html(site_url, true);
    email
        .replace(
            '.',
            &format!(
                "<img src=\"{site}/img/dot.gif\" alt=\" [dot] \" style=\"vertical-align:bottom\" />"
            ),
        )
        .replace(
            '@',
            &format!(
                "<img src=\"{site}/img/at.gif\" alt=\" [at] \" style=\"vertical-align:baseline\" />"
            ),
        )
}
