use crate::node::{CmpNode, ProfileOffer};

/// Emits the exact wire bytes for a [`CmpNode`].
///
/// Total over the union: every variant produces valid, parser-round-trippable
/// XML. Attribute values are assumed not to contain the quote character used
/// around them (profile URIs and server names are caller-controlled, not
/// attacker-controlled wire input).
pub fn emit(node: &CmpNode) -> String {
    match node {
        CmpNode::Greeting { profiles, features, localizations } => emit_greeting(profiles, features, localizations),
        CmpNode::Start { channel, server_name, profiles } => emit_start(*channel, server_name.as_deref(), profiles),
        CmpNode::Profile(p) => emit_profile(p),
        CmpNode::Close { channel, code, lang, diagnostic } => {
            emit_close_or_error("close", Some(*channel), *code, lang.as_deref(), diagnostic.as_deref())
        }
        CmpNode::Ok => "<ok />".to_string(),
        CmpNode::Error { code, lang, diagnostic } => {
            emit_close_or_error("error", None, *code, lang.as_deref(), diagnostic.as_deref())
        }
    }
}

fn emit_greeting(profiles: &[String], features: &[String], localizations: &[String]) -> String {
    let mut out = String::from("<greeting");
    if !features.is_empty() {
        out.push_str(&format!(" features=\"{}\"", features.join(" ")));
    }
    if !localizations.is_empty() {
        out.push_str(&format!(" localize=\"{}\"", localizations.join(" ")));
    }
    if profiles.is_empty() {
        out.push_str(" />");
        return out;
    }
    out.push('>');
    for uri in profiles {
        out.push_str(&format!("<profile uri=\"{uri}\" />"));
    }
    out.push_str("</greeting>");
    out
}

fn emit_start(channel: u32, server_name: Option<&str>, profiles: &[ProfileOffer]) -> String {
    let mut out = format!("<start number=\"{channel}\"");
    if let Some(name) = server_name {
        out.push_str(&format!(" serverName=\"{name}\""));
    }
    out.push('>');
    for profile in profiles {
        out.push_str(&emit_profile_tag(profile));
    }
    out.push_str("</start>");
    out
}

fn emit_profile(profile: &ProfileOffer) -> String {
    emit_profile_tag(profile)
}

fn emit_profile_tag(profile: &ProfileOffer) -> String {
    let mut out = format!("<profile uri=\"{}\"", profile.uri);
    if let Some(encoding) = &profile.encoding {
        out.push_str(&format!(" encoding=\"{encoding}\""));
    }
    match &profile.init {
        Some(init) => {
            out.push('>');
            out.push_str(init);
            out.push_str("</profile>");
        }
        None => out.push_str(" />"),
    }
    out
}

fn emit_close_or_error(
    tag: &str,
    channel: Option<u32>,
    code: u32,
    lang: Option<&str>,
    diagnostic: Option<&str>,
) -> String {
    let mut out = format!("<{tag}");
    if let Some(channel) = channel {
        out.push_str(&format!(" number=\"{channel}\""));
    }
    out.push_str(&format!(" code=\"{code:03}\""));
    if let Some(lang) = lang {
        out.push_str(&format!(" xml:lang=\"{lang}\""));
    }
    match diagnostic {
        Some(text) if !text.is_empty() => {
            out.push('>');
            out.push_str(text);
            out.push_str(&format!("</{tag}>"));
        }
        _ => out.push_str(" />"),
    }
    out
}
