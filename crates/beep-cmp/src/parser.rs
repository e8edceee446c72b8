use crate::error::CmpError;
use crate::node::{CmpNode, ProfileOffer};

/// Parses one channel-zero payload into its [`CmpNode`].
///
/// Tolerant of interior whitespace (including newlines) between elements and
/// around attributes, and of either quote character around an attribute
/// value, per the wire grammar. Rejects any outermost element outside the
/// closed set with [`CmpError::UnknownElement`].
pub fn parse(input: &str) -> Result<CmpNode, CmpError> {
    let mut s = Scanner::new(input);
    s.skip_ws();
    let tag = s.parse_open_tag()?;
    let node = match tag.name.as_str() {
        "greeting" => parse_greeting(&mut s, tag)?,
        "start" => parse_start(&mut s, tag)?,
        "profile" => parse_standalone_profile(&mut s, tag)?,
        "close" => parse_close(&mut s, tag)?,
        "ok" => parse_ok(&mut s, tag)?,
        "error" => parse_error(&mut s, tag)?,
        other => return Err(CmpError::UnknownElement(other.to_string())),
    };
    s.skip_ws();
    if !s.is_eof() {
        return Err(CmpError::Syntax("trailing data after root element".to_string()));
    }
    Ok(node)
}

fn parse_greeting(s: &mut Scanner<'_>, tag: OpenTag) -> Result<CmpNode, CmpError> {
    let features = split_tokens(tag.attrs.get("features"));
    let localizations = split_tokens(tag.attrs.get("localize"));
    if tag.self_closing {
        return Ok(CmpNode::Greeting { profiles: Vec::new(), features, localizations });
    }
    let mut profiles = Vec::new();
    loop {
        s.skip_ws();
        if s.peek_end_tag("greeting") {
            s.expect_end_tag("greeting")?;
            break;
        }
        let profile_tag = s.parse_open_tag()?;
        if profile_tag.name != "profile" {
            return Err(CmpError::Syntax(format!("expected <profile> inside <greeting>, found <{}>", profile_tag.name)));
        }
        let uri = profile_tag
            .attrs
            .get("uri")
            .cloned()
            .ok_or_else(|| CmpError::Syntax("<profile> inside <greeting> missing uri attribute".to_string()))?;
        if !profile_tag.self_closing {
            s.skip_until_end_tag("profile")?;
        }
        profiles.push(uri);
    }
    Ok(CmpNode::Greeting { profiles, features, localizations })
}

fn parse_start(s: &mut Scanner<'_>, tag: OpenTag) -> Result<CmpNode, CmpError> {
    let channel = tag
        .attrs
        .get("number")
        .ok_or_else(|| CmpError::Syntax("<start> missing number attribute".to_string()))?;
    let channel = parse_channel_number(channel)?;
    let server_name = tag.attrs.get("serverName").cloned();
    if tag.self_closing {
        return Err(CmpError::Syntax("<start> requires at least one <profile> child".to_string()));
    }
    let mut profiles = Vec::new();
    loop {
        s.skip_ws();
        if s.peek_end_tag("start") {
            s.expect_end_tag("start")?;
            break;
        }
        let profile_tag = s.parse_open_tag()?;
        if profile_tag.name != "profile" {
            return Err(CmpError::Syntax(format!("expected <profile> inside <start>, found <{}>", profile_tag.name)));
        }
        let uri = profile_tag
            .attrs
            .get("uri")
            .cloned()
            .ok_or_else(|| CmpError::Syntax("<profile> inside <start> missing uri attribute".to_string()))?;
        let encoding = profile_tag.attrs.get("encoding").cloned();
        let init = if profile_tag.self_closing { None } else { Some(s.take_text_until_end_tag("profile")?) };
        profiles.push(ProfileOffer { uri, encoding, init });
    }
    if profiles.is_empty() {
        return Err(CmpError::Syntax("<start> requires at least one <profile> child".to_string()));
    }
    Ok(CmpNode::Start { channel, server_name, profiles })
}

fn parse_standalone_profile(s: &mut Scanner<'_>, tag: OpenTag) -> Result<CmpNode, CmpError> {
    let uri = tag
        .attrs
        .get("uri")
        .cloned()
        .ok_or_else(|| CmpError::Syntax("<profile> missing uri attribute".to_string()))?;
    let encoding = tag.attrs.get("encoding").cloned();
    let init = if tag.self_closing { None } else { Some(s.take_text_until_end_tag("profile")?) };
    Ok(CmpNode::Profile(ProfileOffer { uri, encoding, init }))
}

fn parse_close(s: &mut Scanner<'_>, tag: OpenTag) -> Result<CmpNode, CmpError> {
    let channel = tag
        .attrs
        .get("number")
        .ok_or_else(|| CmpError::Syntax("<close> missing number attribute".to_string()))?;
    let channel = parse_channel_number(channel)?;
    let code = tag
        .attrs
        .get("code")
        .ok_or_else(|| CmpError::Syntax("<close> missing code attribute".to_string()))?;
    let code = parse_code(code)?;
    let lang = tag.attrs.get("xml:lang").cloned();
    let diagnostic = if tag.self_closing { None } else { Some(s.take_text_until_end_tag("close")?) };
    Ok(CmpNode::Close { channel, code, lang, diagnostic: diagnostic.filter(|d| !d.is_empty()) })
}

fn parse_ok(s: &mut Scanner<'_>, tag: OpenTag) -> Result<CmpNode, CmpError> {
    if !tag.self_closing {
        let trailing = s.take_text_until_end_tag("ok")?;
        if !trailing.trim().is_empty() {
            return Err(CmpError::Syntax("<ok> must not carry content".to_string()));
        }
    }
    Ok(CmpNode::Ok)
}

fn parse_error(s: &mut Scanner<'_>, tag: OpenTag) -> Result<CmpNode, CmpError> {
    let code = tag
        .attrs
        .get("code")
        .ok_or_else(|| CmpError::Syntax("<error> missing code attribute".to_string()))?;
    let code = parse_code(code)?;
    let lang = tag.attrs.get("xml:lang").cloned();
    let diagnostic = if tag.self_closing { None } else { Some(s.take_text_until_end_tag("error")?) };
    Ok(CmpNode::Error { code, lang, diagnostic: diagnostic.filter(|d| !d.is_empty()) })
}

fn parse_channel_number(token: &str) -> Result<u32, CmpError> {
    let value: u64 = token
        .parse()
        .map_err(|_| CmpError::Syntax(format!("channel number {token:?} is not a decimal integer")))?;
    if value < (1u64 << 31) {
        Ok(value as u32)
    } else {
        Err(CmpError::Syntax(format!("channel number {token:?} out of range")))
    }
}

fn parse_code(token: &str) -> Result<u32, CmpError> {
    if token.len() != 3 || !token.bytes().all(|b| b.is_ascii_digit()) {
        return Err(CmpError::Syntax(format!("reply code {token:?} is not a three-digit integer")));
    }
    token
        .parse()
        .map_err(|_| CmpError::Syntax(format!("reply code {token:?} is not a three-digit integer")))
}

fn split_tokens(attr: Option<&String>) -> Vec<String> {
    attr.map(|v| v.split_whitespace().map(str::to_string).collect()).unwrap_or_default()
}

struct OpenTag {
    name: String,
    attrs: std::collections::HashMap<String, String>,
    self_closing: bool,
}

/// Minimal hand-rolled scanner over the closed CMP element grammar. Not a
/// general XML parser: it understands exactly the tags, attributes, and
/// self-closing forms this protocol uses.
struct Scanner<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Scanner<'a> {
    fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    fn is_eof(&self) -> bool {
        self.pos >= self.input.len()
    }

    fn rest(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn skip_ws(&mut self) {
        let trimmed = self.rest().trim_start();
        self.pos = self.input.len() - trimmed.len();
    }

    fn peek_end_tag(&self, name: &str) -> bool {
        self.rest().starts_with(&format!("</{name}"))
    }

    fn expect_end_tag(&mut self, name: &str) -> Result<(), CmpError> {
        self.skip_ws();
        let expected_prefix = format!("</{name}");
        if !self.rest().starts_with(&expected_prefix) {
            return Err(CmpError::Syntax(format!("expected closing </{name}>")));
        }
        self.pos += expected_prefix.len();
        self.skip_ws();
        if !self.rest().starts_with('>') {
            return Err(CmpError::Syntax(format!("malformed closing tag for </{name}>")));
        }
        self.pos += 1;
        Ok(())
    }

    /// Consumes text content up to (and including) the matching end tag,
    /// returning the text with surrounding whitespace trimmed.
    fn take_text_until_end_tag(&mut self, name: &str) -> Result<String, CmpError> {
        let marker = format!("</{name}");
        let idx = self
            .rest()
            .find(&marker)
            .ok_or_else(|| CmpError::Syntax(format!("unterminated <{name}> element")))?;
        let text = self.rest()[..idx].trim().to_string();
        self.pos += idx;
        self.expect_end_tag(name)?;
        Ok(text)
    }

    /// Like [`Self::take_text_until_end_tag`] but discards the text; used
    /// when an element is known not to carry meaningful content (greeting
    /// profile children never do).
    fn skip_until_end_tag(&mut self, name: &str) -> Result<(), CmpError> {
        self.take_text_until_end_tag(name).map(|_| ())
    }

    fn parse_open_tag(&mut self) -> Result<OpenTag, CmpError> {
        self.skip_ws();
        if !self.rest().starts_with('<') {
            return Err(CmpError::Syntax("expected '<' at start of element".to_string()));
        }
        self.pos += 1;
        if self.rest().starts_with('/') {
            return Err(CmpError::Syntax("unexpected closing tag where an element was expected".to_string()));
        }

        let name_end = self
            .rest()
            .find(|c: char| c.is_whitespace() || c == '/' || c == '>')
            .ok_or_else(|| CmpError::Syntax("unterminated tag name".to_string()))?;
        let name = self.rest()[..name_end].to_string();
        self.pos += name_end;

        let mut attrs = std::collections::HashMap::new();
        loop {
            self.skip_ws();
            if self.rest().starts_with("/>") {
                self.pos += 2;
                return Ok(OpenTag { name, attrs, self_closing: true });
            }
            if self.rest().starts_with('>') {
                self.pos += 1;
                return Ok(OpenTag { name, attrs, self_closing: false });
            }
            if self.is_eof() {
                return Err(CmpError::Syntax(format!("unterminated <{name}> tag")));
            }
            let (attr_name, attr_value) = self.parse_attribute()?;
            attrs.insert(attr_name, attr_value);
        }
    }

    fn parse_attribute(&mut self) -> Result<(String, String), CmpError> {
        let name_end = self
            .rest()
            .find(|c: char| c == '=' || c.is_whitespace())
            .ok_or_else(|| CmpError::Syntax("malformed attribute".to_string()))?;
        let name = self.rest()[..name_end].to_string();
        self.pos += name_end;
        self.skip_ws();
        if !self.rest().starts_with('=') {
            return Err(CmpError::Syntax(format!("attribute {name:?} missing '='")));
        }
        self.pos += 1;
        self.skip_ws();
        let quote = self
            .rest()
            .chars()
            .next()
            .filter(|c| *c == '\'' || *c == '"')
            .ok_or_else(|| CmpError::Syntax(format!("attribute {name:?} value must be quoted")))?;
        self.pos += 1;
        let value_end = self
            .rest()
            .find(quote)
            .ok_or_else(|| CmpError::Syntax(format!("attribute {name:?} value missing closing quote")))?;
        let value = self.rest()[..value_end].to_string();
        self.pos += value_end + 1;
        Ok((name, value))
    }
}
