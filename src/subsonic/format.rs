//! Output format negotiation.

use super::params::Params;

/// Output format, resolved once per request from the `f` parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Format {
    #[default]
    Xml,
    Json,
    Jsonp,
}

impl Format {
    /// Unset or unrecognized values fall back to XML.
    pub fn from_params(params: &Params) -> Self {
        match params.get("f") {
            Ok("json") => Self::Json,
            Ok("jsonp") => Self::Jsonp,
            _ => Self::Xml,
        }
    }

    pub fn content_type(self) -> &'static str {
        match self {
            Self::Xml => "application/xml",
            Self::Json => "application/json",
            Self::Jsonp => "application/javascript",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Xml => "xml",
            Self::Json => "json",
            Self::Jsonp => "jsonp",
        }
    }
}

impl std::fmt::Display for Format {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_selection() {
        let cases = [
            (None, Format::Xml),
            (Some("xml"), Format::Xml),
            (Some("json"), Format::Json),
            (Some("jsonp"), Format::Jsonp),
            (Some("JSON"), Format::Xml),
            (Some("yaml"), Format::Xml),
            (Some(""), Format::Xml),
        ];
        for (f, expected) in cases {
            let params = match f {
                Some(v) => Params::from_pairs([("f", v)]),
                None => Params::new(),
            };
            assert_eq!(Format::from_params(&params), expected, "f={f:?}");
        }
    }

    #[test]
    fn test_content_types() {
        assert_eq!(Format::Xml.content_type(), "application/xml");
        assert_eq!(Format::Json.content_type(), "application/json");
        assert_eq!(Format::Jsonp.content_type(), "application/javascript");
    }
}
