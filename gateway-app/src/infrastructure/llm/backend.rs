use std::fmt;

const NATIVE_SCHEME_PREFIX: &str = "ollama://";
const HTTP_SCHEME_PREFIX: &str = "http://";

/// Which wire format the configured upstream speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    /// `/v1/chat/completions` (vLLM and friends).
    OpenAiCompatible,
    /// Ollama's native `/api/chat`.
    Ollama,
}

impl BackendKind {
    /// Classifies a configured base URL and returns the URL to actually dial.
    ///
    /// `ollama://host:port` selects the native codec and is rewritten to
    /// `http://host:port`. Anything else is used as-is. Trailing slashes are
    /// dropped in both cases.
    pub fn classify(raw_url: &str) -> (Self, String) {
        let trimmed = raw_url.trim().trim_end_matches('/');
        match strip_prefix_ignore_case(trimmed, NATIVE_SCHEME_PREFIX) {
            Some(rest) => (Self::Ollama, format!("{}{}", HTTP_SCHEME_PREFIX, rest)),
            None => (Self::OpenAiCompatible, trimmed.to_string()),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OpenAiCompatible => "openai",
            Self::Ollama => "ollama",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn strip_prefix_ignore_case<'a>(s: &'a str, prefix: &str) -> Option<&'a str> {
    let head = s.get(..prefix.len())?;
    head.eq_ignore_ascii_case(prefix).then(|| &s[prefix.len()..])
}
