use super::AuthError;
use std::fmt;

/// 鉴权质询
///
/// 从 `WWW-Authenticate` 或 `Proxy-Authenticate` 响应头中解析，
/// 由方案名称和参数列表（或一段 token68 数据）组成
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Challenge {
    scheme: String,
    params: Vec<(String, String)>,
    token68: Option<String>,
}

impl Challenge {
    /// 创建鉴权质询
    #[inline]
    pub fn new(scheme: impl Into<String>, params: Vec<(String, String)>) -> Self {
        Self {
            scheme: scheme.into(),
            params,
            token68: None,
        }
    }

    /// 解析鉴权质询
    pub fn parse(value: &str) -> Result<Self, AuthError> {
        let value = value.trim();
        let (scheme, rest) = match value.find(|c: char| c.is_ascii_whitespace()) {
            Some(pos) => (&value[..pos], value[pos..].trim_start()),
            None => (value, ""),
        };
        if scheme.is_empty() || !scheme.bytes().all(is_tchar) {
            return Err(AuthError::MalformedChallenge(value.to_owned()));
        }
        let mut challenge = Self::new(scheme, Vec::new());
        if rest.is_empty() {
            return Ok(challenge);
        }
        if is_token68(rest) {
            challenge.token68 = Some(rest.to_owned());
        } else {
            challenge.params = parse_params(rest).ok_or_else(|| AuthError::MalformedChallenge(value.to_owned()))?;
        }
        Ok(challenge)
    }

    /// 方案名称
    #[inline]
    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    /// 是否为指定方案的质询，不区分大小写
    #[inline]
    pub fn is_scheme(&self, scheme: &str) -> bool {
        self.scheme.eq_ignore_ascii_case(scheme)
    }

    /// 获取参数，参数名不区分大小写
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// 所有参数
    #[inline]
    pub fn params(&self) -> &[(String, String)] {
        &self.params
    }

    /// `realm` 参数
    #[inline]
    pub fn realm(&self) -> Option<&str> {
        self.param("realm")
    }

    /// token68 数据
    #[inline]
    pub fn token68(&self) -> Option<&str> {
        self.token68.as_deref()
    }
}

impl fmt::Display for Challenge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.scheme)?;
        if let Some(token68) = &self.token68 {
            return write!(f, " {}", token68);
        }
        for (i, (name, value)) in self.params.iter().enumerate() {
            let sep = if i == 0 { " " } else { ", " };
            write!(f, "{}{}=\"{}\"", sep, name, value.replace('\\', "\\\\").replace('"', "\\\""))?;
        }
        Ok(())
    }
}

fn is_tchar(c: u8) -> bool {
    c.is_ascii_alphanumeric() || b"!#$%&'*+-.^_`|~".contains(&c)
}

fn is_token68(value: &str) -> bool {
    let data = value.trim_end_matches('=');
    !data.is_empty()
        && data
            .bytes()
            .all(|c| c.is_ascii_alphanumeric() || b"-._~+/".contains(&c))
}

fn parse_params(input: &str) -> Option<Vec<(String, String)>> {
    let bytes = input.as_bytes();
    let skip_whitespace = |mut pos: usize| {
        while pos < bytes.len() && bytes[pos].is_ascii_whitespace() {
            pos += 1;
        }
        pos
    };
    let mut params = Vec::new();
    let mut pos = 0;
    loop {
        while pos < bytes.len() && (bytes[pos].is_ascii_whitespace() || bytes[pos] == b',') {
            pos += 1;
        }
        if pos >= bytes.len() {
            break;
        }

        let name_start = pos;
        while pos < bytes.len() && is_tchar(bytes[pos]) {
            pos += 1;
        }
        if name_start == pos {
            return None;
        }
        let name = &input[name_start..pos];

        pos = skip_whitespace(pos);
        if bytes.get(pos) != Some(&b'=') {
            return None;
        }
        pos = skip_whitespace(pos + 1);

        let value = if bytes.get(pos) == Some(&b'"') {
            pos += 1;
            let mut value = Vec::new();
            loop {
                match bytes.get(pos) {
                    None => return None,
                    Some(b'\\') => {
                        value.push(*bytes.get(pos + 1)?);
                        pos += 2;
                    }
                    Some(b'"') => {
                        pos += 1;
                        break;
                    }
                    Some(&c) => {
                        value.push(c);
                        pos += 1;
                    }
                }
            }
            String::from_utf8(value).ok()?
        } else {
            let value_start = pos;
            while pos < bytes.len() && bytes[pos] != b',' && !bytes[pos].is_ascii_whitespace() {
                pos += 1;
            }
            if value_start == pos {
                return None;
            }
            input[value_start..pos].to_owned()
        };
        params.push((name.to_owned(), value));

        pos = skip_whitespace(pos);
        if pos < bytes.len() && bytes[pos] != b',' {
            return None;
        }
    }
    Some(params)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{error::Error, result::Result};

    #[test]
    fn test_parse_params_challenge() -> Result<(), Box<dyn Error>> {
        let challenge = Challenge::parse(r#"Digest realm="test realm", qop="auth,auth-int", nonce=abc123, stale=FALSE"#)?;
        assert!(challenge.is_scheme("digest"));
        assert_eq!(challenge.realm(), Some("test realm"));
        assert_eq!(challenge.param("QOP"), Some("auth,auth-int"));
        assert_eq!(challenge.param("nonce"), Some("abc123"));
        assert_eq!(challenge.param("stale"), Some("FALSE"));
        assert_eq!(challenge.token68(), None);

        let challenge = Challenge::parse(r#"Basic realm="say \"hi\"""#)?;
        assert_eq!(challenge.realm(), Some(r#"say "hi""#));
        assert_eq!(challenge.to_string(), r#"Basic realm="say \"hi\"""#);
        Ok(())
    }

    #[test]
    fn test_parse_token68_challenge() -> Result<(), Box<dyn Error>> {
        let challenge = Challenge::parse("Negotiate YIIBhwYGKwYBBQUC==")?;
        assert!(challenge.is_scheme("Negotiate"));
        assert_eq!(challenge.token68(), Some("YIIBhwYGKwYBBQUC=="));
        assert!(challenge.params().is_empty());

        let challenge = Challenge::parse("NTLM")?;
        assert!(challenge.is_scheme("ntlm"));
        assert_eq!(challenge.token68(), None);
        Ok(())
    }

    #[test]
    fn test_parse_malformed_challenge() {
        assert!(Challenge::parse("").is_err());
        assert!(Challenge::parse(r#"Basic realm="unterminated"#).is_err());
        assert!(Challenge::parse("Basic =abc").is_err());
        assert!(Challenge::parse("Basic realm=a b=c").is_err());
    }
}
