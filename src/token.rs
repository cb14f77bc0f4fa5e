use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::Deserialize;

use crate::error::Error;
use crate::types::{Email, Identity, Role};

/// Claims the risk service embeds in its access token.
///
/// Read without signature verification: the client only needs them to know
/// who it signed in as. The server remains the authority on every call.
#[derive(Debug, Clone, Deserialize)]
#[non_exhaustive]
pub struct AccessClaims {
    pub sub: String,
    pub role: Role,
    #[serde(default)]
    pub exp: Option<i64>,
}

impl AccessClaims {
    #[must_use]
    pub fn identity(&self) -> Identity {
        Identity::new(Email(self.sub.clone()), self.role.clone())
    }
}

/// Decode the payload segment of a dotted `header.payload.signature` token.
///
/// # Errors
///
/// Returns `Error::Token` if the token has no payload segment, the segment
/// is not base64url, or it does not contain `sub` and `role`.
pub fn decode_claims(token_str: &str) -> Result<AccessClaims, Error> {
    let payload_b64 = token_str
        .split('.')
        .nth(1)
        .filter(|p| !p.is_empty())
        .ok_or_else(|| Error::Token("invalid token format".into()))?;

    let payload = URL_SAFE_NO_PAD
        .decode(payload_b64.trim_end_matches('='))
        .map_err(|_| Error::Token("invalid payload encoding".into()))?;

    serde_json::from_slice(&payload).map_err(|e| Error::Token(format!("invalid payload: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::token_for;

    #[test]
    fn decodes_subject_and_role() {
        let claims = decode_claims(&token_for("ops@clinic.org", "hospital")).unwrap();
        assert_eq!(claims.sub, "ops@clinic.org");
        assert_eq!(claims.role, Role::Hospital);
        assert_eq!(claims.exp, None);

        let identity = claims.identity();
        assert_eq!(identity.email.as_str(), "ops@clinic.org");
        assert_eq!(identity.role, Role::Hospital);
    }

    #[test]
    fn accepts_padded_payload() {
        let payload = base64::engine::general_purpose::URL_SAFE
            .encode(br#"{"sub":"m@x.io","role":"manufacturer","exp":1}"#);
        let claims = decode_claims(&format!("h.{payload}.s")).unwrap();
        assert_eq!(claims.role, Role::Manufacturer);
        assert_eq!(claims.exp, Some(1));
    }

    #[test]
    fn rejects_token_without_payload() {
        assert!(matches!(decode_claims("opaque"), Err(Error::Token(_))));
        assert!(matches!(decode_claims("a..c"), Err(Error::Token(_))));
    }

    #[test]
    fn rejects_payload_without_role() {
        let payload = URL_SAFE_NO_PAD.encode(br#"{"sub":"a@b.com"}"#);
        assert!(matches!(
            decode_claims(&format!("h.{payload}.s")),
            Err(Error::Token(_))
        ));
    }

    #[test]
    fn rejects_non_base64_payload() {
        assert!(matches!(decode_claims("h.@@@.s"), Err(Error::Token(_))));
    }
}
