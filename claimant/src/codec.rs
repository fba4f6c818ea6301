//! Seams for token encoders and decoders
//!
//! Signing, encryption, and the wire formats of JWS and JWE are left to a
//! backend. A backend implements [`TokenEncoder`] or [`TokenDecoder`] on raw
//! bytes and a header map; the provided methods take care of moving claims
//! in and out of a [`ClaimSet`].

use serde_json::{Map, Value};

use crate::{error, ClaimSet};

/// The serialization in which a token is encoded
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Serialization {
    /// The compact, dot-separated serialization
    #[default]
    Compact,

    /// The general JSON serialization
    Json,

    /// The flattened JSON serialization
    Flattened,
}

/// A backend that turns a payload and header into a token
pub trait TokenEncoder {
    /// Encodes raw payload bytes under the given header
    ///
    /// When `serialization` is `None`, the encoder picks its own default.
    ///
    /// # Errors
    ///
    /// Returns an error if the encoder cannot produce a token.
    fn encode_binary(
        &self,
        payload: &[u8],
        header: &Map<String, Value>,
        serialization: Option<Serialization>,
    ) -> Result<String, error::EncodeError>;

    /// Encodes a claim set, using its header claim set if it has one
    ///
    /// # Errors
    ///
    /// Returns an error if the claims cannot be serialized or the encoder
    /// fails.
    fn encode(
        &self,
        claims: &ClaimSet,
        serialization: Option<Serialization>,
    ) -> Result<String, error::EncodeError> {
        let payload = claims.to_json_string()?;
        let header = claims
            .header()
            .map(|h| h.claims().clone())
            .unwrap_or_default();

        self.encode_binary(payload.as_bytes(), &header, serialization)
    }
}

/// A backend that turns a token back into a payload and header
pub trait TokenDecoder {
    /// Decodes a token into raw payload bytes and its header
    ///
    /// # Errors
    ///
    /// Returns an error if the token cannot be decoded or verified.
    fn decode_binary(
        &self,
        token: &str,
    ) -> Result<(Vec<u8>, Map<String, Value>), error::DecodeError>;

    /// Decodes a token into its claims
    ///
    /// When `into` is given, the payload is written through that claim set's
    /// rules and the header is written through the rules of its header claim
    /// set.
    ///
    /// # Errors
    ///
    /// Returns an error if the token cannot be decoded, if the payload is
    /// not a JSON object, or if the receiving claim set refuses a claim.
    fn decode(
        &self,
        token: &str,
        into: Option<&mut ClaimSet>,
    ) -> Result<Map<String, Value>, error::DecodeError> {
        let (payload, header) = self.decode_binary(token)?;

        let payload: Value = serde_json::from_slice(&payload).map_err(error::malformed_claims)?;
        let payload = match payload {
            Value::Object(map) => map,
            _ => return Err(error::not_an_object().into()),
        };

        if let Some(claims) = into {
            claims.load(Value::Object(payload.clone()))?;
            claims.header_mut().set_many(header)?;
        }

        Ok(payload)
    }
}

#[cfg(test)]
mod tests {
    use color_eyre::Result;
    use serde_json::json;

    use super::*;
    use crate::{
        rule::{AllowedValues, NumericDate},
        test::TS,
    };

    /// Joins header and payload with a newline, without any protection
    #[derive(Debug)]
    struct Plain;

    impl TokenEncoder for Plain {
        fn encode_binary(
            &self,
            payload: &[u8],
            header: &Map<String, Value>,
            serialization: Option<Serialization>,
        ) -> Result<String, error::EncodeError> {
            if serialization.unwrap_or_default() != Serialization::Compact {
                return Err(error::EncodeError::Encoder("only compact is supported".into()));
            }
            let header = serde_json::to_string(header).map_err(error::unexpected)?;
            let payload = std::str::from_utf8(payload).map_err(error::unexpected)?;
            Ok(format!("{header}\n{payload}"))
        }
    }

    impl TokenDecoder for Plain {
        fn decode_binary(
            &self,
            token: &str,
        ) -> Result<(Vec<u8>, Map<String, Value>), error::DecodeError> {
            let (header, payload) = token
                .split_once('\n')
                .ok_or_else(|| error::DecodeError::Decoder("no separator".into()))?;
            let header = serde_json::from_str(header)
                .map_err(|e| error::DecodeError::Decoder(e.into()))?;
            Ok((payload.as_bytes().to_vec(), header))
        }
    }

    #[test]
    fn encode_uses_payload_and_header() -> Result<()> {
        let mut claims = ClaimSet::new();
        claims.set("sub", "alice")?;
        claims.header_mut().set("alg", "none")?;

        let token = Plain.encode(&claims, None)?;
        assert_eq!(token, "{\"alg\":\"none\"}\n{\"sub\":\"alice\"}");
        Ok(())
    }

    #[test]
    fn encode_without_header_sends_an_empty_one() -> Result<()> {
        let token = Plain.encode(&ClaimSet::new(), Some(Serialization::Compact))?;
        assert_eq!(token, "{}\n{}");
        Ok(())
    }

    #[test]
    fn encoder_failures_propagate() {
        let err = Plain
            .encode(&ClaimSet::new(), Some(Serialization::Json))
            .unwrap_err();
        assert!(matches!(err, error::EncodeError::Encoder(_)));
    }

    #[test]
    fn decode_returns_the_payload() -> Result<()> {
        let payload = Plain.decode("{}\n{\"sub\":\"alice\",\"n\":1}", None)?;
        assert_eq!(Value::Object(payload), json!({"sub": "alice", "n": 1}));
        Ok(())
    }

    #[test]
    fn decode_into_applies_rules_and_header() -> Result<()> {
        let mut claims = ClaimSet::new().with_rule(["exp"], NumericDate::default())?;
        let token = format!("{{\"alg\":\"none\"}}\n{{\"exp\":\"{TS}\"}}");

        Plain.decode(&token, Some(&mut claims))?;
        assert_eq!(claims.get("exp"), Some(&json!(TS)));
        assert_eq!(
            claims.header().and_then(|h| h.get("alg")),
            Some(&json!("none"))
        );
        Ok(())
    }

    #[test]
    fn decode_into_keeps_header_rules() -> Result<()> {
        let mut claims = ClaimSet::new();
        claims
            .header_mut()
            .add_rule(["alg"], AllowedValues::new(["ES256"]))?;

        let err = Plain
            .decode("{\"alg\":\"none\"}\n{\"sub\":\"a\"}", Some(&mut claims))
            .unwrap_err();
        assert!(matches!(err, error::DecodeError::Write(_)));

        let header = claims.header().expect("header was prepared");
        assert!(header.has_rule("alg"));
        assert!(!header.contains("alg"));

        Plain.decode("{\"alg\":\"ES256\"}\n{\"sub\":\"a\"}", Some(&mut claims))?;
        assert_eq!(
            claims.header().and_then(|h| h.get("alg")),
            Some(&json!("ES256"))
        );
        Ok(())
    }

    #[test]
    fn decode_into_refuses_rejected_claims() -> Result<()> {
        let mut claims = ClaimSet::new().with_rule(["exp"], NumericDate::default())?;
        let err = Plain
            .decode("{}\n{\"exp\":\"later\"}", Some(&mut claims))
            .unwrap_err();
        assert!(matches!(err, error::DecodeError::Write(_)));
        Ok(())
    }

    #[test]
    fn decode_refuses_non_objects() {
        assert!(matches!(
            Plain.decode("{}\n[1,2]", None),
            Err(error::DecodeError::MalformedClaims(_))
        ));
        assert!(matches!(
            Plain.decode("{}\nnot json", None),
            Err(error::DecodeError::MalformedClaims(_))
        ));
        assert!(matches!(
            Plain.decode("no separator", None),
            Err(error::DecodeError::Decoder(_))
        ));
    }
}
