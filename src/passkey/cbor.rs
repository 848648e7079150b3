//! CBOR processing for attestation and authenticator data
//!
//! Parses the binary structures authenticators return: the attestation
//! object produced at registration and the authenticator data blob carried
//! by every assertion.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use ciborium::de::from_reader;
use ciborium::value::Value;

use super::engine::VerificationError;

/// Credential material attested by the authenticator at registration
pub struct AttestedCredential {
    pub credential_id: Vec<u8>,
    pub public_key: Vec<u8>, // COSE-encoded
    pub sign_count: u32,
}

/// Extract the attested credential from a registration attestation object
///
/// # Errors
/// Returns `VerificationError::Invalid` for malformed encodings or when no
/// attested credential data is present.
pub fn parse_attested_credential(
    attestation_object_b64: &str,
) -> Result<AttestedCredential, VerificationError> {
    let attestation_bytes = URL_SAFE_NO_PAD
        .decode(attestation_object_b64)
        .map_err(|_| VerificationError::Invalid("Invalid attestation encoding".to_string()))?;

    let attestation: Value = from_reader(&attestation_bytes[..])
        .map_err(|_| VerificationError::Invalid("Invalid CBOR attestation format".to_string()))?;

    let Some(Some(auth_data)) = attestation.as_map().and_then(|map| {
        map.iter()
            .find(|(k, _)| k.as_text() == Some("authData"))
            .map(|(_, v)| v.as_bytes())
    }) else {
        return Err(VerificationError::Invalid(
            "Missing authData in attestation".to_string(),
        ));
    };

    // Auth data layout:
    // - 32 bytes: RP ID hash
    // - 1 byte: flags
    // - 4 bytes: signature counter (big endian)
    // - attested credential data (flag bit 6):
    //   - 16 bytes: AAGUID
    //   - 2 bytes: credential ID length (L)
    //   - L bytes: credential ID
    //   - variable: COSE public key
    if auth_data.len() < 37 {
        return Err(VerificationError::Invalid(
            "Auth data too short".to_string(),
        ));
    }

    let flags = auth_data[32];
    if (flags & 0x40) == 0 {
        return Err(VerificationError::Invalid(
            "No attested credential data".to_string(),
        ));
    }

    let sign_count = u32::from_be_bytes([
        auth_data[33],
        auth_data[34],
        auth_data[35],
        auth_data[36],
    ]);

    // Skip RP ID hash, flags, counter, then the AAGUID
    let mut pos = 37 + 16;

    if auth_data.len() < pos + 2 {
        return Err(VerificationError::Invalid(
            "Auth data too short for credential ID length".to_string(),
        ));
    }

    let id_len = ((auth_data[pos] as usize) << 8) | (auth_data[pos + 1] as usize);
    pos += 2;

    if auth_data.len() < pos + id_len {
        return Err(VerificationError::Invalid(
            "Auth data too short for credential ID".to_string(),
        ));
    }

    let credential_id = auth_data[pos..pos + id_len].to_vec();
    pos += id_len;

    if auth_data.len() <= pos {
        return Err(VerificationError::Invalid(
            "Auth data too short for public key".to_string(),
        ));
    }

    Ok(AttestedCredential {
        credential_id,
        public_key: auth_data[pos..].to_vec(),
        sign_count,
    })
}

/// Extract the signature counter from assertion authenticator data
///
/// # Errors
/// Returns `VerificationError::Invalid` for malformed encodings.
pub fn parse_sign_count(authenticator_data_b64: &str) -> Result<u32, VerificationError> {
    let auth_data = URL_SAFE_NO_PAD
        .decode(authenticator_data_b64)
        .map_err(|_| VerificationError::Invalid("Invalid authenticator data encoding".to_string()))?;

    if auth_data.len() < 37 {
        return Err(VerificationError::Invalid(
            "Authenticator data too short".to_string(),
        ));
    }

    Ok(u32::from_be_bytes([
        auth_data[33],
        auth_data[34],
        auth_data[35],
        auth_data[36],
    ]))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn auth_data_with_counter(counter: u32) -> String {
        let mut bytes = vec![0u8; 37];
        bytes[32] = 0x01; // UP flag only
        bytes[33..37].copy_from_slice(&counter.to_be_bytes());
        URL_SAFE_NO_PAD.encode(bytes)
    }

    #[test]
    fn test_parse_sign_count() {
        assert_eq!(parse_sign_count(&auth_data_with_counter(5)).unwrap(), 5);
        assert_eq!(parse_sign_count(&auth_data_with_counter(0)).unwrap(), 0);
        assert_eq!(
            parse_sign_count(&auth_data_with_counter(u32::MAX)).unwrap(),
            u32::MAX
        );
    }

    #[test]
    fn test_parse_sign_count_rejects_short_data() {
        let short = URL_SAFE_NO_PAD.encode([0u8; 36]);
        assert!(parse_sign_count(&short).is_err());
    }

    #[test]
    fn test_parse_sign_count_rejects_bad_encoding() {
        assert!(parse_sign_count("not base64 at all!!").is_err());
    }

    #[test]
    fn test_parse_attested_credential_roundtrip() {
        // Build auth data with attested credential data present
        let mut auth_data = vec![0u8; 37];
        auth_data[32] = 0x41; // UP + attested credential data
        auth_data[33..37].copy_from_slice(&7u32.to_be_bytes());
        auth_data.extend_from_slice(&[0u8; 16]); // AAGUID
        let cred_id = b"credential-id";
        auth_data.extend_from_slice(&u16::try_from(cred_id.len()).unwrap().to_be_bytes());
        auth_data.extend_from_slice(cred_id);
        let cose_key = [0xA5, 0x01, 0x02];
        auth_data.extend_from_slice(&cose_key);

        let mut attestation = Vec::new();
        ciborium::ser::into_writer(
            &Value::Map(vec![(
                Value::Text("authData".to_string()),
                Value::Bytes(auth_data),
            )]),
            &mut attestation,
        )
        .unwrap();

        let parsed =
            parse_attested_credential(&URL_SAFE_NO_PAD.encode(attestation)).unwrap();
        assert_eq!(parsed.credential_id, cred_id);
        assert_eq!(parsed.public_key, cose_key);
        assert_eq!(parsed.sign_count, 7);
    }

    #[test]
    fn test_parse_attested_credential_requires_flag() {
        let mut auth_data = vec![0u8; 37];
        auth_data[32] = 0x01; // attested credential data flag absent

        let mut attestation = Vec::new();
        ciborium::ser::into_writer(
            &Value::Map(vec![(
                Value::Text("authData".to_string()),
                Value::Bytes(auth_data),
            )]),
            &mut attestation,
        )
        .unwrap();

        assert!(parse_attested_credential(&URL_SAFE_NO_PAD.encode(attestation)).is_err());
    }
}
