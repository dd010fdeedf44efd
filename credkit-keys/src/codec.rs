//! Standard binary encodings for keys.
//!
//! | key            | encoding                                         |
//! |----------------|--------------------------------------------------|
//! | RSA public     | PKCS#1 `RSAPublicKey` DER                        |
//! | RSA private    | PKCS#1 `RSAPrivateKey` DER                       |
//! | EC public      | SEC1 uncompressed point `04 || X || Y`           |
//! | EC private     | SEC1 `ECPrivateKey` DER with curve and public key |
//!
//! Decoding always re-encodes, so a resident key holds the canonical form.

use rsa::pkcs1::{DecodeRsaPrivateKey, DecodeRsaPublicKey, EncodeRsaPrivateKey, EncodeRsaPublicKey};
use rsa::traits::PublicKeyParts;
use rsa::{RsaPrivateKey, RsaPublicKey};
use sec1::der::Decode;
use sec1::EcPrivateKey;
use zeroize::Zeroizing;

use p256::elliptic_curve::sec1::ToEncodedPoint;

use crate::error::{KeyError, Result};
use crate::key::{Key, KeyMaterial};
use crate::macros::with_curve;
use crate::types::{Curve, KeyClass, KeySpec, KeyType};

/// Encode `key` in its standard format.
///
/// Fails with [`KeyError::NotExtractable`] for keys held in a secure element.
pub fn encode(key: &Key) -> Result<Zeroizing<Vec<u8>>> {
    match key.material() {
        KeyMaterial::Resident(bytes) => Ok(bytes.clone()),
        KeyMaterial::SecureElement { .. } => Err(KeyError::NotExtractable),
    }
}

/// Decode a key of family `key_type` and visibility `class`.
///
/// The bit length is derived from the structure. Bytes that form a valid key
/// of the other family fail with [`KeyError::UnsupportedAlgorithm`]; anything
/// else that does not parse fails with [`KeyError::MalformedEncoding`].
pub fn decode(bytes: &[u8], key_type: KeyType, class: KeyClass) -> Result<Key> {
    let decoded = match (key_type, class) {
        (KeyType::Rsa, KeyClass::Public) => decode_rsa_public(bytes),
        (KeyType::Rsa, KeyClass::Private) => decode_rsa_private(bytes),
        (KeyType::EllipticCurve, KeyClass::Public) => decode_ec_public(bytes),
        (KeyType::EllipticCurve, KeyClass::Private) => decode_ec_private(bytes),
    };
    match decoded {
        Ok((spec, canonical)) => Ok(Key::resident(spec, class, canonical)),
        Err(KeyError::MalformedEncoding(reason)) if parses_as_other_family(bytes, key_type, class) => {
            Err(KeyError::UnsupportedAlgorithm(format!(
                "bytes hold a key of a different algorithm than {} ({reason})",
                key_type.as_str()
            )))
        }
        Err(e) => Err(e),
    }
}

fn parses_as_other_family(bytes: &[u8], key_type: KeyType, class: KeyClass) -> bool {
    match (key_type, class) {
        (KeyType::Rsa, KeyClass::Public) => decode_ec_public(bytes).is_ok(),
        (KeyType::Rsa, KeyClass::Private) => decode_ec_private(bytes).is_ok(),
        (KeyType::EllipticCurve, KeyClass::Public) => RsaPublicKey::from_pkcs1_der(bytes).is_ok(),
        (KeyType::EllipticCurve, KeyClass::Private) => {
            RsaPrivateKey::from_pkcs1_der(bytes).is_ok()
        }
    }
}

fn malformed(what: &str, e: impl std::fmt::Display) -> KeyError {
    KeyError::MalformedEncoding(format!("{what}: {e}"))
}

fn rsa_spec(public: &RsaPublicKey) -> KeySpec {
    KeySpec::Rsa {
        bits: public.n().bits() as usize,
    }
}

fn decode_rsa_public(bytes: &[u8]) -> Result<(KeySpec, Zeroizing<Vec<u8>>)> {
    let public =
        RsaPublicKey::from_pkcs1_der(bytes).map_err(|e| malformed("RSA public key", e))?;
    let der = public
        .to_pkcs1_der()
        .map_err(|e| malformed("RSA public key", e))?;
    Ok((rsa_spec(&public), Zeroizing::new(der.as_bytes().to_vec())))
}

fn decode_rsa_private(bytes: &[u8]) -> Result<(KeySpec, Zeroizing<Vec<u8>>)> {
    let private =
        RsaPrivateKey::from_pkcs1_der(bytes).map_err(|e| malformed("RSA private key", e))?;
    private
        .validate()
        .map_err(|e| malformed("RSA private key", e))?;
    let der = private
        .to_pkcs1_der()
        .map_err(|e| malformed("RSA private key", e))?;
    Ok((
        rsa_spec(&private.to_public_key()),
        Zeroizing::new(der.as_bytes().to_vec()),
    ))
}

fn decode_ec_public(bytes: &[u8]) -> Result<(KeySpec, Zeroizing<Vec<u8>>)> {
    let curve = curve_for_point(bytes)?;
    let point = with_curve!(curve, c => {
        c::PublicKey::from_sec1_bytes(bytes)
            .map(|public| public.to_encoded_point(false).as_bytes().to_vec())
            .map_err(|e| malformed("EC point", e))?
    });
    Ok((KeySpec::EllipticCurve(curve), Zeroizing::new(point)))
}

fn curve_for_point(bytes: &[u8]) -> Result<Curve> {
    let tag = *bytes
        .first()
        .ok_or_else(|| KeyError::MalformedEncoding("empty EC point".to_string()))?;
    let curve = match tag {
        0x04 => Curve::from_uncompressed_point_len(bytes.len()),
        0x02 | 0x03 => Curve::from_field_size(bytes.len() - 1),
        _ => None,
    };
    curve.ok_or_else(|| {
        KeyError::MalformedEncoding(format!(
            "EC point of {} bytes with tag {tag:#04x} matches no supported curve",
            bytes.len()
        ))
    })
}

fn decode_ec_private(bytes: &[u8]) -> Result<(KeySpec, Zeroizing<Vec<u8>>)> {
    let parsed = EcPrivateKey::from_der(bytes).map_err(|e| malformed("EC private key", e))?;
    let curve = Curve::from_field_size(parsed.private_key.len()).ok_or_else(|| {
        KeyError::MalformedEncoding(format!(
            "EC private scalar of {} bytes matches no supported curve",
            parsed.private_key.len()
        ))
    })?;
    let embedded_point = parsed.public_key;

    // from_sec1_der also rejects curve parameters that disagree with the scalar length.
    let (der, point) = with_curve!(curve, c => {
        let secret = c::SecretKey::from_sec1_der(bytes).map_err(|e| malformed("EC private key", e))?;
        let der = secret.to_sec1_der().map_err(|e| malformed("EC private key", e))?;
        let point = secret.public_key().to_encoded_point(false).as_bytes().to_vec();
        (der, point)
    });

    if let Some(embedded) = embedded_point {
        let embedded = decode_ec_public(embedded)?.1;
        if embedded.as_slice() != point.as_slice() {
            return Err(KeyError::MalformedEncoding(
                "EC private key embeds a public key that does not match its scalar".to_string(),
            ));
        }
    }
    Ok((KeySpec::EllipticCurve(curve), der))
}

/// Derive the public half from a resident private encoding.
pub(crate) fn public_from_private(spec: KeySpec, private_der: &[u8]) -> Result<Key> {
    match spec {
        KeySpec::Rsa { .. } => {
            let private = RsaPrivateKey::from_pkcs1_der(private_der)
                .map_err(|e| malformed("RSA private key", e))?;
            let der = private
                .to_public_key()
                .to_pkcs1_der()
                .map_err(|e| malformed("RSA public key", e))?;
            Ok(Key::resident(
                spec,
                KeyClass::Public,
                Zeroizing::new(der.as_bytes().to_vec()),
            ))
        }
        KeySpec::EllipticCurve(curve) => {
            let point = with_curve!(curve, c => {
                c::SecretKey::from_sec1_der(private_der)
                    .map(|secret| secret.public_key().to_encoded_point(false).as_bytes().to_vec())
                    .map_err(|e| malformed("EC private key", e))?
            });
            Ok(Key::resident(spec, KeyClass::Public, Zeroizing::new(point)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::generate_material;

    #[test]
    fn ec_public_roundtrip_all_curves() {
        for curve in Curve::ALL {
            let spec = KeySpec::EllipticCurve(curve);
            let (public, private) = generate_material(spec).unwrap();
            assert_eq!(public.len(), curve.uncompressed_point_len());
            assert_eq!(public[0], 0x04);

            let key = decode(&public, KeyType::EllipticCurve, KeyClass::Public).unwrap();
            assert_eq!(key.spec(), spec);
            assert_eq!(encode(&key).unwrap().as_slice(), public.as_slice());

            let key = decode(&private, KeyType::EllipticCurve, KeyClass::Private).unwrap();
            assert_eq!(key.bits(), curve.bits());
            assert_eq!(encode(&key).unwrap().as_slice(), private.as_slice());
        }
    }

    #[test]
    fn compressed_point_is_canonicalised() {
        let spec = KeySpec::EllipticCurve(Curve::P256);
        let (public, _) = generate_material(spec).unwrap();
        let compressed = p256::PublicKey::from_sec1_bytes(&public)
            .unwrap()
            .to_encoded_point(true)
            .as_bytes()
            .to_vec();
        assert_eq!(compressed.len(), 33);
        let key = decode(&compressed, KeyType::EllipticCurve, KeyClass::Public).unwrap();
        assert_eq!(encode(&key).unwrap().as_slice(), public.as_slice());
    }

    #[test]
    fn malformed_points_are_rejected() {
        for bytes in [&[][..], &[0x04; 10][..], &[0x05; 65][..]] {
            assert!(matches!(
                decode(bytes, KeyType::EllipticCurve, KeyClass::Public),
                Err(KeyError::MalformedEncoding(_))
            ));
        }
        // Right length, not on the curve.
        let mut off_curve = vec![0x04];
        off_curve.extend_from_slice(&[0x01; 64]);
        assert!(matches!(
            decode(&off_curve, KeyType::EllipticCurve, KeyClass::Public),
            Err(KeyError::MalformedEncoding(_))
        ));
    }

    #[test]
    fn ec_bytes_under_rsa_tag_are_unsupported_algorithm() {
        let (public, private) = generate_material(KeySpec::EllipticCurve(Curve::P384)).unwrap();
        assert!(matches!(
            decode(&public, KeyType::Rsa, KeyClass::Public),
            Err(KeyError::UnsupportedAlgorithm(_))
        ));
        assert!(matches!(
            decode(&private, KeyType::Rsa, KeyClass::Private),
            Err(KeyError::UnsupportedAlgorithm(_))
        ));
    }

    #[test]
    fn private_key_with_foreign_public_key_is_malformed() {
        let spec = KeySpec::EllipticCurve(Curve::P256);
        let (_, private) = generate_material(spec).unwrap();
        let (other_public, _) = generate_material(spec).unwrap();

        let parsed = EcPrivateKey::from_der(&private).unwrap();
        let forged = EcPrivateKey {
            private_key: parsed.private_key,
            parameters: parsed.parameters,
            public_key: Some(other_public.as_slice()),
        };
        let forged_der = sec1::der::Encode::to_der(&forged).unwrap();
        assert!(matches!(
            decode(&forged_der, KeyType::EllipticCurve, KeyClass::Private),
            Err(KeyError::MalformedEncoding(_))
        ));
    }
}
