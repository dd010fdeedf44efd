//! Encryption and signature primitives over [`Key`].
//!
//! RSA encrypts with PKCS #1 v1.5 or OAEP and signs with PKCS #1 v1.5.
//! Elliptic-curve keys only sign, with DER-encoded ECDSA over the message
//! digest. Every entry point matches on the key's [`KeySpec`].

use ecdsa::signature::hazmat::{PrehashSigner, PrehashVerifier};
use elliptic_curve::{NonZeroScalar, Scalar};
use p192::NistP192;
use rand::rngs::OsRng;
use rsa::pkcs1::{DecodeRsaPrivateKey, DecodeRsaPublicKey};
use rsa::traits::PublicKeyParts;
use rsa::{Oaep, Pkcs1v15Encrypt, Pkcs1v15Sign, RsaPrivateKey, RsaPublicKey};
use sha1::Sha1;
use sha2::{Sha224, Sha256, Sha384, Sha512};
use zeroize::Zeroizing;

use crate::error::{KeyError, Result};
use crate::key::{Key, KeyMaterial};
use crate::macros::{nist_p192, with_curve};
use crate::types::{Curve, DigestAlgorithm, KeyClass, KeySpec, Padding};

fn require_class(key: &Key, class: KeyClass, operation: &str) -> Result<()> {
    if key.class() != class {
        return Err(KeyError::UnsupportedOperation(format!(
            "{operation} needs a {class:?} key, got a {:?} key",
            key.class()
        )));
    }
    Ok(())
}

fn resident_bytes<'a>(key: &'a Key, operation: &str) -> Result<&'a [u8]> {
    match key.material() {
        KeyMaterial::Resident(bytes) => Ok(bytes.as_slice()),
        KeyMaterial::SecureElement { .. } => Err(KeyError::UnsupportedOperation(format!(
            "{operation} is not available for {} keys held in a secure element",
            key.spec()
        ))),
    }
}

fn no_ec_encryption(spec: KeySpec) -> KeyError {
    KeyError::UnsupportedOperation(format!("{spec} keys cannot encrypt or decrypt"))
}

/// Encrypt `plaintext` to an RSA public key.
pub fn encrypt(key: &Key, plaintext: &[u8], padding: Padding) -> Result<Vec<u8>> {
    match key.spec() {
        KeySpec::Rsa { .. } => {
            require_class(key, KeyClass::Public, "encrypt")?;
            let public = RsaPublicKey::from_pkcs1_der(resident_bytes(key, "encrypt")?)
                .map_err(|e| KeyError::MalformedEncoding(format!("RSA public key: {e}")))?;
            let max = padding.max_plaintext_len(public.size());
            if plaintext.len() > max {
                return Err(KeyError::PlaintextTooLarge {
                    len: plaintext.len(),
                    max,
                });
            }
            let mut rng = OsRng;
            let result = match padding {
                Padding::Pkcs1 => public.encrypt(&mut rng, Pkcs1v15Encrypt, plaintext),
                Padding::Oaep => public.encrypt(&mut rng, Oaep::new::<Sha1>(), plaintext),
                Padding::OaepSha256 => public.encrypt(&mut rng, Oaep::new::<Sha256>(), plaintext),
            };
            result.map_err(|e| KeyError::UnsupportedOperation(format!("RSA encryption: {e}")))
        }
        spec @ KeySpec::EllipticCurve(_) => Err(no_ec_encryption(spec)),
    }
}

/// Decrypt `ciphertext` with an RSA private key.
///
/// Padding failures and length mismatches are both reported as
/// [`KeyError::DecryptionFailed`] without further detail.
pub fn decrypt(key: &Key, ciphertext: &[u8], padding: Padding) -> Result<Zeroizing<Vec<u8>>> {
    match key.spec() {
        KeySpec::Rsa { .. } => {
            require_class(key, KeyClass::Private, "decrypt")?;
            let private = RsaPrivateKey::from_pkcs1_der(resident_bytes(key, "decrypt")?)
                .map_err(|e| KeyError::MalformedEncoding(format!("RSA private key: {e}")))?;
            if ciphertext.len() != private.size() {
                return Err(KeyError::DecryptionFailed);
            }
            let mut rng = OsRng;
            let result = match padding {
                Padding::Pkcs1 => private.decrypt_blinded(&mut rng, Pkcs1v15Encrypt, ciphertext),
                Padding::Oaep => private.decrypt_blinded(&mut rng, Oaep::new::<Sha1>(), ciphertext),
                Padding::OaepSha256 => {
                    private.decrypt_blinded(&mut rng, Oaep::new::<Sha256>(), ciphertext)
                }
            };
            result.map(Zeroizing::new).map_err(|_| KeyError::DecryptionFailed)
        }
        spec @ KeySpec::EllipticCurve(_) => Err(no_ec_encryption(spec)),
    }
}

fn pkcs1v15_scheme(digest: DigestAlgorithm) -> Pkcs1v15Sign {
    match digest {
        DigestAlgorithm::Sha1 => Pkcs1v15Sign::new::<Sha1>(),
        DigestAlgorithm::Sha224 => Pkcs1v15Sign::new::<Sha224>(),
        DigestAlgorithm::Sha256 => Pkcs1v15Sign::new::<Sha256>(),
        DigestAlgorithm::Sha384 => Pkcs1v15Sign::new::<Sha384>(),
        DigestAlgorithm::Sha512 => Pkcs1v15Sign::new::<Sha512>(),
    }
}

// Left-pad a digest shorter than the curve order so its integer value is kept.
// Longer digests are truncated to the leftmost bits by the signer.
fn ecdsa_prehash(curve: Curve, digest: Vec<u8>) -> Vec<u8> {
    let field_size = curve.field_size();
    if digest.len() >= field_size {
        return digest;
    }
    let mut padded = vec![0u8; field_size - digest.len()];
    padded.extend_from_slice(&digest);
    padded
}

macro_rules! ecdsa_sign {
    ($c:ident, $sec1_der:expr, $prehash:expr) => {{
        let secret = $c::SecretKey::from_sec1_der($sec1_der)
            .map_err(|e| KeyError::MalformedEncoding(format!("EC private key: {e}")))?;
        let signing_key: $c::ecdsa::SigningKey = ::ecdsa::SigningKey::from(&secret).into();
        let signature: $c::ecdsa::Signature = signing_key
            .sign_prehash($prehash)
            .map_err(|e| KeyError::SigningFailed(e.to_string()))?;
        Ok(signature.to_der().as_bytes().to_vec())
    }};
}

const P192_NONCE_ATTEMPTS: usize = 4;

// p192 has no SigningKey, so P-192 goes through the ECDSA primitive with a
// fresh random nonce.
fn sign_p192(sec1_der: &[u8], prehash: &[u8]) -> Result<Vec<u8>> {
    let secret = nist_p192::SecretKey::from_sec1_der(sec1_der)
        .map_err(|e| KeyError::MalformedEncoding(format!("EC private key: {e}")))?;
    let d = Zeroizing::new(secret.to_nonzero_scalar());
    let z = ecdsa::hazmat::bits2field::<NistP192>(prehash)
        .map_err(|e| KeyError::SigningFailed(e.to_string()))?;
    let d_scalar: &Scalar<NistP192> = &d;
    let mut last_error = None;
    for _ in 0..P192_NONCE_ATTEMPTS {
        let k = Zeroizing::new(NonZeroScalar::<NistP192>::random(&mut OsRng));
        let k_scalar: Scalar<NistP192> = **k;
        match ecdsa::hazmat::sign_prehashed::<NistP192, _>(d_scalar, k_scalar, &z) {
            Ok((signature, _)) => return Ok(signature.to_der().as_bytes().to_vec()),
            // r or s came out zero for this nonce.
            Err(e) => last_error = Some(e),
        }
    }
    Err(KeyError::SigningFailed(format!(
        "P-192 signing gave up: {}",
        last_error.map(|e| e.to_string()).unwrap_or_default()
    )))
}

/// Sign `message` with a private key, hashing it with `digest` first.
pub fn sign(key: &Key, message: &[u8], digest: DigestAlgorithm) -> Result<Vec<u8>> {
    require_class(key, KeyClass::Private, "sign")?;
    let hashed = digest.digest(message);
    match (key.spec(), key.material()) {
        (KeySpec::Rsa { .. }, KeyMaterial::Resident(bytes)) => {
            let private = RsaPrivateKey::from_pkcs1_der(bytes)
                .map_err(|e| KeyError::MalformedEncoding(format!("RSA private key: {e}")))?;
            private
                .sign_with_rng(&mut OsRng, pkcs1v15_scheme(digest), &hashed)
                .map_err(|e| KeyError::SigningFailed(e.to_string()))
        }
        (KeySpec::EllipticCurve(curve), KeyMaterial::Resident(bytes)) => {
            let prehash = ecdsa_prehash(curve, hashed);
            match curve {
                Curve::P192 => sign_p192(bytes, &prehash),
                Curve::P256 => ecdsa_sign!(p256, bytes, &prehash),
                Curve::P384 => ecdsa_sign!(p384, bytes, &prehash),
                Curve::P521 => ecdsa_sign!(p521, bytes, &prehash),
            }
        }
        (KeySpec::EllipticCurve(curve), KeyMaterial::SecureElement { handle, store }) => {
            let se = store.secure_element().ok_or_else(|| {
                KeyError::UnsupportedStoreTarget("store has no secure element".to_string())
            })?;
            se.sign_prehash(handle, &ecdsa_prehash(curve, hashed))
                .map_err(|e| KeyError::SigningFailed(format!("secure element key {handle}: {e}")))
        }
        (spec @ KeySpec::Rsa { .. }, KeyMaterial::SecureElement { .. }) => Err(
            KeyError::UnsupportedOperation(format!("{spec} keys cannot live in a secure element")),
        ),
    }
}

/// Check `signature` over `message` with a public key.
///
/// Returns `Ok(false)` for a well-formed signature that does not match and
/// [`KeyError::MalformedSignature`] when the signature cannot be parsed.
pub fn verify(
    key: &Key,
    message: &[u8],
    signature: &[u8],
    digest: DigestAlgorithm,
) -> Result<bool> {
    require_class(key, KeyClass::Public, "verify")?;
    let public_bytes = resident_bytes(key, "verify")?;
    let hashed = digest.digest(message);
    match key.spec() {
        KeySpec::Rsa { .. } => {
            let public = RsaPublicKey::from_pkcs1_der(public_bytes)
                .map_err(|e| KeyError::MalformedEncoding(format!("RSA public key: {e}")))?;
            if signature.len() != public.size() {
                return Err(KeyError::MalformedSignature(format!(
                    "RSA signature is {} bytes, modulus is {}",
                    signature.len(),
                    public.size()
                )));
            }
            Ok(public
                .verify(pkcs1v15_scheme(digest), &hashed, signature)
                .is_ok())
        }
        KeySpec::EllipticCurve(curve) => {
            let prehash = ecdsa_prehash(curve, hashed);
            let valid = with_curve!(curve, c => {
                let verifying_key = c::ecdsa::VerifyingKey::from_sec1_bytes(public_bytes)
                    .map_err(|e| KeyError::MalformedEncoding(format!("EC public key: {e}")))?;
                let signature = c::ecdsa::Signature::from_der(signature)
                    .map_err(|e| KeyError::MalformedSignature(format!("ECDSA DER: {e}")))?;
                verifying_key.verify_prehash(&prehash, &signature).is_ok()
            });
            Ok(valid)
        }
    }
}
