//! JSON Web Key derivation from an exported RSA public key.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use serde::Serialize;

use crate::AuthKitError;

/// JWT/JWK signature algorithm used throughout the bridge.
pub const JWK_ALG: &str = "RS256";
/// JWK key type.
pub const JWK_KTY: &str = "RSA";

/// Modulus length of the only key shape this subsystem produces.
const MODULUS_LEN: usize = 256;
/// Exponent length for the fixed public exponent 65537.
const EXPONENT_LEN: usize = 3;
/// PKCS#1 `RSAPublicKey` export length when the modulus INTEGER carries no
/// leading zero.
const BARE_EXPORT_LEN: usize = 269;
/// Export length with the leading zero (the sign byte) before the modulus.
const PADDED_EXPORT_LEN: usize = 270;

/// Public JWK for an RSA signing key. Field order is the wire order.
#[derive(Debug, Clone, Serialize)]
pub struct Jwk {
    /// Caller-chosen key identifier.
    pub kid: String,
    /// Key type, always `RSA`.
    pub kty: String,
    /// Signature algorithm, always `RS256`.
    pub alg: String,
    /// Modulus, base64url without padding.
    pub n: String,
    /// Public exponent, base64url without padding.
    pub e: String,
}

/// Derives a JWK from a PKCS#1 `RSAPublicKey` DER export.
///
/// This is not a general RSA-key parser. It reads the two integer fields at
/// fixed offsets, which is valid only for the 2048-bit / 3-byte-exponent
/// keys this subsystem generates: the modulus is 256 bytes starting at
/// offset 9 when the export carries a leading zero before the modulus
/// (length 270), at offset 8 otherwise (length 269); the exponent is the
/// final 3 bytes. Any other export length is rejected.
///
/// # Errors
/// [`AuthKitError::SigningFailed`] for an unsupported key shape.
pub fn derive_jwk(public_key_der: &[u8], kid: &str) -> Result<Jwk, AuthKitError> {
    let len = public_key_der.len();
    if len != BARE_EXPORT_LEN && len != PADDED_EXPORT_LEN {
        return Err(AuthKitError::SigningFailed {
            message: format!(
                "unsupported public key export of {len} bytes; expected an RSA-2048 key with a 3-byte exponent"
            ),
        });
    }

    let offset = if len > BARE_EXPORT_LEN { 9 } else { 8 };
    let n = &public_key_der[offset..offset + MODULUS_LEN];
    let e = &public_key_der[len - EXPONENT_LEN..];

    Ok(Jwk {
        kid: kid.to_string(),
        kty: JWK_KTY.to_string(),
        alg: JWK_ALG.to_string(),
        n: URL_SAFE_NO_PAD.encode(n),
        e: URL_SAFE_NO_PAD.encode(e),
    })
}
