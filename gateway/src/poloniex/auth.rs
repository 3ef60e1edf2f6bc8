//! HMAC-SHA512 signature generation for Poloniex trading API requests.

use hmac::{Hmac, Mac};
use sha2::Sha512;

type HmacSha512 = Hmac<Sha512>;

/// Sign a form-encoded POST body with HMAC-SHA512.
///
/// Returns the lowercase hex signature sent in the `Sign` header.
pub fn sign(body: &str, secret: &str) -> String {
    let mut mac =
        HmacSha512::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key length");
    mac.update(body.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}
