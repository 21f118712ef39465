//! RSA key material for the login handshake
//!
//! The public modulus and exponent come out as decimal strings, which is what the client passes
//! to `new BigInteger(String)`.

use crate::error::Error;
use classpatch::patch::RsaPublicKey;
use log::info;
use rsa::pkcs8::{DecodePrivateKey, DecodePublicKey, EncodePrivateKey};
use rsa::traits::{PrivateKeyParts, PublicKeyParts};
use rsa::RsaPrivateKey;
use std::fmt;
use std::io::Read;
use std::path::Path;

/// Size of generated keys, matching what the client's login block can hold
pub const KEY_BITS: usize = 512;

fn key_error(err: impl fmt::Display) -> Error {
    Error::Key(err.to_string())
}

fn decimal_key(key: &impl PublicKeyParts) -> Result<RsaPublicKey, Error> {
    RsaPublicKey::new(key.n().to_string(), key.e().to_string()).map_err(Error::from)
}

/// Public half of a DER `SubjectPublicKeyInfo`
pub fn public_key_from_spki(der: &[u8]) -> Result<RsaPublicKey, Error> {
    let key = rsa::RsaPublicKey::from_public_key_der(der).map_err(key_error)?;
    decimal_key(&key)
}

/// Public half of a DER PKCS#8 `PrivateKeyInfo`
pub fn public_key_from_pkcs8(der: &[u8]) -> Result<RsaPublicKey, Error> {
    let key = RsaPrivateKey::from_pkcs8_der(der).map_err(key_error)?;
    log_pair(&key);
    decimal_key(&key)
}

/// Fetch the public key a login server publishes
pub fn download(url: &str) -> Result<RsaPublicKey, Error> {
    info!("Downloading login key from {}", url);
    let response = ureq::get(url).call()?;
    let status = response.status().as_u16();
    if status != 200 {
        return Err(Error::HttpStatus(status));
    }
    let mut der = vec![];
    response.into_body().into_reader().read_to_end(&mut der)?;
    let key = public_key_from_spki(&der)?;
    info!("Public exponent: {}", key.exponent);
    info!("Modulus: {}", key.modulus);
    Ok(key)
}

/// Read the private key at `path`, or create one there if there is none yet
pub fn load_or_generate(path: &Path) -> Result<RsaPublicKey, Error> {
    if path.exists() {
        info!("Loading key pair from {}", path.display());
        let der = std::fs::read(path)?;
        public_key_from_pkcs8(&der)
    } else {
        generate(path)
    }
}

/// Generate a new key pair, saving the private key to `path` as PKCS#8 DER
pub fn generate(path: &Path) -> Result<RsaPublicKey, Error> {
    info!("Generating new RSA key pair...");
    let key = RsaPrivateKey::new(&mut rand::thread_rng(), KEY_BITS).map_err(key_error)?;
    let der = key.to_pkcs8_der().map_err(key_error)?;
    std::fs::write(path, der.as_bytes())?;
    info!("Saved private key to {}", path.display());
    log_pair(&key);
    decimal_key(&key)
}

fn log_pair(key: &RsaPrivateKey) {
    info!("===== RSA Key Pair Info =====");
    info!("Public exponent: {}", key.e());
    info!("Private exponent: {}", key.d());
    info!("Modulus: {}", key.n());
}

#[cfg(test)]
mod test {
    use super::*;
    use rsa::pkcs8::EncodePublicKey;

    fn scratch(name: &str) -> std::path::PathBuf {
        let path =
            std::env::temp_dir().join(format!("classpatch-{}-{}.der", name, std::process::id()));
        let _ = std::fs::remove_file(&path);
        path
    }

    #[test]
    fn generates_then_reloads() {
        let path = scratch("generated");
        let generated = load_or_generate(&path).unwrap();
        assert!(path.exists());
        assert_eq!(generated.exponent, "65537");
        // 512 bits is 154 or 155 decimal digits
        assert!(generated.modulus.len() >= 154);

        let reloaded = load_or_generate(&path).unwrap();
        assert_eq!(reloaded, generated);
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn subject_public_key_info() {
        let private = RsaPrivateKey::new(&mut rand::thread_rng(), KEY_BITS).unwrap();
        let public = private.to_public_key();
        let der = public.to_public_key_der().unwrap();

        let key = public_key_from_spki(der.as_bytes()).unwrap();
        assert_eq!(key.modulus, public.n().to_string());
        assert_eq!(key.exponent, public.e().to_string());

        let der = private.to_pkcs8_der().unwrap();
        assert_eq!(public_key_from_pkcs8(der.as_bytes()).unwrap(), key);
    }

    #[test]
    fn malformed() {
        assert!(matches!(public_key_from_spki(&[]), Err(Error::Key(_))));
        assert!(matches!(
            public_key_from_spki(&[0x30, 0x05, 0x02]),
            Err(Error::Key(_))
        ));
        assert!(matches!(
            public_key_from_pkcs8(&[0x02, 0x01, 0x00]),
            Err(Error::Key(_))
        ));

        let path = scratch("garbage");
        std::fs::write(&path, [0x30, 0x00]).unwrap();
        assert!(matches!(load_or_generate(&path), Err(Error::Key(_))));
        std::fs::remove_file(&path).unwrap();
    }
}
