//! DER encoding of RSA public keys.
//!
//! Produces an X.509 `SubjectPublicKeyInfo`:
//!
//! ```text
//! SEQUENCE {
//!   SEQUENCE { OID rsaEncryption, NULL }
//!   BIT STRING { SEQUENCE { INTEGER n, INTEGER e } }
//! }
//! ```

const TAG_INTEGER: u8 = 0x02;
const TAG_BIT_STRING: u8 = 0x03;
const TAG_SEQUENCE: u8 = 0x30;

/// `SEQUENCE { OID 1.2.840.113549.1.1.1, NULL }`
const RSA_ALGORITHM_IDENTIFIER: [u8; 15] = [
    0x30, 0x0d, 0x06, 0x09, 0x2a, 0x86, 0x48, 0x86, 0xf7, 0x0d, 0x01, 0x01, 0x01, 0x05, 0x00,
];

/// Append a DER length.
fn push_length(out: &mut Vec<u8>, len: usize) {
    if len < 0x80 {
        out.push(len as u8);
        return;
    }

    let bytes = len.to_be_bytes();
    let significant: Vec<u8> = bytes.iter().copied().skip_while(|b| *b == 0).collect();
    out.push(0x80 | significant.len() as u8);
    out.extend_from_slice(&significant);
}

fn push_tlv(out: &mut Vec<u8>, tag: u8, value: &[u8]) {
    out.push(tag);
    push_length(out, value.len());
    out.extend_from_slice(value);
}

/// Append an unsigned big-endian integer.
///
/// Leading zero bytes are stripped and a single zero is prepended when the
/// high bit is set, keeping the value positive.
fn push_unsigned_integer(out: &mut Vec<u8>, magnitude: &[u8]) {
    let start = magnitude
        .iter()
        .position(|b| *b != 0)
        .unwrap_or(magnitude.len());
    let trimmed = magnitude.get(start..).unwrap_or_default();

    let mut value = Vec::with_capacity(trimmed.len() + 1);
    match trimmed.first() {
        None => value.push(0),
        Some(first) if first & 0x80 != 0 => {
            value.push(0);
            value.extend_from_slice(trimmed);
        }
        Some(_) => value.extend_from_slice(trimmed),
    }

    push_tlv(out, TAG_INTEGER, &value);
}

/// Encode `(n, e)` as a DER `SubjectPublicKeyInfo`.
///
/// Both arguments are unsigned big-endian magnitudes.
pub fn rsa_public_key_spki(modulus: &[u8], exponent: &[u8]) -> Vec<u8> {
    let mut integers = Vec::with_capacity(modulus.len() + exponent.len() + 16);
    push_unsigned_integer(&mut integers, modulus);
    push_unsigned_integer(&mut integers, exponent);

    let mut rsa_public_key = Vec::with_capacity(integers.len() + 4);
    push_tlv(&mut rsa_public_key, TAG_SEQUENCE, &integers);

    // Leading byte is the count of unused bits in the final octet
    let mut bit_string = Vec::with_capacity(rsa_public_key.len() + 1);
    bit_string.push(0x00);
    bit_string.extend_from_slice(&rsa_public_key);

    let mut body = Vec::with_capacity(RSA_ALGORITHM_IDENTIFIER.len() + bit_string.len() + 4);
    body.extend_from_slice(&RSA_ALGORITHM_IDENTIFIER);
    push_tlv(&mut body, TAG_BIT_STRING, &bit_string);

    let mut spki = Vec::with_capacity(body.len() + 4);
    push_tlv(&mut spki, TAG_SEQUENCE, &body);
    spki
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn length_bytes(len: usize) -> Vec<u8> {
        let mut out = Vec::new();
        push_length(&mut out, len);
        out
    }

    fn integer_bytes(magnitude: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        push_unsigned_integer(&mut out, magnitude);
        out
    }

    #[test]
    fn test_short_and_long_lengths() {
        assert_eq!(length_bytes(0), vec![0x00]);
        assert_eq!(length_bytes(0x7f), vec![0x7f]);
        assert_eq!(length_bytes(0x80), vec![0x81, 0x80]);
        assert_eq!(length_bytes(0xff), vec![0x81, 0xff]);
        assert_eq!(length_bytes(0x0100), vec![0x82, 0x01, 0x00]);
        assert_eq!(length_bytes(0x010f), vec![0x82, 0x01, 0x0f]);
    }

    #[test]
    fn test_integer_strips_leading_zeros() {
        assert_eq!(integer_bytes(&[0x00, 0x01, 0x00, 0x01]), vec![0x02, 0x03, 0x01, 0x00, 0x01]);
        assert_eq!(integer_bytes(&[0x01, 0x00, 0x01]), vec![0x02, 0x03, 0x01, 0x00, 0x01]);
    }

    #[test]
    fn test_integer_high_bit_gets_zero_prefix() {
        assert_eq!(integer_bytes(&[0x80]), vec![0x02, 0x02, 0x00, 0x80]);
        assert_eq!(integer_bytes(&[0x00, 0xb9]), vec![0x02, 0x02, 0x00, 0xb9]);
    }

    #[test]
    fn test_integer_zero() {
        assert_eq!(integer_bytes(&[]), vec![0x02, 0x01, 0x00]);
        assert_eq!(integer_bytes(&[0x00, 0x00]), vec![0x02, 0x01, 0x00]);
    }

    #[test]
    fn test_small_key_layout() {
        let spki = rsa_public_key_spki(&[0xc5], &[0x01, 0x00, 0x01]);

        let expected: Vec<u8> = [
            &[0x30, 0x1d][..],
            &RSA_ALGORITHM_IDENTIFIER,
            &[0x03, 0x0c, 0x00],
            &[0x30, 0x09],
            &[0x02, 0x02, 0x00, 0xc5],
            &[0x02, 0x03, 0x01, 0x00, 0x01],
        ]
        .concat();

        assert_eq!(spki, expected);
    }

    #[test]
    fn test_2048_bit_modulus_uses_two_byte_lengths() {
        let mut modulus = vec![0xff; 256];
        if let Some(last) = modulus.last_mut() {
            *last = 0x01;
        }
        let spki = rsa_public_key_spki(&modulus, &[0x01, 0x00, 0x01]);

        // 294 bytes total, the size of every 2048-bit RSA SPKI
        assert_eq!(spki.len(), 294);
        assert_eq!(spki.get(..4), Some(&[0x30, 0x82, 0x01, 0x22][..]));
    }
}
