//! Checksummed 160-bit hashes used as ledger addresses
//!
//! The RIPEMD-160 digest of the input is truncated to 128 bits, and 32 bits of
//! a SHA-256 checksum are interleaved into it at offsets taken from the
//! decimal digits of pi. The 160-bit result is base32 encoded, giving a
//! 32-character uppercase address.

use base32::Alphabet;
use ripemd::Ripemd160;
use sha2::{Digest, Sha256};

/// Length of an encoded chash160
pub const CHASH160_LENGTH: usize = 32;

const PI_DIGITS: &str = "14159265358979323846264338327950288419716939937510";
const CHASH_BITS: usize = 160;
const CHECKSUM_BITS: usize = 32;

const ALPHABET: Alphabet = Alphabet::Rfc4648 { padding: false };

/// Positions of the checksum bits inside the mixed 160-bit string
fn checksum_offsets() -> Vec<usize> {
    let mut offsets = Vec::with_capacity(CHECKSUM_BITS);
    let mut offset = 0usize;

    for digit in PI_DIGITS.chars().filter_map(|c| c.to_digit(10)) {
        if digit == 0 {
            continue;
        }
        offset += digit as usize;
        if offset >= CHASH_BITS {
            break;
        }
        offsets.push(offset);
    }

    debug_assert_eq!(offsets.len(), CHECKSUM_BITS);
    offsets
}

fn to_bits(bytes: &[u8]) -> Vec<bool> {
    bytes
        .iter()
        .flat_map(|byte| (0..8).rev().map(move |i| (byte >> i) & 1 == 1))
        .collect()
}

fn from_bits(bits: &[bool]) -> Vec<u8> {
    bits.chunks(8)
        .map(|chunk| chunk.iter().fold(0u8, |acc, &bit| (acc << 1) | bit as u8))
        .collect()
}

fn checksum(clean_data: &[u8]) -> [u8; 4] {
    let full = Sha256::digest(clean_data);
    [full[5], full[13], full[21], full[29]]
}

fn mix_checksum(clean_bits: &[bool], checksum_bits: &[bool]) -> Vec<bool> {
    let mut mixed = Vec::with_capacity(clean_bits.len() + checksum_bits.len());
    let mut start = 0usize;

    for (i, offset) in checksum_offsets().into_iter().enumerate() {
        let end = offset - i;
        mixed.extend_from_slice(&clean_bits[start..end]);
        mixed.push(checksum_bits[i]);
        start = end;
    }
    mixed.extend_from_slice(&clean_bits[start..]);

    mixed
}

/// Compute the chash160 of a source string
pub fn chash160(data: &str) -> String {
    let hash = Ripemd160::digest(data.as_bytes());
    let truncated = &hash[4..];

    let mixed = mix_checksum(&to_bits(truncated), &to_bits(&checksum(truncated)));
    base32::encode(ALPHABET, &from_bits(&mixed))
}

/// Check length, alphabet and embedded checksum of an encoded chash160
pub fn is_chash_valid(encoded: &str) -> bool {
    if encoded.len() != CHASH160_LENGTH || encoded != encoded.to_uppercase() {
        return false;
    }

    let Some(bytes) = base32::decode(ALPHABET, encoded) else {
        return false;
    };
    if bytes.len() * 8 != CHASH_BITS {
        return false;
    }

    let bits = to_bits(&bytes);
    let offsets = checksum_offsets();

    let mut clean_bits = Vec::with_capacity(CHASH_BITS - CHECKSUM_BITS);
    let mut checksum_bits = Vec::with_capacity(CHECKSUM_BITS);
    for (position, bit) in bits.into_iter().enumerate() {
        if offsets.binary_search(&position).is_ok() {
            checksum_bits.push(bit);
        } else {
            clean_bits.push(bit);
        }
    }

    let clean = from_bits(&clean_bits);
    from_bits(&checksum_bits) == checksum(&clean)
}
