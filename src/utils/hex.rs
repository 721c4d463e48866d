use anyhow::{bail, Context, Result};

/// Decode a percent-encoded query component into UTF-8 text.
///
/// `+` decodes to a space. Multi-byte sequences are reassembled before the
/// UTF-8 check, so `%C3%A9` yields `é`.
pub fn url_decode(encoded: &str) -> Result<String> {
    let input = encoded.as_bytes();
    let mut decoded = Vec::with_capacity(input.len());
    let mut i = 0;

    while i < input.len() {
        match input[i] {
            b'%' => {
                let digits = input
                    .get(i + 1..i + 3)
                    .context("Incomplete percent-encoding")?;
                let byte = hex::decode(digits)
                    .context("Invalid hex digits in percent-encoding")?;
                decoded.extend_from_slice(&byte);
                i += 3;
            }
            b'+' => {
                decoded.push(b' ');
                i += 1;
            }
            other => {
                decoded.push(other);
                i += 1;
            }
        }
    }

    String::from_utf8(decoded).context("Percent-decoded value is not valid UTF-8")
}

/// Normalize the hash part of a `urn:btih:` topic.
///
/// Hex hashes (40 chars) are lowercased, base32 hashes (32 chars) are
/// uppercased. Anything else is rejected.
pub fn normalize_btih(hash: &str) -> Result<String> {
    match hash.len() {
        40 => {
            let bytes = hex::decode(hash).context("Invalid hex info hash")?;
            Ok(hex::encode(bytes))
        }
        32 => {
            let upper = hash.to_ascii_uppercase();
            if !upper.bytes().all(|b| matches!(b, b'A'..=b'Z' | b'2'..=b'7')) {
                bail!("Invalid base32 info hash");
            }
            Ok(upper)
        }
        len => bail!("Info hash must be 40 hex or 32 base32 characters, got {}", len),
    }
}
