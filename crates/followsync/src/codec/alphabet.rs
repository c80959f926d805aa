const NO_VALUE: u8 = 0;

/// Lookup table from an ASCII byte to its two-digit code, `NO_VALUE` when the
/// byte is outside the alphabet. Upper-case letters share the lower-case
/// codes.
const LOOKUP: [u8; 256] = {
    let mut lut = [NO_VALUE; 256];
    let mut i = 0_u8;
    while i < 26 {
        lut[(b'a' + i) as usize] = 10 + i;
        lut[(b'A' + i) as usize] = 10 + i;
        i += 1;
    }
    let mut d = 0_u8;
    while d < 10 {
        lut[(b'0' + d) as usize] = 36 + d;
        d += 1;
    }
    lut[b'-' as usize] = 46;
    lut[b'_' as usize] = 47;
    lut
};

/// Maps a two-digit code back to its character.
const fn symbol(code: u8) -> Option<char> {
    match code {
        10..=35 => Some((b'a' + (code - 10)) as char),
        36..=45 => Some((b'0' + (code - 36)) as char),
        46 => Some('-'),
        47 => Some('_'),
        _ => None,
    }
}

/// Encodes a username into its digit-pair form.
///
/// The identifier is case-folded first. Characters outside `[a-z0-9_-]` are
/// dropped rather than rejected, so the output may describe fewer characters
/// than the input held.
///
/// ```
/// use followsync::encode_identifier;
///
/// assert_eq!(encode_identifier("Ab-0"), "10114636");
/// assert_eq!(encode_identifier("ab!cd"), encode_identifier("abcd"));
/// ```
pub fn encode_identifier(identifier: &str) -> String {
    let mut out = String::with_capacity(identifier.len() * 2);
    for b in identifier.bytes() {
        let code = LOOKUP[b as usize];
        if code != NO_VALUE {
            out.push((b'0' + code / 10) as char);
            out.push((b'0' + code % 10) as char);
        }
    }
    out
}

/// Decodes a digit-pair string back into a username.
///
/// Pairs that are not two ASCII digits, or that fall outside the alphabet's
/// code range, are skipped. A trailing odd character is ignored. Decoding
/// never fails.
pub fn decode_identifier(encoded: &str) -> String {
    let mut out = String::with_capacity(encoded.len() / 2);
    for pair in encoded.as_bytes().chunks_exact(2) {
        let (hi, lo) = (pair[0], pair[1]);
        if !hi.is_ascii_digit() || !lo.is_ascii_digit() {
            continue;
        }
        if let Some(c) = symbol((hi - b'0') * 10 + (lo - b'0')) {
            out.push(c);
        }
    }
    out
}
