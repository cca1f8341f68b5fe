//! Fixed-size probe names.
//!
//! A name of up to [`MAX_LENGTH`] 7-bit ASCII characters is packed into
//! [`NUMBER_OF_CHUNKS`] `u64` blocks, [`CHARACTERS_PER_CHUNK`] characters per
//! block, first characters in the lowest bits of the lowest block. Encoding is
//! a `const fn`, so names declared at probe sites cost nothing at run time.

use alloc::string::String;
use core::fmt;
use core::str::FromStr;

/// One encoded block.
pub type EncodedChunk = u64;

/// Number of blocks in an identifier.
pub const NUMBER_OF_CHUNKS: usize = 4;

/// Characters packed into one block (7 bits each).
pub const CHARACTERS_PER_CHUNK: usize = core::mem::size_of::<EncodedChunk>() * 8 / 7;

/// Longest name that can be represented.
pub const MAX_LENGTH: usize = CHARACTERS_PER_CHUNK * NUMBER_OF_CHUNKS;

/// Reasons a name cannot be used for a probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameError {
    /// The name has no characters.
    Empty,
    /// A byte at this position is outside 7-bit ASCII.
    NonAscii { position: usize },
    /// The name is longer than [`MAX_LENGTH`].
    TooLong { length: usize },
}

impl fmt::Display for NameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "Probe name is empty"),
            Self::NonAscii { position } => {
                write!(f, "Probe name has a non-ASCII byte at position {}", position)
            }
            Self::TooLong { length } => write!(
                f,
                "Probe name is too long: {} characters (max {})",
                length, MAX_LENGTH
            ),
        }
    }
}

impl core::error::Error for NameError {}

/// Encoded probe name.
///
/// Two identifiers are equal iff all their blocks are equal. The empty
/// identifier has a zero first block.
#[derive(Clone, Copy, Default, Hash)]
pub struct Identifier {
    chunks: [EncodedChunk; NUMBER_OF_CHUNKS],
}

impl Identifier {
    /// The empty identifier.
    pub const EMPTY: Self = Self {
        chunks: [0; NUMBER_OF_CHUNKS],
    };

    /// Encodes `name`, keeping at most [`MAX_LENGTH`] characters.
    ///
    /// Encoding stops at the end of the string or at the first NUL byte. The
    /// remaining character slots are not zero-filled: the name is fed in again
    /// from its start, leaving one zero slot at every wrap point. Decoding stops
    /// at the first zero slot, so this only changes the raw blocks, and makes
    /// the trailing blocks of names with a common prefix differ, which is what
    /// [`PartialEq`] checks first.
    pub const fn encode(name: &str) -> Self {
        let bytes = name.as_bytes();
        let mut chunks = [0; NUMBER_OF_CHUNKS];
        let mut p = 0;
        let mut i = 0;
        while i < MAX_LENGTH {
            if p < bytes.len() && bytes[p] != 0 {
                let ch = (bytes[p] & 0x7F) as EncodedChunk;
                chunks[i / CHARACTERS_PER_CHUNK] |= ch << (7 * (i % CHARACTERS_PER_CHUNK));
                p += 1;
            } else {
                p = 0;
            }
            i += 1;
        }
        Self { chunks }
    }

    /// Validates `name` and encodes it.
    pub const fn parse(name: &str) -> Result<Self, NameError> {
        match Self::validate(name) {
            Ok(()) => Ok(Self::encode(name)),
            Err(e) => Err(e),
        }
    }

    /// Whether `name` is usable as a probe name: non-empty, 7-bit ASCII, and at
    /// most [`MAX_LENGTH`] characters up to the first NUL.
    pub const fn is_valid(name: &str) -> bool {
        Self::validate(name).is_ok()
    }

    const fn validate(name: &str) -> Result<(), NameError> {
        let bytes = name.as_bytes();
        if bytes.is_empty() || bytes[0] == 0 {
            return Err(NameError::Empty);
        }
        let mut i = 0;
        while i < bytes.len() && bytes[i] != 0 {
            if bytes[i] >= 128 {
                return Err(NameError::NonAscii { position: i });
            }
            i += 1;
        }
        if i > MAX_LENGTH {
            return Err(NameError::TooLong { length: i });
        }
        Ok(())
    }

    /// Rebuilds an identifier from raw blocks.
    pub const fn from_chunks(chunks: [EncodedChunk; NUMBER_OF_CHUNKS]) -> Self {
        Self { chunks }
    }

    /// Raw encoded blocks.
    pub const fn chunks(&self) -> &[EncodedChunk; NUMBER_OF_CHUNKS] {
        &self.chunks
    }

    pub const fn is_empty(&self) -> bool {
        self.chunks[0] == 0
    }

    /// Decoded characters up to the first zero slot.
    pub fn chars(&self) -> impl Iterator<Item = char> + '_ {
        (0..MAX_LENGTH)
            .map(|i| {
                let shift = 7 * (i % CHARACTERS_PER_CHUNK);
                ((self.chunks[i / CHARACTERS_PER_CHUNK] >> shift) & 0x7F) as u8 as char
            })
            .take_while(|c| *c != '\0')
    }

    /// Decodes back to text.
    pub fn decode(&self) -> String {
        self.chars().collect()
    }
}

impl PartialEq for Identifier {
    /// Compares from the last block towards the first; see [`Identifier::encode`].
    fn eq(&self, other: &Self) -> bool {
        let mut i = NUMBER_OF_CHUNKS;
        while i > 0 {
            i -= 1;
            if self.chunks[i] != other.chunks[i] {
                return false;
            }
        }
        true
    }
}

impl Eq for Identifier {}

impl PartialEq<&str> for Identifier {
    fn eq(&self, other: &&str) -> bool {
        *self == Identifier::encode(other)
    }
}

impl fmt::Display for Identifier {
    /// Honors width, fill and alignment, e.g. `{:<36}` for aligned listings.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut buf = [0u8; MAX_LENGTH];
        let mut len = 0;
        for c in self.chars() {
            buf[len] = c as u8;
            len += 1;
        }
        // Every slot holds a 7-bit character.
        f.pad(core::str::from_utf8(&buf[..len]).unwrap_or_default())
    }
}

impl fmt::Debug for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Identifier(\"")?;
        for c in self.chars() {
            write!(f, "{}", c.escape_debug())?;
        }
        f.write_str("\")")
    }
}

impl From<&str> for Identifier {
    fn from(name: &str) -> Self {
        Self::encode(name)
    }
}

impl FromStr for Identifier {
    type Err = NameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_constants() {
        assert_eq!(CHARACTERS_PER_CHUNK, 9);
        assert_eq!(MAX_LENGTH, 36);
    }

    #[test]
    fn test_wrap_fill_blocks() {
        let id = Identifier::encode("123456789");
        assert_eq!(
            id.chunks(),
            &[
                4139051819874441521,
                4066426843206293632,
                3993801866538139705,
                3921176889869212856,
            ]
        );
    }

    #[test]
    fn test_single_char_repeats() {
        let id = Identifier::encode("a");
        assert_eq!(id.chunks()[0], id.chunks()[2]);
        assert_eq!(id.chunks()[1], id.chunks()[3]);
        assert_ne!(id.chunks()[0], 0);
        assert_eq!(id.decode(), "a");
    }

    #[test]
    fn test_display_pads() {
        let id = Identifier::encode("ab");
        assert_eq!(alloc::format!("{:>5}|", id), "   ab|");
        assert_eq!(alloc::format!("{:<5}|", id), "ab   |");
        assert_eq!(alloc::format!("{:-^6}", id), "--ab--");
    }

    #[test]
    fn test_nul_terminates() {
        assert_eq!(Identifier::encode("ab\0cd"), Identifier::encode("ab"));
        assert_eq!(Identifier::encode("ab\0cd").decode(), "ab");
    }
}
