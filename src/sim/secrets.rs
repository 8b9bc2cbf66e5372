//! Typed secret codes

/// Rolling buffer matched against one secret word
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretSequence {
    secret: Vec<char>,
    buffer: Vec<char>,
}

impl SecretSequence {
    pub fn new(secret: &str) -> Self {
        Self {
            secret: secret.to_lowercase().chars().collect(),
            buffer: Vec::new(),
        }
    }

    /// Feed one key. Returns true when the buffer ends with the secret;
    /// the buffer is cleared on a match.
    pub fn push(&mut self, ch: char) -> bool {
        if self.secret.is_empty() {
            return false;
        }
        self.buffer.extend(ch.to_lowercase());
        if self.buffer.len() > self.secret.len() {
            let excess = self.buffer.len() - self.secret.len();
            self.buffer.drain(..excess);
        }
        if self.buffer == self.secret {
            self.buffer.clear();
            true
        } else {
            false
        }
    }
}

/// Which secret a key completed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecretMatch {
    /// Letter word: summon the massive enemy
    Letters,
    /// Digit word: god mode
    Digits,
}

/// Letter and digit secrets tracked in separate buffers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretCodes {
    enabled: bool,
    letters: SecretSequence,
    digits: SecretSequence,
}

impl SecretCodes {
    pub fn new(enabled: bool, letter_secret: &str, digit_secret: &str) -> Self {
        Self {
            enabled,
            letters: SecretSequence::new(letter_secret),
            digits: SecretSequence::new(digit_secret),
        }
    }

    /// Route a key to the matching buffer. Other keys are ignored.
    pub fn press(&mut self, ch: char) -> Option<SecretMatch> {
        if !self.enabled {
            return None;
        }
        if ch.is_ascii_alphabetic() {
            self.letters.push(ch).then_some(SecretMatch::Letters)
        } else if ch.is_ascii_digit() {
            self.digits.push(ch).then_some(SecretMatch::Digits)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_at_end_of_buffer() {
        let mut s = SecretSequence::new("cbum");
        let hits: Vec<bool> = "xxcbum".chars().map(|c| s.push(c)).collect();
        assert_eq!(hits, vec![false, false, false, false, false, true]);
    }

    #[test]
    fn case_insensitive_and_resets_after_match() {
        let mut s = SecretSequence::new("cbum");
        assert!("CBUM".chars().map(|c| s.push(c)).last().unwrap());
        assert!(!s.push('m'));
    }

    #[test]
    fn letters_and_digits_do_not_interfere() {
        let mut codes = SecretCodes::new(true, "cbum", "42");
        assert_eq!(codes.press('4'), None);
        assert_eq!(codes.press('c'), None);
        assert_eq!(codes.press('2'), Some(SecretMatch::Digits));
        for c in "bu".chars() {
            assert_eq!(codes.press(c), None);
        }
        assert_eq!(codes.press('m'), Some(SecretMatch::Letters));
    }

    #[test]
    fn disabled_codes_never_match() {
        let mut codes = SecretCodes::new(false, "cbum", "42");
        assert_eq!(codes.press('4'), None);
        assert_eq!(codes.press('2'), None);
    }

    #[test]
    fn empty_secret_never_matches() {
        let mut s = SecretSequence::new("");
        assert!(!s.push('a'));
    }
}
