// Player auth tokens: 32 lowercase hex characters.

use rand::Rng;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Token(String);

pub const TOKEN_LENGTH: usize = 32;

impl Token {
    /// Accepts exactly 32 hex characters; anything else is not a token.
    pub fn parse(value: &str) -> Option<Token> {
        if value.len() == TOKEN_LENGTH && value.chars().all(|c| c.is_ascii_hexdigit()) {
            Some(Token(value.to_ascii_lowercase()))
        } else {
            None
        }
    }

    /// Builds a fresh token from two random 64-bit halves.
    pub fn generate(rng: &mut impl Rng) -> Token {
        Token(format!("{:016x}{:016x}", rng.gen::<u64>(), rng.gen::<u64>()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn generated_tokens_have_the_wire_shape() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..100 {
            let token = Token::generate(&mut rng);
            assert_eq!(token.as_str().len(), TOKEN_LENGTH);
            assert!(token.as_str().chars().all(|c| c.is_ascii_hexdigit()));
            assert!(Token::parse(token.as_str()).is_some());
        }
    }

    #[test]
    fn parse_rejects_malformed_input() {
        assert!(Token::parse("").is_none());
        assert!(Token::parse("abc").is_none());
        assert!(Token::parse(&"g".repeat(32)).is_none());
        assert!(Token::parse(&"a".repeat(31)).is_none());
        assert!(Token::parse(&"a".repeat(33)).is_none());
    }

    #[test]
    fn parse_normalizes_case() {
        let token = Token::parse(&"AB".repeat(16)).unwrap();
        assert_eq!(token.as_str(), "ab".repeat(16));
    }
}
