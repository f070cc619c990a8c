//! Numeric literal scanning

use super::token::TokenKind;
use super::Lexer;
use crate::error::PResult;

impl Lexer<'_> {
    /// Scan a numeric literal starting at the cursor
    pub(super) fn lex_number(&mut self) -> PResult<TokenKind> {
        let start = self.pos;
        if self.peek() == Some(b'0') {
            let radix = match self.peek_at(1) {
                Some(b'x' | b'X') => Some(16),
                Some(b'b' | b'B') => Some(2),
                Some(b'o' | b'O') => Some(8),
                Some(b'd' | b'D') => Some(10),
                Some(b'0'..=b'7' | b'_') => {
                    self.pos += 1;
                    return self.lex_radix_digits(8, start);
                }
                _ => None,
            };
            if let Some(radix) = radix {
                self.pos += 2;
                return self.lex_radix_digits(radix, start);
            }
        }

        let mut digits = String::new();
        self.scan_digits(10, &mut digits, start)?;
        let mut is_float = false;
        if self.peek() == Some(b'.') && self.peek_at(1).is_some_and(|byte| byte.is_ascii_digit()) {
            is_float = true;
            digits.push('.');
            self.pos += 1;
            self.scan_digits(10, &mut digits, start)?;
        }
        if matches!(self.peek(), Some(b'e' | b'E')) {
            let sign_offset = usize::from(matches!(self.peek_at(1), Some(b'+' | b'-')));
            if self.peek_at(1 + sign_offset).is_some_and(|byte| byte.is_ascii_digit()) {
                is_float = true;
                digits.push('e');
                if sign_offset == 1 {
                    digits.push(char::from(self.src[self.pos + 1]));
                }
                self.pos += 1 + sign_offset;
                self.scan_digits(10, &mut digits, start)?;
            }
        }

        if is_float {
            return digits
                .parse::<f64>()
                .map(TokenKind::Float)
                .map_err(|_| self.error_at(start, format!("invalid float literal `{digits}'")));
        }
        Ok(integer_token(&digits, 10))
    }

    fn lex_radix_digits(&mut self, radix: u32, start: usize) -> PResult<TokenKind> {
        let mut digits = String::new();
        self.scan_digits(radix, &mut digits, start)?;
        if digits.is_empty() {
            return Err(self.error_at(start, "numeric literal without digits"));
        }
        Ok(integer_token(&digits, radix))
    }

    fn scan_digits(&mut self, radix: u32, digits: &mut String, start: usize) -> PResult<()> {
        let mut last_underscore = false;
        while let Some(byte) = self.peek() {
            if byte == b'_' {
                if last_underscore {
                    return Err(self.error_at(start, "trailing `_' in number"));
                }
                last_underscore = true;
                self.pos += 1;
                continue;
            }
            let ch = char::from(byte);
            if ch.is_digit(radix) {
                digits.push(ch);
                last_underscore = false;
                self.pos += 1;
            } else if radix < 10 && byte.is_ascii_digit() {
                let base = if radix == 2 { "binary" } else { "octal" };
                return Err(self.error_at(start, format!("Invalid {base} digit `{ch}'")));
            } else {
                break;
            }
        }
        if last_underscore {
            return Err(self.error_at(start, "trailing `_' in number"));
        }
        Ok(())
    }
}

/// Integer token for `digits` in `radix`, promoting to a bignum on overflow
fn integer_token(digits: &str, radix: u32) -> TokenKind {
    match i64::from_str_radix(digits, radix) {
        Ok(value) => TokenKind::Integer(value),
        Err(_) => TokenKind::BigInteger(to_decimal(digits, radix)),
    }
}

/// Convert an arbitrarily long digit string into decimal
pub(crate) fn to_decimal(digits: &str, radix: u32) -> String {
    const LIMB: u64 = 1_000_000_000;
    // little-endian base 10^9 limbs
    let mut limbs: Vec<u64> = vec![0];
    for ch in digits.chars() {
        let Some(digit) = ch.to_digit(radix) else {
            continue;
        };
        let mut carry = u64::from(digit);
        for limb in &mut limbs {
            let value = *limb * u64::from(radix) + carry;
            *limb = value % LIMB;
            carry = value / LIMB;
        }
        while carry > 0 {
            limbs.push(carry % LIMB);
            carry /= LIMB;
        }
    }
    let mut out = String::new();
    for (index, limb) in limbs.iter().rev().enumerate() {
        if index == 0 {
            out.push_str(&limb.to_string());
        } else {
            out.push_str(&format!("{limb:09}"));
        }
    }
    out
}

/// Negate the decimal text of a bignum
pub(crate) fn negate_decimal(digits: &str) -> String {
    digits
        .strip_prefix('-')
        .map_or_else(|| format!("-{digits}"), str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_decimal_handles_large_hex() {
        assert_eq!(to_decimal("ffffffffffffffffff", 16), "4722366482869645213695");
        assert_eq!(to_decimal("0", 10), "0");
        assert_eq!(to_decimal("1000000000", 10), "1000000000");
    }

    #[test]
    fn test_integer_token_promotes_on_overflow() {
        assert_eq!(integer_token("17", 8), TokenKind::Integer(15));
        assert_eq!(
            integer_token("9223372036854775808", 10),
            TokenKind::BigInteger("9223372036854775808".to_string())
        );
        assert_eq!(negate_decimal("12"), "-12");
        assert_eq!(negate_decimal("-12"), "12");
    }
}
