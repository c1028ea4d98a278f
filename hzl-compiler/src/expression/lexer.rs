//! Tokenizer for harmonic series expressions
//!
//! Uses logos. Whitespace is skipped; anything else that is not a token is a
//! lexing error reported with its byte offset.

use logos::Logos;

use super::parser::ParseError;

/// Expression token
#[derive(Logos, Debug, Clone, Copy, PartialEq)]
#[logos(skip r"[ \t\r\n]+")]
pub enum Token<'src> {
    /// Decimal literal (e.g. 2, 0.5, .25, 1e3, 6.02E-2); overflow to infinity is a lexing error
    #[regex(r"[0-9]+(\.[0-9]*)?([eE][+-]?[0-9]+)?", finite_number)]
    #[regex(r"\.[0-9]+([eE][+-]?[0-9]+)?", finite_number)]
    Number(f64),

    /// Variable, constant, or function name
    #[regex(r"[A-Za-z_][A-Za-z0-9_]*", |lex| lex.slice())]
    Ident(&'src str),

    /// Unicode spelling of pi
    #[token("π")]
    Pi,

    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,
    /// Exponentiation, `^` or `**`
    #[token("^")]
    #[token("**")]
    Caret,
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token(",")]
    Comma,
}

fn finite_number<'src>(lex: &mut logos::Lexer<'src, Token<'src>>) -> Option<f64> {
    lex.slice().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// A token with the byte offset it starts at
pub type Spanned<'src> = (Token<'src>, usize);

/// Tokenize the full source, failing on the first unrecognized character
pub fn tokenize(source: &str) -> Result<Vec<Spanned<'_>>, ParseError> {
    Token::lexer(source)
        .spanned()
        .map(|(token, span)| match token {
            Ok(token) => Ok((token, span.start)),
            Err(()) => Err(ParseError::new(
                format!("unexpected input '{}'", &source[span.clone()]),
                span.start,
            )),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<Token<'_>> {
        tokenize(source).unwrap().into_iter().map(|(t, _)| t).collect()
    }

    #[test]
    fn test_numbers() {
        assert_eq!(
            kinds("2 0.5 .25 1e3 6.02E-2"),
            vec![
                Token::Number(2.0),
                Token::Number(0.5),
                Token::Number(0.25),
                Token::Number(1000.0),
                Token::Number(0.0602),
            ]
        );
    }

    #[test]
    fn test_operators_and_power_spellings() {
        assert_eq!(
            kinds("a ** 2 ^ (b, c) + - * /"),
            vec![
                Token::Ident("a"),
                Token::Caret,
                Token::Number(2.0),
                Token::Caret,
                Token::LParen,
                Token::Ident("b"),
                Token::Comma,
                Token::Ident("c"),
                Token::RParen,
                Token::Plus,
                Token::Minus,
                Token::Star,
                Token::Slash,
            ]
        );
    }

    #[test]
    fn test_pi_spellings() {
        assert_eq!(kinds("π*pi"), vec![Token::Pi, Token::Star, Token::Ident("pi")]);
    }

    #[test]
    fn test_offsets() {
        let tokens = tokenize("1 +  harmonic_index").unwrap();
        let offsets: Vec<usize> = tokens.iter().map(|(_, at)| *at).collect();
        assert_eq!(offsets, vec![0, 2, 5]);
    }

    #[test]
    fn test_overflowing_literal_rejected() {
        let err = tokenize("2 * 1e999").unwrap_err();
        assert_eq!(err.offset, 4);
        assert!(err.message.contains("1e999"), "{}", err.message);
    }

    #[test]
    fn test_unknown_character() {
        let err = tokenize("2 $ 3").unwrap_err();
        assert_eq!(err.offset, 2);
        assert!(err.message.contains('$'));
    }
}
