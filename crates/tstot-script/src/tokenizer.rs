//! Logos-based tokenizer for editing scripts.
//!
//! Only the handful of token kinds needed to recognise call expressions are
//! produced. Whitespace and every other character are lexer errors and are
//! dropped by [`tokenize`]; callers that care about adjacency compare spans.

use logos::Logos;

/// Token types emitted by the Logos lexer.
#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token<'src> {
    /// Identifier such as a function or variable name.
    #[regex(r"[A-Za-z_][A-Za-z0-9_]*")]
    Ident(&'src str),

    /// Unsigned decimal integer literal.
    #[regex(r"[0-9]+")]
    Number(&'src str),

    #[token("(")]
    LParen,

    #[token(")")]
    RParen,

    #[token(",")]
    Comma,
}

/// A token together with the byte span it occupies in the original input.
#[derive(Debug, Clone)]
pub struct SpannedToken<'src> {
    pub token: Token<'src>,
    pub span: std::ops::Range<usize>,
}

/// Tokenize an input string into a `Vec` of spanned tokens.
pub fn tokenize(input: &str) -> Vec<SpannedToken<'_>> {
    Token::lexer(input)
        .spanned()
        .filter_map(|(result, span)| result.ok().map(|token| SpannedToken { token, span }))
        .collect()
}
