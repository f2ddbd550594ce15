/// SQL keywords and punctuation.
#[allow(clippy::upper_case_acronyms)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Token {
    SELECT,
    FROM,
    WHERE,
    AS,
    ON,
    INNER,
    LEFT,
    JOIN,
    GROUP,
    ORDER,
    BY,
    ASC,
    DESC,
    CASE,
    WHEN,
    THEN,
    ELSE,
    END,
    NOT,
    IN,
    DISTINCT,
    OVER,
    LPAREN,
    RPAREN,
    COMMA,
    DOT,
    STAR,
    MINUS,
}

impl Token {
    pub const fn as_str(self) -> &'static str {
        match self {
            Token::SELECT => "SELECT",
            Token::FROM => "FROM",
            Token::WHERE => "WHERE",
            Token::AS => "AS",
            Token::ON => "ON",
            Token::INNER => "INNER",
            Token::LEFT => "LEFT",
            Token::JOIN => "JOIN",
            Token::GROUP => "GROUP",
            Token::ORDER => "ORDER",
            Token::BY => "BY",
            Token::ASC => "ASC",
            Token::DESC => "DESC",
            Token::CASE => "CASE",
            Token::WHEN => "WHEN",
            Token::THEN => "THEN",
            Token::ELSE => "ELSE",
            Token::END => "END",
            Token::NOT => "NOT",
            Token::IN => "IN",
            Token::DISTINCT => "DISTINCT",
            Token::OVER => "OVER",
            Token::LPAREN => "(",
            Token::RPAREN => ")",
            Token::COMMA => ",",
            Token::DOT => ".",
            Token::STAR => "*",
            Token::MINUS => "-",
        }
    }

    /// Punctuation never needs surrounding spaces of its own.
    pub const fn is_punctuation(self) -> bool {
        matches!(
            self,
            Token::LPAREN | Token::RPAREN | Token::COMMA | Token::DOT | Token::MINUS
        )
    }
}
