//! Parsers used during synthesis, built on nom.
//!
//! Two small grammars live here:
//!
//! ```text
//! nvarchar(50)        declared column types: base name + optional arguments
//! decimal(12, 2)
//!
//! ... where Id = @Id  placeholder markers inside rendered statement text
//! ```

use nom::{
    branch::alt,
    bytes::complete::{take_till1, take_while, take_while1},
    character::complete::{anychar, char, multispace0},
    combinator::{map, opt},
    multi::{many0, separated_list1},
    sequence::{delimited, pair, preceded},
    IResult,
};

/// A declared schema type split into base name and arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeclaredType {
    /// Lowercased base name, e.g. `nvarchar`.
    pub base: String,
    /// Raw arguments, e.g. `["12", "2"]` or `["max"]`.
    pub args: Vec<String>,
}

/// Parse a declared type such as `varchar(max)` or `double precision`.
///
/// Returns `None` when the text is not a type declaration.
pub fn parse_declared_type(input: &str) -> Option<DeclaredType> {
    match declared_type(input.trim()) {
        Ok(("", ty)) => Some(ty),
        _ => None,
    }
}

fn declared_type(input: &str) -> IResult<&str, DeclaredType> {
    let (input, base) =
        take_while1(|c: char| c.is_alphanumeric() || c == '_' || c == ' ')(input)?;
    let (input, args) = opt(delimited(
        pair(char('('), multispace0),
        separated_list1(
            delimited(multispace0, char(','), multispace0),
            take_while1(|c: char| c.is_alphanumeric()),
        ),
        pair(multispace0, char(')')),
    ))(input)?;

    let base = base.trim();
    if base.is_empty() {
        return Err(nom::Err::Error(nom::error::Error::new(
            input,
            nom::error::ErrorKind::Alpha,
        )));
    }

    Ok((
        input,
        DeclaredType {
            base: base.to_lowercase(),
            args: args
                .unwrap_or_default()
                .into_iter()
                .map(str::to_string)
                .collect(),
        },
    ))
}

enum Token<'a> {
    Marker(&'a str),
    Text,
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn token<'a>(prefix: char) -> impl FnMut(&'a str) -> IResult<&'a str, Token<'a>> {
    move |input: &'a str| {
        alt((
            // System variables (@@identity) are not placeholders
            map(
                preceded(pair(char(prefix), char(prefix)), take_while(is_ident_char)),
                |_| Token::Text,
            ),
            map(preceded(char(prefix), take_while1(is_ident_char)), Token::Marker),
            map(take_till1(move |c: char| c == prefix), |_| Token::Text),
            map(anychar, |_| Token::Text),
        ))(input)
    }
}

/// Every placeholder occurrence in statement text, in order, without the prefix.
pub fn marker_occurrences(sql: &str, prefix: char) -> Vec<&str> {
    match many0(token(prefix))(sql) {
        Ok((_, tokens)) => tokens
            .into_iter()
            .filter_map(|t| match t {
                Token::Marker(name) => Some(name),
                Token::Text => None,
            })
            .collect(),
        Err(_) => Vec::new(),
    }
}

/// Distinct placeholder names in order of first occurrence.
pub fn placeholders(sql: &str, prefix: char) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for name in marker_occurrences(sql, prefix) {
        if !names.iter().any(|n| n == name) {
            names.push(name.to_string());
        }
    }
    names
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_type() {
        let ty = parse_declared_type("INT").unwrap();
        assert_eq!(ty.base, "int");
        assert!(ty.args.is_empty());
    }

    #[test]
    fn test_type_with_args() {
        let ty = parse_declared_type("decimal(12, 2)").unwrap();
        assert_eq!(ty.base, "decimal");
        assert_eq!(ty.args, vec!["12", "2"]);

        let ty = parse_declared_type("nvarchar( max )").unwrap();
        assert_eq!(ty.base, "nvarchar");
        assert_eq!(ty.args, vec!["max"]);
    }

    #[test]
    fn test_multi_word_type() {
        let ty = parse_declared_type("double precision").unwrap();
        assert_eq!(ty.base, "double precision");
    }

    #[test]
    fn test_invalid_type() {
        assert!(parse_declared_type("").is_none());
        assert!(parse_declared_type("int(").is_none());
        assert!(parse_declared_type("(12)").is_none());
    }

    #[test]
    fn test_placeholders_first_occurrence() {
        let sql = "select Id from Order where (@customerId is null or CustomerId = @customerId) \
                   order by Id offset @pageSize * (@pageNumber - 1) rows fetch next @pageSize rows only";
        assert_eq!(
            placeholders(sql, '@'),
            vec!["customerId", "pageSize", "pageNumber"]
        );
        assert_eq!(marker_occurrences(sql, '@').len(), 5);
    }

    #[test]
    fn test_system_variable_skipped() {
        let sql = "insert into Order (Total) values (@Total) select @Id = @@identity";
        assert_eq!(placeholders(sql, '@'), vec!["Total", "Id"]);
    }

    #[test]
    fn test_colon_prefix() {
        let sql = "insert into Order (Total) values (:Total) returning Id into :Id";
        assert_eq!(placeholders(sql, ':'), vec!["Total", "Id"]);
    }

    #[test]
    fn test_no_placeholders() {
        assert!(placeholders("select Id from Order", '@').is_empty());
        assert!(placeholders("", '@').is_empty());
    }
}
