//! Restricted parser for the inline action scripts carried by list rows.
//!
//! Each row's action anchor embeds a `confirmSelectUnder(...)` invocation
//! whose nine positional arguments are the row's metadata. The fragment comes
//! from the remote site and is treated purely as data: it is never executed.
//! Only the exact call shape below is accepted; anything else is a parse
//! error, never a partial record.
//!
//! ```text
//! fragment := ws [ "return" ws ] "confirmSelectUnder" ws "(" args ")" ws [ ";" ws ]
//! args     := value ("," value){8}
//! value    := string | number | "true" | "false"
//! ```

use crate::{error::SessionError, types::CourseInfo};

/// The one callee the portal uses for supplement elections.
const CALLEE: &str = "confirmSelectUnder";

/// confirmSelectUnder(xh, stuName, courseName, classNo, onlySupp, index,
/// seqNo, freshFlag, limitedNbr)
const ARITY: usize = 9;

/// Parse one inline action script into its nine-field record.
pub fn parse_action_script(fragment: &str) -> Result<CourseInfo, SessionError> {
    let args = parse_call(fragment).map_err(SessionError::Parse)?;
    build_info(args).map_err(SessionError::Parse)
}

/// One argument literal, before coercion into a `CourseInfo` field.
#[derive(Debug, Clone, PartialEq)]
enum Arg {
    Str(String),
    Bool(bool),
    /// Numbers keep their source text; the record stores them as strings.
    Num(String),
}

fn parse_call(fragment: &str) -> Result<Vec<Arg>, String> {
    let mut s = Scanner::new(fragment);
    s.skip_ws();
    if s.eat_word("return") {
        s.skip_ws();
    }
    if !s.eat_word(CALLEE) {
        return Err(format!("expected a {CALLEE}(...) invocation"));
    }
    s.skip_ws();
    if !s.eat('(') {
        return Err(format!("expected '(' after {CALLEE}"));
    }

    let mut args = Vec::new();
    loop {
        s.skip_ws();
        args.push(s.value()?);
        s.skip_ws();
        if s.eat(',') {
            continue;
        }
        if s.eat(')') {
            break;
        }
        return Err(format!("expected ',' or ')' at offset {}", s.offset()));
    }

    s.skip_ws();
    s.eat(';');
    s.skip_ws();
    if !s.at_end() {
        return Err(format!("unexpected trailing input at offset {}", s.offset()));
    }
    if args.len() != ARITY {
        return Err(format!("expected {ARITY} arguments, found {}", args.len()));
    }
    Ok(args)
}

fn build_info(args: Vec<Arg>) -> Result<CourseInfo, String> {
    let mut args = args.into_iter();
    let mut next = move || args.next().ok_or_else(|| "missing argument".to_string());
    Ok(CourseInfo {
        xh: text(next()?),
        stu_name: text(next()?),
        course_name: text(next()?),
        class_no: text(next()?),
        only_supp: flag(next()?, "onlySupp")?,
        index: text(next()?),
        seq_no: text(next()?),
        fresh_flag: flag(next()?, "freshFlag")?,
        limited_nbr: text(next()?),
    })
}

fn text(arg: Arg) -> String {
    match arg {
        Arg::Str(s) => s,
        Arg::Num(n) => n,
        Arg::Bool(b) => b.to_string(),
    }
}

/// The portal emits the two flag arguments as bare booleans on some pages and
/// quoted `"true"`/`"false"` on others; both are accepted, nothing else.
fn flag(arg: Arg, field: &str) -> Result<bool, String> {
    match arg {
        Arg::Bool(b) => Ok(b),
        Arg::Str(s) if s == "true" => Ok(true),
        Arg::Str(s) if s == "false" => Ok(false),
        other => Err(format!("{field} must be a boolean, found {other:?}")),
    }
}

struct Scanner {
    chars: Vec<char>,
    pos: usize,
}

impl Scanner {
    fn new(input: &str) -> Self {
        Self {
            chars: input.chars().collect(),
            pos: 0,
        }
    }

    fn offset(&self) -> usize {
        self.pos
    }

    fn at_end(&self) -> bool {
        self.pos >= self.chars.len()
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        Some(c)
    }

    fn skip_ws(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    /// Consume `word` if it appears here as a whole identifier.
    fn eat_word(&mut self, word: &str) -> bool {
        let end = self.pos + word.chars().count();
        if end > self.chars.len() {
            return false;
        }
        if !self.chars[self.pos..end].iter().copied().eq(word.chars()) {
            return false;
        }
        if self
            .chars
            .get(end)
            .is_some_and(|c| c.is_alphanumeric() || *c == '_' || *c == '$')
        {
            return false;
        }
        self.pos = end;
        true
    }

    fn value(&mut self) -> Result<Arg, String> {
        match self.peek() {
            Some(q @ ('\'' | '"')) => {
                self.pos += 1;
                self.string_body(q).map(Arg::Str)
            },
            Some(c) if c == '-' || c.is_ascii_digit() => self.number().map(Arg::Num),
            Some(_) => {
                if self.eat_word("true") {
                    Ok(Arg::Bool(true))
                } else if self.eat_word("false") {
                    Ok(Arg::Bool(false))
                } else {
                    Err(format!("unsupported value at offset {}", self.pos))
                }
            },
            None => Err("unexpected end of input, expected a value".into()),
        }
    }

    fn string_body(&mut self, quote: char) -> Result<String, String> {
        let mut out = String::new();
        loop {
            match self.bump() {
                Some(c) if c == quote => return Ok(out),
                Some('\\') => match self.bump() {
                    Some('n') => out.push('\n'),
                    Some('t') => out.push('\t'),
                    Some('r') => out.push('\r'),
                    Some(c @ ('\'' | '"' | '\\' | '/')) => out.push(c),
                    Some(c) => return Err(format!("unsupported escape \\{c}")),
                    None => return Err("unterminated string literal".into()),
                },
                Some(c) => out.push(c),
                None => return Err("unterminated string literal".into()),
            }
        }
    }

    fn number(&mut self) -> Result<String, String> {
        let start = self.pos;
        if self.peek() == Some('-') {
            self.pos += 1;
        }
        let digits_start = self.pos;
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.pos += 1;
        }
        if self.pos == digits_start {
            return Err(format!("malformed number at offset {start}"));
        }
        if self.peek() == Some('.') {
            self.pos += 1;
            let frac_start = self.pos;
            while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                self.pos += 1;
            }
            if self.pos == frac_start {
                return Err(format!("malformed number at offset {start}"));
            }
        }
        Ok(self.chars[start..self.pos].iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PLAIN: &str = "confirmSelectUnder('2100012345','张三','数学分析','01',false,'3','18',false,'120')";

    #[test]
    fn parses_plain_invocation() {
        let info = parse_action_script(PLAIN).expect("parse");
        assert_eq!(info.xh, "2100012345");
        assert_eq!(info.stu_name, "张三");
        assert_eq!(info.course_name, "数学分析");
        assert_eq!(info.class_no, "01");
        assert!(!info.only_supp);
        assert_eq!(info.index, "3");
        assert_eq!(info.seq_no, "18");
        assert!(!info.fresh_flag);
        assert_eq!(info.limited_nbr, "120");
    }

    #[test]
    fn parses_return_prefix_and_semicolon() {
        let fragment = format!("return {PLAIN};");
        let info = parse_action_script(&fragment).expect("parse");
        assert_eq!(info.seq_no, "18");
    }

    #[test]
    fn parses_surrounding_whitespace() {
        let fragment = format!("  \n return  {PLAIN} ; \t");
        assert!(parse_action_script(&fragment).is_ok());
    }

    #[test]
    fn parses_double_quotes_and_escapes() {
        let fragment = r#"confirmSelectUnder("21\t00","it\'s","数\\分","01",true,"3","18",false,"1")"#;
        let info = parse_action_script(fragment).expect("parse");
        assert_eq!(info.xh, "21\t00");
        assert_eq!(info.stu_name, "it's");
        assert_eq!(info.course_name, "数\\分");
        assert!(info.only_supp);
    }

    #[test]
    fn number_arguments_keep_their_text() {
        let fragment = "confirmSelectUnder(2100012345,'n','c','01',false,3,18,false,-1.5)";
        let info = parse_action_script(fragment).expect("parse");
        assert_eq!(info.xh, "2100012345");
        assert_eq!(info.index, "3");
        assert_eq!(info.seq_no, "18");
        assert_eq!(info.limited_nbr, "-1.5");
    }

    #[test]
    fn quoted_flags_are_coerced() {
        let fragment = "confirmSelectUnder('x','n','c','01','true','3','18','false','1')";
        let info = parse_action_script(fragment).expect("parse");
        assert!(info.only_supp);
        assert!(!info.fresh_flag);
    }

    #[test]
    fn rejects_non_boolean_flag() {
        let fragment = "confirmSelectUnder('x','n','c','01','yes','3','18',false,'1')";
        let err = parse_action_script(fragment).expect_err("must fail");
        assert!(err.to_string().contains("onlySupp"));
    }

    #[test]
    fn rejects_wrong_arity() {
        let short = "confirmSelectUnder('x','n','c','01',false,'3','18',false)";
        assert!(parse_action_script(short).is_err());

        let long = "confirmSelectUnder('x','n','c','01',false,'3','18',false,'1','extra')";
        assert!(parse_action_script(long).is_err());
    }

    #[test]
    fn rejects_unknown_callee() {
        let fragment = "electCourse('x','n','c','01',false,'3','18',false,'1')";
        assert!(parse_action_script(fragment).is_err());
    }

    #[test]
    fn rejects_callee_prefix_tricks() {
        // "confirmSelectUnderX" must not match the known callee.
        let fragment = "confirmSelectUnderX('x','n','c','01',false,'3','18',false,'1')";
        assert!(parse_action_script(fragment).is_err());
    }

    #[test]
    fn rejects_trailing_statements() {
        let fragment = format!("{PLAIN}; alert('x')");
        assert!(parse_action_script(&fragment).is_err());
    }

    #[test]
    fn rejects_unterminated_string() {
        let fragment = "confirmSelectUnder('x','n','c','01";
        let err = parse_action_script(fragment).expect_err("must fail");
        assert!(err.to_string().contains("unterminated"));
    }

    #[test]
    fn rejects_nested_call_arguments() {
        let fragment = "confirmSelectUnder(alert('x'),'n','c','01',false,'3','18',false,'1')";
        assert!(parse_action_script(fragment).is_err());
    }

    #[test]
    fn rejects_empty_input() {
        assert!(parse_action_script("").is_err());
        assert!(parse_action_script("   ").is_err());
    }
}
