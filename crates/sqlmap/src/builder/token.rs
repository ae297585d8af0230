use crate::error::MapperResult;

/// Scans text for `open ... close` tokens and replaces each one with the
/// handler's output.
///
/// A backslash before the open token escapes it, and a backslash before the
/// close token inside a token keeps that close token as part of the content.
/// An open token without a matching close token is kept verbatim.
#[derive(Debug, Clone, Copy)]
pub struct GenericTokenParser<'a> {
    open: &'a str,
    close: &'a str,
    keep_escapes: bool,
}

impl<'a> GenericTokenParser<'a> {
    pub const fn new(open: &'a str, close: &'a str) -> Self {
        Self {
            open,
            close,
            keep_escapes: false,
        }
    }

    /// Leave escaping backslashes in the output and in the handler's
    /// content, for passes that rewrite tokens ahead of the final parse.
    pub const fn keeping_escapes(mut self) -> Self {
        self.keep_escapes = true;
        self
    }

    pub fn parse<F>(&self, text: &str, mut handler: F) -> MapperResult<String>
    where
        F: FnMut(&str) -> MapperResult<String>,
    {
        let Some(mut start) = text.find(self.open) else {
            return Ok(text.to_string());
        };

        let mut out = String::with_capacity(text.len());
        let mut offset = 0;
        let mut expression = String::new();
        loop {
            if start > 0 && text.as_bytes()[start - 1] == b'\\' {
                let kept = if self.keep_escapes { start } else { start - 1 };
                out.push_str(&text[offset..kept]);
                out.push_str(self.open);
                offset = start + self.open.len();
            } else {
                expression.clear();
                out.push_str(&text[offset..start]);
                offset = start + self.open.len();
                let mut end = text[offset..].find(self.close).map(|i| i + offset);
                while let Some(e) = end {
                    if e <= offset || text.as_bytes()[e - 1] != b'\\' {
                        expression.push_str(&text[offset..e]);
                        break;
                    }
                    let kept = if self.keep_escapes { e } else { e - 1 };
                    expression.push_str(&text[offset..kept]);
                    expression.push_str(self.close);
                    offset = e + self.close.len();
                    end = text[offset..].find(self.close).map(|i| i + offset);
                }
                match end {
                    None => {
                        out.push_str(&text[start..]);
                        offset = text.len();
                    }
                    Some(e) => {
                        out.push_str(&handler(&expression)?);
                        offset = e + self.close.len();
                    }
                }
            }
            match text[offset..].find(self.open) {
                Some(next) => start = next + offset,
                None => break,
            }
        }
        out.push_str(&text[offset..]);
        Ok(out)
    }

    /// Whether `text` contains at least one complete, unescaped token.
    pub fn has_token(&self, text: &str) -> bool {
        let mut found = false;
        // The handler is infallible here, so the result can be ignored.
        let _ = self.parse(text, |_| {
            found = true;
            Ok(String::new())
        });
        found
    }
}
