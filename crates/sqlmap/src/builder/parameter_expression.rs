use crate::error::{MapperError, MapperResult};

/// The parsed content of one `#{...}` placeholder.
///
/// Grammar: `property[:JDBCTYPE][, name=value]*` or
/// `(expression)[:JDBCTYPE][, name=value]*`. Attribute order is kept.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParameterExpression {
    entries: Vec<(String, String)>,
}

impl ParameterExpression {
    pub fn parse(content: &str) -> MapperResult<Self> {
        let mut expr = ParameterExpression::default();
        let chars: Vec<char> = content.chars().collect();
        let p = skip_ws(&chars, 0);
        if p < chars.len() && chars[p] == '(' {
            expr.expression(&chars, p + 1, content)?;
        } else {
            expr.property(&chars, p, content)?;
        }
        Ok(expr)
    }

    fn expression(&mut self, chars: &[char], left: usize, content: &str) -> MapperResult<()> {
        let mut depth = 1;
        let mut right = left;
        while right < chars.len() {
            match chars[right] {
                '(' => depth += 1,
                ')' => {
                    depth -= 1;
                    if depth == 0 {
                        break;
                    }
                }
                _ => {}
            }
            right += 1;
        }
        if depth != 0 {
            return Err(MapperError::configuration(format!(
                "Parsing error in {{{content}}}: unbalanced parentheses"
            )));
        }
        self.put("expression", trimmed(chars, left, right));
        self.jdbc_type_opt(chars, right + 1, content)
    }

    fn property(&mut self, chars: &[char], left: usize, content: &str) -> MapperResult<()> {
        if left < chars.len() {
            let right = skip_until(chars, left, ",:");
            self.put("property", trimmed(chars, left, right));
            self.jdbc_type_opt(chars, right, content)?;
        }
        Ok(())
    }

    fn jdbc_type_opt(&mut self, chars: &[char], p: usize, content: &str) -> MapperResult<()> {
        let p = skip_ws(chars, p);
        if p < chars.len() {
            match chars[p] {
                ':' => self.jdbc_type(chars, p + 1, content)?,
                ',' => self.option(chars, p + 1),
                _ => {
                    return Err(MapperError::configuration(format!(
                        "Parsing error in {{{content}}} in position {p}"
                    )));
                }
            }
        }
        Ok(())
    }

    fn jdbc_type(&mut self, chars: &[char], p: usize, content: &str) -> MapperResult<()> {
        let left = skip_ws(chars, p);
        let right = skip_until(chars, left, ",");
        if right <= left {
            return Err(MapperError::configuration(format!(
                "Parsing error in {{{content}}} in position {p}"
            )));
        }
        self.put("jdbcType", trimmed(chars, left, right));
        self.option(chars, right + 1);
        Ok(())
    }

    fn option(&mut self, chars: &[char], mut p: usize) {
        loop {
            let left = skip_ws(chars, p);
            if left >= chars.len() {
                return;
            }
            let right = skip_until(chars, left, "=");
            let name = trimmed(chars, left, right);
            let left = right + 1;
            let right = skip_until(chars, left, ",");
            let value = trimmed(chars, left, right);
            self.put(&name, value);
            p = right + 1;
        }
    }

    fn put(&mut self, name: &str, value: String) {
        match self.entries.iter_mut().find(|(k, _)| k == name) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((name.to_string(), value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn property_name(&self) -> Option<&str> {
        self.get("property")
    }

    /// All `name=value` pairs in declaration order, including `property`.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

fn skip_ws(chars: &[char], mut p: usize) -> usize {
    while p < chars.len() && chars[p] <= ' ' {
        p += 1;
    }
    p.min(chars.len())
}

fn skip_until(chars: &[char], mut p: usize, end_chars: &str) -> usize {
    while p < chars.len() {
        if end_chars.contains(chars[p]) {
            return p;
        }
        p += 1;
    }
    chars.len()
}

fn trimmed(chars: &[char], start: usize, end: usize) -> String {
    let end = end.min(chars.len());
    if start >= end {
        return String::new();
    }
    chars[start..end]
        .iter()
        .collect::<String>()
        .trim_matches(|c: char| c <= ' ')
        .to_string()
}
